//! Element queries.
//!
//! A [`Query`] pairs a [`QueryKind`] with a string value. Identifier, label
//! and value queries accept glob wildcards (`*` and `?`); class queries
//! compare element types exactly; predicate queries use a small
//! `attribute OP 'value' [AND ...]` language.
//!
//! # Example
//!
//! ```
//! use touchkit_core::query::{Query, QueryKind};
//!
//! let query: Query = Query::new("name".parse::<QueryKind>().unwrap(), "Sub*");
//! assert_eq!(query.to_string(), r#"NAME "Sub*""#);
//!
//! let pred = Query::predicate("type == 'Button' AND label BEGINSWITH 'Sub'");
//! assert_eq!(pred.kind, QueryKind::Predicate);
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::element::UIElement;

/// How a query value is matched against elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    /// Accessibility identifier (AXUniqueId).
    Id,
    /// Accessibility label (AXLabel).
    Name,
    /// Element type, e.g. `Button` or `XCUIElementTypeButton`.
    Class,
    /// Current element value (AXValue).
    Value,
    /// Predicate expression over element attributes.
    Predicate,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Id => "ID",
            QueryKind::Name => "NAME",
            QueryKind::Class => "CLASS",
            QueryKind::Value => "VALUE",
            QueryKind::Predicate => "PREDICATE",
        }
    }
}

impl FromStr for QueryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "identifier" | "accessibility id" => Ok(QueryKind::Id),
            "name" | "label" => Ok(QueryKind::Name),
            "class" | "class name" | "type" => Ok(QueryKind::Class),
            "value" => Ok(QueryKind::Value),
            "predicate" | "predicate string" => Ok(QueryKind::Predicate),
            other => Err(format!(
                "unknown query type '{other}'. Use: ID, NAME, CLASS, VALUE, PREDICATE"
            )),
        }
    }
}

/// A `(kind, value)` pair identifying candidate elements.
///
/// An optional element type further restricts matches, e.g. a `NAME`
/// query limited to `Button` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub kind: QueryKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
}

impl Query {
    pub fn new(kind: QueryKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into(), element_type: None }
    }

    /// Restricts matches to elements of `element_type`.
    pub fn with_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(QueryKind::Id, value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new(QueryKind::Name, value)
    }

    pub fn class(value: impl Into<String>) -> Self {
        Self::new(QueryKind::Class, value)
    }

    pub fn predicate(value: impl Into<String>) -> Self {
        Self::new(QueryKind::Predicate, value)
    }

    /// Compiles the query into a reusable matcher.
    ///
    /// Only predicate queries can fail, when the expression does not parse.
    pub fn compile(&self) -> Result<Matcher, String> {
        let base = match self.kind {
            QueryKind::Id => Matcher::Glob(Attribute::Identifier, self.value.clone()),
            QueryKind::Name => Matcher::Glob(Attribute::Label, self.value.clone()),
            QueryKind::Value => Matcher::Glob(Attribute::Value, self.value.clone()),
            QueryKind::Class => Matcher::Class(normalize_type(&self.value).to_string()),
            QueryKind::Predicate => Matcher::Predicate(parse_predicate(&self.value)?),
        };
        Ok(match &self.element_type {
            Some(typ) => Matcher::All(vec![Matcher::Class(normalize_type(typ).to_string()), base]),
            None => base,
        })
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}", self.kind.as_str(), self.value)?;
        if let Some(typ) = &self.element_type {
            write!(f, " [{typ}]")?;
        }
        Ok(())
    }
}

/// Element attributes a query can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Identifier,
    Label,
    Value,
    Type,
}

impl Attribute {
    fn read<'a>(&self, element: &'a UIElement) -> Option<&'a str> {
        match self {
            Attribute::Identifier => element.identifier.as_deref(),
            Attribute::Label => element.label.as_deref(),
            Attribute::Value => element.value.as_deref(),
            Attribute::Type => element.element_type.as_deref().map(normalize_type),
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "identifier" | "name" | "id" => Some(Attribute::Identifier),
            "label" => Some(Attribute::Label),
            "value" => Some(Attribute::Value),
            "type" | "elementtype" => Some(Attribute::Type),
            _ => None,
        }
    }
}

/// Comparison operators in predicate clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    BeginsWith,
    EndsWith,
    Contains,
    Like,
}

/// One `attribute OP 'value'` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub attribute: Attribute,
    pub operator: Operator,
    pub value: String,
}

impl Clause {
    fn matches(&self, element: &UIElement) -> bool {
        let actual = self.attribute.read(element);
        let expected = if self.attribute == Attribute::Type {
            normalize_type(&self.value)
        } else {
            self.value.as_str()
        };
        match (self.operator, actual) {
            (Operator::NotEquals, None) => true,
            (_, None) => false,
            (Operator::Equals, Some(a)) => a == expected,
            (Operator::NotEquals, Some(a)) => a != expected,
            (Operator::BeginsWith, Some(a)) => a.starts_with(expected),
            (Operator::EndsWith, Some(a)) => a.ends_with(expected),
            (Operator::Contains, Some(a)) => a.contains(expected),
            (Operator::Like, Some(a)) => glob_match(expected, a),
        }
    }
}

/// A compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    Glob(Attribute, String),
    Class(String),
    /// All clauses must match.
    Predicate(Vec<Clause>),
    /// Every inner matcher must match.
    All(Vec<Matcher>),
}

impl Matcher {
    pub fn matches(&self, element: &UIElement) -> bool {
        match self {
            Matcher::Glob(attribute, pattern) => attribute
                .read(element)
                .is_some_and(|actual| glob_match(pattern, actual)),
            Matcher::Class(expected) => Attribute::Type.read(element) == Some(expected.as_str()),
            Matcher::Predicate(clauses) => clauses.iter().all(|c| c.matches(element)),
            Matcher::All(matchers) => matchers.iter().all(|m| m.matches(element)),
        }
    }
}

/// Strips the `XCUIElementType` prefix some agents report.
fn normalize_type(raw: &str) -> &str {
    raw.strip_prefix("XCUIElementType").unwrap_or(raw)
}

/// Returns true if the pattern contains glob wildcard characters (`*` or `?`).
fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Matches a string against a glob pattern with `*` (any chars) and `?` (single char).
///
/// When the pattern has no wildcards, falls back to exact equality.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == text;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();

    // prev[j] = pattern[..i-1] matches text[..j]
    let mut prev = vec![false; txt.len() + 1];
    prev[0] = true;

    for p in &pat {
        let mut cur = vec![false; txt.len() + 1];
        cur[0] = *p == '*' && prev[0];
        for j in 1..=txt.len() {
            cur[j] = match p {
                '*' => prev[j] || cur[j - 1],
                '?' => prev[j - 1],
                c => prev[j - 1] && *c == txt[j - 1],
            };
        }
        prev = cur;
    }

    prev[txt.len()]
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Quoted(String),
    Op(&'static str),
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => text.push(escaped),
                            None => return Err("dangling escape in predicate".to_string()),
                        },
                        Some(ch) if ch == quote => break,
                        Some(ch) => text.push(ch),
                        None => return Err("unterminated string in predicate".to_string()),
                    }
                }
                tokens.push(Token::Quoted(text));
            }
            '=' => {
                chars.next();
                // `=` and `==` are both equality.
                chars.next_if_eq(&'=');
                tokens.push(Token::Op("=="));
            }
            '!' => {
                chars.next();
                if chars.next_if_eq(&'=').is_none() {
                    return Err("expected '=' after '!' in predicate".to_string());
                }
                tokens.push(Token::Op("!="));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        word.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => return Err(format!("unexpected character '{other}' in predicate")),
        }
    }

    Ok(tokens)
}

/// Parses `attribute OP 'value' [AND attribute OP 'value' ...]`.
///
/// Operators: `==`, `!=`, `BEGINSWITH`, `ENDSWITH`, `CONTAINS`, `LIKE`
/// (glob). Keywords are case-insensitive.
pub fn parse_predicate(input: &str) -> Result<Vec<Clause>, String> {
    let tokens = tokenize(input)?;
    let mut clauses = Vec::new();
    let mut iter = tokens.into_iter();

    loop {
        let attribute = match iter.next() {
            Some(Token::Word(w)) => Attribute::parse(&w)
                .ok_or_else(|| format!("unknown attribute '{w}' in predicate"))?,
            Some(other) => return Err(format!("expected attribute, found {other:?}")),
            None => return Err("empty predicate".to_string()),
        };

        let operator = match iter.next() {
            Some(Token::Op("==")) => Operator::Equals,
            Some(Token::Op("!=")) => Operator::NotEquals,
            Some(Token::Word(w)) => match w.to_ascii_uppercase().as_str() {
                "BEGINSWITH" => Operator::BeginsWith,
                "ENDSWITH" => Operator::EndsWith,
                "CONTAINS" => Operator::Contains,
                "LIKE" => Operator::Like,
                _ => return Err(format!("unknown operator '{w}' in predicate")),
            },
            other => return Err(format!("expected operator, found {other:?}")),
        };

        let value = match iter.next() {
            Some(Token::Quoted(v)) => v,
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("true") || w.eq_ignore_ascii_case("false") => w,
            other => return Err(format!("expected quoted value, found {other:?}")),
        };

        clauses.push(Clause { attribute, operator, value });

        match iter.next() {
            None => break,
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("AND") => continue,
            Some(other) => return Err(format!("expected AND, found {other:?}")),
        }
    }

    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(id: &str, label: &str) -> UIElement {
        UIElement {
            identifier: Some(id.to_string()),
            label: Some(label.to_string()),
            element_type: Some("Button".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_query_kind_parse_aliases() {
        assert_eq!("ID".parse::<QueryKind>().unwrap(), QueryKind::Id);
        assert_eq!("accessibility id".parse::<QueryKind>().unwrap(), QueryKind::Id);
        assert_eq!("label".parse::<QueryKind>().unwrap(), QueryKind::Name);
        assert_eq!("class name".parse::<QueryKind>().unwrap(), QueryKind::Class);
        assert_eq!("Predicate".parse::<QueryKind>().unwrap(), QueryKind::Predicate);
        assert!("xpath".parse::<QueryKind>().is_err());
    }

    #[test]
    fn test_query_kind_serde_uppercase() {
        let json = serde_json::to_string(&QueryKind::Name).unwrap();
        assert_eq!(json, "\"NAME\"");
        let kind: QueryKind = serde_json::from_str("\"CLASS\"").unwrap();
        assert_eq!(kind, QueryKind::Class);
    }

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("hello", "hello"));
        assert!(!glob_match("hello", "world"));
    }

    #[test]
    fn test_glob_match_star() {
        assert!(glob_match("Log*", "Log In"));
        assert!(glob_match("Log*", "Log"));
        assert!(!glob_match("Log*", "Blog"));
        assert!(glob_match("*-field", "email-field"));
    }

    #[test]
    fn test_glob_match_question_mark() {
        assert!(glob_match("Item ?", "Item 1"));
        assert!(!glob_match("Item ?", "Item 12"));
        assert!(glob_match("Tab ?*", "Tab 1 Selected"));
        assert!(!glob_match("Tab ?*", "Tab "));
    }

    #[test]
    fn test_class_matcher_strips_prefix() {
        let m = Query::class("XCUIElementTypeButton").compile().unwrap();
        assert!(m.matches(&button("a", "A")));

        let m = Query::class("TextField").compile().unwrap();
        assert!(!m.matches(&button("a", "A")));
    }

    #[test]
    fn test_name_matcher_glob() {
        let m = Query::name("Sub*").compile().unwrap();
        assert!(m.matches(&button("submit", "Submit")));
        assert!(!m.matches(&button("cancel", "Cancel")));
    }

    #[test]
    fn test_predicate_single_clause() {
        let clauses = parse_predicate("label == 'Submit'").unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].attribute, Attribute::Label);
        assert_eq!(clauses[0].operator, Operator::Equals);
        assert_eq!(clauses[0].value, "Submit");
    }

    #[test]
    fn test_predicate_conjunction_matches() {
        let m = Query::predicate("type == 'Button' AND label BEGINSWITH \"Sub\"")
            .compile()
            .unwrap();
        assert!(m.matches(&button("s", "Submit")));
        assert!(!m.matches(&button("c", "Cancel")));
    }

    #[test]
    fn test_predicate_operators() {
        let el = button("login-button", "Log In");
        let check = |expr: &str| Query::predicate(expr).compile().unwrap().matches(&el);
        assert!(check("identifier ENDSWITH '-button'"));
        assert!(check("label contains 'g I'"));
        assert!(check("identifier LIKE 'login-*'"));
        assert!(check("value != 'anything'"));
        assert!(!check("label != 'Log In'"));
    }

    #[test]
    fn test_predicate_quoted_value_with_spaces_and_escape() {
        let clauses = parse_predicate(r"label == 'It\'s done'").unwrap();
        assert_eq!(clauses[0].value, "It's done");
    }

    #[test]
    fn test_predicate_errors() {
        assert!(parse_predicate("").is_err());
        assert!(parse_predicate("label ==").is_err());
        assert!(parse_predicate("colour == 'red'").is_err());
        assert!(parse_predicate("label MATCHES 'x'").is_err());
        assert!(parse_predicate("label == 'x' OR label == 'y'").is_err());
        assert!(parse_predicate("label == 'unterminated").is_err());
    }

    #[test]
    fn test_query_display() {
        assert_eq!(Query::id("submit").to_string(), "ID \"submit\"");
        assert_eq!(
            Query::name("Submit").with_type("Button").to_string(),
            "NAME \"Submit\" [Button]"
        );
    }

    #[test]
    fn test_type_filter_restricts_matches() {
        let text = UIElement {
            label: Some("Submit".into()),
            element_type: Some("StaticText".into()),
            ..Default::default()
        };
        let m = Query::name("Submit").with_type("Button").compile().unwrap();
        assert!(m.matches(&button("s", "Submit")));
        assert!(!m.matches(&text));
    }
}
