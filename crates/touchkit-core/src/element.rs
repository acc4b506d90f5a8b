//! UI element snapshot types.
//!
//! A [`UIElement`] tree is a point-in-time dump of an application's
//! accessibility hierarchy, as produced by an automation agent. The
//! [`TreeProvider`](crate::provider::TreeProvider) answers queries against
//! such a snapshot.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Element types that count as button-like regardless of role.
const BUTTON_TYPES: &[&str] = &["Button", "Link", "Cell", "Switch", "MenuItem", "Tab"];

/// Represents a UI element from the accessibility hierarchy.
///
/// Elements form a tree structure via the `children` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UIElement {
    /// The unique accessibility identifier for this element (AXUniqueId).
    #[serde(rename = "AXUniqueId", default)]
    pub identifier: Option<String>,

    /// The accessibility label (AXLabel), typically the user-visible text.
    #[serde(rename = "AXLabel", default)]
    pub label: Option<String>,

    /// The current value of the element (AXValue), e.g., text field contents.
    #[serde(rename = "AXValue", default)]
    pub value: Option<String>,

    /// The type of UI element (e.g., "Button", "TextField", "View").
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,

    /// The element's frame in screen coordinates.
    #[serde(default)]
    pub frame: Option<Rect>,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,

    /// The accessibility role of this element.
    #[serde(default)]
    pub role: Option<String>,

    /// Whether the element currently receives touches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hittable: Option<bool>,
}

impl UIElement {
    /// Returns true if the element behaves like a button.
    ///
    /// Matches on element type or an `AXButton`-style role. Elements reported
    /// as not hittable never count.
    pub fn is_button_like(&self) -> bool {
        if self.hittable == Some(false) {
            return false;
        }
        let by_type = self
            .element_type
            .as_deref()
            .is_some_and(|t| BUTTON_TYPES.contains(&t));
        let by_role = self
            .role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("AXButton") || r.eq_ignore_ascii_case("button"));
        by_type || by_role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_agent_dump() {
        let json = r#"{
            "AXUniqueId": "submit",
            "AXLabel": "Submit",
            "type": "Button",
            "frame": {"x": 10, "y": 20, "width": 100, "height": 44},
            "children": []
        }"#;
        let element: UIElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.identifier.as_deref(), Some("submit"));
        assert_eq!(element.frame.unwrap().center().x, 60.0);
        assert!(element.is_button_like());
    }

    #[test]
    fn test_missing_fields_default() {
        let element: UIElement = serde_json::from_str("{}").unwrap();
        assert!(element.identifier.is_none());
        assert!(element.children.is_empty());
        assert!(!element.is_button_like());
    }

    #[test]
    fn test_button_like_by_role() {
        let element = UIElement {
            element_type: Some("Other".into()),
            role: Some("AXButton".into()),
            ..Default::default()
        };
        assert!(element.is_button_like());
    }

    #[test]
    fn test_unhittable_button_is_not_button_like() {
        let element = UIElement {
            element_type: Some("Button".into()),
            hittable: Some(false),
            ..Default::default()
        };
        assert!(!element.is_button_like());
    }
}
