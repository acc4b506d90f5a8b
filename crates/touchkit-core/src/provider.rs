//! Element provider abstraction.
//!
//! The [`ElementProvider`] trait is the seam to whatever owns the live UI
//! tree of the application under test. Handles it returns are weak: the
//! provider may report them stale at any later call, and callers must
//! re-resolve rather than cache them.
//!
//! [`TreeProvider`] is an in-memory implementation over a [`UIElement`]
//! snapshot, suitable for replaying an agent's hierarchy dump.
//!
//! # Example
//!
//! ```
//! use touchkit_core::provider::{ElementProvider, TreeProvider};
//! use touchkit_core::query::Query;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = TreeProvider::from_json(r#"[{
//!     "AXUniqueId": "submit", "type": "Button",
//!     "frame": {"x": 0, "y": 0, "width": 100, "height": 40}
//! }]"#)?;
//!
//! let handles = provider.find_elements(&Query::id("submit")).await?;
//! let bounds = provider.bounds_of(&handles[0]).await?;
//! assert_eq!(bounds.center().x, 50.0);
//! # Ok(())
//! # }
//! ```

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::UIElement;
use crate::error::ProviderError;
use crate::geometry::Rect;
use crate::query::Query;

/// Opaque reference to an element, owned by the provider that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capabilities an element may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// A button-like, directly tappable control.
    Button,
}

/// Access to the live UI tree of the application under test.
#[async_trait]
pub trait ElementProvider: Send + Sync {
    /// Returns handles for every element matching `query`, in tree order.
    async fn find_elements(&self, query: &Query) -> Result<Vec<ElementHandle>, ProviderError>;

    /// Current bounding rectangle of the element.
    ///
    /// Fails with [`ProviderError::StaleElement`] when the handle no longer
    /// refers to a live element.
    async fn bounds_of(&self, handle: &ElementHandle) -> Result<Rect, ProviderError>;

    /// Returns true if the element exposes `capability`.
    async fn has_capability(
        &self,
        handle: &ElementHandle,
        capability: Capability,
    ) -> Result<bool, ProviderError>;
}

struct Snapshot {
    generation: u64,
    roots: Vec<UIElement>,
}

/// An [`ElementProvider`] backed by an in-memory hierarchy snapshot.
///
/// Handles encode the snapshot generation and the element's child-index
/// path. Replacing the snapshot bumps the generation, so every handle issued
/// earlier becomes stale.
pub struct TreeProvider {
    snapshot: RwLock<Snapshot>,
}

impl TreeProvider {
    pub fn new(roots: Vec<UIElement>) -> Self {
        Self {
            snapshot: RwLock::new(Snapshot { generation: 0, roots }),
        }
    }

    /// Parses a hierarchy dump: either a single root object or an array of roots.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let roots = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };
        Ok(Self::new(roots))
    }

    /// Swaps in a new hierarchy snapshot, invalidating all outstanding handles.
    pub fn replace(&self, roots: Vec<UIElement>) {
        let mut snapshot = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        snapshot.generation += 1;
        snapshot.roots = roots;
        debug!(generation = snapshot.generation, "tree snapshot replaced");
    }

    /// The current snapshot generation.
    pub fn generation(&self) -> u64 {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Runs `f` against the element a handle refers to.
    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&UIElement) -> T,
    ) -> Result<T, ProviderError> {
        let stale = || ProviderError::StaleElement(handle.to_string());
        let (generation, path) = parse_token(handle.as_str()).ok_or_else(stale)?;

        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        if snapshot.generation != generation {
            return Err(stale());
        }

        let mut siblings = &snapshot.roots;
        let mut element = None;
        for index in path {
            let current = siblings.get(index).ok_or_else(stale)?;
            siblings = &current.children;
            element = Some(current);
        }
        element.map(f).ok_or_else(stale)
    }
}

fn make_token(generation: u64, path: &[usize]) -> ElementHandle {
    let path: Vec<String> = path.iter().map(|i| i.to_string()).collect();
    ElementHandle::new(format!("g{}:{}", generation, path.join(".")))
}

fn parse_token(token: &str) -> Option<(u64, Vec<usize>)> {
    let (generation, path) = token.strip_prefix('g')?.split_once(':')?;
    let generation = generation.parse().ok()?;
    let path = path
        .split('.')
        .map(|part| part.parse().ok())
        .collect::<Option<Vec<usize>>>()?;
    Some((generation, path))
}

fn collect_matches(
    elements: &[UIElement],
    matcher: &crate::query::Matcher,
    path: &mut Vec<usize>,
    generation: u64,
    out: &mut Vec<ElementHandle>,
) {
    for (index, element) in elements.iter().enumerate() {
        path.push(index);
        if matcher.matches(element) {
            out.push(make_token(generation, path));
        }
        collect_matches(&element.children, matcher, path, generation, out);
        path.pop();
    }
}

#[async_trait]
impl ElementProvider for TreeProvider {
    async fn find_elements(&self, query: &Query) -> Result<Vec<ElementHandle>, ProviderError> {
        let matcher = query
            .compile()
            .map_err(|e| ProviderError::CommandFailed(format!("invalid query {query}: {e}")))?;

        let snapshot = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        let mut out = Vec::new();
        collect_matches(&snapshot.roots, &matcher, &mut Vec::new(), snapshot.generation, &mut out);
        debug!(query = %query, matches = out.len(), "tree search complete");
        Ok(out)
    }

    async fn bounds_of(&self, handle: &ElementHandle) -> Result<Rect, ProviderError> {
        self.with_element(handle, |element| element.frame)?
            .ok_or_else(|| ProviderError::MissingFrame(handle.to_string()))
    }

    async fn has_capability(
        &self,
        handle: &ElementHandle,
        capability: Capability,
    ) -> Result<bool, ProviderError> {
        self.with_element(handle, |element| match capability {
            Capability::Button => element.is_button_like(),
        })
    }
}
