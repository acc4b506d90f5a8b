//! Query resolution to a single tap target.
//!
//! [`ElementResolver`] asks the [`ElementProvider`] for every match of a
//! query and insists on exactly one. Several matches may be narrowed by a
//! [`Narrowing`] strategy; whatever remains ambiguous is reported, never
//! silently resolved to the first match.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CommandError, ProviderError};
use crate::geometry::{Point, Rect};
use crate::provider::{Capability, ElementHandle, ElementProvider};
use crate::query::Query;

/// How to break ties when a query matches more than one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Narrowing {
    /// Any second match is an ambiguity.
    #[default]
    None,
    /// Keep only candidates exposing [`Capability::Button`].
    ButtonLike,
}

impl From<bool> for Narrowing {
    /// Maps the `useButtonTap` flag of the remote surface.
    fn from(use_button_tap: bool) -> Self {
        if use_button_tap {
            Narrowing::ButtonLike
        } else {
            Narrowing::None
        }
    }
}

/// A query resolved to one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub handle: ElementHandle,
    pub bounds: Rect,
    /// Centre of `bounds`.
    pub target: Point,
}

/// Resolves queries against an [`ElementProvider`].
#[derive(Clone)]
pub struct ElementResolver {
    provider: Arc<dyn ElementProvider>,
}

impl ElementResolver {
    pub fn new(provider: Arc<dyn ElementProvider>) -> Self {
        Self { provider }
    }

    /// Resolves `query` to exactly one element.
    ///
    /// A handle reported stale between lookup and bounds is re-resolved
    /// once; a second stale report surfaces as a provider error.
    pub async fn resolve(&self, query: &Query, narrowing: Narrowing) -> Result<Resolved, CommandError> {
        match self.resolve_once(query, narrowing).await {
            Err(CommandError::Provider(ProviderError::StaleElement(token))) => {
                warn!(query = %query, handle = %token, "element went stale, re-resolving");
                self.resolve_once(query, narrowing).await
            }
            other => other,
        }
    }

    async fn resolve_once(&self, query: &Query, narrowing: Narrowing) -> Result<Resolved, CommandError> {
        let candidates = self.provider.find_elements(query).await?;
        debug!(query = %query, candidates = candidates.len(), "query matched");

        let handle = match candidates.len() {
            0 => {
                return Err(CommandError::ElementNotFound { query: query.to_string() });
            }
            1 => candidates.into_iter().next(),
            total => self.narrow(query, candidates, narrowing, total).await?,
        };
        let handle = handle.ok_or_else(|| CommandError::ElementNotFound { query: query.to_string() })?;

        let bounds = self.provider.bounds_of(&handle).await?;
        let target = bounds.center();
        if !target.is_finite() {
            return Err(CommandError::InvalidGeometry(format!(
                "element {handle} has non-finite bounds {bounds:?}"
            )));
        }

        debug!(handle = %handle, x = target.x, y = target.y, "query resolved");
        Ok(Resolved { handle, bounds, target })
    }

    async fn narrow(
        &self,
        query: &Query,
        candidates: Vec<ElementHandle>,
        narrowing: Narrowing,
        total: usize,
    ) -> Result<Option<ElementHandle>, CommandError> {
        let ambiguous = |count| CommandError::AmbiguousMatch { query: query.to_string(), count };

        match narrowing {
            Narrowing::None => Err(ambiguous(total)),
            Narrowing::ButtonLike => {
                let mut buttons = Vec::new();
                for handle in candidates {
                    if self.provider.has_capability(&handle, Capability::Button).await? {
                        buttons.push(handle);
                    }
                }
                debug!(query = %query, total, buttons = buttons.len(), "narrowed to button-like");
                match buttons.len() {
                    1 => Ok(buttons.pop()),
                    // No button among several matches leaves the original ambiguity.
                    0 => Err(ambiguous(total)),
                    n => Err(ambiguous(n)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::UIElement;
    use crate::provider::TreeProvider;

    fn element(label: &str, element_type: &str, frame: Rect) -> UIElement {
        UIElement {
            label: Some(label.into()),
            element_type: Some(element_type.into()),
            frame: Some(frame),
            ..Default::default()
        }
    }

    fn resolver(roots: Vec<UIElement>) -> ElementResolver {
        ElementResolver::new(Arc::new(TreeProvider::new(roots)))
    }

    #[test]
    fn test_narrowing_from_flag() {
        assert_eq!(Narrowing::from(true), Narrowing::ButtonLike);
        assert_eq!(Narrowing::from(false), Narrowing::None);
    }

    #[tokio::test]
    async fn test_zero_matches_is_not_found() {
        let r = resolver(vec![]);
        let err = r.resolve(&Query::name("Submit"), Narrowing::None).await.unwrap_err();
        assert!(matches!(err, CommandError::ElementNotFound { .. }));
    }

    #[tokio::test]
    async fn test_single_match_targets_center() {
        let r = resolver(vec![element("Submit", "Button", Rect::new(100.0, 200.0, 120.0, 44.0))]);
        let resolved = r.resolve(&Query::name("Submit"), Narrowing::None).await.unwrap();
        assert_eq!(resolved.target, Point::new(160.0, 222.0));
        assert_eq!(resolved.bounds.width, 120.0);
    }

    #[tokio::test]
    async fn test_two_matches_without_narrowing_is_ambiguous() {
        let r = resolver(vec![
            element("Submit", "Button", Rect::new(0.0, 0.0, 10.0, 10.0)),
            element("Submit", "Button", Rect::new(0.0, 20.0, 10.0, 10.0)),
        ]);
        let err = r.resolve(&Query::name("Submit"), Narrowing::None).await.unwrap_err();
        assert!(matches!(err, CommandError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_button_narrowing_picks_single_button() {
        let r = resolver(vec![
            element("Submit", "StaticText", Rect::new(0.0, 0.0, 10.0, 10.0)),
            element("Submit", "Button", Rect::new(0.0, 20.0, 10.0, 10.0)),
        ]);
        let resolved = r.resolve(&Query::name("Submit"), Narrowing::ButtonLike).await.unwrap();
        assert_eq!(resolved.target, Point::new(5.0, 25.0));
    }

    #[tokio::test]
    async fn test_button_narrowing_still_ambiguous() {
        let r = resolver(vec![
            element("Submit", "Button", Rect::new(0.0, 0.0, 10.0, 10.0)),
            element("Submit", "Button", Rect::new(0.0, 20.0, 10.0, 10.0)),
            element("Submit", "StaticText", Rect::new(0.0, 40.0, 10.0, 10.0)),
        ]);
        let err = r.resolve(&Query::name("Submit"), Narrowing::ButtonLike).await.unwrap_err();
        assert!(matches!(err, CommandError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_button_narrowing_with_no_buttons() {
        let r = resolver(vec![
            element("Submit", "StaticText", Rect::new(0.0, 0.0, 10.0, 10.0)),
            element("Submit", "StaticText", Rect::new(0.0, 20.0, 10.0, 10.0)),
        ]);
        let err = r.resolve(&Query::name("Submit"), Narrowing::ButtonLike).await.unwrap_err();
        assert!(matches!(err, CommandError::AmbiguousMatch { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_missing_frame_is_provider_error() {
        let r = resolver(vec![UIElement { label: Some("Submit".into()), ..Default::default() }]);
        let err = r.resolve(&Query::name("Submit"), Narrowing::None).await.unwrap_err();
        assert!(matches!(err, CommandError::Provider(ProviderError::MissingFrame(_))));
    }
}
