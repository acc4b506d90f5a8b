//! Target application handle.

use serde::{Deserialize, Serialize};

/// Identifies the application under test that touches are delivered to.
///
/// Commands against the same application are serialized by the
/// [`CommandDispatcher`](crate::dispatcher::CommandDispatcher).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Application {
    bundle_id: String,
}

impl Application {
    pub fn new(bundle_id: impl Into<String>) -> Self {
        Self { bundle_id: bundle_id.into() }
    }

    /// The bundle identifier, e.g. `com.example.app`.
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }
}

impl std::fmt::Display for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.bundle_id)
    }
}

impl From<&str> for Application {
    fn from(bundle_id: &str) -> Self {
        Self::new(bundle_id)
    }
}
