//! Touch event delivery.
//!
//! [`TouchInjector`] is the seam to whatever delivers synthesized touches to
//! the application under test. Implementations must deliver events in order
//! and must not return before the final `Ended` event has been delivered.
//!
//! [`ScheduledInjector`] implements that contract on top of a per-event
//! [`TouchSink`], sleeping until each event's timestamp before handing it on.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use touchkit_core::application::Application;
//! use touchkit_core::error::ProviderError;
//! use touchkit_core::gesture::TouchEvent;
//! use touchkit_core::injector::{ScheduledInjector, TouchSink};
//!
//! struct PrintSink;
//!
//! #[async_trait]
//! impl TouchSink for PrintSink {
//!     async fn deliver(&self, event: &TouchEvent, target: &Application) -> Result<(), ProviderError> {
//!         println!("{target}: {:?} at {}", event.phase, event.point);
//!         Ok(())
//!     }
//! }
//!
//! let injector = ScheduledInjector::new(PrintSink);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::application::Application;
use crate::error::ProviderError;
use crate::gesture::{TouchEvent, TouchPhase};

/// Delivers a complete touch sequence to a target application.
#[async_trait]
pub trait TouchInjector: Send + Sync {
    /// Delivers `events` in order, honoring their timestamps.
    ///
    /// Returns only after the last event has been delivered.
    async fn inject(&self, events: &[TouchEvent], target: &Application) -> Result<(), ProviderError>;
}

/// Receives touch events one at a time.
#[async_trait]
pub trait TouchSink: Send + Sync {
    async fn deliver(&self, event: &TouchEvent, target: &Application) -> Result<(), ProviderError>;
}

#[async_trait]
impl<S: TouchSink + ?Sized> TouchSink for Arc<S> {
    async fn deliver(&self, event: &TouchEvent, target: &Application) -> Result<(), ProviderError> {
        (**self).deliver(event, target).await
    }
}

/// Checks that `events` form a deliverable gesture.
///
/// The sequence must start with `Began`, end with `Ended`, contain only
/// `Moved` in between, and have non-decreasing timestamps that are
/// representable as [`Duration`](std::time::Duration) offsets.
pub fn validate_sequence(events: &[TouchEvent]) -> Result<(), ProviderError> {
    let (first, last) = match (events.first(), events.last()) {
        (Some(first), Some(last)) if events.len() >= 2 => (first, last),
        _ => {
            return Err(ProviderError::CommandFailed(format!(
                "touch sequence needs at least 2 events, got {}",
                events.len()
            )))
        }
    };
    if first.phase != TouchPhase::Began || last.phase != TouchPhase::Ended {
        return Err(ProviderError::CommandFailed(
            "touch sequence must start with Began and end with Ended".to_string(),
        ));
    }
    if events[1..events.len() - 1].iter().any(|e| e.phase != TouchPhase::Moved) {
        return Err(ProviderError::CommandFailed(
            "only Moved events may appear between Began and Ended".to_string(),
        ));
    }
    if let Some(bad) = events.iter().find(|e| e.offset().is_none()) {
        return Err(ProviderError::CommandFailed(format!(
            "touch timestamp {} is not a valid offset",
            bad.timestamp
        )));
    }
    if events.windows(2).any(|pair| pair[1].timestamp < pair[0].timestamp) {
        return Err(ProviderError::CommandFailed(
            "touch timestamps must be non-decreasing".to_string(),
        ));
    }
    Ok(())
}

/// A [`TouchInjector`] that paces delivery to a [`TouchSink`] in real time.
///
/// Each event is handed to the sink no earlier than its offset from the
/// moment injection started. A sink failure stops delivery immediately.
pub struct ScheduledInjector<S> {
    sink: S,
}

impl<S: TouchSink> ScheduledInjector<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[async_trait]
impl<S: TouchSink> TouchInjector for ScheduledInjector<S> {
    async fn inject(&self, events: &[TouchEvent], target: &Application) -> Result<(), ProviderError> {
        validate_sequence(events)?;

        let origin = Instant::now();
        // Every deadline is computed before the first delivery.
        let deadlines = events
            .iter()
            .map(|event| event.offset().and_then(|offset| origin.checked_add(offset)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ProviderError::CommandFailed("touch timestamps overflow the clock".to_string()))?;

        for (event, deadline) in events.iter().zip(deadlines) {
            tokio::time::sleep_until(deadline).await;
            trace!(phase = ?event.phase, x = event.point.x, y = event.point.y, "deliver");
            self.sink.deliver(event, target).await?;
        }

        debug!(
            app = %target,
            events = events.len(),
            elapsed_ms = origin.elapsed().as_millis() as u64,
            "touch sequence delivered"
        );
        Ok(())
    }
}
