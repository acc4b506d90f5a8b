//! Shared test helpers for touchkit-core integration tests.
//!
//! Provides recording sinks, scripted providers and injectors, and a fixture
//! hierarchy for exercising the dispatcher end to end.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use touchkit_core::application::Application;
use touchkit_core::dispatcher::CommandDispatcher;
use touchkit_core::element::UIElement;
use touchkit_core::error::ProviderError;
use touchkit_core::geometry::Rect;
use touchkit_core::gesture::TouchEvent;
use touchkit_core::injector::{ScheduledInjector, TouchInjector, TouchSink};
use touchkit_core::provider::{Capability, ElementHandle, ElementProvider, TreeProvider};
use touchkit_core::query::Query;

pub const APP: &str = "com.example.app";

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// A delivered event with the target it went to and when it arrived.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub target: Application,
    pub event: TouchEvent,
    pub at: Instant,
}

/// A [`TouchSink`] that records every delivery in order.
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingSink {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<TouchEvent> {
        self.deliveries().into_iter().map(|d| d.event).collect()
    }
}

#[async_trait]
impl TouchSink for RecordingSink {
    async fn deliver(&self, event: &TouchEvent, target: &Application) -> Result<(), ProviderError> {
        self.deliveries.lock().unwrap().push(Delivery {
            target: target.clone(),
            event: *event,
            at: Instant::now(),
        });
        Ok(())
    }
}

pub type RecordingInjector = ScheduledInjector<RecordingSink>;

// ---------------------------------------------------------------------------
// Scripted collaborators
// ---------------------------------------------------------------------------

/// Wraps a [`TreeProvider`] and reports handles stale for the first
/// `stale_reports` calls to `bounds_of`.
pub struct FlakyProvider {
    pub inner: TreeProvider,
    stale_reports: AtomicUsize,
    pub find_calls: AtomicUsize,
}

impl FlakyProvider {
    pub fn new(roots: Vec<UIElement>, stale_reports: usize) -> Self {
        Self {
            inner: TreeProvider::new(roots),
            stale_reports: AtomicUsize::new(stale_reports),
            find_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ElementProvider for FlakyProvider {
    async fn find_elements(&self, query: &Query) -> Result<Vec<ElementHandle>, ProviderError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_elements(query).await
    }

    async fn bounds_of(&self, handle: &ElementHandle) -> Result<Rect, ProviderError> {
        let remaining = self.stale_reports.load(Ordering::SeqCst);
        if remaining > 0 {
            self.stale_reports.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::StaleElement(handle.to_string()));
        }
        self.inner.bounds_of(handle).await
    }

    async fn has_capability(&self, handle: &ElementHandle, capability: Capability) -> Result<bool, ProviderError> {
        self.inner.has_capability(handle, capability).await
    }
}

/// An injector that fails every call and counts attempts.
#[derive(Default)]
pub struct FailingInjector {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl TouchInjector for FailingInjector {
    async fn inject(&self, _events: &[TouchEvent], _target: &Application) -> Result<(), ProviderError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::CommandFailed("touch backend rejected sequence".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A small login screen: a "Submit" text label, a "Submit" button, a
/// username field, and a "Cancel" button.
pub fn login_screen() -> Vec<UIElement> {
    vec![UIElement {
        identifier: Some("login-view".into()),
        element_type: Some("Window".into()),
        frame: Some(Rect::new(0.0, 0.0, 390.0, 844.0)),
        children: vec![
            UIElement {
                label: Some("Submit".into()),
                element_type: Some("StaticText".into()),
                frame: Some(Rect::new(20.0, 100.0, 200.0, 20.0)),
                ..Default::default()
            },
            UIElement {
                identifier: Some("username".into()),
                label: Some("Username".into()),
                element_type: Some("TextField".into()),
                frame: Some(Rect::new(20.0, 200.0, 350.0, 44.0)),
                ..Default::default()
            },
            UIElement {
                identifier: Some("submit-button".into()),
                label: Some("Submit".into()),
                element_type: Some("Button".into()),
                frame: Some(Rect::new(95.0, 400.0, 200.0, 50.0)),
                ..Default::default()
            },
            UIElement {
                identifier: Some("cancel-button".into()),
                label: Some("Cancel".into()),
                element_type: Some("Button".into()),
                frame: Some(Rect::new(95.0, 470.0, 200.0, 50.0)),
                ..Default::default()
            },
        ],
        ..Default::default()
    }]
}

/// A dispatcher over `provider` delivering to a recording sink in real time.
pub fn recording_dispatcher(provider: Arc<dyn ElementProvider>) -> (CommandDispatcher, Arc<RecordingInjector>) {
    let injector = Arc::new(ScheduledInjector::new(RecordingSink::default()));
    let dispatcher = CommandDispatcher::new(provider, injector.clone(), Application::new(APP));
    (dispatcher, injector)
}

/// Approximate equality for timestamps.
pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Converts seconds to a [`Duration`].
pub fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}
