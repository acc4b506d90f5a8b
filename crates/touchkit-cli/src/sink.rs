//! Stdout delivery of synthesized touches.
//!
//! Each delivered event becomes one JSON line on stdout, so the output of a
//! CLI run can be piped into whatever actually drives the device.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use touchkit_core::application::Application;
use touchkit_core::error::ProviderError;
use touchkit_core::gesture::TouchEvent;
use touchkit_core::injector::{validate_sequence, TouchInjector, TouchSink};

/// Writes touch events to stdout as JSON lines.
pub struct StdoutSink {
    out: Mutex<Stdout>,
    quiet: bool,
    delivered: AtomicUsize,
}

impl StdoutSink {
    /// With `quiet`, events are counted but not written.
    pub fn new(quiet: bool) -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
            quiet,
            delivered: AtomicUsize::new(0),
        }
    }

    /// Total events delivered so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Writes one line to stdout, serialized with event output.
    pub async fn write_line(&self, line: &str) -> Result<(), ProviderError> {
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl TouchSink for StdoutSink {
    async fn deliver(&self, event: &TouchEvent, target: &Application) -> Result<(), ProviderError> {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        if self.quiet {
            return Ok(());
        }
        let line = serde_json::json!({
            "target": target,
            "phase": event.phase,
            "point": event.point,
            "timestamp": event.timestamp,
        });
        self.write_line(&line.to_string()).await
    }
}

/// Delivers a whole sequence to a sink without waiting on timestamps.
///
/// Used with `--instant`, when only the event stream matters.
pub struct ImmediateInjector<S> {
    sink: S,
}

impl<S: TouchSink> ImmediateInjector<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S: TouchSink> TouchInjector for ImmediateInjector<S> {
    async fn inject(&self, events: &[TouchEvent], target: &Application) -> Result<(), ProviderError> {
        validate_sequence(events)?;
        for event in events {
            self.sink.deliver(event, target).await?;
        }
        Ok(())
    }
}
