//! Command dispatch.
//!
//! [`CommandDispatcher`] is the public command contract. It composes the
//! [`ElementResolver`] and [`GestureEngine`] and hands the synthesized touch
//! sequence to a [`TouchInjector`]. Taps and drags share one path: a tap is a
//! zero-length gesture.
//!
//! Each invocation walks a small state machine:
//!
//! ```text
//! Idle -> [Resolving] -> Synthesizing -> Injecting -> Completed
//!             \______________\_______________\______-> Failed
//! ```
//!
//! Invocations against the same [`Application`] are serialized: one gesture
//! in flight per target. Nothing else is shared between invocations.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use touchkit_core::application::Application;
//! use touchkit_core::dispatcher::CommandDispatcher;
//! use touchkit_core::geometry::Point;
//! # use touchkit_core::injector::TouchInjector;
//! # use touchkit_core::provider::TreeProvider;
//!
//! # async fn run(injector: Arc<dyn TouchInjector>) {
//! let provider = Arc::new(TreeProvider::new(vec![]));
//! let dispatcher = CommandDispatcher::new(provider, injector, Application::new("com.example.app"));
//!
//! let result = dispatcher
//!     .drag(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0, 0.0)
//!     .await
//!     .unwrap();
//! assert!(result.is_ok());
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, info_span, Instrument};

use crate::application::Application;
use crate::command::{build_query, Command, CommandLog, CommandPayload, CommandResult, GestureSummary};
use crate::config::TouchkitConfig;
use crate::error::{CommandError, ProviderError};
use crate::gesture::{GestureEngine, GestureSpec, TouchEvent, DEFAULT_FRAME_INTERVAL, MIN_GESTURE_DURATION};
use crate::geometry::Point;
use crate::injector::TouchInjector;
use crate::provider::ElementProvider;
use crate::query::Query;
use crate::resolver::{ElementResolver, Narrowing, Resolved};

/// Tunables for a [`CommandDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// Spacing between `Moved` samples, in seconds.
    pub frame_interval: f64,
    /// Hold time of a tap, in seconds.
    pub tap_duration: f64,
    /// Upper bound on a single injection.
    pub injection_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            tap_duration: MIN_GESTURE_DURATION,
            injection_timeout: None,
        }
    }
}

impl From<&TouchkitConfig> for DispatcherConfig {
    fn from(config: &TouchkitConfig) -> Self {
        Self {
            frame_interval: config.frame_interval_secs,
            tap_duration: config.tap_duration_secs,
            injection_timeout: config.injection_timeout(),
        }
    }
}

/// Phase of a single command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    Idle,
    Resolving,
    Synthesizing,
    Injecting,
    Completed,
    Failed,
}

impl CommandPhase {
    /// Returns true if `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: CommandPhase) -> bool {
        use CommandPhase::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Idle, Synthesizing)
                | (Resolving, Synthesizing)
                | (Synthesizing, Injecting)
                | (Injecting, Completed)
                | (Idle | Resolving | Synthesizing | Injecting, Failed)
        )
    }

    /// Completed and Failed are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandPhase::Completed | CommandPhase::Failed)
    }
}

/// Tracks one invocation through its phases.
struct Invocation {
    phase: CommandPhase,
}

impl Invocation {
    fn new() -> Self {
        Self { phase: CommandPhase::Idle }
    }

    fn advance(&mut self, next: CommandPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }
}

/// What a command touches.
enum Plan {
    Drag(GestureSpec),
    TapPoint(Point),
    TapElement(Query, Narrowing),
}

/// What a gesture was aimed at, for the result payload.
enum Subject {
    Drag,
    Point,
    Element(Resolved),
}

/// A target's serialization lock and the number of invocations holding it.
#[derive(Default)]
struct LockEntry {
    lock: Arc<tokio::sync::Mutex<()>>,
    holders: usize,
}

type LockTable = std::sync::Mutex<HashMap<Application, LockEntry>>;

/// One invocation's claim on its target's lock entry.
///
/// Dropping the lease, whether the invocation finished or was cancelled,
/// removes the entry once no other invocation holds it.
struct TargetLease<'a> {
    table: &'a LockTable,
    application: &'a Application,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> TargetLease<'a> {
    fn new(table: &'a LockTable, application: &'a Application) -> Self {
        let mut locks = table.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = locks.entry(application.clone()).or_default();
        entry.holders += 1;
        let lock = entry.lock.clone();
        Self { table, application, lock }
    }
}

impl Drop for TargetLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let released = locks.get_mut(self.application).is_some_and(|entry| {
            entry.holders = entry.holders.saturating_sub(1);
            entry.holders == 0
        });
        if released {
            locks.remove(self.application);
        }
    }
}

/// Dispatches automation commands against one element provider and injector.
pub struct CommandDispatcher {
    resolver: ElementResolver,
    injector: Arc<dyn TouchInjector>,
    engine: GestureEngine,
    config: DispatcherConfig,
    active_application: Application,
    /// One lock per target application.
    locks: LockTable,
}

impl CommandDispatcher {
    /// Creates a dispatcher with the default [`DispatcherConfig`].
    ///
    /// # Arguments
    ///
    /// * `provider` - Source of UI elements for query resolution
    /// * `injector` - Delivers synthesized touches
    /// * `active_application` - Target of commands that name no application
    pub fn new(
        provider: Arc<dyn ElementProvider>,
        injector: Arc<dyn TouchInjector>,
        active_application: Application,
    ) -> Self {
        Self {
            resolver: ElementResolver::new(provider),
            injector,
            engine: GestureEngine::default(),
            config: DispatcherConfig::default(),
            active_application,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the dispatcher's configuration.
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.engine = GestureEngine::new(config.frame_interval);
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// The application targeted by [`drag`](Self::drag).
    pub fn active_application(&self) -> &Application {
        &self.active_application
    }

    /// Drags from `start` to `end` in the active application.
    ///
    /// A positive `velocity` (points per second) overrides `duration`
    /// (seconds).
    pub async fn drag(
        &self,
        start: Point,
        end: Point,
        duration: f64,
        velocity: f64,
    ) -> Result<CommandResult, CommandError> {
        self.drag_on(&self.active_application, start, end, duration, velocity).await
    }

    /// Drags from `start` to `end` in `application`.
    pub async fn drag_on(
        &self,
        application: &Application,
        start: Point,
        end: Point,
        duration: f64,
        velocity: f64,
    ) -> Result<CommandResult, CommandError> {
        let plan = Plan::Drag(GestureSpec::new(start, end, duration, velocity));
        self.dispatch("drag", application, plan).await
    }

    /// Resolves `query` to exactly one element and taps its centre.
    pub async fn find_and_tap(
        &self,
        application: &Application,
        query: &Query,
        narrowing: Narrowing,
    ) -> Result<CommandResult, CommandError> {
        let plan = Plan::TapElement(query.clone(), narrowing);
        self.dispatch("findAndTap", application, plan).await
    }

    /// Taps at `point` without resolving any element.
    pub async fn tap_coordinate(
        &self,
        application: &Application,
        point: Point,
    ) -> Result<CommandResult, CommandError> {
        self.dispatch("tapCoordinate", application, Plan::TapPoint(point)).await
    }

    /// Executes a remote [`Command`] and records the outcome.
    ///
    /// Never fails: errors are folded into the returned log's
    /// [`CommandResult`].
    pub async fn execute(&self, command: Command) -> CommandLog {
        let timestamp = Utc::now();
        let start = Instant::now();

        let result = match &command {
            Command::Drag { start, end, duration, velocity, application } => {
                let application = application.as_ref().unwrap_or(&self.active_application);
                self.drag_on(application, *start, *end, *duration, *velocity).await
            }
            Command::FindAndTap { application, element_type, query, query_value, use_button_tap } => {
                let query = build_query(element_type.as_deref(), *query, query_value);
                self.find_and_tap(application, &query, Narrowing::from(*use_button_tap)).await
            }
            Command::TapCoordinate { application, tap_point } => {
                self.tap_coordinate(application, *tap_point).await
            }
        };

        let result = CommandResult::from(result);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            method = command.name(),
            status = ?result.status,
            elapsed_ms,
            "command complete"
        );
        CommandLog::new(command, result, timestamp, elapsed_ms)
    }

    /// Number of applications with a live serialization lock.
    pub fn active_targets(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn dispatch(
        &self,
        method: &'static str,
        application: &Application,
        plan: Plan,
    ) -> Result<CommandResult, CommandError> {
        let span = info_span!("dispatch", method, app = %application);
        async {
            let lease = TargetLease::new(&self.locks, application);
            let _serial = lease.lock.lock().await;

            let mut invocation = Invocation::new();
            let result = self.run(&mut invocation, application, plan).await;
            match &result {
                Ok(_) => invocation.advance(CommandPhase::Completed),
                Err(e) => {
                    debug!(error = %e, failed_in = ?invocation.phase, "command failed");
                    invocation.advance(CommandPhase::Failed);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        invocation: &mut Invocation,
        application: &Application,
        plan: Plan,
    ) -> Result<CommandResult, CommandError> {
        let hold = self.config.tap_duration.max(MIN_GESTURE_DURATION);
        let tap = |point| GestureSpec::tap(point, hold);

        let (spec, subject) = match plan {
            Plan::Drag(spec) => (spec, Subject::Drag),
            Plan::TapPoint(point) => (tap(point), Subject::Point),
            Plan::TapElement(query, narrowing) => {
                invocation.advance(CommandPhase::Resolving);
                let resolved = self.resolver.resolve(&query, narrowing).await?;
                (tap(resolved.target), Subject::Element(resolved))
            }
        };

        invocation.advance(CommandPhase::Synthesizing);
        let events = self.engine.synthesize(&spec)?;
        let gesture = GestureSummary {
            events: events.len(),
            duration: events.last().map_or(0.0, |e| e.timestamp),
        };
        debug!(events = gesture.events, duration = gesture.duration, "gesture synthesized");

        invocation.advance(CommandPhase::Injecting);
        self.inject(application, &events).await?;

        Ok(match subject {
            Subject::Element(Resolved { handle, bounds, target }) => CommandResult::ok(
                format!("Tapped element {} at {}", handle, target),
                CommandPayload::Element { handle, bounds, point: target, gesture },
            ),
            Subject::Point => CommandResult::ok(
                format!("Tapped at {}", spec.start),
                CommandPayload::Coordinate { point: spec.start, gesture },
            ),
            Subject::Drag => CommandResult::ok(
                format!("Dragged from {} to {}", spec.start, spec.end),
                CommandPayload::Drag { start: spec.start, end: spec.end, gesture },
            ),
        })
    }

    async fn inject(&self, application: &Application, events: &[TouchEvent]) -> Result<(), ProviderError> {
        let injection = self.injector.inject(events, application);
        match self.config.injection_timeout {
            Some(limit) => tokio::time::timeout(limit, injection)
                .await
                .map_err(|_| ProviderError::Timeout(limit.as_millis() as u64))?,
            None => injection.await,
        }
    }
}
