//! Remote command surface and command results.
//!
//! [`Command`] mirrors the remote dispatch protocol's method names
//! (`drag`, `findAndTap`, `tapCoordinate`) and is serialized as JSON with a
//! `method` tag. Every executed command yields a [`CommandResult`] with a
//! definite [`CommandStatus`], and is recorded as a [`CommandLog`].
//!
//! # Example
//!
//! ```
//! use touchkit_core::command::Command;
//!
//! let json = r#"{
//!     "method": "findAndTap",
//!     "application": "com.example.app",
//!     "query": "NAME",
//!     "queryValue": "Submit",
//!     "useButtonTap": true
//! }"#;
//!
//! let command: Command = serde_json::from_str(json).unwrap();
//! assert_eq!(command.name(), "findAndTap");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::Application;
use crate::error::CommandError;
use crate::geometry::{Point, Rect};
use crate::provider::ElementHandle;
use crate::query::{Query, QueryKind};

/// A command accepted by the [`CommandDispatcher`](crate::dispatcher::CommandDispatcher).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Command {
    /// Drag from `start` to `end`.
    ///
    /// Targets the dispatcher's active application unless `application`
    /// is given.
    Drag {
        start: Point,
        end: Point,
        /// Seconds; ignored when `velocity` is positive.
        #[serde(default)]
        duration: f64,
        /// Points per second.
        #[serde(default)]
        velocity: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        application: Option<Application>,
    },

    /// Resolve a query to one element and tap its centre.
    #[serde(rename_all = "camelCase")]
    FindAndTap {
        application: Application,
        /// Optional element type filter (e.g. `Button`).
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        element_type: Option<String>,
        query: QueryKind,
        query_value: String,
        /// Narrow several matches to button-like elements.
        #[serde(default)]
        use_button_tap: bool,
    },

    /// Tap at screen coordinates.
    #[serde(rename_all = "camelCase")]
    TapCoordinate {
        application: Application,
        tap_point: Point,
    },
}

impl Command {
    /// The remote method name, suitable for tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Drag { .. } => "drag",
            Command::FindAndTap { .. } => "findAndTap",
            Command::TapCoordinate { .. } => "tapCoordinate",
        }
    }

    /// The query a `findAndTap` command resolves, if any.
    pub fn query(&self) -> Option<Query> {
        match self {
            Command::FindAndTap { element_type, query, query_value, .. } => {
                Some(build_query(element_type.as_deref(), *query, query_value))
            }
            _ => None,
        }
    }
}

/// Builds the query for a `findAndTap` command's fields.
pub(crate) fn build_query(element_type: Option<&str>, kind: QueryKind, value: &str) -> Query {
    let query = Query::new(kind, value);
    match element_type {
        Some(typ) => query.with_type(typ),
        None => query,
    }
}

/// Outcome classification of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Ok,
    ElementNotFound,
    AmbiguousMatch,
    InvalidGeometry,
    ProviderError,
}

/// Summary of an injected gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSummary {
    /// Number of touch events delivered.
    pub events: usize,
    /// Effective gesture duration in seconds.
    pub duration: f64,
}

/// What a successful command acted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandPayload {
    /// A resolved element was tapped at its centre.
    Element {
        handle: ElementHandle,
        bounds: Rect,
        point: Point,
        gesture: GestureSummary,
    },
    /// A coordinate was tapped directly.
    Coordinate { point: Point, gesture: GestureSummary },
    /// A drag was performed.
    Drag { start: Point, end: Point, gesture: GestureSummary },
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    /// Human-readable description of the result.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<CommandPayload>,
}

impl CommandResult {
    /// Creates a successful result.
    pub fn ok(message: impl Into<String>, payload: CommandPayload) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            payload: Some(payload),
        }
    }

    /// Whether the command completed successfully.
    pub fn is_ok(&self) -> bool {
        self.status == CommandStatus::Ok
    }
}

impl From<&CommandError> for CommandResult {
    fn from(err: &CommandError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
            payload: None,
        }
    }
}

impl From<Result<CommandResult, CommandError>> for CommandResult {
    fn from(result: Result<CommandResult, CommandError>) -> Self {
        match result {
            Ok(result) => result,
            Err(err) => CommandResult::from(&err),
        }
    }
}

/// A logged command with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandLog {
    /// Unique identifier for this log entry.
    pub id: Uuid,

    /// When the command started.
    pub timestamp: DateTime<Utc>,

    pub command: Command,

    pub result: CommandResult,

    /// Wall time from dispatch to result, including injection.
    pub elapsed_ms: u64,
}

impl CommandLog {
    /// Creates a new log entry with a fresh UUID.
    pub fn new(command: Command, result: CommandResult, timestamp: DateTime<Utc>, elapsed_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            command,
            result,
            elapsed_ms,
        }
    }
}
