//! Screen geometry and gesture pacing.
//!
//! Pure value types and functions: points, rectangles, linear interpolation,
//! and the rules that turn a (duration, velocity) pair into the effective
//! duration of a gesture. Nothing in this module has side effects.
//!
//! # Example
//!
//! ```
//! use touchkit_core::geometry::{lerp, pace_by_velocity, Point};
//!
//! let start = Point::new(0.0, 0.0);
//! let end = Point::new(100.0, 0.0);
//!
//! assert_eq!(lerp(start, end, 0.25), Point::new(25.0, 0.0));
//!
//! // Velocity wins over duration when both are set.
//! let pacing = pace_by_velocity(start, end, 1.0, 50.0).unwrap();
//! assert_eq!(pacing.effective_duration(), 2.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Upper bound on intermediate samples for a single gesture.
pub const MAX_SAMPLES: usize = 10_000;

/// Longest gesture accepted, in seconds.
pub const MAX_GESTURE_DURATION: f64 = 3600.0;

/// Tolerance applied before rounding a sample count up, so that
/// `1.0 / (1.0 / 60.0)` yields 60 rather than 61.
const SAMPLE_EPSILON: f64 = 1e-9;

/// A position in screen points, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Returns true if both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An element's frame in screen points.
///
/// `x`/`y` locate the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// The centre of the rectangle, used as the tap target for an element.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Returns true if `point` lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Linear interpolation between `a` and `b`. `t` is clamped to `[0, 1]`.
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    let t = t.clamp(0.0, 1.0);
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Number of sample intervals for a gesture of `duration` seconds.
///
/// Always at least 1, so even a zero-length gesture emits its press and
/// release. Capped at [`MAX_SAMPLES`].
pub fn sample_count(duration: f64, frame_interval: f64) -> usize {
    if !(duration > 0.0) || !(frame_interval > 0.0) {
        return 1;
    }
    let raw = (duration / frame_interval - SAMPLE_EPSILON).ceil();
    if !raw.is_finite() || raw >= MAX_SAMPLES as f64 {
        return MAX_SAMPLES;
    }
    (raw as usize).max(1)
}

/// How a gesture's timing was derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    /// Samples are spread evenly over a caller-supplied duration.
    Duration(f64),
    /// Duration was recomputed from path length and velocity.
    Velocity {
        /// Requested speed in points per second.
        velocity: f64,
        /// Path length divided by velocity.
        duration: f64,
    },
}

impl Pacing {
    /// The gesture duration in seconds, before any minimum is applied.
    pub fn effective_duration(&self) -> f64 {
        match *self {
            Pacing::Duration(duration) => duration,
            Pacing::Velocity { duration, .. } => duration,
        }
    }
}

/// Picks the pacing for a gesture from `start` to `end`.
///
/// A positive `velocity` takes precedence: the duration becomes
/// `|end - start| / velocity`. Otherwise a positive `duration` is used as
/// given. Fails with [`CommandError::InvalidGeometry`] when neither is
/// positive, either is not a finite number, or the resulting duration
/// exceeds [`MAX_GESTURE_DURATION`].
pub fn pace_by_velocity(
    start: Point,
    end: Point,
    duration: f64,
    velocity: f64,
) -> Result<Pacing, CommandError> {
    if duration.is_nan() || !velocity.is_finite() || duration == f64::INFINITY {
        return Err(CommandError::InvalidGeometry(format!(
            "duration and velocity must be finite (got duration={duration}, velocity={velocity})"
        )));
    }

    let pacing = if velocity > 0.0 {
        Pacing::Velocity {
            velocity,
            duration: start.distance_to(end) / velocity,
        }
    } else if duration > 0.0 {
        Pacing::Duration(duration)
    } else {
        return Err(CommandError::InvalidGeometry(format!(
            "either duration or velocity must be positive (got duration={duration}, velocity={velocity})"
        )));
    };

    // A tiny velocity or a huge path overflows to infinity.
    let effective = pacing.effective_duration();
    if !(effective <= MAX_GESTURE_DURATION) {
        return Err(CommandError::InvalidGeometry(format!(
            "gesture would last {effective}s, longer than the {MAX_GESTURE_DURATION}s limit"
        )));
    }
    Ok(pacing)
}
