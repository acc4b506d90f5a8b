//! Touch gesture synthesis.
//!
//! [`GestureEngine::synthesize`] turns a [`GestureSpec`] into an ordered,
//! timed sequence of [`TouchEvent`]s: one `Began` at the start point, evenly
//! spaced `Moved` samples along the straight path, and one `Ended` at the end
//! point. A tap is the degenerate case where start and end coincide; it
//! yields exactly `Began` and `Ended`.
//!
//! Every sequence satisfies:
//!
//! - the first event is `Began` at `t = 0`, the last is `Ended`
//! - timestamps are strictly increasing
//! - at least two events are produced
//!
//! Synthesis is all-or-nothing: invalid geometry yields an error and no
//! events at all.
//!
//! # Example
//!
//! ```
//! use touchkit_core::geometry::Point;
//! use touchkit_core::gesture::{GestureEngine, GestureSpec, TouchPhase};
//!
//! let engine = GestureEngine::default();
//! let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0, 0.0);
//! let events = engine.synthesize(&spec).unwrap();
//!
//! assert_eq!(events.first().unwrap().phase, TouchPhase::Began);
//! assert_eq!(events.last().unwrap().phase, TouchPhase::Ended);
//! assert_eq!(events.last().unwrap().timestamp, 1.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::geometry::{lerp, pace_by_velocity, sample_count, Pacing, Point};

/// Shortest gesture the engine emits, in seconds.
///
/// Keeps `Ended` strictly after `Began` even for instantaneous taps.
pub const MIN_GESTURE_DURATION: f64 = 0.001;

/// Default spacing between `Moved` samples: one 60 Hz frame.
pub const DEFAULT_FRAME_INTERVAL: f64 = 1.0 / 60.0;

/// Phase of a single touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
}

/// One timed touch sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub point: Point,
    pub phase: TouchPhase,
    /// Seconds since the gesture's `Began` event.
    pub timestamp: f64,
}

impl TouchEvent {
    /// The timestamp as a [`Duration`] offset from gesture start.
    ///
    /// `None` for negative, NaN or unrepresentably large timestamps.
    pub fn offset(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.timestamp).ok()
    }
}

/// Parameters of a single straight-line gesture.
///
/// `velocity` (points per second) takes precedence over `duration`
/// (seconds) when positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSpec {
    pub start: Point,
    pub end: Point,
    pub duration: f64,
    pub velocity: f64,
}

impl GestureSpec {
    pub fn new(start: Point, end: Point, duration: f64, velocity: f64) -> Self {
        Self { start, end, duration, velocity }
    }

    /// A zero-length gesture at `point` held for `hold` seconds.
    pub fn tap(point: Point, hold: f64) -> Self {
        Self::new(point, point, hold, 0.0)
    }

    /// Returns true if start and end coincide.
    pub fn is_tap(&self) -> bool {
        self.start == self.end
    }
}

/// Stateless gesture synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEngine {
    frame_interval: f64,
}

impl Default for GestureEngine {
    fn default() -> Self {
        Self { frame_interval: DEFAULT_FRAME_INTERVAL }
    }
}

impl GestureEngine {
    /// Creates an engine sampling every `frame_interval` seconds.
    ///
    /// Non-positive or non-finite intervals fall back to
    /// [`DEFAULT_FRAME_INTERVAL`].
    pub fn new(frame_interval: f64) -> Self {
        if frame_interval.is_finite() && frame_interval > 0.0 {
            Self { frame_interval }
        } else {
            Self::default()
        }
    }

    pub fn frame_interval(&self) -> f64 {
        self.frame_interval
    }

    /// Resolves the pacing of `spec` without producing events.
    pub fn pacing(&self, spec: &GestureSpec) -> Result<Pacing, CommandError> {
        if !spec.start.is_finite() || !spec.end.is_finite() {
            return Err(CommandError::InvalidGeometry(format!(
                "malformed points {} -> {}",
                spec.start, spec.end
            )));
        }
        pace_by_velocity(spec.start, spec.end, spec.duration, spec.velocity)
    }

    /// Produces the full event sequence for `spec`.
    pub fn synthesize(&self, spec: &GestureSpec) -> Result<Vec<TouchEvent>, CommandError> {
        let pacing = self.pacing(spec)?;
        let duration = pacing.effective_duration().max(MIN_GESTURE_DURATION);

        // A tap has no path to sample.
        let samples = if spec.is_tap() {
            1
        } else {
            sample_count(duration, self.frame_interval)
        };

        let mut events = Vec::with_capacity(samples + 1);
        events.push(TouchEvent { point: spec.start, phase: TouchPhase::Began, timestamp: 0.0 });

        for i in 1..samples {
            let t = i as f64 / samples as f64;
            events.push(TouchEvent {
                point: lerp(spec.start, spec.end, t),
                phase: TouchPhase::Moved,
                timestamp: t * duration,
            });
        }

        events.push(TouchEvent { point: spec.end, phase: TouchPhase::Ended, timestamp: duration });
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MAX_GESTURE_DURATION, MAX_SAMPLES};

    fn assert_well_formed(events: &[TouchEvent]) {
        assert!(events.len() >= 2);
        assert_eq!(events[0].phase, TouchPhase::Began);
        assert_eq!(events[0].timestamp, 0.0);
        assert_eq!(events[events.len() - 1].phase, TouchPhase::Ended);
        for pair in events.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp, "timestamps must increase: {pair:?}");
        }
        for moved in &events[1..events.len() - 1] {
            assert_eq!(moved.phase, TouchPhase::Moved);
        }
    }

    #[test]
    fn test_duration_driven_drag() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0, 0.0);
        let events = engine.synthesize(&spec).unwrap();

        assert_well_formed(&events);
        assert_eq!(events.len(), 61);
        assert_eq!(events.last().unwrap().timestamp, 1.0);
        assert_eq!(events.last().unwrap().point, Point::new(100.0, 0.0));
        for pair in events.windows(2) {
            assert!(pair[1].point.x > pair[0].point.x);
            assert_eq!(pair[1].point.y, 0.0);
        }
    }

    #[test]
    fn test_velocity_driven_drag() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 0.0, 50.0);
        let events = engine.synthesize(&spec).unwrap();

        assert_well_formed(&events);
        assert!((events.last().unwrap().timestamp - 2.0).abs() < 1e-12);
        assert_eq!(events.len(), 121);
    }

    #[test]
    fn test_velocity_overrides_duration() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(0.0, 300.0), 10.0, 600.0);
        let events = engine.synthesize(&spec).unwrap();
        assert!((events.last().unwrap().timestamp - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tap_is_two_events() {
        let engine = GestureEngine::default();
        let events = engine.synthesize(&GestureSpec::tap(Point::new(50.0, 50.0), 0.5)).unwrap();

        assert_eq!(events.len(), 2);
        assert_well_formed(&events);
        assert_eq!(events[0].point, Point::new(50.0, 50.0));
        assert_eq!(events[1].point, Point::new(50.0, 50.0));
        assert_eq!(events[1].timestamp, 0.5);
    }

    #[test]
    fn test_instant_tap_gets_minimum_duration() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(1.0, 1.0), Point::new(1.0, 1.0), 0.0, 10.0);
        let events = engine.synthesize(&spec).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].timestamp, MIN_GESTURE_DURATION);
    }

    #[test]
    fn test_invalid_geometry_emits_nothing() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 0.0, 0.0);
        let err = engine.synthesize(&spec).unwrap_err();
        assert!(matches!(err, CommandError::InvalidGeometry(_)));
    }

    #[test]
    fn test_malformed_points_rejected() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(f64::NAN, 0.0), Point::new(10.0, 0.0), 1.0, 0.0);
        assert!(matches!(engine.synthesize(&spec), Err(CommandError::InvalidGeometry(_))));
    }

    #[test]
    fn test_custom_frame_interval() {
        let engine = GestureEngine::new(0.1);
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0), 0.5, 0.0);
        let events = engine.synthesize(&spec).unwrap();
        assert_eq!(events.len(), 6);
        assert_eq!(events[1].point, Point::new(2.0, 2.0));
        assert!((events[1].timestamp - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_frame_interval_falls_back() {
        assert_eq!(GestureEngine::new(0.0).frame_interval(), DEFAULT_FRAME_INTERVAL);
        assert_eq!(GestureEngine::new(f64::NAN).frame_interval(), DEFAULT_FRAME_INTERVAL);
    }

    #[test]
    fn test_event_offset() {
        let event = TouchEvent { point: Point::new(0.0, 0.0), phase: TouchPhase::Moved, timestamp: 0.25 };
        assert_eq!(event.offset(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_event_offset_rejects_unrepresentable() {
        let at = |timestamp| TouchEvent { point: Point::new(0.0, 0.0), phase: TouchPhase::Moved, timestamp };
        assert_eq!(at(f64::INFINITY).offset(), None);
        assert_eq!(at(f64::NAN).offset(), None);
        assert_eq!(at(-0.5).offset(), None);
        assert_eq!(at(1.0e20).offset(), None);
    }

    #[test]
    fn test_tiny_velocity_emits_nothing() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 0.0, 1e-310);
        let err = engine.synthesize(&spec).unwrap_err();
        assert!(matches!(err, CommandError::InvalidGeometry(_)));
    }

    #[test]
    fn test_overlong_tap_hold_emits_nothing() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::tap(Point::new(5.0, 5.0), 1.0e20);
        assert!(matches!(engine.synthesize(&spec), Err(CommandError::InvalidGeometry(_))));
    }

    #[test]
    fn test_longest_gesture_stays_well_formed() {
        let engine = GestureEngine::default();
        let spec = GestureSpec::new(Point::new(0.0, 0.0), Point::new(100.0, 0.0), MAX_GESTURE_DURATION, 0.0);
        let events = engine.synthesize(&spec).unwrap();
        assert_eq!(events.len(), MAX_SAMPLES + 1);
        assert_well_formed(&events);
        assert!(events.iter().all(|e| e.offset().is_some()));
    }
}
