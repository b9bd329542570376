//! Interpolator - continuous pose from a sparse, irregularly timed trace.
//!
//! For a query time `t` the bracket `[prev, next]` satisfies
//! `prev.timestamp <= t < next.timestamp`. Position is linearly interpolated
//! inside the bracket; everything else is held from `prev` until `next` is
//! reached. Outside the recorded range the nearest end sample is returned
//! unmodified (no extrapolation).

use serde::Serialize;

use crate::keyframe::Keyframe;
use crate::trace_index::EntityTrace;

/// Where a query time falls relative to a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TracePhase {
    /// Before the first sample
    NotStarted,
    /// Inside the bracket starting at sample `index`
    Between { index: usize },
    /// At or after the last sample
    Finished,
}

/// Result of interpolating one trace at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated<'a> {
    /// The pose sample: interpolated lat/lng/alt, discrete fields from `prev`
    pub sample: Keyframe,

    /// The raw sample after the anchor sample, used for heading
    pub next: Option<&'a Keyframe>,

    /// Fraction of the bracket covered, in `[0, 1]`; 0 outside a bracket
    pub ratio: f64,

    pub phase: TracePhase,
}

/// Interpolates `trace` at virtual time `time_ms`. Pure.
pub fn interpolate(trace: &EntityTrace, time_ms: f64) -> Interpolated<'_> {
    let samples = trace.samples();

    // Number of samples at or before `time_ms`; a NaN query lands before the start
    let after = samples.partition_point(|s| s.timestamp <= time_ms);

    if after == 0 {
        return Interpolated {
            sample: samples[0].clone(),
            next: samples.get(1),
            ratio: 0.0,
            phase: TracePhase::NotStarted,
        };
    }

    if after == samples.len() {
        return Interpolated {
            sample: samples[after - 1].clone(),
            next: None,
            ratio: 0.0,
            phase: TracePhase::Finished,
        };
    }

    let prev = &samples[after - 1];
    let next = &samples[after];
    let ratio = bracket_ratio(prev.timestamp, next.timestamp, time_ms);

    Interpolated {
        sample: prev.at_position(prev.position().lerp(&next.position(), ratio)),
        next: Some(next),
        ratio,
        phase: TracePhase::Between { index: after - 1 },
    }
}

/// Position of `t` within `[start, end]`, clamped to `[0, 1]`.
///
/// A zero-length (or inverted) interval snaps to the start.
pub fn bracket_ratio(start: f64, end: f64, t: f64) -> f64 {
    let span = end - start;
    if span > 0.0 {
        ((t - start) / span).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
