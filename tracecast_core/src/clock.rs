//! Virtual Clock - playback time decoupled from wall-clock time.
//!
//! Virtual time is measured in the same unit as keyframe timestamps
//! (milliseconds) and advances by `real_delta_secs * scale` every tick, where
//! `scale` is virtual milliseconds per real second.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How fast virtual time runs relative to the host's frame clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    /// 1 virtual second per real second
    Realtime,
    /// 5 virtual seconds per real second
    Fast,
    /// 30 virtual seconds per real second
    Faster,
    /// 1 virtual hour per real second
    Fastest,
    /// 10 virtual seconds per real second; the recorded-trace default
    Replay,
    /// Explicit scale in virtual milliseconds per real second
    Custom(f64),
}

impl PlaybackSpeed {
    /// Virtual milliseconds per real second.
    pub fn scale(&self) -> f64 {
        match self {
            PlaybackSpeed::Realtime => 1_000.0,
            PlaybackSpeed::Fast => 5_000.0,
            PlaybackSpeed::Faster => 30_000.0,
            PlaybackSpeed::Fastest => 3_600_000.0,
            PlaybackSpeed::Replay => 10_000.0,
            PlaybackSpeed::Custom(scale) => *scale,
        }
    }
}

impl Default for PlaybackSpeed {
    fn default() -> Self {
        PlaybackSpeed::Replay
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackSpeed::Realtime => write!(f, "realtime"),
            PlaybackSpeed::Fast => write!(f, "fast"),
            PlaybackSpeed::Faster => write!(f, "faster"),
            PlaybackSpeed::Fastest => write!(f, "fastest"),
            PlaybackSpeed::Replay => write!(f, "replay"),
            PlaybackSpeed::Custom(scale) => write!(f, "{}", scale),
        }
    }
}

impl FromStr for PlaybackSpeed {
    type Err = String;

    /// Accepts a setting name or a scale in virtual ms per real second.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" => Ok(PlaybackSpeed::Realtime),
            "fast" => Ok(PlaybackSpeed::Fast),
            "faster" => Ok(PlaybackSpeed::Faster),
            "fastest" => Ok(PlaybackSpeed::Fastest),
            "replay" => Ok(PlaybackSpeed::Replay),
            other => match other.parse::<f64>() {
                Ok(scale) if scale.is_finite() && scale >= 0.0 => Ok(PlaybackSpeed::Custom(scale)),
                _ => Err(format!("Invalid playback speed: {}", s)),
            },
        }
    }
}

/// Monotonic virtual clock, one per playback session.
///
/// There is no pause or rewind; a new session gets a fresh clock.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    speed: PlaybackSpeed,
    elapsed_real_secs: f64,
    virtual_ms: f64,
}

impl VirtualClock {
    pub fn new(speed: PlaybackSpeed) -> Self {
        Self {
            speed,
            elapsed_real_secs: 0.0,
            virtual_ms: 0.0,
        }
    }

    /// Advances by one frame and returns the new virtual time in ms.
    ///
    /// Negative and non-finite deltas count as zero.
    pub fn tick(&mut self, real_delta_secs: f64) -> f64 {
        if real_delta_secs.is_finite() && real_delta_secs > 0.0 {
            self.elapsed_real_secs += real_delta_secs;
            self.virtual_ms += real_delta_secs * self.speed.scale().max(0.0);
        }
        self.virtual_ms
    }

    /// Current virtual time in ms.
    pub fn now_ms(&self) -> f64 {
        self.virtual_ms
    }

    /// Total real time fed into the clock, in seconds.
    pub fn elapsed_real_secs(&self) -> f64 {
        self.elapsed_real_secs
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    /// Changes speed from the next tick on. Time already accumulated is kept.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(PlaybackSpeed::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_default_scale() {
        let mut clock = VirtualClock::default();
        assert_eq!(clock.now_ms(), 0.0);

        let t = clock.tick(0.5);
        assert_relative_eq!(t, 5_000.0);
        assert_relative_eq!(clock.tick(0.25), 7_500.0);
        assert_relative_eq!(clock.elapsed_real_secs(), 0.75);
    }

    #[test]
    fn test_bad_deltas_are_ignored() {
        let mut clock = VirtualClock::new(PlaybackSpeed::Realtime);
        clock.tick(1.0);

        assert_relative_eq!(clock.tick(-3.0), 1_000.0);
        assert_relative_eq!(clock.tick(f64::NAN), 1_000.0);
        assert_relative_eq!(clock.tick(f64::INFINITY), 1_000.0);
    }

    #[test]
    fn test_speed_change_keeps_accumulated_time() {
        let mut clock = VirtualClock::new(PlaybackSpeed::Realtime);
        clock.tick(2.0);
        clock.set_speed(PlaybackSpeed::Fast);

        assert_relative_eq!(clock.tick(1.0), 7_000.0);
        assert_eq!(clock.speed(), PlaybackSpeed::Fast);
    }

    #[test]
    fn test_speed_parsing() {
        assert_eq!("replay".parse::<PlaybackSpeed>(), Ok(PlaybackSpeed::Replay));
        assert_eq!("Fastest".parse::<PlaybackSpeed>(), Ok(PlaybackSpeed::Fastest));
        assert_eq!("2500".parse::<PlaybackSpeed>(), Ok(PlaybackSpeed::Custom(2500.0)));
        assert!("-1".parse::<PlaybackSpeed>().is_err());
        assert!("warp".parse::<PlaybackSpeed>().is_err());
    }

    proptest! {
        #[test]
        fn prop_clock_is_monotonic(deltas in proptest::collection::vec(0.0f64..2.0, 0..64), scale in 0.0f64..1e6) {
            let mut clock = VirtualClock::new(PlaybackSpeed::Custom(scale));
            let mut last = clock.now_ms();
            for delta in deltas {
                let now = clock.tick(delta);
                prop_assert!(now >= last);
                last = now;
            }
        }
    }
}
