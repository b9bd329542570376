//! Ground-truth movers that record synthetic keyframe traces.
//!
//! Each mover walks a smooth random path in a local metric frame around an
//! origin and is sampled at irregular intervals, the way a phone reports
//! location. Samples carry Gaussian accuracy noise and, optionally, a floor.

use nalgebra::Vector2;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use tracecast_core::keyframe::{Activity, GeoPosition, Keyframe};
use tracecast_core::projection::EARTH_RADIUS;

/// Typical speed for an activity, m/s.
pub fn activity_speed(activity: Activity) -> f64 {
    match activity {
        Activity::Unknown => 0.8,
        Activity::Walking => 1.4,
        Activity::Running => 3.2,
        Activity::Cycling => 5.5,
        Activity::Driving => 13.0,
    }
}

/// Moves `origin` by a local east/north offset in meters.
pub fn offset(origin: &GeoPosition, east_m: f64, north_m: f64) -> GeoPosition {
    let lat = origin.lat + (north_m / EARTH_RADIUS).to_degrees();
    let lng = origin.lng + (east_m / (EARTH_RADIUS * origin.lat.to_radians().cos())).to_degrees();
    GeoPosition::new(lat, lng, origin.alt)
}

/// One simulated tracked entity.
#[derive(Debug, Clone)]
pub struct Mover {
    pub id: String,
    pub activity: Activity,

    /// Position in meters, east/north of the generator origin
    pub position: Vector2<f64>,

    /// Heading in radians, counter-clockwise from east
    pub heading: f64,

    pub floor: Option<i32>,

    /// Switch activity now and then
    pub changes_activity: bool,
}

/// Generates keyframe datasets from a set of movers.
pub struct TraceGenerator {
    rng: ChaCha8Rng,
    origin: GeoPosition,
    start_ms: f64,

    /// Sampling interval bounds, ms
    interval_ms: (f64, f64),

    /// Mean horizontal/vertical accuracy radius
    accuracy: (f64, f64),

    movers: Vec<Mover>,
}

impl TraceGenerator {
    /// Creates a generator around `origin` with timestamps starting at `start_ms`.
    pub fn new(seed: u64, origin: GeoPosition, start_ms: f64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            origin,
            start_ms,
            interval_ms: (800.0, 3_000.0),
            accuracy: (6.0, 3.0),
            movers: Vec::new(),
        }
    }

    pub fn with_sample_interval(mut self, min_ms: f64, max_ms: f64) -> Self {
        self.interval_ms = (min_ms.min(max_ms), min_ms.max(max_ms));
        self
    }

    pub fn with_accuracy(mut self, hor: f64, ver: f64) -> Self {
        self.accuracy = (hor, ver);
        self
    }

    /// Adds a mover somewhere within `radius_m` of the origin.
    pub fn spawn(&mut self, id: &str, activity: Activity, radius_m: f64) -> &mut Mover {
        let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let distance = radius_m * self.rng.gen::<f64>().sqrt();
        let heading = self.rng.gen_range(0.0..std::f64::consts::TAU);

        self.movers.push(Mover {
            id: id.to_string(),
            activity,
            position: Vector2::new(angle.cos(), angle.sin()) * distance,
            heading,
            floor: None,
            changes_activity: false,
        });
        let last = self.movers.len() - 1;
        &mut self.movers[last]
    }

    pub fn movers(&self) -> &[Mover] {
        &self.movers
    }

    /// Records every mover for `duration_ms`.
    ///
    /// Each mover is sampled at its own irregular times; the result is
    /// interleaved across movers in timestamp order.
    pub fn generate(&mut self, duration_ms: f64) -> Vec<Keyframe> {
        let mut movers = std::mem::take(&mut self.movers);
        let mut samples = Vec::new();

        for mover in movers.iter_mut() {
            let mut t = self.start_ms + self.rng.gen_range(0.0..self.interval_ms.1);
            let mut last_t = t;
            while t <= self.start_ms + duration_ms {
                let dt_secs = (t - last_t) / 1000.0;
                self.step(mover, dt_secs);
                samples.push(self.record(mover, t));

                last_t = t;
                t += self.rng.gen_range(self.interval_ms.0..=self.interval_ms.1);
            }
        }

        self.movers = movers;
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        samples
    }

    fn step(&mut self, mover: &mut Mover, dt_secs: f64) {
        let turn: f64 = StandardNormal.sample(&mut self.rng);
        mover.heading += turn * 0.3;

        let direction = Vector2::new(mover.heading.cos(), mover.heading.sin());
        mover.position += direction * activity_speed(mover.activity) * dt_secs;

        if mover.changes_activity && self.rng.gen_bool(0.1) {
            mover.activity = Activity::ALL[self.rng.gen_range(0..Activity::ALL.len())];
        }
        if let Some(floor) = mover.floor.as_mut() {
            if self.rng.gen_bool(0.05) {
                *floor = (*floor + if self.rng.gen_bool(0.5) { 1 } else { -1 }).max(1);
            }
        }
    }

    fn record(&mut self, mover: &Mover, t: f64) -> Keyframe {
        let hor = self.noisy(self.accuracy.0);
        let ver = self.noisy(self.accuracy.1);
        let mut position = offset(&self.origin, mover.position.x, mover.position.y);
        position.alt = mover.floor.map(|f| f as f64 * 3.5).unwrap_or(0.0);

        let mut keyframe = Keyframe::new(mover.id.as_str(), t, position)
            .with_activity(mover.activity)
            .with_accuracy(hor, ver);
        keyframe.floor = mover.floor;
        keyframe.loc_acc_confidence = 0.68;
        keyframe
    }

    /// Positive value around `mean` with 25% spread.
    fn noisy(&mut self, mean: f64) -> f64 {
        let n: f64 = StandardNormal.sample(&mut self.rng);
        (mean * (1.0 + 0.25 * n)).max(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use tracecast_core::projection::{EquirectangularProjection, GeoProjection};
    use tracecast_core::TraceIndex;

    fn origin() -> GeoPosition {
        GeoPosition::new(51.5, -0.12, 0.0)
    }

    #[test]
    fn test_offset_inverts_projection() {
        let projection = EquirectangularProjection::new(origin());
        let moved = offset(&origin(), 120.0, -45.0);
        let local = projection.project(&moved);

        assert_relative_eq!(local.x, 120.0, epsilon = 1e-6);
        assert_relative_eq!(local.y, -45.0, epsilon = 1e-6);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let run = || {
            let mut generator = TraceGenerator::new(42, origin(), 0.0);
            generator.spawn("A", Activity::Walking, 50.0);
            generator.spawn("B", Activity::Driving, 50.0);
            generator.generate(60_000.0)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_samples_are_interleaved_and_per_entity_sorted() {
        let mut generator = TraceGenerator::new(3, origin(), 1_000_000.0).with_sample_interval(500.0, 1500.0);
        generator.spawn("A", Activity::Running, 10.0);
        generator.spawn("B", Activity::Cycling, 10.0);
        let samples = generator.generate(30_000.0);

        let index = TraceIndex::build(&samples);
        assert_eq!(index.len(), 2);
        for trace in index.iter() {
            assert!(trace.len() >= 15);
            assert!(trace.start_time() >= 1_000_000.0);
            assert!(trace.end_time() <= 1_030_000.0);
        }
        assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_floors_stay_positive() {
        let mut generator = TraceGenerator::new(5, origin(), 0.0);
        generator.spawn("A", Activity::Walking, 5.0).floor = Some(1);
        let samples = generator.generate(600_000.0);

        assert!(samples.iter().all(|s| s.floor.map_or(false, |f| f >= 1)));
        assert!(samples.iter().all(|s| s.hor_acc > 0.0 && s.ver_acc > 0.0));
    }

    #[test]
    fn test_speed_matches_activity() {
        let mut generator = TraceGenerator::new(11, origin(), 0.0).with_sample_interval(1000.0, 1000.0);
        generator.spawn("car", Activity::Driving, 0.0);
        let samples = generator.generate(10_000.0);

        let projection = EquirectangularProjection::new(origin());
        for pair in samples.windows(2) {
            let step = projection.project(&pair[1].position()) - projection.project(&pair[0].position());
            assert_relative_eq!(step.xy().norm(), activity_speed(Activity::Driving), epsilon = 1e-6);
        }
    }

    proptest! {
        #[test]
        fn prop_offset_round_trips(lat in -70.0f64..70.0, lng in -179.0f64..179.0, east in -5e3f64..5e3, north in -5e3f64..5e3) {
            let origin = GeoPosition::new(lat, lng, 0.0);
            let local = EquirectangularProjection::new(origin).project(&offset(&origin, east, north));
            prop_assert!((local.x - east).abs() < 1e-6);
            prop_assert!((local.y - north).abs() < 1e-6);
        }
    }
}
