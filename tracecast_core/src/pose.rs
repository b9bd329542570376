//! Pose Resolver - turns an interpolated sample into a renderable pose.
//!
//! Combines the interpolated position with the entity's appearance, computes a
//! heading toward the next raw sample, and derives the uncertainty ellipsoid
//! and label text.

use nalgebra::{UnitQuaternion, Vector3};
use serde::Serialize;

use crate::appearance::{Appearance, AppearanceTable};
use crate::keyframe::{Activity, Keyframe, ANONYMOUS_ID};
use crate::projection::GeoProjection;

/// Horizontal moves shorter than this (local units) keep the held heading.
const MIN_HEADING_DISTANCE: f64 = 1e-9;

/// Everything the renderer needs to place one entity for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPose {
    pub entity_id: String,

    /// Local-space position; `z` is altitude
    pub position: Vector3<f64>,

    pub orientation: UnitQuaternion<f64>,

    /// Uncertainty ellipsoid radii: (horAcc, horAcc, verAcc)
    pub uncertainty_scale: Vector3<f64>,

    /// Text shown above the entity; may be empty
    pub label: String,

    pub model: String,
    pub animation: Option<usize>,
    pub model_scale: f64,

    /// Activity of the current sample (the appearance stays fixed per entity)
    pub activity: Activity,
}

/// Resolves poses against an appearance table and a projection.
#[derive(Debug, Clone)]
pub struct PoseResolver<P> {
    appearance: AppearanceTable,
    projection: P,
}

impl<P: GeoProjection> PoseResolver<P> {
    pub fn new(appearance: AppearanceTable, projection: P) -> Self {
        Self {
            appearance,
            projection,
        }
    }

    pub fn appearance(&self) -> &AppearanceTable {
        &self.appearance
    }

    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// Resolves one entity's pose.
    ///
    /// # Arguments
    /// * `entity_id` - The entity being resolved
    /// * `activity` - Activity the entity's appearance was selected for
    /// * `sample` - The interpolated sample for this frame
    /// * `next` - The next raw sample, if the trace has one
    /// * `held` - Orientation from the previous frame, kept when no heading
    ///   can be computed
    pub fn resolve(
        &self,
        entity_id: &str,
        activity: Activity,
        sample: &Keyframe,
        next: Option<&Keyframe>,
        held: UnitQuaternion<f64>,
    ) -> ResolvedPose {
        let appearance = self.appearance.get(activity);
        let position = self.projection.project(&sample.position());

        let orientation = next
            .map(|next| self.projection.project(&next.position()) - position)
            .and_then(|direction| heading(appearance, &direction))
            .unwrap_or(held);

        ResolvedPose {
            entity_id: entity_id.to_string(),
            position,
            orientation,
            uncertainty_scale: Vector3::new(sample.hor_acc, sample.hor_acc, sample.ver_acc),
            label: label(entity_id, sample.floor),
            model: appearance.model.clone(),
            animation: appearance.animation,
            model_scale: appearance.scale,
            activity: sample.activity,
        }
    }
}

/// Yaw about local up that turns `appearance.forward` onto the horizontal
/// part of `direction`, plus the appearance's yaw correction.
///
/// `None` when the horizontal move is too short to define a heading.
pub fn heading(appearance: &Appearance, direction: &Vector3<f64>) -> Option<UnitQuaternion<f64>> {
    let (dx, dy) = (direction.x, direction.y);
    if !(dx.is_finite() && dy.is_finite()) || dx.hypot(dy) < MIN_HEADING_DISTANCE {
        return None;
    }

    let forward = appearance.forward;
    let forward_yaw = if forward.x.hypot(forward.y) < MIN_HEADING_DISTANCE {
        0.0
    } else {
        forward.y.atan2(forward.x)
    };

    let yaw = dy.atan2(dx) - forward_yaw + appearance.yaw_correction_deg.to_radians();
    Some(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw))
}

/// Entity id (unless anonymous) followed by the floor when it is above 0.
pub fn label(entity_id: &str, floor: Option<i32>) -> String {
    let mut parts = Vec::with_capacity(2);
    if entity_id != ANONYMOUS_ID {
        parts.push(entity_id.to_string());
    }
    if let Some(floor) = floor.filter(|f| *f > 0) {
        parts.push(format!("{} floor", floor));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::GeoPosition;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    /// lat -> y, lng -> x, alt -> z
    fn flat(p: &GeoPosition) -> Vector3<f64> {
        Vector3::new(p.lng, p.lat, p.alt)
    }

    type FlatFn = fn(&GeoPosition) -> Vector3<f64>;

    fn resolver() -> PoseResolver<FlatFn> {
        PoseResolver::new(AppearanceTable::default(), flat as FlatFn)
    }

    fn sample(id: &str, lat: f64, lng: f64) -> Keyframe {
        Keyframe::new(id, 0.0, GeoPosition::new(lat, lng, 2.0))
    }

    #[test]
    fn test_labels() {
        assert_eq!(label("null", Some(3)), "3 floor");
        assert_eq!(label("A1", Some(0)), "A1");
        assert_eq!(label("A1", None), "A1");
        assert_eq!(label("A1", Some(2)), "A1 2 floor");
        assert_eq!(label("null", None), "");
        assert_eq!(label("B7", Some(-1)), "B7");
    }

    #[test]
    fn test_label_scenarios_through_resolver() {
        let r = resolver();
        let anon = sample("null", 0.0, 0.0).with_floor(3);
        let pose = r.resolve("null", Activity::Unknown, &anon, None, UnitQuaternion::identity());
        assert_eq!(pose.label, "3 floor");

        let a1 = sample("A1", 0.0, 0.0).with_floor(0);
        let pose = r.resolve("A1", Activity::Unknown, &a1, None, UnitQuaternion::identity());
        assert_eq!(pose.label, "A1");
    }

    #[test]
    fn test_position_and_uncertainty() {
        let r = resolver();
        let current = sample("A1", 10.0, 20.0).with_accuracy(6.0, 2.5);
        let pose = r.resolve("A1", Activity::Walking, &current, None, UnitQuaternion::identity());

        assert_eq!(pose.position, Vector3::new(20.0, 10.0, 2.0));
        assert_eq!(pose.uncertainty_scale, Vector3::new(6.0, 6.0, 2.5));
        assert_eq!(pose.model, "person.glb");
        assert_eq!(pose.animation, Some(3));
        assert_eq!(pose.model_scale, 5.0);
    }

    #[test]
    fn test_heading_faces_next_sample() {
        let r = resolver();
        let current = sample("A1", 0.0, 0.0);

        // Default forward is +y (north); moving east is a -90 degree yaw
        let east = sample("A1", 0.0, 1.0);
        let pose = r.resolve("A1", Activity::Walking, &current, Some(&east), UnitQuaternion::identity());
        assert_relative_eq!(pose.orientation.angle(), FRAC_PI_2, epsilon = 1e-9);
        let facing = pose.orientation * Vector3::y();
        assert_relative_eq!(facing, Vector3::x(), epsilon = 1e-9);

        // Moving north needs no rotation
        let north = sample("A1", 1.0, 0.0);
        let pose = r.resolve("A1", Activity::Walking, &current, Some(&north), UnitQuaternion::identity());
        assert_relative_eq!(pose.orientation.angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_ignores_altitude_change() {
        let r = resolver();
        let current = sample("A1", 0.0, 0.0);
        let mut climb = sample("A1", 1.0, 0.0);
        climb.alt = 500.0;

        let pose = r.resolve("A1", Activity::Walking, &current, Some(&climb), UnitQuaternion::identity());
        let facing = pose.orientation * Vector3::y();
        assert_relative_eq!(facing, Vector3::y(), epsilon = 1e-9);
    }

    #[test]
    fn test_cycling_yaw_correction() {
        let r = resolver();
        let current = sample("A1", 0.0, 0.0);
        let north = sample("A1", 1.0, 0.0);

        let pose = r.resolve("A1", Activity::Cycling, &current, Some(&north), UnitQuaternion::identity());
        assert_relative_eq!(pose.orientation.angle(), PI, epsilon = 1e-9);
        let facing = pose.orientation * Vector3::y();
        assert_relative_eq!(facing, -Vector3::y(), epsilon = 1e-9);
    }

    #[test]
    fn test_orientation_held_without_next() {
        let r = resolver();
        let held = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.234);
        let current = sample("A1", 0.0, 0.0);

        let pose = r.resolve("A1", Activity::Driving, &current, None, held);
        assert_eq!(pose.orientation, held);

        // Next sample at the same horizontal spot: still held
        let same_spot = sample("A1", 0.0, 0.0);
        let pose = r.resolve("A1", Activity::Driving, &current, Some(&same_spot), held);
        assert_eq!(pose.orientation, held);
    }

    #[test]
    fn test_custom_forward_vector() {
        let appearance = Appearance::new("arrow.glb", None).with_forward(Vector3::x());
        let q = heading(&appearance, &Vector3::new(0.0, 5.0, 0.0)).unwrap();
        assert_relative_eq!(q * Vector3::x(), Vector3::y(), epsilon = 1e-9);

        // Vertical forward has no horizontal part: treated as +x
        let up = Appearance::new("balloon.glb", None).with_forward(Vector3::z());
        let q = heading(&up, &Vector3::new(0.0, 5.0, 0.0)).unwrap();
        assert_relative_eq!(q.angle(), FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_activity_reported_from_sample() {
        let r = resolver();
        let current = sample("A1", 0.0, 0.0).with_activity(Activity::Running);
        let pose = r.resolve("A1", Activity::Walking, &current, None, UnitQuaternion::identity());

        assert_eq!(pose.activity, Activity::Running);
        assert_eq!(pose.animation, Some(3));
    }
}
