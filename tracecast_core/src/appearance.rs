//! Activity-conditioned appearance: which model, clip, scale and heading
//! convention an entity is rendered with.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracecast_env::AssetRequest;

use crate::keyframe::Activity;

/// How one activity is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Model file name handed to the asset loader
    pub model: String,

    /// Animation clip index to play, if any
    pub animation: Option<usize>,

    /// Direction the model faces at identity rotation, in local coordinates.
    /// Only the horizontal part is used for heading.
    pub forward: Vector3<f64>,

    /// Uniform model scale
    pub scale: f64,

    /// Extra yaw applied after heading alignment, in degrees
    pub yaw_correction_deg: f64,
}

impl Appearance {
    pub fn new(model: impl Into<String>, animation: Option<usize>) -> Self {
        Self {
            model: model.into(),
            animation,
            forward: Vector3::y(),
            scale: 5.0,
            yaw_correction_deg: 0.0,
        }
    }

    pub fn with_yaw_correction(mut self, degrees: f64) -> Self {
        self.yaw_correction_deg = degrees;
        self
    }

    pub fn with_forward(mut self, forward: Vector3<f64>) -> Self {
        self.forward = forward;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn asset_request(&self) -> AssetRequest {
        AssetRequest::new(self.model.clone(), self.animation)
    }
}

/// One appearance per activity. Every activity has an entry by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceTable {
    pub unknown: Appearance,
    pub walking: Appearance,
    pub running: Appearance,
    pub cycling: Appearance,
    pub driving: Appearance,
}

impl AppearanceTable {
    pub fn get(&self, activity: Activity) -> &Appearance {
        match activity {
            Activity::Unknown => &self.unknown,
            Activity::Walking => &self.walking,
            Activity::Running => &self.running,
            Activity::Cycling => &self.cycling,
            Activity::Driving => &self.driving,
        }
    }

    pub fn get_mut(&mut self, activity: Activity) -> &mut Appearance {
        match activity {
            Activity::Unknown => &mut self.unknown,
            Activity::Walking => &mut self.walking,
            Activity::Running => &mut self.running,
            Activity::Cycling => &mut self.cycling,
            Activity::Driving => &mut self.driving,
        }
    }

    pub fn set(&mut self, activity: Activity, appearance: Appearance) {
        *self.get_mut(activity) = appearance;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Activity, &Appearance)> {
        Activity::ALL.into_iter().map(move |activity| (activity, self.get(activity)))
    }
}

impl Default for AppearanceTable {
    fn default() -> Self {
        Self {
            unknown: Appearance::new("person.glb", Some(0)),
            walking: Appearance::new("person.glb", Some(3)),
            running: Appearance::new("person.glb", Some(4)),
            // The pin model is authored facing backwards
            cycling: Appearance::new("pin.gltf", None).with_yaw_correction(180.0),
            driving: Appearance::new("pin.gltf", None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = AppearanceTable::default();

        assert_eq!(table.get(Activity::Walking).model, "person.glb");
        assert_eq!(table.get(Activity::Walking).animation, Some(3));
        assert_eq!(table.get(Activity::Running).animation, Some(4));
        assert_eq!(table.get(Activity::Unknown).animation, Some(0));
        assert_eq!(table.get(Activity::Cycling).model, "pin.gltf");
        assert_eq!(table.get(Activity::Driving).animation, None);
        assert_eq!(table.get(Activity::Cycling).yaw_correction_deg, 180.0);
        assert_eq!(table.get(Activity::Driving).yaw_correction_deg, 0.0);
    }

    #[test]
    fn test_every_activity_is_covered() {
        let table = AppearanceTable::default();
        let activities: Vec<Activity> = table.iter().map(|(activity, _)| activity).collect();
        assert_eq!(activities, Activity::ALL.to_vec());
    }

    #[test]
    fn test_override_one_activity() {
        let mut table = AppearanceTable::default();
        table.set(Activity::Driving, Appearance::new("car.glb", Some(1)).with_scale(2.0));

        assert_eq!(table.get(Activity::Driving).model, "car.glb");
        assert_eq!(table.get(Activity::Driving).scale, 2.0);
        assert_eq!(table.get(Activity::Cycling).model, "pin.gltf");
    }

    #[test]
    fn test_asset_request() {
        let table = AppearanceTable::default();
        let request = table.get(Activity::Running).asset_request();
        assert_eq!(request, AssetRequest::new("person.glb", Some(4)));
    }
}
