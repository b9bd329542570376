//! Keyframe samples - the raw input of the playback engine.
//!
//! A keyframe is one timestamped, geolocated observation of one entity.
//! Records come from recorded datasets and are parsed leniently: optional
//! fields fall back to documented defaults instead of rejecting the sample.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity id used by recordings for samples that belong to nobody in particular.
pub const ANONYMOUS_ID: &str = "null";

/// What the tracked entity was doing when the sample was taken.
///
/// Closed set. Unrecognized values parse as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Activity {
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "walking")]
    Walking,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "cycling")]
    Cycling,
    #[serde(rename = "driving")]
    Driving,
}

impl Activity {
    /// Every activity, in declaration order.
    pub const ALL: [Activity; 5] = [
        Activity::Unknown,
        Activity::Walking,
        Activity::Running,
        Activity::Cycling,
        Activity::Driving,
    ];

    /// Returns the name used in recordings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Unknown => "UNKNOWN",
            Activity::Walking => "walking",
            Activity::Running => "running",
            Activity::Cycling => "cycling",
            Activity::Driving => "driving",
        }
    }

    /// Parses a recorded activity name, falling back to `Unknown`.
    pub fn from_wire(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Activity::Unknown),
            "walking" => Ok(Activity::Walking),
            "running" => Ok(Activity::Running),
            "cycling" => Ok(Activity::Cycling),
            "driving" => Ok(Activity::Driving),
            _ => Err(format!("Unknown activity: {}", s)),
        }
    }
}

impl<'de> Deserialize<'de> for Activity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Activity::from_wire).unwrap_or_default())
    }
}

/// A geographic position: degrees, degrees, altitude units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
}

impl GeoPosition {
    pub fn new(lat: f64, lng: f64, alt: f64) -> Self {
        Self { lat, lng, alt }
    }

    /// Component-wise linear interpolation. `ratio` 0 gives `self`, 1 gives `other`.
    pub fn lerp(&self, other: &GeoPosition, ratio: f64) -> GeoPosition {
        GeoPosition {
            lat: self.lat + (other.lat - self.lat) * ratio,
            lng: self.lng + (other.lng - self.lng) * ratio,
            alt: self.alt + (other.alt - self.alt) * ratio,
        }
    }
}

/// One recorded sample of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    /// Entity identifier; `"null"` marks an anonymous entity
    #[serde(rename = "id", alias = "entityId")]
    pub entity_id: String,

    /// Latitude in degrees
    pub lat: f64,

    /// Longitude in degrees
    pub lng: f64,

    /// Altitude
    #[serde(default)]
    pub alt: f64,

    /// Sample time in milliseconds
    pub timestamp: f64,

    /// Building floor; `None` when not applicable
    #[serde(default, deserialize_with = "deserialize_floor")]
    pub floor: Option<i32>,

    /// Horizontal uncertainty radius
    #[serde(default)]
    pub hor_acc: f64,

    /// Vertical uncertainty radius
    #[serde(default)]
    pub ver_acc: f64,

    /// Informational only
    #[serde(default)]
    pub loc_acc_confidence: f64,

    #[serde(default)]
    pub activity: Activity,
}

impl Keyframe {
    /// Creates a sample with no floor, zero accuracy and `Unknown` activity.
    pub fn new(entity_id: impl Into<String>, timestamp: f64, position: GeoPosition) -> Self {
        Self {
            entity_id: entity_id.into(),
            lat: position.lat,
            lng: position.lng,
            alt: position.alt,
            timestamp,
            floor: None,
            hor_acc: 0.0,
            ver_acc: 0.0,
            loc_acc_confidence: 0.0,
            activity: Activity::Unknown,
        }
    }

    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_floor(mut self, floor: i32) -> Self {
        self.floor = normalize_floor(floor);
        self
    }

    pub fn with_accuracy(mut self, hor_acc: f64, ver_acc: f64) -> Self {
        self.hor_acc = hor_acc;
        self.ver_acc = ver_acc;
        self
    }

    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.lat, self.lng, self.alt)
    }

    /// Returns a copy of this sample moved to `position`.
    pub fn at_position(&self, position: GeoPosition) -> Keyframe {
        Keyframe {
            lat: position.lat,
            lng: position.lng,
            alt: position.alt,
            ..self.clone()
        }
    }

    /// True for samples recorded without an entity id.
    pub fn is_anonymous(&self) -> bool {
        self.entity_id == ANONYMOUS_ID
    }
}

fn normalize_floor(floor: i32) -> Option<i32> {
    (floor != 0).then_some(floor)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFloor {
    Number(f64),
    Text(String),
}

/// Floors are recorded as a number, `null`, or the string `"null"`.
fn deserialize_floor<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    let floor = match Option::<RawFloor>::deserialize(deserializer)? {
        Some(RawFloor::Number(n)) if n.is_finite() => normalize_floor(n.round() as i32),
        Some(RawFloor::Text(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .and_then(|n| normalize_floor(n.round() as i32)),
        _ => None,
    };
    Ok(floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_full_record_parsing() {
        let json = r#"{
            "lat": 51.5, "lng": -0.12, "alt": 12.5, "id": "dev1",
            "timestamp": 1500, "floor": 2, "horAcc": 4.0, "verAcc": 1.5,
            "locAccConfidence": 0.68, "activity": "walking"
        }"#;
        let kf: Keyframe = serde_json::from_str(json).unwrap();

        assert_eq!(kf.entity_id, "dev1");
        assert_eq!(kf.floor, Some(2));
        assert_eq!(kf.activity, Activity::Walking);
        assert_relative_eq!(kf.hor_acc, 4.0);
        assert_relative_eq!(kf.loc_acc_confidence, 0.68);
    }

    #[test]
    fn test_missing_optional_fields_take_defaults() {
        let json = r#"{"id": "A1", "lat": 1.0, "lng": 2.0, "timestamp": 0}"#;
        let kf: Keyframe = serde_json::from_str(json).unwrap();

        assert_eq!(kf.floor, None);
        assert_eq!(kf.activity, Activity::Unknown);
        assert_eq!(kf.alt, 0.0);
        assert_eq!(kf.hor_acc, 0.0);
    }

    #[test]
    fn test_floor_variants() {
        let parse = |floor: &str| -> Option<i32> {
            let json = format!(r#"{{"id": "x", "lat": 0, "lng": 0, "timestamp": 0, "floor": {}}}"#, floor);
            serde_json::from_str::<Keyframe>(&json).unwrap().floor
        };

        assert_eq!(parse(r#""null""#), None);
        assert_eq!(parse("null"), None);
        assert_eq!(parse("0"), None);
        assert_eq!(parse("3"), Some(3));
        assert_eq!(parse(r#""4""#), Some(4));
        assert_eq!(parse("-1"), Some(-1));
    }

    #[test]
    fn test_unrecognized_activity_is_unknown() {
        let json = r#"{"id": "x", "lat": 0, "lng": 0, "timestamp": 0, "activity": "flying"}"#;
        let kf: Keyframe = serde_json::from_str(json).unwrap();
        assert_eq!(kf.activity, Activity::Unknown);

        let json = r#"{"id": "x", "lat": 0, "lng": 0, "timestamp": 0, "activity": 7}"#;
        let kf: Keyframe = serde_json::from_str(json).unwrap();
        assert_eq!(kf.activity, Activity::Unknown);
    }

    #[test]
    fn test_activity_names_round_trip() {
        for activity in Activity::ALL {
            assert_eq!(Activity::from_wire(activity.as_str()), activity);
        }
        assert_eq!("Cycling".parse::<Activity>(), Ok(Activity::Cycling));
        assert!("skating".parse::<Activity>().is_err());
    }

    #[test]
    fn test_geo_lerp() {
        let a = GeoPosition::new(0.0, 0.0, 0.0);
        let b = GeoPosition::new(10.0, -20.0, 4.0);
        let mid = a.lerp(&b, 0.25);

        assert_relative_eq!(mid.lat, 2.5);
        assert_relative_eq!(mid.lng, -5.0);
        assert_relative_eq!(mid.alt, 1.0);
    }

    #[test]
    fn test_anonymous_sentinel() {
        let kf = Keyframe::new(ANONYMOUS_ID, 0.0, GeoPosition::default());
        assert!(kf.is_anonymous());
        assert!(!Keyframe::new("A1", 0.0, GeoPosition::default()).is_anonymous());
    }
}
