//! Common types for the tracecast environment abstraction.

use serde::{Deserialize, Serialize};

/// Identifier of one playback session.
///
/// Each dataset selection starts a new session with the next id. Asset results
/// tagged with an older id are stale and get dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Returns the id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// What to load for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRequest {
    /// Model file name, e.g. `person.glb`
    pub model: String,

    /// Animation clip to start playing, if the appearance has one
    pub animation: Option<usize>,
}

impl AssetRequest {
    /// Creates a new request.
    pub fn new(model: impl Into<String>, animation: Option<usize>) -> Self {
        Self {
            model: model.into(),
            animation,
        }
    }
}

impl std::fmt::Display for AssetRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.animation {
            Some(index) => write!(f, "{}#{}", self.model, index),
            None => write!(f, "{}", self.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_next() {
        let first = SessionId::default();
        assert_eq!(first.next(), SessionId(1));
        assert!(first.next() > first);
        assert_eq!(first.next().to_string(), "session-1");
    }

    #[test]
    fn test_asset_request_display() {
        assert_eq!(AssetRequest::new("person.glb", Some(3)).to_string(), "person.glb#3");
        assert_eq!(AssetRequest::new("pin.gltf", None).to_string(), "pin.gltf");
    }
}
