//! Asset slots - per-entity load state for a playback session.
//!
//! Loads are fired once per entity at session start. Their results arrive
//! asynchronously as [`AssetResult`]s over a channel owned by the requesting
//! session and are folded into the arena at the start of each tick.

use std::collections::HashMap;

use tracecast_env::EnvError;
use tracing::{debug, warn};

/// Load state of one entity's asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetSlot<A> {
    Pending,
    Ready(A),
    /// Terminal; the entity is never rendered
    Failed(String),
}

impl<A> AssetSlot<A> {
    pub fn is_pending(&self) -> bool {
        matches!(self, AssetSlot::Pending)
    }

    pub fn ready(&self) -> Option<&A> {
        match self {
            AssetSlot::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

/// A completed load, delivered back to the session that spawned it.
#[derive(Debug)]
pub struct AssetResult<A> {
    pub slot: usize,
    pub result: Result<A, EnvError>,
}

/// Slot counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounts {
    pub pending: usize,
    pub ready: usize,
    pub failed: usize,
}

/// Arena of asset slots indexed by entity id.
#[derive(Debug)]
pub struct AssetSlots<A> {
    slots: Vec<AssetSlot<A>>,
    index: HashMap<String, usize>,
}

impl<A> AssetSlots<A> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds a pending slot for `entity_id` and returns its index.
    ///
    /// Registering an id twice returns the existing slot.
    pub fn register(&mut self, entity_id: &str) -> usize {
        if let Some(&slot) = self.index.get(entity_id) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.push(AssetSlot::Pending);
        self.index.insert(entity_id.to_string(), slot);
        slot
    }

    pub fn slot_index(&self, entity_id: &str) -> Option<usize> {
        self.index.get(entity_id).copied()
    }

    pub fn get(&self, entity_id: &str) -> Option<&AssetSlot<A>> {
        self.slot_index(entity_id).map(|slot| &self.slots[slot])
    }

    /// The loaded asset for `entity_id`, if its slot is ready.
    pub fn ready(&self, entity_id: &str) -> Option<&A> {
        self.get(entity_id).and_then(AssetSlot::ready)
    }

    /// Stores a load result. Only a pending slot transitions; returns whether
    /// the slot changed.
    pub fn resolve(&mut self, slot: usize, result: Result<A, EnvError>) -> bool {
        let Some(entry) = self.slots.get_mut(slot) else {
            warn!("Asset result for unknown slot {}", slot);
            return false;
        };
        if !entry.is_pending() {
            debug!("Ignoring duplicate asset result for slot {}", slot);
            return false;
        }

        *entry = match result {
            Ok(asset) => {
                debug!("Asset slot {} ready", slot);
                AssetSlot::Ready(asset)
            }
            Err(e) => {
                warn!("Asset slot {} failed: {}", slot, e);
                AssetSlot::Failed(e.to_string())
            }
        };
        true
    }

    pub fn counts(&self) -> SlotCounts {
        self.slots.iter().fold(SlotCounts::default(), |mut counts, slot| {
            match slot {
                AssetSlot::Pending => counts.pending += 1,
                AssetSlot::Ready(_) => counts.ready += 1,
                AssetSlot::Failed(_) => counts.failed += 1,
            }
            counts
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<A> Default for AssetSlots<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let mut slots: AssetSlots<&str> = AssetSlots::new();
        let a = slots.register("A");
        let b = slots.register("B");

        assert_ne!(a, b);
        assert_eq!(slots.register("A"), a);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.get("A"), Some(&AssetSlot::Pending));
        assert!(slots.get("missing").is_none());
    }

    #[test]
    fn test_pending_to_ready() {
        let mut slots = AssetSlots::new();
        let a = slots.register("A");

        assert!(slots.ready("A").is_none());
        assert!(slots.resolve(a, Ok("person.glb")));
        assert_eq!(slots.ready("A"), Some(&"person.glb"));
    }

    #[test]
    fn test_failed_slot_is_terminal() {
        let mut slots: AssetSlots<&str> = AssetSlots::new();
        let a = slots.register("A");

        assert!(slots.resolve(a, Err(EnvError::not_found("pin.gltf"))));
        assert!(matches!(slots.get("A"), Some(AssetSlot::Failed(_))));

        // A late success does not revive it
        assert!(!slots.resolve(a, Ok("pin.gltf")));
        assert!(slots.ready("A").is_none());
    }

    #[test]
    fn test_unknown_slot_is_ignored() {
        let mut slots: AssetSlots<u32> = AssetSlots::new();
        assert!(!slots.resolve(7, Ok(1)));
    }

    #[test]
    fn test_counts() {
        let mut slots = AssetSlots::new();
        let a = slots.register("A");
        let b = slots.register("B");
        slots.register("C");

        slots.resolve(a, Ok(1));
        slots.resolve(b, Err(EnvError::asset_load("corrupt")));

        assert_eq!(
            slots.counts(),
            SlotCounts {
                pending: 1,
                ready: 1,
                failed: 1
            }
        );
    }
}
