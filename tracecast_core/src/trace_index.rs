//! Trace Index - groups a flat sample stream into per-entity trajectories.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::keyframe::{GeoPosition, Keyframe};

/// The time-ordered samples of one entity.
///
/// Never empty: a trace only exists once its entity has been seen.
#[derive(Debug, Clone, Serialize)]
pub struct EntityTrace {
    entity_id: String,

    /// Samples sorted by timestamp (stable, so ties keep input order)
    samples: Vec<Keyframe>,

    /// The first sample seen in input order; drives asset selection
    first_seen: Keyframe,
}

impl EntityTrace {
    fn from_samples(entity_id: String, mut samples: Vec<Keyframe>) -> Self {
        let first_seen = samples[0].clone();
        samples.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self {
            entity_id,
            samples,
            first_seen,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn samples(&self) -> &[Keyframe] {
        &self.samples
    }

    pub fn first_seen(&self) -> &Keyframe {
        &self.first_seen
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn start_time(&self) -> f64 {
        self.samples[0].timestamp
    }

    pub fn end_time(&self) -> f64 {
        self.samples[self.samples.len() - 1].timestamp
    }
}

/// Per-entity traces for one playback session. Immutable once built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceIndex {
    traces: BTreeMap<String, EntityTrace>,
    sample_count: usize,
    centroid: Option<GeoPosition>,
    time_span: Option<(f64, f64)>,
}

impl TraceIndex {
    /// Groups `samples` by entity id. An empty input gives an empty index.
    pub fn build(samples: &[Keyframe]) -> Self {
        let mut grouped: BTreeMap<String, Vec<Keyframe>> = BTreeMap::new();
        for sample in samples {
            grouped
                .entry(sample.entity_id.clone())
                .or_default()
                .push(sample.clone());
        }

        let traces: BTreeMap<String, EntityTrace> = grouped
            .into_iter()
            .map(|(id, samples)| (id.clone(), EntityTrace::from_samples(id, samples)))
            .collect();
        let time_span = span_of(traces.values());

        Self {
            traces,
            sample_count: samples.len(),
            centroid: mean_position(samples),
            time_span,
        }
    }

    pub fn get(&self, entity_id: &str) -> Option<&EntityTrace> {
        self.traces.get(entity_id)
    }

    /// The first sample seen for an entity.
    pub fn first_sample(&self, entity_id: &str) -> Option<&Keyframe> {
        self.traces.get(entity_id).map(EntityTrace::first_seen)
    }

    /// Traces in entity id order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityTrace> {
        self.traces.values()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.traces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Mean lat/lng over every sample; the natural map center. Altitude is 0.
    pub fn centroid(&self) -> Option<GeoPosition> {
        self.centroid
    }

    /// Earliest and latest timestamp across all entities.
    pub fn time_span(&self) -> Option<(f64, f64)> {
        self.time_span
    }
}

fn span_of<'a>(traces: impl Iterator<Item = &'a EntityTrace>) -> Option<(f64, f64)> {
    traces.fold(None, |span, trace| {
        let (start, end) = (trace.start_time(), trace.end_time());
        Some(match span {
            Some((lo, hi)) => (f64::min(lo, start), f64::max(hi, end)),
            None => (start, end),
        })
    })
}

fn mean_position(samples: &[Keyframe]) -> Option<GeoPosition> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let (lat, lng) = samples
        .iter()
        .fold((0.0, 0.0), |(lat, lng), kf| (lat + kf.lat, lng + kf.lng));
    Some(GeoPosition::new(lat / n, lng / n, 0.0))
}
