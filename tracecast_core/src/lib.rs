//! tracecast Core - Keyframe Playback Engine
//!
//! Turns a sparse, irregularly timed stream of geolocated samples into a
//! continuous per-frame pose for every tracked entity:
//! 1. **Trace Index**: groups samples per entity and sorts them by time
//! 2. **Virtual Clock**: playback time decoupled from the host's frame clock
//! 3. **Interpolator**: linear position between the bracketing samples
//! 4. **Pose Resolver**: activity-conditioned appearance, heading, uncertainty and label
//! 5. **Playback Driver**: one session per dataset, ticked by the host's render loop
//!
//! Rendering, projection and asset loading stay with the host, behind
//! [`RenderSink`], [`GeoProjection`] and [`tracecast_env::AssetLoader`].

pub mod appearance;
pub mod assets;
pub mod clock;
pub mod dataset;
pub mod driver;
pub mod interpolator;
pub mod keyframe;
pub mod pose;
pub mod projection;
pub mod session;
pub mod trace_index;

// Re-export key types for convenience
pub use appearance::{Appearance, AppearanceTable};
pub use assets::{AssetSlot, AssetSlots, SlotCounts};
pub use clock::{PlaybackSpeed, VirtualClock};
pub use dataset::{Dataset, DatasetError};
pub use driver::PlaybackDriver;
pub use interpolator::{interpolate, Interpolated, TracePhase};
pub use keyframe::{Activity, GeoPosition, Keyframe};
pub use pose::{PoseResolver, ResolvedPose};
pub use projection::{AnchoredProjection, EquirectangularProjection, GeoProjection};
pub use session::{
    FrameInfo, PlaybackConfig, PlaybackSession, PlaybackState, RenderSink, TickReport, TimeOrigin,
};
pub use trace_index::{EntityTrace, TraceIndex};
