//! Error types for the simulation harness.

use thiserror::Error;
use tracecast_core::DatasetError;

/// Errors that stop a run before it produces a result.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Runtime construction or export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to play: the playlist is empty")]
    EmptyPlaylist,
}
