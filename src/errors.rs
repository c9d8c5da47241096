// Error types
//
// Two families:
// - MisconfigurationError: the resolver's own preconditions (zoo missing, unknown name)
// - CheckpointError: anything the checkpoint loaders hit while fetching or applying weights
//
// The resolver never wraps a CheckpointError; callers can downcast the anyhow error
// they receive and see exactly what the loader reported.

use std::path::PathBuf;
use thiserror::Error;

/// The resolver was asked for something it cannot serve in this build or by this name
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MisconfigurationError {
    /// Pretrained architectures were not compiled in
    #[error(
        "Pretrained backbones aren't available. Please, rebuild with ``cargo build --features pretrained``."
    )]
    MissingDependency,

    /// Name is not one of the supported model kinds
    #[error("Currently, only `simclr-imagenet` and `swav-imagenet` are supported.")]
    UnknownModel { name: String },
}

/// Failure while fetching, reading or applying a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to fetch checkpoint from {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Checkpoint request to {url} returned HTTP {status}")]
    Http {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("I/O error on checkpoint {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read checkpoint {location}")]
    Read {
        location: String,
        #[source]
        source: candle_core::Error,
    },

    #[error("Size mismatch for {name}: checkpoint has {found:?}, model expects {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error(
        "Error(s) in loading state dict: missing keys {missing:?}, unexpected keys {unexpected:?}"
    )]
    StrictMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Building the architecture or moving tensors failed
    #[error(transparent)]
    Model(#[from] candle_core::Error),
}

impl CheckpointError {
    /// True for failures reaching the checkpoint (network, HTTP status, filesystem)
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Http { .. } | Self::Io { .. })
    }
}
