// Configuration structs

use serde::{Deserialize, Serialize};

use super::backend::BackendDevice;

/// Public bucket hosting the pretrained self-supervised checkpoints
pub const ROOT_S3_BUCKET: &str = "https://pl-bolts-weights.s3.us-east-2.amazonaws.com";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZooConfig {
    /// Base URL (or directory) the default checkpoint paths are appended to
    pub storage_root: String,

    /// Device the loaded weights are placed on
    pub device: BackendDevice,

    /// Draw a progress bar while downloading remote checkpoints
    pub show_progress: bool,
}

impl Default for ZooConfig {
    fn default() -> Self {
        Self {
            storage_root: ROOT_S3_BUCKET.to_string(),
            device: BackendDevice::Auto,
            show_progress: true,
        }
    }
}

