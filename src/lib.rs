// ssl-backbones - Self-supervised vision backbones by name
// Library exports

pub mod config;
pub mod errors;
pub mod models;
pub mod resolver;

pub use errors::{CheckpointError, MisconfigurationError};
pub use models::{DescriptorSummary, ModelDescriptor};
pub use resolver::{
    load_simclr_imagenet, load_swav_imagenet, resolve, ModelKind, ModelResolver,
    PRETRAINED_AVAILABLE,
};
