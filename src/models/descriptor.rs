// Model descriptors
// What a resolved backbone hands back to the caller. Each variant keeps its own shape.

use serde::Serialize;

use super::backbone::ResNetEncoder;
use super::swav::Swav;

/// Embedding width of the SimCLR ImageNet encoder
pub const SIMCLR_EMB_SIZE: usize = 2048;

/// Number of output features (prototypes) of the SwAV ImageNet model
pub const SWAV_NUM_FEATURES: usize = 3000;

/// A loaded backbone
///
/// The shape depends on which model was requested; callers match on the variant
/// they asked for.
#[derive(Debug)]
pub enum ModelDescriptor {
    /// SimCLR: only the encoder is handed out
    Simclr {
        model: ResNetEncoder,
        emb_size: usize,
    },
    /// SwAV: the whole model, heads included
    Swav { model: Swav, num_features: usize },
}

/// Printable summary of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorSummary {
    pub model: &'static str,
    /// Name of the size field of this descriptor (`emb_size` or `num_features`)
    pub size_field: &'static str,
    pub size: usize,
    pub parameters: usize,
}

impl ModelDescriptor {
    pub fn summary(&self) -> DescriptorSummary {
        match self {
            Self::Simclr { model, emb_size } => DescriptorSummary {
                model: "simclr-imagenet",
                size_field: "emb_size",
                size: *emb_size,
                parameters: model.parameter_count(),
            },
            Self::Swav {
                model,
                num_features,
            } => DescriptorSummary {
                model: "swav-imagenet",
                size_field: "num_features",
                size: *num_features,
                parameters: model.parameter_count(),
            },
        }
    }
}
