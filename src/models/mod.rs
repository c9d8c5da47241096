// Models module
// Backbone architectures, checkpoint fetching/loading and the descriptors handed to callers

pub mod backbone;
pub mod checkpoint;
pub mod descriptor;
pub mod download;
pub mod simclr;
pub mod swav;

pub use backbone::{ResNetEncoder, RESNET50_FEATURES};
pub use checkpoint::{
    apply_state_dict, parameter_count, read_state_dict, CheckpointFormat, LoadContext, LoadReport,
    StateDict,
};
pub use descriptor::{DescriptorSummary, ModelDescriptor, SIMCLR_EMB_SIZE, SWAV_NUM_FEATURES};
pub use download::{fetch, CheckpointSource, FetchedCheckpoint};
pub use simclr::SimClr;
pub use swav::{Swav, SwavOutput, NUM_PROTOTYPES};
