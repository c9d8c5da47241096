// SwAV - ResNet-50 with projection head and learnable prototypes
// Parameter layout follows the Lightning module, everything under `model.*`:
// trunk (`model.conv1`, `model.layer1..4`), `model.projection_head.{0,1,3}`, `model.prototypes`

use candle_core::{DType, Module, ModuleT, Tensor};
use candle_nn::{batch_norm, linear, linear_no_bias, BatchNorm, Linear, VarBuilder, VarMap};
use std::fmt;

use super::backbone::{ResNetEncoder, RESNET50_FEATURES};
use super::checkpoint::{
    apply_state_dict, parameter_count, parameter_count_under, read_state_dict, LoadContext,
};
use super::download::CheckpointSource;
use crate::errors::CheckpointError;

const HIDDEN_MLP: usize = 2048;
const OUTPUT_DIM: usize = 128;

/// Number of prototypes (cluster centres) in the ImageNet SwAV model
pub const NUM_PROTOTYPES: usize = 3000;

/// Output of a SwAV forward pass
#[derive(Debug)]
pub struct SwavOutput {
    /// L2-normalised projection (N, 128)
    pub embedding: Tensor,
    /// Similarity to each prototype (N, 3000)
    pub prototype_scores: Tensor,
}

/// SwAV model
pub struct Swav {
    trunk: ResNetEncoder,
    fc1: Linear,
    bn: BatchNorm,
    fc2: Linear,
    prototypes: Linear,
    varmap: VarMap,
    parameters: usize,
}

impl Swav {
    /// Create with random initialization
    pub fn new(ctx: &LoadContext) -> Result<Self, CheckpointError> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &ctx.device).pp("model");

        let trunk = ResNetEncoder::new(vb.clone())?;
        let head = vb.pp("projection_head");
        let fc1 = linear(RESNET50_FEATURES, HIDDEN_MLP, head.pp("0"))?;
        let bn = batch_norm(HIDDEN_MLP, 1e-5, head.pp("1"))?;
        let fc2 = linear(HIDDEN_MLP, OUTPUT_DIM, head.pp("3"))?;
        let prototypes = linear_no_bias(OUTPUT_DIM, NUM_PROTOTYPES, vb.pp("prototypes"))?;

        let parameters = parameter_count(&varmap);
        let trunk_parameters = parameters
            - parameter_count_under(&varmap, "model.projection_head")
            - parameter_count_under(&varmap, "model.prototypes");
        let trunk = trunk.with_parameter_count(trunk_parameters);

        Ok(Self {
            trunk,
            fc1,
            bn,
            fc2,
            prototypes,
            varmap,
            parameters,
        })
    }

    /// Build the model and overwrite its weights from a checkpoint
    pub fn load_from_checkpoint(
        source: &CheckpointSource,
        strict: bool,
        ctx: &LoadContext,
    ) -> Result<Self, CheckpointError> {
        tracing::info!("Loading SwAV from {} (strict: {})", source, strict);

        let state = read_state_dict(source, ctx)?;
        let model = Self::new(ctx)?;
        let report = apply_state_dict(&model.varmap, state, strict, &ctx.device)?;

        tracing::info!("✓ SwAV loaded: {} tensors applied", report.loaded);

        Ok(model)
    }

    /// Images → pooled ResNet-50 features (N, 2048)
    pub fn features(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.trunk.forward(xs)
    }

    /// Images → normalised embedding and prototype scores
    pub fn forward_all(&self, xs: &Tensor) -> candle_core::Result<SwavOutput> {
        let features = self.features(xs)?;

        let hidden = self.fc1.forward(&features)?;
        let hidden = self.bn.forward_t(&hidden, false)?.relu()?;
        let projected = self.fc2.forward(&hidden)?;

        let norm = projected.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12f32, f32::MAX)?;
        let embedding = projected.broadcast_div(&norm)?;
        let prototype_scores = self.prototypes.forward(&embedding)?;

        Ok(SwavOutput {
            embedding,
            prototype_scores,
        })
    }

    pub fn num_prototypes(&self) -> usize {
        NUM_PROTOTYPES
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters
    }
}

/// The module output is the prototype scores, matching the Lightning model's head
impl Module for Swav {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        Ok(self.forward_all(xs)?.prototype_scores)
    }
}

impl fmt::Debug for Swav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Swav")
            .field("trunk", &self.trunk)
            .field("num_prototypes", &NUM_PROTOTYPES)
            .field("parameters", &self.parameters)
            .finish()
    }
}
