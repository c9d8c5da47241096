// SimCLR - contrastive ResNet-50 encoder with an MLP projection head
// Parameter layout follows the Lightning module: `encoder.*` and `projection.model.{0,1,3}`

use candle_core::{DType, Module, ModuleT, Tensor};
use candle_nn::{batch_norm, linear, linear_no_bias, BatchNorm, Linear, VarBuilder, VarMap};

use super::backbone::{ResNetEncoder, RESNET50_FEATURES};
use super::checkpoint::{
    apply_state_dict, parameter_count, parameter_count_under, read_state_dict, LoadContext,
};
use super::download::CheckpointSource;
use crate::errors::CheckpointError;

const PROJECTION_HIDDEN: usize = 2048;
const PROJECTION_OUT: usize = 128;

/// Linear → BatchNorm1d → ReLU → Linear (no bias)
struct Projection {
    fc1: Linear,
    bn: BatchNorm,
    fc2: Linear,
}

impl Projection {
    fn new(vb: VarBuilder) -> candle_core::Result<Self> {
        // Index 2 is the ReLU, which has no parameters
        Ok(Self {
            fc1: linear(RESNET50_FEATURES, PROJECTION_HIDDEN, vb.pp("0"))?,
            bn: batch_norm(PROJECTION_HIDDEN, 1e-5, vb.pp("1"))?,
            fc2: linear_no_bias(PROJECTION_HIDDEN, PROJECTION_OUT, vb.pp("3"))?,
        })
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.fc1.forward(xs)?;
        let xs = self.bn.forward_t(&xs, false)?.relu()?;
        self.fc2.forward(&xs)
    }
}

/// SimCLR model
pub struct SimClr {
    encoder: ResNetEncoder,
    projection: Projection,
    varmap: VarMap,
    parameters: usize,
}

impl SimClr {
    /// Create with random initialization
    pub fn new(ctx: &LoadContext) -> Result<Self, CheckpointError> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &ctx.device);

        let encoder = ResNetEncoder::new(vb.pp("encoder"))?
            .with_parameter_count(parameter_count_under(&varmap, "encoder"));
        let projection = Projection::new(vb.pp("projection").pp("model"))?;
        let parameters = parameter_count(&varmap);

        Ok(Self {
            encoder,
            projection,
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
        tracing::info!("Loading SimCLR from {} (strict: {})", source, strict);

        let state = read_state_dict(source, ctx)?;
        let model = Self::new(ctx)?;
        let report = apply_state_dict(&model.varmap, state, strict, &ctx.device)?;

        tracing::info!(
            "✓ SimCLR loaded: {} tensors applied, {} missing, {} unexpected",
            report.loaded,
            report.missing.len(),
            report.unexpected.len()
        );

        Ok(model)
    }

    /// Backbone that produces the 2048-d representation
    pub fn encoder(&self) -> &ResNetEncoder {
        &self.encoder
    }

    /// Consume the model, keeping only the encoder
    pub fn into_encoder(self) -> ResNetEncoder {
        self.encoder
    }

    /// Contrastive projection of the encoder output (N, 128)
    pub fn project(&self, features: &Tensor) -> candle_core::Result<Tensor> {
        self.projection.forward(features)
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters
    }
}

impl Module for SimClr {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let features = self.encoder.forward(xs)?;
        self.project(&features)
    }
}

#[cfg(all(test, feature = "pretrained"))]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_layout() {
        let model = SimClr::new(&LoadContext::cpu()).unwrap();
        let data = model.varmap().data().lock().unwrap();

        assert!(data.contains_key("encoder.conv1.weight"));
        assert!(data.contains_key("encoder.layer4.2.bn3.running_var"));
        assert!(data.contains_key("projection.model.0.weight"));
        assert!(data.contains_key("projection.model.1.running_mean"));
        assert!(data.contains_key("projection.model.3.weight"));
        assert!(!data.contains_key("projection.model.3.bias"));
        assert!(!data.keys().any(|k| k.starts_with("encoder.fc")));
    }

    #[test]
    fn test_forward_shapes() -> anyhow::Result<()> {
        let model = SimClr::new(&LoadContext::cpu())?;
        let images = Tensor::zeros((1, 3, 64, 64), DType::F32, &candle_core::Device::Cpu)?;

        let features = model.encoder().forward(&images)?;
        assert_eq!(features.dims(), &[1, 2048]);

        let projected = model.forward(&images)?;
        assert_eq!(projected.dims(), &[1, 128]);
        Ok(())
    }

    #[test]
    fn test_encoder_parameter_count() {
        let model = SimClr::new(&LoadContext::cpu()).unwrap();
        let encoder = model.encoder().parameter_count();
        // ResNet-50 trunk: ~23.5M weights plus batch-norm statistics
        assert!(encoder > 23_000_000 && encoder < 24_000_000, "{}", encoder);
        assert!(model.parameter_count() > encoder);
    }
}
