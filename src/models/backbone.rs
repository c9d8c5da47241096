// ResNet-50 trunk shared by the SimCLR and SwAV models
// The architecture comes from candle-transformers, compiled in with the `pretrained` feature.

use candle_core::{Module, Tensor};
use candle_nn::{Func, VarBuilder};
use std::fmt;

/// Width of the pooled ResNet-50 features
pub const RESNET50_FEATURES: usize = 2048;

/// ResNet-50 without its classification layer: images (N, 3, H, W) → features (N, 2048)
#[derive(Clone)]
pub struct ResNetEncoder {
    trunk: Func<'static>,
    parameters: usize,
}

impl ResNetEncoder {
    /// Build the trunk under `vb` (torchvision parameter names: `conv1`, `bn1`, `layer1.0.conv1`, ...)
    #[cfg(feature = "pretrained")]
    pub fn new(vb: VarBuilder<'static>) -> candle_core::Result<Self> {
        let trunk = candle_transformers::models::resnet::resnet50_no_final_layer(vb)?;
        Ok(Self {
            trunk,
            parameters: 0,
        })
    }

    #[cfg(not(feature = "pretrained"))]
    pub fn new(_vb: VarBuilder<'static>) -> candle_core::Result<Self> {
        candle_core::bail!("ResNet-50 requires the `pretrained` feature")
    }

    /// Record the trunk's parameter count once its variables exist
    pub(crate) fn with_parameter_count(mut self, parameters: usize) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters
    }
}

impl Module for ResNetEncoder {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.trunk.forward(xs)
    }
}

impl fmt::Debug for ResNetEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResNetEncoder")
            .field("output_dim", &RESNET50_FEATURES)
            .field("parameters", &self.parameters)
            .finish()
    }
}
