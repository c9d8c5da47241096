// Model Resolver - name → pretrained self-supervised backbone
//
// Resolution order:
// 1. Pretrained architectures compiled in? (checked once per process)
// 2. Name is one of the supported model kinds?
// 3. Load the kind's default checkpoint and wrap it into its descriptor
//
// Nothing is cached: every call fetches and loads the checkpoint again.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::ZooConfig;
use crate::errors::{CheckpointError, MisconfigurationError};
use crate::models::{
    CheckpointSource, LoadContext, ModelDescriptor, SimClr, Swav, SIMCLR_EMB_SIZE,
    SWAV_NUM_FEATURES,
};

/// Whether the pretrained architectures were compiled in (`pretrained` feature)
pub static PRETRAINED_AVAILABLE: Lazy<bool> = Lazy::new(|| {
    let available = cfg!(feature = "pretrained");
    tracing::debug!("Pretrained backbones available: {}", available);
    available
});

/// Backs the free functions: public bucket, auto device, no progress bar
static DEFAULT_RESOLVER: Lazy<ModelResolver> = Lazy::new(|| {
    ModelResolver::from_config(ZooConfig {
        show_progress: false,
        ..ZooConfig::default()
    })
});

/// Supported backbones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// SimCLR ResNet-50 trained on ImageNet
    SimclrImagenet,
    /// SwAV ResNet-50 trained on ImageNet
    SwavImagenet,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::SimclrImagenet, ModelKind::SwavImagenet];

    /// Name used to request this model
    pub fn name(&self) -> &'static str {
        match self {
            Self::SimclrImagenet => "simclr-imagenet",
            Self::SwavImagenet => "swav-imagenet",
        }
    }

    /// Checkpoint path relative to the storage root
    fn checkpoint_path(&self) -> &'static str {
        match self {
            Self::SimclrImagenet => "simclr/bolts_simclr_imagenet/simclr_imagenet.ckpt",
            Self::SwavImagenet => "swav/swav_imagenet/swav_imagenet.pth.tar",
        }
    }

    /// Checkpoint location used when no override is given
    pub fn default_source(&self, storage_root: &str) -> String {
        format!(
            "{}/{}",
            storage_root.trim_end_matches('/'),
            self.checkpoint_path()
        )
    }

    /// Whether checkpoint keys must match the model's parameters exactly
    pub fn strict_loading(&self) -> bool {
        match self {
            Self::SimclrImagenet => false,
            Self::SwavImagenet => true,
        }
    }

    /// The size reported in this kind's descriptor
    pub fn output_size(&self) -> usize {
        match self {
            Self::SimclrImagenet => SIMCLR_EMB_SIZE,
            Self::SwavImagenet => SWAV_NUM_FEATURES,
        }
    }

    /// Load the model from `source` and wrap it into this kind's descriptor
    pub fn load(
        &self,
        source: &CheckpointSource,
        ctx: &LoadContext,
    ) -> Result<ModelDescriptor, CheckpointError> {
        let strict = self.strict_loading();
        match self {
            Self::SimclrImagenet => {
                let simclr = SimClr::load_from_checkpoint(source, strict, ctx)?;
                Ok(ModelDescriptor::Simclr {
                    model: simclr.into_encoder(),
                    emb_size: SIMCLR_EMB_SIZE,
                })
            }
            Self::SwavImagenet => {
                let swav = Swav::load_from_checkpoint(source, strict, ctx)?;
                Ok(ModelDescriptor::Swav {
                    model: swav,
                    num_features: SWAV_NUM_FEATURES,
                })
            }
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = MisconfigurationError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| MisconfigurationError::UnknownModel {
                name: name.to_string(),
            })
    }
}

/// Resolves model names to loaded backbones
#[derive(Debug, Clone)]
pub struct ModelResolver {
    config: ZooConfig,
    pretrained_available: bool,
}

impl ModelResolver {
    /// Resolver with default configuration (public bucket, auto device)
    pub fn new() -> Self {
        Self::from_config(ZooConfig::default())
    }

    pub fn from_config(config: ZooConfig) -> Self {
        Self {
            config,
            pretrained_available: *PRETRAINED_AVAILABLE,
        }
    }

    /// Override the detected availability, e.g. to exercise the missing-dependency path
    pub fn with_availability(mut self, pretrained_available: bool) -> Self {
        self.pretrained_available = pretrained_available;
        self
    }

    pub fn is_available(&self) -> bool {
        self.pretrained_available
    }

    /// Load the backbone registered under `name` from its default checkpoint
    ///
    /// Fails with [`MisconfigurationError::MissingDependency`] when the pretrained
    /// architectures are unavailable (checked before the name), and with
    /// [`MisconfigurationError::UnknownModel`] for unsupported names. Checkpoint
    /// errors are returned as the loader reported them.
    pub fn resolve(&self, name: &str) -> Result<ModelDescriptor> {
        self.resolve_with_source(name, None)
    }

    /// [`ModelResolver::resolve`] with an optional checkpoint path or URL
    /// replacing the default one; errors keep the same precedence
    pub fn resolve_with_source(
        &self,
        name: &str,
        source: Option<&str>,
    ) -> Result<ModelDescriptor> {
        self.ensure_available()?;
        let kind: ModelKind = name.parse()?;
        self.load(kind, source)
    }

    /// Load `kind` from `source`, or from its default checkpoint
    pub fn load(&self, kind: ModelKind, source: Option<&str>) -> Result<ModelDescriptor> {
        self.ensure_available()?;

        let location = match source {
            Some(location) => location.to_string(),
            None => kind.default_source(&self.config.storage_root),
        };
        let source = CheckpointSource::parse(&location);
        let ctx = self.load_context()?;

        tracing::info!("Resolving {} from {}", kind, source);
        Ok(kind.load(&source, &ctx)?)
    }

    pub fn load_simclr_imagenet(&self, source: Option<&str>) -> Result<ModelDescriptor> {
        self.load(ModelKind::SimclrImagenet, source)
    }

    pub fn load_swav_imagenet(&self, source: Option<&str>) -> Result<ModelDescriptor> {
        self.load(ModelKind::SwavImagenet, source)
    }

    /// Device and fetch settings derived from the configuration
    pub fn load_context(&self) -> Result<LoadContext> {
        let device = self
            .config
            .device
            .to_device()
            .with_context(|| format!("Failed to initialise {} device", self.config.device.name()))?;
        Ok(LoadContext::new(device, self.config.show_progress))
    }

    fn ensure_available(&self) -> Result<(), MisconfigurationError> {
        if self.pretrained_available {
            Ok(())
        } else {
            Err(MisconfigurationError::MissingDependency)
        }
    }
}

impl Default for ModelResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve `name` with the process-wide default resolver
pub fn resolve(name: &str) -> Result<ModelDescriptor> {
    DEFAULT_RESOLVER.resolve(name)
}

/// Load the SimCLR ImageNet encoder (non-strict), from `source` or the public bucket
pub fn load_simclr_imagenet(source: Option<&str>) -> Result<ModelDescriptor> {
    DEFAULT_RESOLVER.load_simclr_imagenet(source)
}

/// Load the SwAV ImageNet model (strict), from `source` or the public bucket
pub fn load_swav_imagenet(source: Option<&str>) -> Result<ModelDescriptor> {
    DEFAULT_RESOLVER.load_swav_imagenet(source)
}
