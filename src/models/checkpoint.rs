// Checkpoint loading
// Reads a state dict (PyTorch pickle/zip or safetensors) and applies it onto a VarMap,
// with PyTorch-style strict / non-strict key matching.

use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use std::collections::HashMap;
use std::path::Path;

use super::download::{fetch, CheckpointSource};
use crate::errors::CheckpointError;

/// Parameter name → tensor, as stored in a checkpoint
pub type StateDict = HashMap<String, Tensor>;

/// Where loaded weights go and how remote checkpoints are fetched
#[derive(Debug, Clone)]
pub struct LoadContext {
    pub device: Device,
    pub show_progress: bool,
}

impl LoadContext {
    pub fn new(device: Device, show_progress: bool) -> Self {
        Self {
            device,
            show_progress,
        }
    }

    /// CPU, no progress output (tests and embedding in other tools)
    pub fn cpu() -> Self {
        Self::new(Device::Cpu, false)
    }
}

/// On-disk checkpoint encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointFormat {
    /// `.safetensors`
    Safetensors,
    /// Anything `torch.save` produced (`.ckpt`, `.pth`, `.pth.tar`, `.bin`)
    Pickle,
}

impl CheckpointFormat {
    pub fn detect(source: &CheckpointSource) -> Self {
        match source.file_name() {
            Some(name) if name.ends_with(".safetensors") => Self::Safetensors,
            _ => Self::Pickle,
        }
    }
}

/// Outcome of applying a state dict onto a model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Parameters overwritten from the checkpoint
    pub loaded: usize,
    /// Model parameters the checkpoint did not provide
    pub missing: Vec<String>,
    /// Checkpoint entries the model has no parameter for
    pub unexpected: Vec<String>,
}

/// Fetch and decode a checkpoint's state dict (tensors stay on CPU)
pub fn read_state_dict(
    source: &CheckpointSource,
    ctx: &LoadContext,
) -> Result<StateDict, CheckpointError> {
    let fetched = fetch(source, ctx.show_progress)?;
    let format = CheckpointFormat::detect(source);

    tracing::debug!("Reading {:?} checkpoint from {:?}", format, fetched.path());

    let tensors = match format {
        CheckpointFormat::Safetensors => {
            candle_core::safetensors::load(fetched.path(), &Device::Cpu)
        }
        CheckpointFormat::Pickle => read_pickle(fetched.path()),
    }
    .map_err(|source_err| CheckpointError::Read {
        location: source.location(),
        source: source_err,
    })?;

    tracing::debug!("Checkpoint holds {} tensors", tensors.len());
    Ok(tensors)
}

/// Lightning checkpoints nest the weights under `state_dict`; plain `torch.save`
/// dumps keep them at the top level.
fn read_pickle(path: &Path) -> candle_core::Result<StateDict> {
    let tensors = match candle_core::pickle::read_all_with_key(path, Some("state_dict")) {
        Ok(tensors) => tensors,
        Err(_) => candle_core::pickle::read_all_with_key(path, None)?,
    };
    Ok(tensors.into_iter().collect())
}

/// Overwrite the variables of `varmap` with the matching checkpoint tensors
///
/// Shapes must agree in both modes. With `strict`, the key sets must also match
/// exactly. Without it, unknown entries are skipped and missing parameters keep
/// their initial values.
pub fn apply_state_dict(
    varmap: &VarMap,
    mut state: StateDict,
    strict: bool,
    device: &Device,
) -> Result<LoadReport, CheckpointError> {
    // Batch-norm step counters have no candle counterpart
    state.retain(|name, _| !name.ends_with("num_batches_tracked"));

    let vars = varmap
        .data()
        .lock()
        .map_err(|_| candle_core::Error::Msg("VarMap lock poisoned".to_string()))?;

    let mut names: Vec<&String> = vars.keys().collect();
    names.sort();

    let missing: Vec<String> = names
        .iter()
        .filter(|name| !state.contains_key(name.as_str()))
        .map(|name| name.to_string())
        .collect();
    let mut unexpected: Vec<String> = state
        .keys()
        .filter(|name| !vars.contains_key(name.as_str()))
        .cloned()
        .collect();
    unexpected.sort();

    for name in &names {
        if let (Some(tensor), Some(var)) = (state.get(name.as_str()), vars.get(name.as_str())) {
            if tensor.dims() != var.dims() {
                return Err(CheckpointError::ShapeMismatch {
                    name: name.to_string(),
                    expected: var.dims().to_vec(),
                    found: tensor.dims().to_vec(),
                });
            }
        }
    }

    if strict && (!missing.is_empty() || !unexpected.is_empty()) {
        return Err(CheckpointError::StrictMismatch {
            missing,
            unexpected,
        });
    }

    let mut loaded = 0;
    for name in names {
        if let (Some(tensor), Some(var)) = (state.remove(name.as_str()), vars.get(name.as_str())) {
            let tensor = tensor.to_dtype(var.dtype())?.to_device(device)?;
            var.set(&tensor)?;
            loaded += 1;
        }
    }

    if !missing.is_empty() {
        tracing::warn!(
            "{} model parameters missing from checkpoint, keeping initial values (first: {})",
            missing.len(),
            missing[0]
        );
    }
    if !unexpected.is_empty() {
        tracing::warn!(
            "Ignoring {} unexpected checkpoint entries (first: {})",
            unexpected.len(),
            unexpected[0]
        );
    }
    tracing::debug!("Applied {} tensors from checkpoint", loaded);

    Ok(LoadReport {
        loaded,
        missing,
        unexpected,
    })
}

/// Total number of scalar parameters held by a VarMap
pub fn parameter_count(varmap: &VarMap) -> usize {
    varmap.all_vars().iter().map(|var| var.elem_count()).sum()
}

/// Number of scalar parameters whose name starts with `prefix.`
pub fn parameter_count_under(varmap: &VarMap, prefix: &str) -> usize {
    let prefix = format!("{prefix}.");
    match varmap.data().lock() {
        Ok(vars) => vars
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(_, var)| var.elem_count())
            .sum(),
        Err(_) => 0,
    }
}
