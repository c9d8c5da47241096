// End-to-end resolution against local checkpoints
//
// These tests build full ResNet-50 models and write their weights to temporary
// safetensors files, then check:
// 1. SimCLR loading tolerates extra and missing parameters
// 2. SwAV loading requires an exact parameter match
// 3. Each call produces a fresh, independent descriptor
// 4. `resolve` reads torch zip checkpoints from a local storage root

#![cfg(feature = "pretrained")]

use anyhow::Result;
use candle_core::{DType, Device, Module, Tensor};
use ssl_backbones::config::{BackendDevice, ZooConfig};
use ssl_backbones::models::{LoadContext, SimClr, StateDict, Swav};
use ssl_backbones::{CheckpointError, ModelDescriptor, ModelResolver};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cpu_resolver() -> ModelResolver {
    ModelResolver::from_config(ZooConfig {
        device: BackendDevice::Cpu,
        show_progress: false,
        ..ZooConfig::default()
    })
}

/// Resolver whose default checkpoints live under `storage_root` on disk
fn local_resolver(storage_root: &Path) -> ModelResolver {
    ModelResolver::from_config(ZooConfig {
        storage_root: storage_root.to_string_lossy().into_owned(),
        device: BackendDevice::Cpu,
        show_progress: false,
    })
}

/// Copy a torch zip fixture to `<storage_root>/<relative>`
fn stage_fixture(storage_root: &Path, fixture: &str, relative: &str) -> Result<()> {
    let target = storage_root.join(relative);
    std::fs::create_dir_all(target.parent().expect("relative path has a parent"))?;
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(fixture);
    std::fs::copy(fixture, target)?;
    Ok(())
}

fn state_of(varmap: &candle_nn::VarMap) -> StateDict {
    let data = varmap.data().lock().unwrap();
    data.iter()
        .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
        .collect()
}

fn write_checkpoint(dir: &Path, file: &str, state: &StateDict) -> Result<PathBuf> {
    let path = dir.join(file);
    candle_core::safetensors::save(state, &path)?;
    Ok(path)
}

/// Test that SimCLR resolves from a checkpoint with extra and missing keys
#[test]
fn test_simclr_tolerates_partial_checkpoint() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source_model = SimClr::new(&LoadContext::cpu())?;

    let mut state = state_of(source_model.varmap());
    state.remove("projection.model.3.weight");
    state.insert(
        "online_head.weight".to_string(),
        Tensor::zeros((10, 2048), DType::F32, &Device::Cpu)?,
    );
    let path = write_checkpoint(temp_dir.path(), "simclr.safetensors", &state)?;

    let descriptor = cpu_resolver().load_simclr_imagenet(path.to_str())?;
    let ModelDescriptor::Simclr { model, emb_size } = descriptor else {
        panic!("expected a SimCLR descriptor");
    };
    assert_eq!(emb_size, 2048);

    // Loaded encoder reproduces the source encoder
    let images = Tensor::rand(0f32, 1f32, (1, 3, 64, 64), &Device::Cpu)?;
    let expected = source_model.encoder().forward(&images)?;
    let actual = model.forward(&images)?;
    assert_eq!(actual.dims(), &[1, 2048]);
    let diff = (expected - actual)?.abs()?.max_all()?.to_scalar::<f32>()?;
    assert!(diff < 1e-4, "encoder outputs differ by {}", diff);

    Ok(())
}

/// Test that SwAV resolves from an exact checkpoint and rejects a partial one
#[test]
fn test_swav_requires_exact_checkpoint() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source_model = Swav::new(&LoadContext::cpu())?;
    let state = state_of(source_model.varmap());

    let exact = write_checkpoint(temp_dir.path(), "swav.safetensors", &state)?;
    let descriptor = cpu_resolver().load_swav_imagenet(exact.to_str())?;
    match &descriptor {
        ModelDescriptor::Swav {
            model,
            num_features,
        } => {
            assert_eq!(*num_features, 3000);
            assert_eq!(model.num_prototypes(), 3000);
            assert_eq!(model.parameter_count(), source_model.parameter_count());
        }
        other => panic!("expected a SwAV descriptor, got {:?}", other),
    }

    let mut partial = state.clone();
    partial.remove("model.prototypes.weight");
    let partial = write_checkpoint(temp_dir.path(), "swav_partial.safetensors", &partial)?;

    let err = cpu_resolver()
        .load_swav_imagenet(partial.to_str())
        .unwrap_err();
    match err.downcast_ref::<CheckpointError>() {
        Some(CheckpointError::StrictMismatch {
            missing,
            unexpected,
        }) => {
            assert_eq!(missing, &vec!["model.prototypes.weight".to_string()]);
            assert!(unexpected.is_empty());
        }
        other => panic!("expected strict mismatch, got {:?}", other),
    }

    let mut extra = state;
    extra.insert(
        "model.queue".to_string(),
        Tensor::zeros((2, 128), DType::F32, &Device::Cpu)?,
    );
    let extra = write_checkpoint(temp_dir.path(), "swav_extra.safetensors", &extra)?;
    assert!(cpu_resolver().load_swav_imagenet(extra.to_str()).is_err());

    Ok(())
}

/// Test that repeated loads are independent
#[test]
fn test_repeated_loads_are_independent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let source_model = SimClr::new(&LoadContext::cpu())?;
    let path = write_checkpoint(
        temp_dir.path(),
        "simclr.safetensors",
        &state_of(source_model.varmap()),
    )?;
    drop(source_model);

    let resolver = cpu_resolver();
    let first = resolver.load_simclr_imagenet(path.to_str())?;

    // Removing the checkpoint after the first load must break the second one
    std::fs::remove_file(&path)?;
    let err = resolver.load_simclr_imagenet(path.to_str()).unwrap_err();
    assert!(err
        .downcast_ref::<CheckpointError>()
        .map(CheckpointError::is_fetch_failure)
        .unwrap_or(false));

    assert_eq!(first.summary().size, 2048);
    Ok(())
}

/// Test that a checkpoint for the other architecture is rejected by SwAV
#[test]
fn test_swav_rejects_simclr_checkpoint() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let simclr = SimClr::new(&LoadContext::cpu())?;
    let path = write_checkpoint(
        temp_dir.path(),
        "simclr.safetensors",
        &state_of(simclr.varmap()),
    )?;

    let err = cpu_resolver().load_swav_imagenet(path.to_str()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CheckpointError>(),
        Some(CheckpointError::StrictMismatch { .. })
    ));
    Ok(())
}

/// Test that resolve loads SimCLR from a Lightning checkpoint under the storage root
#[test]
fn test_resolve_simclr_from_storage_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    stage_fixture(
        temp_dir.path(),
        "lightning.ckpt",
        "simclr/bolts_simclr_imagenet/simclr_imagenet.ckpt",
    )?;

    // Non-strict: none of the fixture's keys belong to SimCLR, loading still succeeds
    let descriptor = local_resolver(temp_dir.path()).resolve("simclr-imagenet")?;
    let ModelDescriptor::Simclr { model, emb_size } = descriptor else {
        panic!("expected a SimCLR descriptor");
    };
    assert_eq!(emb_size, 2048);

    let images = Tensor::rand(0f32, 1f32, (2, 3, 64, 64), &Device::Cpu)?;
    assert_eq!(model.forward(&images)?.dims(), &[2, 2048]);
    Ok(())
}

/// Test that resolve reads a plain torch.save SwAV archive and applies it strictly
#[test]
fn test_resolve_swav_from_storage_root_is_strict() -> Result<()> {
    let temp_dir = TempDir::new()?;
    stage_fixture(
        temp_dir.path(),
        "plain.pth.tar",
        "swav/swav_imagenet/swav_imagenet.pth.tar",
    )?;

    let err = local_resolver(temp_dir.path())
        .resolve("swav-imagenet")
        .unwrap_err();
    match err.downcast_ref::<CheckpointError>() {
        Some(CheckpointError::StrictMismatch { unexpected, .. }) => {
            let mut unexpected = unexpected.clone();
            unexpected.sort();
            assert_eq!(unexpected, vec!["head.bias", "head.weight"]);
        }
        other => panic!("expected strict mismatch, got {:?}", other),
    }
    Ok(())
}
