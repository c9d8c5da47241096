// Backend Configuration - Device selection for loaded weights

use candle_core::Device;
use serde::{Deserialize, Serialize};

/// Device that checkpoint tensors are placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendDevice {
    /// CPU (works everywhere)
    Cpu,

    /// NVIDIA CUDA GPU (requires the `cuda` feature)
    Cuda,

    /// Metal GPU (macOS, requires the `metal` feature)
    Metal,

    /// Auto-detect best available device
    #[default]
    Auto,
}

impl BackendDevice {
    /// Get short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            BackendDevice::Cpu => "CPU",
            BackendDevice::Cuda => "CUDA (GPU)",
            BackendDevice::Metal => "Metal (GPU)",
            BackendDevice::Auto => "Auto",
        }
    }

    /// Create the candle device
    ///
    /// Explicit GPU choices fail when the matching feature or hardware is missing;
    /// `Auto` falls back to CPU.
    pub fn to_device(&self) -> candle_core::Result<Device> {
        match self {
            BackendDevice::Cpu => Ok(Device::Cpu),
            BackendDevice::Cuda => Device::new_cuda(0),
            BackendDevice::Metal => Device::new_metal(0),
            BackendDevice::Auto => {
                if candle_core::utils::cuda_is_available() {
                    Device::new_cuda(0)
                } else if candle_core::utils::metal_is_available() {
                    Device::new_metal(0)
                } else {
                    Ok(Device::Cpu)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_always_available() {
        let device = BackendDevice::Cpu.to_device().unwrap();
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_auto_resolves() {
        assert!(BackendDevice::Auto.to_device().is_ok());
    }

    #[test]
    fn test_lowercase_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            device: BackendDevice,
        }
        let parsed: Wrapper = toml::from_str("device = \"cuda\"").unwrap();
        assert_eq!(parsed.device, BackendDevice::Cuda);
    }
}
