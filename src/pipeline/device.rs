use candle_core::{DType, Device};
use tracing::info;

use crate::error::Result;

/// Compute backend a pipeline runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cuda,
    Metal,
    Cpu,
}

impl Backend {
    /// Pick the best available backend
    ///
    /// Accelerators are only considered when compiled in (`cuda` / `metal`
    /// features) and present at runtime.
    pub fn detect(force_cpu: bool) -> Self {
        if force_cpu {
            Backend::Cpu
        } else if candle_core::utils::cuda_is_available() {
            Backend::Cuda
        } else if candle_core::utils::metal_is_available() {
            Backend::Metal
        } else {
            Backend::Cpu
        }
    }

    /// Open the candle device for this backend
    pub fn device(self) -> Result<Device> {
        let device = match self {
            Backend::Cuda => Device::new_cuda(0)?,
            Backend::Metal => Device::new_metal(0)?,
            Backend::Cpu => Device::Cpu,
        };
        info!("🖥️  Using {} backend ({:?})", self.as_str(), self.dtype());
        Ok(device)
    }

    /// Reduced precision on accelerators, full precision on CPU
    pub fn dtype(self) -> DType {
        match self {
            Backend::Cuda | Backend::Metal => DType::F16,
            Backend::Cpu => DType::F32,
        }
    }

    /// Whether half-precision weight files should be fetched
    pub fn uses_f16(self) -> bool {
        self.dtype() == DType::F16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Cuda => "cuda",
            Backend::Metal => "metal",
            Backend::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_cpu() {
        assert_eq!(Backend::detect(true), Backend::Cpu);
    }

    #[test]
    fn test_precision_per_backend() {
        assert_eq!(Backend::Cpu.dtype(), DType::F32);
        assert_eq!(Backend::Cuda.dtype(), DType::F16);
        assert_eq!(Backend::Metal.dtype(), DType::F16);
        assert!(!Backend::Cpu.uses_f16());
    }

    #[test]
    fn test_cpu_device_opens() {
        let device = Backend::Cpu.device().unwrap();
        assert!(device.is_cpu());
    }

    #[test]
    fn test_names() {
        assert_eq!(Backend::Cuda.to_string(), "cuda");
        assert_eq!(Backend::Cpu.as_str(), "cpu");
    }
}
