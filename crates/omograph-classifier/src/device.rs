//! Device selection: honours the configured preference, falls back to CPU.

use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::Device;
use omograph_core::DevicePreference;

/// Pick a compute device for `preference`.
///
/// `Auto` tries CUDA, then Metal, then CPU. An explicit `Cuda` or `Metal`
/// preference that cannot be satisfied logs a warning and returns the CPU.
pub fn select_device(preference: DevicePreference) -> Device {
    match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => try_cuda().unwrap_or_else(|| {
            tracing::warn!("CUDA requested but unavailable, falling back to CPU");
            Device::Cpu
        }),
        DevicePreference::Metal => try_metal().unwrap_or_else(|| {
            tracing::warn!("Metal requested but unavailable, falling back to CPU");
            Device::Cpu
        }),
        DevicePreference::Auto => try_cuda().or_else(try_metal).unwrap_or(Device::Cpu),
    }
}

fn try_cuda() -> Option<Device> {
    if !cuda_is_available() {
        return None;
    }
    match Device::new_cuda(0) {
        Ok(device) => {
            tracing::info!("Using CUDA device 0");
            Some(device)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open CUDA device 0");
            None
        }
    }
}

fn try_metal() -> Option<Device> {
    if !metal_is_available() {
        return None;
    }
    match Device::new_metal(0) {
        Ok(device) => {
            tracing::info!("Using Metal device 0");
            Some(device)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to open Metal device 0");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_preference_is_cpu() {
        assert!(matches!(select_device(DevicePreference::Cpu), Device::Cpu));
    }

    #[test]
    fn test_auto_without_accelerators_is_cpu() {
        if !cuda_is_available() && !metal_is_available() {
            assert!(matches!(select_device(DevicePreference::Auto), Device::Cpu));
        }
    }
}
