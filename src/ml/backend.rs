// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<Wgpu> by default. Building with
// `--features ndarray` swaps in the pure-CPU NdArray backend.
//
//   TrainBackend        = Autodiff<InferenceBackend>
//   model.valid()       → module on InferenceBackend
//
// The configured device list mirrors a multi-GPU setup, but
// gradients are not replicated: the first device is used and
// the rest are reported once.

use burn::prelude::Backend;

#[cfg(not(feature = "ndarray"))]
pub type InferenceBackend = burn::backend::Wgpu;

#[cfg(feature = "ndarray")]
pub type InferenceBackend = burn::backend::NdArray;

pub type TrainBackend = burn::backend::Autodiff<InferenceBackend>;

pub type Device = <InferenceBackend as Backend>::Device;

#[cfg(not(feature = "ndarray"))]
fn device_at(index: usize) -> Device {
    burn::backend::wgpu::WgpuDevice::DiscreteGpu(index)
}

#[cfg(feature = "ndarray")]
fn device_at(_index: usize) -> Device {
    burn::backend::ndarray::NdArrayDevice::Cpu
}

/// Pick the device to train on from the configured device indices.
pub fn select_device(devices: &[usize]) -> Device {
    match devices {
        [] => {
            let device = Device::default();
            tracing::info!("No device configured, using default: {:?}", device);
            device
        }
        [first, rest @ ..] => {
            if !rest.is_empty() {
                tracing::warn!(
                    "{} devices configured; training runs on device {} only",
                    devices.len(),
                    first
                );
            }
            let device = device_at(*first);
            tracing::info!("Using device: {:?}", device);
            device
        }
    }
}
