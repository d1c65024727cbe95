#![recursion_limit = "256"]

use std::fmt;
use std::str::FromStr;

use burn_wgpu::graphics::AutoGraphicsApi;
use burn_wgpu::{RuntimeOptions, WgpuDevice};

mod discriminator;
mod error;
mod generator;
mod init;

pub use discriminator::{Discriminator, DiscriminatorConfig, DownBlock};
pub use error::{ModelError, Result};
pub use generator::{Generator, GeneratorConfig, UpBlock};
pub use init::sample_latent;

pub type GpuBackend = burn::backend::Wgpu;
pub type CpuBackend = burn::backend::NdArray;

/// Number of 4x4 convolution stages between a 1x1 latent and a `size` x `size` image.
pub(crate) fn num_stages(image_size: usize) -> Result<usize> {
    if image_size < 8 || !image_size.is_power_of_two() {
        return Err(ModelError::UnsupportedImageSize(image_size));
    }
    Ok(image_size.trailing_zeros() as usize - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceChoice {
    #[default]
    Auto,
    Gpu,
    Cpu,
}

impl DeviceChoice {
    /// Picks the GPU for `Auto` when an adapter is present, the CPU otherwise.
    pub fn resolve(self) -> DeviceChoice {
        match self {
            DeviceChoice::Auto if gpu_available() => DeviceChoice::Gpu,
            DeviceChoice::Auto => {
                log::warn!("No GPU adapter found, training on the CPU");
                DeviceChoice::Cpu
            }
            other => other,
        }
    }
}

impl FromStr for DeviceChoice {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DeviceChoice::Auto),
            "gpu" | "wgpu" => Ok(DeviceChoice::Gpu),
            "cpu" | "ndarray" => Ok(DeviceChoice::Cpu),
            _ => Err(ModelError::UnknownDevice(s.to_owned())),
        }
    }
}

impl fmt::Display for DeviceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceChoice::Auto => "auto",
            DeviceChoice::Gpu => "gpu",
            DeviceChoice::Cpu => "cpu",
        };
        f.write_str(name)
    }
}

pub fn gpu_available() -> bool {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapters = instance.enumerate_adapters(wgpu::Backends::all());
    for adapter in &adapters {
        let info = adapter.get_info();
        log::debug!("Found adapter {} ({:?})", info.name, info.backend);
    }
    !adapters.is_empty()
}

fn burn_options() -> RuntimeOptions {
    RuntimeOptions {
        tasks_max: 64,
        memory_config: burn_wgpu::MemoryConfiguration::ExclusivePages,
    }
}

pub async fn init_gpu() -> WgpuDevice {
    burn_wgpu::init_setup_async::<AutoGraphicsApi>(&WgpuDevice::DefaultDevice, burn_options())
        .await;
    WgpuDevice::DefaultDevice
}

#[cfg(test)]
mod tests {
    use super::{DeviceChoice, num_stages};

    #[test]
    fn stages_follow_image_size() {
        assert_eq!(num_stages(8).unwrap(), 2);
        assert_eq!(num_stages(64).unwrap(), 5);
        assert_eq!(num_stages(128).unwrap(), 6);
        assert!(num_stages(0).is_err());
        assert!(num_stages(4).is_err());
        assert!(num_stages(96).is_err());
    }

    #[test]
    fn parse_device_choice() {
        assert_eq!("auto".parse::<DeviceChoice>().unwrap(), DeviceChoice::Auto);
        assert_eq!("GPU".parse::<DeviceChoice>().unwrap(), DeviceChoice::Gpu);
        assert_eq!("cpu".parse::<DeviceChoice>().unwrap(), DeviceChoice::Cpu);
        assert!("tpu".parse::<DeviceChoice>().is_err());
        assert_eq!(DeviceChoice::Cpu.to_string(), "cpu");
    }
}
