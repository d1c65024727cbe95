use burn::nn::conv::{ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, Relu};
use burn::prelude::*;
use burn::tensor::activation::tanh;
use rand::Rng;

use crate::init::NormalInit;
use crate::num_stages;

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    /// Length of the latent noise vector.
    #[config(default = 100)]
    pub latent_dim: usize,

    /// Channel width of the last hidden stage. Earlier stages double it.
    #[config(default = 64)]
    pub feature_maps: usize,

    /// Channels of the generated image.
    #[config(default = 3)]
    pub channels: usize,

    /// Side length of the generated image.
    #[config(default = 64)]
    pub image_size: usize,

    /// Standard deviation of the initial weights.
    #[config(default = 0.02)]
    pub init_std: f64,
}

/// Transposed convolution, batch norm and ReLU.
#[derive(Module, Debug)]
pub struct UpBlock<B: Backend> {
    conv: ConvTranspose2d<B>,
    norm: BatchNorm<B, 2>,
    activation: Relu,
}

impl<B: Backend> UpBlock<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        self.activation.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    blocks: Vec<UpBlock<B>>,
    output: ConvTranspose2d<B>,
    latent_dim: usize,
}

impl GeneratorConfig {
    /// Channels between stages, from the latent vector to the image.
    ///
    /// The defaults give `100 -> 512 -> 256 -> 128 -> 64 -> 3`.
    pub fn channel_progression(&self) -> crate::Result<Vec<usize>> {
        let hidden = num_stages(self.image_size)? - 1;
        let mut channels = vec![self.latent_dim];
        channels.extend((0..hidden).rev().map(|i| self.feature_maps << i));
        channels.push(self.channels);
        Ok(channels)
    }

    pub fn init<B: Backend>(
        &self,
        rng: &mut impl Rng,
        device: &B::Device,
    ) -> crate::Result<Generator<B>> {
        let channels = self.channel_progression()?;
        let init = NormalInit::new(self.init_std)?;
        let stages = channels.len() - 1;

        let mut blocks = Vec::with_capacity(stages - 1);
        for (i, pair) in channels.windows(2).take(stages - 1).enumerate() {
            // The first stage expands the 1x1 latent to 4x4, the rest double the resolution.
            let (stride, padding) = if i == 0 { (1, 0) } else { (2, 1) };
            let conv = up_conv(&init, [pair[0], pair[1]], stride, padding, rng, device);

            let mut norm = BatchNormConfig::new(pair[1]).init(device);
            init.batch_norm(&mut norm, rng, device);

            blocks.push(UpBlock {
                conv,
                norm,
                activation: Relu::new(),
            });
        }

        let last = [channels[stages - 1], channels[stages]];
        let output = up_conv(&init, last, 2, 1, rng, device);

        Ok(Generator {
            blocks,
            output,
            latent_dim: self.latent_dim,
        })
    }
}

fn up_conv<B: Backend>(
    init: &NormalInit,
    channels: [usize; 2],
    stride: usize,
    padding: usize,
    rng: &mut impl Rng,
    device: &B::Device,
) -> ConvTranspose2d<B> {
    let mut conv = ConvTranspose2dConfig::new(channels, [4, 4])
        .with_stride([stride, stride])
        .with_padding([padding, padding])
        .with_bias(false)
        .init(device);
    conv.weight = init.conv_weight(conv.weight.val().dims(), rng, device);
    conv
}

impl<B: Backend> Generator<B> {
    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    /// Maps latent noise [batch, latent_dim, 1, 1] to images [batch, channels, size, size] in [-1, 1].
    pub fn forward(&self, latent: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self
            .blocks
            .iter()
            .fold(latent, |x, block| block.forward(x));
        tanh(self.output.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::GeneratorConfig;
    use crate::init::sample_latent;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::config::Config;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn default_channel_progression() {
        let channels = GeneratorConfig::new().channel_progression().unwrap();
        assert_eq!(channels, vec![100, 512, 256, 128, 64, 3]);
    }

    #[test]
    fn config_survives_json() {
        let config = GeneratorConfig::new().with_latent_dim(32).with_image_size(128);
        let loaded = GeneratorConfig::load_binary(config.to_string().as_bytes()).unwrap();
        assert_eq!(loaded.latent_dim, 32);
        assert_eq!(loaded.image_size, 128);
        assert_eq!(loaded.feature_maps, 64);
    }

    #[test]
    fn rejects_unsupported_sizes() {
        assert!(GeneratorConfig::new().with_image_size(48).channel_progression().is_err());
        assert!(GeneratorConfig::new().with_image_size(4).channel_progression().is_err());
    }

    #[test]
    fn output_shape_and_range() {
        let device = NdArrayDevice::Cpu;
        let mut rng = StdRng::seed_from_u64(0);
        let config = GeneratorConfig::new().with_feature_maps(8);
        let generator = config.init::<TestBackend>(&mut rng, &device).unwrap();

        for batch in [1, 3] {
            let latent = sample_latent(batch, config.latent_dim, &mut rng, &device);
            let images = generator.forward(latent);
            assert_eq!(images.dims(), [batch, 3, 64, 64]);

            let values = images.into_data().to_vec::<f32>().unwrap();
            assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn inference_mode_keeps_shape() {
        let device = NdArrayDevice::Cpu;
        let mut rng = StdRng::seed_from_u64(1);
        let config = GeneratorConfig::new()
            .with_feature_maps(4)
            .with_image_size(16)
            .with_channels(1);
        let generator = config.init::<TestBackend>(&mut rng, &device).unwrap().valid();

        let latent = sample_latent(2, config.latent_dim, &mut rng, &device);
        assert_eq!(generator.forward(latent).dims(), [2, 1, 16, 16]);
    }
}
