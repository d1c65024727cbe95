use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, LeakyRelu, LeakyReluConfig, PaddingConfig2d};
use burn::prelude::*;
use burn::tensor::activation::sigmoid;
use rand::Rng;

use crate::error::ModelError;
use crate::init::NormalInit;
use crate::num_stages;

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    /// Channel width of the first stage. Later stages double it.
    #[config(default = 64)]
    pub feature_maps: usize,

    /// Channels of the input image.
    #[config(default = 3)]
    pub channels: usize,

    /// Side length of the input image.
    #[config(default = 64)]
    pub image_size: usize,

    /// Slope of the LeakyReLU activations.
    #[config(default = 0.2)]
    pub negative_slope: f64,

    /// Standard deviation of the initial weights.
    #[config(default = 0.02)]
    pub init_std: f64,
}

/// Strided convolution, optional batch norm and LeakyReLU.
#[derive(Module, Debug)]
pub struct DownBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: Option<BatchNorm<B, 2>>,
    activation: LeakyRelu,
}

impl<B: Backend> DownBlock<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = match &self.norm {
            Some(norm) => norm.forward(x),
            None => x,
        };
        self.activation.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    blocks: Vec<DownBlock<B>>,
    output: Conv2d<B>,
}

impl DiscriminatorConfig {
    /// Channels between stages, from the image to the single probability.
    ///
    /// The defaults give `3 -> 64 -> 128 -> 256 -> 512 -> 1`.
    pub fn channel_progression(&self) -> crate::Result<Vec<usize>> {
        let hidden = num_stages(self.image_size)? - 1;
        let mut channels = vec![self.channels];
        channels.extend((0..hidden).map(|i| self.feature_maps << i));
        channels.push(1);
        Ok(channels)
    }

    pub fn init<B: Backend>(
        &self,
        rng: &mut impl Rng,
        device: &B::Device,
    ) -> crate::Result<Discriminator<B>> {
        if self.negative_slope < 0.0 {
            return Err(ModelError::InvalidLayer(format!(
                "negative_slope must not be negative, got {}",
                self.negative_slope
            )));
        }

        let channels = self.channel_progression()?;
        let init = NormalInit::new(self.init_std)?;
        let stages = channels.len() - 1;

        let mut blocks = Vec::with_capacity(stages - 1);
        for (i, pair) in channels.windows(2).take(stages - 1).enumerate() {
            let conv = down_conv(&init, [pair[0], pair[1]], 2, 1, rng, device);

            // The first stage sees raw pixels and is left unnormalized.
            let norm = (i > 0).then(|| {
                let mut norm = BatchNormConfig::new(pair[1]).init(device);
                init.batch_norm(&mut norm, rng, device);
                norm
            });

            blocks.push(DownBlock {
                conv,
                norm,
                activation: LeakyReluConfig::new()
                    .with_negative_slope(self.negative_slope)
                    .init(),
            });
        }

        let last = [channels[stages - 1], channels[stages]];
        let output = down_conv(&init, last, 1, 0, rng, device);

        Ok(Discriminator { blocks, output })
    }
}

fn down_conv<B: Backend>(
    init: &NormalInit,
    channels: [usize; 2],
    stride: usize,
    padding: usize,
    rng: &mut impl Rng,
    device: &B::Device,
) -> Conv2d<B> {
    let mut conv = Conv2dConfig::new(channels, [4, 4])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(padding, padding))
        .with_bias(false)
        .init(device);
    conv.weight = init.conv_weight(conv.weight.val().dims(), rng, device);
    conv
}

impl<B: Backend> Discriminator<B> {
    /// Maps images [batch, channels, size, size] to the probability [batch] that each is real.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 1> {
        let [batch_size, _, _, _] = images.dims();
        let x = self
            .blocks
            .iter()
            .fold(images, |x, block| block.forward(x));
        sigmoid(self.output.forward(x)).reshape([batch_size])
    }
}

#[cfg(test)]
mod tests {
    use super::DiscriminatorConfig;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::{Autodiff, NdArray};
    use burn::config::Config;
    use burn::tensor::{Distribution, Tensor};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn default_channel_progression() {
        let channels = DiscriminatorConfig::new().channel_progression().unwrap();
        assert_eq!(channels, vec![3, 64, 128, 256, 512, 1]);
    }

    #[test]
    fn config_survives_json() {
        let config = DiscriminatorConfig::new().with_negative_slope(0.1).with_channels(1);
        let loaded = DiscriminatorConfig::load_binary(config.to_string().as_bytes()).unwrap();
        assert_eq!(loaded.negative_slope, 0.1);
        assert_eq!(loaded.channels, 1);
        assert_eq!(loaded.image_size, 64);
    }

    #[test]
    fn output_is_one_probability_per_image() {
        let device = NdArrayDevice::Cpu;
        let mut rng = StdRng::seed_from_u64(0);
        let discriminator = DiscriminatorConfig::new()
            .with_feature_maps(8)
            .init::<TestBackend>(&mut rng, &device)
            .unwrap();

        for batch in [1, 4] {
            let images = Tensor::<TestBackend, 4>::random(
                [batch, 3, 64, 64],
                Distribution::Uniform(-1.0, 1.0),
                &device,
            );
            let probs = discriminator.forward(images);
            assert_eq!(probs.dims(), [batch]);

            let values = probs.into_data().to_vec::<f32>().unwrap();
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn rejects_negative_slope() {
        let device = NdArrayDevice::Cpu;
        let result = DiscriminatorConfig::new()
            .with_negative_slope(-0.1)
            .init::<TestBackend>(&mut StdRng::seed_from_u64(0), &device);
        assert!(result.is_err());
    }
}
