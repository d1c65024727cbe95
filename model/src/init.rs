use burn::module::Param;
use burn::nn::BatchNorm;
use burn::prelude::{Backend, Tensor, TensorData};
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};

use crate::error::Result;

/// DCGAN initialization: conv weights ~ N(0, std), batch-norm scale ~ N(1, std), shift = 0.
pub(crate) struct NormalInit {
    weight: Normal<f32>,
    scale: Normal<f32>,
}

impl NormalInit {
    pub(crate) fn new(std: f64) -> Result<Self> {
        Ok(Self {
            weight: Normal::new(0.0, std as f32)?,
            scale: Normal::new(1.0, std as f32)?,
        })
    }

    pub(crate) fn conv_weight<B: Backend, const D: usize>(
        &self,
        shape: [usize; D],
        rng: &mut impl Rng,
        device: &B::Device,
    ) -> Param<Tensor<B, D>> {
        Param::from_tensor(sample(&self.weight, shape, rng, device))
    }

    pub(crate) fn batch_norm<B: Backend, const D: usize>(
        &self,
        norm: &mut BatchNorm<B, D>,
        rng: &mut impl Rng,
        device: &B::Device,
    ) {
        let [features] = norm.gamma.val().dims();
        norm.gamma = Param::from_tensor(sample(&self.scale, [features], rng, device));
        norm.beta = Param::from_tensor(Tensor::zeros([features], device));
    }
}

fn sample<B: Backend, const D: usize>(
    dist: &impl Distribution<f32>,
    shape: [usize; D],
    rng: &mut impl Rng,
    device: &B::Device,
) -> Tensor<B, D> {
    let count: usize = shape.iter().product();
    let values: Vec<f32> = (0..count).map(|_| dist.sample(&mut *rng)).collect();
    Tensor::from_data(TensorData::new(values, shape), device)
}

/// Draws a [batch, latent_dim, 1, 1] batch of standard normal noise from `rng`.
pub fn sample_latent<B: Backend>(
    batch_size: usize,
    latent_dim: usize,
    rng: &mut impl Rng,
    device: &B::Device,
) -> Tensor<B, 4> {
    sample(&StandardNormal, [batch_size, latent_dim, 1, 1], rng, device)
}
