use crate::{config::TrainConfig, loss::binary_cross_entropy, msg::TrainStepStats};

use burn::{
    module::{AutodiffModule, Module},
    optim::{Adam, AdamConfig, GradientsParams, Optimizer, adaptor::OptimizerAdaptor},
    prelude::Backend,
    tensor::{ElementConversion, Tensor, backend::AutodiffBackend},
};
use model::{Discriminator, Generator, sample_latent};
use rand::Rng;
use tracing::trace_span;

const REAL_LABEL: f32 = 1.0;
const FAKE_LABEL: f32 = 0.0;

/// The two adversarial networks.
#[derive(Module, Debug)]
pub struct GanModels<B: Backend> {
    pub generator: Generator<B>,
    pub discriminator: Discriminator<B>,
}

impl TrainConfig {
    /// Initializes the generator, then the discriminator, from the same `rng`.
    pub fn init_models<B: Backend>(
        &self,
        rng: &mut impl Rng,
        device: &B::Device,
    ) -> model::Result<GanModels<B>> {
        let generator = self.generator.init(rng, device)?;
        let discriminator = self.discriminator.init(rng, device)?;
        Ok(GanModels {
            generator,
            discriminator,
        })
    }
}

/// Output of the discriminator half of a step.
pub struct DiscriminatorPass<B: AutodiffBackend> {
    pub loss: Tensor<B, 1>,
    pub d_x: Tensor<B, 1>,
    pub d_g_z: Tensor<B, 1>,
    pub grads: B::Gradients,
    /// The fakes scored in this pass, still attached to the generator's graph.
    pub fake: Tensor<B, 4>,
}

type GeneratorOptimizer<B> = OptimizerAdaptor<Adam, Generator<B>, B>;
type DiscriminatorOptimizer<B> = OptimizerAdaptor<Adam, Discriminator<B>, B>;

pub struct GanTrainer<B: AutodiffBackend> {
    config: TrainConfig,
    optim_g: GeneratorOptimizer<B>,
    optim_d: DiscriminatorOptimizer<B>,
}

fn create_optimizer<B: AutodiffBackend, M: AutodiffModule<B>>(
    config: &TrainConfig,
) -> OptimizerAdaptor<Adam, M, B> {
    AdamConfig::new()
        .with_beta_1(config.beta_1)
        .with_beta_2(config.beta_2)
        .init()
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

/// Generates a fresh batch of fakes and scores it against label 0, next to `real` against label 1.
///
/// The discriminator only sees a detached copy of the fakes, so `grads` never reach the generator.
pub fn discriminator_pass<B: AutodiffBackend>(
    models: &GanModels<B>,
    real: Tensor<B, 4>,
    rng: &mut impl Rng,
) -> DiscriminatorPass<B> {
    let device = real.device();
    let [batch_size, _, _, _] = real.dims();
    let latent = sample_latent::<B>(batch_size, models.generator.latent_dim(), rng, &device);
    let fake = trace_span!("Generate fakes", sync_burn = true)
        .in_scope(|| models.generator.forward(latent));

    let output_real = models.discriminator.forward(real);
    let loss_real = binary_cross_entropy(output_real.clone(), REAL_LABEL);

    let output_fake = models.discriminator.forward(fake.clone().detach());
    let loss_fake = binary_cross_entropy(output_fake.clone(), FAKE_LABEL);

    let loss = loss_real + loss_fake;
    let grads = trace_span!("Discriminator backward", sync_burn = true).in_scope(|| loss.backward());

    DiscriminatorPass {
        loss,
        d_x: output_real.mean(),
        d_g_z: output_fake.mean(),
        grads,
        fake,
    }
}

impl<B: AutodiffBackend> GanTrainer<B> {
    pub fn new(config: &TrainConfig) -> Self {
        Self {
            config: config.clone(),
            optim_g: create_optimizer(config),
            optim_d: create_optimizer(config),
        }
    }

    /// One adversarial update on a batch of real images.
    ///
    /// The discriminator learns to separate `real` from a fresh batch of fakes,
    /// then the generator learns to fool the updated discriminator on those same fakes.
    pub fn step(
        &mut self,
        models: GanModels<B>,
        real: Tensor<B, 4>,
        rng: &mut impl Rng,
    ) -> (GanModels<B>, TrainStepStats) {
        let lr = self.config.learning_rate;
        let pass = trace_span!("Discriminator pass", sync_burn = true)
            .in_scope(|| discriminator_pass(&models, real, rng));
        let GanModels {
            generator,
            discriminator,
        } = models;
        let DiscriminatorPass {
            loss: loss_d,
            d_x,
            d_g_z: d_g_z1,
            grads,
            fake,
        } = pass;

        let discriminator = trace_span!("Discriminator step", sync_burn = true).in_scope(|| {
            let grads = GradientsParams::from_grads(grads, &discriminator);
            self.optim_d.step(lr, discriminator, grads)
        });

        let (generator, loss_g, d_g_z2) = trace_span!("Generator step", sync_burn = true)
            .in_scope(|| {
                let output = discriminator.forward(fake);
                let d_g_z2 = output.clone().mean();
                let loss = binary_cross_entropy(output, REAL_LABEL);

                let grads = trace_span!("Generator backward", sync_burn = true)
                    .in_scope(|| loss.backward());
                let grads = GradientsParams::from_grads(grads, &generator);
                let generator = self.optim_g.step(lr, generator, grads);
                (generator, loss, d_g_z2)
            });

        let stats = TrainStepStats {
            loss_d: scalar(loss_d),
            loss_g: scalar(loss_g),
            d_x: scalar(d_x),
            d_g_z1: scalar(d_g_z1),
            d_g_z2: scalar(d_g_z2),
        };

        (
            GanModels {
                generator,
                discriminator,
            },
            stats,
        )
    }
}

/// Runs the generator in inference mode, with batch norm on its running statistics.
pub fn generate<B: AutodiffBackend>(
    generator: &Generator<B>,
    latent: Tensor<B::InnerBackend, 4>,
) -> Tensor<B::InnerBackend, 4> {
    generator.valid().forward(latent)
}
