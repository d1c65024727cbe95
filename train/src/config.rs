use burn::prelude::Config;
use model::{DiscriminatorConfig, GeneratorConfig};

#[derive(Config, Debug)]
pub struct TrainConfig {
    /// Number of passes over the dataset.
    #[config(default = 5)]
    pub num_epochs: usize,

    /// Learning rate of both Adam optimizers.
    #[config(default = 2e-4)]
    pub learning_rate: f64,

    /// Exponential decay of the first moment estimates.
    #[config(default = 0.5)]
    pub beta_1: f32,

    /// Exponential decay of the second moment estimates.
    #[config(default = 0.999)]
    pub beta_2: f32,

    #[config(default = "GeneratorConfig::new()")]
    pub generator: GeneratorConfig,

    #[config(default = "DiscriminatorConfig::new()")]
    pub discriminator: DiscriminatorConfig,
}
