use burn::prelude::Config;
use dataset::LoadConfig;
use train::config::TrainConfig;

use crate::error::PipelineError;

#[derive(Config, Debug)]
pub struct PipelineConfig {
    /// Random seed.
    #[config(default = 42)]
    pub seed: u64,

    /// Nr. of fixed latent vectors rendered into the sample grid after training.
    #[config(default = 16)]
    pub sample_count: usize,

    /// Log a progress line every this many batches.
    #[config(default = 50)]
    pub log_every: usize,

    /// Save the sample grid, loss plot and loss history to disk. Uses export-path for the file location.
    #[config(default = true)]
    pub save_to_disk: bool,

    /// Location to put exported files.
    ///
    /// This path can be set to be relative to the CWD.
    #[config(default = "String::from(\"output\")")]
    pub export_path: String,

    /// Filename of the sample grid.
    #[config(default = "String::from(\"generated_faces.png\")")]
    pub sample_name: String,

    /// Filename of the loss plot.
    #[config(default = "String::from(\"loss_curve.svg\")")]
    pub loss_plot_name: String,

    /// Filename of the raw loss history.
    #[config(default = "String::from(\"loss_history.json\")")]
    pub history_name: String,

    /// Images per row of the sample grid.
    #[config(default = 8)]
    pub grid_columns: usize,

    /// Pixels of padding between grid cells.
    #[config(default = 2)]
    pub grid_padding: usize,
}

/// Everything a training run needs, loadable from a single JSON file.
#[derive(Config, Debug)]
pub struct RunConfig {
    #[config(default = "LoadConfig::new()")]
    pub load: LoadConfig,

    #[config(default = "TrainConfig::new()")]
    pub train: TrainConfig,

    #[config(default = "PipelineConfig::new()")]
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    /// Sets the image side length of the loader and both networks.
    pub fn with_image_size(mut self, image_size: usize) -> Self {
        self.load.image_size = image_size as u32;
        self.train.generator.image_size = image_size;
        self.train.discriminator.image_size = image_size;
        self
    }

    /// Sets the channel count of the loader and both networks.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.load.channels = channels;
        self.load.mean = vec![0.5; channels];
        self.load.std = vec![0.5; channels];
        self.train.generator.channels = channels;
        self.train.discriminator.channels = channels;
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        self.load.validate()?;

        let load_size = self.load.image_size as usize;
        let generator = &self.train.generator;
        let discriminator = &self.train.discriminator;
        if generator.image_size != load_size || discriminator.image_size != load_size {
            return invalid(format!(
                "image sizes disagree: loader {load_size}, generator {}, discriminator {}",
                generator.image_size, discriminator.image_size
            ));
        }
        if generator.channels != self.load.channels || discriminator.channels != self.load.channels
        {
            return invalid(format!(
                "channel counts disagree: loader {}, generator {}, discriminator {}",
                self.load.channels, generator.channels, discriminator.channels
            ));
        }
        if self.train.num_epochs == 0 {
            return invalid("num_epochs must be positive".into());
        }
        if self.pipeline.sample_count == 0 || self.pipeline.grid_columns == 0 {
            return invalid("sample_count and grid_columns must be positive".into());
        }
        if self.pipeline.log_every == 0 {
            return invalid("log_every must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RunConfig;
    use burn::prelude::Config;

    #[test]
    fn defaults_are_consistent() {
        let config = RunConfig::new();
        config.validate().unwrap();
        assert_eq!(config.pipeline.sample_count, 16);
        assert_eq!(config.train.generator.latent_dim, 100);
        assert_eq!(config.load.batch_size, 128);
    }

    #[test]
    fn mismatched_sizes_are_rejected() {
        let mut config = RunConfig::new();
        config.train.generator.image_size = 32;
        assert!(config.validate().is_err());

        let config = RunConfig::new().with_image_size(32);
        config.validate().unwrap();
    }

    #[test]
    fn grayscale_propagates_to_all_parts() {
        let config = RunConfig::new().with_channels(1);
        config.validate().unwrap();
        assert_eq!(config.load.mean.len(), 1);
        assert_eq!(config.train.discriminator.channels, 1);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let config = RunConfig::new().with_image_size(32);
        config.save(&path).unwrap();
        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded.load.image_size, 32);
        assert_eq!(loaded.train.discriminator.image_size, 32);
        assert_eq!(loaded.pipeline.export_path, "output");
    }
}
