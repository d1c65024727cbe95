use burn::prelude::Config;

use crate::error::DatasetError;

#[derive(Config, Debug)]
pub struct LoadConfig {
    /// Side length images are resized and center-cropped to.
    #[config(default = 64)]
    pub image_size: u32,

    /// Number of color channels fed to the models. 3 loads RGB, 1 loads luma.
    #[config(default = 3)]
    pub channels: usize,

    /// Number of images per batch.
    #[config(default = 128)]
    pub batch_size: usize,

    /// Reshuffle the image order at the start of every epoch.
    #[config(default = true)]
    pub shuffle: bool,

    /// Skip the last batch of an epoch if it is smaller than `batch_size`.
    #[config(default = false)]
    pub drop_last: bool,

    /// Probability of mirroring an image horizontally.
    #[config(default = 0.5)]
    pub flip_probability: f64,

    /// Per-channel mean subtracted after scaling pixels to [0, 1].
    #[config(default = "vec![0.5, 0.5, 0.5]")]
    pub mean: Vec<f32>,

    /// Per-channel standard deviation pixels are divided by.
    #[config(default = "vec![0.5, 0.5, 0.5]")]
    pub std: Vec<f32>,

    /// Nr. of batches the loader prepares ahead of the training loop.
    #[config(default = 4)]
    pub prefetch_batches: usize,

    /// Max size of the decoded image cache in megabytes.
    #[config(default = 2048)]
    pub cache_mb: usize,
}

impl LoadConfig {
    pub fn validate(&self) -> crate::Result<()> {
        let invalid = |msg: String| Err(DatasetError::InvalidConfig(msg));

        if self.image_size == 0 {
            return invalid("image_size must be positive".into());
        }
        if self.channels != 1 && self.channels != 3 {
            return invalid(format!("channels must be 1 or 3, got {}", self.channels));
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.flip_probability) {
            return invalid(format!(
                "flip_probability must lie in [0, 1], got {}",
                self.flip_probability
            ));
        }
        if self.mean.len() != self.channels || self.std.len() != self.channels {
            return invalid(format!(
                "mean and std need one entry per channel ({})",
                self.channels
            ));
        }
        if self.std.iter().any(|s| *s == 0.0) {
            return invalid("std entries must be non-zero".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LoadConfig;
    use burn::config::Config;

    #[test]
    fn defaults_are_valid() {
        let config = LoadConfig::new();
        assert_eq!(config.image_size, 64);
        assert_eq!(config.batch_size, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_mismatched_normalization() {
        let config = LoadConfig::new().with_channels(1);
        assert!(config.validate().is_err());

        let config = config.with_mean(vec![0.5]).with_std(vec![0.5]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_flip_probability() {
        assert!(LoadConfig::new().with_flip_probability(1.5).validate().is_err());
        assert!(LoadConfig::new().with_batch_size(0).validate().is_err());
    }

    #[test]
    fn config_survives_json() {
        let config = LoadConfig::new().with_batch_size(16).with_drop_last(true);
        let loaded = LoadConfig::load_binary(config.to_string().as_bytes()).unwrap();
        assert_eq!(loaded.batch_size, 16);
        assert!(loaded.drop_last);
        assert_eq!(loaded.mean, vec![0.5, 0.5, 0.5]);
    }
}
