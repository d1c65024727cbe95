use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::msg::{EpochStats, TrainStepStats};

/// Per-batch losses of both networks, indexed by the global batch counter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LossHistory {
    generator: Vec<f32>,
    discriminator: Vec<f32>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stats: &TrainStepStats) {
        self.generator.push(stats.loss_g);
        self.discriminator.push(stats.loss_d);
    }

    pub fn len(&self) -> usize {
        self.generator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generator.is_empty()
    }

    pub fn generator(&self) -> &[f32] {
        &self.generator
    }

    pub fn discriminator(&self) -> &[f32] {
        &self.discriminator
    }

    /// Mean losses over the last `num_batches` entries.
    pub fn epoch_stats(&self, epoch: usize, num_batches: usize) -> EpochStats {
        let start = self.len().saturating_sub(num_batches);
        let mean = |values: &[f32]| {
            let tail = &values[start..];
            if tail.is_empty() {
                0.0
            } else {
                tail.iter().sum::<f32>() / tail.len() as f32
            }
        };
        EpochStats {
            epoch,
            num_batches: self.len() - start,
            mean_loss_d: mean(&self.discriminator),
            mean_loss_g: mean(&self.generator),
        }
    }

    pub fn save_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::LossHistory;
    use crate::msg::TrainStepStats;

    fn stats(loss_d: f32, loss_g: f32) -> TrainStepStats {
        TrainStepStats {
            loss_d,
            loss_g,
            d_x: 0.5,
            d_g_z1: 0.5,
            d_g_z2: 0.5,
        }
    }

    #[test]
    fn lengths_stay_equal() {
        let mut history = LossHistory::new();
        assert!(history.is_empty());
        for i in 0..5 {
            history.push(&stats(i as f32, -(i as f32)));
            assert_eq!(history.generator().len(), history.discriminator().len());
            assert_eq!(history.len(), i + 1);
        }
        assert_eq!(history.discriminator(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn epoch_means_cover_last_batches() {
        let mut history = LossHistory::new();
        for (d, g) in [(4.0, 0.0), (1.0, 2.0), (3.0, 4.0)] {
            history.push(&stats(d, g));
        }
        let epoch = history.epoch_stats(2, 2);
        assert_eq!(epoch.num_batches, 2);
        assert_eq!(epoch.mean_loss_d, 2.0);
        assert_eq!(epoch.mean_loss_g, 3.0);
    }

    #[test]
    fn json_keeps_both_series() {
        let mut history = LossHistory::new();
        history.push(&stats(1.5, 0.25));
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json["generator"][0], 0.25);
        assert_eq!(json["discriminator"][0], 1.5);
    }
}
