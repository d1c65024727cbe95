use std::path::PathBuf;

use burn::prelude::{Backend, Tensor};
use train::history::LossHistory;
use train::msg::{EpochStats, TrainStepStats};

/// Files written at the end of a run.
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub samples: PathBuf,
    pub loss_plot: PathBuf,
    pub history: PathBuf,
}

#[derive(Debug)]
pub enum PipelineMessage<B: Backend> {
    DatasetLoaded {
        num_images: usize,
        num_classes: usize,
        batches_per_epoch: usize,
    },
    /// One batch was trained on.
    TrainStep {
        stats: TrainStepStats,
        epoch: usize,
        batch: usize,
        /// Global batch counter, starting at 1.
        iter: usize,
    },
    EpochFinished {
        stats: EpochStats,
    },
    Finished {
        history: LossHistory,
        /// Generator output for the fixed latent batch, in [-1, 1].
        samples: Tensor<B, 4>,
        exported: Option<ExportedFiles>,
    },
}
