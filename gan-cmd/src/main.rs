use std::path::PathBuf;

use anyhow::Context;
use burn::backend::Autodiff;
use burn::backend::ndarray::NdArrayDevice;
use burn::prelude::Config;
use burn::tensor::backend::AutodiffBackend;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use model::{CpuBackend, DeviceChoice, GpuBackend};
use pipeline::config::RunConfig;
use pipeline::message::PipelineMessage;
use pipeline::pipeline_stream::PipelineStream;
use pipeline::train_stream::TrainStream;
use tokio_stream::StreamExt;

/// Train a DCGAN on a folder of face images and export generated samples.
#[derive(Parser)]
struct Args {
    /// Dataset root with one subfolder of images per class
    #[arg(short, long)]
    data: PathBuf,

    /// Directory for the sample grid, loss plot and loss history
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of passes over the dataset
    #[arg(long)]
    epochs: Option<usize>,

    /// Number of images per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Learning rate of both optimizers
    #[arg(long)]
    lr: Option<f64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Compute device: auto, gpu or cpu
    #[arg(long, default_value_t = DeviceChoice::Auto)]
    device: DeviceChoice,

    /// JSON run configuration. Flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("Failed to read run configuration {path:?}"))?,
            None => RunConfig::new(),
        };

        if let Some(output) = &self.output {
            config.pipeline.export_path = output.to_string_lossy().into_owned();
        }
        if let Some(epochs) = self.epochs {
            config.train.num_epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.load.batch_size = batch_size;
        }
        if let Some(lr) = self.lr {
            config.train.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.pipeline.seed = seed;
        }
        Ok(config)
    }
}

async fn run<B: AutodiffBackend>(
    data: PathBuf,
    config: RunConfig,
    device: B::Device,
) -> anyhow::Result<()> {
    let num_epochs = config.train.num_epochs;
    let stream = TrainStream::<B>::new(data, config, device).launch();
    tokio::pin!(stream);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );
    while let Some(message) = stream.next().await {
        match message? {
            PipelineMessage::DatasetLoaded {
                num_images,
                num_classes,
                batches_per_epoch,
            } => {
                log::info!("Loaded {num_images} images in {num_classes} classes");
                bar.set_length((batches_per_epoch * num_epochs) as u64);
            }
            PipelineMessage::TrainStep { stats, epoch, .. } => {
                bar.set_message(format!(
                    "epoch {epoch} Loss_D {:.3} Loss_G {:.3}",
                    stats.loss_d, stats.loss_g
                ));
                bar.inc(1);
            }
            PipelineMessage::EpochFinished { .. } => {}
            PipelineMessage::Finished {
                history, exported, ..
            } => {
                bar.finish_with_message("Training complete");
                log::info!("Trained for {} batches", history.len());
                if let Some(files) = exported {
                    log::info!("Sample grid written to {:?}", files.samples);
                    log::info!("Loss plot written to {:?}", files.loss_plot);
                    log::info!("Loss history written to {:?}", files.history);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = args.run_config()?;
    config.validate()?;

    match args.device.resolve() {
        DeviceChoice::Gpu => {
            log::info!("Training on the GPU");
            let device = model::init_gpu().await;
            run::<Autodiff<GpuBackend>>(args.data, config, device).await
        }
        _ => {
            log::info!("Training on the CPU");
            run::<Autodiff<CpuBackend>>(args.data, config, NdArrayDevice::Cpu).await
        }
    }
}
