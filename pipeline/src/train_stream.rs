use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use async_fn_stream::TryStreamEmitter;
use async_trait::async_trait;
use burn::tensor::backend::AutodiffBackend;
use dataset::{BatchLoader, ImageFolder};
use model::sample_latent;
use rand::SeedableRng;
use rand::rngs::StdRng;
use train::history::LossHistory;
use train::train::{GanTrainer, generate};

use crate::config::RunConfig;
use crate::export::export_run;
use crate::message::PipelineMessage;
use crate::pipeline_stream::PipelineStream;

/// Trains the generator and discriminator on an image folder, then renders the fixed samples.
pub struct TrainStream<B: AutodiffBackend> {
    data_root: PathBuf,
    config: RunConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> TrainStream<B> {
    pub fn new(data_root: PathBuf, config: RunConfig, device: B::Device) -> Self {
        Self {
            data_root,
            config,
            device,
        }
    }
}

#[async_trait(?Send)]
impl<B: AutodiffBackend> PipelineStream for TrainStream<B> {
    type Message = PipelineMessage<B::InnerBackend>;

    async fn run(
        &mut self,
        emitter: TryStreamEmitter<Self::Message, anyhow::Error>,
    ) -> anyhow::Result<()> {
        let config = &self.config;
        config.validate()?;

        let folder = ImageFolder::open(&self.data_root)
            .with_context(|| format!("Failed to open dataset at {:?}", self.data_root))?;

        let pipeline_config = &config.pipeline;
        let num_epochs = config.train.num_epochs;
        log::info!("Using seed {}", pipeline_config.seed);
        B::seed(pipeline_config.seed);
        let mut rng = StdRng::seed_from_u64(pipeline_config.seed);

        let mut models = config.train.init_models::<B>(&mut rng, &self.device)?;

        // Held out from training, rendered once at the end.
        let fixed_noise = sample_latent::<B::InnerBackend>(
            pipeline_config.sample_count,
            config.train.generator.latent_dim,
            &mut rng,
            &self.device,
        );

        let mut loader =
            BatchLoader::<B>::new(&folder, &config.load, pipeline_config.seed, &self.device)?;
        let num_batches = loader.batches_per_epoch();

        emitter
            .emit(PipelineMessage::DatasetLoaded {
                num_images: folder.len(),
                num_classes: folder.num_classes(),
                batches_per_epoch: num_batches,
            })
            .await;

        let mut trainer = GanTrainer::<B>::new(&config.train);
        let mut history = LossHistory::new();

        log::info!("Start training loop.");
        let start = Instant::now();
        for epoch in 0..num_epochs {
            let epoch_start = Instant::now();
            let mut batch_idx = 0;

            while let Some(batch) = loader.next_batch().await? {
                let (new_models, stats) = trainer.step(models, batch.images, &mut rng);
                models = new_models;
                history.push(&stats);
                batch_idx += 1;

                if batch_idx % pipeline_config.log_every == 0 || batch_idx == num_batches {
                    log::info!(
                        "[{}/{}][{}/{}] Loss_D: {:.4} Loss_G: {:.4} D(x): {:.4} D(G(z)): {:.4} / {:.4}",
                        epoch + 1,
                        num_epochs,
                        batch_idx,
                        num_batches,
                        stats.loss_d,
                        stats.loss_g,
                        stats.d_x,
                        stats.d_g_z1,
                        stats.d_g_z2,
                    );
                }

                emitter
                    .emit(PipelineMessage::TrainStep {
                        stats,
                        epoch: epoch + 1,
                        batch: batch_idx,
                        iter: history.len(),
                    })
                    .await;
            }

            let stats = history.epoch_stats(epoch + 1, batch_idx);
            log::info!(
                "Epoch {}/{} done in {:.1?} ({:.1?} elapsed): mean Loss_D {:.4}, mean Loss_G {:.4}",
                epoch + 1,
                num_epochs,
                epoch_start.elapsed(),
                start.elapsed(),
                stats.mean_loss_d,
                stats.mean_loss_g,
            );
            emitter.emit(PipelineMessage::EpochFinished { stats }).await;
        }

        let samples = generate(&models.generator, fixed_noise);

        let exported = if pipeline_config.save_to_disk {
            let files = export_run(pipeline_config, samples.clone(), &history)
                .await
                .context("Failed to export training results")?;
            Some(files)
        } else {
            None
        };

        emitter
            .emit(PipelineMessage::Finished {
                history,
                samples,
                exported,
            })
            .await;
        Ok(())
    }
}
