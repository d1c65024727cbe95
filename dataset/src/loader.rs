use std::sync::Arc;

use burn::prelude::{Backend, Int, Tensor, TensorData};
use image::DynamicImage;
use rand::SeedableRng;
use rand::prelude::SliceRandom;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{self, Receiver};

use crate::config::LoadConfig;
use crate::error::{DatasetError, Result};
use crate::folder::{ImageFolder, ImageSample};
use crate::transform::Preprocess;

#[derive(Clone, Debug)]
pub struct ImageBatch<B: Backend> {
    /// [batch, channels, size, size], normalized.
    pub images: Tensor<B, 4>,
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.images.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum LoaderItem<B: Backend> {
    Batch(ImageBatch<B>),
    EpochEnd,
}

/// Caches the resized and cropped images. The random flip is applied after the cache.
struct ImageCache {
    states: Vec<Option<Arc<DynamicImage>>>,
    max_bytes: usize,
    size: usize,
}

impl ImageCache {
    fn new(max_bytes: usize, n_images: usize) -> Self {
        Self {
            states: vec![None; n_images],
            max_bytes,
            size: 0,
        }
    }

    fn try_get(&self, index: usize) -> Option<Arc<DynamicImage>> {
        self.states[index].clone()
    }

    fn insert(&mut self, index: usize, data: Arc<DynamicImage>) {
        let data_size = data.as_bytes().len();

        if self.size + data_size <= self.max_bytes && self.states[index].is_none() {
            self.states[index] = Some(data);
            self.size += data_size;
        }
    }
}

/// Yields shuffled batches of an [`ImageFolder`], epoch after epoch.
///
/// Batches are prepared by a single background task so the order only depends on the seed.
pub struct BatchLoader<B: Backend> {
    receiver: Receiver<Result<LoaderItem<B>>>,
    batches_per_epoch: usize,
}

impl<B: Backend> BatchLoader<B> {
    /// Starts the loading task. Must be called from within a tokio runtime.
    pub fn new(
        folder: &ImageFolder,
        config: &LoadConfig,
        seed: u64,
        device: &B::Device,
    ) -> Result<Self> {
        config.validate()?;

        let batches_per_epoch = folder.batches_per_epoch(config.batch_size, config.drop_last);
        if batches_per_epoch == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "drop_last with batch size {} leaves no batches for {} images",
                config.batch_size,
                folder.len()
            )));
        }

        // The bounded size == number of batches to prefetch.
        let (sender, receiver) = mpsc::channel(config.prefetch_batches.max(1));

        let samples = folder.samples.clone();
        let preprocess = Preprocess::new(config);
        let batch_size = config.batch_size;
        let shuffle = config.shuffle;
        let drop_last = config.drop_last;
        let mut cache = ImageCache::new(config.cache_mb * 1024 * 1024, samples.len());
        let mut rng = StdRng::seed_from_u64(seed);
        let device = device.clone();

        tokio::spawn(async move {
            let mut indices: Vec<usize> = (0..samples.len()).collect();

            loop {
                if shuffle {
                    indices.shuffle(&mut rng);
                }

                for chunk in indices.chunks(batch_size) {
                    if drop_last && chunk.len() < batch_size {
                        break;
                    }

                    let batch = load_batch(
                        chunk,
                        &samples,
                        &mut cache,
                        &preprocess,
                        &mut rng,
                        &device,
                    );
                    let failed = batch.is_err();
                    if sender.send(batch.map(LoaderItem::Batch)).await.is_err() || failed {
                        return;
                    }
                }

                if sender.send(Ok(LoaderItem::EpochEnd)).await.is_err() {
                    return;
                }
            }
        });

        Ok(Self {
            receiver,
            batches_per_epoch,
        })
    }

    pub fn batches_per_epoch(&self) -> usize {
        self.batches_per_epoch
    }

    /// The next batch of the current epoch, or `None` once the epoch is exhausted.
    /// The call after a `None` starts the next epoch.
    pub async fn next_batch(&mut self) -> Result<Option<ImageBatch<B>>> {
        match self.receiver.recv().await {
            Some(Ok(LoaderItem::Batch(batch))) => Ok(Some(batch)),
            Some(Ok(LoaderItem::EpochEnd)) => Ok(None),
            Some(Err(err)) => Err(err),
            None => Err(DatasetError::LoaderClosed),
        }
    }
}

fn load_batch<B: Backend>(
    indices: &[usize],
    samples: &[ImageSample],
    cache: &mut ImageCache,
    preprocess: &Preprocess,
    rng: &mut StdRng,
    device: &B::Device,
) -> Result<ImageBatch<B>> {
    let mut data = Vec::with_capacity(indices.len() * preprocess.sample_len());
    let mut labels = Vec::with_capacity(indices.len());

    for &index in indices {
        let sample = &samples[index];
        let image = if let Some(image) = cache.try_get(index) {
            image
        } else {
            let image = Arc::new(preprocess.resize_crop(&sample.image.load()?));
            cache.insert(index, image.clone());
            image
        };

        let flip = preprocess.sample_flip(rng);
        data.extend(preprocess.normalize_chw(&image, flip));
        labels.push(sample.label as i64);
    }

    let size = preprocess.size() as usize;
    let shape = [indices.len(), preprocess.channels(), size, size];
    Ok(ImageBatch {
        images: Tensor::from_data(TensorData::new(data, shape), device),
        labels: Tensor::from_data(TensorData::new(labels, [indices.len()]), device),
    })
}

#[cfg(test)]
mod tests {
    use super::BatchLoader;
    use crate::config::LoadConfig;
    use crate::folder::ImageFolder;
    use crate::folder::tests::write_solid;
    use burn::backend::NdArray;
    use burn::backend::ndarray::NdArrayDevice;

    type TestBackend = NdArray;

    fn folder_with(n: usize) -> (tempfile::TempDir, ImageFolder) {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..n {
            let class = if i % 2 == 0 { "even" } else { "odd" };
            let shade = (i * 40) as u8;
            write_solid(
                &dir.path().join(format!("{class}/{i}.png")),
                (20, 12),
                [shade, shade, shade],
            );
        }
        let folder = ImageFolder::open(dir.path()).unwrap();
        (dir, folder)
    }

    async fn epoch_sizes(loader: &mut BatchLoader<TestBackend>) -> Vec<usize> {
        let mut sizes = vec![];
        while let Some(batch) = loader.next_batch().await.unwrap() {
            sizes.push(batch.len());
        }
        sizes
    }

    #[tokio::test]
    async fn epochs_restart_with_partial_last_batch() {
        let (_dir, folder) = folder_with(5);
        let config = LoadConfig::new().with_image_size(8).with_batch_size(2);
        let mut loader =
            BatchLoader::<TestBackend>::new(&folder, &config, 7, &NdArrayDevice::Cpu).unwrap();

        assert_eq!(loader.batches_per_epoch(), 3);
        assert_eq!(epoch_sizes(&mut loader).await, vec![2, 2, 1]);
        assert_eq!(epoch_sizes(&mut loader).await, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn drop_last_skips_partial_batch() {
        let (_dir, folder) = folder_with(5);
        let config = LoadConfig::new()
            .with_image_size(8)
            .with_batch_size(2)
            .with_drop_last(true);
        let mut loader =
            BatchLoader::<TestBackend>::new(&folder, &config, 7, &NdArrayDevice::Cpu).unwrap();

        assert_eq!(loader.batches_per_epoch(), 2);
        assert_eq!(epoch_sizes(&mut loader).await, vec![2, 2]);
    }

    #[tokio::test]
    async fn batches_are_normalized_tensors() {
        let (_dir, folder) = folder_with(3);
        let config = LoadConfig::new().with_image_size(8).with_batch_size(4);
        let mut loader =
            BatchLoader::<TestBackend>::new(&folder, &config, 1, &NdArrayDevice::Cpu).unwrap();

        let batch = loader.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.images.dims(), [3, 3, 8, 8]);
        assert_eq!(batch.labels.dims(), [3]);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn same_seed_same_order() {
        let (_dir, folder) = folder_with(6);
        let config = LoadConfig::new().with_image_size(4).with_batch_size(6);

        let mut orders = vec![];
        for _ in 0..2 {
            let mut loader =
                BatchLoader::<TestBackend>::new(&folder, &config, 42, &NdArrayDevice::Cpu)
                    .unwrap();
            let batch = loader.next_batch().await.unwrap().unwrap();
            orders.push(batch.images.into_data().to_vec::<f32>().unwrap());
        }
        assert_eq!(orders[0], orders[1]);
    }

    #[tokio::test]
    async fn impossible_drop_last_is_rejected() {
        let (_dir, folder) = folder_with(2);
        let config = LoadConfig::new().with_batch_size(4).with_drop_last(true);
        assert!(
            BatchLoader::<TestBackend>::new(&folder, &config, 0, &NdArrayDevice::Cpu).is_err()
        );
    }
}
