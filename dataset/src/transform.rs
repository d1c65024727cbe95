use image::DynamicImage;
use image::imageops::FilterType;
use rand::Rng;

use crate::config::LoadConfig;

/// The fixed preprocessing chain: resize, center crop, random flip, scale to [0, 1]
/// and normalize per channel.
#[derive(Clone, Debug)]
pub struct Preprocess {
    size: u32,
    channels: usize,
    flip_probability: f64,
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Preprocess {
    pub fn new(config: &LoadConfig) -> Self {
        Self {
            size: config.image_size,
            channels: config.channels,
            flip_probability: config.flip_probability,
            mean: config.mean.clone(),
            std: config.std.clone(),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of f32 values one preprocessed image occupies.
    pub fn sample_len(&self) -> usize {
        self.channels * (self.size * self.size) as usize
    }

    /// The deterministic part of the chain. The result is safe to cache across epochs.
    pub fn resize_crop(&self, image: &DynamicImage) -> DynamicImage {
        let image = if self.channels == 1 {
            DynamicImage::ImageLuma8(image.to_luma8())
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        };

        let (w, h) = (image.width(), image.height());
        // Shorter side becomes `size`, the longer one keeps the aspect ratio.
        let (nw, nh) = if w <= h {
            (self.size, ((self.size as u64 * h as u64) / w as u64) as u32)
        } else {
            (((self.size as u64 * w as u64) / h as u64) as u32, self.size)
        };

        let resized = if (nw, nh) == (w, h) {
            image
        } else {
            image.resize_exact(nw, nh, FilterType::Triangle)
        };

        if (nw, nh) == (self.size, self.size) {
            return resized;
        }
        let left = ((nw - self.size) as f32 / 2.0).round() as u32;
        let top = ((nh - self.size) as f32 / 2.0).round() as u32;
        resized.crop_imm(left, top, self.size, self.size)
    }

    pub fn sample_flip(&self, rng: &mut impl Rng) -> bool {
        rng.random_bool(self.flip_probability)
    }

    /// Converts a [`Preprocess::resize_crop`] output to normalized CHW floats,
    /// mirrored horizontally if `flip` is set.
    pub fn normalize_chw(&self, image: &DynamicImage, flip: bool) -> Vec<f32> {
        let c = self.channels;
        let w = image.width() as usize;
        let plane = w * image.height() as usize;

        let mut data = vec![0.0; c * plane];
        for (i, pixel) in image.as_bytes().chunks_exact(c).enumerate() {
            let (y, x) = (i / w, i % w);
            let x = if flip { w - 1 - x } else { x };
            let idx = y * w + x;
            for (ch, value) in pixel.iter().enumerate() {
                data[ch * plane + idx] = (*value as f32 / 255.0 - self.mean[ch]) / self.std[ch];
            }
        }
        data
    }
}
