// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageSample>
// into GPU-ready tensors.
//
// For every sample in the mini-batch:
//   1. Decode + resize + rescale   (Preprocessor)
//   2. Random warp / mirror         (ImageAugmenter, optional)
//   3. Flatten to channel-first     (to_chw)
//
// All samples are concatenated into one flat Vec<f32> and
// uploaded in a single transfer, then viewed as
// [batch, 3, height, width].
//
// A file that fails to decode does not abort the epoch: it is
// logged and replaced by an all-black image with its label kept.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{
    augment::ImageAugmenter,
    preprocessor::{to_chw, Preprocessor},
};
use crate::domain::image_sample::ImageSample;

// ─── ImageBatch ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Pixels in [0, 1] — shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,

    /// Class labels — shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

// ─── ImageBatcher ─────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    device:       B::Device,
    preprocessor: Preprocessor,
    /// None → no augmentation (plain rescale only)
    augmenter:    Option<ImageAugmenter>,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, preprocessor: Preprocessor, augmenter: Option<ImageAugmenter>) -> Self {
        Self { device, preprocessor, augmenter }
    }

    fn load_pixels(&self, sample: &ImageSample) -> Vec<f32> {
        match self.preprocessor.load(&sample.path) {
            Ok(img) => {
                let img = match &self.augmenter {
                    Some(aug) => aug.augment(&img, &mut rand::thread_rng()),
                    None      => img,
                };
                to_chw(&img)
            }
            Err(e) => {
                tracing::warn!("{e:#}; substituting a blank image");
                vec![0.0; self.preprocessor.pixels_per_image()]
            }
        }
    }
}

impl<B: Backend> Batcher<B, ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>, _device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let height     = self.preprocessor.height();
        let width      = self.preprocessor.width();

        let mut pixels  = Vec::with_capacity(batch_size * self.preprocessor.pixels_per_image());
        let mut targets = Vec::with_capacity(batch_size);

        for item in &items {
            pixels.extend(self.load_pixels(item));
            targets.push(item.label as i64);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, height, width]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    #[test]
    fn test_batch_shapes_and_labels() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])).save(&a).unwrap();
        RgbImage::from_pixel(3, 5, Rgb([0, 0, 255])).save(&b).unwrap();

        let device  = Default::default();
        let batcher = ImageBatcher::<TestBackend>::new(device, Preprocessor::new(6, 4), None);
        let batch   = batcher.batch(
            vec![ImageSample::new(&a, 0), ImageSample::new(&b, 2)],
            &Default::default(),
        );

        assert_eq!(batch.images.dims(), [2, 3, 6, 4]);
        let labels: Vec<i64> = batch.targets.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(labels, vec![0, 2]);

        // Sample 0 is pure red: R plane all 1, B plane all 0
        let values: Vec<f32> = batch.images.into_data().convert::<f32>().to_vec().unwrap();
        let plane = 6 * 4;
        assert!(values[..plane].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(values[2 * plane..3 * plane].iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn test_unreadable_file_becomes_blank_image() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.jpg");
        std::fs::write(&bad, b"garbage").unwrap();

        let batcher = ImageBatcher::<TestBackend>::new(Default::default(), Preprocessor::new(4, 4), None);
        let batch   = batcher.batch(vec![ImageSample::new(&bad, 1)], &Default::default());

        let values: Vec<f32> = batch.images.into_data().convert::<f32>().to_vec().unwrap();
        assert_eq!(values.len(), 48);
        assert!(values.iter().all(|&v| v == 0.0));
    }
}
