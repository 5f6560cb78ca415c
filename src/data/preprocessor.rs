// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns an image file into the float pixels the model expects.
//
// Steps (applied in order):
//   1. Decode the file (any format the `image` crate knows)
//   2. Resize to the target height × width, nearest-neighbour
//   3. Convert to RGB f32 in [0, 1]   (the 1/255 rescale)
//
// The model consumes channel-first data, so `to_chw` flattens
// an RGB image into [R plane, G plane, B plane].
//
// Reference: image crate documentation (DynamicImage, Rgb32FImage)

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, Rgb32FImage};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    height: u32,
    width:  u32,
}

impl Preprocessor {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height: height as u32, width: width as u32 }
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Decode, resize and rescale an image from disk.
    pub fn load(&self, path: &Path) -> Result<Rgb32FImage> {
        let img = image::open(path)
            .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
        Ok(self.prepare(img))
    }

    /// Resize an already decoded image and rescale it to [0, 1].
    pub fn prepare(&self, img: DynamicImage) -> Rgb32FImage {
        let img = if img.width() == self.width && img.height() == self.height {
            img
        } else {
            img.resize_exact(self.width, self.height, FilterType::Nearest)
        };
        img.to_rgb32f()
    }

    /// Number of f32 values one preprocessed image occupies
    pub fn pixels_per_image(&self) -> usize {
        3 * self.height() * self.width()
    }
}

/// Flatten an RGB image from (H, W, C) into channel-first (C, H, W) order.
pub fn to_chw(img: &Rgb32FImage) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let mut data = Vec::with_capacity(3 * (width * height) as usize);

    for channel in 0..3 {
        for y in 0..height {
            for x in 0..width {
                data.push(img.get_pixel(x, y)[channel]);
            }
        }
    }
    data
}
