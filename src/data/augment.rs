// ============================================================
// Layer 4 — Random Image Augmentation
// ============================================================
// Applies a random affine warp (+ optional mirror) to each
// training image so the network sees a slightly different
// version of every photo each epoch.
//
// Parameters drawn per image (same conventions as Keras'
// ImageDataGenerator):
//
//   theta  ~ U(-rotation_range, +rotation_range)        degrees
//   tx     ~ U(-height_shift, +height_shift) * height   rows
//   ty     ~ U(-width_shift,  +width_shift)  * width    cols
//   shear  ~ U(-shear_range, +shear_range)              degrees
//   zx, zy ~ U(1 - zoom_range, 1 + zoom_range)          independent
//   flip   ~ Bernoulli(0.5)                             if enabled
//
// A shift range >= 1 is read as an absolute pixel count.
//
// The affine matrix maps OUTPUT (row, col) to INPUT coordinates:
//
//   M = C · R(theta) · T(tx, ty) · S(shear) · Z(zx, zy) · C⁻¹
//
// where C moves the origin to the image centre. Input
// coordinates falling outside the image are clamped to the
// nearest edge pixel ("nearest" fill), and sampling between
// pixels is bilinear. The mirror is applied after the warp.
//
// Reference: rand crate (Rng::gen_range)
//            Keras ImageDataGenerator.apply_transform

use image::{Rgb, Rgb32FImage};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Ranges for random augmentation. All zero / false means "no-op".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentConfig {
    pub rotation_range:     f64,
    pub width_shift_range:  f64,
    pub height_shift_range: f64,
    pub shear_range:        f64,
    pub zoom_range:         f64,
    pub horizontal_flip:    bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            rotation_range:     20.0,
            width_shift_range:  0.2,
            height_shift_range: 0.2,
            shear_range:        0.2,
            zoom_range:         0.2,
            horizontal_flip:    true,
        }
    }
}

impl AugmentConfig {
    pub fn disabled() -> Self {
        Self {
            rotation_range:     0.0,
            width_shift_range:  0.0,
            height_shift_range: 0.0,
            shear_range:        0.0,
            zoom_range:         0.0,
            horizontal_flip:    false,
        }
    }

    pub fn is_disabled(&self) -> bool {
        *self == Self::disabled()
    }

    /// Draw one set of transform parameters for an image of the given size.
    pub fn sample<R: Rng>(&self, rng: &mut R, height: usize, width: usize) -> TransformParams {
        if self.is_disabled() {
            return TransformParams::identity();
        }
        let theta = symmetric(rng, self.rotation_range);

        let mut tx = symmetric(rng, self.height_shift_range);
        if self.height_shift_range < 1.0 {
            tx *= height as f64;
        }
        let mut ty = symmetric(rng, self.width_shift_range);
        if self.width_shift_range < 1.0 {
            ty *= width as f64;
        }

        let shear = symmetric(rng, self.shear_range);

        let (zx, zy) = if self.zoom_range > 0.0 {
            let lo = 1.0 - self.zoom_range;
            let hi = 1.0 + self.zoom_range;
            (rng.gen_range(lo..hi), rng.gen_range(lo..hi))
        } else {
            (1.0, 1.0)
        };

        let flip_horizontal = self.horizontal_flip && rng.gen_bool(0.5);

        TransformParams { theta, tx, ty, shear, zx, zy, flip_horizontal }
    }
}

fn symmetric<R: Rng>(rng: &mut R, range: f64) -> f64 {
    if range > 0.0 {
        rng.gen_range(-range..range)
    } else {
        0.0
    }
}

/// One concrete draw of augmentation parameters.
/// Angles are in degrees, shifts in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParams {
    pub theta:           f64,
    pub tx:              f64,
    pub ty:              f64,
    pub shear:           f64,
    pub zx:              f64,
    pub zy:              f64,
    pub flip_horizontal: bool,
}

impl TransformParams {
    pub fn identity() -> Self {
        Self { theta: 0.0, tx: 0.0, ty: 0.0, shear: 0.0, zx: 1.0, zy: 1.0, flip_horizontal: false }
    }

    /// Output→input coordinate map, centred on the image, or None when
    /// the warp would be the identity.
    fn matrix(&self, height: usize, width: usize) -> Option<Mat3> {
        let mut m: Option<Mat3> = None;
        let mut push = |next: Mat3| {
            m = Some(match m {
                Some(prev) => prev.matmul(&next),
                None       => next,
            });
        };

        if self.theta != 0.0 {
            let t = self.theta.to_radians();
            push([[t.cos(), -t.sin(), 0.0], [t.sin(), t.cos(), 0.0], [0.0, 0.0, 1.0]]);
        }
        if self.tx != 0.0 || self.ty != 0.0 {
            push([[1.0, 0.0, self.tx], [0.0, 1.0, self.ty], [0.0, 0.0, 1.0]]);
        }
        if self.shear != 0.0 {
            let s = self.shear.to_radians();
            push([[1.0, -s.sin(), 0.0], [0.0, s.cos(), 0.0], [0.0, 0.0, 1.0]]);
        }
        if self.zx != 1.0 || self.zy != 1.0 {
            push([[self.zx, 0.0, 0.0], [0.0, self.zy, 0.0], [0.0, 0.0, 1.0]]);
        }

        let m  = m?;
        let ox = height as f64 / 2.0 - 0.5;
        let oy = width  as f64 / 2.0 - 0.5;
        let offset = [[1.0, 0.0, ox], [0.0, 1.0, oy], [0.0, 0.0, 1.0]];
        let reset  = [[1.0, 0.0, -ox], [0.0, 1.0, -oy], [0.0, 0.0, 1.0]];
        Some(offset.matmul(&m).matmul(&reset))
    }
}

type Mat3 = [[f64; 3]; 3];

trait MatMul {
    fn matmul(&self, rhs: &Mat3) -> Mat3;
}

impl MatMul for Mat3 {
    fn matmul(&self, rhs: &Mat3) -> Mat3 {
        let mut out = [[0.0; 3]; 3];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self[i][k] * rhs[k][j]).sum();
            }
        }
        out
    }
}

/// Draws random parameters from an AugmentConfig and applies them.
#[derive(Debug, Clone)]
pub struct ImageAugmenter {
    config: AugmentConfig,
}

impl ImageAugmenter {
    pub fn new(config: AugmentConfig) -> Self {
        Self { config }
    }

    pub fn augment<R: Rng>(&self, img: &Rgb32FImage, rng: &mut R) -> Rgb32FImage {
        if self.config.is_disabled() {
            return img.clone();
        }
        let (w, h) = img.dimensions();
        let params = self.config.sample(rng, h as usize, w as usize);
        apply_transform(img, &params)
    }
}

/// Warp `img` with the given parameters.
pub fn apply_transform(img: &Rgb32FImage, params: &TransformParams) -> Rgb32FImage {
    let (width, height) = img.dimensions();

    let mut out = match params.matrix(height as usize, width as usize) {
        Some(m) => Rgb32FImage::from_fn(width, height, |col, row| {
            let (r, c) = (row as f64, col as f64);
            let src_r = m[0][0] * r + m[0][1] * c + m[0][2];
            let src_c = m[1][0] * r + m[1][1] * c + m[1][2];
            sample_bilinear(img, src_r, src_c)
        }),
        None => img.clone(),
    };

    if params.flip_horizontal {
        image::imageops::flip_horizontal_in_place(&mut out);
    }
    out
}

/// Bilinear lookup with edge clamping. `r`/`c` are row/column coordinates.
fn sample_bilinear(img: &Rgb32FImage, r: f64, c: f64) -> Rgb<f32> {
    let (width, height) = img.dimensions();
    let max_r = (height - 1) as f64;
    let max_c = (width - 1) as f64;

    let r = r.clamp(0.0, max_r);
    let c = c.clamp(0.0, max_c);

    let r0 = r.floor();
    let c0 = c.floor();
    let dr = (r - r0) as f32;
    let dc = (c - c0) as f32;

    let r1 = (r0 + 1.0).min(max_r) as u32;
    let c1 = (c0 + 1.0).min(max_c) as u32;
    let (r0, c0) = (r0 as u32, c0 as u32);

    let p00 = img.get_pixel(c0, r0);
    let p01 = img.get_pixel(c1, r0);
    let p10 = img.get_pixel(c0, r1);
    let p11 = img.get_pixel(c1, r1);

    let mut px = [0.0f32; 3];
    for (ch, v) in px.iter_mut().enumerate() {
        let top    = p00[ch] * (1.0 - dc) + p01[ch] * dc;
        let bottom = p10[ch] * (1.0 - dc) + p11[ch] * dc;
        *v = top * (1.0 - dr) + bottom * dr;
    }
    Rgb(px)
}
