//! Pixel-level implementations of the augmentation transforms.
//!
//! All functions take an RGB image and return a new one of the same size.
//! Geometric transforms also expose their coordinate mapping so the engine
//! can move boxes with exactly the geometry used for the pixels.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

#[inline]
fn clamp_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Adds `delta` to the HSV value channel, keeping hue and saturation.
///
/// V is the largest channel, so shifting V scales all channels by `v'/v`.
/// Black pixels have no hue and become neutral gray at the new value.
pub fn adjust_brightness(image: &RgbImage, delta: i32) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let v = pixel.0.iter().copied().max().unwrap_or(0) as i32;
        let new_v = (v + delta).clamp(0, 255);
        if new_v == v {
            continue;
        }
        if v == 0 {
            *pixel = Rgb([new_v as u8; 3]);
            continue;
        }
        let ratio = new_v as f64 / v as f64;
        for channel in pixel.0.iter_mut() {
            *channel = clamp_u8(*channel as f64 * ratio);
        }
    }
    out
}

/// Scales every channel's distance from the global mean by `factor`.
pub fn adjust_contrast(image: &RgbImage, factor: f64) -> RgbImage {
    let raw = image.as_raw();
    if raw.is_empty() {
        return image.clone();
    }
    let mean = raw.iter().map(|&v| v as u64).sum::<u64>() as f64 / raw.len() as f64;
    let mut out = image.clone();
    for value in out.iter_mut() {
        *value = clamp_u8((*value as f64 - mean) * factor + mean);
    }
    out
}

pub fn flip_horizontal(image: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(image)
}

/// Rotation about the image center, in pixel coordinates.
///
/// Positive angles turn the content counter-clockwise as displayed (y axis
/// pointing down).
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    cos: f64,
    sin: f64,
    cx: f64,
    cy: f64,
}

impl Rotation {
    pub fn new(angle_deg: f64, width: u32, height: u32) -> Self {
        let radians = angle_deg.to_radians();
        Self {
            cos: radians.cos(),
            sin: radians.sin(),
            cx: width as f64 / 2.0,
            cy: height as f64 / 2.0,
        }
    }

    /// Where a source point lands in the output.
    pub fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = (x - self.cx, y - self.cy);
        (
            self.cos * dx + self.sin * dy + self.cx,
            -self.sin * dx + self.cos * dy + self.cy,
        )
    }

    /// Which source point an output point samples.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = (x - self.cx, y - self.cy);
        (
            self.cos * dx - self.sin * dy + self.cx,
            self.sin * dx + self.cos * dy + self.cy,
        )
    }
}

fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let texel = |xi: f64, yi: f64| -> [f64; 3] {
        if xi < 0.0 || yi < 0.0 || xi >= width as f64 || yi >= height as f64 {
            return [0.0; 3];
        }
        let p = image.get_pixel(xi as u32, yi as u32);
        [p[0] as f64, p[1] as f64, p[2] as f64]
    };

    let tl = texel(x0, y0);
    let tr = texel(x0 + 1.0, y0);
    let bl = texel(x0, y0 + 1.0);
    let br = texel(x0 + 1.0, y0 + 1.0);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = tl[c] * (1.0 - fx) + tr[c] * fx;
        let bottom = bl[c] * (1.0 - fx) + br[c] * fx;
        out[c] = clamp_u8(top * (1.0 - fy) + bottom * fy);
    }
    Rgb(out)
}

/// Rotates about the center with bilinear sampling and a black border.
pub fn rotate(image: &RgbImage, angle_deg: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    if angle_deg == 0.0 {
        return image.clone();
    }
    let rotation = Rotation::new(angle_deg, width, height);
    RgbImage::from_fn(width, height, |x, y| {
        let (sx, sy) = rotation.inverse(x as f64, y as f64);
        sample_bilinear(image, sx, sy)
    })
}

/// Normalized-coordinate mapping of a zoom: `c' = c * scale + offset` per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomGeometry {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ZoomGeometry {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Computes the exact crop (zoom in) or pad (zoom out) window for an
    /// image of the given size.
    pub fn for_factor(factor: f64, width: u32, height: u32) -> (Self, ZoomWindow) {
        let (w, h) = (width as f64, height as f64);
        if factor > 1.0 {
            let new_w = ((w / factor).floor() as u32).clamp(1, width.max(1));
            let new_h = ((h / factor).floor() as u32).clamp(1, height.max(1));
            let left = (width - new_w) / 2;
            let top = (height - new_h) / 2;
            let geometry = Self {
                scale_x: w / new_w as f64,
                scale_y: h / new_h as f64,
                offset_x: -(left as f64) / new_w as f64,
                offset_y: -(top as f64) / new_h as f64,
            };
            (geometry, ZoomWindow::Crop { left, top, width: new_w, height: new_h })
        } else if factor < 1.0 {
            let new_w = ((w * factor).round() as u32).clamp(1, width.max(1));
            let new_h = ((h * factor).round() as u32).clamp(1, height.max(1));
            let left = (width - new_w) / 2;
            let top = (height - new_h) / 2;
            let geometry = Self {
                scale_x: new_w as f64 / w,
                scale_y: new_h as f64 / h,
                offset_x: left as f64 / w,
                offset_y: top as f64 / h,
            };
            (geometry, ZoomWindow::Pad { left, top, width: new_w, height: new_h })
        } else {
            (Self::identity(), ZoomWindow::None)
        }
    }

    pub fn map_x(&self, x: f64) -> f64 {
        x * self.scale_x + self.offset_x
    }

    pub fn map_y(&self, y: f64) -> f64 {
        y * self.scale_y + self.offset_y
    }
}

/// Pixel window of a zoom, in source pixels (crop) or output pixels (pad).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomWindow {
    None,
    Crop { left: u32, top: u32, width: u32, height: u32 },
    Pad { left: u32, top: u32, width: u32, height: u32 },
}

/// Applies a zoom and returns the image with its coordinate mapping.
pub fn zoom(image: &RgbImage, factor: f64) -> (RgbImage, ZoomGeometry) {
    let (width, height) = image.dimensions();
    let (geometry, window) = ZoomGeometry::for_factor(factor, width, height);
    let zoomed = match window {
        ZoomWindow::None => image.clone(),
        ZoomWindow::Crop { left, top, width: cw, height: ch } => {
            let cropped = imageops::crop_imm(image, left, top, cw, ch).to_image();
            imageops::resize(&cropped, width, height, FilterType::Triangle)
        }
        ZoomWindow::Pad { left, top, width: pw, height: ph } => {
            let shrunk = imageops::resize(image, pw, ph, FilterType::Triangle);
            let mut canvas = RgbImage::new(width, height);
            imageops::replace(&mut canvas, &shrunk, left as i64, top as i64);
            canvas
        }
    };
    (zoomed, geometry)
}

/// Adds independent `N(0, std_dev)` noise to every channel value.
pub fn add_gaussian_noise(image: &RgbImage, std_dev: f64, seed: u64) -> RgbImage {
    let mut out = image.clone();
    if std_dev <= 0.0 {
        return out;
    }
    let normal = match Normal::new(0.0, std_dev) {
        Ok(normal) => normal,
        Err(e) => {
            log::warn!("Skipping noise with standard deviation {std_dev}: {e}");
            return out;
        }
    };
    let mut rng = StdRng::seed_from_u64(seed);
    for value in out.iter_mut() {
        *value = clamp_u8(*value as f64 + rng.sample(normal));
    }
    out
}
