//! Annotation-aware augmentation engine.
//!
//! Applies a `TransformSpec` to an image and its boxes in the fixed order
//! brightness, contrast, horizontal flip, rotation, zoom, noise. Photometric
//! transforms leave boxes alone; geometric ones move them with the same
//! geometry used for the pixels. The result is re-validated before it is
//! returned.

use crate::augment::annotation::{Annotation, ClassSet};
use crate::augment::pixel::{self, Rotation, ZoomGeometry};
use crate::augment::transform::TransformSpec;
use crate::config::{AugmentationConfig, RotationBoxMode};
use crate::error::{CoreError, CoreResult};

use image::RgbImage;
use rand::Rng;

/// An augmented image with its boxes and the spec that produced it.
#[derive(Debug, Clone)]
pub struct AugmentedSample {
    pub sample_id: usize,
    pub image: RgbImage,
    pub annotations: Vec<Annotation>,
    pub spec: TransformSpec,
    pub provenance: String,
    /// Boxes lost to clipping during this sample
    pub dropped_annotations: usize,
}

#[derive(Debug, Clone)]
pub struct AnnotationTransformEngine {
    config: AugmentationConfig,
    classes: ClassSet,
}

impl AnnotationTransformEngine {
    pub fn new(config: &AugmentationConfig) -> Self {
        Self {
            classes: ClassSet::new(config.classes.iter().cloned()),
            config: config.clone(),
        }
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    /// Draws a spec and applies it. The RNG is the only source of randomness.
    pub fn augment<R: Rng + ?Sized>(
        &self,
        image: &RgbImage,
        annotations: &[Annotation],
        sample_id: usize,
        rng: &mut R,
    ) -> CoreResult<AugmentedSample> {
        let spec = TransformSpec::sample(&self.config, rng);
        let (augmented, boxes) = self.apply(image, annotations, &spec)?;
        Ok(AugmentedSample {
            sample_id,
            image: augmented,
            dropped_annotations: annotations.len() - boxes.len(),
            annotations: boxes,
            provenance: spec.provenance(sample_id),
            spec,
        })
    }

    /// Applies `spec` to both pixels and boxes. Deterministic.
    pub fn apply(
        &self,
        image: &RgbImage,
        annotations: &[Annotation],
        spec: &TransformSpec,
    ) -> CoreResult<(RgbImage, Vec<Annotation>)> {
        let (width, height) = image.dimensions();
        let mut out = image.clone();

        if let Some(delta) = spec.brightness {
            out = pixel::adjust_brightness(&out, delta);
        }
        if let Some(factor) = spec.contrast {
            out = pixel::adjust_contrast(&out, factor);
        }
        if spec.horizontal_flip {
            out = pixel::flip_horizontal(&out);
        }
        if let Some(angle) = spec.rotation {
            out = pixel::rotate(&out, angle);
        }
        if let Some(factor) = spec.zoom {
            out = pixel::zoom(&out, factor).0;
        }
        if let Some(noise) = spec.noise {
            out = pixel::add_gaussian_noise(&out, noise.std_dev, noise.seed);
        }

        let boxes = self.transform_annotations(annotations, spec, width, height)?;
        Ok((out, boxes))
    }

    /// Moves boxes through the geometric part of `spec` for an image of
    /// `width x height` pixels, then checks the box invariants.
    pub fn transform_annotations(
        &self,
        annotations: &[Annotation],
        spec: &TransformSpec,
        width: u32,
        height: u32,
    ) -> CoreResult<Vec<Annotation>> {
        let min_extent = self.config.min_box_extent;
        let mut boxes: Vec<Annotation> = annotations.to_vec();

        if spec.horizontal_flip {
            for b in &mut boxes {
                b.cx = 1.0 - b.cx;
            }
        }

        if let Some(angle) = spec.rotation {
            let preserve = self.config.rotation_bbox_mode == RotationBoxMode::Preserve
                && angle.abs() <= self.config.rotation_tolerance_deg;
            if !preserve {
                let rotation = Rotation::new(angle, width, height);
                boxes = boxes
                    .iter()
                    .filter_map(|b| rotate_box(b, &rotation, width, height).clipped(min_extent))
                    .collect();
            }
        }

        if let Some(factor) = spec.zoom {
            let (geometry, _) = ZoomGeometry::for_factor(factor, width, height);
            boxes = boxes
                .iter()
                .filter_map(|b| zoom_box(b, &geometry).clipped(min_extent))
                .collect();
        }

        for b in &boxes {
            b.validate(&self.classes).map_err(|e| {
                CoreError::AnnotationInvariant(format!("{e} after applying {}", spec.provenance(0)))
            })?;
        }
        Ok(boxes)
    }
}

/// Axis-aligned hull of the rotated box corners, in normalized coordinates.
fn rotate_box(b: &Annotation, rotation: &Rotation, width: u32, height: u32) -> Annotation {
    let (w, h) = (width as f64, height as f64);
    let (x0, y0, x1, y1) = b.edges();
    let corners = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)];

    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let (rx, ry) = rotation.forward(x * w, y * h);
        min = (min.0.min(rx / w), min.1.min(ry / h));
        max = (max.0.max(rx / w), max.1.max(ry / h));
    }
    Annotation::from_edges(b.class_id, min.0, min.1, max.0, max.1)
}

fn zoom_box(b: &Annotation, geometry: &ZoomGeometry) -> Annotation {
    let (x0, y0, x1, y1) = b.edges();
    Annotation::from_edges(
        b.class_id,
        geometry.map_x(x0),
        geometry.map_y(y0),
        geometry.map_x(x1),
        geometry.map_y(y1),
    )
}
