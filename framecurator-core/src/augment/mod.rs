// ============================================================================
// framecurator-core/src/augment/mod.rs
// ============================================================================
//
// AUGMENTATION: Annotation-Aware Photometric and Geometric Transforms
//
// This module synthesizes training variants of annotated images. Each
// variant is described by a TransformSpec that is drawn per sample, applied
// to the pixels and the bounding boxes with the same geometry, and encoded
// in the output file name as a provenance string.
//
// KEY COMPONENTS:
// - annotation: normalized YOLO boxes, class set, label file I/O
// - transform: TransformSpec sampling and provenance encoding/parsing
// - pixel: the pixel-level transform implementations
// - engine: AnnotationTransformEngine (spec -> image + boxes)
// - dataset: directory driver used by the CLI
//
// AI-ASSISTANT-INFO: Annotation-preserving augmentation engine

pub mod annotation;
pub mod dataset;
pub mod engine;
pub mod pixel;
pub mod transform;

pub use annotation::{Annotation, ClassSet, format_yolo, parse_yolo, read_yolo_file, write_yolo_file};
pub use dataset::{AugmentationSummary, augment_directory, derive_seed};
pub use engine::{AnnotationTransformEngine, AugmentedSample};
pub use transform::{NoiseParams, TransformSpec, parse_provenance};
