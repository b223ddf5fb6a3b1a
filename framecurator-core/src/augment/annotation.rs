//! Bounding-box annotations in normalized YOLO form.
//!
//! A box is `(cx, cy, w, h)` relative to the image size. Valid boxes have
//! every component in [0, 1], lie entirely inside the image and have
//! non-zero extent. Invalid boxes read from disk are dropped one by one;
//! an invalid box produced by a transform is an internal defect.

use crate::error::{CoreError, CoreResult};

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Slack for float rounding in containment checks.
pub const BOX_EPSILON: f64 = 1e-6;

/// Fixed, ordered set of class names; annotation class ids index into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSet {
    names: Vec<String>,
}

impl ClassSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, class_id: usize) -> bool {
        class_id < self.names.len()
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    pub class_id: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl Annotation {
    /// Creates a validated annotation.
    pub fn new(class_id: usize, cx: f64, cy: f64, w: f64, h: f64, classes: &ClassSet) -> CoreResult<Self> {
        let annotation = Self { class_id, cx, cy, w, h };
        annotation.validate(classes)?;
        Ok(annotation)
    }

    /// Builds a box from its edges.
    pub fn from_edges(class_id: usize, x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            class_id,
            cx: (x0 + x1) / 2.0,
            cy: (y0 + y1) / 2.0,
            w: x1 - x0,
            h: y1 - y0,
        }
    }

    /// `(x0, y0, x1, y1)`
    pub fn edges(&self) -> (f64, f64, f64, f64) {
        (
            self.cx - self.w / 2.0,
            self.cy - self.h / 2.0,
            self.cx + self.w / 2.0,
            self.cy + self.h / 2.0,
        )
    }

    /// Checks the class id and the geometric invariants.
    pub fn validate(&self, classes: &ClassSet) -> CoreResult<()> {
        if !classes.contains(self.class_id) {
            return Err(CoreError::InvalidAnnotation(format!(
                "class id {} outside class set of {}",
                self.class_id,
                classes.len()
            )));
        }
        self.validate_geometry()
    }

    pub fn validate_geometry(&self) -> CoreResult<()> {
        let components = [self.cx, self.cy, self.w, self.h];
        if components
            .iter()
            .any(|v| !v.is_finite() || *v < -BOX_EPSILON || *v > 1.0 + BOX_EPSILON)
        {
            return Err(CoreError::InvalidAnnotation(format!(
                "components of {self:?} must lie in [0, 1]"
            )));
        }
        if self.w <= 0.0 || self.h <= 0.0 {
            return Err(CoreError::InvalidAnnotation(format!(
                "degenerate box {self:?}"
            )));
        }
        let (x0, y0, x1, y1) = self.edges();
        if x0 < -BOX_EPSILON || y0 < -BOX_EPSILON || x1 > 1.0 + BOX_EPSILON || y1 > 1.0 + BOX_EPSILON {
            return Err(CoreError::InvalidAnnotation(format!(
                "box {self:?} extends outside the image"
            )));
        }
        Ok(())
    }

    /// Clips the box to the unit square. Returns `None` when the clipped
    /// width or height falls below `min_extent`.
    pub fn clipped(&self, min_extent: f64) -> Option<Self> {
        let (x0, y0, x1, y1) = self.edges();
        let (x0, y0) = (x0.clamp(0.0, 1.0), y0.clamp(0.0, 1.0));
        let (x1, y1) = (x1.clamp(0.0, 1.0), y1.clamp(0.0, 1.0));
        if x1 - x0 < min_extent || y1 - y0 < min_extent {
            return None;
        }
        Some(Self::from_edges(self.class_id, x0, y0, x1, y1))
    }
}

/// Parses YOLO label text. Malformed lines and invalid boxes are skipped
/// and described in the returned warnings.
pub fn parse_yolo(text: &str, classes: &ClassSet) -> (Vec<Annotation>, Vec<String>) {
    let mut annotations = Vec::new();
    let mut warnings = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            warnings.push(format!("line {}: expected 5 fields, found {}", line_no + 1, parts.len()));
            continue;
        }
        let class_id = match parts[0].parse::<usize>() {
            Ok(id) => id,
            Err(_) => {
                warnings.push(format!("line {}: invalid class id '{}'", line_no + 1, parts[0]));
                continue;
            }
        };
        let coords: Result<Vec<f64>, _> = parts[1..5].iter().map(|p| p.parse::<f64>()).collect();
        let coords = match coords {
            Ok(coords) => coords,
            Err(e) => {
                warnings.push(format!("line {}: invalid coordinate ({e})", line_no + 1));
                continue;
            }
        };
        match Annotation::new(class_id, coords[0], coords[1], coords[2], coords[3], classes) {
            Ok(annotation) => annotations.push(annotation),
            Err(e) => warnings.push(format!("line {}: {e}", line_no + 1)),
        }
    }

    (annotations, warnings)
}

/// Reads a YOLO label file. A missing file means "no annotations".
pub fn read_yolo_file(path: &Path, classes: &ClassSet) -> CoreResult<Vec<Annotation>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)?;
    let (annotations, warnings) = parse_yolo(&text, classes);
    for warning in warnings {
        log::warn!("Dropping annotation in {}: {}", path.display(), warning);
    }
    Ok(annotations)
}

/// Formats annotations as YOLO text with six decimal places.
pub fn format_yolo(annotations: &[Annotation]) -> String {
    let mut out = String::new();
    for a in annotations {
        let _ = writeln!(out, "{} {:.6} {:.6} {:.6} {:.6}", a.class_id, a.cx, a.cy, a.w, a.h);
    }
    out
}

pub fn write_yolo_file(path: &Path, annotations: &[Annotation]) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format_yolo(annotations))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> ClassSet {
        ClassSet::new(["ball", "player", "hoop"])
    }

    #[test]
    fn test_parse_skips_malformed_and_invalid_lines() {
        let text = "0 0.5 0.5 0.2 0.2\n\
                    1 0.5 0.5\n\
                    x 0.5 0.5 0.2 0.2\n\
                    7 0.5 0.5 0.2 0.2\n\
                    2 0.95 0.5 0.2 0.2\n\
                    \n\
                    1 0.25 0.75 0.1 0.3 0.99\n";
        let (annotations, warnings) = parse_yolo(text, &classes());
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].class_id, 0);
        assert_eq!(annotations[1].class_id, 1);
        assert_eq!(warnings.len(), 4);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let annotations = read_yolo_file(Path::new("/nonexistent/labels.txt"), &classes()).unwrap();
        assert!(annotations.is_empty());
    }

    #[test]
    fn test_format_uses_six_decimals() {
        let a = Annotation::new(1, 0.5, 0.25, 0.125, 0.1, &classes()).unwrap();
        assert_eq!(format_yolo(&[a]), "1 0.500000 0.250000 0.125000 0.100000\n");
    }

    #[test]
    fn test_clipping_drops_collapsed_boxes() {
        let a = Annotation { class_id: 0, cx: 1.05, cy: 0.5, w: 0.2, h: 0.2 };
        let clipped = a.clipped(0.001).unwrap();
        assert!((clipped.w - 0.05).abs() < 1e-12);
        assert!(clipped.validate_geometry().is_ok());

        let gone = Annotation { class_id: 0, cx: 1.2, cy: 0.5, w: 0.2, h: 0.2 };
        assert!(gone.clipped(0.001).is_none());
    }
}
