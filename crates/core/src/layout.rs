//! Geometric layout validation for rendered slides.
//!
//! Checks every element's bounding box against the canvas and enforces a
//! minimum vertical gap between consecutively declared elements. Failures
//! name the offending element and the computed overflow or gap instead of
//! silently truncating.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::types::Slide;

/// Validator for element bounding boxes on a slide.
#[derive(Debug, Clone)]
pub struct LayoutValidator {
    canvas_width: f64,
    canvas_height: f64,
    min_gap: f64,
}

impl LayoutValidator {
    /// Create a validator from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
            min_gap: config.min_gap,
        }
    }

    /// Validate one slide's elements.
    ///
    /// Declared order is stacking order: each element must sit at least
    /// `min_gap` below the previous one's bottom edge, and every box must
    /// lie fully on the canvas.
    pub fn validate(&self, slide: &Slide) -> Result<()> {
        for (idx, element) in slide.elements.iter().enumerate() {
            let b = &element.bounds;

            if b.x < 0.0 || b.y < 0.0 {
                return Err(Error::LayoutViolation {
                    slide: slide.position,
                    element: idx,
                    detail: format!("origin ({:.4}, {:.4}) is off-canvas", b.x, b.y),
                });
            }

            if b.width <= 0.0 || b.height <= 0.0 {
                return Err(Error::LayoutViolation {
                    slide: slide.position,
                    element: idx,
                    detail: format!(
                        "extent {:.4} x {:.4} is not positive",
                        b.width, b.height
                    ),
                });
            }

            if b.right() > self.canvas_width {
                return Err(Error::LayoutViolation {
                    slide: slide.position,
                    element: idx,
                    detail: format!(
                        "right edge {:.4} exceeds canvas width {:.4} by {:.4}",
                        b.right(),
                        self.canvas_width,
                        b.right() - self.canvas_width
                    ),
                });
            }

            if b.bottom() > self.canvas_height {
                return Err(Error::LayoutViolation {
                    slide: slide.position,
                    element: idx,
                    detail: format!(
                        "bottom edge {:.4} exceeds canvas height {:.4} by {:.4}",
                        b.bottom(),
                        self.canvas_height,
                        b.bottom() - self.canvas_height
                    ),
                });
            }

            if idx > 0 {
                let prev = &slide.elements[idx - 1].bounds;
                let gap = b.y - prev.bottom();
                if gap < self.min_gap {
                    return Err(Error::LayoutViolation {
                        slide: slide.position,
                        element: idx,
                        detail: format!(
                            "gap {:.4} to previous element is below the minimum {:.4}",
                            gap, self.min_gap
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, Element};

    fn validator() -> LayoutValidator {
        LayoutValidator::new(&PipelineConfig::default().with_min_gap(0.02))
    }

    fn slide_with(bounds: Vec<BoundingBox>) -> Slide {
        let mut slide = Slide::new(1);
        for (i, b) in bounds.into_iter().enumerate() {
            slide.add_element(Element::text(format!("e{}", i), b));
        }
        slide
    }

    #[test]
    fn test_accepts_well_spaced_stack() {
        let slide = slide_with(vec![
            BoundingBox::new(0.1, 0.05, 0.8, 0.15),
            BoundingBox::new(0.1, 0.25, 0.8, 0.40),
            BoundingBox::new(0.1, 0.70, 0.8, 0.20),
        ]);
        assert!(validator().validate(&slide).is_ok());
    }

    #[test]
    fn test_rejects_canvas_overflow() {
        let slide = slide_with(vec![BoundingBox::new(0.1, 0.9, 0.8, 0.18)]);
        let err = validator().validate(&slide).unwrap_err();
        match err {
            Error::LayoutViolation { slide, element, detail } => {
                assert_eq!(slide, 1);
                assert_eq!(element, 0);
                assert!(detail.contains("bottom edge"), "detail: {}", detail);
            }
            other => panic!("expected LayoutViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_horizontal_overflow() {
        let slide = slide_with(vec![BoundingBox::new(0.5, 0.1, 0.6, 0.2)]);
        let err = validator().validate(&slide).unwrap_err();
        assert!(matches!(err, Error::LayoutViolation { element: 0, .. }));
    }

    #[test]
    fn test_rejects_undersized_gap() {
        let slide = slide_with(vec![
            BoundingBox::new(0.1, 0.10, 0.8, 0.20),
            BoundingBox::new(0.1, 0.31, 0.8, 0.20),
        ]);
        let err = validator().validate(&slide).unwrap_err();
        match err {
            Error::LayoutViolation { element, detail, .. } => {
                assert_eq!(element, 1);
                assert!(detail.contains("gap"), "detail: {}", detail);
            }
            other => panic!("expected LayoutViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_accepts_exact_minimum_gap() {
        let slide = slide_with(vec![
            BoundingBox::new(0.1, 0.10, 0.8, 0.20),
            BoundingBox::new(0.1, 0.32, 0.8, 0.20),
        ]);
        assert!(validator().validate(&slide).is_ok());
    }

    #[test]
    fn test_rejects_overlap() {
        let slide = slide_with(vec![
            BoundingBox::new(0.1, 0.10, 0.8, 0.30),
            BoundingBox::new(0.1, 0.20, 0.8, 0.20),
        ]);
        assert!(validator().validate(&slide).is_err());
    }

    #[test]
    fn test_rejects_negative_origin() {
        let slide = slide_with(vec![BoundingBox::new(-0.1, 0.1, 0.5, 0.2)]);
        assert!(validator().validate(&slide).is_err());
    }

    #[test]
    fn test_empty_slide_is_valid() {
        let slide = Slide::new(1);
        assert!(validator().validate(&slide).is_ok());
    }
}
