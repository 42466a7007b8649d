use anyhow::{anyhow, Result};

/// A normalized coordinate pair in [0, 1] relative to the image size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizedVertex {
    pub x: f64,
    pub y: f64,
}

impl NormalizedVertex {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding polygon as returned by the service, clockwise from top-left.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundingPoly {
    pub vertices: Vec<NormalizedVertex>,
}

impl BoundingPoly {
    pub fn new(vertices: Vec<NormalizedVertex>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned box from two opposite corners.
    pub fn from_corners(top_left: NormalizedVertex, bottom_right: NormalizedVertex) -> Self {
        Self::new(vec![
            top_left,
            NormalizedVertex::new(bottom_right.x, top_left.y),
            bottom_right,
            NormalizedVertex::new(top_left.x, bottom_right.y),
        ])
    }

    /// Pixel rectangle spanned by vertex 0 (top-left) and vertex 2 (bottom-right).
    ///
    /// Coordinates are scaled by the image size and truncated toward zero.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Result<PixelRect> {
        let (Some(top_left), Some(bottom_right)) = (self.vertices.first(), self.vertices.get(2))
        else {
            return Err(anyhow!(
                "bounding polygon has {} vertices; need at least 3",
                self.vertices.len()
            ));
        };
        let scale = |v: f64, extent: u32| (v * extent as f64) as i32;
        Ok(PixelRect {
            x1: scale(top_left.x, width),
            y1: scale(top_left.y, height),
            x2: scale(bottom_right.x, width),
            y2: scale(bottom_right.y, height),
        })
    }
}

/// Rectangle in pixel space; corners may lie outside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// An object localized in the image.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedObject {
    pub name: String,
    pub confidence: f32,
    pub bounding: BoundingPoly,
}

/// A scene label without spatial data.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedLabel {
    pub description: String,
    pub confidence: f32,
}

/// Both result sets of one analysis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    pub objects: Vec<DetectedObject>,
    pub labels: Vec<DetectedLabel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rect_scales_and_truncates() -> Result<()> {
        let poly = BoundingPoly::from_corners(
            NormalizedVertex::new(0.1, 0.1),
            NormalizedVertex::new(0.5, 0.5),
        );
        let rect = poly.to_pixel_rect(639, 479)?;
        assert_eq!(
            rect,
            PixelRect {
                x1: 63,
                y1: 47,
                x2: 319,
                y2: 239,
            }
        );
        Ok(())
    }

    #[test]
    fn pixel_rect_uses_third_vertex_as_bottom_right() -> Result<()> {
        let poly = BoundingPoly::new(vec![
            NormalizedVertex::new(0.25, 0.0),
            NormalizedVertex::new(0.75, 0.0),
            NormalizedVertex::new(0.75, 1.0),
            NormalizedVertex::new(0.25, 1.0),
        ]);
        let rect = poly.to_pixel_rect(640, 480)?;
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (160, 0, 480, 480));
        Ok(())
    }

    #[test]
    fn short_polygon_is_malformed() {
        let poly = BoundingPoly::new(vec![
            NormalizedVertex::new(0.1, 0.1),
            NormalizedVertex::new(0.5, 0.1),
        ]);
        assert!(poly.to_pixel_rect(640, 480).is_err());
    }
}
