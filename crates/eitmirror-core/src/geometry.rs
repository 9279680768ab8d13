//! Host-space rectangles and the mesh-to-rect fit transform.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A rectangle in host UI coordinates (origin top-left, y growing downwards).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl Rect {
    /// Creates a rectangle from origin and size components.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// Returns true if nothing drawn into this rect would be visible.
    pub fn is_degenerate(&self) -> bool {
        !(self.origin.is_finite()
            && self.size.is_finite()
            && self.size.x > 0.0
            && self.size.y > 0.0)
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// Bottom-right corner.
    pub fn max(&self) -> Vec2 {
        self.origin + self.size
    }
}

/// Axis-aligned bounding box of planar mesh positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Computes the bounds of a set of points, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| match acc {
            None => Some(Self { min: p, max: p }),
            Some(b) => Some(Self {
                min: b.min.min(p),
                max: b.max.max(p),
            }),
        })
    }

    /// Width and height.
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Center point.
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Radius of the smallest circle around the center containing the box.
    pub fn circumradius(&self) -> f32 {
        self.size().length() * 0.5
    }
}

/// Maps mesh-space points into host coordinates: `host = mesh * scale + offset`.
///
/// The scale is uniform in magnitude with the y axis flipped, so the mesh keeps
/// its aspect ratio and its +y axis points up on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale: Vec2,
    pub offset: Vec2,
}

impl FitTransform {
    /// Identity mapping (used for geometry already in host coordinates).
    pub const IDENTITY: Self = Self {
        scale: Vec2::ONE,
        offset: Vec2::ZERO,
    };

    /// Fits `bounds` into `rect`, centered and letterboxed.
    ///
    /// A zero-extent axis does not constrain the scale; a mesh collapsed to a point
    /// is placed at the rect center with unit scale.
    pub fn fit(bounds: &Bounds, rect: &Rect) -> Self {
        let extent = bounds.size();
        let sx = (extent.x > 0.0).then(|| rect.size.x / extent.x);
        let sy = (extent.y > 0.0).then(|| rect.size.y / extent.y);

        let s = match (sx, sy) {
            (Some(sx), Some(sy)) => sx.min(sy),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => 1.0,
        };

        let scale = Vec2::new(s, -s);
        let offset = rect.center() - bounds.center() * scale;
        Self { scale, offset }
    }

    /// Applies the transform to a mesh-space point.
    pub fn apply(&self, point: Vec2) -> Vec2 {
        point * self.scale + self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_rects() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, 10.0, 0.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, -1.0, 10.0).is_degenerate());
        assert!(Rect::new(f32::NAN, 0.0, 10.0, 10.0).is_degenerate());
        assert!(!Rect::new(5.0, 5.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn test_fit_letterboxes_wide_rect() {
        let bounds = Bounds {
            min: Vec2::new(-1.0, -1.0),
            max: Vec2::new(1.0, 1.0),
        };
        let rect = Rect::new(0.0, 0.0, 400.0, 200.0);
        let t = FitTransform::fit(&bounds, &rect);

        // Square mesh in a 2:1 rect: height-limited, centered horizontally
        assert_eq!(t.apply(Vec2::new(-1.0, 1.0)), Vec2::new(100.0, 0.0));
        assert_eq!(t.apply(Vec2::new(1.0, -1.0)), Vec2::new(300.0, 200.0));
        assert_eq!(t.apply(Vec2::ZERO), rect.center());
    }

    #[test]
    fn test_fit_keeps_points_inside_rect() {
        let bounds = Bounds {
            min: Vec2::new(2.0, -3.0),
            max: Vec2::new(5.0, 9.0),
        };
        let rect = Rect::new(10.0, 20.0, 300.0, 500.0);
        let t = FitTransform::fit(&bounds, &rect);

        for p in [bounds.min, bounds.max, Vec2::new(2.0, 9.0), Vec2::new(5.0, -3.0)] {
            let q = t.apply(p);
            assert!(q.x >= rect.origin.x - 1e-3 && q.x <= rect.max().x + 1e-3);
            assert!(q.y >= rect.origin.y - 1e-3 && q.y <= rect.max().y + 1e-3);
        }
        assert_eq!(t.scale.x, -t.scale.y);
    }

    #[test]
    fn test_fit_point_mesh() {
        let bounds = Bounds::from_points([Vec2::new(3.0, 3.0)]).unwrap();
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let t = FitTransform::fit(&bounds, &rect);
        assert_eq!(t.apply(Vec2::new(3.0, 3.0)), rect.center());
    }
}
