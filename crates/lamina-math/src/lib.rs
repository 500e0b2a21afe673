#![warn(missing_docs)]

//! Math types for the lamina slicer core.
//!
//! Thin wrappers around nalgebra providing the planar types used by
//! layer geometry: points, vectors, a few 2D helpers, and the tolerance
//! that every point comparison goes through.

use nalgebra::Vector2;

/// A point in a layer's local plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in a layer's local plane.
pub type Vec2 = Vector2<f64>;

/// A point in model space (as delivered by the cross-section slicer).
pub type Point3 = nalgebra::Point3<f64>;

/// Z component of the cross product of two planar vectors.
#[inline]
pub fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Rotate a planar vector 90° counter-clockwise.
#[inline]
pub fn perp(v: &Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// Distance from `p` to the segment `a`–`b`.
pub fn distance_to_segment(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < 1e-24 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
    /// Area tolerance in mm².
    pub area: f64,
}

impl Tolerance {
    /// Slicer tolerances (1e-4 mm linear, 1e-8 mm² area).
    pub const DEFAULT: Self = Self {
        linear: 1e-4,
        area: 1e-8,
    };

    /// Check if two planar points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point2, b: &Point2) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if a scalar distance is effectively zero.
    pub fn is_zero(&self, d: f64) -> bool {
        d.abs() < self.linear
    }

    /// Check if an area is effectively zero.
    pub fn is_zero_area(&self, a: f64) -> bool {
        a.abs() < self.area
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
