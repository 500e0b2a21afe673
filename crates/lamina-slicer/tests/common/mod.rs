//! Analytic cross-section generators.
//!
//! Each model is described by its footprint at a given Z; layers are
//! sampled at layer centers, `z = (i + 0.5) * layer_height`.

#![allow(dead_code)]

use std::f64::consts::TAU;

use lamina_slicer::{Point3, Segment3};

/// Closed polygon through `points`, as unordered segments.
pub fn loop_segments(points: &[(f64, f64)], z: f64) -> Vec<Segment3> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            Segment3::new(Point3::new(x0, y0, z), Point3::new(x1, y1, z))
        })
        .collect()
}

/// Circle around the origin.
pub fn circle(r: f64, n: usize, z: f64) -> Vec<Segment3> {
    let points: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let a = TAU * i as f64 / n as f64;
            (r * a.cos(), r * a.sin())
        })
        .collect();
    loop_segments(&points, z)
}

/// Square of side `size` centered on the origin.
pub fn square(size: f64, z: f64) -> Vec<Segment3> {
    let h = size / 2.0;
    loop_segments(&[(-h, -h), (h, -h), (h, h), (-h, h)], z)
}

/// Layer-center heights for a model `height` tall.
pub fn layer_heights(height: f64, layer_height: f64) -> Vec<f64> {
    let count = (height / layer_height).round() as usize;
    (0..count).map(|i| (i as f64 + 0.5) * layer_height).collect()
}

/// Solid cylinder of radius `r`.
pub fn cylinder(r: f64, height: f64, layer_height: f64) -> Vec<Vec<Segment3>> {
    layer_heights(height, layer_height)
        .into_iter()
        .map(|z| circle(r, 64, z))
        .collect()
}

/// Square tiers stacked bottom to top, each `tier_layers` thick.
pub fn wedding_cake(sizes: &[f64], tier_layers: usize, layer_height: f64) -> Vec<Vec<Segment3>> {
    sizes
        .iter()
        .flat_map(|&size| std::iter::repeat(size).take(tier_layers))
        .enumerate()
        .map(|(i, size)| square(size, (i as f64 + 0.5) * layer_height))
        .collect()
}

/// Concentric circles, one per radius, on every layer.
pub fn matryoshka(radii: &[f64], height: f64, layer_height: f64) -> Vec<Vec<Segment3>> {
    layer_heights(height, layer_height)
        .into_iter()
        .map(|z| radii.iter().flat_map(|&r| circle(r, 64, z)).collect())
        .collect()
}

/// Torus around Z with major radius `major` and tube radius `tube`,
/// centered at `z = tube` so it rests on the build plate.
pub fn torus(major: f64, tube: f64, layer_height: f64) -> Vec<Vec<Segment3>> {
    layer_heights(2.0 * tube, layer_height)
        .into_iter()
        .map(|z| {
            let dz = z - tube;
            let half = (tube * tube - dz * dz).max(0.0).sqrt();
            let mut segments = circle(major + half, 256, z);
            segments.extend(circle(major - half, 256, z));
            segments
        })
        .collect()
}

/// Box with a hemisphere of radius `r` cut into the center of its bottom
/// face.
pub fn box_with_dome(size: f64, height: f64, r: f64, layer_height: f64) -> Vec<Vec<Segment3>> {
    layer_heights(height, layer_height)
        .into_iter()
        .map(|z| {
            let mut segments = square(size, z);
            if z < r {
                segments.extend(circle((r * r - z * z).sqrt(), 48, z));
            }
            segments
        })
        .collect()
}

/// Plain box.
pub fn solid_box(size: f64, height: f64, layer_height: f64) -> Vec<Vec<Segment3>> {
    layer_heights(height, layer_height)
        .into_iter()
        .map(|z| square(size, z))
        .collect()
}
