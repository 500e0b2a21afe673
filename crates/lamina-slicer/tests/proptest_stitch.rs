//! Property-based tests for segment stitching.
//!
//! Run with: cargo test -p lamina-slicer -- proptest

use std::f64::consts::TAU;

use lamina_slicer::{classify_nesting, stitch_segments_to_paths, Point2, Segment};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

/// Star-shaped simple polygon: one vertex per angular sector, so vertices
/// never coincide and the boundary never crosses itself.
fn arb_polygon() -> impl Strategy<Value = Vec<Point2>> {
    (3usize..40).prop_flat_map(|n| {
        (
            prop::collection::vec(0.0..0.8f64, n),
            prop::collection::vec(5.0..20.0f64, n),
        )
            .prop_map(move |(jitter, radii)| {
                (0..n)
                    .map(|i| {
                        let a = TAU * (i as f64 + jitter[i]) / n as f64;
                        Point2::new(radii[i] * a.cos(), radii[i] * a.sin())
                    })
                    .collect()
            })
    })
}

/// Edges of a polygon, shuffled, each flipped or not.
fn arb_scrambled_edges() -> impl Strategy<Value = (Vec<Point2>, Vec<Segment>)> {
    arb_polygon().prop_flat_map(|points| {
        let n = points.len();
        let edges: Vec<Segment> = (0..n)
            .map(|i| Segment::new(points[i], points[(i + 1) % n]))
            .collect();
        (
            Just(points),
            Just(edges).prop_shuffle(),
            prop::collection::vec(any::<bool>(), n),
        )
            .prop_map(|(points, edges, flips)| {
                let edges = edges
                    .into_iter()
                    .zip(flips)
                    .map(|(e, flip)| if flip { Segment::new(e.end, e.start) } else { e })
                    .collect();
                (points, edges)
            })
    })
}

fn arb_segment() -> impl Strategy<Value = Segment> {
    prop::array::uniform4(-50.0..50.0f64)
        .prop_map(|[x0, y0, x1, y1]| Segment::new(Point2::new(x0, y0), Point2::new(x1, y1)))
}

// =============================================================================
// Property Tests: Stitching
// =============================================================================

proptest! {
    /// Any permutation and reversal of a polygon's edges stitches back to
    /// one closed path over the same vertices.
    #[test]
    fn proptest_stitch_round_trip((points, edges) in arb_scrambled_edges()) {
        let paths = stitch_segments_to_paths(&edges);
        prop_assert_eq!(paths.len(), 1);
        let path = &paths[0];
        prop_assert!(path.closed);
        prop_assert_eq!(path.len(), points.len());

        for p in &points {
            prop_assert!(
                path.points.iter().any(|q| (p - q).norm() < 1e-9),
                "vertex {:?} missing from stitched path", p
            );
        }

        // Cyclic order is preserved up to direction.
        let start = path
            .points
            .iter()
            .position(|q| (points[0] - q).norm() < 1e-9)
            .unwrap();
        let n = points.len();
        let forward = (0..n).all(|i| (path.points[(start + i) % n] - points[i]).norm() < 1e-9);
        let backward = (0..n).all(|i| (path.points[(start + n - i) % n] - points[i]).norm() < 1e-9);
        prop_assert!(forward || backward);
    }

    /// Stitching arbitrary segments never panics and never loses a closed
    /// path below three points.
    #[test]
    fn proptest_stitch_never_panics(segments in prop::collection::vec(arb_segment(), 0..60)) {
        let paths = stitch_segments_to_paths(&segments);
        for path in &paths {
            if path.closed {
                prop_assert!(path.len() >= 3);
            } else {
                prop_assert!(path.len() >= 2);
            }
        }
    }
}

// =============================================================================
// Property Tests: Nesting
// =============================================================================

proptest! {
    /// Concentric rings alternate structure and hole with depth.
    #[test]
    fn proptest_concentric_levels_alternate(count in 1usize..8, n in 8usize..48) {
        let paths: Vec<_> = (0..count)
            .map(|k| {
                let r = 40.0 - 4.0 * k as f64;
                let points: Vec<Point2> = (0..n)
                    .map(|i| {
                        let a = TAU * i as f64 / n as f64;
                        Point2::new(r * a.cos(), r * a.sin())
                    })
                    .collect();
                lamina_slicer::Path::closed(points)
            })
            .collect();

        let info = classify_nesting(&paths);
        for (k, ring) in info.iter().enumerate() {
            prop_assert_eq!(ring.level, k);
            prop_assert_eq!(ring.is_hole, k % 2 == 1);
        }
    }
}
