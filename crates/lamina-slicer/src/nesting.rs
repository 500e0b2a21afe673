//! Hole/structure classification by nesting depth.

use lamina_math::Tolerance;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::path::{distance_to_boundary, point_in_polygon, Bounds, Path};
use crate::trace::{emit, NoTrace, TraceKind, TraceSink};

/// How far an ambiguous representative point is pushed off a boundary,
/// in multiples of the linear tolerance.
const NUDGE_FACTOR: f64 = 10.0;

/// Where a ring sits in its layer's containment tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NestingInfo {
    /// Number of other rings containing this ring's representative vertex.
    pub level: usize,
    /// Odd levels are holes.
    pub is_hole: bool,
    /// Innermost ring containing this one.
    pub parent: Option<usize>,
    /// The representative vertex was still on a boundary after nudging.
    pub ambiguous: bool,
}

/// One layer's rings with their classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedLayer {
    /// Layer index.
    pub index: usize,
    /// Rings, in stitching order. A ring's id is its position here.
    pub paths: Vec<Path>,
    /// Classification per ring.
    pub nesting: Vec<NestingInfo>,
    /// Bounding box per ring.
    pub bounds: Vec<Bounds>,
}

impl ClassifiedLayer {
    /// Number of rings.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Layer has no rings.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Rings whose innermost container is `ring`.
    pub fn children(&self, ring: usize) -> impl Iterator<Item = usize> + '_ {
        self.nesting
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(ring))
            .map(|(i, _)| i)
    }

    /// Rings that walls of `ring` grow toward.
    ///
    /// Structures shrink toward their holes. Holes grow toward the
    /// enclosing structure and toward the other holes in it.
    pub fn clearance_obstacles(&self, ring: usize) -> Vec<usize> {
        let info = self.nesting[ring];
        if !info.is_hole {
            return self.children(ring).collect();
        }
        let mut out: Vec<usize> = info.parent.into_iter().collect();
        out.extend(
            self.nesting
                .iter()
                .enumerate()
                .filter(|&(i, n)| i != ring && n.is_hole && n.parent == info.parent)
                .map(|(i, _)| i),
        );
        out
    }
}

/// Classify every ring of a layer.
pub fn classify_nesting(paths: &[Path]) -> Vec<NestingInfo> {
    classify_nesting_traced(paths, &NoTrace)
}

/// [`classify_nesting`] with a trace sink.
pub fn classify_nesting_traced(paths: &[Path], trace: &dyn TraceSink) -> Vec<NestingInfo> {
    let tol = Tolerance::DEFAULT;
    let nudge = tol.linear * NUDGE_FACTOR;
    let bounds: Vec<Bounds> = paths.iter().map(Path::bounds).collect();

    let mut containers: Vec<Vec<usize>> = Vec::with_capacity(paths.len());
    let mut ambiguous = vec![false; paths.len()];

    for (i, path) in paths.iter().enumerate() {
        let mut containing = Vec::new();
        let Some(&rep) = path.points.first() else {
            containers.push(containing);
            continue;
        };

        for (j, other) in paths.iter().enumerate() {
            if i == j {
                continue;
            }
            let b = &bounds[j];
            if rep.x < b.min_x - nudge
                || rep.x > b.max_x + nudge
                || rep.y < b.min_y - nudge
                || rep.y > b.max_y + nudge
            {
                continue;
            }

            let inside = if distance_to_boundary(&rep, other) < tol.linear {
                let nudged = rep + path.outward_normal(0) * nudge;
                let resolved = distance_to_boundary(&nudged, other) >= tol.linear;
                emit(
                    trace,
                    TraceKind::AmbiguousContainment {
                        ring: i,
                        against: j,
                        resolved,
                    },
                );
                if !resolved {
                    warn!(ring = i, against = j, "containment still ambiguous after nudge");
                    ambiguous[i] = true;
                }
                point_in_polygon(&nudged, other)
            } else {
                point_in_polygon(&rep, other)
            };

            if inside {
                containing.push(j);
            }
        }
        containers.push(containing);
    }

    let levels: Vec<usize> = containers.iter().map(Vec::len).collect();

    containers
        .iter()
        .enumerate()
        .map(|(i, containing)| {
            let parent = containing.iter().copied().max_by(|&a, &b| {
                levels[a].cmp(&levels[b]).then_with(|| {
                    paths[b]
                        .area()
                        .partial_cmp(&paths[a].area())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
            });
            NestingInfo {
                level: levels[i],
                is_hole: levels[i] % 2 == 1,
                parent,
                ambiguous: ambiguous[i],
            }
        })
        .collect()
}

/// Classify a layer and bundle the result.
pub fn classify_layer(index: usize, paths: Vec<Path>, trace: &dyn TraceSink) -> ClassifiedLayer {
    let nesting = classify_nesting_traced(&paths, trace);
    let bounds = paths.iter().map(Path::bounds).collect();
    ClassifiedLayer {
        index,
        paths,
        nesting,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::RecordingTrace;
    use lamina_math::Point2;

    fn square(x0: f64, y0: f64, size: f64) -> Path {
        Path::closed(vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ])
    }

    #[test]
    fn test_concentric_alternation() {
        // Innermost first so input order differs from nesting order.
        let paths = vec![
            square(15.0, 15.0, 10.0),
            square(10.0, 10.0, 20.0),
            square(5.0, 5.0, 30.0),
            square(0.0, 0.0, 40.0),
        ];
        let info = classify_nesting(&paths);

        assert_eq!(info[3].level, 0);
        assert!(!info[3].is_hole);
        assert_eq!(info[3].parent, None);
        assert_eq!(info[2].level, 1);
        assert!(info[2].is_hole);
        assert_eq!(info[2].parent, Some(3));
        assert_eq!(info[1].level, 2);
        assert!(!info[1].is_hole);
        assert_eq!(info[1].parent, Some(2));
        assert_eq!(info[0].level, 3);
        assert!(info[0].is_hole);
        assert_eq!(info[0].parent, Some(1));
    }

    #[test]
    fn test_disjoint_islands() {
        let paths = vec![square(0.0, 0.0, 5.0), square(10.0, 0.0, 5.0)];
        let info = classify_nesting(&paths);
        assert!(info.iter().all(|n| n.level == 0 && !n.is_hole && n.parent.is_none()));
    }

    #[test]
    fn test_boundary_vertex_is_nudged() {
        // Inner ring's first vertex sits on the outer ring's left edge.
        let outer = square(0.0, 0.0, 20.0);
        let inner = Path::closed(vec![
            Point2::new(0.0, 5.0),
            Point2::new(5.0, 5.0),
            Point2::new(5.0, 10.0),
            Point2::new(2.0, 10.0),
        ]);
        let recorder = RecordingTrace::new();
        let info = classify_nesting_traced(&[outer, inner], &recorder);

        assert_eq!(
            recorder.count(|k| matches!(
                k,
                TraceKind::AmbiguousContainment {
                    ring: 1,
                    against: 0,
                    resolved: true
                }
            )),
            1
        );
        assert!(!info[1].ambiguous);
    }

    #[test]
    fn test_nudge_along_edge_stays_ambiguous() {
        // The square's corner sits on the triangle's hypotenuse, and its
        // outward normal runs along that same edge.
        let corner = square(0.0, 0.0, 5.0);
        let triangle = Path::closed(vec![
            Point2::new(-10.0, -10.0),
            Point2::new(10.0, -10.0),
            Point2::new(10.0, 10.0),
        ]);
        let recorder = RecordingTrace::new();
        let info = classify_nesting_traced(&[corner, triangle], &recorder);

        assert!(info[0].ambiguous);
        assert!(!info[1].ambiguous);
        assert_eq!(
            recorder.count(|k| matches!(
                k,
                TraceKind::AmbiguousContainment {
                    ring: 0,
                    against: 1,
                    resolved: false
                }
            )),
            1
        );
        assert_eq!(
            recorder.count(|k| matches!(k, TraceKind::AmbiguousContainment { resolved: true, .. })),
            0
        );
    }

    #[test]
    fn test_clearance_obstacles() {
        // Plate with two holes and an island inside the first hole.
        let paths = vec![
            square(0.0, 0.0, 40.0),
            square(5.0, 5.0, 10.0),
            square(25.0, 5.0, 10.0),
            square(8.0, 8.0, 4.0),
        ];
        let layer = classify_layer(0, paths, &NoTrace);

        assert_eq!(layer.clearance_obstacles(0), vec![1, 2]);
        assert_eq!(layer.clearance_obstacles(1), vec![0, 2]);
        assert_eq!(layer.clearance_obstacles(2), vec![0, 1]);
        assert!(layer.clearance_obstacles(3).is_empty());
        assert_eq!(layer.children(1).collect::<Vec<_>>(), vec![3]);
    }
}
