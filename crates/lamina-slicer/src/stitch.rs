//! Segment stitching - chain unordered cross-section edges into rings.

use std::collections::HashMap;

use lamina_math::{Point2, Tolerance};

use crate::path::{Path, Segment, Segment3};
use crate::trace::{emit, NoTrace, TraceKind, TraceSink};

/// Endpoint grid cell size, in multiples of the linear tolerance.
const CELL_FACTOR: f64 = 4.0;

/// Project model-space segments onto the layer plane.
pub fn project_segments(segments: &[Segment3]) -> Vec<Segment> {
    segments.iter().map(Segment3::project).collect()
}

/// Chain one layer's segments into paths.
///
/// Chains that cannot be closed are returned open rather than dropped.
pub fn stitch_segments_to_paths(segments: &[Segment]) -> Vec<Path> {
    stitch_segments_traced(segments, &NoTrace)
}

/// [`stitch_segments_to_paths`] with a trace sink.
pub fn stitch_segments_traced(segments: &[Segment], trace: &dyn TraceSink) -> Vec<Path> {
    let tol = Tolerance::DEFAULT;

    let kept: Vec<Segment> = segments.iter().filter(|s| !s.is_degenerate()).copied().collect();
    if kept.len() < segments.len() {
        emit(
            trace,
            TraceKind::DegenerateSegments {
                count: segments.len() - kept.len(),
            },
        );
    }
    if kept.is_empty() {
        return Vec::new();
    }

    let grid = EndpointGrid::build(&kept, tol.linear * CELL_FACTOR);
    let mut used = vec![false; kept.len()];
    let mut paths = Vec::new();

    for seed in 0..kept.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;

        let mut chain = vec![kept[seed].start, kept[seed].end];
        let closed = loop {
            let end = chain[chain.len() - 1];
            if chain.len() >= 3 && tol.points_equal(&end, &chain[0]) {
                break true;
            }
            match grid.take_match(&end, &kept, &mut used, &tol) {
                Some(far) => chain.push(far),
                None => break false,
            }
        };

        if !closed {
            // Pick up whatever hangs off the other end too.
            let mut head = Vec::new();
            let mut start = chain[0];
            while let Some(far) = grid.take_match(&start, &kept, &mut used, &tol) {
                head.push(far);
                start = far;
            }
            if !head.is_empty() {
                head.reverse();
                head.extend(chain);
                chain = head;
            }
        }

        let mut path = Path::new(chain, closed);
        if path.closed && path.len() < 3 {
            path.closed = false;
        }
        if path.len() < 2 {
            continue;
        }
        if !path.closed {
            emit(trace, TraceKind::OpenChain { points: path.len() });
        }
        paths.push(path);
    }

    paths
}

/// Uniform hash grid over segment endpoints.
struct EndpointGrid {
    cell: f64,
    cells: HashMap<(i64, i64), Vec<(usize, bool)>>,
}

impl EndpointGrid {
    fn build(segments: &[Segment], cell: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<(usize, bool)>> = HashMap::new();
        for (i, seg) in segments.iter().enumerate() {
            cells.entry(key(&seg.start, cell)).or_default().push((i, false));
            cells.entry(key(&seg.end, cell)).or_default().push((i, true));
        }
        Self { cell, cells }
    }

    /// Consume the lowest-index unused segment touching `p` and return its
    /// far endpoint.
    fn take_match(
        &self,
        p: &Point2,
        segments: &[Segment],
        used: &mut [bool],
        tol: &Tolerance,
    ) -> Option<Point2> {
        let (kx, ky) = key(p, self.cell);
        let mut best: Option<(usize, bool)> = None;

        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(entries) = self.cells.get(&(kx + dx, ky + dy)) else {
                    continue;
                };
                for &(idx, is_end) in entries {
                    if used[idx] || best.is_some_and(|(b, _)| b <= idx) {
                        continue;
                    }
                    let seg = &segments[idx];
                    let near = if is_end { &seg.end } else { &seg.start };
                    if tol.points_equal(near, p) {
                        best = Some((idx, is_end));
                    }
                }
            }
        }

        best.map(|(idx, is_end)| {
            used[idx] = true;
            let seg = &segments[idx];
            if is_end {
                seg.start
            } else {
                seg.end
            }
        })
    }
}

fn key(p: &Point2, cell: f64) -> (i64, i64) {
    ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
}
