//! Wall (perimeter) generation from classified rings.

use lamina_math::{distance_to_segment, Point2, Tolerance};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};
use crate::nesting::NestingInfo;
use crate::path::{distance_to_boundary, point_in_polygon, Path};
use crate::trace::{emit, TraceKind, TraceSink};

/// Largest share of an offset's length allowed to run against its source
/// edges before the offset counts as inverted.
const REVERSAL_LIMIT: f64 = 0.5;

/// What a loop is printed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallKind {
    /// Outermost perimeter of a ring.
    #[serde(rename = "WALL-OUTER")]
    Outer,
    /// Perimeters between the outer wall and the fill.
    #[serde(rename = "WALL-INNER")]
    Inner,
    /// Boundary of solid skin fill.
    #[serde(rename = "SKIN")]
    Skin,
}

/// One offset loop of a ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallLoop {
    /// Loop geometry.
    pub points: Path,
    /// Loop role.
    pub kind: WallKind,
    /// Ring the loop was derived from.
    pub ring_id: usize,
}

/// Why an offset was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Fewer than three distinct points or no area left.
    Collapsed,
    /// Orientation flipped or edges folded back over themselves.
    Inverted,
    /// Area did not keep shrinking (structures) or growing (holes).
    NotMonotonic,
    /// Came closer than half a line width to a neighboring ring.
    Clearance,
}

/// A ring another ring's walls must keep clear of.
#[derive(Debug, Clone, Copy)]
pub struct Obstacle<'a> {
    /// Obstacle boundary.
    pub path: &'a Path,
    /// Whether the walls lie inside it (the obstacle encloses the ring).
    pub encloses: bool,
}

/// Everything wall generation needs for one ring.
#[derive(Debug, Clone)]
pub struct WallRequest<'a> {
    /// Layer index (for error reporting).
    pub layer: usize,
    /// Ring index within the layer.
    pub ring_id: usize,
    /// Ring boundary.
    pub path: &'a Path,
    /// Ring classification.
    pub nesting: NestingInfo,
    /// Nozzle diameter (mm); also the wall spacing.
    pub nozzle_diameter: f64,
    /// Number of walls to attempt.
    pub wall_count: u32,
    /// Rings the walls grow toward.
    pub obstacles: Vec<Obstacle<'a>>,
    /// Emit a skin boundary after the innermost wall.
    pub emit_skin: bool,
}

/// The first wall that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallDrop {
    /// Zero-based wall index; `wall_count` means the skin loop.
    pub index: usize,
    /// Why it was rejected.
    pub reason: DropReason,
}

/// Result of wall generation for one ring.
#[derive(Debug, Clone, Default)]
pub struct WallSet {
    /// Loops in emission order: outer, inner..., optional skin.
    pub loops: Vec<WallLoop>,
    /// Structural walls emitted (skin loop excluded).
    pub walls_emitted: usize,
    /// First rejected wall, if any.
    pub dropped: Option<WallDrop>,
}

impl WallSet {
    /// Some structural wall was dropped.
    pub fn walls_suppressed(&self, wall_count: u32) -> bool {
        self.walls_emitted < wall_count as usize
    }

    /// The skin boundary, if one was emitted.
    pub fn skin_loop(&self) -> Option<&Path> {
        self.loops
            .iter()
            .find(|l| l.kind == WallKind::Skin)
            .map(|l| &l.points)
    }

    /// Number of loops of a kind.
    pub fn count(&self, kind: WallKind) -> usize {
        self.loops.iter().filter(|l| l.kind == kind).count()
    }
}

/// Offset a ring by `distance`: inward for structures, outward for holes.
pub fn offset_path(path: &Path, distance: f64, is_hole: bool) -> Path {
    path.offset_inward(if is_hole { -distance } else { distance })
}

/// Generate the walls of one ring.
///
/// Wall `k` is the ring offset by `d·(k + 0.5)` toward its solid side.
/// A wall that fails validation is dropped along with every deeper wall,
/// which also rules out the skin loop.
pub fn generate_walls(req: &WallRequest<'_>, trace: &dyn TraceSink) -> Result<WallSet> {
    let path = req.path;
    let min_points = if path.closed { 3 } else { 2 };
    if path.len() < min_points {
        return Err(SlicerError::InvariantViolation {
            layer: req.layer,
            ring: req.ring_id,
            reason: format!(
                "{} path with {} points reached wall generation",
                if path.closed { "closed" } else { "open" },
                path.len()
            ),
        });
    }
    if req.nozzle_diameter <= 0.0 {
        return Err(SlicerError::InvalidSettings(
            "nozzle_diameter must be positive".into(),
        ));
    }

    let d = req.nozzle_diameter;
    let mut set = WallSet::default();
    let mut prev_area = path.area();

    for k in 0..req.wall_count as usize {
        let distance = d * (k as f64 + 0.5);
        match validate_offset(req, distance, prev_area, k > 0) {
            Ok(wall) => {
                prev_area = wall.area();
                set.loops.push(WallLoop {
                    points: wall,
                    kind: if k == 0 { WallKind::Outer } else { WallKind::Inner },
                    ring_id: req.ring_id,
                });
                set.walls_emitted += 1;
            }
            Err(reason) => {
                record_drop(&mut set, req.ring_id, k, reason, trace);
                return Ok(set);
            }
        }
    }

    if req.emit_skin && path.closed {
        let k = req.wall_count as usize;
        let distance = d * k as f64;
        let check = if k == 0 {
            Ok(path.clone())
        } else {
            validate_offset(req, distance, prev_area, true)
        };
        match check {
            Ok(skin) => set.loops.push(WallLoop {
                points: skin,
                kind: WallKind::Skin,
                ring_id: req.ring_id,
            }),
            Err(reason) => record_drop(&mut set, req.ring_id, k, reason, trace),
        }
    }

    Ok(set)
}

fn record_drop(
    set: &mut WallSet,
    ring: usize,
    index: usize,
    reason: DropReason,
    trace: &dyn TraceSink,
) {
    set.dropped = Some(WallDrop { index, reason });
    emit(
        trace,
        TraceKind::WallDropped {
            ring,
            wall_index: index,
            reason,
        },
    );
}

/// Offset the request's ring by `distance` and check the result.
fn validate_offset(
    req: &WallRequest<'_>,
    distance: f64,
    prev_area: f64,
    check_clearance: bool,
) -> std::result::Result<Path, DropReason> {
    let tol = Tolerance::DEFAULT;
    let path = req.path;
    let signed = if req.nesting.is_hole { -distance } else { distance };
    let raw = path.offset_vertices(signed);

    if !path.closed {
        let wall = Path::open(raw);
        if wall.len() < 2 || tol.is_zero(wall.length()) {
            return Err(DropReason::Collapsed);
        }
        return Ok(wall);
    }

    if reversed_fraction(&path.points, &raw) > REVERSAL_LIMIT {
        return Err(DropReason::Inverted);
    }

    let folded = folds_back(path, &raw, distance);
    let wall = Path::closed(raw);
    if wall.len() < 3 {
        return Err(DropReason::Collapsed);
    }
    let area = wall.signed_area();
    if tol.is_zero_area(area) {
        return Err(DropReason::Collapsed);
    }
    if folded || area.signum() != path.signed_area().signum() {
        return Err(DropReason::Inverted);
    }

    let grew = area.abs() > prev_area + tol.area;
    let shrank = area.abs() < prev_area - tol.area;
    if (req.nesting.is_hole && !grew) || (!req.nesting.is_hole && !shrank) {
        return Err(DropReason::NotMonotonic);
    }

    if check_clearance && !has_clearance(&wall, &req.obstacles, req.nozzle_diameter / 2.0) {
        return Err(DropReason::Clearance);
    }

    Ok(wall)
}

/// Length share of offset edges pointing against their source edge.
fn reversed_fraction(source: &[Point2], offset: &[Point2]) -> f64 {
    let n = source.len().min(offset.len());
    if n < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut reversed = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let moved = offset[j] - offset[i];
        let len = moved.norm();
        total += len;
        if moved.dot(&(source[j] - source[i])) < 0.0 {
            reversed += len;
        }
    }
    if total <= 0.0 {
        return 1.0;
    }
    reversed / total
}

/// Some offset vertex came closer to the source ring than to its own
/// corner's edges, so part of the offset crossed over the ring.
///
/// `offset[i]` is source vertex `i` moved by `distance`; corners whose
/// miter was capped are allowed to sit closer.
fn folds_back(ring: &Path, offset: &[Point2], distance: f64) -> bool {
    let source = &ring.points;
    let n = source.len().min(offset.len());
    if n < 3 {
        return false;
    }
    let eps = Tolerance::DEFAULT.linear;
    offset[..n].iter().enumerate().any(|(i, p)| {
        let corner = &source[i];
        let own = distance_to_segment(p, &source[(i + n - 1) % n], corner)
            .min(distance_to_segment(p, corner, &source[(i + 1) % n]));
        distance_to_boundary(p, ring) < own.min(distance) - eps
    })
}

/// Every wall vertex keeps `min_gap` from each obstacle and stays on the
/// right side of it, and no obstacle vertex pokes within `min_gap` of the
/// wall.
fn has_clearance(wall: &Path, obstacles: &[Obstacle<'_>], min_gap: f64) -> bool {
    let limit = min_gap - Tolerance::DEFAULT.linear;
    let wall_bounds = wall.bounds();

    obstacles.iter().all(|obs| {
        let ob = obs.path.bounds();
        let near = ob.min_x - min_gap <= wall_bounds.max_x
            && wall_bounds.min_x <= ob.max_x + min_gap
            && ob.min_y - min_gap <= wall_bounds.max_y
            && wall_bounds.min_y <= ob.max_y + min_gap;
        if !near {
            // Disjoint boxes: only fine if the wall is meant to be outside.
            return !obs.encloses;
        }

        let wall_ok = wall.points.iter().all(|p| {
            distance_to_boundary(p, obs.path) >= limit
                && point_in_polygon(p, obs.path) == obs.encloses
        });
        wall_ok
            && obs
                .path
                .points
                .iter()
                .all(|p| distance_to_boundary(p, wall) >= limit)
    })
}
