//! Ring geometry: paths, segments, bounds, containment and offsets.

use lamina_math::{distance_to_segment, perp, Point2, Point3, Tolerance, Vec2};
use serde::{Deserialize, Serialize};

/// Longest miter, as a multiple of the offset distance.
const MITER_LIMIT: f64 = 2.0;

/// One edge of a layer cross-section. Undirected for stitching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub start: Point2,
    /// Second endpoint.
    pub end: Point2,
}

impl Segment {
    /// Create a segment.
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    /// Shorter than the linear tolerance.
    pub fn is_degenerate(&self) -> bool {
        Tolerance::DEFAULT.is_zero(self.length())
    }
}

/// A cross-section edge in model space, as produced by the mesh slicer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment3 {
    /// First endpoint.
    pub start: Point3,
    /// Second endpoint.
    pub end: Point3,
}

impl Segment3 {
    /// Create a segment.
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Drop Z to get the layer-plane segment.
    pub fn project(&self) -> Segment {
        Segment::new(
            Point2::new(self.start.x, self.start.y),
            Point2::new(self.end.x, self.end.y),
        )
    }
}

/// Axis-aligned bounding box of a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum X.
    pub min_x: f64,
    /// Maximum X.
    pub max_x: f64,
    /// Minimum Y.
    pub min_y: f64,
    /// Maximum Y.
    pub max_y: f64,
}

impl Bounds {
    /// Bounds containing nothing; overlaps nothing.
    pub const EMPTY: Self = Self {
        min_x: f64::INFINITY,
        max_x: f64::NEG_INFINITY,
        min_y: f64::INFINITY,
        max_y: f64::NEG_INFINITY,
    };

    /// Bounds of a point set.
    pub fn from_points(points: &[Point2]) -> Self {
        points.iter().fold(Self::EMPTY, |mut b, p| {
            b.min_x = b.min_x.min(p.x);
            b.max_x = b.max_x.max(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_y = b.max_y.max(p.y);
            b
        })
    }

    /// True if no point was ever added.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Width along X.
    pub fn width(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_x - self.min_x
        }
    }

    /// Height along Y.
    pub fn height(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max_y - self.min_y
        }
    }

    /// Do the two boxes share any area (touching counts)?
    pub fn overlaps(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Is the point inside or on the box?
    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// An ordered ring of points.
///
/// Closure is implicit: a closed path's last edge runs back to the first
/// point, which is never duplicated. Open paths are a tolerated stitching
/// result and are carried along with `closed == false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Vertices in order.
    pub points: Vec<Point2>,
    /// Whether the last point connects back to the first.
    pub closed: bool,
}

impl Path {
    /// Create a path, dropping consecutive points that coincide within
    /// tolerance (and a duplicated closing point).
    pub fn new(points: Vec<Point2>, closed: bool) -> Self {
        let tol = Tolerance::DEFAULT;
        let mut cleaned: Vec<Point2> = Vec::with_capacity(points.len());
        for p in points {
            if cleaned.last().is_some_and(|last| tol.points_equal(last, &p)) {
                continue;
            }
            cleaned.push(p);
        }
        if closed {
            while cleaned.len() > 1 && tol.points_equal(&cleaned[0], &cleaned[cleaned.len() - 1]) {
                cleaned.pop();
            }
        }
        Self {
            points: cleaned,
            closed,
        }
    }

    /// Create a closed ring.
    pub fn closed(points: Vec<Point2>) -> Self {
        Self::new(points, true)
    }

    /// Create an open polyline.
    pub fn open(points: Vec<Point2>) -> Self {
        Self::new(points, false)
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// No vertices at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges in order, including the closing edge of a closed path.
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.points.len();
        let count = match (self.closed, n) {
            (_, 0 | 1) => 0,
            (true, _) => n,
            (false, _) => n - 1,
        };
        (0..count).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Signed area of the implied closed ring.
    /// Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Absolute enclosed area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Is the ring counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Total edge length (perimeter for closed paths).
    pub fn length(&self) -> f64 {
        self.edges().map(|(a, b)| (b - a).norm()).sum()
    }

    /// Same ring walked the other way.
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            closed: self.closed,
        }
    }

    /// Bounding box.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    /// Unit normal at vertex `i` pointing out of the enclosed area.
    /// Averages the normals of the adjacent edges.
    pub fn outward_normal(&self, i: usize) -> Vec2 {
        let orient = self.orientation();
        let n1 = self.incoming_edge(i).and_then(|(a, b)| edge_left_normal(&a, &b));
        let n2 = self.outgoing_edge(i).and_then(|(a, b)| edge_left_normal(&a, &b));
        let sum = match (n1, n2) {
            (Some(a), Some(b)) => a + b,
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return Vec2::zeros(),
        };
        // Left normals point inward on a CCW ring.
        let sum = if sum.norm() < 1e-12 { n1.unwrap_or(sum) } else { sum };
        let len = sum.norm();
        if len < 1e-12 {
            return Vec2::zeros();
        }
        -sum / len * orient
    }

    /// Offset every vertex by `delta` toward the enclosed area
    /// (negative `delta` grows the ring). Miter joins are capped at
    /// twice the offset distance.
    ///
    /// No clean-up is attempted: an offset past the ring's inradius comes
    /// back inverted, which is what callers test for.
    pub fn offset_inward(&self, delta: f64) -> Path {
        if self.points.len() < 2 {
            return self.clone();
        }
        Path::new(self.offset_vertices(delta), self.closed)
    }

    /// Raw offset vertices, one per source vertex, before duplicate
    /// removal. Keeps the index correspondence with `self.points`.
    pub(crate) fn offset_vertices(&self, delta: f64) -> Vec<Point2> {
        let n = self.points.len();
        let orient = self.orientation();
        let mut out = Vec::with_capacity(n);

        for i in 0..n {
            let n1 = self
                .incoming_edge(i)
                .and_then(|(a, b)| edge_left_normal(&a, &b))
                .map(|v| v * orient);
            let n2 = self
                .outgoing_edge(i)
                .and_then(|(a, b)| edge_left_normal(&a, &b))
                .map(|v| v * orient);

            let shift = match (n1, n2) {
                (Some(a), Some(b)) => miter(&a, &b) * delta,
                (Some(a), None) | (None, Some(a)) => a * delta,
                (None, None) => Vec2::zeros(),
            };
            out.push(self.points[i] + shift);
        }

        out
    }

    fn orientation(&self) -> f64 {
        if self.signed_area() >= 0.0 {
            1.0
        } else {
            -1.0
        }
    }

    fn incoming_edge(&self, i: usize) -> Option<(Point2, Point2)> {
        let n = self.points.len();
        if i > 0 {
            Some((self.points[i - 1], self.points[i]))
        } else if self.closed && n > 1 {
            Some((self.points[n - 1], self.points[0]))
        } else {
            None
        }
    }

    fn outgoing_edge(&self, i: usize) -> Option<(Point2, Point2)> {
        let n = self.points.len();
        if i + 1 < n {
            Some((self.points[i], self.points[i + 1]))
        } else if self.closed && n > 1 {
            Some((self.points[n - 1], self.points[0]))
        } else {
            None
        }
    }
}

fn edge_left_normal(a: &Point2, b: &Point2) -> Option<Vec2> {
    let e = b - a;
    let len = e.norm();
    if len < 1e-12 {
        return None;
    }
    Some(perp(&(e / len)))
}

/// Unit-normal pair to a corner displacement (length ≥ 1).
fn miter(n1: &Vec2, n2: &Vec2) -> Vec2 {
    let sum = n1 + n2;
    if sum.norm() < 1e-9 {
        // Hairpin: the edges fold back on each other.
        return *n1;
    }
    let bisector = sum.normalize();
    let dot = n1.dot(&bisector);
    let scale = if dot > 1e-3 { 1.0 / dot } else { MITER_LIMIT };
    bisector * scale.min(MITER_LIMIT)
}

/// Bounding box of a path.
pub fn path_bounds(path: &Path) -> Bounds {
    path.bounds()
}

/// Even-odd ray casting test. Open paths are treated as implicitly closed.
pub fn point_in_polygon(point: &Point2, polygon: &Path) -> bool {
    let n = polygon.points.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let pi = &polygon.points[i];
        let pj = &polygon.points[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Shortest distance from a point to any edge of the ring
/// (including the implied closing edge).
pub fn distance_to_boundary(point: &Point2, polygon: &Path) -> f64 {
    let n = polygon.points.len();
    match n {
        0 => f64::INFINITY,
        1 => (point - polygon.points[0]).norm(),
        _ => (0..n)
            .map(|i| distance_to_segment(point, &polygon.points[i], &polygon.points[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Nearest-neighbor visiting order over rings, starting from `start`.
/// Each ring is entered at its first point and left from its last.
pub fn travel_order(paths: &[Path], start: Point2) -> Vec<usize> {
    let mut current = start;
    let mut remaining: Vec<usize> = (0..paths.len()).collect();
    let mut order = Vec::with_capacity(paths.len());

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_dist = f64::MAX;
        for (slot, &idx) in remaining.iter().enumerate() {
            let dist = paths[idx]
                .points
                .first()
                .map_or(f64::MAX, |p| (current - *p).norm());
            if dist < best_dist {
                best_dist = dist;
                best = slot;
            }
        }

        let idx = remaining.remove(best);
        if let Some(last) = paths[idx].points.last() {
            current = *last;
        }
        order.push(idx);
    }

    order
}
