use serde::{Deserialize, Serialize};

/// Determinant magnitude below which two segments count as parallel.
const PARALLEL_EPS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Axis-aligned box in screen coordinates (y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Strict overlap: boxes that only share an edge do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Top, right, bottom, left.
    pub fn edges(&self) -> [Segment; 4] {
        let tl = Point::new(self.x, self.y);
        let tr = Point::new(self.right(), self.y);
        let br = Point::new(self.right(), self.bottom());
        let bl = Point::new(self.x, self.bottom());
        [Segment::new(tl, tr), Segment::new(tr, br), Segment::new(br, bl), Segment::new(bl, tl)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn at(&self, t: f32) -> Point {
        Point::new(self.a.x + t * (self.b.x - self.a.x), self.a.y + t * (self.b.y - self.a.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Parameter along the first segment.
    pub t: f32,
    /// Parameter along the second segment.
    pub u: f32,
    pub point: Point,
}

fn cross(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ax * by - ay * bx
}

/// Solves `p.a + t (p.b - p.a) = q.a + u (q.b - q.a)` for `(t, u)`.
/// A crossing only counts when both parameters lie in `[0, 1]`; parallel and
/// collinear pairs never cross.
pub fn segment_intersection(p: &Segment, q: &Segment) -> Option<Crossing> {
    let (rx, ry) = (p.b.x - p.a.x, p.b.y - p.a.y);
    let (sx, sy) = (q.b.x - q.a.x, q.b.y - q.a.y);
    let denom = cross(rx, ry, sx, sy);
    if denom.abs() < PARALLEL_EPS {
        return None;
    }
    let (qx, qy) = (q.a.x - p.a.x, q.a.y - p.a.y);
    let t = cross(qx, qy, sx, sy) / denom;
    let u = cross(qx, qy, rx, ry) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some(Crossing { t, u, point: p.at(t) })
}

/// Nearest crossing of `seg` with any edge of `rect`, measured by Euclidean
/// distance from `seg.a`.
pub fn segment_rect_hit(seg: &Segment, rect: &Rect) -> Option<(f32, Point)> {
    rect.edges()
        .iter()
        .filter_map(|edge| segment_intersection(seg, edge))
        .map(|c| (seg.a.distance(c.point), c.point))
        .min_by(|a, b| a.0.total_cmp(&b.0))
}
