//! Geometric primitives: points and inclusive rectangle predicates.

use kurbo::Rect;

/// A two-dimensional point.
///
/// Coordinates are stored in single precision. That's plenty for display and
/// indexing, and it halves the size of large coastline datasets. Computations
/// on points (intersections, areas) are done in `f64`.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl Point {
    /// Create a new point.
    pub fn new(x: f32, y: f32) -> Self {
        debug_assert!(x.is_finite());
        debug_assert!(y.is_finite());
        Point { x, y }
    }

    /// Converts to a double-precision `kurbo` point.
    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(self.x.into(), self.y.into())
    }

    /// Rounds a double-precision point to single precision.
    pub fn from_kurbo(p: kurbo::Point) -> Self {
        Point {
            x: p.x as f32,
            y: p.y as f32,
        }
    }

    /// The euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        self.to_kurbo().distance(other.to_kurbo())
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<kurbo::Point> for Point {
    fn from(p: kurbo::Point) -> Self {
        Point::from_kurbo(p)
    }
}

/// Rectangle predicates that treat the boundary as part of the rectangle.
///
/// `kurbo`'s own `Rect::contains` is half-open. Clipping needs closed
/// rectangles: a vertex lying exactly on the clip boundary must count as
/// visible, or it would get dropped from the output.
///
/// All of these assume that the rectangle is normalized (see `Rect::abs`).
pub trait RectExt {
    /// Is `p` inside the rectangle or on its boundary?
    fn contains_inclusive(&self, p: kurbo::Point) -> bool;

    /// Do the two rectangles share at least one point?
    fn touches(&self, other: &Rect) -> bool;

    /// The four corners, in counter-clockwise order (for a y-up coordinate
    /// system) starting from `(x0, y0)`.
    fn corners(&self) -> [kurbo::Point; 4];
}

impl RectExt for Rect {
    fn contains_inclusive(&self, p: kurbo::Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    fn touches(&self, other: &Rect) -> bool {
        other.x0 <= self.x1 && other.x1 >= self.x0 && other.y0 <= self.y1 && other.y1 >= self.y0
    }

    fn corners(&self) -> [kurbo::Point; 4] {
        [
            kurbo::Point::new(self.x0, self.y0),
            kurbo::Point::new(self.x1, self.y0),
            kurbo::Point::new(self.x1, self.y1),
            kurbo::Point::new(self.x0, self.y1),
        ]
    }
}

/// The smallest rectangle containing all of `points`, or `None` if there are
/// no points.
pub fn bounds_of(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
    let mut points = points.into_iter();
    let first = points.next()?.to_kurbo();
    let mut rect = Rect::from_points(first, first);
    for p in points {
        let p = p.to_kurbo();
        rect.x0 = rect.x0.min(p.x);
        rect.y0 = rect.y0.min(p.y);
        rect.x1 = rect.x1.max(p.x);
        rect.y1 = rect.y1.max(p.y);
    }
    Some(rect)
}

/// Unions two optional bounding boxes.
pub fn union_bounds(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// The contribution of the segment from `a` to `b` to the non-zero winding
/// number of `p`.
///
/// Upward segments with `p` on their left count +1, downward segments with
/// `p` on their right count -1, so counter-clockwise rings (in y-up
/// coordinates) wind positively.
pub(crate) fn segment_winding(a: kurbo::Point, b: kurbo::Point, p: kurbo::Point) -> i32 {
    let side = (b - a).cross(p - a);
    if a.y <= p.y {
        i32::from(b.y > p.y && side > 0.0)
    } else {
        -i32::from(b.y <= p.y && side < 0.0)
    }
}

/// Is `p` exactly on the closed segment from `a` to `b`?
pub(crate) fn on_segment(a: kurbo::Point, b: kurbo::Point, p: kurbo::Point) -> bool {
    (b - a).cross(p - a) == 0.0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}
