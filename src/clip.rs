//! Clipping polylines and polygons to rectangles.
//!
//! The engine walks the segments of a chain, keeping track of whether it's
//! inside the clip rectangle. Every maximal run of points inside the
//! rectangle becomes a fragment of the output, sharing point storage with
//! the input. Between fragments, the engine synthesizes "border" points that
//! follow the rectangle's boundary from the point where the chain left the
//! rectangle to the point where it came back.
//!
//! Deciding which way around the rectangle to walk is the tricky part. While
//! the chain is outside, we accumulate the signed angle it sweeps around the
//! center of the rectangle. When it comes back in, the sign of that angle
//! tells us the direction and its magnitude tells us how far to go, so that
//! the border bends around the same side of the rectangle that the original
//! chain did. For a polygon, this gives exactly the part of the rectangle's
//! boundary that belongs to the clipped polygon.

use std::{borrow::Cow, collections::HashMap, f64::consts::TAU};

use arrayvec::ArrayVec;
use kurbo::Rect;

use crate::{
    chain::{ChainId, PolylineChain},
    geom::{Point, RectExt},
    points::{DuplicatePolicy, PointSequence},
    transform::{ClipWindow, WindowTransform},
    Error,
};

// Angles closer than this are considered equal when deciding whether a
// corner lies strictly between two boundary points.
const ANGLE_EPS: f64 = 1e-9;

/// Configuration for a [`ClipEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// What to do with repeated points when splicing border runs together.
    ///
    /// Border points are sometimes placed deliberately close together to
    /// approximate a curved boundary, so they are kept by default.
    pub border_duplicates: DuplicatePolicy,
}

impl Default for ClipConfig {
    fn default() -> Self {
        ClipConfig {
            border_duplicates: DuplicatePolicy::Keep,
        }
    }
}

/// Clips polyline chains to rectangles.
///
/// An engine holds scratch buffers that get reused from one call to the
/// next, so if you're clipping lots of chains it's worth keeping one around.
/// It isn't meant to be shared between threads: make one per thread.
#[derive(Debug)]
pub struct ClipEngine {
    config: ClipConfig,

    // The working rectangle, in the coordinates of the chain being clipped.
    rect: Rect,
    center: kurbo::Point,

    // Scratch copy of the points being clipped.
    points: Vec<kurbo::Point>,
    // Border points waiting to be attached, as interleaved coordinates.
    border: Vec<f32>,
    output: Option<PolylineChain>,

    // The signed angle swept around `center` since the last exit.
    sweep: f64,
    // Where we last left the rectangle.
    exit: Option<kurbo::Point>,
    // Where we first entered the rectangle, and the sweep up to that point.
    first_entry: Option<(kurbo::Point, f64)>,
    // The index of the first point of the current inside run.
    lower: usize,
}

impl Default for ClipEngine {
    fn default() -> Self {
        Self::new(ClipConfig::default())
    }
}

/// Finds the parameter range `[t0, t1]` of the segment `p + t (q - p)`,
/// `0 <= t <= 1`, that lies in `rect`. The boundary counts as inside.
///
/// Returns `None` if the segment misses the rectangle.
fn parametric_clip(rect: &Rect, p: kurbo::Point, q: kurbo::Point) -> Option<(f64, f64)> {
    let d = q - p;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    // Each constraint reads `den * t <= num`.
    let constraints = [
        (-d.x, p.x - rect.x0),
        (d.x, rect.x1 - p.x),
        (-d.y, p.y - rect.y0),
        (d.y, rect.y1 - p.y),
    ];
    for (den, num) in constraints {
        if den == 0.0 {
            // Parallel to this edge: no crossing, so we're either always
            // on the right side of it or never.
            if num < 0.0 {
                return None;
            }
            continue;
        }
        let t = num / den;
        if den < 0.0 {
            if t > t1 {
                return None;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return None;
            }
            t1 = t1.min(t);
        }
    }
    Some((t0, t1))
}

/// Moves a point that's supposed to be on the boundary of `rect` exactly onto it.
fn snap_to_boundary(rect: &Rect, p: kurbo::Point) -> kurbo::Point {
    let x = p.x.clamp(rect.x0, rect.x1);
    let y = p.y.clamp(rect.y0, rect.y1);
    let candidates = [
        (x - rect.x0, kurbo::Point::new(rect.x0, y)),
        (rect.x1 - x, kurbo::Point::new(rect.x1, y)),
        (y - rect.y0, kurbo::Point::new(x, rect.y0)),
        (rect.y1 - y, kurbo::Point::new(x, rect.y1)),
    ];
    candidates
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map_or(kurbo::Point::new(x, y), |(_, snapped)| snapped)
}

impl ClipEngine {
    pub fn new(config: ClipConfig) -> Self {
        ClipEngine {
            config,
            rect: Rect::ZERO,
            center: kurbo::Point::ZERO,
            points: Vec::new(),
            border: Vec::new(),
            output: None,
            sweep: 0.0,
            exit: None,
            first_entry: None,
            lower: 0,
        }
    }

    pub fn config(&self) -> &ClipConfig {
        &self.config
    }

    /// Clips `chain` to a window.
    ///
    /// If `closed` is true, the chain is treated as a polygon: there's an
    /// implicit segment from its last point back to its first, and the parts
    /// of the window's boundary that lie inside the polygon get added as
    /// border points.
    ///
    /// Returns `None` if the chain doesn't intersect the window, the chain
    /// itself (borrowed) if it's entirely inside, and a new chain otherwise.
    ///
    /// If the window can't be transformed into the chain's coordinates, the
    /// chain is returned unclipped: drawing too much beats losing data.
    pub fn clip<'c, T: WindowTransform>(
        &mut self,
        chain: &'c PolylineChain,
        closed: bool,
        window: &ClipWindow<T>,
    ) -> Result<Option<Cow<'c, PolylineChain>>, Error> {
        match window.native_rect() {
            Ok(rect) => self.clip_rect(chain, closed, rect),
            Err(Error::TransformFailure(e)) => {
                log::warn!("not clipping {:?}: {e}", chain.id());
                Ok(Some(Cow::Borrowed(chain)))
            }
            Err(e) => Err(e),
        }
    }

    /// Clips `chain` to a rectangle in the chain's own coordinates.
    ///
    /// See [`ClipEngine::clip`] for the meaning of `closed` and of the result.
    pub fn clip_rect<'c>(
        &mut self,
        chain: &'c PolylineChain,
        closed: bool,
        rect: Rect,
    ) -> Result<Option<Cow<'c, PolylineChain>>, Error> {
        let rect = rect.abs();
        let Some(bounds) = chain.bounds() else {
            return Ok(None);
        };
        if rect.contains_rect(bounds) {
            log::trace!("{:?} is inside {rect:?}", chain.id());
            return Ok(Some(Cow::Borrowed(chain)));
        }
        if !rect.touches(&bounds) {
            log::trace!("{:?} is outside {rect:?}", chain.id());
            return Ok(None);
        }

        self.reset(rect);
        self.points.extend(chain.points().map(Point::to_kurbo));
        let ret = self.scan(chain, closed);
        self.points.clear();
        ret
    }

    fn reset(&mut self, rect: Rect) {
        self.rect = rect;
        self.center = rect.center();
        self.points.clear();
        self.border.clear();
        self.output = None;
        self.sweep = 0.0;
        self.exit = None;
        self.first_entry = None;
        self.lower = 0;
    }

    fn scan<'c>(
        &mut self,
        chain: &'c PolylineChain,
        closed: bool,
    ) -> Result<Option<Cow<'c, PolylineChain>>, Error> {
        let n = self.points.len();
        let segments = if closed { n } else { n.saturating_sub(1) };
        let mut inside = self.points.first().is_some_and(|p| self.rect.contains_inclusive(*p));

        for i in 0..segments {
            let p = self.points[i];
            let q = self.points[if i + 1 == n { 0 } else { i + 1 }];
            if p == q {
                continue;
            }
            let q_inside = self.rect.contains_inclusive(q);
            match (inside, q_inside) {
                (true, true) => {}
                (true, false) => self.exit_at(chain, i, p, q)?,
                (false, true) => self.enter_at(i, p, q),
                (false, false) => self.pass_outside(p, q),
            }
            inside = q_inside;
        }

        if inside {
            if self.lower < n {
                if let Some(fragment) = chain.subrange(self.lower, n)? {
                    self.attach(fragment)?;
                }
            }
        } else if closed {
            if let (Some(exit), Some((entry, initial))) = (self.exit, self.first_entry) {
                self.build_border(exit, self.sweep + initial, entry);
            }
        }

        self.finish(chain, closed)
    }

    fn finish<'c>(
        &mut self,
        chain: &'c PolylineChain,
        closed: bool,
    ) -> Result<Option<Cow<'c, PolylineChain>>, Error> {
        let policy = self.config.border_duplicates;

        if let Some(mut out) = self.output.take() {
            out.append_border(&self.border, policy)?;
            self.border.clear();
            out.freeze(closed);
            #[cfg(feature = "slow-asserts")]
            out.check_invariants();
            log::debug!(
                "clipped {:?} to {} main and {} border points",
                chain.id(),
                out.main_point_count(),
                out.border_point_count()
            );
            return Ok(Some(Cow::Owned(out)));
        }

        if self.border.len() >= 4 {
            let seq = PointSequence::from_flat_with(std::mem::take(&mut self.border), policy)?;
            log::debug!("{:?} only crosses the window, {} border points", chain.id(), seq.len());
            let out = PolylineChain::from_border(seq);
            #[cfg(feature = "slow-asserts")]
            out.check_invariants();
            return Ok(Some(Cow::Owned(out)));
        }
        self.border.clear();

        if closed {
            let winding = chain.winding(self.center);
            if winding != 0 {
                log::debug!("{:?} covers the whole window", chain.id());
                return Ok(Some(Cow::Owned(self.window_outline(winding > 0))));
            }
        }
        Ok(None)
    }

    // The boundary of the window as a chain of border points.
    fn window_outline(&self, counter_clockwise: bool) -> PolylineChain {
        let mut corners = self.rect.corners();
        if !counter_clockwise {
            corners.reverse();
        }
        PolylineChain::from_border(PointSequence::from_points(
            corners.into_iter().map(Point::from_kurbo),
        ))
    }

    fn point_at(&self, p: kurbo::Point, q: kurbo::Point, t: f64) -> kurbo::Point {
        if t <= 0.0 {
            p
        } else if t >= 1.0 {
            q
        } else {
            snap_to_boundary(&self.rect, p.lerp(q, t))
        }
    }

    // The signed angle from `a` to `b`, as seen from the center of the window.
    fn angle(&self, a: kurbo::Point, b: kurbo::Point) -> f64 {
        let u = a - self.center;
        let v = b - self.center;
        u.cross(v).atan2(u.dot(v))
    }

    fn direction(&self, p: kurbo::Point) -> f64 {
        let v = p - self.center;
        v.y.atan2(v.x)
    }

    fn push_border(&mut self, p: kurbo::Point) {
        let p = Point::from_kurbo(p);
        if let [.., x, y] = self.border[..] {
            if x == p.x && y == p.y {
                return;
            }
        }
        self.border.extend_from_slice(&[p.x, p.y]);
    }

    // Adds an inside run to the output, after whatever border is pending.
    fn attach(&mut self, fragment: PolylineChain) -> Result<(), Error> {
        let mut out = self.output.take().unwrap_or_default();
        out.append_border(&self.border, self.config.border_duplicates)?;
        self.border.clear();
        self.output = Some(out.concat(fragment)?);
        Ok(())
    }

    // We just came back into the window at `entry`, having left it at the last
    // exit (if there was one).
    fn reach(&mut self, entry: kurbo::Point) {
        match self.exit {
            Some(exit) => self.build_border(exit, self.sweep, entry),
            None => self.first_entry = Some((entry, self.sweep)),
        }
    }

    fn exit_at(
        &mut self,
        chain: &PolylineChain,
        i: usize,
        p: kurbo::Point,
        q: kurbo::Point,
    ) -> Result<(), Error> {
        let t = parametric_clip(&self.rect, p, q).map_or(0.0, |(_, t1)| t1);
        let exit = self.point_at(p, q, t);
        log::trace!("exit at {exit:?} after point {i}");

        if let Some(fragment) = chain.subrange(self.lower, i + 1)? {
            self.attach(fragment)?;
        }
        if Point::from_kurbo(exit) != Point::from_kurbo(p) {
            self.push_border(exit);
        }
        self.exit = Some(exit);
        self.sweep = self.angle(exit, q);
        Ok(())
    }

    fn enter_at(&mut self, i: usize, p: kurbo::Point, q: kurbo::Point) {
        let t = parametric_clip(&self.rect, p, q).map_or(1.0, |(t0, _)| t0);
        let entry = self.point_at(p, q, t);
        log::trace!("entry at {entry:?} after point {i}");

        self.sweep += self.angle(p, entry);
        self.reach(entry);
        if Point::from_kurbo(entry) != Point::from_kurbo(q) {
            self.push_border(entry);
        }
        self.lower = i + 1;
    }

    // A segment with both ends outside. It might still cut through the window.
    fn pass_outside(&mut self, p: kurbo::Point, q: kurbo::Point) {
        match parametric_clip(&self.rect, p, q) {
            Some((t0, t1)) if t0 <= t1 => {
                let entry = self.point_at(p, q, t0);
                let exit = self.point_at(p, q, t1);
                log::trace!("passing through from {entry:?} to {exit:?}");

                self.sweep += self.angle(p, entry);
                self.reach(entry);
                self.push_border(entry);
                self.push_border(exit);
                self.exit = Some(exit);
                self.sweep = self.angle(exit, q);
            }
            _ => self.sweep += self.angle(p, q),
        }
    }

    /// Adds the corners of the window that lie strictly between `from` and
    /// `to`, going around in the direction given by the sign of `sweep` (and
    /// no further than `sweep` radians).
    fn build_border(&mut self, from: kurbo::Point, sweep: f64, to: kurbo::Point) {
        let total = sweep.abs().min(TAU);
        if total <= ANGLE_EPS {
            return;
        }
        let start = self.direction(from);
        let mut corners = ArrayVec::<(f64, kurbo::Point), 4>::new();
        for corner in self.rect.corners() {
            let a = self.direction(corner);
            let d = (if sweep > 0.0 { a - start } else { start - a }).rem_euclid(TAU);
            if d > ANGLE_EPS && d < total - ANGLE_EPS && corner != from && corner != to {
                corners.push((d, corner));
            }
        }
        corners.sort_by(|a, b| a.0.total_cmp(&b.0));
        log::trace!("border from {from:?} to {to:?} through {} corners", corners.len());
        for (_, corner) in corners {
            self.push_border(corner);
        }
    }

    /// Starts a clipping session, in which every chain gets clipped at most
    /// once.
    pub fn session<'e, 'w, T: WindowTransform>(
        &'e mut self,
        window: &'w ClipWindow<T>,
    ) -> ClipSession<'e, 'w, T> {
        ClipSession {
            engine: self,
            window,
            cache: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug)]
enum Cached {
    Unchanged,
    Outside,
    Clipped(PolylineChain),
}

/// Clips many chains to the same window, remembering the results.
///
/// Composite geometries often refer to the same chain more than once;
/// within a session, each chain (as identified by [`PolylineChain::id`]) is
/// only clipped once. Chains must not be modified while a session that has
/// seen them is alive.
#[derive(Debug)]
pub struct ClipSession<'e, 'w, T: WindowTransform> {
    engine: &'e mut ClipEngine,
    window: &'w ClipWindow<T>,
    cache: HashMap<(ChainId, bool), Cached>,
}

impl<T: WindowTransform> ClipSession<'_, '_, T> {
    /// Clips `chain` to this session's window, or returns the cached result.
    pub fn clip<'c>(
        &mut self,
        chain: &'c PolylineChain,
        closed: bool,
    ) -> Result<Option<Cow<'c, PolylineChain>>, Error> {
        let key = (chain.id(), closed);
        if let Some(cached) = self.cache.get(&key) {
            log::trace!("reusing clip result for {:?}", chain.id());
            return Ok(match cached {
                Cached::Unchanged => Some(Cow::Borrowed(chain)),
                Cached::Outside => None,
                Cached::Clipped(c) => Some(Cow::Owned(c.clone())),
            });
        }

        let ret = self.engine.clip(chain, closed, self.window)?;
        let cached = match &ret {
            None => Cached::Outside,
            Some(Cow::Borrowed(_)) => Cached::Unchanged,
            Some(Cow::Owned(c)) => Cached::Clipped(c.clone()),
        };
        self.cache.insert(key, cached);
        Ok(ret)
    }

    /// The number of distinct chains clipped so far.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use kurbo::Affine;
    use proptest::prelude::*;

    use super::*;
    use crate::{chain::PointKind, geom::tests::grid_point};

    fn pts(chain: &PolylineChain) -> Vec<(f32, f32)> {
        chain.points().map(|p| (p.x, p.y)).collect()
    }

    fn clip(points: &[(f32, f32)], closed: bool, rect: Rect) -> Option<PolylineChain> {
        let chain = PolylineChain::from_points(points.iter().copied());
        ClipEngine::default()
            .clip_rect(&chain, closed, rect)
            .unwrap()
            .map(Cow::into_owned)
    }

    fn on_boundary(rect: &Rect, p: Point) -> bool {
        let (x, y) = (f64::from(p.x), f64::from(p.y));
        let in_x = rect.x0 <= x && x <= rect.x1;
        let in_y = rect.y0 <= y && y <= rect.y1;
        (in_x && (y == rect.y0 || y == rect.y1)) || (in_y && (x == rect.x0 || x == rect.x1))
    }

    #[test]
    fn parametric() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let p = kurbo::Point::new(-5.0, 5.0);
        let q = kurbo::Point::new(15.0, 5.0);
        assert_eq!(parametric_clip(&r, p, q), Some((0.25, 0.75)));
        // Parallel to an edge, outside it.
        let p = kurbo::Point::new(-5.0, 11.0);
        let q = kurbo::Point::new(15.0, 11.0);
        assert_eq!(parametric_clip(&r, p, q), None);
        // Along an edge counts as inside.
        let p = kurbo::Point::new(-5.0, 10.0);
        let q = kurbo::Point::new(15.0, 10.0);
        assert_eq!(parametric_clip(&r, p, q), Some((0.25, 0.75)));
    }

    #[test]
    fn contained_is_identity() {
        let chain = PolylineChain::from_points([(1.0, 1.0), (2.0, 3.0), (4.0, 1.0)]);
        let out = ClipEngine::default()
            .clip_rect(&chain, true, Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        assert_matches!(out, Some(Cow::Borrowed(c)) if std::ptr::eq(c, &chain));

        // Grazing the boundary still counts as inside.
        let out = ClipEngine::default()
            .clip_rect(&chain, false, Rect::new(1.0, 1.0, 4.0, 3.0))
            .unwrap();
        assert_matches!(out, Some(Cow::Borrowed(_)));
    }

    #[test]
    fn disjoint_is_none() {
        assert!(clip(&[(100.0, 100.0)], false, Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
        assert!(clip(
            &[(20.0, 0.0), (30.0, 0.0), (30.0, 5.0)],
            true,
            Rect::new(0.0, 0.0, 10.0, 10.0)
        )
        .is_none());
        assert!(clip(&[], true, Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn square_clipped_to_right_half() {
        let out = clip(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            true,
            Rect::new(5.0, -5.0, 15.0, 15.0),
        )
        .unwrap();
        out.check_invariants();
        assert_eq!(
            pts(&out),
            vec![(10.0, 0.0), (10.0, 10.0), (5.0, 10.0), (5.0, 0.0)]
        );
        let kinds: Vec<_> = out.iter().map(|(_, k)| k).collect();
        assert_eq!(
            kinds,
            vec![
                PointKind::Main,
                PointKind::Main,
                PointKind::Border,
                PointKind::Border
            ]
        );
        assert_eq!(out.link_count(), 1);
        assert_eq!(out.signed_area(), 50.0);
    }

    #[test]
    fn diagonal_through_corners() {
        let out = clip(
            &[(-5.0, 15.0), (15.0, -5.0)],
            false,
            Rect::new(0.0, 0.0, 10.0, 10.0),
        )
        .unwrap();
        assert_eq!(out.main_point_count(), 0);
        assert_eq!(pts(&out), vec![(0.0, 10.0), (10.0, 0.0)]);
    }

    #[test]
    fn corner_touch_is_none() {
        assert!(clip(
            &[(-5.0, 5.0), (5.0, -5.0)],
            false,
            Rect::new(0.0, 0.0, 10.0, 10.0)
        )
        .is_none());
    }

    #[test]
    fn polygon_around_window() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let ccw = [(-5.0, -5.0), (15.0, -5.0), (15.0, 15.0), (-5.0, 15.0)];
        let out = clip(&ccw, true, rect).unwrap();
        assert_eq!(
            pts(&out),
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
        );
        assert_eq!(out.main_point_count(), 0);
        assert!(out.signed_area() > 0.0);

        let mut cw = ccw;
        cw.reverse();
        assert!(clip(&cw, true, rect).unwrap().signed_area() < 0.0);

        // As an open polyline, it doesn't touch the window at all.
        assert!(clip(&ccw, false, rect).is_none());
    }

    #[test]
    fn polygon_with_a_hole_around_window() {
        // A "U" shape whose notch contains the window: the window is outside.
        let u = [
            (-10.0, -10.0),
            (20.0, -10.0),
            (20.0, 20.0),
            (15.0, 20.0),
            (15.0, -5.0),
            (-5.0, -5.0),
            (-5.0, 20.0),
            (-10.0, 20.0),
        ];
        assert!(clip(&u, true, Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn border_goes_around_the_right_side() {
        // A polygon that leaves through the top, wraps around the right side
        // of the window outside it, and comes back in through the bottom.
        let poly = [
            (5.0, 5.0),
            (5.0, 20.0),
            (20.0, 20.0),
            (20.0, -10.0),
            (5.0, -10.0),
        ];
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let out = clip(&poly, true, rect).unwrap();
        out.check_invariants();
        assert_eq!(
            pts(&out),
            vec![(5.0, 5.0), (5.0, 10.0), (10.0, 10.0), (10.0, 0.0), (5.0, 0.0)]
        );
        assert!((out.signed_area() + 50.0).abs() < 1e-9);
    }

    #[test]
    fn open_polyline_leaving_and_returning() {
        let line = [(2.0, 2.0), (2.0, 20.0), (8.0, 20.0), (8.0, 2.0)];
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let out = clip(&line, false, rect).unwrap();
        assert_eq!(
            pts(&out),
            vec![(2.0, 2.0), (2.0, 10.0), (8.0, 10.0), (8.0, 2.0)]
        );
        assert_eq!(out.main_point_count(), 2);
    }

    #[test]
    fn open_polyline_leading_and_trailing_entries() {
        let line = [(-5.0, 5.0), (5.0, 5.0), (5.0, 15.0)];
        let out = clip(&line, false, Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        let kinds: Vec<_> = out.iter().map(|(_, k)| k).collect();
        assert_eq!(pts(&out), vec![(0.0, 5.0), (5.0, 5.0), (5.0, 10.0)]);
        assert_eq!(
            kinds,
            vec![PointKind::Border, PointKind::Main, PointKind::Border]
        );
    }

    #[test]
    fn transform_failure_keeps_geometry() {
        let chain = PolylineChain::from_points([(0.0, 0.0), (100.0, 100.0)]);
        let window =
            ClipWindow::with_transform(Rect::new(0.0, 0.0, 1.0, 1.0), Affine::scale(0.0));
        let out = ClipEngine::default().clip(&chain, false, &window).unwrap();
        assert_matches!(out, Some(Cow::Borrowed(_)));
    }

    #[test]
    fn transformed_window() {
        let chain = PolylineChain::from_points([(0.0, 5.0), (20.0, 5.0)]);
        let window =
            ClipWindow::with_transform(Rect::new(0.0, 0.0, 5.0, 5.0), Affine::scale(2.0));
        let out = ClipEngine::default()
            .clip(&chain, false, &window)
            .unwrap()
            .unwrap();
        assert_eq!(pts(&out), vec![(0.0, 5.0), (10.0, 5.0)]);
    }

    #[test]
    fn fragments_share_storage() {
        let chain = PolylineChain::from_points([
            (-5.0, 5.0),
            (1.0, 5.0),
            (2.0, 6.0),
            (3.0, 5.0),
            (20.0, 5.0),
        ]);
        let out = ClipEngine::default()
            .clip_rect(&chain, false, Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap()
            .unwrap();
        let original = chain.links().next().unwrap().main.unwrap();
        let main = out.links().find_map(|l| l.main).unwrap();
        assert!(main.shares_storage_with(original));
        assert_eq!(main.len(), 3);
    }

    #[test]
    fn session_caches_by_identity() {
        let chain = PolylineChain::from_points([(-5.0, 5.0), (5.0, 5.0)]);
        let alias = chain.clone();
        let other = PolylineChain::from_points([(-5.0, 5.0), (5.0, 5.0)]);
        let window = ClipWindow::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut engine = ClipEngine::default();
        let mut session = engine.session(&window);
        let a = session.clip(&chain, false).unwrap().unwrap();
        let b = session.clip(&alias, false).unwrap().unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(a.id(), b.id());
        session.clip(&other, false).unwrap();
        session.clip(&chain, true).unwrap();
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn engine_is_reusable() {
        let mut engine = ClipEngine::default();
        let rect = Rect::new(5.0, -5.0, 15.0, 15.0);
        let square = PolylineChain::from_points([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let first = engine.clip_rect(&square, true, rect).unwrap().unwrap();
        let second = engine.clip_rect(&square, true, rect).unwrap().unwrap();
        assert_eq!(pts(&first), pts(&second));
    }

    #[test]
    fn config_from_yaml() {
        let config: ClipConfig = serde_yaml::from_str("border_duplicates: Remove").unwrap();
        assert_eq!(config.border_duplicates, DuplicatePolicy::Remove);
        let config: ClipConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ClipConfig::default());
    }

    #[test]
    fn arbitrary_clips() {
        arbtest::arbtest(crate::arbitrary::arbtests::clip);
    }

    fn polyline() -> impl Strategy<Value = Vec<Point>> {
        prop::collection::vec(grid_point(20), 1..12)
    }

    proptest! {
        #[test]
        fn main_points_come_from_the_input(ps in polyline(), closed in any::<bool>()) {
            let chain = PolylineChain::from_points(ps.clone());
            let rect = Rect::new(-5.0, -5.0, 5.0, 5.0);
            if let Some(out) = ClipEngine::default().clip_rect(&chain, closed, rect).unwrap() {
                out.check_invariants();
                for (p, kind) in out.iter() {
                    match kind {
                        PointKind::Main => {
                            prop_assert!(ps.contains(&p));
                            prop_assert!(rect.contains_inclusive(p.to_kurbo()));
                        }
                        PointKind::Border => prop_assert!(on_boundary(&rect, p), "{p:?}"),
                    }
                }
            }
        }

        #[test]
        fn clipping_twice_changes_nothing(ps in polyline(), closed in any::<bool>()) {
            let chain = PolylineChain::from_points(ps);
            let rect = Rect::new(-5.0, -5.0, 5.0, 5.0);
            let mut engine = ClipEngine::default();
            if let Some(out) = engine.clip_rect(&chain, closed, rect).unwrap() {
                let again = engine.clip_rect(&out, closed, rect).unwrap();
                prop_assert!(matches!(again, Some(Cow::Borrowed(_))));
            }
        }
    }
}
