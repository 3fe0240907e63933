//! Turning chains into drawing commands.

use kurbo::{Affine, BezPath, Line, ParamCurveArclen, ParamCurveArea, PathEl, Rect, Shape};

use crate::{
    chain::PolylineChain,
    geom::{segment_winding, Point},
    points::PointSequence,
};

/// A lazy stream of drawing commands for a sequence of chains.
///
/// Each chain starts a new subpath: a `MoveTo` for its first point and a
/// `LineTo` for every following point, in chain order (main points, then
/// border points, link by link). Closed chains end with a `ClosePath`; if
/// their last point repeats the first, it's left out since the close
/// command draws that segment anyway.
///
/// The producer is cheap to clone, and [`PathProducer::restart`] rewinds it
/// to the beginning.
#[derive(Clone, Debug)]
pub struct PathProducer<'a> {
    chains: Vec<(&'a PolylineChain, bool)>,
    transform: Option<Affine>,

    chain: usize,
    loaded: bool,
    runs: Vec<&'a PointSequence>,
    run: usize,
    offset: usize,
    first: Option<Point>,
    prev: Option<Point>,
    closed_subpath: bool,
}

impl<'a> PathProducer<'a> {
    /// Creates a producer for some chains, each with a flag saying whether
    /// it's closed.
    pub fn new(chains: impl IntoIterator<Item = (&'a PolylineChain, bool)>) -> Self {
        PathProducer {
            chains: chains.into_iter().collect(),
            transform: None,
            chain: 0,
            loaded: false,
            runs: Vec::new(),
            run: 0,
            offset: 0,
            first: None,
            prev: None,
            closed_subpath: false,
        }
    }

    /// Creates a producer for a single chain.
    pub fn single(chain: &'a PolylineChain, closed: bool) -> Self {
        Self::new([(chain, closed)])
    }

    /// Applies `transform` to every point before emitting it.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Rewinds to the first command of the first chain.
    pub fn restart(&mut self) {
        self.chain = 0;
        self.loaded = false;
        self.runs.clear();
    }

    /// Collects all the commands (from the beginning) into a path.
    pub fn to_bez_path(&self) -> BezPath {
        let mut producer = self.clone();
        producer.restart();
        producer.collect()
    }

    /// Wraps this producer in something implementing [`kurbo::Shape`].
    pub fn outline(self) -> Outline<'a> {
        Outline { producer: self }
    }

    fn load(&mut self) {
        self.runs.clear();
        if let Some(&(chain, _)) = self.chains.get(self.chain) {
            for link in chain.links() {
                self.runs.extend(link.main);
                self.runs.extend(link.border);
            }
        }
        self.run = 0;
        self.offset = 0;
        self.first = None;
        self.prev = None;
        self.closed_subpath = false;
        self.loaded = true;
    }

    fn next_point(&mut self) -> Option<(Point, bool)> {
        while let Some(run) = self.runs.get(self.run) {
            if let Some(p) = run.get(self.offset) {
                self.offset += 1;
                let last = self.offset == run.len() && self.run + 1 == self.runs.len();
                return Some((p, last));
            }
            self.run += 1;
            self.offset = 0;
        }
        None
    }

    fn emit(&self, p: Point) -> kurbo::Point {
        let p = p.to_kurbo();
        match self.transform {
            Some(a) => a * p,
            None => p,
        }
    }
}

impl Iterator for PathProducer<'_> {
    type Item = PathEl;

    fn next(&mut self) -> Option<PathEl> {
        loop {
            let &(_, closed) = self.chains.get(self.chain)?;
            if !self.loaded {
                self.load();
            }

            match self.next_point() {
                Some((p, last)) => match self.first {
                    None => {
                        self.first = Some(p);
                        self.prev = Some(p);
                        return Some(PathEl::MoveTo(self.emit(p)));
                    }
                    Some(first) => {
                        if self.prev == Some(p) || (closed && last && first == p) {
                            continue;
                        }
                        self.prev = Some(p);
                        return Some(PathEl::LineTo(self.emit(p)));
                    }
                },
                None => {
                    if closed && self.first.is_some() && !self.closed_subpath {
                        self.closed_subpath = true;
                        return Some(PathEl::ClosePath);
                    }
                    self.chain += 1;
                    self.loaded = false;
                }
            }
        }
    }
}

/// Chains viewed as a [`kurbo::Shape`].
///
/// Every segment is a straight line, so lengths and areas are exact.
#[derive(Clone, Debug)]
pub struct Outline<'a> {
    producer: PathProducer<'a>,
}

impl<'a> Outline<'a> {
    pub fn new(producer: PathProducer<'a>) -> Self {
        Outline { producer }
    }

    // All the line segments drawn, including the closing ones.
    fn lines(&self) -> impl Iterator<Item = Line> + 'a {
        let mut start = kurbo::Point::ZERO;
        let mut current = kurbo::Point::ZERO;
        let mut producer = self.producer.clone();
        producer.restart();
        producer.filter_map(move |el| match el {
            PathEl::MoveTo(p) => {
                start = p;
                current = p;
                None
            }
            PathEl::LineTo(p) => {
                let line = Line::new(current, p);
                current = p;
                Some(line)
            }
            PathEl::ClosePath => {
                let line = Line::new(current, start);
                current = start;
                (line.p0 != line.p1).then_some(line)
            }
            // We never produce curves.
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => None,
        })
    }
}

impl Shape for Outline<'_> {
    type PathElementsIter<'iter>
        = PathProducer<'iter>
    where
        Self: 'iter;

    fn path_elements(&self, _tolerance: f64) -> PathProducer<'_> {
        let mut producer = self.producer.clone();
        producer.restart();
        producer
    }

    fn area(&self) -> f64 {
        self.lines().map(|l| l.signed_area()).sum()
    }

    fn perimeter(&self, accuracy: f64) -> f64 {
        self.lines().map(|l| l.arclen(accuracy)).sum()
    }

    fn winding(&self, pt: kurbo::Point) -> i32 {
        self.lines().map(|l| segment_winding(l.p0, l.p1, pt)).sum()
    }

    fn bounding_box(&self) -> Rect {
        let mut points = self.path_elements(0.0).filter_map(|el| el.end_point());
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        points.fold(Rect::from_points(first, first), |r, p| r.union_pt(p))
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point as KPoint;

    use super::*;
    use crate::points::DuplicatePolicy;

    fn square() -> PolylineChain {
        PolylineChain::from_points([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
    }

    #[test]
    fn closed_and_open() {
        let sq = square();
        let els: Vec<_> = PathProducer::new([(&sq, true), (&sq, false)]).collect();
        assert_eq!(
            els,
            vec![
                PathEl::MoveTo(KPoint::new(0.0, 0.0)),
                PathEl::LineTo(KPoint::new(10.0, 0.0)),
                PathEl::LineTo(KPoint::new(10.0, 10.0)),
                PathEl::LineTo(KPoint::new(0.0, 10.0)),
                PathEl::ClosePath,
                PathEl::MoveTo(KPoint::new(0.0, 0.0)),
                PathEl::LineTo(KPoint::new(10.0, 0.0)),
                PathEl::LineTo(KPoint::new(10.0, 10.0)),
                PathEl::LineTo(KPoint::new(0.0, 10.0)),
            ]
        );
    }

    #[test]
    fn repeated_first_point_is_folded() {
        let ring = PolylineChain::from_points([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let els: Vec<_> = PathProducer::single(&ring, true).collect();
        assert_eq!(els.len(), 4);
        assert_eq!(els.last(), Some(&PathEl::ClosePath));

        // Open chains keep it.
        assert_eq!(PathProducer::single(&ring, false).count(), 4);
    }

    #[test]
    fn border_follows_main() {
        let mut c = PolylineChain::from_points([(0.0, 0.0), (1.0, 0.0)]);
        c.append_border(&[1.0, 1.0, 1.0, 1.0, 0.0, 1.0], DuplicatePolicy::Keep)
            .unwrap();
        c.prepend_border(&[-1.0, 0.0], DuplicatePolicy::Keep).unwrap();
        let pts: Vec<_> = PathProducer::single(&c, false)
            .filter_map(|el| el.end_point())
            .collect();
        assert_eq!(
            pts,
            vec![
                KPoint::new(-1.0, 0.0),
                KPoint::new(0.0, 0.0),
                KPoint::new(1.0, 0.0),
                KPoint::new(1.0, 1.0),
                KPoint::new(0.0, 1.0),
            ]
        );
    }

    #[test]
    fn restart_and_clone() {
        let sq = square();
        let mut p = PathProducer::single(&sq, true);
        let first: Vec<_> = p.by_ref().take(2).collect();
        let rest: Vec<_> = p.clone().collect();
        assert_eq!(first.len() + rest.len(), 5);
        p.restart();
        assert_eq!(p.count(), 5);
    }

    #[test]
    fn empty_chains_produce_nothing() {
        let empty = PolylineChain::new();
        let sq = square();
        let els: Vec<_> = PathProducer::new([(&empty, true), (&sq, true), (&empty, false)]).collect();
        assert_eq!(els.len(), 5);
    }

    #[test]
    fn transformed() {
        let sq = square();
        let path = PathProducer::single(&sq, true)
            .with_transform(Affine::scale(2.0))
            .to_bez_path();
        assert_eq!(path.bounding_box(), Rect::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn outline_shape() {
        let sq = square();
        let outline = PathProducer::single(&sq, true).outline();
        assert_eq!(outline.area(), 100.0);
        assert_eq!(outline.perimeter(1e-9), 40.0);
        assert_eq!(outline.winding(KPoint::new(5.0, 5.0)), 1);
        assert_eq!(outline.winding(KPoint::new(15.0, 5.0)), 0);
        assert_eq!(outline.bounding_box(), Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(outline.to_path(0.1), outline.producer.to_bez_path());

        let reversed = sq.reverse();
        let outline = Outline::new(PathProducer::single(&reversed, true));
        assert_eq!(outline.area(), -100.0);
        assert_eq!(outline.winding(KPoint::new(5.0, 5.0)), -1);
    }
}
