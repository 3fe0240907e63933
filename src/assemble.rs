//! Joining polyline fragments into closed rings.
//!
//! Large polygons (coastlines, say) are often stored as many open fragments
//! that need to be joined end to end before they can be filled. This does
//! the joining greedily: starting from some fragment, repeatedly attach
//! whichever other fragment has an endpoint closest to our current end,
//! until our own start is the closest thing around.
//!
//! The resulting rings are then arranged into a containment tree, so that
//! islands and the lakes inside them can be told apart.

use crate::{
    chain::PolylineChain,
    geom::{on_segment, Point},
    Error,
};

/// Configuration for a [`PolygonAssembler`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Endpoints farther apart than this are never joined. `None` means
    /// there's no limit.
    pub max_gap: Option<f64>,
    /// If true, rings are reversed where necessary so that outer rings run
    /// counter-clockwise and inner rings run clockwise (in y-up coordinates).
    pub orient: bool,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        AssemblerConfig {
            max_gap: None,
            orient: true,
        }
    }
}

/// An index for a [`Ring`] within [`Rings`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, serde::Serialize)]
pub struct RingIdx(pub usize);

/// A closed ring assembled from fragments.
#[derive(Clone, Debug)]
pub struct Ring {
    /// The points of the ring. The segment from the last point back to the
    /// first is implicit.
    pub chain: PolylineChain,
    /// The signed area, positive for counter-clockwise rings.
    pub signed_area: f64,
    /// The smallest ring containing this one, if any.
    pub parent: Option<RingIdx>,
    /// Is this an outer ring (an island) or an inner one (a lake)? Rings
    /// without a parent are outer, and then they alternate with depth.
    pub outer: bool,
}

/// The output of [`PolygonAssembler::assemble`].
#[derive(Clone, Debug, Default)]
pub struct Rings {
    rings: Vec<Ring>,
    open: Vec<PolylineChain>,
}

impl Rings {
    /// Iterates over the closed rings.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> + '_ {
        self.rings.iter()
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Chains that couldn't be closed because no endpoint was near enough.
    pub fn open_chains(&self) -> &[PolylineChain] {
        &self.open
    }

    /// Returns all of the ring indices, grouped by containment.
    ///
    /// For each of the inner vecs, the first element is an outer ring with no
    /// parent. All of the other rings in that inner vec lie inside it.
    pub fn grouped(&self) -> Vec<Vec<RingIdx>> {
        let mut children = vec![Vec::new(); self.rings.len()];
        let mut top_level = Vec::new();
        for (i, ring) in self.rings.iter().enumerate() {
            match ring.parent {
                Some(parent) => children[parent.0].push(RingIdx(i)),
                None => top_level.push(RingIdx(i)),
            }
        }

        fn visit(idx: RingIdx, children: &[Vec<RingIdx>], acc: &mut Vec<RingIdx>) {
            acc.push(idx);
            for &child in &children[idx.0] {
                visit(child, children, acc);
            }
        }

        top_level
            .into_iter()
            .map(|top| {
                let mut tree = Vec::new();
                visit(top, &children, &mut tree);
                tree
            })
            .collect()
    }
}

impl std::ops::Index<RingIdx> for Rings {
    type Output = Ring;

    fn index(&self, index: RingIdx) -> &Ring {
        &self.rings[index.0]
    }
}

/// Joins fragments into rings by nearest-endpoint matching.
///
/// This is quadratic in the number of fragments.
#[derive(Clone, Debug, Default)]
pub struct PolygonAssembler {
    config: AssemblerConfig,
}

// Which end of which fragment is nearest.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Candidate {
    OwnStart,
    Forward(usize),
    Reversed(usize),
}

impl PolygonAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        PolygonAssembler { config }
    }

    /// Joins `fragments` into rings.
    ///
    /// Fails with [`Error::InvalidArgument`] if two fragments that need
    /// joining share links (for example, if one of them was built by
    /// concatenating a clone of the other).
    pub fn assemble(&self, fragments: Vec<PolylineChain>) -> Result<Rings, Error> {
        let mut pending: Vec<PolylineChain> =
            fragments.into_iter().filter(|c| !c.is_empty()).collect();
        let mut closed = Vec::new();
        let mut open = Vec::new();

        while let Some(mut current) = pending.pop() {
            loop {
                let (Some(start), Some(end)) = (current.first_point(), current.last_point()) else {
                    break;
                };
                let (candidate, dist) = self.nearest(&pending, start, end, current.point_count());
                if self.config.max_gap.is_some_and(|gap| dist > gap) {
                    log::debug!("leaving a chain of {} points open", current.point_count());
                    open.push(current);
                    break;
                }
                match candidate {
                    Candidate::OwnStart => {
                        if current.point_count() < 3 {
                            open.push(current);
                        } else {
                            current.freeze(true);
                            closed.push(current);
                        }
                        break;
                    }
                    Candidate::Forward(i) => {
                        let next = pending.swap_remove(i);
                        current = current.concat(next)?;
                    }
                    Candidate::Reversed(i) => {
                        let next = pending.swap_remove(i).reverse();
                        current = current.concat(next)?;
                    }
                }
            }
        }

        log::debug!("assembled {} rings, {} left open", closed.len(), open.len());
        Ok(Rings {
            rings: self.classify(closed),
            open,
        })
    }

    fn nearest(
        &self,
        pending: &[PolylineChain],
        start: Point,
        end: Point,
        len: usize,
    ) -> (Candidate, f64) {
        // A chain with fewer than 3 points can't close on itself, unless
        // there's nothing else left.
        let own = if len >= 3 || pending.is_empty() {
            end.distance(&start)
        } else {
            f64::INFINITY
        };
        let mut best = (Candidate::OwnStart, own);
        for (i, other) in pending.iter().enumerate() {
            let ends = [
                (Candidate::Forward(i), other.first_point()),
                (Candidate::Reversed(i), other.last_point()),
            ];
            for (candidate, p) in ends {
                if let Some(p) = p {
                    let d = end.distance(&p);
                    if d < best.1 {
                        best = (candidate, d);
                    }
                }
            }
        }
        best
    }

    // Finds parents and orientation for each ring.
    fn classify(&self, chains: Vec<PolylineChain>) -> Vec<Ring> {
        let areas: Vec<f64> = chains.iter().map(PolylineChain::signed_area).collect();
        let parents: Vec<Option<RingIdx>> = (0..chains.len())
            .map(|i| {
                (0..chains.len())
                    .filter(|&j| j != i && areas[j].abs() > areas[i].abs())
                    .filter(|&j| contains(&chains[j], &chains[i]))
                    .min_by(|&a, &b| areas[a].abs().total_cmp(&areas[b].abs()))
                    .map(RingIdx)
            })
            .collect();

        let depth = |mut i: usize| {
            let mut d = 0;
            while let Some(RingIdx(p)) = parents[i] {
                d += 1;
                i = p;
            }
            d
        };
        let outer: Vec<bool> = (0..chains.len()).map(|i| depth(i) % 2 == 0).collect();

        chains
            .into_iter()
            .enumerate()
            .map(|(i, mut chain)| {
                let mut signed_area = areas[i];
                if self.config.orient && outer[i] != (signed_area > 0.0) {
                    chain = chain.reverse();
                    chain.freeze(true);
                    signed_area = -signed_area;
                }
                Ring {
                    chain,
                    signed_area,
                    parent: parents[i],
                    outer: outer[i],
                }
            })
            .collect()
    }
}

// Is `inner` inside `outer`? Rings touching along the window border share
// points, so we let the vertices of `inner` vote, ignoring the ones on the
// boundary of `outer`.
fn contains(outer: &PolylineChain, inner: &PolylineChain) -> bool {
    let edges: Vec<(kurbo::Point, kurbo::Point)> = {
        let pts: Vec<kurbo::Point> = outer.points().map(Point::to_kurbo).collect();
        pts.iter()
            .zip(pts.iter().cycle().skip(1))
            .map(|(a, b)| (*a, *b))
            .collect()
    };
    let mut votes = 0i32;
    for p in inner.points().map(Point::to_kurbo) {
        if edges.iter().any(|&(a, b)| on_segment(a, b, p)) {
            continue;
        }
        votes += if outer.winding(p) != 0 { 1 } else { -1 };
    }
    votes > 0
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn chain(points: &[(f32, f32)]) -> PolylineChain {
        PolylineChain::from_points(points.iter().copied())
    }

    // Already closed, so it doesn't get joined to anything else.
    fn square(x0: f32, y0: f32, size: f32) -> PolylineChain {
        let (x1, y1) = (x0 + size, y0 + size);
        chain(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
    }

    #[test]
    fn joins_fragments() {
        let a = chain(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let b = chain(&[(10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]);
        let rings = PolygonAssembler::default().assemble(vec![a, b]).unwrap();
        assert_eq!(rings.len(), 1);
        assert!(rings.open_chains().is_empty());
        let ring = &rings[RingIdx(0)];
        assert!(ring.outer);
        assert_eq!(ring.parent, None);
        assert!((ring.signed_area - 100.0).abs() < 1e-9);
        assert!(ring.chain.is_frozen());
    }

    #[test]
    fn reverses_fragments_when_needed() {
        let a = chain(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        // Runs the "wrong" way: its last point meets the end of `a`.
        let b = chain(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)]);
        let rings = PolygonAssembler::default().assemble(vec![a, b]).unwrap();
        assert_eq!(rings.len(), 1);
        assert!((rings[RingIdx(0)].signed_area.abs() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn islands_and_lakes() {
        let island = square(0.0, 0.0, 100.0);
        let lake = square(10.0, 10.0, 50.0);
        let islet = square(20.0, 20.0, 10.0);
        let other = square(200.0, 0.0, 5.0);
        let rings = PolygonAssembler::default()
            .assemble(vec![island, lake, islet, other])
            .unwrap();
        assert_eq!(rings.len(), 4);

        let by_area = |area: f64| {
            rings
                .rings()
                .position(|r| (r.signed_area.abs() - area).abs() < 1e-9)
                .map(RingIdx)
                .unwrap()
        };
        let (island, lake, islet, other) =
            (by_area(10000.0), by_area(2500.0), by_area(100.0), by_area(25.0));
        assert_eq!(rings[island].parent, None);
        assert_eq!(rings[lake].parent, Some(island));
        assert_eq!(rings[islet].parent, Some(lake));
        assert_eq!(rings[other].parent, None);
        assert!(!rings[lake].outer);
        assert!(rings[lake].signed_area < 0.0);
        assert!(rings[islet].outer);
        assert!(rings[islet].signed_area > 0.0);

        let groups = rings.grouped();
        assert_eq!(groups.len(), 2);
        let big = groups.iter().find(|g| g[0] == island).unwrap();
        assert_eq!(big.len(), 3);
    }

    #[test]
    fn shared_border_does_not_confuse_containment() {
        // Two squares side by side, sharing an edge.
        let left = square(0.0, 0.0, 10.0);
        let right = square(10.0, 0.0, 10.0);
        let rings = PolygonAssembler::new(AssemblerConfig {
            max_gap: Some(1.0),
            orient: false,
        })
        .assemble(vec![left, right])
        .unwrap();
        assert_eq!(rings.len(), 2);
        assert!(rings.rings().all(|r| r.parent.is_none() && r.outer));
    }

    #[test]
    fn gaps_leave_chains_open() {
        let a = chain(&[(0.0, 0.0), (10.0, 0.0)]);
        let b = chain(&[(50.0, 50.0), (60.0, 50.0)]);
        let config = AssemblerConfig {
            max_gap: Some(1.0),
            ..AssemblerConfig::default()
        };
        let rings = PolygonAssembler::new(config).assemble(vec![a, b]).unwrap();
        assert!(rings.is_empty());
        assert_eq!(rings.open_chains().len(), 2);
    }

    #[test]
    fn shared_links() {
        let a = chain(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let b = chain(&[(10.0, 10.0), (10.0, 20.0)]);
        let b_then_a = b.concat(a.clone()).unwrap();
        assert_matches!(
            PolygonAssembler::default().assemble(vec![b_then_a, a]),
            Err(Error::InvalidArgument(_))
        );
    }
}
