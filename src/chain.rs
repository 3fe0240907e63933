//! Polyline chains: linked runs of real and synthetic points.
//!
//! A [`PolylineChain`] is a doubly linked list of links, each of which holds
//! up to two [`PointSequence`]s: the "main" points, which come from the
//! original geographic data, and the "border" points, which were made up to
//! close a shape along a clip boundary. Within a link the border points come
//! after the main points.
//!
//! The links live in an arena owned by the chain and refer to each other by
//! index, so splicing is cheap and there's no aliasing to worry about. The
//! point data itself is shared: taking a sub-range of a chain produces links
//! that are views into the original sequences.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use kurbo::Rect;

use crate::{
    geom::{segment_winding, union_bounds, Point},
    points::{DuplicatePolicy, PointSequence, Statistics},
    Error,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn fresh_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// The identity of a chain.
///
/// Clones of a chain share its identity (they are the same geometry, just
/// as a shared reference would be). Chains derived from it, by taking a
/// sub-range or reversing, get new identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct LinkId(u64);

/// An index into a chain's link arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct LinkIdx(usize);

#[derive(Clone)]
struct LinkVec<T> {
    inner: Vec<T>,
}

impl_typed_vec!(LinkVec, LinkIdx, "l");

/// Where a point of a chain came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum PointKind {
    /// An original, geographically meaningful point.
    Main,
    /// A point made up to close a shape along a clip boundary.
    Border,
}

#[derive(Clone, Debug)]
struct Link {
    id: LinkId,
    main: Option<PointSequence>,
    border: Option<PointSequence>,
    prev: Option<LinkIdx>,
    next: Option<LinkIdx>,
}

fn non_empty(seq: Option<PointSequence>) -> Option<PointSequence> {
    seq.filter(|s| !s.is_empty())
}

fn len_of(seq: &Option<PointSequence>) -> usize {
    seq.as_ref().map_or(0, PointSequence::len)
}

fn concat_opt(
    a: Option<PointSequence>,
    b: Option<PointSequence>,
    policy: DuplicatePolicy,
) -> Option<PointSequence> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.concatenated(&b, policy)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl Link {
    fn new(main: Option<PointSequence>, border: Option<PointSequence>) -> Self {
        Link {
            id: LinkId(fresh_id()),
            main: non_empty(main),
            border: non_empty(border),
            prev: None,
            next: None,
        }
    }

    fn main_len(&self) -> usize {
        len_of(&self.main)
    }

    fn border_len(&self) -> usize {
        len_of(&self.border)
    }

    fn is_empty(&self) -> bool {
        self.main_len() == 0 && self.border_len() == 0
    }
}

/// A read-only view of one link of a chain.
#[derive(Clone, Copy, Debug)]
pub struct LinkView<'a> {
    /// The original points of this link.
    pub main: Option<&'a PointSequence>,
    /// The synthetic points following the main points.
    pub border: Option<&'a PointSequence>,
}

/// A polyline made of linked runs of points.
///
/// Whether the polyline is closed isn't stored here: that belongs to whoever
/// owns the chain, and gets passed in where it matters.
#[derive(Clone, Debug)]
pub struct PolylineChain {
    id: ChainId,
    links: LinkVec<Link>,
    head: Option<LinkIdx>,
    tail: Option<LinkIdx>,
    frozen: bool,
}

impl Default for PolylineChain {
    fn default() -> Self {
        Self::new()
    }
}

impl PolylineChain {
    /// An empty chain.
    pub fn new() -> Self {
        PolylineChain {
            id: ChainId(fresh_id()),
            links: LinkVec::default(),
            head: None,
            tail: None,
            frozen: false,
        }
    }

    /// A chain with a single link holding `points` as main points.
    ///
    /// Consecutive duplicates are removed, and the point data is frozen.
    pub fn from_points<P: Into<Point>>(points: impl IntoIterator<Item = P>) -> Self {
        Self::from_sequence(PointSequence::from_points(points))
    }

    /// A chain with a single link holding `seq` as main points.
    ///
    /// `seq` gets frozen.
    pub fn from_sequence(mut seq: PointSequence) -> Self {
        seq.freeze();
        Self::from_links([Link::new(Some(seq), None)])
    }

    /// A chain with a single link that has only border points.
    pub fn from_border(mut seq: PointSequence) -> Self {
        seq.freeze();
        Self::from_links([Link::new(None, Some(seq))])
    }

    fn with_capacity(links: usize) -> Self {
        PolylineChain {
            links: LinkVec::with_capacity(links),
            ..PolylineChain::new()
        }
    }

    fn from_links(links: impl IntoIterator<Item = Link>) -> Self {
        let mut ret = PolylineChain::new();
        for link in links {
            if !link.is_empty() {
                ret.push_back(link);
            }
        }
        ret
    }

    fn push_back(&mut self, mut link: Link) -> LinkIdx {
        link.prev = self.tail;
        link.next = None;
        let idx = self.links.push(link);
        match self.tail {
            Some(tail) => self.links[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        idx
    }

    fn push_front(&mut self, mut link: Link) -> LinkIdx {
        link.prev = None;
        link.next = self.head;
        let idx = self.links.push(link);
        match self.head {
            Some(head) => self.links[head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        idx
    }

    fn link_indices(&self) -> impl Iterator<Item = LinkIdx> + '_ {
        std::iter::successors(self.head, move |&idx| self.links[idx].next)
    }

    fn ordered_links(&self) -> impl DoubleEndedIterator<Item = &Link> + '_ {
        // Collecting lets us walk backwards, which the reversal needs.
        self.link_indices()
            .map(move |idx| &self.links[idx])
            .collect::<Vec<_>>()
            .into_iter()
    }

    // Moves the links out in chain order, leaving us empty.
    fn take_links(&mut self) -> Vec<Link> {
        let order: Vec<LinkIdx> = self.link_indices().collect();
        let mut slots: Vec<Option<Link>> = std::mem::take(&mut self.links)
            .into_entries()
            .map(|(_, link)| Some(link))
            .collect();
        self.head = None;
        self.tail = None;
        order
            .into_iter()
            .filter_map(|idx| slots[idx.0].take())
            .collect()
    }

    /// This chain's identity.
    pub fn id(&self) -> ChainId {
        self.id
    }

    /// Has [`PolylineChain::freeze`] been called?
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The number of links.
    pub fn link_count(&self) -> usize {
        self.link_indices().count()
    }

    /// Iterates over the links, in order.
    pub fn links(&self) -> impl Iterator<Item = LinkView<'_>> + '_ {
        self.link_indices().map(move |idx| {
            let link = &self.links[idx];
            LinkView {
                main: link.main.as_ref(),
                border: link.border.as_ref(),
            }
        })
    }

    /// The total number of points, main and border.
    pub fn point_count(&self) -> usize {
        self.main_point_count() + self.border_point_count()
    }

    pub fn main_point_count(&self) -> usize {
        self.link_indices().map(|idx| self.links[idx].main_len()).sum()
    }

    pub fn border_point_count(&self) -> usize {
        self.link_indices()
            .map(|idx| self.links[idx].border_len())
            .sum()
    }

    /// Do we have no points at all?
    pub fn is_empty(&self) -> bool {
        self.link_indices().all(|idx| self.links[idx].is_empty())
    }

    /// The bounding box of all our points, main and border.
    pub fn bounds(&self) -> Option<Rect> {
        self.link_indices().fold(None, |acc, idx| {
            let link = &self.links[idx];
            let main = link.main.as_ref().and_then(PointSequence::bounding_box);
            let border = link.border.as_ref().and_then(PointSequence::bounding_box);
            union_bounds(union_bounds(acc, main), border)
        })
    }

    pub fn first_point(&self) -> Option<Point> {
        self.iter().next().map(|(p, _)| p)
    }

    pub fn last_point(&self) -> Option<Point> {
        self.ordered_links().rev().find_map(|link| {
            link.border
                .as_ref()
                .and_then(PointSequence::last)
                .or_else(|| link.main.as_ref().and_then(PointSequence::last))
        })
    }

    /// Iterates over all our points, in order, tagged with where they came from.
    pub fn iter(&self) -> impl Iterator<Item = (Point, PointKind)> + '_ {
        self.link_indices().flat_map(move |idx| {
            let link = &self.links[idx];
            let main = link
                .main
                .iter()
                .flat_map(|s| s.iter())
                .map(|p| (p, PointKind::Main));
            let border = link
                .border
                .iter()
                .flat_map(|s| s.iter())
                .map(|p| (p, PointKind::Border));
            main.chain(border)
        })
    }

    /// Iterates over all our points, in order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.iter().map(|(p, _)| p)
    }

    /// Appends `other` to the end of this chain.
    ///
    /// Fails with [`Error::InvalidArgument`] if some link of `other` is
    /// already part of this chain, which would create a cycle. That happens
    /// if `other` is a clone of `self`, for example.
    pub fn concat(mut self, mut other: PolylineChain) -> Result<Self, Error> {
        let ours: HashSet<LinkId> = self.link_indices().map(|idx| self.links[idx].id).collect();
        if other
            .link_indices()
            .any(|idx| ours.contains(&other.links[idx].id))
        {
            return Err(Error::InvalidArgument(
                "the appended chain is already reachable from this chain",
            ));
        }

        let mut links = self.take_links();
        links.extend(other.take_links());
        let mut ret = PolylineChain::with_capacity(links.len());
        for link in links {
            ret.push_back(link);
        }
        #[cfg(feature = "slow-asserts")]
        ret.check_invariants();
        Ok(ret)
    }

    /// Returns the points with global indices in `[lower, upper)`.
    ///
    /// Points are indexed in iteration order: each link's main points, then
    /// its border points. The returned links are views into our point data.
    /// Returns `None` if the range is empty.
    pub fn subrange(&self, lower: usize, upper: usize) -> Result<Option<PolylineChain>, Error> {
        let len = self.point_count();
        if lower > upper || upper > len {
            return Err(Error::IndexOutOfRange { lower, upper, len });
        }
        if lower == upper {
            return Ok(None);
        }

        fn part(
            seq: Option<&PointSequence>,
            offset: &mut usize,
            lower: usize,
            upper: usize,
        ) -> Result<Option<PointSequence>, Error> {
            let Some(seq) = seq else {
                return Ok(None);
            };
            let start = *offset;
            *offset += seq.len();
            let lo = lower.max(start);
            let hi = upper.min(*offset);
            if lo >= hi {
                return Ok(None);
            }
            seq.subrange(lo - start, hi - start).map(Some)
        }

        let mut links = Vec::new();
        let mut offset = 0;
        for idx in self.link_indices() {
            if offset >= upper {
                break;
            }
            let link = &self.links[idx];
            let main = part(link.main.as_ref(), &mut offset, lower, upper)?;
            let border = part(link.border.as_ref(), &mut offset, lower, upper)?;
            if main.is_some() || border.is_some() {
                links.push(Link::new(main, border));
            }
        }
        let ret = Self::from_links(links);
        #[cfg(feature = "slow-asserts")]
        ret.check_invariants();
        Ok(Some(ret))
    }

    fn check_border_args(&self, coords: &[f32]) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        if coords.len() % 2 != 0 {
            return Err(Error::InvalidArgument(
                "coordinate data must be a sequence of x, y pairs",
            ));
        }
        Ok(())
    }

    /// Appends border points (interleaved `x, y` coordinates) after the last
    /// point of this chain.
    pub fn append_border(&mut self, coords: &[f32], policy: DuplicatePolicy) -> Result<(), Error> {
        self.check_border_args(coords)?;
        if coords.is_empty() {
            return Ok(());
        }
        let tail = match self.tail {
            Some(tail) => tail,
            None => self.push_back(Link::new(None, None)),
        };
        let link = &mut self.links[tail];
        let mut border = match link.border.take() {
            Some(b) if b.is_frozen() => b.thawed(),
            Some(b) => b,
            None => PointSequence::new(),
        };
        let result = border.append_with(coords, policy);
        link.border = non_empty(Some(border));
        result
    }

    /// Inserts border points (interleaved `x, y` coordinates) before the first
    /// point of this chain.
    ///
    /// Since border points follow main points within a link, this puts them
    /// in a border-only link at the front of the chain.
    pub fn prepend_border(&mut self, coords: &[f32], policy: DuplicatePolicy) -> Result<(), Error> {
        self.check_border_args(coords)?;
        if coords.is_empty() {
            return Ok(());
        }
        let head = match self.head {
            Some(head) if self.links[head].main.is_none() => head,
            _ => self.push_front(Link::new(None, None)),
        };
        let link = &mut self.links[head];
        let mut border = match link.border.take() {
            Some(b) if b.is_frozen() => b.thawed(),
            Some(b) => b,
            None => PointSequence::new(),
        };
        let result = border.prepend_with(coords, policy);
        link.border = non_empty(Some(border));
        result
    }

    /// Compacts this chain and makes it read-only.
    ///
    /// - If `close` is true and the chain starts with a border-only link,
    ///   that link's points move to the end of the last link's border: for
    ///   a closed shape, the closing border belongs at the end.
    /// - Links with no border between them are merged.
    /// - Empty links are dropped.
    /// - Point sequences are compacted and frozen.
    ///
    /// Calling this again does nothing.
    pub fn freeze(&mut self, close: bool) {
        if self.frozen {
            return;
        }
        let mut links = self.take_links();

        if close && links.len() > 1 && links[0].main_len() == 0 && links[0].border_len() > 0 {
            let head = links.remove(0);
            if let Some(last) = links.last_mut() {
                // Border runs keep their points exactly as stored.
                last.border = concat_opt(last.border.take(), head.border, DuplicatePolicy::Keep);
            }
        }

        let mut merged: Vec<Link> = Vec::with_capacity(links.len());
        for link in links {
            if link.is_empty() {
                continue;
            }
            if let Some(prev) = merged.last_mut() {
                if prev.border_len() == 0 {
                    prev.main = concat_opt(prev.main.take(), link.main, DuplicatePolicy::Remove);
                    prev.border = link.border;
                    continue;
                }
            }
            merged.push(link);
        }

        for link in &mut merged {
            for seq in [&mut link.main, &mut link.border].into_iter().flatten() {
                seq.compact();
                seq.freeze();
            }
        }

        self.links = LinkVec::with_capacity(merged.len());
        for link in merged {
            self.push_back(link);
        }
        self.frozen = true;
        #[cfg(feature = "slow-asserts")]
        self.check_invariants();
    }

    /// A new chain with the points in reverse order.
    ///
    /// Border points keep their role, but since they must follow main points
    /// within a link, the links get regrouped: a border that used to close
    /// the end of the chain ends up in a border-only link at the start.
    pub fn reverse(&self) -> PolylineChain {
        let mut out = Vec::new();
        let mut current: Option<PointSequence> = None;
        for link in self.ordered_links().rev() {
            if let Some(border) = &link.border {
                out.push(Link::new(current.take(), Some(border.reverse())));
            }
            if let Some(main) = &link.main {
                if let Some(prev) = current.take() {
                    out.push(Link::new(Some(prev), None));
                }
                current = Some(main.reverse());
            }
        }
        if let Some(main) = current {
            out.push(Link::new(Some(main), None));
        }
        let ret = Self::from_links(out);
        #[cfg(feature = "slow-asserts")]
        ret.check_invariants();
        ret
    }

    /// Statistics on the distances between consecutive main points.
    ///
    /// Pairs involving a border point don't count: they say nothing about the
    /// resolution of the original data.
    pub fn resolution(&self) -> Statistics {
        let mut stats = Statistics::new();
        let mut prev: Option<Point> = None;
        for (p, kind) in self.iter() {
            match kind {
                PointKind::Main => {
                    if let Some(q) = prev {
                        stats.add(q.distance(&p));
                    }
                    prev = Some(p);
                }
                PointKind::Border => prev = None,
            }
        }
        stats
    }

    /// A rough estimate of our memory use, in bytes.
    pub fn memory_footprint_estimate(&self) -> usize {
        let links: usize = self
            .link_indices()
            .map(|idx| {
                let link = &self.links[idx];
                std::mem::size_of::<Link>()
                    + link
                        .main
                        .iter()
                        .chain(&link.border)
                        .map(PointSequence::memory_footprint_estimate)
                        .sum::<usize>()
            })
            .sum();
        std::mem::size_of::<Self>() + links
    }

    // The closing segment from the last point to the first is included.
    fn ring_segments(&self) -> impl Iterator<Item = (kurbo::Point, kurbo::Point)> + '_ {
        let first = self.first_point();
        let points = self.points().map(Point::to_kurbo);
        let next = self.points().map(Point::to_kurbo).skip(1).chain(first.map(Point::to_kurbo));
        points.zip(next)
    }

    /// The non-zero winding number of `p` with respect to this chain, treated
    /// as a closed ring.
    ///
    /// Counter-clockwise rings (in a y-up coordinate system) wind positively.
    pub fn winding(&self, p: kurbo::Point) -> i32 {
        self.ring_segments()
            .map(|(a, b)| segment_winding(a, b, p))
            .sum()
    }

    /// The signed area of this chain, treated as a closed ring.
    ///
    /// Positive for counter-clockwise rings in a y-up coordinate system.
    pub fn signed_area(&self) -> f64 {
        self.ring_segments()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
            / 2.0
    }

    /// Checks the internal consistency of the link structure, panicking on
    /// failure.
    #[cfg(any(test, feature = "slow-asserts"))]
    pub fn check_invariants(&self) {
        let mut prev = None;
        let mut count = 0;
        for idx in self.link_indices() {
            let link = &self.links[idx];
            assert_eq!(link.prev, prev, "broken back link at {idx:?}");
            if let Some(main) = &link.main {
                for (p, q) in main.iter().zip(main.iter().skip(1)) {
                    assert_ne!(p, q, "duplicate main point in {idx:?}");
                }
            }
            if self.frozen {
                assert!(!link.is_empty(), "empty link {idx:?} in a frozen chain");
            }
            prev = Some(idx);
            count += 1;
            assert!(count <= self.links.len(), "cycle in chain");
        }
        assert_eq!(self.tail, prev);
    }
}
