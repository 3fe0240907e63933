//! Flat, shareable storage for runs of points.
//!
//! A [`PointSequence`] is a view `[lower, upper)` into a reference-counted
//! buffer of interleaved `x, y` coordinates. Sub-ranges of a frozen sequence
//! share the parent's buffer, which is what keeps clipping a large coastline
//! cheap: the clipped pieces are mostly views into the original data.

use std::sync::{Arc, OnceLock};

use kurbo::Rect;

use crate::{
    geom::{bounds_of, Point},
    Error,
};

/// What to do with consecutive duplicate points when splicing data into a
/// sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DuplicatePolicy {
    /// Drop a point if it is equal to the point before it.
    Remove,
    /// Store the data exactly as given.
    Keep,
}

/// An ordered run of points with copy-on-write shared storage.
///
/// Sequences start out mutable. Once [frozen](PointSequence::freeze) they
/// reject mutation, and sub-ranges taken from them share storage instead of
/// copying. A mutable sequence never shares storage with anyone it could
/// affect: taking a sub-range copies, and mutating a clone copies on write.
///
/// Sequences built through the public constructors never contain two equal
/// consecutive points. The clipper divides by coordinate differences, so
/// zero-length segments are bad news.
#[derive(Clone)]
pub struct PointSequence {
    data: Arc<Vec<f32>>,
    // In points, not coordinates.
    lower: usize,
    upper: usize,
    frozen: bool,
    bounds: OnceLock<Option<Rect>>,
}

impl std::fmt::Debug for PointSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.frozen {
            write!(f, "frozen ")?;
        }
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Two sequences are equal if they contain the same points, regardless of
/// how they are stored.
impl PartialEq for PointSequence {
    fn eq(&self, other: &Self) -> bool {
        self.as_flat() == other.as_flat()
    }
}

impl Default for PointSequence {
    fn default() -> Self {
        Self::from_trusted(Vec::new(), false)
    }
}

fn remove_duplicates(coords: &mut Vec<f32>) {
    let mut write = 0;
    for read in (0..coords.len()).step_by(2) {
        let (x, y) = (coords[read], coords[read + 1]);
        if write >= 2 && coords[write - 2] == x && coords[write - 1] == y {
            continue;
        }
        coords[write] = x;
        coords[write + 1] = y;
        write += 2;
    }
    coords.truncate(write);
}

fn check_pairs(coords: &[f32]) -> Result<(), Error> {
    if coords.len() % 2 != 0 {
        return Err(Error::InvalidArgument(
            "coordinate data must be a sequence of x, y pairs",
        ));
    }
    Ok(())
}

impl PointSequence {
    /// An empty, mutable sequence.
    pub fn new() -> Self {
        Self::default()
    }

    fn from_trusted(coords: Vec<f32>, frozen: bool) -> Self {
        debug_assert!(coords.len() % 2 == 0);
        let upper = coords.len() / 2;
        PointSequence {
            data: Arc::new(coords),
            lower: 0,
            upper,
            frozen,
            bounds: OnceLock::new(),
        }
    }

    /// Builds a mutable sequence from points, dropping consecutive duplicates.
    pub fn from_points<P: Into<Point>>(points: impl IntoIterator<Item = P>) -> Self {
        let mut coords = Vec::new();
        for p in points {
            let p = p.into();
            coords.push(p.x);
            coords.push(p.y);
        }
        remove_duplicates(&mut coords);
        Self::from_trusted(coords, false)
    }

    /// Builds a mutable sequence from interleaved `x, y` coordinates, dropping
    /// consecutive duplicates.
    pub fn from_flat(mut coords: Vec<f32>) -> Result<Self, Error> {
        check_pairs(&coords)?;
        remove_duplicates(&mut coords);
        Ok(Self::from_trusted(coords, false))
    }

    /// Builds a mutable sequence from interleaved coordinates, applying
    /// `policy` to consecutive duplicates.
    pub fn from_flat_with(mut coords: Vec<f32>, policy: DuplicatePolicy) -> Result<Self, Error> {
        check_pairs(&coords)?;
        if policy == DuplicatePolicy::Remove {
            remove_duplicates(&mut coords);
        }
        Ok(Self::from_trusted(coords, false))
    }

    /// The number of points.
    pub fn len(&self) -> usize {
        self.upper - self.lower
    }

    /// Are we empty?
    pub fn is_empty(&self) -> bool {
        self.lower == self.upper
    }

    /// Our coordinates, as interleaved `x, y` pairs.
    pub fn as_flat(&self) -> &[f32] {
        &self.data[2 * self.lower..2 * self.upper]
    }

    /// Copies our coordinates out, as interleaved `x, y` pairs.
    pub fn to_flat_array(&self) -> Vec<f32> {
        self.as_flat().to_vec()
    }

    /// The point at index `idx`, if there is one.
    pub fn get(&self, idx: usize) -> Option<Point> {
        let coords = self.as_flat();
        let x = *coords.get(2 * idx)?;
        let y = *coords.get(2 * idx + 1)?;
        Some(Point { x, y })
    }

    pub fn first(&self) -> Option<Point> {
        self.get(0)
    }

    pub fn last(&self) -> Option<Point> {
        self.len().checked_sub(1).and_then(|idx| self.get(idx))
    }

    /// Iterates over our points, in order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Point> + '_ {
        self.as_flat()
            .chunks_exact(2)
            .map(|c| Point { x: c[0], y: c[1] })
    }

    /// Has this sequence been frozen?
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Marks this sequence as immutable.
    ///
    /// From now on, sub-ranges share our storage and mutation fails with
    /// [`Error::Frozen`].
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// A mutable copy of this sequence, with its own storage.
    pub fn thawed(&self) -> PointSequence {
        Self::from_trusted(self.to_flat_array(), false)
    }

    /// Returns the points with indices in `[lower, upper)`.
    ///
    /// If we're frozen, the result is a view sharing our storage (and it's
    /// frozen too). Otherwise it's a mutable copy.
    pub fn subrange(&self, lower: usize, upper: usize) -> Result<PointSequence, Error> {
        let len = self.len();
        if lower > upper || upper > len {
            return Err(Error::IndexOutOfRange { lower, upper, len });
        }
        if lower == 0 && upper == len {
            return Ok(self.clone());
        }
        if self.frozen {
            Ok(PointSequence {
                data: Arc::clone(&self.data),
                lower: self.lower + lower,
                upper: self.lower + upper,
                frozen: true,
                bounds: OnceLock::new(),
            })
        } else {
            Ok(Self::from_trusted(
                self.as_flat()[2 * lower..2 * upper].to_vec(),
                false,
            ))
        }
    }

    // Gets exclusive access to our coordinates, copying them if they're
    // shared with anyone or if we're only a view into a bigger buffer.
    fn make_mut(&mut self) -> &mut Vec<f32> {
        if self.lower != 0 || 2 * self.upper != self.data.len() {
            self.data = Arc::new(self.as_flat().to_vec());
            self.upper -= self.lower;
            self.lower = 0;
        }
        self.bounds = OnceLock::new();
        Arc::make_mut(&mut self.data)
    }

    /// Appends interleaved coordinates, dropping duplicate points.
    ///
    /// The first incoming point is dropped if it's equal to our current last
    /// point, so that no zero-length segment appears at the splice.
    pub fn append(&mut self, coords: &[f32]) -> Result<(), Error> {
        self.splice(coords, true, DuplicatePolicy::Remove)
    }

    /// Prepends interleaved coordinates, dropping duplicate points.
    pub fn prepend(&mut self, coords: &[f32]) -> Result<(), Error> {
        self.splice(coords, false, DuplicatePolicy::Remove)
    }

    /// Appends interleaved coordinates, applying `policy` to duplicates.
    pub fn append_with(&mut self, coords: &[f32], policy: DuplicatePolicy) -> Result<(), Error> {
        self.splice(coords, true, policy)
    }

    /// Prepends interleaved coordinates, applying `policy` to duplicates.
    pub fn prepend_with(&mut self, coords: &[f32], policy: DuplicatePolicy) -> Result<(), Error> {
        self.splice(coords, false, policy)
    }

    fn splice(&mut self, coords: &[f32], at_end: bool, policy: DuplicatePolicy) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }
        check_pairs(coords)?;
        if coords.is_empty() {
            return Ok(());
        }

        let mut incoming = coords.to_vec();
        let filter = policy == DuplicatePolicy::Remove;
        if filter {
            remove_duplicates(&mut incoming);
        }

        let data = self.make_mut();
        if at_end {
            let n = data.len();
            if filter && n >= 2 && incoming[..2] == data[n - 2..] {
                incoming.drain(..2);
            }
            data.extend_from_slice(&incoming);
        } else {
            let m = incoming.len();
            if filter && data.len() >= 2 && incoming[m - 2..] == data[..2] {
                incoming.truncate(m - 2);
            }
            let old = std::mem::replace(data, incoming);
            data.extend_from_slice(&old);
        }
        let len = data.len() / 2;
        self.upper = len;
        Ok(())
    }

    /// A new sequence with our points in reverse order.
    ///
    /// The result is frozen if we are.
    pub fn reverse(&self) -> PointSequence {
        let mut coords = Vec::with_capacity(2 * self.len());
        for p in self.iter().rev() {
            coords.push(p.x);
            coords.push(p.y);
        }
        Self::from_trusted(coords, self.frozen)
    }

    /// The bounding box of our points, or `None` if we're empty.
    ///
    /// This is computed on the first call and cached until the next mutation.
    pub fn bounding_box(&self) -> Option<Rect> {
        *self.bounds.get_or_init(|| bounds_of(self.iter()))
    }

    /// A rough estimate of the memory used by this sequence, in bytes.
    ///
    /// Storage shared with other sequences is counted in full by each of them,
    /// so summing this over many sequences overestimates.
    pub fn memory_footprint_estimate(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of::<Vec<f32>>()
            + std::mem::size_of::<f32>() * self.data.capacity()
    }

    /// Releases storage we don't use.
    ///
    /// A small view into a big shared buffer keeps the whole buffer alive.
    /// If we use less than half of our buffer, we copy our points into a
    /// buffer of our own.
    pub fn compact(&mut self) {
        let used = 2 * self.len();
        if used * 2 < self.data.len() {
            self.data = Arc::new(self.to_flat_array());
            self.lower = 0;
            self.upper = used / 2;
        } else if let Some(data) = Arc::get_mut(&mut self.data) {
            data.shrink_to_fit();
        }
    }

    /// If `other` is the continuation of this view in the same frozen buffer,
    /// returns a view covering both without copying.
    pub fn joined(&self, other: &PointSequence) -> Option<PointSequence> {
        if self.frozen
            && other.frozen
            && Arc::ptr_eq(&self.data, &other.data)
            && self.upper == other.lower
        {
            Some(PointSequence {
                data: Arc::clone(&self.data),
                lower: self.lower,
                upper: other.upper,
                frozen: true,
                bounds: OnceLock::new(),
            })
        } else {
            None
        }
    }

    /// Concatenates two sequences, sharing storage when possible.
    ///
    /// With [`DuplicatePolicy::Remove`], a point repeated at the splice is
    /// stored once.
    pub(crate) fn concatenated(&self, other: &PointSequence, policy: DuplicatePolicy) -> PointSequence {
        if let Some(joined) = self.joined(other) {
            return joined;
        }
        let mut coords = Vec::with_capacity(2 * (self.len() + other.len()));
        coords.extend_from_slice(self.as_flat());
        let mut tail = other.as_flat();
        if policy == DuplicatePolicy::Remove && self.last().is_some() && self.last() == other.first() {
            tail = &tail[2..];
        }
        coords.extend_from_slice(tail);
        Self::from_trusted(coords, self.frozen && other.frozen)
    }

    /// Do we share storage with `other`?
    pub fn shares_storage_with(&self, other: &PointSequence) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Accumulates the distances between consecutive points into `stats`.
    pub fn resolution(&self, stats: &mut Statistics) {
        for (p, q) in self.iter().zip(self.iter().skip(1)) {
            stats.add(p.distance(&q));
        }
    }
}

/// Running statistics over a stream of values.
///
/// Used for describing the resolution of a polyline: the distribution of
/// distances between consecutive points.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct Statistics {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value. NaNs are ignored.
    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Adds all the values seen by `other`.
    pub fn merge(&mut self, other: &Statistics) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// The number of values seen.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// The root mean square.
    pub fn rms(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.sum_sq / self.count as f64).sqrt())
    }
}
