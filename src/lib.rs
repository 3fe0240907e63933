#![doc = include_str!("../README.md")]

#[macro_use]
mod typed_vec;

#[cfg(any(test, feature = "arbitrary"))]
pub mod arbitrary;
pub mod assemble;
pub mod chain;
pub mod clip;
pub mod geom;
pub mod path;
pub mod points;
pub mod transform;

#[cfg(feature = "generators")]
pub mod generators;

use std::borrow::Cow;

pub use assemble::{AssemblerConfig, PolygonAssembler, Ring, RingIdx, Rings};
pub use chain::{ChainId, PointKind, PolylineChain};
pub use clip::{ClipConfig, ClipEngine, ClipSession};
pub use geom::{Point, RectExt};
pub use path::{Outline, PathProducer};
pub use points::{DuplicatePolicy, PointSequence, Statistics};
pub use transform::{ClipWindow, Identity, TransformError, WindowTransform};

/// Something went wrong while building or clipping geometry.
///
/// All of these indicate a mistake on the caller's side: nothing here is
/// caused by the geometry itself being awkward.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested point range didn't fit in the available points.
    #[error("range {lower}..{upper} out of bounds for {len} points")]
    IndexOutOfRange {
        /// The start of the requested range.
        lower: usize,
        /// The end of the requested range (exclusive).
        upper: usize,
        /// The number of points available.
        len: usize,
    },
    /// An argument didn't make sense.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Tried to mutate something that was frozen.
    #[error("attempted to modify frozen geometry")]
    Frozen,
    /// The clip window couldn't be mapped into the geometry's coordinates.
    #[error(transparent)]
    TransformFailure(#[from] TransformError),
}

/// Clips a polyline (or polygon, if `closed` is true) to a rectangle.
///
/// This is a shortcut for clipping a single chain with a fresh
/// [`ClipEngine`]. If you're clipping many chains, reuse an engine instead.
pub fn clip_to_rect(
    chain: &PolylineChain,
    closed: bool,
    rect: kurbo::Rect,
) -> Result<Option<Cow<'_, PolylineChain>>, Error> {
    ClipEngine::default().clip_rect(chain, closed, rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_against_right_half() {
        let square =
            PolylineChain::from_points([(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let out = clip_to_rect(&square, true, kurbo::Rect::new(5.0, -5.0, 15.0, 15.0))
            .unwrap()
            .unwrap();
        assert!(matches!(out, Cow::Owned(_)));
        let points: Vec<_> = out.points().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            points,
            vec![(10.0, 0.0), (10.0, 10.0), (5.0, 10.0), (5.0, 0.0)]
        );
    }

    #[test]
    fn error_messages() {
        let e = Error::IndexOutOfRange {
            lower: 2,
            upper: 7,
            len: 5,
        };
        assert_eq!(e.to_string(), "range 2..7 out of bounds for 5 points");
        assert_eq!(Error::Frozen.to_string(), "attempted to modify frozen geometry");
    }
}
