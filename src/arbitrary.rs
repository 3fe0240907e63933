//! Utilities for fuzz and/or property testing using `arbitrary`.
//!
//! Clipping bugs tend to live where points land exactly on the window's
//! boundary, or where segments run along it. So instead of generating
//! uniformly random floats, these generators like to pick coordinates from
//! a small set of "interesting" values around the window.

use arbitrary::Unstructured;
use kurbo::Rect;

use crate::{chain::PolylineChain, points::DuplicatePolicy, Point};

/// Generate an arbitrary float in some range.
pub fn float_in_range(
    start: f64,
    end: f64,
    u: &mut Unstructured<'_>,
) -> Result<f64, arbitrary::Error> {
    let num: u32 = u.arbitrary()?;
    let t = num as f64 / u32::MAX as f64;
    Ok((1.0 - t) * start + t * end)
}

/// Generate a clip window with corners on a coarse grid.
pub fn window(u: &mut Unstructured<'_>) -> Result<Rect, arbitrary::Error> {
    let x0: i16 = u.int_in_range(-20..=20)?;
    let y0: i16 = u.int_in_range(-20..=20)?;
    let w: i16 = u.int_in_range(1..=20)?;
    let h: i16 = u.int_in_range(1..=20)?;
    Ok(Rect::new(
        x0.into(),
        y0.into(),
        (x0 + w).into(),
        (y0 + h).into(),
    ))
}

/// Generate a coordinate that has a good chance of lying on the boundary
/// of `[min, max]`, or exactly halfway between.
fn coordinate(min: f64, max: f64, u: &mut Unstructured<'_>) -> Result<f32, arbitrary::Error> {
    let span = max - min;
    let x = match u.int_in_range(0..=4)? {
        0 => min,
        1 => max,
        2 => (min + max) / 2.0,
        3 => f64::from(u.int_in_range(-60i16..=60)?),
        _ => float_in_range(min - span, max + span, u)?,
    };
    Ok(x as f32)
}

/// Generate a point near `window`.
pub fn point(window: &Rect, u: &mut Unstructured<'_>) -> Result<Point, arbitrary::Error> {
    Ok(Point::new(
        coordinate(window.x0, window.x1, u)?,
        coordinate(window.y0, window.y1, u)?,
    ))
}

/// Generate a polyline near `window`, with up to `max_len` points.
pub fn polyline(
    window: &Rect,
    max_len: usize,
    u: &mut Unstructured<'_>,
) -> Result<Vec<Point>, arbitrary::Error> {
    let len = u.int_in_range(0..=max_len)?;
    (0..len).map(|_| point(window, u)).collect()
}

/// Generate a chain near `window`.
///
/// Sometimes the chain has several links, some of them carrying border
/// points, the way the output of a previous clip would.
pub fn chain(
    window: &Rect,
    max_len: usize,
    u: &mut Unstructured<'_>,
) -> Result<PolylineChain, arbitrary::Error> {
    let links = u.int_in_range(1..=3)?;
    let mut ret = PolylineChain::new();
    for _ in 0..links {
        let mut link = PolylineChain::from_points(polyline(window, max_len, u)?);
        if u.arbitrary()? {
            let border: Vec<f32> = polyline(window, 3, u)?
                .into_iter()
                .flat_map(|p| [p.x, p.y])
                .collect();
            // This can't fail: the link isn't frozen and the coordinates come in pairs.
            link.append_border(&border, DuplicatePolicy::Keep)
                .map_err(|_| arbitrary::Error::IncorrectFormat)?;
        }
        ret = ret
            .concat(link)
            .map_err(|_| arbitrary::Error::IncorrectFormat)?;
    }
    Ok(ret)
}

/// Property checks driven by arbitrary input, shared between the unit tests
/// (through `arbtest`) and the fuzz targets.
///
/// Each check panics if it finds a problem.
pub mod arbtests {
    use std::borrow::Cow;

    use arbitrary::Unstructured;
    use kurbo::Rect;

    use super::{chain, window};
    use crate::{ClipEngine, PointKind, PolylineChain, RectExt};

    fn on_boundary(rect: &Rect, p: kurbo::Point) -> bool {
        rect.contains_inclusive(p)
            && (p.x == rect.x0 || p.x == rect.x1 || p.y == rect.y0 || p.y == rect.y1)
    }

    /// Clips an arbitrary chain to an arbitrary window and checks the output.
    pub fn clip(u: &mut Unstructured<'_>) -> arbitrary::Result<()> {
        let rect = window(u)?;
        let input = chain(&rect, 12, u)?;
        let closed: bool = u.arbitrary()?;
        let input_points: Vec<_> = input.points().collect();

        let mut engine = ClipEngine::default();
        let out = match engine.clip_rect(&input, closed, rect) {
            Ok(out) => out,
            Err(e) => panic!("clipping {input:?} to {rect:?} failed: {e}"),
        };
        let Some(out) = out else {
            return Ok(());
        };
        if let Cow::Borrowed(c) = &out {
            assert!(std::ptr::eq(*c, &input));
        }

        for (p, kind) in out.iter() {
            assert!(rect.contains_inclusive(p.to_kurbo()), "{p:?} isn't in {rect:?}");
            // Border points of the input pass through unchanged, so only main
            // points are guaranteed not to be made up.
            let made_up = !input_points.contains(&p);
            match kind {
                PointKind::Main => assert!(!made_up, "{p:?} isn't an input point"),
                PointKind::Border => {
                    assert!(!made_up || on_boundary(&rect, p.to_kurbo()), "{p:?} isn't on {rect:?}")
                }
            }
        }

        // Everything is inside now, so clipping again leaves it alone.
        let again = engine.clip_rect(&out, closed, rect);
        assert!(matches!(again, Ok(Some(Cow::Borrowed(_)))));
        Ok(())
    }

    /// Runs an arbitrary chain through splitting, joining, reversing and
    /// freezing, checking that the points come out as expected.
    pub fn chain_ops(u: &mut Unstructured<'_>) -> arbitrary::Result<()> {
        let rect = window(u)?;
        let c = chain(&rect, 12, u)?;
        let points: Vec<_> = c.points().collect();
        let len = points.len();

        let mid = u.int_in_range(0..=len)?;
        let head = c.subrange(0, mid).ok().flatten();
        let tail = c.subrange(mid, len).ok().flatten();
        let rejoined = match (head, tail) {
            (Some(h), Some(t)) => h.concat(t).ok(),
            (h, t) => h.or(t),
        }
        .unwrap_or_default();
        assert_eq!(rejoined.points().collect::<Vec<_>>(), points);

        let reversed: Vec<_> = c.reverse().points().collect();
        assert!(reversed.iter().eq(points.iter().rev()));

        let mut frozen: PolylineChain = rejoined;
        frozen.freeze(u.arbitrary()?);
        assert!(frozen.is_frozen());
        assert!(frozen.point_count() <= len);
        assert!(frozen.points().all(|p| points.contains(&p)));
        Ok(())
    }
}
