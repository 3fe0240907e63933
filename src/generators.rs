//! Utilities for generating examples, benchmarks, and test cases.

use std::f64::consts::TAU;

use crate::{chain::PolylineChain, Point};

/// Generate a bunch of squares, arranged in a grid.
///
/// The bottom-left of the first square is at (x0, y0). Each square has size
/// `size x size`, and the distance between squares (both horizontally and
/// vertically) is `offset`. Squares run counter-clockwise.
pub fn square_grid((x0, y0): (f32, f32), size: f32, offset: f32, count: usize) -> Vec<PolylineChain> {
    let mut ret = Vec::with_capacity(count * count);
    for i in 0..count {
        let x = x0 + i as f32 * offset;
        for j in 0..count {
            let y = y0 + j as f32 * offset;
            ret.push(PolylineChain::from_points([
                (x, y),
                (x + size, y),
                (x + size, y + size),
                (x, y + size),
            ]));
        }
    }
    ret
}

/// A closed, wiggly ring of `n` points around the origin, looking vaguely
/// like an island's coastline.
///
/// The radius varies between roughly `radius * (1 - roughness)` and
/// `radius * (1 + roughness)`. The output is deterministic: the same
/// arguments always give the same ring.
pub fn coastline(n: usize, radius: f64, roughness: f64) -> PolylineChain {
    let points = (0..n).map(|i| {
        let theta = TAU * i as f64 / n as f64;
        // A few incommensurate frequencies, so the wiggles don't line up.
        let wiggle = 0.5 * (7.0 * theta).sin()
            + 0.3 * (23.0 * theta + 1.0).sin()
            + 0.2 * (61.0 * theta + 2.0).sin();
        let r = radius * (1.0 + roughness * wiggle);
        Point::new((r * theta.cos()) as f32, (r * theta.sin()) as f32)
    });
    PolylineChain::from_points(points)
}

/// A star with `spikes` spikes, alternating between the outer and inner radius.
pub fn star(spikes: usize, outer: f64, inner: f64) -> PolylineChain {
    let n = 2 * spikes;
    let points = (0..n).map(|i| {
        let theta = TAU * i as f64 / n as f64;
        let r = if i % 2 == 0 { outer } else { inner };
        Point::new((r * theta.cos()) as f32, (r * theta.sin()) as f32)
    });
    PolylineChain::from_points(points)
}

/// An open spiral, winding outwards from the origin `turns` times.
///
/// Clipping this to a small window around the origin makes the line leave
/// and re-enter over and over.
pub fn spiral(turns: usize, points_per_turn: usize, spacing: f64) -> PolylineChain {
    let n = turns * points_per_turn;
    let points = (1..=n).map(|i| {
        let theta = TAU * i as f64 / points_per_turn as f64;
        let r = spacing * theta / TAU;
        Point::new((r * theta.cos()) as f32, (r * theta.sin()) as f32)
    });
    PolylineChain::from_points(points)
}

/// Cuts a coastline into `pieces` open fragments, shuffled and with every
/// other one reversed. Joining them back together is a job for the
/// [`PolygonAssembler`](crate::PolygonAssembler).
pub fn fragmented_coastline(n: usize, radius: f64, pieces: usize) -> Vec<PolylineChain> {
    let ring = coastline(n, radius, 0.2);
    let len = ring.point_count();
    let pieces = pieces.clamp(1, len.max(1));
    let step = len / pieces;

    let mut ret = Vec::with_capacity(pieces);
    for k in 0..pieces {
        let lower = k * step;
        // Consecutive fragments share an endpoint; the last one wraps around.
        let upper = if k + 1 == pieces { len } else { (k + 1) * step + 1 };
        let Ok(Some(mut piece)) = ring.subrange(lower, upper) else {
            continue;
        };
        if k + 1 == pieces {
            if let Some(first) = ring.first_point() {
                let closing = PolylineChain::from_points([first]);
                if let Ok(joined) = piece.clone().concat(closing) {
                    piece = joined;
                }
            }
        }
        if k % 2 == 1 {
            piece = piece.reverse();
        }
        ret.push(piece);
    }
    // A fixed interleaving, so the fragments aren't in order.
    let (evens, odds): (Vec<_>, Vec<_>) = ret.into_iter().enumerate().partition(|(i, _)| i % 2 == 0);
    evens
        .into_iter()
        .chain(odds.into_iter().rev())
        .map(|(_, c)| c)
        .collect()
}
