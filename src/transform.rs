//! Mapping clip windows into the coordinate system of the geometry.
//!
//! A clip window is usually expressed in display coordinates, while the
//! geometry lives in whatever coordinate system it was digitized in. Rather
//! than transforming every point of every polyline, we transform the window
//! once per clip call.

use kurbo::{Affine, Rect};

use crate::Error;

/// A window transform couldn't be applied.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// The transform collapses the plane onto a line or a point.
    #[error("transform is not invertible")]
    Singular,
    /// The transformed rectangle had infinite or NaN coordinates.
    #[error("transformed window is not finite: {0:?}")]
    NonFinite(Rect),
}

/// Maps rectangles from window coordinates to geometry coordinates.
pub trait WindowTransform {
    /// Returns the smallest axis-aligned rectangle in geometry coordinates
    /// that covers `rect`.
    fn transform_rect(&self, rect: Rect) -> Result<Rect, TransformError>;

    /// Does this transform leave every rectangle unchanged?
    ///
    /// When it does, clipping skips [`WindowTransform::transform_rect`]
    /// entirely and can't fail.
    fn is_identity(&self) -> bool;
}

/// The transform that does nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Identity;

impl WindowTransform for Identity {
    fn transform_rect(&self, rect: Rect) -> Result<Rect, TransformError> {
        Ok(rect)
    }

    fn is_identity(&self) -> bool {
        true
    }
}

impl WindowTransform for Affine {
    fn transform_rect(&self, rect: Rect) -> Result<Rect, TransformError> {
        if self.determinant() == 0.0 {
            return Err(TransformError::Singular);
        }
        let out = self.transform_rect_bbox(rect);
        if !(out.x0.is_finite() && out.y0.is_finite() && out.x1.is_finite() && out.y1.is_finite()) {
            return Err(TransformError::NonFinite(out));
        }
        Ok(out)
    }

    fn is_identity(&self) -> bool {
        *self == Affine::IDENTITY
    }
}

impl<T: WindowTransform + ?Sized> WindowTransform for &T {
    fn transform_rect(&self, rect: Rect) -> Result<Rect, TransformError> {
        (**self).transform_rect(rect)
    }

    fn is_identity(&self) -> bool {
        (**self).is_identity()
    }
}

/// An axis-aligned clip rectangle, together with the transform taking it to
/// the coordinates of the geometry being clipped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipWindow<T: WindowTransform = Identity> {
    rect: Rect,
    transform: T,
}

impl ClipWindow<Identity> {
    /// A window expressed in the same coordinates as the geometry.
    pub fn new(rect: Rect) -> Self {
        Self::with_transform(rect, Identity)
    }
}

impl<T: WindowTransform> ClipWindow<T> {
    /// A window whose coordinates are mapped to geometry coordinates by
    /// `transform`.
    ///
    /// The rectangle is normalized, so it doesn't matter which corners you
    /// pass.
    pub fn with_transform(rect: Rect, transform: T) -> Self {
        ClipWindow {
            rect: rect.abs(),
            transform,
        }
    }

    /// The window in its own coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// The window in geometry coordinates.
    pub fn native_rect(&self) -> Result<Rect, Error> {
        if self.transform.is_identity() {
            return Ok(self.rect);
        }
        Ok(self.transform.transform_rect(self.rect)?.abs())
    }
}
