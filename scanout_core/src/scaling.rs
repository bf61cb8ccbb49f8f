// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Plane destination rectangle for each scaling policy.

use kurbo::{Point, Rect, Size};

/// How the source image is placed on the active mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScalingMode {
    /// Stretch to the whole mode.
    #[default]
    Fullscreen,
    /// Largest centered rectangle with the source's aspect ratio.
    AspectRatio,
    /// Largest centered integer multiple of the source size; fullscreen if
    /// even 1× does not fit.
    IntegerScaled,
}

impl ScalingMode {
    /// The next policy in the hot-key cycle.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Fullscreen => Self::AspectRatio,
            Self::AspectRatio => Self::IntegerScaled,
            Self::IntegerScaled => Self::Fullscreen,
        }
    }
}

/// Destination rectangle on the crtc, in mode pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PlaneRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl PlaneRect {
    /// A rectangle at the origin covering `width × height`.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// The rectangle as a [`kurbo::Rect`].
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::from_origin_size(
            Point::new(f64::from(self.x), f64::from(self.y)),
            Size::new(f64::from(self.width), f64::from(self.height)),
        )
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "rectangles are bounded by the mode size, which fits in u16"
    )]
    fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.x0.floor() as i32,
            y: rect.y0.floor() as i32,
            width: rect.width().floor().max(0.0) as u32,
            height: rect.height().floor().max(0.0) as u32,
        }
    }
}

/// Computes the plane destination for a `source` image on a `target` mode.
///
/// `pixel_aspect` is the pipe's `(factor_w, factor_h)`: the source is widened
/// or heightened by those factors before fitting so that it keeps its shape
/// on panels with non-square pixels. A zero-sized source or target yields the
/// fullscreen rectangle.
#[must_use]
pub fn compute_placement(
    mode: ScalingMode,
    source: (u32, u32),
    pixel_aspect: (u32, u32),
    target: (u32, u32),
) -> PlaneRect {
    let full = PlaneRect::full(target.0, target.1);
    let src_w = source.0.saturating_mul(pixel_aspect.0.max(1));
    let src_h = source.1.saturating_mul(pixel_aspect.1.max(1));
    if src_w == 0 || src_h == 0 || target.0 == 0 || target.1 == 0 {
        return full;
    }
    let bounds = full.to_rect();
    let dest = match mode {
        ScalingMode::Fullscreen => return full,
        ScalingMode::AspectRatio => {
            let scale =
                (bounds.width() / f64::from(src_w)).min(bounds.height() / f64::from(src_h));
            Size::new(
                (f64::from(src_w) * scale).floor(),
                (f64::from(src_h) * scale).floor(),
            )
        }
        ScalingMode::IntegerScaled => {
            let factor = (target.0 / src_w).min(target.1 / src_h);
            if factor == 0 {
                return full;
            }
            Size::new(f64::from(src_w * factor), f64::from(src_h * factor))
        }
    };
    // Center by halving the integer slack so odd remainders round down.
    let origin = Point::new(
        ((bounds.width() - dest.width) / 2.0).floor(),
        ((bounds.height() - dest.height) / 2.0).floor(),
    );
    PlaneRect::from_rect(Rect::from_origin_size(origin, dest))
}
