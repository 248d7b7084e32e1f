// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout-space fixed-point units.
//!
//! Image sizes handed to layout are expressed in [`LayoutUnit`]s: 1/64 px
//! fixed point, truncating on conversion from floats. Keeping sizes in this
//! unit is what makes the "never round a nonzero dimension down to zero"
//! rule and the crossfade size-stability rule observable.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

use kurbo::Size;

/// Number of subpixel steps per pixel.
pub const FIXED_POINT_DENOMINATOR: i32 = 64;

/// A 1/64 px fixed-point length.
///
/// Conversions from floating point truncate toward zero and saturate at the
/// representable range.
///
/// ```rust
/// use understory_style_image::LayoutUnit;
///
/// let half = LayoutUnit::from_f32(0.5);
/// assert_eq!(half.raw(), 32);
/// assert_eq!((half + half).to_int(), 1);
/// assert_eq!(LayoutUnit::from_f32(0.001), LayoutUnit::ZERO);
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayoutUnit(i32);

impl LayoutUnit {
    /// Zero length.
    pub const ZERO: Self = Self(0);

    /// The smallest positive length.
    pub const EPSILON: Self = Self(1);

    /// One whole pixel.
    pub const ONE: Self = Self(FIXED_POINT_DENOMINATOR);

    /// Creates a unit from a whole number of pixels.
    #[must_use]
    pub const fn from_int(px: i32) -> Self {
        Self(px.saturating_mul(FIXED_POINT_DENOMINATOR))
    }

    /// Creates a unit from raw 1/64 px steps.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Creates a unit from a float pixel value, truncating.
    #[must_use]
    pub fn from_f32(px: f32) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "float to int casts saturate; truncation is the rounding mode"
        )]
        Self((px * FIXED_POINT_DENOMINATOR as f32) as i32)
    }

    /// Creates a unit from a float pixel value, truncating.
    #[must_use]
    pub fn from_f64(px: f64) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "float to int casts saturate; truncation is the rounding mode"
        )]
        Self((px * f64::from(FIXED_POINT_DENOMINATOR)) as i32)
    }

    /// Raw 1/64 px steps.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Whole pixels, truncating.
    #[must_use]
    pub const fn to_int(self) -> i32 {
        self.0 / FIXED_POINT_DENOMINATOR
    }

    /// Pixel value as `f32`.
    #[must_use]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / FIXED_POINT_DENOMINATOR as f32
    }

    /// Pixel value as `f64`.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(FIXED_POINT_DENOMINATOR)
    }

    /// Returns `true` if strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Debug for LayoutUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayoutUnit({})", self.to_f64())
    }
}

impl fmt::Display for LayoutUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl Add for LayoutUnit {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for LayoutUnit {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for LayoutUnit {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Mul<f32> for LayoutUnit {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "float to int casts saturate; truncation is the rounding mode"
        )]
        Self((self.0 as f32 * rhs) as i32)
    }
}

impl Div<f32> for LayoutUnit {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "float to int casts saturate; truncation is the rounding mode"
        )]
        Self((self.0 as f32 / rhs) as i32)
    }
}

impl From<i32> for LayoutUnit {
    fn from(px: i32) -> Self {
        Self::from_int(px)
    }
}

/// A width/height pair in [`LayoutUnit`]s.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayoutSize {
    /// Horizontal extent.
    pub width: LayoutUnit,
    /// Vertical extent.
    pub height: LayoutUnit,
}

impl LayoutSize {
    /// Zero size.
    pub const ZERO: Self = Self {
        width: LayoutUnit::ZERO,
        height: LayoutUnit::ZERO,
    };

    /// Creates a size from two lengths.
    #[must_use]
    pub const fn new(width: LayoutUnit, height: LayoutUnit) -> Self {
        Self { width, height }
    }

    /// Creates a size from whole pixels.
    #[must_use]
    pub const fn from_ints(width: i32, height: i32) -> Self {
        Self::new(LayoutUnit::from_int(width), LayoutUnit::from_int(height))
    }

    /// Converts a float size, truncating each dimension.
    #[must_use]
    pub fn from_size(size: Size) -> Self {
        Self::new(
            LayoutUnit::from_f64(size.width),
            LayoutUnit::from_f64(size.height),
        )
    }

    /// Converts to a float size.
    #[must_use]
    pub fn to_size(self) -> Size {
        Size::new(self.width.to_f64(), self.height.to_f64())
    }

    /// Returns `true` if either dimension is zero or negative.
    #[must_use]
    pub fn is_empty(self) -> bool {
        !self.width.is_positive() || !self.height.is_positive()
    }

    /// Returns `true` if both dimensions are exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    /// Scales each dimension independently.
    #[must_use]
    pub fn scaled(self, sx: f32, sy: f32) -> Self {
        Self::new(self.width * sx, self.height * sy)
    }

    /// Divides both dimensions by `factor`.
    ///
    /// A factor of zero, or one that is not finite, leaves the size unchanged.
    #[must_use]
    pub fn scaled_down(self, factor: f32) -> Self {
        if factor == 1.0 || factor == 0.0 || !factor.is_finite() {
            return self;
        }
        Self::new(self.width / factor, self.height / factor)
    }

    /// Per-dimension maximum with `minimum`.
    #[must_use]
    pub fn expanded_to(self, minimum: Self) -> Self {
        Self::new(
            self.width.max(minimum.width),
            self.height.max(minimum.height),
        )
    }

    /// Weighted combination `from * (1 - progress) + to * progress`.
    #[must_use]
    pub fn blend(from: Self, to: Self, progress: f32) -> Self {
        let inverse = 1.0 - progress;
        from.scaled(inverse, inverse) + to.scaled(progress, progress)
    }
}

impl Add for LayoutSize {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.width + rhs.width, self.height + rhs.height)
    }
}

impl From<LayoutSize> for Size {
    fn from(size: LayoutSize) -> Self {
        size.to_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_truncate() {
        assert_eq!(LayoutUnit::from_f32(1.99).raw(), 127);
        assert_eq!(LayoutUnit::from_f32(-1.5).raw(), -96);
        assert_eq!(LayoutUnit::from_f64(f64::NAN), LayoutUnit::ZERO);
        assert_eq!(LayoutUnit::from_f32(f32::MAX).raw(), i32::MAX);
        assert_eq!(LayoutUnit::from_int(3).to_f32(), 3.0);
    }

    #[test]
    fn arithmetic_saturates() {
        let max = LayoutUnit::from_raw(i32::MAX);
        assert_eq!(max + LayoutUnit::ONE, max);
        assert_eq!(-LayoutUnit::from_raw(i32::MIN), max);
        assert_eq!(LayoutUnit::from_int(10) * 0.5, LayoutUnit::from_int(5));
        assert_eq!(LayoutUnit::from_int(10) / 4.0, LayoutUnit::from_f32(2.5));
    }

    #[test]
    fn size_emptiness() {
        assert!(LayoutSize::ZERO.is_empty());
        assert!(LayoutSize::from_ints(10, 0).is_empty());
        assert!(!LayoutSize::from_ints(1, 1).is_empty());
        assert!(LayoutSize::ZERO.is_zero());
        assert!(!LayoutSize::from_ints(0, 1).is_zero());
    }

    #[test]
    fn scaled_down_ignores_degenerate_factors() {
        let size = LayoutSize::from_ints(8, 4);
        assert_eq!(size.scaled_down(2.0), LayoutSize::from_ints(4, 2));
        assert_eq!(size.scaled_down(0.0), size);
        assert_eq!(size.scaled_down(f32::NAN), size);
    }

    #[test]
    fn blend_is_exact_for_halves() {
        let from = LayoutSize::from_ints(10, 10);
        let to = LayoutSize::from_ints(20, 20);
        assert_eq!(
            LayoutSize::blend(from, to, 0.5),
            LayoutSize::from_ints(15, 15)
        );
        assert_eq!(LayoutSize::blend(from, to, 0.0), from);
        assert_eq!(LayoutSize::blend(from, to, 1.0), to);
    }

    #[test]
    fn expanded_to_is_per_dimension() {
        let size = LayoutSize::new(LayoutUnit::from_raw(10), LayoutUnit::from_int(3));
        assert_eq!(
            size.expanded_to(LayoutSize::from_ints(1, 1)),
            LayoutSize::new(LayoutUnit::ONE, LayoutUnit::from_int(3))
        );
    }
}
