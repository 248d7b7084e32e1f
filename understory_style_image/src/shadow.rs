// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Box and drop shadows, and the extents they add around a rect.

use alloc::vec::Vec;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Rect, Vec2};
use peniko::Color;

use crate::geometry::LayoutUnit;

/// Whether a shadow is drawn outside or inside the box.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadowStyle {
    /// Drawn outside the border box.
    #[default]
    Normal,
    /// Drawn inside the padding box.
    Inset,
}

/// One shadow: offset, blur, spread and color.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShadowData {
    /// Shadow offset.
    pub offset: Vec2,
    /// Blur radius; negative values are treated as zero.
    pub radius: f32,
    /// Spread distance.
    pub spread: f32,
    /// Shadow color.
    pub color: Color,
    /// Inset or normal.
    pub style: ShadowStyle,
    /// Set for the legacy `-webkit-box-shadow` spelling.
    pub is_webkit_box_shadow: bool,
}

impl ShadowData {
    /// Creates a normal shadow.
    #[must_use]
    pub fn new(offset: Vec2, radius: f32, spread: f32, color: Color) -> Self {
        Self {
            offset,
            radius,
            spread,
            color,
            style: ShadowStyle::Normal,
            is_webkit_box_shadow: false,
        }
    }

    /// Returns this shadow with a different style.
    #[must_use]
    pub fn with_style(mut self, style: ShadowStyle) -> Self {
        self.style = style;
        self
    }

    /// How far the blur reaches beyond the shadow's edge.
    ///
    /// Blurs are approximated by a Gaussian whose visible tail ends at
    /// `radius * 1.4`, rounded up to a whole pixel.
    #[must_use]
    pub fn painting_extent(&self) -> LayoutUnit {
        let radius = self.radius.max(0.0);
        LayoutUnit::from_f32((radius * 1.4).ceil())
    }

    /// Returns `true` for inset shadows.
    #[must_use]
    pub fn is_inset(&self) -> bool {
        self.style == ShadowStyle::Inset
    }
}

/// Per-side distances around a box.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BoxExtent {
    /// Distance above the box.
    pub top: LayoutUnit,
    /// Distance to the right of the box.
    pub right: LayoutUnit,
    /// Distance below the box.
    pub bottom: LayoutUnit,
    /// Distance to the left of the box.
    pub left: LayoutUnit,
}

/// An ordered list of shadows, painted front to back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShadowList(Vec<ShadowData>);

impl ShadowList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a shadow.
    pub fn push(&mut self, shadow: ShadowData) {
        self.0.push(shadow);
    }

    /// Iterates the shadows in paint order.
    pub fn iter(&self) -> impl Iterator<Item = &ShadowData> + '_ {
        self.0.iter()
    }

    /// Returns `true` if there are no shadows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// How far normal shadows reach outside the box on each side.
    ///
    /// Inset shadows are ignored. Extents are never negative.
    #[must_use]
    pub fn outset_extent(&self) -> BoxExtent {
        let mut top = LayoutUnit::ZERO;
        let mut right = LayoutUnit::ZERO;
        let mut bottom = LayoutUnit::ZERO;
        let mut left = LayoutUnit::ZERO;
        for shadow in self.iter().filter(|s| !s.is_inset()) {
            let reach = shadow.painting_extent() + LayoutUnit::from_f32(shadow.spread);
            let x = LayoutUnit::from_f64(shadow.offset.x);
            let y = LayoutUnit::from_f64(shadow.offset.y);
            left = left.min(x - reach);
            right = right.max(x + reach);
            top = top.min(y - reach);
            bottom = bottom.max(y + reach);
        }
        BoxExtent {
            top: -top,
            right,
            bottom,
            left: -left,
        }
    }

    /// How far inset shadows reach into the box on each side.
    #[must_use]
    pub fn inset_extent(&self) -> BoxExtent {
        let mut top = LayoutUnit::ZERO;
        let mut right = LayoutUnit::ZERO;
        let mut bottom = LayoutUnit::ZERO;
        let mut left = LayoutUnit::ZERO;
        for shadow in self.iter().filter(|s| s.is_inset()) {
            let reach = shadow.painting_extent() + LayoutUnit::from_f32(shadow.spread);
            let x = LayoutUnit::from_f64(shadow.offset.x);
            let y = LayoutUnit::from_f64(shadow.offset.y);
            top = top.max(y + reach);
            right = right.min(x - reach);
            bottom = bottom.min(y - reach);
            left = left.max(x + reach);
        }
        BoxExtent {
            top,
            right: -right,
            bottom: -bottom,
            left,
        }
    }

    /// Grows `rect` to cover everything the normal shadows paint.
    #[must_use]
    pub fn adjust_rect_for_shadow(&self, rect: Rect) -> Rect {
        let extent = self.outset_extent();
        Rect::new(
            rect.x0 - extent.left.to_f64(),
            rect.y0 - extent.top.to_f64(),
            rect.x1 + extent.right.to_f64(),
            rect.y1 + extent.bottom.to_f64(),
        )
    }
}

impl FromIterator<ShadowData> for ShadowList {
    fn from_iter<I: IntoIterator<Item = ShadowData>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shadow(x: f64, y: f64, radius: f32, spread: f32) -> ShadowData {
        ShadowData::new(Vec2::new(x, y), radius, spread, Color::BLACK)
    }

    #[test]
    fn painting_extent_rounds_up() {
        assert_eq!(shadow(0.0, 0.0, 5.0, 0.0).painting_extent(), LayoutUnit::from_int(7));
        assert_eq!(shadow(0.0, 0.0, 1.0, 0.0).painting_extent(), LayoutUnit::from_int(2));
        assert_eq!(shadow(0.0, 0.0, -3.0, 0.0).painting_extent(), LayoutUnit::ZERO);
    }

    #[test]
    fn outset_extent_covers_offset_and_spread() {
        let list: ShadowList = [shadow(4.0, -2.0, 0.0, 1.0)].into_iter().collect();
        let extent = list.outset_extent();
        assert_eq!(extent.right, LayoutUnit::from_int(5));
        assert_eq!(extent.left, LayoutUnit::ZERO);
        assert_eq!(extent.top, LayoutUnit::from_int(3));
        assert_eq!(extent.bottom, LayoutUnit::ZERO);
    }

    #[test]
    fn inset_shadows_do_not_grow_rect() {
        let list: ShadowList = [shadow(4.0, 4.0, 10.0, 0.0).with_style(ShadowStyle::Inset)]
            .into_iter()
            .collect();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(list.adjust_rect_for_shadow(rect), rect);
        assert_eq!(list.inset_extent().top, LayoutUnit::from_int(18));
    }

    #[test]
    fn adjust_rect_for_blurred_shadow() {
        let list: ShadowList = [shadow(0.0, 0.0, 5.0, 0.0)].into_iter().collect();
        let rect = list.adjust_rect_for_shadow(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(rect, Rect::new(-7.0, -7.0, 17.0, 17.0));
    }
}
