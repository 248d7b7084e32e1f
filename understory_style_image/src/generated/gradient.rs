// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CSS gradients as resizable generated images.
//!
//! A gradient has no size of its own; it fills whatever container it is laid
//! out in. Geometry is resolved against the requested size and handed to the
//! backend as a [`peniko::Gradient`].

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::f64::consts::{FRAC_PI_2, TAU};
use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Size, Vec2};
use peniko::{Color, Extend, Gradient};

use super::GeneratedImageBase;
use crate::backend::RenderBackend;
use crate::client::ClientHandle;
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{LoaderOptions, ResourceLoader};
use crate::style_image::{StyleImage, StyleImageKind};
use crate::types::{ContainerContext, RendererId, StyleImageSizeType};

/// A length in CSS pixels or a fraction of some basis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LengthPercentage {
    /// Absolute length in CSS pixels (degrees for conic stops).
    Length(f64),
    /// Fraction of the basis; `0.5` is `50%`.
    Percentage(f64),
}

impl LengthPercentage {
    /// Resolves against `basis`.
    #[must_use]
    pub fn resolve(self, basis: f64) -> f64 {
        match self {
            Self::Length(length) => length,
            Self::Percentage(fraction) => fraction * basis,
        }
    }

    /// Resolves to a fraction of `basis`.
    fn fraction_of(self, basis: f64) -> f64 {
        match self {
            Self::Percentage(fraction) => fraction,
            Self::Length(_) if basis == 0.0 => 0.0,
            Self::Length(length) => length / basis,
        }
    }
}

/// A point inside the gradient box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GradientPosition {
    /// Horizontal offset from the left edge.
    pub x: LengthPercentage,
    /// Vertical offset from the top edge.
    pub y: LengthPercentage,
}

impl GradientPosition {
    /// The center of the box.
    pub const CENTER: Self = Self {
        x: LengthPercentage::Percentage(0.5),
        y: LengthPercentage::Percentage(0.5),
    };

    /// Resolves against a box of `size`.
    #[must_use]
    pub fn resolve(self, size: Size) -> Point {
        Point::new(self.x.resolve(size.width), self.y.resolve(size.height))
    }
}

/// `left` or `right` in `to <side-or-corner>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HorizontalSide {
    /// Toward the left edge.
    Left,
    /// Toward the right edge.
    Right,
}

/// `top` or `bottom` in `to <side-or-corner>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VerticalSide {
    /// Toward the top edge.
    Top,
    /// Toward the bottom edge.
    Bottom,
}

/// Direction of a linear gradient.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LinearDirection {
    /// An angle in degrees; `0` points up, increasing clockwise.
    Angle(f64),
    /// `to <side>` or `to <corner>`.
    SideOrCorner {
        /// Horizontal component, if any.
        horizontal: Option<HorizontalSide>,
        /// Vertical component, if any.
        vertical: Option<VerticalSide>,
    },
}

impl Default for LinearDirection {
    fn default() -> Self {
        Self::SideOrCorner {
            horizontal: None,
            vertical: Some(VerticalSide::Bottom),
        }
    }
}

impl LinearDirection {
    /// Unit vector along the gradient line for a box of `size`.
    ///
    /// Corners point perpendicular to the diagonal joining the two
    /// neighbouring corners, so the 50% line passes through them.
    fn unit_vector(self, size: Size) -> Vec2 {
        match self {
            Self::Angle(degrees) => {
                let (sin, cos) = degrees.to_radians().sin_cos();
                Vec2::new(sin, -cos)
            }
            Self::SideOrCorner {
                horizontal,
                vertical,
            } => {
                let sx = match horizontal {
                    Some(HorizontalSide::Left) => -1.0,
                    Some(HorizontalSide::Right) => 1.0,
                    None => 0.0,
                };
                let sy = match vertical {
                    Some(VerticalSide::Top) => -1.0,
                    Some(VerticalSide::Bottom) => 1.0,
                    None => 0.0,
                };
                let direction = if sx != 0.0 && sy != 0.0 {
                    Vec2::new(sx * size.height, sy * size.width)
                } else {
                    Vec2::new(sx, sy)
                };
                if direction.hypot() == 0.0 {
                    Vec2::new(0.0, 1.0)
                } else {
                    direction.normalize()
                }
            }
        }
    }
}

/// Radial ending-shape size keywords.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RadialExtent {
    /// Touches the nearest side.
    ClosestSide,
    /// Passes through the nearest corner.
    ClosestCorner,
    /// Touches the farthest side.
    FarthestSide,
    /// Passes through the farthest corner.
    #[default]
    FarthestCorner,
}

/// Size of a circular radial gradient.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RadialSize {
    /// A keyword resolved against the box.
    Extent(RadialExtent),
    /// An explicit radius in CSS pixels.
    Radius(f64),
}

impl RadialSize {
    fn resolve(self, center: Point, size: Size) -> f64 {
        let extent = match self {
            Self::Radius(radius) => return radius.max(0.0),
            Self::Extent(extent) => extent,
        };
        let sides = [
            center.x.abs(),
            (size.width - center.x).abs(),
            center.y.abs(),
            (size.height - center.y).abs(),
        ];
        let corners = [
            Point::ZERO,
            Point::new(size.width, 0.0),
            Point::new(0.0, size.height),
            Point::new(size.width, size.height),
        ]
        .map(|corner| (corner - center).hypot());
        match extent {
            RadialExtent::ClosestSide => sides.into_iter().fold(f64::INFINITY, f64::min),
            RadialExtent::FarthestSide => sides.into_iter().fold(0.0, f64::max),
            RadialExtent::ClosestCorner => corners.into_iter().fold(f64::INFINITY, f64::min),
            RadialExtent::FarthestCorner => corners.into_iter().fold(0.0, f64::max),
        }
    }
}

/// Gradient geometry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum GradientData {
    /// `linear-gradient()`.
    Linear {
        /// Gradient line direction.
        direction: LinearDirection,
    },
    /// `radial-gradient()` with a circular ending shape.
    Radial {
        /// Ending-shape size.
        size: RadialSize,
        /// Center.
        position: GradientPosition,
    },
    /// `conic-gradient()`.
    Conic {
        /// Starting angle in degrees; `0` points up.
        from_angle: f64,
        /// Center.
        position: GradientPosition,
    },
}

/// A color stop with an optional position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ColorStop {
    /// Stop color.
    pub color: Color,
    /// Position along the gradient; distributed automatically when `None`.
    pub position: Option<LengthPercentage>,
}

impl ColorStop {
    /// A stop without a position.
    #[must_use]
    pub const fn new(color: Color) -> Self {
        Self {
            color,
            position: None,
        }
    }

    /// A stop at `position`.
    #[must_use]
    pub const fn at(color: Color, position: LengthPercentage) -> Self {
        Self {
            color,
            position: Some(position),
        }
    }
}

/// Resolves stop positions to fractions of `basis`.
///
/// A missing first position is 0 and a missing last one is 1. Positions
/// never decrease, and runs of missing positions are spread evenly between
/// their neighbours.
fn resolve_stop_offsets(stops: &[ColorStop], basis: f64) -> Vec<f64> {
    let count = stops.len();
    if count == 0 {
        return Vec::new();
    }
    let mut offsets: Vec<Option<f64>> = stops
        .iter()
        .map(|stop| stop.position.map(|p| p.fraction_of(basis)))
        .collect();
    offsets[0].get_or_insert(0.0);
    offsets[count - 1].get_or_insert(1.0);

    let mut max = f64::NEG_INFINITY;
    for offset in offsets.iter_mut().flatten() {
        if *offset < max {
            *offset = max;
        } else {
            max = *offset;
        }
    }

    let mut resolved = Vec::with_capacity(count);
    let mut index = 0;
    while index < count {
        if let Some(offset) = offsets[index] {
            resolved.push(offset);
            index += 1;
            continue;
        }
        let start = resolved[index - 1];
        let next = (index..count)
            .find(|&i| offsets[i].is_some())
            .unwrap_or(count - 1);
        let end = offsets[next].unwrap_or(start);
        let steps = (next - index + 1) as f64;
        for step in 1..=(next - index) {
            resolved.push(start + (end - start) * step as f64 / steps);
        }
        index = next;
    }
    resolved
}

/// Maps resolved offsets onto `[0, 1]` and reports the range they covered.
///
/// Returns `(first, last, offsets)`; geometry should be stretched to span
/// `first..last` of the gradient line.
#[expect(clippy::cast_possible_truncation, reason = "stop offsets are small")]
fn normalize_offsets(offsets: &[f64], repeating: bool) -> (f64, f64, Vec<f32>) {
    let (Some(&first), Some(&last)) = (offsets.first(), offsets.last()) else {
        return (0.0, 1.0, Vec::new());
    };
    let in_unit_range = (0.0..=1.0).contains(&first) && (0.0..=1.0).contains(&last);
    let span = last - first;
    if (!repeating && in_unit_range) || span <= f64::EPSILON {
        let clamped = offsets.iter().map(|o| o.clamp(0.0, 1.0) as f32).collect();
        (0.0, 1.0, clamped)
    } else {
        let mapped = offsets.iter().map(|o| ((o - first) / span) as f32).collect();
        (first, last, mapped)
    }
}

/// A linear, radial or conic CSS gradient.
pub struct StyleGradientImage {
    data: GradientData,
    stops: Vec<ColorStop>,
    repeating: bool,
    base: GeneratedImageBase,
}

impl StyleGradientImage {
    /// Creates a gradient image.
    #[must_use]
    pub fn create(data: GradientData, stops: Vec<ColorStop>, repeating: bool) -> Rc<Self> {
        Rc::new(Self {
            data,
            stops,
            repeating,
            base: GeneratedImageBase::new(false),
        })
    }

    /// Gradient geometry.
    #[must_use]
    pub fn data(&self) -> &GradientData {
        &self.data
    }

    /// Color stops as specified.
    #[must_use]
    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Returns `true` for `repeating-*-gradient()`.
    #[must_use]
    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    /// Resolves the gradient for a box of `size`.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "peniko radii and angles are f32")]
    pub fn gradient_for_size(&self, size: Size) -> Gradient {
        let gradient = match self.data {
            GradientData::Linear { direction } => {
                let unit = direction.unit_vector(size);
                let length = (size.width * unit.x).abs() + (size.height * unit.y).abs();
                let center = Point::new(size.width / 2.0, size.height / 2.0);
                let start = center - unit * (length / 2.0);
                let end = center + unit * (length / 2.0);
                let offsets = resolve_stop_offsets(&self.stops, length);
                let (first, last, offsets) = normalize_offsets(&offsets, self.repeating);
                Gradient::new_linear(start.lerp(end, first), start.lerp(end, last))
                    .with_stops(self.peniko_stops(&offsets).as_slice())
            }
            GradientData::Radial { size: extent, position } => {
                let center = position.resolve(size);
                let radius = extent.resolve(center, size);
                let offsets = resolve_stop_offsets(&self.stops, radius);
                let (first, last, offsets) = normalize_offsets(&offsets, self.repeating);
                Gradient::new_two_point_radial(
                    center,
                    (radius * first.max(0.0)) as f32,
                    center,
                    (radius * last.max(0.0)) as f32,
                )
                .with_stops(self.peniko_stops(&offsets).as_slice())
            }
            GradientData::Conic {
                from_angle,
                position,
            } => {
                let center = position.resolve(size);
                let offsets = resolve_stop_offsets(&self.stops, 360.0);
                let (first, last, offsets) = normalize_offsets(&offsets, self.repeating);
                // Conic angles start at the top; sweeps start on the positive X axis.
                let base = from_angle.to_radians() - FRAC_PI_2;
                Gradient::new_sweep(
                    center,
                    (base + first * TAU) as f32,
                    (base + last * TAU) as f32,
                )
                .with_stops(self.peniko_stops(&offsets).as_slice())
            }
        };
        gradient.with_extend(if self.repeating {
            Extend::Repeat
        } else {
            Extend::Pad
        })
    }

    fn peniko_stops(&self, offsets: &[f32]) -> Vec<peniko::ColorStop> {
        self.stops
            .iter()
            .zip(offsets)
            .map(|(stop, offset)| peniko::ColorStop::from((*offset, stop.color)))
            .collect()
    }
}

impl fmt::Debug for StyleGradientImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleGradientImage")
            .field("data", &self.data)
            .field("stops", &self.stops)
            .field("repeating", &self.repeating)
            .finish_non_exhaustive()
    }
}

impl StyleImage for StyleGradientImage {
    fn kind(&self) -> StyleImageKind {
        StyleImageKind::GradientImage
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| {
            self.data == other.data
                && self.stops == other.stops
                && self.repeating == other.repeating
        })
    }

    fn add_client(&self, client: ClientHandle) {
        self.base.add_client(client);
    }

    fn remove_client(&self, client: &ClientHandle) {
        self.base.remove_client(self, client);
    }

    fn has_client(&self, client: &ClientHandle) -> bool {
        self.base.has_client(client)
    }

    fn is_pending(&self) -> bool {
        false
    }

    fn load(&self, _loader: &mut dyn ResourceLoader, _options: &LoaderOptions) {
        self.base.begin_load(self);
    }

    fn image_size_for_renderer(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        _size_type: StyleImageSizeType,
    ) -> LayoutSize {
        self.base
            .image_size(renderer, multiplier, || LayoutSize::ZERO)
    }

    fn image_has_natural_dimensions(&self) -> bool {
        self.base.is_fixed_size()
    }

    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext) {
        self.base.set_container_context(renderer, &context);
    }

    fn image_for_renderer(
        &self,
        _renderer: Option<RendererId>,
        size: Size,
        _is_for_first_line: bool,
        backend: &mut dyn RenderBackend,
    ) -> Option<Image> {
        if size.is_zero_area() {
            return Some(Image::Null);
        }
        Some(self.base.cached_or_render(size, || {
            backend.fill_gradient(&self.gradient_for_size(size), size)
        }))
    }

    fn known_to_be_opaque(&self, _renderer: Option<RendererId>) -> bool {
        !self.stops.is_empty() && self.stops.iter().all(|stop| stop.color.components[3] >= 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::{GradientKind, LinearGradientPosition};

    const RED: Color = Color::from_rgb8(255, 0, 0);
    const BLUE: Color = Color::from_rgb8(0, 0, 255);

    fn offsets(gradient: &Gradient) -> Vec<f32> {
        gradient.stops.iter().map(|stop| stop.offset).collect()
    }

    fn assert_near(a: Point, b: Point) {
        assert!((a - b).hypot() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn unpositioned_stops_are_spread_evenly() {
        let stops = [ColorStop::new(RED), ColorStop::new(BLUE), ColorStop::new(RED)];
        assert_eq!(resolve_stop_offsets(&stops, 100.0), [0.0, 0.5, 1.0]);

        let stops = [
            ColorStop::at(RED, LengthPercentage::Percentage(0.2)),
            ColorStop::new(BLUE),
            ColorStop::new(BLUE),
            ColorStop::at(RED, LengthPercentage::Length(80.0)),
        ];
        let resolved = resolve_stop_offsets(&stops, 100.0);
        assert!((resolved[1] - 0.4).abs() < 1e-12, "{resolved:?}");
        assert!((resolved[2] - 0.6).abs() < 1e-12, "{resolved:?}");
    }

    #[test]
    fn stop_positions_never_decrease() {
        let stops = [
            ColorStop::at(RED, LengthPercentage::Percentage(0.5)),
            ColorStop::at(BLUE, LengthPercentage::Percentage(0.2)),
        ];
        assert_eq!(resolve_stop_offsets(&stops, 1.0), [0.5, 0.5]);
    }

    #[test]
    fn linear_to_right() {
        let image = StyleGradientImage::create(
            GradientData::Linear {
                direction: LinearDirection::SideOrCorner {
                    horizontal: Some(HorizontalSide::Right),
                    vertical: None,
                },
            },
            alloc::vec![ColorStop::new(RED), ColorStop::new(BLUE)],
            false,
        );
        let gradient = image.gradient_for_size(Size::new(100.0, 50.0));
        let GradientKind::Linear(LinearGradientPosition { start, end }) = gradient.kind else {
            panic!("expected a linear gradient");
        };
        assert_near(start, Point::new(0.0, 25.0));
        assert_near(end, Point::new(100.0, 25.0));
        assert_eq!(offsets(&gradient), [0.0, 1.0]);
        assert_eq!(gradient.extend, Extend::Pad);
    }

    #[test]
    fn default_direction_is_to_bottom() {
        let image = StyleGradientImage::create(
            GradientData::Linear {
                direction: LinearDirection::default(),
            },
            alloc::vec![ColorStop::new(RED), ColorStop::new(BLUE)],
            false,
        );
        let gradient = image.gradient_for_size(Size::new(100.0, 50.0));
        let GradientKind::Linear(LinearGradientPosition { start, end }) = gradient.kind else {
            panic!("expected a linear gradient");
        };
        assert_near(start, Point::new(50.0, 0.0));
        assert_near(end, Point::new(50.0, 50.0));
    }

    #[test]
    fn corner_direction_spans_the_diagonal() {
        let direction = LinearDirection::SideOrCorner {
            horizontal: Some(HorizontalSide::Right),
            vertical: Some(VerticalSide::Bottom),
        };
        let image = StyleGradientImage::create(
            GradientData::Linear { direction },
            alloc::vec![ColorStop::new(RED), ColorStop::new(BLUE)],
            false,
        );
        let gradient = image.gradient_for_size(Size::new(100.0, 100.0));
        let GradientKind::Linear(LinearGradientPosition { start, end }) = gradient.kind else {
            panic!("expected a linear gradient");
        };
        assert!((start - Point::ZERO).hypot() < 1e-6, "{start:?}");
        assert!((end - Point::new(100.0, 100.0)).hypot() < 1e-6, "{end:?}");
    }

    #[test]
    fn repeating_linear_stretches_to_stop_range() {
        let image = StyleGradientImage::create(
            GradientData::Linear {
                direction: LinearDirection::Angle(90.0),
            },
            alloc::vec![
                ColorStop::at(RED, LengthPercentage::Length(0.0)),
                ColorStop::at(BLUE, LengthPercentage::Length(10.0)),
            ],
            true,
        );
        let gradient = image.gradient_for_size(Size::new(100.0, 10.0));
        let GradientKind::Linear(LinearGradientPosition { start, end }) = gradient.kind else {
            panic!("expected a linear gradient");
        };
        assert_near(start, Point::new(0.0, 5.0));
        assert!((end - Point::new(10.0, 5.0)).hypot() < 1e-9, "{end:?}");
        assert_eq!(offsets(&gradient), [0.0, 1.0]);
        assert_eq!(gradient.extend, Extend::Repeat);
    }

    #[test]
    fn radial_extents() {
        let size = Size::new(100.0, 100.0);
        let center = Point::new(50.0, 50.0);
        let farthest = RadialSize::Extent(RadialExtent::FarthestCorner).resolve(center, size);
        assert!((farthest - 50.0 * core::f64::consts::SQRT_2).abs() < 1e-9);
        let closest = RadialSize::Extent(RadialExtent::ClosestSide)
            .resolve(Point::new(10.0, 50.0), size);
        assert_eq!(closest, 10.0);
        assert_eq!(RadialSize::Radius(-4.0).resolve(center, size), 0.0);
    }

    #[test]
    fn opacity_follows_stop_alpha() {
        let data = GradientData::Conic {
            from_angle: 0.0,
            position: GradientPosition::CENTER,
        };
        let opaque = StyleGradientImage::create(
            data,
            alloc::vec![ColorStop::new(RED), ColorStop::new(BLUE)],
            false,
        );
        assert!(opaque.known_to_be_opaque(None));

        let translucent = StyleGradientImage::create(
            data,
            alloc::vec![ColorStop::new(RED), ColorStop::new(BLUE.with_alpha(0.5))],
            false,
        );
        assert!(!translucent.known_to_be_opaque(None));
        assert!(!StyleGradientImage::create(data, Vec::new(), false).known_to_be_opaque(None));
    }

    #[test]
    fn structural_equality() {
        let data = GradientData::Linear {
            direction: LinearDirection::Angle(45.0),
        };
        let a: Rc<dyn StyleImage> =
            StyleGradientImage::create(data, alloc::vec![ColorStop::new(RED)], false);
        let b: Rc<dyn StyleImage> =
            StyleGradientImage::create(data, alloc::vec![ColorStop::new(RED)], false);
        let c: Rc<dyn StyleImage> =
            StyleGradientImage::create(data, alloc::vec![ColorStop::new(RED)], true);
        assert!(*a == *b);
        assert!(*a != *c);
    }
}
