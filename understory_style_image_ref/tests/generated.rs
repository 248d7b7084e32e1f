// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parameter-only generated images: gradients, named and paint images, and
//! the invalid image.

use std::rc::Rc;

use kurbo::Size;
use peniko::Color;
use understory_style_image::{
    ColorStop, ContainerContext, GradientData, GradientPosition, Image, ImageId, LayoutSize,
    LengthPercentage, LinearDirection, LoaderOptions, NaturalDimensions, RadialExtent, RadialSize,
    RendererId, StyleGradientImage, StyleImage, StyleImageKind, StyleImageSizeType,
    StyleInvalidImage, StyleNamedImage, StylePaintImage,
};
use understory_style_image_ref::{
    BackendCall, FIRST_BACKEND_IMAGE_ID, RecordingBackend, RecordingClient, RefLoader,
};

const RED: Color = Color::from_rgb8(255, 0, 0);
const BLUE: Color = Color::from_rgb8(0, 0, 255);

fn two_stop_linear() -> Rc<StyleGradientImage> {
    StyleGradientImage::create(
        GradientData::Linear {
            direction: LinearDirection::Angle(90.0),
        },
        vec![ColorStop::new(RED), ColorStop::new(BLUE)],
        false,
    )
}

#[test]
fn gradient_fills_through_the_backend_once_per_size() {
    let image = two_stop_linear();
    let mut backend = RecordingBackend::new();
    let size = Size::new(120.0, 40.0);

    let rendered = image.image_for_renderer(None, size, false, &mut backend);
    assert_eq!(
        rendered,
        Some(Image::raster(ImageId(FIRST_BACKEND_IMAGE_ID), size))
    );
    assert_eq!(
        backend.calls(),
        [BackendCall::FillGradient {
            gradient: image.gradient_for_size(size),
            size,
        }]
    );

    assert_eq!(
        image.image_for_renderer(None, size, false, &mut backend),
        rendered
    );
    image.image_for_renderer(None, Size::new(60.0, 40.0), false, &mut backend);
    assert_eq!(backend.calls().len(), 2);

    assert_eq!(
        image.image_for_renderer(None, Size::ZERO, false, &mut backend),
        Some(Image::Null)
    );
    assert_eq!(backend.calls().len(), 2);
}

#[test]
fn gradient_sizes_from_its_container() {
    let image = two_stop_linear();
    assert!(!image.image_has_natural_dimensions());
    assert_eq!(image.natural_dimensions(), NaturalDimensions::NONE);

    image.set_container_context_for_renderer(
        RendererId(1),
        ContainerContext::new(Size::new(200.0, 100.0), 1.0, "index.html"),
    );
    image.set_container_context_for_renderer(
        RendererId(2),
        ContainerContext::new(Size::new(50.0, 25.0), 1.0, "index.html"),
    );
    assert_eq!(
        image.image_size_for_renderer(Some(RendererId(1)), 1.0, StyleImageSizeType::Used),
        LayoutSize::from_ints(200, 100)
    );
    assert_eq!(
        image.image_size_for_renderer(Some(RendererId(2)), 1.0, StyleImageSizeType::Used),
        LayoutSize::from_ints(50, 25)
    );
    // Without a renderer, the most recent container applies.
    assert_eq!(
        image.image_size_for_renderer(None, 1.0, StyleImageSizeType::Used),
        LayoutSize::from_ints(50, 25)
    );
}

#[test]
fn gradient_load_is_trivial() {
    let image = two_stop_linear();
    let mut loader = RefLoader::new();
    assert!(!image.is_pending());
    image.load(&mut loader, &LoaderOptions::default());
    image.load(&mut loader, &LoaderOptions::default());
    assert!(image.is_loaded());
    assert!(loader.requests().is_empty());
}

#[test]
fn gradient_opacity_follows_stop_alpha() {
    assert!(two_stop_linear().known_to_be_opaque(None));

    let translucent = StyleGradientImage::create(
        GradientData::Radial {
            size: RadialSize::Extent(RadialExtent::ClosestSide),
            position: GradientPosition::CENTER,
        },
        vec![
            ColorStop::new(RED),
            ColorStop::at(BLUE.with_alpha(0.5), LengthPercentage::Percentage(100.0)),
        ],
        false,
    );
    assert!(!translucent.known_to_be_opaque(None));
}

#[test]
fn gradient_equality_is_structural() {
    let a: Rc<dyn StyleImage> = two_stop_linear();
    let b: Rc<dyn StyleImage> = two_stop_linear();
    let repeating: Rc<dyn StyleImage> = StyleGradientImage::create(
        GradientData::Linear {
            direction: LinearDirection::Angle(90.0),
        },
        vec![ColorStop::new(RED), ColorStop::new(BLUE)],
        true,
    );
    let conic: Rc<dyn StyleImage> = StyleGradientImage::create(
        GradientData::Conic {
            from_angle: 0.0,
            position: GradientPosition::CENTER,
        },
        vec![ColorStop::new(RED), ColorStop::new(BLUE)],
        false,
    );
    assert!(*a == *b);
    assert!(*a != *repeating);
    assert!(*a != *conic);
    assert_eq!(conic.kind(), StyleImageKind::GradientImage);
}

#[test]
fn named_and_paint_images_use_their_backend_hooks() {
    let named = StyleNamedImage::create("apple-pay-logo-black");
    let paint = StylePaintImage::create("checkerboard");
    let mut backend = RecordingBackend::new();
    let size = Size::new(16.0, 16.0);

    let first = named.image_for_renderer(None, size, false, &mut backend);
    paint.image_for_renderer(None, size, false, &mut backend);
    assert_eq!(
        backend.calls(),
        [
            BackendCall::NamedImage {
                name: "apple-pay-logo-black".into(),
                size,
            },
            BackendCall::PaintWorklet {
                name: "checkerboard".into(),
                size,
            },
        ]
    );
    assert_eq!(named.image_for_renderer(None, size, false, &mut backend), first);
    assert_eq!(backend.calls().len(), 2);

    assert_eq!(named.kind(), StyleImageKind::NamedImage);
    assert_eq!(paint.kind(), StyleImageKind::PaintImage);
    assert!(!named.image_has_natural_dimensions());
}

#[test]
fn named_and_paint_images_compare_by_name() {
    let a: Rc<dyn StyleImage> = StyleNamedImage::create("logo");
    let b: Rc<dyn StyleImage> = StyleNamedImage::create("logo");
    let paint: Rc<dyn StyleImage> = StylePaintImage::create("logo");
    assert!(*a == *b);
    assert!(*a != *paint);
}

#[test]
fn invalid_image_never_renders() {
    let image = StyleInvalidImage::create();
    let mut backend = RecordingBackend::new();
    let client = RecordingClient::new("renderer");
    image.add_client(client.handle());

    assert_eq!(image.kind(), StyleImageKind::InvalidImage);
    assert!(!image.is_pending());
    assert!(!image.can_render(None, 1.0));
    assert_eq!(
        image.image_for_renderer(None, Size::new(10.0, 10.0), false, &mut backend),
        Some(Image::Null)
    );
    assert!(backend.calls().is_empty());

    let other: Rc<dyn StyleImage> = StyleInvalidImage::create();
    assert!(image.equals(&*other));
}
