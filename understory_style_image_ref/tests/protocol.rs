// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The client protocol shared by every variant, and nested composition.

use std::cell::RefCell;
use std::rc::Rc;

use kurbo::Size;
use peniko::Color;
use understory_style_image::{
    ColorStop, DecodingStatus, DocumentId, FilterOperation, FilterOperations, GradientData,
    Image, ImageAnimatingState, ImageId, ImageSetOption, LinearDirection, LoaderOptions,
    RawImage, ResolvedUrl, StyleCachedImage, StyleCrossfadeImage, StyleFilterImage,
    StyleGradientImage, StyleImage, StyleImageKind, StyleImageSet, VisibleInViewport,
};
use understory_style_image_ref::{
    BackendCall, ClientEvent, FIRST_BACKEND_IMAGE_ID, RecordingBackend, RecordingClient,
    RefLoader, RefResource,
};

fn loaded(url: &str, id: u32) -> (Rc<RefResource>, Rc<dyn StyleImage>) {
    let resource = RefResource::new(url);
    let image: Rc<dyn StyleImage> = StyleCachedImage::create_from_resource(resource.clone(), 1.0);
    let size = Size::new(20.0, 20.0);
    resource.load_with(RawImage::raster(Image::raster(ImageId(id), size), size));
    (resource, image)
}

fn every_variant() -> Vec<Rc<dyn StyleImage>> {
    let (_, input) = loaded("https://example.com/a.png", 1);
    let cached: Rc<dyn StyleImage> =
        StyleCachedImage::create(ResolvedUrl::absolute("https://example.com/b.png"), 1.0);
    let gradient: Rc<dyn StyleImage> = StyleGradientImage::create(
        GradientData::Linear {
            direction: LinearDirection::default(),
        },
        vec![
            ColorStop::new(Color::from_rgb8(0, 0, 0)),
            ColorStop::new(Color::from_rgb8(255, 255, 255)),
        ],
        false,
    );
    let crossfade: Rc<dyn StyleImage> =
        StyleCrossfadeImage::create(Some(input.clone()), None, 0.5, false);
    let filter: Rc<dyn StyleImage> = StyleFilterImage::create(Some(input), FilterOperations::new());
    let set: Rc<dyn StyleImage> =
        StyleImageSet::create(vec![ImageSetOption::new(cached.clone(), 1.0)]);
    vec![cached, gradient, crossfade, filter, set]
}

#[test]
fn registration_is_counted_for_every_variant() {
    for image in every_variant() {
        let client = RecordingClient::new("renderer");
        let handle = client.handle();

        image.add_client(handle.clone());
        image.add_client(handle.clone());
        image.remove_client(&handle);
        assert!(image.has_client(&handle), "{:?} dropped a counted client", image.kind());
        assert!(client.events().is_empty(), "{:?} notified early", image.kind());

        image.remove_client(&handle);
        assert!(!image.has_client(&handle), "{:?} kept the client", image.kind());
        assert_eq!(
            client.take_events(),
            [ClientEvent::Removed { kind: image.kind() }],
            "{:?} removal notification",
            image.kind()
        );

        // Removing an unknown client is silent.
        image.remove_client(&handle);
        assert!(client.events().is_empty(), "{:?} notified twice", image.kind());
    }
}

#[test]
fn cached_image_end_to_end() {
    let mut loader = RefLoader::new();
    let url = ResolvedUrl::new("a.png", "https://example.com/a.png");
    let image = StyleCachedImage::create(url, 1.0);
    let renderer = RecordingClient::new("renderer");
    image.add_client(renderer.handle());
    image.load(&mut loader, &LoaderOptions::default());
    assert!(!image.is_pending());

    let resource = loader.resource("https://example.com/a.png").unwrap();
    let size = Size::new(8.0, 8.0);
    resource.create_image(RawImage::raster(Image::raster(ImageId(1), size), size));
    resource.change(None);
    assert_eq!(
        renderer.events(),
        [ClientEvent::Changed {
            kind: StyleImageKind::CachedImage,
            rect: None
        }]
    );
}

#[test]
fn images_do_not_keep_clients_alive() {
    let (resource, image) = loaded("https://example.com/a.png", 1);
    let gone = RecordingClient::new("gone");
    let kept = RecordingClient::new("kept");
    image.add_client(gone.handle());
    image.add_client(kept.handle());

    let weak = Rc::downgrade(&gone);
    drop(gone);
    assert!(weak.upgrade().is_none());

    resource.change(None);
    assert_eq!(
        kept.events(),
        [ClientEvent::Changed {
            kind: StyleImageKind::CachedImage,
            rect: None
        }]
    );
}

#[test]
fn a_client_may_remove_a_later_client_during_dispatch() {
    let (resource, image) = loaded("https://example.com/a.png", 1);
    let first = RecordingClient::new("first");
    let second = RecordingClient::new("second");
    image.add_client(first.handle());
    image.add_client(second.handle());

    let second_handle = second.handle();
    first.on_changed(move |_, image| image.remove_client(&second_handle));
    resource.change(None);

    assert_eq!(
        first.events(),
        [ClientEvent::Changed {
            kind: StyleImageKind::CachedImage,
            rect: None
        }]
    );
    assert_eq!(
        second.events(),
        [ClientEvent::Removed {
            kind: StyleImageKind::CachedImage
        }]
    );
    assert!(image.has_client(&first.handle()));
}

#[test]
fn a_client_may_remove_itself_during_dispatch() {
    let (resource, image) = loaded("https://example.com/a.png", 1);
    let client = RecordingClient::new("renderer");
    let handle = client.handle();
    image.add_client(handle.clone());
    client.on_changed(move |_, image| image.remove_client(&handle));

    resource.change(None);
    resource.change(None);
    assert_eq!(
        client.count(|event| matches!(event, ClientEvent::Changed { .. })),
        1
    );
}

#[test]
fn nested_composites_render_and_invalidate_together() {
    let (from_resource, from) = loaded("https://example.com/a.png", 1);
    let (_, to) = loaded("https://example.com/b.png", 2);
    let crossfade: Rc<dyn StyleImage> =
        StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);
    let filter = StyleFilterImage::create(
        Some(crossfade),
        FilterOperations::from(vec![FilterOperation::Invert(1.0)]),
    );
    let client = RecordingClient::new("renderer");
    let second = RecordingClient::new("second");
    filter.add_client(client.handle());
    filter.add_client(second.handle());
    let order = Rc::new(RefCell::new(Vec::new()));
    for (name, recorder) in [("first", &client), ("second", &second)] {
        let order = order.clone();
        recorder.on_changed(move |_, _| order.borrow_mut().push(name));
    }
    let mut backend = RecordingBackend::new();
    let size = Size::new(20.0, 20.0);

    let rendered = filter.image_for_renderer(None, size, false, &mut backend);
    assert_eq!(
        rendered,
        Some(Image::raster(ImageId(FIRST_BACKEND_IMAGE_ID + 2), size))
    );
    assert_eq!(
        backend.calls(),
        [
            BackendCall::Crossfade {
                from: Image::raster(ImageId(1), size),
                to: Image::raster(ImageId(2), size),
                percentage: 0.5,
                size,
            },
            BackendCall::RenderAt {
                source: Image::raster(ImageId(FIRST_BACKEND_IMAGE_ID), size),
                size,
            },
            BackendCall::ComposeFilter {
                source: Image::raster(ImageId(FIRST_BACKEND_IMAGE_ID + 1), size),
                operations: vec![FilterOperation::Invert(1.0)],
                size,
            },
        ]
    );

    from_resource.change(None);
    assert_eq!(
        client.events(),
        [ClientEvent::Changed {
            kind: StyleImageKind::FilterImage,
            rect: None
        }]
    );
    assert_eq!(*order.borrow(), ["first", "second"]);
    filter.image_for_renderer(None, size, false, &mut backend);
    assert_eq!(backend.calls().len(), 6);
}

#[test]
fn queries_reach_the_resource_through_nesting() {
    let (resource, input) = loaded("https://example.com/a.png", 1);
    let crossfade: Rc<dyn StyleImage> = StyleCrossfadeImage::create(Some(input), None, 0.5, false);
    let filter = StyleFilterImage::create(Some(crossfade), FilterOperations::new());
    let client = RecordingClient::new("renderer");
    filter.add_client(client.handle());

    assert_eq!(
        resource.visible_in_viewport(DocumentId(1)),
        VisibleInViewport::No
    );
    client.set_visible(VisibleInViewport::Yes);
    assert_eq!(
        resource.visible_in_viewport(DocumentId(1)),
        VisibleInViewport::Yes
    );

    let visible = resource.frame_available(ImageAnimatingState::Yes, None, DecodingStatus::Complete);
    assert_eq!(visible, VisibleInViewport::Yes);
    assert_eq!(
        client.events(),
        [ClientEvent::FrameAvailable {
            kind: StyleImageKind::FilterImage,
            state: ImageAnimatingState::Yes
        }]
    );
}

#[test]
fn dropping_the_outer_composite_releases_the_tree() {
    let (resource, input) = loaded("https://example.com/a.png", 1);
    let crossfade = StyleCrossfadeImage::create(Some(input.clone()), None, 0.5, false);
    let weak_crossfade = Rc::downgrade(&crossfade);
    let filter = StyleFilterImage::create(Some(crossfade), FilterOperations::new());
    assert_eq!(Rc::strong_count(&input), 2);

    drop(filter);
    assert!(weak_crossfade.upgrade().is_none());
    assert_eq!(Rc::strong_count(&input), 1);
    assert_eq!(resource.client_count(), 1);
}
