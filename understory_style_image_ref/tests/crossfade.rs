// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `StyleCrossfadeImage` composition over cached inputs.

use std::rc::Rc;

use kurbo::{Rect, Size};
use understory_style_image::{
    DocumentId, ElementId, ElementSet, Image, ImageId, LayoutSize, LoaderOptions, RawImage,
    ResolvedUrl, ResourceStatus, StyleCachedImage, StyleCrossfadeImage, StyleImage,
    StyleImageClient, StyleImageKind, StyleImageSizeType, VisibleInViewport,
};
use understory_style_image_ref::{
    BackendCall, ClientEvent, FIRST_BACKEND_IMAGE_ID, RecordingBackend, RecordingClient,
    RefLoader, RefResource,
};

const FROM: &str = "https://example.com/from.png";
const TO: &str = "https://example.com/to.png";
const KIND: StyleImageKind = StyleImageKind::CrossfadeImage;

fn input(url: &str) -> (Rc<RefResource>, Rc<dyn StyleImage>) {
    let resource = RefResource::new(url);
    let image: Rc<dyn StyleImage> = StyleCachedImage::create_from_resource(resource.clone(), 1.0);
    (resource, image)
}

fn raster(id: u32, width: f64, height: f64) -> RawImage {
    let size = Size::new(width, height);
    RawImage::raster(Image::raster(ImageId(id), size), size)
}

#[test]
fn input_events_are_republished_as_the_crossfade() {
    let (from_resource, from) = input(FROM);
    let (to_resource, to) = input(TO);
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);
    let client = RecordingClient::new("renderer");
    crossfade.add_client(client.handle());

    let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
    from_resource.change(Some(rect));
    to_resource.schedule_rendering_update();

    assert_eq!(
        client.events(),
        [
            ClientEvent::Changed {
                kind: KIND,
                rect: Some(rect)
            },
            ClientEvent::ScheduledRenderingUpdate { kind: KIND },
        ]
    );
}

#[test]
fn finished_load_waits_for_both_inputs() {
    let (from_resource, from) = input(FROM);
    let (to_resource, to) = input(TO);
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);
    let client = RecordingClient::new("renderer");
    crossfade.add_client(client.handle());

    from_resource.load_with(raster(1, 10.0, 10.0));
    assert_eq!(
        client.take_events(),
        [ClientEvent::FinishedResourceLoad {
            kind: KIND,
            url: FROM.into()
        }]
    );
    assert!(!crossfade.is_loaded());

    to_resource.load_with(raster(2, 10.0, 10.0));
    assert_eq!(
        client.take_events(),
        [
            ClientEvent::FinishedResourceLoad {
                kind: KIND,
                url: TO.into()
            },
            ClientEvent::FinishedLoad { kind: KIND },
        ]
    );
    assert!(crossfade.is_loaded());

    // Each resource still reports, but the aggregate is sent once.
    to_resource.finish(ResourceStatus::Loaded);
    assert_eq!(
        client.take_events(),
        [ClientEvent::FinishedResourceLoad {
            kind: KIND,
            url: TO.into()
        }]
    );
}

#[test]
fn events_before_the_inputs_load_are_dropped() {
    let mut loader = RefLoader::new();
    let pending: Rc<dyn StyleImage> = StyleCachedImage::create(ResolvedUrl::absolute(FROM), 1.0);
    let (to_resource, to) = input(TO);
    let crossfade = StyleCrossfadeImage::create(Some(pending.clone()), Some(to), 0.5, false);
    let client = RecordingClient::new("renderer");
    crossfade.add_client(client.handle());
    assert!(crossfade.is_pending());

    to_resource.change(None);
    assert!(client.events().is_empty());

    pending.load(&mut loader, &LoaderOptions::default());
    assert!(!crossfade.is_pending());
    to_resource.change(None);
    assert_eq!(
        client.events(),
        [ClientEvent::Changed {
            kind: KIND,
            rect: None
        }]
    );
}

#[test]
fn load_forwards_to_pending_inputs_once() {
    let mut loader = RefLoader::new();
    let from: Rc<dyn StyleImage> = StyleCachedImage::create(ResolvedUrl::absolute(FROM), 1.0);
    let to: Rc<dyn StyleImage> = StyleCachedImage::create(ResolvedUrl::absolute(TO), 1.0);
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);

    crossfade.load(&mut loader, &LoaderOptions::default());
    assert!(!crossfade.is_pending());
    let urls: Vec<_> = loader.requests().iter().map(|r| r.url.as_str()).collect();
    assert_eq!(urls, [FROM, TO]);

    crossfade.load(&mut loader, &LoaderOptions::default());
    assert_eq!(loader.requests().len(), 2);
}

#[test]
fn renders_through_the_backend_and_caches_by_size() {
    let (from_resource, from) = input(FROM);
    let (to_resource, to) = input(TO);
    from_resource.load_with(raster(1, 10.0, 10.0));
    to_resource.load_with(raster(2, 10.0, 10.0));
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.25, false);
    let mut backend = RecordingBackend::new();
    let size = Size::new(10.0, 10.0);

    let rendered = crossfade.image_for_renderer(None, size, false, &mut backend);
    assert_eq!(
        rendered,
        Some(Image::raster(ImageId(FIRST_BACKEND_IMAGE_ID), size))
    );
    assert_eq!(
        backend.calls(),
        [BackendCall::Crossfade {
            from: Image::raster(ImageId(1), size),
            to: Image::raster(ImageId(2), size),
            percentage: 0.25,
            size,
        }]
    );

    assert_eq!(
        crossfade.image_for_renderer(None, size, false, &mut backend),
        rendered
    );
    assert_eq!(backend.calls().len(), 1);

    crossfade.image_for_renderer(None, Size::new(20.0, 20.0), false, &mut backend);
    assert_eq!(backend.calls().len(), 2);

    // A change in an input invalidates every cached size.
    from_resource.change(None);
    crossfade.image_for_renderer(None, size, false, &mut backend);
    assert_eq!(backend.calls().len(), 3);
}

#[test]
fn missing_inputs_render_the_null_image() {
    let (from_resource, from) = input(FROM);
    from_resource.load_with(raster(1, 10.0, 10.0));
    let crossfade = StyleCrossfadeImage::create(Some(from), None, 0.5, false);
    let mut backend = RecordingBackend::new();

    assert_eq!(
        crossfade.image_for_renderer(None, Size::new(10.0, 10.0), false, &mut backend),
        Some(Image::Null)
    );
    assert!(backend.calls().is_empty());
}

#[test]
fn backend_failures_are_not_cached() {
    let (from_resource, from) = input(FROM);
    let (to_resource, to) = input(TO);
    from_resource.load_with(raster(1, 10.0, 10.0));
    to_resource.load_with(raster(2, 10.0, 10.0));
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);
    let mut backend = RecordingBackend::new();
    let size = Size::new(10.0, 10.0);

    backend.set_failing(true);
    assert_eq!(
        crossfade.image_for_renderer(None, size, false, &mut backend),
        Some(Image::Null)
    );

    backend.set_failing(false);
    let rendered = crossfade.image_for_renderer(None, size, false, &mut backend);
    assert!(rendered.is_some_and(|image| !image.is_null()));
    assert_eq!(backend.calls().len(), 2);
}

#[test]
fn size_blends_between_input_sizes() {
    let (from_resource, from) = input(FROM);
    let (to_resource, to) = input(TO);
    from_resource.load_with(raster(1, 40.0, 20.0));
    to_resource.load_with(raster(2, 80.0, 40.0));

    let halfway = StyleCrossfadeImage::create(Some(from.clone()), Some(to.clone()), 0.5, false);
    assert_eq!(
        halfway.image_size_for_renderer(None, 1.0, StyleImageSizeType::Used),
        LayoutSize::from_ints(60, 30)
    );
    assert!(halfway.image_has_natural_dimensions());

    let same = StyleCrossfadeImage::create(Some(from.clone()), Some(from.clone()), 0.3, false);
    assert_eq!(same.fixed_size(None), LayoutSize::from_ints(40, 20));

    let single = StyleCrossfadeImage::create(None, Some(to), 0.5, false);
    assert_eq!(single.fixed_size(None), LayoutSize::from_ints(80, 40));
}

#[test]
fn opaque_only_when_both_inputs_are() {
    let (from_resource, from) = input(FROM);
    let (to_resource, to) = input(TO);
    from_resource.load_with(raster(1, 10.0, 10.0).opaque(true));
    to_resource.load_with(raster(2, 10.0, 10.0));
    let crossfade = StyleCrossfadeImage::create(Some(from.clone()), Some(to), 0.5, false);
    assert!(!crossfade.known_to_be_opaque(None));

    let both_opaque = StyleCrossfadeImage::create(Some(from.clone()), Some(from), 0.5, false);
    assert!(both_opaque.known_to_be_opaque(None));
}

#[test]
fn blending_interpolates_the_percentage() {
    let (_, from) = input(FROM);
    let (_, to) = input(TO);
    let start = StyleCrossfadeImage::create(Some(from.clone()), Some(to.clone()), 0.2, false);
    let end = StyleCrossfadeImage::create(Some(from.clone()), Some(to.clone()), 0.6, true);

    let blended = end.blend(&start, 0.5).unwrap();
    assert!((blended.percentage() - 0.4).abs() < 1e-9);
    assert!(!blended.is_prefixed());
    assert!(Rc::ptr_eq(blended.from().unwrap(), &from));

    let (_, other) = input("https://example.com/other.png");
    let unrelated = StyleCrossfadeImage::create(Some(from.clone()), Some(other), 0.2, false);
    assert!(end.blend(&unrelated, 0.5).is_none());

    let half = StyleCrossfadeImage::create(Some(from.clone()), None, 0.2, false);
    let half_end = StyleCrossfadeImage::create(Some(from), None, 0.6, false);
    assert!(half_end.blend(&half, 0.5).is_none());
}

#[test]
fn equality_compares_inputs_and_percentage() {
    let (_, a_from) = input(FROM);
    let (_, a_to) = input(TO);
    let (_, b_from) = input(FROM);
    let (_, b_to) = input(TO);

    let a: Rc<dyn StyleImage> =
        StyleCrossfadeImage::create(Some(a_from.clone()), Some(a_to.clone()), 0.5, false);
    let b: Rc<dyn StyleImage> = StyleCrossfadeImage::create(Some(b_from), Some(b_to), 0.5, false);
    let c: Rc<dyn StyleImage> = StyleCrossfadeImage::create(Some(a_from), Some(a_to), 0.7, false);
    assert!(*a == *b);
    assert!(*a != *c);
}

#[test]
fn queries_aggregate_through_the_crossfade() {
    let (from_resource, from) = input(FROM);
    let (_, to) = input(TO);
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);
    let a = RecordingClient::new("a");
    let b = RecordingClient::new("b");
    crossfade.add_client(a.handle());
    crossfade.add_client(b.handle());

    let document = DocumentId(7);
    assert_eq!(
        from_resource.visible_in_viewport(document),
        VisibleInViewport::No
    );
    b.set_visible(VisibleInViewport::Yes);
    assert_eq!(
        from_resource.visible_in_viewport(document),
        VisibleInViewport::Yes
    );

    assert!(from_resource.can_destroy_decoded_data());
    a.set_can_destroy_decoded_data(false);
    assert!(!from_resource.can_destroy_decoded_data());

    a.set_animation_allowed(false);
    b.set_animation_allowed(false);
    assert!(!from_resource.allows_animation());
}

#[test]
fn referencing_elements_are_the_union_over_clients() {
    let (_, from) = input(FROM);
    let (_, to) = input(TO);
    let (_, stranger) = input("https://example.com/stranger.png");
    let crossfade = StyleCrossfadeImage::create(Some(from.clone()), Some(to.clone()), 0.5, false);
    let a = RecordingClient::new("a");
    let b = RecordingClient::new("b");
    crossfade.add_client(a.handle());
    crossfade.add_client(b.handle());

    let mut first = ElementSet::new();
    first.insert(ElementId(1));
    first.insert(ElementId(2));
    a.set_elements(first);
    let mut second = ElementSet::new();
    second.insert(ElementId(3));
    b.set_elements(second);

    for source in [&from, &to] {
        let elements = crossfade.style_image_referencing_elements(&**source);
        assert_eq!(elements.len(), 3);
        for id in 1..=3 {
            assert!(elements.contains(&ElementId(id)), "missing element {id}");
        }
    }
    assert!(crossfade.style_image_referencing_elements(&*stranger).is_empty());
}

#[test]
fn dropping_the_crossfade_releases_its_inputs() {
    let (from_resource, from) = input(FROM);
    let (_, to) = input(TO);
    let crossfade = StyleCrossfadeImage::create(Some(from.clone()), Some(to.clone()), 0.5, false);
    assert_eq!(Rc::strong_count(&from), 2);

    drop(crossfade);
    assert_eq!(Rc::strong_count(&from), 1);
    assert_eq!(Rc::strong_count(&to), 1);

    // The input no longer knows the crossfade.
    from_resource.change(None);
}

#[test]
fn client_removal_names_the_crossfade() {
    let (_, from) = input(FROM);
    let crossfade = StyleCrossfadeImage::create(Some(from), None, 0.5, true);
    let client = RecordingClient::new("renderer");
    let handle = client.handle();
    crossfade.add_client(handle.clone());
    crossfade.remove_client(&handle);
    assert_eq!(client.events(), [ClientEvent::Removed { kind: KIND }]);
    assert!(crossfade.is_prefixed());
}

#[test]
fn loading_pending_inputs_end_to_end() {
    let mut loader = RefLoader::new();
    let from: Rc<dyn StyleImage> = StyleCachedImage::create(ResolvedUrl::absolute(FROM), 1.0);
    let to: Rc<dyn StyleImage> = StyleCachedImage::create(ResolvedUrl::absolute(TO), 1.0);
    let crossfade = StyleCrossfadeImage::create(Some(from), Some(to), 0.5, false);
    assert!(crossfade.is_pending());

    crossfade.load(&mut loader, &LoaderOptions::default());
    let from_resource = loader.resource(FROM).unwrap();
    let to_resource = loader.resource(TO).unwrap();
    from_resource.load_with(raster(1, 10.0, 10.0).opaque(true));
    to_resource.load_with(raster(2, 20.0, 20.0).opaque(true));

    assert!(!crossfade.is_pending());
    assert!(crossfade.is_loaded());
    assert_eq!(crossfade.fixed_size(None), LayoutSize::from_ints(15, 15));
    assert!(crossfade.known_to_be_opaque(None));
}
