// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Images computed from parameters and other images.
//!
//! Every generated image carries a [`GeneratedImageBase`]: its client set,
//! whether it has a fixed (input-derived) size or sizes itself from its
//! container, the per-renderer container sizes, and a render cache keyed by
//! requested size.
//!
//! Composites ([`StyleCrossfadeImage`], [`StyleFilterImage`]) register as
//! clients of their inputs when constructed and unregister when dropped.
//! Input events are re-published to the composite's own clients with the
//! composite as the source image.

use core::cell::{Cell, RefCell};

use hashbrown::HashMap;
use kurbo::{Rect, Size};

use crate::client::{ClientHandle, ImageClients};
use crate::geometry::{LayoutSize, LayoutUnit};
use crate::image::Image;
use crate::loader::CachedImageResource;
use crate::style_image::StyleImage;
use crate::types::{
    ContainerContext, DocumentId, ElementSet, ImageAnimatingState, RendererId, VisibleInViewport,
};

mod canvas;
mod crossfade;
mod filter;
mod gradient;
mod invalid;
mod named;

pub use canvas::{CanvasElement, CanvasObserver, CanvasRegistry, StyleCanvasImage};
pub use crossfade::StyleCrossfadeImage;
pub use filter::StyleFilterImage;
pub use gradient::{
    ColorStop, GradientData, GradientPosition, HorizontalSide, LengthPercentage, LinearDirection,
    RadialExtent, RadialSize, StyleGradientImage, VerticalSide,
};
pub use invalid::StyleInvalidImage;
pub use named::{StyleNamedImage, StylePaintImage};

/// Most rendered sizes a generated image keeps at once.
pub const GENERATED_IMAGE_CACHE_CAPACITY: usize = 8;

/// Bit-exact cache key for a requested size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct SizeKey(u64, u64);

impl SizeKey {
    fn new(size: Size) -> Self {
        Self(size.width.to_bits(), size.height.to_bits())
    }
}

/// Rendered results keyed by size, evicting the least recently used.
#[derive(Debug, Default)]
pub(crate) struct RenderCache {
    entries: HashMap<SizeKey, (Image, u64)>,
    clock: u64,
}

impl RenderCache {
    pub(crate) fn get(&mut self, size: Size) -> Option<Image> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(&SizeKey::new(size)).map(|(image, used)| {
            *used = clock;
            *image
        })
    }

    pub(crate) fn insert(&mut self, size: Size, image: Image) {
        self.clock += 1;
        let key = SizeKey::new(size);
        if !self.entries.contains_key(&key) && self.entries.len() >= GENERATED_IMAGE_CACHE_CAPACITY
        {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, used))| *used)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                log::trace!("evicting generated image rendered at {oldest:?}");
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key, (image, self.clock));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// State shared by every generated image.
#[derive(Debug)]
pub(crate) struct GeneratedImageBase {
    clients: ImageClients,
    fixed_size: bool,
    load_called: Cell<bool>,
    container_sizes: RefCell<HashMap<RendererId, Size>>,
    last_container_size: Cell<Size>,
    cache: RefCell<RenderCache>,
}

impl GeneratedImageBase {
    pub(crate) fn new(fixed_size: bool) -> Self {
        Self {
            clients: ImageClients::default(),
            fixed_size,
            load_called: Cell::new(false),
            container_sizes: RefCell::default(),
            last_container_size: Cell::new(Size::ZERO),
            cache: RefCell::default(),
        }
    }

    pub(crate) fn add_client(&self, client: ClientHandle) {
        self.clients.add(client);
    }

    pub(crate) fn remove_client(&self, image: &dyn StyleImage, client: &ClientHandle) {
        self.clients.remove(image, client);
    }

    pub(crate) fn has_client(&self, client: &ClientHandle) -> bool {
        self.clients.contains(client)
    }

    /// Records the one allowed `load()`; returns `false` for repeats.
    pub(crate) fn begin_load(&self, image: &dyn StyleImage) -> bool {
        if self.load_called.replace(true) {
            log::warn!("load() called more than once for a {:?}", image.kind());
            return false;
        }
        true
    }

    /// Size for layout: the fixed size scaled by `multiplier`, or the
    /// renderer's container size for resizable images.
    pub(crate) fn image_size(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        fixed_size: impl FnOnce() -> LayoutSize,
    ) -> LayoutSize {
        if !self.fixed_size {
            return LayoutSize::from_size(self.container_size(renderer));
        }
        let fixed = fixed_size();
        if multiplier == 1.0 {
            return fixed;
        }
        let mut scaled = fixed.scaled(multiplier, multiplier);
        // Zooming never shrinks a visible dimension below one pixel.
        if fixed.width.is_positive() {
            scaled.width = scaled.width.max(LayoutUnit::ONE);
        }
        if fixed.height.is_positive() {
            scaled.height = scaled.height.max(LayoutUnit::ONE);
        }
        scaled
    }

    pub(crate) fn is_fixed_size(&self) -> bool {
        self.fixed_size
    }

    pub(crate) fn set_container_context(&self, renderer: RendererId, context: &ContainerContext) {
        self.container_sizes
            .borrow_mut()
            .insert(renderer, context.size);
        self.last_container_size.set(context.size);
    }

    pub(crate) fn container_size(&self, renderer: Option<RendererId>) -> Size {
        renderer
            .and_then(|renderer| self.container_sizes.borrow().get(&renderer).copied())
            .unwrap_or_else(|| self.last_container_size.get())
    }

    pub(crate) fn cached_image(&self, size: Size) -> Option<Image> {
        self.cache.borrow_mut().get(size)
    }

    pub(crate) fn save_cached_image(&self, size: Size, image: Image) {
        self.cache.borrow_mut().insert(size, image);
    }

    pub(crate) fn invalidate_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    #[cfg(test)]
    pub(crate) fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Returns the cached render for `size`, or renders and caches it.
    ///
    /// A failed render yields the null-image sentinel and is not cached.
    pub(crate) fn cached_or_render(
        &self,
        size: Size,
        render: impl FnOnce() -> Option<Image>,
    ) -> Image {
        if let Some(image) = self.cached_image(size) {
            return image;
        }
        match render() {
            Some(image) => {
                self.save_cached_image(size, image);
                image
            }
            None => Image::Null,
        }
    }

    pub(crate) fn republish_changed(&self, image: &dyn StyleImage, rect: Option<Rect>) {
        self.invalidate_cache();
        self.clients
            .for_each(|_, client| client.style_image_changed(image, rect));
    }

    pub(crate) fn republish_finished_resource_load(
        &self,
        image: &dyn StyleImage,
        resource: &dyn CachedImageResource,
    ) {
        self.clients.for_each(|_, client| {
            client.style_image_finished_resource_load(image, resource);
        });
    }

    pub(crate) fn republish_finished_load(&self, image: &dyn StyleImage) {
        self.clients
            .for_each(|_, client| client.style_image_finished_load(image));
    }

    pub(crate) fn republish_scheduled_rendering_update(&self, image: &dyn StyleImage) {
        self.clients.for_each(|_, client| {
            client.style_image_needs_scheduled_rendering_update(image);
        });
    }

    /// Decoded data may go only if every client agrees.
    pub(crate) fn can_destroy_decoded_data(&self, image: &dyn StyleImage) -> bool {
        self.clients
            .all(|client| client.style_image_can_destroy_decoded_data(image))
    }

    /// Animation is allowed if any client allows it.
    pub(crate) fn animation_allowed(&self, image: &dyn StyleImage) -> bool {
        self.clients
            .any(|client| client.style_image_animation_allowed(image))
    }

    pub(crate) fn frame_available(
        &self,
        image: &dyn StyleImage,
        state: ImageAnimatingState,
        rect: Option<Rect>,
    ) -> VisibleInViewport {
        self.clients
            .any_visible(|client| client.style_image_frame_available(image, state, rect))
    }

    pub(crate) fn visible_in_viewport(
        &self,
        image: &dyn StyleImage,
        document: DocumentId,
    ) -> VisibleInViewport {
        self.clients
            .any_visible(|client| client.style_image_visible_in_viewport(image, document))
    }

    pub(crate) fn referencing_elements(&self, image: &dyn StyleImage) -> ElementSet {
        self.clients.referencing_elements(image)
    }
}

/// Logs and rejects input events that arrive before the inputs were loaded,
/// or from an image that is not an input.
pub(crate) fn accept_input_event(
    composite: &dyn StyleImage,
    is_input: bool,
    inputs_ready: bool,
) -> bool {
    if !is_input {
        log::warn!(
            "{:?} ignoring an event from an image that is not one of its inputs",
            composite.kind()
        );
        return false;
    }
    if !inputs_ready {
        log::warn!(
            "{:?} ignoring an input event received before its inputs were loaded",
            composite.kind()
        );
        return false;
    }
    true
}
