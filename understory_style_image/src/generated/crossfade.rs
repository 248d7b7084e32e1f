// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `cross-fade()` images.

use alloc::rc::{Rc, Weak};
use core::cell::Cell;
use core::fmt;

use kurbo::{Rect, Size};

use super::{GeneratedImageBase, accept_input_event};
use crate::backend::RenderBackend;
use crate::client::{ClientHandle, StyleImageClient};
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{CachedImageResource, LoaderOptions, ResourceLoader};
use crate::style_image::{StyleImage, StyleImageKind, images_equal, same_image};
use crate::types::{
    ContainerContext, DocumentId, ElementSet, ImageAnimatingState, RendererId,
    StyleImageSizeType, VisibleInViewport,
};

/// A blend of two images, `percentage` of the way from `from` to `to`.
///
/// Either input may be absent. The size is derived from the inputs, and
/// rendering needs both.
pub struct StyleCrossfadeImage {
    from: Option<Rc<dyn StyleImage>>,
    to: Option<Rc<dyn StyleImage>>,
    percentage: f64,
    is_prefixed: bool,
    base: GeneratedImageBase,
    this: ClientHandle,
    /// Which inputs (`from`, `to`) have reported a finished load.
    finished: Cell<[bool; 2]>,
    finished_load_sent: Cell<bool>,
}

impl StyleCrossfadeImage {
    /// Creates a crossfade and registers it with its inputs.
    #[must_use]
    pub fn create(
        from: Option<Rc<dyn StyleImage>>,
        to: Option<Rc<dyn StyleImage>>,
        percentage: f64,
        is_prefixed: bool,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let weak: Weak<Self> = this.clone();
            let weak: Weak<dyn StyleImageClient> = weak;
            let handle = ClientHandle::from_weak(weak);
            for input in from.iter().chain(to.iter()) {
                input.add_client(handle.clone());
            }
            Self {
                from,
                to,
                percentage,
                is_prefixed,
                base: GeneratedImageBase::new(true),
                this: handle,
                finished: Cell::new([false; 2]),
                finished_load_sent: Cell::new(false),
            }
        })
    }

    /// The image faded out of.
    #[must_use]
    pub fn from(&self) -> Option<&Rc<dyn StyleImage>> {
        self.from.as_ref()
    }

    /// The image faded into.
    #[must_use]
    pub fn to(&self) -> Option<&Rc<dyn StyleImage>> {
        self.to.as_ref()
    }

    /// Blend position: 0 shows only `from`, 1 only `to`.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Returns `true` for the `-webkit-cross-fade()` spelling.
    #[must_use]
    pub fn is_prefixed(&self) -> bool {
        self.is_prefixed
    }

    /// Returns `true` if both crossfades have structurally equal inputs.
    #[must_use]
    pub fn equal_input_images(&self, other: &Self) -> bool {
        images_equal(self.from.as_ref(), other.from.as_ref())
            && images_equal(self.to.as_ref(), other.to.as_ref())
    }

    /// Interpolates from `from` to `self` for a style transition.
    ///
    /// Both crossfades must have equal inputs and both inputs must be present;
    /// otherwise there is no meaningful interpolation and `None` is returned.
    #[must_use]
    pub fn blend(&self, from: &Self, progress: f64) -> Option<Rc<Self>> {
        if !self.equal_input_images(from) {
            log::warn!("cannot blend crossfades with different inputs");
            return None;
        }
        if self.from.is_none() || self.to.is_none() {
            return None;
        }
        let percentage = from.percentage + (self.percentage - from.percentage) * progress;
        Some(Self::create(
            self.from.clone(),
            self.to.clone(),
            percentage,
            self.is_prefixed && from.is_prefixed,
        ))
    }

    /// Size derived from the inputs.
    ///
    /// Equal input sizes are returned as-is so that animating the percentage
    /// never changes the size.
    #[must_use]
    pub fn fixed_size(&self, renderer: Option<RendererId>) -> LayoutSize {
        let size_of = |image: &Rc<dyn StyleImage>| {
            image.image_size_for_renderer(renderer, 1.0, StyleImageSizeType::Used)
        };
        #[expect(clippy::cast_possible_truncation, reason = "percentages are in [0, 1]")]
        let progress = self.percentage as f32;
        match (self.from.as_ref().map(size_of), self.to.as_ref().map(size_of)) {
            (Some(from), Some(to)) if from == to => from,
            (Some(from), Some(to)) => LayoutSize::blend(from, to, progress),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => LayoutSize::ZERO,
        }
    }

    fn inputs(&self) -> impl Iterator<Item = &Rc<dyn StyleImage>> + '_ {
        self.from.iter().chain(self.to.iter())
    }

    fn is_input(&self, image: &dyn StyleImage) -> bool {
        self.inputs().any(|input| same_image(&**input, image))
    }

    fn inputs_ready(&self) -> bool {
        self.inputs().all(|input| !input.is_pending())
    }

    fn accept(&self, image: &dyn StyleImage) -> bool {
        accept_input_event(self, self.is_input(image), self.inputs_ready())
    }
}

impl fmt::Debug for StyleCrossfadeImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleCrossfadeImage")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("percentage", &self.percentage)
            .field("is_prefixed", &self.is_prefixed)
            .finish_non_exhaustive()
    }
}

impl Drop for StyleCrossfadeImage {
    fn drop(&mut self) {
        for input in self.from.iter().chain(self.to.iter()) {
            input.remove_client(&self.this);
        }
    }
}

impl StyleImage for StyleCrossfadeImage {
    fn kind(&self) -> StyleImageKind {
        StyleImageKind::CrossfadeImage
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| self.equal_input_images(other) && self.percentage == other.percentage)
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
        self.inputs().any(|input| input.is_pending())
    }

    fn load(&self, loader: &mut dyn ResourceLoader, options: &LoaderOptions) {
        if !self.base.begin_load(self) {
            return;
        }
        for input in self.inputs() {
            if input.is_pending() {
                input.load(loader, options);
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.inputs().all(|input| input.is_loaded())
    }

    fn error_occurred(&self) -> bool {
        self.inputs().any(|input| input.error_occurred())
    }

    fn image_size_for_renderer(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        _size_type: StyleImageSizeType,
    ) -> LayoutSize {
        self.base
            .image_size(renderer, multiplier, || self.fixed_size(renderer))
    }

    fn image_has_natural_dimensions(&self) -> bool {
        self.base.is_fixed_size()
    }

    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext) {
        self.base.set_container_context(renderer, &context);
    }

    fn image_for_renderer(
        &self,
        renderer: Option<RendererId>,
        size: Size,
        is_for_first_line: bool,
        backend: &mut dyn RenderBackend,
    ) -> Option<Image> {
        if self.is_pending() || size.is_zero_area() {
            return Some(Image::Null);
        }
        let (Some(from), Some(to)) = (&self.from, &self.to) else {
            return Some(Image::Null);
        };
        if let Some(image) = self.base.cached_image(size) {
            return Some(image);
        }
        let from_image = from.image_for_renderer(renderer, size, is_for_first_line, backend);
        let to_image = to.image_for_renderer(renderer, size, is_for_first_line, backend);
        let (Some(from_image), Some(to_image)) = (from_image, to_image) else {
            return Some(Image::Null);
        };
        let percentage = self.percentage;
        Some(self.base.cached_or_render(size, || {
            backend.crossfade(&from_image, &to_image, percentage, size)
        }))
    }

    fn known_to_be_opaque(&self, renderer: Option<RendererId>) -> bool {
        self.inputs()
            .all(|input| input.known_to_be_opaque(renderer))
    }
}

impl StyleImageClient for StyleCrossfadeImage {
    fn style_image_changed(&self, image: &dyn StyleImage, rect: Option<Rect>) {
        if self.accept(image) {
            self.base.republish_changed(self, rect);
        }
    }

    fn style_image_finished_resource_load(
        &self,
        image: &dyn StyleImage,
        resource: &dyn CachedImageResource,
    ) {
        if self.accept(image) {
            self.base.republish_finished_resource_load(self, resource);
        }
    }

    fn style_image_finished_load(&self, image: &dyn StyleImage) {
        if !self.accept(image) {
            return;
        }
        let mut finished = self.finished.get();
        for (slot, input) in [&self.from, &self.to].into_iter().enumerate() {
            if input.as_ref().is_some_and(|input| same_image(&**input, image)) {
                finished[slot] = true;
            }
        }
        self.finished.set(finished);

        let all_finished = [&self.from, &self.to]
            .into_iter()
            .zip(finished)
            .all(|(input, done)| done || input.as_ref().is_none_or(|input| input.is_loaded()));
        if all_finished && !self.finished_load_sent.replace(true) {
            self.base.republish_finished_load(self);
        }
    }

    fn style_image_needs_scheduled_rendering_update(&self, image: &dyn StyleImage) {
        if self.accept(image) {
            self.base.republish_scheduled_rendering_update(self);
        }
    }

    fn style_image_can_destroy_decoded_data(&self, image: &dyn StyleImage) -> bool {
        self.accept(image) && self.base.can_destroy_decoded_data(self)
    }

    fn style_image_animation_allowed(&self, image: &dyn StyleImage) -> bool {
        self.accept(image) && self.base.animation_allowed(self)
    }

    fn style_image_frame_available(
        &self,
        image: &dyn StyleImage,
        state: ImageAnimatingState,
        rect: Option<Rect>,
    ) -> VisibleInViewport {
        if !self.accept(image) {
            return VisibleInViewport::No;
        }
        self.base.frame_available(self, state, rect)
    }

    fn style_image_visible_in_viewport(
        &self,
        image: &dyn StyleImage,
        document: DocumentId,
    ) -> VisibleInViewport {
        if !self.accept(image) {
            return VisibleInViewport::No;
        }
        self.base.visible_in_viewport(self, document)
    }

    fn style_image_referencing_elements(&self, image: &dyn StyleImage) -> ElementSet {
        if !self.accept(image) {
            return ElementSet::new();
        }
        self.base.referencing_elements(self)
    }
}
