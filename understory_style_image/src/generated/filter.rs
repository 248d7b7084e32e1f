// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `filter()` images.

use alloc::rc::{Rc, Weak};
use core::fmt;

use kurbo::{Rect, Size};

use super::{GeneratedImageBase, accept_input_event};
use crate::backend::RenderBackend;
use crate::client::{ClientHandle, StyleImageClient};
use crate::filter_operation::FilterOperations;
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{CachedImageResource, LoaderOptions, ResourceLoader};
use crate::style_image::{StyleImage, StyleImageKind, images_equal, same_image};
use crate::types::{
    ContainerContext, DocumentId, ElementSet, ImageAnimatingState, RendererId,
    StyleImageSizeType, VisibleInViewport,
};

/// An input image with a list of CSS filters applied.
///
/// Filters never change geometry, so the size is the input's size. The
/// result is never assumed opaque.
pub struct StyleFilterImage {
    input: Option<Rc<dyn StyleImage>>,
    operations: FilterOperations,
    base: GeneratedImageBase,
    this: ClientHandle,
}

impl StyleFilterImage {
    /// Creates a filter image and registers it with its input.
    #[must_use]
    pub fn create(input: Option<Rc<dyn StyleImage>>, operations: FilterOperations) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let weak: Weak<Self> = this.clone();
            let weak: Weak<dyn StyleImageClient> = weak;
            let handle = ClientHandle::from_weak(weak);
            if let Some(input) = &input {
                input.add_client(handle.clone());
            }
            Self {
                input,
                operations,
                base: GeneratedImageBase::new(true),
                this: handle,
            }
        })
    }

    /// The filtered image.
    #[must_use]
    pub fn input(&self) -> Option<&Rc<dyn StyleImage>> {
        self.input.as_ref()
    }

    /// The filters, in application order.
    #[must_use]
    pub fn operations(&self) -> &FilterOperations {
        &self.operations
    }

    /// The input's size.
    #[must_use]
    pub fn fixed_size(&self, renderer: Option<RendererId>) -> LayoutSize {
        self.input.as_ref().map_or(LayoutSize::ZERO, |input| {
            input.image_size_for_renderer(renderer, 1.0, StyleImageSizeType::Used)
        })
    }

    fn accept(&self, image: &dyn StyleImage) -> bool {
        let is_input = self
            .input
            .as_ref()
            .is_some_and(|input| same_image(&**input, image));
        let ready = self.input.as_ref().is_none_or(|input| !input.is_pending());
        accept_input_event(self, is_input, ready)
    }
}

impl fmt::Debug for StyleFilterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleFilterImage")
            .field("input", &self.input)
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

impl Drop for StyleFilterImage {
    fn drop(&mut self) {
        if let Some(input) = &self.input {
            input.remove_client(&self.this);
        }
    }
}

impl StyleImage for StyleFilterImage {
    fn kind(&self) -> StyleImageKind {
        StyleImageKind::FilterImage
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        other.downcast_ref::<Self>().is_some_and(|other| {
            images_equal(self.input.as_ref(), other.input.as_ref())
                && self.operations == other.operations
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
        self.input.as_ref().is_some_and(|input| input.is_pending())
    }

    fn load(&self, loader: &mut dyn ResourceLoader, options: &LoaderOptions) {
        if !self.base.begin_load(self) {
            return;
        }
        if let Some(input) = &self.input
            && input.is_pending()
        {
            input.load(loader, options);
        }
        for operation in self.operations.as_slice() {
            if let Some(url) = operation.external_document_url() {
                loader.load_external_document(url, options);
            }
        }
    }

    fn is_loaded(&self) -> bool {
        self.input.as_ref().is_none_or(|input| input.is_loaded())
    }

    fn error_occurred(&self) -> bool {
        self.input.as_ref().is_some_and(|input| input.error_occurred())
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
        let Some(input) = &self.input else {
            return Some(Image::Null);
        };
        if let Some(image) = self.base.cached_image(size) {
            return Some(image);
        }
        let source = match input.image_for_renderer(renderer, size, is_for_first_line, backend) {
            Some(source) if !source.is_null() => source,
            _ => return Some(Image::Null),
        };
        let Some(target) = backend.render_at(&source, size) else {
            return Some(Image::Null);
        };
        let operations = self.operations.as_slice();
        Some(
            self.base
                .cached_or_render(size, || backend.compose_filter(&target, operations, size)),
        )
    }

    fn known_to_be_opaque(&self, _renderer: Option<RendererId>) -> bool {
        false
    }
}

impl StyleImageClient for StyleFilterImage {
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
        if self.accept(image) {
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
