// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A placeholder for values that failed to resolve.

use alloc::rc::Rc;
use core::fmt;

use kurbo::Size;

use super::GeneratedImageBase;
use crate::backend::RenderBackend;
use crate::client::ClientHandle;
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{LoaderOptions, ResourceLoader};
use crate::style_image::{StyleImage, StyleImageKind};
use crate::types::{ContainerContext, RendererId, StyleImageSizeType};

/// An image that always renders as the null sentinel.
///
/// Image sets with no usable candidate select one of these.
pub struct StyleInvalidImage {
    base: GeneratedImageBase,
}

impl StyleInvalidImage {
    /// Creates an invalid image.
    #[must_use]
    pub fn create() -> Rc<Self> {
        Rc::new(Self {
            base: GeneratedImageBase::new(false),
        })
    }
}

impl fmt::Debug for StyleInvalidImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleInvalidImage").finish_non_exhaustive()
    }
}

impl StyleImage for StyleInvalidImage {
    fn kind(&self) -> StyleImageKind {
        StyleImageKind::InvalidImage
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        other.is::<Self>()
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

    fn can_render(&self, _renderer: Option<RendererId>, _multiplier: f32) -> bool {
        false
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
        false
    }

    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext) {
        self.base.set_container_context(renderer, &context);
    }

    fn image_for_renderer(
        &self,
        _renderer: Option<RendererId>,
        _size: Size,
        _is_for_first_line: bool,
        _backend: &mut dyn RenderBackend,
    ) -> Option<Image> {
        Some(Image::Null)
    }

    fn known_to_be_opaque(&self, _renderer: Option<RendererId>) -> bool {
        false
    }
}
