// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `-webkit-named-image(name)` and `paint(name)` images.

use alloc::rc::Rc;
use alloc::string::String;
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

/// A platform image looked up by name and drawn by the backend.
pub struct StyleNamedImage {
    name: String,
    base: GeneratedImageBase,
}

/// An image drawn by a registered paint worklet.
pub struct StylePaintImage {
    name: String,
    base: GeneratedImageBase,
}

impl StyleNamedImage {
    /// Creates an image for the platform image `name`.
    #[must_use]
    pub fn create(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            base: GeneratedImageBase::new(false),
        })
    }

    /// The platform image name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl StylePaintImage {
    /// Creates an image painted by the worklet registered as `name`.
    #[must_use]
    pub fn create(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            base: GeneratedImageBase::new(false),
        })
    }

    /// The worklet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for StyleNamedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleNamedImage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for StylePaintImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StylePaintImage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Both variants are resizable, never pending, and differ only in kind and
/// in which backend hook draws them.
macro_rules! impl_named_style_image {
    ($ty:ty, $kind:expr, $render:ident) => {
        impl StyleImage for $ty {
            fn kind(&self) -> StyleImageKind {
                $kind
            }

            fn equals(&self, other: &dyn StyleImage) -> bool {
                other
                    .downcast_ref::<Self>()
                    .is_some_and(|other| self.name == other.name)
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
                false
            }

            fn set_container_context_for_renderer(
                &self,
                renderer: RendererId,
                context: ContainerContext,
            ) {
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
                Some(
                    self.base
                        .cached_or_render(size, || backend.$render(&self.name, size)),
                )
            }

            fn known_to_be_opaque(&self, _renderer: Option<RendererId>) -> bool {
                false
            }
        }
    };
}

impl_named_style_image!(StyleNamedImage, StyleImageKind::NamedImage, render_named_image);
impl_named_style_image!(StylePaintImage, StyleImageKind::PaintImage, render_paint_worklet);
