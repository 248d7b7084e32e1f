// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`StyleImage`] contract shared by every image variant.

use alloc::rc::Rc;
use core::any::Any;
use core::fmt;

use kurbo::Size;

use crate::backend::RenderBackend;
use crate::client::ClientHandle;
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{CachedImageResource, LoaderOptions, ResourceLoader};
use crate::types::{ContainerContext, NaturalDimensions, RendererId, StyleImageSizeType};

/// The closed set of image variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StyleImageKind {
    /// `url()`: a loader-backed image.
    CachedImage,
    /// `-webkit-canvas()`.
    CanvasImage,
    /// `cross-fade()`.
    CrossfadeImage,
    /// `filter()`.
    FilterImage,
    /// Any CSS gradient.
    GradientImage,
    /// `image-set()`.
    ImageSet,
    /// `-webkit-named-image()`.
    NamedImage,
    /// `paint()`.
    PaintImage,
    /// A value that failed to resolve.
    InvalidImage,
    /// A `cursor` image with an optional hotspot.
    CursorImage,
}

impl StyleImageKind {
    /// Returns `true` for images computed from parameters and other images.
    #[must_use]
    pub const fn is_generated(self) -> bool {
        matches!(
            self,
            Self::CanvasImage
                | Self::CrossfadeImage
                | Self::FilterImage
                | Self::GradientImage
                | Self::NamedImage
                | Self::PaintImage
                | Self::InvalidImage
        )
    }

    /// Returns `true` for images that pick one of several candidates at load time.
    #[must_use]
    pub const fn is_multi(self) -> bool {
        matches!(self, Self::ImageSet | Self::CursorImage)
    }
}

/// A loadable, sizable, renderable CSS `<image>` value.
///
/// Instances are shared as `Rc<dyn StyleImage>`. The lifecycle is:
///
/// 1. Consumers register with [`add_client`](Self::add_client).
/// 2. Someone calls [`load`](Self::load) exactly once; the image leaves the
///    pending state immediately, and completion arrives later through client
///    callbacks.
/// 3. Consumers query sizes and render with
///    [`image_for_renderer`](Self::image_for_renderer).
///
/// Equality is structural (see [`equals`](Self::equals)); two images built
/// from the same URL compare equal even though they are different objects.
pub trait StyleImage: Any + fmt::Debug {
    /// Variant tag.
    fn kind(&self) -> StyleImageKind;

    /// Structural equality with another image.
    fn equals(&self, other: &dyn StyleImage) -> bool;

    /// Registers `client` once more.
    fn add_client(&self, client: ClientHandle);

    /// Unregisters `client` once. Removing an unregistered client is a logged
    /// no-op.
    fn remove_client(&self, client: &ClientHandle);

    /// Returns `true` if `client` is registered at least once.
    fn has_client(&self, client: &ClientHandle) -> bool;

    /// Returns `true` until [`load`](Self::load) has been called.
    fn is_pending(&self) -> bool;

    /// Starts loading. A second call is a logged no-op.
    fn load(&self, loader: &mut dyn ResourceLoader, options: &LoaderOptions);

    /// Returns `true` once every underlying resource has finished loading.
    fn is_loaded(&self) -> bool {
        !self.is_pending()
    }

    /// Returns `true` if an underlying resource failed.
    fn error_occurred(&self) -> bool {
        false
    }

    /// Returns `true` if rendering at `multiplier` would produce something.
    fn can_render(&self, renderer: Option<RendererId>, multiplier: f32) -> bool {
        let _ = (renderer, multiplier);
        true
    }

    /// The loader resource behind the image, if any.
    fn cached_resource(&self) -> Option<Rc<dyn CachedImageResource>> {
        None
    }

    /// Returns `true` if a loader resource is attached.
    fn has_cached_resource(&self) -> bool {
        self.cached_resource().is_some()
    }

    /// Returns `true` for `data:` URLs.
    fn uses_data_protocol(&self) -> bool {
        false
    }

    /// For resolution-selecting images, the selected candidate.
    fn selected_image(&self) -> Option<Rc<dyn StyleImage>> {
        None
    }

    /// The size to lay the image out at, scaled by `multiplier` (zoom).
    fn image_size_for_renderer(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        size_type: StyleImageSizeType,
    ) -> LayoutSize;

    /// Natural dimensions for CSS sizing.
    fn natural_dimensions(&self) -> NaturalDimensions {
        if self.image_has_natural_dimensions() {
            let size = self.image_size_for_renderer(None, 1.0, StyleImageSizeType::Intrinsic);
            NaturalDimensions::from_size(size.to_size())
        } else {
            NaturalDimensions::NONE
        }
    }

    /// Returns `true` if the image sizes itself from its container.
    fn uses_image_container_size(&self) -> bool {
        false
    }

    /// Returns `true` if the width depends on the container.
    fn image_has_relative_width(&self) -> bool {
        false
    }

    /// Returns `true` if the height depends on the container.
    fn image_has_relative_height(&self) -> bool {
        false
    }

    /// Returns `true` if the image has a natural size.
    fn image_has_natural_dimensions(&self) -> bool {
        true
    }

    /// Device pixels per CSS pixel of the image data.
    fn image_scale_factor(&self) -> f32 {
        1.0
    }

    /// Records a renderer's container; buffered if it cannot apply yet.
    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext);

    /// Renders the image at `size`.
    ///
    /// Returns [`Image::Null`] when there is nothing to paint (empty size,
    /// pending, failed load) and `None` when the image cannot be produced at
    /// all.
    fn image_for_renderer(
        &self,
        renderer: Option<RendererId>,
        size: Size,
        is_for_first_line: bool,
        backend: &mut dyn RenderBackend,
    ) -> Option<Image>;

    /// Returns `true` only if every painted pixel is known to be opaque.
    fn known_to_be_opaque(&self, renderer: Option<RendererId>) -> bool;

    /// Stops any running animation.
    fn stop_animation(&self) {}

    /// Restarts any animation from its first frame.
    fn reset_animation(&self) {}

    /// Returns `true` if `client` asked for the next decoded frame.
    fn is_client_waiting_for_async_decoding(&self, client: &ClientHandle) -> bool {
        let _ = client;
        false
    }

    /// Asks for the next decoded frame to be delivered to `client`.
    fn add_client_waiting_for_async_decoding(&self, client: &ClientHandle) {
        let _ = client;
    }

    /// Drops every pending decode request.
    fn remove_all_clients_waiting_for_async_decoding(&self) {}
}

impl dyn StyleImage {
    /// Returns `true` if the image is a `T`.
    #[must_use]
    pub fn is<T: StyleImage>(&self) -> bool {
        let any: &dyn Any = self;
        any.is::<T>()
    }

    /// Borrows the image as a `T`.
    #[must_use]
    pub fn downcast_ref<T: StyleImage>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }
}

/// Clones `image` as an `Rc<T>` if it is a `T`.
#[must_use]
pub fn downcast_rc<T: StyleImage>(image: &Rc<dyn StyleImage>) -> Option<Rc<T>> {
    let any: Rc<dyn Any> = image.clone();
    any.downcast::<T>().ok()
}

impl PartialEq for dyn StyleImage {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::addr_eq(self, other) || self.equals(other)
    }
}

/// Equality of two optional shared images, structural when both are present.
#[must_use]
pub fn images_equal(a: Option<&Rc<dyn StyleImage>>, b: Option<&Rc<dyn StyleImage>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => **a == **b,
        _ => false,
    }
}

/// Returns `true` if `a` and `b` are the same object.
#[must_use]
pub fn same_image(a: &dyn StyleImage, b: &dyn StyleImage) -> bool {
    core::ptr::addr_eq(a, b)
}
