// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendered image handles.

use kurbo::Size;

/// Identifier for a raster produced by a loader or render backend.
///
/// This is a small, opaque handle that is stable for the lifetime of the
/// raster. The style image layer never looks at pixels; it only passes these
/// handles between collaborators.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub u32);

/// The result of rendering a style image.
///
/// [`Image::Null`] is the null-image sentinel: it paints nothing and does not
/// signal an error. It is distinct from an absent result (`None` from
/// [`StyleImage::image_for_renderer`](crate::StyleImage::image_for_renderer)),
/// which means the image cannot be produced at all.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Image {
    /// Paints nothing.
    Null,
    /// A raster owned by a collaborator.
    Raster {
        /// Handle of the raster.
        id: ImageId,
        /// Size of the raster in CSS pixels.
        size: Size,
    },
}

impl Image {
    /// Creates a raster image handle.
    #[inline]
    #[must_use]
    pub const fn raster(id: ImageId, size: Size) -> Self {
        Self::Raster { id, size }
    }

    /// Returns `true` for the null-image sentinel.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The raster handle, if any.
    #[must_use]
    pub const fn id(&self) -> Option<ImageId> {
        match self {
            Self::Null => None,
            Self::Raster { id, .. } => Some(*id),
        }
    }

    /// Size of the image; zero for the sentinel.
    #[must_use]
    pub const fn size(&self) -> Size {
        match self {
            Self::Null => Size::ZERO,
            Self::Raster { size, .. } => *size,
        }
    }
}
