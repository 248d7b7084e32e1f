// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small identifiers and enums shared by images, clients and collaborators.

use alloc::string::String;

use hashbrown::HashSet;
use kurbo::Size;

/// Identifies one consuming renderer.
///
/// Renderers are owned by the host's render tree; the image only uses the id
/// as a key for per-renderer state such as container sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RendererId(pub u64);

/// Identifies a document, used for viewport-visibility queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DocumentId(pub u32);

/// Identifies a DOM element, used for ownership tracing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ElementId(pub u64);

/// A set of elements referencing an image.
pub type ElementSet = HashSet<ElementId>;

/// Whether a consumer of an image is currently visible in the viewport.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisibleInViewport {
    /// At least one consumer is visible.
    Yes,
    /// No consumer is visible.
    #[default]
    No,
}

impl VisibleInViewport {
    /// Returns `true` for [`VisibleInViewport::Yes`].
    #[must_use]
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for VisibleInViewport {
    fn from(visible: bool) -> Self {
        if visible { Self::Yes } else { Self::No }
    }
}

/// Animation state reported alongside a newly decoded frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageAnimatingState {
    /// The frame belongs to a running animation.
    Yes,
    /// A single, non-animating decode.
    #[default]
    No,
}

/// Progress of an asynchronous decode.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DecodingStatus {
    /// Nothing decoded yet.
    #[default]
    Invalid,
    /// Some of the frame is decoded; more data is coming.
    Partial,
    /// The frame is fully decoded.
    Complete,
    /// A decode has been requested and is in flight.
    Decoding,
}

/// Which size an image should report.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum StyleImageSizeType {
    /// The size the image will be drawn at, taking container sizing into account.
    #[default]
    Used,
    /// The natural size of the image, ignoring any container.
    Intrinsic,
}

/// Container information a renderer supplies for an image.
///
/// Images without natural dimensions (resizable generated images, vector
/// images) size themselves from this.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerContext {
    /// Container size in CSS pixels.
    pub size: Size,
    /// Effective zoom of the renderer.
    pub zoom: f32,
    /// Document URL used to resolve fragment references inside the image.
    pub url: String,
}

impl ContainerContext {
    /// Creates a context with a size, zoom and document URL.
    #[must_use]
    pub fn new(size: Size, zoom: f32, url: impl Into<String>) -> Self {
        Self {
            size,
            zoom,
            url: url.into(),
        }
    }

    /// Returns `true` if the container has zero area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.is_zero_area()
    }
}

/// A natural-size description of an image, as needed by CSS sizing.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct NaturalDimensions {
    /// Natural width, when the image has one.
    pub width: Option<f64>,
    /// Natural height, when the image has one.
    pub height: Option<f64>,
    /// Natural aspect ratio (`width / height`), when known.
    pub ratio: Option<f64>,
}

impl NaturalDimensions {
    /// Dimensions of an image with no natural size at all.
    pub const NONE: Self = Self {
        width: None,
        height: None,
        ratio: None,
    };

    /// Dimensions of an image with a definite natural size.
    #[must_use]
    pub fn from_size(size: Size) -> Self {
        let ratio = (size.height != 0.0).then(|| size.width / size.height);
        Self {
            width: Some(size.width),
            height: Some(size.height),
            ratio,
        }
    }
}
