// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Style Image: CSS `<image>` values for layout and paint.
//!
//! A style image is what a computed style holds for `background-image`,
//! `border-image-source`, `mask-image`, `list-style-image`, `content` and
//! `cursor`. This crate resolves those values into objects that can be
//! loaded lazily, sized for a consumer, rendered at a requested size, and
//! that tell their consumers when anything about them changes.
//!
//! ## Variants
//!
//! - [`StyleCachedImage`]: a `url()` backed by a loader resource.
//! - Generated images: [`StyleCrossfadeImage`] and [`StyleFilterImage`]
//!   compose other style images; [`StyleCanvasImage`], [`StyleGradientImage`],
//!   [`StyleNamedImage`], [`StylePaintImage`] and [`StyleInvalidImage`] are
//!   computed from parameters.
//! - Multi-images: [`StyleImageSet`] and [`StyleCursorImage`] choose one
//!   candidate at load time and delegate to it afterwards.
//!
//! All of them implement [`StyleImage`] and are shared as
//! `Rc<dyn StyleImage>`. [`StyleImage::kind`] is the variant tag;
//! [`StyleImage`] also offers `is::<T>()` and `downcast_ref::<T>()`.
//!
//! ## Clients
//!
//! Consumers implement [`StyleImageClient`] and register a weak
//! [`ClientHandle`]. Registration is counted: a client added twice must be
//! removed twice, and hears [`style_image_client_removed`] only when its
//! count reaches zero. Images never keep their clients alive, and events are
//! delivered in registration order.
//!
//! Composite images register as clients of their inputs when they are
//! created and republish input events to their own clients.
//!
//! ## Collaborators
//!
//! Loading, decoding and rasterization live outside this crate, behind
//! [`ResourceLoader`], [`CachedImageResource`] and [`RenderBackend`]. Named
//! canvases are found through a [`CanvasRegistry`].
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use kurbo::{Rect, Size};
//! use peniko::Color;
//! use understory_style_image::{
//!     ClientHandle, ColorStop, ContainerContext, GradientData, LinearDirection, RendererId,
//!     StyleGradientImage, StyleImage, StyleImageClient, StyleImageSizeType,
//! };
//!
//! struct Renderer;
//!
//! impl StyleImageClient for Renderer {
//!     fn style_image_changed(&self, _: &dyn StyleImage, _: Option<Rect>) {}
//! }
//!
//! let image: Rc<dyn StyleImage> = StyleGradientImage::create(
//!     GradientData::Linear { direction: LinearDirection::Angle(90.0) },
//!     vec![
//!         ColorStop::new(Color::from_rgb8(255, 0, 0)),
//!         ColorStop::new(Color::from_rgb8(0, 0, 255)),
//!     ],
//!     false,
//! );
//!
//! let renderer = Rc::new(Renderer);
//! let handle = ClientHandle::new(&renderer);
//! image.add_client(handle.clone());
//!
//! // Gradients size themselves from their container.
//! let id = RendererId(1);
//! image.set_container_context_for_renderer(
//!     id,
//!     ContainerContext::new(Size::new(120.0, 40.0), 1.0, "index.html"),
//! );
//! let size = image.image_size_for_renderer(Some(id), 1.0, StyleImageSizeType::Used);
//! assert_eq!(size.to_size(), Size::new(120.0, 40.0));
//!
//! image.remove_client(&handle);
//! assert!(!image.has_client(&handle));
//! ```
//!
//! This crate is `no_std` and uses `alloc`. Enable the `libm` feature when
//! building without `std`.
//!
//! [`style_image_client_removed`]: StyleImageClient::style_image_client_removed

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

mod backend;
mod cached;
mod client;
mod filter_operation;
mod generated;
mod geometry;
mod image;
mod loader;
mod multi;
mod shadow;
mod style_image;
mod types;

pub use backend::RenderBackend;
pub use cached::{StyleCachedImage, StyleCachedImageBuilder};
pub use client::{ClientHandle, ClientRemoval, ClientSet, StyleImageClient};
pub use filter_operation::{FilterOperation, FilterOperations};
pub use generated::{
    CanvasElement, CanvasObserver, CanvasRegistry, ColorStop, GENERATED_IMAGE_CACHE_CAPACITY,
    GradientData, GradientPosition, HorizontalSide, LengthPercentage, LinearDirection,
    RadialExtent, RadialSize, StyleCanvasImage, StyleCrossfadeImage, StyleFilterImage,
    StyleGradientImage, StyleInvalidImage, StyleNamedImage, StylePaintImage, VerticalSide,
};
pub use geometry::{FIXED_POINT_DENOMINATOR, LayoutSize, LayoutUnit};
pub use image::{Image, ImageId};
pub use loader::{
    CachedImageClient, CachedImageResource, FetchMode, ImageRequest, LoadError, LoaderOptions,
    RawImage, ResolvedUrl, ResourceLoader, ResourceStatus,
};
pub use multi::{
    BestFitImage, BestFitSelector, CursorSource, ImageSetCandidates, ImageSetOption,
    StyleCursorImage, StyleImageSet, StyleMultiImage,
};
pub use shadow::{BoxExtent, ShadowData, ShadowList, ShadowStyle};
pub use style_image::{StyleImage, StyleImageKind, downcast_rc, images_equal, same_image};
pub use types::{
    ContainerContext, DecodingStatus, DocumentId, ElementId, ElementSet, ImageAnimatingState,
    NaturalDimensions, RendererId, StyleImageSizeType, VisibleInViewport,
};
