// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The resource-loading collaborator.
//!
//! Style images never fetch or decode anything themselves. A
//! [`ResourceLoader`] turns a URL into a shared [`CachedImageResource`]
//! handle; the handle later calls back into its [`CachedImageClient`]s as
//! data arrives. All of this happens on one thread: callbacks arrive on a
//! later turn of the host's event loop.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::fmt;

use kurbo::{Rect, Size};

use crate::image::Image;
use crate::types::{
    ContainerContext, DecodingStatus, DocumentId, ImageAnimatingState, RendererId,
    VisibleInViewport,
};

/// A URL as written in style, plus its absolute resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResolvedUrl {
    /// The URL exactly as specified.
    pub specified: String,
    /// The URL resolved against the style sheet's base.
    pub resolved: String,
}

impl ResolvedUrl {
    /// Creates a resolved URL.
    #[must_use]
    pub fn new(specified: impl Into<String>, resolved: impl Into<String>) -> Self {
        Self {
            specified: specified.into(),
            resolved: resolved.into(),
        }
    }

    /// A URL whose specified and resolved forms are the same.
    #[must_use]
    pub fn absolute(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            specified: url.clone(),
            resolved: url,
        }
    }

    /// Returns `true` for same-document fragment references (`#id`).
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.specified.starts_with('#')
    }

    /// Returns `true` for `data:` URLs.
    #[must_use]
    pub fn uses_data_protocol(&self) -> bool {
        self.resolved
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
    }
}

/// CORS mode of an image request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Opaque cross-origin fetch.
    #[default]
    NoCors,
    /// CORS-enabled fetch.
    Cors,
    /// Same-origin only.
    SameOrigin,
}

/// Options carried from style to the loader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    /// CORS mode.
    pub mode: FetchMode,
    /// Set when the requesting style sheet was itself loaded opaquely.
    pub loaded_from_opaque_source: bool,
}

/// A fully formed image request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    /// Absolute URL to fetch.
    pub url: String,
    /// Options for the fetch.
    pub options: LoaderOptions,
    /// Who initiated the fetch, for diagnostics (`"css"` by default).
    pub initiator: String,
}

/// Why a loader refused to start a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// The URL could not be parsed.
    InvalidUrl(String),
    /// Content policy blocked the request.
    Blocked(String),
    /// The loader is shutting down or detached from its document.
    Unavailable,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(url) => write!(f, "invalid image URL {url:?}"),
            Self::Blocked(url) => write!(f, "image load of {url:?} was blocked"),
            Self::Unavailable => f.write_str("resource loader is unavailable"),
        }
    }
}

impl core::error::Error for LoadError {}

/// Starts image loads and answers document-level questions.
pub trait ResourceLoader {
    /// Starts (or joins) a load and returns the shared resource handle.
    fn request_image(
        &mut self,
        request: ImageRequest,
    ) -> Result<Rc<dyn CachedImageResource>, LoadError>;

    /// Re-resolves `url` against the current document.
    fn complete_url(&self, url: &ResolvedUrl) -> String {
        url.resolved.clone()
    }

    /// Starts loading an external document referenced by a filter.
    fn load_external_document(&mut self, url: &str, options: &LoaderOptions) {
        let _ = (url, options);
    }

    /// Device pixel ratio used for best-fit selection.
    fn device_scale_factor(&self) -> f32 {
        1.0
    }

    /// Whether images of `mime_type` can be decoded.
    fn supports_image_mime_type(&self, mime_type: &str) -> bool {
        let _ = mime_type;
        true
    }
}

/// Load state of a resource.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ResourceStatus {
    /// Data is still arriving.
    #[default]
    Pending,
    /// Finished successfully.
    Loaded,
    /// The fetch failed.
    LoadError,
    /// The data could not be decoded.
    DecodeError,
}

impl ResourceStatus {
    /// Returns `true` once the resource is no longer loading.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns `true` for either failure state.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::LoadError | Self::DecodeError)
    }
}

/// What a resource knows about its decoded image.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawImage {
    /// The decoded image.
    pub image: Image,
    /// Natural size in CSS pixels.
    pub natural_size: Size,
    /// The width is relative to a container (vector images).
    pub has_relative_width: bool,
    /// The height is relative to a container (vector images).
    pub has_relative_height: bool,
    /// The image sizes itself from its container (vector images).
    pub uses_container_size: bool,
    /// The current frame has no transparent pixels.
    pub known_to_be_opaque: bool,
}

impl RawImage {
    /// A raster image with a fixed natural size.
    #[must_use]
    pub fn raster(image: Image, natural_size: Size) -> Self {
        Self {
            image,
            natural_size,
            has_relative_width: false,
            has_relative_height: false,
            uses_container_size: false,
            known_to_be_opaque: false,
        }
    }

    /// Returns this description with the opacity flag set.
    #[must_use]
    pub fn opaque(mut self, known_to_be_opaque: bool) -> Self {
        self.known_to_be_opaque = known_to_be_opaque;
        self
    }
}

/// A loader-owned image resource, shared by every style image using the URL.
pub trait CachedImageResource {
    /// The URL this resource was fetched from.
    fn url(&self) -> &str;

    /// Load state.
    fn status(&self) -> ResourceStatus;

    /// The decoded image, once one exists.
    fn raw_image(&self) -> Option<RawImage>;

    /// Registers a resource client.
    fn add_client(&self, client: Weak<dyn CachedImageClient>);

    /// Unregisters a resource client.
    fn remove_client(&self, client: &Weak<dyn CachedImageClient>);

    /// Tells a container-sized image how big a renderer's container is.
    fn set_container_context_for_client(
        &self,
        client: &Weak<dyn CachedImageClient>,
        renderer: RendererId,
        context: &ContainerContext,
    ) {
        let _ = (client, renderer, context);
    }

    /// Asks for the next frame to be delivered to `client`.
    fn add_client_waiting_for_async_decoding(&self, client: &Weak<dyn CachedImageClient>) {
        let _ = client;
    }

    /// Asks for the next frame to be delivered to every client.
    fn set_force_all_clients_waiting_for_async_decoding(&self, force: bool) {
        let _ = force;
    }

    /// Drops every pending decode request.
    fn remove_all_clients_waiting_for_async_decoding(&self) {}

    /// Stops any running animation.
    fn stop_animation(&self) {}

    /// Restarts any animation from its first frame.
    fn reset_animation(&self) {}
}

/// Receives callbacks from a [`CachedImageResource`].
pub trait CachedImageClient {
    /// The first decoded image exists.
    fn image_created(&self, resource: &dyn CachedImageResource);

    /// Decoded pixels changed. `None` means the whole image.
    fn image_changed(&self, resource: &dyn CachedImageResource, rect: Option<Rect>);

    /// The resource finished loading, successfully or not.
    fn notify_finished(&self, resource: &dyn CachedImageResource);

    /// The resource wants a rendering update.
    fn schedule_rendering_update(&self, resource: &dyn CachedImageResource);

    /// A decoded frame is ready.
    fn image_frame_available(
        &self,
        resource: &dyn CachedImageResource,
        state: ImageAnimatingState,
        rect: Option<Rect>,
        decoding: DecodingStatus,
    ) -> VisibleInViewport;

    /// Whether the resource is visible in `document`'s viewport.
    fn image_visible_in_viewport(
        &self,
        resource: &dyn CachedImageResource,
        document: DocumentId,
    ) -> VisibleInViewport;

    /// Whether the resource may drop its decoded data.
    fn can_destroy_decoded_data(&self, resource: &dyn CachedImageResource) -> bool;

    /// Whether the resource may animate.
    fn allows_animation(&self, resource: &dyn CachedImageResource) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn data_urls() {
        assert!(ResolvedUrl::absolute("data:image/png;base64,AAAA").uses_data_protocol());
        assert!(ResolvedUrl::absolute("DATA:,x").uses_data_protocol());
        assert!(!ResolvedUrl::absolute("https://a/data:").uses_data_protocol());
        assert!(!ResolvedUrl::absolute("dat").uses_data_protocol());
    }

    #[test]
    fn local_references() {
        assert!(ResolvedUrl::new("#mask", "https://a/#mask").is_local());
        assert!(!ResolvedUrl::absolute("a.png").is_local());
    }

    #[test]
    fn status_predicates() {
        assert!(!ResourceStatus::Pending.is_finished());
        assert!(ResourceStatus::DecodeError.is_finished());
        assert!(ResourceStatus::LoadError.is_error());
        assert!(!ResourceStatus::Loaded.is_error());
    }

    #[test]
    fn load_error_messages() {
        assert_eq!(
            LoadError::Blocked("a.png".to_string()).to_string(),
            "image load of \"a.png\" was blocked"
        );
        assert_eq!(
            LoadError::Unavailable.to_string(),
            "resource loader is unavailable"
        );
    }
}
