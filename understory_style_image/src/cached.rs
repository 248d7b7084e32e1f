// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `url()` images backed by a loader resource.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Rect, Size};
use smallvec::SmallVec;

use crate::backend::RenderBackend;
use crate::client::{ClientHandle, ImageClients};
use crate::geometry::{LayoutSize, LayoutUnit};
use crate::image::Image;
use crate::loader::{
    CachedImageClient, CachedImageResource, ImageRequest, LoaderOptions, RawImage, ResolvedUrl,
    ResourceLoader,
};
use crate::style_image::{StyleImage, StyleImageKind};
use crate::types::{
    ContainerContext, DecodingStatus, DocumentId, ImageAnimatingState, RendererId,
    StyleImageSizeType, VisibleInViewport,
};

/// Initiator name used when none is configured.
const DEFAULT_INITIATOR: &str = "css";

/// Clients that asked for the next decoded frame.
#[derive(Debug, Default)]
struct WaitingClients {
    clients: SmallVec<[ClientHandle; 2]>,
    /// Set when a request came from something that is not a client; every
    /// client then receives the next frame.
    force_all: bool,
}

impl WaitingClients {
    fn clear(&mut self) {
        self.clients.clear();
        self.force_all = false;
    }
}

/// A `url()` image.
///
/// Starts pending. [`load`](StyleImage::load) asks the loader for a resource
/// and registers as its client; resource callbacks are re-published to this
/// image's own clients.
///
/// The scale factor is fixed at construction. Use
/// [`copy_overriding_scale_factor`](Self::copy_overriding_scale_factor) to
/// get an instance with a different one.
pub struct StyleCachedImage {
    url: ResolvedUrl,
    scale_factor: f32,
    loaded_from_opaque_source: bool,
    initiator: Option<String>,
    this: Weak<Self>,
    is_pending: Cell<bool>,
    load_refused: Cell<bool>,
    resource: RefCell<Option<Rc<dyn CachedImageResource>>>,
    clients: ImageClients,
    waiting: RefCell<WaitingClients>,
    container_contexts: RefCell<HashMap<RendererId, ContainerContext>>,
    /// Container requests made before the resource had an image.
    pending_container_requests: RefCell<Vec<(RendererId, ContainerContext)>>,
}

/// Configures a [`StyleCachedImage`].
#[derive(Clone, Debug)]
pub struct StyleCachedImageBuilder {
    url: ResolvedUrl,
    scale_factor: f32,
    loaded_from_opaque_source: bool,
    initiator: Option<String>,
}

impl StyleCachedImageBuilder {
    /// Device pixels per CSS pixel of the image data.
    #[must_use]
    pub fn scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Marks the image as coming from an opaquely loaded style sheet.
    #[must_use]
    pub fn loaded_from_opaque_source(mut self, opaque: bool) -> Self {
        self.loaded_from_opaque_source = opaque;
        self
    }

    /// Initiator name reported to the loader.
    #[must_use]
    pub fn initiator(mut self, initiator: impl Into<String>) -> Self {
        self.initiator = Some(initiator.into());
        self
    }

    /// Creates the pending image.
    #[must_use]
    pub fn build(self) -> Rc<StyleCachedImage> {
        StyleCachedImage::new_rc(
            self.url,
            self.scale_factor,
            self.loaded_from_opaque_source,
            self.initiator,
            None,
        )
    }
}

impl StyleCachedImage {
    /// Starts configuring an image for `url`.
    #[must_use]
    pub fn builder(url: ResolvedUrl) -> StyleCachedImageBuilder {
        StyleCachedImageBuilder {
            url,
            scale_factor: 1.0,
            loaded_from_opaque_source: false,
            initiator: None,
        }
    }

    /// Creates a pending image for `url`.
    #[must_use]
    pub fn create(url: ResolvedUrl, scale_factor: f32) -> Rc<Self> {
        Self::builder(url).scale_factor(scale_factor).build()
    }

    /// Wraps a resource that is already loading; the image is not pending.
    #[must_use]
    pub fn create_from_resource(resource: Rc<dyn CachedImageResource>, scale_factor: f32) -> Rc<Self> {
        let url = ResolvedUrl::absolute(resource.url());
        let image = Self::new_rc(url, scale_factor, false, None, Some(resource.clone()));
        resource.add_client(image.resource_client());
        image
    }

    fn new_rc(
        url: ResolvedUrl,
        scale_factor: f32,
        loaded_from_opaque_source: bool,
        initiator: Option<String>,
        resource: Option<Rc<dyn CachedImageResource>>,
    ) -> Rc<Self> {
        let is_pending = resource.is_none();
        Rc::new_cyclic(|this| Self {
            url,
            scale_factor,
            loaded_from_opaque_source,
            initiator,
            this: this.clone(),
            is_pending: Cell::new(is_pending),
            load_refused: Cell::new(false),
            resource: RefCell::new(resource),
            clients: ImageClients::default(),
            waiting: RefCell::default(),
            container_contexts: RefCell::default(),
            pending_container_requests: RefCell::default(),
        })
    }

    /// Returns an image identical to this one but with `scale_factor`.
    ///
    /// Returns `self` when the factor is unchanged. A new instance starts
    /// pending and shares nothing but configuration with `self`.
    #[must_use]
    pub fn copy_overriding_scale_factor(self: &Rc<Self>, scale_factor: f32) -> Rc<Self> {
        if self.scale_factor == scale_factor {
            return Rc::clone(self);
        }
        log::debug!(
            "copying {} to override scale factor {} with {}",
            self.url.specified,
            self.scale_factor,
            scale_factor
        );
        Self::new_rc(
            self.url.clone(),
            scale_factor,
            self.loaded_from_opaque_source,
            self.initiator.clone(),
            None,
        )
    }

    /// The URL this image loads.
    #[must_use]
    pub fn url(&self) -> &ResolvedUrl {
        &self.url
    }

    /// The URL re-resolved against the loader's current document.
    #[must_use]
    pub fn reresolved_url(&self, loader: &dyn ResourceLoader) -> String {
        if self.url.is_local() {
            self.url.resolved.clone()
        } else {
            loader.complete_url(&self.url)
        }
    }

    /// Device pixels per CSS pixel of the image data.
    #[must_use]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Returns `true` if the owning style sheet was loaded opaquely.
    #[must_use]
    pub fn is_loaded_from_opaque_source(&self) -> bool {
        self.loaded_from_opaque_source
    }

    /// The last container context a renderer supplied.
    #[must_use]
    pub fn container_context_for_renderer(&self, renderer: RendererId) -> Option<ContainerContext> {
        self.container_contexts.borrow().get(&renderer).cloned()
    }

    fn resource(&self) -> Option<Rc<dyn CachedImageResource>> {
        self.resource.borrow().clone()
    }

    fn raw_image(&self) -> Option<RawImage> {
        self.resource().and_then(|resource| resource.raw_image())
    }

    fn resource_client(&self) -> Weak<dyn CachedImageClient> {
        let weak: Weak<Self> = self.this.clone();
        weak
    }

    /// Returns `true` if a resource callback came from our own resource.
    fn is_own_resource(&self, resource: &dyn CachedImageResource) -> bool {
        let own = self
            .resource
            .borrow()
            .as_ref()
            .is_some_and(|own| core::ptr::addr_eq(Rc::as_ptr(own), resource));
        if !own {
            log::warn!(
                "{} ignoring a callback from foreign resource {}",
                self.url.specified,
                resource.url()
            );
        }
        own
    }

    fn as_style_image(&self) -> &dyn StyleImage {
        self
    }

    /// Forwards container requests made before `resource` had an image.
    fn flush_pending_container_requests(&self, resource: &dyn CachedImageResource) {
        let requests = core::mem::take(&mut *self.pending_container_requests.borrow_mut());
        let client = self.resource_client();
        for (renderer, context) in &requests {
            resource.set_container_context_for_client(&client, *renderer, context);
        }
    }
}

impl fmt::Debug for StyleCachedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleCachedImage")
            .field("url", &self.url)
            .field("scale_factor", &self.scale_factor)
            .field("is_pending", &self.is_pending.get())
            .field("has_resource", &self.resource.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for StyleCachedImage {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.get_mut().take() {
            resource.remove_client(&self.resource_client());
        }
    }
}

impl StyleImage for StyleCachedImage {
    fn kind(&self) -> StyleImageKind {
        StyleImageKind::CachedImage
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        if core::ptr::eq(self, other) {
            return true;
        }
        if self.scale_factor != other.scale_factor {
            return false;
        }
        if self.url.resolved == other.url.resolved {
            return true;
        }
        match (self.resource(), other.resource()) {
            (Some(a), Some(b)) => Rc::ptr_eq(&a, &b),
            _ => false,
        }
    }

    fn add_client(&self, client: ClientHandle) {
        self.clients.add(client);
    }

    fn remove_client(&self, client: &ClientHandle) {
        if self.clients.remove(self, client) {
            self.waiting.borrow_mut().clients.retain(|waiting| waiting != client);
        }
    }

    fn has_client(&self, client: &ClientHandle) -> bool {
        self.clients.contains(client)
    }

    fn is_pending(&self) -> bool {
        self.is_pending.get()
    }

    fn load(&self, loader: &mut dyn ResourceLoader, options: &LoaderOptions) {
        if !self.is_pending.get() {
            log::warn!("load() called more than once for {}", self.url.specified);
            return;
        }
        self.is_pending.set(false);
        if self.resource.borrow().is_some() {
            return;
        }

        let mut options = options.clone();
        options.loaded_from_opaque_source |= self.loaded_from_opaque_source;
        let request = ImageRequest {
            url: self.reresolved_url(loader),
            options,
            initiator: self
                .initiator
                .clone()
                .unwrap_or_else(|| String::from(DEFAULT_INITIATOR)),
        };
        log::debug!("requesting {}", request.url);
        match loader.request_image(request) {
            Ok(resource) => {
                *self.resource.borrow_mut() = Some(resource.clone());
                resource.add_client(self.resource_client());
                // A shared resource may already be decoded and will not
                // report `image_created` again.
                if resource.raw_image().is_some() {
                    self.flush_pending_container_requests(&*resource);
                }
            }
            Err(error) => {
                log::debug!("image request for {} refused: {error}", self.url.specified);
                self.load_refused.set(true);
            }
        }
    }

    fn is_loaded(&self) -> bool {
        if self.load_refused.get() {
            return true;
        }
        self.resource()
            .is_some_and(|resource| resource.status().is_finished())
    }

    fn error_occurred(&self) -> bool {
        self.load_refused.get()
            || self
                .resource()
                .is_some_and(|resource| resource.status().is_error())
    }

    fn can_render(&self, renderer: Option<RendererId>, multiplier: f32) -> bool {
        !self.error_occurred()
            && !self
                .image_size_for_renderer(renderer, multiplier, StyleImageSizeType::Used)
                .is_empty()
    }

    fn cached_resource(&self) -> Option<Rc<dyn CachedImageResource>> {
        self.resource()
    }

    fn uses_data_protocol(&self) -> bool {
        self.url.uses_data_protocol()
    }

    fn image_size_for_renderer(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        size_type: StyleImageSizeType,
    ) -> LayoutSize {
        let Some(raw) = self.raw_image() else {
            return LayoutSize::ZERO;
        };

        let mut natural = raw.natural_size;
        if raw.uses_container_size && size_type == StyleImageSizeType::Used {
            if let Some(context) = renderer.and_then(|r| self.container_context_for_renderer(r)) {
                natural = context.size;
            }
        }

        let size = LayoutSize::from_size(natural);
        if size.is_empty() || multiplier == 1.0 {
            return size.scaled_down(self.scale_factor);
        }

        let width_scale = if raw.has_relative_width { 1.0 } else { multiplier };
        let height_scale = if raw.has_relative_height { 1.0 } else { multiplier };
        let scaled = LayoutSize::from_size(Size::new(
            natural.width * f64::from(width_scale),
            natural.height * f64::from(height_scale),
        ));

        // A nonzero dimension never scales down to nothing.
        let minimum = LayoutSize::new(
            if size.width.is_positive() { LayoutUnit::ONE } else { LayoutUnit::ZERO },
            if size.height.is_positive() { LayoutUnit::ONE } else { LayoutUnit::ZERO },
        );
        scaled.expanded_to(minimum).scaled_down(self.scale_factor)
    }

    fn uses_image_container_size(&self) -> bool {
        self.raw_image().is_some_and(|raw| raw.uses_container_size)
    }

    fn image_has_relative_width(&self) -> bool {
        self.raw_image().is_some_and(|raw| raw.has_relative_width)
    }

    fn image_has_relative_height(&self) -> bool {
        self.raw_image().is_some_and(|raw| raw.has_relative_height)
    }

    fn image_has_natural_dimensions(&self) -> bool {
        self.raw_image()
            .is_some_and(|raw| !(raw.has_relative_width && raw.has_relative_height))
    }

    fn image_scale_factor(&self) -> f32 {
        self.scale_factor
    }

    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext) {
        self.container_contexts
            .borrow_mut()
            .insert(renderer, context.clone());
        match self.resource() {
            Some(resource) if resource.raw_image().is_some() => {
                resource.set_container_context_for_client(
                    &self.resource_client(),
                    renderer,
                    &context,
                );
            }
            _ => self
                .pending_container_requests
                .borrow_mut()
                .push((renderer, context)),
        }
    }

    fn image_for_renderer(
        &self,
        _renderer: Option<RendererId>,
        size: Size,
        _is_for_first_line: bool,
        _backend: &mut dyn RenderBackend,
    ) -> Option<Image> {
        if self.is_pending() || size.is_zero_area() {
            return Some(Image::Null);
        }
        let resource = self.resource()?;
        if resource.status().is_error() {
            return Some(Image::Null);
        }
        resource.raw_image().map(|raw| raw.image)
    }

    fn known_to_be_opaque(&self, _renderer: Option<RendererId>) -> bool {
        self.raw_image().is_some_and(|raw| raw.known_to_be_opaque)
    }

    fn stop_animation(&self) {
        if let Some(resource) = self.resource() {
            resource.stop_animation();
        }
    }

    fn reset_animation(&self) {
        if let Some(resource) = self.resource() {
            resource.reset_animation();
        }
    }

    fn is_client_waiting_for_async_decoding(&self, client: &ClientHandle) -> bool {
        let waiting = self.waiting.borrow();
        waiting.force_all || waiting.clients.contains(client)
    }

    fn add_client_waiting_for_async_decoding(&self, client: &ClientHandle) {
        if self.waiting.borrow().force_all {
            return;
        }
        let resource = self.resource();
        if !self.clients.contains(client) {
            // The request was routed through something that is not one of
            // our clients; fall back to delivering to everyone.
            self.waiting.borrow_mut().force_all = true;
            if let Some(resource) = resource {
                resource.set_force_all_clients_waiting_for_async_decoding(true);
            }
            return;
        }
        {
            let mut waiting = self.waiting.borrow_mut();
            if !waiting.clients.contains(client) {
                waiting.clients.push(client.clone());
            }
        }
        if let Some(resource) = resource {
            resource.add_client_waiting_for_async_decoding(&self.resource_client());
        }
    }

    fn remove_all_clients_waiting_for_async_decoding(&self) {
        self.waiting.borrow_mut().clear();
        if let Some(resource) = self.resource() {
            resource.remove_all_clients_waiting_for_async_decoding();
        }
    }
}

impl CachedImageClient for StyleCachedImage {
    fn image_created(&self, resource: &dyn CachedImageResource) {
        if !self.is_own_resource(resource) {
            return;
        }
        self.flush_pending_container_requests(resource);
        self.waiting.borrow_mut().clear();
    }

    fn image_changed(&self, resource: &dyn CachedImageResource, rect: Option<Rect>) {
        if !self.is_own_resource(resource) {
            return;
        }
        let image = self.as_style_image();
        self.clients
            .for_each(|_, client| client.style_image_changed(image, rect));
    }

    fn notify_finished(&self, resource: &dyn CachedImageResource) {
        if !self.is_own_resource(resource) {
            return;
        }
        let image = self.as_style_image();
        self.clients.for_each(|_, client| {
            client.style_image_finished_resource_load(image, resource);
        });
        self.clients
            .for_each(|_, client| client.style_image_finished_load(image));
    }

    fn schedule_rendering_update(&self, resource: &dyn CachedImageResource) {
        if !self.is_own_resource(resource) {
            return;
        }
        let image = self.as_style_image();
        self.clients.for_each(|_, client| {
            client.style_image_needs_scheduled_rendering_update(image);
        });
    }

    fn image_frame_available(
        &self,
        resource: &dyn CachedImageResource,
        state: ImageAnimatingState,
        rect: Option<Rect>,
        decoding: DecodingStatus,
    ) -> VisibleInViewport {
        if !self.is_own_resource(resource) {
            return VisibleInViewport::No;
        }
        let (force_all, waiting) = {
            let waiting = self.waiting.borrow();
            (waiting.force_all, waiting.clients.clone())
        };
        let image = self.as_style_image();
        let mut visible = VisibleInViewport::No;
        self.clients.for_each(|handle, client| {
            // A single decode only repaints the clients that asked for it.
            if state == ImageAnimatingState::No && !force_all && !waiting.contains(handle) {
                return;
            }
            if client
                .style_image_frame_available(image, state, rect)
                .is_visible()
            {
                visible = VisibleInViewport::Yes;
            }
        });
        if decoding != DecodingStatus::Partial {
            self.waiting.borrow_mut().clear();
        }
        visible
    }

    fn image_visible_in_viewport(
        &self,
        resource: &dyn CachedImageResource,
        document: DocumentId,
    ) -> VisibleInViewport {
        if !self.is_own_resource(resource) {
            return VisibleInViewport::No;
        }
        let image = self.as_style_image();
        self.clients
            .any_visible(|client| client.style_image_visible_in_viewport(image, document))
    }

    fn can_destroy_decoded_data(&self, resource: &dyn CachedImageResource) -> bool {
        if !self.is_own_resource(resource) {
            return true;
        }
        let image = self.as_style_image();
        self.clients
            .all(|client| client.style_image_can_destroy_decoded_data(image))
    }

    fn allows_animation(&self, resource: &dyn CachedImageResource) -> bool {
        if !self.is_own_resource(resource) {
            return false;
        }
        let image = self.as_style_image();
        self.clients
            .any(|client| client.style_image_animation_allowed(image))
    }
}
