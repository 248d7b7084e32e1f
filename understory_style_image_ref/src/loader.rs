// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted loader and the resources it hands out.

use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::{HashMap, HashSet};
use kurbo::Rect;
use understory_style_image::{
    CachedImageClient, CachedImageResource, ContainerContext, DecodingStatus, DocumentId,
    ImageAnimatingState, ImageRequest, LoadError, LoaderOptions, RawImage, RendererId,
    ResourceLoader, ResourceStatus, VisibleInViewport,
};

/// A resource whose progress is driven by the test.
///
/// Driver methods deliver the matching [`CachedImageClient`] callback to
/// every live client, in registration order.
pub struct RefResource {
    url: String,
    status: Cell<ResourceStatus>,
    raw: Cell<Option<RawImage>>,
    clients: RefCell<Vec<Weak<dyn CachedImageClient>>>,
    container_requests: RefCell<Vec<(RendererId, ContainerContext)>>,
    waiting_for_async_decoding: Cell<usize>,
    force_all_waiting: Cell<bool>,
    animation_stops: Cell<u32>,
    animation_resets: Cell<u32>,
}

impl RefResource {
    /// Creates a pending resource for `url`.
    pub fn new(url: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            url: url.into(),
            status: Cell::new(ResourceStatus::Pending),
            raw: Cell::new(None),
            clients: RefCell::default(),
            container_requests: RefCell::default(),
            waiting_for_async_decoding: Cell::new(0),
            force_all_waiting: Cell::new(false),
            animation_stops: Cell::new(0),
            animation_resets: Cell::new(0),
        })
    }

    /// Number of live resource clients.
    pub fn client_count(&self) -> usize {
        self.clients
            .borrow()
            .iter()
            .filter(|client| client.strong_count() > 0)
            .count()
    }

    /// Container contexts received, in order.
    pub fn container_requests(&self) -> Vec<(RendererId, ContainerContext)> {
        self.container_requests.borrow().clone()
    }

    /// Number of per-client async decoding requests received.
    pub fn waiting_for_async_decoding(&self) -> usize {
        self.waiting_for_async_decoding.get()
    }

    /// Whether every client was asked to receive the next frame.
    pub fn is_forcing_all_waiting(&self) -> bool {
        self.force_all_waiting.get()
    }

    /// How many times the animation was stopped.
    pub fn animation_stops(&self) -> u32 {
        self.animation_stops.get()
    }

    /// How many times the animation was reset.
    pub fn animation_resets(&self) -> u32 {
        self.animation_resets.get()
    }

    /// Decodes the first image and tells clients it exists.
    pub fn create_image(&self, raw: RawImage) {
        self.raw.set(Some(raw));
        self.for_each_client(|client| client.image_created(self));
    }

    /// Reports changed pixels.
    pub fn change(&self, rect: Option<Rect>) {
        self.for_each_client(|client| client.image_changed(self, rect));
    }

    /// Moves to `status` and reports the load as finished.
    pub fn finish(&self, status: ResourceStatus) {
        self.status.set(status);
        self.for_each_client(|client| client.notify_finished(self));
    }

    /// Decodes `raw` and finishes successfully.
    pub fn load_with(&self, raw: RawImage) {
        self.create_image(raw);
        self.finish(ResourceStatus::Loaded);
    }

    /// Asks for a rendering update.
    pub fn schedule_rendering_update(&self) {
        self.for_each_client(|client| client.schedule_rendering_update(self));
    }

    /// Delivers a decoded frame; visible if any client is.
    pub fn frame_available(
        &self,
        state: ImageAnimatingState,
        rect: Option<Rect>,
        decoding: DecodingStatus,
    ) -> VisibleInViewport {
        let mut visible = VisibleInViewport::No;
        self.for_each_client(|client| {
            if client
                .image_frame_available(self, state, rect, decoding)
                .is_visible()
            {
                visible = VisibleInViewport::Yes;
            }
        });
        visible
    }

    /// Asks whether any client shows the image in `document`'s viewport.
    pub fn visible_in_viewport(&self, document: DocumentId) -> VisibleInViewport {
        let mut visible = VisibleInViewport::No;
        self.for_each_client(|client| {
            if client.image_visible_in_viewport(self, document).is_visible() {
                visible = VisibleInViewport::Yes;
            }
        });
        visible
    }

    /// Asks whether decoded data may be dropped; every client must agree.
    pub fn can_destroy_decoded_data(&self) -> bool {
        let mut result = true;
        self.for_each_client(|client| result &= client.can_destroy_decoded_data(self));
        result
    }

    /// Asks whether any client allows animation.
    pub fn allows_animation(&self) -> bool {
        let mut result = false;
        self.for_each_client(|client| result |= client.allows_animation(self));
        result
    }

    fn for_each_client(&self, mut f: impl FnMut(&dyn CachedImageClient)) {
        let clients = self.clients.borrow().clone();
        for client in clients.iter().filter_map(Weak::upgrade) {
            f(&*client);
        }
    }
}

impl fmt::Debug for RefResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefResource")
            .field("url", &self.url)
            .field("status", &self.status.get())
            .field("raw", &self.raw.get())
            .field("clients", &self.client_count())
            .finish_non_exhaustive()
    }
}

impl CachedImageResource for RefResource {
    fn url(&self) -> &str {
        &self.url
    }

    fn status(&self) -> ResourceStatus {
        self.status.get()
    }

    fn raw_image(&self) -> Option<RawImage> {
        self.raw.get()
    }

    fn add_client(&self, client: Weak<dyn CachedImageClient>) {
        self.clients.borrow_mut().push(client);
    }

    fn remove_client(&self, client: &Weak<dyn CachedImageClient>) {
        self.clients
            .borrow_mut()
            .retain(|existing| !Weak::ptr_eq(existing, client));
    }

    fn set_container_context_for_client(
        &self,
        _client: &Weak<dyn CachedImageClient>,
        renderer: RendererId,
        context: &ContainerContext,
    ) {
        self.container_requests
            .borrow_mut()
            .push((renderer, context.clone()));
    }

    fn add_client_waiting_for_async_decoding(&self, _client: &Weak<dyn CachedImageClient>) {
        self.waiting_for_async_decoding
            .set(self.waiting_for_async_decoding.get() + 1);
    }

    fn set_force_all_clients_waiting_for_async_decoding(&self, force: bool) {
        self.force_all_waiting.set(force);
    }

    fn remove_all_clients_waiting_for_async_decoding(&self) {
        self.waiting_for_async_decoding.set(0);
        self.force_all_waiting.set(false);
    }

    fn stop_animation(&self) {
        self.animation_stops.set(self.animation_stops.get() + 1);
    }

    fn reset_animation(&self) {
        self.animation_resets.set(self.animation_resets.get() + 1);
    }
}

/// A loader that hands out one [`RefResource`] per URL and records requests.
#[derive(Debug)]
pub struct RefLoader {
    resources: HashMap<String, Rc<RefResource>>,
    blocked: HashSet<String>,
    unsupported_mime_types: HashSet<String>,
    requests: Vec<ImageRequest>,
    external_documents: Vec<String>,
    device_scale_factor: f32,
}

impl Default for RefLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RefLoader {
    /// Creates a loader for a 1x display that accepts every request.
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
            blocked: HashSet::new(),
            unsupported_mime_types: HashSet::new(),
            requests: Vec::new(),
            external_documents: Vec::new(),
            device_scale_factor: 1.0,
        }
    }

    /// Sets the device pixel ratio.
    #[must_use]
    pub fn with_device_scale_factor(mut self, device_scale_factor: f32) -> Self {
        self.device_scale_factor = device_scale_factor;
        self
    }

    /// Refuses future requests for `url`.
    pub fn block(&mut self, url: impl Into<String>) {
        self.blocked.insert(url.into());
    }

    /// Reports `mime_type` as undecodable.
    pub fn reject_mime_type(&mut self, mime_type: impl Into<String>) {
        self.unsupported_mime_types.insert(mime_type.into());
    }

    /// The resource handed out for `url`, if one was requested.
    pub fn resource(&self, url: &str) -> Option<Rc<RefResource>> {
        self.resources.get(url).cloned()
    }

    /// Accepted and refused requests, in order.
    pub fn requests(&self) -> &[ImageRequest] {
        &self.requests
    }

    /// External documents requested by reference filters, in order.
    pub fn external_documents(&self) -> &[String] {
        &self.external_documents
    }
}

impl ResourceLoader for RefLoader {
    fn request_image(
        &mut self,
        request: ImageRequest,
    ) -> Result<Rc<dyn CachedImageResource>, LoadError> {
        let url = request.url.clone();
        self.requests.push(request);
        if self.blocked.contains(&url) {
            return Err(LoadError::Blocked(url));
        }
        let resource = self
            .resources
            .entry(url)
            .or_insert_with_key(|url| RefResource::new(url.clone()));
        let resource: Rc<dyn CachedImageResource> = resource.clone();
        Ok(resource)
    }

    fn load_external_document(&mut self, url: &str, _options: &LoaderOptions) {
        self.external_documents.push(url.to_string());
    }

    fn device_scale_factor(&self) -> f32 {
        self.device_scale_factor
    }

    fn supports_image_mime_type(&self, mime_type: &str) -> bool {
        !self.unsupported_mime_types.contains(mime_type)
    }
}
