// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Images that pick one of several candidates when loaded.
//!
//! A [`StyleMultiImage`] starts out pending. Until [`load`] runs it only
//! buffers what consumers ask of it: client registrations (with counts),
//! async-decoding requests and container contexts. `load` asks its
//! [`BestFitSelector`] for a candidate, replays the buffered requests onto
//! it in submission order, and from then on forwards everything to it.
//!
//! [`load`]: StyleImage::load

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::mem;

use kurbo::Size;

use crate::backend::RenderBackend;
use crate::cached::StyleCachedImage;
use crate::client::{ClientHandle, ClientSet, notify_removal};
use crate::generated::StyleInvalidImage;
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{CachedImageResource, LoaderOptions, ResourceLoader};
use crate::style_image::{StyleImage, StyleImageKind, downcast_rc};
use crate::types::{ContainerContext, NaturalDimensions, RendererId, StyleImageSizeType};

mod cursor;
mod image_set;

pub use cursor::{CursorSource, StyleCursorImage};
pub use image_set::{ImageSetCandidates, ImageSetOption, StyleImageSet};

/// The candidate a [`BestFitSelector`] picked.
#[derive(Clone, Debug)]
pub struct BestFitImage {
    /// The chosen image; `None` when no candidate is usable.
    pub image: Option<Rc<dyn StyleImage>>,
    /// Device pixels per CSS pixel the candidate was authored for.
    pub scale_factor: f32,
    /// Declared MIME type, if any.
    pub mime_type: Option<String>,
}

impl BestFitImage {
    /// Nothing usable.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            image: None,
            scale_factor: 1.0,
            mime_type: None,
        }
    }
}

/// Chooses the image a [`StyleMultiImage`] resolves to.
pub trait BestFitSelector: PartialEq + fmt::Debug + 'static {
    /// Variant tag reported by the multi-image.
    const KIND: StyleImageKind;

    /// Picks a candidate for the loader's document.
    fn select_best_fit_image(&self, loader: &dyn ResourceLoader) -> BestFitImage;
}

/// Requests received before a candidate was selected.
#[derive(Debug, Default)]
struct PendingRegistrations {
    clients: ClientSet,
    waiting_for_async_decoding: Vec<ClientHandle>,
    force_all_waiting: bool,
    container_requests: Vec<(RendererId, ContainerContext)>,
}

#[derive(Debug)]
enum MultiImageState {
    Pending(PendingRegistrations),
    Selected(Rc<dyn StyleImage>),
}

/// A resolution-selecting image, generic over how it selects.
pub struct StyleMultiImage<S> {
    selector: S,
    load_called: Cell<bool>,
    state: RefCell<MultiImageState>,
}

impl<S: BestFitSelector> StyleMultiImage<S> {
    /// Creates a pending multi-image.
    #[must_use]
    pub fn new(selector: S) -> Rc<Self> {
        Rc::new(Self {
            selector,
            load_called: Cell::new(false),
            state: RefCell::new(MultiImageState::Pending(PendingRegistrations::default())),
        })
    }

    /// The selection strategy and its candidates.
    #[must_use]
    pub fn selector(&self) -> &S {
        &self.selector
    }

    /// The selected image, once loaded.
    fn selection(&self) -> Option<Rc<dyn StyleImage>> {
        match &*self.state.borrow() {
            MultiImageState::Selected(image) => Some(Rc::clone(image)),
            MultiImageState::Pending(_) => None,
        }
    }

    fn resolve_selection(&self, loader: &dyn ResourceLoader) -> Rc<dyn StyleImage> {
        let best = self.selector.select_best_fit_image(loader);
        let Some(image) = best.image else {
            log::debug!("{:?} has no usable candidate", S::KIND);
            return StyleInvalidImage::create();
        };
        match downcast_rc::<StyleCachedImage>(&image) {
            Some(cached) => {
                let copy: Rc<dyn StyleImage> = cached.copy_overriding_scale_factor(best.scale_factor);
                copy
            }
            None => image,
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StyleMultiImage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleMultiImage")
            .field("selector", &self.selector)
            .field("load_called", &self.load_called.get())
            .field("state", &self.state)
            .finish()
    }
}

impl<S: BestFitSelector> StyleImage for StyleMultiImage<S> {
    fn kind(&self) -> StyleImageKind {
        S::KIND
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| self.selector == other.selector)
    }

    fn add_client(&self, client: ClientHandle) {
        let selection = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                MultiImageState::Selected(image) => Rc::clone(image),
                MultiImageState::Pending(pending) => {
                    pending.clients.add(client);
                    return;
                }
            }
        };
        selection.add_client(client);
    }

    fn remove_client(&self, client: &ClientHandle) {
        let removal = match &mut *self.state.borrow_mut() {
            MultiImageState::Pending(pending) => Ok(pending.clients.remove(client)),
            MultiImageState::Selected(image) => Err(Rc::clone(image)),
        };
        match removal {
            Ok(removal) => {
                notify_removal(self, client, removal);
            }
            Err(selection) => selection.remove_client(client),
        }
    }

    fn has_client(&self, client: &ClientHandle) -> bool {
        match &*self.state.borrow() {
            MultiImageState::Pending(pending) => pending.clients.contains(client),
            MultiImageState::Selected(image) => image.has_client(client),
        }
    }

    fn is_pending(&self) -> bool {
        !self.load_called.get()
    }

    fn load(&self, loader: &mut dyn ResourceLoader, options: &LoaderOptions) {
        if self.load_called.replace(true) {
            log::warn!("load() called more than once for a {:?}", S::KIND);
            return;
        }
        let selection = self.resolve_selection(&*loader);
        let previous = mem::replace(
            &mut *self.state.borrow_mut(),
            MultiImageState::Selected(Rc::clone(&selection)),
        );
        let MultiImageState::Pending(pending) = previous else {
            log::warn!("{:?} selected an image twice", S::KIND);
            return;
        };
        log::trace!(
            "{:?} selected a {:?}, replaying {} clients and {} container requests",
            S::KIND,
            selection.kind(),
            pending.clients.len(),
            pending.container_requests.len()
        );
        for (client, count) in pending.clients.iter() {
            for _ in 0..count {
                selection.add_client(client.clone());
            }
        }
        for client in &pending.waiting_for_async_decoding {
            selection.add_client_waiting_for_async_decoding(client);
        }
        for (renderer, context) in pending.container_requests {
            selection.set_container_context_for_renderer(renderer, context);
        }
        if selection.is_pending() {
            selection.load(loader, options);
        }
    }

    fn is_loaded(&self) -> bool {
        self.selection().is_some_and(|image| image.is_loaded())
    }

    fn error_occurred(&self) -> bool {
        self.selection().is_some_and(|image| image.error_occurred())
    }

    fn can_render(&self, renderer: Option<RendererId>, multiplier: f32) -> bool {
        self.selection()
            .is_some_and(|image| image.can_render(renderer, multiplier))
    }

    fn cached_resource(&self) -> Option<Rc<dyn CachedImageResource>> {
        self.selection()?.cached_resource()
    }

    fn uses_data_protocol(&self) -> bool {
        self.selection()
            .is_some_and(|image| image.uses_data_protocol())
    }

    fn selected_image(&self) -> Option<Rc<dyn StyleImage>> {
        self.selection()
    }

    fn image_size_for_renderer(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        size_type: StyleImageSizeType,
    ) -> LayoutSize {
        self.selection().map_or(LayoutSize::ZERO, |image| {
            image.image_size_for_renderer(renderer, multiplier, size_type)
        })
    }

    fn natural_dimensions(&self) -> NaturalDimensions {
        self.selection()
            .map_or(NaturalDimensions::NONE, |image| image.natural_dimensions())
    }

    fn uses_image_container_size(&self) -> bool {
        self.selection()
            .is_some_and(|image| image.uses_image_container_size())
    }

    fn image_has_relative_width(&self) -> bool {
        self.selection()
            .is_some_and(|image| image.image_has_relative_width())
    }

    fn image_has_relative_height(&self) -> bool {
        self.selection()
            .is_some_and(|image| image.image_has_relative_height())
    }

    fn image_has_natural_dimensions(&self) -> bool {
        self.selection()
            .is_some_and(|image| image.image_has_natural_dimensions())
    }

    fn image_scale_factor(&self) -> f32 {
        self.selection()
            .map_or(1.0, |image| image.image_scale_factor())
    }

    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext) {
        if context.is_empty() {
            return;
        }
        let selection = match &mut *self.state.borrow_mut() {
            MultiImageState::Selected(image) => Rc::clone(image),
            MultiImageState::Pending(pending) => {
                pending.container_requests.push((renderer, context));
                return;
            }
        };
        selection.set_container_context_for_renderer(renderer, context);
    }

    fn image_for_renderer(
        &self,
        renderer: Option<RendererId>,
        size: Size,
        is_for_first_line: bool,
        backend: &mut dyn RenderBackend,
    ) -> Option<Image> {
        match self.selection() {
            Some(image) => image.image_for_renderer(renderer, size, is_for_first_line, backend),
            None => Some(Image::Null),
        }
    }

    fn known_to_be_opaque(&self, renderer: Option<RendererId>) -> bool {
        self.selection()
            .is_some_and(|image| image.known_to_be_opaque(renderer))
    }

    fn stop_animation(&self) {
        if let Some(image) = self.selection() {
            image.stop_animation();
        }
    }

    fn reset_animation(&self) {
        if let Some(image) = self.selection() {
            image.reset_animation();
        }
    }

    fn is_client_waiting_for_async_decoding(&self, client: &ClientHandle) -> bool {
        match &*self.state.borrow() {
            MultiImageState::Pending(pending) => {
                pending.force_all_waiting || pending.waiting_for_async_decoding.contains(client)
            }
            MultiImageState::Selected(image) => image.is_client_waiting_for_async_decoding(client),
        }
    }

    fn add_client_waiting_for_async_decoding(&self, client: &ClientHandle) {
        let selection = match &mut *self.state.borrow_mut() {
            MultiImageState::Selected(image) => Rc::clone(image),
            MultiImageState::Pending(pending) => {
                if pending.force_all_waiting || pending.waiting_for_async_decoding.contains(client) {
                    return;
                }
                if !pending.clients.contains(client) {
                    pending.force_all_waiting = true;
                }
                pending.waiting_for_async_decoding.push(client.clone());
                return;
            }
        };
        selection.add_client_waiting_for_async_decoding(client);
    }

    fn remove_all_clients_waiting_for_async_decoding(&self) {
        let selection = match &mut *self.state.borrow_mut() {
            MultiImageState::Selected(image) => Rc::clone(image),
            MultiImageState::Pending(pending) => {
                pending.waiting_for_async_decoding.clear();
                pending.force_all_waiting = false;
                return;
            }
        };
        selection.remove_all_clients_waiting_for_async_decoding();
    }
}
