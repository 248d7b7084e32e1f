// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observers of style images and the counted client set.
//!
//! A [`StyleImageClient`] is anything that wants to hear about an image's
//! lifecycle: renderers, and generated images observing their inputs.
//! Images hold clients through [`ClientHandle`]s, which are weak, so an image
//! never extends the lifetime of a client.
//!
//! Registration is counted: the same client may register several times and
//! must be removed the same number of times. [`ClientSet`] keeps insertion
//! order so that fan-out is deterministic.

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;

use kurbo::Rect;
use smallvec::SmallVec;

use crate::loader::CachedImageResource;
use crate::style_image::StyleImage;
use crate::types::{DocumentId, ElementSet, ImageAnimatingState, VisibleInViewport};

/// Receives lifecycle events from a [`StyleImage`].
///
/// Every callback gets the image that produced the event. For a generated
/// image re-publishing an input's event, that is the generated image, not the
/// input.
///
/// Handlers may call back into the image (including removing themselves);
/// delivery tolerates that.
pub trait StyleImageClient {
    /// Decoded pixels changed. `None` means the whole image.
    fn style_image_changed(&self, image: &dyn StyleImage, rect: Option<Rect>);

    /// One underlying resource finished loading.
    ///
    /// Composites may deliver this several times, once per resource.
    fn style_image_finished_resource_load(
        &self,
        image: &dyn StyleImage,
        resource: &dyn CachedImageResource,
    ) {
        let _ = (image, resource);
    }

    /// Every underlying resource finished loading.
    fn style_image_finished_load(&self, image: &dyn StyleImage) {
        let _ = image;
    }

    /// The image wants a rendering update to be scheduled.
    fn style_image_needs_scheduled_rendering_update(&self, image: &dyn StyleImage) {
        let _ = image;
    }

    /// Whether the image may drop its decoded data.
    fn style_image_can_destroy_decoded_data(&self, image: &dyn StyleImage) -> bool {
        let _ = image;
        true
    }

    /// Whether this client allows the image to animate.
    fn style_image_animation_allowed(&self, image: &dyn StyleImage) -> bool {
        let _ = image;
        true
    }

    /// A new decoded frame is ready.
    fn style_image_frame_available(
        &self,
        image: &dyn StyleImage,
        state: ImageAnimatingState,
        rect: Option<Rect>,
    ) -> VisibleInViewport {
        let _ = (image, state, rect);
        VisibleInViewport::No
    }

    /// Whether this client shows the image inside `document`'s viewport.
    fn style_image_visible_in_viewport(
        &self,
        image: &dyn StyleImage,
        document: DocumentId,
    ) -> VisibleInViewport {
        let _ = (image, document);
        VisibleInViewport::No
    }

    /// Elements that reference the image through this client.
    fn style_image_referencing_elements(&self, image: &dyn StyleImage) -> ElementSet {
        let _ = image;
        ElementSet::new()
    }

    /// This client's registration count on `image` dropped to zero.
    fn style_image_client_removed(&self, image: &dyn StyleImage) {
        let _ = image;
    }
}

/// A weak, identity-compared reference to a [`StyleImageClient`].
///
/// Two handles are equal when they point at the same client object.
#[derive(Clone, Debug)]
pub struct ClientHandle(Weak<dyn StyleImageClient>);

impl ClientHandle {
    /// Creates a handle to `client`.
    #[must_use]
    pub fn new<C: StyleImageClient + 'static>(client: &Rc<C>) -> Self {
        let weak: Weak<C> = Rc::downgrade(client);
        let weak: Weak<dyn StyleImageClient> = weak;
        Self(weak)
    }

    /// Creates a handle to an already type-erased client.
    #[must_use]
    pub fn from_rc(client: &Rc<dyn StyleImageClient>) -> Self {
        Self(Rc::downgrade(client))
    }

    /// Wraps an existing weak reference.
    #[must_use]
    pub fn from_weak(client: Weak<dyn StyleImageClient>) -> Self {
        Self(client)
    }

    /// Returns the client if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Rc<dyn StyleImageClient>> {
        self.0.upgrade()
    }

    /// Returns `true` while the client is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClientHandle {}

/// Outcome of [`ClientSet::remove`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClientRemoval {
    /// The count went down but the client is still registered.
    Decremented,
    /// The count reached zero and the client was removed.
    Removed,
    /// The client was not registered; nothing changed.
    NotRegistered,
}

/// Most images have one or two consumers.
const INLINE_CAPACITY: usize = 2;

/// An insertion-ordered counted set of clients.
///
/// ```rust
/// use std::rc::Rc;
/// use kurbo::Rect;
/// use understory_style_image::{ClientHandle, ClientRemoval, ClientSet, StyleImage, StyleImageClient};
///
/// struct Renderer;
///
/// impl StyleImageClient for Renderer {
///     fn style_image_changed(&self, _: &dyn StyleImage, _: Option<Rect>) {}
/// }
///
/// let renderer = Rc::new(Renderer);
/// let handle = ClientHandle::new(&renderer);
///
/// let mut clients = ClientSet::new();
/// clients.add(handle.clone());
/// clients.add(handle.clone());
/// assert_eq!(clients.count(&handle), 2);
///
/// assert_eq!(clients.remove(&handle), ClientRemoval::Decremented);
/// assert_eq!(clients.remove(&handle), ClientRemoval::Removed);
/// assert_eq!(clients.remove(&handle), ClientRemoval::NotRegistered);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientSet {
    entries: SmallVec<[(ClientHandle, u32); INLINE_CAPACITY]>,
}

impl ClientSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client` once more and returns its new count.
    ///
    /// Entries of clients that have been dropped are pruned first.
    pub fn add(&mut self, client: ClientHandle) -> u32 {
        self.entries.retain(|(handle, _)| handle.is_alive());
        if let Some((_, count)) = self.entries.iter_mut().find(|(h, _)| *h == client) {
            *count = count.saturating_add(1);
            return *count;
        }
        self.entries.push((client, 1));
        1
    }

    /// Unregisters `client` once.
    pub fn remove(&mut self, client: &ClientHandle) -> ClientRemoval {
        let Some(index) = self.entries.iter().position(|(h, _)| h == client) else {
            return ClientRemoval::NotRegistered;
        };
        let count = &mut self.entries[index].1;
        if *count > 1 {
            *count -= 1;
            ClientRemoval::Decremented
        } else {
            self.entries.remove(index);
            ClientRemoval::Removed
        }
    }

    /// Returns `true` if `client` is registered at least once.
    #[must_use]
    pub fn contains(&self, client: &ClientHandle) -> bool {
        self.entries.iter().any(|(h, _)| h == client)
    }

    /// How many times `client` is registered.
    #[must_use]
    pub fn count(&self, client: &ClientHandle) -> u32 {
        self.entries
            .iter()
            .find(|(h, _)| h == client)
            .map_or(0, |(_, count)| *count)
    }

    /// Number of distinct clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct clients with their counts, in first-registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ClientHandle, u32)> + '_ {
        self.entries.iter().map(|(h, count)| (h, *count))
    }

    /// A copy of the distinct clients, in first-registration order.
    #[must_use]
    pub fn snapshot(&self) -> SmallVec<[ClientHandle; 4]> {
        self.entries.iter().map(|(h, _)| h.clone()).collect()
    }
}

/// The client set of one image, with re-entrancy safe delivery.
#[derive(Debug, Default)]
pub(crate) struct ImageClients {
    set: RefCell<ClientSet>,
}

impl ImageClients {
    pub(crate) fn add(&self, client: ClientHandle) {
        self.set.borrow_mut().add(client);
    }

    /// Unregisters once; tells the client when its count reaches zero.
    ///
    /// Returns `true` when the client is gone from the set.
    pub(crate) fn remove(&self, image: &dyn StyleImage, client: &ClientHandle) -> bool {
        let removal = self.set.borrow_mut().remove(client);
        notify_removal(image, client, removal)
    }

    pub(crate) fn contains(&self, client: &ClientHandle) -> bool {
        self.set.borrow().contains(client)
    }

    /// Delivers to every live client in registration order.
    ///
    /// The set is snapshotted first; a client removed by an earlier handler
    /// is skipped.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&ClientHandle, &dyn StyleImageClient)) {
        let snapshot = self.set.borrow().snapshot();
        for handle in &snapshot {
            if !self.contains(handle) {
                continue;
            }
            if let Some(client) = handle.upgrade() {
                f(handle, &*client);
            }
        }
    }

    /// `true` unless some client answers `false`.
    pub(crate) fn all(&self, mut f: impl FnMut(&dyn StyleImageClient) -> bool) -> bool {
        let mut result = true;
        self.for_each(|_, client| {
            if result && !f(client) {
                result = false;
            }
        });
        result
    }

    /// `true` if some client answers `true`.
    pub(crate) fn any(&self, mut f: impl FnMut(&dyn StyleImageClient) -> bool) -> bool {
        let mut result = false;
        self.for_each(|_, client| {
            if !result && f(client) {
                result = true;
            }
        });
        result
    }

    /// Asks every client and reports visible if any of them is.
    pub(crate) fn any_visible(
        &self,
        mut f: impl FnMut(&dyn StyleImageClient) -> VisibleInViewport,
    ) -> VisibleInViewport {
        let mut result = VisibleInViewport::No;
        self.for_each(|_, client| {
            if f(client).is_visible() {
                result = VisibleInViewport::Yes;
            }
        });
        result
    }

    pub(crate) fn referencing_elements(&self, image: &dyn StyleImage) -> ElementSet {
        let mut elements = ElementSet::new();
        self.for_each(|_, client| {
            elements.extend(client.style_image_referencing_elements(image));
        });
        elements
    }
}

/// Finishes a removal: logs stray removals and notifies a fully removed client.
pub(crate) fn notify_removal(
    image: &dyn StyleImage,
    client: &ClientHandle,
    removal: ClientRemoval,
) -> bool {
    match removal {
        ClientRemoval::Decremented => false,
        ClientRemoval::Removed => {
            if let Some(client) = client.upgrade() {
                client.style_image_client_removed(image);
            }
            true
        }
        ClientRemoval::NotRegistered => {
            log::warn!(
                "ignoring removal of a client that is not registered with a {:?}",
                image.kind()
            );
            false
        }
    }
}
