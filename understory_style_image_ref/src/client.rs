// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A style image client that records what it hears.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Rect;
use understory_style_image::{
    CachedImageResource, ClientHandle, DocumentId, ElementSet, ImageAnimatingState, StyleImage,
    StyleImageClient, StyleImageKind, VisibleInViewport,
};

/// A notification received by [`RecordingClient`].
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// `style_image_changed`.
    Changed {
        /// Kind of the image that sent the event.
        kind: StyleImageKind,
        /// Dirty rectangle.
        rect: Option<Rect>,
    },
    /// `style_image_finished_resource_load`.
    FinishedResourceLoad {
        /// Kind of the image that sent the event.
        kind: StyleImageKind,
        /// URL of the resource that finished.
        url: String,
    },
    /// `style_image_finished_load`.
    FinishedLoad {
        /// Kind of the image that sent the event.
        kind: StyleImageKind,
    },
    /// `style_image_needs_scheduled_rendering_update`.
    ScheduledRenderingUpdate {
        /// Kind of the image that sent the event.
        kind: StyleImageKind,
    },
    /// `style_image_frame_available`.
    FrameAvailable {
        /// Kind of the image that sent the event.
        kind: StyleImageKind,
        /// Whether the image is animating.
        state: ImageAnimatingState,
    },
    /// `style_image_client_removed`.
    Removed {
        /// Kind of the image that sent the event.
        kind: StyleImageKind,
    },
}

type Hook = Box<dyn Fn(&RecordingClient, &dyn StyleImage)>;

/// Records notifications and answers queries with configurable values.
///
/// By default it allows destroying decoded data and animation, reports
/// itself not visible, and references no elements.
pub struct RecordingClient {
    name: String,
    events: RefCell<Vec<ClientEvent>>,
    can_destroy_decoded_data: Cell<bool>,
    animation_allowed: Cell<bool>,
    visible: Cell<VisibleInViewport>,
    elements: RefCell<ElementSet>,
    on_changed: RefCell<Option<Hook>>,
}

impl RecordingClient {
    /// Creates a client; `name` only shows up in debug output.
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            events: RefCell::default(),
            can_destroy_decoded_data: Cell::new(true),
            animation_allowed: Cell::new(true),
            visible: Cell::new(VisibleInViewport::No),
            elements: RefCell::default(),
            on_changed: RefCell::default(),
        })
    }

    /// A handle for registering with images.
    pub fn handle(self: &Rc<Self>) -> ClientHandle {
        ClientHandle::new(self)
    }

    /// Notifications received so far.
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.borrow().clone()
    }

    /// Returns and clears the notifications received so far.
    pub fn take_events(&self) -> Vec<ClientEvent> {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of recorded notifications matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ClientEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }

    /// Answer for `style_image_can_destroy_decoded_data`.
    pub fn set_can_destroy_decoded_data(&self, value: bool) {
        self.can_destroy_decoded_data.set(value);
    }

    /// Answer for `style_image_animation_allowed`.
    pub fn set_animation_allowed(&self, value: bool) {
        self.animation_allowed.set(value);
    }

    /// Answer for visibility queries and frame notifications.
    pub fn set_visible(&self, visible: VisibleInViewport) {
        self.visible.set(visible);
    }

    /// Answer for `style_image_referencing_elements`.
    pub fn set_elements(&self, elements: ElementSet) {
        *self.elements.borrow_mut() = elements;
    }

    /// Runs `hook` after recording each `style_image_changed`.
    ///
    /// The hook may call back into the image, for example to unregister.
    pub fn on_changed(&self, hook: impl Fn(&Self, &dyn StyleImage) + 'static) {
        *self.on_changed.borrow_mut() = Some(Box::new(hook));
    }

    fn record(&self, event: ClientEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl fmt::Debug for RecordingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingClient")
            .field("name", &self.name)
            .field("events", &self.events.borrow().len())
            .finish_non_exhaustive()
    }
}

impl StyleImageClient for RecordingClient {
    fn style_image_changed(&self, image: &dyn StyleImage, rect: Option<Rect>) {
        self.record(ClientEvent::Changed {
            kind: image.kind(),
            rect,
        });
        if let Some(hook) = &*self.on_changed.borrow() {
            hook(self, image);
        }
    }

    fn style_image_finished_resource_load(
        &self,
        image: &dyn StyleImage,
        resource: &dyn CachedImageResource,
    ) {
        self.record(ClientEvent::FinishedResourceLoad {
            kind: image.kind(),
            url: resource.url().to_string(),
        });
    }

    fn style_image_finished_load(&self, image: &dyn StyleImage) {
        self.record(ClientEvent::FinishedLoad { kind: image.kind() });
    }

    fn style_image_needs_scheduled_rendering_update(&self, image: &dyn StyleImage) {
        self.record(ClientEvent::ScheduledRenderingUpdate { kind: image.kind() });
    }

    fn style_image_can_destroy_decoded_data(&self, _image: &dyn StyleImage) -> bool {
        self.can_destroy_decoded_data.get()
    }

    fn style_image_animation_allowed(&self, _image: &dyn StyleImage) -> bool {
        self.animation_allowed.get()
    }

    fn style_image_frame_available(
        &self,
        image: &dyn StyleImage,
        state: ImageAnimatingState,
        _rect: Option<Rect>,
    ) -> VisibleInViewport {
        self.record(ClientEvent::FrameAvailable {
            kind: image.kind(),
            state,
        });
        self.visible.get()
    }

    fn style_image_visible_in_viewport(
        &self,
        _image: &dyn StyleImage,
        _document: DocumentId,
    ) -> VisibleInViewport {
        self.visible.get()
    }

    fn style_image_referencing_elements(&self, _image: &dyn StyleImage) -> ElementSet {
        self.elements.borrow().clone()
    }

    fn style_image_client_removed(&self, image: &dyn StyleImage) {
        self.record(ClientEvent::Removed { kind: image.kind() });
    }
}
