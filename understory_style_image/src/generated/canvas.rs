// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `-webkit-canvas(name)` images.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Rect, Size};

use super::GeneratedImageBase;
use crate::backend::RenderBackend;
use crate::client::ClientHandle;
use crate::geometry::LayoutSize;
use crate::image::Image;
use crate::loader::{LoaderOptions, ResourceLoader};
use crate::style_image::{StyleImage, StyleImageKind};
use crate::types::{ContainerContext, ElementSet, RendererId, StyleImageSizeType};

/// A canvas element that style can draw from.
pub trait CanvasElement {
    /// Current size of the canvas in CSS pixels.
    fn size(&self) -> Size;

    /// A snapshot of the canvas contents, if it has a backing buffer.
    fn copied_image(&self) -> Option<Image>;

    /// Registers an observer.
    fn add_observer(&self, observer: Weak<dyn CanvasObserver>);

    /// Unregisters an observer.
    fn remove_observer(&self, observer: &Weak<dyn CanvasObserver>);
}

/// Receives notifications from a [`CanvasElement`].
pub trait CanvasObserver {
    /// Part of the canvas was drawn to. `None` means all of it.
    fn canvas_changed(&self, canvas: &dyn CanvasElement, rect: Option<Rect>);

    /// The canvas changed size.
    fn canvas_resized(&self, canvas: &dyn CanvasElement);

    /// The canvas is going away.
    fn canvas_destroyed(&self, canvas: &dyn CanvasElement);

    /// Elements that reference the canvas through this observer.
    fn canvas_referencing_elements(&self, canvas: &dyn CanvasElement) -> ElementSet;
}

/// Looks up named CSS canvases in a document.
pub trait CanvasRegistry {
    /// The canvas registered under `name`, if any.
    fn css_canvas_element(&self, name: &str) -> Option<Rc<dyn CanvasElement>>;
}

/// An image showing the current contents of a named canvas.
///
/// The canvas is looked up lazily, the first time a client registers or the
/// image is sized or rendered, and observed from then on.
pub struct StyleCanvasImage {
    name: String,
    registry: Weak<dyn CanvasRegistry>,
    element: RefCell<Option<Weak<dyn CanvasElement>>>,
    base: GeneratedImageBase,
    this: Weak<Self>,
}

impl StyleCanvasImage {
    /// Creates an image for the canvas registered as `name` in `registry`.
    #[must_use]
    pub fn create<R: CanvasRegistry + 'static>(name: impl Into<String>, registry: &Rc<R>) -> Rc<Self> {
        let registry: Weak<R> = Rc::downgrade(registry);
        let registry: Weak<dyn CanvasRegistry> = registry;
        let name = name.into();
        Rc::new_cyclic(|this| Self {
            name,
            registry,
            element: RefCell::new(None),
            base: GeneratedImageBase::new(true),
            this: this.clone(),
        })
    }

    /// The canvas name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canvas, resolving and observing it on first use.
    #[must_use]
    pub fn element(&self) -> Option<Rc<dyn CanvasElement>> {
        let current = self.element.borrow().as_ref().and_then(Weak::upgrade);
        if current.is_some() {
            return current;
        }
        let element = self.registry.upgrade()?.css_canvas_element(&self.name)?;
        element.add_observer(self.observer());
        *self.element.borrow_mut() = Some(Rc::downgrade(&element));
        Some(element)
    }

    /// The canvas size.
    #[must_use]
    pub fn fixed_size(&self) -> LayoutSize {
        self.element()
            .map_or(LayoutSize::ZERO, |element| LayoutSize::from_size(element.size()))
    }

    fn observer(&self) -> Weak<dyn CanvasObserver> {
        let weak: Weak<Self> = self.this.clone();
        weak
    }

    /// Looks the canvas up and starts observing it if that has not happened.
    fn resolve_element(&self) {
        if self.element().is_none() {
            log::trace!("no canvas named {} yet", self.name);
        }
    }

    fn is_own_element(&self, canvas: &dyn CanvasElement) -> bool {
        let own = self
            .element
            .borrow()
            .as_ref()
            .is_some_and(|own| core::ptr::addr_eq(own.as_ptr(), canvas));
        if !own {
            log::warn!("canvas image {:?} ignoring a foreign canvas", self.name);
        }
        own
    }
}

impl fmt::Debug for StyleCanvasImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleCanvasImage")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Drop for StyleCanvasImage {
    fn drop(&mut self) {
        if let Some(element) = self.element.get_mut().take().and_then(|weak| weak.upgrade()) {
            element.remove_observer(&self.observer());
        }
    }
}

impl StyleImage for StyleCanvasImage {
    fn kind(&self) -> StyleImageKind {
        StyleImageKind::CanvasImage
    }

    fn equals(&self, other: &dyn StyleImage) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| self.name == other.name)
    }

    fn add_client(&self, client: ClientHandle) {
        self.resolve_element();
        self.base.add_client(client);
    }

    fn remove_client(&self, client: &ClientHandle) {
        self.base.remove_client(self, client);
    }

    fn has_client(&self, client: &ClientHandle) -> bool {
        self.base.has_client(client)
    }

    fn is_pending(&self) -> bool {
        false
    }

    fn load(&self, _loader: &mut dyn ResourceLoader, _options: &LoaderOptions) {
        self.base.begin_load(self);
    }

    fn image_size_for_renderer(
        &self,
        renderer: Option<RendererId>,
        multiplier: f32,
        _size_type: StyleImageSizeType,
    ) -> LayoutSize {
        self.base
            .image_size(renderer, multiplier, || self.fixed_size())
    }

    fn image_has_natural_dimensions(&self) -> bool {
        self.base.is_fixed_size()
    }

    fn set_container_context_for_renderer(&self, renderer: RendererId, context: ContainerContext) {
        self.base.set_container_context(renderer, &context);
    }

    fn image_for_renderer(
        &self,
        renderer: Option<RendererId>,
        _size: Size,
        _is_for_first_line: bool,
        _backend: &mut dyn RenderBackend,
    ) -> Option<Image> {
        if renderer.is_none() {
            return Some(Image::Null);
        }
        self.element()?.copied_image()
    }

    fn known_to_be_opaque(&self, _renderer: Option<RendererId>) -> bool {
        false
    }
}

impl CanvasObserver for StyleCanvasImage {
    fn canvas_changed(&self, canvas: &dyn CanvasElement, rect: Option<Rect>) {
        if self.is_own_element(canvas) {
            self.base.republish_changed(self, rect);
        }
    }

    fn canvas_resized(&self, canvas: &dyn CanvasElement) {
        if self.is_own_element(canvas) {
            self.base.republish_changed(self, None);
        }
    }

    fn canvas_destroyed(&self, canvas: &dyn CanvasElement) {
        if self.is_own_element(canvas) {
            *self.element.borrow_mut() = None;
            self.base.republish_changed(self, None);
        }
    }

    fn canvas_referencing_elements(&self, canvas: &dyn CanvasElement) -> ElementSet {
        if !self.is_own_element(canvas) {
            return ElementSet::new();
        }
        self.base.referencing_elements(self)
    }
}
