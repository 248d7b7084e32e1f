// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named canvases for `-webkit-canvas()` images.

use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use hashbrown::HashMap;
use kurbo::{Rect, Size};
use understory_style_image::{CanvasElement, CanvasObserver, CanvasRegistry, ElementSet, Image};

/// A canvas whose drawing is driven by the test.
pub struct RefCanvas {
    size: Cell<Size>,
    image: Cell<Option<Image>>,
    observers: RefCell<Vec<Weak<dyn CanvasObserver>>>,
}

impl RefCanvas {
    /// Creates a blank canvas with no backing buffer.
    pub fn new(size: Size) -> Rc<Self> {
        Rc::new(Self {
            size: Cell::new(size),
            image: Cell::new(None),
            observers: RefCell::default(),
        })
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|observer| observer.strong_count() > 0)
            .count()
    }

    /// Replaces the contents and reports `rect` as drawn.
    pub fn draw(&self, image: Image, rect: Option<Rect>) {
        self.image.set(Some(image));
        self.for_each_observer(|observer| observer.canvas_changed(self, rect));
    }

    /// Changes the size and reports it.
    pub fn resize(&self, size: Size) {
        self.size.set(size);
        self.for_each_observer(|observer| observer.canvas_resized(self));
    }

    /// Tells observers the canvas is going away.
    pub fn destroy(&self) {
        self.for_each_observer(|observer| observer.canvas_destroyed(self));
    }

    /// Union of the elements every observer reports.
    pub fn referencing_elements(&self) -> ElementSet {
        let mut elements = ElementSet::new();
        self.for_each_observer(|observer| {
            elements.extend(observer.canvas_referencing_elements(self));
        });
        elements
    }

    fn for_each_observer(&self, mut f: impl FnMut(&dyn CanvasObserver)) {
        let observers = self.observers.borrow().clone();
        for observer in observers.iter().filter_map(Weak::upgrade) {
            f(&*observer);
        }
    }
}

impl fmt::Debug for RefCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCanvas")
            .field("size", &self.size.get())
            .field("image", &self.image.get())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl CanvasElement for RefCanvas {
    fn size(&self) -> Size {
        self.size.get()
    }

    fn copied_image(&self) -> Option<Image> {
        self.image.get()
    }

    fn add_observer(&self, observer: Weak<dyn CanvasObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    fn remove_observer(&self, observer: &Weak<dyn CanvasObserver>) {
        self.observers
            .borrow_mut()
            .retain(|existing| !Weak::ptr_eq(existing, observer));
    }
}

/// A document's named CSS canvases.
#[derive(Debug, Default)]
pub struct RefCanvasDocument {
    canvases: RefCell<HashMap<String, Rc<RefCanvas>>>,
    lookups: Cell<u32>,
}

impl RefCanvasDocument {
    /// Creates an empty document.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers `canvas` as `name`.
    pub fn insert(&self, name: impl Into<String>, canvas: Rc<RefCanvas>) {
        self.canvases.borrow_mut().insert(name.into(), canvas);
    }

    /// Unregisters `name`.
    pub fn remove(&self, name: &str) -> Option<Rc<RefCanvas>> {
        self.canvases.borrow_mut().remove(name)
    }

    /// How many lookups were made.
    pub fn lookups(&self) -> u32 {
        self.lookups.get()
    }
}

impl CanvasRegistry for RefCanvasDocument {
    fn css_canvas_element(&self, name: &str) -> Option<Rc<dyn CanvasElement>> {
        self.lookups.set(self.lookups.get() + 1);
        let canvas: Rc<dyn CanvasElement> = self.canvases.borrow().get(name)?.clone();
        Some(canvas)
    }
}
