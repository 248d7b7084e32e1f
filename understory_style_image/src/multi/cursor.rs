// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `cursor: url(...) x y` images.

use alloc::rc::Rc;

use kurbo::Point;

use super::{BestFitImage, BestFitSelector, StyleImageSet, StyleMultiImage};
use crate::loader::ResourceLoader;
use crate::style_image::{StyleImage, StyleImageKind};

/// The image behind a cursor and its hot spot.
///
/// When the image is an image set, selection is the set's.
#[derive(Clone, Debug)]
pub struct CursorSource {
    image: Rc<dyn StyleImage>,
    hot_spot: Option<Point>,
}

impl CursorSource {
    /// Wraps `image` with an optional hot spot in image pixels.
    #[must_use]
    pub fn new(image: Rc<dyn StyleImage>, hot_spot: Option<Point>) -> Self {
        Self { image, hot_spot }
    }

    /// The wrapped image.
    #[must_use]
    pub fn image(&self) -> &Rc<dyn StyleImage> {
        &self.image
    }

    /// The explicit hot spot, if one was given.
    #[must_use]
    pub fn hot_spot(&self) -> Option<Point> {
        self.hot_spot
    }
}

impl PartialEq for CursorSource {
    fn eq(&self, other: &Self) -> bool {
        *self.image == *other.image && self.hot_spot == other.hot_spot
    }
}

impl BestFitSelector for CursorSource {
    const KIND: StyleImageKind = StyleImageKind::CursorImage;

    fn select_best_fit_image(&self, loader: &dyn ResourceLoader) -> BestFitImage {
        if let Some(image_set) = self.image.downcast_ref::<StyleImageSet>() {
            return image_set.selector().select_best_fit_image(loader);
        }
        BestFitImage {
            image: Some(Rc::clone(&self.image)),
            scale_factor: self.image.image_scale_factor(),
            mime_type: None,
        }
    }
}

/// A cursor image.
pub type StyleCursorImage = StyleMultiImage<CursorSource>;

impl StyleMultiImage<CursorSource> {
    /// Creates a pending cursor image.
    #[must_use]
    pub fn create(image: Rc<dyn StyleImage>, hot_spot: Option<Point>) -> Rc<Self> {
        Self::new(CursorSource::new(image, hot_spot))
    }

    /// The explicit hot spot, if one was given.
    #[must_use]
    pub fn hot_spot(&self) -> Option<Point> {
        self.selector().hot_spot()
    }
}
