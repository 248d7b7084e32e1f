// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `image-set()` candidates and their best-fit rule.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use super::{BestFitImage, BestFitSelector, StyleMultiImage};
use crate::loader::ResourceLoader;
use crate::style_image::{StyleImage, StyleImageKind};

/// One `image-set()` entry.
#[derive(Clone, Debug)]
pub struct ImageSetOption {
    /// The candidate image.
    pub image: Rc<dyn StyleImage>,
    /// Resolution the candidate targets, in device pixels per CSS pixel.
    pub scale_factor: f32,
    /// `type()` hint, if given.
    pub mime_type: Option<String>,
}

impl ImageSetOption {
    /// A candidate without a type hint.
    #[must_use]
    pub fn new(image: Rc<dyn StyleImage>, scale_factor: f32) -> Self {
        Self {
            image,
            scale_factor,
            mime_type: None,
        }
    }

    /// Adds a `type()` hint.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

impl PartialEq for ImageSetOption {
    fn eq(&self, other: &Self) -> bool {
        *self.image == *other.image
            && self.scale_factor == other.scale_factor
            && self.mime_type == other.mime_type
    }
}

/// The candidates of an `image-set()`, in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageSetCandidates {
    options: Vec<ImageSetOption>,
}

impl ImageSetCandidates {
    /// Wraps `options`.
    #[must_use]
    pub fn new(options: Vec<ImageSetOption>) -> Self {
        Self { options }
    }

    /// Candidates in source order.
    #[must_use]
    pub fn options(&self) -> &[ImageSetOption] {
        &self.options
    }
}

impl BestFitSelector for ImageSetCandidates {
    const KIND: StyleImageKind = StyleImageKind::ImageSet;

    /// Picks the lowest resolution that still covers the device scale factor,
    /// or the highest one available.
    fn select_best_fit_image(&self, loader: &dyn ResourceLoader) -> BestFitImage {
        let mut supported: Vec<&ImageSetOption> = self
            .options
            .iter()
            .filter(|option| {
                option
                    .mime_type
                    .as_deref()
                    .is_none_or(|mime| loader.supports_image_mime_type(mime))
            })
            .collect();
        supported.sort_by(|a, b| a.scale_factor.total_cmp(&b.scale_factor));

        let device_scale_factor = loader.device_scale_factor();
        let best = supported
            .iter()
            .find(|option| option.scale_factor >= device_scale_factor)
            .or_else(|| supported.last());
        match best {
            Some(option) => BestFitImage {
                image: Some(Rc::clone(&option.image)),
                scale_factor: option.scale_factor,
                mime_type: option.mime_type.clone(),
            },
            None => BestFitImage::none(),
        }
    }
}

/// `image-set(...)`.
pub type StyleImageSet = StyleMultiImage<ImageSetCandidates>;

impl StyleMultiImage<ImageSetCandidates> {
    /// Creates a pending image set.
    #[must_use]
    pub fn create(options: Vec<ImageSetOption>) -> Rc<Self> {
        Self::new(ImageSetCandidates::new(options))
    }
}
