// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A render backend that allocates image handles and records every call.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Size;
use peniko::Gradient;
use understory_style_image::{FilterOperation, Image, ImageId, RenderBackend};

/// First handle the backend allocates, well clear of ids tests pick by hand.
pub const FIRST_BACKEND_IMAGE_ID: u32 = 1 << 16;

/// A call made on [`RecordingBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// [`RenderBackend::render_at`].
    RenderAt {
        /// Image drawn into the target.
        source: Image,
        /// Target size.
        size: Size,
    },
    /// [`RenderBackend::compose_filter`].
    ComposeFilter {
        /// Filtered image.
        source: Image,
        /// Filters applied.
        operations: Vec<FilterOperation>,
        /// Target size.
        size: Size,
    },
    /// [`RenderBackend::crossfade`].
    Crossfade {
        /// Image faded out of.
        from: Image,
        /// Image faded into.
        to: Image,
        /// Blend position.
        percentage: f64,
        /// Target size.
        size: Size,
    },
    /// [`RenderBackend::fill_gradient`].
    FillGradient {
        /// Resolved gradient.
        gradient: Gradient,
        /// Target size.
        size: Size,
    },
    /// [`RenderBackend::render_named_image`].
    NamedImage {
        /// Platform image name.
        name: String,
        /// Target size.
        size: Size,
    },
    /// [`RenderBackend::render_paint_worklet`].
    PaintWorklet {
        /// Worklet name.
        name: String,
        /// Target size.
        size: Size,
    },
}

/// Records calls and answers each with a fresh raster handle.
#[derive(Debug)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    next_id: u32,
    failing: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    /// Creates a backend that succeeds.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_id: FIRST_BACKEND_IMAGE_ID,
            failing: false,
        }
    }

    /// Makes every later call fail (return `None`), as if allocation failed.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Calls in the order they were made.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Clears the call log.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, call: BackendCall, size: Size) -> Option<Image> {
        self.calls.push(call);
        if self.failing {
            return None;
        }
        let id = ImageId(self.next_id);
        self.next_id += 1;
        Some(Image::raster(id, size))
    }
}

impl RenderBackend for RecordingBackend {
    fn render_at(&mut self, image: &Image, size: Size) -> Option<Image> {
        self.record(
            BackendCall::RenderAt {
                source: *image,
                size,
            },
            size,
        )
    }

    fn compose_filter(
        &mut self,
        source: &Image,
        operations: &[FilterOperation],
        size: Size,
    ) -> Option<Image> {
        self.record(
            BackendCall::ComposeFilter {
                source: *source,
                operations: operations.to_vec(),
                size,
            },
            size,
        )
    }

    fn crossfade(&mut self, from: &Image, to: &Image, percentage: f64, size: Size) -> Option<Image> {
        self.record(
            BackendCall::Crossfade {
                from: *from,
                to: *to,
                percentage,
                size,
            },
            size,
        )
    }

    fn fill_gradient(&mut self, gradient: &Gradient, size: Size) -> Option<Image> {
        self.record(
            BackendCall::FillGradient {
                gradient: gradient.clone(),
                size,
            },
            size,
        )
    }

    fn render_named_image(&mut self, name: &str, size: Size) -> Option<Image> {
        self.record(
            BackendCall::NamedImage {
                name: name.into(),
                size,
            },
            size,
        )
    }

    fn render_paint_worklet(&mut self, name: &str, size: Size) -> Option<Image> {
        self.record(
            BackendCall::PaintWorklet {
                name: name.into(),
                size,
            },
            size,
        )
    }
}
