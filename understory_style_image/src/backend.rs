// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rendering collaborator used by generated images.

use kurbo::Size;

use crate::filter_operation::FilterOperation;
use crate::image::Image;

/// Produces rasters for generated images.
///
/// Every method returns `None` when the backend cannot produce a result
/// (allocation failure, unsupported input). Generated images turn that into
/// the null-image sentinel.
pub trait RenderBackend {
    /// Allocates an offscreen target of `size` and draws `image` into it.
    fn render_at(&mut self, image: &Image, size: Size) -> Option<Image>;

    /// Applies `operations`, in order, to `source`.
    fn compose_filter(
        &mut self,
        source: &Image,
        operations: &[FilterOperation],
        size: Size,
    ) -> Option<Image>;

    /// Blends `from` and `to`; `percentage` 0 is all `from`, 1 is all `to`.
    fn crossfade(&mut self, from: &Image, to: &Image, percentage: f64, size: Size)
    -> Option<Image>;

    /// Fills a target of `size` with `gradient`.
    fn fill_gradient(&mut self, gradient: &peniko::Gradient, size: Size) -> Option<Image>;

    /// Draws a platform-named image (`-webkit-named-image(name)`).
    fn render_named_image(&mut self, name: &str, size: Size) -> Option<Image> {
        let _ = (name, size);
        None
    }

    /// Runs a registered paint worklet (`paint(name)`).
    fn render_paint_worklet(&mut self, name: &str, size: Size) -> Option<Image> {
        let _ = (name, size);
        None
    }
}
