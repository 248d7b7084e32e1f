// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Style Image reference collaborators.
//!
//! In-memory implementations of the traits `understory_style_image` calls
//! out to, for tests and debugging:
//!
//! - [`RefLoader`] hands out one [`RefResource`] per URL and records every
//!   request. Resources are driven by hand: decode, change, finish, deliver
//!   frames.
//! - [`RecordingBackend`] answers render calls with fresh image handles and
//!   logs them as [`BackendCall`]s.
//! - [`RecordingClient`] logs notifications as [`ClientEvent`]s and answers
//!   queries with configurable values.
//! - [`RefCanvas`] and [`RefCanvasDocument`] stand in for named canvases.
//!
//! Nothing here decodes or rasterizes pixels.

#![no_std]

extern crate alloc;

mod backend;
mod canvas;
mod client;
mod loader;

pub use backend::{BackendCall, FIRST_BACKEND_IMAGE_ID, RecordingBackend};
pub use canvas::{RefCanvas, RefCanvasDocument};
pub use client::{ClientEvent, RecordingClient};
pub use loader::{RefLoader, RefResource};
