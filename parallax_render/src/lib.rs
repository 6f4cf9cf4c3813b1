// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU rendering and image loading for [`parallax_core`] layer stacks.
//!
//! This crate connects the core traits to real pixels:
//!
//! - [`PixmapSurface`]: a [`Surface`](parallax_core::surface::Surface) that
//!   rasterizes into a `tiny-skia` pixmap and can be saved as PNG.
//! - [`MemoryImageSource`]: encoded images held in memory.
//! - [`FileImageSource`]: images read from disk on each probe or decode.
//!
//! Both sources understand PNG, JPEG and WebP via the `image` crate.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod pixmap;
mod source;

pub use pixmap::PixmapSurface;
pub use source::{FileImageSource, MemoryImageSource};
