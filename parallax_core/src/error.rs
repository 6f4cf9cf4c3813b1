// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! - [`DecodeError`]: an image could not be probed or decoded. Always scoped
//!   to one layer; the rest of the stack keeps going.
//! - [`LayoutPreconditionError`]: a caller asked for something the current
//!   layer set cannot support.
//! - [`PaintError`]: a [`Surface`](crate::surface::Surface) could not draw a
//!   buffer.

use thiserror::Error;

use crate::source::ImageId;

/// Failure to read bounds or pixels for an image.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The source has no image with this identifier.
    #[error("unknown image {0}")]
    UnknownImage(ImageId),
    /// The image data could not be read.
    #[error("failed to read image {id}: {message}")]
    Io {
        /// Image being read.
        id: ImageId,
        /// Underlying error text.
        message: String,
    },
    /// The image data was read but is corrupt or in an unsupported format.
    #[error("failed to decode image {id}: {message}")]
    Format {
        /// Image being decoded.
        id: ImageId,
        /// Underlying error text.
        message: String,
    },
    /// The source panicked while decoding.
    #[error("decoder panicked on image {0}")]
    Panicked(ImageId),
}

/// A layer or stack operation was invoked on an unusable layer set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LayoutPreconditionError {
    /// Layer positions start at 1; position 0 would divide by zero when
    /// damping pan deltas.
    #[error("layer position must be greater than zero")]
    ZeroPosition,
    /// The operation needs at least one layer.
    #[error("layer stack is empty")]
    EmptyStack,
    /// No layer at this index.
    #[error("no layer at index {index} (stack has {len})")]
    NoSuchLayer {
        /// Requested layer index.
        index: usize,
        /// Number of layers in the stack.
        len: usize,
    },
}

/// Failure to paint a pixel buffer onto a surface.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PaintError {
    /// The byte length does not match `width * height * 4`.
    #[error("pixel buffer {width}x{height} has {len} bytes")]
    InvalidBuffer {
        /// Claimed width.
        width: u32,
        /// Claimed height.
        height: u32,
        /// Actual byte length.
        len: usize,
    },
    /// The surface backend rejected the draw.
    #[error("surface backend error: {0}")]
    Backend(String),
}
