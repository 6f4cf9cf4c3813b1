// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image identity, pixel storage, and the host-provided image source.
//!
//! The core never reads files or assets itself. Hosts implement
//! [`ImageSource`] to map an opaque [`ImageId`] to pixel data; the stack asks
//! for cheap bounds on the rendering thread and for full decodes on worker
//! threads.

use core::fmt;

use crate::error::{DecodeError, PaintError};

/// An opaque reference to a source image.
///
/// Hosts assign identifiers (resource ids, indices into an asset table, ...);
/// core code passes them through without interpreting the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ImageId(pub u32);

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer pixel dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// A zero-sized extent, used when a bounds probe fails.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a size from width and height.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `width * height` without overflowing.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A decoded image: premultiplied RGBA8, tightly packed rows.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Wraps premultiplied RGBA8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PaintError::InvalidBuffer`] if `data.len()` is not exactly
    /// `width * height * 4`.
    pub fn from_rgba8_premultiplied(
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<Self, PaintError> {
        let expected = u64::from(width) * u64::from(height) * 4;
        if data.len() as u64 != expected {
            return Err(PaintError::InvalidBuffer {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Creates a buffer filled with one premultiplied RGBA color.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let mut data = Vec::with_capacity(len * 4);
        for _ in 0..len {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as a [`PixelSize`].
    #[inline]
    #[must_use]
    pub const fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }

    /// The raw premultiplied RGBA8 bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the buffer and returns its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Supplies image bounds and pixel data for [`ImageId`]s.
///
/// Implementations must be callable from decode worker threads, hence the
/// `Send + Sync` bound. Both methods may block on I/O.
pub trait ImageSource: Send + Sync {
    /// Reports the intrinsic pixel dimensions of `id` without decoding the
    /// pixel data.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if `id` is unknown or its header cannot be read.
    fn probe_bounds(&self, id: ImageId) -> Result<PixelSize, DecodeError>;

    /// Decodes `id`, shrinking each axis by `downsample` (a power of two).
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if `id` is unknown, unreadable, or corrupt.
    fn decode(&self, id: ImageId, downsample: u32) -> Result<PixelBuffer, DecodeError>;
}
