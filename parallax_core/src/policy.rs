// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed sizing policy: pan margin, fallback box, and decode downsampling.
//!
//! Every layer decodes a little larger than the box it is shown in so that
//! panning never uncovers pixels past the edge of the decoded image. The
//! downsample factor then picks the cheapest power-of-two decode that still
//! covers that enlarged box.

use crate::source::PixelSize;

/// Extra fraction of the measured box decoded on each axis to absorb pan
/// travel.
pub const PAN_MARGIN: f32 = 0.2;

/// Desired size used by measurement when no layer reports a usable
/// intrinsic size.
pub const FALLBACK_SIZE: PixelSize = PixelSize::new(100, 100);

/// Returns `round(measured * (1 + PAN_MARGIN))`.
#[inline]
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "rounded result of a positive u32 scaled by 1.2 is clamped into u32"
)]
pub fn required_extent(measured: u32) -> u32 {
    let measured = measured as f32;
    let scaled = (measured + measured * PAN_MARGIN).round();
    if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Applies [`required_extent`] to both axes.
#[inline]
#[must_use]
pub fn required_size(measured: PixelSize) -> PixelSize {
    PixelSize::new(
        required_extent(measured.width),
        required_extent(measured.height),
    )
}

/// Computes the largest power-of-two downsample that keeps the decoded image
/// at least as large as `required` on both axes.
///
/// Subsampling is only considered when the intrinsic image is larger than the
/// required box on some axis. A zero required extent is treated as one pixel.
#[must_use]
pub fn downsample_factor(intrinsic: PixelSize, required: PixelSize) -> u32 {
    let req_w = required.width.max(1);
    let req_h = required.height.max(1);
    let mut factor: u32 = 1;

    if intrinsic.height > req_h || intrinsic.width > req_w {
        let half_h = intrinsic.height / 2;
        let half_w = intrinsic.width / 2;
        while half_h / factor >= req_h && half_w / factor >= req_w {
            factor *= 2;
        }
    }
    factor
}
