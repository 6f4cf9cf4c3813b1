// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout negotiation.
//!
//! Hosts describe each axis with a [`MeasureSpec`]: a mode plus a size. The
//! stack resolves each axis against its desired size (the intrinsic size of
//! its largest layer) with [`MeasureSpec::resolve`].

use crate::source::PixelSize;

/// How the host constrains one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MeasureMode {
    /// The view must be exactly the given size.
    Exact,
    /// The view may be at most the given size.
    AtMost,
    /// The host imposes no constraint; the size is ignored.
    #[default]
    Unspecified,
}

/// One axis constraint from the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeasureSpec {
    /// Constraint mode.
    pub mode: MeasureMode,
    /// Constraint size in pixels (ignored for [`MeasureMode::Unspecified`]).
    pub size: u32,
}

impl MeasureSpec {
    /// An exact constraint.
    #[inline]
    #[must_use]
    pub const fn exact(size: u32) -> Self {
        Self {
            mode: MeasureMode::Exact,
            size,
        }
    }

    /// An upper-bound constraint.
    #[inline]
    #[must_use]
    pub const fn at_most(size: u32) -> Self {
        Self {
            mode: MeasureMode::AtMost,
            size,
        }
    }

    /// No constraint.
    #[inline]
    #[must_use]
    pub const fn unspecified() -> Self {
        Self {
            mode: MeasureMode::Unspecified,
            size: 0,
        }
    }

    /// Resolves this constraint against a desired size.
    #[inline]
    #[must_use]
    pub fn resolve(self, desired: u32) -> u32 {
        match self.mode {
            MeasureMode::Exact => self.size,
            MeasureMode::AtMost => desired.min(self.size),
            MeasureMode::Unspecified => desired,
        }
    }
}

/// Returns the index of the entry with the largest area.
///
/// Ties go to the first entry. Returns `None` for an empty iterator or when
/// every area is zero.
#[must_use]
pub fn largest_area<I>(sizes: I) -> Option<usize>
where
    I: IntoIterator<Item = PixelSize>,
{
    let mut best: Option<(usize, u64)> = None;
    for (idx, size) in sizes.into_iter().enumerate() {
        let area = size.area();
        if area > best.map_or(0, |(_, a)| a) {
            best = Some((idx, area));
        }
    }
    best.map(|(idx, _)| idx)
}
