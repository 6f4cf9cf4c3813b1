// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The stack records per-layer changes in a [`understory_dirty`] tracker so
//! that hosts doing incremental repaint can ask which layers changed since
//! the last frame. Layers are flat (no parent/child edges), so every channel
//! is local-only: only the explicitly marked layer appears in the drain
//! output.
//!
//! Callers never query the tracker directly.
//! [`LayerStack::drain_changes`](crate::stack::LayerStack::drain_changes)
//! drains every channel and returns the result as
//! [`LayerChanges`](crate::stack::LayerChanges).

use understory_dirty::Channel;

/// Pan transform changed (moved or reset).
pub const TRANSFORM: Channel = Channel::new(0);

/// Decoded pixels were installed or cleared.
pub const CONTENT: Channel = Channel::new(1);
