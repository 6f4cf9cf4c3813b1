// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for a stack of parallax image layers.
//!
//! `parallax_core` renders a handful of images on top of one another and
//! shifts each by a different fraction of a drag gesture, producing a depth
//! illusion. It owns the hard parts: off-thread decoding with power-of-two
//! downsampling, layout negotiation, readiness tracking and per-layer pan
//! transforms. Pixels, windows and file formats belong to the host.
//!
//! # Architecture
//!
//! ```text
//!   Host ──► set_drawables ──► Layer::new (bounds probe)
//!     │
//!     ├──► measure ──► Layer::on_measure ──► decode worker threads
//!     │                                            │ DecodeCompletion
//!     │                                            ▼
//!     ├──► pump ◄──────────────────────────── mpsc channel
//!     │     └─► Layer::install ──► Host::on_done_loading (once)
//!     │
//!     ├──► on_touch_event ──► DragState ──► Layer::pan / reset_pan
//!     │
//!     └──► paint ──► Layer::draw ──► Surface
//! ```
//!
//! **[`stack`]**: [`LayerStack`](stack::LayerStack), the entry point.
//!
//! **[`layer`]**: one image with its decode generation and pan transform.
//!
//! **[`decode`]**: worker threads and the completion hand-off.
//!
//! **[`measure`]** and **[`policy`]**: layout constraints, the pan margin
//! and the downsample factor.
//!
//! **[`touch`]**: single-pointer drag state machine.
//!
//! **[`source`]**, **[`surface`]** and **[`host`]**: the traits a host
//! implements to supply images, receive pixels and hear about lifecycle.
//!
//! **[`dirty`]**: change tracking for incremental repaint via
//! `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! **[`error`]**: error types.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod decode;
pub mod dirty;
pub mod error;
pub mod host;
pub mod layer;
pub mod measure;
pub mod policy;
pub mod source;
pub mod stack;
pub mod surface;
pub mod touch;
pub mod trace;
