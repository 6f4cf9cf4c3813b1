// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for loading and gestures.
//!
//! This module provides a [`TraceSink`] trait with one method per event the
//! stack emits. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Timestamps are nanoseconds since the owning stack was created.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use crate::source::{ImageId, PixelSize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a decode request ended, from the stack's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeOutcome {
    /// Pixels were installed on the layer.
    Decoded,
    /// The source failed; the layer paints nothing but counts as loaded.
    Failed,
    /// The result answered a superseded request and was dropped.
    Stale,
}

/// Which part of a drag gesture an event describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DragPhase {
    /// Pointer pressed.
    Begin,
    /// Layers panned by a raw delta.
    Pan,
    /// Pointer released or cancelled; pans reset.
    End,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted by `measure` right before layers start decoding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadingStartedEvent {
    /// Stack generation.
    pub generation: u64,
    /// Number of layers being loaded.
    pub layer_count: u32,
    /// Measured box.
    pub measured: PixelSize,
    /// Nanoseconds since the stack was created.
    pub timestamp_ns: u64,
}

/// Emitted for every decode a layer requests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeRequestedEvent {
    /// Stack generation.
    pub generation: u64,
    /// Layer index.
    pub slot: u32,
    /// Image being decoded.
    pub image: ImageId,
    /// Native size of the image.
    pub intrinsic: PixelSize,
    /// Measured box plus pan margin.
    pub required: PixelSize,
    /// Chosen power-of-two downsample factor.
    pub downsample: u32,
    /// Nanoseconds since the stack was created.
    pub timestamp_ns: u64,
}

/// Emitted when a completion is drained on the rendering thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecodeFinishedEvent {
    /// Stack generation the completion was tagged with.
    pub generation: u64,
    /// Layer index.
    pub slot: u32,
    /// Image that was decoded.
    pub image: ImageId,
    /// What the stack did with the result.
    pub outcome: DecodeOutcome,
    /// Time the worker spent decoding, in nanoseconds.
    pub elapsed_ns: u64,
    /// Nanoseconds since the stack was created.
    pub timestamp_ns: u64,
}

/// Emitted once per generation when every layer has loaded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadingFinishedEvent {
    /// Stack generation.
    pub generation: u64,
    /// Number of layers.
    pub layer_count: u32,
    /// How many of them failed to decode.
    pub failed: u32,
    /// Nanoseconds since the stack was created.
    pub timestamp_ns: u64,
}

/// Emitted for drag transitions that change layer state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvent {
    /// Gesture phase.
    pub phase: DragPhase,
    /// Raw x delta from the press point (zero outside [`DragPhase::Pan`]).
    pub dx: f64,
    /// Raw y delta from the press point (zero outside [`DragPhase::Pan`]).
    pub dy: f64,
    /// Nanoseconds since the stack was created.
    pub timestamp_ns: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from a layer stack.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when loading starts.
    fn on_loading_started(&mut self, e: &LoadingStartedEvent) {
        _ = e;
    }

    /// Called when a layer requests a decode.
    fn on_decode_requested(&mut self, e: &DecodeRequestedEvent) {
        _ = e;
    }

    /// Called when a decode completion is processed.
    fn on_decode_finished(&mut self, e: &DecodeFinishedEvent) {
        _ = e;
    }

    /// Called when every layer has loaded.
    fn on_loading_finished(&mut self, e: &LoadingFinishedEvent) {
        _ = e;
    }

    /// Called on drag transitions.
    fn on_drag(&mut self, e: &DragEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`LoadingStartedEvent`].
    #[inline]
    pub fn loading_started(&mut self, e: &LoadingStartedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_loading_started(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DecodeRequestedEvent`].
    #[inline]
    pub fn decode_requested(&mut self, e: &DecodeRequestedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_decode_requested(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DecodeFinishedEvent`].
    #[inline]
    pub fn decode_finished(&mut self, e: &DecodeFinishedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_decode_finished(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LoadingFinishedEvent`].
    #[inline]
    pub fn loading_finished(&mut self, e: &LoadingFinishedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_loading_finished(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DragEvent`].
    #[inline]
    pub fn drag(&mut self, e: &DragEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_drag(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_finished() -> DecodeFinishedEvent {
        DecodeFinishedEvent {
            generation: 1,
            slot: 2,
            image: ImageId(7),
            outcome: DecodeOutcome::Decoded,
            elapsed_ns: 1_500_000,
            timestamp_ns: 9_000_000,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_decode_finished(&sample_finished());
        sink.on_drag(&DragEvent {
            phase: DragPhase::Begin,
            dx: 0.0,
            dy: 0.0,
            timestamp_ns: 0,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.decode_finished(&sample_finished());
        tracer.loading_finished(&LoadingFinishedEvent {
            generation: 1,
            layer_count: 3,
            failed: 0,
            timestamp_ns: 0,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            slots: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_decode_finished(&mut self, e: &DecodeFinishedEvent) {
                self.slots.push(e.slot);
            }
        }

        let mut sink = RecordingSink { slots: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.decode_finished(&sample_finished());
        drop(tracer);
        assert_eq!(sink.slots, &[2]);
    }
}
