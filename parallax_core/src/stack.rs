// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The layer stack: measurement, loading lifecycle, gestures and paint.
//!
//! [`LayerStack`] owns an ordered list of [`Layer`]s and everything that
//! spans them:
//!
//! - **Measurement.** [`measure`](LayerStack::measure) sizes the stack from
//!   its largest layer and starts every layer decoding for that box.
//! - **Readiness.** Decode workers post completions into a channel;
//!   [`pump`](LayerStack::pump) drains it on the rendering thread, installs
//!   pixels and counts layers in. When every layer has reported once, the
//!   stack becomes interactive and calls [`Host::on_done_loading`].
//! - **Gestures.** [`on_touch_event`](LayerStack::on_touch_event) runs the
//!   [`DragState`] machine and pans every layer by the raw drag delta (each
//!   layer damps it by its own position).
//! - **Paint.** [`paint`](LayerStack::paint) draws layers back to front.
//!
//! # Generations
//!
//! Every [`set_drawables`](LayerStack::set_drawables) bumps the stack
//! generation and every re-measure bumps each layer's decode generation.
//! Completions are tagged with both and anything superseded is dropped
//! without counting toward readiness.

use core::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use kurbo::Vec2;
use understory_dirty::{CycleHandling, DirtyTracker};

use crate::decode::{CompletionSender, DecodeCompletion, DecodeConfig, WakeFn};
use crate::dirty;
use crate::error::{LayoutPreconditionError, PaintError};
use crate::host::{Host, NoopHost};
use crate::layer::Layer;
use crate::measure::{self, MeasureSpec};
use crate::policy::FALLBACK_SIZE;
use crate::source::{ImageId, ImageSource, PixelSize};
use crate::surface::Surface;
use crate::touch::{DragState, DragStep, TouchEvent};
use crate::trace::{
    DecodeFinishedEvent, DecodeOutcome, DecodeRequestedEvent, DragEvent, DragPhase,
    LoadingFinishedEvent, LoadingStartedEvent, NoopSink, TraceSink, Tracer,
};

/// Layers that changed since the last [`LayerStack::drain_changes`].
///
/// Indices are layer slots (paint order).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerChanges {
    /// Layers whose pan transform changed.
    pub transforms: Vec<u32>,
    /// Layers whose decoded pixels changed.
    pub content: Vec<u32>,
    /// Whether the layer set was replaced.
    pub topology_changed: bool,
}

impl LayerChanges {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty() && self.content.is_empty() && !self.topology_changed
    }
}

/// An ordered stack of parallax layers.
///
/// `H` receives lifecycle callbacks; `S` receives trace events (only
/// dispatched when the `trace` feature is enabled).
pub struct LayerStack<H: Host = NoopHost, S: TraceSink = NoopSink> {
    source: Arc<dyn ImageSource>,
    host: H,
    sink: S,
    config: Arc<DecodeConfig>,
    layers: Vec<Layer>,
    generation: u64,
    ready_count: usize,
    failed_count: usize,
    interactive: bool,
    drag: DragState,
    measured: PixelSize,
    tx: mpsc::Sender<DecodeCompletion>,
    rx: mpsc::Receiver<DecodeCompletion>,
    wake: Option<WakeFn>,
    dirty: DirtyTracker<u32>,
    topology_changed: bool,
    epoch: Instant,
}

impl<H: Host, S: TraceSink> fmt::Debug for LayerStack<H, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerStack")
            .field("layers", &self.layers)
            .field("generation", &self.generation)
            .field("ready_count", &self.ready_count)
            .field("failed_count", &self.failed_count)
            .field("interactive", &self.interactive)
            .field("drag", &self.drag)
            .field("measured", &self.measured)
            .finish_non_exhaustive()
    }
}

impl<H: Host> LayerStack<H> {
    /// Creates an empty stack with default decode settings.
    #[must_use]
    pub fn new(source: Arc<dyn ImageSource>, host: H) -> Self {
        Self::with_config(source, host, DecodeConfig::standard())
    }

    /// Creates an empty stack with custom decode settings.
    #[must_use]
    pub fn with_config(source: Arc<dyn ImageSource>, host: H, config: DecodeConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            host,
            sink: NoopSink,
            config: Arc::new(config),
            layers: Vec::new(),
            generation: 0,
            ready_count: 0,
            failed_count: 0,
            interactive: false,
            drag: DragState::Idle,
            measured: PixelSize::ZERO,
            tx,
            rx,
            wake: None,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            topology_changed: false,
            epoch: Instant::now(),
        }
    }
}

impl<H: Host, S: TraceSink> LayerStack<H, S> {
    /// Replaces the trace sink.
    #[must_use]
    pub fn with_trace_sink<S2: TraceSink>(self, sink: S2) -> LayerStack<H, S2> {
        LayerStack {
            source: self.source,
            host: self.host,
            sink,
            config: self.config,
            layers: self.layers,
            generation: self.generation,
            ready_count: self.ready_count,
            failed_count: self.failed_count,
            interactive: self.interactive,
            drag: self.drag,
            measured: self.measured,
            tx: self.tx,
            rx: self.rx,
            wake: self.wake,
            dirty: self.dirty,
            topology_changed: self.topology_changed,
            epoch: self.epoch,
        }
    }

    /// Sets a callback that decode workers invoke after posting a
    /// completion, so a host event loop can wake up and call
    /// [`pump`](Self::pump).
    ///
    /// Decodes already in flight keep the callback they started with.
    pub fn set_wake_callback(&mut self, wake: impl Fn() + Send + Sync + 'static) {
        let wake: WakeFn = Arc::new(wake);
        self.wake = Some(Arc::clone(&wake));
        for layer in &mut self.layers {
            layer.set_wake(Some(Arc::clone(&wake)));
        }
    }

    /// Replaces every layer with one per image, in paint order.
    ///
    /// Layer `i` gets position `i + 1` and z-order `i`. Resets readiness and
    /// any drag in progress, discards results of earlier decodes, and asks
    /// the host for a new layout.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutPreconditionError`] if a layer cannot be created.
    pub fn set_drawables(&mut self, ids: &[ImageId]) -> Result<(), LayoutPreconditionError> {
        self.generation += 1;
        let mut layers = Vec::with_capacity(ids.len());
        for (slot, &id) in ids.iter().enumerate() {
            let done = CompletionSender::new(
                self.tx.clone(),
                self.generation,
                slot,
                self.wake.clone(),
                Arc::clone(&self.config),
            );
            let position = u32::try_from(slot + 1).unwrap_or(u32::MAX);
            layers.push(Layer::new(id, position, Arc::clone(&self.source), done)?);
        }

        log::debug!(
            "stack generation {} with {} layers",
            self.generation,
            layers.len()
        );
        self.layers = layers;
        self.ready_count = 0;
        self.failed_count = 0;
        self.interactive = false;
        self.drag = DragState::Idle;
        self.dirty = DirtyTracker::with_cycle_handling(CycleHandling::Error);
        self.topology_changed = true;
        self.host.request_layout();
        Ok(())
    }

    /// Replaces the image shown by layer `index`.
    ///
    /// Once the stack has been measured, the new image is decoded for the
    /// current box right away and any decode in flight for the old image is
    /// discarded. The old pixels stay on screen until the new decode lands.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutPreconditionError::NoSuchLayer`] if `index` is out of
    /// range.
    pub fn set_image_id(
        &mut self,
        index: usize,
        id: ImageId,
    ) -> Result<(), LayoutPreconditionError> {
        let len = self.layers.len();
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(LayoutPreconditionError::NoSuchLayer { index, len })?;
        if let Some(request) = layer.set_image_id(id) {
            Tracer::new(&mut self.sink).decode_requested(&DecodeRequestedEvent {
                generation: self.generation,
                slot: slot_index(index),
                image: request.image,
                intrinsic: request.intrinsic,
                required: request.required,
                downsample: request.downsample,
                timestamp_ns: elapsed_ns(self.epoch),
            });
        }
        log::debug!("layer {index} now shows {id}");
        self.dirty.mark(slot_index(index), dirty::CONTENT);
        self.host.invalidate();
        Ok(())
    }

    /// Negotiates the stack size and starts every layer decoding.
    ///
    /// The desired size is the intrinsic size of the largest-area layer (the
    /// first one on ties), or [`FALLBACK_SIZE`] if there are no layers or no
    /// layer reported a size. Each axis is then resolved against its
    /// constraint. With at least one layer, calls
    /// [`Host::on_started_loading`] and hands the box to every layer.
    pub fn measure(&mut self, width: MeasureSpec, height: MeasureSpec) -> PixelSize {
        let desired = measure::largest_area(self.layers.iter().map(Layer::intrinsic_size))
            .map_or(FALLBACK_SIZE, |idx| self.layers[idx].intrinsic_size());
        let measured = PixelSize::new(width.resolve(desired.width), height.resolve(desired.height));
        self.measured = measured;

        if self.layers.is_empty() {
            return measured;
        }

        self.host.on_started_loading();
        Tracer::new(&mut self.sink).loading_started(&LoadingStartedEvent {
            generation: self.generation,
            layer_count: slot_index(self.layers.len()),
            measured,
            timestamp_ns: elapsed_ns(self.epoch),
        });

        for (slot, layer) in self.layers.iter_mut().enumerate() {
            let request = layer.on_measure(measured.width, measured.height);
            Tracer::new(&mut self.sink).decode_requested(&DecodeRequestedEvent {
                generation: self.generation,
                slot: slot_index(slot),
                image: request.image,
                intrinsic: request.intrinsic,
                required: request.required,
                downsample: request.downsample,
                timestamp_ns: elapsed_ns(self.epoch),
            });
        }
        measured
    }

    /// Applies every completion that has already arrived. Never blocks.
    ///
    /// Returns the number of completions drained, including stale ones.
    pub fn pump(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
            drained += 1;
        }
        drained
    }

    /// Waits up to `timeout` for the first completion, then drains the rest
    /// like [`pump`](Self::pump).
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.apply(completion);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn apply(&mut self, completion: DecodeCompletion) {
        let ticket = completion.ticket;
        let image = completion.image;
        let decode_ns = u64::try_from(completion.elapsed.as_nanos()).unwrap_or(u64::MAX);
        let failed = completion.result.is_err();

        let mut accepted = false;
        if ticket.stack_generation == self.generation
            && let Some(layer) = self.layers.get_mut(ticket.slot)
        {
            let first = !layer.is_loaded();
            accepted = layer.install(completion);
            if accepted && first {
                self.ready_count += 1;
                if failed {
                    self.failed_count += 1;
                }
            }
        }

        let outcome = match (accepted, failed) {
            (false, _) => DecodeOutcome::Stale,
            (true, false) => DecodeOutcome::Decoded,
            (true, true) => DecodeOutcome::Failed,
        };
        Tracer::new(&mut self.sink).decode_finished(&DecodeFinishedEvent {
            generation: ticket.stack_generation,
            slot: slot_index(ticket.slot),
            image,
            outcome,
            elapsed_ns: decode_ns,
            timestamp_ns: elapsed_ns(self.epoch),
        });

        if !accepted {
            log::debug!(
                "discarding stale decode of {image} for layer {} (generation {}/{})",
                ticket.slot,
                ticket.stack_generation,
                ticket.layer_generation,
            );
            return;
        }
        log::debug!(
            "layer {} decoded {image} in {:?}",
            ticket.slot,
            Duration::from_nanos(decode_ns)
        );

        self.dirty.mark(slot_index(ticket.slot), dirty::CONTENT);
        self.host.invalidate();
        self.check_ready();
    }

    fn check_ready(&mut self) {
        if self.interactive || self.ready_count < self.layers.len() {
            return;
        }
        self.interactive = true;
        log::debug!(
            "stack generation {} interactive ({} of {} layers failed)",
            self.generation,
            self.failed_count,
            self.layers.len()
        );
        Tracer::new(&mut self.sink).loading_finished(&LoadingFinishedEvent {
            generation: self.generation,
            layer_count: slot_index(self.layers.len()),
            failed: slot_index(self.failed_count),
            timestamp_ns: elapsed_ns(self.epoch),
        });
        self.host.on_done_loading();
    }

    /// Feeds one pointer event to the drag state machine.
    ///
    /// Returns `false` without doing anything until the stack is
    /// interactive, `true` afterwards.
    pub fn on_touch_event(&mut self, event: TouchEvent) -> bool {
        if !self.interactive {
            log::trace!("ignoring {:?} before layers are loaded", event.action);
            return false;
        }

        let step = self.drag.step(event);
        log::trace!("{:?} -> {step:?}", event.action);
        let (phase, delta) = match step {
            DragStep::Ignore => return true,
            DragStep::Begin => (DragPhase::Begin, Vec2::ZERO),
            DragStep::Pan(delta) => {
                self.pan_each(delta.x, delta.y);
                (DragPhase::Pan, delta)
            }
            DragStep::Reset => {
                for (slot, layer) in self.layers.iter_mut().enumerate() {
                    layer.reset_pan();
                    self.dirty.mark(slot_index(slot), dirty::TRANSFORM);
                }
                self.host.invalidate();
                (DragPhase::End, Vec2::ZERO)
            }
        };
        Tracer::new(&mut self.sink).drag(&DragEvent {
            phase,
            dx: delta.x,
            dy: delta.y,
            timestamp_ns: elapsed_ns(self.epoch),
        });
        true
    }

    /// Pans every layer by a raw delta, outside of any gesture.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutPreconditionError::EmptyStack`] if there are no layers.
    pub fn pan_all(&mut self, dx: f64, dy: f64) -> Result<(), LayoutPreconditionError> {
        if self.layers.is_empty() {
            return Err(LayoutPreconditionError::EmptyStack);
        }
        self.pan_each(dx, dy);
        Ok(())
    }

    fn pan_each(&mut self, dx: f64, dy: f64) {
        for (slot, layer) in self.layers.iter_mut().enumerate() {
            layer.pan(dx, dy);
            self.dirty.mark(slot_index(slot), dirty::TRANSFORM);
        }
        self.host.invalidate();
    }

    /// Draws every layer, first to last.
    ///
    /// A layer that fails to draw is logged and skipped; the remaining
    /// layers are still drawn.
    pub fn paint(&self, surface: &mut dyn Surface) {
        for layer in &self.layers {
            if let Err(err) = layer.draw(surface) {
                log::warn!("layer {} failed to paint: {err}", layer.z_order());
            }
        }
    }

    /// Like [`paint`](Self::paint), but returns the failures instead of
    /// logging them, paired with the layer index.
    pub fn try_paint(&self, surface: &mut dyn Surface) -> Vec<(usize, PaintError)> {
        self.layers
            .iter()
            .filter_map(|layer| layer.draw(surface).err().map(|err| (layer.z_order(), err)))
            .collect()
    }

    /// Returns the layers changed since the previous call.
    pub fn drain_changes(&mut self) -> LayerChanges {
        let transforms = self
            .dirty
            .drain(dirty::TRANSFORM)
            .deterministic()
            .run()
            .collect();
        let content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        LayerChanges {
            transforms,
            content,
            topology_changed: core::mem::take(&mut self.topology_changed),
        }
    }

    /// The layers in paint order.
    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host, mutably.
    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The trace sink.
    #[inline]
    #[must_use]
    pub fn trace_sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the stack and returns its trace sink.
    #[must_use]
    pub fn into_trace_sink(self) -> S {
        self.sink
    }

    /// Whether every layer has loaded and gestures are accepted.
    #[inline]
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Number of layers that have loaded in this generation.
    #[inline]
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready_count
    }

    /// Number of loaded layers whose first decode failed.
    #[inline]
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Size returned by the last [`measure`](Self::measure).
    #[inline]
    #[must_use]
    pub fn measured_size(&self) -> PixelSize {
        self.measured
    }

    /// Current stack generation.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn slot_index(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

fn elapsed_ns(epoch: Instant) -> u64 {
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}
