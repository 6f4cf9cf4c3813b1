// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Off-thread decoding and the hand-off back to the rendering thread.
//!
//! Each decode request runs on its own short-lived worker thread. When the
//! decode finishes (or fails, or panics), the worker posts a
//! [`DecodeCompletion`] into an `mpsc` channel owned by the stack and then
//! calls the optional wake callback. The stack drains that channel on the
//! rendering thread in [`LayerStack::pump`](crate::stack::LayerStack::pump),
//! so decoded buffers and readiness counters are only ever touched there.
//!
//! Every completion carries a [`DecodeTicket`]. The stack compares the ticket
//! against the current stack generation and the layer's current decode
//! generation, and drops anything that has been superseded.

use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::DecodeError;
use crate::source::{ImageId, ImageSource, PixelBuffer};

/// Callback invoked from a worker thread after a completion was posted.
pub type WakeFn = Arc<dyn Fn() + Send + Sync>;

/// Worker thread settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Prefix for worker thread names; the layer slot is appended.
    pub thread_name_prefix: Cow<'static, str>,
    /// Stack size for worker threads, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl DecodeConfig {
    /// Default settings: threads named `parallax-decode-<slot>`, default stack.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            thread_name_prefix: Cow::Borrowed("parallax-decode"),
            stack_size: None,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Identifies the request a completion answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DecodeTicket {
    /// Stack generation the layer belonged to when the request was made.
    pub stack_generation: u64,
    /// Index of the layer within the stack.
    pub slot: usize,
    /// Per-layer request counter.
    pub layer_generation: u64,
}

/// The outcome of one decode request, posted from a worker thread.
#[derive(Debug)]
pub struct DecodeCompletion {
    /// Which request this answers.
    pub ticket: DecodeTicket,
    /// Image that was decoded.
    pub image: ImageId,
    /// Downsample factor used.
    pub downsample: u32,
    /// Decoded pixels, or why there are none.
    pub result: Result<PixelBuffer, DecodeError>,
    /// Wall-clock time spent in the source's `decode`.
    pub elapsed: Duration,
}

/// A layer's capability to report decode completions to its stack.
///
/// Cloning is cheap (channel sender plus two `Arc` bumps).
#[derive(Clone)]
pub struct CompletionSender {
    tx: mpsc::Sender<DecodeCompletion>,
    stack_generation: u64,
    slot: usize,
    wake: Option<WakeFn>,
    config: Arc<DecodeConfig>,
}

impl fmt::Debug for CompletionSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSender")
            .field("stack_generation", &self.stack_generation)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl CompletionSender {
    pub(crate) fn new(
        tx: mpsc::Sender<DecodeCompletion>,
        stack_generation: u64,
        slot: usize,
        wake: Option<WakeFn>,
        config: Arc<DecodeConfig>,
    ) -> Self {
        Self {
            tx,
            stack_generation,
            slot,
            wake,
            config,
        }
    }

    /// Index of the layer this sender reports for.
    #[inline]
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Stack generation this sender was created for.
    #[inline]
    #[must_use]
    pub fn stack_generation(&self) -> u64 {
        self.stack_generation
    }

    pub(crate) fn set_wake(&mut self, wake: Option<WakeFn>) {
        self.wake = wake;
    }

    /// Starts decoding `image` on a new worker thread.
    ///
    /// If the worker cannot be spawned, a failed completion is posted
    /// immediately so the request still resolves.
    pub(crate) fn spawn(
        &self,
        source: Arc<dyn ImageSource>,
        image: ImageId,
        downsample: u32,
        layer_generation: u64,
    ) {
        let ticket = DecodeTicket {
            stack_generation: self.stack_generation,
            slot: self.slot,
            layer_generation,
        };

        let mut builder = thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_name_prefix, self.slot));
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }

        let sender = self.clone();
        let spawned = builder.spawn(move || {
            let start = Instant::now();
            let result = panic::catch_unwind(AssertUnwindSafe(|| source.decode(image, downsample)))
                .unwrap_or(Err(DecodeError::Panicked(image)));
            sender.post(DecodeCompletion {
                ticket,
                image,
                downsample,
                result,
                elapsed: start.elapsed(),
            });
        });

        if let Err(err) = spawned {
            log::warn!("failed to spawn decode worker for layer {}: {err}", self.slot);
            self.post(DecodeCompletion {
                ticket,
                image,
                downsample,
                result: Err(DecodeError::Io {
                    id: image,
                    message: format!("failed to spawn decode worker: {err}"),
                }),
                elapsed: Duration::ZERO,
            });
        }
    }

    fn post(&self, completion: DecodeCompletion) {
        if self.tx.send(completion).is_err() {
            // The stack is gone; nobody is waiting for this result.
            log::debug!("dropping decode completion for layer {}", self.slot);
            return;
        }
        if let Some(wake) = &self.wake {
            wake();
        }
    }
}
