// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in milliseconds since the stack was created.

use std::io::Write;

use parallax_core::source::PixelSize;
use parallax_core::trace::{
    DecodeFinishedEvent, DecodeOutcome, DecodeRequestedEvent, DragEvent, DragPhase,
    LoadingFinishedEvent, LoadingStartedEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}

struct Size(PixelSize);

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.0.width, self.0.height)
    }
}

fn outcome_name(outcome: DecodeOutcome) -> &'static str {
    match outcome {
        DecodeOutcome::Decoded => "decoded",
        DecodeOutcome::Failed => "failed",
        DecodeOutcome::Stale => "stale",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_loading_started(&mut self, e: &LoadingStartedEvent) {
        let _ = writeln!(
            self.writer,
            "[loading] gen={} layers={} box={} at {:.3}ms",
            e.generation,
            e.layer_count,
            Size(e.measured),
            ms(e.timestamp_ns),
        );
    }

    fn on_decode_requested(&mut self, e: &DecodeRequestedEvent) {
        let _ = writeln!(
            self.writer,
            concat!(
                "[decode:request] gen={} layer={} image={} ",
                "intrinsic={} required={} factor={} at {:.3}ms",
            ),
            e.generation,
            e.slot,
            e.image,
            Size(e.intrinsic),
            Size(e.required),
            e.downsample,
            ms(e.timestamp_ns),
        );
    }

    fn on_decode_finished(&mut self, e: &DecodeFinishedEvent) {
        let _ = writeln!(
            self.writer,
            "[decode:{}] gen={} layer={} image={} took={:.3}ms at {:.3}ms",
            outcome_name(e.outcome),
            e.generation,
            e.slot,
            e.image,
            ms(e.elapsed_ns),
            ms(e.timestamp_ns),
        );
    }

    fn on_loading_finished(&mut self, e: &LoadingFinishedEvent) {
        let _ = writeln!(
            self.writer,
            "[ready] gen={} layers={} failed={} at {:.3}ms",
            e.generation,
            e.layer_count,
            e.failed,
            ms(e.timestamp_ns),
        );
    }

    fn on_drag(&mut self, e: &DragEvent) {
        let _ = match e.phase {
            DragPhase::Begin => {
                writeln!(self.writer, "[drag:begin] at {:.3}ms", ms(e.timestamp_ns))
            }
            DragPhase::Pan => writeln!(
                self.writer,
                "[drag:pan] dx={:.1} dy={:.1} at {:.3}ms",
                e.dx,
                e.dy,
                ms(e.timestamp_ns),
            ),
            DragPhase::End => writeln!(self.writer, "[drag:end] at {:.3}ms", ms(e.timestamp_ns)),
        };
    }
}
