// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Loading is a duration span on track 0, gestures are instants on track 0,
//! and each layer's decodes appear as complete events on track `slot + 1`.
//!
//! Loading spans always balance. Loading that restarts for a generation that
//! is already open or already finished shows as a `Remeasure` instant. A new
//! generation closes the open span first, a finish with no matching span is
//! dropped, and a span still open at the end of the recording is closed at
//! the last timestamp.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Generation of the open loading span, if any.
    let mut open: Option<u64> = None;
    let mut finished: Option<u64> = None;
    let mut last_ts = 0.0_f64;

    for recorded in decode(bytes) {
        last_ts = last_ts.max(ns_to_us(recorded_timestamp(&recorded)));
        match recorded {
            RecordedEvent::LoadingStarted(e) => {
                let ts = ns_to_us(e.timestamp_ns);
                let args = json!({
                    "generation": e.generation,
                    "layers": e.layer_count,
                    "width": e.measured.width,
                    "height": e.measured.height,
                });
                if open == Some(e.generation) || finished == Some(e.generation) {
                    events.push(json!({
                        "ph": "i",
                        "name": "Remeasure",
                        "cat": "Lifecycle",
                        "ts": ts,
                        "pid": 0,
                        "tid": 0,
                        "s": "t",
                        "args": args,
                    }));
                    continue;
                }
                if let Some(generation) = open {
                    events.push(loading_end(ts, json!({ "generation": generation })));
                }
                events.push(json!({
                    "ph": "B",
                    "name": "Loading",
                    "cat": "Lifecycle",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": args,
                }));
                open = Some(e.generation);
            }
            RecordedEvent::DecodeRequested(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DecodeRequested",
                    "cat": "Decode",
                    "ts": ns_to_us(e.timestamp_ns),
                    "pid": 0,
                    "tid": u64::from(e.slot) + 1,
                    "s": "t",
                    "args": {
                        "generation": e.generation,
                        "image": e.image.0,
                        "downsample": e.downsample,
                        "required": format!("{}x{}", e.required.width, e.required.height),
                    }
                }));
            }
            RecordedEvent::DecodeFinished(e) => {
                events.push(json!({
                    "ph": "X",
                    "name": "Decode",
                    "cat": "Decode",
                    "ts": ns_to_us(e.timestamp_ns.saturating_sub(e.elapsed_ns)),
                    "dur": ns_to_us(e.elapsed_ns),
                    "pid": 0,
                    "tid": u64::from(e.slot) + 1,
                    "args": {
                        "generation": e.generation,
                        "image": e.image.0,
                        "outcome": format!("{:?}", e.outcome),
                    }
                }));
            }
            RecordedEvent::LoadingFinished(e) => {
                if open == Some(e.generation) {
                    open = None;
                    finished = Some(e.generation);
                    events.push(loading_end(
                        ns_to_us(e.timestamp_ns),
                        json!({
                            "generation": e.generation,
                            "failed": e.failed,
                        }),
                    ));
                }
            }
            RecordedEvent::Drag(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("Drag{:?}", e.phase),
                    "cat": "Gesture",
                    "ts": ns_to_us(e.timestamp_ns),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "dx": e.dx,
                        "dy": e.dy,
                    }
                }));
            }
        }
    }

    if let Some(generation) = open {
        events.push(loading_end(last_ts, json!({ "generation": generation })));
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn recorded_timestamp(event: &RecordedEvent) -> u64 {
    match event {
        RecordedEvent::LoadingStarted(e) => e.timestamp_ns,
        RecordedEvent::DecodeRequested(e) => e.timestamp_ns,
        RecordedEvent::DecodeFinished(e) => e.timestamp_ns,
        RecordedEvent::LoadingFinished(e) => e.timestamp_ns,
        RecordedEvent::Drag(e) => e.timestamp_ns,
    }
}

fn loading_end(ts: f64, args: Value) -> Value {
    json!({
        "ph": "E",
        "name": "Loading",
        "cat": "Lifecycle",
        "ts": ts,
        "pid": 0,
        "tid": 0,
        "args": args,
    })
}

fn ns_to_us(ns: u64) -> f64 {
    ns as f64 / 1000.0
}
