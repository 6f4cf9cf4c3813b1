// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each led by a one-byte tag.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`]; it stops at
//! the first unknown tag or truncated record.

use parallax_core::source::{ImageId, PixelSize};
use parallax_core::trace::{
    DecodeFinishedEvent, DecodeOutcome, DecodeRequestedEvent, DragEvent, DragPhase,
    LoadingFinishedEvent, LoadingStartedEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LOADING_STARTED: u8 = 1;
const TAG_DECODE_REQUESTED: u8 = 2;
const TAG_DECODE_FINISHED: u8 = 3;
const TAG_LOADING_FINISHED: u8 = 4;
const TAG_DRAG: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_size(&mut self, s: PixelSize) {
        self.write_u32(s.width);
        self.write_u32(s.height);
    }

    fn write_outcome(&mut self, o: DecodeOutcome) {
        self.write_u8(match o {
            DecodeOutcome::Decoded => 0,
            DecodeOutcome::Failed => 1,
            DecodeOutcome::Stale => 2,
        });
    }

    fn write_drag_phase(&mut self, p: DragPhase) {
        self.write_u8(match p {
            DragPhase::Begin => 0,
            DragPhase::Pan => 1,
            DragPhase::End => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_loading_started(&mut self, e: &LoadingStartedEvent) {
        self.write_u8(TAG_LOADING_STARTED);
        self.write_u64(e.generation);
        self.write_u32(e.layer_count);
        self.write_size(e.measured);
        self.write_u64(e.timestamp_ns);
    }

    fn on_decode_requested(&mut self, e: &DecodeRequestedEvent) {
        self.write_u8(TAG_DECODE_REQUESTED);
        self.write_u64(e.generation);
        self.write_u32(e.slot);
        self.write_u32(e.image.0);
        self.write_size(e.intrinsic);
        self.write_size(e.required);
        self.write_u32(e.downsample);
        self.write_u64(e.timestamp_ns);
    }

    fn on_decode_finished(&mut self, e: &DecodeFinishedEvent) {
        self.write_u8(TAG_DECODE_FINISHED);
        self.write_u64(e.generation);
        self.write_u32(e.slot);
        self.write_u32(e.image.0);
        self.write_outcome(e.outcome);
        self.write_u64(e.elapsed_ns);
        self.write_u64(e.timestamp_ns);
    }

    fn on_loading_finished(&mut self, e: &LoadingFinishedEvent) {
        self.write_u8(TAG_LOADING_FINISHED);
        self.write_u64(e.generation);
        self.write_u32(e.layer_count);
        self.write_u32(e.failed);
        self.write_u64(e.timestamp_ns);
    }

    fn on_drag(&mut self, e: &DragEvent) {
        self.write_u8(TAG_DRAG);
        self.write_drag_phase(e.phase);
        self.write_f64(e.dx);
        self.write_f64(e.dy);
        self.write_u64(e.timestamp_ns);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`LoadingStartedEvent`].
    LoadingStarted(LoadingStartedEvent),
    /// A [`DecodeRequestedEvent`].
    DecodeRequested(DecodeRequestedEvent),
    /// A [`DecodeFinishedEvent`].
    DecodeFinished(DecodeFinishedEvent),
    /// A [`LoadingFinishedEvent`].
    LoadingFinished(LoadingFinishedEvent),
    /// A [`DragEvent`].
    Drag(DragEvent),
}

impl RecordedEvent {
    /// Nanoseconds since the stack was created.
    #[must_use]
    pub fn timestamp_ns(&self) -> u64 {
        match self {
            Self::LoadingStarted(e) => e.timestamp_ns,
            Self::DecodeRequested(e) => e.timestamp_ns,
            Self::DecodeFinished(e) => e.timestamp_ns,
            Self::LoadingFinished(e) => e.timestamp_ns,
            Self::Drag(e) => e.timestamp_ns,
        }
    }

    /// Delivers this event to `sink` as if it had just happened.
    pub fn replay(&self, sink: &mut dyn TraceSink) {
        match self {
            Self::LoadingStarted(e) => sink.on_loading_started(e),
            Self::DecodeRequested(e) => sink.on_decode_requested(e),
            Self::DecodeFinished(e) => sink.on_decode_finished(e),
            Self::LoadingFinished(e) => sink.on_loading_finished(e),
            Self::Drag(e) => sink.on_drag(e),
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take().map(f64::from_le_bytes)
    }

    fn read_size(&mut self) -> Option<PixelSize> {
        Some(PixelSize::new(self.read_u32()?, self.read_u32()?))
    }

    fn read_outcome(&mut self) -> Option<DecodeOutcome> {
        Some(match self.read_u8()? {
            0 => DecodeOutcome::Decoded,
            1 => DecodeOutcome::Failed,
            2 => DecodeOutcome::Stale,
            _ => return None,
        })
    }

    fn read_drag_phase(&mut self) -> Option<DragPhase> {
        Some(match self.read_u8()? {
            0 => DragPhase::Begin,
            1 => DragPhase::Pan,
            2 => DragPhase::End,
            _ => return None,
        })
    }

    fn decode_loading_started(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LoadingStarted(LoadingStartedEvent {
            generation: self.read_u64()?,
            layer_count: self.read_u32()?,
            measured: self.read_size()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_decode_requested(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DecodeRequested(DecodeRequestedEvent {
            generation: self.read_u64()?,
            slot: self.read_u32()?,
            image: ImageId(self.read_u32()?),
            intrinsic: self.read_size()?,
            required: self.read_size()?,
            downsample: self.read_u32()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_decode_finished(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DecodeFinished(DecodeFinishedEvent {
            generation: self.read_u64()?,
            slot: self.read_u32()?,
            image: ImageId(self.read_u32()?),
            outcome: self.read_outcome()?,
            elapsed_ns: self.read_u64()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_loading_finished(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LoadingFinished(LoadingFinishedEvent {
            generation: self.read_u64()?,
            layer_count: self.read_u32()?,
            failed: self.read_u32()?,
            timestamp_ns: self.read_u64()?,
        }))
    }

    fn decode_drag(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Drag(DragEvent {
            phase: self.read_drag_phase()?,
            dx: self.read_f64()?,
            dy: self.read_f64()?,
            timestamp_ns: self.read_u64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_LOADING_STARTED => self.decode_loading_started(),
            TAG_DECODE_REQUESTED => self.decode_decode_requested(),
            TAG_DECODE_FINISHED => self.decode_decode_finished(),
            TAG_LOADING_FINISHED => self.decode_loading_finished(),
            TAG_DRAG => self.decode_drag(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A short session: load two layers (one stale result), then drag.
    pub(crate) fn sample_session() -> Vec<RecordedEvent> {
        vec![
            RecordedEvent::LoadingStarted(LoadingStartedEvent {
                generation: 1,
                layer_count: 2,
                measured: PixelSize::new(500, 800),
                timestamp_ns: 1_000,
            }),
            RecordedEvent::DecodeRequested(DecodeRequestedEvent {
                generation: 1,
                slot: 0,
                image: ImageId(10),
                intrinsic: PixelSize::new(1000, 2000),
                required: PixelSize::new(600, 960),
                downsample: 1,
                timestamp_ns: 2_000,
            }),
            RecordedEvent::DecodeFinished(DecodeFinishedEvent {
                generation: 1,
                slot: 0,
                image: ImageId(10),
                outcome: DecodeOutcome::Decoded,
                elapsed_ns: 4_000_000,
                timestamp_ns: 5_000_000,
            }),
            RecordedEvent::DecodeFinished(DecodeFinishedEvent {
                generation: 0,
                slot: 1,
                image: ImageId(11),
                outcome: DecodeOutcome::Stale,
                elapsed_ns: 1_000,
                timestamp_ns: 5_500_000,
            }),
            RecordedEvent::LoadingFinished(LoadingFinishedEvent {
                generation: 1,
                layer_count: 2,
                failed: 0,
                timestamp_ns: 6_000_000,
            }),
            RecordedEvent::Drag(DragEvent {
                phase: DragPhase::Pan,
                dx: 20.0,
                dy: -30.5,
                timestamp_ns: 7_000_000,
            }),
        ]
    }

    pub(crate) fn record(events: &[RecordedEvent]) -> RecorderSink {
        let mut rec = RecorderSink::new();
        for event in events {
            event.replay(&mut rec);
        }
        rec
    }

    #[test]
    fn session_decodes_back_in_order() {
        let session = sample_session();
        let rec = record(&session);
        let decoded: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(decoded, session);
    }

    #[test]
    fn records_are_fixed_size() {
        let rec = record(&sample_session()[..1]);
        // tag + generation + count + size + timestamp
        assert_eq!(rec.as_bytes().len(), 1 + 8 + 4 + 8 + 8);
    }

    #[test]
    fn decode_empty() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn decode_unknown_tag_stops() {
        let mut bytes = record(&sample_session()[..1]).into_bytes();
        bytes.push(0xFF);
        bytes.extend_from_slice(&record(&sample_session()[1..2]).into_bytes());
        let events: Vec<_> = decode(&bytes).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn decode_unknown_outcome_stops() {
        let session = sample_session();
        let mut bytes = record(&session[..2]).into_bytes();
        // tag + generation + slot + image precede the outcome byte.
        let outcome_at = bytes.len() + 1 + 8 + 4 + 4;
        bytes.extend_from_slice(record(&session[2..]).as_bytes());
        bytes[outcome_at] = 7;

        let events: Vec<_> = decode(&bytes).collect();
        assert_eq!(events, session[..2]);
    }

    #[test]
    fn decode_unknown_drag_phase_stops() {
        let session = sample_session();
        let mut bytes = record(&session).into_bytes();
        let phase_at = record(&session[..5]).as_bytes().len() + 1;
        bytes[phase_at] = 3;

        let events: Vec<_> = decode(&bytes).collect();
        assert_eq!(events, session[..5]);
    }

    #[test]
    fn decode_truncated_record_stops() {
        let bytes = record(&sample_session()).into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), sample_session().len() - 1);
    }
}
