// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A single image layer.
//!
//! A [`Layer`] owns one image, its decoded pixels and its pan transform.
//! Decoding happens off-thread: [`Layer::on_measure`] starts a worker and
//! returns immediately, and the result comes back through the stack's
//! completion channel to [`Layer::install`] on the rendering thread.
//!
//! Each call to [`on_measure`](Layer::on_measure) (and
//! [`set_image_id`](Layer::set_image_id)) bumps the layer's decode
//! generation. Only a completion carrying the current generation is
//! installed, so at most one request per layer is ever live.

use core::fmt;
use std::sync::Arc;

use kurbo::{Affine, Vec2};

use crate::decode::{CompletionSender, DecodeCompletion, WakeFn};
use crate::error::{DecodeError, LayoutPreconditionError, PaintError};
use crate::policy;
use crate::source::{ImageId, ImageSource, PixelBuffer, PixelSize};
use crate::surface::{SaveGuard, Surface};

/// What a layer asked its decoder for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeRequest {
    /// Image being decoded.
    pub image: ImageId,
    /// Native size of the image.
    pub intrinsic: PixelSize,
    /// Measured box plus pan margin.
    pub required: PixelSize,
    /// Power-of-two downsample factor.
    pub downsample: u32,
    /// Decode generation the completion must carry to be installed.
    pub generation: u64,
}

/// One image in a [`LayerStack`](crate::stack::LayerStack).
pub struct Layer {
    image_id: ImageId,
    position: u32,
    z_order: usize,
    damping: f64,
    intrinsic: PixelSize,
    measured: Option<PixelSize>,
    required: PixelSize,
    downsample: u32,
    pixels: Option<PixelBuffer>,
    last_error: Option<DecodeError>,
    transform: Affine,
    decode_generation: u64,
    loaded: bool,
    source: Arc<dyn ImageSource>,
    done: CompletionSender,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("image_id", &self.image_id)
            .field("position", &self.position)
            .field("z_order", &self.z_order)
            .field("intrinsic", &self.intrinsic)
            .field("required", &self.required)
            .field("downsample", &self.downsample)
            .field("transform", &self.transform)
            .field("decode_generation", &self.decode_generation)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

impl Layer {
    /// Creates a layer and probes its image bounds.
    ///
    /// `position` is the 1-based depth used to damp pan deltas; the paint
    /// order is taken from the slot of `done`. A failed probe is logged and
    /// leaves the intrinsic size at zero.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutPreconditionError::ZeroPosition`] if `position` is 0.
    pub fn new(
        image_id: ImageId,
        position: u32,
        source: Arc<dyn ImageSource>,
        done: CompletionSender,
    ) -> Result<Self, LayoutPreconditionError> {
        if position == 0 {
            return Err(LayoutPreconditionError::ZeroPosition);
        }
        let intrinsic = probe(source.as_ref(), image_id);
        Ok(Self {
            image_id,
            position,
            z_order: done.slot(),
            damping: 1.0 - 1.0 / f64::from(position),
            intrinsic,
            measured: None,
            required: PixelSize::ZERO,
            downsample: 1,
            pixels: None,
            last_error: None,
            transform: Affine::IDENTITY,
            decode_generation: 0,
            loaded: false,
            source,
            done,
        })
    }

    /// Replaces the image, re-reads its bounds and invalidates any decode in
    /// flight for the previous image.
    ///
    /// If the layer has been measured, the new image is decoded for the same
    /// box and the request is returned. The previous pixels stay on screen
    /// until that decode lands.
    pub fn set_image_id(&mut self, image_id: ImageId) -> Option<DecodeRequest> {
        self.image_id = image_id;
        self.intrinsic = probe(self.source.as_ref(), image_id);
        self.decode_generation += 1;
        let measured = self.measured?;
        Some(self.on_measure(measured.width, measured.height))
    }

    /// Starts decoding for a measured box of `width` x `height`.
    ///
    /// Computes the required size (box plus pan margin) and the downsample
    /// factor, then spawns a decode worker. Returns immediately.
    pub fn on_measure(&mut self, width: u32, height: u32) -> DecodeRequest {
        self.measured = Some(PixelSize::new(width, height));
        self.required = policy::required_size(PixelSize::new(width, height));
        self.downsample = policy::downsample_factor(self.intrinsic, self.required);
        self.decode_generation += 1;

        log::debug!(
            "layer {} decoding {} at 1/{} (intrinsic {}x{}, required {}x{})",
            self.z_order,
            self.image_id,
            self.downsample,
            self.intrinsic.width,
            self.intrinsic.height,
            self.required.width,
            self.required.height,
        );
        self.done.spawn(
            Arc::clone(&self.source),
            self.image_id,
            self.downsample,
            self.decode_generation,
        );

        DecodeRequest {
            image: self.image_id,
            intrinsic: self.intrinsic,
            required: self.required,
            downsample: self.downsample,
            generation: self.decode_generation,
        }
    }

    /// Applies a decode completion.
    ///
    /// Returns `false` (and changes nothing) if the completion answers a
    /// superseded request. A failed decode is still accepted: the layer drops
    /// its pixels and counts as loaded.
    pub fn install(&mut self, completion: DecodeCompletion) -> bool {
        let ticket = completion.ticket;
        if ticket.stack_generation != self.done.stack_generation()
            || ticket.slot != self.done.slot()
            || ticket.layer_generation != self.decode_generation
        {
            return false;
        }

        match completion.result {
            Ok(pixels) => {
                self.pixels = Some(pixels);
                self.last_error = None;
            }
            Err(err) => {
                log::warn!("layer {}: {err}", self.z_order);
                self.pixels = None;
                self.last_error = Some(err);
            }
        }
        self.loaded = true;
        true
    }

    /// Pans by a raw delta, damped by this layer's position.
    ///
    /// The applied delta is `d - d / position` on each axis and is added to
    /// any translation already accumulated. Returns the applied delta.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Vec2 {
        let applied = Vec2::new(dx, dy) * self.damping;
        self.transform = self.transform.then_translate(applied);
        applied
    }

    pub(crate) fn set_wake(&mut self, wake: Option<WakeFn>) {
        self.done.set_wake(wake);
    }

    /// Resets the transform to identity.
    pub fn reset_pan(&mut self) {
        self.transform = Affine::IDENTITY;
    }

    /// Draws the decoded pixels through the current transform.
    ///
    /// Does nothing before the first successful decode. The surface is
    /// restored to its prior state on every exit path.
    ///
    /// # Errors
    ///
    /// Propagates the surface's [`PaintError`].
    pub fn draw(&self, surface: &mut dyn Surface) -> Result<(), PaintError> {
        let Some(pixels) = &self.pixels else {
            return Ok(());
        };
        let mut guard = SaveGuard::new(surface);
        if self.transform != Affine::IDENTITY {
            guard.concat(self.transform);
        }
        guard.draw_pixels(pixels)
    }

    /// Image shown by this layer.
    #[inline]
    #[must_use]
    pub fn image_id(&self) -> ImageId {
        self.image_id
    }

    /// 1-based depth used for damping.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    /// Paint order within the stack (0 is drawn first).
    #[inline]
    #[must_use]
    pub fn z_order(&self) -> usize {
        self.z_order
    }

    /// Fraction of a raw pan delta this layer applies.
    #[inline]
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Native size reported by the bounds probe (zero if it failed).
    #[inline]
    #[must_use]
    pub fn intrinsic_size(&self) -> PixelSize {
        self.intrinsic
    }

    /// Decode target from the last measure (zero before the first).
    #[inline]
    #[must_use]
    pub fn required_size(&self) -> PixelSize {
        self.required
    }

    /// Downsample factor chosen by the last measure.
    #[inline]
    #[must_use]
    pub fn downsample(&self) -> u32 {
        self.downsample
    }

    /// Decoded pixels, if a decode has succeeded.
    #[inline]
    #[must_use]
    pub fn pixels(&self) -> Option<&PixelBuffer> {
        self.pixels.as_ref()
    }

    /// Error from the last installed decode, if it failed.
    #[inline]
    #[must_use]
    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.last_error.as_ref()
    }

    /// Accumulated pan transform.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Current decode generation.
    #[inline]
    #[must_use]
    pub fn decode_generation(&self) -> u64 {
        self.decode_generation
    }

    /// Whether any decode (successful or not) has been installed.
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

fn probe(source: &dyn ImageSource, image_id: ImageId) -> PixelSize {
    match source.probe_bounds(image_id) {
        Ok(size) => size,
        Err(err) => {
            log::warn!("bounds probe failed: {err}");
            PixelSize::ZERO
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::decode::DecodeConfig;
    use crate::decode::testing::FakeSource;
    use crate::surface::testing::RecordingSurface;

    const TALL: PixelSize = PixelSize::new(1000, 2000);

    fn layer_at(
        position: u32,
        source: FakeSource,
    ) -> (Layer, mpsc::Receiver<DecodeCompletion>) {
        let (tx, rx) = mpsc::channel();
        let done = CompletionSender::new(tx, 1, 0, None, Arc::new(DecodeConfig::standard()));
        let layer = Layer::new(ImageId(1), position, Arc::new(source), done).unwrap();
        (layer, rx)
    }

    fn wait(rx: &mpsc::Receiver<DecodeCompletion>) -> DecodeCompletion {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    fn translation(layer: &Layer) -> Vec2 {
        layer.transform().translation()
    }

    #[test]
    fn zero_position_is_rejected() {
        let (tx, _rx) = mpsc::channel();
        let done = CompletionSender::new(tx, 1, 0, None, Arc::new(DecodeConfig::standard()));
        let err = Layer::new(ImageId(1), 0, Arc::new(FakeSource::default()), done).unwrap_err();
        assert_eq!(err, LayoutPreconditionError::ZeroPosition);
    }

    #[test]
    fn failed_probe_leaves_zero_size() {
        let (layer, _rx) = layer_at(1, FakeSource::default());
        assert_eq!(layer.intrinsic_size(), PixelSize::ZERO);
    }

    #[test]
    fn measure_sizes_and_installs_decode() {
        let (mut layer, rx) = layer_at(2, FakeSource::uniform(&[ImageId(1)], TALL));
        assert_eq!(layer.intrinsic_size(), TALL);

        let request = layer.on_measure(500, 800);
        assert_eq!(request.required, PixelSize::new(600, 960));
        assert_eq!(request.downsample, 1);
        assert_eq!(request.generation, 1);
        assert!(!layer.is_loaded());

        assert!(layer.install(wait(&rx)));
        assert!(layer.is_loaded());
        assert_eq!(layer.pixels().map(PixelBuffer::size), Some(TALL));
    }

    #[test]
    fn small_box_downsamples_decode() {
        let (mut layer, rx) = layer_at(1, FakeSource::uniform(&[ImageId(1)], TALL));
        let request = layer.on_measure(100, 100);
        // required 120x120; (1000/2)/8 = 62 would undershoot, so 8 is the last doubling.
        assert_eq!(request.downsample, 8);
        assert!(layer.install(wait(&rx)));
        assert_eq!(
            layer.pixels().map(PixelBuffer::size),
            Some(PixelSize::new(125, 250))
        );
    }

    #[test]
    fn superseded_completion_is_rejected() {
        let (mut layer, rx) = layer_at(1, FakeSource::uniform(&[ImageId(1)], TALL));
        layer.on_measure(500, 800);
        let first = wait(&rx);
        layer.on_measure(250, 400);
        let second = wait(&rx);

        assert!(!layer.install(first));
        assert!(!layer.is_loaded());
        assert!(layer.install(second));
        assert_eq!(layer.downsample(), 2);
    }

    #[test]
    fn completion_from_other_stack_generation_is_rejected() {
        let (mut layer, _rx) = layer_at(1, FakeSource::uniform(&[ImageId(1)], TALL));
        layer.on_measure(10, 10);
        let foreign = DecodeCompletion {
            ticket: crate::decode::DecodeTicket {
                stack_generation: 99,
                slot: 0,
                layer_generation: layer.decode_generation(),
            },
            image: ImageId(1),
            downsample: 1,
            result: Ok(PixelBuffer::filled(1, 1, [0; 4])),
            elapsed: Duration::ZERO,
        };
        assert!(!layer.install(foreign));
    }

    #[test]
    fn set_image_id_before_measure_only_rereads_bounds() {
        let mut source = FakeSource::uniform(&[ImageId(1)], TALL);
        source.sizes.insert(ImageId(2), PixelSize::new(40, 30));
        let (mut layer, rx) = layer_at(1, source);

        assert_eq!(layer.set_image_id(ImageId(2)), None);
        assert_eq!(layer.intrinsic_size(), PixelSize::new(40, 30));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn set_image_id_redecodes_in_flight_layer() {
        let mut source = FakeSource::uniform(&[ImageId(1)], TALL);
        source.sizes.insert(ImageId(2), PixelSize::new(40, 30));
        let (mut layer, rx) = layer_at(1, source);
        layer.on_measure(50, 50);

        let request = layer.set_image_id(ImageId(2)).unwrap();
        assert_eq!(layer.image_id(), ImageId(2));
        assert_eq!(request.image, ImageId(2));
        assert_eq!(request.required, PixelSize::new(60, 60));
        assert_eq!(request.generation, layer.decode_generation());

        // Workers race; only the replacement decode is accepted.
        let accepted = [wait(&rx), wait(&rx)]
            .into_iter()
            .filter(|done| done.image == ImageId(2))
            .map(|done| layer.install(done))
            .collect::<Vec<_>>();
        assert_eq!(accepted, vec![true]);
        assert!(layer.is_loaded());
        assert_eq!(
            layer.pixels().map(PixelBuffer::size),
            Some(PixelSize::new(40, 30))
        );
    }

    #[test]
    fn stale_image_completion_is_rejected() {
        let source = FakeSource::uniform(&[ImageId(1), ImageId(2)], TALL);
        let (mut layer, rx) = layer_at(1, source);
        layer.on_measure(500, 800);
        layer.set_image_id(ImageId(2));

        let mut done = [wait(&rx), wait(&rx)];
        done.sort_by_key(|d| d.image);
        let [old, new] = done;
        assert!(!layer.install(old));
        assert!(!layer.is_loaded());
        assert!(layer.install(new));
    }

    #[test]
    fn failed_decode_counts_as_loaded() {
        let mut source = FakeSource::uniform(&[ImageId(1)], TALL);
        source.broken.push(ImageId(1));
        let (mut layer, rx) = layer_at(1, source);
        layer.on_measure(500, 800);

        assert!(layer.install(wait(&rx)));
        assert!(layer.is_loaded());
        assert!(layer.pixels().is_none());
        assert!(matches!(
            layer.decode_error(),
            Some(DecodeError::Format { .. })
        ));

        let mut surface = RecordingSurface::default();
        layer.draw(&mut surface).unwrap();
        assert!(surface.draws.is_empty());
    }

    #[test]
    fn pan_is_damped_by_position() {
        let expected = [(1, 0.0, 0.0), (2, 10.0, 15.0), (3, 40.0 / 3.0, 20.0)];
        for (position, ex, ey) in expected {
            let (mut layer, _rx) = layer_at(position, FakeSource::default());
            layer.pan(20.0, 30.0);
            let t = translation(&layer);
            assert!((t.x - ex).abs() < 1e-9, "position {position}: {t:?}");
            assert!((t.y - ey).abs() < 1e-9, "position {position}: {t:?}");
        }
    }

    #[test]
    fn damped_pan_is_smaller_than_raw_delta() {
        for position in 2..10 {
            let (mut layer, _rx) = layer_at(position, FakeSource::default());
            for d in [-50.0, -1.0, 0.5, 7.0, 300.0] {
                let applied = layer.pan(d, -d);
                assert!(applied.x.abs() < f64::abs(d));
                assert!(applied.y.abs() < f64::abs(d));
                assert!(applied.x.abs() > 0.0);
                assert_eq!(applied.x.signum(), f64::signum(d));
            }
            assert_eq!(layer.pan(0.0, 0.0), Vec2::ZERO);
        }
    }

    #[test]
    fn negative_pan_mirrors_positive() {
        let (mut layer, _rx) = layer_at(2, FakeSource::default());
        assert_eq!(layer.pan(-20.0, -30.0), Vec2::new(-10.0, -15.0));
        assert_eq!(translation(&layer), Vec2::new(-10.0, -15.0));
    }

    #[test]
    fn pan_accumulates_and_resets() {
        let (mut layer, _rx) = layer_at(2, FakeSource::default());
        layer.pan(10.0, 0.0);
        layer.pan(20.0, 4.0);
        assert_eq!(translation(&layer), Vec2::new(15.0, 2.0));

        layer.reset_pan();
        assert_eq!(layer.transform(), Affine::IDENTITY);
    }

    #[test]
    fn draw_after_reset_uses_identity() {
        let (mut layer, rx) = layer_at(3, FakeSource::uniform(&[ImageId(1)], PixelSize::new(8, 8)));
        layer.on_measure(8, 8);
        assert!(layer.install(wait(&rx)));
        layer.pan(30.0, 30.0);
        layer.reset_pan();

        let mut surface = RecordingSurface::default();
        layer.draw(&mut surface).unwrap();
        assert_eq!(surface.concats, 0);
        assert_eq!(surface.draws.len(), 1);
        assert_eq!(surface.draws[0].transform, Affine::IDENTITY);
    }

    #[test]
    fn draw_applies_pan_and_restores() {
        let (mut layer, rx) = layer_at(2, FakeSource::uniform(&[ImageId(1)], PixelSize::new(8, 8)));
        layer.on_measure(8, 8);
        assert!(layer.install(wait(&rx)));
        layer.pan(4.0, 6.0);

        let mut surface = RecordingSurface::default();
        layer.draw(&mut surface).unwrap();
        assert_eq!(
            surface.draws[0].transform,
            Affine::translate(Vec2::new(2.0, 3.0))
        );
        assert_eq!(surface.current, Affine::IDENTITY);
        assert!(surface.stack.is_empty());
    }

    #[test]
    fn failed_draw_restores_surface() {
        let (mut layer, rx) = layer_at(2, FakeSource::uniform(&[ImageId(1)], PixelSize::new(8, 8)));
        layer.on_measure(8, 8);
        assert!(layer.install(wait(&rx)));
        layer.pan(4.0, 6.0);

        let mut surface = RecordingSurface {
            fail_draws: true,
            ..RecordingSurface::default()
        };
        assert!(layer.draw(&mut surface).is_err());
        assert_eq!(surface.current, Affine::IDENTITY);
        assert!(surface.stack.is_empty());
    }
}
