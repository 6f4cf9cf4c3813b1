// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Surface`] backed by a `tiny-skia` pixmap.

use std::path::Path;

use kurbo::Affine;
use parallax_core::error::PaintError;
use parallax_core::source::{PixelBuffer, PixelSize};
use parallax_core::surface::Surface;
use tiny_skia::{Color, Pixmap, PixmapPaint, PixmapRef, Transform};

/// CPU raster target.
///
/// Keeps its own transform stack; `tiny-skia` draw calls are stateless.
#[derive(Clone, Debug)]
pub struct PixmapSurface {
    pixmap: Pixmap,
    saved: Vec<Transform>,
    transform: Transform,
}

impl PixmapSurface {
    /// Allocates a transparent surface.
    ///
    /// # Errors
    ///
    /// Returns [`PaintError::Backend`] if either dimension is zero or the
    /// allocation is too large.
    pub fn new(width: u32, height: u32) -> Result<Self, PaintError> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            PaintError::Backend(format!("cannot allocate a {width}x{height} pixmap"))
        })?;
        Ok(Self {
            pixmap,
            saved: Vec::new(),
            transform: Transform::identity(),
        })
    }

    /// Allocates a surface matching a measured stack size.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn for_size(size: PixelSize) -> Result<Self, PaintError> {
        Self::new(size.width, size.height)
    }

    /// Fills the whole surface with a straight-alpha RGBA color.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        let [r, g, b, a] = rgba;
        self.pixmap.fill(Color::from_rgba8(r, g, b, a));
    }

    /// Premultiplied RGBA at `(x, y)`, or `None` outside the surface.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixmap
            .pixel(x, y)
            .map(|p| [p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// The underlying pixmap.
    #[inline]
    #[must_use]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Consumes the surface and returns the pixmap.
    #[must_use]
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Encodes the surface as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`PaintError::Backend`] if encoding or writing fails.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), PaintError> {
        self.pixmap
            .save_png(path)
            .map_err(|err| PaintError::Backend(err.to_string()))
    }
}

impl Surface for PixmapSurface {
    fn save(&mut self) -> usize {
        let count = self.saved.len();
        self.saved.push(self.transform);
        count
    }

    fn restore_to_count(&mut self, count: usize) {
        if count < self.saved.len() {
            self.transform = self.saved[count];
            self.saved.truncate(count);
        }
    }

    fn concat(&mut self, transform: Affine) {
        self.transform = self.transform.pre_concat(to_skia(transform));
    }

    fn draw_pixels(&mut self, pixels: &PixelBuffer) -> Result<(), PaintError> {
        let source = PixmapRef::from_bytes(pixels.as_bytes(), pixels.width(), pixels.height())
            .ok_or(PaintError::InvalidBuffer {
                width: pixels.width(),
                height: pixels.height(),
                len: pixels.as_bytes().len(),
            })?;
        self.pixmap.draw_pixmap(
            0,
            0,
            source,
            &PixmapPaint::default(),
            self.transform,
            None,
        );
        Ok(())
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "tiny-skia transforms are f32; pan offsets are well within range"
)]
fn to_skia(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

#[cfg(test)]
mod tests {
    use kurbo::Vec2;

    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn zero_sized_surface_is_an_error() {
        assert!(matches!(
            PixmapSurface::new(0, 10),
            Err(PaintError::Backend(_))
        ));
    }

    #[test]
    fn draws_at_origin_without_transform() {
        let mut surface = PixmapSurface::new(4, 4).unwrap();
        surface.draw_pixels(&PixelBuffer::filled(2, 2, RED)).unwrap();
        assert_eq!(surface.pixel(0, 0), Some(RED));
        assert_eq!(surface.pixel(1, 1), Some(RED));
        assert_eq!(surface.pixel(2, 2), Some([0; 4]));
    }

    #[test]
    fn concat_translates_and_restore_undoes_it() {
        let mut surface = PixmapSurface::new(8, 8).unwrap();
        let count = surface.save();
        surface.concat(Affine::translate(Vec2::new(4.0, 2.0)));
        surface.draw_pixels(&PixelBuffer::filled(2, 2, RED)).unwrap();
        surface.restore_to_count(count);

        assert_eq!(surface.pixel(4, 2), Some(RED));
        assert_eq!(surface.pixel(5, 3), Some(RED));
        assert_eq!(surface.pixel(0, 0), Some([0; 4]));

        // Back at identity after the restore.
        surface.draw_pixels(&PixelBuffer::filled(1, 1, RED)).unwrap();
        assert_eq!(surface.pixel(0, 0), Some(RED));
    }

    #[test]
    fn translucent_pixels_blend_over() {
        let mut surface = PixmapSurface::new(1, 1).unwrap();
        surface.clear([0, 0, 255, 255]);
        // 50% red, premultiplied.
        surface
            .draw_pixels(&PixelBuffer::filled(1, 1, [128, 0, 0, 128]))
            .unwrap();
        let [r, g, b, a] = surface.pixel(0, 0).unwrap();
        assert_eq!(a, 255);
        assert_eq!(g, 0);
        assert!(r > 120 && r < 136, "red {r}");
        assert!(b > 120 && b < 136, "blue {b}");
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let mut surface = PixmapSurface::new(3, 3).unwrap();
        surface.clear([10, 20, 30, 255]);
        surface.save_png(&path).unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
