// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint target contract.
//!
//! A [`Surface`] is a canvas with a save/restore stack of transforms, in the
//! style of Skia and Android's `Canvas`. Layers draw through a [`SaveGuard`],
//! which restores the surface when dropped so that an early return or a
//! failed draw cannot leak a transform into the next layer.

use core::fmt;
use core::ops::{Deref, DerefMut};

use kurbo::Affine;

use crate::error::PaintError;
use crate::source::PixelBuffer;

/// A drawing target with a save/restore stack.
pub trait Surface {
    /// Pushes the current drawing state and returns the save count *before*
    /// the push, suitable for [`restore_to_count`](Self::restore_to_count).
    fn save(&mut self) -> usize;

    /// Pops saved states until the save count equals `count`.
    fn restore_to_count(&mut self, count: usize);

    /// Pre-multiplies the current transform by `transform`.
    fn concat(&mut self, transform: Affine);

    /// Draws `pixels` with its top-left corner at the origin of the current
    /// transform.
    ///
    /// # Errors
    ///
    /// Returns a [`PaintError`] if the buffer is unusable or the backend fails.
    fn draw_pixels(&mut self, pixels: &PixelBuffer) -> Result<(), PaintError>;
}

/// Scoped save: restores the surface to its previous state on drop.
pub struct SaveGuard<'a> {
    surface: &'a mut dyn Surface,
    count: usize,
}

impl fmt::Debug for SaveGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveGuard")
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

impl<'a> SaveGuard<'a> {
    /// Saves `surface` and returns a guard that restores it.
    #[must_use]
    pub fn new(surface: &'a mut dyn Surface) -> Self {
        let count = surface.save();
        Self { surface, count }
    }
}

impl<'a> Deref for SaveGuard<'a> {
    type Target = dyn Surface + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.surface
    }
}

impl DerefMut for SaveGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.surface
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.surface.restore_to_count(self.count);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// One recorded draw call.
    #[derive(Clone, Debug, PartialEq)]
    pub(crate) struct DrawCall {
        pub(crate) transform: Affine,
        pub(crate) width: u32,
        pub(crate) height: u32,
    }

    /// A surface that records draws and tracks its save stack.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub(crate) stack: Vec<Affine>,
        pub(crate) current: Affine,
        pub(crate) draws: Vec<DrawCall>,
        pub(crate) concats: usize,
        pub(crate) fail_draws: bool,
    }

    impl Surface for RecordingSurface {
        fn save(&mut self) -> usize {
            let count = self.stack.len();
            self.stack.push(self.current);
            count
        }

        fn restore_to_count(&mut self, count: usize) {
            while self.stack.len() > count {
                if let Some(t) = self.stack.pop() {
                    self.current = t;
                }
            }
        }

        fn concat(&mut self, transform: Affine) {
            self.concats += 1;
            self.current = self.current * transform;
        }

        fn draw_pixels(&mut self, pixels: &PixelBuffer) -> Result<(), PaintError> {
            if self.fail_draws {
                return Err(PaintError::Backend("refused".into()));
            }
            self.draws.push(DrawCall {
                transform: self.current,
                width: pixels.width(),
                height: pixels.height(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Vec2;

    use super::testing::RecordingSurface;
    use super::*;

    #[test]
    fn guard_restores_on_drop() {
        let mut surface = RecordingSurface::default();
        {
            let mut guard = SaveGuard::new(&mut surface);
            guard.concat(Affine::translate(Vec2::new(5.0, 5.0)));
        }
        assert_eq!(surface.current, Affine::IDENTITY);
        assert!(surface.stack.is_empty());
    }

    #[test]
    fn guard_restores_after_failed_draw() {
        let mut surface = RecordingSurface {
            fail_draws: true,
            ..RecordingSurface::default()
        };
        fn draw_translated(surface: &mut dyn Surface) -> Result<(), PaintError> {
            let mut guard = SaveGuard::new(surface);
            guard.concat(Affine::translate(Vec2::new(1.0, 2.0)));
            guard.draw_pixels(&PixelBuffer::filled(1, 1, [0; 4]))?;
            Ok(())
        }
        assert!(draw_translated(&mut surface).is_err());
        assert_eq!(surface.current, Affine::IDENTITY);
        assert!(surface.stack.is_empty());
    }

    #[test]
    fn nested_guards_unwind_in_order() {
        let mut surface = RecordingSurface::default();
        let outer_t = Affine::translate(Vec2::new(10.0, 0.0));
        let mut outer = SaveGuard::new(&mut surface);
        outer.concat(outer_t);
        {
            let mut inner = SaveGuard::new(&mut *outer);
            inner.concat(Affine::translate(Vec2::new(0.0, 10.0)));
        }
        drop(outer);
        assert_eq!(surface.current, Affine::IDENTITY);
    }
}
