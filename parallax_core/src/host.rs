// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract.
//!
//! The stack is embedded in a host (a widget toolkit, a game loop, a test
//! harness) that owns the window and the event loop. The host provides:
//!
//! - **Images**: an [`ImageSource`](crate::source::ImageSource) handed to
//!   the stack at construction.
//! - **Layout**: [`MeasureSpec`](crate::measure::MeasureSpec)s passed to
//!   [`LayerStack::measure`](crate::stack::LayerStack::measure).
//! - **Events**: touch events and a paint target.
//! - **Callbacks**: implements [`Host`] to hear about loading lifecycle and
//!   relayout/repaint requests.
//!
//! # Event loop pseudocode
//!
//! ```rust,ignore
//! let mut stack = LayerStack::new(source, MyHost::default());
//! stack.set_drawables(&ids)?;       // -> Host::request_layout
//!
//! loop {
//!     match next_event() {
//!         Event::Layout(w, h) => { stack.measure(w, h); } // -> on_started_loading
//!         Event::Wake => { stack.pump(); }                // -> on_done_loading (once)
//!         Event::Touch(t) => { stack.on_touch_event(t); } // -> invalidate
//!         Event::Paint(surface) => stack.paint(surface),
//!     }
//! }
//! ```

/// Receives lifecycle notifications and layout/repaint requests from a
/// [`LayerStack`](crate::stack::LayerStack).
///
/// All methods have default no-op implementations, so you only need to
/// override the notifications you care about. Every method is called on the
/// thread that owns the stack.
pub trait Host {
    /// Called from [`measure`](crate::stack::LayerStack::measure) right before
    /// the layers start decoding, when there is at least one layer.
    fn on_started_loading(&mut self) {}

    /// Called once per [`set_drawables`](crate::stack::LayerStack::set_drawables)
    /// generation, when every layer has finished its first decode and the stack
    /// accepts gestures.
    fn on_done_loading(&mut self) {}

    /// Called when the layer set changed and the host should measure again.
    fn request_layout(&mut self) {}

    /// Called when layer transforms or pixels changed and the host should
    /// repaint.
    fn invalidate(&mut self) {}
}

/// A [`Host`] that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl Host for NoopHost {}

impl<H: Host + ?Sized> Host for &mut H {
    fn on_started_loading(&mut self) {
        (**self).on_started_loading();
    }

    fn on_done_loading(&mut self) {
        (**self).on_done_loading();
    }

    fn request_layout(&mut self) {
        (**self).request_layout();
    }

    fn invalidate(&mut self) {
        (**self).invalidate();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Host;

    /// Counts every callback.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct CountingHost {
        pub(crate) started: u32,
        pub(crate) done: u32,
        pub(crate) layouts: u32,
        pub(crate) invalidations: u32,
    }

    impl Host for CountingHost {
        fn on_started_loading(&mut self) {
            self.started += 1;
        }

        fn on_done_loading(&mut self) {
            self.done += 1;
        }

        fn request_layout(&mut self) {
            self.layouts += 1;
        }

        fn invalidate(&mut self) {
            self.invalidations += 1;
        }
    }
}
