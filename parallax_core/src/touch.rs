// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-pointer drag state machine.
//!
//! ```text
//!            Down(p)                  Move(q)
//!   Idle ───────────────▶ Dragging ──────────▶ Dragging   emits Pan(origin - q)
//!    ▲                      │
//!    └──────────────────────┘  Up / Cancel                emits Reset
//! ```
//!
//! The origin is captured on `Down` and never updated by `Move`, so every
//! move produces the full displacement from the press point. A `Move` or
//! `Up` while idle is ignored. A second `Down` while dragging restarts the
//! gesture at the new point.

use kurbo::{Point, Vec2};

/// Pointer action reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TouchAction {
    /// Pointer pressed.
    Down,
    /// Pointer moved while pressed.
    Move,
    /// Pointer released.
    Up,
    /// The gesture was taken away (e.g. by a parent scroller).
    Cancel,
}

/// One pointer event in surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    /// What happened.
    pub action: TouchAction,
    /// Pointer x in pixels.
    pub x: f64,
    /// Pointer y in pixels.
    pub y: f64,
}

impl TouchEvent {
    /// Creates an event.
    #[inline]
    #[must_use]
    pub const fn new(action: TouchAction, x: f64, y: f64) -> Self {
        Self { action, x, y }
    }

    /// A `Down` event.
    #[inline]
    #[must_use]
    pub const fn down(x: f64, y: f64) -> Self {
        Self::new(TouchAction::Down, x, y)
    }

    /// A `Move` event.
    #[inline]
    #[must_use]
    pub const fn moved(x: f64, y: f64) -> Self {
        Self::new(TouchAction::Move, x, y)
    }

    /// An `Up` event.
    #[inline]
    #[must_use]
    pub const fn up(x: f64, y: f64) -> Self {
        Self::new(TouchAction::Up, x, y)
    }

    /// The pointer position.
    #[inline]
    #[must_use]
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Drag gesture state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A gesture started at `origin`.
    Dragging {
        /// Press point.
        origin: Point,
    },
}

/// What the stack should do in response to one event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragStep {
    /// Nothing changes.
    Ignore,
    /// A gesture started.
    Begin,
    /// Pan every layer by this raw (undamped) delta.
    Pan(Vec2),
    /// The gesture ended; reset every layer's pan.
    Reset,
}

impl DragState {
    /// Returns `true` while a gesture is in progress.
    #[inline]
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    /// Advances the state machine and returns the resulting action.
    pub fn step(&mut self, event: TouchEvent) -> DragStep {
        match (event.action, *self) {
            (TouchAction::Down, _) => {
                *self = Self::Dragging {
                    origin: event.point(),
                };
                DragStep::Begin
            }
            (TouchAction::Move, Self::Dragging { origin }) => {
                DragStep::Pan(origin - event.point())
            }
            (TouchAction::Up | TouchAction::Cancel, Self::Dragging { .. }) => {
                *self = Self::Idle;
                DragStep::Reset
            }
            (TouchAction::Move | TouchAction::Up | TouchAction::Cancel, Self::Idle) => {
                DragStep::Ignore
            }
        }
    }
}
