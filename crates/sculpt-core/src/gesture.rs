//! Semantic gesture events and the rate limiting applied to them.

use crate::point::PointRef;
use kurbo::{Point, Vec2};
use std::time::Duration;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Gesture event type emitted by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    CanvasDragStart,
    CanvasDragMove,
    CanvasDragEnd,
    ControlPointDragStart,
    ControlPointDragMove,
    ControlPointDragEnd,
}

/// Lifecycle phase of a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Start,
    Move,
    End,
}

impl GestureKind {
    pub fn phase(self) -> GesturePhase {
        match self {
            GestureKind::CanvasDragStart | GestureKind::ControlPointDragStart => GesturePhase::Start,
            GestureKind::CanvasDragMove | GestureKind::ControlPointDragMove => GesturePhase::Move,
            GestureKind::CanvasDragEnd | GestureKind::ControlPointDragEnd => GesturePhase::End,
        }
    }

    pub fn is_control_point(self) -> bool {
        matches!(
            self,
            GestureKind::ControlPointDragStart
                | GestureKind::ControlPointDragMove
                | GestureKind::ControlPointDragEnd
        )
    }
}

/// Pointer state attached to a gesture event.
#[derive(Debug, Clone, PartialEq)]
pub struct GesturePayload {
    /// Pointer position in canvas coordinates.
    pub position: Point,
    /// Displacement since the drag started.
    pub delta: Vec2,
    /// Snap point the pointer locked onto, if any.
    pub point: Option<PointRef>,
}

impl GesturePayload {
    pub fn new(position: Point, delta: Vec2) -> Self {
        Self {
            position,
            delta,
            point: None,
        }
    }

    pub fn with_point(mut self, point: PointRef) -> Self {
        self.point = Some(point);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub kind: GestureKind,
    pub payload: GesturePayload,
}

impl GestureEvent {
    pub fn new(kind: GestureKind, payload: GesturePayload) -> Self {
        Self { kind, payload }
    }

    pub fn drag_start(x: f64, y: f64) -> Self {
        Self::new(
            GestureKind::CanvasDragStart,
            GesturePayload::new(Point::new(x, y), Vec2::ZERO),
        )
    }

    pub fn drag_move(x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self::new(
            GestureKind::CanvasDragMove,
            GesturePayload::new(Point::new(x, y), Vec2::new(dx, dy)),
        )
    }

    pub fn drag_end(x: f64, y: f64, dx: f64, dy: f64) -> Self {
        Self::new(
            GestureKind::CanvasDragEnd,
            GesturePayload::new(Point::new(x, y), Vec2::new(dx, dy)),
        )
    }

    pub fn phase(&self) -> GesturePhase {
        self.kind.phase()
    }
}

/// Rate limiter that lets at most one item through per interval and keeps
/// the newest suppressed item so the tail of a burst is never lost.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    interval: Duration,
    last_emit: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        self.last_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Offer an item. Returns it immediately if the window is open,
    /// otherwise holds it as the trailing item (replacing any older one).
    pub fn push(&mut self, item: T, now: Instant) -> Option<T> {
        if self.ready(now) {
            self.last_emit = Some(now);
            self.pending = None;
            return Some(item);
        }
        self.pending = Some(item);
        None
    }

    /// Release the trailing item once its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.ready(now) {
            self.last_emit = Some(now);
            return self.pending.take();
        }
        None
    }

    /// Release the trailing item unconditionally.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget timing and any held item.
    pub fn reset(&mut self) {
        self.last_emit = None;
        self.pending = None;
    }
}

/// Delays an item until no newer one arrived for the configured window.
///
/// Once [`Debounce::mark_processed`] is called (the gesture ended), a
/// scheduled item never fires.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Duration,
    deadline: Option<Instant>,
    pending: Option<T>,
    processed: bool,
}

impl<T> Debounce<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: None,
            processed: false,
        }
    }

    /// Schedule an item, restarting the window.
    pub fn schedule(&mut self, item: T, now: Instant) {
        self.pending = Some(item);
        self.deadline = Some(now + self.delay);
        self.processed = false;
    }

    /// Fire the scheduled item if its window elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.processed {
            return None;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Drop anything scheduled; later polls are no-ops until the next
    /// [`Debounce::schedule`].
    pub fn mark_processed(&mut self) {
        self.processed = true;
        self.pending = None;
        self.deadline = None;
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }
}
