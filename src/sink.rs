//! The compositor-facing event sink. A [`crate::device::TouchpadDevice`]
//! never talks to a compositor directly — per the core's scope, dispatch is
//! an external collaborator's job. Emitted events are handed to whatever
//! implements [`EventSink`], the same separation the teacher draws between
//! a `SourceInputDevice` (produces events) and a `TargetInputDevice`
//! (consumes them) by routing everything through a plain value type
//! (`NativeEvent` there, [`SinkEvent`] here) instead of a trait per event
//! kind.

use crate::capability::{Axis, AxisSource, ButtonCode};

/// One high level event emitted by the core during a `dispatch` call.
///
/// Timestamps are in milliseconds from an arbitrary monotonic epoch chosen
/// by the host; the core only guarantees they are non-decreasing across
/// emitted events (spec ordering guarantee).
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Accelerated relative pointer motion.
    PointerMotion { millis: u64, dx: f64, dy: f64 },
    /// Unaccelerated, 1000-dpi-normalised relative pointer motion, emitted
    /// alongside `PointerMotion` for clients that want to apply their own
    /// acceleration curve.
    PointerMotionUnaccelerated { millis: u64, dx: f64, dy: f64 },
    /// Absolute pointer motion in device units (used rarely; mostly for
    /// debugging/replay tooling).
    PointerMotionAbsolute { millis: u64, x: f64, y: f64 },
    /// A physical or soft button changed state.
    PointerButton {
        millis: u64,
        button: ButtonCode,
        pressed: bool,
        /// Seat-wide count of currently pressed buttons, including this one.
        seat_press_count: u32,
    },
    /// A scroll axis event. `value` is in the device-independent normalised
    /// unit (1.0 == one wheel click). `discrete` is only meaningful for
    /// `AxisSource::Wheel`.
    PointerAxis {
        millis: u64,
        axis: Axis,
        source: AxisSource,
        value: f64,
        discrete: Option<i32>,
    },
    /// A touch began at `(x, y)` in the given slot.
    TouchDown {
        millis: u64,
        slot: u8,
        x: f64,
        y: f64,
    },
    /// A touch moved to `(x, y)`.
    TouchMotion {
        millis: u64,
        slot: u8,
        x: f64,
        y: f64,
    },
    /// A touch was lifted.
    TouchUp { millis: u64, slot: u8 },
    /// Terminates a batch of touch down/motion/up events belonging to the
    /// same kernel frame.
    TouchFrame { millis: u64 },
    /// All in-progress touches should be discarded without generating `Up`
    /// events (used on suspend).
    TouchCancel { millis: u64 },
    /// A logical touchpad device became available.
    DeviceAdded,
    /// A logical touchpad device was removed. Always preceded by button
    /// release events for any buttons that were down (spec ordering
    /// guarantee).
    DeviceRemoved,
}

/// Receives the events emitted by a [`crate::device::TouchpadDevice`].
///
/// Implemented by the host; the core only ever calls `handle`.
pub trait EventSink {
    fn handle(&mut self, event: SinkEvent);

    /// Convenience for emitting several events in emission order.
    fn handle_all(&mut self, events: impl IntoIterator<Item = SinkEvent>) {
        for event in events {
            self.handle(event);
        }
    }
}
