//! Timer service consumed by the core.
//!
//! The original design keeps a callback object owned by each per-device
//! subsystem (soft-button area timeout, tap decision window, edge-scroll
//! lock-in, DWT keystroke timer). Per spec.md §9 this becomes an opaque
//! handle returned by an injected [`TimerService`]: ownership stays
//! per-subsystem, cancellation is O(1), and at most one deadline is
//! outstanding per (touch, subsystem) slot — callers are responsible for
//! cancelling the old handle before scheduling a new one on the same slot,
//! the way [`crate::touch::Touch`]'s `button.timer`/`scroll.timer` fields do.

/// An opaque, cancellable deadline. `PartialEq`/`Eq` identify the same
/// scheduled deadline across cancel/fire calls; they do not compare equal
/// across different `schedule` calls even with the same handle value reused
/// after expiry, since a service is free to recycle ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// A monotonic clock and deadline scheduler, injected by the host.
///
/// `TouchpadDevice` never sleeps or spawns anything; it calls `now()` to
/// timestamp events and `schedule`/`cancel` to manage deadlines, and expects
/// the host to call `TouchpadDevice::on_timer(handle)` when a deadline it
/// scheduled elapses. Expired timers must be delivered serialised with
/// input events, never from inside a `dispatch` call (spec.md §5).
pub trait TimerService {
    /// Current monotonic time in milliseconds, matching the timestamp unit
    /// used on [`crate::sink::SinkEvent`] and [`crate::ingress`] frames.
    fn now(&self) -> u64;

    /// Schedule a deadline `millis` milliseconds from now and return a
    /// handle for later cancellation.
    fn schedule(&mut self, millis: u64) -> TimerHandle;

    /// Cancel a previously scheduled deadline. Idempotent: cancelling an
    /// already-fired or already-cancelled handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Starts (or restarts) a single-slot deadline: cancels whatever handle was
/// previously held in `slot`, schedules a new one, and stores it. This is
/// the "starting a new timer first cancels any outstanding timer on the
/// same (touch, subsystem) slot" invariant from spec.md §3, factored out
/// since every FSM in this crate needs it.
pub fn rearm(timers: &mut dyn TimerService, slot: &mut Option<TimerHandle>, millis: u64) {
    if let Some(old) = slot.take() {
        timers.cancel(old);
    }
    *slot = Some(timers.schedule(millis));
}

/// Cancels whatever handle is held in `slot`, if any.
pub fn disarm(timers: &mut dyn TimerService, slot: &mut Option<TimerHandle>) {
    if let Some(old) = slot.take() {
        timers.cancel(old);
    }
}
