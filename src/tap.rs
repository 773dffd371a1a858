//! Tap detector (spec.md §4.4): one shared FSM per device recognising
//! 1/2/3-finger taps, tap-and-drag, drag-lock and multitap. Per-touch
//! participation (`TapTouchState`) lives on [`crate::touch::Touch`]; the
//! shared state lives here, owned by `crate::device::TouchpadDevice`.

use crate::capability::ButtonCode;
use crate::timer::{self, TimerHandle, TimerService};
use crate::touch::TapTouchState;

const TAP_TIMEOUT_1FG_MS: u64 = 180;
const TAP_TIMEOUT_NFG_MS: u64 = 200;

/// The shared tap FSM's state (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapState {
    #[default]
    Idle,
    Touch,
    Tapped,
    Touch2,
    Touch2Hold,
    Touch3,
    Touch3Hold,
    DraggingOrDoubletap,
    DraggingOrTap,
    Dragging,
    DraggingWait,
    Dragging2,
    Multitap,
    MultitapDown,
    Hold,
    Dead,
}

/// Events driving the shared tap FSM. `Release`/`Move` carry the
/// finger-count *after* the event so the FSM can tell "down to 1" from
/// "down to 0".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapEvent {
    /// A tap-participating touch went down; `count` is the new total.
    Down { count: usize },
    /// A tap-participating touch released; `count` is the remaining total.
    Up { count: usize },
    /// Motion exceeded the device's tap motion threshold on some
    /// participating touch.
    Move,
    /// The decision-window timer fired.
    Timeout,
    /// A physical button click happened (always terminal for any tap/drag
    /// in progress).
    PhysicalClick,
}

/// What the caller should do in response to a transition: emit a button
/// press/release, (re)arm the shared decision timer, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    None,
    Press(ButtonCode),
    Release(ButtonCode),
}

fn button_for(finger_count: usize) -> ButtonCode {
    match finger_count {
        1 => ButtonCode::Left,
        2 => ButtonCode::Right,
        _ => ButtonCode::Middle,
    }
}

/// The shared tap FSM, owned once per device. `drag_lock` is read from the
/// device's current [`crate::config::TapConfig`] at call sites; this struct
/// only holds run-time FSM state, not configuration.
#[derive(Debug, Default)]
pub struct TapDetector {
    pub state: TapState,
    timer: Option<TimerHandle>,
    /// Finger count the in-flight tap/drag sequence was recognised with,
    /// used to pick the button on press/release.
    pending_count: usize,
    /// Multitap run length so far, for monotone-timestamp multitap bursts.
    multitap_run: usize,
    suspended: bool,
}

impl TapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// spec.md §4.4 "Suspend/resume": while the trackpoint is active or DWT
    /// is active, any in-flight tap is cancelled without emission and new
    /// touches are dead until resume. Per-touch `TapTouchState` transitions
    /// to `Dead` are the caller's responsibility (one call per active
    /// touch); this only resets the shared FSM.
    pub fn suspend(&mut self, timers: &mut dyn TimerService) {
        timer::disarm(timers, &mut self.timer);
        self.state = TapState::Dead;
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
        self.state = TapState::Idle;
        self.pending_count = 0;
        self.multitap_run = 0;
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn timeout_for(count: usize) -> u64 {
        if count <= 1 {
            TAP_TIMEOUT_1FG_MS
        } else {
            TAP_TIMEOUT_NFG_MS
        }
    }

    fn arm(&mut self, timers: &mut dyn TimerService, count: usize) {
        timer::rearm(timers, &mut self.timer, Self::timeout_for(count));
    }

    fn disarm(&mut self, timers: &mut dyn TimerService) {
        timer::disarm(timers, &mut self.timer);
    }

    /// Advances the shared FSM by one event, returning the action the
    /// caller (`crate::device`) must perform. `drag_lock` reflects the
    /// device's current tap.drag_lock option.
    pub fn advance(
        &mut self,
        event: TapEvent,
        drag_lock: bool,
        timers: &mut dyn TimerService,
    ) -> TapAction {
        if self.suspended {
            return TapAction::None;
        }

        use TapState::*;
        match (self.state, event) {
            // --- Starting a sequence -------------------------------------------------
            (Idle, TapEvent::Down { count: 1 }) => {
                self.pending_count = 1;
                self.arm(timers, 1);
                self.state = Touch;
                TapAction::None
            }

            // --- Single finger tap window ----------------------------------------
            (Touch, TapEvent::Up { count: 0 }) => {
                self.disarm(timers);
                self.state = Tapped;
                self.arm(timers, self.pending_count);
                TapAction::Press(button_for(self.pending_count))
            }
            (Touch, TapEvent::Down { count }) if count >= 2 => {
                self.pending_count = count;
                self.arm(timers, count);
                self.state = if count == 2 { Touch2 } else { Touch3 };
                TapAction::None
            }
            (Touch, TapEvent::Move) => {
                // One finger moving mid-window becomes a drag candidate
                // rather than dying outright (spec.md §4.4 motion rule).
                self.state = DraggingOrTap;
                TapAction::None
            }
            (Touch, TapEvent::Timeout) | (Touch, TapEvent::PhysicalClick) => {
                self.disarm(timers);
                self.state = Idle;
                TapAction::None
            }

            // --- Tap completed, emit release after the decision window -----------
            (Tapped, TapEvent::Timeout) => {
                self.state = Idle;
                TapAction::Release(button_for(self.pending_count))
            }
            (Tapped, TapEvent::Down { count: 1 }) => {
                // Another tap arriving inside the window: multitap burst.
                self.disarm(timers);
                self.multitap_run = 1;
                self.arm(timers, 1);
                self.state = MultitapDown;
                TapAction::Release(button_for(self.pending_count))
            }

            // --- Multi-finger touch windows (2/3 fingers) --------------------------
            (Touch2, TapEvent::Up { count }) if count < 2 => {
                self.disarm(timers);
                self.state = Tapped;
                self.arm(timers, self.pending_count);
                TapAction::Press(button_for(self.pending_count))
            }
            (Touch2, TapEvent::Down { count: 3 }) => {
                self.pending_count = 3;
                self.arm(timers, 3);
                self.state = Touch3;
                TapAction::None
            }
            (Touch2, TapEvent::Move) => {
                self.state = Dead;
                TapAction::None
            }
            (Touch2, TapEvent::Timeout) => {
                self.state = Touch2Hold;
                TapAction::None
            }
            (Touch2Hold, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::None
            }

            (Touch3, TapEvent::Up { count }) if count < 3 => {
                self.disarm(timers);
                self.state = Tapped;
                self.arm(timers, self.pending_count);
                TapAction::Press(button_for(self.pending_count))
            }
            (Touch3, TapEvent::Move) => {
                self.state = Dead;
                TapAction::None
            }
            (Touch3, TapEvent::Timeout) => {
                self.state = Touch3Hold;
                TapAction::None
            }
            (Touch3Hold, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::None
            }

            // --- Tap-and-drag -------------------------------------------------------
            (DraggingOrTap, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::Press(ButtonCode::Left)
            }
            (DraggingOrTap, TapEvent::Move) => {
                self.pending_count = 1;
                self.state = Dragging;
                TapAction::Press(ButtonCode::Left)
            }
            (Dragging, TapEvent::Up { count: 0 }) if drag_lock => {
                self.arm(timers, 1);
                self.state = DraggingWait;
                TapAction::None
            }
            (Dragging, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::Release(button_for(self.pending_count))
            }
            (Dragging, TapEvent::Down { count: 2 }) => {
                // Second finger landing during a drag: §9 open question (a)
                // decided to end the drag immediately, with the third-finger
                // wording generalised to "a finger beyond the drag's own"
                // arriving while two real slots are in play.
                self.state = Idle;
                TapAction::Release(button_for(self.pending_count))
            }
            (Dragging, TapEvent::PhysicalClick) => {
                self.state = Idle;
                TapAction::Release(button_for(self.pending_count))
            }

            (DraggingWait, TapEvent::Down { count: 1 }) => {
                self.disarm(timers);
                self.state = Dragging2;
                TapAction::None
            }
            (DraggingWait, TapEvent::Timeout) => {
                self.state = Idle;
                TapAction::Release(ButtonCode::Left)
            }
            (DraggingWait, TapEvent::PhysicalClick) => {
                self.disarm(timers);
                self.state = Idle;
                TapAction::Release(ButtonCode::Left)
            }

            (Dragging2, TapEvent::Move) => {
                self.state = Dragging;
                TapAction::None
            }
            (Dragging2, TapEvent::Up { count: 0 }) if drag_lock => {
                self.arm(timers, 1);
                self.state = DraggingWait;
                TapAction::None
            }
            (Dragging2, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::Release(ButtonCode::Left)
            }

            // --- Multitap bursts ------------------------------------------------------
            (MultitapDown, TapEvent::Up { count: 0 }) => {
                self.disarm(timers);
                self.state = Multitap;
                self.arm(timers, 1);
                TapAction::Press(button_for(self.pending_count))
            }
            (MultitapDown, TapEvent::Move) => {
                self.state = DraggingOrDoubletap;
                TapAction::None
            }
            (Multitap, TapEvent::Timeout) => {
                self.state = Idle;
                TapAction::Release(button_for(self.pending_count))
            }
            (Multitap, TapEvent::Down { count: 1 }) => {
                self.disarm(timers);
                self.multitap_run += 1;
                self.arm(timers, 1);
                self.state = MultitapDown;
                TapAction::Release(button_for(self.pending_count))
            }
            (DraggingOrDoubletap, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::Release(button_for(self.pending_count))
            }
            (DraggingOrDoubletap, TapEvent::Move) => {
                self.state = Dragging;
                TapAction::None
            }

            // --- Terminal / fallback ----------------------------------------------
            (_, TapEvent::Up { count: 0 }) if self.all_lifted_is_terminal() => {
                self.disarm(timers);
                self.state = Idle;
                TapAction::None
            }
            (Dead, TapEvent::Up { count: 0 }) => {
                self.state = Idle;
                TapAction::None
            }
            (_, TapEvent::PhysicalClick) => {
                self.disarm(timers);
                self.state = Idle;
                TapAction::None
            }
            _ => TapAction::None,
        }
    }

    /// Hold states only ever leave on the last finger lifting; every other
    /// event is ignored while in one.
    fn all_lifted_is_terminal(&self) -> bool {
        matches!(self.state, TapState::Hold)
    }

    /// Overflow (spec.md §4.1: ≥ 6 fingers) forces the whole FSM dead until
    /// every finger lifts.
    pub fn force_dead(&mut self, timers: &mut dyn TimerService) {
        self.disarm(timers);
        self.state = TapState::Dead;
    }
}

/// Per-touch motion-threshold check (spec.md §4.4: "cumulative motion below
/// a device-diagonal-scaled threshold"). `threshold` is precomputed by the
/// caller from the device diagonal.
pub fn exceeds_motion_threshold(initial: (f64, f64), current: (f64, f64), threshold: f64) -> bool {
    let dx = current.0 - initial.0;
    let dy = current.1 - initial.1;
    (dx * dx + dy * dy).sqrt() > threshold
}

/// spec.md §F.2: a touch arriving after another is already down, sitting in
/// the lower 20% of the pad, is flagged a thumb and excluded from the tap
/// finger count.
pub fn classify_thumb(point: (f64, f64), pad_height: f64, pad_min_y: f64, other_touch_already_down: bool) -> bool {
    other_touch_already_down && (point.1 - pad_min_y) / pad_height >= 0.8
}


impl TapTouchState {
    /// `Dead` per-touch state is entered for overflow and for touches that
    /// arrive while the shared FSM is suspended (spec.md §4.1, §4.4).
    pub fn is_dead(self) -> bool {
        matches!(self, TapTouchState::Dead)
    }
}
