//! Kernel event ingress and slot/fake-finger reconciliation (spec.md §4.1).
//!
//! The wire format is the standard Linux evdev event, reusing the `evdev`
//! crate's types the way `crate::input::source::evdev::touchscreen` in the
//! teacher does, rather than re-declaring a parallel set of axis/key code
//! enums. Opening the device node and reading the fd is the device
//! source's job (out of scope here, spec.md §1); this module only
//! interprets already-decoded events.

use evdev::{AbsoluteAxisCode, EventSummary, InputEvent, KeyCode, SynchronizationCode};

use crate::touch::Touch;

/// Sticky fake-finger-count bitset (spec.md §4.1). Bit 0 is `BTN_TOUCH`,
/// bits 1..=4 are the `BTN_TOOL_*` hints, bit 7 is the overflow
/// (`BTN_TOOL_QUINTTAP`) latch that stays set until `BTN_TOUCH` releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FakeTouches(pub u8);

impl FakeTouches {
    const BTN_TOUCH: u8 = 1 << 0;
    const OVERFLOW: u8 = 1 << 7;

    pub fn set_touch(&mut self, down: bool) {
        if down {
            self.0 |= Self::BTN_TOUCH;
        } else {
            self.0 &= !Self::BTN_TOUCH;
            // Overflow is sticky until BTN_TOUCH releases (spec.md §4.1).
            self.0 &= !Self::OVERFLOW;
        }
    }

    pub fn set_tool_bit(&mut self, bit: u8, set: bool) {
        debug_assert!((1..=4).contains(&bit));
        if set {
            self.0 |= 1 << bit;
        } else {
            self.0 &= !(1 << bit);
        }
    }

    /// Sets the overflow latch. Releasing `BTN_TOOL_QUINTTAP` does *not*
    /// clear it — only a subsequent `BTN_TOUCH` release does (spec.md
    /// §4.1), so `set` is only ever observed `true` here.
    pub fn set_overflow(&mut self, set: bool) {
        if set {
            self.0 |= Self::OVERFLOW;
        }
    }

    pub fn is_touching(&self) -> bool {
        self.0 & Self::BTN_TOUCH != 0
    }

    /// `ffs(fake_touches >> 1)`, or `None` for "infinite" (overflow). Zero
    /// when no `BTN_TOOL_*` hint bit is set, even while `BTN_TOUCH` is held
    /// — real touchpad firmware always raises `BTN_TOOL_FINGER` alongside
    /// the first touch, so this only reads as 0 on devices that never
    /// advertise tool-finger hints at all (and which therefore never rely
    /// on this reconciliation path).
    pub fn finger_count(&self) -> Option<u32> {
        if self.0 & Self::OVERFLOW != 0 {
            return None;
        }
        let bits = self.0 >> 1;
        if bits == 0 {
            return Some(0);
        }
        // highest set tool-finger bit, 1-indexed
        Some(32 - bits.leading_zeros())
    }
}

/// Outcome of ingesting one kernel frame (everything up to and including a
/// `SYN_REPORT`): which slots are dirty plus whether the frame signalled
/// any device-wide button edge.
#[derive(Debug, Default)]
pub struct FrameResult {
    pub dirty_slots: Vec<usize>,
    pub frame_complete: bool,
}

/// Interprets a single decoded evdev event against the ingestion state
/// (touch array + fake-finger bitset + current slot), per spec.md §4.1.
/// `single_touch_fallback` routes `ABS_X`/`ABS_Y` onto slot 0 for devices
/// without real multitouch slots.
pub struct Ingress {
    pub current_slot: usize,
    pub fake_touches: FakeTouches,
    pub single_touch_fallback: bool,
}

impl Ingress {
    pub fn new(single_touch_fallback: bool) -> Self {
        Self {
            current_slot: 0,
            fake_touches: FakeTouches::default(),
            single_touch_fallback,
        }
    }

    /// Processes one event, mutating `touches` as needed. Returns the slot
    /// index touched, if any, plus whether this was a `SYN_REPORT` frame
    /// boundary. A clickpad receiving a non-`BTN_LEFT` physical button code
    /// is a kernel bug per spec.md §4.1: the caller should have already
    /// filtered physical button codes before reaching here if the device is
    /// a clickpad (see `crate::device`), so this module just records the
    /// axis/slot bookkeeping.
    pub fn ingest(&mut self, event: InputEvent, touches: &mut [Touch], millis: u64) -> IngestOutcome {
        match event.destructure() {
            EventSummary::Synchronization(_, SynchronizationCode::SYN_REPORT, _) => {
                return IngestOutcome::FrameComplete;
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_MT_SLOT, value) => {
                self.current_slot = value as usize;
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_MT_TRACKING_ID, value) => {
                let slot = self.current_slot;
                let Some(touch) = touches.get_mut(slot) else {
                    return IngestOutcome::None;
                };
                if value != -1 {
                    touch.begin_new(millis);
                } else {
                    touch.has_ended = true;
                    touch.lifecycle = crate::touch::Lifecycle::End;
                    touch.dirty = true;
                }
                return IngestOutcome::Touched(slot);
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_MT_POSITION_X, value) => {
                let slot = self.current_slot;
                return self.update_position(touches, slot, Some(value as f64), None, millis);
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_MT_POSITION_Y, value) => {
                let slot = self.current_slot;
                return self.update_position(touches, slot, None, Some(value as f64), millis);
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_X, value) if self.single_touch_fallback => {
                return self.update_position(touches, 0, Some(value as f64), None, millis);
            }
            EventSummary::AbsoluteAxis(_, AbsoluteAxisCode::ABS_Y, value) if self.single_touch_fallback => {
                return self.update_position(touches, 0, None, Some(value as f64), millis);
            }
            EventSummary::Key(_, KeyCode::BTN_TOUCH, value) => {
                self.fake_touches.set_touch(value != 0);
            }
            EventSummary::Key(_, KeyCode::BTN_TOOL_FINGER, value) => {
                self.fake_touches.set_tool_bit(1, value != 0);
            }
            EventSummary::Key(_, KeyCode::BTN_TOOL_DOUBLETAP, value) => {
                self.fake_touches.set_tool_bit(2, value != 0);
            }
            EventSummary::Key(_, KeyCode::BTN_TOOL_TRIPLETAP, value) => {
                self.fake_touches.set_tool_bit(3, value != 0);
            }
            EventSummary::Key(_, KeyCode::BTN_TOOL_QUADTAP, value) => {
                self.fake_touches.set_tool_bit(4, value != 0);
            }
            EventSummary::Key(_, KeyCode::BTN_TOOL_QUINTTAP, value) => {
                self.fake_touches.set_overflow(value != 0);
            }
            _ => {}
        }
        IngestOutcome::None
    }

    fn update_position(
        &mut self,
        touches: &mut [Touch],
        slot: usize,
        x: Option<f64>,
        y: Option<f64>,
        millis: u64,
    ) -> IngestOutcome {
        let Some(touch) = touches.get_mut(slot) else {
            return IngestOutcome::None;
        };
        if let Some(x) = x {
            touch.point.0 = x;
        }
        if let Some(y) = y {
            touch.point.1 = y;
        }
        touch.millis = millis;
        touch.dirty = true;
        IngestOutcome::Touched(slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    None,
    Touched(usize),
    FrameComplete,
}
