//! Palm, disable-while-typing (DWT), and pinned-finger suppression
//! (spec.md §4.6).

use crate::geometry::DeviceGeometry;
use crate::timer::{self, TimerHandle, TimerService};
use crate::touch::{PalmState, PalmTouchState, Pinned};

const PALM_EDGE_RELEASE_WINDOW_MS: u64 = 200;
const DWT_FIRST_KEYSTROKE_MS: u64 = 220;
const DWT_CONTINUED_TYPING_MS: u64 = 520;

/// Left/right palm-zone extents: the outer 5% of width (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PalmGeometry {
    pub left_zone_x: f64,
    pub right_zone_x: f64,
    pub northern_half_y: f64,
}

impl PalmGeometry {
    pub fn compute(geometry: &DeviceGeometry) -> Self {
        let margin = geometry.x.range() * 0.05;
        PalmGeometry {
            left_zone_x: geometry.x.minimum as f64 + margin,
            right_zone_x: geometry.x.maximum as f64 - margin,
            northern_half_y: geometry.y.minimum as f64 + geometry.y.range() / 2.0,
        }
    }

    pub fn in_palm_zone(&self, point: (f64, f64)) -> bool {
        point.0 <= self.left_zone_x || point.0 >= self.right_zone_x
    }

    pub fn in_northern_half(&self, point: (f64, f64)) -> bool {
        point.1 < self.northern_half_y
    }
}

/// Classifies a newly-begun touch for edge-palm and palm-tap purposes
/// (spec.md §4.6). `in_button_area` excludes touches already claimed by the
/// soft-button FSM, which are never palm-classified even if geometrically
/// inside a palm zone.
pub fn classify_begin(
    point: (f64, f64),
    time: u64,
    geometry: &PalmGeometry,
    palm_detection_enabled: bool,
    in_button_area: bool,
) -> PalmTouchState {
    if !palm_detection_enabled || in_button_area || !geometry.in_palm_zone(point) {
        return PalmTouchState::default();
    }
    PalmTouchState {
        state: PalmState::Edge,
        first: point,
        time,
    }
}

/// A touch already classified `PALM_EDGE` is checked every frame against
/// the release criterion (spec.md §4.6): within 200 ms of entry, the touch
/// returns inside the non-palm band and its travel direction from `first`
/// is within ±45° of horizontal.
pub fn maybe_release_edge_palm(
    touch: &mut PalmTouchState,
    point: (f64, f64),
    now: u64,
    geometry: &PalmGeometry,
) {
    if touch.state != PalmState::Edge {
        return;
    }
    if now.saturating_sub(touch.time) > PALM_EDGE_RELEASE_WINDOW_MS {
        return;
    }
    if geometry.in_palm_zone(point) {
        return;
    }
    let dx = point.0 - touch.first.0;
    let dy = point.1 - touch.first.1;
    if dx == 0.0 && dy == 0.0 {
        return;
    }
    // within +/-45 degrees of horizontal: |dy| <= |dx|
    if dy.abs() <= dx.abs() {
        *touch = PalmTouchState::default();
    }
}

/// True when a BEGIN touch should be classified directly as a palm tap and
/// excluded from tap processing (spec.md §4.6: palm zone *and* northern
/// half, and not already a button-area touch).
pub fn is_palm_tap(point: (f64, f64), geometry: &PalmGeometry, palm_detection_enabled: bool, in_button_area: bool) -> bool {
    palm_detection_enabled
        && !in_button_area
        && geometry.in_palm_zone(point)
        && geometry.in_northern_half(point)
}

/// Disable-while-typing timer (spec.md §4.6). Owned once per device,
/// driven by the host's keyboard listener.
#[derive(Debug, Default)]
pub struct DwtTimer {
    timer: Option<TimerHandle>,
    pub active: bool,
    pub last_keypress: u64,
}

/// Key codes the DWT timer ignores entirely: modifiers, F-keys, numpad,
/// multimedia. Represented as a predicate so the host's keyboard listener
/// (an external collaborator) supplies the actual evdev key codes.
pub fn should_ignore_for_dwt(is_modifier: bool, is_function_key: bool, is_numpad: bool, is_multimedia: bool) -> bool {
    is_modifier || is_function_key || is_numpad || is_multimedia
}

impl DwtTimer {
    /// A non-ignored keypress starts or extends the suppression window:
    /// 220 ms on the first keystroke of a burst, 520 ms while typing
    /// continues (spec.md §4.6).
    pub fn on_keypress(&mut self, now: u64, timers: &mut dyn TimerService) {
        let extending = self.active;
        self.last_keypress = now;
        self.active = true;
        let millis = if extending { DWT_CONTINUED_TYPING_MS } else { DWT_FIRST_KEYSTROKE_MS };
        timer::rearm(timers, &mut self.timer, millis);
    }

    /// The suppression timer elapsed with no further keypress.
    pub fn on_timeout(&mut self) {
        self.active = false;
    }

    pub fn cancel(&mut self, timers: &mut dyn TimerService) {
        timer::disarm(timers, &mut self.timer);
        self.active = false;
    }
}

/// Resolves a `PALM_TYPING` touch's eligibility to become active again once
/// the DWT timer fires (spec.md §4.6): a touch whose BEGIN preceded the
/// last keypress reactivates when the timer fires; one that began after
/// typing ended stays `PALM_TYPING` until release.
pub fn dwt_reactivate_on_timeout(touch_began_at: u64, last_keypress: u64) -> bool {
    touch_began_at <= last_keypress
}

/// Pins every currently-down touch on a clickpad physical press (spec.md
/// §4.6). `threshold_sq` is the squared device-unit displacement above
/// which the pin releases.
pub fn pin(touch: &mut Pinned, center: (f64, f64)) {
    touch.is_pinned = true;
    touch.center = center;
}

/// Checks whether a pinned touch's displacement from its pin center has
/// crossed the release threshold; unpins in place if so. The pin is never
/// restored on button release (spec.md §4.6) — only by crossing this
/// threshold.
pub fn maybe_unpin(touch: &mut Pinned, point: (f64, f64), threshold_sq: f64) {
    if !touch.is_pinned {
        return;
    }
    let dx = point.0 - touch.center.0;
    let dy = point.1 - touch.center.1;
    if dx * dx + dy * dy > threshold_sq {
        touch.is_pinned = false;
    }
}
