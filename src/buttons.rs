//! Soft-button area geometry and the per-touch soft-button FSM (spec.md
//! §4.3). The FSM only decides which *area* a touch occupies; aggregating
//! active touches into an actual button press is [`resolve_emission`],
//! called once per frame from [`crate::device`].

use crate::capability::ButtonCode;
use crate::geometry::DeviceGeometry;
use crate::timer::{self, TimerService};
use crate::touch::{ButtonArea, ButtonState, ButtonTouchState};

const TOP_NEW_TIMEOUT_MS: u64 = 100;
const TOP_TO_IGNORE_TIMEOUT_MS: u64 = 300;

/// Geometric extents of the button areas in device units, derived once per
/// device (and recomputed whenever `click_method` changes — see
/// `bottom_area_disabled` below).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonGeometry {
    /// Y coordinate above which the bottom button strip begins.
    pub bottom_top_edge: f64,
    /// X coordinate splitting bottom-left from bottom-right.
    pub bottom_split_x: f64,
    /// Y coordinate below which the top button strip ends (only relevant
    /// when `has_top_buttons`).
    pub top_strip_bottom_edge: f64,
    /// X coordinate splitting top-left from top-middle.
    pub top_split_left_x: f64,
    /// X coordinate splitting top-middle from top-right.
    pub top_split_right_x: f64,
    pub has_top_buttons: bool,
}

impl ButtonGeometry {
    /// Computes button-area extents for a device (spec.md §4.3). When
    /// `bottom_disabled` is true (CLICKFINGER is the active click method)
    /// the bottom edge is pushed past the kernel maximum so no touch ever
    /// lands in it, per spec.md §4.7.
    pub fn compute(geometry: &DeviceGeometry, bottom_disabled: bool, has_top_buttons: bool) -> Self {
        let height = geometry.y.range();
        let width = geometry.x.range();

        let ten_mm = geometry.mm_to_units_y(10.0);
        let pct_85 = height * 0.85;
        let bottom_top_edge = if bottom_disabled {
            height + 1.0
        } else {
            geometry.y.minimum as f64 + pct_85.min(height - ten_mm)
        };

        ButtonGeometry {
            bottom_top_edge,
            bottom_split_x: geometry.x.minimum as f64 + width / 2.0,
            top_strip_bottom_edge: geometry.y.minimum as f64 + ten_mm,
            top_split_left_x: geometry.x.minimum as f64 + width * 0.42,
            top_split_right_x: geometry.x.minimum as f64 + width * 0.58,
            has_top_buttons,
        }
    }
}

/// The events the soft-button FSM can receive in one frame (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    InBottomLeft,
    InBottomRight,
    InTopLeft,
    InTopMiddle,
    InTopRight,
    InArea,
    Up,
    /// A physical button press happened somewhere on the device this frame.
    Press,
    Timeout,
}

/// Classifies a touch's current point into the area-derived event for this
/// frame. Returns `None` for touches not inside any button-relevant area
/// outside of plain motion (i.e. `InArea`, which is itself a valid "no
/// button zone" classification, not an absence of classification).
pub fn classify_area(point: (f64, f64), geometry: &ButtonGeometry) -> ButtonEvent {
    let (x, y) = point;
    if geometry.has_top_buttons && y <= geometry.top_strip_bottom_edge {
        return if x < geometry.top_split_left_x {
            ButtonEvent::InTopLeft
        } else if x < geometry.top_split_right_x {
            ButtonEvent::InTopMiddle
        } else {
            ButtonEvent::InTopRight
        };
    }
    if y >= geometry.bottom_top_edge {
        return if x < geometry.bottom_split_x {
            ButtonEvent::InBottomLeft
        } else {
            ButtonEvent::InBottomRight
        };
    }
    ButtonEvent::InArea
}

fn area_of(event: ButtonEvent) -> Option<ButtonArea> {
    match event {
        ButtonEvent::InBottomLeft => Some(ButtonArea::BottomLeft),
        ButtonEvent::InBottomRight => Some(ButtonArea::BottomRight),
        ButtonEvent::InTopLeft => Some(ButtonArea::TopLeft),
        ButtonEvent::InTopMiddle => Some(ButtonArea::TopMiddle),
        ButtonEvent::InTopRight => Some(ButtonArea::TopRight),
        ButtonEvent::InArea | ButtonEvent::Up | ButtonEvent::Press | ButtonEvent::Timeout => None,
    }
}

fn is_bottom(event: ButtonEvent) -> bool {
    matches!(event, ButtonEvent::InBottomLeft | ButtonEvent::InBottomRight)
}

fn is_top(event: ButtonEvent) -> bool {
    matches!(
        event,
        ButtonEvent::InTopLeft | ButtonEvent::InTopMiddle | ButtonEvent::InTopRight
    )
}

/// Advances one touch's soft-button FSM by one event, per the transition
/// table in spec.md §4.3. Arms/disarms `touch.timer` as needed through the
/// injected [`TimerService`] so the (touch, subsystem) single-outstanding
/// invariant holds.
pub fn advance(touch: &mut ButtonTouchState, event: ButtonEvent, timers: &mut dyn TimerService) {
    use ButtonState::*;

    if event == ButtonEvent::Up {
        timer::disarm(timers, &mut touch.timer);
        touch.state = None;
        touch.curr = None;
        return;
    }

    match touch.state {
        None => {
            if is_bottom(event) {
                touch.state = Bottom;
                touch.curr = area_of(event);
            } else if is_top(event) {
                touch.state = TopNew;
                touch.curr = area_of(event);
                timer::rearm(timers, &mut touch.timer, TOP_NEW_TIMEOUT_MS);
            } else if event == ButtonEvent::InArea {
                touch.state = Area;
            }
        }
        Bottom => {
            if is_top(event) || event == ButtonEvent::InArea {
                touch.state = Area;
                touch.curr = None;
            } else if is_bottom(event) {
                touch.curr = area_of(event);
            }
        }
        Top => {
            if is_bottom(event) || event == ButtonEvent::InArea {
                touch.state = TopToIgnore;
                timer::rearm(timers, &mut touch.timer, TOP_TO_IGNORE_TIMEOUT_MS);
            } else if is_top(event) {
                touch.curr = area_of(event);
            }
        }
        TopNew => {
            if event == ButtonEvent::Press || event == ButtonEvent::Timeout {
                timer::disarm(timers, &mut touch.timer);
                touch.state = Top;
            } else if is_bottom(event) || event == ButtonEvent::InArea {
                timer::disarm(timers, &mut touch.timer);
                touch.state = Area;
                touch.curr = None;
            } else if is_top(event) {
                touch.curr = area_of(event);
            }
        }
        TopToIgnore => {
            if is_top(event) {
                if area_of(event) == touch.curr {
                    timer::disarm(timers, &mut touch.timer);
                    touch.state = Top;
                } else {
                    touch.curr = area_of(event);
                    timer::rearm(timers, &mut touch.timer, TOP_NEW_TIMEOUT_MS);
                    touch.state = TopNew;
                }
            } else if event == ButtonEvent::Timeout {
                touch.state = Ignore;
            }
        }
        // AREA and IGNORE are absorbing until UP: a finger that has become
        // a plain motion finger, or one lingering post top-button, never
        // re-enters button processing this touch-down (spec.md §4.3).
        Area | Ignore => {}
    }
}

/// Which physical button a bottom-area touch represents, for the area
/// bitmask in [`resolve_emission`].
fn bottom_button_bit(area: ButtonArea) -> Option<ButtonCode> {
    match area {
        ButtonArea::BottomLeft => Some(ButtonCode::Left),
        ButtonArea::BottomRight => Some(ButtonCode::Right),
        ButtonArea::TopLeft | ButtonArea::TopMiddle | ButtonArea::TopRight => None,
    }
}

/// Top areas are routed to the paired trackpoint sink rather than resolved
/// into a touchpad button (spec.md §4.3, §6).
pub fn top_button_bit(area: ButtonArea) -> Option<ButtonCode> {
    match area {
        ButtonArea::TopLeft => Some(ButtonCode::Left),
        ButtonArea::TopMiddle => Some(ButtonCode::Middle),
        ButtonArea::TopRight => Some(ButtonCode::Right),
        ButtonArea::BottomLeft | ButtonArea::BottomRight => None,
    }
}

/// Resolves the set of bottom-area touches currently in the `Bottom` state
/// into a single button code, per spec.md §4.3: "Middle is chosen if MIDDLE
/// is set or both LEFT and RIGHT are set; else RIGHT; else LEFT; else LEFT
/// as default." There is no bottom MIDDLE area in this geometry, so MIDDLE
/// only arises via the clickfinger path in [`clickfinger_button`]; this
/// function folds in an externally-supplied `middle` bit so both paths can
/// share one resolution rule.
pub fn resolve_emission(areas: impl IntoIterator<Item = ButtonArea>, middle: bool) -> ButtonCode {
    let mut left = false;
    let mut right = false;
    for area in areas {
        match bottom_button_bit(area) {
            Some(ButtonCode::Left) => left = true,
            Some(ButtonCode::Right) => right = true,
            _ => {}
        }
    }
    if middle || (left && right) {
        ButtonCode::Middle
    } else if right {
        ButtonCode::Right
    } else {
        ButtonCode::Left
    }
}

/// CLICKFINGER click method: the physical button is resolved purely from
/// how many active fingers are down at press time, with no button areas at
/// all (spec.md §4.7).
pub fn clickfinger_button(active_finger_count: usize) -> ButtonCode {
    match active_finger_count {
        0 | 1 => ButtonCode::Left,
        2 => ButtonCode::Right,
        _ => ButtonCode::Middle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AxisInfo;

    struct NullTimers(u64);
    impl TimerService for NullTimers {
        fn now(&self) -> u64 {
            0
        }
        fn schedule(&mut self, _millis: u64) -> crate::timer::TimerHandle {
            self.0 += 1;
            crate::timer::TimerHandle(self.0)
        }
        fn cancel(&mut self, _handle: crate::timer::TimerHandle) {}
    }

    fn geometry() -> DeviceGeometry {
        DeviceGeometry {
            x: AxisInfo { minimum: 0, maximum: 2000, resolution: Some(40.0) },
            y: AxisInfo { minimum: 0, maximum: 1200, resolution: Some(40.0) },
        }
    }

    #[test]
    fn bottom_left_press_then_up() {
        let geom = ButtonGeometry::compute(&geometry(), false, false);
        let mut timers = NullTimers(0);
        let event = classify_area((10.0, 1199.0), &geom);
        assert_eq!(event, ButtonEvent::InBottomLeft);

        let mut touch = ButtonTouchState::default();
        advance(&mut touch, event, &mut timers);
        assert_eq!(touch.state, ButtonState::Bottom);
        assert_eq!(touch.curr, Some(ButtonArea::BottomLeft));

        advance(&mut touch, ButtonEvent::Up, &mut timers);
        assert_eq!(touch.state, ButtonState::None);
        assert!(touch.curr.is_none());
    }

    #[test]
    fn top_new_commits_on_press() {
        let geom = ButtonGeometry::compute(&geometry(), false, true);
        let mut timers = NullTimers(0);
        let event = classify_area((1800.0, 5.0), &geom);
        assert_eq!(event, ButtonEvent::InTopRight);

        let mut touch = ButtonTouchState::default();
        advance(&mut touch, event, &mut timers);
        assert_eq!(touch.state, ButtonState::TopNew);
        assert!(touch.timer.is_some());

        advance(&mut touch, ButtonEvent::Press, &mut timers);
        assert_eq!(touch.state, ButtonState::Top);
        assert!(touch.timer.is_none());
    }

    #[test]
    fn leaving_bottom_becomes_plain_area() {
        let geom = ButtonGeometry::compute(&geometry(), false, false);
        let mut timers = NullTimers(0);
        let mut touch = ButtonTouchState::default();
        advance(&mut touch, classify_area((10.0, 1199.0), &geom), &mut timers);
        assert_eq!(touch.state, ButtonState::Bottom);
        advance(&mut touch, classify_area((1000.0, 500.0), &geom), &mut timers);
        assert_eq!(touch.state, ButtonState::Area);
        assert!(touch.curr.is_none());
    }

    #[test]
    fn both_sides_resolve_to_middle() {
        let code = resolve_emission([ButtonArea::BottomLeft, ButtonArea::BottomRight], false);
        assert_eq!(code, ButtonCode::Middle);
    }

    #[test]
    fn clickfinger_three_fingers_is_middle() {
        assert_eq!(clickfinger_button(3), ButtonCode::Middle);
        assert_eq!(clickfinger_button(2), ButtonCode::Right);
        assert_eq!(clickfinger_button(1), ButtonCode::Left);
    }

    #[test]
    fn bottom_disabled_pushes_edge_off_surface() {
        let geom = ButtonGeometry::compute(&geometry(), true, false);
        assert!(geom.bottom_top_edge > geometry().y.range());
        assert_eq!(classify_area((10.0, 1199.0), &geom), ButtonEvent::InArea);
    }
}
