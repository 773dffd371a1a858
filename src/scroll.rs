//! Edge scroll and 2-finger scroll (spec.md §4.5).

use crate::capability::{Axis, AxisSource};
use crate::geometry::{DeviceGeometry, MM_TO_DPI_NORMALIZED};
use crate::timer::{self, TimerHandle, TimerService};
use crate::touch::{EdgeMask, EdgeState, ScrollTouchState};

const EDGE_LOCKIN_MS: u64 = 300;
/// 3mm DPI-normalised threshold before an EDGE_NEW touch starts scrolling
/// (spec.md §4.5).
const EDGE_NEW_MOTION_THRESHOLD_MM: f64 = 3.0;

/// Right/bottom edge thresholds as a fraction of width/height. Most devices
/// use the "most" column; Apple and ALPS semi-MT hardware use wider edges
/// (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeGeometry {
    pub right_edge_x: f64,
    pub bottom_edge_y: f64,
}

impl EdgeGeometry {
    pub fn compute(geometry: &DeviceGeometry, is_apple_or_semi_mt: bool) -> Self {
        let (width_frac, height_frac) = if is_apple_or_semi_mt {
            (0.08, 0.1)
        } else {
            (0.04, 0.054)
        };
        EdgeGeometry {
            right_edge_x: geometry.x.maximum as f64 - geometry.x.range() * width_frac,
            bottom_edge_y: geometry.y.maximum as f64 - geometry.y.range() * height_frac,
        }
    }

    pub fn edge_mask_of(&self, point: (f64, f64)) -> EdgeMask {
        let mut mask = EdgeMask::EMPTY;
        if point.0 >= self.right_edge_x {
            mask.insert(EdgeMask::RIGHT);
        }
        if point.1 >= self.bottom_edge_y {
            mask.insert(EdgeMask::BOTTOM);
        }
        mask
    }
}

/// Events driving the per-touch edge-scroll FSM (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEvent {
    Touch,
    Motion,
    Release,
    Timeout,
    /// A `SYN_REPORT` arrived while a timer had already posted a
    /// lock-in — the original's `POSTED` event, modelled as the frame
    /// boundary observing an already-elapsed timer.
    Posted,
}

/// Advances a touch's edge-scroll FSM by one frame event. `button_areas`
/// reflects whether `click_method == BUTTON_AREAS` (lock-in is skipped so
/// the finger stays available for button-area decisions, per spec.md
/// §4.5). `current_mask`/`initial` let the transition pick or confirm an
/// axis.
pub fn advance(
    touch: &mut ScrollTouchState,
    event: EdgeEvent,
    current_mask: EdgeMask,
    point: (f64, f64),
    button_areas: bool,
    timers: &mut dyn TimerService,
) {
    use EdgeState::*;

    match (touch.state, event) {
        (None, EdgeEvent::Touch) => {
            if current_mask.is_empty() {
                return;
            }
            touch.edge = current_mask;
            touch.initial = point;
            touch.direction = axis_from_mask(current_mask);
            if button_areas {
                // Fingers must stay available for button-area decisions;
                // no lock-in timer while BUTTON_AREAS is the click method.
                touch.state = EdgeNew;
            } else {
                touch.state = EdgeNew;
                timer::rearm(timers, &mut touch.timer, EDGE_LOCKIN_MS);
            }
        }
        (EdgeNew, EdgeEvent::Motion) => {
            if !current_mask.contains(touch.edge) {
                timer::disarm(timers, &mut touch.timer);
                touch.state = Area;
                touch.direction = None;
            } else if touch.edge.contains(EdgeMask::RIGHT) && touch.edge.contains(EdgeMask::BOTTOM) {
                // Started in the corner: the first motion escaping one edge
                // picks the axis, then locks it in.
                if touch.direction.is_none() {
                    if !current_mask.contains(EdgeMask::BOTTOM) {
                        touch.direction = Some(Axis::Horizontal);
                    } else if !current_mask.contains(EdgeMask::RIGHT) {
                        touch.direction = Some(Axis::Vertical);
                    }
                }
            }
        }
        (EdgeNew, EdgeEvent::Timeout) | (EdgeNew, EdgeEvent::Posted) => {
            timer::disarm(timers, &mut touch.timer);
            touch.state = Edge;
        }
        (EdgeNew, EdgeEvent::Release) | (Edge, EdgeEvent::Release) => {
            timer::disarm(timers, &mut touch.timer);
            touch.state = None;
            touch.direction = None;
        }
        (Edge, EdgeEvent::Motion) => {
            if touch.edge.contains(EdgeMask::RIGHT) && touch.edge.contains(EdgeMask::BOTTOM) {
                if touch.direction.is_none() {
                    if !current_mask.contains(EdgeMask::BOTTOM) {
                        touch.direction = Some(Axis::Horizontal);
                    } else if !current_mask.contains(EdgeMask::RIGHT) {
                        touch.direction = Some(Axis::Vertical);
                    }
                }
            }
        }
        (Area, EdgeEvent::Release) => {
            touch.state = None;
        }
        _ => {}
    }
}

fn axis_from_mask(mask: EdgeMask) -> Option<Axis> {
    if mask.contains(EdgeMask::RIGHT) && !mask.contains(EdgeMask::BOTTOM) {
        Some(Axis::Vertical)
    } else if mask.contains(EdgeMask::BOTTOM) && !mask.contains(EdgeMask::RIGHT) {
        Some(Axis::Horizontal)
    } else {
        // Corner: axis undetermined until the first escaping motion.
        None
    }
}

/// Whether an `EDGE_NEW` touch has crossed the 3mm DPI-normalised
/// threshold from its initial point and may start emitting scroll deltas
/// (spec.md §4.5).
pub fn past_lockin_threshold(initial: (f64, f64), current: (f64, f64), geometry: &DeviceGeometry) -> bool {
    let dx = (current.0 - initial.0) * geometry.accel_scale_x();
    let dy = (current.1 - initial.1) * geometry.accel_scale_y();
    let threshold = EDGE_NEW_MOTION_THRESHOLD_MM * MM_TO_DPI_NORMALIZED;
    (dx * dx + dy * dy).sqrt() >= threshold
}

/// A scroll axis event ready for emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEmission {
    pub axis: Axis,
    pub value: f64,
    pub source: AxisSource,
}

/// Builds the zero-valued stop event emitted when a scroll sequence ends
/// (transition to NONE or AREA, or finger count dropping below 2 for
/// 2-finger scroll), per spec.md §4.5.
pub fn stop_event(axis: Axis) -> ScrollEmission {
    ScrollEmission { axis, value: 0.0, source: AxisSource::Finger }
}

/// 2-finger scroll gate (spec.md §4.5): exactly two active non-palm
/// touches, `click_method != CLICKFINGER`, and no tap-and-drag pending.
pub fn two_finger_scroll_active(active_non_palm: usize, clickfinger: bool, drag_pending: bool) -> bool {
    active_non_palm == 2 && !clickfinger && !drag_pending
}

/// Chooses the dominant axis for a combined 2-finger delta: whichever axis
/// has the larger magnitude wins for that frame (the original always
/// reports one axis per frame, never diagonal scroll).
pub fn dominant_axis(dx: f64, dy: f64) -> (Axis, f64) {
    if dy.abs() >= dx.abs() {
        (Axis::Vertical, dy)
    } else {
        (Axis::Horizontal, dx)
    }
}

/// `scroll.method = BUTTON_DOWN` (spec.md §F.4): 2-finger deltas only flow
/// while a held middle button gates them, rather than by finger count.
pub fn button_down_scroll_active(middle_button_held: bool, active_non_palm: usize) -> bool {
    middle_button_held && active_non_palm >= 1
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
        fn schedule(&mut self, _millis: u64) -> TimerHandle {
            self.0 += 1;
            TimerHandle(self.0)
        }
        fn cancel(&mut self, _handle: TimerHandle) {}
    }

    fn geometry() -> DeviceGeometry {
        DeviceGeometry {
            x: AxisInfo { minimum: 0, maximum: 2000, resolution: Some(40.0) },
            y: AxisInfo { minimum: 0, maximum: 1200, resolution: Some(40.0) },
        }
    }

    #[test]
    fn right_edge_touch_locks_in_vertical() {
        let geom = geometry();
        let edges = EdgeGeometry::compute(&geom, false);
        let mut timers = NullTimers(0);
        let mut touch = ScrollTouchState::default();
        let point = (1990.0, 500.0);
        let mask = edges.edge_mask_of(point);
        advance(&mut touch, EdgeEvent::Touch, mask, point, false, &mut timers);
        assert_eq!(touch.state, EdgeState::EdgeNew);
        assert_eq!(touch.direction, Some(Axis::Vertical));

        advance(&mut touch, EdgeEvent::Timeout, mask, point, false, &mut timers);
        assert_eq!(touch.state, EdgeState::Edge);
    }

    #[test]
    fn motion_leaving_edge_becomes_area() {
        let geom = geometry();
        let edges = EdgeGeometry::compute(&geom, false);
        let mut timers = NullTimers(0);
        let mut touch = ScrollTouchState::default();
        let point = (1990.0, 500.0);
        advance(&mut touch, EdgeEvent::Touch, edges.edge_mask_of(point), point, false, &mut timers);

        let moved = (1000.0, 500.0);
        advance(&mut touch, EdgeEvent::Motion, edges.edge_mask_of(moved), moved, false, &mut timers);
        assert_eq!(touch.state, EdgeState::Area);
    }

    #[test]
    fn button_areas_click_method_skips_lockin_timer() {
        let geom = geometry();
        let edges = EdgeGeometry::compute(&geom, false);
        let mut timers = NullTimers(0);
        let mut touch = ScrollTouchState::default();
        let point = (1990.0, 500.0);
        advance(&mut touch, EdgeEvent::Touch, edges.edge_mask_of(point), point, true, &mut timers);
        assert_eq!(touch.state, EdgeState::EdgeNew);
        assert!(touch.timer.is_none());
    }

    #[test]
    fn corner_touch_locks_axis_on_first_escape_and_keeps_it() {
        let geom = geometry();
        let edges = EdgeGeometry::compute(&geom, false);
        let mut timers = NullTimers(0);
        let mut touch = ScrollTouchState::default();
        // Bottom-right corner: both masks set.
        let corner = (1990.0, 1190.0);
        advance(&mut touch, EdgeEvent::Touch, edges.edge_mask_of(corner), corner, false, &mut timers);
        assert_eq!(touch.state, EdgeState::EdgeNew);
        assert_eq!(touch.direction, None);

        // Escaping BOTTOM only (still on RIGHT) should lock the axis to
        // horizontal, the way the original resolves a corner start.
        let escaping_bottom = (1990.0, 500.0);
        advance(&mut touch, EdgeEvent::Motion, edges.edge_mask_of(escaping_bottom), escaping_bottom, false, &mut timers);
        assert_eq!(touch.direction, Some(Axis::Horizontal));

        // A further motion that would naively re-resolve to vertical (still
        // on RIGHT+BOTTOM's original mask) must not flip the already-locked
        // axis.
        advance(&mut touch, EdgeEvent::Motion, edges.edge_mask_of(corner), corner, false, &mut timers);
        assert_eq!(touch.direction, Some(Axis::Horizontal));
    }

    #[test]
    fn two_finger_gate_requires_exactly_two_and_no_clickfinger() {
        assert!(two_finger_scroll_active(2, false, false));
        assert!(!two_finger_scroll_active(3, false, false));
        assert!(!two_finger_scroll_active(2, true, false));
        assert!(!two_finger_scroll_active(2, false, true));
    }

    #[test]
    fn dominant_axis_picks_larger_magnitude() {
        assert_eq!(dominant_axis(1.0, 5.0), (Axis::Vertical, 5.0));
        assert_eq!(dominant_axis(5.0, 1.0), (Axis::Horizontal, 5.0));
    }
}
