//! End-to-end scenarios driving `TouchpadDevice` through raw evdev events,
//! the same way `touchpad-replay` does (see `src/cli/main.rs`), but against
//! `test_support::{ManualClock, RecordingSink}` instead of a real capture
//! file and clock.

use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode};

use touchpad_core::capability::{Axis, AxisSource, ButtonCode};
use touchpad_core::config::ScrollMethod;
use touchpad_core::geometry::{AxisInfo, DeviceGeometry, DeviceProperties};
use touchpad_core::sink::SinkEvent;
use touchpad_core::tap::{TapAction, TapDetector, TapEvent};
use touchpad_core::test_support::{ManualClock, RecordingSink};
use touchpad_core::timer::TimerService;
use touchpad_core::TouchpadDevice;

fn geometry() -> DeviceGeometry {
    DeviceGeometry {
        x: AxisInfo { minimum: 0, maximum: 2000, resolution: Some(40.0) },
        y: AxisInfo { minimum: 0, maximum: 1200, resolution: Some(40.0) },
    }
}

fn clickpad_properties() -> DeviceProperties {
    DeviceProperties {
        is_clickpad: true,
        has_top_buttons: false,
        is_semi_mt: false,
        is_apple: false,
        is_clickfinger_model: false,
        has_no_physical_button: false,
        num_slots: 3,
        max_tool_fingers: 3,
        has_distance: false,
        is_bluetooth: false,
        is_virtual: false,
        is_wacom: false,
        shares_serio_bus_with_keyboard: false,
        has_trackpoint_buttons: false,
        trusted_hysteresis: false,
    }
}

fn topbuttonpad_properties() -> DeviceProperties {
    DeviceProperties { has_top_buttons: true, has_trackpoint_buttons: true, ..clickpad_properties() }
}

fn two_finger_properties() -> DeviceProperties {
    DeviceProperties { is_clickpad: false, num_slots: 2, max_tool_fingers: 2, ..clickpad_properties() }
}

fn abs(code: AbsoluteAxisCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, code.0, value)
}

fn key(code: KeyCode, value: i32) -> InputEvent {
    InputEvent::new(EventType::KEY, code.0, value)
}

fn syn() -> InputEvent {
    InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
}

fn slot(n: i32) -> InputEvent {
    abs(AbsoluteAxisCode::ABS_MT_SLOT, n)
}

fn tracking_id(id: i32) -> InputEvent {
    abs(AbsoluteAxisCode::ABS_MT_TRACKING_ID, id)
}

fn pos_x(v: i32) -> InputEvent {
    abs(AbsoluteAxisCode::ABS_MT_POSITION_X, v)
}

fn pos_y(v: i32) -> InputEvent {
    abs(AbsoluteAxisCode::ABS_MT_POSITION_Y, v)
}

fn fire_due(device: &mut TouchpadDevice, clock: &mut ManualClock, sink: &mut RecordingSink, millis: u64) {
    for handle in clock.advance(millis) {
        device.on_timer(handle, clock, sink);
    }
}

/// Scenario 1 (spec.md §8): single-finger tap on a clickpad with tap
/// enabled produces one LEFT press and one LEFT release, released after
/// the tap timeout, and no motion events.
#[test]
fn single_finger_tap_emits_press_then_release_with_no_motion() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    device.set_tap_enabled(true).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    fire_due(&mut device, &mut clock, &mut sink, 180);

    let buttons: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match *e {
            SinkEvent::PointerButton { button, pressed, seat_press_count, .. } => Some((button, pressed, seat_press_count)),
            _ => None,
        })
        .collect();
    assert_eq!(buttons, vec![(ButtonCode::Left, true, 1), (ButtonCode::Left, false, 0)]);

    assert!(!sink
        .events
        .iter()
        .any(|e| matches!(e, SinkEvent::PointerMotion { .. } | SinkEvent::PointerMotionUnaccelerated { .. })));
}

/// Scenario 2 (spec.md §8): two fingers scrolling together produce a run of
/// positive-valued vertical-scroll events, then a single zero-valued
/// terminator once both fingers lift.
#[test]
fn two_finger_scroll_emits_positive_axis_then_zero_stop() {
    let mut device = TouchpadDevice::new(geometry(), two_finger_properties()).unwrap();
    assert_eq!(device.options().scroll.method, ScrollMethod::TwoFinger);
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_DOUBLETAP, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(940), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(slot(1), &mut clock, &mut sink);
    device.dispatch(tracking_id(1), &mut clock, &mut sink);
    device.dispatch(pos_x(1060), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    for step in 1..=5 {
        let y = 600 + step * 40;
        device.dispatch(slot(0), &mut clock, &mut sink);
        device.dispatch(pos_y(y), &mut clock, &mut sink);
        device.dispatch(slot(1), &mut clock, &mut sink);
        device.dispatch(pos_y(y), &mut clock, &mut sink);
        device.dispatch(syn(), &mut clock, &mut sink);
    }

    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(slot(1), &mut clock, &mut sink);
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_DOUBLETAP, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    let axis_events: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match *e {
            SinkEvent::PointerAxis { axis, source, value, .. } => Some((axis, source, value)),
            _ => None,
        })
        .collect();

    assert!(axis_events.len() >= 2, "expected at least one scroll tick plus the terminator");
    let (last_axis, last_source, last_value) = *axis_events.last().unwrap();
    assert_eq!(last_axis, Axis::Vertical);
    assert_eq!(last_source, AxisSource::Finger);
    assert_eq!(last_value, 0.0);
    for &(axis, source, value) in &axis_events[..axis_events.len() - 1] {
        assert_eq!(axis, Axis::Vertical);
        assert_eq!(source, AxisSource::Finger);
        assert!(value > 0.0, "non-terminal scroll tick should be positive, got {value}");
    }

    assert!(!sink
        .events
        .iter()
        .any(|e| matches!(e, SinkEvent::PointerMotion { .. } | SinkEvent::PointerMotionUnaccelerated { .. })));
}

/// Scenario 3 (spec.md §8): a top-right soft-button press on a
/// topbuttonpad with a paired trackpoint routes through
/// `drain_trackpoint_events`, emitting BTN_RIGHT pressed then released on
/// the trackpoint, and nothing on the touchpad's own sink.
#[test]
fn top_button_press_routes_to_trackpoint_as_right_click() {
    let mut device = TouchpadDevice::new(geometry(), topbuttonpad_properties()).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1800), &mut clock, &mut sink);
    device.dispatch(pos_y(60), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(key(KeyCode::BTN_LEFT, 1), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_LEFT, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    let trackpoint = device.drain_trackpoint_events();
    let trackpoint_buttons: Vec<_> = trackpoint
        .iter()
        .filter_map(|e| match *e {
            SinkEvent::PointerButton { button, pressed, .. } => Some((button, pressed)),
            _ => None,
        })
        .collect();
    assert_eq!(trackpoint_buttons, vec![(ButtonCode::Right, true), (ButtonCode::Right, false)]);

    assert!(!sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::PointerButton { .. } | SinkEvent::PointerAxis { .. } | SinkEvent::PointerMotion { .. }
    )));
}

/// Scenario 4 (spec.md §8): a keypress arms disable-while-typing; a touch
/// that begins while it's active and moves produces no pointer motion.
#[test]
fn dwt_suppresses_motion_after_a_keypress() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.notify_keypress(clock.now(), &mut clock);

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    for step in 1..=10 {
        let x = 1000 + step * 2;
        let y = 600 + step * 2;
        device.dispatch(slot(0), &mut clock, &mut sink);
        device.dispatch(pos_x(x), &mut clock, &mut sink);
        device.dispatch(pos_y(y), &mut clock, &mut sink);
        device.dispatch(syn(), &mut clock, &mut sink);
    }

    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    assert!(!sink
        .events
        .iter()
        .any(|e| matches!(e, SinkEvent::PointerMotion { .. } | SinkEvent::PointerMotionUnaccelerated { .. })));
}

/// Scenario 5 (spec.md §8): tap-and-drag with drag-lock enabled keeps the
/// button held across the gap between the drag's release and a new touch
/// landing inside the lock window, only releasing once that window
/// expires with no new touch.
#[test]
fn tap_and_drag_with_drag_lock_survives_the_gap_then_expires() {
    let mut timers = ManualClock::new();
    let mut detector = TapDetector::new();
    let drag_lock = true;

    assert_eq!(detector.advance(TapEvent::Down { count: 1 }, drag_lock, &mut timers), TapAction::None);
    assert_eq!(detector.advance(TapEvent::Move, drag_lock, &mut timers), TapAction::None);
    let action = detector.advance(TapEvent::Move, drag_lock, &mut timers);
    assert_eq!(action, TapAction::Press(ButtonCode::Left));

    let action = detector.advance(TapEvent::Up { count: 0 }, drag_lock, &mut timers);
    assert_eq!(action, TapAction::None, "drag-lock must not release on the first lift");

    let action = detector.advance(TapEvent::Down { count: 1 }, drag_lock, &mut timers);
    assert_eq!(action, TapAction::None);
    let action = detector.advance(TapEvent::Move, drag_lock, &mut timers);
    assert_eq!(action, TapAction::None);

    let action = detector.advance(TapEvent::Up { count: 0 }, drag_lock, &mut timers);
    assert_eq!(action, TapAction::None, "still inside the lock, waiting for expiry");

    let action = detector.advance(TapEvent::Timeout, drag_lock, &mut timers);
    assert_eq!(action, TapAction::Release(ButtonCode::Left));
}

/// Scenario 6 (spec.md §8): three fingers landing in quick succession (one
/// new `SYN_REPORT` per finger, since the shared tap FSM only recognises
/// sequential `Down{count: 1, 2, 3}` events) then lifting together within
/// the tap window produce one MIDDLE press and one MIDDLE release.
#[test]
fn three_finger_tap_emits_middle_press_then_release() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    device.set_tap_enabled(true).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(900), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 0), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_DOUBLETAP, 1), &mut clock, &mut sink);
    device.dispatch(slot(1), &mut clock, &mut sink);
    device.dispatch(tracking_id(1), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(key(KeyCode::BTN_TOOL_DOUBLETAP, 0), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_TRIPLETAP, 1), &mut clock, &mut sink);
    device.dispatch(slot(2), &mut clock, &mut sink);
    device.dispatch(tracking_id(2), &mut clock, &mut sink);
    device.dispatch(pos_x(1100), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(slot(1), &mut clock, &mut sink);
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(slot(2), &mut clock, &mut sink);
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_TRIPLETAP, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    fire_due(&mut device, &mut clock, &mut sink, 200);

    let buttons: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match *e {
            SinkEvent::PointerButton { button, pressed, .. } => Some((button, pressed)),
            _ => None,
        })
        .collect();
    assert_eq!(buttons, vec![(ButtonCode::Middle, true), (ButtonCode::Middle, false)]);
}

/// Law (spec.md §8): calling `set_tap_enabled` twice with the same value
/// is equivalent to calling it once — no toggling, no error on the
/// repeat.
#[test]
fn set_tap_enabled_is_idempotent() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    let first = device.set_tap_enabled(true).unwrap();
    let second = device.set_tap_enabled(true).unwrap();
    assert_eq!(first, second);
    assert!(device.options().tap.enabled);
}

/// Law (spec.md §8): suspending a device releases every held physical
/// button before the next frame, and resuming it lets an entirely fresh
/// tap sequence proceed exactly as it would have with no suspend/resume
/// in between.
#[test]
fn suspend_releases_held_buttons_then_resume_allows_fresh_tap() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    device.set_tap_enabled(true).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_LEFT, 1), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);
    sink.clear();

    device.suspend(clock.now(), &mut clock, &mut sink);
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, SinkEvent::PointerButton { button: ButtonCode::Left, pressed: false, .. })));
    sink.clear();

    device.resume();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);
    fire_due(&mut device, &mut clock, &mut sink, 180);

    let buttons: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match *e {
            SinkEvent::PointerButton { button, pressed, .. } => Some((button, pressed)),
            _ => None,
        })
        .collect();
    assert_eq!(buttons, vec![(ButtonCode::Left, true), (ButtonCode::Left, false)]);
}

/// Law (spec.md §8): a BEGIN touch inside the palm zone that exits
/// horizontally within the 200ms release window is reclassified as a
/// normal touch, and its subsequent motion produces pointer motion
/// events.
#[test]
fn palm_edge_touch_reclassifies_and_then_moves_the_pointer() {
    // `is_apple = true` makes the touch palm-eligible regardless of the
    // panel's physical width (spec.md §4.6: "...plus all Apple devices"),
    // so this scenario actually exercises the edge-palm classify/release
    // path instead of width_mm() falling below the 70mm general threshold.
    let props = DeviceProperties { is_apple: true, ..clickpad_properties() };
    let mut device = TouchpadDevice::new(geometry(), props).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(10), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    assert_eq!(
        device.debug_palm_state(0),
        Some(touchpad_core::touch::PalmState::Edge),
        "touch landing in the outer 5% should start classified as edge-palm"
    );

    for step in 1..=6 {
        let x = 10 + step * 150;
        device.dispatch(slot(0), &mut clock, &mut sink);
        device.dispatch(pos_x(x), &mut clock, &mut sink);
        device.dispatch(pos_y(601), &mut clock, &mut sink);
        device.dispatch(syn(), &mut clock, &mut sink);
    }

    assert_eq!(
        device.debug_palm_state(0),
        Some(touchpad_core::touch::PalmState::None),
        "horizontal exit within the release window should reclassify as normal"
    );
    assert!(sink.events.iter().any(|e| matches!(e, SinkEvent::PointerMotion { .. })));
}

/// spec.md §4.7: enabling `left_handed` swaps LEFT/RIGHT on a clickfinger
/// press, the way the original always routes the resolved button through
/// `evdev_to_left_handed()` before emission.
#[test]
fn left_handed_swaps_clickfinger_press() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    device.set_click_method(touchpad_core::config::ClickMethod::Clickfinger).unwrap();
    device.set_left_handed(true).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    device.dispatch(key(KeyCode::BTN_LEFT, 1), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    let press = sink
        .events
        .iter()
        .find(|e| matches!(e, SinkEvent::PointerButton { pressed: true, .. }))
        .expect("a press should have been emitted");
    assert!(matches!(
        press,
        SinkEvent::PointerButton { button: ButtonCode::Right, .. }
    ));

    device.dispatch(key(KeyCode::BTN_LEFT, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);
    let release = sink
        .events
        .iter()
        .rev()
        .find(|e| matches!(e, SinkEvent::PointerButton { pressed: false, .. }))
        .expect("a release should have been emitted");
    assert!(matches!(
        release,
        SinkEvent::PointerButton { button: ButtonCode::Right, .. }
    ));
}

/// spec.md §4.3: a physical press with no finger down is buffered and must
/// flush as soon as a finger lands, even on a frame that carries no button
/// edge of its own — the bug this guards against returned from
/// `emit_buttons` before ever reaching the flush.
#[test]
fn buffered_press_flushes_when_finger_lands_a_frame_later() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    // Physical press with zero fingers down: buffered, not emitted yet.
    device.dispatch(key(KeyCode::BTN_LEFT, 1), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);
    assert!(!sink.events.iter().any(|e| matches!(e, SinkEvent::PointerButton { .. })));

    // A finger lands on its own frame, with no BTN_LEFT key event in this
    // frame at all.
    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, SinkEvent::PointerButton { pressed: true, .. })));
}

/// spec.md §6: touch down/motion/up are emitted per slot alongside the
/// frame terminator.
#[test]
fn touch_lifecycle_emits_down_motion_up() {
    let mut device = TouchpadDevice::new(geometry(), clickpad_properties()).unwrap();
    let mut clock = ManualClock::new();
    let mut sink = RecordingSink::new();

    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 1), &mut clock, &mut sink);
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(tracking_id(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1000), &mut clock, &mut sink);
    device.dispatch(pos_y(600), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::TouchDown { slot: 0, .. }
    )));

    sink.clear();
    device.dispatch(slot(0), &mut clock, &mut sink);
    device.dispatch(pos_x(1200), &mut clock, &mut sink);
    device.dispatch(pos_y(650), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    assert!(sink.events.iter().any(|e| matches!(
        e,
        SinkEvent::TouchMotion { slot: 0, .. }
    )));

    sink.clear();
    device.dispatch(tracking_id(-1), &mut clock, &mut sink);
    device.dispatch(key(KeyCode::BTN_TOOL_FINGER, 0), &mut clock, &mut sink);
    device.dispatch(syn(), &mut clock, &mut sink);

    assert!(sink.events.iter().any(|e| matches!(e, SinkEvent::TouchUp { slot: 0 })));
}
