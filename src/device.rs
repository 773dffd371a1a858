//! `TouchpadDevice`: owns one touchpad's full FSM state and ties the
//! ingress, motion, button, tap, scroll, and palm modules together into the
//! per-frame pipeline described in spec.md §2.

use evdev::{EventSummary, InputEvent, KeyCode};
use log::{debug, trace, warn};

use crate::buttons::{self, ButtonEvent, ButtonGeometry};
use crate::capability::{Axis, AxisSource, ButtonCode};
use crate::config::{ClickMethod, Options, ScrollMethod};
use crate::error::DeviceInitError;
use crate::filter::AccelerationFilter;
use crate::geometry::{DeviceGeometry, DeviceProperties};
use crate::ingress::{IngestOutcome, Ingress};
use crate::motion;
use crate::palm::{self, DwtTimer, PalmGeometry};
use crate::scroll::{self, EdgeEvent, EdgeGeometry};
use crate::sink::{EventSink, SinkEvent};
use crate::tap::{TapAction, TapDetector, TapEvent};
use crate::timer::{TimerHandle, TimerService};
use crate::touch::{ButtonState, EdgeState, Lifecycle, PalmState, TapTouchState, Touch};

const MAX_SLOTS: usize = 16;
/// Kernel-resolution-derived pin-release threshold numerator (spec.md
/// §4.6), mirroring the accel scale's device-unit derivation.
const PIN_RELEASE_THRESHOLD_MM: f64 = 4.0;

#[derive(Debug, Default, Clone, Copy)]
struct QueuedEvents {
    motion: bool,
    button_press: bool,
    button_release: bool,
}

/// Which subsystem a slot's currently-scrolling axis belongs to, so the
/// stop event can be attributed correctly when a sequence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollSource {
    Edge,
    TwoFinger,
    /// `scroll.method = BUTTON_DOWN` (spec.md §F.4): finger deltas gated by
    /// a held middle button instead of finger count.
    ButtonDown,
}

/// One fully assembled touchpad device: geometry, options, and every FSM's
/// run-time state. The device never touches a file descriptor or a
/// compositor connection directly; it is driven by `dispatch`/`on_timer`
/// and emits through an injected [`EventSink`], consistent with spec.md §1
/// treating both as external collaborators.
pub struct TouchpadDevice {
    geometry: DeviceGeometry,
    properties: DeviceProperties,
    options: Options,

    touches: Vec<Touch>,
    ingress: Ingress,
    queued: QueuedEvents,
    prev_fake_count: Option<u32>,

    tap: TapDetector,
    accel_pointer: AccelerationFilter,
    accel_scroll: AccelerationFilter,

    button_geometry: ButtonGeometry,
    edge_geometry: EdgeGeometry,
    palm_geometry: PalmGeometry,
    dwt: DwtTimer,

    buttons_state: u8,
    buttons_old_state: u8,
    click_pending: bool,
    press_button_at_press: Option<ButtonCode>,

    scroll_active: Option<(ScrollSource, Axis)>,
    trackpoint_active: bool,
    suspended: bool,

    trackpoint_events: Vec<SinkEvent>,
}

const BTN_LEFT_BIT: u8 = 1 << 0;
const BTN_RIGHT_BIT: u8 = 1 << 1;
const BTN_MIDDLE_BIT: u8 = 1 << 2;

fn bit_for(code: ButtonCode) -> u8 {
    match code {
        ButtonCode::Left => BTN_LEFT_BIT,
        ButtonCode::Right => BTN_RIGHT_BIT,
        ButtonCode::Middle => BTN_MIDDLE_BIT,
    }
}

impl TouchpadDevice {
    pub fn new(geometry: DeviceGeometry, properties: DeviceProperties) -> Result<Self, DeviceInitError> {
        let width = geometry.x.range();
        let height = geometry.y.range();
        if width <= 0.0 || height <= 0.0 {
            return Err(DeviceInitError::DegenerateGeometry {
                width: width as u32,
                height: height as u32,
            });
        }
        let slots = properties.effective_slots();
        if slots > MAX_SLOTS {
            return Err(DeviceInitError::TooManySlots(slots));
        }

        let options = Options::defaults_for(&properties);
        let button_geometry = ButtonGeometry::compute(
            &geometry,
            options.bottom_area_disabled(),
            properties.has_top_buttons,
        );
        let edge_geometry = EdgeGeometry::compute(&geometry, properties.is_apple || properties.is_semi_mt);
        let palm_geometry = PalmGeometry::compute(&geometry);

        Ok(TouchpadDevice {
            geometry,
            properties,
            options,
            touches: vec![Touch::default(); slots.max(1)],
            ingress: Ingress::new(slots == 0),
            queued: QueuedEvents::default(),
            prev_fake_count: None,
            tap: TapDetector::new(),
            accel_pointer: AccelerationFilter::new(),
            accel_scroll: AccelerationFilter::new(),
            button_geometry,
            edge_geometry,
            palm_geometry,
            dwt: DwtTimer::default(),
            buttons_state: 0,
            buttons_old_state: 0,
            click_pending: false,
            press_button_at_press: None,
            scroll_active: None,
            trackpoint_active: false,
            suspended: false,
            trackpoint_events: Vec::new(),
        })
    }

    /// Drains button events routed to the paired trackpoint device rather
    /// than the touchpad itself (top soft buttons on a topbuttonpad,
    /// spec.md §4.3, §6). The host is responsible for forwarding these to
    /// the actual trackpoint sink; `touchpad_core` only classifies them.
    pub fn drain_trackpoint_events(&mut self) -> Vec<SinkEvent> {
        std::mem::take(&mut self.trackpoint_events)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    /// Re-derives geometry that depends on the current `click_method`
    /// (spec.md §4.7: "Switching click_method dynamically retunes the
    /// bottom-button top edge"). Call after any `Options::set_click_method`.
    pub fn retune_button_geometry(&mut self) {
        self.button_geometry = ButtonGeometry::compute(
            &self.geometry,
            self.options.bottom_area_disabled(),
            self.properties.has_top_buttons,
        );
    }

    fn physical_button_held(&self) -> bool {
        self.buttons_state != 0
    }

    /// Applies a configuration change and keeps derived geometry in sync.
    /// Returns whatever `f` returns.
    pub fn set_click_method(&mut self, method: ClickMethod) -> Result<(), crate::error::ConfigError> {
        let props = self.properties.clone();
        self.options.set_click_method(method, &props)?;
        self.retune_button_geometry();
        Ok(())
    }

    pub fn set_left_handed(&mut self, enabled: bool) -> Result<(), crate::error::ConfigError> {
        self.options.set_left_handed(enabled, self.physical_button_held())
    }

    pub fn set_tap_enabled(&mut self, enabled: bool) -> Result<bool, crate::error::ConfigError> {
        self.options.set_tap_enabled(enabled)
    }

    pub fn set_drag_lock(&mut self, enabled: bool) -> Result<bool, crate::error::ConfigError> {
        self.options.set_drag_lock(enabled)
    }

    pub fn set_scroll_method(&mut self, method: crate::config::ScrollMethod) -> Result<(), crate::error::ConfigError> {
        let props = self.properties.clone();
        self.options.set_scroll_method(method, &props)
    }

    pub fn set_natural_scroll(&mut self, enabled: bool) -> Result<bool, crate::error::ConfigError> {
        self.options.set_natural_scroll(enabled)
    }

    pub fn set_send_events(&mut self, mode: crate::config::SendEventsMode) -> Result<(), crate::error::ConfigError> {
        self.options.set_send_events(mode)
    }

    /// Processes one already-decoded kernel event. On a `SYN_REPORT` frame
    /// boundary this runs the full per-frame pipeline and emits events to
    /// `sink` in the phase order from spec.md §2.
    pub fn dispatch(&mut self, event: InputEvent, timers: &mut dyn TimerService, sink: &mut dyn EventSink) {
        if self.suspended || self.options.send_events == crate::config::SendEventsMode::Disabled {
            return;
        }

        if let EventSummary::Key(_, code, value) = event.destructure() {
            if matches!(code, KeyCode::BTN_LEFT | KeyCode::BTN_RIGHT | KeyCode::BTN_MIDDLE) {
                self.on_physical_button(code, value != 0, timers.now());
                return;
            }
        }

        let millis = timers.now();
        trace!("dispatch: {:?}", event);
        match self.ingress.ingest(event, &mut self.touches, millis) {
            IngestOutcome::None => {}
            IngestOutcome::Touched(_slot) => {
                self.queued.motion = true;
            }
            IngestOutcome::FrameComplete => {
                self.process_frame(millis, timers, sink);
            }
        }
    }

    fn on_physical_button(&mut self, code: KeyCode, pressed: bool, _millis: u64) {
        if self.properties.is_clickpad && code != KeyCode::BTN_LEFT {
            warn!(target: "bug-kernel", "clickpad reported non-BTN_LEFT physical button {:?}", code);
            return;
        }
        let bit = match code {
            KeyCode::BTN_LEFT => BTN_LEFT_BIT,
            KeyCode::BTN_RIGHT => BTN_RIGHT_BIT,
            KeyCode::BTN_MIDDLE => BTN_MIDDLE_BIT,
            _ => return,
        };
        self.buttons_old_state = self.buttons_state;
        if pressed {
            self.buttons_state |= bit;
            self.queued.button_press = true;
            // Pin every currently-down touch (spec.md §4.6).
            for touch in self.touches.iter_mut().filter(|t| t.is_down()) {
                palm::pin(&mut touch.pinned, touch.point);
            }
        } else {
            self.buttons_state &= !bit;
            self.queued.button_release = true;
        }
    }

    /// Notifies the core of a non-ignored keypress, arming/extending the
    /// DWT suppression window (spec.md §4.6). `timers` schedules the
    /// timeout; the host calls `on_timer` when it fires.
    pub fn notify_keypress(&mut self, now: u64, timers: &mut dyn TimerService) {
        if !self.properties.should_pair_dwt() {
            return;
        }
        self.dwt.on_keypress(now, timers);
    }

    pub fn notify_trackpoint_active(&mut self, active: bool, timers: &mut dyn TimerService) {
        self.trackpoint_active = active;
        if active {
            self.tap.suspend(timers);
        } else if !self.dwt.active {
            self.tap.resume();
        }
    }

    /// Delivers an expired timer to its owner. The core has no global idea
    /// which subsystem owns a handle, so this probes each one; a handle
    /// only ever matches the subsystem that scheduled it since handles are
    /// unique per `TimerService` instance.
    pub fn on_timer(&mut self, handle: TimerHandle, timers: &mut dyn TimerService, sink: &mut dyn EventSink) {
        let millis = timers.now();

        if self.dwt.active {
            // A single outstanding DWT timer; any fired handle we don't
            // recognise elsewhere is assumed to be this one if DWT is on.
            self.dwt.on_timeout();
            for touch in self.touches.iter_mut() {
                if touch.palm.state == PalmState::Typing
                    && palm::dwt_reactivate_on_timeout(touch.millis, self.dwt.last_keypress)
                {
                    touch.palm.state = PalmState::None;
                }
            }
            if !self.trackpoint_active {
                self.tap.resume();
            }
            return;
        }

        for touch in self.touches.iter_mut() {
            if touch.button.timer == Some(handle) {
                touch.button.timer = None;
                buttons::advance(&mut touch.button, ButtonEvent::Timeout, timers);
                return;
            }
            if touch.scroll.timer == Some(handle) {
                touch.scroll.timer = None;
                let mask = self.edge_geometry.edge_mask_of(touch.point);
                scroll::advance(
                    &mut touch.scroll,
                    EdgeEvent::Timeout,
                    mask,
                    touch.point,
                    self.options.click_method == ClickMethod::ButtonAreas,
                    timers,
                );
                if touch.scroll.state == EdgeState::Edge {
                    self.scroll_active = Some((ScrollSource::Edge, touch.scroll.direction.unwrap_or(Axis::Vertical)));
                }
                return;
            }
        }

        let drag_lock = self.options.tap.drag_lock;
        let action = self.tap.advance(TapEvent::Timeout, drag_lock, timers);
        self.apply_tap_action(action, millis, sink);
    }

    fn apply_tap_action(&mut self, action: TapAction, millis: u64, sink: &mut dyn EventSink) {
        match action {
            TapAction::None => {}
            TapAction::Press(button) => {
                sink.handle(SinkEvent::PointerButton {
                    millis,
                    button,
                    pressed: true,
                    seat_press_count: self.seat_press_count() + 1,
                });
            }
            TapAction::Release(button) => {
                sink.handle(SinkEvent::PointerButton {
                    millis,
                    button,
                    pressed: false,
                    seat_press_count: self.seat_press_count().saturating_sub(1),
                });
            }
        }
    }

    fn seat_press_count(&self) -> u32 {
        self.buttons_state.count_ones()
    }

    fn nfingers_down(&self) -> usize {
        self.touches.iter().filter(|t| t.is_down()).count()
    }

    /// Runs the full per-frame pipeline (spec.md §2) and emits the
    /// resulting events to `sink` in strict phase order.
    fn process_frame(&mut self, millis: u64, timers: &mut dyn TimerService, sink: &mut dyn EventSink) {
        self.reconcile_fake_fingers(millis);
        self.reconcile_hover(millis);

        let fake_count = self.ingress.fake_touches.finger_count();
        if fake_count != self.prev_fake_count {
            // Open question (b): reset every touch's history on any frame
            // where the fake-finger count changes.
            for touch in self.touches.iter_mut() {
                touch.history.reset();
            }
        }
        self.prev_fake_count = fake_count;

        if fake_count.is_none() {
            self.tap.force_dead(timers);
        }

        self.update_palm_and_motion(millis);
        self.advance_button_fsms(timers);
        self.advance_scroll_fsms(timers);
        let tap_actions = self.advance_tap_fsm(timers);

        // Emission phase order (spec.md §2): tap-derived buttons ->
        // physical/soft buttons -> edge-scroll axes -> 2-finger scroll/motion.
        for action in tap_actions {
            self.apply_tap_action(action, millis, sink);
        }
        self.emit_buttons(millis, sink);
        self.emit_edge_scroll(millis, sink);
        self.emit_motion_and_two_finger_scroll(millis, timers, sink);

        self.emit_touch_events(millis, sink);
        sink.handle(SinkEvent::TouchFrame { millis });
        self.advance_lifecycles();
        self.queued = QueuedEvents::default();
        self.buttons_old_state = self.buttons_state;
    }

    /// Per-touch down/motion/up (spec.md §6), emitted in slot order ahead of
    /// the frame's `TouchFrame` terminator.
    fn emit_touch_events(&mut self, millis: u64, sink: &mut dyn EventSink) {
        for (slot, touch) in self.touches.iter().enumerate() {
            let slot = slot as u8;
            let (x, y) = touch.point;
            match touch.lifecycle {
                Lifecycle::Begin => sink.handle(SinkEvent::TouchDown { millis, slot, x, y }),
                Lifecycle::Update if touch.dirty => {
                    sink.handle(SinkEvent::TouchMotion { millis, slot, x, y })
                }
                Lifecycle::End => sink.handle(SinkEvent::TouchUp { millis, slot }),
                _ => {}
            }
        }
    }

    fn reconcile_fake_fingers(&mut self, millis: u64) {
        let target = match self.ingress.fake_touches.finger_count() {
            Some(count) => count as usize,
            None => return, // overflow: leave existing slots alone
        };
        let touching = self.ingress.fake_touches.is_touching();
        let current = self.nfingers_down();

        if touching && current < target {
            for touch in self.touches.iter_mut() {
                if current >= target {
                    break;
                }
                if touch.lifecycle == Lifecycle::Hovering {
                    touch.lifecycle = Lifecycle::Begin;
                    touch.dirty = true;
                    touch.millis = millis;
                }
            }
        } else if !touching || current > target {
            for touch in self.touches.iter_mut().rev() {
                if self.nfingers_down() <= target {
                    break;
                }
                if touch.is_down() {
                    touch.has_ended = true;
                    touch.lifecycle = Lifecycle::End;
                    touch.dirty = true;
                }
            }
        }
    }

    /// Distance-based hover reconciliation is unavailable without
    /// `ABS_MT_DISTANCE` decoding in this ingress, so this only promotes
    /// freshly-created touches that already carry position data, per
    /// spec.md §4.1's fallback path.
    fn reconcile_hover(&mut self, _millis: u64) {
        for touch in self.touches.iter_mut() {
            if touch.lifecycle == Lifecycle::Hovering && self.properties.has_distance {
                touch.lifecycle = Lifecycle::Begin;
            }
        }
    }

    fn update_palm_and_motion(&mut self, millis: u64) {
        let palm_eligible = self.properties.palm_detection_eligible(&self.geometry);
        let margin = self.geometry.hysteresis_margin(self.properties.trusted_hysteresis);
        let thumb_zone_y = self.geometry.y.minimum as f64 + self.geometry.y.range() * 0.8;
        let total_down = self.touches.iter().filter(|t| t.is_down()).count();

        for touch in self.touches.iter_mut() {
            if touch.lifecycle == Lifecycle::Begin && touch.palm.state == PalmState::None {
                let in_button_area = touch.button.state != ButtonState::None;
                touch.palm = palm::classify_begin(
                    touch.point,
                    millis,
                    &self.palm_geometry,
                    palm_eligible,
                    in_button_area,
                );
                if palm::is_palm_tap(touch.point, &self.palm_geometry, palm_eligible, in_button_area) {
                    touch.tap.state = TapTouchState::Dead;
                }
                if self.dwt.active {
                    touch.palm.state = PalmState::Typing;
                }
                // Arrives alongside another finger already down, low on the
                // pad: tagged a thumb and excluded from the tap finger count
                // (spec.md §F.2) rather than fed into the shared FSM.
                touch.tap.is_thumb = total_down > 1 && touch.point.1 >= thumb_zone_y;
            }

            if touch.palm.state == PalmState::Edge {
                palm::maybe_release_edge_palm(&mut touch.palm, touch.point, millis, &self.palm_geometry);
            }

            if touch.dirty && touch.is_down() {
                motion::filter_and_push(touch, touch.point, margin);
            }

            if touch.pinned.is_pinned {
                let threshold_sq = self.geometry.mm_to_units_x(PIN_RELEASE_THRESHOLD_MM).powi(2);
                palm::maybe_unpin(&mut touch.pinned, touch.point, threshold_sq);
            }
        }
    }

    fn advance_button_fsms(&mut self, timers: &mut dyn TimerService) {
        if self.properties.has_no_physical_button || !self.properties.is_clickpad {
            return;
        }
        for touch in self.touches.iter_mut() {
            if !touch.is_down() {
                if touch.button.state != ButtonState::None {
                    buttons::advance(&mut touch.button, ButtonEvent::Up, timers);
                }
                continue;
            }
            let event = buttons::classify_area(touch.point, &self.button_geometry);
            buttons::advance(&mut touch.button, event, timers);
        }

        if self.queued.button_press && self.buttons_state & BTN_LEFT_BIT != 0 {
            for touch in self.touches.iter_mut() {
                if touch.button.state == ButtonState::TopNew {
                    buttons::advance(&mut touch.button, ButtonEvent::Press, timers);
                }
            }
        }
    }

    fn advance_scroll_fsms(&mut self, timers: &mut dyn TimerService) {
        if self.options.scroll.method != ScrollMethod::Edge {
            return;
        }
        let button_areas = self.options.click_method == ClickMethod::ButtonAreas;
        for touch in self.touches.iter_mut() {
            let mask = self.edge_geometry.edge_mask_of(touch.point);
            let event = if !touch.is_down() {
                EdgeEvent::Release
            } else if touch.scroll.state == EdgeState::None {
                EdgeEvent::Touch
            } else {
                EdgeEvent::Motion
            };
            scroll::advance(&mut touch.scroll, event, mask, touch.point, button_areas, timers);
        }
    }

    fn advance_tap_fsm(&mut self, timers: &mut dyn TimerService) -> Vec<TapAction> {
        if !self.options.tap.enabled {
            return Vec::new();
        }
        let mut actions = Vec::new();
        let drag_lock = self.options.tap.drag_lock;
        let threshold = self.geometry.diagonal() / 100.0;

        for i in 0..self.touches.len() {
            let touch = &self.touches[i];
            if touch.palm.state != PalmState::None || touch.tap.state == TapTouchState::Dead || touch.tap.is_thumb {
                continue;
            }
            if touch.lifecycle == Lifecycle::Begin && touch.tap.state == TapTouchState::Idle {
                self.touches[i].tap.state = TapTouchState::Touch;
                self.touches[i].tap.initial = touch.point;
                let count = self.active_tap_touch_count();
                actions.push(self.tap.advance(TapEvent::Down { count }, drag_lock, timers));
            } else if touch.lifecycle == Lifecycle::End && touch.tap.state == TapTouchState::Touch {
                self.touches[i].tap.state = TapTouchState::Idle;
                let count = self.active_tap_touch_count();
                actions.push(self.tap.advance(TapEvent::Up { count }, drag_lock, timers));
            } else if touch.tap.state == TapTouchState::Touch
                && crate::tap::exceeds_motion_threshold(touch.tap.initial, touch.point, threshold)
            {
                actions.push(self.tap.advance(TapEvent::Move, drag_lock, timers));
            }
        }
        actions
    }

    fn active_tap_touch_count(&self) -> usize {
        self.touches
            .iter()
            .filter(|t| {
                t.is_down() && t.palm.state == PalmState::None && t.tap.state != TapTouchState::Dead && !t.tap.is_thumb
            })
            .count()
    }

    fn emit_buttons(&mut self, millis: u64, sink: &mut dyn EventSink) {
        if !self.properties.is_clickpad {
            if self.buttons_state != self.buttons_old_state {
                self.emit_button_diff(millis, sink);
            }
            return;
        }

        // Top-button presses are routed to the paired trackpoint sink
        // rather than the touchpad device (spec.md §4.3, §6): once any
        // touch has committed to the Top state, a physical press/release
        // this frame is queued for the trackpoint instead of resolved into
        // a touchpad button.
        if let Some(area) = self
            .touches
            .iter()
            .find(|t| t.is_down() && t.button.state == ButtonState::Top)
            .and_then(|t| t.button.curr)
        {
            if let Some(code) = buttons::top_button_bit(area) {
                let code = self.remap_left_handed(code);
                let pressed_now = self.buttons_state & BTN_LEFT_BIT != 0;
                let was_pressed = self.buttons_old_state & BTN_LEFT_BIT != 0;
                if self.queued.button_press && pressed_now && !was_pressed {
                    self.trackpoint_events.push(SinkEvent::PointerButton {
                        millis,
                        button: code,
                        pressed: true,
                        seat_press_count: 1,
                    });
                } else if self.queued.button_release && !pressed_now && was_pressed {
                    self.trackpoint_events.push(SinkEvent::PointerButton {
                        millis,
                        button: code,
                        pressed: false,
                        seat_press_count: 0,
                    });
                }
            }
            return;
        }

        // A press buffered on an earlier frame (no touch was down yet, spec.md
        // §4.3) flushes as soon as a finger lands, even on a frame that has no
        // button edge of its own — this must run before the no-queued-edge
        // early return below, or a later, button-quiet frame would never
        // reach it.
        if self.click_pending && self.nfingers_down() > 0 {
            self.click_pending = false;
            let button = self.press_button_at_press.unwrap_or(ButtonCode::Left);
            self.press_button_at_press = Some(button);
            sink.handle(SinkEvent::PointerButton {
                millis,
                button,
                pressed: true,
                seat_press_count: 1,
            });
        }

        if !self.queued.button_press && !self.queued.button_release {
            return;
        }

        let pressed_now = self.buttons_state & BTN_LEFT_BIT != 0;
        let was_pressed = self.buttons_old_state & BTN_LEFT_BIT != 0;

        if pressed_now && !was_pressed {
            let button = if self.options.click_method == ClickMethod::Clickfinger {
                buttons::clickfinger_button(self.nfingers_down())
            } else {
                let areas = self.touches.iter().filter_map(|t| {
                    if t.is_down() && t.button.state == ButtonState::Bottom {
                        t.button.curr
                    } else {
                        None
                    }
                });
                buttons::resolve_emission(areas, false)
            };
            let button = self.remap_left_handed(button);
            if self.nfingers_down() == 0 {
                self.click_pending = true;
                self.press_button_at_press = Some(button);
            } else {
                self.press_button_at_press = Some(button);
                sink.handle(SinkEvent::PointerButton {
                    millis,
                    button,
                    pressed: true,
                    seat_press_count: 1,
                });
            }
        } else if !pressed_now && was_pressed {
            if let Some(button) = self.press_button_at_press.take() {
                sink.handle(SinkEvent::PointerButton {
                    millis,
                    button,
                    pressed: false,
                    seat_press_count: 0,
                });
            }
            self.click_pending = false;
        }
    }

    /// Simultaneous LEFT+RIGHT on a non-clickpad device reads as a MIDDLE
    /// click (spec.md §F.3), the way the original's generic button handling
    /// folds the pair together rather than reporting both.
    fn resolve_middle_emulation(&self, raw: u8) -> u8 {
        if !self.properties.is_clickpad && raw & BTN_LEFT_BIT != 0 && raw & BTN_RIGHT_BIT != 0 {
            (raw & !(BTN_LEFT_BIT | BTN_RIGHT_BIT)) | BTN_MIDDLE_BIT
        } else {
            raw
        }
    }

    /// Swaps LEFT/RIGHT when `left_handed` is on (spec.md §4.7; grounded on
    /// the original's `evdev_to_left_handed()`, applied just before
    /// emission). Tap-derived buttons are deliberately excluded from this
    /// remap (spec.md §4.4: "the mapping is not affected by the
    /// left-handed setting") and so never call this helper.
    fn remap_left_handed(&self, button: ButtonCode) -> ButtonCode {
        if !self.options.left_handed {
            return button;
        }
        match button {
            ButtonCode::Left => ButtonCode::Right,
            ButtonCode::Right => ButtonCode::Left,
            ButtonCode::Middle => ButtonCode::Middle,
        }
    }

    fn emit_button_diff(&mut self, millis: u64, sink: &mut dyn EventSink) {
        let now_state = self.resolve_middle_emulation(self.buttons_state);
        let before_state = self.resolve_middle_emulation(self.buttons_old_state);
        for (bit, code) in [
            (BTN_LEFT_BIT, ButtonCode::Left),
            (BTN_RIGHT_BIT, ButtonCode::Right),
            (BTN_MIDDLE_BIT, ButtonCode::Middle),
        ] {
            let now = now_state & bit != 0;
            let before = before_state & bit != 0;
            if now != before {
                sink.handle(SinkEvent::PointerButton {
                    millis,
                    button: self.remap_left_handed(code),
                    pressed: now,
                    seat_press_count: now_state.count_ones(),
                });
            }
        }
    }

    fn emit_edge_scroll(&mut self, millis: u64, sink: &mut dyn EventSink) {
        if self.options.scroll.method != ScrollMethod::Edge {
            return;
        }
        for touch in self.touches.iter_mut() {
            if touch.scroll.state != EdgeState::Edge {
                continue;
            }
            let Some(axis) = touch.scroll.direction else { continue };
            if !scroll::past_lockin_threshold(touch.scroll.initial, touch.point, &self.geometry) {
                continue;
            }
            if let Some(delta) = motion::estimate_delta(touch) {
                let normalized = motion::normalize_delta(&self.geometry, delta);
                let value = if axis == Axis::Vertical { normalized.1 } else { normalized.0 };
                let value = if self.options.scroll.natural { -value } else { value };
                sink.handle(SinkEvent::PointerAxis {
                    millis,
                    axis,
                    source: AxisSource::Finger,
                    value,
                    discrete: None,
                });
                self.scroll_active = Some((ScrollSource::Edge, axis));
            }
        }

        if !self.touches.iter().any(|t| t.scroll.state == EdgeState::Edge) {
            if let Some((ScrollSource::Edge, axis)) = self.scroll_active.take() {
                let stop = scroll::stop_event(axis);
                sink.handle(SinkEvent::PointerAxis {
                    millis,
                    axis: stop.axis,
                    source: stop.source,
                    value: stop.value,
                    discrete: None,
                });
            }
        }
    }

    fn emit_motion_and_two_finger_scroll(&mut self, millis: u64, timers: &mut dyn TimerService, sink: &mut dyn EventSink) {
        let active: Vec<usize> = (0..self.touches.len())
            .filter(|&i| self.touches[i].is_active() && self.touches[i].dirty && !self.touches[i].pinned.is_pinned)
            .collect();

        let clickfinger = self.options.click_method == ClickMethod::Clickfinger;
        let drag_pending = matches!(
            self.tap.state,
            crate::tap::TapState::Dragging | crate::tap::TapState::Dragging2 | crate::tap::TapState::DraggingWait
        );

        let gate = match self.options.scroll.method {
            ScrollMethod::TwoFinger if scroll::two_finger_scroll_active(active.len(), clickfinger, drag_pending) => {
                Some(ScrollSource::TwoFinger)
            }
            ScrollMethod::ButtonDown
                if scroll::button_down_scroll_active(self.buttons_state & BTN_MIDDLE_BIT != 0, active.len()) =>
            {
                Some(ScrollSource::ButtonDown)
            }
            _ => None,
        };

        if let Some(source) = gate {
            let mut sum = (0.0, 0.0);
            let mut n = 0;
            for &i in &active {
                if let Some(delta) = motion::estimate_delta(&self.touches[i]) {
                    let normalized = motion::normalize_delta(&self.geometry, delta);
                    sum.0 += normalized.0;
                    sum.1 += normalized.1;
                    n += 1;
                }
            }
            if n > 0 {
                let avg = (sum.0 / n as f64, sum.1 / n as f64);
                let (dx, dy) = self.accel_scroll.accelerate(avg.0, avg.1, millis);
                let (axis, mut value) = scroll::dominant_axis(dx, dy);
                if self.options.scroll.natural {
                    value = -value;
                }
                sink.handle(SinkEvent::PointerAxis {
                    millis,
                    axis,
                    source: AxisSource::Finger,
                    value,
                    discrete: None,
                });
                self.scroll_active = Some((source, axis));
            }
            return;
        }

        if let Some((ScrollSource::TwoFinger, axis)) = self.scroll_active {
            if active.len() < 2 {
                self.scroll_active = None;
                let stop = scroll::stop_event(axis);
                sink.handle(SinkEvent::PointerAxis {
                    millis,
                    axis: stop.axis,
                    source: stop.source,
                    value: stop.value,
                    discrete: None,
                });
            }
        }

        if let Some((ScrollSource::ButtonDown, axis)) = self.scroll_active {
            if !scroll::button_down_scroll_active(self.buttons_state & BTN_MIDDLE_BIT != 0, active.len()) {
                self.scroll_active = None;
                let stop = scroll::stop_event(axis);
                sink.handle(SinkEvent::PointerAxis {
                    millis,
                    axis: stop.axis,
                    source: stop.source,
                    value: stop.value,
                    discrete: None,
                });
            }
        }

        if active.len() == 1 {
            let touch = &self.touches[active[0]];
            if let Some(delta) = motion::estimate_delta(touch) {
                let normalized = motion::normalize_delta(&self.geometry, delta);
                let (dx, dy) = self.accel_pointer.accelerate(normalized.0, normalized.1, millis);
                sink.handle(SinkEvent::PointerMotionUnaccelerated { millis, dx: normalized.0, dy: normalized.1 });
                sink.handle(SinkEvent::PointerMotion { millis, dx, dy });
            }
        }

        // Suppress the (rare) borrow-unused warning for timers on builds
        // where no edge-scroll lock-in was re-armed this frame.
        let _ = timers;
    }

    fn advance_lifecycles(&mut self) {
        for touch in self.touches.iter_mut() {
            match touch.lifecycle {
                Lifecycle::Begin => touch.lifecycle = Lifecycle::Update,
                Lifecycle::End => {
                    touch.lifecycle = if self.properties.has_distance {
                        Lifecycle::Hovering
                    } else {
                        Lifecycle::None
                    };
                    touch.dirty = false;
                    touch.has_ended = false;
                }
                _ => {}
            }
            touch.dirty = false;
        }
    }

    /// Device suspend (spec.md §7): release every pressed button, cancel all
    /// taps cleanly, cancel every owned timer, then stop producing events.
    pub fn suspend(&mut self, millis: u64, timers: &mut dyn TimerService, sink: &mut dyn EventSink) {
        for (bit, code) in [
            (BTN_LEFT_BIT, ButtonCode::Left),
            (BTN_RIGHT_BIT, ButtonCode::Right),
            (BTN_MIDDLE_BIT, ButtonCode::Middle),
        ] {
            if self.buttons_state & bit != 0 {
                sink.handle(SinkEvent::PointerButton { millis, button: code, pressed: false, seat_press_count: 0 });
            }
        }
        self.buttons_state = 0;
        self.tap.suspend(timers);
        for touch in self.touches.iter_mut() {
            touch.button.timer = None;
            touch.scroll.timer = None;
        }
        sink.handle(SinkEvent::TouchCancel { millis });
        self.suspended = true;
        debug!("touchpad device suspended");
    }

    pub fn resume(&mut self) {
        self.suspended = false;
        self.tap.resume();
        debug!("touchpad device resumed");
    }

    /// Test-only inspection of a slot's palm classification; not part of
    /// the public API surface a host would drive.
    #[cfg(any(test, feature = "test-support"))]
    pub fn debug_palm_state(&self, slot: usize) -> Option<PalmState> {
        self.touches.get(slot).map(|t| t.palm.state)
    }
}
