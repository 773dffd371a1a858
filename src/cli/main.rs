//! `touchpad-replay`: developer tooling that replays a recorded evdev event
//! capture through `touchpad_core` and prints the emitted event stream.
//! Not part of the crate's public API — see SPEC_FULL.md §A.

use std::collections::BinaryHeap;
use std::cmp::Reverse;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode};
use serde::Deserialize;
use tabled::{Table, Tabled};

use touchpad_core::sink::{EventSink, SinkEvent};
use touchpad_core::timer::{TimerHandle, TimerService};
use touchpad_core::{DeviceGeometry, DeviceProperties, TouchpadDevice};

#[derive(Parser, Debug)]
#[command(name = "touchpad-replay", about = "Replay a recorded touchpad capture through touchpad_core")]
struct Args {
    /// Path to a JSON capture file (see `RecordingFile` for the schema).
    capture: PathBuf,
}

#[derive(Debug, Deserialize)]
struct AxisInfoDesc {
    minimum: i32,
    maximum: i32,
    resolution: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GeometryDesc {
    x: AxisInfoDesc,
    y: AxisInfoDesc,
}

#[derive(Debug, Deserialize)]
struct PropertiesDesc {
    is_clickpad: bool,
    #[serde(default)]
    has_top_buttons: bool,
    #[serde(default)]
    is_semi_mt: bool,
    #[serde(default)]
    is_apple: bool,
    #[serde(default)]
    is_clickfinger_model: bool,
    #[serde(default)]
    has_no_physical_button: bool,
    num_slots: usize,
    #[serde(default)]
    max_tool_fingers: usize,
    #[serde(default)]
    has_distance: bool,
    #[serde(default)]
    is_bluetooth: bool,
    #[serde(default)]
    is_virtual: bool,
    #[serde(default)]
    is_wacom: bool,
    #[serde(default)]
    shares_serio_bus_with_keyboard: bool,
    #[serde(default)]
    has_trackpoint_buttons: bool,
    #[serde(default)]
    trusted_hysteresis: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
enum EventDesc {
    Slot { millis: u64, value: i32 },
    TrackingId { millis: u64, value: i32 },
    PositionX { millis: u64, value: i32 },
    PositionY { millis: u64, value: i32 },
    Key { millis: u64, code: String, value: i32 },
    SynReport { millis: u64 },
}

#[derive(Debug, Deserialize)]
struct RecordingFile {
    geometry: GeometryDesc,
    properties: PropertiesDesc,
    events: Vec<EventDesc>,
}

fn key_code_from_name(name: &str) -> KeyCode {
    match name {
        "BTN_TOUCH" => KeyCode::BTN_TOUCH,
        "BTN_TOOL_FINGER" => KeyCode::BTN_TOOL_FINGER,
        "BTN_TOOL_DOUBLETAP" => KeyCode::BTN_TOOL_DOUBLETAP,
        "BTN_TOOL_TRIPLETAP" => KeyCode::BTN_TOOL_TRIPLETAP,
        "BTN_TOOL_QUADTAP" => KeyCode::BTN_TOOL_QUADTAP,
        "BTN_TOOL_QUINTTAP" => KeyCode::BTN_TOOL_QUINTTAP,
        "BTN_LEFT" => KeyCode::BTN_LEFT,
        "BTN_RIGHT" => KeyCode::BTN_RIGHT,
        "BTN_MIDDLE" => KeyCode::BTN_MIDDLE,
        other => panic!("unrecognised key code in capture: {other}"),
    }
}

fn build_event(desc: &EventDesc) -> (u64, InputEvent) {
    match *desc {
        EventDesc::Slot { millis, value } => {
            (millis, InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_MT_SLOT.0, value))
        }
        EventDesc::TrackingId { millis, value } => {
            (millis, InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_MT_TRACKING_ID.0, value))
        }
        EventDesc::PositionX { millis, value } => {
            (millis, InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_MT_POSITION_X.0, value))
        }
        EventDesc::PositionY { millis, value } => {
            (millis, InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisCode::ABS_MT_POSITION_Y.0, value))
        }
        EventDesc::Key { millis, ref code, value } => {
            (millis, InputEvent::new(EventType::KEY, key_code_from_name(code).0, value))
        }
        EventDesc::SynReport { millis } => {
            (millis, InputEvent::new(EventType::SYNCHRONIZATION, 0, 0))
        }
    }
}

/// A clock driven by the capture's own timestamps: `now()` reflects
/// whatever event is currently being replayed, and scheduled deadlines fire
/// as soon as replay time catches up to them.
struct ReplayClock {
    now: u64,
    next_id: u64,
    deadlines: BinaryHeap<Reverse<(u64, u64)>>,
}

impl ReplayClock {
    fn new() -> Self {
        Self { now: 0, next_id: 0, deadlines: BinaryHeap::new() }
    }

    fn advance_to(&mut self, millis: u64) -> Vec<TimerHandle> {
        self.now = self.now.max(millis);
        let mut fired = Vec::new();
        while let Some(&Reverse((deadline, id))) = self.deadlines.peek() {
            if deadline > self.now {
                break;
            }
            self.deadlines.pop();
            fired.push(TimerHandle(id));
        }
        fired
    }
}

impl TimerService for ReplayClock {
    fn now(&self) -> u64 {
        self.now
    }

    fn schedule(&mut self, millis: u64) -> TimerHandle {
        self.next_id += 1;
        self.deadlines.push(Reverse((self.now + millis, self.next_id)));
        TimerHandle(self.next_id)
    }

    fn cancel(&mut self, _handle: TimerHandle) {
        // Handles aren't individually removable from the binary heap; a
        // cancelled deadline simply fires into a dead `on_timer` call later,
        // which is a documented no-op for unrecognised handles. Fine for a
        // replay tool; not a library-grade timer service.
    }
}

#[derive(Tabled)]
struct EventRow {
    millis: u64,
    kind: String,
    detail: String,
}

struct TableSink {
    rows: Vec<EventRow>,
}

impl EventSink for TableSink {
    fn handle(&mut self, event: SinkEvent) {
        let (kind, detail) = describe(&event);
        let millis = millis_of(&event);
        self.rows.push(EventRow { millis, kind, detail });
    }
}

fn millis_of(event: &SinkEvent) -> u64 {
    match *event {
        SinkEvent::PointerMotion { millis, .. }
        | SinkEvent::PointerMotionUnaccelerated { millis, .. }
        | SinkEvent::PointerMotionAbsolute { millis, .. }
        | SinkEvent::PointerButton { millis, .. }
        | SinkEvent::PointerAxis { millis, .. }
        | SinkEvent::TouchDown { millis, .. }
        | SinkEvent::TouchMotion { millis, .. }
        | SinkEvent::TouchUp { millis, .. }
        | SinkEvent::TouchFrame { millis }
        | SinkEvent::TouchCancel { millis } => millis,
        SinkEvent::DeviceAdded | SinkEvent::DeviceRemoved => 0,
    }
}

fn describe(event: &SinkEvent) -> (String, String) {
    match event {
        SinkEvent::PointerMotion { dx, dy, .. } => ("motion".into(), format!("dx={dx:.2} dy={dy:.2}")),
        SinkEvent::PointerMotionUnaccelerated { dx, dy, .. } => {
            ("motion-raw".into(), format!("dx={dx:.2} dy={dy:.2}"))
        }
        SinkEvent::PointerMotionAbsolute { x, y, .. } => ("motion-abs".into(), format!("x={x:.2} y={y:.2}")),
        SinkEvent::PointerButton { button, pressed, seat_press_count, .. } => {
            ("button".into(), format!("{button:?} pressed={pressed} seat={seat_press_count}"))
        }
        SinkEvent::PointerAxis { axis, source, value, discrete, .. } => (
            "axis".into(),
            format!("{axis:?} src={source:?} value={value:.3} discrete={discrete:?}"),
        ),
        SinkEvent::TouchDown { slot, x, y, .. } => ("touch-down".into(), format!("slot={slot} x={x} y={y}")),
        SinkEvent::TouchMotion { slot, x, y, .. } => ("touch-motion".into(), format!("slot={slot} x={x} y={y}")),
        SinkEvent::TouchUp { slot, .. } => ("touch-up".into(), format!("slot={slot}")),
        SinkEvent::TouchFrame { .. } => ("touch-frame".into(), String::new()),
        SinkEvent::TouchCancel { .. } => ("touch-cancel".into(), String::new()),
        SinkEvent::DeviceAdded => ("device-added".into(), String::new()),
        SinkEvent::DeviceRemoved => ("device-removed".into(), String::new()),
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let raw = fs::read_to_string(&args.capture).expect("failed to read capture file");
    let recording: RecordingFile = serde_json::from_str(&raw).expect("failed to parse capture file");

    let geometry = DeviceGeometry {
        x: touchpad_core::geometry::AxisInfo {
            minimum: recording.geometry.x.minimum,
            maximum: recording.geometry.x.maximum,
            resolution: recording.geometry.x.resolution,
        },
        y: touchpad_core::geometry::AxisInfo {
            minimum: recording.geometry.y.minimum,
            maximum: recording.geometry.y.maximum,
            resolution: recording.geometry.y.resolution,
        },
    };
    let p = &recording.properties;
    let properties = DeviceProperties {
        is_clickpad: p.is_clickpad,
        has_top_buttons: p.has_top_buttons,
        is_semi_mt: p.is_semi_mt,
        is_apple: p.is_apple,
        is_clickfinger_model: p.is_clickfinger_model,
        has_no_physical_button: p.has_no_physical_button,
        num_slots: p.num_slots,
        max_tool_fingers: p.max_tool_fingers,
        has_distance: p.has_distance,
        is_bluetooth: p.is_bluetooth,
        is_virtual: p.is_virtual,
        is_wacom: p.is_wacom,
        shares_serio_bus_with_keyboard: p.shares_serio_bus_with_keyboard,
        has_trackpoint_buttons: p.has_trackpoint_buttons,
        trusted_hysteresis: p.trusted_hysteresis,
    };

    let mut device = TouchpadDevice::new(geometry, properties).expect("invalid capture geometry/properties");
    let mut clock = ReplayClock::new();
    let mut sink = TableSink { rows: Vec::new() };

    for desc in &recording.events {
        let (millis, event) = build_event(desc);
        for handle in clock.advance_to(millis) {
            device.on_timer(handle, &mut clock, &mut sink);
        }
        device.dispatch(event, &mut clock, &mut sink);
    }

    println!("{}", Table::new(&sink.rows));
}
