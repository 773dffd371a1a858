//! Per-touch state: the 5-state lifecycle, motion history, and the small
//! per-touch state slices owned by the button/tap/scroll/palm FSMs (spec.md
//! §3). The FSM *transition logic* lives in [`crate::buttons`],
//! [`crate::tap`], [`crate::scroll`] and [`crate::palm`]; this module only
//! owns the data each one threads through a frame.

use crate::timer::TimerHandle;

/// Tiny bitmask macro so `EdgeMask` reads like the rest of this crate's
/// plain enums/structs without pulling in the `bitflags` crate for two
/// bits.
macro_rules! bitflags_like_mask {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $ty:ty {
            $(const $variant:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(pub $ty);

        impl $name {
            pub const EMPTY: $name = $name(0);
            $(pub const $variant: $name = $name($value);)*

            pub fn contains(self, other: $name) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: $name) {
                self.0 |= other.0;
            }

            pub fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = $name;
            fn bitor(self, rhs: $name) -> $name {
                $name(self.0 | rhs.0)
            }
        }
    };
}

/// The lifecycle of a single touch/slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    None,
    Hovering,
    Begin,
    Update,
    End,
}

/// A ring of the last 4 coordinate samples, used by [`crate::motion`] to
/// estimate a smoothed delta. Mirrors the original's fixed 4-deep sample
/// history exactly (spec.md §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct History {
    samples: [(f64, f64); 4],
    count: u8,
}

impl History {
    /// Pushes a new sample to the front, dropping the oldest.
    pub fn push(&mut self, point: (f64, f64)) {
        self.samples[3] = self.samples[2];
        self.samples[2] = self.samples[1];
        self.samples[1] = self.samples[0];
        self.samples[0] = point;
        self.count = (self.count + 1).min(4);
    }

    /// Clears accumulated samples without touching the most recent point;
    /// used when a touch's motion history must be invalidated (e.g. fake
    /// finger count changes, spec.md §9 open question (b)) without
    /// discarding position.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn len(&self) -> u8 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The 4 most recent samples, oldest-last. Only meaningful once `len()
    /// == 4`.
    pub fn samples(&self) -> [(f64, f64); 4] {
        self.samples
    }
}

/// Soft-button area FSM state (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    None,
    Area,
    Bottom,
    Top,
    TopNew,
    TopToIgnore,
    Ignore,
}

/// The soft-button area a touch most recently triggered entry into a
/// button state from. Cached in `button.curr` so the post-event emission
/// phase knows which physical button to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonArea {
    BottomLeft,
    BottomRight,
    TopLeft,
    TopMiddle,
    TopRight,
}

#[derive(Debug, Clone, Default)]
pub struct ButtonTouchState {
    pub state: ButtonState,
    pub curr: Option<ButtonArea>,
    pub timer: Option<TimerHandle>,
}

/// Edge-scroll per-touch FSM state (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeState {
    #[default]
    None,
    EdgeNew,
    Edge,
    Area,
}

bitflags_like_mask! {
    /// Which screen edge(s) a touch's starting point fell within.
    pub struct EdgeMask: u8 {
        const RIGHT = 0b01;
        const BOTTOM = 0b10;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrollTouchState {
    pub state: EdgeState,
    pub edge: EdgeMask,
    pub direction: Option<crate::capability::Axis>,
    pub initial: (f64, f64),
    pub timer: Option<TimerHandle>,
}

/// Palm classification (spec.md §4.6). Any variant other than `None`
/// excludes the touch from `tp_touch_active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PalmState {
    #[default]
    None,
    Edge,
    Typing,
    /// Reserved for trackpoint-activity based suppression; the core does
    /// not currently produce this variant on its own (no trackpoint motion
    /// listener is wired up beyond DWT-equivalent suppression), but it is
    /// kept in the state space per spec.md §3 so a host-level trackpoint
    /// listener can set it through `Touch::palm`.
    Trackpoint,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PalmTouchState {
    pub state: PalmState,
    pub first: (f64, f64),
    pub time: u64,
}

/// Tap FSM per-touch participation state (spec.md §3, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TapTouchState {
    #[default]
    Idle,
    Touch,
    Dead,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TapTouchData {
    pub state: TapTouchState,
    pub initial: (f64, f64),
    pub is_thumb: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Pinned {
    pub is_pinned: bool,
    pub center: (f64, f64),
}

/// A single finger's complete state (spec.md §3).
#[derive(Debug, Clone, Default)]
pub struct Touch {
    pub lifecycle: Lifecycle,
    pub point: (f64, f64),
    pub millis: u64,
    pub dirty: bool,
    pub has_ended: bool,
    pub history: History,
    pub hysteresis_center: (f64, f64),
    pub pinned: Pinned,
    pub button: ButtonTouchState,
    pub scroll: ScrollTouchState,
    pub palm: PalmTouchState,
    pub tap: TapTouchData,
}

impl Touch {
    /// True for BEGIN/UPDATE: a touch actually down on the surface.
    pub fn is_down(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Begin | Lifecycle::Update)
    }

    /// spec.md §3 invariant: NONE/HOVERING touches contribute nothing to
    /// motion, tap, scroll or gesture.
    pub fn is_active(&self) -> bool {
        self.is_down() && self.palm.state == PalmState::None
    }

    /// Resets everything about a touch back to its just-created state,
    /// called on `new_touch` (spec.md §4.1).
    pub fn begin_new(&mut self, millis: u64) {
        *self = Touch {
            lifecycle: Lifecycle::Hovering,
            millis,
            dirty: true,
            ..Touch::default()
        };
    }
}
