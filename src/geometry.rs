//! Per-device geometry and static properties supplied by the device source
//! at construction time (spec.md §6: "device metadata required").

/// 1000-dpi-equivalent unit conversion constant, `DEFAULT_MOUSE_DPI / 25.4`.
/// Used to turn a millimetre distance into the device-independent
/// normalised unit that deltas and thresholds are expressed in.
pub const MM_TO_DPI_NORMALIZED: f64 = 1000.0 / 25.4;

/// Coordinate axes minimum/maximum/resolution, as reported by the kernel
/// for `ABS_MT_POSITION_X`/`ABS_MT_POSITION_Y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisInfo {
    pub minimum: i32,
    pub maximum: i32,
    /// Resolution in units per millimetre, or `None` if the kernel did not
    /// advertise one.
    pub resolution: Option<f64>,
}

impl AxisInfo {
    pub fn range(&self) -> f64 {
        (self.maximum - self.minimum) as f64
    }
}

/// Static geometry of the touchpad surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceGeometry {
    pub x: AxisInfo,
    pub y: AxisInfo,
}

impl DeviceGeometry {
    /// Diagonal size of the surface in device units.
    pub fn diagonal(&self) -> f64 {
        (self.x.range().powi(2) + self.y.range().powi(2)).sqrt()
    }

    /// Width in millimetres, if resolution is known for the X axis.
    pub fn width_mm(&self) -> Option<f64> {
        self.x.resolution.map(|res| self.x.range() / res)
    }

    /// Height in millimetres, if resolution is known for the Y axis.
    pub fn height_mm(&self) -> Option<f64> {
        self.y.resolution.map(|res| self.y.range() / res)
    }

    /// Converts a millimetre distance to device units on the X axis, or
    /// falls back to a diagonal-proportioned estimate if no resolution was
    /// reported (same fallback the original accel/hysteresis setup uses).
    pub fn mm_to_units_x(&self, mm: f64) -> f64 {
        match self.x.resolution {
            Some(res) => mm * res,
            None => mm / 100.0 * self.diagonal(),
        }
    }

    pub fn mm_to_units_y(&self, mm: f64) -> f64 {
        match self.y.resolution {
            Some(res) => mm * res,
            None => mm / 100.0 * self.diagonal(),
        }
    }

    /// Per-axis scale coefficient turning a raw device-unit delta into the
    /// 1000-dpi-equivalent normalised unit (spec.md §4.2). Falls back to
    /// `DEFAULT_ACCEL_NUMERATOR / diagonal` when resolution is unknown,
    /// matching the original's `tp_init_accel`.
    pub fn accel_scale_x(&self) -> f64 {
        match self.x.resolution {
            Some(res) => MM_TO_DPI_NORMALIZED / res,
            None => 3000.0 / self.diagonal(),
        }
    }

    pub fn accel_scale_y(&self) -> f64 {
        match self.y.resolution {
            Some(res) => MM_TO_DPI_NORMALIZED / res,
            None => 3000.0 / self.diagonal(),
        }
    }

    /// The hysteresis margin in device units for both axes (spec.md §4.2:
    /// "margins scale with the device's diagonal"). Devices the host has
    /// marked as trustworthy (`trusted_hysteresis`) get a zero margin,
    /// since their own firmware already debounces jitter.
    pub fn hysteresis_margin(&self, trusted: bool) -> (f64, f64) {
        if trusted {
            return (0.0, 0.0);
        }
        let margin = self.diagonal() / 700.0;
        (margin, margin)
    }
}

/// Device identity and capability bits required by the core's default
/// selection rules (spec.md §4.7, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    /// `INPUT_PROP_BUTTONPAD`: the whole surface is a physical button.
    pub is_clickpad: bool,
    /// `INPUT_PROP_TOPBUTTONPAD`: dedicated top button strip.
    pub has_top_buttons: bool,
    /// `INPUT_PROP_SEMI_MT`: at most two slots regardless of finger count.
    pub is_semi_mt: bool,
    /// True for Apple internal touchpads (affects click method default,
    /// edge-scroll geometry, and palm zone eligibility).
    pub is_apple: bool,
    /// True when the vendor/model is on the clickfinger-by-default list
    /// (Chromebook/System76/Clevo models named in spec.md §4.7).
    pub is_clickfinger_model: bool,
    /// The touchpad has no physical button at all (forces tap-to-click on
    /// by default per spec.md §4.7).
    pub has_no_physical_button: bool,
    /// Number of real multitouch slots the kernel reports.
    pub num_slots: usize,
    /// Highest finger count `BTN_TOOL_*` hints can report (5 for
    /// `BTN_TOOL_QUINTTAP`).
    pub max_tool_fingers: usize,
    /// The kernel reports `ABS_MT_DISTANCE` for hover detection.
    pub has_distance: bool,
    /// The touchpad is connected over Bluetooth (disables DWT pairing).
    pub is_bluetooth: bool,
    /// The touchpad is a virtual/synthetic device (disables DWT pairing).
    pub is_virtual: bool,
    /// The touchpad identifies as a Wacom device (disables DWT pairing).
    pub is_wacom: bool,
    /// The touchpad and keyboard share the same internal serio bus (always
    /// paired for DWT regardless of the exclusions above).
    pub shares_serio_bus_with_keyboard: bool,
    /// `udev` tag `TOUCHPAD_HAS_TRACKPOINT_BUTTONS`: top-button presses are
    /// routed to the paired trackpoint device.
    pub has_trackpoint_buttons: bool,
    /// The device's own firmware is known to produce clean, debounced
    /// coordinates, so hysteresis filtering can be skipped.
    pub trusted_hysteresis: bool,
}

impl DeviceProperties {
    /// Effective number of touch slots the device needs, per spec.md §3:
    /// `max(num_real_slots, max_finger_count_from_tool_hints)`.
    pub fn effective_slots(&self) -> usize {
        self.num_slots.max(self.max_tool_fingers)
    }

    /// DWT pairing rule from spec.md §6: opt-in per pairing rule, disabled
    /// for bluetooth/virtual/Wacom devices unless the keyboard shares the
    /// internal serio bus, in which case pairing always happens.
    pub fn should_pair_dwt(&self) -> bool {
        if self.shares_serio_bus_with_keyboard {
            return true;
        }
        !self.is_bluetooth && !self.is_virtual && !self.is_wacom
    }

    /// Palm-zone eligibility from spec.md §4.6: known resolution and at
    /// least 70mm wide, or any Apple device.
    pub fn palm_detection_eligible(&self, geometry: &DeviceGeometry) -> bool {
        if self.is_apple {
            return true;
        }
        matches!(geometry.width_mm(), Some(width) if width >= 70.0)
    }
}
