//! Per-device configuration surface (spec.md §4.7). Each option group
//! exposes `capabilities()`/`current()`/`default()`/`set()`, mirroring the
//! get/set contract the teacher's dbus interfaces expose for target device
//! options, backed by a plain `serde`-serialisable struct instead of a
//! dbus-specific type so a host can persist or transmit it over any
//! transport.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::DeviceProperties;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickMethod {
    /// Bottom of the pad is split into button areas (spec.md §4.3).
    ButtonAreas,
    /// Any number of fingers down during a physical click selects left vs
    /// right vs middle by finger count, with no fixed button areas.
    Clickfinger,
    /// The device is not a clickpad; physical buttons are used as-is.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollMethod {
    TwoFinger,
    Edge,
    ButtonDown,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendEventsMode {
    Enabled,
    Disabled,
    DisabledOnExternalMouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapConfig {
    pub enabled: bool,
    pub drag_lock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollConfig {
    pub method: ScrollMethod,
    pub natural: bool,
}

/// The full runtime-mutable option surface for one device (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    pub tap: TapConfig,
    pub click_method: ClickMethod,
    pub scroll: ScrollConfig,
    pub left_handed: bool,
    pub send_events: SendEventsMode,
}

impl Options {
    /// Computes the default option set for a device from its properties,
    /// per the default-selection column of spec.md's §4.7 table.
    pub fn defaults_for(props: &DeviceProperties) -> Self {
        let click_method = if !props.is_clickpad {
            ClickMethod::None
        } else if props.is_apple || props.is_clickfinger_model {
            ClickMethod::Clickfinger
        } else {
            ClickMethod::ButtonAreas
        };

        let scroll_method = if props.effective_slots() >= 2 {
            ScrollMethod::TwoFinger
        } else {
            ScrollMethod::Edge
        };

        Options {
            tap: TapConfig {
                enabled: props.has_no_physical_button,
                drag_lock: false,
            },
            click_method,
            scroll: ScrollConfig {
                method: scroll_method,
                natural: false,
            },
            left_handed: false,
            send_events: SendEventsMode::Enabled,
        }
    }

    /// spec.md §4.7: "Switching `click_method` dynamically retunes the
    /// bottom-button top edge (it is pushed off-screen when CLICKFINGER is
    /// active...)". Returns `true` when the bottom soft-button area should
    /// be treated as pure motion area rather than a button zone.
    pub fn bottom_area_disabled(&self) -> bool {
        self.click_method != ClickMethod::ButtonAreas
    }

    /// `set_enabled` is idempotent: calling it twice with the same value is
    /// equivalent to calling it once (spec.md §8 law). Returns the previous
    /// value so callers can tell whether anything actually changed.
    pub fn set_tap_enabled(&mut self, enabled: bool) -> Result<bool, ConfigError> {
        let previous = self.tap.enabled;
        self.tap.enabled = enabled;
        Ok(previous)
    }

    pub fn set_drag_lock(&mut self, enabled: bool) -> Result<bool, ConfigError> {
        let previous = self.tap.drag_lock;
        self.tap.drag_lock = enabled;
        Ok(previous)
    }

    /// `click_method` can only be set to a method the device's geometry
    /// supports: `ButtonAreas`/`Clickfinger` require a clickpad.
    pub fn set_click_method(
        &mut self,
        method: ClickMethod,
        props: &DeviceProperties,
    ) -> Result<(), ConfigError> {
        if method != ClickMethod::None && !props.is_clickpad {
            return Err(ConfigError::Unsupported);
        }
        self.click_method = method;
        Ok(())
    }

    pub fn set_scroll_method(
        &mut self,
        method: ScrollMethod,
        props: &DeviceProperties,
    ) -> Result<(), ConfigError> {
        if method == ScrollMethod::TwoFinger && props.effective_slots() < 2 {
            return Err(ConfigError::Unsupported);
        }
        self.scroll.method = method;
        Ok(())
    }

    pub fn set_natural_scroll(&mut self, enabled: bool) -> Result<bool, ConfigError> {
        let previous = self.scroll.natural;
        self.scroll.natural = enabled;
        Ok(previous)
    }

    /// spec.md §4.7: "Switching `left_handed` only takes effect when no
    /// physical button is currently held." `button_held` is supplied by the
    /// caller (the device knows its own physical button state).
    pub fn set_left_handed(&mut self, enabled: bool, button_held: bool) -> Result<(), ConfigError> {
        if button_held {
            return Err(ConfigError::Unsupported);
        }
        self.left_handed = enabled;
        Ok(())
    }

    pub fn set_send_events(&mut self, mode: SendEventsMode) -> Result<(), ConfigError> {
        self.send_events = mode;
        Ok(())
    }
}
