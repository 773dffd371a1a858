use thiserror::Error;

/// Returned by an [`crate::config`] option's `set()` call. Mirrors the
/// SUCCESS/UNSUPPORTED/INVALID contract from the configuration surface
/// design: `Ok(())` is SUCCESS.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The value is outside the capability mask for this option.
    #[error("value is not a valid setting for this option")]
    Invalid,
    /// The value is valid in general but this device cannot currently honor
    /// it (e.g. a click method that requires hardware this device lacks).
    #[error("option is not supported on this device")]
    Unsupported,
}

/// Returned by [`crate::device::TouchpadDevice::new`] when the supplied
/// device geometry or properties cannot be used to build a device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceInitError {
    #[error("device geometry is degenerate: width/height must be positive, got {width}x{height}")]
    DegenerateGeometry { width: u32, height: u32 },
    #[error("device reports {0} multitouch slots, which exceeds the supported maximum of 16")]
    TooManySlots(usize),
}
