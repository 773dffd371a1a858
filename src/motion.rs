//! Motion pipeline: hysteresis filtering, history push, and delta
//! estimation (spec.md §4.2). The pointer acceleration filter itself lives
//! in [`crate::filter`]; this module only gets a touch from a raw dirty
//! point to a normalised delta.

use crate::geometry::DeviceGeometry;
use crate::touch::Touch;

/// Applies the hysteresis filter to `point` given the current
/// `hysteresis_center`, returning the new center. For each axis
/// independently: if the point is within `margin` of the center, the
/// center doesn't move; otherwise it moves towards the point by the
/// excess over the margin.
pub fn hysteresis(center: (f64, f64), point: (f64, f64), margin: (f64, f64)) -> (f64, f64) {
    let filter_axis = |c: f64, p: f64, m: f64| -> f64 {
        let delta = p - c;
        if delta.abs() <= m {
            c
        } else if delta > 0.0 {
            c + (delta - m)
        } else {
            c + (delta + m)
        }
    };

    (
        filter_axis(center.0, point.0, margin.0),
        filter_axis(center.1, point.1, margin.1),
    )
}

/// Feeds a new raw sample into a touch: runs the hysteresis filter, pushes
/// the filtered point into the 4-slot history ring, and returns the
/// filtered point so the caller can update `touch.point`.
pub fn filter_and_push(touch: &mut Touch, raw_point: (f64, f64), margin: (f64, f64)) -> (f64, f64) {
    let filtered = hysteresis(touch.hysteresis_center, raw_point, margin);
    touch.hysteresis_center = filtered;
    touch.history.push(filtered);
    filtered
}

/// A raw, un-normalised device-unit delta estimated from the most recent 4
/// history samples via `(h[0] + h[1] - h[2] - h[3]) / 4` per axis. Returns
/// `None` until at least 4 samples have accumulated since the last history
/// reset (spec.md §4.2).
pub fn estimate_delta(touch: &Touch) -> Option<(f64, f64)> {
    if touch.history.len() < 4 {
        return None;
    }
    let h = touch.history.samples();
    let dx = (h[0].0 + h[1].0 - h[2].0 - h[3].0) / 4.0;
    let dy = (h[0].1 + h[1].1 - h[2].1 - h[3].1) / 4.0;
    Some((dx, dy))
}

/// Normalises a raw device-unit delta to the 1000-dpi-equivalent unit using
/// the device's per-axis scale coefficients (spec.md §4.2).
pub fn normalize_delta(geometry: &DeviceGeometry, raw: (f64, f64)) -> (f64, f64) {
    (
        raw.0 * geometry.accel_scale_x(),
        raw.1 * geometry.accel_scale_y(),
    )
}
