//! Pointer acceleration filter (spec.md §4.2). Takes a normalised,
//! 1000-dpi-equivalent delta and scales it by a velocity-dependent factor
//! computed from a 16-slot velocity tracker and a Simpson's-rule-averaged
//! acceleration profile.

use std::f64::consts::PI;

/// Compass-direction bitmask of a move. Eight overlapping 45-degree
/// sectors so that two moves in "roughly the same direction" still share
/// at least one bit, matching the original's direction-intersection walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionMask(pub u8);

const N: u8 = 1 << 0;
const NE: u8 = 1 << 1;
const E: u8 = 1 << 2;
const SE: u8 = 1 << 3;
const S: u8 = 1 << 4;
const SW: u8 = 1 << 5;
const W: u8 = 1 << 6;
const NW: u8 = 1 << 7;

/// Classifies a 2D move into the nearest of 8 compass sectors.
pub fn direction_of(dx: f64, dy: f64) -> DirectionMask {
    if dx == 0.0 && dy == 0.0 {
        return DirectionMask(0);
    }
    // Screen-space: +y is down. Angle measured clockwise from north.
    let angle = dy.atan2(dx) + PI / 2.0;
    let angle = if angle < 0.0 { angle + 2.0 * PI } else { angle };
    let sector = (angle / (PI / 4.0)).round() as i32 % 8;
    let bits = [N, NE, E, SE, S, SW, W, NW];
    DirectionMask(bits[sector as usize])
}

impl std::ops::BitAnd for DirectionMask {
    type Output = DirectionMask;
    fn bitand(self, rhs: DirectionMask) -> DirectionMask {
        DirectionMask(self.0 & rhs.0)
    }
}

/// One slot of the 16-slot velocity tracker (spec.md §4.2).
#[derive(Debug, Clone, Copy, Default)]
struct Tracker {
    dx: f64,
    dy: f64,
    time: u64,
    dir: DirectionMask,
}

const NUM_TRACKERS: usize = 16;
const MOTION_TIMEOUT_MS: u64 = 300;
const MAX_VELOCITY_DIFF: f64 = 1.0;

const DEFAULT_THRESHOLD: f64 = 0.4;
const DEFAULT_ACCELERATION: f64 = 2.0;

/// Tracks recent deltas to compute a smoothed velocity, then runs that
/// velocity through the acceleration profile.
#[derive(Debug, Clone)]
pub struct AccelerationFilter {
    trackers: [Tracker; NUM_TRACKERS],
    cur: usize,
    last_velocity: f64,
}

impl Default for AccelerationFilter {
    fn default() -> Self {
        Self {
            trackers: [Tracker::default(); NUM_TRACKERS],
            cur: 0,
            last_velocity: 0.0,
        }
    }
}

impl AccelerationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn feed(&mut self, dx: f64, dy: f64, time: u64) {
        for tracker in self.trackers.iter_mut() {
            tracker.dx += dx;
            tracker.dy += dy;
        }
        self.cur = (self.cur + 1) % NUM_TRACKERS;
        self.trackers[self.cur] = Tracker {
            dx: 0.0,
            dy: 0.0,
            time,
            dir: direction_of(dx, dy),
        };
    }

    fn tracker_by_offset(&self, offset: usize) -> &Tracker {
        let index = (self.cur + NUM_TRACKERS - offset) % NUM_TRACKERS;
        &self.trackers[index]
    }

    fn tracker_velocity(tracker: &Tracker, time: u64) -> f64 {
        let elapsed = time.saturating_sub(tracker.time);
        if elapsed == 0 {
            return 0.0;
        }
        let distance = (tracker.dx * tracker.dx + tracker.dy * tracker.dy).sqrt();
        distance / elapsed as f64
    }

    /// Walks backwards from the most recent tracker, intersecting
    /// direction masks, stopping at the first of: direction becomes empty,
    /// a time gap over 300ms, or a velocity more than 1 unit/ms away from
    /// the initial velocity found (spec.md §4.2).
    fn velocity(&self, time: u64) -> f64 {
        let mut dir = self.tracker_by_offset(0).dir;
        let mut result = 0.0;
        let mut initial_velocity = 0.0;

        for offset in 1..NUM_TRACKERS {
            let tracker = self.tracker_by_offset(offset);
            if tracker.time > time || time - tracker.time > MOTION_TIMEOUT_MS {
                break;
            }
            dir = dir & tracker.dir;
            if dir.0 == 0 {
                break;
            }
            let velocity = Self::tracker_velocity(tracker, time);
            if initial_velocity == 0.0 {
                result = velocity;
                initial_velocity = velocity;
            } else {
                if (initial_velocity - velocity).abs() > MAX_VELOCITY_DIFF {
                    break;
                }
                result = velocity;
            }
        }

        result
    }

    /// Applies acceleration to `(dx, dy)`, a normalised delta in
    /// units/frame, and returns the accelerated delta. `time` is
    /// milliseconds from an arbitrary monotonic epoch.
    pub fn accelerate(&mut self, dx: f64, dy: f64, time: u64) -> (f64, f64) {
        self.feed(dx, dy, time);
        let velocity = self.velocity(time);
        let factor = simpson_acceleration(velocity, self.last_velocity);
        self.last_velocity = velocity;
        (factor * dx, factor * dy)
    }
}

/// `calc_penumbral_gradient`: a smooth S-curve used to blend between the
/// flat and ramp regions of the acceleration profile without a visible
/// kink.
fn penumbral_gradient(x: f64) -> f64 {
    let x = 2.0 * x - 1.0;
    0.5 + (x * (1.0 - x * x).max(0.0).sqrt() + x.asin()) / PI
}

/// Default acceleration profile (spec.md §4.2): flat (gain 1.0) up to
/// `DEFAULT_THRESHOLD` units/ms, a smooth ramp up to a plateau factor of
/// `DEFAULT_ACCELERATION`, and sub-unity gain below half the threshold for
/// slow, precise motion.
pub fn acceleration_profile(velocity: f64) -> f64 {
    let threshold = DEFAULT_THRESHOLD;
    let accel = DEFAULT_ACCELERATION;

    if velocity < threshold / 2.0 {
        return penumbral_gradient(0.5 + velocity / threshold) * 2.0 - 1.0;
    }
    if velocity <= threshold {
        return 1.0;
    }

    let factor = velocity / threshold;
    if factor >= accel {
        return accel;
    }

    let factor = (factor - 1.0) / (accel - 1.0);
    1.0 + penumbral_gradient(factor) * (accel - 1.0)
}

/// Simpson's rule average of the acceleration profile across the previous
/// velocity, the current velocity, and their midpoint (spec.md §4.2).
fn simpson_acceleration(velocity: f64, last_velocity: f64) -> f64 {
    let a = acceleration_profile(velocity);
    let b = acceleration_profile(last_velocity);
    let mid = acceleration_profile((velocity + last_velocity) / 2.0);
    (a + b + 4.0 * mid) / 6.0
}
