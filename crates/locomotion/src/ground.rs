//! Terrain following.
//!
//! Streaming terrain refines tile by tile, so the height under the camera
//! jumps by centimetres every few frames. Heights are first smoothed with an
//! exponential moving average, then turned into a sticky target that only
//! moves when the smoothed value leaves a hold band.

use serde::{Deserialize, Serialize};

/// EMA weight of a new sample per fixed step.
pub const DEFAULT_HEIGHT_SMOOTHING: f64 = 0.15;
/// Hold band of the sticky target (meters).
pub const DEFAULT_HEIGHT_HYSTERESIS_M: f64 = 0.2;

/// Below-or-slightly-above-target band that snaps straight to the target.
pub const SNAP_UP_EPSILON_M: f64 = 0.02;
/// Height above target beyond which a falling jump stays airborne.
pub const FALL_EPSILON_M: f64 = 0.05;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundTuning {
    pub smoothing: f64,
    pub hysteresis_m: f64,
}

impl Default for GroundTuning {
    fn default() -> Self {
        Self {
            smoothing: DEFAULT_HEIGHT_SMOOTHING,
            hysteresis_m: DEFAULT_HEIGHT_HYSTERESIS_M,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GroundState {
    smoothed_height: Option<f64>,
    sticky_target: Option<f64>,
    pub was_grounded: bool,
    pub is_jumping: bool,
}

impl GroundState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn smoothed_height(&self) -> Option<f64> {
        self.smoothed_height
    }

    pub fn sticky_target(&self) -> Option<f64> {
        self.sticky_target
    }

    /// Feed one terrain sample and return the sticky eye-height target.
    ///
    /// `offset_m` is added on top of the smoothed terrain (eye height plus
    /// clearance). Returns `None` while terrain is unavailable; the previous
    /// smoothing state is kept for when it arrives.
    pub fn track(&mut self, raw_terrain: Option<f64>, offset_m: f64, tuning: &GroundTuning) -> Option<f64> {
        let raw = raw_terrain.filter(|h| h.is_finite())?;

        let smoothed = match self.smoothed_height {
            None => raw,
            Some(prev) => prev + (raw - prev) * tuning.smoothing,
        };
        self.smoothed_height = Some(smoothed);

        let target = smoothed + offset_m;
        let sticky = match self.sticky_target {
            Some(held) if (target - held).abs() <= tuning.hysteresis_m => held,
            _ => target,
        };
        self.sticky_target = Some(sticky);
        Some(sticky)
    }
}

/// Outcome of reconciling an integrated height with the ground target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Landing {
    /// Keep the integrated height and vertical velocity.
    Airborne,
    /// Put the camera exactly on the target.
    Snap,
    /// Keep the integrated height but count as grounded.
    DeadBand,
}

/// Landing rule shared by walk-style controllers.
///
/// A jump stays airborne while rising above the target or while clearly above
/// it. Anything at or barely above the target snaps to it, as does any
/// non-jumping state. A descending jump between the two epsilons is accepted
/// as landed without moving the camera.
pub fn resolve_landing(height: f64, target: f64, vertical_velocity: f64, is_jumping: bool) -> Landing {
    let delta = height - target;
    if is_jumping && ((vertical_velocity > 0.0 && delta > 0.0) || delta > FALL_EPSILON_M) {
        return Landing::Airborne;
    }
    if delta <= SNAP_UP_EPSILON_M || !is_jumping {
        return Landing::Snap;
    }
    Landing::DeadBand
}
