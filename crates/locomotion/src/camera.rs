use std::f64::consts::FRAC_PI_2;

use foundation::math::{
    Ecef, EnuFrame, Geodetic, Vec3, cos_deg, ecef_to_geodetic, geodetic_to_ecef, wrap_angle,
};

use crate::viewer::Viewer;

/// Margin kept from straight up/down so the tangent heading stays defined.
pub const PITCH_MARGIN_RAD: f64 = 0.01;
pub const PITCH_LIMIT_RAD: f64 = FRAC_PI_2 - PITCH_MARGIN_RAD;

/// Writes closer than this to the last applied position are skipped...
pub const GATE_POSITION_EPSILON_M: f64 = 0.01;
/// ...unless direction or up turned by more than this.
pub const GATE_ANGLE_EPSILON_DEG: f64 = 0.1;

pub fn clamp_pitch(pitch: f64) -> f64 {
    pitch.clamp(-PITCH_LIMIT_RAD, PITCH_LIMIT_RAD)
}

/// What the renderer receives.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
}

impl CameraView {
    /// Camera at a geodetic position looking along `yaw`/`pitch`.
    pub fn looking(geo: Geodetic, yaw: f64, pitch: f64) -> Self {
        let frame = EnuFrame::at_geodetic(geo);
        let basis = frame.look_basis(yaw, clamp_pitch(pitch));
        Self {
            position: geodetic_to_ecef(geo).to_vec3(),
            direction: basis.direction,
            up: basis.up,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.direction.is_finite() && self.up.is_finite()
    }
}

/// Full controller-side camera state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    /// Heading, clockwise from local north, in `(-PI, PI]`.
    pub yaw: f64,
    /// Elevation above the tangent plane, within `±PITCH_LIMIT_RAD`.
    pub pitch: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::at(Geodetic::new(0.0, 0.0, 0.0), 0.0, 0.0)
    }
}

impl CameraState {
    pub fn at(geo: Geodetic, yaw: f64, pitch: f64) -> Self {
        let mut state = Self {
            position: geodetic_to_ecef(geo).to_vec3(),
            direction: Vec3::ZERO,
            up: Vec3::ZERO,
            right: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
        };
        state.orient(yaw, pitch);
        state
    }

    /// Adopt a renderer pose. Yaw/pitch are recovered in the tangent frame at
    /// the view position; roll is discarded.
    pub fn from_view(view: &CameraView) -> Option<Self> {
        if !view.is_finite() {
            return None;
        }
        let frame = EnuFrame::at(view.position);
        let (yaw, pitch) = frame.yaw_pitch_of(view.direction)?;
        let mut state = Self {
            position: view.position,
            ..Self::default()
        };
        state.orient(yaw, pitch);
        Some(state)
    }

    pub fn geodetic(&self) -> Geodetic {
        ecef_to_geodetic(Ecef::from(self.position))
    }

    pub fn frame(&self) -> EnuFrame {
        EnuFrame::at(self.position)
    }

    /// Rebuild direction/up/right from yaw/pitch against the tangent frame at
    /// the current position.
    pub fn orient(&mut self, yaw: f64, pitch: f64) {
        self.yaw = wrap_angle(yaw);
        self.pitch = clamp_pitch(pitch);
        let basis = self.frame().look_basis(self.yaw, self.pitch);
        self.direction = basis.direction;
        self.up = basis.up;
        self.right = basis.right;
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            position: self.position,
            direction: self.direction,
            up: self.up,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.direction.is_finite()
            && self.up.is_finite()
            && self.right.is_finite()
            && self.yaw.is_finite()
            && self.pitch.is_finite()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Written,
    Skipped,
    /// Non-finite pose, never forwarded.
    Rejected,
}

/// Change detector in front of [`Viewer::set_view`].
///
/// Holds the last pose actually written, per controller instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyGate {
    last: Option<CameraView>,
    position_epsilon_m: f64,
    min_cos: f64,
}

impl Default for ApplyGate {
    fn default() -> Self {
        Self::new(GATE_POSITION_EPSILON_M, GATE_ANGLE_EPSILON_DEG)
    }
}

impl ApplyGate {
    pub fn new(position_epsilon_m: f64, angle_epsilon_deg: f64) -> Self {
        Self {
            last: None,
            position_epsilon_m,
            min_cos: cos_deg(angle_epsilon_deg),
        }
    }

    pub fn last_applied(&self) -> Option<&CameraView> {
        self.last.as_ref()
    }

    /// Forget the last write so the next pose is always applied.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn is_meaningful_change(&self, view: &CameraView) -> bool {
        let Some(last) = &self.last else {
            return true;
        };
        let moved = last.position.distance(view.position) >= self.position_epsilon_m;
        let turned = last.direction.dot(view.direction) < self.min_cos
            || last.up.dot(view.up) < self.min_cos;
        moved || turned
    }

    pub fn apply(&mut self, viewer: &mut dyn Viewer, view: &CameraView) -> GateOutcome {
        if !view.is_finite() {
            return GateOutcome::Rejected;
        }
        if !self.is_meaningful_change(view) {
            return GateOutcome::Skipped;
        }
        viewer.set_view(view);
        self.last = Some(*view);
        GateOutcome::Written
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplyGate, CameraState, CameraView, GateOutcome, PITCH_LIMIT_RAD};
    use crate::sim::SimViewer;
    use foundation::math::{Geodetic, Vec3};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn orientation_stays_orthonormal_after_orient() {
        let mut cam = CameraState::at(Geodetic::from_degrees(-70.0, -33.0, 800.0), 0.3, 0.2);
        cam.orient(2.5, -1.2);
        assert_close(cam.direction.length(), 1.0, 1e-12);
        assert_close(cam.up.length(), 1.0, 1e-12);
        assert_close(cam.right.length(), 1.0, 1e-12);
        assert_close(cam.direction.dot(cam.up), 0.0, 1e-12);
        assert_close(cam.direction.dot(cam.right), 0.0, 1e-12);
    }

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let mut cam = CameraState::default();
        cam.orient(0.0, 10.0);
        assert_eq!(cam.pitch, PITCH_LIMIT_RAD);
        cam.orient(0.0, -10.0);
        assert_eq!(cam.pitch, -PITCH_LIMIT_RAD);
    }

    #[test]
    fn from_view_recovers_yaw_and_pitch() {
        let geo = Geodetic::from_degrees(139.69, 35.68, 40.0);
        let view = CameraView::looking(geo, -2.0, 0.35);
        let cam = CameraState::from_view(&view).expect("finite view");
        assert_close(cam.yaw, -2.0, 1e-9);
        assert_close(cam.pitch, 0.35, 1e-9);
        assert_close(cam.geodetic().alt_m, 40.0, 1e-6);
    }

    #[test]
    fn from_view_rejects_nan() {
        let mut view = CameraView::looking(Geodetic::from_degrees(0.0, 0.0, 0.0), 0.0, 0.0);
        view.direction = Vec3::new(f64::NAN, 0.0, 0.0);
        assert!(CameraState::from_view(&view).is_none());
    }

    #[test]
    fn near_identical_poses_produce_one_write() {
        let mut viewer = SimViewer::flat(0.0);
        let mut gate = ApplyGate::default();
        let geo = Geodetic::from_degrees(2.35, 48.85, 35.0);
        let a = CameraView::looking(geo, 1.0, 0.1);
        // 5 mm and 0.05 degrees away.
        let b = CameraView::looking(geo.with_alt(35.005), 1.0 + 0.05f64.to_radians(), 0.1);

        assert_eq!(gate.apply(&mut viewer, &a), GateOutcome::Written);
        assert_eq!(gate.apply(&mut viewer, &b), GateOutcome::Skipped);
        assert_eq!(viewer.write_count(), 1);
    }

    #[test]
    fn real_motion_or_rotation_is_written() {
        let mut viewer = SimViewer::flat(0.0);
        let mut gate = ApplyGate::default();
        let geo = Geodetic::from_degrees(2.35, 48.85, 35.0);
        let a = CameraView::looking(geo, 1.0, 0.1);
        let moved = CameraView::looking(geo.with_alt(35.02), 1.0, 0.1);
        let turned = CameraView::looking(geo.with_alt(35.02), 1.0 + 0.5f64.to_radians(), 0.1);

        gate.apply(&mut viewer, &a);
        assert_eq!(gate.apply(&mut viewer, &moved), GateOutcome::Written);
        assert_eq!(gate.apply(&mut viewer, &turned), GateOutcome::Written);
        assert_eq!(viewer.write_count(), 3);
    }

    #[test]
    fn non_finite_pose_is_never_written() {
        let mut viewer = SimViewer::flat(0.0);
        let mut gate = ApplyGate::default();
        let mut bad = CameraView::looking(Geodetic::from_degrees(0.0, 0.0, 0.0), 0.0, 0.0);
        bad.position = Vec3::new(f64::INFINITY, 0.0, 0.0);
        assert_eq!(gate.apply(&mut viewer, &bad), GateOutcome::Rejected);
        assert_eq!(viewer.write_count(), 0);
        assert!(gate.last_applied().is_none());
    }
}
