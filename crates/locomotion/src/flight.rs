use foundation::math::{Ecef, Vec3, ecef_to_geodetic, geodetic_to_ecef};

use crate::camera::CameraState;
use crate::config::FlightConfig;
use crate::controller::{
    ControllerContext, ControllerCore, ControllerKind, Lifecycle, LocomotionController,
    PhysicsState, Simulation, dispose_sim, initialize_sim, run_frame,
};
use crate::error::ControllerError;
use crate::input::{InputHub, KeyCode};
use crate::viewer::Viewer;

const FORWARD: &[KeyCode] = &[KeyCode::KeyW, KeyCode::ArrowUp];
const BACKWARD: &[KeyCode] = &[KeyCode::KeyS, KeyCode::ArrowDown];
const RIGHT: &[KeyCode] = &[KeyCode::KeyD, KeyCode::ArrowRight];
const LEFT: &[KeyCode] = &[KeyCode::KeyA, KeyCode::ArrowLeft];
const ASCEND: &[KeyCode] = &[KeyCode::KeyE, KeyCode::Space];
const DESCEND: &[KeyCode] = &[KeyCode::KeyQ, KeyCode::ControlLeft, KeyCode::ControlRight];
const BOOST: &[KeyCode] = &[KeyCode::ShiftLeft, KeyCode::ShiftRight];

const STOP_SPEED: f64 = 0.01;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
struct Thrust {
    forward: f64,
    strafe: f64,
    vertical: f64,
    boost: bool,
}

impl Thrust {
    fn is_idle(&self) -> bool {
        self.forward == 0.0 && self.strafe == 0.0 && self.vertical == 0.0
    }
}

#[derive(Debug)]
pub struct FlightController {
    core: ControllerCore,
    config: FlightConfig,
}

/// Clamp horizontal and vertical parts of `v` independently.
fn clamp_velocity(v: Vec3, up: Vec3, max_horizontal: f64, max_vertical: f64) -> Vec3 {
    let vertical = v.dot(up).clamp(-max_vertical, max_vertical);
    let mut horizontal = v.reject_from(up);
    let len = horizontal.length();
    if len > max_horizontal {
        horizontal = horizontal * (max_horizontal / len);
    }
    horizontal + up * vertical
}

impl FlightController {
    pub fn new(hub: InputHub, config: FlightConfig) -> Self {
        Self {
            core: ControllerCore::new(ControllerKind::Flight, hub),
            config,
        }
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: FlightConfig) {
        self.config = config;
    }

    pub fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn read_thrust(&self) -> Thrust {
        self.core.input.with_state(|s| Thrust {
            forward: s.axis(FORWARD, BACKWARD),
            strafe: s.axis(RIGHT, LEFT),
            vertical: s.axis(ASCEND, DESCEND),
            boost: s.any_down(BOOST),
        })
    }
}

impl Simulation for FlightController {
    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControllerCore {
        &mut self.core
    }

    fn reset_model(&mut self) {}

    fn debug_enabled(&self) -> bool {
        self.config.debug
    }

    fn step(&mut self, viewer: &dyn Viewer, h: f64) -> Result<(), ControllerError> {
        let cfg = &self.config;
        let (dyaw, dpitch) = self.core.take_look(cfg.sensitivity);
        let thrust = self.read_thrust();

        let mut camera = self.core.camera;
        let mut physics = self.core.physics;

        let yaw = camera.yaw + dyaw;
        let pitch = camera.pitch + dpitch;
        let frame = camera.frame();
        let forward = frame.heading_vector(yaw);
        let right = forward.cross(frame.up);
        let boost = if thrust.boost { cfg.boost_multiplier } else { 1.0 };

        let damping = if thrust.is_idle() {
            cfg.idle_damping
        } else {
            cfg.thrust_damping
        };
        let mut velocity = physics.velocity * damping;
        physics.friction = damping;

        if let Some(dir) = (forward * thrust.forward + right * thrust.strafe).try_normalize() {
            velocity += dir * (cfg.acceleration * boost * h);
        }
        velocity += frame.up * (thrust.vertical * cfg.vertical_acceleration * boost * h);
        velocity = clamp_velocity(
            velocity,
            frame.up,
            cfg.max_horizontal_speed * boost,
            cfg.max_vertical_speed * boost,
        );
        if thrust.is_idle() && velocity.length() < STOP_SPEED {
            velocity = Vec3::ZERO;
        }

        let mut geo = ecef_to_geodetic(Ecef::from(camera.position + velocity * h));
        physics.grounded = false;
        let terrain = viewer
            .terrain_height(geo.lon_deg(), geo.lat_deg())
            .filter(|t| t.is_finite());
        if let Some(terrain) = terrain {
            let floor = terrain + cfg.min_clearance + cfg.eye_height;
            if geo.alt_m < floor {
                geo.alt_m = floor;
                let descent = velocity.dot(frame.up);
                if descent < 0.0 {
                    velocity = velocity - frame.up * descent;
                }
                physics.grounded = true;
            }
        }

        camera.position = geodetic_to_ecef(geo).to_vec3();
        camera.orient(yaw, pitch);
        physics.vertical_velocity = velocity.dot(frame.up);
        physics.velocity = velocity;

        if !camera.is_finite() || !velocity.is_finite() {
            return Err(ControllerError::NonFiniteState { stage: "flight" });
        }

        self.core.camera = camera;
        self.core.physics = physics;
        Ok(())
    }
}

impl LocomotionController for FlightController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Flight
    }

    fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    fn camera(&self) -> &CameraState {
        &self.core.camera
    }

    fn physics(&self) -> &PhysicsState {
        &self.core.physics
    }

    fn initialize(&mut self, ctx: &mut ControllerContext<'_>) {
        initialize_sim(self, ctx);
    }

    fn update(&mut self, ctx: &mut ControllerContext<'_>, dt_s: f64) {
        run_frame(self, ctx, dt_s);
    }

    fn dispose(&mut self, ctx: &mut ControllerContext<'_>) {
        dispose_sim(self, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::{FlightController, clamp_velocity};
    use crate::config::FlightConfig;
    use crate::controller::{ControllerContext, LocomotionController};
    use crate::input::{InputEvent, InputHub, KeyCode};
    use crate::sim::{SimViewer, Terrain};
    use foundation::math::Vec3;
    use runtime::fixed_step::DEFAULT_STEP_S;
    use runtime::metrics::NoopMetrics;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn airborne(viewer: &mut SimViewer, hub: &InputHub) -> FlightController {
        let mut metrics = NoopMetrics;
        let mut drone = FlightController::new(hub.clone(), FlightConfig::default());
        drone.initialize(&mut ControllerContext {
            viewer,
            metrics: &mut metrics,
        });
        drone
    }

    fn run(drone: &mut FlightController, viewer: &mut SimViewer, steps: usize) {
        let mut metrics = NoopMetrics;
        let mut ctx = ControllerContext {
            viewer,
            metrics: &mut metrics,
        };
        for _ in 0..steps {
            drone.update(&mut ctx, DEFAULT_STEP_S);
        }
    }

    #[test]
    fn descent_stops_at_terrain_floor() {
        let hub = InputHub::new();
        let mut viewer = SimViewer::at(11.0, 47.0, 520.0, 0.0, 0.0);
        viewer.terrain = Terrain::Flat { height: 500.0 };
        let mut drone = airborne(&mut viewer, &hub);
        hub.dispatch(&InputEvent::KeyDown { key: KeyCode::KeyQ });

        let mut clamped = false;
        for _ in 0..600 {
            run(&mut drone, &mut viewer, 1);
            assert!(drone.camera().geodetic().alt_m >= 500.0 + 2.0 + 1.7 - 1e-6);
            if drone.physics().grounded && !clamped {
                assert_close(drone.physics().vertical_velocity, 0.0, 1e-9);
                clamped = true;
            }
        }
        assert!(clamped);
        assert_close(drone.camera().geodetic().alt_m, 503.7, 1e-6);
        assert!(drone.physics().vertical_velocity >= -1e-9);
        assert!(drone.physics().grounded);
    }

    #[test]
    fn no_floor_without_terrain() {
        let hub = InputHub::new();
        let mut viewer = SimViewer::at(11.0, 47.0, 3.0, 0.0, 0.0);
        viewer.terrain = Terrain::Unloaded;
        let mut drone = airborne(&mut viewer, &hub);
        hub.dispatch(&InputEvent::KeyDown { key: KeyCode::KeyQ });
        run(&mut drone, &mut viewer, 240);
        assert!(drone.camera().geodetic().alt_m < 0.0);
    }

    #[test]
    fn speeds_are_capped_per_axis() {
        let up = Vec3::Z;
        let v = clamp_velocity(Vec3::new(40.0, 30.0, -20.0), up, 30.0, 12.0);
        assert_close(Vec3::new(v.x, v.y, 0.0).length(), 30.0, 1e-12);
        assert_close(v.z, -12.0, 1e-12);
    }

    #[test]
    fn boosted_thrust_reaches_boosted_cap() {
        let hub = InputHub::new();
        let mut viewer = SimViewer::at(0.0, 0.0, 1000.0, 45.0, 0.0);
        let mut drone = airborne(&mut viewer, &hub);
        hub.dispatch(&InputEvent::KeyDown { key: KeyCode::KeyW });
        hub.dispatch(&InputEvent::KeyDown { key: KeyCode::ShiftLeft });
        run(&mut drone, &mut viewer, 600);
        assert_close(drone.physics().velocity.length(), 90.0, 1e-4);
    }

    #[test]
    fn idle_drone_comes_to_rest() {
        let hub = InputHub::new();
        let mut viewer = SimViewer::at(0.0, 0.0, 1000.0, 0.0, 0.0);
        let mut drone = airborne(&mut viewer, &hub);
        hub.dispatch(&InputEvent::KeyDown { key: KeyCode::KeyD });
        hub.dispatch(&InputEvent::KeyDown { key: KeyCode::KeyE });
        run(&mut drone, &mut viewer, 240);
        assert!(drone.physics().velocity.length() > 1.0);

        hub.dispatch(&InputEvent::Blur);
        run(&mut drone, &mut viewer, 240);
        assert_eq!(drone.physics().velocity, Vec3::ZERO);
    }

    #[test]
    fn roll_stays_zero_while_looking_around() {
        let hub = InputHub::new();
        let mut viewer = SimViewer::at(30.0, 60.0, 200.0, 0.0, 0.0);
        let mut drone = airborne(&mut viewer, &hub);
        hub.dispatch(&InputEvent::MouseDown);
        for _ in 0..20 {
            hub.dispatch(&InputEvent::MouseMove { dx: 37.0, dy: -11.0 });
            run(&mut drone, &mut viewer, 1);
        }
        let cam = drone.camera();
        // Right stays on the tangent plane.
        assert_close(cam.right.dot(cam.frame().up), 0.0, 1e-9);
    }
}
