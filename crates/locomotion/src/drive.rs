use foundation::math::{Ecef, Geodetic, ecef_to_geodetic, geodetic_to_ecef, wrap_angle};
use tracing::debug;

use crate::camera::CameraState;
use crate::config::DriveConfig;
use crate::controller::{
    ControllerContext, ControllerCore, ControllerKind, Lifecycle, LocomotionController,
    PhysicsState, Simulation, dispose_sim, initialize_sim, run_frame,
};
use crate::error::ControllerError;
use crate::input::{InputHub, KeyCode};
use crate::viewer::Viewer;

const THROTTLE: &[KeyCode] = &[KeyCode::KeyW, KeyCode::ArrowUp];
const REVERSE: &[KeyCode] = &[KeyCode::KeyS, KeyCode::ArrowDown];
const STEER_RIGHT: &[KeyCode] = &[KeyCode::KeyD, KeyCode::ArrowRight];
const STEER_LEFT: &[KeyCode] = &[KeyCode::KeyA, KeyCode::ArrowLeft];
const BRAKE: &[KeyCode] = &[KeyCode::Space];
const BOOST: &[KeyCode] = &[KeyCode::ShiftLeft, KeyCode::ShiftRight];

/// Speeds below this snap to zero once the driver lets go (m/s).
const STOP_SPEED: f64 = 0.05;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
struct DriveIntent {
    throttle: f64,
    steer: f64,
    brake: bool,
    boost: bool,
}

/// Kinematic bicycle model: the heading turns at
/// `speed / wheelbase * tan(steer)` and the car sits on the terrain target.
#[derive(Debug)]
pub struct DriveController {
    core: ControllerCore,
    config: DriveConfig,
    /// Signed speed along the heading (m/s), negative when reversing.
    speed: f64,
    steer_angle: f64,
}

fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(target - current)
    }
}

/// New signed speed after one step of longitudinal forces.
fn integrate_speed(cfg: &DriveConfig, speed: f64, intent: DriveIntent, h: f64) -> f64 {
    let boost = if intent.boost { cfg.boost_multiplier } else { 1.0 };
    let engine = intent.throttle * cfg.engine_force_n * boost;

    let brake = if intent.brake { cfg.brake_force_n } else { 0.0 };
    let resist = if speed == 0.0 {
        // At rest, brakes and tyres hold like static friction.
        let hold = cfg.rolling_resistance_n + brake;
        if engine.abs() <= hold {
            return 0.0;
        }
        -hold.copysign(engine)
    } else {
        let mut resist = cfg.drag_coefficient * speed * speed
            + cfg.linear_damping * speed.abs()
            + cfg.rolling_resistance_n
            + brake;
        if intent.throttle == 0.0 {
            resist += cfg.engine_brake_force_n;
        }
        -resist.copysign(speed)
    };

    let mut next = speed + (engine + resist) / cfg.mass_kg * h;

    // Coasting or braking through zero stops the car instead of reversing it.
    let engine_along_motion = intent.throttle * speed >= 0.0;
    if speed != 0.0 && next.signum() != speed.signum() && engine_along_motion {
        next = 0.0;
    }

    let boost_cap = if intent.boost { cfg.boost_speed_multiplier } else { 1.0 };
    next = next.clamp(-cfg.max_reverse_speed, cfg.max_forward_speed * boost_cap);

    if intent.throttle == 0.0 && next.abs() < STOP_SPEED {
        next = 0.0;
    }
    next
}

impl DriveController {
    pub fn new(hub: InputHub, config: DriveConfig) -> Self {
        Self {
            core: ControllerCore::new(ControllerKind::Drive, hub),
            config,
            speed: 0.0,
            steer_angle: 0.0,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DriveConfig) {
        self.config = config;
    }

    pub fn core(&self) -> &ControllerCore {
        &self.core
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn steer_angle(&self) -> f64 {
        self.steer_angle
    }

    fn read_intent(&self) -> DriveIntent {
        self.core.input.with_state(|s| DriveIntent {
            throttle: s.axis(THROTTLE, REVERSE),
            steer: s.axis(STEER_RIGHT, STEER_LEFT),
            brake: s.any_down(BRAKE),
            boost: s.any_down(BOOST),
        })
    }
}

impl Simulation for DriveController {
    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControllerCore {
        &mut self.core
    }

    fn reset_model(&mut self) {
        self.speed = 0.0;
        self.steer_angle = 0.0;
        // The car sits level on the heading it was entered with.
        let camera = &mut self.core.camera;
        let yaw = camera.yaw;
        camera.orient(yaw, 0.0);
    }

    fn debug_enabled(&self) -> bool {
        self.config.debug
    }

    fn step(&mut self, viewer: &dyn Viewer, h: f64) -> Result<(), ControllerError> {
        let cfg = &self.config;
        // No mouse look while driving; drop whatever accumulated.
        self.core.take_look(0.0);
        let intent = self.read_intent();

        let steer_target = intent.steer * cfg.max_steer_rad;
        let steer_rate = if intent.steer != 0.0 {
            cfg.steer_rate
        } else {
            cfg.steer_return_rate
        };
        let steer_angle = approach(self.steer_angle, steer_target, steer_rate * h);

        let speed = integrate_speed(cfg, self.speed, intent, h);

        let mut camera = self.core.camera;
        let mut physics = self.core.physics;
        let mut ground = self.core.ground;

        let yaw = wrap_angle(camera.yaw + speed / cfg.wheelbase_m * steer_angle.tan() * h);
        let frame = camera.frame();
        let forward = frame.heading_vector(yaw);

        let start_alt = camera.geodetic().alt_m;
        let moved = ecef_to_geodetic(Ecef::from(camera.position + forward * (speed * h)));
        let raw = viewer.terrain_height(moved.lon_deg(), moved.lat_deg());
        let alt = ground
            .track(raw, cfg.eye_height, &cfg.ground)
            .unwrap_or(start_alt);

        camera.position =
            geodetic_to_ecef(Geodetic::new(moved.lat_rad, moved.lon_rad, alt)).to_vec3();
        camera.orient(yaw, 0.0);

        physics.velocity = forward * speed;
        physics.vertical_velocity = 0.0;
        physics.grounded = true;
        ground.was_grounded = true;

        if !camera.is_finite() || !speed.is_finite() || !steer_angle.is_finite() {
            return Err(ControllerError::NonFiniteState { stage: "drive" });
        }

        if cfg.debug && speed != self.speed && speed == 0.0 {
            debug!("drive: stopped at yaw={yaw:.4}");
        }

        self.core.camera = camera;
        self.core.physics = physics;
        self.core.ground = ground;
        self.speed = speed;
        self.steer_angle = steer_angle;
        Ok(())
    }
}

impl LocomotionController for DriveController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Drive
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
