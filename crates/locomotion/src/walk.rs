use foundation::math::{Ecef, Geodetic, Vec3, ecef_to_geodetic, geodetic_to_ecef};
use tracing::debug;

use crate::camera::CameraState;
use crate::config::WalkConfig;
use crate::controller::{
    ControllerContext, ControllerCore, ControllerKind, Lifecycle, LocomotionController,
    PhysicsState, Simulation, dispose_sim, initialize_sim, run_frame,
};
use crate::error::ControllerError;
use crate::ground::{Landing, resolve_landing};
use crate::input::{InputHub, KeyCode};
use crate::viewer::Viewer;

const FORWARD: &[KeyCode] = &[KeyCode::KeyW, KeyCode::ArrowUp];
const BACKWARD: &[KeyCode] = &[KeyCode::KeyS, KeyCode::ArrowDown];
const RIGHT: &[KeyCode] = &[KeyCode::KeyD, KeyCode::ArrowRight];
const LEFT: &[KeyCode] = &[KeyCode::KeyA, KeyCode::ArrowLeft];
const JUMP: &[KeyCode] = &[KeyCode::Space];
const CROUCH: &[KeyCode] = &[KeyCode::KeyC, KeyCode::ControlLeft, KeyCode::ControlRight];
const SPRINT: &[KeyCode] = &[KeyCode::ShiftLeft, KeyCode::ShiftRight];

/// Horizontal speed under which an idle walker stops outright (m/s).
const STOP_SPEED: f64 = 0.01;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
struct WalkIntent {
    forward: f64,
    strafe: f64,
    sprint: bool,
    crouch: bool,
    jump: bool,
}

#[derive(Debug)]
pub struct WalkController {
    core: ControllerCore,
    config: WalkConfig,
    crouched: bool,
}

impl WalkController {
    pub fn new(hub: InputHub, config: WalkConfig) -> Self {
        Self {
            core: ControllerCore::new(ControllerKind::Walk, hub),
            config,
            crouched: false,
        }
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: WalkConfig) {
        self.config = config;
    }

    pub fn core(&self) -> &ControllerCore {
        &self.core
    }

    pub fn is_crouched(&self) -> bool {
        self.crouched
    }

    fn read_intent(&self) -> WalkIntent {
        self.core.input.with_state(|s| WalkIntent {
            forward: s.axis(FORWARD, BACKWARD),
            strafe: s.axis(RIGHT, LEFT),
            sprint: s.any_down(SPRINT),
            crouch: s.any_down(CROUCH),
            jump: s.was_pressed(JUMP),
        })
    }
}

impl Simulation for WalkController {
    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ControllerCore {
        &mut self.core
    }

    fn reset_model(&mut self) {
        self.crouched = false;
    }

    fn debug_enabled(&self) -> bool {
        self.config.debug
    }

    fn step(&mut self, viewer: &dyn Viewer, h: f64) -> Result<(), ControllerError> {
        let cfg = &self.config;
        let (dyaw, dpitch) = self.core.take_look(cfg.sensitivity);
        let intent = self.read_intent();

        let mut camera = self.core.camera;
        let mut physics = self.core.physics;
        let mut ground = self.core.ground;

        let yaw = camera.yaw + dyaw;
        let pitch = camera.pitch + dpitch;
        let frame = camera.frame();
        let forward = frame.heading_vector(yaw);
        let right = forward.cross(frame.up);

        let crouched = intent.crouch && physics.grounded;
        let mut max_speed = cfg.max_speed;
        if crouched {
            max_speed *= cfg.crouch_speed_multiplier;
        } else if intent.sprint {
            max_speed *= cfg.sprint_multiplier;
        }

        let mut velocity = physics.velocity.reject_from(frame.up);
        match (forward * intent.forward + right * intent.strafe).try_normalize() {
            Some(wish_dir) => {
                let wish = wish_dir * max_speed;
                let diff = wish - velocity;
                let max_dv = cfg.acceleration * h;
                let len = diff.length();
                velocity = if len <= max_dv {
                    wish
                } else {
                    velocity + diff * (max_dv / len)
                };
                physics.friction = 1.0;
            }
            None => {
                velocity = velocity * cfg.friction;
                physics.friction = cfg.friction;
                if velocity.length() < STOP_SPEED {
                    velocity = Vec3::ZERO;
                }
            }
        }

        let start_alt = camera.geodetic().alt_m;
        let mut alt = start_alt;
        let mut vy = physics.vertical_velocity;
        if intent.jump && physics.grounded && !ground.is_jumping {
            vy = cfg.jump_force;
            physics.grounded = false;
            ground.is_jumping = true;
        }
        if !physics.grounded {
            alt += vy * h + 0.5 * cfg.gravity * h * h;
            vy += cfg.gravity * h;
        }

        let moved = ecef_to_geodetic(Ecef::from(camera.position + velocity * h));
        let raw = viewer.terrain_height(moved.lon_deg(), moved.lat_deg());
        let eye = if crouched { cfg.crouch_eye_height } else { cfg.eye_height };

        ground.was_grounded = physics.grounded;
        match ground.track(raw, eye + cfg.clearance, &cfg.ground) {
            None => {
                alt = start_alt;
                vy = 0.0;
                physics.grounded = true;
                ground.is_jumping = false;
            }
            Some(target) => match resolve_landing(alt, target, vy, ground.is_jumping) {
                Landing::Airborne => physics.grounded = false,
                Landing::Snap => {
                    alt = target;
                    vy = 0.0;
                    physics.grounded = true;
                    ground.is_jumping = false;
                }
                Landing::DeadBand => {
                    vy = 0.0;
                    physics.grounded = true;
                    ground.is_jumping = false;
                }
            },
        }

        camera.position =
            geodetic_to_ecef(Geodetic::new(moved.lat_rad, moved.lon_rad, alt)).to_vec3();
        camera.orient(yaw, pitch);
        physics.velocity = velocity;
        physics.vertical_velocity = vy;

        if !camera.is_finite() || !velocity.is_finite() || !vy.is_finite() {
            return Err(ControllerError::NonFiniteState { stage: "walk" });
        }

        if cfg.debug && ground.was_grounded != physics.grounded {
            debug!(
                "walk: {} at h={alt:.3} vy={vy:.3}",
                if physics.grounded { "landed" } else { "left ground" }
            );
        }

        self.core.camera = camera;
        self.core.physics = physics;
        self.core.ground = ground;
        self.crouched = crouched;
        Ok(())
    }
}

impl LocomotionController for WalkController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Walk
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
