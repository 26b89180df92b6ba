use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ground::GroundTuning;

#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid { field: &'static str, reason: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(err) => write!(f, "config parse error: {err}"),
            ConfigError::Invalid { field, reason } => write!(f, "invalid `{field}`: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid { .. } => None,
        }
    }
}

fn ensure(ok: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason })
    }
}

fn positive(v: f64, field: &'static str) -> Result<(), ConfigError> {
    ensure(v.is_finite() && v > 0.0, field, "must be a positive number")
}

fn non_negative(v: f64, field: &'static str) -> Result<(), ConfigError> {
    ensure(v.is_finite() && v >= 0.0, field, "must be zero or positive")
}

fn unit_factor(v: f64, field: &'static str) -> Result<(), ConfigError> {
    ensure((0.0..=1.0).contains(&v), field, "must be within [0, 1]")
}

fn parse<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T, ConfigError> {
    serde_json::from_str(json).map_err(ConfigError::Parse)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Radians of yaw/pitch per pixel of mouse movement.
    pub sensitivity: f64,
    /// Meters per second.
    pub max_speed: f64,
    pub sprint_multiplier: f64,
    /// Meters per second squared toward the wished velocity.
    pub acceleration: f64,
    /// Per-step velocity factor while no movement key is held.
    pub friction: f64,
    /// Meters per second squared, negative is down.
    pub gravity: f64,
    /// Initial upward velocity of a jump (m/s).
    pub jump_force: f64,
    pub eye_height: f64,
    pub crouch_eye_height: f64,
    pub crouch_speed_multiplier: f64,
    /// Extra height added above the eye target.
    pub clearance: f64,
    pub ground: GroundTuning,
    pub debug: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            max_speed: 4.0,
            sprint_multiplier: 2.0,
            acceleration: 20.0,
            friction: 0.88,
            gravity: -9.81,
            jump_force: 5.0,
            eye_height: 1.7,
            crouch_eye_height: 1.0,
            crouch_speed_multiplier: 0.5,
            clearance: 0.0,
            ground: GroundTuning::default(),
            debug: false,
        }
    }
}

impl WalkConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = parse(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative(self.sensitivity, "sensitivity")?;
        positive(self.max_speed, "max_speed")?;
        positive(self.sprint_multiplier, "sprint_multiplier")?;
        positive(self.acceleration, "acceleration")?;
        unit_factor(self.friction, "friction")?;
        ensure(self.gravity.is_finite() && self.gravity <= 0.0, "gravity", "must point down (<= 0)")?;
        non_negative(self.jump_force, "jump_force")?;
        positive(self.eye_height, "eye_height")?;
        positive(self.crouch_eye_height, "crouch_eye_height")?;
        positive(self.crouch_speed_multiplier, "crouch_speed_multiplier")?;
        ensure(self.clearance.is_finite(), "clearance", "must be finite")?;
        validate_ground(&self.ground)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub mass_kg: f64,
    /// Full-throttle tractive force (N).
    pub engine_force_n: f64,
    /// Engine force factor while boosting.
    pub boost_multiplier: f64,
    pub brake_force_n: f64,
    /// Deceleration force while coasting (N).
    pub engine_brake_force_n: f64,
    /// Quadratic aerodynamic drag coefficient (N per (m/s)^2).
    pub drag_coefficient: f64,
    /// Linear viscous damping (N per m/s).
    pub linear_damping: f64,
    pub rolling_resistance_n: f64,
    pub max_forward_speed: f64,
    pub max_reverse_speed: f64,
    /// Speed cap factor while boosting.
    pub boost_speed_multiplier: f64,
    pub wheelbase_m: f64,
    pub max_steer_rad: f64,
    /// Steering slew toward full lock (rad/s).
    pub steer_rate: f64,
    /// Steering slew back to center once released (rad/s).
    pub steer_return_rate: f64,
    pub eye_height: f64,
    pub ground: GroundTuning,
    pub debug: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            mass_kg: 1400.0,
            engine_force_n: 9000.0,
            boost_multiplier: 1.5,
            brake_force_n: 12_000.0,
            engine_brake_force_n: 2800.0,
            drag_coefficient: 0.42,
            linear_damping: 12.0,
            rolling_resistance_n: 150.0,
            max_forward_speed: 40.0,
            max_reverse_speed: 10.0,
            boost_speed_multiplier: 1.5,
            wheelbase_m: 2.7,
            max_steer_rad: 0.6,
            steer_rate: 1.5,
            steer_return_rate: 3.0,
            eye_height: 1.4,
            ground: GroundTuning::default(),
            debug: false,
        }
    }
}

impl DriveConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = parse(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive(self.mass_kg, "mass_kg")?;
        non_negative(self.engine_force_n, "engine_force_n")?;
        positive(self.boost_multiplier, "boost_multiplier")?;
        non_negative(self.brake_force_n, "brake_force_n")?;
        non_negative(self.engine_brake_force_n, "engine_brake_force_n")?;
        non_negative(self.drag_coefficient, "drag_coefficient")?;
        non_negative(self.linear_damping, "linear_damping")?;
        non_negative(self.rolling_resistance_n, "rolling_resistance_n")?;
        positive(self.max_forward_speed, "max_forward_speed")?;
        non_negative(self.max_reverse_speed, "max_reverse_speed")?;
        positive(self.boost_speed_multiplier, "boost_speed_multiplier")?;
        positive(self.wheelbase_m, "wheelbase_m")?;
        ensure(
            self.max_steer_rad.is_finite()
                && self.max_steer_rad >= 0.0
                && self.max_steer_rad < std::f64::consts::FRAC_PI_2,
            "max_steer_rad",
            "must be within [0, PI/2)",
        )?;
        positive(self.steer_rate, "steer_rate")?;
        positive(self.steer_return_rate, "steer_return_rate")?;
        positive(self.eye_height, "eye_height")?;
        validate_ground(&self.ground)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    pub sensitivity: f64,
    /// Horizontal thrust acceleration (m/s^2).
    pub acceleration: f64,
    pub vertical_acceleration: f64,
    pub max_horizontal_speed: f64,
    pub max_vertical_speed: f64,
    /// Thrust and speed-cap factor while boosting.
    pub boost_multiplier: f64,
    /// Per-step velocity factor with no thrust.
    pub idle_damping: f64,
    /// Per-step velocity factor while thrusting.
    pub thrust_damping: f64,
    /// Minimum clearance kept above terrain, below the eye.
    pub min_clearance: f64,
    pub eye_height: f64,
    pub debug: bool,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            sensitivity: 0.002,
            acceleration: 25.0,
            vertical_acceleration: 15.0,
            max_horizontal_speed: 30.0,
            max_vertical_speed: 12.0,
            boost_multiplier: 3.0,
            idle_damping: 0.92,
            thrust_damping: 0.998,
            min_clearance: 2.0,
            eye_height: 1.7,
            debug: false,
        }
    }
}

impl FlightConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = parse(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative(self.sensitivity, "sensitivity")?;
        positive(self.acceleration, "acceleration")?;
        positive(self.vertical_acceleration, "vertical_acceleration")?;
        positive(self.max_horizontal_speed, "max_horizontal_speed")?;
        positive(self.max_vertical_speed, "max_vertical_speed")?;
        positive(self.boost_multiplier, "boost_multiplier")?;
        unit_factor(self.idle_damping, "idle_damping")?;
        unit_factor(self.thrust_damping, "thrust_damping")?;
        non_negative(self.min_clearance, "min_clearance")?;
        non_negative(self.eye_height, "eye_height")
    }
}

fn validate_ground(g: &GroundTuning) -> Result<(), ConfigError> {
    ensure(
        g.smoothing > 0.0 && g.smoothing <= 1.0,
        "ground.smoothing",
        "must be within (0, 1]",
    )?;
    non_negative(g.hysteresis_m, "ground.hysteresis_m")
}

/// One mode's config, as handed to a live controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ModeConfig {
    Walk(WalkConfig),
    Drive(DriveConfig),
    Flight(FlightConfig),
}

impl ModeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ModeConfig::Walk(c) => c.validate(),
            ModeConfig::Drive(c) => c.validate(),
            ModeConfig::Flight(c) => c.validate(),
        }
    }
}

/// Configs of every locomotion mode, as the manager keeps them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfigs {
    pub walk: WalkConfig,
    pub drive: DriveConfig,
    pub flight: FlightConfig,
}

impl ModeConfigs {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = parse(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.walk.validate()?;
        self.drive.validate()?;
        self.flight.validate()
    }

    pub fn set(&mut self, cfg: ModeConfig) {
        match cfg {
            ModeConfig::Walk(c) => self.walk = c,
            ModeConfig::Drive(c) => self.drive = c,
            ModeConfig::Flight(c) => self.flight = c,
        }
    }
}
