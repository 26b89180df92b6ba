// Locomotion crate: first-person camera controllers for a globe viewer.

pub mod camera;
pub mod config;
pub mod controller;
pub mod drive;
pub mod error;
pub mod flight;
pub mod ground;
pub mod input;
pub mod manager;
pub mod sim;
pub mod viewer;
pub mod walk;

pub use camera::{ApplyGate, CameraState, CameraView, GateOutcome};
pub use config::{ConfigError, DriveConfig, FlightConfig, ModeConfig, ModeConfigs, WalkConfig};
pub use controller::{Controller, ControllerContext, ControllerKind, Lifecycle, LocomotionController};
pub use error::ControllerError;
pub use input::{InputEvent, InputHub, KeyCode};
pub use manager::{CameraMode, ControllerManager};
pub use viewer::{NativeControls, Viewer, ViewerError};
