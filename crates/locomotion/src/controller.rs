//! Shared controller core and the `LocomotionController` capability.
//!
//! Each concrete controller composes a [`ControllerCore`] (camera, physics,
//! ground, input, apply-gate, fixed-step accumulator, lifecycle) and supplies
//! its own fixed-step integration. The frame loop around that step is the
//! same for every mode and lives in [`run_frame`].

use foundation::math::Vec3;
use runtime::fixed_step::FixedStep;
use runtime::metrics::MetricsPort;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::camera::{ApplyGate, CameraState, GateOutcome};
use crate::config::{ModeConfig, ModeConfigs};
use crate::drive::DriveController;
use crate::error::ControllerError;
use crate::flight::FlightController;
use crate::ground::GroundState;
use crate::input::{InputAdapter, InputHub};
use crate::viewer::{NativeControls, Viewer};
use crate::walk::WalkController;

/// Collaborators a controller may touch during a lifecycle call.
pub struct ControllerContext<'a> {
    pub viewer: &'a mut dyn Viewer,
    pub metrics: &'a mut dyn MetricsPort,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    Walk,
    Drive,
    Flight,
}

impl ControllerKind {
    pub fn label(self) -> &'static str {
        match self {
            ControllerKind::Walk => "walk",
            ControllerKind::Drive => "drive",
            ControllerKind::Flight => "flight",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Enabled,
    Disposed,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PhysicsState {
    /// World-space velocity (m/s). Tangent to the surface for ground modes.
    pub velocity: Vec3,
    pub grounded: bool,
    /// Along local up (m/s).
    pub vertical_velocity: f64,
    /// Per-step friction factor in effect.
    pub friction: f64,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            grounded: true,
            vertical_velocity: 0.0,
            friction: 1.0,
        }
    }
}

/// State and plumbing shared by all locomotion controllers.
#[derive(Debug)]
pub struct ControllerCore {
    pub camera: CameraState,
    pub physics: PhysicsState,
    pub ground: GroundState,
    pub input: InputAdapter,
    gate: ApplyGate,
    stepper: FixedStep,
    lifecycle: Lifecycle,
    saved_controls: Option<NativeControls>,
    kind: ControllerKind,
}

impl ControllerCore {
    pub fn new(kind: ControllerKind, hub: InputHub) -> Self {
        Self {
            camera: CameraState::default(),
            physics: PhysicsState::default(),
            ground: GroundState::default(),
            input: InputAdapter::new(hub),
            gate: ApplyGate::default(),
            stepper: FixedStep::default(),
            lifecycle: Lifecycle::Uninitialized,
            saved_controls: None,
            kind,
        }
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle == Lifecycle::Enabled
    }

    pub fn gate(&self) -> &ApplyGate {
        &self.gate
    }

    pub fn stepper(&self) -> &FixedStep {
        &self.stepper
    }

    /// Take over the viewer camera: seed from the current view, disable
    /// native controls, start listening for input.
    pub fn enable(&mut self, viewer: &mut dyn Viewer) -> Result<(), ControllerError> {
        if self.is_enabled() {
            return Ok(());
        }
        if !viewer.is_ready() {
            return Err(ControllerError::ViewerNotReady);
        }

        if let Some(cam) = viewer
            .current_view()
            .as_ref()
            .and_then(CameraState::from_view)
        {
            self.camera = cam;
        }

        self.saved_controls = Some(viewer.native_controls());
        viewer.set_native_controls(NativeControls::ALL_DISABLED);
        self.input.attach();

        self.gate.reset();
        self.stepper.reset();
        self.ground.reset();
        self.physics = PhysicsState::default();
        self.lifecycle = Lifecycle::Enabled;
        Ok(())
    }

    /// Give the camera back. Returns `false` if there was nothing to undo.
    pub fn disable(&mut self, viewer: &mut dyn Viewer) -> bool {
        if !self.is_enabled() {
            self.lifecycle = Lifecycle::Disposed;
            return false;
        }

        if self.input.state().pointer_locked() {
            viewer.exit_pointer_lock();
        }
        self.input.detach();
        viewer.set_native_controls(
            self.saved_controls
                .take()
                .unwrap_or(NativeControls::ALL_ENABLED),
        );
        self.gate.reset();
        self.lifecycle = Lifecycle::Disposed;
        true
    }

    /// Consume accumulated mouse movement as `(yaw, pitch)` deltas in radians.
    /// Movement while neither locked nor dragging is discarded.
    pub fn take_look(&self, sensitivity: f64) -> (f64, f64) {
        self.input.with_state(|s| {
            let (dx, dy) = s.take_mouse_delta();
            if s.look_active() {
                (dx * sensitivity, -dy * sensitivity)
            } else {
                (0.0, 0.0)
            }
        })
    }

    /// Forward a pending mouse-down lock request to the render surface.
    pub fn service_pointer_lock(&mut self, viewer: &mut dyn Viewer) -> Result<(), ControllerError> {
        if self.input.with_state(|s| s.take_lock_request()) {
            viewer.request_pointer_lock()?;
        }
        Ok(())
    }

    /// Push the camera through the apply-gate.
    pub fn present(&mut self, ctx: &mut ControllerContext<'_>) -> GateOutcome {
        let outcome = self.gate.apply(ctx.viewer, &self.camera.view());
        match outcome {
            GateOutcome::Written => ctx.metrics.inc_counter("camera.writes", 1),
            GateOutcome::Skipped => ctx.metrics.inc_counter("camera.writes_skipped", 1),
            GateOutcome::Rejected => ctx.metrics.inc_counter("camera.writes_rejected", 1),
        }
        outcome
    }
}

/// Lifecycle capability every locomotion mode provides.
pub trait LocomotionController {
    fn kind(&self) -> ControllerKind;

    fn lifecycle(&self) -> Lifecycle;

    fn camera(&self) -> &CameraState;

    fn physics(&self) -> &PhysicsState;

    /// Attach input and take over the camera. Never fails outward: if the
    /// viewer is not ready the controller stays inert.
    fn initialize(&mut self, ctx: &mut ControllerContext<'_>);

    /// Advance by one render frame of `dt_s` seconds. No-op unless enabled.
    fn update(&mut self, ctx: &mut ControllerContext<'_>, dt_s: f64);

    /// Detach input and restore native controls. Idempotent.
    fn dispose(&mut self, ctx: &mut ControllerContext<'_>);

    fn is_enabled(&self) -> bool {
        self.lifecycle() == Lifecycle::Enabled
    }
}

/// Per-mode hooks used by the shared lifecycle helpers below.
pub(crate) trait Simulation {
    fn core(&self) -> &ControllerCore;

    fn core_mut(&mut self) -> &mut ControllerCore;

    /// Reset mode-specific state after the core took over the camera.
    fn reset_model(&mut self);

    /// Integrate one fixed step. On error nothing may have been committed.
    fn step(&mut self, viewer: &dyn Viewer, h: f64) -> Result<(), ControllerError>;

    fn debug_enabled(&self) -> bool;
}

pub(crate) fn initialize_sim<S: Simulation>(sim: &mut S, ctx: &mut ControllerContext<'_>) {
    let label = sim.core().kind().label();
    match sim.core_mut().enable(ctx.viewer) {
        Ok(()) => {
            sim.reset_model();
            info!("{label} controller enabled");
        }
        Err(err) => warn!("{label} controller left inert: {err}"),
    }
}

pub(crate) fn dispose_sim<S: Simulation>(sim: &mut S, ctx: &mut ControllerContext<'_>) {
    if sim.core_mut().disable(ctx.viewer) {
        info!("{} controller disposed", sim.core().kind().label());
    }
}

/// One render frame: pointer-lock bridging, fixed sub-steps, then the gated
/// camera write.
pub(crate) fn run_frame<S: Simulation>(sim: &mut S, ctx: &mut ControllerContext<'_>, dt_s: f64) {
    if !sim.core().is_enabled() {
        return;
    }
    let label = sim.core().kind().label();

    if let Err(err) = sim.core_mut().service_pointer_lock(ctx.viewer) {
        warn!("{label} controller: {err}; falling back to drag-look");
    }

    let mut stepper = sim.core().stepper;
    let mut dropped = 0u64;
    let viewer: &dyn Viewer = &*ctx.viewer;
    let summary = stepper.advance(dt_s, |h| {
        if let Err(err) = sim.step(viewer, h) {
            dropped += 1;
            debug!("{label} step dropped: {err}");
        }
    });
    sim.core_mut().stepper = stepper;

    ctx.metrics.inc_counter("physics.steps", u64::from(summary.steps));
    ctx.metrics
        .record_histogram("physics.steps_per_frame", i64::from(summary.steps));
    if dropped > 0 {
        ctx.metrics.inc_counter("physics.steps_dropped", dropped);
    }
    if summary.clamped {
        ctx.metrics.inc_counter("physics.frames_clamped", 1);
    }
    if summary.steps > 0 {
        sim.core().input.with_state(|s| s.clear_pressed());
    }

    let outcome = sim.core_mut().present(ctx);
    if sim.debug_enabled() {
        let cam = &sim.core().camera;
        let geo = cam.geodetic();
        debug!(
            "{label}: steps={} lon={:.7} lat={:.7} h={:.3} yaw={:.4} pitch={:.4} grounded={} write={:?}",
            summary.steps,
            geo.lon_deg(),
            geo.lat_deg(),
            geo.alt_m,
            cam.yaw,
            cam.pitch,
            sim.core().physics.grounded,
            outcome
        );
    }
}

/// The tagged set of locomotion controllers a manager can run.
#[derive(Debug)]
pub enum Controller {
    Walk(WalkController),
    Drive(DriveController),
    Flight(FlightController),
}

impl Controller {
    pub fn new(kind: ControllerKind, hub: InputHub, configs: &ModeConfigs) -> Self {
        match kind {
            ControllerKind::Walk => Controller::Walk(WalkController::new(hub, configs.walk.clone())),
            ControllerKind::Drive => {
                Controller::Drive(DriveController::new(hub, configs.drive.clone()))
            }
            ControllerKind::Flight => {
                Controller::Flight(FlightController::new(hub, configs.flight.clone()))
            }
        }
    }

    /// Swap the config snapshot in place. Returns `false` when the config is
    /// for a different mode.
    pub fn set_config(&mut self, cfg: ModeConfig) -> bool {
        match (self, cfg) {
            (Controller::Walk(c), ModeConfig::Walk(cfg)) => c.set_config(cfg),
            (Controller::Drive(c), ModeConfig::Drive(cfg)) => c.set_config(cfg),
            (Controller::Flight(c), ModeConfig::Flight(cfg)) => c.set_config(cfg),
            _ => return false,
        }
        true
    }

    fn as_dyn(&self) -> &dyn LocomotionController {
        match self {
            Controller::Walk(c) => c,
            Controller::Drive(c) => c,
            Controller::Flight(c) => c,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn LocomotionController {
        match self {
            Controller::Walk(c) => c,
            Controller::Drive(c) => c,
            Controller::Flight(c) => c,
        }
    }
}

impl LocomotionController for Controller {
    fn kind(&self) -> ControllerKind {
        self.as_dyn().kind()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.as_dyn().lifecycle()
    }

    fn camera(&self) -> &CameraState {
        self.as_dyn().camera()
    }

    fn physics(&self) -> &PhysicsState {
        self.as_dyn().physics()
    }

    fn initialize(&mut self, ctx: &mut ControllerContext<'_>) {
        self.as_dyn_mut().initialize(ctx);
    }

    fn update(&mut self, ctx: &mut ControllerContext<'_>, dt_s: f64) {
        self.as_dyn_mut().update(ctx, dt_s);
    }

    fn dispose(&mut self, ctx: &mut ControllerContext<'_>) {
        self.as_dyn_mut().dispose(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::{ControllerContext, ControllerCore, ControllerKind, Lifecycle};
    use crate::input::{InputEvent, InputHub};
    use crate::sim::SimViewer;
    use crate::viewer::{NativeControls, Viewer};
    use runtime::metrics::{Metrics, MetricsPort};

    #[test]
    fn enable_requires_ready_viewer() {
        let hub = InputHub::new();
        let mut core = ControllerCore::new(ControllerKind::Walk, hub.clone());
        let mut viewer = SimViewer::flat(0.0);
        viewer.ready = false;

        assert!(core.enable(&mut viewer).is_err());
        assert_eq!(core.lifecycle(), Lifecycle::Uninitialized);
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(viewer.native_controls(), NativeControls::ALL_ENABLED);
    }

    #[test]
    fn disable_restores_controls_and_is_idempotent() {
        let hub = InputHub::new();
        let mut core = ControllerCore::new(ControllerKind::Flight, hub.clone());
        let mut viewer = SimViewer::flat(0.0);
        let custom = NativeControls {
            tilt: false,
            ..NativeControls::ALL_ENABLED
        };
        viewer.set_native_controls(custom);

        core.enable(&mut viewer).expect("ready viewer");
        assert_eq!(viewer.native_controls(), NativeControls::ALL_DISABLED);
        assert_eq!(hub.listener_count(), 1);

        assert!(core.disable(&mut viewer));
        assert!(!core.disable(&mut viewer));
        assert_eq!(viewer.native_controls(), custom);
        assert_eq!(hub.listener_count(), 0);
        assert_eq!(core.lifecycle(), Lifecycle::Disposed);
    }

    #[test]
    fn dispose_exits_pointer_lock() {
        let hub = InputHub::new();
        let mut core = ControllerCore::new(ControllerKind::Walk, hub.clone());
        let mut viewer = SimViewer::flat(0.0);
        core.enable(&mut viewer).expect("ready viewer");

        hub.dispatch(&InputEvent::MouseDown);
        core.service_pointer_lock(&mut viewer).expect("lock available");
        assert!(viewer.pointer_locked);
        hub.dispatch(&InputEvent::PointerLockChanged { locked: true });

        core.disable(&mut viewer);
        assert!(!viewer.pointer_locked);
    }

    #[test]
    fn missing_render_surface_is_reported_not_fatal() {
        let hub = InputHub::new();
        let mut core = ControllerCore::new(ControllerKind::Walk, hub.clone());
        let mut viewer = SimViewer::flat(0.0);
        viewer.pointer_lock_available = false;
        core.enable(&mut viewer).expect("ready viewer");

        hub.dispatch(&InputEvent::MouseDown);
        assert!(core.service_pointer_lock(&mut viewer).is_err());
        // Dragging still steers the camera.
        hub.dispatch(&InputEvent::MouseMove { dx: 10.0, dy: 0.0 });
        let (yaw, _) = core.take_look(0.01);
        assert!((yaw - 0.1).abs() < 1e-12);
    }

    #[test]
    fn look_is_ignored_without_lock_or_drag() {
        let hub = InputHub::new();
        let mut core = ControllerCore::new(ControllerKind::Walk, hub.clone());
        let mut viewer = SimViewer::flat(0.0);
        core.enable(&mut viewer).expect("ready viewer");
        hub.dispatch(&InputEvent::MouseMove { dx: 50.0, dy: 50.0 });
        assert_eq!(core.take_look(0.01), (0.0, 0.0));
    }

    #[test]
    fn present_counts_writes() {
        let hub = InputHub::new();
        let mut core = ControllerCore::new(ControllerKind::Drive, hub);
        let mut viewer = SimViewer::flat(0.0);
        let mut metrics = Metrics::new();
        core.enable(&mut viewer).expect("ready viewer");

        let mut ctx = ControllerContext {
            viewer: &mut viewer,
            metrics: &mut metrics as &mut dyn MetricsPort,
        };
        core.present(&mut ctx);
        core.present(&mut ctx);
        assert_eq!(metrics.counter("camera.writes"), 1);
        assert_eq!(metrics.counter("camera.writes_skipped"), 1);
    }
}
