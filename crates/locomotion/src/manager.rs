use foundation::time::Time;
use runtime::frame::{Frame, FrameLoop};
use runtime::metrics::{MetricsPort, NoopMetrics};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ConfigError, ModeConfig, ModeConfigs};
use crate::controller::{Controller, ControllerContext, ControllerKind, LocomotionController};
use crate::input::{InputEvent, InputHub};
use crate::viewer::{NativeControls, Viewer};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Native globe camera.
    #[default]
    Orbit,
    Explore,
    Walk,
    Drive,
    Flight,
    /// Settings panel open; native camera.
    Settings,
}

impl CameraMode {
    pub fn controller_kind(self) -> Option<ControllerKind> {
        match self {
            CameraMode::Walk => Some(ControllerKind::Walk),
            CameraMode::Drive => Some(ControllerKind::Drive),
            CameraMode::Flight => Some(ControllerKind::Flight),
            CameraMode::Orbit | CameraMode::Explore | CameraMode::Settings => None,
        }
    }

    /// Whether a locomotion controller owns the camera in this mode.
    pub fn is_active(self) -> bool {
        self.controller_kind().is_some()
    }

    pub fn label(self) -> &'static str {
        match self {
            CameraMode::Orbit => "orbit",
            CameraMode::Explore => "explore",
            CameraMode::Walk => "walk",
            CameraMode::Drive => "drive",
            CameraMode::Flight => "flight",
            CameraMode::Settings => "settings",
        }
    }
}

/// Owns the viewer, the shared input hub and at most one live controller.
/// The old controller is always disposed before the next one initializes.
pub struct ControllerManager<V: Viewer> {
    viewer: V,
    hub: InputHub,
    metrics: Box<dyn MetricsPort>,
    configs: ModeConfigs,
    mode: CameraMode,
    active: Option<Controller>,
    frame_loop: FrameLoop,
}

impl<V: Viewer> ControllerManager<V> {
    pub fn new(viewer: V) -> Self {
        Self::with_metrics(viewer, NoopMetrics)
    }

    pub fn with_metrics(viewer: V, metrics: impl MetricsPort + 'static) -> Self {
        Self {
            viewer,
            hub: InputHub::new(),
            metrics: Box::new(metrics),
            configs: ModeConfigs::default(),
            mode: CameraMode::Orbit,
            active: None,
            frame_loop: FrameLoop::new(),
        }
    }

    pub fn with_configs(mut self, configs: ModeConfigs) -> Self {
        self.configs = configs;
        self
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    /// Handle hosts can keep to dispatch input directly.
    pub fn input_hub(&self) -> InputHub {
        self.hub.clone()
    }

    /// Live input listeners, for leak diagnostics.
    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }

    pub fn configs(&self) -> &ModeConfigs {
        &self.configs
    }

    pub fn active(&self) -> Option<&Controller> {
        self.active.as_ref()
    }

    pub fn is_loop_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    /// Switch camera mode. Re-entering the current mode does nothing, except
    /// that an inert controller gets another chance to initialize.
    pub fn set_mode(&mut self, mode: CameraMode) {
        let inert = self.active.as_ref().is_some_and(|c| !c.is_enabled());
        if mode == self.mode && !inert {
            return;
        }

        info!("camera mode {} -> {}", self.mode.label(), mode.label());
        self.metrics.inc_counter("manager.mode_switches", 1);
        self.release_active();

        if let Some(kind) = mode.controller_kind() {
            let mut controller = Controller::new(kind, self.hub.clone(), &self.configs);
            controller.initialize(&mut ControllerContext {
                viewer: &mut self.viewer,
                metrics: &mut *self.metrics,
            });
            if controller.is_enabled() {
                self.start_loop();
            } else {
                warn!("{} mode has no live controller yet", mode.label());
                self.viewer.set_native_controls(NativeControls::ALL_ENABLED);
                self.stop_loop();
            }
            self.active = Some(controller);
        } else {
            self.viewer.set_native_controls(NativeControls::ALL_ENABLED);
            self.stop_loop();
        }

        self.mode = mode;
        self.metrics
            .set_gauge("input.listeners", self.hub.listener_count() as i64);
    }

    /// Forward one host input event to every live listener.
    pub fn handle_input(&mut self, event: &InputEvent) -> usize {
        self.metrics.inc_counter("input.events", 1);
        self.hub.dispatch(event)
    }

    /// Per-frame callback with the host timestamp in seconds. Returns the
    /// frame that ran, or `None` while the loop is stopped.
    pub fn on_frame(&mut self, now: Time) -> Option<Frame> {
        let frame = self.frame_loop.tick(now)?;
        if let Some(controller) = self.active.as_mut() {
            controller.update(
                &mut ControllerContext {
                    viewer: &mut self.viewer,
                    metrics: &mut *self.metrics,
                },
                frame.dt_s,
            );
        }
        Some(frame)
    }

    /// Replace one mode's config. A live controller of that mode picks it up
    /// on its next step.
    pub fn update_config(&mut self, config: ModeConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(controller) = self.active.as_mut() {
            if controller.set_config(config.clone()) {
                info!("{} config updated live", controller.kind().label());
            }
        }
        self.configs.set(config);
        Ok(())
    }

    /// Dispose any controller and hand the camera back to the viewer.
    pub fn shutdown(&mut self) {
        self.release_active();
        self.viewer.set_native_controls(NativeControls::ALL_ENABLED);
        self.stop_loop();
        self.mode = CameraMode::Orbit;
    }

    fn release_active(&mut self) {
        if let Some(mut controller) = self.active.take() {
            controller.dispose(&mut ControllerContext {
                viewer: &mut self.viewer,
                metrics: &mut *self.metrics,
            });
        }
    }

    fn start_loop(&mut self) {
        if self.frame_loop.start() {
            self.viewer.set_frame_loop(true);
        }
    }

    fn stop_loop(&mut self) {
        if self.frame_loop.stop() {
            self.viewer.set_frame_loop(false);
        }
    }
}

impl<V: Viewer> Drop for ControllerManager<V> {
    fn drop(&mut self) {
        self.release_active();
        self.stop_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraMode, ControllerManager};
    use crate::camera::CameraState;
    use crate::config::{ModeConfig, WalkConfig};
    use crate::controller::{Controller, LocomotionController};
    use crate::input::{InputEvent, KeyCode};
    use crate::sim::SimViewer;
    use crate::viewer::NativeControls;
    use foundation::time::Time;
    use pretty_assertions::assert_eq;
    use runtime::metrics::Metrics;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn manager() -> ControllerManager<SimViewer> {
        ControllerManager::new(SimViewer::at(2.29, 48.86, 36.7, 30.0, 0.0))
    }

    #[test]
    fn walk_drive_orbit_leaves_native_controls_and_no_listeners() {
        let mut m = manager();
        m.set_mode(CameraMode::Walk);
        assert_eq!(m.viewer().controls, NativeControls::ALL_DISABLED);
        assert_eq!(m.listener_count(), 1);
        assert!(m.viewer().frame_loop_running);

        m.set_mode(CameraMode::Drive);
        assert_eq!(m.listener_count(), 1);

        m.set_mode(CameraMode::Orbit);
        assert_eq!(m.viewer().controls, NativeControls::ALL_ENABLED);
        assert_eq!(m.listener_count(), 0);
        assert!(!m.is_loop_running());
        assert!(!m.viewer().frame_loop_running);
        assert!(m.active().is_none());
    }

    #[test]
    fn rapid_switching_never_leaks_listeners() {
        let mut m = manager();
        let modes = [
            CameraMode::Walk,
            CameraMode::Flight,
            CameraMode::Drive,
            CameraMode::Settings,
            CameraMode::Walk,
            CameraMode::Explore,
            CameraMode::Flight,
        ];
        for _ in 0..50 {
            for mode in modes {
                m.set_mode(mode);
                let expected = usize::from(mode.is_active());
                assert_eq!(m.listener_count(), expected);
            }
        }
    }

    #[test]
    fn reentering_current_mode_is_a_no_op() {
        let metrics = Rc::new(RefCell::new(Metrics::new()));
        let mut m = ControllerManager::with_metrics(SimViewer::flat(0.0), metrics.clone());
        m.set_mode(CameraMode::Walk);
        m.handle_input(&InputEvent::KeyDown { key: KeyCode::KeyW });
        m.on_frame(Time(0.0));
        m.on_frame(Time(0.5));
        let speed = m.active().map(|c| c.physics().velocity.length());

        m.set_mode(CameraMode::Walk);
        assert_eq!(metrics.borrow().counter("manager.mode_switches"), 1);
        assert_eq!(m.active().map(|c| c.physics().velocity.length()), speed);
    }

    #[test]
    fn unready_viewer_leaves_mode_inert_until_retried() {
        let mut viewer = SimViewer::flat(0.0);
        viewer.ready = false;
        let mut m = ControllerManager::new(viewer);

        m.set_mode(CameraMode::Flight);
        assert_eq!(m.mode(), CameraMode::Flight);
        assert_eq!(m.viewer().controls, NativeControls::ALL_ENABLED);
        assert_eq!(m.listener_count(), 0);
        assert!(!m.is_loop_running());
        assert_eq!(m.on_frame(Time(1.0)), None);

        m.viewer_mut().ready = true;
        m.set_mode(CameraMode::Flight);
        assert!(m.active().is_some_and(|c| c.is_enabled()));
        assert!(m.is_loop_running());
        assert_eq!(m.listener_count(), 1);
    }

    #[test]
    fn frame_deltas_come_from_host_timestamps() {
        let metrics = Rc::new(RefCell::new(Metrics::new()));
        let mut m = ControllerManager::with_metrics(SimViewer::flat(0.0), metrics.clone());
        m.set_mode(CameraMode::Drive);

        let first = m.on_frame(Time(10.0)).expect("running");
        assert_eq!(first.dt_s, 0.0);
        assert_eq!(metrics.borrow().counter("physics.steps"), 0);

        // 1/64 s is exact in binary and covers one 1/120 s step.
        let second = m.on_frame(Time(10.0 + 1.0 / 64.0)).expect("running");
        assert_eq!(second.dt_s, 1.0 / 64.0);
        assert_eq!(metrics.borrow().counter("physics.steps"), 1);
    }

    #[test]
    fn live_config_update_reaches_running_controller() {
        let mut m = manager();
        m.set_mode(CameraMode::Walk);
        let fast = WalkConfig {
            max_speed: 10.0,
            ..WalkConfig::default()
        };
        m.update_config(ModeConfig::Walk(fast)).expect("valid config");

        match m.active() {
            Some(Controller::Walk(walk)) => assert_eq!(walk.config().max_speed, 10.0),
            other => panic!("expected walk controller, got {other:?}"),
        }
        assert_eq!(m.configs().walk.max_speed, 10.0);

        m.handle_input(&InputEvent::KeyDown { key: KeyCode::KeyW });
        let mut t = 0.0;
        for _ in 0..120 {
            m.on_frame(Time(t));
            t += 1.0 / 60.0;
        }
        let speed = m.active().map(|c| c.physics().velocity.length()).unwrap_or(0.0);
        assert!((speed - 10.0).abs() < 1e-9, "speed {speed}");
    }

    #[test]
    fn invalid_config_is_rejected_and_previous_kept() {
        let mut m = manager();
        let bad = WalkConfig {
            eye_height: -1.0,
            ..WalkConfig::default()
        };
        assert!(m.update_config(ModeConfig::Walk(bad)).is_err());
        assert_eq!(m.configs().walk, WalkConfig::default());
    }

    #[test]
    fn config_for_inactive_mode_applies_on_next_entry() {
        let mut m = manager();
        m.set_mode(CameraMode::Walk);
        let cfg = WalkConfig {
            eye_height: 2.5,
            ..WalkConfig::default()
        };
        m.update_config(ModeConfig::Walk(cfg)).expect("valid");
        m.set_mode(CameraMode::Flight);
        m.set_mode(CameraMode::Walk);
        match m.active() {
            Some(Controller::Walk(walk)) => assert_eq!(walk.config().eye_height, 2.5),
            other => panic!("expected walk controller, got {other:?}"),
        }
    }

    fn replay() -> Vec<CameraState> {
        let mut m = manager();
        m.set_mode(CameraMode::Walk);
        let dts = [0.016, 0.017, 0.033, 0.008, 0.1, 0.016, 0.021];
        let mut t = 100.0;
        let mut states = Vec::new();
        for i in 0..200 {
            if i == 10 {
                m.handle_input(&InputEvent::KeyDown { key: KeyCode::KeyW });
                m.handle_input(&InputEvent::MouseDown);
            }
            if i == 40 {
                m.handle_input(&InputEvent::KeyDown { key: KeyCode::Space });
            }
            if i % 7 == 0 {
                m.handle_input(&InputEvent::MouseMove { dx: 3.0, dy: -1.0 });
            }
            if i == 120 {
                m.handle_input(&InputEvent::Blur);
            }
            t += dts[i % dts.len()];
            m.on_frame(Time(t));
            if let Some(c) = m.active() {
                states.push(*c.camera());
            }
        }
        states
    }

    #[test]
    fn identical_inputs_replay_identically() {
        let a = replay();
        let b = replay();
        assert_eq!(a.len(), 200);
        assert_eq!(a, b);
    }

    #[test]
    fn shutdown_restores_viewer() {
        let mut m = manager();
        m.set_mode(CameraMode::Flight);
        m.handle_input(&InputEvent::MouseDown);
        m.on_frame(Time(0.0));
        m.on_frame(Time(0.02));
        assert!(m.viewer().pointer_locked);
        m.handle_input(&InputEvent::PointerLockChanged { locked: true });

        m.shutdown();
        assert!(!m.viewer().pointer_locked);
        assert_eq!(m.viewer().controls, NativeControls::ALL_ENABLED);
        assert_eq!(m.mode(), CameraMode::Orbit);
        assert_eq!(m.listener_count(), 0);
    }
}
