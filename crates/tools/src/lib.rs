//! Offline replay of recorded input against the headless viewer.
//!
//! A script names a mode, a start pose, synthetic terrain and a list of
//! frames (delta time plus input events). Replaying produces one record per
//! frame with the resulting camera pose.

use foundation::time::Time;
use locomotion::config::ModeConfigs;
use locomotion::sim::{SimViewer, Terrain};
use locomotion::{CameraMode, ControllerManager, InputEvent, LocomotionController};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub mode: CameraMode,
    #[serde(default)]
    pub config: ModeConfigs,
    pub start: Start,
    #[serde(default = "default_terrain")]
    pub terrain: Terrain,
    pub frames: Vec<ScriptFrame>,
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Start {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
    #[serde(default)]
    pub yaw_deg: f64,
    #[serde(default)]
    pub pitch_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptFrame {
    /// Seconds since the previous frame.
    pub dt: f64,
    #[serde(default)]
    pub events: Vec<InputEvent>,
}

/// Camera pose after one replayed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
    pub yaw_deg: f64,
    pub pitch_deg: f64,
    pub grounded: bool,
    /// The renderer received a camera write this frame.
    pub written: bool,
}

fn default_terrain() -> Terrain {
    Terrain::Flat { height: 0.0 }
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let script: Script = serde_json::from_str(json).map_err(|e| format!("parse script: {e}"))?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.mode.is_active() {
            return Err(format!(
                "mode `{}` has no controller (use walk, drive or flight)",
                self.mode.label()
            ));
        }
        self.config.validate().map_err(|e| e.to_string())?;
        let s = &self.start;
        if ![s.lon, s.lat, s.height, s.yaw_deg, s.pitch_deg]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err("start pose must be finite".to_string());
        }
        if let Some(i) = self.frames.iter().position(|f| !(f.dt >= 0.0)) {
            return Err(format!("frame {i}: dt must be zero or positive"));
        }
        Ok(())
    }
}

/// Run a script to completion.
pub fn replay(script: &Script) -> Result<Vec<FrameRecord>, String> {
    let s = script.start;
    let mut viewer = SimViewer::at(s.lon, s.lat, s.height, s.yaw_deg, s.pitch_deg);
    viewer.terrain = script.terrain;

    let mut manager = ControllerManager::new(viewer).with_configs(script.config.clone());
    manager.set_mode(script.mode);
    if !manager.active().is_some_and(|c| c.is_enabled()) {
        return Err(format!("{} controller failed to start", script.mode.label()));
    }
    info!(
        "replaying {} frames in {} mode",
        script.frames.len(),
        script.mode.label()
    );

    let mut records = Vec::with_capacity(script.frames.len());
    let mut t = 0.0;
    for frame in &script.frames {
        for event in &frame.events {
            manager.handle_input(event);
        }
        t += frame.dt;
        let writes_before = manager.viewer().write_count();
        let Some(ran) = manager.on_frame(Time(t)) else {
            return Err("frame loop stopped unexpectedly".to_string());
        };
        let Some(controller) = manager.active() else {
            return Err("controller vanished mid-replay".to_string());
        };
        let camera = controller.camera();
        let geo = camera.geodetic();
        records.push(FrameRecord {
            frame: ran.index,
            lon: geo.lon_deg(),
            lat: geo.lat_deg(),
            height: geo.alt_m,
            yaw_deg: camera.yaw.to_degrees(),
            pitch_deg: camera.pitch.to_degrees(),
            grounded: controller.physics().grounded,
            written: manager.viewer().write_count() > writes_before,
        });
    }
    manager.shutdown();
    Ok(records)
}
