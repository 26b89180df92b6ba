use std::f64::consts::TAU;

use foundation::math::Geodetic;
use serde::{Deserialize, Serialize};

use crate::camera::CameraView;
use crate::viewer::{NativeControls, Viewer, ViewerError};

/// Approximate meters per degree of arc, for synthetic terrain only.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Synthetic terrain model.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Terrain {
    Flat {
        height: f64,
    },
    /// No tile loaded anywhere.
    Unloaded,
    /// Rolling hills along the diagonal `lon + lat`.
    Sine {
        base: f64,
        amplitude: f64,
        wavelength_m: f64,
    },
}

impl Terrain {
    pub fn height_at(&self, lon_deg: f64, lat_deg: f64) -> Option<f64> {
        match *self {
            Terrain::Flat { height } => Some(height),
            Terrain::Unloaded => None,
            Terrain::Sine {
                base,
                amplitude,
                wavelength_m,
            } => {
                if !(wavelength_m > 0.0) {
                    return Some(base);
                }
                let x = (lon_deg + lat_deg) * METERS_PER_DEGREE;
                Some(base + amplitude * (TAU * x / wavelength_m).sin())
            }
        }
    }
}

/// In-memory [`Viewer`] that records what the controllers do to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimViewer {
    pub ready: bool,
    pub view: Option<CameraView>,
    pub terrain: Terrain,
    pub controls: NativeControls,
    pub pointer_locked: bool,
    /// `false` simulates a page without a canvas to lock to.
    pub pointer_lock_available: bool,
    pub frame_loop_running: bool,
    writes: u64,
}

impl SimViewer {
    /// Camera at `(lon, lat)` in degrees, `height` meters, looking along
    /// `yaw_deg`/`pitch_deg`, over flat terrain at sea level.
    pub fn at(lon_deg: f64, lat_deg: f64, height: f64, yaw_deg: f64, pitch_deg: f64) -> Self {
        let geo = Geodetic::from_degrees(lon_deg, lat_deg, height);
        Self {
            ready: true,
            view: Some(CameraView::looking(
                geo,
                yaw_deg.to_radians(),
                pitch_deg.to_radians(),
            )),
            terrain: Terrain::Flat { height: 0.0 },
            controls: NativeControls::ALL_ENABLED,
            pointer_locked: false,
            pointer_lock_available: true,
            frame_loop_running: false,
            writes: 0,
        }
    }

    /// Flat ground at `height`, camera standing on it at the origin facing north.
    pub fn flat(height: f64) -> Self {
        Self {
            terrain: Terrain::Flat { height },
            ..Self::at(0.0, 0.0, height + 1.7, 0.0, 0.0)
        }
    }

    /// Number of camera writes that reached the renderer.
    pub fn write_count(&self) -> u64 {
        self.writes
    }
}

impl Viewer for SimViewer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn current_view(&self) -> Option<CameraView> {
        self.view
    }

    fn set_view(&mut self, view: &CameraView) {
        self.view = Some(*view);
        self.writes += 1;
    }

    fn terrain_height(&self, lon_deg: f64, lat_deg: f64) -> Option<f64> {
        self.terrain.height_at(lon_deg, lat_deg)
    }

    fn native_controls(&self) -> NativeControls {
        self.controls
    }

    fn set_native_controls(&mut self, controls: NativeControls) {
        self.controls = controls;
    }

    fn request_pointer_lock(&mut self) -> Result<(), ViewerError> {
        if !self.pointer_lock_available {
            return Err(ViewerError::NoRenderSurface);
        }
        self.pointer_locked = true;
        Ok(())
    }

    fn exit_pointer_lock(&mut self) {
        self.pointer_locked = false;
    }

    fn set_frame_loop(&mut self, running: bool) {
        self.frame_loop_running = running;
    }
}
