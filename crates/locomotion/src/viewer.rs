use crate::camera::CameraView;

/// Capability flags of the viewer's built-in orbit/pan/zoom camera.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NativeControls {
    pub rotate: bool,
    pub translate: bool,
    pub zoom: bool,
    pub tilt: bool,
    pub look: bool,
}

impl NativeControls {
    pub const ALL_ENABLED: Self = Self {
        rotate: true,
        translate: true,
        zoom: true,
        tilt: true,
        look: true,
    };

    pub const ALL_DISABLED: Self = Self {
        rotate: false,
        translate: false,
        zoom: false,
        tilt: false,
        look: false,
    };
}

impl Default for NativeControls {
    fn default() -> Self {
        Self::ALL_ENABLED
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerError {
    /// No canvas/window to scope pointer lock to.
    NoRenderSurface,
    /// The platform declined the request.
    Rejected(String),
}

impl std::fmt::Display for ViewerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewerError::NoRenderSurface => write!(f, "no render surface"),
            ViewerError::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

impl std::error::Error for ViewerError {}

/// Host renderer as seen by the locomotion controllers.
pub trait Viewer {
    /// Scene, camera and globe are constructed.
    fn is_ready(&self) -> bool;

    /// Camera pose the viewer currently shows, used to seed a controller.
    fn current_view(&self) -> Option<CameraView>;

    /// Write the camera. Only called when the pose changed meaningfully.
    fn set_view(&mut self, view: &CameraView);

    /// Terrain height (meters above the ellipsoid) at a position in degrees.
    /// `None` means the tile is not loaded yet.
    fn terrain_height(&self, lon_deg: f64, lat_deg: f64) -> Option<f64>;

    fn native_controls(&self) -> NativeControls;

    fn set_native_controls(&mut self, controls: NativeControls);

    fn request_pointer_lock(&mut self) -> Result<(), ViewerError>;

    fn exit_pointer_lock(&mut self);

    /// Whether the host should keep scheduling per-frame callbacks.
    fn set_frame_loop(&mut self, _running: bool) {}
}
