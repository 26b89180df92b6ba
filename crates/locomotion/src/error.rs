use crate::viewer::ViewerError;

/// Failures inside the locomotion kernel.
///
/// None of these escape the public lifecycle methods: they are logged and the
/// controller degrades (stays inert, or drops a single physics step).
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerError {
    /// The host renderer has no scene/camera yet.
    ViewerNotReady,
    /// The render surface refused or could not provide pointer lock.
    PointerLock(ViewerError),
    /// A physics step produced NaN/Infinity and was discarded.
    NonFiniteState { stage: &'static str },
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::ViewerNotReady => write!(f, "viewer is not ready"),
            ControllerError::PointerLock(err) => write!(f, "pointer lock unavailable: {err}"),
            ControllerError::NonFiniteState { stage } => {
                write!(f, "non-finite state produced in {stage} step")
            }
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ControllerError::PointerLock(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ViewerError> for ControllerError {
    fn from(err: ViewerError) -> Self {
        ControllerError::PointerLock(err)
    }
}
