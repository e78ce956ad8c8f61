use std::fmt;

/// Result alias used by the rendering engine.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors surfaced by the rendering engine.
///
/// Creation-time variants propagate out of `create*` calls; frame-time variants
/// propagate out of `prepare`, draws and `swap_buffer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// No compatible adapter, device or surface. Fatal for startup.
    DeviceCreation(String),

    /// A shader stage failed to parse, validate or match the vertex layout.
    ShaderCompile {
        label: String,
        diagnostic: String,
    },

    /// A buffer, view or pipeline could not be created.
    ResourceCreation {
        resource: &'static str,
        reason: String,
    },

    /// The device was lost; the renderer must be torn down and recreated.
    DeviceLost(String),

    /// Programmer error: the call was made in a state where it is not valid.
    Precondition(String),

    /// The surface cannot provide a back buffer right now (minimized window,
    /// acquire timeout). Skip the frame and try again on the next one.
    SurfaceUnavailable(String),
}

impl RenderError {
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("precondition violated: {msg}");
        Self::Precondition(msg)
    }

    pub(crate) fn resource(resource: &'static str, reason: impl fmt::Display) -> Self {
        Self::ResourceCreation {
            resource,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn shader(label: impl Into<String>, diagnostic: impl Into<String>) -> Self {
        Self::ShaderCompile {
            label: label.into(),
            diagnostic: diagnostic.into(),
        }
    }

    /// True when the renderer can no longer be used and must be recreated.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceCreation(_) | Self::DeviceLost(_))
    }

    /// True when the failure only affects the current frame.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SurfaceUnavailable(_))
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceCreation(msg) => write!(f, "device creation failed: {msg}"),
            Self::ShaderCompile { label, diagnostic } => {
                write!(f, "shader '{label}' failed to compile:\n{diagnostic}")
            }
            Self::ResourceCreation { resource, reason } => {
                write!(f, "failed to create {resource}: {reason}")
            }
            Self::DeviceLost(msg) => write!(f, "device lost: {msg}"),
            Self::Precondition(msg) => write!(f, "precondition violated: {msg}"),
            Self::SurfaceUnavailable(msg) => write!(f, "surface unavailable: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_and_transient_are_disjoint() {
        let lost = RenderError::DeviceLost("reset".into());
        let skip = RenderError::SurfaceUnavailable("timeout".into());
        assert!(lost.is_fatal() && !lost.is_transient());
        assert!(skip.is_transient() && !skip.is_fatal());
        assert!(!RenderError::Precondition("x".into()).is_fatal());
    }

    #[test]
    fn shader_error_display_carries_diagnostic() {
        let err = RenderError::shader("shape.wgsl", "expected ';'");
        let text = err.to_string();
        assert!(text.contains("shape.wgsl"));
        assert!(text.contains("expected ';'"));
    }
}
