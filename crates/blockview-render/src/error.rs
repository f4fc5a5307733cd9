//! Error types for GPU setup and frame production.

/// Failures while creating the GPU context.
#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// Failures while producing a frame.
///
/// An incomplete render target is fatal for the component that owns it; callers
/// should stop producing frames rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render target '{label}' is incomplete: {reason}")]
    IncompleteTarget { label: &'static str, reason: String },

    #[error("scene pass already open")]
    PassAlreadyOpen,

    #[error("no scene pass is open")]
    NoOpenPass,

    #[error("post effects are disabled; offscreen target unavailable")]
    OffscreenDisabled,

    #[error("frame readback failed: {0}")]
    Readback(String),

    #[error(transparent)]
    Context(#[from] RenderContextError),
}
