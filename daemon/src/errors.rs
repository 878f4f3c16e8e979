use thiserror::Error;

/// Capture-stream failures. Fatal to the session: the caller surfaces the
/// error and stops.
#[derive(Error, Debug)]
pub enum AudioDeviceError {
    #[error("audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("no supported stream configuration for device {device}")]
    UnsupportedConfig { device: String },

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to open audio stream: {0}")]
    StreamOpen(String),
}

/// Engine-call failures. Non-fatal: the current cycle is skipped and the
/// session continues.
#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("model file not found at {0}")]
    ModelNotFound(String),

    #[error("whisper error: {0}")]
    Engine(String),
}

/// Outbound dispatch failures. Non-fatal; the cooldown timer is not started,
/// so the user can re-trigger immediately.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Rejected locally: the minimum inter-command interval has not elapsed.
    #[error("cooldown active, {remaining_secs:.1}s remaining")]
    CooldownActive { remaining_secs: f64 },

    #[error("dispatch request failed: {0}")]
    Request(String),

    #[error("dispatch rejected: HTTP {status}: {body}")]
    Http { status: u16, body: String },
}
