//! Error types for the capture flow.

/// Errors that can occur between permission check and photo library write.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Camera permission was refused
    #[error("Camera permission denied")]
    PermissionDenied,
    /// No camera matched the session settings
    #[error("No camera available: {0}")]
    DeviceUnavailable(String),
    /// Attaching inputs/outputs or switching formats failed
    #[error("Session configuration failed: {0}")]
    ConfigurationFailed(String),
    /// The capture itself did not produce a usable artifact
    #[error("Capture failed: {0}")]
    CaptureFailed(String),
    /// Photo library permission was refused
    #[error("Photo library access denied")]
    PersistenceDenied,
    /// The photo library rejected the asset
    #[error("Failed to save to photo library: {0}")]
    PersistenceWriteFailed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
