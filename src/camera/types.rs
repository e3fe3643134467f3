//! Camera types and data structures.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the device a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    /// Rear camera
    #[default]
    Back,
    /// Selfie camera
    Front,
    /// External or position-less device
    Unspecified,
}

impl fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DevicePosition::Back => "back",
            DevicePosition::Front => "front",
            DevicePosition::Unspecified => "unspecified",
        };
        f.write_str(name)
    }
}

/// Physical kind of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceType {
    BuiltInWideAngle,
    BuiltInTelephoto,
    BuiltInUltraWide,
    External,
}

/// What a configured session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Single still frame held in memory
    Photo,
    /// Movie clip written to a temporary file
    Movie,
}

/// Information about an available camera device.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfo {
    /// Stable identifier for selection
    pub id: String,
    /// Human-readable device name
    pub name: String,
    pub device_type: DeviceType,
    pub position: DevicePosition,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({} camera)", self.id, self.name, self.position)
    }
}

/// One capture format a device can be switched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceFormat {
    pub width: u32,
    pub height: u32,
    /// Highest frame rate any supported range of this format reaches
    pub max_frame_rate: f64,
}

impl DeviceFormat {
    pub fn new(width: u32, height: u32, max_frame_rate: f64) -> Self {
        Self {
            width,
            height,
            max_frame_rate,
        }
    }
}

impl fmt::Display for DeviceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {} fps", self.width, self.height, self.max_frame_rate)
    }
}

/// Errors raised by capture devices and sessions.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// No device matched the requested type and position
    #[error("No {device_type:?} camera found at position {position}")]
    DeviceNotFound {
        device_type: DeviceType,
        position: DevicePosition,
    },
    /// The device could not be opened as a session input
    #[error("Failed to open camera input: {0}")]
    InputFailed(String),
    /// The device refused an exclusive configuration lock
    #[error("Failed to lock camera '{0}' for configuration")]
    LockFailed(String),
    /// Requested format is not one the device supports
    #[error("Unsupported format {0}")]
    UnsupportedFormat(DeviceFormat),
    /// The session or output is not in a state that allows the operation
    #[error("Session not ready: {0}")]
    NotReady(String),
    /// A recording is already in progress on this output
    #[error("Recording already in progress")]
    AlreadyRecording,
    #[error("Camera I/O error: {0}")]
    Io(#[from] std::io::Error),
}
