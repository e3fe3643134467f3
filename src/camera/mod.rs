//! Camera capture module.
//!
//! This module models the platform capture framework:
//! - Devices and backends via [`CaptureDevice`] and [`CaptureBackend`]
//! - Sessions and their configuration bracket via [`CaptureSession`]
//! - Photo and movie outputs via [`PhotoOutput`] and [`MovieFileOutput`]
//! - Session setup and start/stop via [`CaptureController`]

mod controller;
mod device;
mod format;
mod output;
mod session;
mod types;
pub mod virtual_device;

pub use controller::{CaptureController, MovieRecording, PendingCapture, SessionSettings};
pub use device::{list_devices, CaptureBackend, CaptureDevice, DeviceConfigLock, DeviceInput};
pub use format::{select_high_frame_rate_format, DEFAULT_MIN_FRAME_RATE};
pub use output::{
    CaptureOutput, MovieFileOutput, PhotoData, PhotoOutput, PhotoResult, RecordingError,
    RecordingOutcome,
};
pub use session::{CaptureSession, SessionConfiguration};
pub use types::{CameraError, CameraInfo, CaptureMode, DeviceFormat, DevicePosition, DeviceType};
pub use virtual_device::{VirtualBackend, VirtualCamera};
