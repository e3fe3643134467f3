//! Session outputs and their completion results.
//!
//! Completion is delivered through `oneshot` receivers rather than delegate
//! objects: the output resolves the receiver once when the capture finishes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::oneshot;

use super::types::CameraError;

/// Encoded still image held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoData {
    pub bytes: Vec<u8>,
    /// File extension matching the encoding, e.g. `jpg`
    pub extension: &'static str,
}

impl PhotoData {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Error reported by the framework when a recording ends abnormally.
///
/// A recording can end with an error and still have produced a usable file
/// (for example when the disk filled up after the last frame was written).
/// `finished_successfully` carries that flag when the framework provided it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingError {
    pub message: String,
    pub finished_successfully: Option<bool>,
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of one movie recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingOutcome {
    pub path: PathBuf,
    pub error: Option<RecordingError>,
}

pub type PhotoResult = Result<PhotoData, CameraError>;

/// Still image output.
pub trait PhotoOutput: Send + Sync + fmt::Debug {
    /// Capture one frame. The receiver resolves once processing finishes.
    fn capture_photo(&self) -> oneshot::Receiver<PhotoResult>;
}

/// Movie file output.
pub trait MovieFileOutput: Send + Sync + fmt::Debug {
    /// Start writing to `path`. The receiver resolves when the file is finished.
    fn start_recording(
        &self,
        path: &Path,
    ) -> Result<oneshot::Receiver<RecordingOutcome>, CameraError>;

    fn stop_recording(&self);

    fn is_recording(&self) -> bool;
}

/// An output attached (or staged for attachment) to a session.
#[derive(Debug, Clone)]
pub enum CaptureOutput {
    Photo(Arc<dyn PhotoOutput>),
    Movie(Arc<dyn MovieFileOutput>),
}

impl CaptureOutput {
    /// Two handles are the same output when they point to the same object.
    pub fn same_as(&self, other: &CaptureOutput) -> bool {
        match (self, other) {
            (CaptureOutput::Photo(a), CaptureOutput::Photo(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (CaptureOutput::Movie(a), CaptureOutput::Movie(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}
