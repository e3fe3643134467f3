//! Virtual capture backend.
//!
//! Cameras, formats and failures are all configured in memory, so the whole
//! capture flow can run without camera hardware.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;

use super::device::{CaptureBackend, CaptureDevice, DeviceInput};
use super::output::{
    MovieFileOutput, PhotoData, PhotoOutput, PhotoResult, RecordingError, RecordingOutcome,
};
use super::types::{CameraError, CameraInfo, DeviceFormat, DevicePosition, DeviceType};

/// Leading bytes of every virtual movie container.
pub const MOVIE_MAGIC: &[u8] = b"SNAPCAM-MOV\0";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory camera with a fixed format list.
#[derive(Debug)]
pub struct VirtualCamera {
    info: CameraInfo,
    formats: Vec<DeviceFormat>,
    active: Mutex<Option<DeviceFormat>>,
    locked: AtomicBool,
    fail_lock: AtomicBool,
}

impl VirtualCamera {
    /// A built-in wide-angle camera. The first format starts out active.
    pub fn new(
        id: impl Into<String>,
        position: DevicePosition,
        formats: Vec<DeviceFormat>,
    ) -> Self {
        let name = match position {
            DevicePosition::Back => "Virtual Back Camera".to_string(),
            DevicePosition::Front => "Virtual Front Camera".to_string(),
            DevicePosition::Unspecified => "Virtual Camera".to_string(),
        };
        Self {
            info: CameraInfo {
                id: id.into(),
                name,
                device_type: DeviceType::BuiltInWideAngle,
                position,
            },
            active: Mutex::new(formats.first().cloned()),
            formats,
            locked: AtomicBool::new(false),
            fail_lock: AtomicBool::new(false),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.info.name = name.into();
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.info.device_type = device_type;
        self
    }

    /// Make every following configuration lock attempt fail.
    pub fn fail_lock(&self, fail: bool) {
        self.fail_lock.store(fail, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

impl CaptureDevice for VirtualCamera {
    fn info(&self) -> &CameraInfo {
        &self.info
    }

    fn formats(&self) -> Vec<DeviceFormat> {
        self.formats.clone()
    }

    fn active_format(&self) -> Option<DeviceFormat> {
        lock(&self.active).clone()
    }

    fn lock_for_configuration(&self) -> Result<(), CameraError> {
        if self.fail_lock.load(Ordering::SeqCst) || self.locked.swap(true, Ordering::SeqCst) {
            return Err(CameraError::LockFailed(self.info.name.clone()));
        }
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    fn set_active_format(&self, format: &DeviceFormat) -> Result<(), CameraError> {
        if !self.is_locked() {
            return Err(CameraError::NotReady(format!(
                "'{}' is not locked for configuration",
                self.info.name
            )));
        }
        if !self.formats.contains(format) {
            return Err(CameraError::UnsupportedFormat(format.clone()));
        }
        *lock(&self.active) = Some(format.clone());
        Ok(())
    }
}

/// Photo output producing a small JPEG-framed buffer per capture.
#[derive(Debug, Default)]
pub struct VirtualPhotoOutput {
    captures: AtomicUsize,
    next_failure: Mutex<Option<String>>,
}

impl VirtualPhotoOutput {
    /// Number of capture requests received so far.
    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }

    /// Make the next capture resolve with an error.
    pub fn fail_next(&self, message: impl Into<String>) {
        *lock(&self.next_failure) = Some(message.into());
    }
}

impl PhotoOutput for VirtualPhotoOutput {
    fn capture_photo(&self) -> oneshot::Receiver<PhotoResult> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();

        let result = match lock(&self.next_failure).take() {
            Some(message) => Err(CameraError::NotReady(message)),
            None => {
                let mut bytes = vec![0xFF, 0xD8];
                bytes.extend_from_slice(format!("snapcam frame {}", n).as_bytes());
                bytes.extend_from_slice(&[0xFF, 0xD9]);
                Ok(PhotoData {
                    bytes,
                    extension: "jpg",
                })
            }
        };
        // Receiver dropped means nobody is waiting for this photo
        let _ = tx.send(result);
        rx
    }
}

#[derive(Debug)]
struct ActiveRecording {
    path: PathBuf,
    file: std::fs::File,
    started: Instant,
    done: oneshot::Sender<RecordingOutcome>,
}

/// Movie output writing a small container file per recording.
#[derive(Debug, Default)]
pub struct VirtualMovieOutput {
    active: Mutex<Option<ActiveRecording>>,
    next_error: Mutex<Option<RecordingError>>,
    recordings: AtomicUsize,
}

impl VirtualMovieOutput {
    /// Attach `error` to the outcome of the next recording that finishes.
    pub fn fail_next(&self, error: RecordingError) {
        *lock(&self.next_error) = Some(error);
    }

    pub fn recording_count(&self) -> usize {
        self.recordings.load(Ordering::SeqCst)
    }
}

impl MovieFileOutput for VirtualMovieOutput {
    fn start_recording(
        &self,
        path: &Path,
    ) -> Result<oneshot::Receiver<RecordingOutcome>, CameraError> {
        let mut active = lock(&self.active);
        if active.is_some() {
            return Err(CameraError::AlreadyRecording);
        }

        let mut file = std::fs::File::create(path)?;
        file.write_all(MOVIE_MAGIC)?;

        let (tx, rx) = oneshot::channel();
        *active = Some(ActiveRecording {
            path: path.to_path_buf(),
            file,
            started: Instant::now(),
            done: tx,
        });
        self.recordings.fetch_add(1, Ordering::SeqCst);
        log::debug!("Virtual recording started: {}", path.display());
        Ok(rx)
    }

    fn stop_recording(&self) {
        let Some(mut recording) = lock(&self.active).take() else {
            log::warn!("stop_recording called with no recording in progress");
            return;
        };

        let mut error = lock(&self.next_error).take();
        let elapsed = recording.started.elapsed().as_millis();
        let trailer = format!("duration_ms={}\n", elapsed);
        if let Err(e) = recording
            .file
            .write_all(trailer.as_bytes())
            .and_then(|_| recording.file.sync_all())
        {
            error = Some(RecordingError {
                message: format!("Failed to finish movie file: {}", e),
                finished_successfully: Some(false),
            });
        }

        let outcome = RecordingOutcome {
            path: recording.path,
            error,
        };
        let _ = recording.done.send(outcome);
    }

    fn is_recording(&self) -> bool {
        lock(&self.active).is_some()
    }
}

/// Backend exposing a list of [`VirtualCamera`]s and one output of each kind.
#[derive(Debug)]
pub struct VirtualBackend {
    cameras: Vec<Arc<VirtualCamera>>,
    photo: Arc<VirtualPhotoOutput>,
    movie: Arc<VirtualMovieOutput>,
    fail_input: AtomicBool,
}

impl VirtualBackend {
    pub fn new(cameras: Vec<VirtualCamera>) -> Self {
        Self::with_cameras(cameras.into_iter().map(Arc::new).collect())
    }

    pub fn with_cameras(cameras: Vec<Arc<VirtualCamera>>) -> Self {
        Self {
            cameras,
            photo: Arc::new(VirtualPhotoOutput::default()),
            movie: Arc::new(VirtualMovieOutput::default()),
            fail_input: AtomicBool::new(false),
        }
    }

    /// Make opening any device as an input fail.
    pub fn fail_input(&self, fail: bool) {
        self.fail_input.store(fail, Ordering::SeqCst);
    }

    pub fn camera(&self, id: &str) -> Option<&Arc<VirtualCamera>> {
        self.cameras.iter().find(|c| c.info.id == id)
    }

    pub fn photo(&self) -> &Arc<VirtualPhotoOutput> {
        &self.photo
    }

    pub fn movie(&self) -> &Arc<VirtualMovieOutput> {
        &self.movie
    }
}

impl CaptureBackend for VirtualBackend {
    fn devices(&self) -> Vec<Arc<dyn CaptureDevice>> {
        self.cameras
            .iter()
            .map(|c| c.clone() as Arc<dyn CaptureDevice>)
            .collect()
    }

    fn open_input(&self, device: Arc<dyn CaptureDevice>) -> Result<DeviceInput, CameraError> {
        if self.fail_input.load(Ordering::SeqCst) {
            return Err(CameraError::InputFailed(format!(
                "'{}' is unavailable",
                device.info().name
            )));
        }
        Ok(DeviceInput::new(device))
    }

    fn photo_output(&self) -> Arc<dyn PhotoOutput> {
        self.photo.clone()
    }

    fn movie_output(&self) -> Arc<dyn MovieFileOutput> {
        self.movie.clone()
    }
}
