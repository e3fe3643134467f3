//! Capture session controller.
//!
//! Configures a session for photo or movie capture and exposes `start`/`stop`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;

use super::device::{CaptureBackend, CaptureDevice};
use super::format::{select_high_frame_rate_format, DEFAULT_MIN_FRAME_RATE};
use super::output::{CaptureOutput, MovieFileOutput, PhotoOutput, PhotoResult, RecordingOutcome};
use super::session::CaptureSession;
use super::types::{CaptureMode, DevicePosition, DeviceType};
use crate::capture::{temp_movie_path, CaptureError, DEFAULT_CONTAINER_EXTENSION};

/// How to configure a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub mode: CaptureMode,
    pub position: DevicePosition,
    pub device_type: DeviceType,
    /// Movie sessions switch to the last format reaching this rate
    pub min_frame_rate: Option<f64>,
    /// Directory for temporary recordings
    pub temp_dir: PathBuf,
    pub container_extension: String,
}

impl SessionSettings {
    pub fn photo() -> Self {
        Self {
            mode: CaptureMode::Photo,
            position: DevicePosition::Back,
            device_type: DeviceType::BuiltInWideAngle,
            min_frame_rate: None,
            temp_dir: std::env::temp_dir(),
            container_extension: DEFAULT_CONTAINER_EXTENSION.to_string(),
        }
    }

    pub fn movie() -> Self {
        Self {
            mode: CaptureMode::Movie,
            min_frame_rate: Some(DEFAULT_MIN_FRAME_RATE),
            ..Self::photo()
        }
    }

    pub fn with_position(mut self, position: DevicePosition) -> Self {
        self.position = position;
        self
    }

    pub fn with_min_frame_rate(mut self, min_frame_rate: Option<f64>) -> Self {
        self.min_frame_rate = min_frame_rate;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}

/// A temporary movie file being written.
#[derive(Debug)]
pub struct MovieRecording {
    pub path: PathBuf,
    pub done: oneshot::Receiver<RecordingOutcome>,
}

/// Capture started by [`CaptureController::start`], resolved by the output.
#[derive(Debug)]
pub enum PendingCapture {
    Photo(oneshot::Receiver<PhotoResult>),
    Movie(MovieRecording),
}

#[derive(Debug, Clone)]
enum ActiveOutput {
    Photo(Arc<dyn PhotoOutput>),
    Movie(Arc<dyn MovieFileOutput>),
}

/// A configured session plus the device and output it was configured with.
#[derive(Debug)]
pub struct CaptureController {
    session: Arc<CaptureSession>,
    device: Arc<dyn CaptureDevice>,
    output: ActiveOutput,
    settings: SessionSettings,
}

impl CaptureController {
    /// Configure a fresh session.
    pub fn configure(
        backend: &dyn CaptureBackend,
        settings: SessionSettings,
    ) -> Result<Self, CaptureError> {
        Self::configure_on(Arc::new(CaptureSession::new()), backend, settings)
    }

    /// Configure an existing (unconfigured) session.
    ///
    /// Input, output and format changes are staged inside one configuration
    /// bracket. Any failure drops the bracket, leaving the session as it was.
    pub fn configure_on(
        session: Arc<CaptureSession>,
        backend: &dyn CaptureBackend,
        settings: SessionSettings,
    ) -> Result<Self, CaptureError> {
        let device = backend
            .default_device(settings.device_type, settings.position)
            .ok_or_else(|| {
                CaptureError::DeviceUnavailable(format!(
                    "no {:?} camera at position {}",
                    settings.device_type, settings.position
                ))
            })?;
        log::info!("Selected camera: {}", device.info());

        let output = match settings.mode {
            CaptureMode::Photo => ActiveOutput::Photo(backend.photo_output()),
            CaptureMode::Movie => ActiveOutput::Movie(backend.movie_output()),
        };

        {
            let mut config = session.begin_configuration();

            let input = backend
                .open_input(device.clone())
                .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?;
            if config.can_add_input(&input) {
                config
                    .add_input(input)
                    .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?;
            } else {
                log::warn!("Session already has an input for '{}'", device.info().name);
            }

            let attached = match &output {
                ActiveOutput::Photo(photo) => CaptureOutput::Photo(photo.clone()),
                ActiveOutput::Movie(movie) => CaptureOutput::Movie(movie.clone()),
            };
            if config.can_add_output(&attached) {
                config
                    .add_output(attached)
                    .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?;
            } else {
                log::warn!("Session already has this output attached");
            }

            if settings.mode == CaptureMode::Movie {
                if let Some(min_frame_rate) = settings.min_frame_rate {
                    let formats = device.formats();
                    match select_high_frame_rate_format(&formats, min_frame_rate) {
                        Some(format) => config
                            .set_active_format(device.clone(), format.clone())
                            .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?,
                        None => log::info!(
                            "No format of '{}' reaches {} fps, keeping the active format",
                            device.info().name,
                            min_frame_rate
                        ),
                    }
                }
            }

            config
                .commit()
                .map_err(|e| CaptureError::ConfigurationFailed(e.to_string()))?;
        }

        Ok(Self {
            session,
            device,
            output,
            settings,
        })
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    pub fn device(&self) -> &Arc<dyn CaptureDevice> {
        &self.device
    }

    pub fn mode(&self) -> CaptureMode {
        self.settings.mode
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Start the session's flow of frames (the preview).
    pub fn start_preview(&self) -> Result<(), CaptureError> {
        self.session
            .start_running()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    /// Begin a capture.
    ///
    /// Photo: capture one frame and stop the session. Movie: start writing
    /// to a new temporary file.
    pub fn start(&self) -> Result<PendingCapture, CaptureError> {
        if !self.session.is_running() {
            return Err(CaptureError::CaptureFailed(
                "capture session is not running".to_string(),
            ));
        }

        match &self.output {
            ActiveOutput::Photo(photo) => {
                let done = photo.capture_photo();
                self.session.stop_running();
                Ok(PendingCapture::Photo(done))
            }
            ActiveOutput::Movie(movie) => {
                let path =
                    temp_movie_path(&self.settings.temp_dir, &self.settings.container_extension);
                let done = movie
                    .start_recording(&path)
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
                log::info!("Recording to {}", path.display());
                Ok(PendingCapture::Movie(MovieRecording { path, done }))
            }
        }
    }

    /// End the current capture: finish the movie file, or stop the session.
    pub fn stop(&self) {
        match &self.output {
            ActiveOutput::Photo(_) => self.session.stop_running(),
            ActiveOutput::Movie(movie) => movie.stop_recording(),
        }
    }

    pub fn is_recording(&self) -> bool {
        match &self.output {
            ActiveOutput::Photo(_) => false,
            ActiveOutput::Movie(movie) => movie.is_recording(),
        }
    }
}
