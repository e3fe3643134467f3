//! The camera screen.
//!
//! Ties the authorization gate, the capture controller, the completion sinks
//! and the UI state store into the operations the view triggers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

use crate::camera::{
    CaptureBackend, CaptureController, CaptureMode, CaptureSession, PendingCapture, PhotoData,
    SessionSettings,
};
use crate::capture::CaptureError;
use crate::library::AssetLibrary;
use crate::permissions::{check_authorization, Authorizer, GateOutcome, PermissionType};
use crate::persistence::{PersistenceReport, PhotoSink, RecordingSink};
use crate::ui::{MainQueue, UiState};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Platform services the screen talks to.
#[derive(Clone)]
pub struct ScreenServices {
    pub backend: Arc<dyn CaptureBackend>,
    pub authorizer: Arc<dyn Authorizer>,
    pub library: Arc<dyn AssetLibrary>,
}

/// One camera screen instance. Owns its capture session.
pub struct CameraScreen {
    services: ScreenServices,
    settings: SessionSettings,
    ui: MainQueue,
    session: Arc<CaptureSession>,
    controller: Mutex<Option<Arc<CaptureController>>>,
    photo: Mutex<Option<PhotoData>>,
    photo_sink: PhotoSink,
    save_guard: tokio::sync::Mutex<()>,
    recording_sink: Arc<RecordingSink>,
    recording: Mutex<Option<JoinHandle<PersistenceReport>>>,
}

impl CameraScreen {
    pub fn new(services: ScreenServices, settings: SessionSettings, ui: MainQueue) -> Self {
        let photo_sink = PhotoSink::new(services.library.clone(), services.authorizer.clone());
        let recording_sink = Arc::new(RecordingSink::new(
            services.library.clone(),
            services.authorizer.clone(),
        ));
        Self {
            services,
            settings,
            ui,
            session: Arc::new(CaptureSession::new()),
            controller: Mutex::new(None),
            photo: Mutex::new(None),
            photo_sink,
            save_guard: tokio::sync::Mutex::new(()),
            recording_sink,
            recording: Mutex::new(None),
        }
    }

    pub fn ui(&self) -> &MainQueue {
        &self.ui
    }

    pub fn state(&self) -> UiState {
        self.ui.state()
    }

    pub fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    pub fn mode(&self) -> CaptureMode {
        self.settings.mode
    }

    pub fn is_configured(&self) -> bool {
        lock(&self.controller).is_some()
    }

    /// The photo held since the last capture, if any.
    pub fn photo(&self) -> Option<PhotoData> {
        lock(&self.photo).clone()
    }

    fn controller(&self) -> Result<Arc<CaptureController>, CaptureError> {
        lock(&self.controller).clone().ok_or_else(|| {
            CaptureError::ConfigurationFailed("camera is not configured".to_string())
        })
    }

    fn require_mode(&self, mode: CaptureMode) -> Result<(), CaptureError> {
        if self.settings.mode != mode {
            return Err(CaptureError::CaptureFailed(format!(
                "screen is configured for {:?}, not {:?}",
                self.settings.mode, mode
            )));
        }
        Ok(())
    }

    /// The screen became visible: check camera permission, then set up or alert.
    pub async fn appear(&self) -> GateOutcome {
        let decision =
            check_authorization(self.services.authorizer.as_ref(), PermissionType::Camera);
        let outcome = decision.resolve().await;
        match outcome {
            GateOutcome::Setup => {
                self.setup();
            }
            GateOutcome::Alert => {
                self.ui.run(|ui| ui.show_alert()).await;
            }
        }
        outcome
    }

    /// Configure the session. Failures are logged and leave the screen
    /// without a usable camera.
    pub fn setup(&self) -> bool {
        if self.is_configured() {
            return true;
        }
        match CaptureController::configure_on(
            self.session.clone(),
            self.services.backend.as_ref(),
            self.settings.clone(),
        ) {
            Ok(controller) => {
                *lock(&self.controller) = Some(Arc::new(controller));
                true
            }
            Err(e) => {
                log::error!("{}", e);
                false
            }
        }
    }

    /// The preview is on screen: start the session.
    pub fn preview_mounted(&self) -> Result<(), CaptureError> {
        self.controller()?.start_preview()
    }

    /// Capture a still photo and hold it in memory.
    pub async fn take_pic(&self) -> Result<(), CaptureError> {
        self.require_mode(CaptureMode::Photo)?;
        let controller = self.controller()?;
        let capturing = controller.clone();
        let started = self
            .ui
            .background_then_main(
                move || capturing.start(),
                |result, ui| {
                    if result.is_ok() {
                        ui.toggle_taken();
                    }
                    result
                },
            )
            .await
            .ok_or_else(|| CaptureError::CaptureFailed("UI queue closed".to_string()))??;

        let PendingCapture::Photo(done) = started else {
            return Err(CaptureError::CaptureFailed(
                "screen is not in photo mode".to_string(),
            ));
        };

        let photo = match done.await {
            Ok(Ok(photo)) => photo,
            Ok(Err(e)) => return Err(self.photo_failed(controller, e.to_string()).await),
            Err(_) => {
                let message = "photo output went away".to_string();
                return Err(self.photo_failed(controller, message).await);
            }
        };
        log::info!("Photo taken ({} bytes)", photo.bytes.len());
        *lock(&self.photo) = Some(photo);
        Ok(())
    }

    /// Nothing was captured: resume the preview and undo the taken flag so
    /// the shutter works again.
    async fn photo_failed(
        &self,
        controller: Arc<CaptureController>,
        message: String,
    ) -> CaptureError {
        log::error!("Photo capture failed: {}", message);
        let restarted = self
            .ui
            .background_then_main(
                move || controller.start_preview(),
                |result, ui| {
                    ui.set_taken(false);
                    result
                },
            )
            .await;
        if let Some(Err(e)) = restarted {
            log::error!("Could not resume preview: {}", e);
        }
        CaptureError::CaptureFailed(message)
    }

    /// Drop the taken photo and resume the preview.
    pub async fn retake(&self) -> Result<(), CaptureError> {
        let controller = self.controller()?;
        *lock(&self.photo) = None;
        self.ui
            .background_then_main(
                move || controller.start_preview(),
                |result, ui| {
                    ui.set_taken(false);
                    result
                },
            )
            .await
            .ok_or_else(|| CaptureError::CaptureFailed("UI queue closed".to_string()))?
    }

    /// Save the taken photo to the library.
    ///
    /// Returns `Ok(false)` without writing when the photo is already saved,
    /// so repeated taps write once.
    pub async fn save_pic(&self) -> Result<bool, CaptureError> {
        let _saving = self.save_guard.lock().await;
        if self.ui.state().is_saved {
            return Ok(false);
        }

        let photo = self
            .photo()
            .ok_or_else(|| CaptureError::CaptureFailed("no photo has been taken".to_string()))?;
        self.photo_sink.save(&photo).await?;

        self.ui.run(|ui| ui.mark_saved()).await;
        log::info!("Photo saved");
        Ok(true)
    }

    /// Start writing a movie clip to a temporary file.
    ///
    /// When the recording finishes it is persisted in the background; the
    /// report is returned by [`stop_recording`](Self::stop_recording).
    pub async fn start_recording(&self) -> Result<(), CaptureError> {
        self.require_mode(CaptureMode::Movie)?;
        let controller = self.controller()?;
        let started = self
            .ui
            .background_then_main(
                move || controller.start(),
                |result, ui| {
                    if result.is_ok() {
                        ui.toggle_taken();
                        ui.set_recording(true);
                    }
                    result
                },
            )
            .await
            .ok_or_else(|| CaptureError::CaptureFailed("UI queue closed".to_string()))??;

        let PendingCapture::Movie(recording) = started else {
            return Err(CaptureError::CaptureFailed(
                "screen is not in movie mode".to_string(),
            ));
        };

        let sink = self.recording_sink.clone();
        let ui = self.ui.clone();
        let path = recording.path;
        let done = recording.done;
        let task = tokio::spawn(async move {
            let outcome = match done.await {
                Ok(outcome) => outcome,
                Err(_) => crate::camera::RecordingOutcome {
                    path,
                    error: Some(crate::camera::RecordingError {
                        message: "movie output went away".to_string(),
                        finished_successfully: None,
                    }),
                },
            };
            let report = sink.on_recording_finished(outcome).await;
            log::info!("Recording finished: {}", report.final_stage());
            ui.run(|ui| {
                ui.set_recording(false);
                ui.set_taken(false);
            })
            .await;
            report
        });
        *lock(&self.recording) = Some(task);
        Ok(())
    }

    /// Stop the current recording and wait until it has been persisted.
    pub async fn stop_recording(&self) -> Result<PersistenceReport, CaptureError> {
        let controller = self.controller()?;
        let task = lock(&self.recording)
            .take()
            .ok_or_else(|| CaptureError::CaptureFailed("no recording in progress".to_string()))?;
        controller.stop();
        task.await
            .map_err(|e| CaptureError::CaptureFailed(format!("persistence task failed: {}", e)))
    }

    /// The screen is going away: end any recording and stop the session.
    pub fn teardown(&self) {
        if let Ok(controller) = self.controller() {
            if controller.is_recording() {
                controller.stop();
            }
        }
        self.session.stop_running();
    }
}
