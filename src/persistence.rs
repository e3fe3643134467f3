//! Completion sinks: turn finished captures into photo library assets.
//!
//! The movie sink walks each recording through the capture stages and
//! always ends in [`CaptureStage::Cleaned`] with the temporary file gone,
//! whether the asset was saved or not.

use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::camera::{PhotoData, RecordingError, RecordingOutcome};
use crate::capture::{CaptureError, CaptureStage};
use crate::library::{Asset, AssetCreationRequest, AssetLibrary};
use crate::permissions::{AuthorizationStatus, Authorizer, PermissionType};

/// Remove a temporary artifact. A file that is already gone is not an error.
///
/// Returns whether a file was removed.
pub fn cleanup_artifact(path: &Path) -> io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// How a finished capture left the persistence step.
#[derive(Debug)]
pub enum PersistenceOutcome {
    Saved(Asset),
    /// The capture or the library write failed
    SkippedBySystem(CaptureError),
    /// Library access was refused
    SkippedByUser,
}

/// Stages one capture went through, plus how it ended.
#[derive(Debug)]
pub struct PersistenceReport {
    pub stages: Vec<CaptureStage>,
    pub outcome: PersistenceOutcome,
}

impl PersistenceReport {
    pub fn final_stage(&self) -> CaptureStage {
        self.stages.last().copied().unwrap_or(CaptureStage::Idle)
    }

    pub fn is_saved(&self) -> bool {
        matches!(self.outcome, PersistenceOutcome::Saved(_))
    }
}

struct StageTracker {
    stages: Vec<CaptureStage>,
}

impl StageTracker {
    fn capturing() -> Self {
        Self {
            stages: vec![CaptureStage::Idle, CaptureStage::Capturing],
        }
    }

    fn advance(&mut self, next: CaptureStage) {
        let current = self.stages.last().copied().unwrap_or(CaptureStage::Idle);
        debug_assert!(current.can_advance_to(next), "{} -> {}", current, next);
        log::debug!("Capture stage: {} -> {}", current, next);
        self.stages.push(next);
    }
}

/// Whether a recording that reported `error` still produced a usable file.
///
/// A missing success flag counts as a failed capture.
pub fn recording_succeeded(error: Option<&RecordingError>) -> bool {
    match error {
        None => true,
        Some(error) => {
            log::warn!("Movie file finishing error: {}", error);
            match error.finished_successfully {
                Some(finished) => finished,
                None => {
                    log::error!("Recording error carries no success flag, treating as failed");
                    false
                }
            }
        }
    }
}

/// Ask for library access if needed. Resolves to whether writes are allowed.
pub async fn authorize_library(authorizer: &dyn Authorizer) -> bool {
    match authorizer.status(PermissionType::PhotoLibrary) {
        AuthorizationStatus::Authorized => true,
        AuthorizationStatus::NotDetermined => {
            authorizer.request_access(PermissionType::PhotoLibrary).await
        }
        AuthorizationStatus::Denied | AuthorizationStatus::Restricted => false,
    }
}

/// Receives finished movie recordings.
pub struct RecordingSink {
    library: Arc<dyn AssetLibrary>,
    authorizer: Arc<dyn Authorizer>,
}

impl RecordingSink {
    pub fn new(library: Arc<dyn AssetLibrary>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            library,
            authorizer,
        }
    }

    /// Persist a finished recording and remove its temporary file.
    pub async fn on_recording_finished(&self, recording: RecordingOutcome) -> PersistenceReport {
        let mut tracker = StageTracker::capturing();
        let success = recording_succeeded(recording.error.as_ref());
        tracker.advance(CaptureStage::Finished { success });

        let outcome = if success {
            tracker.advance(CaptureStage::PersistenceRequested);
            if authorize_library(self.authorizer.as_ref()).await {
                match self
                    .library
                    .perform_changes(AssetCreationRequest::video_moving(&recording.path))
                    .await
                {
                    Ok(asset) => {
                        tracker.advance(CaptureStage::Saved);
                        PersistenceOutcome::Saved(asset)
                    }
                    Err(e) => {
                        log::error!("Couldn't save the movie to the photo library: {}", e);
                        tracker.advance(CaptureStage::SkippedBySystem);
                        PersistenceOutcome::SkippedBySystem(e)
                    }
                }
            } else {
                log::warn!("Photo library access denied, discarding recording");
                tracker.advance(CaptureStage::SkippedByUser);
                PersistenceOutcome::SkippedByUser
            }
        } else {
            let message = recording
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_default();
            tracker.advance(CaptureStage::SkippedBySystem);
            PersistenceOutcome::SkippedBySystem(CaptureError::CaptureFailed(message))
        };

        if let Err(e) = cleanup_artifact(&recording.path) {
            log::error!("Could not remove file at {}: {}", recording.path.display(), e);
        }
        tracker.advance(CaptureStage::Cleaned);

        PersistenceReport {
            stages: tracker.stages,
            outcome,
        }
    }
}

/// Writes in-memory photos into the library.
pub struct PhotoSink {
    library: Arc<dyn AssetLibrary>,
    authorizer: Arc<dyn Authorizer>,
}

impl PhotoSink {
    pub fn new(library: Arc<dyn AssetLibrary>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            library,
            authorizer,
        }
    }

    pub async fn save(&self, photo: &PhotoData) -> Result<Asset, CaptureError> {
        if photo.is_empty() {
            return Err(CaptureError::CaptureFailed("no image data to save".to_string()));
        }
        if !authorize_library(self.authorizer.as_ref()).await {
            return Err(CaptureError::PersistenceDenied);
        }
        self.library
            .perform_changes(AssetCreationRequest::photo_data(
                photo.bytes.clone(),
                photo.extension,
            ))
            .await
    }
}
