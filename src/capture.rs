//! Capture artifacts and the per-capture stage machine.
//!
//! A capture produces either an in-memory photo or a temporary movie file.
//! Movie files live in a temp directory under a fresh UUID name until the
//! persistence step moves them into the library or deletes them.

mod errors;

pub use errors::CaptureError;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Container extension used for recordings when nothing else is configured.
pub const DEFAULT_CONTAINER_EXTENSION: &str = "mov";

/// Build a fresh temporary path for one recording.
pub fn temp_movie_path(dir: &Path, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", uuid::Uuid::new_v4(), extension))
}

/// Where one capture instance is in its lifecycle.
///
/// `Idle → Capturing → Finished → PersistenceRequested → {Saved | SkippedBySystem
/// | SkippedByUser} → Cleaned`.
///
/// A failed capture has nothing to persist, so it never requests persistence:
/// `Finished { success: false }` goes straight to `SkippedBySystem`. Library
/// authorization is only asked for once there is a usable file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum CaptureStage {
    Idle,
    Capturing,
    Finished { success: bool },
    PersistenceRequested,
    Saved,
    /// The capture failed or the library write failed
    SkippedBySystem,
    /// Photo library access was refused
    SkippedByUser,
    Cleaned,
}

impl CaptureStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureStage::Cleaned)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(&self, next: CaptureStage) -> bool {
        use CaptureStage::*;
        matches!(
            (self, next),
            (Idle, Capturing)
                | (Capturing, Finished { .. })
                | (Finished { success: true }, PersistenceRequested)
                | (Finished { success: false }, SkippedBySystem)
                | (PersistenceRequested, Saved)
                | (PersistenceRequested, SkippedBySystem)
                | (PersistenceRequested, SkippedByUser)
                | (Saved, Cleaned)
                | (SkippedBySystem, Cleaned)
                | (SkippedByUser, Cleaned)
        )
    }
}

impl fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureStage::Idle => write!(f, "idle"),
            CaptureStage::Capturing => write!(f, "capturing"),
            CaptureStage::Finished { success: true } => write!(f, "finished"),
            CaptureStage::Finished { success: false } => write!(f, "finished (failed)"),
            CaptureStage::PersistenceRequested => write!(f, "persistence requested"),
            CaptureStage::Saved => write!(f, "saved"),
            CaptureStage::SkippedBySystem => write!(f, "skipped by system"),
            CaptureStage::SkippedByUser => write!(f, "skipped by user"),
            CaptureStage::Cleaned => write!(f, "cleaned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_movie_path_is_unique() {
        let dir = Path::new("/tmp");
        let a = temp_movie_path(dir, "mov");
        let b = temp_movie_path(dir, "mov");
        assert_ne!(a, b);
        assert_eq!(a.extension().unwrap(), "mov");
        assert_eq!(a.parent().unwrap(), dir);
    }

    #[test]
    fn test_success_path_transitions() {
        use CaptureStage::*;
        let path = [
            Idle,
            Capturing,
            Finished { success: true },
            PersistenceRequested,
            Saved,
            Cleaned,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(Cleaned.is_terminal());
    }

    #[test]
    fn test_failed_capture_skips_persistence() {
        use CaptureStage::*;
        assert!(!Finished { success: false }.can_advance_to(PersistenceRequested));
        assert!(Finished { success: false }.can_advance_to(SkippedBySystem));
        assert!(!Cleaned.can_advance_to(Idle));
    }
}
