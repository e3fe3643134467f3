//! Photo library: the persistence target for captured photos and movies.

use chrono::Local;
use futures_util::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::capture::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Photo,
    Video,
}

impl AssetKind {
    fn prefix(&self) -> &'static str {
        match self {
            AssetKind::Photo => "Photo",
            AssetKind::Video => "Video",
        }
    }
}

/// Where the asset's bytes come from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// An existing file. With `should_move` the file is moved, not copied.
    File { path: PathBuf, should_move: bool },
    /// An in-memory encoded buffer
    Data { bytes: Vec<u8>, extension: String },
}

/// One asset to create in a single library transaction.
#[derive(Debug, Clone)]
pub struct AssetCreationRequest {
    pub kind: AssetKind,
    pub source: AssetSource,
}

impl AssetCreationRequest {
    /// Move a finished movie file into the library.
    pub fn video_moving(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: AssetKind::Video,
            source: AssetSource::File {
                path: path.into(),
                should_move: true,
            },
        }
    }

    pub fn photo_data(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            kind: AssetKind::Photo,
            source: AssetSource::Data {
                bytes,
                extension: extension.into(),
            },
        }
    }
}

/// An asset stored in the library.
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    pub path: PathBuf,
}

/// Platform asset library.
///
/// `perform_changes` is one transaction: either the asset exists afterwards
/// or the library is unchanged.
pub trait AssetLibrary: Send + Sync {
    fn perform_changes(
        &self,
        request: AssetCreationRequest,
    ) -> BoxFuture<'static, Result<Asset, CaptureError>>;
}

/// Library stored as a plain directory of files.
#[derive(Debug)]
pub struct DirectoryLibrary {
    root: PathBuf,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of transactions attempted so far, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every following transaction fail, as a full library would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

/// File name for a new asset, e.g. `Video 2026-01-23 at 10.15.02 1a2b3c4d.mov`.
pub fn asset_filename(kind: AssetKind, id: &str, extension: &str) -> String {
    let now = Local::now();
    let short_id = id.get(..8).unwrap_or(id);
    format!(
        "{} {} {}.{}",
        kind.prefix(),
        now.format("%Y-%m-%d at %H.%M.%S"),
        short_id,
        extension
    )
}

impl AssetLibrary for DirectoryLibrary {
    fn perform_changes(
        &self,
        request: AssetCreationRequest,
    ) -> BoxFuture<'static, Result<Asset, CaptureError>> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let root = self.root.clone();
        let fail = self.fail_writes.load(Ordering::SeqCst);

        Box::pin(async move {
            if fail {
                return Err(CaptureError::PersistenceWriteFailed(
                    "library is not accepting new assets".to_string(),
                ));
            }
            tokio::fs::create_dir_all(&root)
                .await
                .map_err(|e| write_failed(&root, e))?;

            let id = uuid::Uuid::new_v4().to_string();
            let path = match &request.source {
                AssetSource::File { path, should_move } => {
                    let extension = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .unwrap_or(crate::capture::DEFAULT_CONTAINER_EXTENSION);
                    let dest = root.join(asset_filename(request.kind, &id, extension));
                    if *should_move {
                        move_file(path, &dest).await?;
                    } else {
                        tokio::fs::copy(path, &dest)
                            .await
                            .map_err(|e| write_failed(&dest, e))?;
                    }
                    dest
                }
                AssetSource::Data { bytes, extension } => {
                    let dest = root.join(asset_filename(request.kind, &id, extension));
                    let partial = dest.with_extension(format!("{}.partial", extension));
                    tokio::fs::write(&partial, bytes)
                        .await
                        .map_err(|e| write_failed(&partial, e))?;
                    if let Err(e) = tokio::fs::rename(&partial, &dest).await {
                        let _ = tokio::fs::remove_file(&partial).await;
                        return Err(write_failed(&dest, e));
                    }
                    dest
                }
            };

            log::info!("Saved {:?} asset to {}", request.kind, path.display());
            Ok(Asset {
                id,
                kind: request.kind,
                path,
            })
        })
    }
}

fn write_failed(path: &Path, e: std::io::Error) -> CaptureError {
    CaptureError::PersistenceWriteFailed(format!("{}: {}", path.display(), e))
}

/// Rename, falling back to copy and remove when source and library are on
/// different filesystems.
async fn move_file(from: &Path, to: &Path) -> Result<(), CaptureError> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|e| write_failed(to, e))?;
    if let Err(e) = tokio::fs::remove_file(from).await {
        log::warn!("Copied {} into library but could not remove it: {}", from.display(), e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_asset_filename_format() {
        let name = asset_filename(AssetKind::Video, "1a2b3c4d-0000-0000", "mov");
        assert!(name.starts_with("Video "));
        assert!(name.contains(" at "));
        assert!(name.ends_with(" 1a2b3c4d.mov"));
    }

    #[tokio::test]
    async fn test_video_is_moved_into_library() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("clip.mov");
        std::fs::write(&source, b"movie").unwrap();
        let library = DirectoryLibrary::new(tmp.path().join("library"));

        let asset = library
            .perform_changes(AssetCreationRequest::video_moving(&source))
            .await
            .unwrap();

        assert!(!source.exists());
        assert_eq!(std::fs::read(&asset.path).unwrap(), b"movie");
        assert_eq!(asset.path.extension().unwrap(), "mov");
        assert_eq!(library.write_attempts(), 1);
    }

    #[tokio::test]
    async fn test_photo_data_written() {
        let tmp = TempDir::new().unwrap();
        let library = DirectoryLibrary::new(tmp.path());

        let asset = library
            .perform_changes(AssetCreationRequest::photo_data(vec![0xFF, 0xD8, 0xFF, 0xD9], "jpg"))
            .await
            .unwrap();

        assert_eq!(asset.kind, AssetKind::Photo);
        assert_eq!(std::fs::read(&asset.path).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xD9]);
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_fails_write() {
        let tmp = TempDir::new().unwrap();
        let library = DirectoryLibrary::new(tmp.path().join("library"));

        let result = library
            .perform_changes(AssetCreationRequest::video_moving(tmp.path().join("gone.mov")))
            .await;
        assert!(matches!(result, Err(CaptureError::PersistenceWriteFailed(_))));
    }

    #[tokio::test]
    async fn test_failing_library_leaves_source() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("clip.mov");
        std::fs::write(&source, b"movie").unwrap();
        let library = DirectoryLibrary::new(tmp.path().join("library"));
        library.fail_writes(true);

        let result = library
            .perform_changes(AssetCreationRequest::video_moving(&source))
            .await;
        assert!(result.is_err());
        assert!(source.exists());
        assert_eq!(library.write_attempts(), 1);
    }
}
