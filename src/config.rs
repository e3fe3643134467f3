//! Configuration file handling for snapcam.
//!
//! Loads configuration from `~/.config/snapcam/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::camera::{
    CaptureMode, DeviceFormat, DevicePosition, SessionSettings, VirtualBackend, VirtualCamera,
    DEFAULT_MIN_FRAME_RATE,
};
use crate::capture::DEFAULT_CONTAINER_EXTENSION;
use crate::library::DirectoryLibrary;
use crate::permissions::{AuthorizationStatus, PermissionType, StaticAuthorizer};
use crate::screen::ScreenServices;

/// Configuration file structure for snapcam.
/// Loaded from ~/.config/snapcam/config.toml (or custom path via --config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub virtual_camera: VirtualCameraConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub position: DevicePosition,
    /// Frame rate a movie format has to reach to be selected
    #[serde(default = "default_min_frame_rate")]
    pub min_frame_rate: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: DevicePosition::default(),
            min_frame_rate: default_min_frame_rate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    #[serde(default = "default_container_extension")]
    pub container_extension: String,
    /// Where in-progress recordings are written (default: system temp dir)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            container_extension: default_container_extension(),
            temp_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library directory (default: ~/Pictures/snapcam)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualCameraConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_formats")]
    pub formats: Vec<DeviceFormat>,
    #[serde(default)]
    pub camera_permission: AuthorizationStatus,
    #[serde(default)]
    pub library_permission: AuthorizationStatus,
    /// Answer to the permission prompt when a status is not determined
    #[serde(default = "default_true")]
    pub grant_on_request: bool,
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self {
            name: None,
            formats: default_formats(),
            camera_permission: AuthorizationStatus::default(),
            library_permission: AuthorizationStatus::default(),
            grant_on_request: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_min_frame_rate() -> f64 {
    DEFAULT_MIN_FRAME_RATE
}

fn default_container_extension() -> String {
    DEFAULT_CONTAINER_EXTENSION.to_string()
}

fn default_formats() -> Vec<DeviceFormat> {
    vec![
        DeviceFormat::new(1920, 1080, 30.0),
        DeviceFormat::new(1920, 1080, 120.0),
        DeviceFormat::new(1280, 720, 240.0),
        DeviceFormat::new(3840, 2160, 60.0),
    ]
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.clone(),
                source: e,
            })?;
            log::debug!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, format!("# snapcam configuration\n\n{}", content)).map_err(|e| {
            ConfigError::IoError {
                path: path.to_path_buf(),
                source: e,
            }
        })
    }

    pub fn session_settings(&self, mode: CaptureMode) -> SessionSettings {
        let base = match mode {
            CaptureMode::Photo => SessionSettings::photo(),
            CaptureMode::Movie => {
                SessionSettings::movie().with_min_frame_rate(Some(self.camera.min_frame_rate))
            }
        };
        let mut settings = base.with_position(self.camera.position);
        if let Some(dir) = &self.recording.temp_dir {
            settings = settings.with_temp_dir(dir);
        }
        settings.container_extension = self.recording.container_extension.clone();
        settings
    }

    pub fn library_path(&self) -> PathBuf {
        self.library.path.clone().unwrap_or_else(default_library_path)
    }

    /// Virtual backend with a back and a front camera sharing the configured
    /// formats. A configured name goes to the camera at `camera.position`.
    pub fn backend(&self) -> VirtualBackend {
        let cameras = [DevicePosition::Back, DevicePosition::Front]
            .into_iter()
            .map(|position| {
                let id = format!("virtual-{}", position);
                let camera = VirtualCamera::new(id, position, self.virtual_camera.formats.clone());
                match &self.virtual_camera.name {
                    Some(name) if position == self.camera.position => {
                        camera.with_name(name.clone())
                    }
                    _ => camera,
                }
            })
            .collect();
        VirtualBackend::new(cameras)
    }

    pub fn authorizer(&self) -> StaticAuthorizer {
        let grant = self.virtual_camera.grant_on_request;
        StaticAuthorizer::new()
            .with_status(PermissionType::Camera, self.virtual_camera.camera_permission)
            .with_status(PermissionType::PhotoLibrary, self.virtual_camera.library_permission)
            .answering(PermissionType::Camera, grant)
            .answering(PermissionType::PhotoLibrary, grant)
    }

    pub fn services(&self) -> ScreenServices {
        ScreenServices {
            backend: Arc::new(self.backend()),
            authorizer: Arc::new(self.authorizer()),
            library: Arc::new(DirectoryLibrary::new(self.library_path())),
        }
    }
}

/// Errors that can occur when loading or writing configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to access config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize config: {}", source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("snapcam")
        .join("config.toml")
}

fn default_library_path() -> PathBuf {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Pictures")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("snapcam")
}
