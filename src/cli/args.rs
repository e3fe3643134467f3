//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::Facing;

/// Single-screen camera: take a photo or record a clip into the library
#[derive(Parser, Debug)]
#[command(name = "snapcam")]
#[command(version, about = "Take photos and record movie clips", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Take a single photo
    Photo {
        /// Save the photo to the library
        #[arg(long)]
        save: bool,

        /// Camera to use (default: from config)
        #[arg(long)]
        camera: Option<Facing>,
    },
    /// Record a movie clip and save it to the library
    Video {
        /// Recording length; Ctrl+C stops early
        #[arg(long, default_value = "3")]
        seconds: u64,

        /// Camera to use (default: from config)
        #[arg(long)]
        camera: Option<Facing>,
    },
    /// List available cameras and their formats
    ListDevices,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_defaults() {
        let args = Args::parse_from(["snapcam", "photo"]);
        assert!(args.config.is_none());
        match args.command {
            Command::Photo { save, camera } => {
                assert!(!save);
                assert!(camera.is_none());
            }
            other => panic!("Expected photo command, got {:?}", other),
        }
    }

    #[test]
    fn test_photo_save_front() {
        let args = Args::parse_from(["snapcam", "photo", "--save", "--camera", "front"]);
        match args.command {
            Command::Photo { save, camera } => {
                assert!(save);
                assert_eq!(camera, Some(Facing::Front));
            }
            other => panic!("Expected photo command, got {:?}", other),
        }
    }

    #[test]
    fn test_video_seconds() {
        let args = Args::parse_from(["snapcam", "video"]);
        assert!(matches!(args.command, Command::Video { seconds: 3, .. }));

        let args = Args::parse_from(["snapcam", "video", "--seconds", "10"]);
        assert!(matches!(args.command, Command::Video { seconds: 10, .. }));
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args = Args::parse_from(["snapcam", "list-devices", "--config", "/tmp/snapcam.toml"]);
        assert!(matches!(args.command, Command::ListDevices));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/snapcam.toml")));
    }

    #[test]
    fn test_config_subcommands() {
        let args = Args::parse_from(["snapcam", "config", "init"]);
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Init
            }
        ));
    }

    #[test]
    fn test_unknown_camera_rejected() {
        assert!(Args::try_parse_from(["snapcam", "photo", "--camera", "side"]).is_err());
    }
}
