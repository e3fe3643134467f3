//! Subcommand handlers for photo, video, list-devices and config actions.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use super::args::ConfigAction;
use super::enums::Facing;
use crate::camera::{self, CaptureMode};
use crate::capture::CaptureError;
use crate::config::Config;
use crate::permissions::{print_permission_error, GateOutcome, PermissionError, PermissionType};
use crate::persistence::PersistenceOutcome;
use crate::screen::CameraScreen;
use crate::ui::MainQueue;
use crate::view;

static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install a Ctrl+C handler that asks a running recording to stop.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, stopping...");
    })
}

pub fn stop_requested() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

fn print_controls(screen: &CameraScreen) {
    let labels: Vec<String> = view::controls(&screen.state(), screen.mode())
        .iter()
        .map(|c| c.to_string())
        .collect();
    println!("  [{}]", labels.join("] ["));
}

/// Open a screen and run the authorization gate and setup.
async fn open_screen(
    config: &Config,
    mode: CaptureMode,
    facing: Option<Facing>,
) -> Result<CameraScreen, String> {
    let services = config.services();
    let mut settings = config.session_settings(mode);
    if let Some(facing) = facing {
        settings = settings.with_position(facing.into());
    }
    let ui = MainQueue::spawn().map_err(|e| format!("Failed to start UI thread: {}", e))?;
    let screen = CameraScreen::new(services.clone(), settings, ui);

    if screen.appear().await == GateOutcome::Alert {
        print_controls(&screen);
        print_permission_error(&PermissionError {
            permission_type: PermissionType::Camera,
            status: services.authorizer.status(PermissionType::Camera),
        });
        return Err(CaptureError::PermissionDenied.to_string());
    }
    if !screen.is_configured() {
        return Err("Camera setup failed, see log for details".to_string());
    }
    screen.preview_mounted().map_err(|e| e.to_string())?;
    Ok(screen)
}

/// Take one photo, optionally saving it to the library.
pub async fn run_photo(config: &Config, save: bool, facing: Option<Facing>) -> Result<(), String> {
    let screen = open_screen(config, CaptureMode::Photo, facing).await?;
    print_controls(&screen);

    screen.take_pic().await.map_err(|e| e.to_string())?;
    let size = screen.photo().map(|p| p.bytes.len()).unwrap_or(0);
    println!("Photo taken ({} bytes)", size);
    print_controls(&screen);

    if save {
        screen.save_pic().await.map_err(|e| e.to_string())?;
        println!("Saved to {}", config.library_path().display());
        print_controls(&screen);
    } else {
        println!("Not saved. Use --save to keep it.");
    }

    screen.teardown();
    Ok(())
}

/// Record for `seconds` (or until Ctrl+C) and persist the clip.
pub async fn run_video(
    config: &Config,
    seconds: u64,
    facing: Option<Facing>,
) -> Result<(), String> {
    let screen = open_screen(config, CaptureMode::Movie, facing).await?;
    print_controls(&screen);

    screen.start_recording().await.map_err(|e| e.to_string())?;
    println!("Recording for {}s (Ctrl+C to stop)...", seconds);
    print_controls(&screen);

    let deadline = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < deadline && !stop_requested() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let report = screen.stop_recording().await.map_err(|e| e.to_string())?;
    screen.teardown();
    let stages: Vec<String> = report.stages.iter().map(|s| s.to_string()).collect();
    log::info!("Capture stages: {}", stages.join(" -> "));

    match report.outcome {
        PersistenceOutcome::Saved(asset) => {
            println!("Saved {}", asset.path.display());
            Ok(())
        }
        PersistenceOutcome::SkippedByUser => {
            Err("Photo library access was not granted, recording discarded".to_string())
        }
        PersistenceOutcome::SkippedBySystem(e) => Err(format!("Recording not saved: {}", e)),
    }
}

/// List available cameras and their formats.
pub fn list_devices(config: &Config) {
    let backend = config.backend();
    let devices = camera::list_devices(&backend);
    if devices.is_empty() {
        println!("No cameras found.");
        return;
    }

    println!("Available cameras:");
    for device in devices {
        println!("  {}", device);
    }
    println!();
    println!("Formats:");
    for format in &config.virtual_camera.formats {
        println!("  {}", format);
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    config: &Config,
    config_path: &Path,
    action: ConfigAction,
) -> Result<(), String> {
    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml().map_err(|e| e.to_string())?);
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\n\
                     Use 'snapcam config show' to view current settings.",
                    config_path.display()
                ));
            }
            Config::default()
                .save(config_path)
                .map_err(|e| e.to_string())?;
            println!("Created config file: {}", config_path.display());
            Ok(())
        }
    }
}
