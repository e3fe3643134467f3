//! End-to-end tests for the authorization gate.
//!
//! Whatever the camera permission status, the screen ends up either set up
//! or showing the alert, never both and never neither.

use std::sync::Arc;

use snapcam::camera::{DeviceFormat, DevicePosition, SessionSettings, VirtualBackend, VirtualCamera};
use snapcam::library::DirectoryLibrary;
use snapcam::permissions::{AuthorizationStatus, GateOutcome, PermissionType, StaticAuthorizer};
use snapcam::screen::{CameraScreen, ScreenServices};
use snapcam::ui::MainQueue;
use tempfile::TempDir;

fn open(dir: &TempDir, authorizer: Arc<StaticAuthorizer>) -> CameraScreen {
    let services = ScreenServices {
        backend: Arc::new(VirtualBackend::new(vec![VirtualCamera::new(
            "back",
            DevicePosition::Back,
            vec![DeviceFormat::new(1920, 1080, 30.0)],
        )])),
        authorizer,
        library: Arc::new(DirectoryLibrary::new(dir.path().join("library"))),
    };
    CameraScreen::new(services, SessionSettings::photo(), MainQueue::spawn().unwrap())
}

async fn run_gate(
    authorizer: StaticAuthorizer,
) -> (GateOutcome, CameraScreen, Arc<StaticAuthorizer>) {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(authorizer);
    let screen = open(&dir, authorizer.clone());
    let outcome = screen.appear().await;

    let state = screen.state();
    match outcome {
        GateOutcome::Setup => {
            assert!(screen.is_configured(), "setup outcome must configure the session");
            assert!(!state.alert, "setup outcome must not raise the alert");
        }
        GateOutcome::Alert => {
            assert!(state.alert, "alert outcome must raise the alert");
            assert!(!screen.is_configured(), "alert outcome must not configure");
            assert!(!screen.session().is_configured());
        }
    }
    (outcome, screen, authorizer)
}

#[tokio::test]
async fn test_authorized_sets_up_without_prompt() {
    let (outcome, _screen, authorizer) = run_gate(
        StaticAuthorizer::new()
            .with_status(PermissionType::Camera, AuthorizationStatus::Authorized),
    )
    .await;
    assert_eq!(outcome, GateOutcome::Setup);
    assert_eq!(authorizer.request_count(), 0);
}

#[tokio::test]
async fn test_not_determined_granted_sets_up() {
    let (outcome, _screen, authorizer) =
        run_gate(StaticAuthorizer::new().answering(PermissionType::Camera, true)).await;
    assert_eq!(outcome, GateOutcome::Setup);
    assert_eq!(authorizer.request_count(), 1);
}

#[tokio::test]
async fn test_not_determined_refused_alerts() {
    let (outcome, _screen, authorizer) =
        run_gate(StaticAuthorizer::new().answering(PermissionType::Camera, false)).await;
    assert_eq!(outcome, GateOutcome::Alert);
    assert_eq!(authorizer.request_count(), 1);
}

#[tokio::test]
async fn test_denied_alerts_without_prompt() {
    let (outcome, _screen, authorizer) = run_gate(
        StaticAuthorizer::new().with_status(PermissionType::Camera, AuthorizationStatus::Denied),
    )
    .await;
    assert_eq!(outcome, GateOutcome::Alert);
    assert_eq!(authorizer.request_count(), 0);
}

#[tokio::test]
async fn test_restricted_alerts_without_prompt() {
    let (outcome, screen, authorizer) = run_gate(
        StaticAuthorizer::new()
            .with_status(PermissionType::Camera, AuthorizationStatus::Restricted),
    )
    .await;
    assert_eq!(outcome, GateOutcome::Alert);
    assert_eq!(authorizer.request_count(), 0);
    assert!(screen.take_pic().await.is_err());
}

#[tokio::test]
async fn test_alerted_screen_stays_unconfigured_on_reappear() {
    let dir = TempDir::new().unwrap();
    let authorizer = Arc::new(
        StaticAuthorizer::new().with_status(PermissionType::Camera, AuthorizationStatus::Denied),
    );
    let screen = open(&dir, authorizer);
    assert_eq!(screen.appear().await, GateOutcome::Alert);
    assert_eq!(screen.appear().await, GateOutcome::Alert);
    assert!(screen.state().alert);
    assert!(!screen.is_configured());
}
