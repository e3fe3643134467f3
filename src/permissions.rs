//! Permission checks for camera and photo library access.
//!
//! The authorization gate decides, before any session setup, whether the
//! screen may configure the camera or has to show the permission alert.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Types of permissions the camera screen may need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionType {
    /// Camera permission (required for any capture)
    Camera,
    /// Photo library permission (required to save captures)
    PhotoLibrary,
}

impl PermissionType {
    /// Get the human-readable name of this permission type
    pub fn name(&self) -> &'static str {
        match self {
            PermissionType::Camera => "Camera",
            PermissionType::PhotoLibrary => "Photo Library",
        }
    }

    /// Get the Settings path where the user can change this permission
    pub fn settings_path(&self) -> &'static str {
        match self {
            PermissionType::Camera => "Settings > Privacy & Security > Camera",
            PermissionType::PhotoLibrary => "Settings > Privacy & Security > Photos",
        }
    }
}

/// Current authorization for one permission type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorizationStatus {
    Authorized,
    #[default]
    NotDetermined,
    Denied,
    /// Blocked by policy; the user cannot grant it
    Restricted,
}

/// Platform permission service.
pub trait Authorizer: Send + Sync {
    fn status(&self, kind: PermissionType) -> AuthorizationStatus;

    /// Prompt the user once. Resolves to whether access was granted.
    fn request_access(&self, kind: PermissionType) -> BoxFuture<'static, bool>;
}

/// Error shown when a permission is missing
#[derive(Debug)]
pub struct PermissionError {
    /// The type of permission that is missing
    pub permission_type: PermissionType,
    pub status: AuthorizationStatus,
}

impl fmt::Display for PermissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} access is required.\n\nPlease grant permission in:\n  {}",
            self.permission_type.name(),
            self.permission_type.settings_path(),
        )?;
        if self.status == AuthorizationStatus::Restricted {
            write!(f, "\n\nAccess is restricted on this device and cannot be granted here.")?;
        }
        Ok(())
    }
}

impl std::error::Error for PermissionError {}

/// Print a user-friendly explanation of a missing permission.
pub fn print_permission_error(error: &PermissionError) {
    eprintln!("\nMissing permission: {}", error.permission_type.name());
    eprintln!("   Grant permission in: {}", error.permission_type.settings_path());
    eprintln!("\nAfter granting permission, open the camera again.\n");
}

/// Result of checking a permission before setup.
pub enum GateDecision {
    Authorized,
    Denied(PermissionError),
    /// The user is being asked; resolves to whether access was granted
    Pending(BoxFuture<'static, bool>),
}

impl fmt::Debug for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Authorized => f.write_str("Authorized"),
            GateDecision::Denied(e) => f.debug_tuple("Denied").field(&e.status).finish(),
            GateDecision::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Where the screen goes after the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Setup,
    Alert,
}

impl GateDecision {
    /// Wait for a pending prompt, if any, and map to the screen's next step.
    pub async fn resolve(self) -> GateOutcome {
        match self {
            GateDecision::Authorized => GateOutcome::Setup,
            GateDecision::Denied(_) => GateOutcome::Alert,
            GateDecision::Pending(request) => {
                if request.await {
                    GateOutcome::Setup
                } else {
                    log::warn!("Camera access was refused at the prompt");
                    GateOutcome::Alert
                }
            }
        }
    }
}

/// Check a permission, issuing the one-shot prompt if it was never asked.
pub fn check_authorization(authorizer: &dyn Authorizer, kind: PermissionType) -> GateDecision {
    let status = authorizer.status(kind);
    log::debug!("{} authorization status: {:?}", kind.name(), status);
    match status {
        AuthorizationStatus::Authorized => GateDecision::Authorized,
        AuthorizationStatus::NotDetermined => {
            GateDecision::Pending(authorizer.request_access(kind))
        }
        AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
            GateDecision::Denied(PermissionError {
                permission_type: kind,
                status,
            })
        }
    }
}

/// Authorizer with fixed statuses and a scripted answer to prompts.
///
/// Answering a prompt updates the stored status, the way a platform
/// remembers the user's choice.
#[derive(Debug, Default)]
pub struct StaticAuthorizer {
    statuses: Mutex<HashMap<PermissionType, AuthorizationStatus>>,
    answers: Mutex<HashMap<PermissionType, bool>>,
    requests: AtomicUsize,
}

impl StaticAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current status of `kind`.
    pub fn with_status(self, kind: PermissionType, status: AuthorizationStatus) -> Self {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, status);
        self
    }

    /// Set what the user answers when prompted for `kind`.
    pub fn answering(self, kind: PermissionType, grant: bool) -> Self {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, grant);
        self
    }

    /// Number of prompts shown so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Authorizer for StaticAuthorizer {
    fn status(&self, kind: PermissionType) -> AuthorizationStatus {
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or_default()
    }

    fn request_access(&self, kind: PermissionType) -> BoxFuture<'static, bool> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let granted = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
            .unwrap_or(false);
        let status = if granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        self.statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, status);
        log::info!(
            "{} access {} at prompt",
            kind.name(),
            if granted { "granted" } else { "denied" }
        );

        Box::pin(async move {
            // Prompt answers arrive off the caller's thread
            tokio::task::yield_now().await;
            granted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_type_name() {
        assert_eq!(PermissionType::Camera.name(), "Camera");
        assert_eq!(PermissionType::PhotoLibrary.name(), "Photo Library");
    }

    #[test]
    fn test_permission_type_settings_path() {
        assert!(PermissionType::Camera.settings_path().contains("Camera"));
        assert!(PermissionType::PhotoLibrary.settings_path().contains("Photos"));
    }

    #[test]
    fn test_permission_error_display() {
        let error = PermissionError {
            permission_type: PermissionType::Camera,
            status: AuthorizationStatus::Denied,
        };
        let msg = format!("{}", error);
        assert!(msg.contains("Camera access is required"));
        assert!(msg.contains("Settings > Privacy & Security > Camera"));
        assert!(!msg.contains("restricted"));
    }

    #[test]
    fn test_permission_error_display_restricted() {
        let error = PermissionError {
            permission_type: PermissionType::Camera,
            status: AuthorizationStatus::Restricted,
        };
        assert!(format!("{}", error).contains("restricted"));
    }

    #[test]
    fn test_unknown_status_is_not_determined() {
        let authorizer = StaticAuthorizer::new();
        assert_eq!(
            authorizer.status(PermissionType::Camera),
            AuthorizationStatus::NotDetermined
        );
    }

    #[tokio::test]
    async fn test_authorized_goes_to_setup_without_prompt() {
        let authorizer = StaticAuthorizer::new()
            .with_status(PermissionType::Camera, AuthorizationStatus::Authorized);
        let decision = check_authorization(&authorizer, PermissionType::Camera);
        assert!(matches!(decision, GateDecision::Authorized));
        assert_eq!(decision.resolve().await, GateOutcome::Setup);
        assert_eq!(authorizer.request_count(), 0);
    }

    #[tokio::test]
    async fn test_not_determined_granted_goes_to_setup() {
        let authorizer = StaticAuthorizer::new().answering(PermissionType::Camera, true);
        let decision = check_authorization(&authorizer, PermissionType::Camera);
        assert!(matches!(decision, GateDecision::Pending(_)));
        assert_eq!(decision.resolve().await, GateOutcome::Setup);
        assert_eq!(authorizer.request_count(), 1);
        assert_eq!(
            authorizer.status(PermissionType::Camera),
            AuthorizationStatus::Authorized
        );
    }

    #[tokio::test]
    async fn test_not_determined_refused_goes_to_alert() {
        let authorizer = StaticAuthorizer::new().answering(PermissionType::Camera, false);
        let decision = check_authorization(&authorizer, PermissionType::Camera);
        assert_eq!(decision.resolve().await, GateOutcome::Alert);
        assert_eq!(
            authorizer.status(PermissionType::Camera),
            AuthorizationStatus::Denied
        );
    }

    #[tokio::test]
    async fn test_denied_and_restricted_go_to_alert_without_prompt() {
        for status in [AuthorizationStatus::Denied, AuthorizationStatus::Restricted] {
            let authorizer = StaticAuthorizer::new().with_status(PermissionType::Camera, status);
            let decision = check_authorization(&authorizer, PermissionType::Camera);
            assert!(matches!(decision, GateDecision::Denied(_)));
            assert_eq!(decision.resolve().await, GateOutcome::Alert);
            assert_eq!(authorizer.request_count(), 0);
        }
    }
}
