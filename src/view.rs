//! Which controls the camera screen shows for a given UI state.

use std::fmt;

use crate::camera::CaptureMode;
use crate::ui::UiState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Shutter,
    Retake,
    Save,
    /// Disabled save button after a successful save
    Saved,
    Record,
    Stop,
    PermissionAlert,
}

impl Control {
    pub fn label(&self) -> &'static str {
        match self {
            Control::Shutter => "Take photo",
            Control::Retake => "Retake",
            Control::Save => "Save",
            Control::Saved => "Saved",
            Control::Record => "Record",
            Control::Stop => "Stop",
            Control::PermissionAlert => "Camera access needed",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Controls to render, top to bottom.
pub fn controls(state: &UiState, mode: CaptureMode) -> Vec<Control> {
    if state.alert {
        return vec![Control::PermissionAlert];
    }
    match mode {
        CaptureMode::Photo if state.is_taken => {
            let save = if state.is_saved {
                Control::Saved
            } else {
                Control::Save
            };
            vec![Control::Retake, save]
        }
        CaptureMode::Photo => vec![Control::Shutter],
        CaptureMode::Movie if state.is_recording => vec![Control::Stop],
        CaptureMode::Movie => vec![Control::Record],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_controls() {
        let mut state = UiState::default();
        assert_eq!(controls(&state, CaptureMode::Photo), vec![Control::Shutter]);

        state.is_taken = true;
        assert_eq!(
            controls(&state, CaptureMode::Photo),
            vec![Control::Retake, Control::Save]
        );

        state.is_saved = true;
        assert_eq!(
            controls(&state, CaptureMode::Photo),
            vec![Control::Retake, Control::Saved]
        );
    }

    #[test]
    fn test_movie_controls() {
        let mut state = UiState::default();
        assert_eq!(controls(&state, CaptureMode::Movie), vec![Control::Record]);
        state.is_taken = true;
        state.is_recording = true;
        assert_eq!(controls(&state, CaptureMode::Movie), vec![Control::Stop]);
    }

    #[test]
    fn test_alert_hides_everything_else() {
        let state = UiState {
            alert: true,
            ..Default::default()
        };
        assert_eq!(
            controls(&state, CaptureMode::Photo),
            vec![Control::PermissionAlert]
        );
        assert_eq!(Control::PermissionAlert.to_string(), "Camera access needed");
    }
}
