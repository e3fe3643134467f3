//! Capture session and its configuration transaction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::device::{CaptureDevice, DeviceConfigLock, DeviceInput};
use super::output::CaptureOutput;
use super::types::{CameraError, DeviceFormat};

#[derive(Debug, Default)]
struct SessionState {
    inputs: Vec<DeviceInput>,
    outputs: Vec<CaptureOutput>,
}

/// Pairing of input devices and outputs, plus a running flag.
///
/// All changes to inputs, outputs and device formats go through
/// [`CaptureSession::begin_configuration`].
#[derive(Debug, Default)]
pub struct CaptureSession {
    state: Mutex<SessionState>,
    running: AtomicBool,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a configuration bracket.
    ///
    /// The session is locked against other configuration until the returned
    /// guard is committed or dropped. Dropping without `commit` discards
    /// every staged change.
    pub fn begin_configuration(&self) -> SessionConfiguration<'_> {
        SessionConfiguration {
            state: self.lock_state(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            formats: Vec::new(),
            committed: false,
        }
    }

    pub fn inputs(&self) -> Vec<DeviceInput> {
        self.lock_state().inputs.clone()
    }

    pub fn outputs(&self) -> Vec<CaptureOutput> {
        self.lock_state().outputs.clone()
    }

    pub fn is_configured(&self) -> bool {
        let state = self.lock_state();
        !state.inputs.is_empty() && !state.outputs.is_empty()
    }

    /// Start the flow of frames. Requires at least one input.
    pub fn start_running(&self) -> Result<(), CameraError> {
        if self.lock_state().inputs.is_empty() {
            return Err(CameraError::NotReady("session has no input".to_string()));
        }
        if !self.running.swap(true, Ordering::SeqCst) {
            log::info!("Capture session started");
        }
        Ok(())
    }

    pub fn stop_running(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("Capture session stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Staged changes to a [`CaptureSession`], applied together by [`commit`].
///
/// [`commit`]: SessionConfiguration::commit
pub struct SessionConfiguration<'a> {
    state: MutexGuard<'a, SessionState>,
    inputs: Vec<DeviceInput>,
    outputs: Vec<CaptureOutput>,
    formats: Vec<(Arc<dyn CaptureDevice>, DeviceFormat)>,
    committed: bool,
}

impl SessionConfiguration<'_> {
    /// An input can be added once per device.
    pub fn can_add_input(&self, input: &DeviceInput) -> bool {
        !self
            .state
            .inputs
            .iter()
            .chain(self.inputs.iter())
            .any(|existing| existing.device_id() == input.device_id())
    }

    pub fn add_input(&mut self, input: DeviceInput) -> Result<(), CameraError> {
        if !self.can_add_input(&input) {
            return Err(CameraError::NotReady(format!(
                "input for '{}' already attached",
                input.device_id()
            )));
        }
        self.inputs.push(input);
        Ok(())
    }

    /// An output can be attached to a session only once.
    pub fn can_add_output(&self, output: &CaptureOutput) -> bool {
        !self
            .state
            .outputs
            .iter()
            .chain(self.outputs.iter())
            .any(|existing| existing.same_as(output))
    }

    pub fn add_output(&mut self, output: CaptureOutput) -> Result<(), CameraError> {
        if !self.can_add_output(&output) {
            return Err(CameraError::NotReady("output already attached".to_string()));
        }
        self.outputs.push(output);
        Ok(())
    }

    /// Stage an active format change for `device`.
    pub fn set_active_format(
        &mut self,
        device: Arc<dyn CaptureDevice>,
        format: DeviceFormat,
    ) -> Result<(), CameraError> {
        if !device.formats().contains(&format) {
            return Err(CameraError::UnsupportedFormat(format));
        }
        self.formats.push((device, format));
        Ok(())
    }

    /// Apply every staged change, or none of them.
    pub fn commit(mut self) -> Result<(), CameraError> {
        let formats = std::mem::take(&mut self.formats);
        apply_formats(&formats)?;

        let inputs = std::mem::take(&mut self.inputs);
        let outputs = std::mem::take(&mut self.outputs);
        self.state.inputs.extend(inputs);
        self.state.outputs.extend(outputs);
        self.committed = true;
        Ok(())
    }
}

impl Drop for SessionConfiguration<'_> {
    fn drop(&mut self) {
        if !self.committed {
            log::debug!(
                "Session configuration discarded ({} input(s), {} output(s), {} format change(s))",
                self.inputs.len(),
                self.outputs.len(),
                self.formats.len()
            );
        }
    }
}

/// Lock every device first, then switch formats. If any switch fails the
/// formats already changed are put back before the locks are released.
fn apply_formats(formats: &[(Arc<dyn CaptureDevice>, DeviceFormat)]) -> Result<(), CameraError> {
    let locks = formats
        .iter()
        .map(|(device, _)| DeviceConfigLock::acquire(device.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut applied: Vec<(usize, Option<DeviceFormat>)> = Vec::new();
    for (i, (device, format)) in formats.iter().enumerate() {
        let previous = device.active_format();
        if let Err(e) = locks[i].set_active_format(format) {
            for (j, previous) in applied.into_iter().rev() {
                if let Some(previous) = previous {
                    if let Err(restore) = locks[j].set_active_format(&previous) {
                        log::error!("Failed to restore format {}: {}", previous, restore);
                    }
                }
            }
            return Err(e);
        }
        log::info!("Active format for '{}' set to {}", device.info().name, format);
        applied.push((i, previous));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::device::CaptureBackend;
    use crate::camera::types::DevicePosition;
    use crate::camera::virtual_device::{VirtualBackend, VirtualCamera};

    fn backend() -> (VirtualBackend, Arc<VirtualCamera>) {
        let camera = Arc::new(VirtualCamera::new(
            "back",
            DevicePosition::Back,
            vec![DeviceFormat::new(1920, 1080, 30.0), DeviceFormat::new(1280, 720, 240.0)],
        ));
        (VirtualBackend::with_cameras(vec![camera.clone()]), camera)
    }

    #[test]
    fn test_commit_applies_inputs_and_outputs() {
        let (backend, camera) = backend();
        let session = CaptureSession::new();

        let mut config = session.begin_configuration();
        config.add_input(backend.open_input(camera).unwrap()).unwrap();
        config
            .add_output(CaptureOutput::Photo(backend.photo_output()))
            .unwrap();
        config.commit().unwrap();

        assert_eq!(session.inputs().len(), 1);
        assert_eq!(session.outputs().len(), 1);
        assert!(session.is_configured());
    }

    #[test]
    fn test_drop_without_commit_discards_changes() {
        let (backend, _camera) = backend();
        let session = CaptureSession::new();
        {
            let mut config = session.begin_configuration();
            config
                .add_output(CaptureOutput::Movie(backend.movie_output()))
                .unwrap();
        }
        assert!(session.outputs().is_empty());
        assert!(!session.is_configured());
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let (backend, camera) = backend();
        let session = CaptureSession::new();
        let mut config = session.begin_configuration();
        config
            .add_input(backend.open_input(camera.clone()).unwrap())
            .unwrap();

        let again = backend.open_input(camera).unwrap();
        assert!(!config.can_add_input(&again));
        assert!(config.add_input(again).is_err());
    }

    #[test]
    fn test_format_lock_failure_leaves_session_untouched() {
        let (backend, camera) = backend();
        camera.fail_lock(true);
        let session = CaptureSession::new();

        let mut config = session.begin_configuration();
        config
            .add_input(backend.open_input(camera.clone()).unwrap())
            .unwrap();
        config
            .add_output(CaptureOutput::Movie(backend.movie_output()))
            .unwrap();
        config
            .set_active_format(camera.clone(), DeviceFormat::new(1280, 720, 240.0))
            .unwrap();
        assert!(matches!(config.commit(), Err(CameraError::LockFailed(_))));

        assert!(session.inputs().is_empty());
        assert!(session.outputs().is_empty());
        assert_eq!(camera.active_format(), Some(DeviceFormat::new(1920, 1080, 30.0)));
        assert!(!camera.is_locked());
    }

    #[test]
    fn test_unsupported_format_rejected_when_staged() {
        let (_backend, camera) = backend();
        let session = CaptureSession::new();
        let mut config = session.begin_configuration();
        let result = config.set_active_format(camera, DeviceFormat::new(640, 480, 60.0));
        assert!(matches!(result, Err(CameraError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_start_running_requires_input() {
        let session = CaptureSession::new();
        assert!(session.start_running().is_err());
        assert!(!session.is_running());
    }

    #[test]
    fn test_start_and_stop_running() {
        let (backend, camera) = backend();
        let session = CaptureSession::new();
        let mut config = session.begin_configuration();
        config.add_input(backend.open_input(camera).unwrap()).unwrap();
        config.commit().unwrap();

        session.start_running().unwrap();
        assert!(session.is_running());
        session.stop_running();
        assert!(!session.is_running());
    }
}
