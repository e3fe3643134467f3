//! Capture devices, device enumeration and the backend seam.

use std::fmt;
use std::sync::Arc;

use super::output::{MovieFileOutput, PhotoOutput};
use super::types::{CameraError, CameraInfo, DeviceFormat, DevicePosition, DeviceType};

/// A physical (or virtual) camera.
///
/// Format changes require an exclusive configuration lock, taken through
/// [`DeviceConfigLock::acquire`] so that it is released on every exit path.
pub trait CaptureDevice: Send + Sync + fmt::Debug {
    fn info(&self) -> &CameraInfo;

    /// Formats in the order the device enumerates them.
    fn formats(&self) -> Vec<DeviceFormat>;

    fn active_format(&self) -> Option<DeviceFormat>;

    fn lock_for_configuration(&self) -> Result<(), CameraError>;

    fn unlock_for_configuration(&self);

    /// Switch the active format. Only valid while the configuration lock is held.
    fn set_active_format(&self, format: &DeviceFormat) -> Result<(), CameraError>;
}

/// Held configuration lock on a device. Unlocks on drop.
pub struct DeviceConfigLock<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> DeviceConfigLock<'a> {
    pub fn acquire(device: &'a dyn CaptureDevice) -> Result<Self, CameraError> {
        device.lock_for_configuration()?;
        Ok(Self { device })
    }

    pub fn set_active_format(&self, format: &DeviceFormat) -> Result<(), CameraError> {
        self.device.set_active_format(format)
    }
}

impl Drop for DeviceConfigLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}

/// A device opened as a session input.
#[derive(Debug, Clone)]
pub struct DeviceInput {
    device: Arc<dyn CaptureDevice>,
}

impl DeviceInput {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &Arc<dyn CaptureDevice> {
        &self.device
    }

    pub fn device_id(&self) -> &str {
        &self.device.info().id
    }
}

/// Platform capture framework.
///
/// Everything the camera screen needs from the platform goes through this
/// trait: device discovery, opening inputs and creating outputs.
pub trait CaptureBackend: Send + Sync {
    fn devices(&self) -> Vec<Arc<dyn CaptureDevice>>;

    /// Open `device` so it can be attached to a session.
    fn open_input(&self, device: Arc<dyn CaptureDevice>) -> Result<DeviceInput, CameraError>;

    fn photo_output(&self) -> Arc<dyn PhotoOutput>;

    fn movie_output(&self) -> Arc<dyn MovieFileOutput>;

    /// The single default device for a type and position.
    ///
    /// There is no fallback search: if no device matches exactly, `None`.
    fn default_device(
        &self,
        device_type: DeviceType,
        position: DevicePosition,
    ) -> Option<Arc<dyn CaptureDevice>> {
        self.devices().into_iter().find(|d| {
            let info = d.info();
            info.device_type == device_type && info.position == position
        })
    }
}

/// List all camera devices a backend exposes.
///
/// Returns an empty vector when there are no cameras (not an error).
pub fn list_devices(backend: &dyn CaptureBackend) -> Vec<CameraInfo> {
    backend.devices().iter().map(|d| d.info().clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::virtual_device::{VirtualBackend, VirtualCamera};

    #[test]
    fn test_default_device_matches_type_and_position() {
        let backend = VirtualBackend::new(vec![
            VirtualCamera::new("front", DevicePosition::Front, vec![]),
            VirtualCamera::new("back", DevicePosition::Back, vec![]),
        ]);

        let device = backend
            .default_device(DeviceType::BuiltInWideAngle, DevicePosition::Back)
            .expect("back camera should be found");
        assert_eq!(device.info().id, "back");
    }

    #[test]
    fn test_default_device_has_no_fallback() {
        let backend = VirtualBackend::new(vec![VirtualCamera::new(
            "front",
            DevicePosition::Front,
            vec![],
        )]);

        assert!(backend
            .default_device(DeviceType::BuiltInWideAngle, DevicePosition::Back)
            .is_none());
    }

    #[test]
    fn test_default_device_requires_exact_type() {
        let backend = VirtualBackend::new(vec![VirtualCamera::new(
            "tele",
            DevicePosition::Back,
            vec![],
        )
        .with_device_type(DeviceType::BuiltInTelephoto)]);

        assert!(backend
            .default_device(DeviceType::BuiltInWideAngle, DevicePosition::Back)
            .is_none());
        assert!(backend
            .default_device(DeviceType::BuiltInTelephoto, DevicePosition::Back)
            .is_some());
    }

    #[test]
    fn test_config_lock_released_on_drop() {
        let camera = Arc::new(VirtualCamera::new("back", DevicePosition::Back, vec![]));
        {
            let _lock = DeviceConfigLock::acquire(camera.as_ref()).unwrap();
            assert!(camera.is_locked());
        }
        assert!(!camera.is_locked());
    }

    #[test]
    fn test_list_devices_empty_backend() {
        let backend = VirtualBackend::new(vec![]);
        assert!(list_devices(&backend).is_empty());
    }
}
