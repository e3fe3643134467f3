//! CLI enum types for camera selection.

use clap::ValueEnum;

use crate::camera::DevicePosition;

/// Which camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Facing {
    Back,
    Front,
}

impl From<Facing> for DevicePosition {
    fn from(f: Facing) -> Self {
        match f {
            Facing::Back => DevicePosition::Back,
            Facing::Front => DevicePosition::Front,
        }
    }
}
