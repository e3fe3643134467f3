//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, and subcommand handlers.

mod args;
mod commands;
mod enums;

pub use args::{Args, Command, ConfigAction};
pub use commands::{
    handle_config_action, list_devices, run_photo, run_video, setup_ctrlc_handler,
    stop_requested,
};
pub use enums::Facing;
