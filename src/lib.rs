//! snapcam library crate.
//!
//! A single-screen camera: an authorization gate, a capture session
//! controller and the sinks that move finished captures into the photo
//! library. Platform services sit behind traits; the virtual backend runs
//! the whole flow without hardware.

pub mod camera;
pub mod capture;
pub mod cli;
pub mod config;
pub mod library;
pub mod permissions;
pub mod persistence;
pub mod screen;
pub mod ui;
pub mod view;
