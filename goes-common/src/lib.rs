//! Common utilities for the boot supervisor binaries.
//!
//! This crate provides shared functionality for the initrd-side tools:
//! - Logging macros
//! - Boot-operation telemetry

pub mod log;
pub mod telemetry;
