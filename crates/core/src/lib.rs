//! Core types and shared functionality for api2md.
//!
//! This crate provides:
//! - Unified error types
//! - Configuration structures
//! - The per-run output filename registry

pub mod config;
pub mod error;
pub mod registry;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use registry::{FilenameRegistry, RegistryError};
