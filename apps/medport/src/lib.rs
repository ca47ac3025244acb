//! # MedPort Library
//!
//! This library exposes the MedPort modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;

// Re-export the inner crates for convenience
pub use medport_client;
pub use medport_core;
