//! # Core Engine Module
//!
//! Shared abstractions used throughout the engine. Currently this is the
//! renderer configuration consumed at startup.

pub mod config;

pub use config::{RendererConfig, ShaderConfig, WindowConfig};
