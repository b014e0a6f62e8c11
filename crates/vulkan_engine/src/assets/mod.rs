//! Asset loading collaborators
//!
//! Mesh, image and shader bytecode loading. These are black boxes to the
//! renderer: they either yield plain CPU-side arrays or fail with an
//! [`AssetError`].

mod image_loader;
mod mesh_loader;
mod shader_loader;

use std::path::PathBuf;

use thiserror::Error;

pub use image_loader::{load_image, ImageData};
pub use mesh_loader::{load_mesh, MeshData};
pub use shader_loader::read_binary;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file does not exist
    #[error("File not found: {}", path.display())]
    FileNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// The file exists but could not be read or decoded
    #[error("Failed to load asset {}: {reason}", path.display())]
    AssetLoadFailure {
        /// Path that was requested
        path: PathBuf,
        /// Decoder or IO diagnostic
        reason: String,
    },
}

/// Result type for asset loading
pub type AssetResult<T> = Result<T, AssetError>;

impl AssetError {
    pub(crate) fn load_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetLoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
