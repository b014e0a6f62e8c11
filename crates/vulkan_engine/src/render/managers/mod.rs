//! Resource managers
//!
//! Meshes and textures are deduplicated by path into shared GPU buffers and a
//! texture array; placed models become instances of those meshes and are
//! drawn with a single indirect, instanced call.

pub mod mesh_manager;
pub mod model_manager;
pub mod texture_manager;

pub use mesh_manager::{IndirectDrawCommand, MeshId, MeshManager, MeshRange, MeshRegistry};
pub use model_manager::{group_instances, register_placement, ModelHandle, ModelManager, PlacedModel};
pub use texture_manager::{fill_texture_slots, TextureManager, DEFAULT_TEXTURE_INDEX};
