//! Rendering system
//!
//! Backend-agnostic render types (vertex formats, camera, lighting, overlay
//! hook), the resource managers that batch scene data, and the Vulkan backend
//! that drives the frame loop.

pub mod backends;
pub mod camera;
pub mod lighting;
pub mod managers;
pub mod overlay;
pub mod vertex;

pub use camera::{Camera, FlyCameraController};
pub use lighting::DirectionalLight;
pub use managers::{ModelHandle, ModelManager};
pub use overlay::{OverlayFrame, UiOverlay};
pub use vertex::{GlobalUniforms, InstanceData, ObjectPushConstants, Vertex};
