//! Mesh registry and the shared vertex/index/indirect buffers built from it

use std::mem::size_of;
use std::path::{Path, PathBuf};

use ash::vk;
use bytemuck::{Pod, Zeroable};

use crate::assets::{self, AssetResult, MeshData};
use crate::foundation::collections::DedupRegistry;
use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::rendering::CommandPool;
use crate::render::backends::vulkan::resources::Buffer;
use crate::render::backends::vulkan::VulkanResult;
use crate::render::vertex::Vertex;

/// Index of a registered mesh, stable for the registry's lifetime
pub type MeshId = usize;

/// One indexed indirect draw, laid out as `VkDrawIndexedIndirectCommand`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectDrawCommand {
    /// Number of indices drawn
    pub index_count: u32,
    /// Number of instances drawn
    pub instance_count: u32,
    /// First index in the shared index buffer
    pub first_index: u32,
    /// Added to each index before fetching a vertex
    pub vertex_offset: i32,
    /// First entry in the instance stream
    pub first_instance: u32,
}

impl IndirectDrawCommand {
    /// Byte stride between consecutive commands
    pub const STRIDE: u32 = size_of::<Self>() as u32;
}

/// Where a mesh lives inside the shared buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRange {
    /// First vertex in the shared vertex array
    pub first_vertex: u32,
    /// Number of vertices
    pub vertex_count: u32,
    /// First index in the shared index array
    pub first_index: u32,
    /// Number of indices
    pub index_count: u32,
}

/// CPU-side mesh registry
///
/// Each unique path contributes its geometry exactly once; registering it
/// again only adds an instance.
#[derive(Debug, Default)]
pub struct MeshRegistry {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    meshes: DedupRegistry<PathBuf, MeshRange>,
}

impl MeshRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh file, loading it from disk on first sight
    pub fn register(&mut self, path: impl AsRef<Path>) -> AssetResult<MeshId> {
        let path = path.as_ref();
        self.register_with(path, || assets::load_mesh(path))
    }

    /// Register `path`, calling `load` only if the path is new
    pub fn register_with(
        &mut self,
        path: impl AsRef<Path>,
        load: impl FnOnce() -> AssetResult<MeshData>,
    ) -> AssetResult<MeshId> {
        let vertices = &mut self.vertices;
        let indices = &mut self.indices;
        self.meshes.register_with(path.as_ref().to_path_buf(), || {
            let mesh = load()?;
            let range = MeshRange {
                first_vertex: vertices.len() as u32,
                vertex_count: mesh.vertices.len() as u32,
                first_index: indices.len() as u32,
                index_count: mesh.indices.len() as u32,
            };
            vertices.extend_from_slice(&mesh.vertices);
            indices.extend_from_slice(&mesh.indices);
            Ok(range)
        })
    }

    /// Whether `path` already has geometry in the registry
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.meshes.index_of(path.as_ref()).is_some()
    }

    /// Number of instances registered for `mesh`
    pub fn instance_count(&self, mesh: MeshId) -> u32 {
        self.meshes.ref_count(mesh)
    }

    /// Range of `mesh` in the shared arrays
    pub fn range(&self, mesh: MeshId) -> Option<&MeshRange> {
        self.meshes.get(mesh)
    }

    /// One command per unique mesh, in registration order
    ///
    /// `first_instance` accumulates, so instances of mesh `n` must follow all
    /// instances of meshes `0..n` in the instance stream.
    pub fn draw_commands(&self) -> Vec<IndirectDrawCommand> {
        let mut first_instance = 0;
        self.meshes
            .items()
            .iter()
            .enumerate()
            .map(|(id, range)| {
                let instance_count = self.meshes.ref_count(id);
                let command = IndirectDrawCommand {
                    index_count: range.index_count,
                    instance_count,
                    first_index: range.first_index,
                    vertex_offset: range.first_vertex as i32,
                    first_instance,
                };
                first_instance += instance_count;
                command
            })
            .collect()
    }

    /// Shared vertex array
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Shared index array
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of indices across all unique meshes
    pub fn index_size(&self) -> usize {
        self.indices.len()
    }

    /// Number of unique meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Total instances across all meshes
    pub fn total_instances(&self) -> u32 {
        (0..self.meshes.len()).map(|id| self.meshes.ref_count(id)).sum()
    }
}

/// GPU copy of a [`MeshRegistry`]
///
/// Buffers are rebuilt wholesale from the registry snapshot; there is no
/// incremental patching.
pub struct MeshManager {
    registry: MeshRegistry,
    vertex_buffer: Option<Buffer>,
    index_buffer: Option<Buffer>,
    indirect_buffer: Option<Buffer>,
    draw_count: u32,
    dirty: bool,
}

impl MeshManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self {
            registry: MeshRegistry::new(),
            vertex_buffer: None,
            index_buffer: None,
            indirect_buffer: None,
            draw_count: 0,
            dirty: false,
        }
    }

    /// Register a mesh, calling `load` only if the path is new
    ///
    /// The GPU buffers go stale until [`Self::rebuild`]; a failed load
    /// leaves them untouched.
    pub fn register_with(
        &mut self,
        path: impl AsRef<Path>,
        load: impl FnOnce() -> AssetResult<MeshData>,
    ) -> AssetResult<MeshId> {
        let id = self.registry.register_with(path, load)?;
        self.dirty = true;
        Ok(id)
    }

    /// Replace the vertex, index and indirect buffers with the registry contents
    ///
    /// The caller must ensure no in-flight frame still reads the old buffers.
    pub fn rebuild(&mut self, context: &DeviceContext, pool: &CommandPool) -> VulkanResult<()> {
        self.vertex_buffer = None;
        self.index_buffer = None;
        self.indirect_buffer = None;
        self.draw_count = 0;

        if self.registry.mesh_count() == 0 {
            self.dirty = false;
            return Ok(());
        }

        let commands = self.registry.draw_commands();
        self.vertex_buffer = Some(Buffer::device_local_with_data(
            context,
            pool,
            vk::BufferUsageFlags::VERTEX_BUFFER,
            bytemuck::cast_slice(self.registry.vertices()),
        )?);
        self.index_buffer = Some(Buffer::device_local_with_data(
            context,
            pool,
            vk::BufferUsageFlags::INDEX_BUFFER,
            bytemuck::cast_slice(self.registry.indices()),
        )?);
        self.indirect_buffer = Some(Buffer::device_local_with_data(
            context,
            pool,
            vk::BufferUsageFlags::INDIRECT_BUFFER,
            bytemuck::cast_slice(&commands),
        )?);
        self.draw_count = commands.len() as u32;
        self.dirty = false;

        log::info!(
            "Mesh buffers rebuilt: {} meshes, {} vertices, {} indices, {} instances",
            self.registry.mesh_count(),
            self.registry.vertices().len(),
            self.registry.index_size(),
            self.registry.total_instances()
        );
        Ok(())
    }

    /// CPU-side registry
    pub const fn registry(&self) -> &MeshRegistry {
        &self.registry
    }

    /// Whether registrations happened since the last rebuild
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Vertex buffer handle, if built
    pub fn vertex_buffer(&self) -> Option<vk::Buffer> {
        self.vertex_buffer.as_ref().map(Buffer::handle)
    }

    /// Index buffer handle, if built
    pub fn index_buffer(&self) -> Option<vk::Buffer> {
        self.index_buffer.as_ref().map(Buffer::handle)
    }

    /// Indirect command buffer handle, if built
    pub fn indirect_buffer(&self) -> Option<vk::Buffer> {
        self.indirect_buffer.as_ref().map(Buffer::handle)
    }

    /// Number of indirect commands in the built buffer
    pub const fn draw_count(&self) -> u32 {
        self.draw_count
    }
}

impl Default for MeshManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetError;

    fn triangle() -> MeshData {
        MeshData::new(vec![Vertex::default(); 3], vec![0, 1, 2])
    }

    fn quad() -> MeshData {
        MeshData::new(vec![Vertex::default(); 4], vec![0, 1, 2, 2, 3, 0])
    }

    #[test]
    fn test_repeat_registration_adds_instances_only() {
        let mut registry = MeshRegistry::new();
        let mut loads = 0;
        for _ in 0..4 {
            let id = registry
                .register_with("tri.obj", || {
                    loads += 1;
                    Ok(triangle())
                })
                .unwrap();
            assert_eq!(id, 0);
        }

        assert_eq!(loads, 1);
        assert_eq!(registry.mesh_count(), 1);
        assert_eq!(registry.instance_count(0), 4);
        assert_eq!(registry.vertices().len(), 3);
        assert_eq!(registry.index_size(), 3);
    }

    #[test]
    fn test_commands_accumulate_first_instance() {
        let mut registry = MeshRegistry::new();
        registry.register_with("a.obj", || Ok(quad())).unwrap();
        registry.register_with("b.obj", || Ok(triangle())).unwrap();
        registry.register_with("a.obj", || Ok(quad())).unwrap();
        registry.register_with("b.obj", || Ok(triangle())).unwrap();
        registry.register_with("b.obj", || Ok(triangle())).unwrap();

        let commands = registry.draw_commands();
        assert_eq!(
            commands,
            vec![
                IndirectDrawCommand {
                    index_count: 6,
                    instance_count: 2,
                    first_index: 0,
                    vertex_offset: 0,
                    first_instance: 0,
                },
                IndirectDrawCommand {
                    index_count: 3,
                    instance_count: 3,
                    first_index: 6,
                    vertex_offset: 4,
                    first_instance: 2,
                },
            ]
        );
        assert_eq!(registry.total_instances(), 5);
    }

    #[test]
    fn test_failed_load_registers_nothing() {
        let mut registry = MeshRegistry::new();
        let result = registry.register_with("missing.obj", || {
            Err(AssetError::FileNotFound {
                path: PathBuf::from("missing.obj"),
            })
        });

        assert!(matches!(result, Err(AssetError::FileNotFound { .. })));
        assert_eq!(registry.mesh_count(), 0);
        assert!(registry.vertices().is_empty());
        assert!(registry.draw_commands().is_empty());
    }

    #[test]
    fn test_command_matches_vulkan_layout() {
        assert_eq!(
            IndirectDrawCommand::STRIDE as usize,
            size_of::<vk::DrawIndexedIndirectCommand>()
        );
    }
}
