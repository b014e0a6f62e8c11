//! Placed models and the instance stream that feeds the batched draw

use std::path::Path;

use ash::vk;

use crate::assets::{self, AssetError, AssetResult, MeshData};
use crate::foundation::collections::{new_key_type, SlotMap};
use crate::foundation::math::Mat4;
use crate::render::backends::vulkan::initialization::DeviceContext;
use crate::render::backends::vulkan::rendering::{ActiveRenderPass, CommandPool, VERTEX_BINDING};
use crate::render::backends::vulkan::resources::Buffer;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};
use crate::render::managers::{IndirectDrawCommand, MeshId, MeshManager, TextureManager, DEFAULT_TEXTURE_INDEX};
use crate::render::vertex::InstanceData;
use crate::EngineResult;

new_key_type! {
    /// Handle to a model placed in the scene
    pub struct ModelHandle;
}

/// One placement of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedModel {
    /// Mesh drawn for this model
    pub mesh: MeshId,
    /// Material texture slot
    pub texture: u32,
    /// Model-to-world transform
    pub transform: Mat4,
}

/// Order instances so each mesh's instances are contiguous, meshes in id order
///
/// Within a mesh, placement order is preserved. The result lines up with the
/// cumulative `first_instance` of the mesh draw commands.
pub fn group_instances<'a>(models: impl IntoIterator<Item = &'a PlacedModel>, mesh_count: usize) -> Vec<InstanceData> {
    let mut buckets: Vec<Vec<InstanceData>> = vec![Vec::new(); mesh_count];
    for model in models {
        if let Some(bucket) = buckets.get_mut(model.mesh) {
            bucket.push(InstanceData::new(&model.transform, model.texture));
        }
    }
    buckets.into_iter().flatten().collect()
}

/// Resolve the mesh and texture of one placement, registering both or neither
///
/// New geometry is loaded before the texture is touched, and the mesh is
/// counted only once the texture resolved, so a failure on either side
/// leaves no reference behind.
pub fn register_placement<E: From<AssetError>>(
    meshes: &mut MeshManager,
    mesh_path: &Path,
    load_mesh: impl FnOnce() -> AssetResult<MeshData>,
    register_texture: impl FnOnce() -> Result<u32, E>,
) -> Result<(MeshId, u32), E> {
    let staged = if meshes.registry().contains(mesh_path) {
        None
    } else {
        Some(load_mesh()?)
    };
    let texture = register_texture()?;
    let mesh = meshes.register_with(mesh_path, || {
        staged.ok_or_else(|| AssetError::load_failure(mesh_path, "mesh geometry was not staged"))
    })?;
    Ok((mesh, texture))
}

/// Owns the scene's meshes, textures and placements
///
/// Field order is teardown order: GPU instance data first, then the mesh and
/// texture managers.
pub struct ModelManager {
    instance_buffer: Option<Buffer>,
    meshes: MeshManager,
    textures: TextureManager,
    models: SlotMap<ModelHandle, PlacedModel>,
    placement_order: Vec<ModelHandle>,
    instances_dirty: bool,
}

impl ModelManager {
    /// Create an empty scene with the default texture uploaded
    pub fn new(context: &DeviceContext, pool: &CommandPool) -> VulkanResult<Self> {
        Ok(Self {
            instance_buffer: None,
            meshes: MeshManager::new(),
            textures: TextureManager::new(context, pool)?,
            models: SlotMap::with_key(),
            placement_order: Vec::new(),
            instances_dirty: false,
        })
    }

    /// Place a mesh in the scene
    ///
    /// The mesh is loaded on first sight of its path; the texture is uploaded
    /// immediately on first sight. Nothing is drawn until [`Self::upload`].
    pub fn add_model(
        &mut self,
        context: &DeviceContext,
        pool: &CommandPool,
        mesh_path: impl AsRef<Path>,
        texture_path: Option<&Path>,
        transform: Mat4,
    ) -> EngineResult<ModelHandle> {
        let mesh_path = mesh_path.as_ref();
        let textures = &mut self.textures;
        let (mesh, texture) = register_placement(
            &mut self.meshes,
            mesh_path,
            || assets::load_mesh(mesh_path),
            || match texture_path {
                Some(path) => textures.register(context, pool, path),
                None => Ok(DEFAULT_TEXTURE_INDEX),
            },
        )?;

        let handle = self.models.insert(PlacedModel { mesh, texture, transform });
        self.placement_order.push(handle);
        self.instances_dirty = true;

        log::debug!(
            "Model placed: {} (mesh {mesh}, texture {texture})",
            mesh_path.display()
        );
        Ok(handle)
    }

    /// Update a model's transform; takes effect on the next instance upload
    pub fn set_transform(&mut self, handle: ModelHandle, transform: Mat4) -> VulkanResult<()> {
        let model = self.models.get_mut(handle).ok_or_else(|| VulkanError::InvalidOperation {
            reason: format!("unknown model {handle:?}"),
        })?;
        model.transform = transform;
        self.instances_dirty = true;
        Ok(())
    }

    /// Placement of `handle`
    pub fn model(&self, handle: ModelHandle) -> Option<&PlacedModel> {
        self.models.get(handle)
    }

    /// Whether GPU buffers lag behind the CPU-side scene
    pub const fn needs_upload(&self) -> bool {
        self.instances_dirty || self.meshes.is_dirty()
    }

    /// Rebuild stale GPU buffers
    ///
    /// Mesh buffers are rebuilt only when new geometry was registered; the
    /// instance buffer whenever any placement changed. The caller must ensure
    /// no in-flight frame reads the buffers being replaced.
    pub fn upload(&mut self, context: &DeviceContext, pool: &CommandPool) -> VulkanResult<()> {
        if self.meshes.is_dirty() {
            self.meshes.rebuild(context, pool)?;
        }
        if self.instances_dirty {
            self.rebuild_instances(context, pool)?;
        }
        Ok(())
    }

    fn rebuild_instances(&mut self, context: &DeviceContext, pool: &CommandPool) -> VulkanResult<()> {
        self.instance_buffer = None;
        let ordered = self.placement_order.iter().filter_map(|&handle| self.models.get(handle));
        let instances = group_instances(ordered, self.meshes.registry().mesh_count());

        if !instances.is_empty() {
            self.instance_buffer = Some(Buffer::device_local_with_data(
                context,
                pool,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                bytemuck::cast_slice(&instances),
            )?);
        }
        self.instances_dirty = false;
        log::trace!("Instance buffer rebuilt: {} instances", instances.len());
        Ok(())
    }

    /// Bind the shared buffers and issue one indirect draw for every batch
    ///
    /// Records nothing when the scene has not been uploaded yet.
    pub fn record_draw(&self, pass: &mut ActiveRenderPass<'_, '_>) {
        let (Some(vertices), Some(indices), Some(indirect), Some(instances)) = (
            self.meshes.vertex_buffer(),
            self.meshes.index_buffer(),
            self.meshes.indirect_buffer(),
            self.instance_buffer.as_ref().map(Buffer::handle),
        ) else {
            return;
        };

        // Instance stream sits at the binding after the vertex stream
        pass.bind_vertex_buffers(VERTEX_BINDING, &[vertices, instances], &[0, 0]);
        pass.bind_index_buffer(indices, 0);
        pass.draw_indexed_indirect(indirect, 0, self.meshes.draw_count(), IndirectDrawCommand::STRIDE);
    }

    /// Texture cache
    pub const fn textures(&self) -> &TextureManager {
        &self.textures
    }

    /// Mesh manager
    pub const fn meshes(&self) -> &MeshManager {
        &self.meshes
    }

    /// Number of placed models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no models are placed
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::DedupRegistry;
    use crate::foundation::math::Vec3;
    use crate::render::vertex::Vertex;
    use crate::EngineError;
    use std::path::PathBuf;

    fn triangle() -> AssetResult<MeshData> {
        let vertex = Vertex::new([0.0; 3], [0.0, 1.0, 0.0], [0.0; 2]);
        Ok(MeshData::new(vec![vertex; 3], vec![0, 1, 2]))
    }

    fn texture_in(store: &mut DedupRegistry<PathBuf, ()>, path: &str) -> Result<u32, EngineError> {
        Ok(store.register_with(PathBuf::from(path), || Ok::<_, EngineError>(()))? as u32)
    }

    fn missing_texture() -> Result<u32, EngineError> {
        Err(AssetError::load_failure("missing.png", "no such file").into())
    }

    fn placed(mesh: MeshId, x: f32) -> PlacedModel {
        PlacedModel {
            mesh,
            texture: mesh as u32,
            transform: Mat4::new_translation(&Vec3::new(x, 0.0, 0.0)),
        }
    }

    #[test]
    fn test_instances_grouped_by_mesh_in_placement_order() {
        let models = [placed(1, 0.0), placed(0, 1.0), placed(1, 2.0), placed(0, 3.0)];
        let instances = group_instances(&models, 2);

        let xs: Vec<f32> = instances.iter().map(|i| i.model[3][0]).collect();
        assert_eq!(xs, vec![1.0, 3.0, 0.0, 2.0]);
        assert_eq!(instances[0].texture_index, 0);
        assert_eq!(instances[2].texture_index, 1);
    }

    #[test]
    fn test_unknown_mesh_ids_are_skipped() {
        let models = [placed(0, 0.0), placed(5, 1.0)];
        assert_eq!(group_instances(&models, 1).len(), 1);
    }

    #[test]
    fn test_failed_mesh_load_leaves_texture_unregistered() {
        let mut meshes = MeshManager::new();
        let mut textures = DedupRegistry::new();

        let result = register_placement(
            &mut meshes,
            Path::new("broken.obj"),
            || Err(AssetError::load_failure("broken.obj", "bad face")),
            || texture_in(&mut textures, "wood.png"),
        );

        assert!(matches!(result, Err(EngineError::Asset(_))));
        assert!(textures.is_empty());
        assert_eq!(meshes.registry().mesh_count(), 0);
        assert!(!meshes.is_dirty());
    }

    #[test]
    fn test_failed_texture_leaves_new_mesh_unregistered() {
        let mut meshes = MeshManager::new();

        let result = register_placement(&mut meshes, Path::new("cube.obj"), triangle, missing_texture);

        assert!(result.is_err());
        assert_eq!(meshes.registry().mesh_count(), 0);
        assert!(meshes.registry().vertices().is_empty());
        assert!(!meshes.is_dirty());
    }

    #[test]
    fn test_failed_texture_does_not_count_known_mesh() {
        let mut meshes = MeshManager::new();
        let mut textures = DedupRegistry::new();
        let cube = Path::new("cube.obj");
        let (mesh, _) = register_placement(&mut meshes, cube, triangle, || texture_in(&mut textures, "a.png")).unwrap();

        let result = register_placement(&mut meshes, cube, || panic!("geometry reloaded"), missing_texture);

        assert!(result.is_err());
        assert_eq!(meshes.registry().instance_count(mesh), 1);
    }

    #[test]
    fn test_repeated_placements_share_mesh_and_texture() {
        let mut meshes = MeshManager::new();
        let mut textures = DedupRegistry::new();
        let cube = Path::new("cube.obj");

        let placements: Vec<_> = (0..3)
            .map(|_| register_placement(&mut meshes, cube, triangle, || texture_in(&mut textures, "a.png")).unwrap())
            .collect();

        assert!(placements.iter().all(|&placement| placement == (0, 0)));
        assert_eq!(meshes.registry().instance_count(0), 3);
        assert_eq!(meshes.registry().vertices().len(), 3);
        assert_eq!(textures.ref_count(0), 3);
        assert!(meshes.is_dirty());
    }
}
