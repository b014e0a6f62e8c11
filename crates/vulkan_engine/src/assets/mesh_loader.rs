//! OBJ mesh loading

use std::path::Path;

use super::{AssetError, AssetResult};
use crate::render::Vertex;

/// Indexed triangle geometry produced by the mesh loader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Unique vertices
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create mesh data from raw arrays
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }
}

/// Load an OBJ file, merging every object in it into one indexed mesh
///
/// Texture coordinates are flipped vertically to match Vulkan's top-left
/// image origin.
pub fn load_mesh<P: AsRef<Path>>(path: P) -> AssetResult<MeshData> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AssetError::FileNotFound { path: path.to_path_buf() });
    }

    let (models, _materials) =
        tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|e| AssetError::load_failure(path, e))?;

    let mut mesh = MeshData::default();
    for model in &models {
        let source = &model.mesh;
        let base = mesh.vertices.len() as u32;
        let vertex_count = source.positions.len() / 3;

        for i in 0..vertex_count {
            let position = [
                source.positions[3 * i],
                source.positions[3 * i + 1],
                source.positions[3 * i + 2],
            ];
            let normal = if source.normals.len() >= 3 * (i + 1) {
                [source.normals[3 * i], source.normals[3 * i + 1], source.normals[3 * i + 2]]
            } else {
                [0.0, 1.0, 0.0]
            };
            let tex_coord = if source.texcoords.len() >= 2 * (i + 1) {
                [source.texcoords[2 * i], 1.0 - source.texcoords[2 * i + 1]]
            } else {
                [0.0, 0.0]
            };
            mesh.vertices.push(Vertex::new(position, normal, tex_coord));
        }

        mesh.indices.extend(source.indices.iter().map(|&index| base + index));
    }

    if mesh.indices.is_empty() {
        return Err(AssetError::load_failure(path, "mesh contains no triangles"));
    }

    log::debug!(
        "Loaded mesh {} ({} vertices, {} indices)",
        path.display(),
        mesh.vertices.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_OBJ: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

    #[test]
    fn test_loads_quad() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        std::fs::write(&path, QUAD_OBJ).unwrap();

        let mesh = load_mesh(&path).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));

        // First vertex has v = 0 in the file, flipped to 1
        let first = mesh.vertices[mesh.indices[0] as usize];
        assert!((first.tex_coord[1] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_mesh() {
        assert!(matches!(load_mesh("nope/cube.obj"), Err(AssetError::FileNotFound { .. })));
    }
}
