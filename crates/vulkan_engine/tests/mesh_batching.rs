//! Mesh registration and indirect command layout, exercised through real OBJ files

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vulkan_engine::assets::load_mesh;
use vulkan_engine::render::managers::{IndirectDrawCommand, MeshRegistry};

const CUBE_OBJ: &str = "\
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
f 1 2 3
f 3 4 1
f 6 5 8
f 8 7 6
f 2 6 7
f 7 3 2
f 5 1 4
f 4 8 5
f 4 3 7
f 7 8 4
f 5 6 2
f 2 1 5
";

const TRIANGLE_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";

fn write_obj(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn assert_partitioned(commands: &[IndirectDrawCommand], index_size: usize) {
    let mut next_index = 0;
    for command in commands {
        assert_eq!(command.first_index, next_index, "index ranges overlap or leave gaps");
        next_index += command.index_count;
    }
    assert_eq!(next_index as usize, index_size);
}

#[test]
fn test_same_cube_three_times_is_one_batch() {
    let dir = TempDir::new().unwrap();
    let cube = write_obj(&dir, "cube.obj", CUBE_OBJ);
    let unique_indices = load_mesh(&cube).unwrap().indices.len();

    let mut registry = MeshRegistry::new();
    let ids: Vec<_> = (0..3).map(|_| registry.register(&cube).unwrap()).collect();

    assert_eq!(ids, vec![0, 0, 0]);
    assert_eq!(registry.mesh_count(), 1);
    assert_eq!(registry.index_size(), unique_indices);
    assert_eq!(registry.index_size(), 36);

    let range = registry.range(0).unwrap();
    assert_eq!(range.first_vertex, 0);
    assert_eq!(range.vertex_count as usize, registry.vertices().len());

    let commands = registry.draw_commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].instance_count, 3);
    assert_eq!(commands[0].first_instance, 0);
    assert_eq!(commands[0].index_count as usize, unique_indices);
}

#[test]
fn test_two_meshes_partition_the_index_buffer() {
    let dir = TempDir::new().unwrap();
    let a = write_obj(&dir, "a.obj", CUBE_OBJ);
    let b = write_obj(&dir, "b.obj", TRIANGLE_OBJ);

    let mut registry = MeshRegistry::new();
    registry.register(&a).unwrap();
    registry.register(&b).unwrap();
    registry.register(&a).unwrap();

    let commands = registry.draw_commands();
    assert_eq!(commands.len(), 2);
    assert_eq!((commands[0].instance_count, commands[1].instance_count), (2, 1));
    assert_eq!((commands[0].first_instance, commands[1].first_instance), (0, 2));
    assert_eq!(commands[1].vertex_offset as usize, registry.range(0).unwrap().vertex_count as usize);
    assert_partitioned(&commands, registry.index_size());

    // Raw bytes go straight into the indirect buffer
    let bytes: &[u8] = bytemuck::cast_slice(&commands);
    assert_eq!(bytes.len(), 2 * IndirectDrawCommand::STRIDE as usize);
}

#[test]
fn test_missing_mesh_is_reported_and_not_registered() {
    let mut registry = MeshRegistry::new();
    let result = registry.register(Path::new("does/not/exist.obj"));

    assert!(result.is_err());
    assert_eq!(registry.mesh_count(), 0);
    assert!(registry.draw_commands().is_empty());
}
