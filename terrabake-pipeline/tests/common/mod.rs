#![allow(dead_code)]

use glam::{Mat4, Vec2, Vec3};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use terrabake_core::*;
use terrabake_pipeline::PipelineConfig;
use terrabake_scene::*;

/// Flat-ish square grid of `size` world units with one UV layer.
pub fn grid(name: &str, size: f32, cells: u32) -> MeshData {
    let mut mesh = MeshData::new(name);
    let step = size / cells as f32;
    for z in 0..=cells {
        for x in 0..=cells {
            let h = ((x * 7 + z * 3) % 5) as f32 * 0.05;
            mesh.positions.push(Vec3::new(x as f32 * step, h, z as f32 * step));
        }
    }
    let row = cells + 1;
    for z in 0..cells {
        for x in 0..cells {
            let i = z * row + x;
            mesh.faces.push(Face { vertices: [i, i + row, i + 1], material_index: 0 });
            mesh.faces.push(Face { vertices: [i + 1, i + row, i + row + 1], material_index: 0 });
        }
    }
    let corners = mesh.faces.len() * 3;
    mesh.uv_layers.push(UvLayer {
        id: UvChannelId(0),
        name: "UVMap".into(),
        coords: vec![Vec2::ZERO; corners],
        active: true,
        active_render: true,
    });
    mesh
}

pub fn scene_in(dir: &TempDir) -> MemoryScene {
    MemoryScene::new(SceneSettings {
        image_dir: dir.path().join("textures"),
        ..Default::default()
    })
}

pub fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        export_paths: vec![dir.path().join("src/models.glb"), dir.path().join("build/assets/models.glb")],
        debug_snapshot: Some(dir.path().join("assets-debug.snapshot")),
        ..PipelineConfig::default()
    }
}

/// Same as [`config_in`] with thresholds ten times larger, so bakes stay small.
pub fn compact_config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        resolution_thresholds: [200.0, 400.0, 800.0, 1600.0, 3200.0],
        ..config_in(dir)
    }
}

pub fn add_ground(scene: &mut MemoryScene, name: &str, size: f32, offset: f32) -> ObjectId {
    let mesh = scene.add_mesh(grid(name, size, 2));
    let material = scene.add_material(MaterialData::new(&format!("{}-dirt", name), [0.55, 0.4, 0.25, 1.0]));
    scene.add_object(
        ObjectData::new(name, Some(mesh))
            .with_material(material)
            .with_transform(Mat4::from_translation(Vec3::new(offset, 0.0, 0.0))),
    )
}

/// Two ground tiles (longest extents 30 and 200) plus a rock that is never selected.
pub fn two_grounds(scene: &mut MemoryScene) -> (ObjectId, ObjectId, ObjectId) {
    let small = add_ground(scene, "ground_small", 30.0, 0.0);
    let large = add_ground(scene, "ground_large", 200.0, 40.0);
    let rock_mesh = scene.add_mesh(grid("rock", 2.0, 1));
    let stone = scene.add_material(MaterialData::new("stone", [0.5, 0.5, 0.5, 1.0]));
    let rock = scene.add_object(ObjectData::new("rock", Some(rock_mesh)).with_material(stone));
    (small, large, rock)
}

pub fn read_glb(path: &Path) -> gltf::Gltf {
    let bytes = std::fs::read(path).unwrap();
    gltf::Gltf::from_slice(&bytes).unwrap()
}

pub fn textured_materials(gltf: &gltf::Gltf) -> Vec<String> {
    gltf.materials()
        .filter(|m| m.pbr_metallic_roughness().base_color_texture().is_some())
        .filter_map(|m| m.name().map(str::to_string))
        .collect()
}

pub fn node_names(gltf: &gltf::Gltf) -> Vec<String> {
    gltf.nodes().filter_map(|n| n.name().map(str::to_string)).collect()
}

pub fn pngs_in(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    found.retain(|p| p.extension().is_some_and(|e| e == "png"));
    found.sort();
    found
}
