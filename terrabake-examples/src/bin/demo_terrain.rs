use glam::{Mat4, Vec2, Vec3};
use log::info;
use std::path::PathBuf;
use terrabake_core::Host;
use terrabake_pipeline::{Pipeline, PipelineConfig, PipelineMode};
use terrabake_scene::*;

/// Rolling height field over a `size` x `size` square.
fn hills(name: &str, size: f32, cells: u32, seed: f32) -> MeshData {
    let mut mesh = MeshData::new(name);
    let step = size / cells as f32;
    for z in 0..=cells {
        for x in 0..=cells {
            let (fx, fz) = (x as f32 * step, z as f32 * step);
            let h = (fx * 0.15 + seed).sin() * 1.5 + (fz * 0.1 - seed).cos() * 2.0;
            mesh.positions.push(Vec3::new(fx, h, fz));
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
    let coords = mesh
        .faces
        .iter()
        .flat_map(|f| f.vertices)
        .map(|v| {
            let p = mesh.positions[v as usize];
            Vec2::new(p.x / size, p.z / size)
        })
        .collect();
    mesh.uv_layers.push(UvLayer {
        id: terrabake_core::UvChannelId(0),
        name: "UVMap".to_string(),
        coords,
        active: true,
        active_render: true,
    });
    mesh
}

fn build_scene(scene: &mut MemoryScene) {
    let grass = scene.add_material(MaterialData::new("grass", [0.25, 0.5, 0.15, 1.0]));
    let dirt = scene.add_material(MaterialData::new("dirt", [0.55, 0.4, 0.25, 1.0]));

    // Two tiles instancing one mesh and one material, split apart by normalization.
    let shared = scene.add_mesh(hills("ground_tile", 30.0, 12, 0.0));
    for (i, offset) in [0.0f32, 32.0].into_iter().enumerate() {
        scene.add_object(
            ObjectData::new(&format!("ground_tile_{}", i), Some(shared))
                .with_material(grass)
                .with_transform(Mat4::from_translation(Vec3::new(offset, 0.0, 0.0))),
        );
    }

    let valley = scene.add_mesh(hills("ground_valley", 200.0, 24, 1.3));
    scene.add_object(
        ObjectData::new("ground_valley", Some(valley))
            .with_material(dirt)
            .with_material(grass)
            .with_transform(Mat4::from_translation(Vec3::new(0.0, -4.0, 40.0)))
            .with_modifier("Displace", ModifierKind::Displace { strength: 0.5 }),
    );

    let rock = scene.add_mesh(hills("rock", 3.0, 2, 0.7));
    let stone = scene.add_material(MaterialData::new("stone", [0.5, 0.5, 0.5, 1.0]));
    scene.add_object(ObjectData::new("rock", Some(rock)).with_material(stone));
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mode: PipelineMode = std::env::args()
        .nth(1)
        .map(|s| s.parse().expect("Unknown mode"))
        .unwrap_or_default();
    let out = PathBuf::from("demo-out").join(mode.as_str());

    let mut scene = MemoryScene::new(SceneSettings {
        image_dir: out.join("textures"),
        ..Default::default()
    });
    build_scene(&mut scene);
    info!("demo scene has {} objects", scene.objects().len());

    let config = PipelineConfig {
        mode,
        export_paths: vec![out.join("models.glb")],
        debug_snapshot: Some(out.join("assets-debug.snapshot")),
        ..PipelineConfig::default()
    };
    let report = Pipeline::new(&mut scene, config).run().expect("Pipeline run failed");
    print!("{}", report);
}
