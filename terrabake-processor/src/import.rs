use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use log::{info, warn};
use std::collections::HashMap;
use std::path::Path;
use terrabake_core::{MaterialId, ObjectId, UvChannelId};
use terrabake_scene::*;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct WeldVertex {
    p: [f32; 3],
    u: [f32; 2],
}

/// Adds one linked object per OBJ model. Models sharing an OBJ material share one scene
/// material.
pub fn import_obj(scene: &mut MemoryScene, path: &Path) -> Result<Vec<ObjectId>> {
    let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .with_context(|| format!("Failed to load OBJ file: {}", path.display()))?;
    let materials = materials.unwrap_or_else(|e| {
        warn!("{}: no materials ({})", path.display(), e);
        Vec::new()
    });

    let mut by_index: HashMap<Option<usize>, MaterialId> = HashMap::new();
    let mut objects = Vec::with_capacity(models.len());
    for model in &models {
        let key = model.mesh.material_id;
        let material = *by_index
            .entry(key)
            .or_insert_with(|| scene.add_material(scene_material(key.and_then(|i| materials.get(i)))));

        let mesh = weld(&model.name, &model.mesh);
        info!(
            "{}: {} vertices, {} faces after welding",
            model.name,
            mesh.vertex_count(),
            mesh.face_count()
        );
        let mesh = scene.add_mesh(mesh);
        objects.push(scene.add_object(ObjectData::new(&model.name, Some(mesh)).with_material(material)));
    }
    Ok(objects)
}

fn scene_material(material: Option<&tobj::Material>) -> MaterialData {
    match material {
        Some(m) => {
            let [r, g, b] = m.diffuse.unwrap_or([0.8, 0.8, 0.8]);
            MaterialData::new(&m.name, [r, g, b, 1.0])
        }
        None => MaterialData::new("default", [0.8, 0.8, 0.8, 1.0]),
    }
}

fn weld(name: &str, mesh: &tobj::Mesh) -> MeshData {
    use meshopt::{generate_vertex_remap, remap_index_buffer, remap_vertex_buffer};

    let has_uv = !mesh.texcoords.is_empty();
    let vertices: Vec<WeldVertex> = (0..mesh.positions.len() / 3)
        .map(|i| WeldVertex {
            p: [mesh.positions[i * 3], mesh.positions[i * 3 + 1], mesh.positions[i * 3 + 2]],
            u: if has_uv {
                [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            },
        })
        .collect();

    let (vertex_count, remap) = generate_vertex_remap(&vertices, Some(&mesh.indices));
    let welded = remap_vertex_buffer(&vertices, vertex_count, &remap);
    let indices = remap_index_buffer(Some(&mesh.indices), vertex_count, &remap);

    let mut data = MeshData::new(name);
    data.positions = welded.iter().map(|v| Vec3::from(v.p)).collect();
    data.faces = indices
        .chunks_exact(3)
        .map(|t| Face {
            vertices: [t[0], t[1], t[2]],
            material_index: 0,
        })
        .collect();
    if has_uv {
        data.uv_layers.push(UvLayer {
            id: UvChannelId(0),
            name: "UVMap".to_string(),
            coords: indices.iter().map(|&i| Vec2::from(welded[i as usize].u)).collect(),
            active: true,
            active_render: true,
        });
    }
    data
}
