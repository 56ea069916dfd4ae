use glam::{Mat4, Vec2, Vec3};
use tempfile::TempDir;
use terrabake_core::*;
use terrabake_scene::*;

fn grid(name: &str, size: f32, cells: u32) -> MeshData {
    let mut mesh = MeshData::new(name);
    let step = size / cells as f32;
    for z in 0..=cells {
        for x in 0..=cells {
            let h = ((x + z) % 3) as f32 * 0.1;
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

fn scene_in(dir: &TempDir) -> MemoryScene {
    MemoryScene::new(SceneSettings {
        image_dir: dir.path().join("textures"),
        ..Default::default()
    })
}

/// Prepares a single bake target the way the pipeline does, returning the request.
fn prepare(scene: &mut MemoryScene, object: ObjectId, size: u32) -> BakeRequest {
    let name = scene.object(object).unwrap().name;
    let material = scene.create_material(&format!("{}-baked", name)).unwrap();
    let image = scene
        .create_image(&ImageDescriptor { name: &format!("{}-baked-tex", name), width: size, height: size })
        .unwrap();
    for slot in scene.object(object).unwrap().material_slots.into_iter().flatten() {
        if !scene.material(slot).unwrap().has_shading() {
            continue;
        }
        let node = scene.add_shader_node(slot, ShaderNodeKind::ImageTexture { image: Some(image) }).unwrap();
        scene.set_active_node(slot, node).unwrap();
    }
    let slot = scene.add_material_slot(object, material).unwrap();
    let uv = scene.add_uv_channel(object, "Bake").unwrap();
    scene.unwrap_uv(object, uv, FaceSelection::All).unwrap();
    let node = scene.add_shader_node(material, ShaderNodeKind::ImageTexture { image: Some(image) }).unwrap();
    let principled = scene
        .material(material)
        .unwrap()
        .nodes
        .unwrap()
        .into_iter()
        .find(|n| matches!(n.kind, ShaderNodeKind::Principled { .. }))
        .unwrap()
        .id;
    scene.link_sockets(material, (node, Socket::Color), (principled, Socket::BaseColor)).unwrap();
    scene.set_active_node(material, node).unwrap();
    scene.set_active_material_slot(object, slot).unwrap();
    BakeRequest {
        object,
        material,
        image_node: node,
        uv_channel: uv,
        save_mode: SaveMode::External,
        selected_to_active: false,
        margin: 2,
    }
}

#[test]
fn bake_writes_lit_pixels_and_saves_png() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(&dir);
    let mesh = scene.add_mesh(grid("ground", 10.0, 4));
    let dirt = scene.add_material(MaterialData::new("dirt", [0.6, 0.4, 0.2, 1.0]));
    let object = scene.add_object(ObjectData::new("ground", Some(mesh)).with_material(dirt));

    let request = prepare(&mut scene, object, 64);
    scene.bake_combined(&request).unwrap();

    let image_id = scene.images().next().unwrap();
    let image = scene.image_data(image_id).unwrap();
    assert!(image.dirty);
    assert!(image.pixels.chunks(4).any(|p| p[0] > p[2]), "dirt albedo shows up red-heavy");

    let saved = scene.save_modified_images().unwrap();
    assert_eq!(saved, vec![dir.path().join("textures").join("ground-baked-tex.png")]);
    assert!(saved[0].exists());
    assert!(!scene.image(image_id).unwrap().dirty);
    assert!(scene.save_modified_images().unwrap().is_empty());
}

#[test]
fn bake_rejects_face_without_active_target() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(&dir);
    let mesh = scene.add_mesh(grid("ground", 10.0, 2));
    let plain = scene.add_material(MaterialData::flat("plain", [1.0; 4]));
    let object = scene.add_object(ObjectData::new("ground", Some(mesh)).with_material(plain));

    // `plain` has no node tree, so its faces have nowhere to write.
    let request = prepare(&mut scene, object, 32);
    let err = scene.bake_combined(&request).unwrap_err();
    assert!(matches!(err, BakeError::Bake { .. }), "{}", err);
}

#[test]
fn bake_rejects_missing_uv_channel() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(&dir);
    let mesh = scene.add_mesh(grid("ground", 10.0, 2));
    let dirt = scene.add_material(MaterialData::new("dirt", [0.5; 4]));
    let object = scene.add_object(ObjectData::new("ground", Some(mesh)).with_material(dirt));
    let mut request = prepare(&mut scene, object, 32);
    request.uv_channel = UvChannelId(9999);
    assert!(matches!(scene.bake_combined(&request), Err(BakeError::Bake { .. })));
}

#[test]
fn export_reads_back_as_gltf_with_baked_texture() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(&dir);
    let mesh = scene.add_mesh(grid("ground", 10.0, 3));
    let dirt = scene.add_material(MaterialData::new("dirt", [0.6, 0.4, 0.2, 1.0]));
    let object = scene.add_object(
        ObjectData::new("ground", Some(mesh))
            .with_material(dirt)
            .with_transform(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0))),
    );
    let request = prepare(&mut scene, object, 32);
    scene.bake_combined(&request).unwrap();
    scene.set_uv_render_active(object, request.uv_channel, false).unwrap();
    let slot = scene.object(object).unwrap().active_material_slot.unwrap();
    scene.assign_material_slot(object, slot, FaceSelection::All).unwrap();

    let path = dir.path().join("out").join("models.glb");
    scene.export_scene(&path, &ExportOptions::default()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let gltf = gltf::Gltf::from_slice(&bytes).unwrap();
    assert_eq!(gltf.nodes().count(), 1);
    let node = gltf.nodes().next().unwrap();
    assert_eq!(node.name(), Some("ground"));
    let primitives: Vec<_> = node.mesh().unwrap().primitives().collect();
    assert_eq!(primitives.len(), 1);
    let material = primitives[0].material();
    assert_eq!(material.name(), Some("ground-baked"));
    let texture = material.pbr_metallic_roughness().base_color_texture().unwrap();
    // The bake layer is out of render, so the texture reads UVMap.
    assert_eq!(texture.tex_coord(), 0);
    assert!(primitives[0].get(&gltf::Semantic::TexCoords(1)).is_some());
    assert_eq!(gltf.images().count(), 1);

    // Transform applied: the positions' min x moved by 5.
    let bounds = primitives[0].bounding_box();
    assert!((bounds.min[0] - 5.0).abs() < 1e-4);
}

#[test]
fn snapshot_round_trips_structure_and_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = scene_in(&dir);
    let mesh = scene.add_mesh(grid("ground", 4.0, 2));
    let dirt = scene.add_material(MaterialData::new("dirt", [0.9, 0.1, 0.1, 1.0]));
    let object = scene.add_object(ObjectData::new("ground", Some(mesh)).with_material(dirt));
    let request = prepare(&mut scene, object, 16);
    scene.bake_combined(&request).unwrap();
    scene.save_modified_images().unwrap();

    let snapshot = dir.path().join("assets-debug.snapshot");
    scene.persist_document(&snapshot).unwrap();
    let loaded = MemoryScene::load_document(&snapshot, SceneSettings::default()).unwrap();

    assert_eq!(loaded.objects(), scene.objects());
    assert_eq!(loaded.object(object).unwrap(), scene.object(object).unwrap());
    let image = scene.images().next().unwrap();
    assert_eq!(loaded.image_data(image).unwrap().pixels, scene.image_data(image).unwrap().pixels);
}
