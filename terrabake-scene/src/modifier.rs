use crate::data::{Axis, Face, MeshData, ModifierKind, ObjectData};
use crate::MemoryScene;
use glam::{Mat4, Vec3};
use log::debug;
use terrabake_core::{BakeError, BakeResult, ObjectId, UvChannelId};

impl MemoryScene {
    pub(crate) fn apply_modifier_impl(&mut self, object: ObjectId, name: &str) -> BakeResult<()> {
        let data = self.obj(object)?.clone();
        let fail = |reason: String| BakeError::ModifierApply {
            object: data.name.clone(),
            modifier: name.to_string(),
            reason,
        };

        let index = data
            .modifiers
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| fail("no such modifier".to_string()))?;
        let mesh_id = data.mesh.ok_or_else(|| fail("object has no mesh".to_string()))?;
        let users = self.mesh_users(mesh_id);
        if users > 1 {
            return Err(fail(format!("mesh is shared by {} objects", users)));
        }

        let mut mesh = self.mesh_ref(mesh_id)?.clone();
        let mut next = self.doc.next_id;
        let mut next_uv = || {
            next += 1;
            UvChannelId(next)
        };
        run_modifier(self, &data, &mut mesh, &data.modifiers[index].kind, &mut next_uv).map_err(fail)?;
        self.doc.next_id = next;

        self.doc.meshes.insert(mesh_id, mesh);
        self.obj_mut(object)?.modifiers.remove(index);
        debug!("{}: applied modifier {}", data.name, name);
        Ok(())
    }

    /// Base mesh with the whole modifier stack evaluated. The scene is untouched.
    pub(crate) fn evaluated_mesh(&self, object: ObjectId) -> BakeResult<MeshData> {
        let data = self.obj(object)?;
        let mut mesh = self.mesh_ref(self.object_mesh(object)?)?.clone();
        // Ids of layers introduced here never leave this copy.
        let mut scratch = u32::MAX;
        let mut next_uv = || {
            scratch -= 1;
            UvChannelId(scratch)
        };
        for modifier in &data.modifiers {
            run_modifier(self, data, &mut mesh, &modifier.kind, &mut next_uv).map_err(|reason| {
                BakeError::ModifierApply {
                    object: data.name.clone(),
                    modifier: modifier.name.clone(),
                    reason,
                }
            })?;
        }
        Ok(mesh)
    }
}

fn run_modifier(
    scene: &MemoryScene,
    object: &ObjectData,
    mesh: &mut MeshData,
    kind: &ModifierKind,
    next_uv: &mut impl FnMut() -> UvChannelId,
) -> Result<(), String> {
    match kind {
        ModifierKind::Transform { matrix } => {
            if matrix.determinant().abs() < f32::EPSILON {
                return Err("transform is degenerate".to_string());
            }
            mesh.transform(*matrix);
        }
        ModifierKind::Displace { strength } => {
            let normals = mesh.vertex_normals();
            for (p, n) in mesh.positions.iter_mut().zip(normals) {
                *p += n * *strength;
            }
        }
        ModifierKind::Mirror { axis } => mirror(mesh, *axis),
        ModifierKind::Boolean { operand } => {
            let other = scene
                .doc
                .objects
                .values()
                .find(|o| &o.name == operand)
                .ok_or_else(|| format!("operand object '{}' not found", operand))?;
            let other_mesh = other
                .mesh
                .and_then(|id| scene.doc.meshes.get(&id))
                .ok_or_else(|| format!("operand object '{}' has no mesh", operand))?;
            let into_local = object.transform.inverse() * other.transform;
            mesh.append(other_mesh, into_local, &[], next_uv);
        }
    }
    Ok(())
}

/// Appends a mirrored copy of the mesh across the local plane normal to `axis`.
fn mirror(mesh: &mut MeshData, axis: Axis) {
    let scale = match axis {
        Axis::X => Vec3::new(-1.0, 1.0, 1.0),
        Axis::Y => Vec3::new(1.0, -1.0, 1.0),
        Axis::Z => Vec3::new(1.0, 1.0, -1.0),
    };
    let mut mirrored = mesh.clone();
    mirrored.transform(Mat4::from_scale(scale));

    let offset = mesh.positions.len() as u32;
    let keep_normals = mesh.normals.len() == mesh.positions.len();
    mesh.positions.extend_from_slice(&mirrored.positions);
    if keep_normals {
        mesh.normals.extend_from_slice(&mirrored.normals);
    } else {
        mesh.normals.clear();
    }
    mesh.faces.extend(mirrored.faces.iter().map(|f| Face {
        vertices: f.vertices.map(|v| v + offset),
        material_index: f.material_index,
    }));
    for (layer, copy) in mesh.uv_layers.iter_mut().zip(&mirrored.uv_layers) {
        layer.coords.extend_from_slice(&copy.coords);
    }
}

#[cfg(test)]
mod tests {
    use crate::data::*;
    use crate::{MemoryScene, SceneSettings};
    use glam::{Mat4, Vec3};
    use terrabake_core::{BakeError, Host};

    fn plane() -> MeshData {
        let mut mesh = MeshData::new("plane");
        mesh.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, -1.0),
        ];
        mesh.faces = vec![Face { vertices: [0, 1, 2], material_index: 0 }];
        mesh
    }

    #[test]
    fn apply_removes_modifier_and_bakes_geometry() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let mesh = scene.add_mesh(plane());
        let object = scene.add_object(
            ObjectData::new("ground", Some(mesh))
                .with_modifier("Scale", ModifierKind::Transform { matrix: Mat4::from_scale(Vec3::splat(2.0)) })
                .with_modifier("Mirror", ModifierKind::Mirror { axis: Axis::X }),
        );
        assert_eq!(scene.object(object).unwrap().dimensions.x, 4.0);

        scene.apply_modifier(object, "Scale").unwrap();
        scene.apply_modifier(object, "Mirror").unwrap();
        let info = scene.object(object).unwrap();
        assert!(info.modifiers.is_empty());
        assert_eq!(scene.mesh(mesh).unwrap().face_count, 2);
        assert_eq!(info.dimensions.x, 4.0);
    }

    #[test]
    fn boolean_without_operand_fails() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let mesh = scene.add_mesh(plane());
        let object = scene.add_object(
            ObjectData::new("ground", Some(mesh))
                .with_modifier("Cut", ModifierKind::Boolean { operand: "cutter".into() }),
        );
        let err = scene.apply_modifier(object, "Cut").unwrap_err();
        assert!(matches!(err, BakeError::ModifierApply { ref modifier, .. } if modifier == "Cut"));
        assert_eq!(scene.object(object).unwrap().modifiers, vec!["Cut".to_string()]);
    }

    #[test]
    fn boolean_unions_operand_geometry() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let base = scene.add_mesh(plane());
        let rock = scene.add_mesh(plane());
        scene.add_object(
            ObjectData::new("rock", Some(rock)).with_transform(Mat4::from_translation(Vec3::Y * 3.0)),
        );
        let object = scene.add_object(
            ObjectData::new("ground", Some(base))
                .with_modifier("Union", ModifierKind::Boolean { operand: "rock".into() }),
        );
        scene.apply_modifier(object, "Union").unwrap();
        let mesh = scene.mesh_data(base).unwrap();
        assert_eq!(mesh.face_count(), 2);
        assert_eq!(mesh.positions[3], Vec3::new(0.0, 3.0, 0.0));
    }
}
