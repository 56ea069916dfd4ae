use crate::MemoryScene;
use log::debug;
use terrabake_core::{BakeError, BakeResult, MeshId, ObjectId, UvChannelId};

impl MemoryScene {
    pub(crate) fn join_meshes_impl(&mut self, target: ObjectId, sources: &[ObjectId]) -> BakeResult<MeshId> {
        let target_mesh = self.object_mesh(target)?;
        self.exclusive_mesh_mut(target)?;

        for (i, &source) in sources.iter().enumerate() {
            if source == target || sources[..i].contains(&source) {
                return Err(BakeError::InvalidState(format!("{} listed twice in join", source)));
            }
            let data = self.obj(source)?;
            if !data.modifiers.is_empty() {
                return Err(BakeError::InvalidState(format!(
                    "{} still has {} modifiers",
                    data.name,
                    data.modifiers.len()
                )));
            }
            self.exclusive_mesh_mut(source)?;
        }

        let target_inverse = self.obj(target)?.transform.inverse();
        for &source in sources {
            let data = self.obj(source)?.clone();
            let source_mesh = self.object_mesh(source)?;

            // Reuse an identical slot when the target already has one.
            let slots = &mut self.obj_mut(target)?.material_slots;
            let remap: Vec<u32> = data
                .material_slots
                .iter()
                .map(|material| {
                    let index = match slots.iter().position(|s| s == material) {
                        Some(index) => index,
                        None => {
                            slots.push(*material);
                            slots.len() - 1
                        }
                    };
                    index as u32
                })
                .collect();

            let mesh = self
                .doc
                .meshes
                .remove(&source_mesh)
                .ok_or_else(|| BakeError::UnknownHandle(source_mesh.to_string()))?;
            let mut next = self.doc.next_id;
            let mut next_uv = || {
                next += 1;
                UvChannelId(next)
            };
            let joined = self
                .doc
                .meshes
                .get_mut(&target_mesh)
                .ok_or_else(|| BakeError::UnknownHandle(target_mesh.to_string()))?;
            joined.append(&mesh, target_inverse * data.transform, &remap, &mut next_uv);
            self.doc.next_id = next;

            self.doc.objects.remove(&source);
            if let Some(action) = data.animation {
                if !self.doc.objects.values().any(|o| o.animation == Some(action)) {
                    self.doc.actions.remove(&action);
                }
            }
            debug!("joined {} ({} faces)", data.name, mesh.face_count());
        }

        let target_data = self.obj_mut(target)?;
        if target_data.active_material_slot.is_none() && !target_data.material_slots.is_empty() {
            target_data.active_material_slot = Some(0);
        }
        Ok(target_mesh)
    }
}

#[cfg(test)]
mod tests {
    use crate::data::*;
    use crate::{MemoryScene, SceneSettings};
    use glam::{Mat4, Vec3};
    use terrabake_core::{BakeError, Host};

    fn strip(name: &str, faces: u32) -> MeshData {
        let mut mesh = MeshData::new(name);
        for i in 0..=faces + 1 {
            mesh.positions.push(Vec3::new(i as f32, 0.0, (i % 2) as f32));
        }
        for i in 0..faces {
            mesh.faces.push(Face { vertices: [i, i + 1, i + 2], material_index: 0 });
        }
        mesh
    }

    #[test]
    fn join_sums_geometry_and_dedups_slots() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let shared = scene.add_material(MaterialData::new("grass", [0.2, 0.6, 0.2, 1.0]));
        let rock = scene.add_material(MaterialData::new("rock", [0.5; 4]));

        let m_target = scene.add_mesh(MeshData::new("merged"));
        let target = scene.add_object(ObjectData::new("terrain-merged", Some(m_target)));
        let m_a = scene.add_mesh(strip("a", 3));
        let a = scene.add_object(ObjectData::new("ground-a", Some(m_a)).with_material(shared));
        let m_b = scene.add_mesh(strip("b", 5));
        let b = scene.add_object(
            ObjectData::new("ground-b", Some(m_b))
                .with_material(shared)
                .with_material(rock)
                .with_transform(Mat4::from_translation(Vec3::X * 10.0)),
        );

        let mesh = scene.join_meshes(target, &[a, b]).unwrap();
        assert_eq!(mesh, m_target);
        let info = scene.mesh(mesh).unwrap();
        assert_eq!(info.face_count, 8);
        assert_eq!(info.vertex_count, 5 + 7);
        assert_eq!(scene.object(target).unwrap().material_slots, vec![Some(shared), Some(rock)]);
        assert!(scene.object(a).is_err());
        assert!(scene.mesh(m_b).is_err());
        assert_eq!(scene.mesh_data(mesh).unwrap().positions[5], Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn join_rejects_unapplied_modifiers() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let m_target = scene.add_mesh(MeshData::new("merged"));
        let target = scene.add_object(ObjectData::new("merged", Some(m_target)));
        let m_a = scene.add_mesh(strip("a", 1));
        let a = scene.add_object(
            ObjectData::new("ground", Some(m_a)).with_modifier("Mirror", ModifierKind::Mirror { axis: Axis::X }),
        );
        assert!(matches!(scene.join_meshes(target, &[a]), Err(BakeError::InvalidState(_))));
        assert!(scene.object(a).is_ok());
    }
}
