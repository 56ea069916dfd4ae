use crate::data::*;
use glam::{Vec3, Vec2};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use terrabake_core::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    /// Unit vector pointing towards the sun.
    pub sun_direction: Vec3,
    pub sun_color: Vec3,
    pub ambient: Vec3,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            sun_direction: Vec3::new(0.4, 1.0, 0.3).normalize(),
            sun_color: Vec3::splat(0.85),
            ambient: Vec3::splat(0.25),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneSettings {
    /// Directory that receives saved images without an explicit file path.
    pub image_dir: PathBuf,
    pub lighting: Lighting,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("baked"),
            lighting: Lighting::default(),
        }
    }
}

/// Everything that gets persisted in a snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct Document {
    pub objects: BTreeMap<ObjectId, ObjectData>,
    pub meshes: BTreeMap<MeshId, MeshData>,
    pub materials: BTreeMap<MaterialId, MaterialData>,
    pub images: BTreeMap<ImageId, ImageData>,
    pub actions: BTreeMap<ActionId, ActionData>,
    pub next_id: u32,
}

/// In-memory scene implementing [`Host`].
///
/// Handles are allocated from one counter, so iteration order of every map is creation order.
pub struct MemoryScene {
    pub(crate) doc: Document,
    pub(crate) settings: SceneSettings,
}

pub(crate) fn unique_name<'a>(taken: impl Iterator<Item = &'a str>, base: &str) -> String {
    let taken: Vec<&str> = taken.collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}.{:03}", base, n))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

impl MemoryScene {
    pub fn new(settings: SceneSettings) -> Self {
        Self {
            doc: Document::default(),
            settings,
        }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub(crate) fn next_id(&mut self) -> u32 {
        self.doc.next_id += 1;
        self.doc.next_id
    }

    /// Adds a mesh. UV layers get fresh scene-wide ids and the first layer becomes
    /// active/render-active when none is flagged.
    pub fn add_mesh(&mut self, mut mesh: MeshData) -> MeshId {
        mesh.name = unique_name(self.doc.meshes.values().map(|m| m.name.as_str()), &mesh.name);
        for layer in &mut mesh.uv_layers {
            self.doc.next_id += 1;
            layer.id = UvChannelId(self.doc.next_id);
        }
        if !mesh.uv_layers.iter().any(|l| l.active) {
            if let Some(first) = mesh.uv_layers.first_mut() {
                first.active = true;
            }
        }
        if !mesh.uv_layers.iter().any(|l| l.active_render) {
            if let Some(first) = mesh.uv_layers.first_mut() {
                first.active_render = true;
            }
        }
        let id = MeshId(self.next_id());
        self.doc.meshes.insert(id, mesh);
        id
    }

    pub fn add_material(&mut self, mut material: MaterialData) -> MaterialId {
        material.name = unique_name(self.doc.materials.values().map(|m| m.name.as_str()), &material.name);
        let id = MaterialId(self.next_id());
        self.doc.materials.insert(id, material);
        id
    }

    pub fn add_image(&mut self, mut image: ImageData) -> ImageId {
        image.name = unique_name(self.doc.images.values().map(|i| i.name.as_str()), &image.name);
        let id = ImageId(self.next_id());
        self.doc.images.insert(id, image);
        id
    }

    pub fn add_action(&mut self, mut action: ActionData) -> ActionId {
        action.name = unique_name(self.doc.actions.values().map(|a| a.name.as_str()), &action.name);
        let id = ActionId(self.next_id());
        self.doc.actions.insert(id, action);
        id
    }

    pub fn add_object(&mut self, mut object: ObjectData) -> ObjectId {
        object.name = unique_name(self.doc.objects.values().map(|o| o.name.as_str()), &object.name);
        let id = ObjectId(self.next_id());
        self.doc.objects.insert(id, object);
        id
    }

    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.doc.objects.iter().find(|(_, o)| o.name == name).map(|(id, _)| *id)
    }

    pub fn object_data(&self, id: ObjectId) -> Option<&ObjectData> {
        self.doc.objects.get(&id)
    }

    pub fn object_data_mut(&mut self, id: ObjectId) -> Option<&mut ObjectData> {
        self.doc.objects.get_mut(&id)
    }

    pub fn mesh_data(&self, id: MeshId) -> Option<&MeshData> {
        self.doc.meshes.get(&id)
    }

    pub fn material_data(&self, id: MaterialId) -> Option<&MaterialData> {
        self.doc.materials.get(&id)
    }

    pub fn image_data(&self, id: ImageId) -> Option<&ImageData> {
        self.doc.images.get(&id)
    }

    pub fn meshes(&self) -> impl Iterator<Item = MeshId> + '_ {
        self.doc.meshes.keys().copied()
    }

    pub fn materials(&self) -> impl Iterator<Item = MaterialId> + '_ {
        self.doc.materials.keys().copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.doc.actions.keys().copied()
    }

    pub fn images(&self) -> impl Iterator<Item = ImageId> + '_ {
        self.doc.images.keys().copied()
    }

    pub(crate) fn obj(&self, id: ObjectId) -> BakeResult<&ObjectData> {
        self.doc.objects.get(&id).ok_or_else(|| BakeError::UnknownHandle(id.to_string()))
    }

    pub(crate) fn obj_mut(&mut self, id: ObjectId) -> BakeResult<&mut ObjectData> {
        self.doc.objects.get_mut(&id).ok_or_else(|| BakeError::UnknownHandle(id.to_string()))
    }

    pub(crate) fn mesh_ref(&self, id: MeshId) -> BakeResult<&MeshData> {
        self.doc.meshes.get(&id).ok_or_else(|| BakeError::UnknownHandle(id.to_string()))
    }

    pub(crate) fn mat_ref(&self, id: MaterialId) -> BakeResult<&MaterialData> {
        self.doc.materials.get(&id).ok_or_else(|| BakeError::UnknownHandle(id.to_string()))
    }

    fn mat_mut(&mut self, id: MaterialId) -> BakeResult<&mut MaterialData> {
        self.doc.materials.get_mut(&id).ok_or_else(|| BakeError::UnknownHandle(id.to_string()))
    }

    fn tree_mut(&mut self, id: MaterialId) -> BakeResult<&mut NodeTree> {
        let material = self.mat_mut(id)?;
        let name = material.name.clone();
        material
            .tree
            .as_mut()
            .ok_or_else(|| BakeError::InvalidState(format!("material {} has no node tree", name)))
    }

    pub(crate) fn object_mesh(&self, id: ObjectId) -> BakeResult<MeshId> {
        let object = self.obj(id)?;
        object
            .mesh
            .ok_or_else(|| BakeError::InvalidState(format!("{} has no mesh", object.name)))
    }

    pub(crate) fn mesh_users(&self, mesh: MeshId) -> usize {
        self.doc.objects.values().filter(|o| o.mesh == Some(mesh)).count()
    }

    /// Mesh of `object`, writable only when no other object uses it.
    pub(crate) fn exclusive_mesh_mut(&mut self, object: ObjectId) -> BakeResult<&mut MeshData> {
        let mesh_id = self.object_mesh(object)?;
        let users = self.mesh_users(mesh_id);
        if users > 1 {
            let name = &self.obj(object)?.name;
            return Err(BakeError::InvalidState(format!(
                "{}: mesh {} is shared by {} objects",
                name, mesh_id, users
            )));
        }
        self.doc
            .meshes
            .get_mut(&mesh_id)
            .ok_or_else(|| BakeError::UnknownHandle(mesh_id.to_string()))
    }

    /// Slot material of every face, resolved through the object's slot list.
    pub(crate) fn face_material(&self, object: &ObjectData, face: &Face) -> Option<MaterialId> {
        object.material_slots.get(face.material_index as usize).copied().flatten()
    }

    fn copy_mesh(&mut self, mesh: MeshId) -> BakeResult<MeshId> {
        let mut copy = self.mesh_ref(mesh)?.clone();
        copy.name = unique_name(self.doc.meshes.values().map(|m| m.name.as_str()), &copy.name);
        for layer in &mut copy.uv_layers {
            self.doc.next_id += 1;
            layer.id = UvChannelId(self.doc.next_id);
        }
        let id = MeshId(self.next_id());
        self.doc.meshes.insert(id, copy);
        Ok(id)
    }

    fn copy_material(&mut self, material: MaterialId) -> BakeResult<MaterialId> {
        let mut copy = self.mat_ref(material)?.clone();
        copy.name = unique_name(self.doc.materials.values().map(|m| m.name.as_str()), &copy.name);
        let id = MaterialId(self.next_id());
        self.doc.materials.insert(id, copy);
        Ok(id)
    }

    fn copy_action(&mut self, action: ActionId) -> BakeResult<ActionId> {
        let mut copy = self
            .doc
            .actions
            .get(&action)
            .cloned()
            .ok_or_else(|| BakeError::UnknownHandle(action.to_string()))?;
        copy.name = unique_name(self.doc.actions.values().map(|a| a.name.as_str()), &copy.name);
        let id = ActionId(self.next_id());
        self.doc.actions.insert(id, copy);
        Ok(id)
    }

    fn uv_layer_mut(&mut self, object: ObjectId, channel: UvChannelId) -> BakeResult<&mut UvLayer> {
        let mesh = self.exclusive_mesh_mut(object)?;
        let mesh_name = mesh.name.clone();
        mesh.uv_layer_mut(channel)
            .ok_or_else(|| BakeError::UnknownHandle(format!("{} on mesh {}", channel, mesh_name)))
    }

    fn selected_faces(&self, object: ObjectId, faces: FaceSelection) -> BakeResult<Vec<usize>> {
        let mesh = self.mesh_ref(self.object_mesh(object)?)?;
        Ok(match faces {
            FaceSelection::All => (0..mesh.face_count()).collect(),
            FaceSelection::MaterialSlot(slot) => mesh
                .faces
                .iter()
                .enumerate()
                .filter(|(_, f)| f.material_index as usize == slot)
                .map(|(i, _)| i)
                .collect(),
        })
    }
}

impl Host for MemoryScene {
    fn objects(&self) -> Vec<ObjectId> {
        self.doc.objects.keys().copied().collect()
    }

    fn object(&self, id: ObjectId) -> BakeResult<ObjectInfo> {
        let object = self.obj(id)?;
        let dimensions = match object.mesh {
            Some(mesh) => {
                // A broken modifier still reports the base mesh extent.
                let evaluated = match self.evaluated_mesh(id) {
                    Ok(evaluated) => evaluated,
                    Err(_) => self.mesh_ref(mesh)?.clone(),
                };
                let (scale, _, _) = object.transform.to_scale_rotation_translation();
                evaluated
                    .bounds()
                    .map(|(min, max)| (max - min) * scale.abs())
                    .unwrap_or(Vec3::ZERO)
            }
            None => Vec3::ZERO,
        };
        Ok(ObjectInfo {
            id,
            name: object.name.clone(),
            mesh: object.mesh,
            material_slots: object.material_slots.clone(),
            active_material_slot: object.active_material_slot,
            animation: object.animation,
            dimensions,
            modifiers: object.modifiers.iter().map(|m| m.name.clone()).collect(),
            linked: object.linked,
        })
    }

    fn mesh(&self, id: MeshId) -> BakeResult<MeshInfo> {
        let mesh = self.mesh_ref(id)?;
        Ok(MeshInfo {
            id,
            name: mesh.name.clone(),
            vertex_count: mesh.vertex_count(),
            face_count: mesh.face_count(),
            uv_channels: mesh
                .uv_layers
                .iter()
                .map(|l| UvChannelInfo {
                    id: l.id,
                    name: l.name.clone(),
                    active: l.active,
                    active_render: l.active_render,
                })
                .collect(),
        })
    }

    fn material(&self, id: MaterialId) -> BakeResult<MaterialInfo> {
        let material = self.mat_ref(id)?;
        Ok(MaterialInfo {
            id,
            name: material.name.clone(),
            nodes: material.tree.as_ref().map(|tree| {
                tree.nodes
                    .iter()
                    .map(|n| NodeInfo { id: n.id, kind: n.kind, selected: n.selected })
                    .collect()
            }),
            active_node: material.tree.as_ref().and_then(|t| t.active),
        })
    }

    fn image(&self, id: ImageId) -> BakeResult<ImageInfo> {
        let image = self.doc.images.get(&id).ok_or_else(|| BakeError::UnknownHandle(id.to_string()))?;
        Ok(ImageInfo {
            id,
            name: image.name.clone(),
            width: image.width,
            height: image.height,
            dirty: image.dirty,
            filepath: image.filepath.clone(),
        })
    }

    fn users(&self, data: DataId) -> BakeResult<usize> {
        let objects = self.doc.objects.values();
        Ok(match data {
            DataId::Mesh(mesh) => {
                self.mesh_ref(mesh)?;
                self.mesh_users(mesh)
            }
            DataId::Material(material) => {
                self.mat_ref(material)?;
                objects
                    .filter(|o| o.material_slots.contains(&Some(material)))
                    .count()
            }
            DataId::Action(action) => objects.filter(|o| o.animation == Some(action)).count(),
        })
    }

    fn make_single_user(&mut self, id: ObjectId, scope: SingleUserScope) -> BakeResult<()> {
        let object = self.obj(id)?.clone();

        if scope.contains(SingleUserScope::MESH) {
            if let Some(mesh) = object.mesh {
                if self.mesh_users(mesh) > 1 {
                    let copy = self.copy_mesh(mesh)?;
                    self.obj_mut(id)?.mesh = Some(copy);
                    debug!("{}: copied shared {}", object.name, mesh);
                }
            }
        }

        if scope.contains(SingleUserScope::MATERIAL) {
            let mut copies: HashMap<MaterialId, MaterialId> = HashMap::new();
            for (slot, material) in object.material_slots.iter().enumerate() {
                let Some(material) = *material else { continue };
                let replacement = match copies.get(&material) {
                    Some(copy) => *copy,
                    None if self.users(DataId::Material(material))? > 1 => {
                        let copy = self.copy_material(material)?;
                        copies.insert(material, copy);
                        debug!("{}: copied shared {}", object.name, material);
                        copy
                    }
                    None => continue,
                };
                self.obj_mut(id)?.material_slots[slot] = Some(replacement);
            }
        }

        if scope.contains(SingleUserScope::ANIMATION) {
            if let Some(action) = object.animation {
                if self.users(DataId::Action(action))? > 1 {
                    let copy = self.copy_action(action)?;
                    self.obj_mut(id)?.animation = Some(copy);
                    debug!("{}: copied shared {}", object.name, action);
                }
            }
        }
        Ok(())
    }

    fn apply_modifier(&mut self, object: ObjectId, modifier: &str) -> BakeResult<()> {
        self.apply_modifier_impl(object, modifier)
    }

    fn create_mesh(&mut self, name: &str) -> BakeResult<MeshId> {
        Ok(self.add_mesh(MeshData::new(name)))
    }

    fn create_object(&mut self, name: &str, mesh: MeshId) -> BakeResult<ObjectId> {
        self.mesh_ref(mesh)?;
        let mut object = ObjectData::new(name, Some(mesh));
        object.linked = false;
        Ok(self.add_object(object))
    }

    fn link_object(&mut self, object: ObjectId) -> BakeResult<()> {
        self.obj_mut(object)?.linked = true;
        Ok(())
    }

    fn create_material(&mut self, name: &str) -> BakeResult<MaterialId> {
        Ok(self.add_material(MaterialData::new(name, [0.8, 0.8, 0.8, 1.0])))
    }

    fn create_image(&mut self, descriptor: &ImageDescriptor) -> BakeResult<ImageId> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(BakeError::InvalidState(format!(
                "image {} has zero size {}x{}",
                descriptor.name, descriptor.width, descriptor.height
            )));
        }
        Ok(self.add_image(ImageData::blank(descriptor.name, descriptor.width, descriptor.height)))
    }

    fn add_material_slot(&mut self, object: ObjectId, material: MaterialId) -> BakeResult<usize> {
        self.mat_ref(material)?;
        let object = self.obj_mut(object)?;
        object.material_slots.push(Some(material));
        object.active_material_slot.get_or_insert(0);
        Ok(object.material_slots.len() - 1)
    }

    fn set_active_material_slot(&mut self, object: ObjectId, slot: usize) -> BakeResult<()> {
        let object = self.obj_mut(object)?;
        if slot >= object.material_slots.len() {
            return Err(BakeError::InvalidState(format!(
                "{} has no material slot {}",
                object.name, slot
            )));
        }
        object.active_material_slot = Some(slot);
        Ok(())
    }

    fn assign_material_slot(&mut self, object: ObjectId, slot: usize, faces: FaceSelection) -> BakeResult<()> {
        let slot_count = self.obj(object)?.material_slots.len();
        if slot >= slot_count {
            return Err(BakeError::InvalidState(format!("{} has no material slot {}", object, slot)));
        }
        let selected = self.selected_faces(object, faces)?;
        let mesh = self.exclusive_mesh_mut(object)?;
        for face in selected {
            mesh.faces[face].material_index = slot as u32;
        }
        Ok(())
    }

    fn add_shader_node(&mut self, material: MaterialId, kind: ShaderNodeKind) -> BakeResult<NodeId> {
        if let ShaderNodeKind::ImageTexture { image: Some(image) } = kind {
            self.image(image)?;
        }
        Ok(self.tree_mut(material)?.add(kind))
    }

    fn output_node(&self, material: MaterialId) -> BakeResult<NodeId> {
        let material = self.mat_ref(material)?;
        material
            .tree
            .as_ref()
            .and_then(NodeTree::output)
            .ok_or_else(|| BakeError::InvalidState(format!("material {} has no output node", material.name)))
    }

    fn link_sockets(&mut self, material: MaterialId, from: (NodeId, Socket), to: (NodeId, Socket)) -> BakeResult<()> {
        let tree = self.tree_mut(material)?;
        for node in [from.0, to.0] {
            if tree.node(node).is_none() {
                return Err(BakeError::UnknownHandle(format!("{} in {}", node, material)));
            }
        }
        tree.links.retain(|l| l.to != to);
        tree.links.push(NodeLink { from, to });
        Ok(())
    }

    fn set_active_node(&mut self, material: MaterialId, node: NodeId) -> BakeResult<()> {
        let tree = self.tree_mut(material)?;
        if tree.node(node).is_none() {
            return Err(BakeError::UnknownHandle(format!("{} in {}", node, material)));
        }
        for n in &mut tree.nodes {
            n.selected = n.id == node;
        }
        tree.active = Some(node);
        Ok(())
    }

    fn add_uv_channel(&mut self, object: ObjectId, name: &str) -> BakeResult<UvChannelId> {
        self.exclusive_mesh_mut(object)?;
        let id = UvChannelId(self.next_id());
        let mesh = self.exclusive_mesh_mut(object)?;
        let corners = mesh.face_count() * 3;
        let coords = mesh
            .uv_layers
            .iter()
            .find(|l| l.active)
            .map(|l| l.coords.clone())
            .unwrap_or_else(|| vec![Vec2::ZERO; corners]);
        let name = unique_name(mesh.uv_layers.iter().map(|l| l.name.as_str()), name);
        let render = !mesh.uv_layers.iter().any(|l| l.active_render);
        for layer in &mut mesh.uv_layers {
            layer.active = false;
        }
        mesh.uv_layers.push(UvLayer {
            id,
            name,
            coords,
            active: true,
            active_render: render,
        });
        Ok(id)
    }

    fn set_active_uv_channel(&mut self, object: ObjectId, channel: UvChannelId) -> BakeResult<()> {
        self.uv_layer_mut(object, channel)?;
        let mesh = self.exclusive_mesh_mut(object)?;
        for layer in &mut mesh.uv_layers {
            layer.active = layer.id == channel;
        }
        Ok(())
    }

    fn set_uv_render_active(&mut self, object: ObjectId, channel: UvChannelId, active: bool) -> BakeResult<()> {
        self.uv_layer_mut(object, channel)?;
        let mesh = self.exclusive_mesh_mut(object)?;
        if active {
            for layer in &mut mesh.uv_layers {
                layer.active_render = layer.id == channel;
            }
        } else {
            let was_render = mesh.uv_layer(channel).is_some_and(|l| l.active_render);
            for layer in &mut mesh.uv_layers {
                if layer.id == channel {
                    layer.active_render = false;
                }
            }
            // Render flag moves to the first remaining channel.
            if was_render {
                if let Some(other) = mesh.uv_layers.iter_mut().find(|l| l.id != channel) {
                    other.active_render = true;
                }
            }
        }
        Ok(())
    }

    fn unwrap_uv(&mut self, object: ObjectId, channel: UvChannelId, faces: FaceSelection) -> BakeResult<()> {
        let selected = self.selected_faces(object, faces)?;
        self.uv_layer_mut(object, channel)?;
        let mesh = self.mesh_ref(self.object_mesh(object)?)?;
        let projected = crate::unwrap::smart_project(mesh, &selected);
        let layer = self.uv_layer_mut(object, channel)?;
        for (face, uvs) in selected.iter().zip(projected) {
            layer.coords[face * 3..face * 3 + 3].copy_from_slice(&uvs);
        }
        debug!("{}: unwrapped {} faces into {}", object, selected.len(), channel);
        Ok(())
    }

    fn bake_combined(&mut self, request: &BakeRequest) -> BakeResult<()> {
        self.bake_combined_impl(request)
    }

    fn save_modified_images(&mut self) -> BakeResult<Vec<PathBuf>> {
        self.save_modified_images_impl()
    }

    fn join_meshes(&mut self, target: ObjectId, sources: &[ObjectId]) -> BakeResult<MeshId> {
        self.join_meshes_impl(target, sources)
    }

    fn export_scene(&mut self, path: &Path, options: &ExportOptions) -> BakeResult<()> {
        self.export_scene_impl(path, options)?;
        info!("exported scene to {}", path.display());
        Ok(())
    }

    fn persist_document(&mut self, path: &Path) -> BakeResult<()> {
        self.persist_document_impl(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_mesh(name: &str) -> MeshData {
        let mut mesh = MeshData::new(name);
        mesh.positions = vec![Vec3::ZERO, Vec3::X, Vec3::Z];
        mesh.faces = vec![Face { vertices: [0, 1, 2], material_index: 0 }];
        mesh
    }

    #[test]
    fn names_collide_into_numbered_suffixes() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let a = scene.add_object(ObjectData::new("ground", None));
        let b = scene.add_object(ObjectData::new("ground", None));
        let c = scene.add_object(ObjectData::new("ground", None));
        assert_eq!(scene.object(a).unwrap().name, "ground");
        assert_eq!(scene.object(b).unwrap().name, "ground.001");
        assert_eq!(scene.object(c).unwrap().name, "ground.002");
    }

    #[test]
    fn single_user_copies_only_shared_data() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let mesh = scene.add_mesh(triangle_mesh("shared"));
        let material = scene.add_material(MaterialData::new("dirt", [0.5; 4]));
        let a = scene.add_object(ObjectData::new("ground-a", Some(mesh)).with_material(material));
        let b = scene.add_object(ObjectData::new("ground-b", Some(mesh)).with_material(material));

        scene.make_single_user(a, SingleUserScope::ALL).unwrap();
        let a_info = scene.object(a).unwrap();
        assert_ne!(a_info.mesh, Some(mesh));
        assert_ne!(a_info.material_slots[0], Some(material));

        // `b` is now the only user, nothing left to copy.
        let before = scene.meshes().count();
        scene.make_single_user(b, SingleUserScope::ALL).unwrap();
        assert_eq!(scene.meshes().count(), before);
        assert_eq!(scene.object(b).unwrap().mesh, Some(mesh));
    }

    #[test]
    fn shared_mesh_rejects_uv_edits() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let mesh = scene.add_mesh(triangle_mesh("shared"));
        let a = scene.add_object(ObjectData::new("a", Some(mesh)));
        scene.add_object(ObjectData::new("b", Some(mesh)));
        assert!(matches!(scene.add_uv_channel(a, "Bake"), Err(BakeError::InvalidState(_))));
    }

    #[test]
    fn new_uv_channel_is_active_but_not_render() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let mut mesh = triangle_mesh("m");
        mesh.uv_layers.push(UvLayer {
            id: UvChannelId(0),
            name: "UVMap".into(),
            coords: vec![Vec2::ZERO; 3],
            active: true,
            active_render: true,
        });
        let mesh = scene.add_mesh(mesh);
        let object = scene.add_object(ObjectData::new("ground", Some(mesh)));

        let bake = scene.add_uv_channel(object, "Bake").unwrap();
        let info = scene.mesh(mesh).unwrap();
        assert_eq!(info.active_uv(), Some(bake));
        assert_ne!(info.render_uv(), Some(bake));

        scene.set_uv_render_active(object, bake, true).unwrap();
        scene.set_uv_render_active(object, bake, false).unwrap();
        let info = scene.mesh(mesh).unwrap();
        assert_eq!(info.render_uv(), Some(info.uv_channels[0].id));
    }

    #[test]
    fn link_replaces_existing_input() {
        let mut scene = MemoryScene::new(SceneSettings::default());
        let material = scene.create_material("m").unwrap();
        let output = scene.output_node(material).unwrap();
        let a = scene
            .add_shader_node(material, ShaderNodeKind::Principled { base_color: [1.0; 4] })
            .unwrap();
        scene.link_sockets(material, (a, Socket::Bsdf), (output, Socket::Surface)).unwrap();
        let tree = scene.material_data(material).unwrap().tree.as_ref().unwrap();
        let into_surface: Vec<_> = tree.links.iter().filter(|l| l.to == (output, Socket::Surface)).collect();
        assert_eq!(into_surface.len(), 1);
        assert_eq!(into_surface[0].from.0, a);
    }
}
