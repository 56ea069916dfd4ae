use crate::types::*;
use std::path::{Path, PathBuf};

/// The scene environment the pipeline runs against.
///
/// Every operation names its target explicitly. Implementations must not depend on an
/// "active object" left behind by a previous call, and every call either completes or
/// fails before returning.
pub trait Host {
    /// All objects in host scene order, linked or not.
    fn objects(&self) -> Vec<ObjectId>;
    fn object(&self, object: ObjectId) -> crate::BakeResult<ObjectInfo>;
    fn mesh(&self, mesh: MeshId) -> crate::BakeResult<MeshInfo>;
    fn material(&self, material: MaterialId) -> crate::BakeResult<MaterialInfo>;
    fn image(&self, image: ImageId) -> crate::BakeResult<ImageInfo>;
    /// Number of distinct objects referencing the data block.
    fn users(&self, data: DataId) -> crate::BakeResult<usize>;

    /// Break sharing of the selected data kinds. Data already used by this object alone
    /// is left untouched.
    fn make_single_user(&mut self, object: ObjectId, scope: SingleUserScope) -> crate::BakeResult<()>;
    /// Apply one modifier into the base mesh and remove it from the stack.
    fn apply_modifier(&mut self, object: ObjectId, modifier: &str) -> crate::BakeResult<()>;

    fn create_mesh(&mut self, name: &str) -> crate::BakeResult<MeshId>;
    /// Created unlinked, with an identity transform.
    fn create_object(&mut self, name: &str, mesh: MeshId) -> crate::BakeResult<ObjectId>;
    fn link_object(&mut self, object: ObjectId) -> crate::BakeResult<()>;
    /// New material with a default node tree (principled shader wired to the output).
    fn create_material(&mut self, name: &str) -> crate::BakeResult<MaterialId>;
    fn create_image(&mut self, descriptor: &ImageDescriptor) -> crate::BakeResult<ImageId>;

    /// Returns the index of the new slot.
    fn add_material_slot(&mut self, object: ObjectId, material: MaterialId) -> crate::BakeResult<usize>;
    fn set_active_material_slot(&mut self, object: ObjectId, slot: usize) -> crate::BakeResult<()>;
    fn assign_material_slot(
        &mut self,
        object: ObjectId,
        slot: usize,
        faces: FaceSelection,
    ) -> crate::BakeResult<()>;

    fn add_shader_node(&mut self, material: MaterialId, kind: ShaderNodeKind) -> crate::BakeResult<NodeId>;
    fn output_node(&self, material: MaterialId) -> crate::BakeResult<NodeId>;
    /// Links replace any existing link into the same input socket.
    fn link_sockets(
        &mut self,
        material: MaterialId,
        from: (NodeId, Socket),
        to: (NodeId, Socket),
    ) -> crate::BakeResult<()>;
    /// Makes the node active and the only selected node of the tree.
    fn set_active_node(&mut self, material: MaterialId, node: NodeId) -> crate::BakeResult<()>;

    /// The new channel becomes the active one.
    fn add_uv_channel(&mut self, object: ObjectId, name: &str) -> crate::BakeResult<UvChannelId>;
    fn set_active_uv_channel(&mut self, object: ObjectId, channel: UvChannelId) -> crate::BakeResult<()>;
    fn set_uv_render_active(
        &mut self,
        object: ObjectId,
        channel: UvChannelId,
        active: bool,
    ) -> crate::BakeResult<()>;
    /// Automatic projection into `channel`, non-overlapping, inside the unit square.
    fn unwrap_uv(
        &mut self,
        object: ObjectId,
        channel: UvChannelId,
        faces: FaceSelection,
    ) -> crate::BakeResult<()>;

    /// Combined-lighting bake into the active image node of every material on the object.
    fn bake_combined(&mut self, request: &BakeRequest) -> crate::BakeResult<()>;
    /// Write every dirty image with external storage. Returns the written paths.
    fn save_modified_images(&mut self) -> crate::BakeResult<Vec<PathBuf>>;

    /// Merge `sources` into `target`'s mesh. The sources stop existing as objects.
    fn join_meshes(&mut self, target: ObjectId, sources: &[ObjectId]) -> crate::BakeResult<MeshId>;

    fn export_scene(&mut self, path: &Path, options: &ExportOptions) -> crate::BakeResult<()>;
    fn persist_document(&mut self, path: &Path) -> crate::BakeResult<()>;
}
