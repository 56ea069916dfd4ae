use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Stable handle of a scene object. Survives renames, dies with the object.
    ObjectId,
    "object"
);
handle!(MeshId, "mesh");
handle!(MaterialId, "material");
handle!(ImageId, "image");
handle!(
    /// Unique across the whole scene, not just within one mesh.
    UvChannelId,
    "uv"
);
handle!(NodeId, "node");
handle!(ActionId, "action");

/// Data block that can be shared between objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataId {
    Mesh(MeshId),
    Material(MaterialId),
    Action(ActionId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SingleUserScope(pub u32);

impl SingleUserScope {
    pub const MESH: Self = Self(1 << 0);
    pub const MATERIAL: Self = Self(1 << 1);
    pub const ANIMATION: Self = Self(1 << 2);
    pub const ALL: Self = Self::MESH.union(Self::MATERIAL).union(Self::ANIMATION);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SingleUserScope {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FaceSelection {
    All,
    /// Faces currently assigned to the given material slot.
    MaterialSlot(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub name: String,
    pub mesh: Option<MeshId>,
    pub material_slots: Vec<Option<MaterialId>>,
    pub active_material_slot: Option<usize>,
    pub animation: Option<ActionId>,
    /// Local bounding-box size of the evaluated mesh times the object scale.
    pub dimensions: Vec3,
    pub modifiers: Vec<String>,
    /// Linked into the visible collection (exported).
    pub linked: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UvChannelInfo {
    pub id: UvChannelId,
    pub name: String,
    pub active: bool,
    pub active_render: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshInfo {
    pub id: MeshId,
    pub name: String,
    pub vertex_count: usize,
    pub face_count: usize,
    pub uv_channels: Vec<UvChannelInfo>,
}

impl MeshInfo {
    pub fn active_uv(&self) -> Option<UvChannelId> {
        self.uv_channels.iter().find(|c| c.active).map(|c| c.id)
    }

    pub fn render_uv(&self) -> Option<UvChannelId> {
        self.uv_channels.iter().find(|c| c.active_render).map(|c| c.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShaderNodeKind {
    ImageTexture { image: Option<ImageId> },
    Principled { base_color: [f32; 4] },
    Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Socket {
    Color,
    BaseColor,
    Bsdf,
    Surface,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub kind: ShaderNodeKind,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MaterialInfo {
    pub id: MaterialId,
    pub name: String,
    /// `None` when the material has no shading node tree.
    pub nodes: Option<Vec<NodeInfo>>,
    pub active_node: Option<NodeId>,
}

impl MaterialInfo {
    pub fn has_shading(&self) -> bool {
        self.nodes.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub id: ImageId,
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Modified since the last save.
    pub dirty: bool,
    pub filepath: Option<PathBuf>,
}

pub struct ImageDescriptor<'a> {
    pub name: &'a str,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Keep the result in memory only.
    Internal,
    /// Written to the image's file on the next save.
    #[default]
    External,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BakeRequest {
    pub object: ObjectId,
    pub material: MaterialId,
    pub image_node: NodeId,
    pub uv_channel: UvChannelId,
    pub save_mode: SaveMode,
    pub selected_to_active: bool,
    /// Dilation in pixels around baked islands.
    pub margin: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Bake object transforms into vertex data.
    pub apply_transforms: bool,
    /// Evaluate modifiers into the exported geometry.
    pub flatten_procedural: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            apply_transforms: true,
            flatten_procedural: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_flags_combine() {
        let scope = SingleUserScope::MESH | SingleUserScope::ANIMATION;
        assert!(scope.contains(SingleUserScope::ANIMATION));
        assert!(!scope.contains(SingleUserScope::MATERIAL));
        assert_eq!(scope | SingleUserScope::MATERIAL, SingleUserScope::ALL);
        assert!(SingleUserScope::ALL.contains(scope));
    }
}
