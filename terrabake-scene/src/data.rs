//! Storage types behind `MemoryScene`.

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use terrabake_core::{ImageId, MaterialId, MeshId, NodeId, ActionId, ShaderNodeKind, Socket, UvChannelId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: [u32; 3],
    pub material_index: u32,
}

/// Per-corner UV coordinates, three per face, in face order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UvLayer {
    pub id: UvChannelId,
    pub name: String,
    pub coords: Vec<Vec2>,
    pub active: bool,
    pub active_render: bool,
}

impl UvLayer {
    pub fn face(&self, face: usize) -> [Vec2; 3] {
        [self.coords[face * 3], self.coords[face * 3 + 1], self.coords[face * 3 + 2]]
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Per-vertex normals. Empty means "compute from faces".
    pub normals: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub uv_layers: Vec<UvLayer>,
}

impl MeshData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(min, max), &p| (min.min(p), max.max(p))))
    }

    pub fn corners(&self, face: usize) -> [Vec3; 3] {
        self.faces[face].vertices.map(|v| self.positions[v as usize])
    }

    pub fn face_normal(&self, face: usize) -> Vec3 {
        let [a, b, c] = self.corners(face);
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Stored normals, or area-weighted face normals accumulated per vertex.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        if self.normals.len() == self.positions.len() {
            return self.normals.clone();
        }
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for face in 0..self.faces.len() {
            let [a, b, c] = self.corners(face);
            let n = (b - a).cross(c - a);
            for v in self.faces[face].vertices {
                normals[v as usize] += n;
            }
        }
        normals.into_iter().map(|n| n.try_normalize().unwrap_or(Vec3::Z)).collect()
    }

    pub fn transform(&mut self, matrix: Mat4) {
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
        let normal_matrix = matrix.inverse().transpose();
        for n in &mut self.normals {
            *n = normal_matrix.transform_vector3(*n).normalize_or_zero();
        }
        // Mirroring transforms flip the winding.
        if matrix.determinant() < 0.0 {
            for face in 0..self.faces.len() {
                self.faces[face].vertices.swap(1, 2);
                for layer in &mut self.uv_layers {
                    layer.coords.swap(face * 3 + 1, face * 3 + 2);
                }
            }
        }
    }

    pub fn uv_layer(&self, id: UvChannelId) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|l| l.id == id)
    }

    pub fn uv_layer_mut(&mut self, id: UvChannelId) -> Option<&mut UvLayer> {
        self.uv_layers.iter_mut().find(|l| l.id == id)
    }

    pub fn render_layer(&self) -> Option<&UvLayer> {
        self.uv_layers.iter().find(|l| l.active_render)
    }

    /// Append `other` moved by `matrix`. Face material indices go through `material_remap`;
    /// UV layers are matched by name and missing ones are zero-filled. `next_uv_id` names
    /// layers that only `other` has.
    pub fn append(
        &mut self,
        other: &MeshData,
        matrix: Mat4,
        material_remap: &[u32],
        next_uv_id: &mut impl FnMut() -> UvChannelId,
    ) {
        let mut other = other.clone();
        other.transform(matrix);

        let vertex_offset = self.positions.len() as u32;
        let face_offset = self.faces.len();
        let was_empty = self.positions.is_empty();

        if was_empty {
            self.normals = other.normals.clone();
        } else if self.normals.len() == self.positions.len() && other.normals.len() == other.positions.len() {
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals.clear();
        }
        self.positions.extend_from_slice(&other.positions);

        for face in &other.faces {
            let material_index = material_remap
                .get(face.material_index as usize)
                .copied()
                .unwrap_or(0);
            self.faces.push(Face {
                vertices: face.vertices.map(|v| v + vertex_offset),
                material_index,
            });
        }

        let has_active = self.uv_layers.iter().any(|l| l.active);
        let has_render = self.uv_layers.iter().any(|l| l.active_render);
        for layer in &other.uv_layers {
            match self.uv_layers.iter_mut().find(|l| l.name == layer.name) {
                Some(existing) => existing.coords.extend_from_slice(&layer.coords),
                None => {
                    let mut coords = vec![Vec2::ZERO; face_offset * 3];
                    coords.extend_from_slice(&layer.coords);
                    self.uv_layers.push(UvLayer {
                        id: next_uv_id(),
                        name: layer.name.clone(),
                        coords,
                        active: layer.active && !has_active,
                        active_render: layer.active_render && !has_render,
                    });
                }
            }
        }
        let total_corners = self.faces.len() * 3;
        for layer in &mut self.uv_layers {
            layer.coords.resize(total_corners, Vec2::ZERO);
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShaderNode {
    pub id: NodeId,
    pub kind: ShaderNodeKind,
    pub selected: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLink {
    pub from: (NodeId, Socket),
    pub to: (NodeId, Socket),
}

/// What a material shows on its surface once the node graph is resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceColor {
    Constant([f32; 4]),
    Image(ImageId),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeTree {
    pub nodes: Vec<ShaderNode>,
    pub links: Vec<NodeLink>,
    pub active: Option<NodeId>,
    next_node: u32,
}

impl NodeTree {
    /// Principled shader wired into a material output.
    pub fn principled(base_color: [f32; 4]) -> Self {
        let mut tree = Self::default();
        let shader = tree.add(ShaderNodeKind::Principled { base_color });
        let output = tree.add(ShaderNodeKind::Output);
        tree.links.push(NodeLink {
            from: (shader, Socket::Bsdf),
            to: (output, Socket::Surface),
        });
        tree
    }

    pub fn add(&mut self, kind: ShaderNodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.push(ShaderNode { id, kind, selected: true });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&ShaderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn output(&self) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| matches!(n.kind, ShaderNodeKind::Output))
            .map(|n| n.id)
    }

    fn linked_into(&self, to: (NodeId, Socket)) -> Option<(NodeId, Socket)> {
        self.links.iter().find(|l| l.to == to).map(|l| l.from)
    }

    /// Image written by a bake: the active node, when it is an image node with an image.
    pub fn active_image(&self) -> Option<ImageId> {
        match self.node(self.active?)?.kind {
            ShaderNodeKind::ImageTexture { image } => image,
            _ => None,
        }
    }

    pub fn surface_color(&self) -> Option<SurfaceColor> {
        let (shader, _) = self.linked_into((self.output()?, Socket::Surface))?;
        let ShaderNodeKind::Principled { base_color } = self.node(shader)?.kind else {
            return None;
        };
        let image = self
            .linked_into((shader, Socket::BaseColor))
            .and_then(|(node, _)| match self.node(node)?.kind {
                ShaderNodeKind::ImageTexture { image } => image,
                _ => None,
            });
        Some(match image {
            Some(image) => SurfaceColor::Image(image),
            None => SurfaceColor::Constant(base_color),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialData {
    pub name: String,
    /// Viewport color, used when there is no node tree.
    pub diffuse: [f32; 4],
    pub tree: Option<NodeTree>,
}

impl MaterialData {
    pub fn new(name: &str, base_color: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            diffuse: base_color,
            tree: Some(NodeTree::principled(base_color)),
        }
    }

    /// Material without shading nodes.
    pub fn flat(name: &str, diffuse: [f32; 4]) -> Self {
        Self {
            name: name.to_string(),
            diffuse,
            tree: None,
        }
    }

    pub fn surface_color(&self) -> SurfaceColor {
        self.tree
            .as_ref()
            .and_then(NodeTree::surface_color)
            .unwrap_or(SurfaceColor::Constant(self.diffuse))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// RGBA8, rows top to bottom. Not part of snapshots; reloaded from `filepath`.
    #[serde(skip)]
    pub pixels: Vec<u8>,
    pub dirty: bool,
    pub filepath: Option<PathBuf>,
}

impl ImageData {
    /// Opaque black, like a freshly created bake target.
    pub fn blank(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            pixels: [0, 0, 0, 255].repeat((width * height) as usize),
            dirty: false,
            filepath: None,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionData {
    pub name: String,
    pub keyframe_count: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ModifierKind {
    Transform { matrix: Mat4 },
    /// Offset along vertex normals.
    Displace { strength: f32 },
    Mirror { axis: Axis },
    /// Unions the named object's geometry into this mesh.
    Boolean { operand: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub name: String,
    pub kind: ModifierKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ObjectData {
    pub name: String,
    pub mesh: Option<MeshId>,
    pub material_slots: Vec<Option<MaterialId>>,
    pub active_material_slot: Option<usize>,
    pub animation: Option<ActionId>,
    pub transform: Mat4,
    pub modifiers: Vec<Modifier>,
    pub linked: bool,
}

impl ObjectData {
    pub fn new(name: &str, mesh: Option<MeshId>) -> Self {
        Self {
            name: name.to_string(),
            mesh,
            material_slots: Vec::new(),
            active_material_slot: None,
            animation: None,
            transform: Mat4::IDENTITY,
            modifiers: Vec::new(),
            linked: true,
        }
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material_slots.push(Some(material));
        self.active_material_slot.get_or_insert(0);
        self
    }

    pub fn with_animation(mut self, action: ActionId) -> Self {
        self.animation = Some(action);
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_modifier(mut self, name: &str, kind: ModifierKind) -> Self {
        self.modifiers.push(Modifier { name: name.to_string(), kind });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        let mut mesh = MeshData::new("quad");
        mesh.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        mesh.faces = vec![
            Face { vertices: [0, 1, 2], material_index: 0 },
            Face { vertices: [0, 2, 3], material_index: 0 },
        ];
        mesh
    }

    #[test]
    fn computed_normals_face_up_for_ccw_quad() {
        let normals = quad().vertex_normals();
        assert!(normals.iter().all(|n| (*n - Vec3::Z).length() < 1e-5));
    }

    #[test]
    fn append_pads_missing_uv_layers_and_remaps_materials() {
        let mut target = quad();
        target.uv_layers.push(UvLayer {
            id: UvChannelId(1),
            name: "UVMap".into(),
            coords: vec![Vec2::ONE; 6],
            active: true,
            active_render: true,
        });
        let mut source = quad();
        source.uv_layers.push(UvLayer {
            id: UvChannelId(2),
            name: "Bake".into(),
            coords: vec![Vec2::splat(0.5); 6],
            active: true,
            active_render: false,
        });
        let mut next = 10;
        target.append(&source, Mat4::from_translation(Vec3::X * 2.0), &[3], &mut || {
            next += 1;
            UvChannelId(next)
        });

        assert_eq!(target.face_count(), 4);
        assert_eq!(target.vertex_count(), 8);
        assert_eq!(target.faces[2].material_index, 3);
        assert_eq!(target.faces[2].vertices, [4, 5, 6]);
        assert_eq!(target.uv_layers.len(), 2);
        assert!(target.uv_layers.iter().all(|l| l.coords.len() == 12));
        let bake = &target.uv_layers[1];
        assert_eq!(bake.id, UvChannelId(11));
        assert!(!bake.active, "target already had an active layer");
        assert_eq!(bake.coords[0], Vec2::ZERO);
        assert_eq!(bake.coords[6], Vec2::splat(0.5));
        assert_eq!(target.positions[4], Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn default_tree_resolves_constant_color() {
        let material = MaterialData::new("rock", [0.2, 0.3, 0.4, 1.0]);
        assert_eq!(material.surface_color(), SurfaceColor::Constant([0.2, 0.3, 0.4, 1.0]));
        assert_eq!(MaterialData::flat("flat", [1.0; 4]).surface_color(), SurfaceColor::Constant([1.0; 4]));
    }

    #[test]
    fn image_linked_into_base_color_wins() {
        let mut tree = NodeTree::principled([1.0; 4]);
        let image = tree.add(ShaderNodeKind::ImageTexture { image: Some(ImageId(7)) });
        let shader = tree.nodes[0].id;
        tree.links.push(NodeLink {
            from: (image, Socket::Color),
            to: (shader, Socket::BaseColor),
        });
        tree.active = Some(image);
        assert_eq!(tree.surface_color(), Some(SurfaceColor::Image(ImageId(7))));
        assert_eq!(tree.active_image(), Some(ImageId(7)));
    }
}
