use crate::data::{MaterialData, MeshData, SurfaceColor, UvLayer};
use crate::MemoryScene;
use glam::{Vec2, Vec3};
use gltf::json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use log::{debug, warn};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use terrabake_core::{BakeError, BakeResult, ExportOptions, ImageId, MaterialId};

const DEFAULT_COLOR: [f32; 4] = [0.8, 0.8, 0.8, 1.0];

/// Accumulates glTF objects and the single binary chunk they point into.
struct GlbBuilder {
    root: json::Root,
    bin: Vec<u8>,
    materials: HashMap<Option<MaterialId>, json::Index<json::Material>>,
    textures: HashMap<ImageId, json::Index<json::Texture>>,
    sampler: Option<json::Index<json::texture::Sampler>>,
}

impl GlbBuilder {
    fn new() -> Self {
        let mut root = json::Root::default();
        root.asset = json::Asset {
            version: "2.0".to_string(),
            generator: Some("terrabake".to_string()),
            ..Default::default()
        };
        Self {
            root,
            bin: Vec::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            sampler: None,
        }
    }

    fn push_view(&mut self, bytes: &[u8], target: Option<json::buffer::Target>) -> json::Index<json::buffer::View> {
        let byte_offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.root.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: USize64::from(bytes.len()),
            byte_offset: Some(USize64::from(byte_offset)),
            byte_stride: None,
            target: target.map(Valid),
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    fn push_accessor(
        &mut self,
        bytes: &[u8],
        count: usize,
        component: json::accessor::ComponentType,
        type_: json::accessor::Type,
        bounds: Option<(Vec3, Vec3)>,
    ) -> json::Index<json::Accessor> {
        let target = match component {
            json::accessor::ComponentType::U32 => json::buffer::Target::ElementArrayBuffer,
            _ => json::buffer::Target::ArrayBuffer,
        };
        let view = self.push_view(bytes, Some(target));
        self.root.push(json::Accessor {
            buffer_view: Some(view),
            byte_offset: Some(USize64(0)),
            count: USize64::from(count),
            component_type: Valid(json::accessor::GenericComponentType(component)),
            type_: Valid(type_),
            min: bounds.map(|(min, _)| json::Value::from(min.to_array().to_vec())),
            max: bounds.map(|(_, max)| json::Value::from(max.to_array().to_vec())),
            name: None,
            normalized: false,
            sparse: None,
            extensions: Default::default(),
            extras: Default::default(),
        })
    }

    fn texture(&mut self, id: ImageId, png: Vec<u8>, name: &str) -> json::Index<json::Texture> {
        if let Some(texture) = self.textures.get(&id) {
            return *texture;
        }
        let view = self.push_view(&png, None);
        let image = self.root.push(json::Image {
            buffer_view: Some(view),
            mime_type: Some(json::image::MimeType("image/png".to_string())),
            uri: None,
            name: Some(name.to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        let sampler = match self.sampler {
            Some(sampler) => sampler,
            None => {
                let sampler = self.root.push(json::texture::Sampler {
                    mag_filter: Some(Valid(json::texture::MagFilter::Linear)),
                    min_filter: Some(Valid(json::texture::MinFilter::Linear)),
                    wrap_s: Valid(json::texture::WrappingMode::ClampToEdge),
                    wrap_t: Valid(json::texture::WrappingMode::ClampToEdge),
                    ..Default::default()
                });
                self.sampler = Some(sampler);
                sampler
            }
        };
        let texture = self.root.push(json::Texture {
            source: image,
            sampler: Some(sampler),
            name: None,
            extensions: Default::default(),
            extras: Default::default(),
        });
        self.textures.insert(id, texture);
        texture
    }
}

fn encode_png(width: u32, height: u32, pixels: &[u8]) -> Option<Vec<u8>> {
    let buffer = image::RgbaImage::from_raw(width, height, pixels.to_vec())?;
    let mut png = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut png), image::ImageOutputFormat::Png)
        .ok()?;
    Some(png)
}

impl MemoryScene {
    fn export_material(&self, builder: &mut GlbBuilder, id: Option<MaterialId>) -> json::Index<json::Material> {
        let data = id.and_then(|m| self.doc.materials.get(&m));
        let surface = data
            .map(MaterialData::surface_color)
            .unwrap_or(SurfaceColor::Constant(DEFAULT_COLOR));
        if let Some(index) = builder.materials.get(&id) {
            return *index;
        }
        let name = data.map(|m| m.name.clone()).unwrap_or_else(|| "default".to_string());

        let (factor, texture) = match surface {
            SurfaceColor::Constant(color) => (color, None),
            SurfaceColor::Image(image) => {
                let png = self
                    .doc
                    .images
                    .get(&image)
                    .and_then(|i| encode_png(i.width, i.height, &i.pixels).map(|png| (png, i.name.clone())));
                match png {
                    Some((png, image_name)) => ([1.0; 4], Some(builder.texture(image, png, &image_name))),
                    None => {
                        warn!("material {}: image {} has no pixels, exporting flat color", name, image);
                        ([1.0; 4], None)
                    }
                }
            }
        };

        let index = builder.root.push(json::Material {
            name: Some(name),
            pbr_metallic_roughness: json::material::PbrMetallicRoughness {
                base_color_factor: json::material::PbrBaseColorFactor(factor),
                // Textures sample the render layer.
                base_color_texture: texture.map(|index| json::texture::Info {
                    index,
                    tex_coord: 0,
                    extensions: Default::default(),
                    extras: Default::default(),
                }),
                metallic_factor: json::material::StrengthFactor(0.0),
                roughness_factor: json::material::StrengthFactor(1.0),
                ..Default::default()
            },
            ..Default::default()
        });
        builder.materials.insert(id, index);
        index
    }

    fn export_primitives(
        &self,
        builder: &mut GlbBuilder,
        mesh: &MeshData,
        slots: &[Option<MaterialId>],
    ) -> Vec<json::mesh::Primitive> {
        let normals = mesh.vertex_normals();
        // The render layer is TEXCOORD_0, the rest follow in mesh order.
        let mut layers: Vec<&UvLayer> = mesh.uv_layers.iter().filter(|l| l.active_render).collect();
        layers.extend(mesh.uv_layers.iter().filter(|l| !l.active_render));

        let mut by_slot: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (index, face) in mesh.faces.iter().enumerate() {
            by_slot.entry(face.material_index).or_default().push(index);
        }

        let mut primitives = Vec::with_capacity(by_slot.len());
        for (slot, faces) in by_slot {
            let mut remap: HashMap<(u32, Vec<u32>), u32> = HashMap::new();
            let mut positions: Vec<Vec3> = Vec::new();
            let mut vertex_normals: Vec<Vec3> = Vec::new();
            let mut uvs: Vec<Vec<Vec2>> = vec![Vec::new(); layers.len()];
            let mut indices: Vec<u32> = Vec::with_capacity(faces.len() * 3);

            for face in faces {
                for corner in 0..3 {
                    let vertex = mesh.faces[face].vertices[corner];
                    // glTF puts the texture origin at the top left.
                    let corner_uvs: Vec<Vec2> = layers
                        .iter()
                        .map(|l| {
                            let uv = l.coords[face * 3 + corner];
                            Vec2::new(uv.x, 1.0 - uv.y)
                        })
                        .collect();
                    let key = (vertex, corner_uvs.iter().flat_map(|uv| [uv.x.to_bits(), uv.y.to_bits()]).collect());
                    let index = *remap.entry(key).or_insert_with(|| {
                        positions.push(mesh.positions[vertex as usize]);
                        vertex_normals.push(normals[vertex as usize]);
                        for (set, uv) in uvs.iter_mut().zip(&corner_uvs) {
                            set.push(*uv);
                        }
                        positions.len() as u32 - 1
                    });
                    indices.push(index);
                }
            }

            let bounds = positions
                .iter()
                .fold(None, |acc: Option<(Vec3, Vec3)>, &p| match acc {
                    Some((min, max)) => Some((min.min(p), max.max(p))),
                    None => Some((p, p)),
                });
            use json::accessor::{ComponentType, Type};
            let position = builder.push_accessor(
                bytemuck::cast_slice(&positions),
                positions.len(),
                ComponentType::F32,
                Type::Vec3,
                bounds,
            );
            let normal = builder.push_accessor(
                bytemuck::cast_slice(&vertex_normals),
                vertex_normals.len(),
                ComponentType::F32,
                Type::Vec3,
                None,
            );
            let mut attributes = BTreeMap::new();
            attributes.insert(Valid(json::mesh::Semantic::Positions), position);
            attributes.insert(Valid(json::mesh::Semantic::Normals), normal);
            for (set, coords) in uvs.iter().enumerate() {
                let texcoord =
                    builder.push_accessor(bytemuck::cast_slice(coords), coords.len(), ComponentType::F32, Type::Vec2, None);
                attributes.insert(Valid(json::mesh::Semantic::TexCoords(set as u32)), texcoord);
            }
            let index_accessor = builder.push_accessor(
                bytemuck::cast_slice(&indices),
                indices.len(),
                ComponentType::U32,
                Type::Scalar,
                None,
            );

            let material = self.export_material(builder, slots.get(slot as usize).copied().flatten());
            primitives.push(json::mesh::Primitive {
                attributes,
                indices: Some(index_accessor),
                material: Some(material),
                mode: Valid(json::mesh::Mode::Triangles),
                targets: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }
        primitives
    }

    pub(crate) fn encode_glb(&self, options: &ExportOptions) -> BakeResult<Vec<u8>> {
        let mut builder = GlbBuilder::new();
        let mut nodes = Vec::new();

        for (&id, object) in self.doc.objects.iter().filter(|(_, o)| o.linked) {
            let Some(mesh_id) = object.mesh else { continue };
            let mut mesh = if options.flatten_procedural {
                self.evaluated_mesh(id)?
            } else {
                self.mesh_ref(mesh_id)?.clone()
            };
            if mesh.faces.is_empty() {
                debug!("skipping {}: no faces", object.name);
                continue;
            }
            if options.apply_transforms {
                mesh.transform(object.transform);
            }

            let primitives = self.export_primitives(&mut builder, &mesh, &object.material_slots);
            let gltf_mesh = builder.root.push(json::Mesh {
                primitives,
                weights: None,
                name: Some(mesh.name.clone()),
                extensions: Default::default(),
                extras: Default::default(),
            });
            let matrix = (!options.apply_transforms).then(|| object.transform.to_cols_array());
            nodes.push(builder.root.push(json::Node {
                name: Some(object.name.clone()),
                mesh: Some(gltf_mesh),
                matrix,
                ..Default::default()
            }));
        }

        if !builder.bin.is_empty() {
            builder.root.push(json::Buffer {
                byte_length: USize64::from(builder.bin.len()),
                uri: None,
                name: None,
                extensions: Default::default(),
                extras: Default::default(),
            });
        }
        let scene = builder.root.push(json::Scene {
            nodes,
            name: Some("Scene".to_string()),
            extensions: Default::default(),
            extras: Default::default(),
        });
        builder.root.scene = Some(scene);

        let json_bytes = json::serialize::to_vec(&builder.root).map_err(|e| BakeError::Serialization(e.to_string()))?;
        let glb = gltf::binary::Glb {
            header: gltf::binary::Header {
                magic: *b"glTF",
                version: 2,
                length: 0,
            },
            json: Cow::Owned(json_bytes),
            bin: (!builder.bin.is_empty()).then(|| Cow::Owned(builder.bin)),
        };
        let mut bytes = Vec::new();
        glb.to_writer(&mut bytes).map_err(|e| BakeError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    pub(crate) fn export_scene_impl(&self, path: &Path, options: &ExportOptions) -> BakeResult<()> {
        let bytes = self.encode_glb(options)?;
        write_replacing(path, &bytes)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Writes next to `path` first so a failed write never leaves a truncated file behind.
pub(crate) fn write_replacing(path: &Path, bytes: &[u8]) -> BakeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BakeError::io(parent, e))?;
    }
    let partial = partial_path(path);
    let result = std::fs::write(&partial, bytes).and_then(|_| std::fs::rename(&partial, path));
    if let Err(source) = result {
        let _ = std::fs::remove_file(&partial);
        return Err(BakeError::io(path, source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sits_next_to_target() {
        let partial = partial_path(Path::new("build/assets/models.glb"));
        assert_eq!(partial, Path::new("build/assets/models.glb.partial"));
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // A directory at the target path makes the rename fail.
        let target = dir.path().join("models.glb");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        assert!(write_replacing(&target, b"glTF").is_err());
        assert!(!partial_path(&target).exists());
        assert!(target.is_dir());
    }
}
