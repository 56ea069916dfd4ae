use crate::data::{ImageData, SurfaceColor};
use crate::scene::Lighting;
use crate::MemoryScene;
use glam::{Mat3, Vec2, Vec3, Vec4};
use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use terrabake_core::{BakeError, BakeRequest, BakeResult, ImageId, SaveMode, ShaderNodeKind};

/// Read-only copy of an image used as albedo source while the target is being written.
struct Texture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Texture {
    fn sample(&self, uv: Vec2) -> Vec4 {
        if self.width == 0 || self.height == 0 || self.pixels.is_empty() {
            return Vec4::ONE;
        }
        let x = ((uv.x.rem_euclid(1.0)) * self.width as f32) as u32;
        let y = ((1.0 - uv.y.rem_euclid(1.0)) * self.height as f32) as u32;
        let (x, y) = (x.min(self.width - 1), y.min(self.height - 1));
        let i = ((y * self.width + x) * 4) as usize;
        Vec4::new(
            self.pixels[i] as f32,
            self.pixels[i + 1] as f32,
            self.pixels[i + 2] as f32,
            self.pixels[i + 3] as f32,
        ) / 255.0
    }
}

enum Albedo {
    Constant(Vec4),
    Image(usize),
}

struct Triangle {
    /// Target pixel space, y down.
    pixel: [Vec2; 3],
    /// Render UVs, used to sample image albedo.
    render_uv: [Vec2; 3],
    normals: [Vec3; 3],
    albedo: Albedo,
}

impl MemoryScene {
    pub(crate) fn bake_combined_impl(&mut self, request: &BakeRequest) -> BakeResult<()> {
        let object = self.obj(request.object)?;
        let name = object.name.clone();
        let fail = |reason: String| BakeError::bake(name.clone(), reason);

        if request.selected_to_active {
            return Err(fail("selected-to-active baking is not supported".into()));
        }
        if !object.material_slots.contains(&Some(request.material)) {
            return Err(fail(format!("{} is not assigned to the object", request.material)));
        }
        let material = self.mat_ref(request.material)?;
        let target = match material.tree.as_ref().and_then(|t| t.node(request.image_node)) {
            Some(node) => match node.kind {
                ShaderNodeKind::ImageTexture { image: Some(image) } if self.doc.images.contains_key(&image) => image,
                _ => return Err(fail(format!("{} in {} has no target image", request.image_node, material.name))),
            },
            None => return Err(fail(format!("{} not found in {}", request.image_node, material.name))),
        };
        let mesh_id = self.object_mesh(request.object)?;
        let mesh = self.mesh_ref(mesh_id)?;
        let bake_uv = mesh
            .uv_layer(request.uv_channel)
            .ok_or_else(|| fail(format!("{} not found on mesh {}", request.uv_channel, mesh.name)))?;

        // Every face writes into the active image node of its own material.
        for (index, face) in mesh.faces.iter().enumerate() {
            let active = self
                .face_material(object, face)
                .and_then(|m| self.doc.materials.get(&m))
                .and_then(|m| m.tree.as_ref())
                .and_then(|t| t.active_image());
            if active != Some(target) {
                return Err(fail(format!(
                    "face {} (slot {}) has no active image target",
                    index, face.material_index
                )));
            }
        }

        let target_image = &self.doc.images[&target];
        let (width, height) = (target_image.width, target_image.height);
        let render_uv = mesh.render_layer().unwrap_or(bake_uv);
        let normal_matrix = Mat3::from_mat4(object.transform).inverse().transpose();
        let vertex_normals: Vec<Vec3> = mesh
            .vertex_normals()
            .into_iter()
            .map(|n| (normal_matrix * n).normalize_or_zero())
            .collect();

        let mut textures: Vec<Texture> = Vec::new();
        let mut texture_slots: HashMap<ImageId, usize> = HashMap::new();
        let mut triangles = Vec::with_capacity(mesh.face_count());
        for (index, face) in mesh.faces.iter().enumerate() {
            let surface = self
                .face_material(object, face)
                .and_then(|m| self.doc.materials.get(&m))
                .map(|m| m.surface_color())
                .unwrap_or(SurfaceColor::Constant([0.8, 0.8, 0.8, 1.0]));
            let albedo = match surface {
                SurfaceColor::Constant(c) => Albedo::Constant(Vec4::from_array(c)),
                SurfaceColor::Image(image) => match self.doc.images.get(&image) {
                    Some(data) => {
                        let slot = *texture_slots.entry(image).or_insert_with(|| {
                            textures.push(snapshot_texture(data));
                            textures.len() - 1
                        });
                        Albedo::Image(slot)
                    }
                    None => Albedo::Constant(Vec4::ONE),
                },
            };
            let size = Vec2::new(width as f32, height as f32);
            triangles.push(Triangle {
                pixel: bake_uv.face(index).map(|uv| Vec2::new(uv.x, 1.0 - uv.y) * size),
                render_uv: render_uv.face(index),
                normals: face.vertices.map(|v| vertex_normals[v as usize]),
                albedo,
            });
        }

        let lighting = self.settings.lighting;
        let margin = request.margin;
        let mut pixels = self.doc.images[&target].pixels.clone();
        rasterize(&mut pixels, width, height, &triangles, &textures, &lighting, margin);

        let image = self
            .doc
            .images
            .get_mut(&target)
            .ok_or_else(|| BakeError::UnknownHandle(target.to_string()))?;
        image.pixels = pixels;
        if request.save_mode == SaveMode::External {
            image.dirty = true;
        }
        debug!("{}: baked {} faces into {}", name, triangles.len(), image.name);
        Ok(())
    }

    pub(crate) fn save_modified_images_impl(&mut self) -> BakeResult<Vec<PathBuf>> {
        let image_dir = self.settings.image_dir.clone();
        let mut saved = Vec::new();
        for image in self.doc.images.values_mut().filter(|i| i.dirty) {
            let path = image
                .filepath
                .clone()
                .unwrap_or_else(|| image_dir.join(format!("{}.png", image.name)));
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| BakeError::io(parent, e))?;
            }
            image::save_buffer(&path, &image.pixels, image.width, image.height, image::ColorType::Rgba8)
                .map_err(|e| match e {
                    image::ImageError::IoError(source) => BakeError::io(&path, source),
                    other => BakeError::Serialization(format!("{}: {}", path.display(), other)),
                })?;
            image.dirty = false;
            image.filepath = Some(path.clone());
            info!("saved image {}", path.display());
            saved.push(path);
        }
        Ok(saved)
    }
}

fn snapshot_texture(image: &ImageData) -> Texture {
    Texture {
        width: image.width,
        height: image.height,
        pixels: image.pixels.clone(),
    }
}

fn barycentric(p: Vec2, [a, b, c]: [Vec2; 3]) -> Option<Vec3> {
    let area = (b - a).perp_dot(c - a);
    if area.abs() < f32::EPSILON {
        return None;
    }
    let w0 = (b - p).perp_dot(c - p) / area;
    let w1 = (c - p).perp_dot(a - p) / area;
    let w2 = 1.0 - w0 - w1;
    const EPS: f32 = -1e-4;
    (w0 >= EPS && w1 >= EPS && w2 >= EPS).then_some(Vec3::new(w0, w1, w2))
}

fn shade(tri: &Triangle, w: Vec3, textures: &[Texture], lighting: &Lighting) -> [u8; 4] {
    let albedo = match tri.albedo {
        Albedo::Constant(c) => c,
        Albedo::Image(slot) => {
            let uv = tri.render_uv[0] * w.x + tri.render_uv[1] * w.y + tri.render_uv[2] * w.z;
            textures[slot].sample(uv)
        }
    };
    let normal = (tri.normals[0] * w.x + tri.normals[1] * w.y + tri.normals[2] * w.z).normalize_or_zero();
    let diffuse = normal.dot(lighting.sun_direction).max(0.0);
    let light = lighting.ambient + lighting.sun_color * diffuse;
    let rgb = (albedo.truncate() * light).clamp(Vec3::ZERO, Vec3::ONE) * 255.0;
    [rgb.x.round() as u8, rgb.y.round() as u8, rgb.z.round() as u8, 255]
}

/// Writes shaded texels for every pixel center covered by a triangle, then dilates the
/// covered area by `margin` pixels.
fn rasterize(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    triangles: &[Triangle],
    textures: &[Texture],
    lighting: &Lighting,
    margin: u32,
) {
    let row_len = width as usize;
    let mut covered = vec![false; row_len * height as usize];

    pixels
        .par_chunks_mut(row_len * 4)
        .zip(covered.par_chunks_mut(row_len))
        .enumerate()
        .for_each(|(y, (row, mask))| {
            let cy = y as f32 + 0.5;
            for tri in triangles {
                let min_y = tri.pixel.iter().map(|p| p.y).fold(f32::MAX, f32::min);
                let max_y = tri.pixel.iter().map(|p| p.y).fold(f32::MIN, f32::max);
                if cy < min_y || cy > max_y {
                    continue;
                }
                let min_x = tri.pixel.iter().map(|p| p.x).fold(f32::MAX, f32::min).floor().max(0.0) as usize;
                let max_x = (tri.pixel.iter().map(|p| p.x).fold(f32::MIN, f32::max).ceil() as usize).min(row_len);
                for x in min_x..max_x {
                    if let Some(w) = barycentric(Vec2::new(x as f32 + 0.5, cy), tri.pixel) {
                        row[x * 4..x * 4 + 4].copy_from_slice(&shade(tri, w, textures, lighting));
                        mask[x] = true;
                    }
                }
            }
        });

    dilate(pixels, &mut covered, width as usize, height as usize, margin);
}

fn dilate(pixels: &mut [u8], covered: &mut [bool], width: usize, height: usize, margin: u32) {
    for _ in 0..margin {
        let mut grown = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if covered[y * width + x] {
                    continue;
                }
                let neighbors = [
                    (x > 0).then(|| y * width + x - 1),
                    (x + 1 < width).then(|| y * width + x + 1),
                    (y > 0).then(|| (y - 1) * width + x),
                    (y + 1 < height).then(|| (y + 1) * width + x),
                ];
                if let Some(source) = neighbors.into_iter().flatten().find(|&n| covered[n]) {
                    grown.push((y * width + x, source));
                }
            }
        }
        if grown.is_empty() {
            break;
        }
        for &(pixel, source) in &grown {
            pixels.copy_within(source * 4..source * 4 + 4, pixel * 4);
        }
        for (pixel, _) in grown {
            covered[pixel] = true;
        }
    }
}
