//! Smart projection: faces are grouped into charts by dominant normal direction and edge
//! connectivity, each chart is projected onto its axis plane, and the charts are packed
//! into the unit square with a guillotine packer.

use crate::data::MeshData;
use glam::{Vec2, Vec3};
use std::collections::HashMap;

/// Packing grid resolution along the longer atlas side.
const GRID: f32 = 1024.0;
/// Gap between charts, in grid cells.
const PADDING: u32 = 2;

struct Chart {
    faces: Vec<usize>,
    /// Projected corners, 3 per face, relative to the chart's minimum corner.
    coords: Vec<Vec2>,
    size: Vec2,
}

#[derive(Clone, Copy)]
struct FreeRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

struct Placement {
    chart: usize,
    x: u32,
    y: u32,
}

/// UVs for every face in `faces`, in the same order. Every returned coordinate lies in
/// `[0, 1]` and charts never overlap.
pub fn smart_project(mesh: &MeshData, faces: &[usize]) -> Vec<[Vec2; 3]> {
    if faces.is_empty() {
        return Vec::new();
    }
    let charts = build_charts(mesh, faces);

    let extent = charts.iter().map(|c| c.size.max_element()).fold(0.0f32, f32::max);
    let area: f32 = charts.iter().map(|c| c.size.x * c.size.y).sum();
    // Scale so that the charts roughly fill a GRID x GRID square.
    let scale = if area > f32::EPSILON {
        (GRID * 0.7) / area.sqrt()
    } else if extent > f32::EPSILON {
        GRID / extent
    } else {
        1.0
    };

    let sized: Vec<(u32, u32)> = charts
        .iter()
        .map(|c| {
            let w = (c.size.x * scale).ceil().max(1.0) as u32;
            let h = (c.size.y * scale).ceil().max(1.0) as u32;
            (w + PADDING * 2, h + PADDING * 2)
        })
        .collect();
    let placements = guillotine_pack(&sized);

    let atlas = placements
        .iter()
        .map(|p| (p.x + sized[p.chart].0).max(p.y + sized[p.chart].1))
        .max()
        .unwrap_or(1)
        .max(1) as f32;

    let mut result = vec![[Vec2::ZERO; 3]; faces.len()];
    let slot_of: HashMap<usize, usize> = faces.iter().enumerate().map(|(i, f)| (*f, i)).collect();
    for placement in &placements {
        let chart = &charts[placement.chart];
        let origin = Vec2::new((placement.x + PADDING) as f32, (placement.y + PADDING) as f32);
        for (i, face) in chart.faces.iter().enumerate() {
            let uvs = [0, 1, 2].map(|k| {
                let local = chart.coords[i * 3 + k] * scale;
                ((origin + local) / atlas).clamp(Vec2::ZERO, Vec2::ONE)
            });
            result[slot_of[face]] = uvs;
        }
    }
    result
}

fn dominant_axis(normal: Vec3) -> usize {
    let a = normal.abs();
    let axis = if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    };
    axis * 2 + usize::from(normal[axis] < 0.0)
}

fn project(p: Vec3, group: usize) -> Vec2 {
    let flip = if group % 2 == 1 { -1.0 } else { 1.0 };
    match group / 2 {
        0 => Vec2::new(p.y * flip, p.z),
        1 => Vec2::new(p.x * flip, p.z),
        _ => Vec2::new(p.x * flip, p.y),
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn build_charts(mesh: &MeshData, faces: &[usize]) -> Vec<Chart> {
    let groups: Vec<usize> = faces.iter().map(|&f| dominant_axis(mesh.face_normal(f))).collect();

    let mut parent: Vec<usize> = (0..faces.len()).collect();
    let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
    for (i, &face) in faces.iter().enumerate() {
        let v = mesh.faces[face].vertices;
        for e in 0..3 {
            let (a, b) = (v[e], v[(e + 1) % 3]);
            let key = if a < b { (a, b) } else { (b, a) };
            match edges.get(&key) {
                Some(&j) if groups[j] == groups[i] => {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    parent[ri] = rj;
                }
                Some(_) => {}
                None => {
                    edges.insert(key, i);
                }
            }
        }
    }

    let mut by_root: HashMap<usize, usize> = HashMap::new();
    let mut charts: Vec<Chart> = Vec::new();
    for (i, &face) in faces.iter().enumerate() {
        let root = find(&mut parent, i);
        let index = *by_root.entry(root).or_insert_with(|| {
            charts.push(Chart { faces: Vec::new(), coords: Vec::new(), size: Vec2::ZERO });
            charts.len() - 1
        });
        let chart = &mut charts[index];
        chart.faces.push(face);
        for p in mesh.corners(face) {
            chart.coords.push(project(p, groups[i]));
        }
    }

    for chart in &mut charts {
        let min = chart.coords.iter().copied().fold(Vec2::splat(f32::MAX), Vec2::min);
        let max = chart.coords.iter().copied().fold(Vec2::splat(f32::MIN), Vec2::max);
        for c in &mut chart.coords {
            *c -= min;
        }
        chart.size = max - min;
    }
    charts
}

/// Best-short-side-fit guillotine packing, largest first, growing the bin until all fit.
fn guillotine_pack(sized: &[(u32, u32)]) -> Vec<Placement> {
    let mut order: Vec<usize> = (0..sized.len()).collect();
    order.sort_by(|&a, &b| sized[b].0.max(sized[b].1).cmp(&sized[a].0.max(sized[a].1)));

    let Some(&first) = order.first() else {
        return Vec::new();
    };
    let mut bin_w = sized[first].0.next_power_of_two();
    let mut bin_h = sized[first].1.next_power_of_two();
    loop {
        if let Some(placements) = try_pack(&order, sized, bin_w, bin_h) {
            return placements;
        }
        if bin_w <= bin_h {
            bin_w *= 2;
        } else {
            bin_h *= 2;
        }
    }
}

fn try_pack(order: &[usize], sized: &[(u32, u32)], bin_w: u32, bin_h: u32) -> Option<Vec<Placement>> {
    let mut free = vec![FreeRect { x: 0, y: 0, w: bin_w, h: bin_h }];
    let mut placements = Vec::with_capacity(order.len());
    for &chart in order {
        let (w, h) = sized[chart];
        let best = free
            .iter()
            .enumerate()
            .filter(|(_, r)| r.w >= w && r.h >= h)
            .min_by_key(|(_, r)| (r.w - w).min(r.h - h))
            .map(|(i, _)| i)?;
        let rect = free.swap_remove(best);
        placements.push(Placement { chart, x: rect.x, y: rect.y });
        if rect.w > w {
            free.push(FreeRect { x: rect.x + w, y: rect.y, w: rect.w - w, h });
        }
        if rect.h > h {
            free.push(FreeRect { x: rect.x, y: rect.y + h, w: rect.w, h: rect.h - h });
        }
    }
    Some(placements)
}
