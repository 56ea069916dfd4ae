use super::normalizer::normalize;
use super::types::*;
use log::info;
use terrabake_core::*;

/// Joins `objects` into a new placeholder object with one extra UV channel and one extra
/// material slot. Returns `None` for an empty working set.
pub fn consolidate<H: Host + ?Sized>(
    host: &mut H,
    objects: &[ObjectId],
    options: &ConsolidateOptions,
) -> BakeResult<Option<MergedMesh>> {
    if objects.is_empty() {
        info!("nothing to consolidate");
        return Ok(None);
    }

    let mesh = host.create_mesh(&options.merged_name)?;
    let merged = host.create_object(&options.merged_name, mesh)?;
    let mut working = objects.to_vec();
    working.push(merged);

    let outcome = normalize(host, &working);
    if !outcome.is_clean() {
        return Err(BakeError::StageAborted {
            stage: "consolidate",
            failures: outcome.failures.iter().map(|(_, e)| e.to_string()).collect(),
        });
    }

    let mut face_count = 0;
    let mut vertex_count = 0;
    let mut slot_count = 0;
    for &object in objects {
        let info = host.object(object)?;
        if let Some(mesh) = info.mesh {
            let mesh = host.mesh(mesh)?;
            face_count += mesh.face_count;
            vertex_count += mesh.vertex_count;
        }
        slot_count += info.material_slots.len();
    }

    let mesh = host.join_meshes(merged, objects)?;
    let joined = host.mesh(mesh)?;
    if joined.face_count != face_count || joined.vertex_count != vertex_count {
        return Err(BakeError::InvalidState(format!(
            "join produced {} faces / {} vertices, expected {} / {}",
            joined.face_count, joined.vertex_count, face_count, vertex_count
        )));
    }
    let merged_info = host.object(merged)?;
    if merged_info.material_slots.len() > slot_count {
        return Err(BakeError::InvalidState(format!(
            "join produced {} material slots from {}",
            merged_info.material_slots.len(),
            slot_count
        )));
    }

    let unified_uv = host.add_uv_channel(merged, &options.lightmap_uv_name)?;
    host.unwrap_uv(merged, unified_uv, FaceSelection::All)?;

    let unified_material = host.create_material(&format!("{}-lightmap", merged_info.name))?;
    let unified_slot = host.add_material_slot(merged, unified_material)?;
    host.set_active_material_slot(merged, unified_slot)?;
    if options.assign_unified_material {
        host.assign_material_slot(merged, unified_slot, FaceSelection::All)?;
    }
    host.link_object(merged)?;

    info!(
        "{}: merged {} objects, {} faces, {} vertices, {} slots",
        merged_info.name,
        objects.len(),
        face_count,
        vertex_count,
        unified_slot + 1
    );
    Ok(Some(MergedMesh {
        object: merged,
        mesh,
        unified_uv,
        unified_material,
        unified_slot,
        face_count,
        vertex_count,
        material_slot_count: unified_slot + 1,
    }))
}
