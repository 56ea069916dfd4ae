use super::types::*;
use log::{info, warn};
use terrabake_core::*;

/// Points every successfully baked object at its baked material and takes the bake channel
/// out of rendering.
pub fn reassign<H: Host + ?Sized>(host: &mut H, table: &BakeTable, baked: &[ObjectId]) -> BakeResult<ReassignOutcome> {
    let mut outcome = ReassignOutcome::default();
    for record in table {
        if !baked.contains(&record.object) {
            warn!("{}: bake did not succeed, keeping original materials", record.object);
            outcome.skipped.push(record.object);
            continue;
        }
        reassign_record(host, record)?;
        outcome.reassigned.push(record.object);
    }
    Ok(outcome)
}

fn reassign_record<H: Host + ?Sized>(host: &mut H, record: &BakeRecord) -> BakeResult<()> {
    let info = host.object(record.object)?;
    host.set_active_material_slot(record.object, record.material_slot)?;

    if let Some(mesh) = info.mesh {
        let mesh = host.mesh(mesh)?;
        if mesh.active_uv() == Some(record.uv_channel) {
            if let Some(other) = mesh.uv_channels.iter().find(|c| c.id != record.uv_channel) {
                host.set_active_uv_channel(record.object, other.id)?;
            }
        }
    }
    host.set_uv_render_active(record.object, record.uv_channel, false)?;
    host.assign_material_slot(record.object, record.material_slot, FaceSelection::All)?;
    info!("{}: assigned baked slot {} to all faces", info.name, record.material_slot);
    Ok(())
}
