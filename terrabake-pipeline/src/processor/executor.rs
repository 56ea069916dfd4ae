use super::types::*;
use log::{error, info};
use std::path::PathBuf;
use terrabake_core::*;

/// Bakes every record in table order. A failing record is reported and the rest continue;
/// images saved by earlier records are left alone.
pub fn execute<H: Host + ?Sized>(host: &mut H, table: &BakeTable, settings: &BakeSettings) -> BakeOutcome {
    let mut outcome = BakeOutcome::default();
    for record in table {
        match bake_record(host, record, settings) {
            Ok(saved) => {
                outcome.baked.push(record.object);
                outcome.saved.extend(saved);
            }
            Err(e) => {
                error!("{}", e);
                outcome.failures.push((record.object, e));
            }
        }
    }
    outcome
}

fn bake_record<H: Host + ?Sized>(host: &mut H, record: &BakeRecord, settings: &BakeSettings) -> BakeResult<Vec<PathBuf>> {
    let name = host.object(record.object)?.name;
    let image = host.image(record.image)?;

    host.set_active_material_slot(record.object, record.material_slot)?;
    host.set_active_node(record.material, record.image_node)?;
    info!("{}: baking into {} ({}x{})", name, image.name, image.width, image.height);
    host.bake_combined(&BakeRequest {
        object: record.object,
        material: record.material,
        image_node: record.image_node,
        uv_channel: record.uv_channel,
        save_mode: SaveMode::External,
        selected_to_active: false,
        margin: settings.margin,
    })?;
    host.save_modified_images()
}
