use log::info;
use std::path::{Path, PathBuf};
use terrabake_core::*;

/// Exports the scene to every target. The first failure ends the run.
pub fn export<H: Host + ?Sized>(host: &mut H, targets: &[PathBuf]) -> BakeResult<Vec<PathBuf>> {
    let options = ExportOptions {
        apply_transforms: true,
        flatten_procedural: true,
    };
    let mut written = Vec::with_capacity(targets.len());
    for path in targets {
        host.export_scene(path, &options)?;
        info!("wrote {}", path.display());
        written.push(path.clone());
    }
    Ok(written)
}

pub fn persist<H: Host + ?Sized>(host: &mut H, path: &Path) -> BakeResult<()> {
    host.persist_document(path)?;
    info!("saved debug snapshot {}", path.display());
    Ok(())
}
