use crate::data::ImageData;
use crate::export::write_replacing;
use crate::scene::Document;
use crate::{MemoryScene, SceneSettings};
use log::{info, warn};
use std::path::Path;
use terrabake_core::{BakeError, BakeResult};

impl MemoryScene {
    pub(crate) fn persist_document_impl(&self, path: &Path) -> BakeResult<()> {
        let bytes = bincode::serialize(&self.doc).map_err(|e| BakeError::Serialization(e.to_string()))?;
        write_replacing(path, &bytes)?;
        info!("saved scene snapshot {} ({} objects)", path.display(), self.doc.objects.len());
        Ok(())
    }

    /// Loads a snapshot written by `persist_document`. Image pixels come back from the
    /// saved image files; images that were never saved load as blank.
    pub fn load_document(path: &Path, settings: SceneSettings) -> BakeResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| BakeError::io(path, e))?;
        let mut doc: Document = bincode::deserialize(&bytes)
            .map_err(|e| BakeError::Serialization(format!("{}: {}", path.display(), e)))?;
        for image in doc.images.values_mut() {
            reload_pixels(image);
        }
        Ok(Self { doc, settings })
    }
}

fn reload_pixels(image: &mut ImageData) {
    let blank = ImageData::blank(&image.name, image.width, image.height).pixels;
    let Some(file) = image.filepath.as_ref() else {
        image.pixels = blank;
        return;
    };
    match image::open(file) {
        Ok(decoded) if decoded.width() == image.width && decoded.height() == image.height => {
            image.pixels = decoded.to_rgba8().into_raw();
        }
        Ok(decoded) => {
            warn!(
                "{}: file is {}x{}, expected {}x{}",
                file.display(),
                decoded.width(),
                decoded.height(),
                image.width,
                image.height
            );
            image.pixels = blank;
        }
        Err(e) => {
            warn!("{}: {}", file.display(), e);
            image.pixels = blank;
        }
    }
}
