use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use terrabake_core::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResolutionTier {
    R128,
    R256,
    R512,
    R1024,
    R2048,
    R4096,
}

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 6] = [
        ResolutionTier::R128,
        ResolutionTier::R256,
        ResolutionTier::R512,
        ResolutionTier::R1024,
        ResolutionTier::R2048,
        ResolutionTier::R4096,
    ];

    /// Edge length of the square image.
    pub fn pixels(self) -> u32 {
        128 << (self as u32)
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}x{0}", self.pixels())
    }
}

/// Everything the bake and reassignment passes need to know about one object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BakeRecord {
    pub object: ObjectId,
    pub material: MaterialId,
    pub material_slot: usize,
    pub image: ImageId,
    pub uv_channel: UvChannelId,
    pub image_node: NodeId,
    pub tier: ResolutionTier,
}

/// Records keyed by object, iterated in insertion order.
#[derive(Debug, Default)]
pub struct BakeTable {
    records: Vec<BakeRecord>,
    by_object: HashMap<ObjectId, usize>,
}

impl BakeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects a second record for an object and records that reuse an image or UV channel.
    pub fn insert(&mut self, record: BakeRecord) -> BakeResult<()> {
        if self.by_object.contains_key(&record.object) {
            return Err(BakeError::InvalidState(format!("{} already has a bake record", record.object)));
        }
        if let Some(other) = self
            .records
            .iter()
            .find(|r| r.image == record.image || r.uv_channel == record.uv_channel)
        {
            return Err(BakeError::InvalidState(format!(
                "{} shares its bake target with {}",
                record.object, other.object
            )));
        }
        self.by_object.insert(record.object, self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, object: ObjectId) -> Option<&BakeRecord> {
        self.by_object.get(&object).map(|&i| &self.records[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BakeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BakeRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a BakeTable {
    type Item = &'a BakeRecord;
    type IntoIter = std::slice::Iter<'a, BakeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Names given to generated bake data, derived from the object name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BakeNaming {
    pub material_suffix: String,
    pub image_suffix: String,
    pub uv_name: String,
}

impl Default for BakeNaming {
    fn default() -> Self {
        Self {
            material_suffix: "-baked".to_string(),
            image_suffix: "-baked-tex".to_string(),
            uv_name: "Bake".to_string(),
        }
    }
}

impl BakeNaming {
    pub fn material_name(&self, object: &str) -> String {
        format!("{}{}", object, self.material_suffix)
    }

    pub fn image_name(&self, object: &str) -> String {
        format!("{}{}", object, self.image_suffix)
    }
}

/// Material, slot and UV channel that already exist on an object and are reused as the
/// bake target instead of being created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PreparedTarget {
    pub material: MaterialId,
    pub slot: usize,
    pub uv_channel: UvChannelId,
}

#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub normalized: Vec<ObjectId>,
    pub failures: Vec<(ObjectId, BakeError)>,
}

impl NormalizeOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BakeSettings {
    /// Dilation around baked islands, in pixels.
    pub margin: u32,
}

impl Default for BakeSettings {
    fn default() -> Self {
        Self { margin: 4 }
    }
}

#[derive(Debug, Default)]
pub struct BakeOutcome {
    pub baked: Vec<ObjectId>,
    pub failures: Vec<(ObjectId, BakeError)>,
    /// Image files written after each successful bake.
    pub saved: Vec<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReassignOutcome {
    pub reassigned: Vec<ObjectId>,
    /// Records whose bake did not succeed.
    pub skipped: Vec<ObjectId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolidateOptions {
    pub merged_name: String,
    pub lightmap_uv_name: String,
    /// Assign the unified material to every face. Off when per-object materials must survive
    /// the merge (bake-then-merge) or a later bake rewrites them (merge-then-bake).
    pub assign_unified_material: bool,
}

impl Default for ConsolidateOptions {
    fn default() -> Self {
        Self {
            merged_name: "terrain-merged".to_string(),
            lightmap_uv_name: "Lightmap".to_string(),
            assign_unified_material: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedMesh {
    pub object: ObjectId,
    pub mesh: MeshId,
    pub unified_uv: UvChannelId,
    pub unified_material: MaterialId,
    pub unified_slot: usize,
    pub face_count: usize,
    pub vertex_count: usize,
    pub material_slot_count: usize,
}

impl MergedMesh {
    pub fn prepared_target(&self) -> PreparedTarget {
        PreparedTarget {
            material: self.unified_material,
            slot: self.unified_slot,
            uv_channel: self.unified_uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(object: u32, image: u32, uv: u32) -> BakeRecord {
        BakeRecord {
            object: ObjectId(object),
            material: MaterialId(object + 100),
            material_slot: 1,
            image: ImageId(image),
            uv_channel: UvChannelId(uv),
            image_node: NodeId(3),
            tier: ResolutionTier::R256,
        }
    }

    #[test]
    fn table_keeps_insertion_order() {
        let mut table = BakeTable::new();
        table.insert(record(9, 1, 1)).unwrap();
        table.insert(record(2, 2, 2)).unwrap();
        let order: Vec<_> = table.iter().map(|r| r.object).collect();
        assert_eq!(order, vec![ObjectId(9), ObjectId(2)]);
        assert_eq!(table.get(ObjectId(2)).unwrap().image, ImageId(2));
    }

    #[test]
    fn table_rejects_duplicates() {
        let mut table = BakeTable::new();
        table.insert(record(1, 1, 1)).unwrap();
        assert!(table.insert(record(1, 2, 2)).is_err());
        assert!(table.insert(record(2, 1, 2)).is_err());
        assert!(table.insert(record(3, 3, 1)).is_err());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn tier_pixels() {
        let pixels: Vec<u32> = ResolutionTier::ALL.iter().map(|t| t.pixels()).collect();
        assert_eq!(pixels, vec![128, 256, 512, 1024, 2048, 4096]);
        assert_eq!(ResolutionTier::R2048.to_string(), "2048x2048");
    }
}
