use crate::pipeline::PipelineMode;
use crate::processor::{BakeNaming, BakeSettings, ConsolidateOptions, NamePredicate, ResolutionPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use terrabake_core::BakeResult;

/// Everything a pipeline run can be tuned with. Missing JSON fields take the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name_prefixes: Vec<String>,
    pub mode: PipelineMode,
    /// Longest-extent breakpoints for the 256..4096 tiers.
    pub resolution_thresholds: [f32; 5],
    pub bake_uv_name: String,
    pub lightmap_uv_name: String,
    pub merged_name: String,
    pub bake_margin: u32,
    /// Keep going past objects that fail to normalize or bake.
    pub continue_on_error: bool,
    pub export_paths: Vec<PathBuf>,
    pub debug_snapshot: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name_prefixes: vec!["ground".to_string()],
            mode: PipelineMode::default(),
            resolution_thresholds: ResolutionPolicy::default().thresholds(),
            bake_uv_name: "Bake".to_string(),
            lightmap_uv_name: "Lightmap".to_string(),
            merged_name: "terrain-merged".to_string(),
            bake_margin: BakeSettings::default().margin,
            continue_on_error: true,
            export_paths: vec![PathBuf::from("src/models.glb"), PathBuf::from("build/assets/models.glb")],
            debug_snapshot: Some(PathBuf::from("assets-debug.snapshot")),
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&txt).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(s)?;
        Ok(config)
    }

    pub fn predicate(&self) -> NamePredicate {
        NamePredicate::from_prefixes(self.name_prefixes.clone())
    }

    pub fn resolution_policy(&self) -> BakeResult<ResolutionPolicy> {
        ResolutionPolicy::new(self.resolution_thresholds)
    }

    pub fn naming(&self) -> BakeNaming {
        BakeNaming {
            uv_name: self.bake_uv_name.clone(),
            ..BakeNaming::default()
        }
    }

    pub fn consolidate_options(&self, assign_unified_material: bool) -> ConsolidateOptions {
        ConsolidateOptions {
            merged_name: self.merged_name.clone(),
            lightmap_uv_name: self.lightmap_uv_name.clone(),
            assign_unified_material,
        }
    }

    pub fn bake_settings(&self) -> BakeSettings {
        BakeSettings {
            margin: self.bake_margin,
        }
    }
}
