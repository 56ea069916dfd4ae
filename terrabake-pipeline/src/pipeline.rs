use crate::config::PipelineConfig;
use crate::processor::*;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use terrabake_core::*;

/// How baking and merging compose.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// One texture per object, objects stay separate.
    #[default]
    PerObject,
    /// Join everything under one unified material, no bake.
    Merge,
    /// Join first, then bake the merged mesh into one texture.
    MergeThenBake,
    /// Bake per object, then join keeping the baked materials.
    BakeThenMerge,
}

impl PipelineMode {
    pub const ALL: [PipelineMode; 4] = [
        PipelineMode::PerObject,
        PipelineMode::Merge,
        PipelineMode::MergeThenBake,
        PipelineMode::BakeThenMerge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineMode::PerObject => "per-object",
            PipelineMode::Merge => "merge",
            PipelineMode::MergeThenBake => "merge-then-bake",
            PipelineMode::BakeThenMerge => "bake-then-merge",
        }
    }

    fn merges(self) -> bool {
        self != PipelineMode::PerObject
    }
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown mode '{}', expected one of per-object, merge, merge-then-bake, bake-then-merge", s))
    }
}

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub mode: PipelineMode,
    pub selected: Vec<ObjectId>,
    pub normalize: NormalizeOutcome,
    pub records: Vec<BakeRecord>,
    pub bake: Option<BakeOutcome>,
    pub reassign: Option<ReassignOutcome>,
    pub merged: Option<MergedMesh>,
    pub exported: Vec<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl PipelineReport {
    pub fn failure_count(&self) -> usize {
        self.normalize.failures.len() + self.bake.as_ref().map_or(0, |b| b.failures.len())
    }

    pub fn is_clean(&self) -> bool {
        self.failure_count() == 0 && self.warnings.is_empty()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode: {}", self.mode)?;
        writeln!(f, "selected: {} objects", self.selected.len())?;
        writeln!(
            f,
            "normalized: {} ok, {} failed",
            self.normalize.normalized.len(),
            self.normalize.failures.len()
        )?;
        for record in &self.records {
            writeln!(f, "  {} -> {} {} ({})", record.object, record.material, record.image, record.tier)?;
        }
        if let Some(bake) = &self.bake {
            writeln!(
                f,
                "baked: {} ok, {} failed, {} images saved",
                bake.baked.len(),
                bake.failures.len(),
                bake.saved.len()
            )?;
            for (object, e) in &bake.failures {
                writeln!(f, "  {}: {}", object, e)?;
            }
        }
        if let Some(merged) = &self.merged {
            writeln!(
                f,
                "merged: {} ({} faces, {} vertices, {} slots)",
                merged.object, merged.face_count, merged.vertex_count, merged.material_slot_count
            )?;
        }
        for path in &self.exported {
            writeln!(f, "exported: {}", path.display())?;
        }
        if let Some(path) = &self.snapshot {
            writeln!(f, "snapshot: {}", path.display())?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

/// One run of select, normalize, bake and/or merge, export.
pub struct Pipeline<'h, H: Host + ?Sized> {
    host: &'h mut H,
    config: PipelineConfig,
}

impl<'h, H: Host + ?Sized> Pipeline<'h, H> {
    pub fn new(host: &'h mut H, config: PipelineConfig) -> Self {
        Self { host, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&mut self) -> BakeResult<PipelineReport> {
        let mode = self.config.mode;
        let mut report = PipelineReport {
            mode,
            ..Default::default()
        };
        info!("running {} pipeline", mode);

        report.selected = select(&*self.host, &self.config.predicate())?;
        if report.selected.is_empty() {
            let e = BakeError::SelectionEmpty;
            warn!("{}", e);
            report.warnings.push(e.to_string());
            return Ok(report);
        }
        info!("selected {} objects", report.selected.len());

        report.normalize = normalize(&mut *self.host, &report.selected);
        if !report.normalize.is_clean() && (mode.merges() || !self.config.continue_on_error) {
            return Err(aborted("normalize", &report.normalize.failures));
        }
        let working = report.normalize.normalized.clone();
        verify_exclusive(&*self.host, &working)?;

        match mode {
            PipelineMode::PerObject => {
                self.bake_objects(&working, &mut report, !self.config.continue_on_error)?;
            }
            PipelineMode::Merge => {
                report.merged = consolidate(&mut *self.host, &working, &self.config.consolidate_options(true))?;
            }
            PipelineMode::MergeThenBake => {
                let merged = consolidate(&mut *self.host, &working, &self.config.consolidate_options(false))?;
                if let Some(merged) = &merged {
                    let record = allocate_into(
                        &mut *self.host,
                        merged.object,
                        &merged.prepared_target(),
                        &self.config.resolution_policy()?,
                        &self.config.naming(),
                    )?;
                    let mut table = BakeTable::new();
                    table.insert(record)?;
                    self.bake_table(table, &mut report, !self.config.continue_on_error)?;
                }
                report.merged = merged;
            }
            PipelineMode::BakeThenMerge => {
                // Consolidation needs every contributor in a known state.
                self.bake_objects(&working, &mut report, true)?;
                report.merged = consolidate(&mut *self.host, &working, &self.config.consolidate_options(false))?;
            }
        }

        report.exported = export(&mut *self.host, &self.config.export_paths)?;
        if let Some(path) = &self.config.debug_snapshot {
            persist(&mut *self.host, path)?;
            report.snapshot = Some(path.clone());
        }
        Ok(report)
    }

    fn bake_objects(&mut self, objects: &[ObjectId], report: &mut PipelineReport, strict: bool) -> BakeResult<()> {
        let table = allocate(
            &mut *self.host,
            objects,
            &self.config.resolution_policy()?,
            &self.config.naming(),
        )?;
        info!("allocated {} bake targets", table.len());
        self.bake_table(table, report, strict)
    }

    fn bake_table(&mut self, table: BakeTable, report: &mut PipelineReport, strict: bool) -> BakeResult<()> {
        report.records = table.records().to_vec();
        let outcome = execute(&mut *self.host, &table, &self.config.bake_settings());
        if strict && !outcome.failures.is_empty() {
            return Err(aborted("bake", &outcome.failures));
        }
        report.reassign = Some(reassign(&mut *self.host, &table, &outcome.baked)?);
        report.bake = Some(outcome);
        Ok(())
    }
}

fn aborted(stage: &'static str, failures: &[(ObjectId, BakeError)]) -> BakeError {
    BakeError::StageAborted {
        stage,
        failures: failures.iter().map(|(_, e)| e.to_string()).collect(),
    }
}
