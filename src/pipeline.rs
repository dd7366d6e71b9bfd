//! Batch Pipeline - Single Entry Point
//!
//! Stage order is fixed and strictly sequential: load records, derive the
//! required slot names, extraction pre-pass, validation gate, per-record
//! resize, per-record compile, assemble, execute. Nothing row-shaped
//! happens before the gate passes.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::bounds::{BoundsMap, BoundsScan, ValidationOutcome, VALIDATION_REPORT_FILE};
use crate::config::BatchConfig;
use crate::exec::{ExecError, HostLauncher};
use crate::instructions::{compile_record, Instruction};
use crate::records::{load_records, required_slot_names, Record};
use crate::resize::fit_record_images;
use crate::script::{
    assemble_batch, extraction_script, write_script, BATCH_SCRIPT_FILE, EXTRACT_SCRIPT_FILE,
};
use crate::slots;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Missing {what}: {path}")]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("Failed to read data set: {0}")]
    Data(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing slots in template: {}", .0.join(","))]
    MissingSlots(Vec<String>),

    #[error("Validation report is malformed: {0}")]
    MalformedValidationReport(PathBuf),

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Per-column resolution problem. Accumulated and reported, never fatal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RowWarning {
    MissingBounds {
        product_id: String,
        column: String,
    },
    MissingSource {
        product_id: String,
        column: String,
        path: PathBuf,
    },
    ResizeFailed {
        product_id: String,
        column: String,
        reason: String,
    },
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowWarning::MissingBounds { product_id, column } => {
                write!(f, "[{}] no bounds for slot '{}'", product_id, column)
            }
            RowWarning::MissingSource {
                product_id,
                column,
                path,
            } => write!(
                f,
                "[{}] image for '{}' missing: {}",
                product_id,
                column,
                path.display()
            ),
            RowWarning::ResizeFailed {
                product_id,
                column,
                reason,
            } => write!(
                f,
                "[{}] resize of '{}' failed: {}",
                product_id, column, reason
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub records: usize,
    pub required_slots: Vec<String>,
    pub bounds_entries: usize,
    pub script_path: PathBuf,
    pub warnings: Vec<RowWarning>,
}

/// The batch pipeline. Holds the immutable run configuration and the
/// launcher selected once at startup.
pub struct BatchPipeline {
    config: BatchConfig,
    launcher: HostLauncher,
}

impl BatchPipeline {
    pub fn new(config: BatchConfig) -> Self {
        let launcher = HostLauncher::for_platform(config.platform, config.host_app.clone());
        Self { config, launcher }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    fn check_inputs(&self) -> Result<(), PipelineError> {
        if !self.config.template.is_file() {
            return Err(PipelineError::MissingInput {
                what: "template",
                path: self.config.template.clone(),
            });
        }
        if !self.config.data.is_file() {
            return Err(PipelineError::MissingInput {
                what: "data set",
                path: self.config.data.clone(),
            });
        }
        if !self.config.image_root.is_dir() {
            return Err(PipelineError::MissingInput {
                what: "image root",
                path: self.config.image_root.clone(),
            });
        }
        Ok(())
    }

    /// Extraction pre-pass: emit the walk script, drive the host with the
    /// shorter timeout, parse both reports back. Runs exactly once per
    /// batch.
    pub fn extract_bounds(
        &self,
        required: &[String],
    ) -> Result<(BoundsMap, ValidationOutcome), PipelineError> {
        let script = extraction_script(&self.config.template, required, &self.config.work_dir);
        let script_path = self.config.work_dir.join(EXTRACT_SCRIPT_FILE);
        write_script(&script_path, &script)?;

        self.launcher.run_script(
            &script_path,
            Duration::from_secs(self.config.bounds_timeout_secs),
        )?;

        let validation_path = self.config.work_dir.join(VALIDATION_REPORT_FILE);
        let outcome = ValidationOutcome::load(&validation_path)?
            .ok_or(PipelineError::MalformedValidationReport(validation_path))?;
        let bounds =
            BoundsMap::load(&self.config.work_dir.join(crate::bounds::GEOMETRY_REPORT_FILE))?;
        Ok((bounds, outcome))
    }

    /// The full run. Fails before any row work when the template and the
    /// data set disagree.
    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.check_inputs()?;

        let mut records = load_records(&self.config.data)?;
        let required = required_slot_names(&records);
        info!(
            records = records.len(),
            required = required.len(),
            "data set loaded"
        );

        let (bounds, outcome) = self.extract_bounds(&required)?;
        validation_gate(outcome)?;
        info!(bounds = bounds.len(), "validation gate passed");

        let mut warnings = vec![];
        for record in &mut records {
            warnings.extend(fit_record_images(record, &bounds, &self.config.image_root));
        }

        let script_path = self.assemble(&records)?;
        self.launcher.run_script(
            &script_path,
            Duration::from_secs(self.config.batch_timeout_secs),
        )?;

        for warning in &warnings {
            warn!(%warning, "row warning");
        }
        Ok(RunSummary {
            records: records.len(),
            required_slots: required,
            bounds_entries: bounds.len(),
            script_path,
            warnings,
        })
    }

    /// Compile every record and persist the batch script, in input order,
    /// from scratch (no append mode).
    pub fn assemble(&self, records: &[Record]) -> Result<PathBuf, PipelineError> {
        let rows: Vec<Vec<Instruction>> = records
            .iter()
            .map(|record| compile_record(record, &self.config))
            .collect();
        let script = assemble_batch(&rows);
        let script_path = self.config.work_dir.join(BATCH_SCRIPT_FILE);
        write_script(&script_path, &script)?;
        Ok(script_path)
    }

    /// Offline walk over a JSON slot-tree snapshot: same extraction
    /// semantics, no host required. Writes both report artifacts.
    pub fn scan_snapshot(&self, snapshot: &PathBuf) -> Result<BoundsScan, PipelineError> {
        if !snapshot.is_file() {
            return Err(PipelineError::MissingInput {
                what: "slot-tree snapshot",
                path: snapshot.clone(),
            });
        }
        let root = slots::load_snapshot(snapshot)?;

        let records = load_records(&self.config.data)?;
        let required = required_slot_names(&records);

        let scan = BoundsScan::run(&root, &required);
        scan.write_reports(&self.config.work_dir)?;
        Ok(scan)
    }
}

/// The primary fail-fast gate: a missing-slot verdict halts the batch
/// before any row is touched.
pub fn validation_gate(outcome: ValidationOutcome) -> Result<(), PipelineError> {
    match outcome {
        ValidationOutcome::AllFound => Ok(()),
        ValidationOutcome::Missing(names) => Err(PipelineError::MissingSlots(names)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_passes_only_when_all_found() {
        assert!(validation_gate(ValidationOutcome::AllFound).is_ok());
        let err = validation_gate(ValidationOutcome::Missing(vec!["Title".into()])).unwrap_err();
        match err {
            PipelineError::MissingSlots(names) => assert_eq!(names, vec!["Title"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn row_warnings_serialize_with_kind_tag() {
        let warning = RowWarning::ResizeFailed {
            product_id: "sku-1".into(),
            column: "Image 1".into(),
            reason: "decode error".into(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "resize_failed");
        assert_eq!(json["reason"], "decode error");
    }

    #[test]
    fn missing_slot_error_lists_exact_names() {
        let err = PipelineError::MissingSlots(vec!["Title".into(), "Image 9".into()]);
        assert_eq!(err.to_string(), "Missing slots in template: Title,Image 9");
    }
}
