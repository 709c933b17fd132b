//! `paylist merge` and `paylist validate`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use paylist_recon::export::{merged_file_name, report_file_name, write_outputs_atomic};
use paylist_recon::load::{load_csv_file, modal_year};
use paylist_recon::{
    OperationReport, ReconConfig, Reconciler, RecordSet, RunMeta, TextNormalizer, Validator,
    Violation,
};

use crate::exit_codes::EXIT_VALIDATION_FAILED;
use crate::CliError;

/// Contents of `merge_report_{year}.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MergeReport {
    pub meta: RunMeta,
    pub year: i32,
    pub salary: String,
    pub addendum: Option<String>,
    pub merged: String,
    pub rows: RowCounts,
    pub operations: OperationReport,
    pub violations: Vec<Violation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RowCounts {
    pub base: usize,
    pub addendum: usize,
    pub merged: usize,
}

pub(crate) fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    Ok(ReconConfig::from_toml(&text)?)
}

pub fn cmd_merge(
    salary: PathBuf,
    addendum: Option<PathBuf>,
    output_dir: PathBuf,
    config_path: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;

    if output_dir.exists() && !output_dir.is_dir() {
        return Err(CliError::args(format!(
            "--output {} is not a directory",
            output_dir.display()
        )));
    }

    let base = load_csv_file("base", &salary, &config.columns)?;
    let addendum_path = addendum.filter(|p| {
        let exists = p.exists();
        if !exists {
            log::info!("addendum {} not found", p.display());
        }
        exists
    });
    let addendum_set = match &addendum_path {
        Some(p) => Some(load_csv_file("addendum", p, &config.columns)?),
        None => None,
    };

    let normalizer = TextNormalizer;
    let reconciliation =
        Reconciler::new(&config, &normalizer).reconcile(&base, addendum_set.as_ref())?;
    let merged = &reconciliation.merged;

    let violations = Validator::new(&config, &normalizer).validate(
        &base,
        addendum_set.as_ref(),
        merged,
        &reconciliation.report,
    )?;

    // Output is named after the year most rows belong to
    let year = modal_year(merged)?;
    std::fs::create_dir_all(&output_dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", output_dir.display())))?;
    let merged_path = output_dir.join(merged_file_name(year));
    let report_path = output_dir.join(report_file_name(year));

    let report = MergeReport {
        meta: RunMeta::now(),
        year,
        salary: salary.display().to_string(),
        addendum: addendum_path.as_ref().map(|p| p.display().to_string()),
        merged: merged_path.display().to_string(),
        rows: RowCounts {
            base: base.len(),
            addendum: addendum_set.as_ref().map_or(0, RecordSet::len),
            merged: merged.len(),
        },
        operations: reconciliation.report,
        violations,
    };

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    write_outputs_atomic(merged, &merged_path, &json_str, &report_path)?;

    if json_output {
        println!("{json_str}");
    }

    let ops = &report.operations;
    eprintln!(
        "{}: {} base rows -> {} merged ({} added, {} changed, {} deleted, {} changes skipped)",
        merged_path.display(),
        report.rows.base,
        report.rows.merged,
        ops.additions_applied,
        ops.changes_applied,
        ops.deletions_applied,
        ops.changes_skipped,
    );

    violations_result(&report.violations, &report_path)
}

pub fn cmd_validate(
    salary: PathBuf,
    addendum: PathBuf,
    merged: PathBuf,
    report_path: PathBuf,
    config_path: Option<PathBuf>,
    json_output: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;

    let report_str = std::fs::read_to_string(&report_path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", report_path.display())))?;
    let report: MergeReport = serde_json::from_str(&report_str).map_err(|e| {
        CliError::args(format!("{} is not a merge report: {e}", report_path.display()))
            .with_hint("pass the merge_report_<year>.json written by `paylist merge`")
    })?;

    let base = load_csv_file("base", &salary, &config.columns)?;
    let addendum_set = load_csv_file("addendum", &addendum, &config.columns)?;
    let merged_set = load_csv_file("merged", &merged, &config.columns)?;

    let violations = Validator::new(&config, &TextNormalizer).validate(
        &base,
        Some(&addendum_set),
        &merged_set,
        &report.operations,
    )?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&violations)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    violations_result(&violations, &report_path)
}

fn violations_result(violations: &[Violation], report_path: &Path) -> Result<(), CliError> {
    if violations.is_empty() {
        return Ok(());
    }
    for v in violations {
        eprintln!("  {}: {v}", v.as_str());
    }
    Err(CliError {
        code: EXIT_VALIDATION_FAILED,
        message: format!("{} validation violation(s)", violations.len()),
        hint: Some(format!("details in {}", report_path.display())),
    })
}
