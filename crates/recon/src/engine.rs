use std::collections::{BTreeSet, HashSet};

use crate::config::ReconConfig;
use crate::dedup::dedupe;
use crate::error::ReconError;
use crate::matcher::{same_reported_values, MatchKeyBuilder};
use crate::model::{
    GroupFields, MatchKey, Operation, OperationReport, ReconcileMode, RecordSet, SalaryRecord,
    INCOMPLETE_CHECK_COLUMNS, REQUIRED_COLUMNS, STATUS,
};
use crate::normalize::{Normalizer, TextNormalizer};
use crate::status::{StatusResolution, StatusVocabulary};

/// Merged records plus what happened on the way.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub merged: RecordSet,
    pub report: OperationReport,
}

/// Addendum rows split by resolved operation, after the incomplete-row drop.
#[derive(Debug, Default)]
pub struct PartitionedAddendum {
    pub to_add: Vec<SalaryRecord>,
    pub to_delete: Vec<SalaryRecord>,
    pub to_change: Vec<SalaryRecord>,
    /// Raw status values that matched no operation, in input order.
    pub unresolved: Vec<String>,
    pub dropped_incomplete: usize,
}

/// Resolve statuses, drop incomplete rows, and split by operation.
pub fn partition_addendum(
    records: &[SalaryRecord],
    vocabulary: &StatusVocabulary,
    normalizer: &dyn Normalizer,
) -> PartitionedAddendum {
    let mut out = PartitionedAddendum::default();
    for record in records {
        let op = match vocabulary.resolve(record.status.as_deref(), normalizer) {
            StatusResolution::Resolved(op) => op,
            StatusResolution::Unresolved(raw) => {
                out.unresolved.push(raw);
                continue;
            }
        };
        if let Some(column) = record.first_missing(&INCOMPLETE_CHECK_COLUMNS) {
            log::debug!("dropping {op} row with no {column}");
            out.dropped_incomplete += 1;
            continue;
        }
        match op {
            Operation::Addition => out.to_add.push(record.clone()),
            Operation::Deletion => out.to_delete.push(record.clone()),
            Operation::Changed => out.to_change.push(record.clone()),
        }
    }
    out
}

/// Outcome of matching change rows against the surviving base records.
#[derive(Debug, Default)]
pub struct ChangePlan<'c> {
    /// Changes whose values are already on file.
    pub skipped: Vec<&'c SalaryRecord>,
    /// Changes that displace every base record sharing their key.
    pub replaced: Vec<&'c SalaryRecord>,
    /// Changes with no base record to displace.
    pub inserted: Vec<&'c SalaryRecord>,
    /// Keys whose base records are removed.
    pub removed_keys: HashSet<MatchKey>,
}

impl ChangePlan<'_> {
    pub fn applied(&self) -> usize {
        self.replaced.len() + self.inserted.len()
    }
}

/// Single pass over `changes` against a key index of `base`.
///
/// Changes are considered in input order: once a change has displaced the
/// base records for a key, later changes for that key find nothing on file.
pub fn plan_changes<'c>(
    base: &[SalaryRecord],
    changes: &'c [SalaryRecord],
    builder: &MatchKeyBuilder<'_>,
) -> ChangePlan<'c> {
    let index = builder.index(base);
    let mut plan = ChangePlan::default();

    for change in changes {
        let key = builder.key(change);
        let on_file: &[usize] = match index.get(&key) {
            Some(positions) if !plan.removed_keys.contains(&key) => positions.as_slice(),
            _ => &[],
        };

        if on_file.is_empty() {
            plan.inserted.push(change);
        } else if on_file.iter().any(|&i| same_reported_values(change, &base[i])) {
            plan.skipped.push(change);
        } else {
            plan.replaced.push(change);
            plan.removed_keys.insert(key);
        }
    }

    plan
}

/// Applies addenda to base record sets.
pub struct Reconciler<'a> {
    normalizer: &'a dyn Normalizer,
    vocabulary: StatusVocabulary,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &ReconConfig, normalizer: &'a dyn Normalizer) -> Self {
        Self {
            normalizer,
            vocabulary: StatusVocabulary::from_config(&config.status, normalizer),
        }
    }

    /// Reconcile one year's base set with its (optional) addendum.
    ///
    /// Both inputs are deduplicated first. A missing or empty addendum, or one
    /// without any status values, passes the deduplicated base through.
    pub fn reconcile(
        &self,
        base: &RecordSet,
        addendum: Option<&RecordSet>,
    ) -> Result<Reconciliation, ReconError> {
        base.require_columns("base", &REQUIRED_COLUMNS)?;
        let builder = MatchKeyBuilder::new(self.normalizer);
        let mut report = OperationReport::default();

        let (base_records, base_stats) =
            dedupe(&base.records, &builder, GroupFields::IdentityAndSector);
        report.base_dedup = base_stats;
        log::info!(
            "base: {} rows, {} exact duplicates removed, {} non-exact duplicate groups resolved",
            base.len(),
            base_stats.exact_duplicates_removed,
            base_stats.non_exact_duplicates_resolved,
        );

        let addendum = match addendum {
            None => {
                return Ok(self.pass_through(base, base_records, report, ReconcileMode::NoAddendum))
            }
            Some(a) if a.is_empty() => {
                let mode = ReconcileMode::EmptyAddendum;
                return Ok(self.pass_through(base, base_records, report, mode));
            }
            Some(a) => a,
        };
        addendum.require_columns("addendum", &REQUIRED_COLUMNS)?;
        if !addendum.has_column(STATUS) || addendum.records.iter().all(|r| r.status.is_none()) {
            return Ok(self.pass_through(base, base_records, report, ReconcileMode::NoStatus));
        }

        let (addendum_records, addendum_stats) =
            dedupe(&addendum.records, &builder, GroupFields::IdentityAndSector);
        report.addendum_dedup = addendum_stats;

        let parts = partition_addendum(&addendum_records, &self.vocabulary, self.normalizer);
        report.rows_dropped_incomplete = parts.dropped_incomplete;
        report.unresolved_statuses = parts.unresolved.len();
        report.unresolved_status_values = parts
            .unresolved
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        report.additions_requested = parts.to_add.len();
        report.deletions_requested = parts.to_delete.len();
        report.changes_requested = parts.to_change.len();

        if report.unresolved_statuses > 0 {
            log::warn!(
                "{} addendum row(s) with unrecognized status ignored: {:?}",
                report.unresolved_statuses,
                report.unresolved_status_values,
            );
        }
        if parts.dropped_incomplete > 0 {
            log::info!("dropped {} incomplete addendum row(s)", parts.dropped_incomplete);
        }
        log::info!(
            "addendum: {} additions, {} deletions, {} changes",
            parts.to_add.len(),
            parts.to_delete.len(),
            parts.to_change.len(),
        );

        // Deletions
        let delete_keys: HashSet<MatchKey> =
            parts.to_delete.iter().map(|r| builder.key(r)).collect();
        let before_delete = base_records.len();
        let survivors: Vec<SalaryRecord> = base_records
            .into_iter()
            .filter(|r| !delete_keys.contains(&builder.key(r)))
            .collect();
        report.deletions_applied = before_delete - survivors.len();

        // Changes
        let plan = plan_changes(&survivors, &parts.to_change, &builder);
        report.changes_skipped = plan.skipped.len();
        report.changes_applied = plan.applied();
        if !plan.skipped.is_empty() {
            log::info!("skipping {} change(s) already on file", plan.skipped.len());
        }

        // Additions are staged unconditionally; the final pass settles overlaps.
        report.additions_applied = parts.to_add.len();

        let staged = plan
            .replaced
            .iter()
            .chain(plan.inserted.iter())
            .copied()
            .chain(parts.to_add.iter());
        let mut combined: Vec<SalaryRecord> = survivors
            .into_iter()
            .filter(|r| !plan.removed_keys.contains(&builder.key(r)))
            .collect();
        combined.extend(staged.map(|r| SalaryRecord {
            status: None,
            ..r.clone()
        }));

        let combined_len = combined.len();
        let (merged_records, final_stats) =
            dedupe(&combined, &builder, GroupFields::IdentityAndSector);
        report.final_dedup = final_stats;
        report.final_rows_removed = combined_len - merged_records.len();
        log::info!(
            "merged: {} rows ({} removed by final deduplication)",
            merged_records.len(),
            report.final_rows_removed,
        );

        let merged = RecordSet::new(merged_columns(base, Some(addendum)), merged_records);
        Ok(Reconciliation { merged, report })
    }

    fn pass_through(
        &self,
        base: &RecordSet,
        records: Vec<SalaryRecord>,
        mut report: OperationReport,
        mode: ReconcileMode,
    ) -> Reconciliation {
        log::info!("addendum not applied ({mode:?}); passing base through");
        report.mode = mode;
        let merged = RecordSet::new(merged_columns(base, None), records);
        Reconciliation { merged, report }
    }
}

/// Base columns followed by any addendum-only columns, minus `status`.
fn merged_columns(base: &RecordSet, addendum: Option<&RecordSet>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(base.columns.len());
    let extra = addendum.map(|a| a.columns.as_slice()).unwrap_or(&[]);
    for column in base.columns.iter().chain(extra) {
        if column != STATUS && !columns.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// Reconcile with the default [`TextNormalizer`].
pub fn reconcile(
    config: &ReconConfig,
    base: &RecordSet,
    addendum: Option<&RecordSet>,
) -> Result<Reconciliation, ReconError> {
    Reconciler::new(config, &TextNormalizer).reconcile(base, addendum)
}
