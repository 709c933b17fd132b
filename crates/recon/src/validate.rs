//! Post-merge checks.
//!
//! Everything here is re-derived from the inputs rather than taken from the
//! reconciler's intermediate state; only the final counters in the report are
//! trusted as claims to check.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::ReconConfig;
use crate::dedup::dedupe;
use crate::engine::partition_addendum;
use crate::error::ReconError;
use crate::matcher::{same_reported_values, MatchKeyBuilder};
use crate::model::{
    GroupFields, GroupKey, MatchKey, OperationReport, RecordSet, SalaryRecord, Violation,
    REQUIRED_COLUMNS,
};
use crate::normalize::{Normalizer, TextNormalizer};
use crate::status::StatusVocabulary;

pub struct Validator<'a> {
    normalizer: &'a dyn Normalizer,
    vocabulary: StatusVocabulary,
}

impl<'a> Validator<'a> {
    pub fn new(config: &ReconConfig, normalizer: &'a dyn Normalizer) -> Self {
        Self {
            normalizer,
            vocabulary: StatusVocabulary::from_config(&config.status, normalizer),
        }
    }

    /// Check `merged` against what `addendum` asked for.
    ///
    /// Returns an empty list when every check passes. Missing required
    /// columns are an error, not a violation.
    pub fn validate(
        &self,
        base: &RecordSet,
        addendum: Option<&RecordSet>,
        merged: &RecordSet,
        report: &OperationReport,
    ) -> Result<Vec<Violation>, ReconError> {
        base.require_columns("base", &REQUIRED_COLUMNS)?;
        merged.require_columns("merged", &REQUIRED_COLUMNS)?;
        let addendum: &[SalaryRecord] = match addendum {
            Some(a) if !a.is_empty() => {
                a.require_columns("addendum", &REQUIRED_COLUMNS)?;
                a.records.as_slice()
            }
            _ => &[],
        };

        let builder = MatchKeyBuilder::new(self.normalizer);
        let merged_counts = key_counts(&merged.records, &builder);

        let (addendum, _) = dedupe(addendum, &builder, GroupFields::IdentityAndSector);
        let parts = partition_addendum(&addendum, &self.vocabulary, self.normalizer);

        let mut violations = Vec::new();

        // Deleted identities must be gone
        let delete_keys: BTreeSet<MatchKey> =
            parts.to_delete.iter().map(|r| builder.key(r)).collect();
        for key in &delete_keys {
            if let Some(&remaining) = merged_counts.get(key) {
                violations.push(Violation::DeletionSurvived {
                    key: key.clone(),
                    remaining,
                });
            }
        }

        // Added identities must be present
        let mut reported_missing = BTreeSet::new();
        for record in &parts.to_add {
            let key = builder.key(record);
            if !merged_counts.contains_key(&key) && reported_missing.insert(key.clone()) {
                violations.push(Violation::AdditionMissing { key });
            }
        }

        // Applied changes must be visible
        let (base, _) = dedupe(&base.records, &builder, GroupFields::IdentityAndSector);
        let survivors: Vec<&SalaryRecord> = base
            .iter()
            .filter(|r| !delete_keys.contains(&builder.key(r)))
            .collect();
        let found = applied_changes(&survivors, &parts.to_change, &builder)
            .into_iter()
            .filter(|key| merged_counts.contains_key(key))
            .count();
        if found != report.changes_applied {
            violations.push(Violation::ChangeCountMismatch {
                reported: report.changes_applied,
                found,
            });
        }

        // One record per identity (and sector)
        let mut groups: BTreeMap<GroupKey, usize> = BTreeMap::new();
        for record in &merged.records {
            *groups
                .entry(builder.group_key(record, GroupFields::IdentityAndSector))
                .or_insert(0) += 1;
        }
        for (group, count) in groups {
            if count > 1 {
                violations.push(Violation::DuplicateKey {
                    key: group.key,
                    count,
                });
            }
        }

        if violations.is_empty() {
            log::info!("validation passed");
        } else {
            log::warn!("validation found {} violation(s)", violations.len());
        }
        Ok(violations)
    }
}

/// Keys of change rows that were not already on file, in input order.
///
/// A change that displaces the base rows for its key consumes them; later
/// changes for the same key see an empty slot.
fn applied_changes(
    base: &[&SalaryRecord],
    changes: &[SalaryRecord],
    builder: &MatchKeyBuilder<'_>,
) -> Vec<MatchKey> {
    let mut on_file: HashMap<MatchKey, Vec<&SalaryRecord>> = HashMap::new();
    for &record in base {
        on_file.entry(builder.key(record)).or_default().push(record);
    }

    let mut applied = Vec::new();
    for change in changes {
        let key = builder.key(change);
        let already = on_file
            .get(&key)
            .is_some_and(|rows| rows.iter().any(|r| same_reported_values(change, r)));
        if already {
            continue;
        }
        on_file.remove(&key);
        applied.push(key);
    }
    applied
}

fn key_counts(records: &[SalaryRecord], builder: &MatchKeyBuilder<'_>) -> HashMap<MatchKey, usize> {
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(builder.key(record)).or_insert(0) += 1;
    }
    counts
}

/// Validate with the default [`TextNormalizer`].
pub fn validate(
    config: &ReconConfig,
    base: &RecordSet,
    addendum: Option<&RecordSet>,
    merged: &RecordSet,
    report: &OperationReport,
) -> Result<Vec<Violation>, ReconError> {
    Validator::new(config, &TextNormalizer).validate(base, addendum, merged, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconcile;
    use crate::model::{Money, STATUS};

    fn rec(first: &str, salary: i64) -> SalaryRecord {
        SalaryRecord {
            sector: Some("Schools".into()),
            first_name: Some(first.into()),
            last_name: Some("Doe".into()),
            employer: Some("Board".into()),
            job_title: Some("Teacher".into()),
            calendar_year: Some(2022),
            salary_paid: Some(Money::from_dollars(salary)),
            taxable_benefits: Some(Money::from_dollars(10)),
            ..Default::default()
        }
    }

    fn with_status(mut r: SalaryRecord, status: &str) -> SalaryRecord {
        r.status = Some(status.into());
        r
    }

    fn addendum(records: Vec<SalaryRecord>) -> RecordSet {
        let mut columns: Vec<String> = REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.push(STATUS.into());
        RecordSet::new(columns, records)
    }

    fn fixture() -> (RecordSet, RecordSet) {
        let base = RecordSet::canonical(vec![rec("Ann", 1), rec("Bob", 2), rec("Cid", 3)]);
        let add = addendum(vec![
            with_status(rec("Ann", 1), "deleted"),
            with_status(rec("Bob", 2), "changed"),
            with_status(rec("Cid", 30), "changed"),
            with_status(rec("Dee", 4), "added"),
        ]);
        (base, add)
    }

    #[test]
    fn reconciled_output_passes() {
        let (base, add) = fixture();
        let config = ReconConfig::default();
        let out = reconcile(&config, &base, Some(&add)).unwrap();
        assert_eq!(out.report.changes_skipped, 1);
        assert_eq!(out.report.changes_applied, 1);
        let violations = validate(&config, &base, Some(&add), &out.merged, &out.report).unwrap();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn pass_through_output_passes() {
        let base = RecordSet::canonical(vec![rec("Ann", 1), rec("Ann", 2)]);
        let config = ReconConfig::default();
        let out = reconcile(&config, &base, None).unwrap();
        let violations = validate(&config, &base, None, &out.merged, &out.report).unwrap();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn detects_each_violation_class() {
        let (base, add) = fixture();
        let config = ReconConfig::default();
        // Ann not deleted, Dee not added, Bob twice.
        let merged = RecordSet::canonical(vec![rec("Ann", 1), rec("Bob", 2), rec("Bob", 2), rec("Cid", 30)]);
        let report = OperationReport {
            changes_applied: 2,
            ..Default::default()
        };
        let violations = validate(&config, &base, Some(&add), &merged, &report).unwrap();
        let kinds: Vec<&str> = violations.iter().map(Violation::as_str).collect();
        assert_eq!(
            kinds,
            ["deletion_survived", "addition_missing", "change_count_mismatch", "duplicate_key"]
        );
        assert_eq!(
            violations[2],
            Violation::ChangeCountMismatch {
                reported: 2,
                found: 1
            }
        );
        match &violations[0] {
            Violation::DeletionSurvived { key, remaining } => {
                assert_eq!(key.first_name, "Ann");
                assert_eq!(*remaining, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn same_identity_in_two_sectors_is_not_a_duplicate() {
        let mut other = rec("Ann", 5);
        other.sector = Some("Hospitals".into());
        let base = RecordSet::canonical(vec![rec("Ann", 1), other]);
        let config = ReconConfig::default();
        let out = reconcile(&config, &base, None).unwrap();
        assert_eq!(out.merged.len(), 2);
        let violations = validate(&config, &base, None, &out.merged, &out.report).unwrap();
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn missing_merged_column_is_an_error() {
        let (base, add) = fixture();
        let merged = RecordSet::new(vec!["first_name".into()], vec![]);
        let err = validate(
            &ReconConfig::default(),
            &base,
            Some(&add),
            &merged,
            &OperationReport::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { ref role, .. } if role == "merged"));
    }

    #[test]
    fn repeated_change_for_one_key_counts_twice() {
        let b = MatchKeyBuilder::new(&TextNormalizer);
        let on_file = rec("Ann", 1);
        let changes = vec![rec("Ann", 2), rec("Ann", 1)];
        let keys = applied_changes(&[&on_file], &changes, &b);
        assert_eq!(keys.len(), 2);
    }
}
