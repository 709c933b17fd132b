use std::collections::{HashMap, HashSet};

use crate::matcher::MatchKeyBuilder;
use crate::model::{DedupStats, GroupFields, GroupKey, SalaryRecord};

/// Collapse `records` to one record per group key.
///
/// Fully identical records are dropped first (first occurrence kept). Each
/// remaining group keeps the record with the highest total compensation;
/// on a tie the earliest record in input order wins. Kept records retain
/// their relative input order.
pub fn dedupe(
    records: &[SalaryRecord],
    builder: &MatchKeyBuilder<'_>,
    fields: GroupFields,
) -> (Vec<SalaryRecord>, DedupStats) {
    let mut seen: HashSet<&SalaryRecord> = HashSet::with_capacity(records.len());
    let unique: Vec<&SalaryRecord> = records.iter().filter(|r| seen.insert(*r)).collect();
    let exact_duplicates_removed = records.len() - unique.len();

    // group key -> (index of best member in `unique`, member count)
    let mut groups: HashMap<GroupKey, (usize, usize)> = HashMap::with_capacity(unique.len());
    for (i, record) in unique.iter().enumerate() {
        let slot = groups
            .entry(builder.group_key(record, fields))
            .or_insert((i, 0));
        slot.1 += 1;
        if record.total_compensation_cents() > unique[slot.0].total_compensation_cents() {
            slot.0 = i;
        }
    }

    let non_exact_duplicates_resolved = groups.values().filter(|(_, count)| *count > 1).count();
    let keep: HashSet<usize> = groups.values().map(|(best, _)| *best).collect();

    let deduped: Vec<SalaryRecord> = unique
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, r)| r.clone())
        .collect();

    (
        deduped,
        DedupStats {
            exact_duplicates_removed,
            non_exact_duplicates_resolved,
        },
    )
}
