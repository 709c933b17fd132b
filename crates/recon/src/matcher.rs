use std::collections::HashMap;

use crate::model::{GroupFields, GroupKey, MatchKey, SalaryRecord};
use crate::normalize::Normalizer;

/// Derives identity keys from records through a [`Normalizer`].
#[derive(Clone, Copy)]
pub struct MatchKeyBuilder<'a> {
    normalizer: &'a dyn Normalizer,
}

impl<'a> MatchKeyBuilder<'a> {
    pub fn new(normalizer: &'a dyn Normalizer) -> Self {
        Self { normalizer }
    }

    /// Missing text fields normalize as the empty string. The year is not
    /// normalized: different recorded years never share a key.
    pub fn key(&self, record: &SalaryRecord) -> MatchKey {
        MatchKey {
            first_name: self.norm(&record.first_name),
            last_name: self.norm(&record.last_name),
            employer: self.norm(&record.employer),
            job_title: self.norm(&record.job_title),
            calendar_year: record.calendar_year,
        }
    }

    pub fn group_key(&self, record: &SalaryRecord, fields: GroupFields) -> GroupKey {
        let sector = match fields {
            GroupFields::Identity => None,
            GroupFields::IdentityAndSector => Some(self.norm(&record.sector)),
        };
        GroupKey {
            sector,
            key: self.key(record),
        }
    }

    /// Positions of `records` per match key, in input order.
    pub fn index<'r, I>(&self, records: I) -> HashMap<MatchKey, Vec<usize>>
    where
        I: IntoIterator<Item = &'r SalaryRecord>,
    {
        let mut index: HashMap<MatchKey, Vec<usize>> = HashMap::new();
        for (i, record) in records.into_iter().enumerate() {
            index.entry(self.key(record)).or_default().push(i);
        }
        index
    }

    fn norm(&self, field: &Option<String>) -> String {
        self.normalizer.normalize(field.as_deref().unwrap_or(""))
    }
}

/// Whether a change row carries exactly the values already on file.
///
/// Compares raw values, not normalized ones; sector and extra columns are
/// ignored.
pub fn same_reported_values(a: &SalaryRecord, b: &SalaryRecord) -> bool {
    a.first_name == b.first_name
        && a.last_name == b.last_name
        && a.employer == b.employer
        && a.job_title == b.job_title
        && a.calendar_year == b.calendar_year
        && a.salary_paid == b.salary_paid
        && a.taxable_benefits == b.taxable_benefits
}
