use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Canonical field names
// ---------------------------------------------------------------------------

pub const SECTOR: &str = "sector";
pub const FIRST_NAME: &str = "first_name";
pub const LAST_NAME: &str = "last_name";
pub const EMPLOYER: &str = "employer";
pub const JOB_TITLE: &str = "job_title";
pub const CALENDAR_YEAR: &str = "calendar_year";
pub const SALARY_PAID: &str = "salary_paid";
pub const TAXABLE_BENEFITS: &str = "taxable_benefits";
pub const STATUS: &str = "status";

/// Columns every base and addendum set must carry after header mapping.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    SECTOR,
    FIRST_NAME,
    LAST_NAME,
    EMPLOYER,
    JOB_TITLE,
    CALENDAR_YEAR,
    SALARY_PAID,
    TAXABLE_BENEFITS,
];

/// Addendum rows missing any of these are dropped before partitioning.
pub const INCOMPLETE_CHECK_COLUMNS: [&str; 7] = [
    SECTOR,
    FIRST_NAME,
    LAST_NAME,
    EMPLOYER,
    JOB_TITLE,
    SALARY_PAID,
    TAXABLE_BENEFITS,
];

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// A salary or benefits cell.
///
/// Parsed amounts are held in integer cents. Cells that do not parse, or that
/// fall outside [`Money::MAX_ABS_CENTS`], keep their raw text so they survive
/// a round trip, and count as zero wherever compensation is summed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Money {
    Cents(i64),
    Unparsed(String),
}

impl Money {
    /// Largest magnitude held as cents (one quadrillion dollars). Sums of a
    /// handful of in-range amounts stay far from `i64` overflow.
    pub const MAX_ABS_CENTS: i64 = 100_000_000_000_000_000;

    /// Parse a money cell. `$` and `,` are ignored; the value is rounded to
    /// cents. Returns `None` for an empty cell.
    pub fn parse(raw: &str) -> Option<Money> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let cleaned: String = trimmed.chars().filter(|c| *c != '$' && *c != ',').collect();
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() && (v * 100.0).abs() <= Self::MAX_ABS_CENTS as f64 => {
                Some(Money::Cents((v * 100.0).round() as i64))
            }
            _ => Some(Money::Unparsed(trimmed.to_string())),
        }
    }

    pub fn cents_or_zero(&self) -> i64 {
        match self {
            Money::Cents(c) => *c,
            Money::Unparsed(_) => 0,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Money::Cents(c) => {
                let sign = if *c < 0 { "-" } else { "" };
                let abs = c.unsigned_abs();
                write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
            }
            Money::Unparsed(raw) => write!(f, "{raw}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One salary row, mapped to canonical field names.
///
/// An empty source cell is `None`. Columns outside the canonical schema are
/// carried in `extra` so the merged output keeps the source's full width.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SalaryRecord {
    pub sector: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub employer: Option<String>,
    pub job_title: Option<String>,
    pub calendar_year: Option<i32>,
    pub salary_paid: Option<Money>,
    pub taxable_benefits: Option<Money>,
    pub status: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl SalaryRecord {
    /// `salary_paid + taxable_benefits`, with missing or unparseable values as 0.
    pub fn total_compensation_cents(&self) -> i64 {
        let salary = self.salary_paid.as_ref().map_or(0, Money::cents_or_zero);
        let benefits = self.taxable_benefits.as_ref().map_or(0, Money::cents_or_zero);
        salary.saturating_add(benefits)
    }

    /// Whether the named column holds a value. Unknown names look in `extra`.
    pub fn has_value(&self, column: &str) -> bool {
        match column {
            SECTOR => self.sector.is_some(),
            FIRST_NAME => self.first_name.is_some(),
            LAST_NAME => self.last_name.is_some(),
            EMPLOYER => self.employer.is_some(),
            JOB_TITLE => self.job_title.is_some(),
            CALENDAR_YEAR => self.calendar_year.is_some(),
            SALARY_PAID => self.salary_paid.is_some(),
            TAXABLE_BENEFITS => self.taxable_benefits.is_some(),
            STATUS => self.status.is_some(),
            other => self.extra.get(other).is_some_and(|v| !v.is_empty()),
        }
    }

    /// First column of `columns` with no value, if any.
    pub fn first_missing(&self, columns: &[&'static str]) -> Option<&'static str> {
        columns.iter().copied().find(|c| !self.has_value(c))
    }

    /// Cell text for output. Missing values render as the empty string.
    pub fn cell(&self, column: &str) -> String {
        match column {
            SECTOR => self.sector.clone().unwrap_or_default(),
            FIRST_NAME => self.first_name.clone().unwrap_or_default(),
            LAST_NAME => self.last_name.clone().unwrap_or_default(),
            EMPLOYER => self.employer.clone().unwrap_or_default(),
            JOB_TITLE => self.job_title.clone().unwrap_or_default(),
            CALENDAR_YEAR => self.calendar_year.map(|y| y.to_string()).unwrap_or_default(),
            SALARY_PAID => self.salary_paid.as_ref().map(Money::to_string).unwrap_or_default(),
            TAXABLE_BENEFITS => self
                .taxable_benefits
                .as_ref()
                .map(Money::to_string)
                .unwrap_or_default(),
            STATUS => self.status.clone().unwrap_or_default(),
            other => self.extra.get(other).cloned().unwrap_or_default(),
        }
    }
}

/// An ordered record sequence plus the columns its source carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub records: Vec<SalaryRecord>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, records: Vec<SalaryRecord>) -> Self {
        Self { columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail with `MissingColumn` on the first absent column.
    pub fn require_columns(&self, role: &str, columns: &[&str]) -> Result<(), ReconError> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(column) => Err(ReconError::MissingColumn {
                role: role.into(),
                column: (*column).into(),
            }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Normalized identity of a person/job in a given year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchKey {
    pub first_name: String,
    pub last_name: String,
    pub employer: String,
    pub job_title: String,
    pub calendar_year: Option<i32>,
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = self.calendar_year.map(|y| y.to_string()).unwrap_or_else(|| "?".into());
        write!(
            f,
            "{} {} / {} / {} / {year}",
            self.first_name, self.last_name, self.employer, self.job_title
        )
    }
}

/// Deduplication grouping key: the match key, optionally with the sector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub sector: Option<String>,
    pub key: MatchKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFields {
    /// Match key only.
    Identity,
    /// Match key plus normalized sector.
    IdentityAndSector,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Addition,
    Changed,
    Deletion,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Operation::Addition, Operation::Changed, Operation::Deletion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Changed => "changed",
            Operation::Deletion => "deletion",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    pub exact_duplicates_removed: usize,
    /// Number of identity groups that held more than one record.
    pub non_exact_duplicates_resolved: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    #[default]
    Applied,
    NoAddendum,
    EmptyAddendum,
    NoStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReport {
    pub mode: ReconcileMode,
    pub base_dedup: DedupStats,
    pub addendum_dedup: DedupStats,
    pub final_dedup: DedupStats,
    pub rows_dropped_incomplete: usize,
    pub unresolved_statuses: usize,
    pub unresolved_status_values: Vec<String>,
    pub additions_requested: usize,
    pub deletions_requested: usize,
    pub changes_requested: usize,
    pub changes_skipped: usize,
    pub changes_applied: usize,
    pub additions_applied: usize,
    /// Base rows removed by deletion operations.
    pub deletions_applied: usize,
    pub final_rows_removed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

impl RunMeta {
    pub fn now() -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// A deleted identity is still present in the merged set.
    DeletionSurvived { key: MatchKey, remaining: usize },
    /// An addition never made it into the merged set.
    AdditionMissing { key: MatchKey },
    /// Applied changes found in the merged set disagree with the report.
    ChangeCountMismatch { reported: usize, found: usize },
    /// The merged set holds more than one record for an identity.
    DuplicateKey { key: MatchKey, count: usize },
}

impl Violation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Violation::DeletionSurvived { .. } => "deletion_survived",
            Violation::AdditionMissing { .. } => "addition_missing",
            Violation::ChangeCountMismatch { .. } => "change_count_mismatch",
            Violation::DuplicateKey { .. } => "duplicate_key",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DeletionSurvived { key, remaining } => {
                write!(f, "deleted record still present ({remaining} row(s)): {key}")
            }
            Violation::AdditionMissing { key } => write!(f, "added record missing: {key}"),
            Violation::ChangeCountMismatch { reported, found } => write!(
                f,
                "report says {reported} change(s) applied, {found} found in merged set"
            ),
            Violation::DuplicateKey { key, count } => {
                write!(f, "{count} records share identity: {key}")
            }
        }
    }
}

#[cfg(test)]
impl Money {
    pub(crate) fn from_dollars(dollars: i64) -> Money {
        Money::Cents(dollars * 100)
    }
}

#[cfg(test)]
impl RecordSet {
    /// A set with the canonical columns (no `status`, no extras).
    pub(crate) fn canonical(records: Vec<SalaryRecord>) -> Self {
        Self::new(REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(), records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_parse_strips_symbols() {
        assert_eq!(Money::parse("$1,234.56"), Some(Money::Cents(123_456)));
        assert_eq!(Money::parse("52000"), Some(Money::Cents(5_200_000)));
        assert_eq!(Money::parse("52000.0"), Money::parse("52,000.00"));
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("   "), None);
        assert_eq!(Money::parse("n/a"), Some(Money::Unparsed("n/a".into())));
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::Cents(5_200_000).to_string(), "52000.00");
        assert_eq!(Money::Cents(105).to_string(), "1.05");
        assert_eq!(Money::Cents(-105).to_string(), "-1.05");
        assert_eq!(Money::Unparsed("n/a".into()).to_string(), "n/a");
    }

    #[test]
    fn compensation_treats_missing_and_unparsed_as_zero() {
        let r = SalaryRecord {
            salary_paid: Some(Money::from_dollars(100_000)),
            taxable_benefits: Some(Money::Unparsed("tbd".into())),
            ..Default::default()
        };
        assert_eq!(r.total_compensation_cents(), 10_000_000);
        assert_eq!(SalaryRecord::default().total_compensation_cents(), 0);
    }

    #[test]
    fn out_of_range_amount_stays_raw() {
        assert_eq!(Money::parse("1e30"), Some(Money::Unparsed("1e30".into())));
        assert_eq!(Money::parse("-1e30"), Some(Money::Unparsed("-1e30".into())));
        assert_eq!(Money::parse("1e30").unwrap().to_string(), "1e30");
        assert_eq!(
            Money::parse("1000000000000000"),
            Some(Money::Cents(Money::MAX_ABS_CENTS))
        );
    }

    #[test]
    fn compensation_saturates_instead_of_overflowing() {
        let r = SalaryRecord {
            salary_paid: Some(Money::Cents(i64::MAX)),
            taxable_benefits: Some(Money::Cents(1)),
            ..Default::default()
        };
        assert_eq!(r.total_compensation_cents(), i64::MAX);
    }

    #[test]
    fn first_missing_reports_in_column_order() {
        let r = SalaryRecord {
            sector: Some("Schools".into()),
            first_name: Some("Jane".into()),
            ..Default::default()
        };
        assert_eq!(r.first_missing(&INCOMPLETE_CHECK_COLUMNS), Some(LAST_NAME));
    }

    #[test]
    fn violation_json_is_tagged_by_kind() {
        let v = Violation::ChangeCountMismatch {
            reported: 2,
            found: 1,
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["kind"], "change_count_mismatch");
        assert_eq!(json["found"], 1);
        assert_eq!(json["kind"], v.as_str());

        let report = OperationReport {
            mode: ReconcileMode::NoStatus,
            ..Default::default()
        };
        let text = serde_json::to_string(&report).unwrap();
        assert!(text.contains("\"mode\":\"no_status\""), "{text}");
        assert_eq!(serde_json::from_str::<OperationReport>(&text).unwrap(), report);
    }

    #[test]
    fn require_columns_names_the_gap() {
        let set = RecordSet::new(vec![FIRST_NAME.into()], vec![]);
        let err = set.require_columns("base", &[FIRST_NAME, SECTOR]).unwrap_err();
        assert_eq!(err.to_string(), "base: missing required column 'sector'");
    }
}
