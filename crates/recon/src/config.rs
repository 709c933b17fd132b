use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{
    Operation, CALENDAR_YEAR, EMPLOYER, FIRST_NAME, JOB_TITLE, LAST_NAME, SALARY_PAID, SECTOR,
    STATUS, TAXABLE_BENEFITS,
};
use crate::normalize::TextNormalizer;
use crate::status::status_token;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Vocabulary tables used by the loader and the reconciler.
///
/// Every section is optional; omitted sections (and omitted fields within a
/// section) fall back to the built-in tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub status: StatusConfig,
    pub columns: ColumnConfig,
}

// ---------------------------------------------------------------------------
// Status vocabulary
// ---------------------------------------------------------------------------

/// Raw status strings accepted for each canonical operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    pub addition: Vec<String>,
    pub changed: Vec<String>,
    pub deletion: Vec<String>,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            addition: strings(&["addition", "added", "add"]),
            changed: strings(&[
                "changed",
                "change",
                "promotion",
                "position change",
                "salary change",
            ]),
            deletion: strings(&["deletion", "delete", "deleted"]),
        }
    }
}

impl StatusConfig {
    pub fn synonyms(&self, op: Operation) -> &[String] {
        match op {
            Operation::Addition => &self.addition,
            Operation::Changed => &self.changed,
            Operation::Deletion => &self.deletion,
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Source header spellings accepted for each canonical column. Matching is
/// case-insensitive and ignores surrounding whitespace and a leading BOM.
/// The canonical name itself always matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnConfig {
    pub sector: Vec<String>,
    pub first_name: Vec<String>,
    pub last_name: Vec<String>,
    pub employer: Vec<String>,
    pub job_title: Vec<String>,
    pub calendar_year: Vec<String>,
    pub salary_paid: Vec<String>,
    pub taxable_benefits: Vec<String>,
    pub status: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            sector: strings(&["sector name", "sectorname"]),
            first_name: strings(&["firstname", "first name", "given name"]),
            last_name: strings(&["lastname", "last name", "surname"]),
            employer: strings(&["organization", "organization name", "org", "employer_name"]),
            job_title: strings(&["jobtitle", "job title", "position", "position title"]),
            calendar_year: strings(&["year", "calendar year", "fiscal year", "fiscal_year"]),
            salary_paid: strings(&["salary", "salary paid", "salarypaid"]),
            taxable_benefits: strings(&["benefits", "taxable benefits", "taxablebenefits"]),
            status: strings(&["change status", "change type"]),
        }
    }
}

impl ColumnConfig {
    /// (canonical name, accepted spellings) for every mapped column.
    pub fn entries(&self) -> [(&'static str, &[String]); 9] {
        [
            (SECTOR, self.sector.as_slice()),
            (FIRST_NAME, self.first_name.as_slice()),
            (LAST_NAME, self.last_name.as_slice()),
            (EMPLOYER, self.employer.as_slice()),
            (JOB_TITLE, self.job_title.as_slice()),
            (CALENDAR_YEAR, self.calendar_year.as_slice()),
            (SALARY_PAID, self.salary_paid.as_slice()),
            (TAXABLE_BENEFITS, self.taxable_benefits.as_slice()),
            (STATUS, self.status.as_slice()),
        ]
    }

    /// Canonical name for a source header, if it is a known spelling.
    pub fn canonical_name(&self, header: &str) -> Option<&'static str> {
        let wanted = header_token(header);
        self.entries().into_iter().find_map(|(canonical, spellings)| {
            let hit = wanted == canonical || spellings.iter().any(|s| header_token(s) == wanted);
            hit.then_some(canonical)
        })
    }
}

pub(crate) fn header_token(header: &str) -> String {
    header.trim_start_matches('\u{FEFF}').trim().to_lowercase()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        // Each operation needs at least one spelling
        for op in Operation::ALL {
            let synonyms = self.status.synonyms(op);
            if synonyms.iter().all(|s| status_token(s, &TextNormalizer).is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "status.{op}: at least one synonym is required"
                )));
            }
        }

        // A status spelling may map to one operation only. Tokens are built
        // the way the vocabulary lookup builds them.
        let mut seen_status: HashMap<String, Operation> = HashMap::new();
        for op in Operation::ALL {
            for synonym in self.status.synonyms(op) {
                let token = status_token(synonym, &TextNormalizer);
                if let Some(prev) = seen_status.insert(token.clone(), op) {
                    if prev != op {
                        return Err(ReconError::ConfigValidation(format!(
                            "status synonym '{token}' maps to both '{prev}' and '{op}'"
                        )));
                    }
                }
            }
        }

        // A header spelling may map to one column only
        let mut seen_header: HashMap<String, &'static str> = HashMap::new();
        for (canonical, spellings) in self.columns.entries() {
            let tokens = std::iter::once(canonical.to_string())
                .chain(spellings.iter().map(|s| header_token(s)));
            for token in tokens {
                if let Some(prev) = seen_header.insert(token.clone(), canonical) {
                    if prev != canonical {
                        return Err(ReconError::ConfigValidation(format!(
                            "column spelling '{token}' maps to both '{prev}' and '{canonical}'"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
