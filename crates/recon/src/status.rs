use std::collections::HashMap;

use crate::config::StatusConfig;
use crate::model::Operation;
use crate::normalize::Normalizer;

/// Outcome of resolving an addendum row's free-text status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusResolution {
    Resolved(Operation),
    /// Raw value that matched no synonym (empty for a missing status).
    Unresolved(String),
}

/// Lookup from normalized status token to canonical operation.
#[derive(Debug, Clone)]
pub struct StatusVocabulary {
    lookup: HashMap<String, Operation>,
}

impl StatusVocabulary {
    pub fn from_config(config: &StatusConfig, normalizer: &dyn Normalizer) -> Self {
        let mut lookup = HashMap::new();
        for op in Operation::ALL {
            for synonym in config.synonyms(op) {
                lookup.insert(status_token(synonym, normalizer), op);
            }
        }
        Self { lookup }
    }

    /// Matching ignores case and surrounding or repeated whitespace.
    pub fn resolve(&self, raw: Option<&str>, normalizer: &dyn Normalizer) -> StatusResolution {
        let Some(raw) = raw else {
            return StatusResolution::Unresolved(String::new());
        };
        match self.lookup.get(&status_token(raw, normalizer)) {
            Some(op) => StatusResolution::Resolved(*op),
            None => StatusResolution::Unresolved(raw.to_string()),
        }
    }
}

pub(crate) fn status_token(raw: &str, normalizer: &dyn Normalizer) -> String {
    normalizer.normalize(raw).trim().to_lowercase()
}
