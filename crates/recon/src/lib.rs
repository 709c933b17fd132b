//! `paylist-recon` — salary list reconciliation engine.
//!
//! Deduplicates a year's base salary list, applies an addendum of additions,
//! changes and deletions to it, and checks the result. Loading and writing
//! CSV live here too so the CLI stays thin.

pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod export;
pub mod load;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod status;
pub mod validate;

pub use config::ReconConfig;
pub use dedup::dedupe;
pub use engine::{reconcile, Reconciler, Reconciliation};
pub use error::ReconError;
pub use matcher::MatchKeyBuilder;
pub use model::{
    GroupFields, MatchKey, Money, OperationReport, ReconcileMode, RecordSet, RunMeta,
    SalaryRecord, Violation,
};
pub use normalize::{Normalizer, TextNormalizer};
pub use validate::{validate, Validator};
