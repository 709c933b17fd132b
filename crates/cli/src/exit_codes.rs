//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — batch jobs rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3-9     | merge            | Input, config and output failures        |
//! | 10-19   | validate         | Post-merge check outcomes                |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `recon_exit_code` if it comes from an engine error

use paylist_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Merge (3-9)
// =============================================================================

/// Cannot read an input or write an output.
pub const EXIT_IO: u8 = 3;

/// Input is missing a required column, or a cell cannot be parsed.
pub const EXIT_SCHEMA: u8 = 4;

/// Config file does not parse or fails validation.
pub const EXIT_CONFIG: u8 = 5;

/// Merged set carries no calendar year, so the output cannot be named.
pub const EXIT_NO_YEAR: u8 = 6;

// =============================================================================
// Validate (10-19)
// =============================================================================

/// Merged output was written but failed post-merge validation.
pub const EXIT_VALIDATION_FAILED: u8 = 10;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::MissingColumn { .. } | ReconError::YearParse { .. } | ReconError::Csv(_) => {
            EXIT_SCHEMA
        }
        ReconError::NoCalendarYear(_) => EXIT_NO_YEAR,
        ReconError::Io(_) => EXIT_IO,
    }
}
