use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (duplicate synonym, empty vocabulary, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Required column absent from an input after header mapping.
    #[error("{role}: missing required column '{column}'")]
    MissingColumn { role: String, column: String },
    /// `calendar_year` cell that is not an integer.
    #[error("{role}, row {row}: cannot parse calendar year '{value}'")]
    YearParse { role: String, row: usize, value: String },
    /// No record carries a calendar year, so the output cannot be named.
    #[error("no calendar_year values present in {0}")]
    NoCalendarYear(String),
    /// Malformed CSV.
    #[error("CSV error: {0}")]
    Csv(String),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
