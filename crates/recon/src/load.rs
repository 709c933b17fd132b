use std::collections::BTreeMap;
use std::path::Path;

use crate::config::ColumnConfig;
use crate::error::ReconError;
use crate::model::{
    Money, RecordSet, SalaryRecord, CALENDAR_YEAR, EMPLOYER, FIRST_NAME, JOB_TITLE, LAST_NAME,
    SALARY_PAID, SECTOR, STATUS, TAXABLE_BENEFITS,
};

/// Read a file as UTF-8, stripping a BOM. Bytes that are not valid UTF-8 are
/// decoded as Windows-1252 (common for spreadsheet exports).
pub fn read_to_utf8(path: &Path) -> Result<String, ReconError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

pub fn load_csv_file(
    role: &str,
    path: &Path,
    columns: &ColumnConfig,
) -> Result<RecordSet, ReconError> {
    let text = read_to_utf8(path)?;
    let set = load_csv_str(role, &text, columns)?;
    log::info!("{role}: loaded {} rows from {}", set.len(), path.display());
    Ok(set)
}

/// Parse CSV text into a [`RecordSet`].
///
/// Headers are mapped to canonical names through `columns`; anything else is
/// kept verbatim as an extra column. Empty cells become missing values.
/// Required columns are not checked here.
pub fn load_csv_str(
    role: &str,
    csv_data: &str,
    columns: &ColumnConfig,
) -> Result<RecordSet, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers = reader.headers()?.clone();
    let mut names: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers.iter() {
        let name = match columns.canonical_name(header) {
            Some(canonical) if names.iter().any(|n| n == canonical) => {
                log::warn!("{role}: column '{header}' duplicates '{canonical}', kept as extra");
                header.to_string()
            }
            Some(canonical) => canonical.to_string(),
            None => {
                log::debug!("{role}: unmapped column '{header}' kept as extra");
                header.trim_start_matches('\u{FEFF}').to_string()
            }
        };
        names.push(name);
    }

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        // Header is line 1
        let line = i + 2;
        let mut record = SalaryRecord::default();
        for (name, value) in names.iter().zip(row.iter()) {
            set_field(&mut record, name, value, role, line)?;
        }
        records.push(record);
    }

    Ok(RecordSet::new(names, records))
}

fn set_field(
    record: &mut SalaryRecord,
    name: &str,
    value: &str,
    role: &str,
    line: usize,
) -> Result<(), ReconError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    let text = Some(value.to_string());
    match name {
        SECTOR => record.sector = text,
        FIRST_NAME => record.first_name = text,
        LAST_NAME => record.last_name = text,
        EMPLOYER => record.employer = text,
        JOB_TITLE => record.job_title = text,
        STATUS => record.status = text,
        SALARY_PAID => record.salary_paid = Money::parse(value),
        TAXABLE_BENEFITS => record.taxable_benefits = Money::parse(value),
        CALENDAR_YEAR => {
            record.calendar_year = Some(parse_year(value).ok_or_else(|| ReconError::YearParse {
                role: role.to_string(),
                row: line,
                value: value.to_string(),
            })?)
        }
        other => {
            record.extra.insert(other.to_string(), value.to_string());
        }
    }
    Ok(())
}

/// Integer years, also in the `2023.0` form spreadsheet tools emit.
fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(year) = raw.parse::<i32>() {
        return Some(year);
    }
    let float: f64 = raw.parse().ok()?;
    let in_range = float.fract() == 0.0 && float.abs() <= i32::MAX as f64;
    in_range.then_some(float as i32)
}

/// Most frequent `calendar_year` in `set`; ties go to the earliest year.
pub fn modal_year(set: &RecordSet) -> Result<i32, ReconError> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for year in set.records.iter().filter_map(|r| r.calendar_year) {
        *counts.entry(year).or_insert(0) += 1;
    }

    let mut best: Option<(i32, usize)> = None;
    for (year, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((year, count));
        }
    }
    best.map(|(year, _)| year)
        .ok_or_else(|| ReconError::NoCalendarYear("merged set".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "\
Sector,Last Name,First Name,Salary Paid,Taxable Benefits,Employer,Job Title,Calendar Year,Notes
Schools,Doe,Jane,\"$52,000.00\",$100.50,Board,Teacher,2023,
Schools,Roe,John,50000,0,Board,Principal,2023,transferred
";

    #[test]
    fn maps_headers_and_parses_values() {
        let set = load_csv_str("base", BASE, &ColumnConfig::default()).unwrap();
        assert_eq!(
            set.columns,
            [
                SECTOR,
                LAST_NAME,
                FIRST_NAME,
                SALARY_PAID,
                TAXABLE_BENEFITS,
                EMPLOYER,
                JOB_TITLE,
                CALENDAR_YEAR,
                "Notes"
            ]
        );
        assert_eq!(set.len(), 2);
        let jane = &set.records[0];
        assert_eq!(jane.first_name.as_deref(), Some("Jane"));
        assert_eq!(jane.salary_paid, Some(Money::Cents(5_200_000)));
        assert_eq!(jane.taxable_benefits, Some(Money::Cents(10_050)));
        assert_eq!(jane.calendar_year, Some(2023));
        assert!(jane.extra.is_empty());
        assert_eq!(set.records[1].extra.get("Notes").map(String::as_str), Some("transferred"));
    }

    #[test]
    fn empty_cells_are_missing() {
        let csv = "sector,first_name,last_name,employer,job_title,calendar_year,salary_paid,taxable_benefits,status\n\
                   ,Jane,Doe,Board,, ,1,,Added\n";
        let set = load_csv_str("addendum", csv, &ColumnConfig::default()).unwrap();
        let r = &set.records[0];
        assert_eq!(r.sector, None);
        assert_eq!(r.job_title, None);
        assert_eq!(r.calendar_year, None);
        assert_eq!(r.taxable_benefits, None);
        assert_eq!(r.status.as_deref(), Some("Added"));
    }

    #[test]
    fn short_rows_leave_trailing_fields_missing() {
        let csv = "first_name,last_name,calendar_year\nJane\n";
        let set = load_csv_str("base", csv, &ColumnConfig::default()).unwrap();
        assert_eq!(set.records[0].first_name.as_deref(), Some("Jane"));
        assert_eq!(set.records[0].last_name, None);
    }

    #[test]
    fn bad_year_reports_line() {
        let csv = "first_name,calendar_year\nJane,2023\nJohn,twenty\n";
        let err = load_csv_str("base", csv, &ColumnConfig::default()).unwrap_err();
        match err {
            ReconError::YearParse { row, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(value, "twenty");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn float_years_accepted() {
        assert_eq!(parse_year("2023.0"), Some(2023));
        assert_eq!(parse_year(" 2023 "), Some(2023));
        assert_eq!(parse_year("2023.5"), None);
    }

    #[test]
    fn duplicate_mapped_header_kept_as_extra() {
        let csv = "employer,organization\nBoard,Board of Ed\n";
        let set = load_csv_str("base", csv, &ColumnConfig::default()).unwrap();
        assert_eq!(set.columns, [EMPLOYER, "organization"]);
        assert_eq!(set.records[0].employer.as_deref(), Some("Board"));
        assert_eq!(
            set.records[0].extra.get("organization").map(String::as_str),
            Some("Board of Ed")
        );
    }

    #[test]
    fn windows_1252_fallback_and_bom() {
        let dir = tempfile::tempdir().unwrap();

        let latin = dir.path().join("latin.csv");
        // "Ren\xe9" is not valid UTF-8
        std::fs::write(&latin, b"first_name\nRen\xe9\n").unwrap();
        let set = load_csv_file("base", &latin, &ColumnConfig::default()).unwrap();
        assert_eq!(set.records[0].first_name.as_deref(), Some("René"));

        let bom = dir.path().join("bom.csv");
        std::fs::write(&bom, "\u{FEFF}first_name\nJane\n").unwrap();
        let set = load_csv_file("base", &bom, &ColumnConfig::default()).unwrap();
        assert_eq!(set.columns, [FIRST_NAME]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_csv_file("base", Path::new("/nonexistent/x.csv"), &ColumnConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }

    #[test]
    fn modal_year_prefers_most_frequent_then_earliest() {
        let year = |y| SalaryRecord {
            calendar_year: y,
            ..Default::default()
        };
        let set = RecordSet::canonical(vec![year(Some(2023)), year(Some(2022)), year(Some(2023)), year(None)]);
        assert_eq!(modal_year(&set).unwrap(), 2023);

        let tie = RecordSet::canonical(vec![year(Some(2024)), year(Some(2022))]);
        assert_eq!(modal_year(&tie).unwrap(), 2022);

        let none = RecordSet::canonical(vec![year(None)]);
        assert!(matches!(modal_year(&none), Err(ReconError::NoCalendarYear(_))));
    }
}
