use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator};

use crate::error::ReconError;
use crate::model::RecordSet;

pub fn merged_file_name(year: i32) -> String {
    format!("merged_salary_{year}_uncleaned.csv")
}

pub fn report_file_name(year: i32) -> String {
    format!("merge_report_{year}.json")
}

/// Write `set` as CSV with every field quoted, columns in `set.columns` order.
pub fn write_csv<W: Write>(set: &RecordSet, writer: W) -> Result<(), ReconError> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(&set.columns)?;
    for record in &set.records {
        wtr.write_record(set.columns.iter().map(|c| record.cell(c)))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the merged CSV and its JSON report as one unit.
///
/// Both files are staged as `<name>.tmp` next to their targets and renamed
/// only once both are fully written. On failure the staged files are removed
/// and neither target is left half-written.
pub fn write_outputs_atomic(
    set: &RecordSet,
    csv_path: &Path,
    report_json: &str,
    report_path: &Path,
) -> Result<(), ReconError> {
    let csv_tmp = tmp_path(csv_path);
    let report_tmp = tmp_path(report_path);

    let result = std::fs::File::create(&csv_tmp)
        .map_err(ReconError::from)
        .and_then(|file| write_csv(set, std::io::BufWriter::new(file)))
        .and_then(|()| std::fs::write(&report_tmp, report_json).map_err(ReconError::from))
        .and_then(|()| std::fs::rename(&csv_tmp, csv_path).map_err(ReconError::from))
        .and_then(|()| {
            std::fs::rename(&report_tmp, report_path).map_err(|e| {
                let _ = std::fs::remove_file(csv_path);
                ReconError::from(e)
            })
        });

    if result.is_err() {
        let _ = std::fs::remove_file(&csv_tmp);
        let _ = std::fs::remove_file(&report_tmp);
    }
    result
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
