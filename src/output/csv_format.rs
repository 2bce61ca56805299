//! CSV output formatting.

use crate::scanner::ScanReport;
use std::io::{self, Write};

/// Write one record per probed port.
pub fn write_csv<W: Write>(out: &mut W, report: &ScanReport) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["port", "status", "error"])?;

    for result in &report.results {
        let error = result.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
        wtr.write_record([
            result.port.to_string(),
            result.verdict.to_string(),
            error,
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
