//! Export a tidy slice to CSV.
//!
//! One line per `(date, country)` with the slice's value columns and the
//! assigned color. Undefined values are written as empty cells.

use std::path::Path;

use crate::domain::TidySlice;
use crate::error::AppError;

/// Write `slice` to `path`, replacing any existing file.
pub fn write_slice_csv(path: &Path, slice: &TidySlice) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec!["date".to_string(), "country".to_string()];
    header.extend(slice.columns().iter().map(|c| c.name().to_string()));
    header.push("color".to_string());
    writer
        .write_record(&header)
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV header: {e}")))?;

    for row in slice.rows() {
        let mut record = vec![row.date.to_string(), row.country.clone()];
        record.extend(
            slice
                .columns()
                .iter()
                .map(|c| row.get(*c).map(|v| v.to_string()).unwrap_or_default()),
        );
        record.push(row.color.clone().unwrap_or_default());
        writer
            .write_record(&record)
            .map_err(|e| AppError::runtime(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush export CSV: {e}")))?;
    log::info!("exported {} rows to {}", slice.len(), path.display());
    Ok(())
}
