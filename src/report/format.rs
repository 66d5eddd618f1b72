//! Terminal formatting for tidy slices and fatality reports.
//!
//! Formatting lives here so the reshaping and statistics code stays free of
//! presentation details.

use crate::domain::{Mode, TidyColumn, TidySlice};
use crate::report::FatalityReport;

/// Countries per line in the fatality block.
const FATALITY_COLUMNS: usize = 3;
const FATALITY_CELL_WIDTH: usize = 30;

/// Fatality block: a header line, then countries three per line.
pub fn format_fatality(report: &FatalityReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Fatality: {}\n", report.period));

    for (i, entry) in report.entries.iter().enumerate() {
        let ratio = entry
            .ratio
            .map(|r| format!("{r:.1}%"))
            .unwrap_or_else(|| "n/a".to_string());
        let cell = format!("{}: {ratio}", truncate(&entry.country, FATALITY_CELL_WIDTH - 8));

        let end_of_line = (i + 1) % FATALITY_COLUMNS == 0 || i + 1 == report.entries.len();
        if end_of_line {
            out.push_str(&cell);
            out.push('\n');
        } else {
            out.push_str(&format!("{cell:<width$}", width = FATALITY_CELL_WIDTH));
        }
    }

    out
}

/// Header describing the slice: mode, countries, date range, row count.
pub fn format_slice_summary(slice: &TidySlice, mode: Mode) -> String {
    let first = slice.rows().iter().map(|r| r.date).min();
    let last = slice.rows().iter().map(|r| r.date).max();

    let mut out = String::new();
    out.push_str("=== covid - country dashboard ===\n");
    out.push_str(&format!("Mode: {}\n", mode.display_name()));
    out.push_str(&format!("Countries: {}\n", slice.countries().join(", ")));
    match (first, last) {
        (Some(first), Some(last)) => out.push_str(&format!("Dates: {first} .. {last}\n")),
        _ => out.push_str("Dates: (none)\n"),
    }
    out.push_str(&format!("Rows: {}\n", slice.len()));
    out
}

/// The last `tail` rows per country as a fixed-width table.
pub fn format_slice_table(slice: &TidySlice, tail: usize, mode: Mode) -> String {
    let mut out = String::new();

    let mut header = format!("{:<10} {:<20}", "date", "country");
    let mut rule = format!("{:-<10} {:-<20}", "", "");
    for col in slice.columns() {
        header.push_str(&format!(" {:>22}", col.name()));
        rule.push_str(&format!(" {:-<22}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for country in slice.countries() {
        let rows: Vec<_> = slice.rows().iter().filter(|r| r.country == country).collect();
        let skip = rows.len().saturating_sub(tail);
        for row in rows.into_iter().skip(skip) {
            let mut line = format!("{:<10} {:<20}", row.date, truncate(&row.country, 20));
            for col in slice.columns() {
                line.push_str(&format!(" {:>22}", fmt_value(row.get(*col), *col, mode)));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    out
}

fn fmt_value(v: Option<f64>, col: TidyColumn, mode: Mode) -> String {
    let Some(v) = v else {
        return "-".to_string();
    };
    match (mode, col) {
        (Mode::Absolute, TidyColumn::ValueDailyRoll | TidyColumn::ValueDailyDeadRoll) => format!("{v:.1}"),
        (Mode::Absolute, _) => format!("{v:.0}"),
        (Mode::Normalized, _) => format!("{v:.8}"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FatalityEntry, Period};
    use chrono::NaiveDate;

    fn entry(country: &str, ratio: Option<f64>) -> FatalityEntry {
        FatalityEntry {
            country: country.to_string(),
            ratio,
        }
    }

    #[test]
    fn fatality_wraps_three_per_line() {
        let report = FatalityReport {
            period: Period::Full,
            entries: vec![
                entry("World", Some(2.1)),
                entry("US", Some(1.8)),
                entry("Italy", Some(3.0)),
                entry("India", None),
            ],
        };
        let text = format_fatality(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Fatality: full time period");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("World: 2.1%"));
        assert!(lines[1].contains("US: 1.8%"));
        assert!(lines[1].ends_with("Italy: 3.0%"));
        assert_eq!(lines[2], "India: n/a");
    }

    #[test]
    fn period_label_uses_dates() {
        let from = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2020, 3, 9).unwrap();
        let report = FatalityReport {
            period: Period::Between(from, to),
            entries: vec![],
        };
        assert_eq!(format_fatality(&report), "Fatality: between 2020-03-01 - 2020-03-09\n");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Saint Vincent and the Grenadines", 10), "Saint Vin.");
        assert_eq!(truncate("Peru", 10), "Peru");
    }
}
