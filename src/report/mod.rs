//! Case-fatality statistics over a tidy slice, plus terminal formatting.

use chrono::NaiveDate;

use crate::domain::{TidyColumn, TidySlice};

pub mod format;

pub use format::*;

/// Time range a fatality report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Full,
    Between(NaiveDate, NaiveDate),
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Full => write!(f, "full time period"),
            Period::Between(from, to) => write!(f, "between {from} - {to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FatalityEntry {
    pub country: String,
    /// Percentage rounded to one decimal; `None` when the period has no cases.
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FatalityReport {
    pub period: Period,
    pub entries: Vec<FatalityEntry>,
}

/// Per-country case-fatality ratio: `100 * sum(daily deaths) / sum(daily cases)`.
///
/// `rows` restricts the computation to a brush selection of slice rows; the
/// period is then labelled by the earliest and latest selected date. An empty
/// or entirely out-of-range selection means the full slice.
pub fn fatality(slice: &TidySlice, rows: Option<&[usize]>) -> FatalityReport {
    let picked: Vec<usize> = rows
        .map(|idx| idx.iter().copied().filter(|&i| i < slice.len()).collect())
        .unwrap_or_default();

    let (period, selected): (Period, Vec<usize>) = if picked.is_empty() {
        (Period::Full, (0..slice.len()).collect())
    } else {
        let dates = picked.iter().map(|&i| slice.rows()[i].date);
        let from = dates.clone().min();
        let to = dates.max();
        match (from, to) {
            (Some(from), Some(to)) => (Period::Between(from, to), picked),
            _ => (Period::Full, (0..slice.len()).collect()),
        }
    };

    let mut entries: Vec<(String, f64, f64)> = Vec::new();
    for &i in &selected {
        let row = &slice.rows()[i];
        let cases = row.get(TidyColumn::ValueDaily).unwrap_or(0.0);
        let deaths = row.get(TidyColumn::ValueDailyDead).unwrap_or(0.0);
        match entries.iter_mut().find(|(c, _, _)| *c == row.country) {
            Some(entry) => {
                entry.1 += cases;
                entry.2 += deaths;
            }
            None => entries.push((row.country.clone(), cases, deaths)),
        }
    }

    let entries = entries
        .into_iter()
        .map(|(country, cases, deaths)| FatalityEntry {
            country,
            ratio: ratio_percent(deaths, cases),
        })
        .collect();

    FatalityReport { period, entries }
}

/// One decimal, rounded on the exact binary value with ties to even
/// (`2.25 -> 2.2`, `0.75 -> 0.8`, `0.15 -> 0.1`).
fn ratio_percent(deaths: f64, cases: f64) -> Option<f64> {
    if cases == 0.0 {
        return None;
    }
    let pct = deaths * 100.0 / cases;
    if !pct.is_finite() {
        return None;
    }
    format!("{pct:.1}").parse().ok()
}
