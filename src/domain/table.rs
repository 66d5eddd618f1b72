//! Wide per-country table: one row per date, one column per `(country, Metric)`.
//!
//! Undefined cells are `NaN`; that is what the store reads back from `NULL`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::domain::{ColumnKey, Metric};
use crate::error::AppError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<ColumnKey, Vec<f64>>,
}

impl CountryTable {
    /// An empty table over a fixed, ascending date index.
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates,
            columns: BTreeMap::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Insert (or replace) a column. Its length must match the date index.
    pub fn insert(&mut self, key: ColumnKey, values: Vec<f64>) -> Result<(), AppError> {
        if values.len() != self.dates.len() {
            return Err(AppError::data(format!(
                "Column '{key}' has {} values but the table has {} dates.",
                values.len(),
                self.dates.len()
            )));
        }
        self.columns.insert(key, values);
        Ok(())
    }

    pub fn column(&self, country: &str, metric: Metric) -> Option<&[f64]> {
        self.columns
            .get(&ColumnKey::new(country, metric))
            .map(Vec::as_slice)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&ColumnKey, &[f64])> {
        self.columns.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn has_country(&self, country: &str) -> bool {
        Metric::ALL
            .iter()
            .any(|&m| self.columns.contains_key(&ColumnKey::new(country, m)))
    }

    /// Every country with at least one column, in sorted order.
    pub fn countries(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self.columns.keys().map(|k| k.country.as_str()).collect();
        set.into_iter().collect()
    }

    /// Join two tables side by side on the date index.
    ///
    /// Dates missing from one side become `NaN` in that side's columns. Columns
    /// present on both sides take the right-hand values.
    pub fn join(self, other: CountryTable) -> CountryTable {
        if self.dates == other.dates {
            let mut columns = self.columns;
            columns.extend(other.columns);
            return CountryTable {
                dates: self.dates,
                columns,
            };
        }

        let dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .chain(other.dates.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut columns = BTreeMap::new();
        for side in [self, other] {
            let position: BTreeMap<NaiveDate, usize> =
                side.dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
            for (key, values) in side.columns {
                let aligned = dates
                    .iter()
                    .map(|d| position.get(d).map(|&i| values[i]).unwrap_or(f64::NAN))
                    .collect();
                columns.insert(key, aligned);
            }
        }

        CountryTable { dates, columns }
    }
}
