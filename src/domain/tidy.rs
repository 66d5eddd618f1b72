//! Long-form ("tidy") slice: one row per `(date, country)`.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Numeric columns of a tidy slice, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TidyColumn {
    Value,
    ValueDaily,
    ValueDead,
    ValueDailyDead,
    ValueDailyRoll,
    ValueDailyDeadRoll,
}

impl TidyColumn {
    pub const ALL: [TidyColumn; 6] = [
        TidyColumn::Value,
        TidyColumn::ValueDaily,
        TidyColumn::ValueDead,
        TidyColumn::ValueDailyDead,
        TidyColumn::ValueDailyRoll,
        TidyColumn::ValueDailyDeadRoll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TidyColumn::Value => "value",
            TidyColumn::ValueDaily => "value_daily",
            TidyColumn::ValueDead => "value_dead",
            TidyColumn::ValueDailyDead => "value_daily_dead",
            TidyColumn::ValueDailyRoll => "value_daily_roll",
            TidyColumn::ValueDailyDeadRoll => "value_daily_dead_roll",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TidyRow {
    pub date: NaiveDate,
    pub country: String,
    values: [Option<f64>; 6],
    pub color: Option<String>,
}

impl TidyRow {
    pub fn new(date: NaiveDate, country: impl Into<String>) -> Self {
        Self {
            date,
            country: country.into(),
            values: [None; 6],
            color: None,
        }
    }

    pub fn get(&self, column: TidyColumn) -> Option<f64> {
        self.values[column.index()]
    }

    pub fn set(&mut self, column: TidyColumn, value: Option<f64>) {
        self.values[column.index()] = value;
    }

    pub fn with(mut self, column: TidyColumn, value: Option<f64>) -> Self {
        self.set(column, value);
        self
    }
}

/// A reshaped selection, ready for plotting.
///
/// `columns` lists the numeric columns that survived the all-undefined drop;
/// cells of a dropped column always read as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TidySlice {
    rows: Vec<TidyRow>,
    columns: Vec<TidyColumn>,
}

impl TidySlice {
    pub fn new(rows: Vec<TidyRow>, columns: Vec<TidyColumn>) -> Self {
        Self { rows, columns }
    }

    pub fn rows(&self) -> &[TidyRow] {
        &self.rows
    }

    pub fn columns(&self) -> &[TidyColumn] {
        &self.columns
    }

    pub fn has_column(&self, column: TidyColumn) -> bool {
        self.columns.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Countries in first-appearance order.
    pub fn countries(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.country.as_str()) {
                out.push(row.country.as_str());
            }
        }
        out
    }

    /// Country -> color as currently attached to the rows.
    pub fn colors(&self) -> BTreeMap<String, String> {
        self.rows
            .iter()
            .filter_map(|r| r.color.as_ref().map(|c| (r.country.clone(), c.clone())))
            .collect()
    }

    /// Row indices whose date lies within `[from, to]` (inclusive).
    pub fn indices_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.date >= from && r.date <= to)
            .map(|(i, _)| i)
            .collect()
    }
}
