//! Shared workflows used by the CLI commands and the interactive console.
//!
//! Ingestion: feed fetch -> parse + reshape -> full table replace.
//! Viewing: store load -> selection -> colors -> reshape -> fatality.
//!
//! Each step that touches the network or the store has a `_with_*` variant
//! taking the already-fetched input, so the core path runs offline in tests.

use std::path::Path;

use chrono::NaiveDate;

use crate::dashboard::assign_colors;
use crate::data::{FeedClient, FeedSnapshot, FeedUrls, PopulationReference};
use crate::domain::{CountryTable, Selection, TidySlice};
use crate::error::AppError;
use crate::io::ingest::build_country_table;
use crate::report::{FatalityReport, fatality};
use crate::reshape::{ColorMap, reshape};
use crate::store::{Store, StoreConfig};

/// What one ingestion run wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutput {
    pub rows: usize,
    pub columns: usize,
    pub countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Fetch both feeds and rebuild the store table.
pub fn run_ingest(urls: &FeedUrls, config: &StoreConfig) -> Result<IngestOutput, AppError> {
    let snapshot = FeedClient::new().fetch_snapshot(urls)?;
    let store = Store::open(config)?;
    run_ingest_with_snapshot(&snapshot, &store)
}

/// Rebuild the store table from already-downloaded feeds.
pub fn run_ingest_with_snapshot(snapshot: &FeedSnapshot, store: &Store) -> Result<IngestOutput, AppError> {
    let table = build_country_table(&snapshot.confirmed_csv, &snapshot.deaths_csv)?;
    let rows = store.replace_table(&table)?;

    Ok(IngestOutput {
        rows,
        columns: table.column_count(),
        countries: table.countries().len(),
        first_date: table.dates().first().copied(),
        last_date: table.dates().last().copied(),
    })
}

/// Stored table plus the population reference: everything a view needs.
pub struct ViewInputs {
    pub table: CountryTable,
    pub population: PopulationReference,
}

pub fn load_view_inputs(config: &StoreConfig, population_path: &Path) -> Result<ViewInputs, AppError> {
    let store = Store::open(config)?;
    let table = store.load_table()?;
    let population = PopulationReference::load(population_path)?;
    Ok(ViewInputs { table, population })
}

/// One reshaped selection with its fatality report.
#[derive(Debug, Clone)]
pub struct ViewOutput {
    pub colors: ColorMap,
    pub slice: TidySlice,
    pub report: FatalityReport,
}

/// Reshape `selection` and compute fatality, optionally over a date range.
pub fn run_view(
    inputs: &ViewInputs,
    selection: &Selection,
    range: Option<(NaiveDate, NaiveDate)>,
) -> Result<ViewOutput, AppError> {
    let colors = assign_colors(&ColorMap::new(), selection.countries())?;
    let slice = reshape(&inputs.table, selection, &colors, &inputs.population)?;
    let brush = range.map(|(from, to)| slice.indices_between(from, to));
    let report = fatality(&slice, brush.as_deref());

    Ok(ViewOutput { colors, slice, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metric, Mode, NO_SELECTION, TidyColumn, WORLD};
    use crate::report::Period;
    use crate::store::DEFAULT_TABLE;

    fn snapshot() -> FeedSnapshot {
        FeedSnapshot {
            confirmed_csv: "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20
,Italy,0,0,10,20,40
,Peru,0,0,90,130,185
"
            .to_string(),
            deaths_csv: "\
Province/State,Country/Region,Lat,Long,3/1/20,3/2/20,3/3/20
,Italy,0,0,0,1,3
,Peru,0,0,1,2,3
"
            .to_string(),
        }
    }

    #[test]
    fn ingest_then_load_round_trips() {
        let store = Store::open_in_memory(DEFAULT_TABLE).unwrap();
        let out = run_ingest_with_snapshot(&snapshot(), &store).unwrap();

        assert_eq!(out.rows, 3);
        // Italy, Peru, World, placeholder: four metrics each.
        assert_eq!(out.countries, 4);
        assert_eq!(out.columns, 16);
        assert_eq!(out.first_date, NaiveDate::from_ymd_opt(2020, 3, 1));

        let table = store.load_table().unwrap();
        assert_eq!(table.column(WORLD, Metric::Raw), Some(&[100.0, 150.0, 225.0][..]));
        assert_eq!(table.column("Italy", Metric::DeathDaily).map(|c| c[2]), Some(2.0));
        assert!(table.column(NO_SELECTION, Metric::Raw).unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn reingest_replaces_previous_table() {
        let store = Store::open_in_memory(DEFAULT_TABLE).unwrap();
        run_ingest_with_snapshot(&snapshot(), &store).unwrap();

        let smaller = FeedSnapshot {
            confirmed_csv: "Province/State,Country/Region,Lat,Long,3/1/20\n,Chad,0,0,4\n".to_string(),
            deaths_csv: "Province/State,Country/Region,Lat,Long,3/1/20\n,Chad,0,0,1\n".to_string(),
        };
        run_ingest_with_snapshot(&smaller, &store).unwrap();

        let table = store.load_table().unwrap();
        assert_eq!(table.len(), 1);
        assert!(!table.has_country("Italy"));
        assert!(table.has_country("Chad"));
    }

    #[test]
    fn world_view_end_to_end() {
        let store = Store::open_in_memory(DEFAULT_TABLE).unwrap();
        run_ingest_with_snapshot(&snapshot(), &store).unwrap();
        let inputs = ViewInputs {
            table: store.load_table().unwrap(),
            population: PopulationReference::default(),
        };

        let out = run_view(&inputs, &Selection::new([WORLD], Mode::Absolute), None).unwrap();
        let daily: Vec<Option<f64>> = out.slice.rows().iter().map(|r| r.get(TidyColumn::ValueDaily)).collect();
        assert_eq!(daily, vec![None, Some(50.0), Some(75.0)]);
        assert_eq!(out.colors[WORLD], crate::domain::PALETTE[0]);
        // deaths 2 + 3 over cases 50 + 75.
        assert_eq!(out.report.entries[0].ratio, Some(4.0));
    }

    #[test]
    fn view_range_labels_the_period() {
        let store = Store::open_in_memory(DEFAULT_TABLE).unwrap();
        run_ingest_with_snapshot(&snapshot(), &store).unwrap();
        let inputs = ViewInputs {
            table: store.load_table().unwrap(),
            population: PopulationReference::default(),
        };
        let day = |d| NaiveDate::from_ymd_opt(2020, 3, d).unwrap();

        let out = run_view(&inputs, &Selection::new(["Italy"], Mode::Absolute), Some((day(3), day(9)))).unwrap();
        assert_eq!(out.report.period, Period::Between(day(3), day(3)));
        // 2 deaths over 20 cases on the 3rd.
        assert_eq!(out.report.entries[0].ratio, Some(10.0));
    }
}
