//! Projects the wide country table onto a selection and melts it into a tidy
//! slice for plotting.
//!
//! Per selected country: the four stored metrics plus 7-day trailing means of
//! the two daily series, optionally divided by population. Exact zeros become
//! undefined ("no data" for display), and metric columns that end up entirely
//! undefined are dropped unless the `No selection` placeholder is selected.

use std::collections::BTreeMap;

use crate::data::PopulationReference;
use crate::domain::{
    CountryTable, Metric, Mode, NO_SELECTION, ROLLING_WINDOW, Selection, TidyColumn, TidyRow, TidySlice,
};
use crate::error::AppError;

/// Country -> display color.
pub type ColorMap = BTreeMap<String, String>;

/// Wide-form series for one selected country, in tidy column order.
struct CountrySeries<'a> {
    country: &'a str,
    columns: [Vec<f64>; 6],
}

/// Reshape `table` for `selection`.
pub fn reshape(
    table: &CountryTable,
    selection: &Selection,
    colors: &ColorMap,
    population: &PopulationReference,
) -> Result<TidySlice, AppError> {
    let countries = selection.effective();
    let keep_empty_columns = countries.contains(&NO_SELECTION);

    let mut series = Vec::with_capacity(countries.len());
    for country in countries {
        let mut s = project_country(table, country)?;
        if selection.mode == Mode::Normalized && country != NO_SELECTION {
            let n = population.require(country)?;
            for column in s.columns.iter_mut() {
                column.iter_mut().for_each(|v| *v /= n);
            }
        }
        series.push(s);
    }

    let mut rows = Vec::with_capacity(series.len() * table.len());
    for s in &series {
        for (i, date) in table.dates().iter().enumerate() {
            let mut row = TidyRow::new(*date, s.country);
            for (col, values) in TidyColumn::ALL.iter().zip(s.columns.iter()) {
                row.set(*col, defined(values[i]));
            }
            row.color = colors.get(s.country).cloned();
            rows.push(row);
        }
    }

    let columns: Vec<TidyColumn> = TidyColumn::ALL
        .into_iter()
        .filter(|&col| keep_empty_columns || rows.iter().any(|r| r.get(col).is_some()))
        .collect();

    log::debug!(
        "reshaped {} countries ({}) into {} rows, {} value columns",
        series.len(),
        selection.mode.display_name(),
        rows.len(),
        columns.len()
    );

    Ok(TidySlice::new(rows, columns))
}

fn project_country<'a>(table: &CountryTable, country: &'a str) -> Result<CountrySeries<'a>, AppError> {
    if !table.has_country(country) {
        return Err(AppError::data(format!("Unknown country '{country}'.")));
    }

    let column = |metric: Metric| -> Vec<f64> {
        match table.column(country, metric) {
            Some(values) => values.to_vec(),
            None => {
                log::warn!("'{country}' has no {metric:?} column; treating it as undefined");
                vec![f64::NAN; table.len()]
            }
        }
    };

    let raw = column(Metric::Raw);
    let daily = column(Metric::Daily);
    let death = column(Metric::Death);
    let death_daily = column(Metric::DeathDaily);
    let daily_roll = rolling_mean(&daily, ROLLING_WINDOW);
    let death_daily_roll = rolling_mean(&death_daily, ROLLING_WINDOW);

    Ok(CountrySeries {
        country,
        columns: [raw, daily, death, death_daily, daily_roll, death_daily_roll],
    })
}

/// Trailing mean over `window` values.
///
/// The first `window - 1` entries are undefined, as is any window that holds an
/// undefined value.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().all(|v| v.is_finite()) {
                slice.iter().sum::<f64>() / window as f64
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Zero and non-finite values both read as "no data".
fn defined(v: f64) -> Option<f64> {
    if v.is_finite() && v != 0.0 { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ColumnKey, WORLD};
    use crate::io::ingest::first_difference;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    fn add_country(table: &mut CountryTable, country: &str, confirmed: &[f64], deaths: &[f64]) {
        table.insert(ColumnKey::new(country, Metric::Raw), confirmed.to_vec()).unwrap();
        table.insert(ColumnKey::new(country, Metric::Daily), first_difference(confirmed)).unwrap();
        table.insert(ColumnKey::new(country, Metric::Death), deaths.to_vec()).unwrap();
        table
            .insert(ColumnKey::new(country, Metric::DeathDaily), first_difference(deaths))
            .unwrap();
    }

    fn sample_table() -> CountryTable {
        let mut table = CountryTable::new(dates(3));
        add_country(&mut table, WORLD, &[100.0, 150.0, 225.0], &[1.0, 3.0, 6.0]);
        add_country(&mut table, "Italy", &[10.0, 20.0, 40.0], &[0.0, 1.0, 2.0]);
        let nan = [f64::NAN; 3];
        add_country(&mut table, NO_SELECTION, &nan, &nan);
        table
    }

    fn population() -> PopulationReference {
        [(WORLD, 1000.0), ("Italy", 10.0)].into_iter().collect()
    }

    fn column(slice: &TidySlice, country: &str, col: TidyColumn) -> Vec<Option<f64>> {
        slice
            .rows()
            .iter()
            .filter(|r| r.country == country)
            .map(|r| r.get(col))
            .collect()
    }

    #[test]
    fn world_absolute_end_to_end() {
        let selection = Selection::new([WORLD], Mode::Absolute);
        let slice = reshape(&sample_table(), &selection, &ColorMap::new(), &population()).unwrap();

        assert_eq!(slice.len(), 3);
        assert_eq!(
            column(&slice, WORLD, TidyColumn::Value),
            vec![Some(100.0), Some(150.0), Some(225.0)]
        );
        assert_eq!(
            column(&slice, WORLD, TidyColumn::ValueDaily),
            vec![None, Some(50.0), Some(75.0)]
        );
    }

    #[test]
    fn one_row_per_date_and_country() {
        let table = sample_table();
        let selection = Selection::new([WORLD, "Italy"], Mode::Absolute);
        let slice = reshape(&table, &selection, &ColorMap::new(), &population()).unwrap();

        assert_eq!(slice.len(), 2 * table.len());
        for country in [WORLD, "Italy"] {
            let got: Vec<NaiveDate> = slice
                .rows()
                .iter()
                .filter(|r| r.country == country)
                .map(|r| r.date)
                .collect();
            assert_eq!(got, table.dates());
        }
    }

    #[test]
    fn rolling_mean_needs_a_full_window() {
        let values: Vec<f64> = (1..=9).map(f64::from).collect();
        let rolled = rolling_mean(&values, 7);
        assert!(rolled[..6].iter().all(|v| v.is_nan()));
        assert_eq!(rolled[6], 4.0);
        assert_eq!(rolled[7], 5.0);
        assert_eq!(rolled[8], 6.0);
    }

    #[test]
    fn rolling_mean_is_undefined_when_window_has_a_gap() {
        let mut values = vec![1.0; 8];
        values[3] = f64::NAN;
        let rolled = rolling_mean(&values, 7);
        assert!(rolled[6].is_nan());
        assert!(rolled[7].is_nan());
    }

    #[test]
    fn rolling_columns_follow_the_daily_series() {
        let mut table = CountryTable::new(dates(9));
        let confirmed: Vec<f64> = (0..9).map(|i| f64::from(i * i)).collect();
        add_country(&mut table, "Peru", &confirmed, &[0.0; 9]);

        let selection = Selection::new(["Peru"], Mode::Absolute);
        let slice = reshape(&table, &selection, &ColorMap::new(), &PopulationReference::default()).unwrap();
        let roll = column(&slice, "Peru", TidyColumn::ValueDailyRoll);

        // daily[0] is undefined, so the first full window starts at row 7.
        assert!(roll[..7].iter().all(Option::is_none));
        let daily: Vec<f64> = (1..=7).map(|i| f64::from(i * i - (i - 1) * (i - 1))).collect();
        let expected = daily.iter().sum::<f64>() / 7.0;
        assert_eq!(roll[7], Some(expected));
    }

    #[test]
    fn normalization_divides_by_population() {
        let table = sample_table();
        let colors = ColorMap::new();
        let abs = reshape(&table, &Selection::new([WORLD, "Italy"], Mode::Absolute), &colors, &population()).unwrap();
        let norm =
            reshape(&table, &Selection::new([WORLD, "Italy"], Mode::Normalized), &colors, &population()).unwrap();

        assert_eq!(abs.len(), norm.len());
        for (a, n) in abs.rows().iter().zip(norm.rows()) {
            let pop = population().get(&a.country).unwrap();
            for col in TidyColumn::ALL {
                match (a.get(col), n.get(col)) {
                    (Some(x), Some(y)) => assert!((x / pop - y).abs() < 1e-12),
                    (None, None) => {}
                    other => panic!("mismatch for {} {col:?}: {other:?}", a.country),
                }
            }
        }
    }

    #[test]
    fn missing_population_is_fatal() {
        let pop: PopulationReference = [(WORLD, 1.0)].into_iter().collect();
        let err = reshape(
            &sample_table(),
            &Selection::new([WORLD, "Italy"], Mode::Normalized),
            &ColorMap::new(),
            &pop,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn unknown_country_is_fatal() {
        let err = reshape(
            &sample_table(),
            &Selection::new(["Atlantis"], Mode::Absolute),
            &ColorMap::new(),
            &population(),
        )
        .unwrap_err();
        assert!(err.message().contains("Atlantis"));
    }

    #[test]
    fn zeros_become_undefined() {
        let selection = Selection::new(["Italy"], Mode::Absolute);
        let slice = reshape(&sample_table(), &selection, &ColorMap::new(), &population()).unwrap();
        assert_eq!(
            column(&slice, "Italy", TidyColumn::ValueDead),
            vec![None, Some(1.0), Some(2.0)]
        );
    }

    #[test]
    fn empty_columns_drop_unless_placeholder_selected() {
        let table = sample_table();
        let colors = ColorMap::new();

        let slice = reshape(&table, &Selection::new([WORLD], Mode::Absolute), &colors, &population()).unwrap();
        assert!(slice.has_column(TidyColumn::Value));
        assert!(!slice.has_column(TidyColumn::ValueDailyRoll));

        let slice =
            reshape(&table, &Selection::new([NO_SELECTION], Mode::Normalized), &colors, &population()).unwrap();
        assert_eq!(slice.columns(), &TidyColumn::ALL);
        assert_eq!(slice.countries(), vec![NO_SELECTION]);
    }

    #[test]
    fn placeholder_is_dropped_alongside_real_picks() {
        let selection = Selection::new([NO_SELECTION, "Italy"], Mode::Absolute);
        let slice = reshape(&sample_table(), &selection, &ColorMap::new(), &population()).unwrap();
        assert_eq!(slice.countries(), vec!["Italy"]);
        assert!(!slice.has_column(TidyColumn::ValueDailyDeadRoll));
    }

    #[test]
    fn rows_carry_their_country_color() {
        let colors: ColorMap = [(WORLD.to_string(), "#1f77b4".to_string())].into_iter().collect();
        let selection = Selection::new([WORLD, "Italy"], Mode::Absolute);
        let slice = reshape(&sample_table(), &selection, &colors, &population()).unwrap();
        for row in slice.rows() {
            match row.country.as_str() {
                WORLD => assert_eq!(row.color.as_deref(), Some("#1f77b4")),
                _ => assert_eq!(row.color, None),
            }
        }
    }
}
