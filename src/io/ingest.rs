//! CSV ingest and reshaping of the CSSE global time-series feeds.
//!
//! A feed has one row per province/country and one column per date:
//!
//! ```text
//! Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,...
//! ```
//!
//! This module turns it into the wide `CountryTable` the store keeps: dates as
//! rows, one cumulative column and one daily-delta column per country, plus the
//! synthetic `World` aggregate and the empty `No selection` placeholder.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{ColumnKey, CountryTable, Metric, NO_SELECTION, WORLD};
use crate::error::AppError;

const COL_PROVINCE: &str = "province/state";
const COL_COUNTRY: &str = "country/region";
const GEO_COLUMNS: [&str; 4] = [COL_PROVINCE, COL_COUNTRY, "lat", "long"];

/// Provinces reported as their own country, disambiguated with a `*`.
const PROVINCE_REMAP: [(&str, &str); 2] = [("Hong Kong", "Hong Kong*"), ("Macau", "Macau*")];

/// Summary of one parsed feed, for logging.
#[derive(Debug, Clone)]
pub struct FeedStats {
    pub rows_read: usize,
    pub countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// A reshaped feed: the wide table plus what went into it.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub table: CountryTable,
    pub stats: FeedStats,
}

/// Parse one feed and reshape it into a wide table.
///
/// `metric` picks the pair of columns produced: `Metric::Raw` yields confirmed
/// totals + `Daily`, `Metric::Death` yields death totals + `DeathDaily`.
pub fn parse_feed(text: &str, metric: Metric) -> Result<ParsedFeed, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read feed headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    for required in [COL_PROVINCE, COL_COUNTRY] {
        if !header_map.contains_key(required) {
            return Err(AppError::data(format!("Feed is missing required column `{required}`.")));
        }
    }

    let date_columns = resolve_date_columns(&headers)?;
    let width = date_columns.len();

    let mut by_country: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut world = vec![0.0; width];
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        rows_read += 1;

        let record = result.map_err(|e| AppError::data(format!("Feed line {line}: CSV parse error: {e}")))?;
        let country = resolve_country(&record, &header_map)
            .ok_or_else(|| AppError::data(format!("Feed line {line}: missing `Country/Region`.")))?;

        let totals = by_country.entry(country).or_insert_with(|| vec![0.0; width]);
        for (slot, (_, col)) in date_columns.iter().enumerate() {
            let value = parse_cell(record.get(*col))
                .map_err(|e| AppError::data(format!("Feed line {line}: {e}")))?;
            totals[slot] += value;
            world[slot] += value;
        }
    }

    let countries = by_country.len();
    by_country.insert(WORLD.to_string(), world);

    let dates: Vec<NaiveDate> = date_columns.iter().map(|(d, _)| *d).collect();
    let stats = FeedStats {
        rows_read,
        countries,
        first_date: dates.first().copied(),
        last_date: dates.last().copied(),
    };

    let mut table = CountryTable::new(dates);
    let cumulative = metric.cumulative();
    let daily = metric.daily();

    by_country.insert(NO_SELECTION.to_string(), vec![f64::NAN; width]);
    for (country, totals) in by_country {
        let deltas = first_difference(&totals);
        table.insert(ColumnKey::new(country.clone(), cumulative), totals)?;
        table.insert(ColumnKey::new(country, daily), deltas)?;
    }

    Ok(ParsedFeed { table, stats })
}

/// Parse both feeds and join them on the date index.
pub fn build_country_table(confirmed_csv: &str, deaths_csv: &str) -> Result<CountryTable, AppError> {
    let confirmed = parse_feed(confirmed_csv, Metric::Raw)?;
    log::info!(
        "confirmed feed: {} rows, {} countries, {:?}..{:?}",
        confirmed.stats.rows_read,
        confirmed.stats.countries,
        confirmed.stats.first_date,
        confirmed.stats.last_date
    );

    let deaths = parse_feed(deaths_csv, Metric::Death)?;
    log::info!(
        "deaths feed: {} rows, {} countries, {:?}..{:?}",
        deaths.stats.rows_read,
        deaths.stats.countries,
        deaths.stats.first_date,
        deaths.stats.last_date
    );

    if confirmed.table.dates() != deaths.table.dates() {
        log::warn!("confirmed and deaths feeds cover different dates; missing cells are left undefined");
    }

    Ok(confirmed.table.join(deaths.table))
}

/// `out[0]` is undefined; `out[i] = values[i] - values[i - 1]`.
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for (i, v) in values.iter().enumerate() {
        if i == 0 {
            out.push(f64::NAN);
        } else {
            out.push(v - values[i - 1]);
        }
    }
    out
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // GitHub raw downloads occasionally carry a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Every non-geographic header must be a date. Returns `(date, column index)`
/// sorted ascending by date.
fn resolve_date_columns(headers: &StringRecord) -> Result<Vec<(NaiveDate, usize)>, AppError> {
    let mut out = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let normalized = normalize_header_name(name);
        if GEO_COLUMNS.contains(&normalized.as_str()) {
            continue;
        }
        let date = parse_header_date(name.trim())
            .ok_or_else(|| AppError::data(format!("Unexpected feed column '{name}' (expected a date).")))?;
        out.push((date, idx));
    }

    out.sort_by_key(|(d, _)| *d);
    if let Some(pair) = out.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(AppError::data(format!("Duplicate date column {} in feed.", pair[0].0)));
    }
    if out.is_empty() {
        return Err(AppError::data("Feed has no date columns."));
    }
    Ok(out)
}

fn parse_header_date(s: &str) -> Option<NaiveDate> {
    // CSSE headers look like `1/22/20`; ISO and four-digit years are accepted too.
    const FMTS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];
    FMTS.iter().find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn resolve_country(record: &StringRecord, header_map: &HashMap<String, usize>) -> Option<String> {
    let province = header_map
        .get(COL_PROVINCE)
        .and_then(|&i| record.get(i))
        .map(str::trim)
        .unwrap_or("");

    if let Some((_, label)) = PROVINCE_REMAP.iter().find(|(p, _)| *p == province) {
        return Some(label.to_string());
    }

    header_map
        .get(COL_COUNTRY)
        .and_then(|&i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Empty cells count as zero when summing, like a missing province report.
fn parse_cell(raw: Option<&str>) -> Result<f64, String> {
    let s = raw.map(str::trim).unwrap_or("");
    if s.is_empty() {
        return Ok(0.0);
    }
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("non-finite number '{s}'"))
    }
}
