//! DuckDB-backed data store for the wide country table.
//!
//! Schema: one text `Date` column (ISO `YYYY-MM-DD`) and one `DOUBLE` column per
//! `(country, Metric)`, named with the suffix convention from
//! `ColumnKey::column_name`. Undefined values are stored as `NULL`.
//!
//! Refreshing is a full replace: drop (best effort), create, bulk insert. The
//! three steps are not one atomic unit; a failure after the drop leaves the
//! store without a table until the next successful run.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use duckdb::types::Value;
use duckdb::{Connection, params, params_from_iter};
use thiserror::Error;

use crate::domain::{ColumnKey, CountryTable};
use crate::error::AppError;

/// Table the ingestion job writes and the dashboard reads.
pub const DEFAULT_TABLE: &str = "country";

const DATE_COLUMN: &str = "Date";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("table '{0}' does not exist (run `covid ingest` first)")]
    MissingTable(String),

    #[error("unexpected stored data: {0}")]
    Invalid(String),
}

/// Where the store lives.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub table: String,
}

impl StoreConfig {
    /// Read `DATABASE_URL` (after loading `.env`). Its absence is fatal.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::usage("Missing DATABASE_URL in environment (.env)."))?;
        Ok(Self::from_url(&url))
    }

    /// Accepts a plain path or a `duckdb://` URL.
    pub fn from_url(url: &str) -> Self {
        let path = url.trim().strip_prefix("duckdb://").unwrap_or(url.trim());
        Self {
            db_path: PathBuf::from(path),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

pub struct Store {
    conn: Connection,
    table: String,
}

impl Store {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&config.db_path)?;
        log::debug!("opened store at {}", config.db_path.display());
        Ok(Self {
            conn,
            table: config.table.clone(),
        })
    }

    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            table: table.to_string(),
        })
    }

    /// Replace the table's contents with `table`. Returns the rows inserted.
    pub fn replace_table(&self, table: &CountryTable) -> Result<usize, StoreError> {
        self.drop_existing();

        let columns: Vec<(&ColumnKey, &[f64])> = table.columns().collect();

        let mut defs = vec![format!("{} TEXT", quote_ident(DATE_COLUMN))];
        defs.extend(
            columns
                .iter()
                .map(|(key, _)| format!("{} DOUBLE", quote_ident(&key.column_name()))),
        );
        self.conn.execute_batch(&format!(
            "CREATE TABLE {} ({});",
            quote_ident(&self.table),
            defs.join(", ")
        ))?;
        log::info!("created table '{}' with {} metric columns", self.table, columns.len());

        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let sql = format!("INSERT INTO {} VALUES ({placeholders})", quote_ident(&self.table));

        self.conn.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, StoreError> {
            let mut statement = self.conn.prepare(&sql)?;
            for (row, date) in table.dates().iter().enumerate() {
                let mut values = Vec::with_capacity(columns.len() + 1);
                values.push(Value::Text(date.format("%Y-%m-%d").to_string()));
                values.extend(columns.iter().map(|(_, col)| to_sql_value(col[row])));
                statement.execute(params_from_iter(values.iter()))?;
            }
            Ok(table.len())
        })();

        let inserted = finalize_transaction(&self.conn, result)?;
        log::info!("inserted {inserted} rows into '{}'", self.table);
        Ok(inserted)
    }

    /// Read the whole table back into wide form, sorted by date.
    pub fn load_table(&self) -> Result<CountryTable, StoreError> {
        let names = self.column_names()?;
        let Some((first, metric_names)) = names.split_first() else {
            return Err(StoreError::MissingTable(self.table.clone()));
        };
        if first != DATE_COLUMN {
            return Err(StoreError::Invalid(format!(
                "first column is '{first}', expected '{DATE_COLUMN}'"
            )));
        }

        let keys = metric_names
            .iter()
            .map(|name| {
                ColumnKey::parse(name)
                    .ok_or_else(|| StoreError::Invalid(format!("unrecognized column '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut statement = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(&self.table)))?;
        let mut cursor = statement.query(params![])?;

        let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
        while let Some(row) = cursor.next()? {
            let raw_date: String = row.get(0)?;
            let date = parse_stored_date(&raw_date)
                .ok_or_else(|| StoreError::Invalid(format!("bad date '{raw_date}'")))?;
            let mut values = Vec::with_capacity(keys.len());
            for idx in 0..keys.len() {
                let v: Option<f64> = row.get(idx + 1)?;
                values.push(v.unwrap_or(f64::NAN));
            }
            rows.push((date, values));
        }
        rows.sort_by_key(|(d, _)| *d);

        let dates = rows.iter().map(|(d, _)| *d).collect();
        let mut table = CountryTable::new(dates);
        for (idx, key) in keys.into_iter().enumerate() {
            let column = rows.iter().map(|(_, v)| v[idx]).collect();
            table
                .insert(key, column)
                .map_err(|e| StoreError::Invalid(e.to_string()))?;
        }

        log::info!(
            "loaded '{}': {} dates x {} columns",
            self.table,
            table.len(),
            table.column_count()
        );
        Ok(table)
    }

    fn column_names(&self) -> Result<Vec<String>, StoreError> {
        let mut statement = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_name = ? ORDER BY ordinal_position",
        )?;
        let names = statement
            .query_map(params![self.table.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Drop the table if it exists. A failed drop (typically: no table yet) is
    /// rolled back so the connection stays usable, and the refresh continues.
    fn drop_existing(&self) -> bool {
        let sql = format!("BEGIN TRANSACTION; DROP TABLE {}; COMMIT;", quote_ident(&self.table));
        match self.conn.execute_batch(&sql) {
            Ok(()) => {
                log::info!("dropped previous table '{}'", self.table);
                true
            }
            Err(err) => {
                log::info!("no previous table '{}' dropped ({err})", self.table);
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    log::warn!("rollback after failed drop of '{}' failed: {rollback}", self.table);
                }
                false
            }
        }
    }
}

fn finalize_transaction<T>(connection: &Connection, result: Result<T, StoreError>) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = connection.execute_batch("ROLLBACK") {
                log::warn!("rollback after failed insert failed: {rollback}");
            }
            Err(error)
        }
    }
}

fn to_sql_value(v: f64) -> Value {
    if v.is_finite() { Value::Double(v) } else { Value::Null }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn parse_stored_date(s: &str) -> Option<NaiveDate> {
    // Older loads kept the feed's `M/D/YY` headers verbatim.
    ["%Y-%m-%d", "%m/%d/%y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s.trim(), fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metric, NO_SELECTION};
    use crate::io::ingest::build_country_table;
    use tempfile::tempdir;

    const CONFIRMED: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Italy,41.9,12.6,1,3,6
,Peru,-9.2,-75.0,2,2,2
";
    const DEATHS: &str = "\
Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20
,Italy,41.9,12.6,0,1,1
,Peru,-9.2,-75.0,0,0,1
";

    #[test]
    fn replace_then_load_round_trips() {
        let temp = tempdir().expect("tempdir");
        let config = StoreConfig::from_url(temp.path().join("db").join("covid.duckdb").to_str().unwrap());
        let store = Store::open(&config).expect("open");

        let table = build_country_table(CONFIRMED, DEATHS).expect("table");
        let inserted = store.replace_table(&table).expect("replace");
        assert_eq!(inserted, 3);

        let loaded = store.load_table().expect("load");
        assert_eq!(loaded.dates(), table.dates());
        assert_eq!(loaded.column_count(), table.column_count());

        let daily = loaded.column("Italy", Metric::Daily).unwrap();
        assert!(daily[0].is_nan());
        assert_eq!(daily[1], 3.0 - 1.0);
        assert_eq!(daily[2], 6.0 - 3.0);

        let placeholder = loaded.column(NO_SELECTION, Metric::Raw).unwrap();
        assert!(placeholder.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn second_replace_overwrites_first() {
        let store = Store::open_in_memory(DEFAULT_TABLE).expect("open");
        let table = build_country_table(CONFIRMED, DEATHS).expect("table");
        store.replace_table(&table).expect("first");

        let smaller = "Province/State,Country/Region,Lat,Long,2/1/20\n,Chile,0,0,7\n";
        let deaths = "Province/State,Country/Region,Lat,Long,2/1/20\n,Chile,0,0,1\n";
        let replacement = build_country_table(smaller, deaths).expect("table");
        store.replace_table(&replacement).expect("second");

        let loaded = store.load_table().expect("load");
        assert_eq!(loaded.len(), 1);
        assert!(loaded.has_country("Chile"));
        assert!(!loaded.has_country("Italy"));
    }

    #[test]
    fn load_without_table_is_missing_table() {
        let store = Store::open_in_memory(DEFAULT_TABLE).expect("open");
        let err = store.load_table().unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(_)));
    }

    #[test]
    fn connection_stays_usable_after_failed_drop() {
        let store = Store::open_in_memory("fresh").expect("open");
        assert!(!store.drop_existing());
        store.conn.execute_batch("CREATE TABLE scratch (x INTEGER)").expect("usable");
    }

    #[test]
    fn failed_rollback_keeps_the_original_error() {
        let store = Store::open_in_memory(DEFAULT_TABLE).expect("open");
        // No transaction is open, so the ROLLBACK itself fails.
        let result: Result<(), StoreError> = Err(StoreError::Invalid("insert failed".into()));
        let err = finalize_transaction(&store.conn, result).unwrap_err();
        assert!(matches!(err, StoreError::Invalid(msg) if msg == "insert failed"));
        store.conn.execute_batch("CREATE TABLE scratch (x INTEGER)").expect("usable");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("Korea, South"), "\"Korea, South\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
