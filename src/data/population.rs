//! Static population reference used for normalized display.
//!
//! File format: `{"data": {"Italy": 60461826, "US": 331002651, ...}}`.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_POPULATION_PATH: &str = "population_covid.json";

#[derive(Debug, Deserialize)]
struct PopulationFile {
    data: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PopulationReference {
    data: HashMap<String, f64>,
}

impl PopulationReference {
    /// `POPULATION_PATH` from the environment, else the default file name.
    pub fn path_from_env() -> PathBuf {
        std::env::var("POPULATION_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_POPULATION_PATH))
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::usage(format!("Failed to open population file '{}': {e}", path.display()))
        })?;
        let parsed: PopulationFile = serde_json::from_reader(file)
            .map_err(|e| AppError::usage(format!("Invalid population JSON: {e}")))?;
        log::info!("loaded population for {} countries", parsed.data.len());
        Ok(Self { data: parsed.data })
    }

    pub fn from_json_str(s: &str) -> Result<Self, AppError> {
        let parsed: PopulationFile =
            serde_json::from_str(s).map_err(|e| AppError::usage(format!("Invalid population JSON: {e}")))?;
        Ok(Self { data: parsed.data })
    }

    pub fn get(&self, country: &str) -> Option<f64> {
        self.data.get(country).copied()
    }

    /// Population for `country`; a miss (or a non-positive count) is fatal.
    pub fn require(&self, country: &str) -> Result<f64, AppError> {
        match self.get(country) {
            Some(n) if n.is_finite() && n > 0.0 => Ok(n),
            Some(n) => Err(AppError::data(format!("Invalid population {n} for '{country}'."))),
            None => Err(AppError::data(format!("No population data for '{country}'."))),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PopulationReference {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_envelope() {
        let pop = PopulationReference::from_json_str(r#"{"data": {"Italy": 60000000, "Peru": 3.3e7}}"#).unwrap();
        assert_eq!(pop.len(), 2);
        assert_eq!(pop.get("Italy"), Some(60_000_000.0));
        assert_eq!(pop.require("Peru").unwrap(), 33_000_000.0);
    }

    #[test]
    fn missing_country_is_a_data_error() {
        let pop: PopulationReference = [("Italy", 1.0)].into_iter().collect();
        let err = pop.require("Atlantis").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn zero_population_is_rejected() {
        let pop: PopulationReference = [("Nowhere", 0.0)].into_iter().collect();
        assert!(pop.require("Nowhere").is_err());
    }

    #[test]
    fn rejects_missing_envelope() {
        assert!(PopulationReference::from_json_str(r#"{"Italy": 1}"#).is_err());
    }
}
