//! Shared domain types.
//!
//! A wide-table column is identified by a `(country, Metric)` pair. The string
//! suffixes used by the database schema (`_daily`, `_dead`, `_daily_dead`) are
//! only produced and parsed here, at the storage boundary.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Placeholder "country" whose columns are always undefined.
///
/// Keeping it selectable lets the dashboard show empty axes instead of nothing.
pub const NO_SELECTION: &str = "No selection";

/// Synthetic aggregate over every country in a feed.
pub const WORLD: &str = "World";

/// Fixed color palette for selected countries, in assignment order.
pub const PALETTE: [&str; 9] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// Trailing window (days) for the rolling averages.
pub const ROLLING_WINDOW: usize = 7;

/// One of the four per-country series stored in the wide table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Cumulative confirmed cases.
    Raw,
    /// Day-over-day change of confirmed cases.
    Daily,
    /// Cumulative deaths.
    Death,
    /// Day-over-day change of deaths.
    DeathDaily,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Raw, Metric::Daily, Metric::Death, Metric::DeathDaily];

    /// Suffix appended to the country name in the store schema.
    pub fn column_suffix(self) -> &'static str {
        match self {
            Metric::Raw => "",
            Metric::Daily => "_daily",
            Metric::Death => "_dead",
            Metric::DeathDaily => "_daily_dead",
        }
    }

    /// The cumulative series a daily metric is differenced from.
    pub fn cumulative(self) -> Metric {
        match self {
            Metric::Raw | Metric::Daily => Metric::Raw,
            Metric::Death | Metric::DeathDaily => Metric::Death,
        }
    }

    /// The daily series derived from a cumulative metric.
    pub fn daily(self) -> Metric {
        match self {
            Metric::Raw | Metric::Daily => Metric::Daily,
            Metric::Death | Metric::DeathDaily => Metric::DeathDaily,
        }
    }
}

/// Display mode toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Absolute,
    /// Divide every value by the country's population.
    #[default]
    Normalized,
}

impl Mode {
    pub fn display_name(self) -> &'static str {
        match self {
            Mode::Absolute => "Absolute",
            Mode::Normalized => "Normalized",
        }
    }

    pub fn toggled(self) -> Mode {
        match self {
            Mode::Absolute => Mode::Normalized,
            Mode::Normalized => Mode::Absolute,
        }
    }
}

/// Countries picked by the user plus the display mode.
///
/// Countries keep first-pick order and are deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    countries: Vec<String>,
    pub mode: Mode,
}

impl Selection {
    pub fn new<I, S>(picks: I, mode: Mode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut countries: Vec<String> = Vec::new();
        for pick in picks {
            let pick = pick.into();
            if !countries.contains(&pick) {
                countries.push(pick);
            }
        }
        Self { countries, mode }
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    pub fn contains(&self, country: &str) -> bool {
        self.countries.iter().any(|c| c == country)
    }

    /// The countries the reshaper works on: the placeholder is dropped as soon
    /// as anything else is picked.
    pub fn effective(&self) -> Vec<&str> {
        if self.countries.len() > 1 {
            self.countries
                .iter()
                .map(String::as_str)
                .filter(|c| *c != NO_SELECTION)
                .collect()
        } else {
            self.countries.iter().map(String::as_str).collect()
        }
    }
}

/// Identifies one column of the wide country table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub country: String,
    pub metric: Metric,
}

impl ColumnKey {
    pub fn new(country: impl Into<String>, metric: Metric) -> Self {
        Self {
            country: country.into(),
            metric,
        }
    }

    /// Column name used by the store schema.
    pub fn column_name(&self) -> String {
        format!("{}{}", self.country, self.metric.column_suffix())
    }

    /// Parse a store column name back into a key.
    ///
    /// `_dead_daily` is accepted as an alias of `_daily_dead`. Longest suffixes
    /// are tried first so `X_daily_dead` never parses as country `X_daily`.
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        const SUFFIXES: [(&str, Metric); 4] = [
            ("_daily_dead", Metric::DeathDaily),
            ("_dead_daily", Metric::DeathDaily),
            ("_daily", Metric::Daily),
            ("_dead", Metric::Death),
        ];
        for (suffix, metric) in SUFFIXES {
            if let Some(country) = name.strip_suffix(suffix) {
                if country.is_empty() {
                    return None;
                }
                return Some(Self::new(country, metric));
            }
        }
        Some(Self::new(name, Metric::Raw))
    }
}

impl std::fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column_name())
    }
}
