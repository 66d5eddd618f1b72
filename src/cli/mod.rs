//! Command-line parsing for the COVID dashboard and its ingestion job.
//!
//! Argument parsing and command dispatch stay apart from the data code: this
//! module only describes the command surface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::feeds::{CONFIRMED_GLOBAL_URL, DEATHS_GLOBAL_URL};
use crate::domain::{Metric, Mode};

pub mod console;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "covid", version, about = "COVID-19 country dashboard and daily ingestion job")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the CSSE feeds and rebuild the country table (run once a day).
    Ingest(IngestArgs),
    /// Print one selection: tidy rows, fatality and an optional plot.
    Show(ShowArgs),
    /// Interactive console with the dashboard controls.
    Dashboard(ViewArgs),
}

#[derive(Debug, Args, Clone)]
pub struct IngestArgs {
    /// Confirmed-cases time-series CSV.
    #[arg(long, default_value = CONFIRMED_GLOBAL_URL)]
    pub confirmed_url: String,

    /// Deaths time-series CSV.
    #[arg(long, default_value = DEATHS_GLOBAL_URL)]
    pub deaths_url: String,
}

/// Presentation options shared by `show` and `dashboard`.
#[derive(Debug, Args, Clone)]
pub struct ViewArgs {
    /// Rows per country in the printed table (most recent dates).
    #[arg(long, default_value_t = 5)]
    pub rows: usize,

    /// Metric drawn by the terminal plot.
    #[arg(long, value_enum, default_value_t = Metric::Daily)]
    pub metric: Metric,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

impl Default for ViewArgs {
    fn default() -> Self {
        Self {
            rows: 5,
            metric: Metric::Daily,
            width: 100,
            height: 20,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Countries to show, e.g. `-c World -c "United Kingdom"`.
    #[arg(short = 'c', long = "country", required = true, num_args = 1..)]
    pub countries: Vec<String>,

    #[arg(long, value_enum, default_value_t = Mode::Normalized)]
    pub mode: Mode,

    /// Start of the fatality period (YYYY-MM-DD); requires `--to`.
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// End of the fatality period (YYYY-MM-DD); requires `--from`.
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,

    /// Render an ASCII plot of `--metric`.
    #[arg(long)]
    pub plot: bool,

    /// Export the tidy slice to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_parses_countries_and_range() {
        let cli = Cli::try_parse_from([
            "covid",
            "show",
            "-c",
            "World",
            "United Kingdom",
            "--mode",
            "absolute",
            "--from",
            "2020-03-01",
            "--to",
            "2020-03-31",
            "--metric",
            "death-daily",
        ])
        .unwrap();
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.countries, vec!["World", "United Kingdom"]);
        assert_eq!(args.mode, Mode::Absolute);
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(args.view.metric, Metric::DeathDaily);
        assert_eq!(args.view.rows, 5);
    }

    #[test]
    fn show_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["covid", "show", "-c", "World", "--from", "2020-03-01"]).is_err());
    }

    #[test]
    fn ingest_defaults_to_csse_feeds() {
        let cli = Cli::try_parse_from(["covid", "ingest"]).unwrap();
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.confirmed_url, CONFIRMED_GLOBAL_URL);
        assert_eq!(args.deaths_url, DEATHS_GLOBAL_URL);
    }
}
