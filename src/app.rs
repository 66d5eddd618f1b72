//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module:
//! - initializes logging
//! - parses CLI arguments
//! - reads store/population configuration from the environment
//! - dispatches to ingestion, a one-shot view, or the interactive console

use std::io::{self, Write};

use clap::Parser;

use crate::cli::{Command, IngestArgs, ShowArgs, ViewArgs};
use crate::dashboard::DashboardState;
use crate::data::{FeedUrls, PopulationReference};
use crate::domain::Selection;
use crate::error::AppError;
use crate::store::StoreConfig;

pub mod pipeline;

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    // `covid` and `covid --rows 3` behave like `covid dashboard ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Ingest(args) => handle_ingest(args),
        Command::Show(args) => handle_show(args),
        Command::Dashboard(args) => handle_dashboard(args),
    }
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();
}

fn handle_ingest(args: IngestArgs) -> Result<(), AppError> {
    let config = StoreConfig::from_env()?;
    let urls = FeedUrls {
        confirmed: args.confirmed_url,
        deaths: args.deaths_url,
    };

    let out = pipeline::run_ingest(&urls, &config)?;
    let range = match (out.first_date, out.last_date) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => "no dates".to_string(),
    };
    println!(
        "Ingested {} rows x {} columns ({} countries, {range}) into {}",
        out.rows,
        out.columns,
        out.countries,
        config.db_path.display()
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let config = StoreConfig::from_env()?;
    let inputs = pipeline::load_view_inputs(&config, &PopulationReference::path_from_env())?;

    let selection = Selection::new(args.countries.iter().cloned(), args.mode);
    let range = args.from.zip(args.to);
    let out = pipeline::run_view(&inputs, &selection, range)?;

    println!("{}", crate::report::format_slice_summary(&out.slice, args.mode));
    println!("{}", crate::report::format_slice_table(&out.slice, args.view.rows, args.mode));
    println!("{}", crate::report::format_fatality(&out.report));

    if args.plot {
        let column = crate::plot::column_for_metric(args.view.metric);
        let plot = crate::plot::render_slice_plot(&out.slice, column, args.view.width, args.view.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::export::write_slice_csv(path, &out.slice)?;
    }

    Ok(())
}

fn handle_dashboard(args: ViewArgs) -> Result<(), AppError> {
    let config = StoreConfig::from_env()?;
    let inputs = pipeline::load_view_inputs(&config, &PopulationReference::path_from_env())?;
    let mut state = DashboardState::new(inputs.table, inputs.population)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    crate::cli::console::run_console(&mut state, stdin.lock(), &mut stdout, &args)?;
    stdout
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush output: {e}")))
}

/// Rewrite argv so `covid` defaults to `covid dashboard`.
///
/// Rules:
/// - `covid`                         -> `covid dashboard`
/// - `covid --rows 3 ...`            -> `covid dashboard --rows 3 ...`
/// - `covid --help/--version/-h`     -> unchanged (top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "ingest" | "show" | "dashboard");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "dashboard".to_string());
    }
    argv
}
