//! Interactive dashboard console.
//!
//! A line-oriented stand-in for the dashboard widgets: every command maps to
//! one control event on `DashboardState`, after which the refreshed view is
//! printed. Input and output are injected so the loop can be driven by tests.
//!
//! Commands:
//! - `toggle COUNTRY`        flip a checkbox
//! - `pick N COUNTRY|-`      set dropdown N (1-3); `-` clears it
//! - `mode absolute|normalized|toggle`
//! - `brush FROM TO`         fatality over a date range (YYYY-MM-DD)
//! - `reset`                 clear the brush
//! - `plot [METRIC]`, `options`, `help`, `q`

use std::io::{BufRead, Write};

use chrono::NaiveDate;
use clap::ValueEnum;

use crate::cli::ViewArgs;
use crate::dashboard::{CHECKBOX_GROUPS, ControlChange, DashboardState};
use crate::domain::{Metric, Mode, NO_SELECTION};
use crate::error::AppError;
use crate::plot::{column_for_metric, render_slice_plot};
use crate::report::{format_fatality, format_slice_summary, format_slice_table};

const HELP: &str = "\
Commands:
  toggle COUNTRY          flip a checkbox (World, China, US, United Kingdom, Italy, India)
  pick N COUNTRY|-        set dropdown N (1-3), '-' for no selection
  mode absolute|normalized|toggle
  brush FROM TO           fatality between two dates (YYYY-MM-DD)
  reset                   clear the brush
  plot [METRIC]           plot raw|daily|death|death-daily
  options                 list dropdown countries
  help                    this text
  q                       quit
";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Change(ControlChange),
    Brush(NaiveDate, NaiveDate),
    Reset,
    Plot(Option<Metric>),
    Options,
    Help,
    Quit,
}

/// Run the console until `q` or end of input.
///
/// Usage mistakes are reported and the loop continues; data errors (e.g. a
/// population miss) end the session.
pub fn run_console<R: BufRead, W: Write>(
    state: &mut DashboardState,
    input: R,
    out: &mut W,
    view: &ViewArgs,
) -> Result<(), AppError> {
    write_out(out, &render_view(state, view))?;
    write_out(out, "Type `help` for commands.\n")?;

    let mut lines = input.lines();
    loop {
        write_out(out, "> ")?;
        out.flush()
            .map_err(|e| AppError::runtime(format!("Failed to write prompt: {e}")))?;

        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line.map_err(|e| AppError::runtime(format!("Failed to read input: {e}")))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(err) => {
                write_out(out, &format!("{err}\n"))?;
                continue;
            }
        };

        match command {
            ConsoleCommand::Quit => return Ok(()),
            ConsoleCommand::Help => write_out(out, HELP)?,
            ConsoleCommand::Options => {
                write_out(out, &format!("{}\n", state.dropdown_options().join(", ")))?
            }
            ConsoleCommand::Plot(metric) => {
                let column = column_for_metric(metric.unwrap_or(view.metric));
                write_out(out, &render_slice_plot(state.slice(), column, view.width, view.height))?;
            }
            ConsoleCommand::Brush(from, to) => {
                if state.set_brush(from, to) == 0 {
                    write_out(out, "No rows in that range; showing the full period.\n")?;
                }
                write_out(out, &format_fatality(state.report()))?;
            }
            ConsoleCommand::Reset => {
                state.clear_brush();
                write_out(out, &format_fatality(state.report()))?;
            }
            ConsoleCommand::Change(change) => match state.apply(change) {
                Ok(()) => write_out(out, &render_view(state, view))?,
                Err(err) if err.exit_code() == 2 => write_out(out, &format!("{err}\n"))?,
                Err(err) => return Err(err),
            },
        }
    }
}

/// Controls, slice summary, the recent rows and the fatality block.
fn render_view(state: &DashboardState, view: &ViewArgs) -> String {
    let controls = state.controls();
    let mut out = String::new();

    for group in CHECKBOX_GROUPS {
        let boxes: Vec<String> = group
            .iter()
            .map(|label| {
                let mark = if controls.is_checked(label) { 'x' } else { ' ' };
                format!("[{mark}] {label}")
            })
            .collect();
        out.push_str(&boxes.join("  "));
        out.push('\n');
    }
    for (i, pick) in controls.dropdowns().iter().enumerate() {
        out.push_str(&format!("Dropdown {}: {pick}\n", i + 1));
    }
    if let Some((from, to)) = state.brush() {
        out.push_str(&format!("Brush: {from} .. {to}\n"));
    }
    out.push('\n');

    out.push_str(&format_slice_summary(state.slice(), controls.mode));
    out.push_str(&format_slice_table(state.slice(), view.rows, controls.mode));
    out.push('\n');
    out.push_str(&format_fatality(state.report()));
    out
}

fn parse_command(line: &str) -> Result<ConsoleCommand, AppError> {
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    match verb.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => Ok(ConsoleCommand::Quit),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "options" => Ok(ConsoleCommand::Options),
        "reset" => Ok(ConsoleCommand::Reset),
        "toggle" => {
            if rest.is_empty() {
                return Err(AppError::usage("Usage: toggle COUNTRY"));
            }
            Ok(ConsoleCommand::Change(ControlChange::ToggleCheckbox(rest.to_string())))
        }
        "pick" => {
            let (slot, country) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| AppError::usage("Usage: pick N COUNTRY|-"))?;
            let slot: usize = slot
                .parse()
                .map_err(|_| AppError::usage(format!("Dropdown number expected, got '{slot}'.")))?;
            if slot == 0 {
                return Err(AppError::usage("Dropdowns are numbered from 1."));
            }
            let country = match country.trim() {
                "-" => NO_SELECTION.to_string(),
                name => name.to_string(),
            };
            Ok(ConsoleCommand::Change(ControlChange::SetDropdown {
                slot: slot - 1,
                country,
            }))
        }
        "mode" => {
            let mode = match rest.to_ascii_lowercase().as_str() {
                "absolute" => Mode::Absolute,
                "normalized" => Mode::Normalized,
                "toggle" | "" => return Ok(ConsoleCommand::Change(ControlChange::ToggleMode)),
                other => return Err(AppError::usage(format!("Unknown mode '{other}'."))),
            };
            Ok(ConsoleCommand::Change(ControlChange::SetMode(mode)))
        }
        "brush" => {
            let dates: Vec<&str> = rest.split_whitespace().collect();
            let [from, to] = dates.as_slice() else {
                return Err(AppError::usage("Usage: brush FROM TO"));
            };
            let from = parse_date(from)?;
            let to = parse_date(to)?;
            if from > to {
                return Err(AppError::usage("Brush start is after its end."));
            }
            Ok(ConsoleCommand::Brush(from, to))
        }
        "plot" => {
            if rest.is_empty() {
                return Ok(ConsoleCommand::Plot(None));
            }
            let metric = <Metric as ValueEnum>::from_str(rest, true)
                .map_err(|_| AppError::usage(format!("Unknown metric '{rest}'.")))?;
            Ok(ConsoleCommand::Plot(Some(metric)))
        }
        other => Err(AppError::usage(format!("Unknown command '{other}'. Type `help`."))),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::usage(format!("Invalid date '{s}' (expected YYYY-MM-DD).")))
}

fn write_out<W: Write>(out: &mut W, text: &str) -> Result<(), AppError> {
    out.write_all(text.as_bytes())
        .map_err(|e| AppError::runtime(format!("Failed to write output: {e}")))
}
