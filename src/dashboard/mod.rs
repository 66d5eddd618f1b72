//! Selection state controller.
//!
//! `DashboardState` owns everything the dashboard used to keep in globals: the
//! control values, the current color assignment, the active brush and the
//! latest slice + fatality report. Front-ends feed it one `ControlChange` at a
//! time and read the refreshed outputs back.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::data::PopulationReference;
use crate::domain::{CountryTable, Mode, NO_SELECTION, PALETTE, Selection, TidySlice, WORLD};
use crate::error::AppError;
use crate::report::{FatalityReport, fatality};
use crate::reshape::{ColorMap, reshape};

/// Fixed checkbox groups, in display order.
pub const CHECKBOX_GROUPS: [[&str; 3]; 2] = [[WORLD, "China", "US"], ["United Kingdom", "Italy", "India"]];

/// Free-choice country dropdowns.
pub const DROPDOWN_COUNT: usize = 3;

/// Raw widget values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    checked: BTreeSet<String>,
    dropdowns: [String; DROPDOWN_COUNT],
    pub mode: Mode,
}

impl Default for Controls {
    /// `World` and `United Kingdom` checked, dropdowns empty, normalized mode.
    fn default() -> Self {
        Self {
            checked: [CHECKBOX_GROUPS[0][0], CHECKBOX_GROUPS[1][0]]
                .into_iter()
                .map(str::to_string)
                .collect(),
            dropdowns: std::array::from_fn(|_| NO_SELECTION.to_string()),
            mode: Mode::Normalized,
        }
    }
}

impl Controls {
    pub fn is_checked(&self, label: &str) -> bool {
        self.checked.contains(label)
    }

    pub fn dropdowns(&self) -> &[String; DROPDOWN_COUNT] {
        &self.dropdowns
    }

    /// Checkbox picks in display order, then dropdown picks, deduplicated.
    pub fn selection(&self) -> Selection {
        let boxes = CHECKBOX_GROUPS
            .iter()
            .flatten()
            .filter(|label| self.checked.contains(**label))
            .map(|label| label.to_string());
        let drops = self.dropdowns.iter().cloned();
        Selection::new(boxes.chain(drops), self.mode)
    }
}

/// One widget event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlChange {
    ToggleCheckbox(String),
    SetDropdown { slot: usize, country: String },
    SetMode(Mode),
    ToggleMode,
}

pub struct DashboardState {
    table: CountryTable,
    population: PopulationReference,
    dropdown_options: Vec<String>,
    controls: Controls,
    colors: ColorMap,
    brush: Option<(NaiveDate, NaiveDate)>,
    slice: TidySlice,
    report: FatalityReport,
}

impl DashboardState {
    /// Build the initial dashboard from default controls.
    pub fn new(table: CountryTable, population: PopulationReference) -> Result<Self, AppError> {
        Self::with_controls(table, population, Controls::default())
    }

    pub fn with_controls(
        table: CountryTable,
        population: PopulationReference,
        controls: Controls,
    ) -> Result<Self, AppError> {
        let dropdown_options = dropdown_options(&table);
        let mut state = Self {
            table,
            population,
            dropdown_options,
            controls,
            colors: ColorMap::new(),
            brush: None,
            slice: TidySlice::default(),
            report: FatalityReport {
                period: crate::report::Period::Full,
                entries: Vec::new(),
            },
        };
        state.refresh()?;
        Ok(state)
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    pub fn slice(&self) -> &TidySlice {
        &self.slice
    }

    pub fn report(&self) -> &FatalityReport {
        &self.report
    }

    /// Active brush as an inclusive date range.
    pub fn brush(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.brush
    }

    pub fn dropdown_options(&self) -> &[String] {
        &self.dropdown_options
    }

    /// Apply a control change and recompute the slice and report.
    ///
    /// On error the controls are restored, so the state stays consistent.
    pub fn apply(&mut self, change: ControlChange) -> Result<(), AppError> {
        let previous = self.controls.clone();
        self.update_controls(change)?;
        if let Err(err) = self.refresh() {
            self.controls = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Restrict the fatality report to `[from, to]`. The range is kept, not
    /// the row indices, so later refreshes re-apply it to the new slice.
    ///
    /// Returns the number of slice rows inside the range; with none the report
    /// covers the full period.
    pub fn set_brush(&mut self, from: NaiveDate, to: NaiveDate) -> usize {
        self.brush = Some((from, to));
        self.report = brushed_fatality(&self.slice, self.brush);
        self.slice.indices_between(from, to).len()
    }

    pub fn clear_brush(&mut self) {
        self.brush = None;
        self.report = brushed_fatality(&self.slice, None);
    }

    fn update_controls(&mut self, change: ControlChange) -> Result<(), AppError> {
        match change {
            ControlChange::ToggleCheckbox(label) => {
                if !CHECKBOX_GROUPS.iter().flatten().any(|l| *l == label) {
                    return Err(AppError::usage(format!("'{label}' is not a checkbox.")));
                }
                if !self.controls.checked.remove(&label) {
                    self.controls.checked.insert(label);
                }
            }
            ControlChange::SetDropdown { slot, country } => {
                if slot >= DROPDOWN_COUNT {
                    return Err(AppError::usage(format!(
                        "Dropdown {} does not exist (1-{DROPDOWN_COUNT}).",
                        slot + 1
                    )));
                }
                if !self.dropdown_options.contains(&country) {
                    return Err(AppError::usage(format!("'{country}' is not a dropdown option.")));
                }
                self.controls.dropdowns[slot] = country;
            }
            ControlChange::SetMode(mode) => self.controls.mode = mode,
            ControlChange::ToggleMode => self.controls.mode = self.controls.mode.toggled(),
        }
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), AppError> {
        let selection = self.controls.selection();
        let colors = assign_colors(&self.colors, selection.countries())?;
        let slice = reshape(&self.table, &selection, &colors, &self.population)?;

        self.report = brushed_fatality(&slice, self.brush);
        self.colors = colors;
        self.slice = slice;

        log::debug!(
            "dashboard refreshed: {:?} ({}), {} rows",
            selection.countries(),
            selection.mode.display_name(),
            self.slice.len()
        );
        Ok(())
    }
}

fn brushed_fatality(slice: &TidySlice, brush: Option<(NaiveDate, NaiveDate)>) -> FatalityReport {
    let rows = brush.map(|(from, to)| slice.indices_between(from, to));
    fatality(slice, rows.as_deref())
}

/// `No selection` first, then every stored country except the checkbox ones.
pub fn dropdown_options(table: &CountryTable) -> Vec<String> {
    let fixed: Vec<&str> = CHECKBOX_GROUPS.iter().flatten().copied().collect();
    std::iter::once(NO_SELECTION.to_string())
        .chain(
            table
                .countries()
                .into_iter()
                .filter(|c| *c != NO_SELECTION && !fixed.contains(c))
                .map(str::to_string),
        )
        .collect()
}

/// Colors for `selected`: countries that stay selected keep their color, new
/// ones take the first palette entries not already in use.
pub fn assign_colors(previous: &ColorMap, selected: &[String]) -> Result<ColorMap, AppError> {
    let mut out = ColorMap::new();
    for country in selected {
        if let Some(color) = previous.get(country) {
            out.insert(country.clone(), color.clone());
        }
    }
    for country in selected {
        if out.contains_key(country) {
            continue;
        }
        let free = PALETTE
            .iter()
            .find(|p| !out.values().any(|used| used == **p))
            .ok_or_else(|| {
                AppError::data(format!(
                    "Color palette exhausted ({} colors) while adding '{country}'.",
                    PALETTE.len()
                ))
            })?;
        out.insert(country.clone(), free.to_string());
    }
    Ok(out)
}
