//! ASCII plotting of one tidy-slice column for terminal output.
//!
//! Fixed-size grid, deterministic output. Every country gets its own glyph
//! (in slice order); consecutive defined points are joined with that glyph and
//! gaps in the series are left open.

use chrono::NaiveDate;

use crate::domain::{Metric, TidyColumn, TidySlice};

/// Glyph per country, in the order countries appear in the slice.
const GLYPHS: [char; 9] = ['o', 'x', '+', '*', '#', '@', '%', '&', '='];

/// Tidy column plotted for a stored metric.
pub fn column_for_metric(metric: Metric) -> TidyColumn {
    match metric {
        Metric::Raw => TidyColumn::Value,
        Metric::Daily => TidyColumn::ValueDaily,
        Metric::Death => TidyColumn::ValueDead,
        Metric::DeathDaily => TidyColumn::ValueDailyDead,
    }
}

/// Render `column` of every country in `slice`, followed by a legend.
pub fn render_slice_plot(slice: &TidySlice, column: TidyColumn, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((d_min, d_max)) = date_range(slice) else {
        return format!("Plot: {} | no data\n", column.name());
    };
    let (y_min, y_max) = y_range(slice, column).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let countries = slice.countries();
    let colors = slice.colors();

    for (i, country) in countries.iter().enumerate() {
        let glyph = GLYPHS[i % GLYPHS.len()];
        let mut prev: Option<(usize, usize)> = None;
        for row in slice.rows().iter().filter(|r| r.country == *country) {
            let Some(v) = row.get(column) else {
                prev = None;
                continue;
            };
            let x = map_x(row.date, d_min, d_max, width);
            let y = map_y(v, y_min, y_max, height);
            match prev {
                Some((x0, y0)) => draw_line(&mut grid, x0, y0, x, y, glyph),
                None => grid[y][x] = glyph,
            }
            prev = Some((x, y));
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} | dates=[{d_min}, {d_max}] | y=[{y_min:.2}, {y_max:.2}]\n",
        column.name()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    for (i, country) in countries.iter().enumerate() {
        let glyph = GLYPHS[i % GLYPHS.len()];
        match colors.get(*country) {
            Some(color) => out.push_str(&format!("  {glyph} {country} ({color})\n")),
            None => out.push_str(&format!("  {glyph} {country}\n")),
        }
    }
    out
}

fn date_range(slice: &TidySlice) -> Option<(NaiveDate, NaiveDate)> {
    let min = slice.rows().iter().map(|r| r.date).min()?;
    let max = slice.rows().iter().map(|r| r.date).max()?;
    Some((min, max))
}

fn y_range(slice: &TidySlice, column: TidyColumn) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for v in slice.rows().iter().filter_map(|r| r.get(column)) {
        min_y = min_y.min(v);
        max_y = max_y.max(v);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(d: NaiveDate, d_min: NaiveDate, d_max: NaiveDate, width: usize) -> usize {
    let span = (d_max - d_min).num_days();
    if span <= 0 {
        return 0;
    }
    let u = ((d - d_min).num_days() as f64 / span as f64).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham). Only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TidyRow;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let mut rows = vec![
            TidyRow::new(day(1), "A").with(TidyColumn::Value, Some(1.0)),
            TidyRow::new(day(10), "A").with(TidyColumn::Value, Some(11.0)),
        ];
        for row in rows.iter_mut() {
            row.color = Some("#1f77b4".to_string());
        }
        let slice = TidySlice::new(rows, vec![TidyColumn::Value]);

        let txt = render_slice_plot(&slice, TidyColumn::Value, 10, 5);
        let expected = concat!(
            "Plot: value | dates=[2020-03-01, 2020-03-10] | y=[0.50, 11.50]\n",
            "        oo\n",
            "      oo  \n",
            "    oo    \n",
            "  oo      \n",
            "oo        \n",
            "  o A (#1f77b4)\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn countries_get_distinct_glyphs_and_gaps_stay_open() {
        let rows = vec![
            TidyRow::new(day(1), "A").with(TidyColumn::ValueDaily, Some(1.0)),
            TidyRow::new(day(2), "A"),
            TidyRow::new(day(3), "A").with(TidyColumn::ValueDaily, Some(1.0)),
            TidyRow::new(day(1), "B").with(TidyColumn::ValueDaily, Some(3.0)),
            TidyRow::new(day(3), "B").with(TidyColumn::ValueDaily, Some(3.0)),
        ];
        let slice = TidySlice::new(rows, vec![TidyColumn::ValueDaily]);
        let txt = render_slice_plot(&slice, TidyColumn::ValueDaily, 11, 5);
        let lines: Vec<&str> = txt.lines().collect();

        // B is a solid line on top, A two isolated points at the bottom.
        assert_eq!(lines[1], "xxxxxxxxxxx");
        assert_eq!(lines[5], "o         o");
        assert!(lines.contains(&"  x B"));
    }

    #[test]
    fn empty_slice_has_no_data() {
        let txt = render_slice_plot(&TidySlice::default(), TidyColumn::Value, 20, 5);
        assert_eq!(txt, "Plot: value | no data\n");
    }
}
