use std::fmt::Write;

use weatherfast_core::{ForecastBundle, TemperatureUnit, display};

/// Plain-text rendering of a bundle: current panel, hourly strip, daily list.
pub fn render_forecast(bundle: &ForecastBundle, title: &str, unit: TemperatureUnit) -> String {
    let offset = bundle.utc_offset();
    let mut out = String::new();

    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));

    let panel = display::current_panel(&bundle.current, offset, unit);
    let width = panel.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in &panel {
        let _ = writeln!(out, "{label:<width$}  {value}");
    }

    let upcoming = bundle.upcoming_hourly();
    let _ = writeln!(out, "\nHOURLY FORECAST");
    if upcoming.is_empty() {
        let _ = writeln!(out, "  (no upcoming hours)");
    }
    for row in display::hourly_rows(&upcoming, offset, unit) {
        let _ = writeln!(out, "  {:>4}  {:<16} {:>5}", row.time_label, row.icon, row.temperature);
    }

    let _ = writeln!(out, "\n10-DAY FORECAST");
    for row in display::daily_rows(&bundle.daily, unit) {
        let _ = writeln!(
            out,
            "  {:<4} {:<16} Min: {:>5}  Max: {:>5}",
            row.weekday, row.icon, row.low, row.high
        );
    }

    out
}
