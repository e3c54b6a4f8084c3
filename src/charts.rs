use crate::aggregate::{BalanceHistory, VehicleTotals};
use crate::error::{ReportError, Result};
use crate::utils::{display_date, thousands};
use log::{debug, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontDesc, FontTransform, IntoFont};
use std::path::{Path, PathBuf};

pub const BALANCE_TREND_FILE: &str = "balance_trend.png";
pub const SAVINGS_FILE: &str = "savings_by_vehicle.png";
pub const EXPENSES_FILE: &str = "expenses_by_vehicle.png";
pub const DELIVERIES_FILE: &str = "deliveries_by_vehicle.png";

/// Raster size shared by all four charts (wide 3:1 panels).
const CHART_SIZE: (u32, u32) = (1350, 450);
const FONT: &str = "sans-serif";

/// The four transient chart artifacts of one report invocation. The paths
/// live inside the invocation's working directory and are regenerated on
/// every run; nothing is cached between invocations.
#[derive(Debug, Clone)]
pub struct ChartSet {
    pub balance_trend: PathBuf,
    pub savings: PathBuf,
    pub expenses: PathBuf,
    pub deliveries: PathBuf,
}

impl ChartSet {
    pub fn new(dir: &Path) -> Self {
        ChartSet {
            balance_trend: dir.join(BALANCE_TREND_FILE),
            savings: dir.join(SAVINGS_FILE),
            expenses: dir.join(EXPENSES_FILE),
            deliveries: dir.join(DELIVERIES_FILE),
        }
    }

    /// Chart paths in document order.
    pub fn in_order(&self) -> [&Path; 4] {
        [
            &self.balance_trend,
            &self.savings,
            &self.expenses,
            &self.deliveries,
        ]
    }
}

/// Renders the four chart artifacts into `dir`.
///
/// Empty aggregates produce no file, and a per-chart backend failure is
/// downgraded to a warning: the document layer substitutes its placeholder
/// line for any missing PNG, so one bad chart never aborts the report.
pub fn render_charts(
    history: &BalanceHistory,
    savings: &VehicleTotals,
    expenses: &VehicleTotals,
    deliveries: &VehicleTotals,
    dir: &Path,
) -> ChartSet {
    let set = ChartSet::new(dir);
    log_outcome(&set.balance_trend, render_balance_trend(history, &set.balance_trend));
    log_outcome(
        &set.savings,
        render_bar_chart("Ahorro por Vehículo", savings, BLUE, &set.savings),
    );
    log_outcome(
        &set.expenses,
        render_bar_chart("Gastos por Taxi", expenses, RED, &set.expenses),
    );
    log_outcome(
        &set.deliveries,
        render_bar_chart("Entregas por Taxi", deliveries, GREEN, &set.deliveries),
    );
    set
}

fn log_outcome(path: &Path, outcome: Result<bool>) {
    match outcome {
        Ok(true) => debug!("rendered chart {}", path.display()),
        Ok(false) => debug!("no data for chart {}, skipping", path.display()),
        Err(e) => warn!("chart {} failed to render: {}", path.display(), e),
    }
}

/// One cumulative, smoothed balance line per vehicle over the window.
/// Returns false (writing no file) when the history is empty.
fn render_balance_trend(history: &BalanceHistory, path: &Path) -> Result<bool> {
    if history.is_empty() {
        return Ok(false);
    }

    let smoothed = history.smoothed();
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for value in smoothed.values().flatten() {
        y_min = y_min.min(*value);
        y_max = y_max.max(*value);
    }
    let pad = ((y_max - y_min).abs()).max(1.0) * 0.1;
    let x_max = (history.dates.len().saturating_sub(1)).max(1) as f64;

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Balance Acumulado", (FONT, 24))
        .margin(12)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(0f64..x_max, (y_min - pad)..(y_max + pad))
        .map_err(chart_err)?;

    let dates = history.dates.clone();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Fecha")
        .y_desc("COP")
        .x_labels(dates.len().min(10))
        .x_label_formatter(&|x| {
            dates
                .get(x.round() as usize)
                .map(|d| display_date(*d))
                .unwrap_or_default()
        })
        .y_label_formatter(&|y| thousands(*y))
        .x_label_style(category_label_font())
        .y_label_style((FONT, 13))
        .draw()
        .map_err(chart_err)?;

    for (idx, (vehicle, values)) in smoothed.iter().enumerate() {
        let color = Palette99::pick(idx).mix(0.9);
        chart
            .draw_series(LineSeries::new(
                values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                color.stroke_width(2),
            ))
            .map_err(chart_err)?
            .label(vehicle.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font((FONT, 12))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.4))
        .draw()
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(true)
}

/// Annotated vertical bars, one per vehicle, in the order the aggregate
/// supplies. Returns false (writing no file) when there are no entries.
fn render_bar_chart(
    title: &str,
    totals: &VehicleTotals,
    color: RGBColor,
    path: &Path,
) -> Result<bool> {
    if totals.is_empty() {
        return Ok(false);
    }

    let n = totals.entries.len();
    let max = totals
        .entries
        .iter()
        .map(|(_, v)| *v)
        .fold(0.0f64, f64::max);
    let labels: Vec<String> = totals.entries.iter().map(|(v, _)| v.clone()).collect();

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    // Bars are centered on integer x positions so the axis ticks (and
    // their rotated labels) line up under the bars.
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 24))
        .margin(12)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5f64..n as f64 - 0.5, 0f64..(max * 1.15).max(1.0))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .y_desc("COP")
        .x_labels(n)
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_label_formatter(&|y| thousands(*y))
        .x_label_style(category_label_font())
        .y_label_style((FONT, 13))
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(totals.entries.iter().enumerate().map(|(i, (_, v))| {
            Rectangle::new(
                [(i as f64 - 0.3, 0.0), (i as f64 + 0.3, *v)],
                color.mix(0.8).filled(),
            )
        }))
        .map_err(chart_err)?;

    let annotation = (FONT, 12)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(totals.entries.iter().enumerate().map(|(i, (_, v))| {
            Text::new(thousands(*v), (i as f64, *v), annotation.clone())
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(true)
}

/// Maps an axis tick position to its bar's category label. Bars sit on
/// integer positions; ticks falling between bars get no label.
fn category_label(labels: &[String], x: f64) -> String {
    let nearest = x.round();
    if nearest < 0.0 || (x - nearest).abs() > 0.25 {
        return String::new();
    }
    labels.get(nearest as usize).cloned().unwrap_or_default()
}

/// Category labels share one look across all charts: small sans-serif,
/// rotated 45 degrees.
fn category_label_font() -> FontDesc<'static> {
    (FONT, 13)
        .into_font()
        .transform(FontTransform::RotateAngle(45.0))
}

fn chart_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Chart(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{balance_history, savings_by_vehicle};

    #[test]
    fn test_chart_set_paths_are_dir_scoped() {
        let set = ChartSet::new(Path::new("/tmp/work"));
        assert_eq!(set.balance_trend, Path::new("/tmp/work/balance_trend.png"));
        assert_eq!(
            set.in_order()[3],
            Path::new("/tmp/work/deliveries_by_vehicle.png")
        );
    }

    #[test]
    fn test_category_label_centers_under_bars() {
        let labels = vec!["A1".to_string(), "B2".to_string(), "C3".to_string()];
        // Bars sit on integer positions, so integer ticks map to labels.
        assert_eq!(category_label(&labels, 0.0), "A1");
        assert_eq!(category_label(&labels, 2.0), "C3");
        assert_eq!(category_label(&labels, 1.1), "B2");
        // Ticks between bars or outside the range stay blank.
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -0.5), "");
        assert_eq!(category_label(&labels, 3.0), "");
    }

    #[test]
    fn test_empty_aggregates_produce_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let history = balance_history(&[]);
        let empty = savings_by_vehicle(&[]);
        let set = render_charts(&history, &empty, &empty, &empty, dir.path());
        for path in set.in_order() {
            assert!(!path.exists());
        }
    }
}
