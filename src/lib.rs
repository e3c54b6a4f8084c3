//! # Vehicle Report
//!
//! A library for converting a tabular ledger of vehicle-related financial
//! movements (deliveries, savings, expenses, running balance) into a
//! filtered, aggregated PDF report for one owner and date range.
//!
//! ## Pipeline
//!
//! Five sequential stages, data flowing strictly forward:
//!
//! 1. **Ingestion & normalization**: raw string rows become typed
//!    [`Movement`]s with day-first dates, coerced currency amounts and
//!    vehicle labels reduced to their leading token.
//! 2. **Filtering**: inclusive date window plus exact owner match.
//! 3. **Aggregation**: scalar totals, per-vehicle sums and a cumulative
//!    balance history.
//! 4. **Chart rendering**: four raster charts in a request-scoped
//!    temporary directory.
//! 5. **Document assembly**: header, metrics, embedded charts and the
//!    full data table, written to a deterministic filename.
//!
//! The pipeline is synchronous and owns its transient chart files: they
//! live in a per-invocation temp directory that is released on every exit
//! path, so concurrent invocations never race on chart names.
//!
//! ## Example
//!
//! ```rust,ignore
//! use vehicle_report::{ReportGenerator, ReportRequest};
//!
//! let rows = vehicle_report::read_movements_csv("ledger.csv")?;
//! let request = ReportRequest::parse("2024-01-01", "2024-01-31", "Carlos")?;
//! let pdf = ReportGenerator::generate(&rows, &request, "out".as_ref())?;
//! println!("report written to {}", pdf.display());
//! ```

pub mod aggregate;
pub mod charts;
pub mod document;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod schema;
pub mod utils;

pub use aggregate::{
    balance_history, deliveries_by_vehicle, expenses_by_vehicle, savings_by_vehicle, summarize,
    BalanceHistory, VehicleTotals,
};
pub use charts::{render_charts, ChartSet};
pub use document::{assemble_report, Align, ReportDocument};
pub use error::{ReportError, Result};
pub use filter::filter_movements;
pub use ingestion::{
    clean_currency, leading_token, normalize, parse_movement_date, read_movements_csv,
    read_movements_json,
};
pub use schema::{FilteredMovement, Movement, RawMovement, ReportRequest, ReportSummary};
pub use utils::report_file_name;

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

pub struct ReportGenerator;

impl ReportGenerator {
    /// Runs the whole pipeline over in-memory ledger rows and writes the
    /// PDF into `output_dir`, returning its path.
    ///
    /// The filename is a pure function of (owner, start date). An empty
    /// filtered result still produces a report: zero totals, placeholder
    /// chart sections and a note instead of the table.
    pub fn generate(
        rows: &[RawMovement],
        request: &ReportRequest,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        info!(
            "generating report for owner {:?}, window {} - {}",
            request.owner, request.start_date, request.end_date
        );

        let movements = ingestion::normalize(rows)?;
        let filtered = filter::filter_movements(&movements, request);
        debug!(
            "{} of {} movements match the filter",
            filtered.len(),
            movements.len()
        );

        let summary = aggregate::summarize(&filtered);
        let history = aggregate::balance_history(&filtered);
        let savings = aggregate::savings_by_vehicle(&filtered);
        let expenses = aggregate::expenses_by_vehicle(&filtered);
        let deliveries = aggregate::deliveries_by_vehicle(&filtered);

        // Request-scoped chart directory; dropped (and deleted) on every
        // exit path below.
        let chart_dir = tempfile::tempdir()?;
        let charts = charts::render_charts(
            &history,
            &savings,
            &expenses,
            &deliveries,
            chart_dir.path(),
        );

        fs::create_dir_all(output_dir)?;
        let output_path =
            output_dir.join(utils::report_file_name(&request.owner, request.start_date));
        document::assemble_report(request, &summary, &charts, &filtered, &output_path)?;

        info!("report written to {}", output_path.display());
        Ok(output_path)
    }
}

/// Convenience entry mirroring the upstream call shape: a CSV ledger plus
/// the three scalar filter parameters.
pub fn generate_report_from_csv(
    csv_path: impl AsRef<Path>,
    start_date: &str,
    end_date: &str,
    owner: &str,
    output_dir: impl AsRef<Path>,
) -> Result<PathBuf> {
    let rows = ingestion::read_movements_csv(csv_path)?;
    let request = ReportRequest::parse(start_date, end_date, owner)?;
    ReportGenerator::generate(&rows, &request, output_dir.as_ref())
}
