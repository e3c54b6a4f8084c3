use crate::schema::{FilteredMovement, ReportSummary};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Per-vehicle totals for a single metric, in the order the matching chart
/// presents them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleTotals {
    pub entries: Vec<(String, f64)>,
}

impl VehicleTotals {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cumulative balance per vehicle over the report window.
///
/// `dates` is the sorted set of distinct movement dates; each series is
/// aligned to it, missing (date, vehicle) combinations contributing 0, with
/// a running sum taken along the date axis. The series measures growth of
/// balance over the window, not raw balance on a given day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceHistory {
    pub dates: Vec<NaiveDate>,
    pub series: BTreeMap<String, Vec<f64>>,
}

impl BalanceHistory {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.series.is_empty()
    }

    /// Display copy of the series, smoothed with a centered 3-point moving
    /// average. Window positions past the ends contribute 0, so edge points
    /// are still divided by 3. Never feeds back into totals.
    pub fn smoothed(&self) -> BTreeMap<String, Vec<f64>> {
        self.series
            .iter()
            .map(|(vehicle, values)| (vehicle.clone(), moving_average_3(values)))
            .collect()
    }
}

/// Scalar totals over the filtered dataset. Vacuous sums are 0.
pub fn summarize(rows: &[FilteredMovement]) -> ReportSummary {
    ReportSummary {
        record_count: rows.len(),
        total_delivered: rows.iter().map(|r| r.delivery_amount).sum(),
        total_savings: rows.iter().map(|r| r.savings_amount).sum(),
        total_expenses: rows.iter().map(|r| r.expense_amount).sum(),
        total_balance: rows.iter().map(|r| r.balance_amount).sum(),
    }
}

/// Total savings per vehicle, vehicle order, keeping only strictly
/// positive sums. Vehicles whose savings net to zero or less never reach
/// the savings chart.
pub fn savings_by_vehicle(rows: &[FilteredMovement]) -> VehicleTotals {
    let mut totals = group_sums(rows, |r| r.savings_amount);
    totals.retain(|_, total| *total > 0.0);
    VehicleTotals {
        entries: totals.into_iter().collect(),
    }
}

/// Total expense per vehicle, all vehicles, sorted descending.
pub fn expenses_by_vehicle(rows: &[FilteredMovement]) -> VehicleTotals {
    descending(group_sums(rows, |r| r.expense_amount))
}

/// Total delivery per vehicle, all vehicles, sorted descending.
pub fn deliveries_by_vehicle(rows: &[FilteredMovement]) -> VehicleTotals {
    descending(group_sums(rows, |r| r.delivery_amount))
}

/// Groups by (date, vehicle), sums balance, fills missing combinations
/// with 0 and takes the running cumulative sum per vehicle along the date
/// axis.
pub fn balance_history(rows: &[FilteredMovement]) -> BalanceHistory {
    let mut per_date: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
    for row in rows {
        *per_date
            .entry((row.date, row.vehicle.clone()))
            .or_insert(0.0) += row.balance_amount;
    }

    let mut dates: Vec<NaiveDate> = per_date.keys().map(|(date, _)| *date).collect();
    dates.sort();
    dates.dedup();

    let vehicles: Vec<String> = {
        let mut v: Vec<String> = per_date.keys().map(|(_, vehicle)| vehicle.clone()).collect();
        v.sort();
        v.dedup();
        v
    };

    let mut series = BTreeMap::new();
    for vehicle in vehicles {
        let mut running = 0.0;
        let values: Vec<f64> = dates
            .iter()
            .map(|date| {
                running += per_date
                    .get(&(*date, vehicle.clone()))
                    .copied()
                    .unwrap_or(0.0);
                running
            })
            .collect();
        series.insert(vehicle, values);
    }

    BalanceHistory { dates, series }
}

fn group_sums<F>(rows: &[FilteredMovement], metric: F) -> BTreeMap<String, f64>
where
    F: Fn(&FilteredMovement) -> f64,
{
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.vehicle.clone()).or_insert(0.0) += metric(row);
    }
    totals
}

fn descending(totals: BTreeMap<String, f64>) -> VehicleTotals {
    let mut entries: Vec<(String, f64)> = totals.into_iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    VehicleTotals { entries }
}

/// Centered moving average of window 3 with zero padding outside the
/// series, matching a same-length convolution against [1/3, 1/3, 1/3].
pub fn moving_average_3(values: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let prev = if i > 0 { values[i - 1] } else { 0.0 };
            let next = values.get(i + 1).copied().unwrap_or(0.0);
            (prev + values[i] + next) / 3.0
        })
        .collect()
}
