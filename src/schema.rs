use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One unnormalized ledger row, exactly as the upstream workspace emits it.
///
/// Every field arrives as free text; the monetary columns may carry a
/// currency code, thousands separators, or nothing at all. Field names bind
/// to the upstream Spanish vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMovement {
    #[serde(
        rename = "Fecha de Movimiento",
        alias = "Fecha",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    #[serde(rename = "Vehiculo", default)]
    pub vehicle: Option<String>,

    #[serde(rename = "Entrega", default)]
    pub delivery: Option<String>,

    #[serde(rename = "Ahorro", default)]
    pub savings: Option<String>,

    #[serde(rename = "Factura/Gasto", default)]
    pub expense: Option<String>,

    #[serde(rename = "Balance", default)]
    pub balance: Option<String>,

    #[serde(rename = "Propietario", default)]
    pub owner: Option<String>,

    #[serde(rename = "Comprobante", default)]
    pub receipt: Option<String>,
}

/// A normalized movement: typed date, reduced vehicle token, coerced
/// currency amounts. `balance_amount` is taken verbatim from the ledger and
/// is never recomputed from the other three amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub vehicle: String,
    pub delivery_amount: f64,
    pub savings_amount: f64,
    pub expense_amount: f64,
    pub balance_amount: f64,
    pub owner: String,
    pub receipt: String,
}

/// A movement after filtering, with the owner and receipt columns dropped.
/// This is the shape the report table renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredMovement {
    pub date: NaiveDate,
    pub vehicle: String,
    pub delivery_amount: f64,
    pub savings_amount: f64,
    pub expense_amount: f64,
    pub balance_amount: f64,
}

impl From<&Movement> for FilteredMovement {
    fn from(m: &Movement) -> Self {
        FilteredMovement {
            date: m.date,
            vehicle: m.vehicle.clone(),
            delivery_amount: m.delivery_amount,
            savings_amount: m.savings_amount,
            expense_amount: m.expense_amount,
            balance_amount: m.balance_amount,
        }
    }
}

/// Parameters of one report invocation. The window is inclusive on both
/// ends; `start_date <= end_date` is assumed, not validated. Owner matching
/// is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub owner: String,
}

impl ReportRequest {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, owner: impl Into<String>) -> Self {
        ReportRequest {
            start_date,
            end_date,
            owner: owner.into(),
        }
    }

    /// Builds a request from the ISO-8601 date strings the glue layer
    /// supplies.
    pub fn parse(start_date: &str, end_date: &str, owner: &str) -> Result<Self> {
        let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").map_err(|_| {
            ReportError::Date {
                value: start_date.to_string(),
            }
        })?;
        let end =
            NaiveDate::parse_from_str(end_date, "%Y-%m-%d").map_err(|_| ReportError::Date {
                value: end_date.to_string(),
            })?;
        Ok(ReportRequest::new(start, end, owner))
    }
}

/// Scalar totals over a filtered dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub record_count: usize,
    pub total_delivered: f64,
    pub total_savings: f64,
    pub total_expenses: f64,
    pub total_balance: f64,
}
