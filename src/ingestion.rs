use crate::error::{ReportError, Result};
use crate::schema::{Movement, RawMovement};
use chrono::NaiveDate;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Currency code stripped from monetary cells before numeric coercion.
const CURRENCY_CODE: &str = "COP";

/// Formats accepted for the movement date, day-first variants before the
/// ISO form the upstream workspace emits.
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

/// Coerces a raw monetary cell to a float.
///
/// Strips the literal currency code, thousands-separator commas and spaces.
/// An empty cell (or one that is empty after stripping) is 0.0. Anything
/// with non-numeric residue left over is a fatal parse failure; no per-row
/// recovery happens downstream. Idempotent over already-clean numerals.
pub fn clean_currency(field: &str, value: &str) -> Result<f64> {
    let stripped: String = value
        .replace(CURRENCY_CODE, "")
        .replace(',', "")
        .replace(' ', "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        return Ok(0.0);
    }
    stripped.parse::<f64>().map_err(|_| ReportError::Currency {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Reduces a raw vehicle label to its leading word-characters run, the
/// `^\w+` token. Word characters are Unicode alphanumerics plus the
/// underscore. Suffixes and annotations after the first non-word character
/// are discarded; a label with no leading word character normalizes to the
/// empty string.
pub fn leading_token(value: &str) -> String {
    value
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Parses a movement date, day-first. Unparseable dates abort the whole
/// pipeline.
pub fn parse_movement_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(ReportError::Date {
        value: value.to_string(),
    })
}

/// Normalizes raw ledger rows into typed movements.
///
/// Pure transform: the caller's rows are only borrowed, never mutated.
/// Missing text fields are treated as empty strings and missing monetary
/// fields coerce to 0.0; a missing movement date fails fast naming the
/// field.
pub fn normalize(rows: &[RawMovement]) -> Result<Vec<Movement>> {
    rows.iter().map(normalize_row).collect()
}

fn normalize_row(raw: &RawMovement) -> Result<Movement> {
    let date_text = raw
        .date
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ReportError::MissingField {
            field: "Fecha de Movimiento".to_string(),
        })?;

    Ok(Movement {
        date: parse_movement_date(date_text)?,
        vehicle: leading_token(raw.vehicle.as_deref().unwrap_or("")),
        delivery_amount: clean_currency("Entrega", raw.delivery.as_deref().unwrap_or(""))?,
        savings_amount: clean_currency("Ahorro", raw.savings.as_deref().unwrap_or(""))?,
        expense_amount: clean_currency("Factura/Gasto", raw.expense.as_deref().unwrap_or(""))?,
        balance_amount: clean_currency("Balance", raw.balance.as_deref().unwrap_or(""))?,
        owner: raw.owner.clone().unwrap_or_default(),
        receipt: raw.receipt.clone().unwrap_or_default(),
    })
}

/// Reads raw movements from a headed CSV file.
pub fn read_movements_csv(path: impl AsRef<Path>) -> Result<Vec<RawMovement>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: RawMovement = record?;
        rows.push(row);
    }
    Ok(rows)
}

/// Reads raw movements from a JSON array, the shape the workspace API glue
/// hands over.
pub fn read_movements_json(path: impl AsRef<Path>) -> Result<Vec<RawMovement>> {
    let file = File::open(path.as_ref())?;
    let rows: Vec<RawMovement> = serde_json::from_reader(BufReader::new(file))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_currency_strips_code_commas_and_spaces() {
        assert_eq!(clean_currency("Entrega", "COP 1,000").unwrap(), 1000.0);
        assert_eq!(clean_currency("Entrega", "COP 1,234,567").unwrap(), 1234567.0);
        assert_eq!(clean_currency("Entrega", " 95000 ").unwrap(), 95000.0);
    }

    #[test]
    fn test_clean_currency_empty_is_zero() {
        assert_eq!(clean_currency("Ahorro", "").unwrap(), 0.0);
        assert_eq!(clean_currency("Ahorro", "COP  ").unwrap(), 0.0);
    }

    #[test]
    fn test_clean_currency_idempotent() {
        let once = clean_currency("Balance", "COP 172,000").unwrap();
        let twice = clean_currency("Balance", &once.to_string()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_clean_currency_residue_is_fatal() {
        let err = clean_currency("Entrega", "COP 1,000 aprox").unwrap_err();
        assert!(matches!(err, crate::error::ReportError::Currency { .. }));
    }

    #[test]
    fn test_clean_currency_negative_and_decimal() {
        assert_eq!(clean_currency("Balance", "-5,000").unwrap(), -5000.0);
        assert_eq!(clean_currency("Balance", "COP 12.5").unwrap(), 12.5);
    }

    #[test]
    fn test_leading_token() {
        assert_eq!(leading_token("T45-extra"), "T45");
        assert_eq!(leading_token("ABC123"), "ABC123");
        assert_eq!(leading_token("TX_9 (vendido)"), "TX_9");
        assert_eq!(leading_token("  ABC"), "");
        assert_eq!(leading_token(""), "");
    }

    #[test]
    fn test_leading_token_keeps_unicode_word_characters() {
        assert_eq!(leading_token("Ñ123"), "Ñ123");
        assert_eq!(leading_token("Ñ123 (reserva)"), "Ñ123");
    }

    #[test]
    fn test_parse_movement_date_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_movement_date("05/01/2024").unwrap(), expected);
        assert_eq!(parse_movement_date("05-01-2024").unwrap(), expected);
        assert_eq!(parse_movement_date("2024-01-05").unwrap(), expected);
    }

    #[test]
    fn test_parse_movement_date_failure_is_fatal() {
        let err = parse_movement_date("sometime in January").unwrap_err();
        assert!(matches!(err, crate::error::ReportError::Date { .. }));
    }

    #[test]
    fn test_normalize_does_not_touch_input() {
        let rows = vec![RawMovement {
            date: Some("2024-01-01".to_string()),
            vehicle: Some("T45-extra".to_string()),
            delivery: Some("COP 100,000".to_string()),
            owner: Some("Carlos".to_string()),
            ..RawMovement::default()
        }];
        let before = format!("{:?}", rows);
        let movements = normalize(&rows).unwrap();
        assert_eq!(format!("{:?}", rows), before);

        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].vehicle, "T45");
        assert_eq!(movements[0].delivery_amount, 100000.0);
        assert_eq!(movements[0].savings_amount, 0.0);
        assert_eq!(movements[0].receipt, "");
    }

    #[test]
    fn test_read_movements_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(
            &path,
            r#"[{"Fecha de Movimiento": "2024-01-01", "Vehiculo": "ABC123", "Propietario": "Carlos"}]"#,
        )
        .unwrap();
        let rows = read_movements_json(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vehicle.as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_normalize_requires_date() {
        let rows = vec![RawMovement::default()];
        let err = normalize(&rows).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReportError::MissingField { .. }
        ));
    }
}
