use chrono::NaiveDate;
use format_num::format_num;

/// Formats a monetary value as a thousands-separated integer, the display
/// form used by the metrics section, chart labels and axis ticks.
pub fn thousands(value: f64) -> String {
    format_num!(",.0f", value)
}

/// Display form of a movement date, day/month/year.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// The report header's date-range line.
pub fn date_range_label(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", display_date(start), display_date(end))
}

/// Deterministic report filename for an (owner, start date) pair.
///
/// The owner token is collapsed to a filesystem-and-URL-safe form:
/// lowercased, diacritics folded to ascii, non-word characters dropped,
/// whitespace runs joined with underscores. Owners differing only in case
/// or diacritics intentionally collapse to the same name.
pub fn report_file_name(owner: &str, start_date: NaiveDate) -> String {
    let stem = format!("reporte_{}_{}", owner, start_date.format("%Y-%m-%d"));
    format!("{}.pdf", slug::slugify(stem).replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(180000.0), "180,000");
        assert_eq!(thousands(0.0), "0");
        assert_eq!(thousands(-5000.0), "-5,000");
        assert_eq!(thousands(1234567.0), "1,234,567");
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date(date(2024, 1, 5)), "05/01/2024");
    }

    #[test]
    fn test_date_range_label() {
        assert_eq!(
            date_range_label(date(2024, 1, 1), date(2024, 1, 31)),
            "01/01/2024 - 31/01/2024"
        );
    }

    #[test]
    fn test_report_file_name_is_deterministic() {
        let first = report_file_name("Carlos", date(2024, 1, 1));
        let second = report_file_name("Carlos", date(2024, 1, 1));
        assert_eq!(first, second);
        assert_eq!(first, "reporte_carlos_2024_01_01.pdf");
    }

    #[test]
    fn test_report_file_name_distinguishes_inputs() {
        let a = report_file_name("Carlos", date(2024, 1, 1));
        let b = report_file_name("Maria", date(2024, 1, 1));
        let c = report_file_name("Carlos", date(2024, 2, 1));
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_report_file_name_normalizes_owner() {
        assert_eq!(
            report_file_name("María  Pérez", date(2024, 1, 1)),
            "reporte_maria_perez_2024_01_01.pdf"
        );
        // Case/diacritic-only variants collapse to the same name.
        assert_eq!(
            report_file_name("MARIA PEREZ", date(2024, 1, 1)),
            report_file_name("María  Pérez", date(2024, 1, 1))
        );
    }
}
