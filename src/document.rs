use crate::charts::ChartSet;
use crate::error::{ReportError, Result};
use crate::schema::{FilteredMovement, ReportRequest, ReportSummary};
use crate::utils::{date_range_label, display_date, thousands};
use log::warn;
use printpdf::graphics::{LinePoint, PaintMode, Point, Polygon, PolygonRing, WindingOrder};
use printpdf::matrix::TextMatrix;
use printpdf::ops::Op;
use printpdf::text::TextItem;
use printpdf::xobject::{XObject, XObjectTransform};
use printpdf::{
    BuiltinFont, Layer, PdfDocument, PdfPage, PdfSaveOptions, Pt, Rgb, XObjectId,
};
use std::fs;
use std::io::BufWriter;
use std::path::Path;

// A4 geometry in points, 10mm side margins and a 15mm break margin.
const PAGE_WIDTH: f32 = 595.2756;
const PAGE_HEIGHT: f32 = 841.8898;
const MARGIN: f32 = 28.3465;
const BREAK_MARGIN: f32 = 42.5197;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

/// Width charts are scaled to on the page (180mm).
const IMAGE_WIDTH: f32 = 510.2362;

const TABLE_FONT_SIZE: f32 = 9.0;
const TABLE_LINE_HEIGHT: f32 = 11.0;
const TABLE_CELL_PADDING: f32 = 3.0;

// Average glyph advance as a fraction of the font size, close enough to
// Times for centering and cell wrapping.
const GLYPH_WIDTH_FACTOR: f32 = 0.5;

const TABLE_COLUMNS: [&str; 6] = [
    "Fecha",
    "Vehiculo",
    "Entrega",
    "Ahorro",
    "Factura/Gasto",
    "Balance",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Center,
}

/// Explicit page/layout builder over printpdf ops.
///
/// Owns the layout cursor: pages are op vectors, `cursor_y` is the current
/// top-down position in points, and every write advances it. Running past
/// the break margin opens a fresh page with the report header, so callers
/// never manipulate cursor state themselves.
pub struct ReportDocument {
    doc: PdfDocument,
    pages: Vec<Vec<Op>>,
    cursor_y: f32,
    header_range: String,
    header_owner: String,
}

impl ReportDocument {
    pub fn new(request: &ReportRequest) -> Self {
        ReportDocument {
            doc: PdfDocument::new("Reporte de Vehículos"),
            pages: Vec::new(),
            cursor_y: MARGIN,
            header_range: date_range_label(request.start_date, request.end_date),
            header_owner: request.owner.clone(),
        }
    }

    /// Opens a new page and writes the report header onto it.
    pub fn add_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor_y = MARGIN;
        self.write_line("Reporte de Vehículos", BuiltinFont::TimesBold, 16.0, Align::Center);
        self.vspace(3.0);
        let range = format!("Rango de fechas: {}", self.header_range);
        self.write_line(&range, BuiltinFont::TimesRoman, 12.0, Align::Center);
        self.vspace(3.0);
        let owner = format!("Propietario: {}", self.header_owner);
        self.write_line(&owner, BuiltinFont::TimesRoman, 10.0, Align::Left);
        self.vspace(5.0);
    }

    pub fn vspace(&mut self, height: f32) {
        self.cursor_y += height;
    }

    /// Writes one line of text and advances the cursor, breaking to a new
    /// page first when the line would not fit.
    pub fn write_line(&mut self, text: &str, font: BuiltinFont, size: f32, align: Align) {
        let line_height = size * 1.5;
        self.ensure_space(line_height);
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => (PAGE_WIDTH - estimate_width(text, size)) / 2.0,
        };
        let baseline = self.cursor_y + size;
        self.emit_text(text, font, size, x, baseline);
        self.cursor_y += line_height;
    }

    /// Places a chart image centered at the fixed report width, preserving
    /// its aspect ratio. Fails when the file is missing or undecodable;
    /// callers substitute a placeholder line in that case.
    pub fn place_image(&mut self, path: &Path) -> Result<()> {
        let bytes = fs::read(path)?;
        let mut warnings = Vec::new();
        let raw_image = printpdf::image::RawImage::decode_from_bytes(&bytes, &mut warnings)
            .map_err(|e| ReportError::Pdf(format!("failed to decode {}: {}", path.display(), e)))?;
        let (img_w, img_h) = (raw_image.width as f32, raw_image.height as f32);
        let height = IMAGE_WIDTH * img_h / img_w;
        self.ensure_space(height);

        let xobj_id = XObjectId::new();
        self.doc
            .resources
            .xobjects
            .map
            .insert(xobj_id.clone(), XObject::Image(raw_image));

        let x = (PAGE_WIDTH - IMAGE_WIDTH) / 2.0;
        let y = PAGE_HEIGHT - (self.cursor_y + height);
        let transform = XObjectTransform {
            translate_x: Some(Pt(x)),
            translate_y: Some(Pt(y)),
            scale_x: Some(IMAGE_WIDTH / img_w),
            scale_y: Some(height / img_h),
            rotate: None,
            dpi: Some(72.0),
        };
        self.current_ops().push(Op::UseXobject {
            id: xobj_id,
            transform,
        });
        self.cursor_y += height;
        Ok(())
    }

    /// Chart pages: two charts per page under a centered section heading.
    /// A chart whose PNG is missing (render fallback) gets a placeholder
    /// line instead; assembly always continues.
    pub fn insert_charts(&mut self, charts: &ChartSet) {
        let paths = charts.in_order();
        for pair in paths.chunks(2) {
            self.add_page();
            self.write_line("Visualización de Datos", BuiltinFont::TimesBold, 12.0, Align::Center);
            self.vspace(5.0);
            for path in pair {
                match self.place_image(path) {
                    Ok(()) => self.vspace(5.0),
                    Err(e) => {
                        warn!("chart not inserted: {}", e);
                        let name = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_else(|| path.display().to_string());
                        let notice = format!("{} no encontrado", name);
                        self.write_line(&notice, BuiltinFont::TimesRoman, 10.0, Align::Center);
                    }
                }
            }
        }
    }

    /// Bordered table of every filtered column, one row per movement, the
    /// date shown day/month/year. Column widths split the usable width
    /// evenly; cell text wraps within its column.
    pub fn draw_table(&mut self, rows: &[FilteredMovement]) {
        if rows.is_empty() {
            self.write_line(
                "No se registraron movimientos en el rango seleccionado.",
                BuiltinFont::TimesRoman,
                11.0,
                Align::Left,
            );
            return;
        }

        let col_width = USABLE_WIDTH / TABLE_COLUMNS.len() as f32;
        let header_height = TABLE_LINE_HEIGHT + 2.0 * TABLE_CELL_PADDING;
        self.ensure_space(header_height + TABLE_LINE_HEIGHT);
        for (i, column) in TABLE_COLUMNS.iter().enumerate() {
            let x = MARGIN + i as f32 * col_width;
            self.stroke_rect(x, self.cursor_y, col_width, header_height);
            let text_x = x + (col_width - estimate_width(column, 10.0)) / 2.0;
            let baseline = self.cursor_y + TABLE_CELL_PADDING + 10.0;
            self.emit_text(column, BuiltinFont::TimesBold, 10.0, text_x, baseline);
        }
        self.cursor_y += header_height;

        let max_chars = ((col_width - 2.0 * TABLE_CELL_PADDING)
            / (TABLE_FONT_SIZE * GLYPH_WIDTH_FACTOR))
            .floor()
            .max(1.0) as usize;

        for row in rows {
            let cells = [
                display_date(row.date),
                row.vehicle.clone(),
                format_amount_cell(row.delivery_amount),
                format_amount_cell(row.savings_amount),
                format_amount_cell(row.expense_amount),
                format_amount_cell(row.balance_amount),
            ];
            let wrapped: Vec<Vec<String>> =
                cells.iter().map(|c| wrap_cell(c, max_chars)).collect();
            let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1);
            let row_height =
                line_count as f32 * TABLE_LINE_HEIGHT + 2.0 * TABLE_CELL_PADDING;
            self.ensure_space(row_height);

            for (i, lines) in wrapped.iter().enumerate() {
                let x = MARGIN + i as f32 * col_width;
                self.stroke_rect(x, self.cursor_y, col_width, row_height);
                for (line_idx, line) in lines.iter().enumerate() {
                    let baseline = self.cursor_y
                        + TABLE_CELL_PADDING
                        + TABLE_FONT_SIZE
                        + line_idx as f32 * TABLE_LINE_HEIGHT;
                    self.emit_text(
                        line,
                        BuiltinFont::TimesRoman,
                        TABLE_FONT_SIZE,
                        x + TABLE_CELL_PADDING,
                        baseline,
                    );
                }
            }
            self.cursor_y += row_height;
        }
    }

    /// Finalizes the document and writes it to `path`.
    pub fn save(mut self, path: &Path) -> Result<()> {
        let pages = std::mem::take(&mut self.pages);
        for (i, ops) in pages.into_iter().enumerate() {
            let layer_name = format!("Page {} Layer 1", i + 1);
            let layer = Layer::new(&layer_name);
            let layer_id = self.doc.add_layer(&layer);
            let mut final_ops = vec![Op::BeginLayer { layer_id }];
            final_ops.extend(ops);
            let page = PdfPage::new(printpdf::Mm(210.0), printpdf::Mm(297.0), final_ops);
            self.doc.pages.push(page);
        }

        let file = fs::File::create(path)?;
        let mut writer = BufWriter::new(file);
        let mut warnings = Vec::new();
        self.doc
            .save_writer(&mut writer, &PdfSaveOptions::default(), &mut warnings);
        Ok(())
    }

    fn ensure_space(&mut self, height: f32) {
        if self.pages.is_empty() || self.cursor_y + height > PAGE_HEIGHT - BREAK_MARGIN {
            self.add_page();
        }
    }

    fn current_ops(&mut self) -> &mut Vec<Op> {
        // add_page always runs before any write reaches here.
        self.pages.last_mut().expect("no open page")
    }

    fn emit_text(&mut self, text: &str, font: BuiltinFont, size: f32, x: f32, baseline: f32) {
        let y = PAGE_HEIGHT - baseline;
        let ops = self.current_ops();
        ops.push(Op::StartTextSection);
        ops.push(Op::SetFillColor {
            col: printpdf::color::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)),
        });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(size),
            font,
        });
        ops.push(Op::SetTextMatrix {
            matrix: TextMatrix::Translate(Pt(x), Pt(y)),
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text.to_string())],
            font,
        });
        ops.push(Op::EndTextSection);
    }

    fn stroke_rect(&mut self, x: f32, y_top: f32, width: f32, height: f32) {
        let y = PAGE_HEIGHT - (y_top + height);
        let polygon = Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    LinePoint {
                        p: Point { x: Pt(x), y: Pt(y) },
                        bezier: false,
                    },
                    LinePoint {
                        p: Point {
                            x: Pt(x + width),
                            y: Pt(y),
                        },
                        bezier: false,
                    },
                    LinePoint {
                        p: Point {
                            x: Pt(x + width),
                            y: Pt(y + height),
                        },
                        bezier: false,
                    },
                    LinePoint {
                        p: Point {
                            x: Pt(x),
                            y: Pt(y + height),
                        },
                        bezier: false,
                    },
                ],
            }],
            mode: PaintMode::Stroke,
            winding_order: WindingOrder::EvenOdd,
        };
        let ops = self.current_ops();
        ops.push(Op::SetOutlineColor {
            col: printpdf::color::Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)),
        });
        ops.push(Op::SetOutlineThickness { pt: Pt(0.75) });
        ops.push(Op::DrawPolygon { polygon });
    }
}

/// Assembles the full report: header + metrics page, chart pages, table
/// page, written to `output_path`.
pub fn assemble_report(
    request: &ReportRequest,
    summary: &ReportSummary,
    charts: &ChartSet,
    rows: &[FilteredMovement],
    output_path: &Path,
) -> Result<()> {
    let mut doc = ReportDocument::new(request);
    doc.add_page();
    write_metrics(&mut doc, summary);
    doc.insert_charts(charts);
    doc.add_page();
    doc.draw_table(rows);
    doc.save(output_path)
}

/// The "Resumen General" block: the five scalar aggregates as bullet
/// lines with thousands separators and the currency label.
fn write_metrics(doc: &mut ReportDocument, summary: &ReportSummary) {
    doc.write_line("Resumen General", BuiltinFont::TimesBold, 12.0, Align::Left);
    let lines = [
        format!("- Total de registros: {}", summary.record_count),
        format!("- Total entregado: COP {}", thousands(summary.total_delivered)),
        format!("- Total ahorro: COP {}", thousands(summary.total_savings)),
        format!("- Total de gastos: COP {}", thousands(summary.total_expenses)),
        format!(
            "- Suma total del balance: COP {}",
            thousands(summary.total_balance)
        ),
    ];
    for line in &lines {
        doc.write_line(line, BuiltinFont::TimesRoman, 11.0, Align::Left);
    }
    doc.vspace(5.0);
}

fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH_FACTOR
}

fn format_amount_cell(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Greedy word wrap within a column, hard-splitting words longer than the
/// column itself.
fn wrap_cell(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use crate::charts::ChartSet;
    use chrono::NaiveDate;

    fn sample_rows() -> Vec<FilteredMovement> {
        vec![FilteredMovement {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vehicle: "ABC123".to_string(),
            delivery_amount: 100000.0,
            savings_amount: 20000.0,
            expense_amount: 5000.0,
            balance_amount: 95000.0,
        }]
    }

    #[test]
    fn test_wrap_cell() {
        assert_eq!(wrap_cell("hello world", 5), vec!["hello", "world"]);
        assert_eq!(wrap_cell("hello world", 11), vec!["hello world"]);
        assert_eq!(wrap_cell("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_cell("", 5), vec![""]);
    }

    #[test]
    fn test_format_amount_cell() {
        assert_eq!(format_amount_cell(100000.0), "100000.0");
        assert_eq!(format_amount_cell(12.5), "12.5");
    }

    #[test]
    fn test_assemble_report_with_missing_charts_still_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let request = ReportRequest::parse("2024-01-01", "2024-01-03", "Carlos").unwrap();
        let rows = sample_rows();
        let summary = aggregate::summarize(&rows);
        // Chart files intentionally absent: every section falls back to
        // the placeholder line.
        let charts = ChartSet::new(&dir.path().join("missing"));
        let output = dir.path().join("out.pdf");
        assemble_report(&request, &summary, &charts, &rows, &output).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn test_assemble_report_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let request = ReportRequest::parse("2024-01-01", "2024-01-03", "Carlos").unwrap();
        let summary = aggregate::summarize(&[]);
        let charts = ChartSet::new(dir.path());
        let output = dir.path().join("empty.pdf");
        assemble_report(&request, &summary, &charts, &[], &output).unwrap();
        assert!(output.exists());
    }
}
