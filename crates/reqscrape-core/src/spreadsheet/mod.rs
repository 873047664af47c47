pub mod postprocess;

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::error::ScrapeError;
use crate::materialize::parse_placeholders;
use crate::model::{RequirementRow, COLUMNS};

pub use postprocess::{post_process, PostProcessReport};

/// Name of the single worksheet in the output workbook.
pub const SHEET_NAME: &str = "Requirements";

const COLUMN_WIDTHS: [f64; 4] = [28.0, 36.0, 24.0, 100.0];

/// Most characters Excel stores in a single cell.
pub const MAX_CELL_CHARS: usize = 32_767;

/// How placeholders in the written sheet are resolved.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Directory holding the `TABLE n.png` snapshots.
    pub image_dir: Option<PathBuf>,
    /// Insert snapshots into the cells that reference them instead of a label.
    pub embed_images: bool,
}

impl ExportOptions {
    /// Fails before any spreadsheet I/O when embedding is requested without
    /// an image directory.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.embed_images && self.image_dir.is_none() {
            return Err(ScrapeError::MissingImageDir);
        }
        Ok(())
    }
}

/// Write `rows` to a new workbook at `dest`, replacing any existing file.
///
/// A requirement longer than a cell can hold continues on the following
/// rows under the same document and heading.
pub fn write_rows(rows: &[RequirementRow], dest: &Path) -> Result<(), ScrapeError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    start_sheet(sheet)?;

    let wrap = Format::new().set_text_wrap();
    let mut r: u32 = 1;
    for row in rows {
        let pieces = split_cell(&row.requirement, MAX_CELL_CHARS);
        if pieces.len() > 1 {
            log::warn!(
                "{}: requirement under \"{}\" exceeds {} characters; continued over {} rows",
                row.document,
                row.heading,
                MAX_CELL_CHARS,
                pieces.len()
            );
        }
        for piece in pieces {
            let cells = [
                first_piece(&row.document),
                first_piece(&row.heading),
                first_piece(&row.subheading),
                piece,
            ];
            for (c, value) in cells.iter().enumerate() {
                sheet.write_string_with_format(r, c as u16, *value, &wrap)?;
            }
            r += 1;
        }
    }

    workbook.save(dest)?;
    log::info!("wrote {} row(s) to {}", r - 1, dest.display());
    Ok(())
}

/// Split `text` into pieces of at most `limit` characters.
///
/// Cuts fall on character boundaries and never inside a table placeholder,
/// so every placeholder survives whole in exactly one piece.
pub(crate) fn split_cell(text: &str, limit: usize) -> Vec<&str> {
    let placeholders = parse_placeholders(text);
    let mut pieces = Vec::new();
    let mut start = 0;

    loop {
        let rest = &text[start..];
        let Some((offset, _)) = rest.char_indices().nth(limit) else {
            pieces.push(rest);
            return pieces;
        };
        let mut cut = start + offset;
        if let Some(p) = placeholders
            .iter()
            .find(|p| p.span.start < cut && cut < p.span.end)
        {
            if p.span.start > start {
                cut = p.span.start;
            }
        }
        pieces.push(&text[start..cut]);
        start = cut;
    }
}

/// `text` cut to what fits in one cell.
fn first_piece(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Write `rows` to `dest` and resolve their table placeholders.
pub fn export(
    rows: &[RequirementRow],
    dest: &Path,
    options: &ExportOptions,
) -> Result<PostProcessReport, ScrapeError> {
    options.validate()?;
    write_rows(rows, dest)?;
    post_process(dest, options)
}

/// Name the sheet, write the bold header row and set column widths.
pub(crate) fn start_sheet(sheet: &mut Worksheet) -> Result<(), XlsxError> {
    sheet.set_name(SHEET_NAME)?;
    let bold = Format::new().set_bold();
    for (c, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, c as u16, *title, &bold)?;
        sheet.set_column_width(c as u16, COLUMN_WIDTHS[c])?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Reader, Xlsx};

    #[test]
    fn test_validate_requires_image_dir_for_embedding() {
        let options = ExportOptions {
            image_dir: None,
            embed_images: true,
        };
        assert!(matches!(options.validate(), Err(ScrapeError::MissingImageDir)));
        assert!(ExportOptions::default().validate().is_ok());
    }

    #[test]
    fn test_export_fails_before_touching_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.xlsx");
        let options = ExportOptions {
            image_dir: None,
            embed_images: true,
        };
        assert!(export(&[], &dest, &options).is_err());
        assert!(!dest.exists());
    }

    #[test]
    fn test_write_rows_header_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.xlsx");
        let rows = vec![
            RequirementRow::new("a.pdf", "1. Intro", "(a) First."),
            RequirementRow::new("a.pdf", "2. Details", "(b) Second."),
        ];
        write_rows(&rows, &dest).unwrap();

        let mut wb: Xlsx<_> = open_workbook(&dest).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(cells[0], COLUMNS.map(String::from).to_vec());
        assert_eq!(cells[1][1], "1. Intro");
        assert_eq!(cells[2][3], "(b) Second.");
        assert_eq!(cells.len(), 3);
    }

    #[test]
    fn test_write_rows_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.xlsx");
        std::fs::write(&dest, b"not a workbook").unwrap();
        write_rows(&[RequirementRow::new("a.pdf", "H", "R")], &dest).unwrap();
        let mut wb: Xlsx<_> = open_workbook(&dest).unwrap();
        assert_eq!(wb.worksheet_range(SHEET_NAME).unwrap().height(), 2);
    }

    /// A requirement that runs past the cell limit with a placeholder
    /// straddling the cut.
    fn oversized_requirement() -> String {
        let mut text = String::from("(z) ");
        text.push_str(&"word ".repeat(6552));
        text.push_str("@@reserved TABLE 1.png");
        text.push_str(&" word".repeat(2000));
        text
    }

    #[test]
    fn test_oversized_requirement_continues_on_next_row() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.xlsx");
        let text = oversized_requirement();
        assert!(text.chars().count() > MAX_CELL_CHARS);
        write_rows(&[RequirementRow::new("a.pdf", "2. Annex", &text)], &dest).unwrap();

        let mut wb: Xlsx<_> = open_workbook(&dest).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(cells.len(), 3);
        let first = cells[1][3].chars().count();
        assert!(first <= MAX_CELL_CHARS && first >= 32_763, "{first}");
        assert!(cells[1][3].starts_with("(z) word"));
        assert!(!cells[1][3].contains("@@reserved"));
        assert_eq!(cells[2][0], "a.pdf");
        assert_eq!(cells[2][1], "2. Annex");
        assert!(cells[2][3].starts_with("@@reserved TABLE 1.png"));
    }

    #[test]
    fn test_export_survives_oversized_requirement() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.xlsx");
        let rows = vec![
            RequirementRow::new("a.pdf", "1. Scope", "(a) Short."),
            RequirementRow::new("a.pdf", "2. Annex", &oversized_requirement()),
        ];
        let report = export(&rows, &dest, &ExportOptions::default()).unwrap();
        assert!(dest.exists());
        assert_eq!(report.labelled, 1);
    }

    #[test]
    fn test_split_cell_respects_char_boundaries() {
        let text = "é".repeat(5);
        assert_eq!(split_cell(&text, 2), vec!["éé", "éé", "é"]);
        assert_eq!(split_cell("short", 10), vec!["short"]);
        assert_eq!(split_cell("", 10), vec![""]);
    }
}
