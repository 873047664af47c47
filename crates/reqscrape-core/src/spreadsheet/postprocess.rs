use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Image, Workbook};

use crate::error::ScrapeError;
use crate::materialize::{parse_placeholders, Placeholder};
use crate::spreadsheet::{start_sheet, ExportOptions, SHEET_NAME};

/// Largest row height Excel accepts, in points.
const MAX_ROW_HEIGHT: f64 = 409.0;

/// Points per pixel at the 96 dpi Excel assumes for images.
const POINTS_PER_PIXEL: f64 = 0.75;

/// Counts of placeholders resolved by [`post_process`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessReport {
    pub embedded: usize,
    pub labelled: usize,
    /// Placeholders whose image could not be loaded; these were labelled too.
    pub missing: usize,
}

/// Label written in place of a table placeholder when no image is embedded.
pub fn table_label(index: u32) -> String {
    format!("[Table {index}]")
}

/// Reopen the workbook at `dest` and resolve every table placeholder in it.
///
/// With `embed_images`, each placeholder is removed from its cell and the
/// named image from the image directory is anchored at that cell, growing
/// the row to fit. Otherwise, or when the image cannot be loaded, the
/// placeholder becomes a `[Table n]` label. The rebuilt workbook replaces
/// `dest` atomically.
pub fn post_process(dest: &Path, options: &ExportOptions) -> Result<PostProcessReport, ScrapeError> {
    options.validate()?;
    let cells = read_cells(dest)?;

    let mut report = PostProcessReport::default();
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    start_sheet(sheet)?;
    let wrap = Format::new().set_text_wrap();

    for (r, row) in cells.iter().enumerate().skip(1) {
        let r = r as u32;
        let mut row_height: f64 = 0.0;

        for (c, text) in row.iter().enumerate() {
            let c = c as u16;
            let placeholders = parse_placeholders(text);
            if placeholders.is_empty() {
                if !text.is_empty() {
                    sheet.write_string_with_format(r, c, text.as_str(), &wrap)?;
                }
                continue;
            }

            let mut rebuilt = String::with_capacity(text.len());
            let mut images = Vec::new();
            let mut last = 0;
            for p in &placeholders {
                rebuilt.push_str(&text[last..p.span.start]);
                last = p.span.end;
                match load_image(options, p, &mut report) {
                    Some(image) => {
                        images.push(image);
                        report.embedded += 1;
                    }
                    None => {
                        rebuilt.push_str(&table_label(p.index));
                        report.labelled += 1;
                    }
                }
            }
            rebuilt.push_str(&text[last..]);
            let rebuilt = rebuilt.trim();
            if !rebuilt.is_empty() {
                sheet.write_string_with_format(r, c, rebuilt, &wrap)?;
            }

            let mut y_offset: f64 = 0.0;
            for image in &images {
                sheet.insert_image_with_offset(r, c, image, 0, y_offset as u32)?;
                y_offset += image.height();
            }
            row_height = row_height.max(y_offset * POINTS_PER_PIXEL);
        }

        if row_height > 0.0 {
            sheet.set_row_height(r, row_height.min(MAX_ROW_HEIGHT))?;
        }
    }

    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".reqscrape-")
        .suffix(".xlsx")
        .tempfile_in(dir)?;
    workbook.save(tmp.path())?;
    tmp.persist(dest).map_err(|e| ScrapeError::Io(e.error))?;

    log::info!(
        "resolved placeholders in {}: {} embedded, {} labelled ({} missing)",
        dest.display(),
        report.embedded,
        report.labelled,
        report.missing
    );
    Ok(report)
}

/// The image a placeholder names, when embedding and the file loads.
fn load_image(
    options: &ExportOptions,
    placeholder: &Placeholder,
    report: &mut PostProcessReport,
) -> Option<Image> {
    if !options.embed_images {
        return None;
    }
    let path = options.image_dir.as_ref()?.join(&placeholder.file_name);
    match Image::new(&path) {
        Ok(image) => Some(image),
        Err(e) => {
            log::warn!(
                "cannot embed {} ({}); writing {} instead",
                path.display(),
                e,
                table_label(placeholder.index)
            );
            report.missing += 1;
            None
        }
    }
}

/// Every cell of the requirements sheet as text, by absolute row and column.
fn read_cells(path: &Path) -> Result<Vec<Vec<String>>, ScrapeError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook.worksheet_range(SHEET_NAME)?;
    let (row0, col0) = range.start().unwrap_or((0, 0));

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); row0 as usize];
    for row in range.rows() {
        let mut values = vec![String::new(); col0 as usize];
        values.extend(row.iter().map(cell_text));
        cells.push(values);
    }
    Ok(cells)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Empty => String::new(),
        _ => format!("{cell}"),
    }
}
