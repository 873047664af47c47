use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScrapeError;
use crate::extraction::{BBox, PdfBackend, PdfPage};

/// Reserved marker that introduces a table placeholder in extracted text.
pub const MARKER: &str = "@@reserved";

/// Default table snapshot resolution, in dpi.
pub const DEFAULT_RESOLUTION: u32 = 100;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@reserved (TABLE (\d+)\.png)").expect("static pattern is valid")
});

/// File name of the snapshot for table `index`.
pub fn image_file_name(index: u32) -> String {
    format!("TABLE {index}.png")
}

/// Token substituted for table `index` in page text. It names the image file
/// exactly, so the post-processor can resolve it without guessing.
pub fn placeholder_token(index: u32) -> String {
    format!("\n{MARKER} {}", image_file_name(index))
}

/// A placeholder found in a spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte range of the marker and file name within the cell text.
    pub span: Range<usize>,
    pub index: u32,
    pub file_name: String,
}

/// Every placeholder in `text`, left to right.
pub fn parse_placeholders(text: &str) -> Vec<Placeholder> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index = caps.get(2)?.as_str().parse().ok()?;
            Some(Placeholder {
                span: whole.range(),
                index,
                file_name: caps.get(1)?.as_str().to_string(),
            })
        })
        .collect()
}

/// How a table's text was located in the page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Substitution {
    /// The table text appeared verbatim.
    Exact,
    /// The table text appeared once whitespace was ignored on both sides.
    Loose,
    /// The table text could not be found; the page text is unchanged.
    NotFound,
}

/// Replace the first occurrence of `needle` in `haystack` with `replacement`.
///
/// Tries a literal match first, then a match that ignores all whitespace,
/// mapped back to the original byte offsets.
pub fn substitute(haystack: &mut String, needle: &str, replacement: &str) -> Substitution {
    let needle = needle.trim();
    if needle.is_empty() {
        return Substitution::NotFound;
    }

    if let Some(start) = haystack.find(needle) {
        haystack.replace_range(start..start + needle.len(), replacement);
        return Substitution::Exact;
    }

    match find_ignoring_whitespace(haystack, needle) {
        Some(range) => {
            haystack.replace_range(range, replacement);
            Substitution::Loose
        }
        None => Substitution::NotFound,
    }
}

/// Byte range in `haystack` that equals `needle` once whitespace is removed
/// from both. The range starts and ends on non-whitespace characters.
fn find_ignoring_whitespace(haystack: &str, needle: &str) -> Option<Range<usize>> {
    let compact_needle: String = needle.chars().filter(|c| !c.is_whitespace()).collect();
    if compact_needle.is_empty() {
        return None;
    }

    let mut compact = String::with_capacity(haystack.len());
    // (offset in `compact`, byte range in `haystack`) per kept char
    let mut origin: Vec<(usize, Range<usize>)> = Vec::new();
    for (i, ch) in haystack.char_indices() {
        if ch.is_whitespace() {
            continue;
        }
        origin.push((compact.len(), i..i + ch.len_utf8()));
        compact.push(ch);
    }

    let start = compact.find(&compact_needle)?;
    let last = start + compact_needle.len() - 1;
    let first_char = origin.binary_search_by_key(&start, |(c, _)| *c).ok()?;
    let last_char = match origin.binary_search_by_key(&last, |(c, _)| *c) {
        Ok(i) => i,
        Err(i) => i.checked_sub(1)?,
    };
    Some(origin[first_char].1.start..origin[last_char].1.end)
}

/// Outcome of materializing one table.
#[derive(Debug, Clone)]
pub struct Materialized {
    pub index: u32,
    pub substitution: Substitution,
    /// The snapshot written, if an image directory was given and the text matched.
    pub image: Option<PathBuf>,
}

/// Replace a table's text in `page_text` with its placeholder token and,
/// when `image_dir` is set, render the table to `{image_dir}/TABLE {index}.png`.
///
/// When the table text cannot be found in the page text nothing is
/// rendered, so no image is left without a placeholder pointing at it.
#[allow(clippy::too_many_arguments)]
pub fn materialize(
    backend: &dyn PdfBackend,
    pdf: &Path,
    page: &PdfPage,
    region: &BBox,
    index: u32,
    page_text: &mut String,
    image_dir: Option<&Path>,
    resolution: u32,
) -> Result<Materialized, ScrapeError> {
    let table_text = backend.extract_text(pdf, page, region)?;
    let substitution = substitute(page_text, &table_text, &placeholder_token(index));

    if substitution == Substitution::NotFound {
        log::warn!(
            "{}: page {}: text of table {} not found in page text; left in place",
            pdf.display(),
            page.number,
            index
        );
        return Ok(Materialized {
            index,
            substitution,
            image: None,
        });
    }

    let image = match image_dir {
        Some(dir) => {
            let dest = dir.join(image_file_name(index));
            backend.render_region(pdf, page, region, resolution, &dest)?;
            log::debug!("rendered table {} to {}", index, dest.display());
            Some(dest)
        }
        None => None,
    };

    Ok(Materialized {
        index,
        substitution,
        image,
    })
}
