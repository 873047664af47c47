pub mod associate;
pub mod error;
pub mod extraction;
pub mod matching;
pub mod materialize;
pub mod model;
pub mod ocr;
pub mod presets;
pub mod spreadsheet;

use std::path::{Path, PathBuf};

use error::ScrapeError;
use extraction::PdfBackend;
use matching::PatternMatcher;
use model::{DocumentFailure, PreamblePolicy, RequirementRow};
use presets::schema::{PageMargins, TableSettings};
use presets::PresetRegistry;

/// Preset names and output settings for a run, as given by the caller.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub margins: String,
    pub table_geometry: String,
    pub headings: String,
    pub requirements: String,
    /// Where table snapshots are written. Without it tables are still
    /// replaced by placeholders but no images are rendered.
    pub image_dir: Option<PathBuf>,
    pub resolution: u32,
    pub preamble: PreamblePolicy,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            margins: presets::builtin::DEFAULT_MARGINS.to_string(),
            table_geometry: presets::builtin::DEFAULT_TABLE_GEOMETRY.to_string(),
            headings: presets::builtin::DEFAULT_HEADINGS.to_string(),
            requirements: presets::builtin::DEFAULT_REQUIREMENTS.to_string(),
            image_dir: None,
            resolution: materialize::DEFAULT_RESOLUTION,
            preamble: PreamblePolicy::default(),
        }
    }
}

/// Settings for turning a PDF into document text.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub margins: PageMargins,
    pub tables: TableSettings,
    pub image_dir: Option<PathBuf>,
    pub resolution: u32,
}

/// Every preset a run needs, resolved and compiled up front.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub extraction: ExtractionConfig,
    pub headings: PatternMatcher,
    pub requirements: PatternMatcher,
    pub preamble: PreamblePolicy,
}

impl ExtractionConfig {
    pub fn from_options(
        registry: &PresetRegistry,
        options: &ScrapeOptions,
    ) -> Result<Self, ScrapeError> {
        if options.resolution == 0 {
            return Err(ScrapeError::InvalidPreset(
                "table image resolution must be at least 1 dpi".into(),
            ));
        }
        Ok(Self {
            margins: registry.margins(&options.margins)?.clone(),
            tables: registry.table_geometry(&options.table_geometry)?.clone(),
            image_dir: options.image_dir.clone(),
            resolution: options.resolution,
        })
    }
}

impl ScrapeConfig {
    /// Resolve every preset named in `options`. Any unknown name fails here,
    /// before a document is opened.
    pub fn from_options(
        registry: &PresetRegistry,
        options: &ScrapeOptions,
    ) -> Result<Self, ScrapeError> {
        Ok(Self {
            extraction: ExtractionConfig::from_options(registry, options)?,
            headings: registry.heading_pattern(&options.headings)?,
            requirements: registry.requirement_pattern(&options.requirements)?,
            preamble: options.preamble.clone(),
        })
    }
}

/// State shared across the documents of one batch.
///
/// Owns the table counter so image names never collide between documents,
/// plus the rows and failures gathered so far.
#[derive(Debug, Default)]
pub struct BatchContext {
    table_counter: u32,
    /// Snapshots rendered for the document in progress.
    pending_images: Vec<PathBuf>,
    pub rows: Vec<RequirementRow>,
    pub failures: Vec<DocumentFailure>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next table index. Indices start at 1.
    pub fn next_table_index(&mut self) -> u32 {
        self.table_counter += 1;
        self.table_counter
    }

    pub fn tables_detected(&self) -> u32 {
        self.table_counter
    }

    /// Note a snapshot rendered for the document in progress.
    pub fn record_image(&mut self, path: PathBuf) {
        self.pending_images.push(path);
    }

    /// Keep the current document's snapshots.
    fn commit_images(&mut self) {
        self.pending_images.clear();
    }

    /// Delete the current document's snapshots. Its rows are never emitted,
    /// so nothing would reference them.
    fn discard_images(&mut self) {
        for path in self.pending_images.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("removed {}", path.display()),
                Err(e) => log::warn!("could not remove {}: {}", path.display(), e),
            }
        }
    }

    pub fn into_report(self, documents: usize) -> BatchReport {
        BatchReport {
            documents,
            rows: self.rows,
            failures: self.failures,
            tables: self.table_counter,
        }
    }
}

/// Result of a whole batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Documents attempted.
    pub documents: usize,
    pub rows: Vec<RequirementRow>,
    pub failures: Vec<DocumentFailure>,
    /// Tables detected across the batch.
    pub tables: u32,
}

/// PDF files to process for `input`: a single file, or the `.pdf` files
/// directly inside a directory sorted by name.
pub fn collect_input_pdfs(input: &Path) -> Result<Vec<PathBuf>, ScrapeError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(ScrapeError::Extraction(format!(
            "input {} is neither a PDF file nor a directory",
            input.display()
        )));
    }

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }
    pdfs.sort();
    Ok(pdfs)
}

/// Name recorded in the Document column.
pub fn document_name(pdf: &Path) -> String {
    pdf.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf.display().to_string())
}

/// Body text of every page of `pdf`, with each detected table replaced by
/// its placeholder token. Table indices are drawn from `ctx`.
pub fn document_text(
    backend: &dyn PdfBackend,
    pdf: &Path,
    config: &ExtractionConfig,
    ctx: &mut BatchContext,
) -> Result<String, ScrapeError> {
    let pages = backend.load_pages(pdf)?;
    let mut text = String::new();

    for page in &pages {
        let extract = extraction::extract_page(backend, pdf, page, &config.margins, &config.tables)?;
        let mut page_text = extract.text;

        for region in &extract.tables {
            let index = ctx.next_table_index();
            let done = materialize::materialize(
                backend,
                pdf,
                page,
                region,
                index,
                &mut page_text,
                config.image_dir.as_deref(),
                config.resolution,
            )?;
            if let Some(image) = done.image {
                ctx.record_image(image);
            }
        }

        text.push_str(&page_text);
        if !page_text.ends_with('\n') {
            text.push('\n');
        }
    }

    Ok(text)
}

/// Extract, match and associate one document, appending its rows to `ctx`.
///
/// Rows are only added once the whole document succeeded. On failure the
/// table snapshots already rendered for it are deleted. Returns the number
/// of rows added.
pub fn scrape_document(
    backend: &dyn PdfBackend,
    pdf: &Path,
    config: &ScrapeConfig,
    ctx: &mut BatchContext,
) -> Result<usize, ScrapeError> {
    match rows_for_document(backend, pdf, config, ctx) {
        Ok(added) => {
            ctx.commit_images();
            Ok(added)
        }
        Err(e) => {
            ctx.discard_images();
            Err(e)
        }
    }
}

fn rows_for_document(
    backend: &dyn PdfBackend,
    pdf: &Path,
    config: &ScrapeConfig,
    ctx: &mut BatchContext,
) -> Result<usize, ScrapeError> {
    let text = document_text(backend, pdf, &config.extraction, ctx)?;
    let (_, found) = matching::match_document(&text, &config.headings, &config.requirements)?;

    let name = document_name(pdf);
    let rows = associate::associate(&found.headings, &found.requirements, &name, &config.preamble);
    log::info!(
        "{}: {} heading(s), {} requirement(s), {} row(s)",
        name,
        found.headings.len(),
        found.requirements.len(),
        rows.len()
    );

    let added = rows.len();
    ctx.rows.extend(rows);
    Ok(added)
}

/// Scrape every document in `pdfs` in order.
///
/// Configuration errors and a missing external tool abort the batch. Any
/// other error is recorded as a [`DocumentFailure`] and the batch moves on
/// to the next document.
pub fn scrape_batch(
    backend: &dyn PdfBackend,
    pdfs: &[PathBuf],
    config: &ScrapeConfig,
) -> Result<BatchReport, ScrapeError> {
    if let Some(dir) = &config.extraction.image_dir {
        std::fs::create_dir_all(dir)?;
    }
    if pdfs.is_empty() {
        log::warn!("no PDF documents to process");
    }

    let mut ctx = BatchContext::new();
    for pdf in pdfs {
        log::info!("processing {}", pdf.display());
        match scrape_document(backend, pdf, config, &mut ctx) {
            Ok(_) => {}
            Err(e) if e.aborts_batch() => return Err(e),
            Err(e) => {
                log::warn!("skipping {}: {}", pdf.display(), e);
                ctx.failures.push(DocumentFailure {
                    document: document_name(pdf),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(ctx.into_report(pdfs.len()))
}

/// Cleaned document text of `pdf` with table placeholders, without any
/// pattern matching.
pub fn dump_text(
    backend: &dyn PdfBackend,
    pdf: &Path,
    config: &ExtractionConfig,
) -> Result<String, ScrapeError> {
    if let Some(dir) = &config.image_dir {
        std::fs::create_dir_all(dir)?;
    }
    let mut ctx = BatchContext::new();
    let text = document_text(backend, pdf, config, &mut ctx)?;
    Ok(matching::remove_cid_artifacts(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_counter_starts_at_one() {
        let mut ctx = BatchContext::new();
        assert_eq!(ctx.next_table_index(), 1);
        assert_eq!(ctx.next_table_index(), 2);
        assert_eq!(ctx.tables_detected(), 2);
    }

    #[test]
    fn test_collect_input_pdfs_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "c.pdf.bak"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.pdf")).unwrap();

        let found = collect_input_pdfs(dir.path()).unwrap();
        let names: Vec<String> = found.iter().map(|p| document_name(p)).collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn test_collect_input_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("spec.pdf");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(collect_input_pdfs(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_collect_input_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_input_pdfs(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_preset() {
        let registry = PresetRegistry::builtin().unwrap();
        let options = ScrapeOptions {
            headings: "ACME".into(),
            ..ScrapeOptions::default()
        };
        let err = ScrapeConfig::from_options(&registry, &options).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_default_options_resolve() {
        let registry = PresetRegistry::builtin().unwrap();
        let config = ScrapeConfig::from_options(&registry, &ScrapeOptions::default()).unwrap();
        assert_eq!(config.extraction.margins.top, 57.0);
        assert_eq!(config.extraction.resolution, 100);
    }
}
