use std::path::PathBuf;

use reqscrape_core::error::ScrapeError;
use reqscrape_core::extraction::poppler::PopplerBackend;
use reqscrape_core::model::PreamblePolicy;
use reqscrape_core::presets::PresetRegistry;
use reqscrape_core::spreadsheet::{self, ExportOptions};
use reqscrape_core::{collect_input_pdfs, scrape_batch, ScrapeConfig, ScrapeOptions};

use crate::output;

pub struct ScrapeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub margins: String,
    pub tables: String,
    pub presets_file: Option<PathBuf>,
    pub headings: String,
    pub requirements: String,
    pub images_dir: Option<PathBuf>,
    pub embed_images: bool,
    pub resolution: u32,
    pub preamble: Option<String>,
    pub json: Option<PathBuf>,
}

pub fn run(args: ScrapeArgs) -> Result<(), ScrapeError> {
    let export_options = ExportOptions {
        image_dir: args.images_dir.clone(),
        embed_images: args.embed_images,
    };
    // Fail on a bad flag combination before reading any PDF.
    export_options.validate()?;

    let registry = PresetRegistry::with_overrides(args.presets_file.as_deref())?;
    let options = ScrapeOptions {
        margins: args.margins,
        table_geometry: args.tables,
        headings: args.headings,
        requirements: args.requirements,
        image_dir: args.images_dir,
        resolution: args.resolution,
        preamble: match args.preamble {
            Some(label) => PreamblePolicy::Attribute(label),
            None => PreamblePolicy::Drop,
        },
    };
    let config = ScrapeConfig::from_options(&registry, &options)?;

    let pdfs = collect_input_pdfs(&args.input)?;
    log::debug!("{} input document(s) under {}", pdfs.len(), args.input.display());
    if !PopplerBackend::is_available() {
        log::warn!("pdftotext/pdftoppm not found on PATH; install poppler-utils");
    }
    let backend = PopplerBackend::new();
    let report = scrape_batch(&backend, &pdfs, &config)?;

    let resolved = spreadsheet::export(&report.rows, &args.output, &export_options)?;

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&report.rows)?;
        std::fs::write(path, json)?;
    }

    output::summary::print_batch(&report, &resolved, &args.output);
    Ok(())
}
