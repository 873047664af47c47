use std::path::{Path, PathBuf};

use reqscrape_core::error::ScrapeError;
use reqscrape_core::extraction::poppler::PopplerBackend;
use reqscrape_core::presets::PresetRegistry;
use reqscrape_core::{dump_text, ExtractionConfig, ScrapeOptions};

pub fn run(
    pdf: &Path,
    margins: &str,
    tables: &str,
    presets_file: Option<&Path>,
    output_file: Option<PathBuf>,
) -> Result<(), ScrapeError> {
    let registry = PresetRegistry::with_overrides(presets_file)?;
    let options = ScrapeOptions {
        margins: margins.to_string(),
        table_geometry: tables.to_string(),
        ..ScrapeOptions::default()
    };
    let config = ExtractionConfig::from_options(&registry, &options)?;

    let text = dump_text(&PopplerBackend::new(), pdf, &config)?;

    match output_file {
        Some(path) => {
            std::fs::write(&path, &text)?;
            eprintln!("Wrote {} character(s) to {}", text.chars().count(), path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
