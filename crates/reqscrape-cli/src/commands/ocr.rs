use std::path::Path;

use reqscrape_core::collect_input_pdfs;
use reqscrape_core::error::ScrapeError;
use reqscrape_core::ocr::ocr_pdfs;

pub fn run(input: &Path, output_dir: &Path) -> Result<(), ScrapeError> {
    let pdfs = collect_input_pdfs(input)?;
    if !reqscrape_core::ocr::is_available() {
        log::warn!("ocrmypdf not found on PATH");
    }
    let produced = ocr_pdfs(&pdfs, output_dir)?;

    eprintln!(
        "OCR'd {} of {} document(s) into {}",
        produced.len(),
        pdfs.len(),
        reqscrape_core::ocr::ocr_dir(output_dir).display()
    );
    Ok(())
}
