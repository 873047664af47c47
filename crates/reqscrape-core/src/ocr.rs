use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ScrapeError;
use crate::extraction::poppler::run_tool;

/// Subdirectory of the output directory that receives OCR'd copies.
pub const OCR_DIR_NAME: &str = "OCR_";

const OCRMYPDF_HINT: &str =
    "Install OCRmyPDF: brew install ocrmypdf (macOS) or apt install ocrmypdf (Linux)";

/// Check if ocrmypdf is available on the system.
pub fn is_available() -> bool {
    Command::new("ocrmypdf")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Directory the OCR'd copies of a batch are written to.
pub fn ocr_dir(output_dir: &Path) -> PathBuf {
    output_dir.join(OCR_DIR_NAME)
}

/// Add a text layer to every PDF in `pdfs` that lacks one.
///
/// Recreates `{output_dir}/OCR_` and writes one copy per input under its
/// original file name. Pages that already carry text are passed through
/// untouched. A file ocrmypdf rejects is skipped with a warning; a missing
/// ocrmypdf aborts. Returns the copies written, in input order.
pub fn ocr_pdfs(pdfs: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>, ScrapeError> {
    let dir = ocr_dir(output_dir);
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    let mut produced = Vec::new();
    for pdf in pdfs {
        let Some(name) = pdf.file_name() else {
            log::warn!("skipping {}: not a file path", pdf.display());
            continue;
        };
        let out = dir.join(name);

        let mut cmd = Command::new("ocrmypdf");
        cmd.arg("--skip-text").arg(pdf).arg(&out);

        match run_tool(cmd, "ocrmypdf", OCRMYPDF_HINT) {
            Ok(_) => {
                log::info!("OCR: {} -> {}", pdf.display(), out.display());
                produced.push(out);
            }
            Err(e @ ScrapeError::ToolNotFound { .. }) => return Err(e),
            Err(e) => log::warn!("OCR failed for {}: {}", pdf.display(), e),
        }
    }

    Ok(produced)
}
