use std::path::Path;
use std::process::{Command, Output};

use crate::error::ScrapeError;
use crate::extraction::{ruling, BBox, PdfBackend, PdfPage};

const POPPLER_HINT: &str =
    "Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)";

/// PDF backend using the poppler command line tools.
///
/// Page geometry and ruling edges come from parsing the PDF with lopdf.
/// Region text comes from `pdftotext` with a crop box, and table snapshots
/// from `pdftoppm` with the same crop scaled to the output resolution.
pub struct PopplerBackend;

impl PopplerBackend {
    pub fn new() -> Self {
        PopplerBackend
    }

    /// Check if pdftotext and pdftoppm are available on the system.
    pub fn is_available() -> bool {
        ["pdftotext", "pdftoppm"].iter().all(|tool| {
            Command::new(tool)
                .arg("-v")
                .output()
                .map(|o| o.status.success() || !o.stderr.is_empty())
                .unwrap_or(false)
        })
    }
}

impl Default for PopplerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBackend for PopplerBackend {
    fn load_pages(&self, pdf: &Path) -> Result<Vec<PdfPage>, ScrapeError> {
        ruling::load_pages(pdf)
    }

    fn extract_text(
        &self,
        pdf: &Path,
        page: &PdfPage,
        region: &BBox,
    ) -> Result<String, ScrapeError> {
        // At pdftotext's default 72 dpi one pixel is one point.
        let crop = PixelCrop::from_region(region, 72);
        let page_arg = page.number.to_string();

        let mut cmd = Command::new("pdftotext");
        cmd.args(["-f", page_arg.as_str(), "-l", page_arg.as_str()]);
        crop.push_args(&mut cmd);
        cmd.args(["-nopgbrk", "-enc", "UTF-8"]).arg(pdf).arg("-");

        let output = run_tool(cmd, "pdftotext", POPPLER_HINT)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn render_region(
        &self,
        pdf: &Path,
        page: &PdfPage,
        region: &BBox,
        resolution: u32,
        dest: &Path,
    ) -> Result<(), ScrapeError> {
        let crop = PixelCrop::from_region(region, resolution);
        let page_arg = page.number.to_string();
        let dpi = resolution.to_string();
        // pdftoppm appends ".png" to the output root itself.
        let root = dest.with_extension("");

        let mut cmd = Command::new("pdftoppm");
        cmd.args(["-f", page_arg.as_str(), "-l", page_arg.as_str()])
            .args(["-r", dpi.as_str()]);
        crop.push_args(&mut cmd);
        cmd.args(["-png", "-singlefile"]).arg(pdf).arg(&root);

        run_tool(cmd, "pdftoppm", POPPLER_HINT)?;
        if !dest.exists() {
            return Err(ScrapeError::Extraction(format!(
                "pdftoppm reported success but {} was not written",
                dest.display()
            )));
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "poppler"
    }
}

/// A crop rectangle in output pixels, as taken by poppler's `-x -y -W -H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelCrop {
    x: i64,
    y: i64,
    width: i64,
    height: i64,
}

impl PixelCrop {
    /// Scale a region in points to pixels at `resolution` dpi, growing it
    /// outward to whole pixels so nothing on the boundary is cut off.
    fn from_region(region: &BBox, resolution: u32) -> Self {
        let scale = f64::from(resolution) / 72.0;
        let x0 = (region.x0 * scale).floor();
        let y0 = (region.top * scale).floor();
        let x1 = (region.x1 * scale).ceil();
        let y1 = (region.bottom * scale).ceil();
        PixelCrop {
            x: x0 as i64,
            y: y0 as i64,
            width: ((x1 - x0) as i64).max(1),
            height: ((y1 - y0) as i64).max(1),
        }
    }

    fn push_args(&self, cmd: &mut Command) {
        cmd.args([
            "-x".to_string(),
            self.x.to_string(),
            "-y".to_string(),
            self.y.to_string(),
            "-W".to_string(),
            self.width.to_string(),
            "-H".to_string(),
            self.height.to_string(),
        ]);
    }
}

/// Run an external tool, mapping a missing binary and a nonzero exit to errors.
pub(crate) fn run_tool(
    mut cmd: Command,
    tool: &'static str,
    hint: &'static str,
) -> Result<Output, ScrapeError> {
    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScrapeError::ToolNotFound { tool, hint }
        } else {
            ScrapeError::Extraction(format!("{tool} failed: {e}"))
        }
    })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ScrapeError::ToolFailed { tool, code, stderr });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_crop_at_72_dpi_is_points() {
        let crop = PixelCrop::from_region(&BBox::new(0.0, 57.0, 595.0, 772.0), 72);
        assert_eq!(
            crop,
            PixelCrop {
                x: 0,
                y: 57,
                width: 595,
                height: 715
            }
        );
    }

    #[test]
    fn test_pixel_crop_scales_and_rounds_outward() {
        let crop = PixelCrop::from_region(&BBox::new(10.2, 20.5, 110.7, 60.1), 144);
        assert_eq!(crop.x, 20);
        assert_eq!(crop.y, 41);
        // 221.4 -> 222, 120.2 -> 121
        assert_eq!(crop.width, 202);
        assert_eq!(crop.height, 80);
    }

    #[test]
    fn test_pixel_crop_never_empty() {
        let crop = PixelCrop::from_region(&BBox::new(5.0, 5.0, 5.0, 5.0), 72);
        assert_eq!((crop.width, crop.height), (1, 1));
    }

    #[test]
    fn test_missing_tool_maps_to_not_found() {
        let cmd = Command::new("reqscrape-no-such-tool");
        let err = run_tool(cmd, "pdftotext", POPPLER_HINT).unwrap_err();
        assert!(matches!(err, ScrapeError::ToolNotFound { tool: "pdftotext", .. }));
    }
}
