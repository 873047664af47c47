pub mod poppler;
pub mod ruling;
pub mod table;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::presets::schema::{PageMargins, TableSettings};

/// Axis-aligned rectangle in PDF points, origin at the top-left of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self { x0, top, x1, bottom }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// True when this box has positive area and lies within a `width` x `height` page.
    pub fn fits_within(&self, width: f64, height: f64) -> bool {
        self.x0 >= 0.0
            && self.top >= 0.0
            && self.x1 <= width
            && self.bottom <= height
            && self.x0 < self.x1
            && self.top < self.bottom
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Where a ruling edge came from in the content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSource {
    /// A straight `m`/`l` path segment.
    Line,
    /// One side of an `re` rectangle.
    RectSide,
}

/// An axis-aligned ruling segment. Vertical edges have `x0 == x1`,
/// horizontal edges have `top == bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub orientation: Orientation,
    pub source: EdgeSource,
}

impl Edge {
    pub fn horizontal(x0: f64, x1: f64, y: f64, source: EdgeSource) -> Self {
        Edge {
            x0: x0.min(x1),
            top: y,
            x1: x0.max(x1),
            bottom: y,
            orientation: Orientation::Horizontal,
            source,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64, source: EdgeSource) -> Self {
        Edge {
            x0: x,
            top: top.min(bottom),
            x1: x,
            bottom: top.max(bottom),
            orientation: Orientation::Vertical,
            source,
        }
    }

    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }
}

/// Geometry of one PDF page, as needed for cropping and table finding.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// 1-based page number.
    pub number: u32,
    pub width: f64,
    pub height: f64,
    /// Ruling segments drawn on the page, in top-left coordinates.
    pub edges: Vec<Edge>,
}

/// Trait for PDF backends: page geometry, region text and region rendering.
pub trait PdfBackend: Send + Sync {
    /// Load geometry for every page of `pdf`, in page order.
    fn load_pages(&self, pdf: &Path) -> Result<Vec<PdfPage>, ScrapeError>;

    /// Plain text inside `region` of a page, in the text layer's reading order.
    fn extract_text(&self, pdf: &Path, page: &PdfPage, region: &BBox)
        -> Result<String, ScrapeError>;

    /// Rasterize `region` of a page to a PNG file at `dest`.
    fn render_region(
        &self,
        pdf: &Path,
        page: &PdfPage,
        region: &BBox,
        resolution: u32,
        dest: &Path,
    ) -> Result<(), ScrapeError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Body text and table regions of one page after header/footer cropping.
#[derive(Debug, Clone)]
pub struct PageExtract {
    pub crop: BBox,
    pub text: String,
    pub tables: Vec<BBox>,
}

/// Crop a page to its body and extract text and table regions from it.
///
/// The crop rectangle is `(left, top, width - right, height - bottom)`; a
/// rectangle that leaves the page or has no area is an `InvalidCrop` error.
pub fn extract_page(
    backend: &dyn PdfBackend,
    pdf: &Path,
    page: &PdfPage,
    margins: &PageMargins,
    settings: &TableSettings,
) -> Result<PageExtract, ScrapeError> {
    let crop = margins.crop_box(page.width, page.height);
    if !crop.fits_within(page.width, page.height) {
        return Err(ScrapeError::InvalidCrop {
            page: page.number,
            x0: crop.x0,
            top: crop.top,
            x1: crop.x1,
            bottom: crop.bottom,
            width: page.width,
            height: page.height,
        });
    }

    let text = backend.extract_text(pdf, page, &crop)?;
    let tables = table::find_tables(&page.edges, &crop, settings);
    log::debug!(
        "page {}: {} chars of body text, {} table(s)",
        page.number,
        text.len(),
        tables.len()
    );

    Ok(PageExtract { crop, text, tables })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_fits_within() {
        assert!(BBox::new(0.0, 57.0, 595.0, 772.0).fits_within(595.0, 842.0));
        assert!(!BBox::new(0.0, 57.0, 600.0, 772.0).fits_within(595.0, 842.0));
        assert!(!BBox::new(0.0, 500.0, 595.0, 400.0).fits_within(595.0, 842.0));
        assert!(!BBox::new(-1.0, 0.0, 10.0, 10.0).fits_within(595.0, 842.0));
    }

    #[test]
    fn test_edge_constructors_normalize() {
        let h = Edge::horizontal(50.0, 10.0, 5.0, EdgeSource::Line);
        assert_eq!((h.x0, h.x1), (10.0, 50.0));
        assert_eq!(h.length(), 40.0);
        let v = Edge::vertical(5.0, 80.0, 20.0, EdgeSource::RectSide);
        assert_eq!((v.top, v.bottom), (20.0, 80.0));
        assert_eq!(v.length(), 60.0);
    }
}
