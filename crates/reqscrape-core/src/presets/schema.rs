use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::extraction::BBox;

/// A preset registry as stored on disk: four independent string-keyed tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDef {
    #[serde(default)]
    pub margins: BTreeMap<String, PageMargins>,
    #[serde(default)]
    pub table_geometry: BTreeMap<String, TableSettings>,
    #[serde(default)]
    pub heading_patterns: BTreeMap<String, PatternDef>,
    #[serde(default)]
    pub requirement_patterns: BTreeMap<String, PatternDef>,
}

/// Bands trimmed from each page edge, in PDF points.
///
/// `right` and `bottom` are distances from the right and bottom page edges,
/// so the crop rectangle is `(left, top, width - right, height - bottom)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
}

impl PageMargins {
    /// Crop rectangle for a page of the given size, in top-left coordinates.
    pub fn crop_box(&self, width: f64, height: f64) -> BBox {
        BBox {
            x0: self.left,
            top: self.top,
            x1: width - self.right,
            bottom: height - self.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Any ruling segment drawn on the page (stroked lines and rectangle sides).
    Lines,
    /// Only stroked line segments; rectangle sides are ignored.
    LinesStrict,
}

/// Table detection parameters, named after the settings of line-based
/// table finders. Tolerances are in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vertical_strategy: Strategy,
    pub horizontal_strategy: Strategy,
    pub snap_x_tolerance: f64,
    pub snap_y_tolerance: f64,
    pub join_x_tolerance: f64,
    pub join_y_tolerance: f64,
    pub edge_min_length: f64,
    /// Consumed by word-alignment strategies; carried unchanged.
    #[serde(default)]
    pub min_words_vertical: u32,
    #[serde(default)]
    pub min_words_horizontal: u32,
    #[serde(default)]
    pub text_x_tolerance: f64,
    #[serde(default)]
    pub text_y_tolerance: f64,
    pub intersection_x_tolerance: f64,
    pub intersection_y_tolerance: f64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            description: None,
            vertical_strategy: Strategy::Lines,
            horizontal_strategy: Strategy::Lines,
            snap_x_tolerance: 3.0,
            snap_y_tolerance: 3.0,
            join_x_tolerance: 3.0,
            join_y_tolerance: 3.0,
            edge_min_length: 3.0,
            min_words_vertical: 3,
            min_words_horizontal: 1,
            text_x_tolerance: 3.0,
            text_y_tolerance: 3.0,
            intersection_x_tolerance: 3.0,
            intersection_y_tolerance: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub pattern: String,
}
