use crate::error::ScrapeError;
use crate::presets::schema::RegistryDef;

const REGISTRY_JSON: &str = include_str!("../../../../presets/registry.json");

/// Preset names used when the caller does not pick one.
pub const DEFAULT_MARGINS: &str = "TfNSW";
pub const DEFAULT_TABLE_GEOMETRY: &str = "TfNSW";
pub const DEFAULT_HEADINGS: &str = "TfNSW";
pub const DEFAULT_REQUIREMENTS: &str = "TfNSW";

/// Parse the registry compiled into the binary.
pub fn load_builtin() -> Result<RegistryDef, ScrapeError> {
    let registry: RegistryDef = serde_json::from_str(REGISTRY_JSON)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::schema::Strategy;

    #[test]
    fn test_builtin_parses() {
        let reg = load_builtin().unwrap();
        assert!(reg.margins.contains_key(DEFAULT_MARGINS));
        assert!(reg.table_geometry.contains_key(DEFAULT_TABLE_GEOMETRY));
        assert!(reg.heading_patterns.contains_key(DEFAULT_HEADINGS));
        assert!(reg.heading_patterns.contains_key("RMS QA SPEC"));
        assert!(reg.requirement_patterns.contains_key(DEFAULT_REQUIREMENTS));
        assert!(reg.requirement_patterns.contains_key("General"));
    }

    #[test]
    fn test_tfnsw_margins() {
        let reg = load_builtin().unwrap();
        let m = &reg.margins["TfNSW"];
        let crop = m.crop_box(595.0, 842.0);
        assert_eq!(crop.x0, 0.0);
        assert_eq!(crop.top, 57.0);
        assert_eq!(crop.x1, 595.0);
        assert_eq!(crop.bottom, 772.0);
    }

    #[test]
    fn test_tfnsw_table_geometry() {
        let reg = load_builtin().unwrap();
        let t = &reg.table_geometry["TfNSW"];
        assert_eq!(t.vertical_strategy, Strategy::Lines);
        assert_eq!(t.horizontal_strategy, Strategy::Lines);
        assert_eq!(t.snap_x_tolerance, 10.0);
        assert_eq!(t.join_y_tolerance, 3.0);
        assert_eq!(t.min_words_vertical, 3);
        assert_eq!(t.min_words_horizontal, 1);
    }
}
