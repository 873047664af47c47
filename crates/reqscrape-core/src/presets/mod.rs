pub mod builtin;
pub mod schema;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::ScrapeError;
use crate::matching::PatternMatcher;
use schema::{PageMargins, PatternDef, RegistryDef, TableSettings};

/// The four independent preset tables a name can be looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetKind {
    Margins,
    TableGeometry,
    HeadingPattern,
    RequirementPattern,
}

impl PresetKind {
    pub const ALL: [PresetKind; 4] = [
        PresetKind::Margins,
        PresetKind::TableGeometry,
        PresetKind::HeadingPattern,
        PresetKind::RequirementPattern,
    ];

    /// Parse the kind names accepted on the command line.
    pub fn from_str_loose(s: &str) -> Option<PresetKind> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "margins" | "margin" => Some(PresetKind::Margins),
            "tables" | "table" | "table geometry" => Some(PresetKind::TableGeometry),
            "headings" | "heading" | "heading pattern" => Some(PresetKind::HeadingPattern),
            "requirements" | "requirement" | "requirement pattern" => {
                Some(PresetKind::RequirementPattern)
            }
            _ => None,
        }
    }
}

impl fmt::Display for PresetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetKind::Margins => write!(f, "margins"),
            PresetKind::TableGeometry => write!(f, "table geometry"),
            PresetKind::HeadingPattern => write!(f, "heading pattern"),
            PresetKind::RequirementPattern => write!(f, "requirement pattern"),
        }
    }
}

/// A resolved preset of any kind, borrowed from the registry.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Preset<'a> {
    Margins(&'a PageMargins),
    TableGeometry(&'a TableSettings),
    Pattern(&'a PatternDef),
}

/// Named extraction presets. Built-in entries can be overridden or extended
/// from a JSON file with the same layout as `presets/registry.json`.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    def: RegistryDef,
}

impl PresetRegistry {
    pub fn builtin() -> Result<Self, ScrapeError> {
        let def = builtin::load_builtin()?;
        validate_registry(&def)?;
        Ok(Self { def })
    }

    /// Built-in presets, with entries from `overrides` replacing or adding to them.
    pub fn with_overrides(overrides: Option<&Path>) -> Result<Self, ScrapeError> {
        let mut registry = Self::builtin()?;
        if let Some(path) = overrides {
            let extra = load_registry(path)?;
            log::debug!("merging presets from {}", path.display());
            registry.merge(extra);
        }
        Ok(registry)
    }

    pub fn from_def(def: RegistryDef) -> Result<Self, ScrapeError> {
        validate_registry(&def)?;
        Ok(Self { def })
    }

    pub fn merge(&mut self, other: RegistryDef) {
        self.def.margins.extend(other.margins);
        self.def.table_geometry.extend(other.table_geometry);
        self.def.heading_patterns.extend(other.heading_patterns);
        self.def.requirement_patterns.extend(other.requirement_patterns);
    }

    /// Registered names for `kind`, sorted.
    pub fn names(&self, kind: PresetKind) -> Vec<&str> {
        match kind {
            PresetKind::Margins => keys(&self.def.margins),
            PresetKind::TableGeometry => keys(&self.def.table_geometry),
            PresetKind::HeadingPattern => keys(&self.def.heading_patterns),
            PresetKind::RequirementPattern => keys(&self.def.requirement_patterns),
        }
    }

    pub fn resolve(&self, kind: PresetKind, name: &str) -> Result<Preset<'_>, ScrapeError> {
        let found = match kind {
            PresetKind::Margins => self.def.margins.get(name).map(Preset::Margins),
            PresetKind::TableGeometry => self.def.table_geometry.get(name).map(Preset::TableGeometry),
            PresetKind::HeadingPattern => self.def.heading_patterns.get(name).map(Preset::Pattern),
            PresetKind::RequirementPattern => {
                self.def.requirement_patterns.get(name).map(Preset::Pattern)
            }
        };
        found.ok_or_else(|| self.unknown(kind, name))
    }

    pub fn margins(&self, name: &str) -> Result<&PageMargins, ScrapeError> {
        self.def
            .margins
            .get(name)
            .ok_or_else(|| self.unknown(PresetKind::Margins, name))
    }

    pub fn table_geometry(&self, name: &str) -> Result<&TableSettings, ScrapeError> {
        self.def
            .table_geometry
            .get(name)
            .ok_or_else(|| self.unknown(PresetKind::TableGeometry, name))
    }

    pub fn heading_pattern(&self, name: &str) -> Result<PatternMatcher, ScrapeError> {
        let def = self
            .def
            .heading_patterns
            .get(name)
            .ok_or_else(|| self.unknown(PresetKind::HeadingPattern, name))?;
        compile(PresetKind::HeadingPattern, name, def)
    }

    pub fn requirement_pattern(&self, name: &str) -> Result<PatternMatcher, ScrapeError> {
        let def = self
            .def
            .requirement_patterns
            .get(name)
            .ok_or_else(|| self.unknown(PresetKind::RequirementPattern, name))?;
        compile(PresetKind::RequirementPattern, name, def)
    }

    fn unknown(&self, kind: PresetKind, name: &str) -> ScrapeError {
        ScrapeError::UnknownPreset {
            kind,
            name: name.to_string(),
            available: self.names(kind).join(", "),
        }
    }
}

fn keys<V>(map: &BTreeMap<String, V>) -> Vec<&str> {
    map.keys().map(|k| k.as_str()).collect()
}

fn compile(kind: PresetKind, name: &str, def: &PatternDef) -> Result<PatternMatcher, ScrapeError> {
    PatternMatcher::new(&def.pattern).map_err(|e| ScrapeError::InvalidPattern {
        kind,
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Load a preset registry from a JSON file.
pub fn load_registry(path: &Path) -> Result<RegistryDef, ScrapeError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScrapeError::PresetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let def: RegistryDef = serde_json::from_str(&content).map_err(|e| ScrapeError::PresetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_registry(&def)?;
    Ok(def)
}

/// Parse a preset registry from a JSON string (no file path context).
pub fn parse_registry_str(json: &str) -> Result<RegistryDef, ScrapeError> {
    let def: RegistryDef = serde_json::from_str(json)?;
    validate_registry(&def)?;
    Ok(def)
}

/// Validate that every preset in a registry is usable.
pub fn validate_registry(def: &RegistryDef) -> Result<(), ScrapeError> {
    for (name, m) in &def.margins {
        if [m.left, m.top, m.right, m.bottom].iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(ScrapeError::InvalidPreset(format!(
                "margins preset '{}' has a negative or non-finite band",
                name
            )));
        }
    }

    for (name, t) in &def.table_geometry {
        let tolerances = [
            t.snap_x_tolerance,
            t.snap_y_tolerance,
            t.join_x_tolerance,
            t.join_y_tolerance,
            t.edge_min_length,
            t.text_x_tolerance,
            t.text_y_tolerance,
            t.intersection_x_tolerance,
            t.intersection_y_tolerance,
        ];
        if tolerances.iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(ScrapeError::InvalidPreset(format!(
                "table geometry preset '{}' has a negative or non-finite tolerance",
                name
            )));
        }
    }

    for (name, def) in &def.heading_patterns {
        compile(PresetKind::HeadingPattern, name, def)?;
    }
    for (name, def) in &def.requirement_patterns {
        compile(PresetKind::RequirementPattern, name, def)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_names() {
        let reg = PresetRegistry::builtin().unwrap();
        assert_eq!(reg.names(PresetKind::HeadingPattern), vec!["RMS QA SPEC", "TfNSW"]);
        assert_eq!(reg.names(PresetKind::RequirementPattern), vec!["General", "TfNSW"]);
    }

    #[test]
    fn test_unknown_preset_is_typed_error() {
        let reg = PresetRegistry::builtin().unwrap();
        let err = reg.margins("Nope").unwrap_err();
        match err {
            ScrapeError::UnknownPreset { kind, name, available } => {
                assert_eq!(kind, PresetKind::Margins);
                assert_eq!(name, "Nope");
                assert!(available.contains("TfNSW"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(reg.requirement_pattern("Nope").is_err());
        assert!(reg.resolve(PresetKind::TableGeometry, "Nope").is_err());
    }

    #[test]
    fn test_resolve_each_kind() {
        let reg = PresetRegistry::builtin().unwrap();
        for kind in PresetKind::ALL {
            let name = reg.names(kind)[0].to_string();
            assert!(reg.resolve(kind, &name).is_ok(), "{kind} {name}");
        }
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let json = r#"{
            "heading_patterns": { "Broken": { "pattern": "(unclosed" } }
        }"#;
        let err = parse_registry_str(json).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidPattern { .. }));
    }

    #[test]
    fn test_negative_margin_rejected() {
        let json = r#"{
            "margins": { "Bad": { "top": -5 } }
        }"#;
        assert!(parse_registry_str(json).is_err());
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let json = r#"{
            "margins": {
                "TfNSW": { "top": 40, "bottom": 60 },
                "Letter": { "top": 72, "bottom": 72 }
            }
        }"#;
        let mut reg = PresetRegistry::builtin().unwrap();
        reg.merge(parse_registry_str(json).unwrap());
        assert_eq!(reg.margins("TfNSW").unwrap().top, 40.0);
        assert_eq!(reg.margins("Letter").unwrap().bottom, 72.0);
        // Untouched tables keep their built-in entries.
        assert!(reg.heading_pattern("RMS QA SPEC").is_ok());
    }

    #[test]
    fn test_kind_from_str_loose() {
        assert_eq!(PresetKind::from_str_loose("Margins"), Some(PresetKind::Margins));
        assert_eq!(
            PresetKind::from_str_loose("table-geometry"),
            Some(PresetKind::TableGeometry)
        );
        assert_eq!(
            PresetKind::from_str_loose("requirements"),
            Some(PresetKind::RequirementPattern)
        );
        assert_eq!(PresetKind::from_str_loose("fonts"), None);
    }
}
