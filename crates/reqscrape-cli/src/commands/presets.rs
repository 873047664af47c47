use std::path::Path;

use reqscrape_core::error::ScrapeError;
use reqscrape_core::presets::{Preset, PresetKind, PresetRegistry};

pub fn list(presets_file: Option<&Path>) -> Result<(), ScrapeError> {
    let registry = PresetRegistry::with_overrides(presets_file)?;

    for kind in PresetKind::ALL {
        println!("{}:", kind);
        for name in registry.names(kind) {
            let description = match registry.resolve(kind, name)? {
                Preset::Margins(m) => m.description.as_deref(),
                Preset::TableGeometry(t) => t.description.as_deref(),
                Preset::Pattern(p) => p.description.as_deref(),
            };
            match description {
                Some(desc) => println!("  {:<14} {}", name, desc),
                None => println!("  {}", name),
            }
        }
        println!();
    }
    Ok(())
}

pub fn show(presets_file: Option<&Path>, kind: &str, name: &str) -> Result<(), ScrapeError> {
    let kind = PresetKind::from_str_loose(kind).ok_or_else(|| {
        ScrapeError::InvalidPreset(format!(
            "unknown preset kind '{kind}'. Use margins, tables, headings or requirements"
        ))
    })?;
    let registry = PresetRegistry::with_overrides(presets_file)?;
    let preset = registry.resolve(kind, name)?;
    println!("{}", serde_json::to_string_pretty(&preset)?);
    Ok(())
}
