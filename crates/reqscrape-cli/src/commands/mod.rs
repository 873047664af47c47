pub mod dump;
pub mod ocr;
pub mod presets;
pub mod scrape;
