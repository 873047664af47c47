use std::path::Path;

use reqscrape_core::spreadsheet::PostProcessReport;
use reqscrape_core::BatchReport;

/// Print a run summary to stderr, listing every document that was skipped.
pub fn print_batch(report: &BatchReport, resolved: &PostProcessReport, workbook: &Path) {
    let succeeded = report.documents - report.failures.len();
    eprintln!(
        "Scraped {} requirement(s) from {} of {} document(s), written to {}",
        report.rows.len(),
        succeeded,
        report.documents,
        workbook.display()
    );

    if report.tables > 0 {
        eprintln!(
            "  {} table(s): {} embedded, {} labelled",
            report.tables, resolved.embedded, resolved.labelled
        );
    }
    if resolved.missing > 0 {
        eprintln!("  {} table image(s) missing", resolved.missing);
    }

    if !report.failures.is_empty() {
        eprintln!("\nSkipped documents:");
        for f in &report.failures {
            eprintln!("  - {}: {}", f.document, f.reason);
        }
    }
}
