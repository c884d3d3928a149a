//! Fixed-layout plain-text report (`<name>_report.txt`).

use crate::result::ResultPayload;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 50;

/// Render the report for `payload`.
///
/// The TABLES SUMMARY section is emitted only when at least one table was
/// found.
pub fn render_report(payload: &ResultPayload) -> String {
    let mut out = String::with_capacity(2048);
    let meta = &payload.metadata;
    let stats = &payload.statistics;
    let conf = &meta.configuration;
    let summary = &payload.extraction_summary;

    out.push_str("DOCLING PDF PROCESSING REPORT\n");
    rule(&mut out, '=');
    out.push('\n');

    heading(&mut out, "DOCUMENT INFORMATION");
    line(&mut out, "Source File", &meta.source_file);
    line(&mut out, "File Size", format!("{} MB", decimal(meta.file_size_mb)));
    line(
        &mut out,
        "Processing Time",
        format!("{} seconds", decimal(meta.processing_time_seconds)),
    );
    line(&mut out, "Processed On", &meta.processing_timestamp);
    line(&mut out, "Total Pages", meta.num_pages);
    out.push('\n');

    heading(&mut out, "CONTENT STATISTICS");
    line(&mut out, "Tables Found", stats.num_tables);
    line(&mut out, "Images Found", stats.num_pictures);
    line(&mut out, "Figures Found", stats.num_figures);
    line(&mut out, "Estimated Word Count", stats.estimated_word_count);
    out.push('\n');

    heading(&mut out, "PROCESSING CONFIGURATION");
    line(&mut out, "OCR Enabled", conf.ocr_enabled);
    line(&mut out, "Table Extraction", conf.table_extraction);
    line(&mut out, "Image Processing", conf.image_processing);
    line(&mut out, "Picture Classification", conf.picture_classification);
    out.push('\n');

    if !summary.tables.is_empty() {
        heading(&mut out, "TABLES SUMMARY");
        for t in &summary.tables {
            let _ = writeln!(
                out,
                "Table {}: {} rows × {} columns",
                t.table_id, t.rows, t.columns
            );
        }
        out.push('\n');
    }

    heading(&mut out, "TEXT PREVIEW");
    out.push_str(&summary.text_preview);
    out.push_str("\n\n");

    rule(&mut out, '=');
    out.push_str("Report generated by pdf2struct\n");
    out
}

fn heading(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(&"-".repeat(title.chars().count()));
    out.push('\n');
}

fn rule(out: &mut String, c: char) {
    out.extend(std::iter::repeat(c).take(RULE_WIDTH));
    out.push('\n');
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{label}: {value}");
}

/// Render a float with at least one decimal place (`3` → `3.0`).
fn decimal(x: f64) -> String {
    let s = x.to_string();
    if x.is_finite() && !s.contains('.') && !s.contains('e') {
        format!("{s}.0")
    } else {
        s
    }
}
