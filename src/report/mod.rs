//! Base report rendering
//!
//! Renders classified permission records as a static HTML document: a
//! summary of group counts, one table per non-empty group and, when
//! exclusions were applied, the per-pattern exclusion counts. Every value
//! sits alone in its `<td>` so the annotator can find it later.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::classify::Classification;
use crate::enrich::escape_html;
use crate::models::{format_timestamp, PermissionRecord};

/// Report header data
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    /// Where the records came from, shown under the title
    pub source: Option<String>,
}

/// Exclusion results shown at the end of the report
#[derive(Debug, Clone, Default)]
pub struct ExclusionSummary {
    pub excluded_count: usize,
    pub per_pattern_counts: BTreeMap<String, usize>,
}

const BASE_STYLE: &str = r#"<style id="permaudit-base">
body { font-family: -apple-system, "Segoe UI", Roboto, Helvetica, Arial, sans-serif; margin: 24px; color: #222; }
h1 { font-size: 22px; margin-bottom: 4px; }
h2 { font-size: 17px; margin-top: 28px; border-bottom: 2px solid #1565c0; padding-bottom: 4px; }
.meta { color: #666; font-size: 12px; }
table { border-collapse: collapse; width: 100%; font-size: 13px; }
th { background: #1565c0; color: #fff; text-align: left; padding: 6px 8px; }
td { border-bottom: 1px solid #e0e0e0; padding: 5px 8px; vertical-align: top; }
tbody tr:nth-child(even) { background: #f7f9fc; }
.summary td.count { text-align: right; font-variant-numeric: tabular-nums; }
</style>"#;

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn cell(out: &mut String, text: &str) {
    let _ = write!(out, "<td>{}</td>", escape_html(text));
}

fn record_row(out: &mut String, record: &PermissionRecord) {
    out.push_str("<tr>");
    cell(out, &record.entity);
    cell(out, &record.entity_type);
    cell(out, &record.principal);
    cell(out, &record.role);
    cell(out, yes_no(record.inherited));
    cell(out, yes_no(record.propagate));
    cell(out, &record.source.to_string());
    cell(out, &format_timestamp(record.created_date.as_ref()));
    out.push_str("</tr>\n");
}

/// Render the complete base report
pub fn render_report(
    classification: &Classification,
    exclusions: Option<&ExclusionSummary>,
    meta: &ReportMeta,
) -> String {
    let mut out = String::with_capacity(4096 + classification.total() * 320);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n{}\n</head>\n<body>\n",
        escape_html(&meta.title),
        BASE_STYLE
    );

    let _ = writeln!(out, "<h1>{}</h1>", escape_html(&meta.title));
    let _ = write!(
        out,
        "<p class=\"meta\">Generated {}",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(source) = &meta.source {
        let _ = write!(out, " from {}", escape_html(source));
    }
    let _ = writeln!(out, " &middot; {} permission(s)</p>", classification.total());

    out.push_str("<h2>Summary</h2>\n<table class=\"summary\">\n<thead><tr><th>Category</th><th>Permissions</th></tr></thead>\n<tbody>\n");
    for (group, count) in &classification.counts {
        let _ = writeln!(
            out,
            "<tr><th scope=\"row\">{}</th><td class=\"count\">{}</td></tr>",
            group.title(),
            count
        );
    }
    out.push_str("</tbody>\n</table>\n");

    for (group, records) in classification.non_empty() {
        let _ = writeln!(out, "<h2 id=\"group-{:?}\">{} ({})</h2>", group, group.title(), records.len());
        out.push_str(
            "<table class=\"permissions\">\n<thead><tr><th>Entity</th><th>Type</th><th>Principal</th>\
             <th>Role</th><th>Inherited</th><th>Propagate</th><th>Source</th><th>Created</th></tr></thead>\n<tbody>\n",
        );
        for record in records {
            record_row(&mut out, record);
        }
        out.push_str("</tbody>\n</table>\n");
    }

    if let Some(summary) = exclusions {
        let _ = writeln!(out, "<h2>Exclusions ({} suppressed)</h2>", summary.excluded_count);
        out.push_str("<table class=\"exclusions\">\n<thead><tr><th>Pattern</th><th>Excluded</th></tr></thead>\n<tbody>\n");
        for (pattern, count) in &summary.per_pattern_counts {
            let _ = writeln!(
                out,
                "<tr><th scope=\"row\">{}</th><td class=\"count\">{}</td></tr>",
                escape_html(pattern),
                count
            );
        }
        out.push_str("</tbody>\n</table>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}
