//! Document annotation
//!
//! Wraps plain-text table cells of a report with interactive tooltip spans.
//! The document is never parsed; cells are located by pattern. For each entry
//! the entity, principal and role are tried in that order and only the first
//! matching cell in the document is wrapped.
//!
//! An entry is skipped when the document already holds an annotation span
//! wrapping its entity, principal or role text. That makes repeated and
//! resumed runs idempotent. The check is textual, so an entry that shares a
//! principal or role with an earlier annotated entry is skipped as well.

use log::{debug, trace};
use regex::{Captures, Regex};

use crate::constants::{TOOLTIP_CLASS, TOOLTIP_TEXT_CLASS};
use crate::enrich::escape_html;
use crate::enrich::tooltip::render_tooltip;
use crate::models::TooltipEntry;

fn annotation_open() -> String {
    format!("<span class=\"{}\" tabindex=\"0\">", TOOLTIP_CLASS)
}

fn tooltip_open() -> String {
    format!("<span class=\"{}\"", TOOLTIP_TEXT_CLASS)
}

/// True if `text` (already escaped) is wrapped by an annotation span
pub fn is_annotated(document: &str, escaped_text: &str) -> bool {
    let needle = format!("{}{}{}", annotation_open(), escaped_text, tooltip_open());
    document.contains(&needle)
}

/// Number of annotation spans in a document
pub fn count_annotations(document: &str) -> usize {
    document.matches(&annotation_open()).count()
}

fn wrap(escaped_text: &str, key: &str, content: &str) -> String {
    format!(
        "{}{}{} role=\"tooltip\" data-tooltip-key=\"{}\">{}</span></span>",
        annotation_open(),
        escaped_text,
        tooltip_open(),
        escape_html(key),
        content
    )
}

/// Bytes one annotation of `entry` adds to a document
pub fn span_growth(key: &str, entry: &TooltipEntry) -> usize {
    wrap("", key, &render_tooltip(entry)).len()
}

/// Pattern for a `<td>` whose entire content is `escaped_text`
fn cell_pattern(escaped_text: &str) -> Option<Regex> {
    let pattern = format!(r"(<td(?:\s[^>]*)?>\s*){}(\s*</td>)", regex::escape(escaped_text));
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            debug!("Cannot build cell pattern for '{}': {}", escaped_text, err);
            None
        }
    }
}

/// Annotate one entry. Returns the rewritten document, or `None` when the
/// entry is already annotated or none of its texts sits alone in a cell.
pub fn annotate_entry(document: &str, key: &str, entry: &TooltipEntry) -> Option<String> {
    let candidates: Vec<String> = [&entry.entity_name, &entry.principal, &entry.role]
        .iter()
        .map(|text| escape_html(text.trim()))
        .filter(|text| !text.is_empty())
        .collect();

    if candidates.iter().any(|text| is_annotated(document, text)) {
        trace!("Skipping '{}': already annotated", key);
        return None;
    }

    let content = render_tooltip(entry);

    for text in &candidates {
        let Some(pattern) = cell_pattern(text) else {
            continue;
        };
        if !pattern.is_match(document) {
            continue;
        }

        let wrapped = wrap(text, key, &content);
        let rewritten = pattern.replacen(document, 1, |caps: &Captures| {
            format!("{}{}{}", &caps[1], wrapped, &caps[2])
        });
        return Some(rewritten.into_owned());
    }

    trace!("No table cell found for '{}'", key);
    None
}

/// Annotate entries in the given order and report how many spans were added
pub fn annotate_counted<'a, I>(document: &str, entries: I) -> (String, usize)
where
    I: IntoIterator<Item = (&'a String, &'a TooltipEntry)>,
{
    let mut current = document.to_string();
    let mut added = 0;

    for (key, entry) in entries {
        if let Some(next) = annotate_entry(&current, key, entry) {
            current = next;
            added += 1;
        }
    }

    (current, added)
}

/// Annotate entries in the given order
pub fn annotate<'a, I>(document: &str, entries: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a TooltipEntry)>,
{
    annotate_counted(document, entries).0
}
