//! Tooltip content rendering
//!
//! Produces the HTML fragment shown when a report cell is hovered or
//! focused. Output depends only on the entry, so repeated runs produce
//! byte-identical fragments.

use std::fmt::Write;

use crate::enrich::escape_html;
use crate::models::{format_timestamp, TooltipEntry};

const MARKER_ON: &str = "&#10003;";
const MARKER_OFF: &str = "&#10007;";

fn section(out: &mut String, header: &str, body: &str) {
    let _ = write!(
        out,
        "<div class=\"tooltip-section\"><div class=\"tooltip-header\">{}</div>{}</div>",
        header, body
    );
}

fn flag(enabled: bool, on_label: &str, off_label: &str) -> String {
    if enabled {
        format!("<span class=\"tooltip-flag tooltip-flag-on\">{} {}</span>", MARKER_ON, on_label)
    } else {
        format!("<span class=\"tooltip-flag\">{} {}</span>", MARKER_OFF, off_label)
    }
}

/// Render the tooltip body for one entry
pub fn render_tooltip(entry: &TooltipEntry) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str("<div class=\"tooltip-content\">");

    section(
        &mut out,
        "Entity",
        &format!(
            "<div class=\"tooltip-value\">{} <span class=\"tooltip-type\">({})</span></div>",
            escape_html(&entry.entity_name),
            escape_html(&entry.entity_type)
        ),
    );

    section(
        &mut out,
        "Principal",
        &format!("<div class=\"tooltip-value\">{}</div>", escape_html(&entry.principal)),
    );

    section(
        &mut out,
        "Role",
        &format!(
            "<div class=\"tooltip-value\">{}</div><div class=\"tooltip-description\">{}</div>",
            escape_html(&entry.role),
            escape_html(&entry.role_description)
        ),
    );

    let details = &entry.details;
    section(
        &mut out,
        "Properties",
        &format!(
            "<div class=\"tooltip-value\">{}<br>{}</div>\
             <div class=\"tooltip-meta\">Source: {}<br>Created: {}<br>Modified: {}</div>",
            flag(entry.inherited, "Inherited", "Not inherited"),
            flag(entry.propagate, "Propagates to children", "Does not propagate"),
            details.source,
            format_timestamp(details.created_date.as_ref()),
            format_timestamp(details.modified_date.as_ref())
        ),
    );

    if !details.capabilities.is_empty() {
        let mut list = String::from("<ul class=\"tooltip-permissions\">");
        for capability in &details.capabilities {
            let _ = write!(list, "<li>{}</li>", escape_html(capability));
        }
        list.push_str("</ul>");
        section(&mut out, "Permissions", &list);
    }

    out.push_str("</div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PermissionSource, TooltipDetails};

    fn entry() -> TooltipEntry {
        TooltipEntry {
            entity_name: "VM-Web01".to_string(),
            entity_type: "VirtualMachine".to_string(),
            principal: "DOMAIN\\webadmins".to_string(),
            role: "VirtualMachinePowerUser".to_string(),
            role_description: "Power users <3".to_string(),
            inherited: true,
            propagate: false,
            details: TooltipDetails {
                created_date: None,
                modified_date: None,
                source: PermissionSource::Object,
                capabilities: vec!["Power on".to_string(), "Snapshots".to_string()],
            },
        }
    }

    #[test]
    fn test_sections_in_order() {
        let html = render_tooltip(&entry());
        let positions: Vec<usize> = ["Entity", "Principal", "Role", "Properties", "Permissions"]
            .iter()
            .map(|header| html.find(&format!(">{}</div>", header)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_flags_have_distinct_markers() {
        let html = render_tooltip(&entry());
        assert!(html.contains("tooltip-flag-on\">&#10003; Inherited"));
        assert!(html.contains("&#10007; Does not propagate"));
    }

    #[test]
    fn test_one_bullet_per_capability() {
        let html = render_tooltip(&entry());
        assert_eq!(html.matches("<li>").count(), 2);
        assert!(html.contains("<li>Power on</li><li>Snapshots</li>"));
    }

    #[test]
    fn test_permissions_section_omitted_without_capabilities() {
        let mut e = entry();
        e.details.capabilities.clear();
        let html = render_tooltip(&e);
        assert!(!html.contains("Permissions"));
        assert!(!html.contains("<ul"));
    }

    #[test]
    fn test_text_is_escaped_and_output_deterministic() {
        let html = render_tooltip(&entry());
        assert!(html.contains("Power users &lt;3"));
        assert!(html.contains("Created: N/A"));
        assert_eq!(html, render_tooltip(&entry()));
    }
}
