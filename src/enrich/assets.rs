//! Tooltip styles, scripts and their injection into a report document

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{TOOLTIP_CLASS, TOOLTIP_TEXT_CLASS};

/// Tooltip color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Blue,
}

/// Fixed colors of a theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub text: &'static str,
    pub border: &'static str,
    pub accent: &'static str,
    pub shadow: &'static str,
}

impl Theme {
    pub fn palette(&self) -> Palette {
        match self {
            Theme::Dark => Palette {
                background: "#2b2b2b",
                text: "#f0f0f0",
                border: "#555555",
                accent: "#4fc3f7",
                shadow: "rgba(0, 0, 0, 0.5)",
            },
            Theme::Light => Palette {
                background: "#ffffff",
                text: "#222222",
                border: "#cccccc",
                accent: "#1565c0",
                shadow: "rgba(0, 0, 0, 0.2)",
            },
            Theme::Blue => Palette {
                background: "#0d2a4a",
                text: "#e3f2fd",
                border: "#1e88e5",
                accent: "#90caf9",
                shadow: "rgba(13, 42, 74, 0.5)",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Blue => "blue",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "blue" => Ok(Theme::Blue),
            other => Err(format!("unknown theme '{}' (expected dark, light or blue)", other)),
        }
    }
}

/// Stylesheet for tooltip spans
pub fn generate_styles(theme: Theme, max_width: u32) -> String {
    let p = theme.palette();
    format!(
        r#"<style id="perm-tooltip-styles">
.{wrap} {{ position: relative; cursor: help; border-bottom: 1px dotted {accent}; }}
.{wrap}:focus {{ outline: 2px solid {accent}; outline-offset: 1px; }}
.{wrap} .{text} {{
  visibility: hidden; opacity: 0; position: absolute; z-index: 1000;
  left: 0; top: 100%; margin-top: 6px; width: max-content; max-width: {max_width}px;
  background: {background}; color: {fg}; border: 1px solid {border}; border-radius: 6px;
  padding: 10px 12px; box-shadow: 0 4px 12px {shadow}; font-size: 12px; line-height: 1.4;
  text-align: left; white-space: normal; transition: opacity 0.15s ease-in-out;
}}
.{wrap}:hover .{text}, .{wrap}:focus .{text}, .{wrap}.tooltip-open .{text} {{ visibility: visible; opacity: 1; }}
.{text} .tooltip-section {{ margin-bottom: 6px; }}
.{text} .tooltip-header {{ color: {accent}; font-weight: bold; text-transform: uppercase; font-size: 10px; }}
.{text} .tooltip-type, .{text} .tooltip-meta {{ opacity: 0.75; }}
.{text} .tooltip-description {{ font-style: italic; }}
.{text} .tooltip-flag-on {{ color: {accent}; font-weight: bold; }}
.{text} .tooltip-permissions {{ margin: 2px 0 0 16px; padding: 0; }}
.perm-filter {{ margin: 12px 0; padding: 6px 8px; width: 320px; border: 1px solid {border}; border-radius: 4px; }}
</style>"#,
        wrap = TOOLTIP_CLASS,
        text = TOOLTIP_TEXT_CLASS,
        max_width = max_width,
        background = p.background,
        fg = p.text,
        border = p.border,
        accent = p.accent,
        shadow = p.shadow,
    )
}

const BASE_SCRIPT: &str = r#"
  document.querySelectorAll('.perm-tooltip').forEach(function (el) {
    el.addEventListener('mouseenter', function () {
      var tip = el.querySelector('.perm-tooltip-text');
      if (!tip) { return; }
      var rect = tip.getBoundingClientRect();
      if (rect.right > window.innerWidth) { tip.style.left = 'auto'; tip.style.right = '0'; }
      if (rect.bottom > window.innerHeight) { tip.style.top = 'auto'; tip.style.bottom = '100%'; }
    });
  });
"#;

const KEYBOARD_SCRIPT: &str = r#"
  document.addEventListener('keydown', function (event) {
    var el = document.activeElement;
    if (!el || !el.classList || !el.classList.contains('perm-tooltip')) { return; }
    if (event.key === 'Enter' || event.key === ' ') {
      el.classList.toggle('tooltip-open');
      event.preventDefault();
    } else if (event.key === 'Escape') {
      el.classList.remove('tooltip-open');
      el.blur();
    }
  });
"#;

const FILTER_SCRIPT: &str = r#"
  document.querySelectorAll('table').forEach(function (table) {
    var input = document.createElement('input');
    input.type = 'search';
    input.className = 'perm-filter';
    input.placeholder = 'Filter rows...';
    input.addEventListener('input', function () {
      var needle = input.value.toLowerCase();
      table.querySelectorAll('tbody tr').forEach(function (row) {
        row.style.display = row.textContent.toLowerCase().indexOf(needle) === -1 ? 'none' : '';
      });
    });
    table.parentNode.insertBefore(input, table);
  });
"#;

/// Script enabling tooltip positioning plus the optional fragments
pub fn generate_behavior(keyboard: bool, filtering: bool) -> String {
    let mut script = String::from("<script id=\"perm-tooltip-behavior\">\ndocument.addEventListener('DOMContentLoaded', function () {");
    script.push_str(BASE_SCRIPT);
    if keyboard {
        script.push_str(KEYBOARD_SCRIPT);
    }
    if filtering {
        script.push_str(FILTER_SCRIPT);
    }
    script.push_str("});\n</script>");
    script
}

/// Locate the first `<name>` or `<name attr...>` opening tag, ASCII case-insensitively.
/// Returns the byte range of the whole tag.
fn find_open_tag(document: &str, name: &str) -> Option<(usize, usize)> {
    let lower = document.to_ascii_lowercase();
    let needle = format!("<{}", name);
    let mut from = 0;

    while let Some(offset) = lower[from..].find(&needle) {
        let start = from + offset;
        let after = start + needle.len();
        match lower[after..].chars().next() {
            Some('>') => return Some((start, after + 1)),
            Some(c) if c.is_ascii_whitespace() => {
                return lower[after..].find('>').map(|close| (start, after + close + 1));
            }
            _ => from = after,
        }
    }
    None
}

/// Byte offset of the last `</name>` closing tag, ASCII case-insensitively
fn find_last_close_tag(document: &str, name: &str) -> Option<usize> {
    let lower = document.to_ascii_lowercase();
    let needle = format!("</{}", name);

    lower
        .rmatch_indices(&needle)
        .map(|(start, _)| start)
        .find(|start| lower[start + needle.len()..].trim_start().starts_with('>'))
}

const STYLE_OPEN: &str = "<style id=\"perm-tooltip-styles\">";
const BEHAVIOR_OPEN: &str = "<script id=\"perm-tooltip-behavior\">";

/// Remove a block left by an earlier run together with one adjacent newline
fn strip_block(document: &str, open: &str, close: &str, newline_before: bool) -> String {
    let Some(mut start) = document.find(open) else {
        return document.to_string();
    };
    let Some(length) = document[start..].find(close) else {
        return document.to_string();
    };
    let mut end = start + length + close.len();

    let before = document[..start].ends_with('\n');
    let after = document[end..].starts_with('\n');
    if (newline_before || !after) && before {
        start -= 1;
    } else if after {
        end += 1;
    }

    format!("{}{}", &document[..start], &document[end..])
}

/// Insert the style block into the header and the behavior block before the
/// end of the body. Blocks from a previous enrichment are replaced.
pub fn inject(document: &str, style: &str, behavior: &str) -> String {
    let document = strip_block(document, STYLE_OPEN, "</style>", true);
    let document = strip_block(&document, BEHAVIOR_OPEN, "</script>", false);
    let document = document.as_str();

    let mut out = String::with_capacity(document.len() + style.len() + behavior.len() + 32);

    if let Some((_, end)) = find_open_tag(document, "head") {
        out.push_str(&document[..end]);
        out.push('\n');
        out.push_str(style);
        out.push_str(&document[end..]);
    } else if let Some((_, end)) = find_open_tag(document, "html") {
        out.push_str(&document[..end]);
        out.push_str("\n<head>\n");
        out.push_str(style);
        out.push_str("\n</head>");
        out.push_str(&document[end..]);
    } else {
        out.push_str(style);
        out.push('\n');
        out.push_str(document);
    }

    match find_last_close_tag(&out, "body") {
        Some(position) => {
            out.insert_str(position, "\n");
            out.insert_str(position, behavior);
        }
        None => {
            out.push('\n');
            out.push_str(behavior);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parsing() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" blue ".parse::<Theme>().unwrap(), Theme::Blue);
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn test_palettes_differ() {
        assert_ne!(Theme::Dark.palette(), Theme::Light.palette());
        assert_ne!(Theme::Light.palette(), Theme::Blue.palette());
    }

    #[test]
    fn test_styles_use_palette_and_width() {
        let css = generate_styles(Theme::Blue, 520);
        assert!(css.contains("max-width: 520px"));
        assert!(css.contains(Theme::Blue.palette().background));
        assert!(css.contains(".perm-tooltip .perm-tooltip-text"));
    }

    #[test]
    fn test_behavior_toggles() {
        let base = generate_behavior(false, false);
        assert!(!base.contains("keydown"));
        assert!(!base.contains("perm-filter"));

        let all = generate_behavior(true, true);
        assert!(all.contains("keydown"));
        assert!(all.contains("perm-filter"));
        assert!(all.starts_with("<script"));
        assert!(all.ends_with("</script>"));
    }

    #[test]
    fn test_inject_into_full_document() {
        let doc = "<!DOCTYPE html><html lang=\"en\"><head><title>x</title></head><body><p>hi</p></body></html>";
        let out = inject(doc, "<style>S</style>", "<script>B</script>");
        assert!(out.contains("<head>\n<style>S</style><title>x</title>"));
        assert!(out.contains("<p>hi</p><script>B</script>\n</body></html>"));
    }

    #[test]
    fn test_inject_without_head_synthesizes_one() {
        let doc = "<html><body>t</body></html>";
        let out = inject(doc, "<style>S</style>", "<script>B</script>");
        assert!(out.starts_with("<html>\n<head>\n<style>S</style>\n</head><body>"));
    }

    #[test]
    fn test_inject_into_fragment() {
        let out = inject("<table></table>", "<style>S</style>", "<script>B</script>");
        assert_eq!(out, "<style>S</style>\n<table></table>\n<script>B</script>");
    }

    #[test]
    fn test_header_element_is_not_head() {
        let doc = "<html><body><header>h</header></body></html>";
        let out = inject(doc, "<style>S</style>", "");
        assert!(out.starts_with("<html>\n<head>"));
        assert!(out.contains("<header>h</header>"));
    }

    #[test]
    fn test_reinjection_replaces_previous_blocks() {
        let doc = "<html><head><title>x</title></head><body><p>hi</p></body></html>";
        let style = generate_styles(Theme::Dark, 400);
        let behavior = generate_behavior(true, true);
        assert!(style.starts_with(STYLE_OPEN));
        assert!(behavior.starts_with(BEHAVIOR_OPEN));

        let once = inject(doc, &style, &behavior);
        let twice = inject(&once, &style, &behavior);
        assert_eq!(once, twice);

        let light = inject(&once, &generate_styles(Theme::Light, 400), &behavior);
        assert_eq!(light.matches(STYLE_OPEN).count(), 1);
        assert!(light.contains(Theme::Light.palette().background));
        assert!(!light.contains(Theme::Dark.palette().background));
    }

    #[test]
    fn test_reinjection_into_fragment_is_stable() {
        let style = generate_styles(Theme::Blue, 300);
        let behavior = generate_behavior(false, false);
        let once = inject("<table></table>", &style, &behavior);
        assert_eq!(inject(&once, &style, &behavior), once);
    }

    #[test]
    fn test_behavior_goes_before_last_body_close() {
        let doc = "<HTML><HEAD></HEAD><BODY><pre>&lt;/body&gt; </body> sample</pre></BODY></HTML>";
        let out = inject(doc, "", "<script>B</script>");
        assert!(out.ends_with("<script>B</script>\n</BODY></HTML>"));
    }
}
