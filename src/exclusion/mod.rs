//! Principal exclusion matching
//!
//! Suppresses high-noise service-account bindings before they reach the report.
//! Patterns are plain text where `*` matches any sequence of characters; every
//! other character matches itself. Matching is anchored to the whole principal
//! and case-insensitive. The first matching pattern in file order wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::config::ConfigError;
use crate::models::PermissionRecord;

/// Compiled size limit per pattern; principal patterns stay far below it
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Origin label for patterns not read from a file
pub const INLINE_ORIGIN: &str = "inline";

/// One compiled exclusion line
#[derive(Debug, Clone)]
pub struct ExclusionPattern {
    /// Literal text as written, may contain `*`
    pub original: String,
    /// Pattern file path, or a label for inline patterns
    pub origin: String,
    /// 1-based line number within `origin`
    pub source_line: usize,
    matcher: Regex,
}

impl ExclusionPattern {
    pub fn matches(&self, principal: &str) -> bool {
        self.matcher.is_match(principal)
    }
}

/// A pattern line that could not be compiled
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternWarning {
    pub origin: String,
    pub source_line: usize,
    pub pattern: String,
    pub reason: String,
}

/// Ordered set of exclusion patterns plus the lines that were skipped
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    pub patterns: Vec<ExclusionPattern>,
    pub warnings: Vec<PatternWarning>,
}

/// Result of testing one principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionMatch {
    pub is_excluded: bool,
    pub matched_pattern: Option<String>,
}

/// Result of filtering a record set
#[derive(Debug, Clone)]
pub struct ExclusionOutcome {
    pub kept: Vec<PermissionRecord>,
    pub excluded_count: usize,
    /// Every compiled pattern with the number of records it excluded
    pub per_pattern_counts: BTreeMap<String, usize>,
}

/// Translate a wildcard pattern into an anchored regular expression.
///
/// All regex metacharacters are escaped first, then the escaped `*` is turned
/// back into `.*`. `regex::escape` always emits `\*` for a literal star, and an
/// escaped backslash (`\\`) is never directly followed by `*`, so the
/// replacement only touches the original wildcards.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    format!("^{}$", escaped)
}

/// Compile inline pattern lines, skipping blanks and `#` comments.
pub fn compile<I, S>(lines: I) -> ExclusionSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    compile_from(INLINE_ORIGIN, lines)
}

/// Compile pattern lines read from `origin`
pub fn compile_from<I, S>(origin: &str, lines: I) -> ExclusionSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = ExclusionSet::default();

    for (index, line) in lines.into_iter().enumerate() {
        let text = line.as_ref().trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let source_line = index + 1;
        match RegexBuilder::new(&wildcard_to_regex(text))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(matcher) => set.patterns.push(ExclusionPattern {
                original: text.to_string(),
                origin: origin.to_string(),
                source_line,
                matcher,
            }),
            Err(err) => {
                warn!("Skipping exclusion pattern {}:{}: '{}' ({})", origin, source_line, text, err);
                set.warnings.push(PatternWarning {
                    origin: origin.to_string(),
                    source_line,
                    pattern: text.to_string(),
                    reason: err.to_string(),
                });
            }
        }
    }

    debug!("Compiled {} exclusion pattern(s)", set.patterns.len());
    set
}

impl ExclusionSet {
    /// Read and compile a pattern file, one pattern per line
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        // Editors on Windows often save a byte-order mark that trim() keeps
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        Ok(compile_from(&path.display().to_string(), content.lines()))
    }

    /// Append the patterns of another set, keeping order and origins
    pub fn extend(&mut self, other: ExclusionSet) {
        self.patterns.extend(other.patterns);
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}

/// Test a principal against the set; the first matching pattern wins
pub fn test(principal: &str, set: &ExclusionSet) -> ExclusionMatch {
    match set.patterns.iter().find(|pattern| pattern.matches(principal)) {
        Some(pattern) => ExclusionMatch {
            is_excluded: true,
            matched_pattern: Some(pattern.original.clone()),
        },
        None => ExclusionMatch {
            is_excluded: false,
            matched_pattern: None,
        },
    }
}

/// Drop records whose principal matches any pattern.
/// An empty set keeps every record unchanged.
pub fn filter(records: Vec<PermissionRecord>, set: &ExclusionSet) -> ExclusionOutcome {
    let mut per_pattern_counts: BTreeMap<String, usize> = set
        .patterns
        .iter()
        .map(|pattern| (pattern.original.clone(), 0))
        .collect();

    if set.is_empty() {
        return ExclusionOutcome {
            kept: records,
            excluded_count: 0,
            per_pattern_counts,
        };
    }

    let mut kept = Vec::with_capacity(records.len());
    let mut excluded_count = 0;

    for record in records {
        match test(&record.principal, set).matched_pattern {
            Some(pattern) => {
                excluded_count += 1;
                *per_pattern_counts.entry(pattern).or_insert(0) += 1;
            }
            None => kept.push(record),
        }
    }

    debug!("Excluded {} record(s), kept {}", excluded_count, kept.len());

    ExclusionOutcome {
        kept,
        excluded_count,
        per_pattern_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(principal: &str) -> PermissionRecord {
        PermissionRecord::new("VM-Web01", "VirtualMachine", principal, "Read-only")
    }

    #[test]
    fn test_wildcard_translation() {
        assert!(wildcard_to_regex("vpxd-*").ends_with(".*$"));
        assert_eq!(wildcard_to_regex("ADMIN\\*"), "^ADMIN\\\\.*$");
        assert_eq!(wildcard_to_regex("**"), "^.*.*$");
        assert_eq!(wildcard_to_regex("a.b"), "^a\\.b$");
    }

    #[test]
    fn test_compile_skips_blank_and_comment_lines() {
        let set = compile(["# service accounts", "", "   ", "  # indented comment", "VSPHERE.LOCAL\\vpxd-*"]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.patterns[0].original, "VSPHERE.LOCAL\\vpxd-*");
        assert_eq!(set.patterns[0].source_line, 5);
        assert!(set.warnings.is_empty());
    }

    #[test]
    fn test_star_excludes_everything() {
        let set = compile(["*"]);
        for principal in [
            "",
            "root",
            "DOMAIN\\admin",
            "VSPHERE.LOCAL\\vpxd-extension-1234",
            "ünïcödé",
            "CORP\\svc\nbackup",
            "\r\n",
        ] {
            assert!(test(principal, &set).is_excluded, "'{}' should be excluded", principal);
        }
    }

    #[test]
    fn test_literal_pattern_is_anchored() {
        let set = compile(["DOMAIN\\ops"]);
        assert!(test("DOMAIN\\ops", &set).is_excluded);
        assert!(!test("DOMAIN\\ops-team", &set).is_excluded);
        assert!(!test("XDOMAIN\\ops", &set).is_excluded);
    }

    #[test]
    fn test_metacharacters_match_literally() {
        let set = compile(["svc.(backup)+"]);
        assert!(test("svc.(backup)+", &set).is_excluded);
        assert!(!test("svcX(backup)+", &set).is_excluded);
        assert!(!test("svc.backupbackup", &set).is_excluded);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let set = compile(["vsphere.local\\VPXD-*"]);
        assert!(test("VSPHERE.LOCAL\\vpxd-extension-42", &set).is_excluded);
    }

    #[test]
    fn test_first_match_wins() {
        let set = compile(["ADMIN\\*", "ADMIN\\root"]);
        let result = test("ADMIN\\root", &set);
        assert!(result.is_excluded);
        assert_eq!(result.matched_pattern.as_deref(), Some("ADMIN\\*"));
    }

    #[test]
    fn test_filter_counts_per_pattern() {
        let set = compile(["VSPHERE.LOCAL\\vpxd-*", "*\\svc-backup", "nobody"]);
        let records = vec![
            record("VSPHERE.LOCAL\\vpxd-extension-1"),
            record("VSPHERE.LOCAL\\vpxd-extension-2"),
            record("CORP\\svc-backup"),
            record("CORP\\alice"),
        ];

        let outcome = filter(records, &set);
        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.kept[0].principal, "CORP\\alice");
        assert_eq!(outcome.excluded_count, 3);
        assert_eq!(outcome.per_pattern_counts["VSPHERE.LOCAL\\vpxd-*"], 2);
        assert_eq!(outcome.per_pattern_counts["*\\svc-backup"], 1);
        assert_eq!(outcome.per_pattern_counts["nobody"], 0);
    }

    #[test]
    fn test_empty_set_is_inert() {
        let records = vec![record("CORP\\alice"), record("CORP\\bob")];
        let outcome = filter(records.clone(), &ExclusionSet::default());
        assert_eq!(outcome.kept, records);
        assert_eq!(outcome.excluded_count, 0);
        assert!(outcome.per_pattern_counts.is_empty());
    }

    #[test]
    fn test_wildcard_spans_line_breaks() {
        let set = compile(["CORP\\svc*"]);
        assert!(test("CORP\\svc\nbackup", &set).is_excluded);
    }

    #[test]
    fn test_oversized_pattern_is_skipped_with_warning() {
        let huge = "x*".repeat(100_000);
        let set = compile(["CORP\\svc-*", huge.as_str(), "", "VSPHERE.LOCAL\\vpxd-*"]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.patterns[0].source_line, 1);
        assert_eq!(set.patterns[1].source_line, 4);
        assert_eq!(set.warnings.len(), 1);
        assert_eq!(set.warnings[0].source_line, 2);
        assert_eq!(set.warnings[0].origin, INLINE_ORIGIN);
        assert_eq!(set.warnings[0].pattern, huge);
        assert!(!set.warnings[0].reason.is_empty());
        assert!(test("CORP\\svc-backup", &set).is_excluded);
    }

    #[test]
    fn test_load_strips_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exclusions.txt");
        fs::write(&path, "\u{feff}CORP\\svc-*\r\n# comment\r\nnobody\r\n").unwrap();

        let set = ExclusionSet::load(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.patterns[0].original, "CORP\\svc-*");
        assert_eq!(set.patterns[0].origin, path.display().to_string());
        assert_eq!(set.patterns[1].source_line, 3);
        assert!(test("CORP\\svc-backup", &set).is_excluded);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = ExclusionSet::load(Path::new("/nonexistent/permaudit/exclusions.txt")).unwrap_err();
        assert!(err.to_string().contains("exclusions.txt"));
    }
}
