//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - `audit` and `enrich` subcommands
//! - Tooltip overrides layered over the config file
//! - Output format selection (human/JSON)
//! - Verbosity and quiet modes

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::config::AuditConfiguration;
use crate::constants::{TOOLTIP_MAX_WIDTH_MAX, TOOLTIP_MAX_WIDTH_MIN};
use crate::enrich::assets::Theme;

/// What to run
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Audit {
        records: PathBuf,
        output: PathBuf,
        exclusions: Option<PathBuf>,
        no_tooltips: bool,
    },
    Enrich {
        input: PathBuf,
        tooltips: PathBuf,
        output: PathBuf,
        no_keyboard: bool,
        no_filtering: bool,
    },
}

/// Values that override the config file for one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TooltipOverrides {
    pub theme: Option<Theme>,
    pub max_width: Option<u32>,
    pub chunk_size: Option<usize>,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub mode: Mode,
    pub overrides: TooltipOverrides,
    pub config_path: Option<PathBuf>,
    pub json_output: bool,
    pub quiet_mode: bool,
    pub verbosity: u8,
}

fn version() -> &'static str {
    concat!(
        env!("PERMAUDIT_BUILD_VERSION"),
        " (",
        env!("PERMAUDIT_GIT_HASH"),
        ")"
    )
}

fn common_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: per-user config.toml when present)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("theme")
                .long("theme")
                .value_name("THEME")
                .help("Tooltip color theme")
                .value_parser(["dark", "light", "blue"]),
        )
        .arg(
            Arg::new("max-width")
                .long("max-width")
                .value_name("PX")
                .help("Maximum tooltip width in pixels")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("N")
                .help("Tooltip entries annotated per chunk")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output the run summary in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress progress and warnings")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase log verbosity (repeatable)")
                .action(ArgAction::Count),
        )
}

/// Build the clap command tree
pub fn build_cli() -> Command {
    Command::new("permaudit")
        .version(version())
        .about("Audit vSphere permissions into an interactive HTML report")
        .long_about(
            "Classifies vSphere permission records, filters service principals by \
             wildcard patterns and renders an HTML report with hover tooltips, \
             enriched in chunks with growth safety checks.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(common_args(
            Command::new("audit")
                .about("Build an enriched report from permission records")
                .arg(
                    Arg::new("records")
                        .short('r')
                        .long("records")
                        .value_name("FILE")
                        .help("JSON array of permission records")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("HTML report to write")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("exclusions")
                        .short('x')
                        .long("exclusions")
                        .value_name("FILE")
                        .help("Exclusion pattern file, one wildcard pattern per line")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("no-tooltips")
                        .long("no-tooltips")
                        .help("Write the base report without tooltip enrichment")
                        .action(ArgAction::SetTrue),
                ),
        ))
        .subcommand(common_args(
            Command::new("enrich")
                .about("Add tooltips to an existing report")
                .arg(
                    Arg::new("input")
                        .short('i')
                        .long("input")
                        .value_name("FILE")
                        .help("HTML report to enrich")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("tooltips")
                        .short('t')
                        .long("tooltips")
                        .value_name("FILE")
                        .help("Tooltip data (JSON object keyed by identifier)")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .help("Enriched HTML report to write")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("no-keyboard")
                        .long("no-keyboard")
                        .help("Omit keyboard navigation behavior")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-filtering")
                        .long("no-filtering")
                        .help("Omit row filtering behavior")
                        .action(ArgAction::SetTrue),
                ),
        ))
}

fn existing_file(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    let path = matches
        .get_one::<PathBuf>(id)
        .cloned()
        .ok_or_else(|| anyhow!("Missing --{}", id))?;
    if !path.is_file() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }
    Ok(path)
}

fn required_path(matches: &ArgMatches, id: &str) -> Result<PathBuf> {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .ok_or_else(|| anyhow!("Missing --{}", id))
}

/// Turn clap matches into validated arguments
pub fn from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("No command given; try --help"))?;

    let mode = match name {
        "audit" => {
            let exclusions = sub.get_one::<PathBuf>("exclusions").cloned();
            if let Some(path) = &exclusions {
                if !path.is_file() {
                    return Err(anyhow!("Exclusion file does not exist: {}", path.display()));
                }
            }
            Mode::Audit {
                records: existing_file(sub, "records")?,
                output: required_path(sub, "output")?,
                exclusions,
                no_tooltips: sub.get_flag("no-tooltips"),
            }
        }
        "enrich" => Mode::Enrich {
            input: existing_file(sub, "input")?,
            tooltips: existing_file(sub, "tooltips")?,
            output: required_path(sub, "output")?,
            no_keyboard: sub.get_flag("no-keyboard"),
            no_filtering: sub.get_flag("no-filtering"),
        },
        other => return Err(anyhow!("Unknown command: {}", other)),
    };

    let theme = sub
        .get_one::<String>("theme")
        .map(|s| s.parse::<Theme>())
        .transpose()
        .map_err(|e| anyhow!(e))?;

    let max_width = sub.get_one::<u32>("max-width").copied();
    if let Some(width) = max_width {
        if !(TOOLTIP_MAX_WIDTH_MIN..=TOOLTIP_MAX_WIDTH_MAX).contains(&width) {
            return Err(anyhow!(
                "--max-width must be between {} and {}",
                TOOLTIP_MAX_WIDTH_MIN,
                TOOLTIP_MAX_WIDTH_MAX
            ));
        }
    }

    let chunk_size = sub.get_one::<usize>("chunk-size").copied();
    if chunk_size == Some(0) {
        return Err(anyhow!("--chunk-size must be at least 1"));
    }

    Ok(CliArgs {
        mode,
        overrides: TooltipOverrides {
            theme,
            max_width,
            chunk_size,
        },
        config_path: sub.get_one::<PathBuf>("config").cloned(),
        json_output: sub.get_flag("json"),
        quiet_mode: sub.get_flag("quiet"),
        verbosity: sub.get_count("verbose"),
    })
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    from_matches(&build_cli().get_matches())
}

impl CliArgs {
    /// Layer command-line values over a loaded configuration
    pub fn apply_to(&self, config: &mut AuditConfiguration) {
        let tooltips = &mut config.tooltips;
        if let Some(theme) = self.overrides.theme {
            tooltips.theme = theme;
        }
        if let Some(width) = self.overrides.max_width {
            tooltips.max_width = width;
        }
        if let Some(size) = self.overrides.chunk_size {
            tooltips.chunk_size = size;
        }

        match &self.mode {
            Mode::Audit {
                exclusions,
                no_tooltips,
                ..
            } => {
                if let Some(path) = exclusions {
                    config.exclusions.enabled = true;
                    config.exclusions.pattern_file = Some(path.clone());
                }
                if *no_tooltips {
                    config.tooltips.enabled = false;
                }
            }
            Mode::Enrich {
                no_keyboard,
                no_filtering,
                ..
            } => {
                if *no_keyboard {
                    config.tooltips.keyboard_navigation = false;
                }
                if *no_filtering {
                    config.tooltips.filtering = false;
                }
            }
        }
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> Result<CliArgs> {
        let matches = build_cli().try_get_matches_from(args)?;
        from_matches(&matches)
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_audit_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        fs::write(&records, "[]").unwrap();
        let records_arg = records.to_str().unwrap();

        let args = parse(&[
            "permaudit", "audit", "-r", records_arg, "-o", "out.html", "--theme", "light", "--chunk-size", "50",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.verbosity, 2);
        assert_eq!(args.overrides.theme, Some(Theme::Light));
        assert_eq!(args.overrides.chunk_size, Some(50));
        assert!(matches!(args.mode, Mode::Audit { no_tooltips: false, .. }));
    }

    #[test]
    fn test_missing_records_file_is_error() {
        let err = parse(&["permaudit", "audit", "-r", "/nonexistent/records.json", "-o", "out.html"]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_zero_chunk_size_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        fs::write(&records, "[]").unwrap();

        let err = parse(&[
            "permaudit",
            "audit",
            "-r",
            records.to_str().unwrap(),
            "-o",
            "out.html",
            "--chunk-size",
            "0",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("chunk-size"));
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.html");
        let tooltips = dir.path().join("in.tooltips.json");
        fs::write(&input, "<html></html>").unwrap();
        fs::write(&tooltips, "{}").unwrap();

        let args = parse(&[
            "permaudit",
            "enrich",
            "-i",
            input.to_str().unwrap(),
            "-t",
            tooltips.to_str().unwrap(),
            "-o",
            "out.html",
            "--max-width",
            "600",
            "--no-filtering",
        ])
        .unwrap();

        let mut config = AuditConfiguration::default();
        args.apply_to(&mut config);
        assert_eq!(config.tooltips.max_width, 600);
        assert!(!config.tooltips.filtering);
        assert!(config.tooltips.keyboard_navigation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(build_cli().try_get_matches_from(["permaudit"]).is_err());
    }
}
