#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use log::error;

use permaudit::cli::{self, CliArgs, Mode};
use permaudit::config::AuditConfiguration;
use permaudit::enrich::chunked::EnrichError;
use permaudit::logging;
use permaudit::output;
use permaudit::pipeline::{self, AuditOptions, EnrichOptions};

fn load_config(args: &CliArgs) -> Result<AuditConfiguration> {
    let mut config = AuditConfiguration::load(args.config_path())?;
    args.apply_to(&mut config);
    config.validate().context("Invalid command-line override")?;
    Ok(config)
}

fn run(args: CliArgs) -> Result<()> {
    let config = load_config(&args)?;

    match args.mode {
        Mode::Audit { records, output, .. } => {
            let report = pipeline::run_audit(&AuditOptions {
                records_path: records,
                output_path: output,
                config,
                quiet: args.quiet_mode,
            })?;
            if args.json_output {
                output::print_json(&report)
            } else {
                output::format_audit_human(&report)
            }
        }
        Mode::Enrich {
            input,
            tooltips,
            output,
            ..
        } => {
            let (summary, backup_failures) = pipeline::run_enrich(&EnrichOptions {
                input_path: input,
                tooltips_path: tooltips,
                output_path: output,
                config,
                quiet: args.quiet_mode,
            })?;
            if args.json_output {
                output::print_json(&summary)
            } else {
                output::format_enrich_human(&summary, backup_failures)
            }
        }
    }
}

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    logging::init(logging::filter_for(args.quiet_mode, args.verbosity))?;

    let result = run(args);
    if let Err(err) = &result {
        if let Some(EnrichError::GrowthAnomaly { .. }) = err.downcast_ref::<EnrichError>() {
            error!(
                "Enrichment aborted. Inspect the diagnostic snapshot for repeated tooltips; \
                 very small reports may need higher tooltips.growth ratios in the config file"
            );
        }
    }
    result
}
