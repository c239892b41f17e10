//! Config subcommand handlers.

use emrscope_config::{Config, load_config_from, save_config_to};

use crate::cli::{ColorMode, ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::{parse_value, resolve_config_path};

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = resolve_config_path(global);

    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_config_from(&path)?;
            let format = match global.output {
                Some(format) => format,
                None => parse_value::<OutputFormat>("output", &cfg.output)?,
            };
            let out = match format {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                format => output::render_single(format, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let cfg = Config {
                region: global.region.clone(),
                profile: global.profile.clone(),
                page_cap: global.page_cap.unwrap_or(emrscope_core::DEFAULT_PAGE_CAP),
                endpoint_url: global.endpoint_url.clone(),
                output: value_name(global.output.unwrap_or(OutputFormat::Table)),
                color: value_name(global.color.unwrap_or(ColorMode::Auto)),
                ..Config::default()
            };
            save_config_to(&cfg, &path)?;

            if !global.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}

fn value_name(value: impl clap::ValueEnum) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_owned())
        .unwrap_or_default()
}
