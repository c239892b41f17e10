//! Command dispatch: bridges CLI args -> Explorer -> output formatting.

pub mod config_cmd;
pub mod describe;
pub mod domains;
pub mod filter;
pub mod ls;
pub mod tree;
pub mod util;

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;

use emrscope_aws::{AwsSession, SessionOptions, default_domains};
use emrscope_config::{Config, config_path, load_config_from};
use emrscope_core::{ContextDefaults, ContextState, Explorer, ResourceClient};

use crate::cli::{ColorMode, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Settings resolved from flags layered over the config file.
#[derive(Debug)]
pub struct Invocation {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Invocation {
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config_path = resolve_config_path(global);
        let config = load_config_from(&config_path)?;

        let format = match global.output {
            Some(format) => format,
            None => parse_value::<OutputFormat>("output", &config.output)?,
        };
        let color = match global.color {
            Some(mode) => mode,
            None => parse_value::<ColorMode>("color", &config.color)?,
        };

        Ok(Self {
            config,
            config_path,
            format,
            color: output::should_color(color),
            quiet: global.quiet,
        })
    }

    /// Build the explorer over every AWS domain.
    ///
    /// Region and profile resolve as flag, then config file, then the
    /// `AWS_*` environment. Flags are explicit selections on the context;
    /// the rest are its defaults. Nothing talks to AWS until a node is
    /// expanded.
    pub fn explorer(&self, global: &GlobalOpts) -> Result<Explorer, CliError> {
        let defaults = self.config.context_defaults().or(ContextDefaults::from_env());
        let context = Arc::new(ContextState::new(defaults));

        let mut options = SessionOptions::default().with_timeout(self.config.timeout());
        if let Some(endpoint) = global
            .endpoint_url
            .as_ref()
            .or(self.config.endpoint_url.as_ref())
        {
            options = options.with_endpoint_url(endpoint.clone());
        }
        let session = AwsSession::new(Arc::clone(&context), options)?;

        let page_cap = global.page_cap.unwrap_or(self.config.page_cap);
        if page_cap == 0 {
            return Err(CliError::Validation {
                field: "page-cap".into(),
                reason: "must be at least 1".into(),
            });
        }

        let mut builder = Explorer::builder(context)
            .domains(default_domains(&session))
            .page_cap(page_cap);
        for (domain, allowed) in self.config.filter_overrides() {
            builder = builder.filter(domain, allowed);
        }
        let explorer = builder.build()?;

        if let Some(region) = &global.region {
            explorer.context().set_region(region.clone());
        }
        if global.profile.is_some() {
            explorer.context().set_profile(global.profile.clone());
        }

        tracing::debug!(region = %session.region(), page_cap, "explorer ready");
        Ok(explorer)
    }

    /// Domain clients without building the hierarchy (filter editing).
    pub fn domain_clients(&self) -> Result<Vec<Arc<dyn ResourceClient>>, CliError> {
        let context = Arc::new(ContextState::new(self.config.context_defaults()));
        let session = AwsSession::new(context, SessionOptions::default())?;
        Ok(default_domains(&session))
    }
}

/// `--config`, then `EMRSCOPE_CONFIG`, then the platform config directory.
pub fn resolve_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub(crate) fn parse_value<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    // Config commands must work even when the file does not parse
    if let Command::Config(args) = cmd {
        return config_cmd::handle(args, global);
    }

    let inv = Invocation::load(global)?;
    match cmd {
        Command::Domains => domains::handle(&inv, global),
        Command::Ls(args) => ls::handle(&inv, args, global).await,
        Command::Tree(args) => tree::handle(&inv, args, global).await,
        Command::Describe(args) => describe::handle(&inv, args, global).await,
        Command::Filter(args) => filter::handle(inv, args),
        // Completions are handled before dispatch, config above
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
