//! Persisted state filters: `filter show|set|allow|deny|reset`.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use emrscope_config::save_config_to;
use emrscope_core::{ResourceClient, StatusSet, filter::normalize, status_set};

use crate::cli::{FilterArgs, FilterCommand};
use crate::error::CliError;
use crate::output;

use super::Invocation;

#[derive(Debug, Serialize)]
struct FilterView {
    domain: &'static str,
    allowed: Vec<String>,
    source: &'static str,
}

#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "Domain")]
    domain: &'static str,
    #[tabled(rename = "Allowed")]
    allowed: String,
    #[tabled(rename = "Source")]
    source: &'static str,
}

impl From<&FilterView> for FilterRow {
    fn from(v: &FilterView) -> Self {
        Self {
            domain: v.domain,
            allowed: if v.allowed.is_empty() {
                "(nothing)".into()
            } else {
                v.allowed.join(", ")
            },
            source: v.source,
        }
    }
}

fn view(inv: &Invocation, client: &dyn ResourceClient, default: StatusSet) -> FilterView {
    let (allowed, source) = match inv.config.filter(client.key()) {
        Some(saved) => (saved, "config"),
        None => (default, "default"),
    };
    FilterView {
        domain: client.key(),
        allowed: allowed.into_iter().collect(),
        source,
    }
}

/// The named domain and its default filter; unfilterable domains are rejected.
fn filterable(
    clients: &[Arc<dyn ResourceClient>],
    key: &str,
) -> Result<(Arc<dyn ResourceClient>, StatusSet), CliError> {
    let client = clients
        .iter()
        .find(|c| c.key() == key)
        .cloned()
        .ok_or_else(|| CliError::UnknownDomain { key: key.to_owned() })?;
    let default = client.default_filter().ok_or_else(|| CliError::Validation {
        field: "domain".into(),
        reason: format!("{key} cannot be filtered by state"),
    })?;
    Ok((client, default))
}

/// Normalize user-supplied states, rejecting ones the domain never reports.
fn parse_states(client: &dyn ResourceClient, states: &[String]) -> Result<StatusSet, CliError> {
    let known = client.known_states();
    for state in states {
        let state = normalize(state);
        if !known.is_empty() && !known.contains(&state.as_str()) {
            return Err(CliError::Validation {
                field: "state".into(),
                reason: format!(
                    "{state} is not a {} state (known: {})",
                    client.key(),
                    known.join(", ")
                ),
            });
        }
    }
    Ok(status_set(states))
}

pub fn handle(mut inv: Invocation, args: FilterArgs) -> Result<(), CliError> {
    let clients = inv.domain_clients()?;

    let domain = match args.command {
        FilterCommand::Show { domain: None } => {
            let views: Vec<FilterView> = clients
                .iter()
                .filter_map(|c| c.default_filter().map(|d| view(&inv, c.as_ref(), d)))
                .collect();
            let out = output::render_list(inv.format, &views, |v| FilterRow::from(v), |v| {
                format!("{}\t{}", v.domain, v.allowed.join(","))
            })?;
            output::print_output(&out, inv.quiet);
            return Ok(());
        }

        FilterCommand::Show { domain: Some(key) } => key,

        FilterCommand::Set { domain, states } => {
            let (client, _) = filterable(&clients, &domain)?;
            let allowed = parse_states(client.as_ref(), &states)?;
            inv.config.set_filter(&domain, &allowed);
            save(&inv)?;
            domain
        }

        FilterCommand::Allow { domain, states } => {
            let (client, default) = filterable(&clients, &domain)?;
            let mut allowed = inv.config.filter(&domain).unwrap_or(default);
            allowed.extend(parse_states(client.as_ref(), &states)?);
            inv.config.set_filter(&domain, &allowed);
            save(&inv)?;
            domain
        }

        FilterCommand::Deny { domain, states } => {
            let (client, default) = filterable(&clients, &domain)?;
            let mut allowed = inv.config.filter(&domain).unwrap_or(default);
            for state in parse_states(client.as_ref(), &states)? {
                allowed.remove(&state);
            }
            inv.config.set_filter(&domain, &allowed);
            save(&inv)?;
            domain
        }

        FilterCommand::Reset { domain } => {
            filterable(&clients, &domain)?;
            if inv.config.clear_filter(&domain) {
                save(&inv)?;
            }
            domain
        }
    };

    let (client, default) = filterable(&clients, &domain)?;
    let current = view(&inv, client.as_ref(), default);
    let out = output::render_single(
        inv.format,
        &current,
        |v| FilterRow::from(v).allowed,
        |v| v.allowed.join("\n"),
    )?;
    output::print_output(&out, inv.quiet);
    Ok(())
}

fn save(inv: &Invocation) -> Result<(), CliError> {
    save_config_to(&inv.config, &inv.config_path)?;
    tracing::info!(path = %inv.config_path.display(), "saved filters");
    Ok(())
}
