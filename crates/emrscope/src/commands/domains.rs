//! Domain listing.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Invocation;

#[derive(Debug, Serialize)]
struct DomainInfo {
    key: &'static str,
    name: &'static str,
    /// `None` for domains that cannot be filtered by status.
    filter: Option<Vec<String>>,
    customized: bool,
}

#[derive(Tabled)]
struct DomainRow {
    #[tabled(rename = "Key")]
    key: &'static str,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Filter")]
    filter: String,
}

impl From<&DomainInfo> for DomainRow {
    fn from(d: &DomainInfo) -> Self {
        let filter = match &d.filter {
            None => "-".to_owned(),
            Some(states) if states.is_empty() => "(nothing)".to_owned(),
            Some(states) => {
                let joined = states.join(", ");
                if d.customized { format!("{joined} *") } else { joined }
            }
        };
        Self {
            key: d.key,
            name: d.name,
            filter,
        }
    }
}

pub fn handle(inv: &Invocation, global: &GlobalOpts) -> Result<(), CliError> {
    let explorer = inv.explorer(global)?;

    let domains: Vec<DomainInfo> = explorer
        .domains()
        .map(|client| {
            let filter = explorer.filter(client.key());
            DomainInfo {
                key: client.key(),
                name: client.display_name(),
                customized: filter.as_ref().is_some_and(|f| !f.is_default()),
                filter: filter.map(|f| f.allowed().into_iter().collect()),
            }
        })
        .collect();

    let out = output::render_list(
        inv.format,
        &domains,
        |d| DomainRow::from(d),
        |d| d.key.to_owned(),
    )?;
    output::print_output(&out, inv.quiet);
    Ok(())
}
