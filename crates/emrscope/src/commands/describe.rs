//! Resource detail: `describe <domain> <id>`.

use emrscope_core::ResourceDetail;

use crate::cli::{DescribeArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::{Invocation, util};

fn detail(d: &ResourceDetail) -> String {
    let desc = &d.descriptor;
    let mut pairs: Vec<(&str, &str)> = vec![("ID", desc.id.as_str()), ("Name", desc.name.as_str())];
    if let Some(status) = &desc.status {
        pairs.push(("Status", status.as_str()));
    }
    if let Some(reason) = &desc.status_detail {
        pairs.push(("Reason", reason.as_str()));
    }
    if let Some(description) = &desc.description {
        pairs.push(("Description", description.as_str()));
    }
    pairs.extend(d.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    output::detail_block(pairs)
}

pub async fn handle(
    inv: &Invocation,
    args: DescribeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let explorer = inv.explorer(global)?;
    let root = explorer.root(&args.domain)?;
    let display_name = root.label().to_owned();

    let spinner = util::spinner(format!("Describing {}", args.id), inv.quiet);
    let result = explorer.describe(&args.domain, &args.id).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let Some(found) = result? else {
        return Err(CliError::NotFound {
            resource_type: display_name,
            identifier: args.id,
            list_command: format!("ls {}", args.domain),
        });
    };

    let out = output::render_single(inv.format, &found, detail, |d| d.descriptor.id.clone())?;
    output::print_output(&out, inv.quiet);
    Ok(())
}
