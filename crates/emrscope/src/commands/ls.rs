//! Node listing: `ls <domain> [path…]`.

use crate::cli::{GlobalOpts, LsArgs};
use crate::error::CliError;
use crate::output;

use super::Invocation;
use super::util::{self, NodeEntry, NodeRow};

pub async fn handle(inv: &Invocation, args: LsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let explorer = inv.explorer(global)?;
    let mut events = explorer.events();

    let mut path = Vec::with_capacity(args.path.len() + 1);
    path.push(args.domain);
    path.extend(args.path);

    let spinner = util::spinner(format!("Listing {}", path.join("/")), inv.quiet);
    let resolved = explorer.resolve(path.as_slice()).await;
    let node = match resolved {
        Ok(node) => node,
        Err(err) => {
            if let Some(bar) = spinner {
                bar.finish_and_clear();
            }
            util::report_failures(&mut events, inv.color, None);
            return Err(err.into());
        }
    };
    let children = explorer.expand(&node).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let entries: Vec<NodeEntry> = children.iter().map(|c| NodeEntry::from(c.as_ref())).collect();
    let out = output::render_list(inv.format, &entries, |e| NodeRow::from(e), |e| e.id.clone())?;
    output::print_output(&out, inv.quiet);
    util::note_truncated(&node, entries.len(), inv.quiet);

    // The listed node's own failure becomes the command error.
    let failed = node.last_error();
    let own = failed.as_ref().map(|_| node.id());
    util::report_failures(&mut events, inv.color, own);
    match failed {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
