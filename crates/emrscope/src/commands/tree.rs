//! Recursive expansion: `tree [domain…] --depth N`.
//!
//! Siblings at each level expand concurrently; the hierarchy engine's
//! per-node locking keeps every node at one remote fetch. Fetch failures
//! are collected from the walked nodes, not the bounded event channel.

use std::sync::Arc;

use futures::future::{FutureExt, LocalBoxFuture, join_all};
use serde::Serialize;

use emrscope_core::{CoreError, HierarchyNode, NodeKind, StatusTone};

use crate::cli::{GlobalOpts, OutputFormat, TreeArgs};
use crate::error::CliError;
use crate::output;

use super::{Invocation, util};

#[derive(Debug, Serialize)]
struct TreeEntry {
    id: String,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    #[serde(skip)]
    tone: Option<StatusTone>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<TreeEntry>,
    #[serde(skip)]
    error: Option<CoreError>,
}

fn expand(node: Arc<HierarchyNode>, depth: usize) -> LocalBoxFuture<'static, TreeEntry> {
    async move {
        let (children, error) = if depth > 0 && node.is_expandable() {
            let nodes = node.children().await;
            let error = node.last_error();
            let children =
                join_all(nodes.into_iter().map(|child| expand(child, depth - 1))).await;
            (children, error)
        } else {
            (Vec::new(), None)
        };

        let (status, tone) = match node.kind() {
            NodeKind::Resource(d) => (d.status.clone(), Some(d.tone())),
            NodeKind::Root | NodeKind::Group { .. } => (None, None),
        };

        TreeEntry {
            id: node.id().to_owned(),
            label: node.label().to_owned(),
            status,
            tone,
            truncated: node.is_truncated(),
            children,
            error,
        }
    }
    .boxed_local()
}

/// Every failed fetch in the walked tree, depth first.
fn failures(roots: &[TreeEntry]) -> Vec<(&str, &CoreError)> {
    fn walk<'a>(out: &mut Vec<(&'a str, &'a CoreError)>, entry: &'a TreeEntry) {
        if let Some(err) = &entry.error {
            out.push((entry.id.as_str(), err));
        }
        for child in &entry.children {
            walk(out, child);
        }
    }
    let mut out = Vec::new();
    for root in roots {
        walk(&mut out, root);
    }
    out
}

// ── Text rendering ──────────────────────────────────────────────────

fn render_text(roots: &[TreeEntry], color: bool) -> String {
    let mut lines = Vec::new();
    for root in roots {
        lines.push(output::emphasize(&root.label, color));
        push_children(&mut lines, root, "", color);
    }
    lines.join("\n")
}

fn push_children(lines: &mut Vec<String>, entry: &TreeEntry, prefix: &str, color: bool) {
    let count = entry.children.len();
    for (i, child) in entry.children.iter().enumerate() {
        let last = i + 1 == count && !entry.truncated;
        let branch = if last { "└── " } else { "├── " };
        let label = match child.tone {
            Some(tone) => output::paint(&child.label, tone, color),
            None => output::emphasize(&child.label, color),
        };
        lines.push(format!("{prefix}{branch}{label}"));

        let next = format!("{prefix}{}", if last { "    " } else { "│   " });
        push_children(lines, child, &next, color);
    }
    if entry.truncated {
        lines.push(format!("{prefix}└── …"));
    }
}

fn render_plain(roots: &[TreeEntry]) -> String {
    fn walk(lines: &mut Vec<String>, entry: &TreeEntry, depth: usize) {
        lines.push(format!("{}{}", "  ".repeat(depth), entry.id));
        for child in &entry.children {
            walk(lines, child, depth + 1);
        }
    }
    let mut lines = Vec::new();
    for root in roots {
        walk(&mut lines, root, 0);
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(inv: &Invocation, args: TreeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let explorer = inv.explorer(global)?;

    let roots = if args.domains.is_empty() {
        explorer.roots()
    } else {
        args.domains
            .iter()
            .map(|key| explorer.root(key))
            .collect::<Result<Vec<_>, _>>()?
    };

    let spinner = util::spinner(
        format!("Expanding {} in {}", plural(roots.len()), explorer.context().region()),
        inv.quiet,
    );
    let entries = join_all(roots.into_iter().map(|root| expand(root, args.depth))).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let out = match inv.format {
        OutputFormat::Table => render_text(&entries, inv.color),
        OutputFormat::Plain => render_plain(&entries),
        format => output::render_single(format, &entries, |_| String::new(), |_| String::new())?,
    };
    output::print_output(&out, inv.quiet);

    for (node_id, err) in failures(&entries) {
        util::warn_failure(node_id, err, inv.color);
    }
    Ok(())
}

fn plural(domains: usize) -> String {
    if domains == 1 { "1 domain".into() } else { format!("{domains} domains") }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emrscope_core::{
        ChildKind, ContextState, Explorer, Page, PageToken, ResourceClient, ResourceDescriptor,
        ResourceDetail, StatusSet, async_trait,
    };

    use super::*;

    const JOB_RUNS: ChildKind = ChildKind::new("job-runs", "Job runs");

    /// Lists `count` virtual clusters whose job runs can never be listed.
    struct DeniedJobRuns {
        count: usize,
    }

    #[async_trait]
    impl ResourceClient for DeniedJobRuns {
        fn key(&self) -> &'static str {
            "emr-containers"
        }

        fn display_name(&self) -> &'static str {
            "EMR on EKS"
        }

        fn child_kinds(&self, _resource: &ResourceDescriptor) -> Vec<ChildKind> {
            vec![JOB_RUNS]
        }

        async fn list(
            &self,
            _filter: Option<&StatusSet>,
            _token: Option<PageToken>,
        ) -> Result<Page, CoreError> {
            let items = (0..self.count)
                .map(|i| {
                    ResourceDescriptor::new(format!("vc-{i}"), format!("vc-{i}"))
                        .with_status("RUNNING")
                })
                .collect();
            Ok(Page::last(items))
        }

        async fn describe(&self, _id: &str) -> Result<Option<ResourceDetail>, CoreError> {
            Ok(None)
        }

        async fn list_children(
            &self,
            _parent_id: &str,
            _kind: ChildKind,
            _token: Option<PageToken>,
        ) -> Result<Page, CoreError> {
            Err(CoreError::remote("emr-containers", "ListJobRuns", "AccessDenied: not authorized"))
        }
    }

    #[tokio::test]
    async fn every_failed_fetch_is_collected_past_the_event_capacity() {
        let explorer = Explorer::builder(Arc::new(ContextState::default()))
            .domain(Arc::new(DeniedJobRuns { count: 300 }))
            .page_cap(1000)
            .build()
            .unwrap();
        let root = explorer.root("emr-containers").unwrap();

        let entry = expand(root, 2).await;
        let failed = failures(std::slice::from_ref(&entry));

        assert_eq!(entry.children.len(), 300);
        assert_eq!(failed.len(), 300);
        assert_eq!(failed[0].0, "vc-0");
        assert!(failed.iter().all(|(_, err)| err.is_remote()));
    }

    #[tokio::test]
    async fn unexpanded_nodes_report_nothing() {
        let explorer = Explorer::builder(Arc::new(ContextState::default()))
            .domain(Arc::new(DeniedJobRuns { count: 3 }))
            .build()
            .unwrap();
        let root = explorer.root("emr-containers").unwrap();

        let entry = expand(root, 1).await;
        assert_eq!(entry.children.len(), 3);
        assert!(failures(std::slice::from_ref(&entry)).is_empty());
    }

    fn leaf(label: &str, status: &str) -> TreeEntry {
        TreeEntry {
            id: label.into(),
            label: format!("{label} [{status}]"),
            status: Some(status.into()),
            tone: Some(StatusTone::classify(status)),
            truncated: false,
            children: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn text_tree_draws_branches() {
        let root = TreeEntry {
            id: "emr-ec2".into(),
            label: "EMR on EC2".into(),
            status: None,
            tone: None,
            truncated: false,
            children: vec![leaf("j-1", "RUNNING"), leaf("j-2", "WAITING")],
            error: None,
        };

        let text = render_text(&[root], false);
        assert_eq!(
            text,
            "EMR on EC2\n├── j-1 [RUNNING]\n└── j-2 [WAITING]"
        );
    }

    #[test]
    fn truncated_listing_ends_with_ellipsis() {
        let root = TreeEntry {
            id: "emr-ec2".into(),
            label: "EMR on EC2".into(),
            status: None,
            tone: None,
            truncated: true,
            children: vec![leaf("j-1", "RUNNING")],
            error: None,
        };

        let text = render_text(&[root], false);
        assert_eq!(text, "EMR on EC2\n├── j-1 [RUNNING]\n└── …");
    }

    #[test]
    fn plain_tree_indents_ids() {
        let mut root = leaf("j-1", "RUNNING");
        root.children.push(leaf("s-1", "COMPLETED"));
        assert_eq!(render_plain(&[root]), "j-1\n  s-1");
    }
}
