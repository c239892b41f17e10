//! Shared helpers for command handlers.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::broadcast;

use emrscope_core::{CoreError, HierarchyEvent, HierarchyNode, NodeKind, StatusTone};

// ── Node entries ────────────────────────────────────────────────────

/// Serializable view of a hierarchy node for list output.
#[derive(Debug, Serialize)]
pub struct NodeEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub expandable: bool,
}

impl From<&HierarchyNode> for NodeEntry {
    fn from(node: &HierarchyNode) -> Self {
        match node.kind() {
            NodeKind::Resource(d) => Self {
                id: d.id.clone(),
                name: d.name.clone(),
                status: d.status.clone(),
                status_detail: d.status_detail.clone(),
                description: d.description.clone(),
                expandable: node.is_expandable(),
            },
            NodeKind::Root | NodeKind::Group { .. } => Self {
                id: node.id().to_owned(),
                name: node.label().to_owned(),
                status: None,
                status_detail: None,
                description: None,
                expandable: node.is_expandable(),
            },
        }
    }
}

impl NodeEntry {
    pub fn tone(&self) -> StatusTone {
        self.status
            .as_deref()
            .map_or(StatusTone::Unknown, StatusTone::classify)
    }
}

#[derive(Tabled)]
pub struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl From<&NodeEntry> for NodeRow {
    fn from(e: &NodeEntry) -> Self {
        let detail = match (&e.status_detail, &e.description) {
            (Some(status), _) => status.clone(),
            (None, Some(desc)) => desc.clone(),
            (None, None) => String::new(),
        };
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            status: e.status.clone().unwrap_or_default(),
            detail,
        }
    }
}

// ── Fetch failures ──────────────────────────────────────────────────

/// Print one warning line for a failed child fetch.
pub fn warn_failure(node_id: &str, err: &CoreError, color: bool) {
    let prefix = if color {
        "warning:".yellow().bold().to_string()
    } else {
        "warning:".to_owned()
    };
    match err {
        CoreError::Remote {
            operation, message, ..
        } => eprintln!("{prefix} {node_id}: {operation} failed: {message}"),
        other => eprintln!("{prefix} {node_id}: {other}"),
    }
}

/// Drain pending `FetchFailed` events and warn about each on stderr.
///
/// Failures of `skip` are left out; the caller reports that node's error
/// itself. Returns the number of failures seen.
pub fn report_failures(
    events: &mut broadcast::Receiver<HierarchyEvent>,
    color: bool,
    skip: Option<&str>,
) -> usize {
    let mut failures = 0;
    loop {
        match events.try_recv() {
            Ok(HierarchyEvent::FetchFailed {
                node_id,
                domain,
                operation,
                message,
            }) => {
                failures += 1;
                if skip != Some(node_id.as_str()) {
                    let err = CoreError::Remote {
                        domain,
                        operation,
                        message,
                    };
                    warn_failure(&node_id, &err, color);
                }
            }
            Ok(HierarchyEvent::Changed { .. }) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "event receiver lagged");
            }
            Err(_) => break,
        }
    }
    failures
}

/// Note on stderr that a listing hit the page cap.
pub fn note_truncated(node: &HierarchyNode, shown: usize, quiet: bool) {
    if node.is_truncated() && !quiet {
        eprintln!("note: showing the first {shown} items of {}; raise --page-cap for more", node.id());
    }
}

// ── Spinner ─────────────────────────────────────────────────────────

/// Spinner on stderr, only when stderr is a terminal and output isn't quiet.
pub fn spinner(message: String, quiet: bool) -> Option<ProgressBar> {
    if quiet || !io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(80));
    Some(bar)
}
