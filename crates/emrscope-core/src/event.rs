// ── Hierarchy events ──

use serde::Serialize;

/// Notification from the hierarchy engine to its host.
///
/// Delivered over a `broadcast` channel. Duplicates are harmless: hosts
/// should treat `Changed` as "re-render this root".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HierarchyEvent {
    /// A root (or something beneath it) was invalidated.
    Changed { root_id: String },

    /// A child fetch failed. Emitted once per failed population.
    FetchFailed {
        node_id: String,
        domain: String,
        operation: String,
        message: String,
    },
}

impl HierarchyEvent {
    pub fn root_id(&self) -> Option<&str> {
        match self {
            Self::Changed { root_id } => Some(root_id),
            Self::FetchFailed { .. } => None,
        }
    }
}
