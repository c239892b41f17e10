// ── Domain-neutral resource model ──
//
// Plain data returned by resource domains. The hierarchy engine only
// ever sees these types; SDK shapes stay inside the domain crates.

use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString};

/// A remote resource as returned by a listing call.
///
/// Immutable once returned. `id` is unique within its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_detail: Option<String>,
    /// Short secondary text (version, release label, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: None,
            status_detail: None,
            description: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_status_detail(mut self, detail: Option<String>) -> Self {
        self.status_detail = detail;
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Tree label: the name, plus `[STATUS]` when one is known.
    pub fn label(&self) -> String {
        let name = if self.name.is_empty() { &self.id } else { &self.name };
        match &self.status {
            Some(status) => format!("{name} [{status}]"),
            None => name.clone(),
        }
    }

    pub fn tone(&self) -> StatusTone {
        self.status.as_deref().map_or(StatusTone::Unknown, StatusTone::classify)
    }
}

/// Full detail for a described resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceDetail {
    #[serde(flatten)]
    pub descriptor: ResourceDescriptor,
    /// Ordered key/value attributes (release label, columns, ...).
    pub attributes: IndexMap<String, String>,
}

impl ResourceDetail {
    pub fn new(descriptor: ResourceDescriptor) -> Self {
        Self {
            descriptor,
            attributes: IndexMap::new(),
        }
    }

    /// Insert an attribute if a value is present.
    pub fn attr(mut self, key: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.attributes.insert(key.to_owned(), value.into());
        }
        self
    }
}

/// Opaque continuation token. Never interpreted, only threaded back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for PageToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<ResourceDescriptor>,
    pub next_token: Option<PageToken>,
}

impl Page {
    pub fn new(items: Vec<ResourceDescriptor>, next_token: Option<PageToken>) -> Self {
        Self { items, next_token }
    }

    /// A final page (no continuation).
    pub fn last(items: Vec<ResourceDescriptor>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// A class of sub-resource beneath a resource (steps, job runs, tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChildKind {
    /// Stable key passed back to `list_children`.
    pub key: &'static str,
    /// Human label for the group node.
    pub label: &'static str,
}

impl ChildKind {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// Presentation hint derived from a status string.
///
/// The only tagged variant hosts need for domain-specific rendering
/// (icon or colour choice); everything else is plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Active,
    Pending,
    Failed,
    Terminated,
    Unknown,
}

impl StatusTone {
    pub fn classify(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "RUNNING" | "WAITING" | "STARTED" | "CREATED" | "COMPLETED" | "SUCCESS"
            | "SUCCEEDED" => Self::Active,
            "STARTING" | "BOOTSTRAPPING" | "PENDING" | "SUBMITTED" | "SCHEDULED" | "QUEUED"
            | "CREATING" | "STOPPING" | "TERMINATING" | "CANCEL_PENDING" => Self::Pending,
            "FAILED" | "TERMINATED_WITH_ERRORS" | "ARRESTED" | "INTERRUPTED" => Self::Failed,
            "TERMINATED" | "STOPPED" | "CANCELLED" => Self::Terminated,
            _ => Self::Unknown,
        }
    }
}
