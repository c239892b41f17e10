// emrscope-core: Lazy, cached resource hierarchy between resource domains and hosts (CLI).

pub mod client;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod explorer;
pub mod filter;
pub mod model;
pub mod node;
mod notify;
pub mod paginator;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::{ResourceClient, StatusSet};
pub use context::{ContextDefaults, ContextSnapshot, ContextState, DEFAULT_REGION};
pub use coordinator::RefreshCoordinator;
pub use error::CoreError;
pub use event::HierarchyEvent;
pub use explorer::{Explorer, ExplorerBuilder};
pub use filter::{StateFilter, status_set};
pub use node::{HierarchyNode, NodeKind, NodeState};
pub use notify::Subscription;
pub use paginator::{Collected, DEFAULT_PAGE_CAP, Paginator};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ChildKind, Page, PageToken, ResourceDescriptor, ResourceDetail, StatusTone,
};

// Domains implement `ResourceClient` with this attribute.
pub use async_trait::async_trait;
