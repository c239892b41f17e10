// ── Bounded pagination ──
//
// Drives repeated page fetches until the continuation token runs out or
// the item cap is hit. The in-flight page always completes; the result
// is then truncated to the cap and no further page is requested.

use std::future::Future;

use tracing::debug;

use crate::client::{ResourceClient, StatusSet};
use crate::error::CoreError;
use crate::model::{ChildKind, Page, PageToken, ResourceDescriptor};

/// Default item cap per listing. Bounds latency and memory for domains
/// with unbounded history (job runs, steps).
pub const DEFAULT_PAGE_CAP: usize = 100;

/// Outcome of a bounded pagination run.
///
/// `error` carries the failure that aborted pagination, if any; `items`
/// still holds every page fetched before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collected {
    pub items: Vec<ResourceDescriptor>,
    /// Number of pages successfully fetched.
    pub pages: usize,
    /// More results existed beyond the cap.
    pub truncated: bool,
    pub error: Option<CoreError>,
}

impl Collected {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Bounded aggregation helper over token-paginated listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    cap: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_CAP)
    }
}

impl Paginator {
    /// Create a paginator with the given item cap (minimum 1).
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1) }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Collect pages from `fetch`, threading each continuation token back in.
    pub async fn collect<F, Fut>(&self, mut fetch: F) -> Collected
    where
        F: FnMut(Option<PageToken>) -> Fut,
        Fut: Future<Output = Result<Page, CoreError>>,
    {
        let mut out = Collected::default();
        let mut token: Option<PageToken> = None;

        loop {
            let page = match fetch(token.take()).await {
                Ok(page) => page,
                Err(err) => {
                    debug!(
                        error = %err,
                        pages = out.pages,
                        kept = out.items.len(),
                        "page fetch failed; keeping partial results"
                    );
                    out.error = Some(err);
                    break;
                }
            };

            out.pages += 1;
            out.items.extend(page.items);

            if out.items.len() >= self.cap {
                out.truncated = out.items.len() > self.cap || page.next_token.is_some();
                out.items.truncate(self.cap);
                debug!(cap = self.cap, pages = out.pages, "page cap reached");
                break;
            }

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        out
    }

    /// Collect top-level resources of `client`, passing `filter` through.
    pub async fn collect_roots(
        &self,
        client: &dyn ResourceClient,
        filter: Option<&StatusSet>,
    ) -> Collected {
        self.collect(|token| client.list(filter, token)).await
    }

    /// Collect `kind` children of `parent_id`.
    pub async fn collect_children(
        &self,
        client: &dyn ResourceClient,
        parent_id: &str,
        kind: ChildKind,
    ) -> Collected {
        self.collect(|token| client.list_children(parent_id, kind, token))
            .await
    }
}
