// ── Resource domains ──
//
// One `ResourceClient` per AWS service family. Each module keeps its SDK
// calls and the SDK-shape-to-descriptor mapping side by side; mapping
// functions are free functions so they can be tested without a network.

pub mod emr_containers;
pub mod emr_ec2;
pub mod emr_serverless;
pub mod glue;

use std::sync::Arc;

use emrscope_core::{PageToken, ResourceClient, StatusSet};

pub use emr_containers::EmrOnEks;
pub use emr_ec2::EmrOnEc2;
pub use emr_serverless::EmrServerless;
pub use glue::GlueCatalog;

use crate::session::AwsSession;

/// All built-in domains, in display order.
pub fn default_domains(session: &AwsSession) -> Vec<Arc<dyn ResourceClient>> {
    vec![
        Arc::new(EmrOnEc2::new(session.clone())),
        Arc::new(EmrOnEks::new(session.clone())),
        Arc::new(EmrServerless::new(session.clone())),
        Arc::new(GlueCatalog::new(session.clone())),
    ]
}

/// Normalise an SDK field that is `T` in some service models and
/// `Option<T>` in others.
pub(crate) fn opt<T>(value: impl Into<Option<T>>) -> Option<T> {
    value.into()
}

pub(crate) fn owned(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_owned)
}

pub(crate) fn token_string(token: Option<PageToken>) -> Option<String> {
    token.map(PageToken::into_inner)
}

pub(crate) fn next_token(token: Option<&str>) -> Option<PageToken> {
    token.filter(|t| !t.is_empty()).map(PageToken::new)
}

/// Translate a status filter into SDK enum values.
///
/// `None` means "no server-side filter"; callers must short-circuit an
/// empty set themselves since the services treat an empty list as "all".
pub(crate) fn states<E>(filter: Option<&StatusSet>) -> Option<Vec<E>>
where
    E: for<'a> From<&'a str>,
{
    filter.map(|set| set.iter().map(|s| E::from(s.as_str())).collect())
}

pub(crate) fn is_empty_filter(filter: Option<&StatusSet>) -> bool {
    filter.is_some_and(StatusSet::is_empty)
}
