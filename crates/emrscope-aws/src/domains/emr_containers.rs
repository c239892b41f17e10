// EMR on EKS: virtual clusters and their job runs.

use async_trait::async_trait;
use aws_sdk_emrcontainers::operation::describe_virtual_cluster::DescribeVirtualClusterError;
use aws_sdk_emrcontainers::types::{
    ContainerProvider, ContainerProviderType, JobRun, VirtualCluster, VirtualClusterState,
};
use emrscope_core::{
    ChildKind, CoreError, Page, PageToken, ResourceClient, ResourceDescriptor, ResourceDetail,
    StatusSet, status_set,
};
use tracing::{debug, info};

use super::{is_empty_filter, next_token, opt, owned, states, token_string};
use crate::error::Error;
use crate::session::AwsSession;

pub const KEY: &str = "emr-containers";
pub const JOB_RUNS: ChildKind = ChildKind::new("job-runs", "Job Runs");

const KNOWN_STATES: &[&str] = &["RUNNING", "TERMINATING", "TERMINATED", "ARRESTED"];

/// EMR virtual clusters on EKS.
#[derive(Debug, Clone)]
pub struct EmrOnEks {
    session: AwsSession,
}

impl EmrOnEks {
    pub fn new(session: AwsSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ResourceClient for EmrOnEks {
    fn key(&self) -> &'static str {
        KEY
    }

    fn display_name(&self) -> &'static str {
        "EMR on EKS"
    }

    fn default_filter(&self) -> Option<StatusSet> {
        Some(status_set(["RUNNING"]))
    }

    fn known_states(&self) -> &'static [&'static str] {
        KNOWN_STATES
    }

    fn child_kinds(&self, _resource: &ResourceDescriptor) -> Vec<ChildKind> {
        vec![JOB_RUNS]
    }

    async fn list(
        &self,
        filter: Option<&StatusSet>,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        if is_empty_filter(filter) {
            return Ok(Page::default());
        }

        info!(region = %self.session.region(), "EMR Containers: fetching virtual clusters");
        let out = self
            .session
            .emr_containers()
            .await
            .list_virtual_clusters()
            .set_states(states::<VirtualClusterState>(filter))
            .set_next_token(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "ListVirtualClusters", &e))?;

        Ok(Page::new(
            out.virtual_clusters()
                .iter()
                .filter_map(virtual_cluster_descriptor)
                .collect(),
            next_token(out.next_token()),
        ))
    }

    async fn describe(&self, id: &str) -> Result<Option<ResourceDetail>, CoreError> {
        let result = self
            .session
            .emr_containers()
            .await
            .describe_virtual_cluster()
            .id(id)
            .send()
            .await;

        match result {
            Ok(out) => Ok(out.virtual_cluster().and_then(virtual_cluster_detail)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(DescribeVirtualClusterError::is_resource_not_found_exception) =>
            {
                debug!(virtual_cluster = id, "virtual cluster not found");
                Ok(None)
            }
            Err(err) => Err(Error::sdk(KEY, "DescribeVirtualCluster", &err).into()),
        }
    }

    async fn list_children(
        &self,
        parent_id: &str,
        _kind: ChildKind,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        info!(
            region = %self.session.region(),
            virtual_cluster = parent_id,
            "EMR Containers: fetching job runs"
        );
        let out = self
            .session
            .emr_containers()
            .await
            .list_job_runs()
            .virtual_cluster_id(parent_id)
            .set_next_token(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "ListJobRuns", &e))?;

        Ok(Page::new(
            out.job_runs().iter().filter_map(job_run_descriptor).collect(),
            next_token(out.next_token()),
        ))
    }
}

// ── Mapping ─────────────────────────────────────────────────────────

/// `eks:<cluster>/<namespace>` for EKS-backed providers.
fn provider_label(provider: &ContainerProvider) -> Option<String> {
    let id: Option<&str> = opt(provider.id());
    let kind: Option<&ContainerProviderType> = opt(provider.r#type());
    let namespace = provider
        .info()
        .and_then(|info| info.as_eks_info().ok())
        .and_then(|eks| eks.namespace());

    let id = id?;
    let kind = kind.map_or("eks", |k| k.as_str()).to_ascii_lowercase();
    Some(match namespace {
        Some(ns) => format!("{kind}:{id}/{ns}"),
        None => format!("{kind}:{id}"),
    })
}

pub(crate) fn virtual_cluster_descriptor(vc: &VirtualCluster) -> Option<ResourceDescriptor> {
    Some(ResourceDescriptor {
        id: vc.id()?.to_owned(),
        name: vc.name().unwrap_or_default().to_owned(),
        status: vc.state().map(|s| s.as_str().to_owned()),
        status_detail: None,
        description: vc.container_provider().and_then(provider_label),
    })
}

fn virtual_cluster_detail(vc: &VirtualCluster) -> Option<ResourceDetail> {
    let descriptor = virtual_cluster_descriptor(vc)?;
    let provider = descriptor.description.clone();
    Some(
        ResourceDetail::new(descriptor)
            .attr("container_provider", provider)
            .attr("created", vc.created_at().map(ToString::to_string))
            .attr("security_configuration", vc.security_configuration_id())
            .attr("arn", vc.arn()),
    )
}

pub(crate) fn job_run_descriptor(run: &JobRun) -> Option<ResourceDescriptor> {
    let failure = run.failure_reason().map(|r| r.as_str().to_owned());
    Some(ResourceDescriptor {
        id: run.id()?.to_owned(),
        name: run.name().unwrap_or_default().to_owned(),
        status: run.state().map(|s| s.as_str().to_owned()),
        status_detail: owned(run.state_details()).or(failure),
        description: owned(run.release_label()),
    })
}
