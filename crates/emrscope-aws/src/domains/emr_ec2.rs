// EMR on EC2: clusters, with their installed applications and steps.

use async_trait::async_trait;
use aws_sdk_emr::operation::describe_cluster::DescribeClusterError;
use aws_sdk_emr::types::{Application, Cluster, ClusterState, ClusterStatus, ClusterSummary, StepSummary};
use emrscope_core::{
    ChildKind, CoreError, Page, PageToken, ResourceClient, ResourceDescriptor, ResourceDetail,
    StatusSet, status_set,
};
use tracing::{debug, info};

use super::{is_empty_filter, next_token, owned, states, token_string};
use crate::error::Error;
use crate::session::AwsSession;

pub const KEY: &str = "emr-ec2";
pub const APPLICATIONS: ChildKind = ChildKind::new("applications", "Apps");
pub const STEPS: ChildKind = ChildKind::new("steps", "Steps");

const KNOWN_STATES: &[&str] = &[
    "STARTING",
    "BOOTSTRAPPING",
    "RUNNING",
    "WAITING",
    "TERMINATING",
    "TERMINATED",
    "TERMINATED_WITH_ERRORS",
];

/// EMR clusters on EC2.
#[derive(Debug, Clone)]
pub struct EmrOnEc2 {
    session: AwsSession,
}

impl EmrOnEc2 {
    pub fn new(session: AwsSession) -> Self {
        Self { session }
    }

    async fn describe_cluster(&self, id: &str) -> Result<Option<Cluster>, Error> {
        let result = self
            .session
            .emr()
            .await
            .describe_cluster()
            .cluster_id(id)
            .send()
            .await;

        match result {
            Ok(out) => Ok(out.cluster().cloned()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(DescribeClusterError::is_invalid_request_exception) =>
            {
                debug!(cluster = id, "cluster not found");
                Ok(None)
            }
            Err(err) => Err(Error::sdk(KEY, "DescribeCluster", &err)),
        }
    }

    async fn list_steps(&self, cluster_id: &str, token: Option<PageToken>) -> Result<Page, Error> {
        info!(region = %self.session.region(), cluster = cluster_id, "EMR: fetching steps");
        let out = self
            .session
            .emr()
            .await
            .list_steps()
            .cluster_id(cluster_id)
            .set_marker(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "ListSteps", &e))?;

        Ok(Page::new(
            out.steps().iter().filter_map(step_descriptor).collect(),
            next_token(out.marker()),
        ))
    }
}

#[async_trait]
impl ResourceClient for EmrOnEc2 {
    fn key(&self) -> &'static str {
        KEY
    }

    fn display_name(&self) -> &'static str {
        "EMR on EC2"
    }

    fn default_filter(&self) -> Option<StatusSet> {
        Some(status_set(["RUNNING", "WAITING"]))
    }

    fn known_states(&self) -> &'static [&'static str] {
        KNOWN_STATES
    }

    fn child_kinds(&self, _resource: &ResourceDescriptor) -> Vec<ChildKind> {
        vec![APPLICATIONS, STEPS]
    }

    async fn list(
        &self,
        filter: Option<&StatusSet>,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        if is_empty_filter(filter) {
            return Ok(Page::default());
        }

        info!(region = %self.session.region(), "EMR: fetching clusters");
        let out = self
            .session
            .emr()
            .await
            .list_clusters()
            .set_cluster_states(states::<ClusterState>(filter))
            .set_marker(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "ListClusters", &e))?;

        Ok(Page::new(
            out.clusters().iter().filter_map(cluster_descriptor).collect(),
            next_token(out.marker()),
        ))
    }

    async fn describe(&self, id: &str) -> Result<Option<ResourceDetail>, CoreError> {
        Ok(self.describe_cluster(id).await?.as_ref().and_then(cluster_detail))
    }

    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
        token: Option<PageToken>,
    ) -> Result<Page, CoreError> {
        match kind.key {
            "applications" => {
                let apps: Vec<ResourceDescriptor> = self
                    .describe_cluster(parent_id)
                    .await?
                    .map(|cluster| {
                        cluster
                            .applications()
                            .iter()
                            .filter_map(application_descriptor)
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Page::last(apps))
            }
            "steps" => Ok(self.list_steps(parent_id, token).await?),
            _ => Ok(Page::default()),
        }
    }
}

// ── Mapping ─────────────────────────────────────────────────────────

fn state_of(status: Option<&ClusterStatus>) -> (Option<String>, Option<String>) {
    let state = status
        .and_then(ClusterStatus::state)
        .map(|s| s.as_str().to_owned());
    let reason = owned(
        status
            .and_then(ClusterStatus::state_change_reason)
            .and_then(|r| r.message()),
    );
    (state, reason)
}

pub(crate) fn cluster_descriptor(cluster: &ClusterSummary) -> Option<ResourceDescriptor> {
    let id = cluster.id()?;
    let (status, status_detail) = state_of(cluster.status());
    Some(ResourceDescriptor {
        id: id.to_owned(),
        name: cluster.name().unwrap_or_default().to_owned(),
        status,
        status_detail,
        description: None,
    })
}

pub(crate) fn cluster_detail(cluster: &Cluster) -> Option<ResourceDetail> {
    let id = cluster.id()?;
    let (status, status_detail) = state_of(cluster.status());
    let descriptor = ResourceDescriptor {
        id: id.to_owned(),
        name: cluster.name().unwrap_or_default().to_owned(),
        status,
        status_detail,
        description: owned(cluster.release_label()),
    };

    let apps: Vec<String> = cluster
        .applications()
        .iter()
        .filter_map(|app| match (app.name(), app.version()) {
            (Some(name), Some(version)) => Some(format!("{name} {version}")),
            (Some(name), None) => Some(name.to_owned()),
            _ => None,
        })
        .collect();

    let created = cluster
        .status()
        .and_then(ClusterStatus::timeline)
        .and_then(|t| t.creation_date_time())
        .map(ToString::to_string);

    Some(
        ResourceDetail::new(descriptor)
            .attr("release_label", cluster.release_label())
            .attr("applications", (!apps.is_empty()).then(|| apps.join(", ")))
            .attr("created", created)
            .attr("master_public_dns", cluster.master_public_dns_name())
            .attr("log_uri", cluster.log_uri())
            .attr(
                "normalized_instance_hours",
                cluster.normalized_instance_hours().map(|h| h.to_string()),
            )
            .attr("auto_terminate", cluster.auto_terminate().map(|b| b.to_string()))
            .attr(
                "termination_protected",
                cluster.termination_protected().map(|b| b.to_string()),
            )
            .attr("arn", cluster.cluster_arn()),
    )
}

pub(crate) fn application_descriptor(app: &Application) -> Option<ResourceDescriptor> {
    let name = app.name()?;
    Some(ResourceDescriptor {
        id: name.to_owned(),
        name: name.to_owned(),
        status: None,
        status_detail: None,
        description: owned(app.version()),
    })
}

pub(crate) fn step_descriptor(step: &StepSummary) -> Option<ResourceDescriptor> {
    let id = step.id()?;
    let status = step.status();
    let failure = status
        .and_then(|s| s.failure_details())
        .and_then(|f| f.reason().or(f.message()));
    let change = status
        .and_then(|s| s.state_change_reason())
        .and_then(|r| r.message());

    Some(ResourceDescriptor {
        id: id.to_owned(),
        name: step.name().unwrap_or_default().to_owned(),
        status: status
            .and_then(|s| s.state())
            .map(|s| s.as_str().to_owned()),
        status_detail: owned(failure.or(change)),
        description: step
            .action_on_failure()
            .map(|a| format!("on failure: {}", a.as_str())),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use aws_sdk_emr::types::{
        ActionOnFailure, ClusterStateChangeReason, FailureDetails, StepState, StepStatus,
    };
    use emrscope_core::StatusTone;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn summary_maps_state_and_reason() {
        let summary = ClusterSummary::builder()
            .id("j-1")
            .name("nightly-etl")
            .status(
                ClusterStatus::builder()
                    .state(ClusterState::Waiting)
                    .state_change_reason(
                        ClusterStateChangeReason::builder()
                            .message("Cluster ready after last step completed.")
                            .build(),
                    )
                    .build(),
            )
            .build();

        let d = cluster_descriptor(&summary).unwrap();
        assert_eq!(d.id, "j-1");
        assert_eq!(d.label(), "nightly-etl [WAITING]");
        assert_eq!(
            d.status_detail.as_deref(),
            Some("Cluster ready after last step completed.")
        );
        assert_eq!(d.tone(), StatusTone::Active);
    }

    #[test]
    fn summary_without_id_is_skipped() {
        assert!(cluster_descriptor(&ClusterSummary::builder().name("x").build()).is_none());
    }

    #[test]
    fn failed_step_prefers_failure_reason() {
        let step = StepSummary::builder()
            .id("s-1")
            .name("load")
            .action_on_failure(ActionOnFailure::Continue)
            .status(
                StepStatus::builder()
                    .state(StepState::Failed)
                    .failure_details(FailureDetails::builder().reason("Unknown error.").build())
                    .build(),
            )
            .build();

        let d = step_descriptor(&step).unwrap();
        assert_eq!(d.status.as_deref(), Some("FAILED"));
        assert_eq!(d.status_detail.as_deref(), Some("Unknown error."));
        assert_eq!(d.description.as_deref(), Some("on failure: CONTINUE"));
        assert_eq!(d.tone(), StatusTone::Failed);
    }

    #[test]
    fn cluster_detail_lists_applications() {
        let cluster = Cluster::builder()
            .id("j-2")
            .name("adhoc")
            .release_label("emr-7.1.0")
            .applications(Application::builder().name("Spark").version("3.5.0").build())
            .applications(Application::builder().name("Hive").build())
            .build();

        let detail = cluster_detail(&cluster).unwrap();
        assert_eq!(detail.descriptor.description.as_deref(), Some("emr-7.1.0"));
        assert_eq!(detail.attributes["applications"], "Spark 3.5.0, Hive");
        assert!(!detail.attributes.contains_key("log_uri"));

        let apps: Vec<_> = cluster
            .applications()
            .iter()
            .filter_map(application_descriptor)
            .collect();
        assert_eq!(apps[0].id, "Spark");
        assert_eq!(apps[0].description.as_deref(), Some("3.5.0"));
    }
}
