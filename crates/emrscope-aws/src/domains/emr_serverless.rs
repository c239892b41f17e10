// EMR Serverless: applications and their job runs.

use async_trait::async_trait;
use aws_sdk_emrserverless::operation::get_application::GetApplicationError;
use aws_sdk_emrserverless::types::{Application, ApplicationState, ApplicationSummary, JobRunState, JobRunSummary};
use aws_smithy_types::DateTime;
use emrscope_core::{
    ChildKind, CoreError, Page, PageToken, ResourceClient, ResourceDescriptor, ResourceDetail,
    StatusSet, status_set,
};
use tracing::{debug, info};

use super::{is_empty_filter, next_token, opt, owned, states, token_string};
use crate::error::Error;
use crate::session::AwsSession;

pub const KEY: &str = "emr-serverless";
pub const JOB_RUNS: ChildKind = ChildKind::new("job-runs", "Job Runs");

const KNOWN_STATES: &[&str] = &[
    "CREATING",
    "CREATED",
    "STARTING",
    "STARTED",
    "STOPPING",
    "STOPPED",
    "TERMINATED",
];

/// EMR Serverless applications.
#[derive(Debug, Clone)]
pub struct EmrServerless {
    session: AwsSession,
}

impl EmrServerless {
    pub fn new(session: AwsSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ResourceClient for EmrServerless {
    fn key(&self) -> &'static str {
        KEY
    }

    fn display_name(&self) -> &'static str {
        "EMR Serverless"
    }

    /// Everything except `TERMINATED`.
    fn default_filter(&self) -> Option<StatusSet> {
        Some(status_set(KNOWN_STATES.iter().filter(|s| **s != "TERMINATED")))
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

        info!(region = %self.session.region(), "EMR Serverless: fetching applications");
        let out = self
            .session
            .emr_serverless()
            .await
            .list_applications()
            .set_states(states::<ApplicationState>(filter))
            .set_next_token(token_string(token))
            .send()
            .await
            .map_err(|e| Error::sdk(KEY, "ListApplications", &e))?;

        Ok(Page::new(
            out.applications().iter().filter_map(application_descriptor).collect(),
            next_token(out.next_token()),
        ))
    }

    async fn describe(&self, id: &str) -> Result<Option<ResourceDetail>, CoreError> {
        let result = self
            .session
            .emr_serverless()
            .await
            .get_application()
            .application_id(id)
            .send()
            .await;

        match result {
            Ok(out) => {
                let app: Option<&Application> = opt(out.application());
                Ok(app.and_then(application_detail))
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(GetApplicationError::is_resource_not_found_exception) =>
            {
                debug!(application = id, "application not found");
                Ok(None)
            }
            Err(err) => Err(Error::sdk(KEY, "GetApplication", &err).into()),
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
            application = parent_id,
            "EMR Serverless: fetching job runs"
        );
        let out = self
            .session
            .emr_serverless()
            .await
            .list_job_runs()
            .application_id(parent_id)
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

fn release(kind: Option<&str>, label: Option<&str>) -> Option<String> {
    match (owned(kind), owned(label)) {
        (Some(kind), Some(label)) => Some(format!("{kind} {label}")),
        (kind, label) => kind.or(label),
    }
}

fn application_descriptor(app: &ApplicationSummary) -> Option<ResourceDescriptor> {
    let id: Option<&str> = opt(app.id());
    let state: Option<&ApplicationState> = opt(app.state());
    let details: Option<&str> = opt(app.state_details());

    Some(ResourceDescriptor {
        id: id?.to_owned(),
        name: app.name().unwrap_or_default().to_owned(),
        status: state.map(|s| s.as_str().to_owned()),
        status_detail: owned(details),
        description: release(opt(app.r#type()), opt(app.release_label())),
    })
}

fn application_detail(app: &Application) -> Option<ResourceDetail> {
    let id: Option<&str> = opt(app.application_id());
    let state: Option<&ApplicationState> = opt(app.state());
    let details: Option<&str> = opt(app.state_details());
    let label: Option<&str> = opt(app.release_label());
    let created: Option<&DateTime> = opt(app.created_at());
    let idle_stop = app
        .auto_stop_configuration()
        .filter(|c| c.enabled().unwrap_or(false))
        .and_then(|c| c.idle_timeout_minutes())
        .map(|m| format!("{m} min"));

    let descriptor = ResourceDescriptor {
        id: id?.to_owned(),
        name: app.name().unwrap_or_default().to_owned(),
        status: state.map(|s| s.as_str().to_owned()),
        status_detail: owned(details),
        description: release(opt(app.r#type()), label),
    };

    Some(
        ResourceDetail::new(descriptor)
            .attr("release_label", label)
            .attr("type", opt::<&str>(app.r#type()))
            .attr("architecture", app.architecture().map(|a| a.as_str().to_owned()))
            .attr("created", created.map(ToString::to_string))
            .attr("auto_stop_after", idle_stop)
            .attr("arn", opt::<&str>(app.arn())),
    )
}

fn job_run_descriptor(run: &JobRunSummary) -> Option<ResourceDescriptor> {
    let id: Option<&str> = opt(run.id());
    let state: Option<&JobRunState> = opt(run.state());
    let details: Option<&str> = opt(run.state_details());

    Some(ResourceDescriptor {
        id: id?.to_owned(),
        name: run.name().unwrap_or_default().to_owned(),
        status: state.map(|s| s.as_str().to_owned()),
        status_detail: owned(details),
        description: owned(opt(run.release_label())),
    })
}
