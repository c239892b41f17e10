// Integration tests for the EMR on EC2 domain against a wiremock stand-in
// for the EMR JSON endpoint.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use emrscope_aws::{AwsSession, Credentials, EmrOnEc2, SessionOptions};
use emrscope_core::{ContextState, Explorer, HierarchyEvent, ResourceClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Arc<ContextState>, AwsSession) {
    let server = MockServer::start().await;
    let context = Arc::new(ContextState::default());
    let options = SessionOptions::default()
        .with_endpoint_url(server.uri())
        .with_credentials(Credentials::new("AKID", "SECRET", None, None, "test"))
        .with_timeout(Duration::from_secs(5))
        .with_max_attempts(1);
    let session = AwsSession::new(Arc::clone(&context), options).unwrap();
    (server, context, session)
}

fn explorer(context: Arc<ContextState>, session: &AwsSession) -> Explorer {
    Explorer::builder(context)
        .domain(Arc::new(EmrOnEc2::new(session.clone())))
        .build()
        .unwrap()
}

fn emr(operation: &str) -> wiremock::MockBuilder {
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-amz-target", format!("ElasticMapReduce.{operation}").as_str()))
}

fn amz_json(status: u16, body: &Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_raw(body.to_string(), "application/x-amz-json-1.1")
}

fn cluster(id: &str, state: &str) -> Value {
    json!({
        "Id": id,
        "Name": format!("cluster-{id}"),
        "Status": { "State": state, "StateChangeReason": {} }
    })
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_clusters_follows_marker_with_default_states() {
    let (server, context, session) = setup().await;

    emr("ListClusters")
        .and(body_partial_json(json!({ "ClusterStates": ["RUNNING", "WAITING"] })))
        .respond_with(amz_json(
            200,
            &json!({
                "Clusters": [cluster("j-1", "RUNNING"), cluster("j-2", "WAITING")],
                "Marker": "page-2"
            }),
        ))
        .expect(1)
        .mount(&server)
        .await;

    emr("ListClusters")
        .and(body_partial_json(json!({ "Marker": "page-2" })))
        .respond_with(amz_json(200, &json!({ "Clusters": [cluster("j-3", "RUNNING")] })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    let explorer = explorer(context, &session);
    let root = explorer.root("emr-ec2").unwrap();
    let children = root.children().await;

    let ids: Vec<&str> = children.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["j-1", "j-2", "j-3"]);
    assert_eq!(children[1].label(), "cluster-j-2 [WAITING]");
}

#[tokio::test]
async fn test_empty_filter_skips_remote_call() {
    let (server, context, session) = setup().await;

    emr("ListClusters")
        .respond_with(amz_json(200, &json!({ "Clusters": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let explorer = explorer(context, &session);
    explorer
        .filter("emr-ec2")
        .unwrap()
        .set_allowed(Default::default());

    assert!(explorer.root("emr-ec2").unwrap().children().await.is_empty());
}

// ── Describe ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_describe_cluster_detail() {
    let (server, _context, session) = setup().await;

    emr("DescribeCluster")
        .and(body_partial_json(json!({ "ClusterId": "j-1" })))
        .respond_with(amz_json(
            200,
            &json!({
                "Cluster": {
                    "Id": "j-1",
                    "Name": "nightly",
                    "Status": { "State": "WAITING" },
                    "ReleaseLabel": "emr-7.1.0",
                    "Applications": [
                        { "Name": "Spark", "Version": "3.5.0" },
                        { "Name": "Hadoop", "Version": "3.3.6" }
                    ]
                }
            }),
        ))
        .mount(&server)
        .await;

    let detail = EmrOnEc2::new(session).describe("j-1").await.unwrap().unwrap();

    assert_eq!(detail.descriptor.status.as_deref(), Some("WAITING"));
    assert_eq!(detail.attributes["release_label"], "emr-7.1.0");
    assert_eq!(detail.attributes["applications"], "Spark 3.5.0, Hadoop 3.3.6");
}

#[tokio::test]
async fn test_describe_missing_cluster_is_none() {
    let (server, _context, session) = setup().await;

    emr("DescribeCluster")
        .respond_with(amz_json(
            400,
            &json!({
                "__type": "InvalidRequestException",
                "Message": "Cluster id 'j-gone' is not valid."
            }),
        ))
        .mount(&server)
        .await;

    let detail = EmrOnEc2::new(session).describe("j-gone").await.unwrap();
    assert!(detail.is_none());
}

// ── Children ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cluster_groups_apps_and_steps() {
    let (server, context, session) = setup().await;

    emr("ListClusters")
        .respond_with(amz_json(200, &json!({ "Clusters": [cluster("j-1", "RUNNING")] })))
        .mount(&server)
        .await;
    emr("DescribeCluster")
        .respond_with(amz_json(
            200,
            &json!({
                "Cluster": {
                    "Id": "j-1",
                    "Applications": [{ "Name": "Spark", "Version": "3.5.0" }]
                }
            }),
        ))
        .mount(&server)
        .await;
    emr("ListSteps")
        .and(body_partial_json(json!({ "ClusterId": "j-1" })))
        .respond_with(amz_json(
            200,
            &json!({
                "Steps": [{
                    "Id": "s-1",
                    "Name": "load",
                    "ActionOnFailure": "CONTINUE",
                    "Status": {
                        "State": "FAILED",
                        "FailureDetails": { "Reason": "Unknown error." }
                    }
                }]
            }),
        ))
        .mount(&server)
        .await;

    let explorer = explorer(context, &session);
    let apps = explorer.resolve(&["emr-ec2", "j-1", "applications"]).await.unwrap();
    let steps = explorer.resolve(&["emr-ec2", "j-1", "steps"]).await.unwrap();

    let app_nodes = apps.children().await;
    assert_eq!(app_nodes[0].id(), "Spark");
    assert_eq!(app_nodes[0].descriptor().unwrap().description.as_deref(), Some("3.5.0"));

    let step_nodes = steps.children().await;
    assert_eq!(step_nodes[0].label(), "load [FAILED]");
    assert_eq!(
        step_nodes[0].descriptor().unwrap().status_detail.as_deref(),
        Some("Unknown error.")
    );
}

#[tokio::test]
async fn test_step_listing_failure_emits_fetch_failed() {
    let (server, context, session) = setup().await;

    emr("ListClusters")
        .respond_with(amz_json(200, &json!({ "Clusters": [cluster("j-1", "WAITING")] })))
        .mount(&server)
        .await;
    emr("ListSteps")
        .respond_with(amz_json(
            400,
            &json!({
                "__type": "AccessDeniedException",
                "Message": "User is not authorized to perform elasticmapreduce:ListSteps"
            }),
        ))
        .mount(&server)
        .await;

    let explorer = explorer(context, &session);
    let mut events = explorer.events();
    let steps = explorer.resolve(&["emr-ec2", "j-1", "steps"]).await.unwrap();

    assert!(steps.children().await.is_empty());
    match events.try_recv().unwrap() {
        HierarchyEvent::FetchFailed {
            node_id,
            domain,
            operation,
            message,
        } => {
            assert_eq!(node_id, "j-1/steps");
            assert_eq!(domain, "emr-ec2");
            assert_eq!(operation, "ListSteps");
            assert!(message.starts_with("AccessDeniedException"), "{message}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
