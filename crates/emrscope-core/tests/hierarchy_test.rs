// Integration tests for lazy population, caching and invalidation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{APPS, FakeDomain, STEPS, explorer, explorer_with, ids, numbered, resource};
use emrscope_core::{
    ContextState, CoreError, HierarchyEvent, NodeKind, NodeState, Page, PageToken, status_set,
};

// ── Root population ─────────────────────────────────────────────────

#[tokio::test]
async fn test_default_filter_keeps_running_and_waiting() {
    let domain = Arc::new(
        FakeDomain::new("emr-ec2")
            .filtered(&["RUNNING", "WAITING"])
            .items(vec![
                resource("j-1", "RUNNING"),
                resource("j-2", "WAITING"),
                resource("j-3", "TERMINATED"),
            ]),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);

    let root = explorer.root("emr-ec2").unwrap();
    let children = root.children().await;

    assert_eq!(ids(&children), vec!["j-1", "j-2"]);
    assert_eq!(
        domain.seen_filters.lock().unwrap().clone(),
        vec![Some(status_set(["RUNNING", "WAITING"]))]
    );
}

#[tokio::test]
async fn test_unfilterable_domain_returns_everything() {
    let domain = Arc::new(
        FakeDomain::new("glue-catalog").items(vec![resource("a", "RUNNING"), resource("b", "GONE")]),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);

    assert!(explorer.filter("glue-catalog").is_none());
    let children = explorer.root("glue-catalog").unwrap().children().await;
    assert_eq!(children.len(), 2);
    assert_eq!(domain.seen_filters.lock().unwrap().clone(), vec![None]);
}

#[tokio::test]
async fn test_cap_truncates_after_in_flight_page() {
    let domain = Arc::new(FakeDomain::new("emr-serverless").list(|token| {
        Ok(match token {
            None => Page::new(numbered("a", 60, "RUNNING"), Some(PageToken::new("t2"))),
            Some(_) => Page::last(numbered("b", 60, "RUNNING")),
        })
    }));
    let explorer = explorer(vec![Arc::clone(&domain)]);

    let root = explorer.root("emr-serverless").unwrap();
    let children = root.children().await;

    assert_eq!(children.len(), 100);
    assert_eq!(domain.list_calls(), 2);
    assert!(root.is_truncated());
}

#[tokio::test]
async fn test_endless_tokens_stop_at_cap() {
    let domain = Arc::new(
        FakeDomain::new("emr-containers")
            .list(|token| {
                let n = token.map_or(0, |t| t.as_str().len());
                Ok(Page::new(
                    numbered(&format!("p{n}"), 10, "RUNNING"),
                    Some(PageToken::new("x".repeat(n + 1))),
                ))
            }),
    );
    let explorer = explorer_with(Arc::new(ContextState::default()), vec![Arc::clone(&domain)], 25);

    let children = explorer.root("emr-containers").unwrap().children().await;
    assert_eq!(children.len(), 25);
    assert_eq!(domain.list_calls(), 3);
}

#[tokio::test]
async fn test_duplicate_ids_first_wins() {
    let domain = Arc::new(FakeDomain::new("emr-ec2").items(vec![
        resource("j-1", "RUNNING"),
        resource("j-1", "WAITING"),
        resource("j-2", "RUNNING"),
    ]));
    let explorer = explorer(vec![domain]);

    let children = explorer.root("emr-ec2").unwrap().children().await;
    assert_eq!(ids(&children), vec!["j-1", "j-2"]);
    assert_eq!(
        children[0].descriptor().unwrap().status.as_deref(),
        Some("RUNNING")
    );
}

// ── Caching and coalescing ──────────────────────────────────────────

#[tokio::test]
async fn test_second_expansion_is_served_from_cache() {
    let domain = Arc::new(FakeDomain::new("emr-ec2").items(numbered("j", 3, "RUNNING")));
    let explorer = explorer(vec![Arc::clone(&domain)]);
    let root = explorer.root("emr-ec2").unwrap();

    assert_eq!(root.state(), NodeState::Unpopulated);
    let first = root.children().await;
    let second = root.children().await;

    assert_eq!(domain.list_calls(), 1);
    assert_eq!(root.state(), NodeState::Populated);
    assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[tokio::test]
async fn test_expand_refresh_expand_fetches_twice() {
    let domain = Arc::new(FakeDomain::new("emr-ec2").items(numbered("j", 2, "RUNNING")));
    let explorer = explorer(vec![Arc::clone(&domain)]);
    let root = explorer.root("emr-ec2").unwrap();

    root.children().await;
    explorer.refresh(&root);
    assert_eq!(root.state(), NodeState::Stale);
    root.children().await;

    assert_eq!(domain.list_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_expansions_share_one_fetch() {
    let domain = Arc::new(
        FakeDomain::new("emr-ec2")
            .delay(Duration::from_millis(20))
            .items(numbered("j", 4, "RUNNING")),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);
    let root = explorer.root("emr-ec2").unwrap();

    let (a, b) = tokio::join!(root.children(), root.children());

    assert_eq!(domain.list_calls(), 1);
    assert_eq!(ids(&a), ids(&b));
}

#[tokio::test]
async fn test_node_reports_populating_while_fetch_is_in_flight() {
    let domain = Arc::new(
        FakeDomain::new("emr-ec2")
            .delay(Duration::from_millis(200))
            .items(numbered("j", 2, "RUNNING")),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);
    let root = explorer.root("emr-ec2").unwrap();

    let fetching = Arc::clone(&root);
    let task = tokio::spawn(async move { fetching.children().await.len() });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(root.state(), NodeState::Populating);
    assert_eq!(task.await.unwrap(), 2);
    assert_eq!(root.state(), NodeState::Populated);
    assert_eq!(domain.list_calls(), 1);
}

// ── Child kinds ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_leaf_resource_makes_no_remote_call() {
    let domain = Arc::new(FakeDomain::new("emr-ec2").items(numbered("j", 1, "RUNNING")));
    let explorer = explorer(vec![Arc::clone(&domain)]);

    let cluster = Arc::clone(&explorer.root("emr-ec2").unwrap().children().await[0]);
    assert!(!cluster.is_expandable());
    assert!(cluster.children().await.is_empty());
    assert_eq!(domain.children_calls(), 0);
}

#[tokio::test]
async fn test_single_kind_lists_children_directly() {
    let domain = Arc::new(
        FakeDomain::new("emr-containers")
            .kinds(&[STEPS])
            .items(numbered("vc", 1, "RUNNING"))
            .children(|parent, kind, _| {
                assert_eq!(kind.key, "steps");
                Ok(Page::last(numbered(&format!("{parent}-run"), 2, "COMPLETED")))
            }),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);

    let vc = Arc::clone(&explorer.root("emr-containers").unwrap().children().await[0]);
    let runs = vc.children().await;

    assert_eq!(ids(&runs), vec!["vc-0-run-0", "vc-0-run-1"]);
    assert_eq!(runs[0].parent_id(), Some("vc-0"));
    assert_eq!(runs[0].root_id(), "emr-containers");
    assert_eq!(domain.children_calls(), 1);
}

#[tokio::test]
async fn test_several_kinds_become_group_nodes() {
    let domain = Arc::new(
        FakeDomain::new("emr-ec2")
            .kinds(&[APPS, STEPS])
            .items(numbered("j", 1, "RUNNING"))
            .children(|parent, kind, _| {
                Ok(Page::last(vec![resource(&format!("{parent}:{}", kind.key), "COMPLETED")]))
            }),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);

    let cluster = Arc::clone(&explorer.root("emr-ec2").unwrap().children().await[0]);
    let groups = cluster.children().await;

    assert_eq!(ids(&groups), vec!["j-0/applications", "j-0/steps"]);
    assert_eq!(groups[1].label(), "Steps");
    assert!(matches!(groups[1].kind(), NodeKind::Group { parent_id, .. } if parent_id == "j-0"));
    assert_eq!(domain.children_calls(), 0);

    let steps = groups[1].children().await;
    assert_eq!(ids(&steps), vec!["j-0:steps"]);
    assert_eq!(domain.children_calls(), 1);
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_page_two_failure_keeps_page_one() {
    let domain = Arc::new(FakeDomain::new("emr-serverless").list(|token| match token {
        None => Ok(Page::new(numbered("app", 3, "STARTED"), Some(PageToken::new("t2")))),
        Some(_) => Err(CoreError::remote("emr-serverless", "ListApplications", "throttled")),
    }));
    let explorer = explorer(vec![Arc::clone(&domain)]);
    let mut events = explorer.events();

    let root = explorer.root("emr-serverless").unwrap();
    let children = root.children().await;

    assert_eq!(children.len(), 3);
    assert_eq!(root.state(), NodeState::Populated);
    assert!(root.last_error().unwrap().is_remote());
    assert_eq!(
        events.try_recv().unwrap(),
        HierarchyEvent::FetchFailed {
            node_id: "emr-serverless".into(),
            domain: "emr-serverless".into(),
            operation: "ListApplications".into(),
            message: "throttled".into(),
        }
    );
    assert!(events.try_recv().is_err());

    // Cached despite the failure: no retry until refreshed.
    root.children().await;
    assert_eq!(domain.list_calls(), 2);
}

#[tokio::test]
async fn test_first_page_failure_yields_empty_children() {
    let domain = Arc::new(
        FakeDomain::new("emr-ec2")
            .list(|_| Err(CoreError::remote("emr-ec2", "ListClusters", "AccessDenied"))),
    );
    let explorer = explorer(vec![domain]);

    let root = explorer.root("emr-ec2").unwrap();
    assert!(root.children().await.is_empty());
    assert_eq!(root.state(), NodeState::Populated);
}

// ── Invalidation ────────────────────────────────────────────────────

#[tokio::test]
async fn test_context_change_stales_every_root() {
    let ec2 = Arc::new(FakeDomain::new("emr-ec2").items(numbered("j", 1, "RUNNING")));
    let glue = Arc::new(FakeDomain::new("glue-catalog").items(numbered("db", 2, "ACTIVE")));
    let context = Arc::new(ContextState::default());
    let explorer = explorer_with(Arc::clone(&context), vec![Arc::clone(&ec2), Arc::clone(&glue)], 100);
    let mut events = explorer.events();

    for root in explorer.roots() {
        root.children().await;
        assert_eq!(root.state(), NodeState::Populated);
    }

    context.set_region("eu-west-1");

    assert_eq!(explorer.coordinator().generation(), 1);
    for root in explorer.roots() {
        assert_eq!(root.state(), NodeState::Stale);
    }
    let mut changed = vec![
        events.try_recv().unwrap().root_id().unwrap().to_owned(),
        events.try_recv().unwrap().root_id().unwrap().to_owned(),
    ];
    changed.sort();
    assert_eq!(changed, vec!["emr-ec2", "glue-catalog"]);

    for root in explorer.roots() {
        root.children().await;
    }
    assert_eq!(ec2.list_calls(), 2);
    assert_eq!(glue.list_calls(), 2);
}

#[tokio::test]
async fn test_filter_change_invalidates_only_its_root() {
    let ec2 = Arc::new(
        FakeDomain::new("emr-ec2")
            .filtered(&["RUNNING"])
            .kinds(&[STEPS])
            .items(vec![resource("j-1", "RUNNING"), resource("j-2", "TERMINATED")])
            .children(|_, _, _| Ok(Page::last(numbered("s", 1, "COMPLETED")))),
    );
    let other = Arc::new(FakeDomain::new("emr-containers").filtered(&["RUNNING"]));
    let explorer = explorer(vec![Arc::clone(&ec2), Arc::clone(&other)]);
    let mut events = explorer.events();

    let root = explorer.root("emr-ec2").unwrap();
    let other_root = explorer.root("emr-containers").unwrap();
    let before = root.children().await;
    other_root.children().await;
    before[0].children().await;
    assert_eq!(ids(&before), vec!["j-1"]);

    explorer.filter("emr-ec2").unwrap().allow("TERMINATED");

    assert_eq!(root.state(), NodeState::Stale);
    assert_eq!(before[0].state(), NodeState::Populated);
    assert_eq!(other_root.state(), NodeState::Populated);
    assert_eq!(
        events.try_recv().unwrap(),
        HierarchyEvent::Changed { root_id: "emr-ec2".into() }
    );

    let after = root.children().await;
    assert_eq!(ids(&after), vec!["j-1", "j-2"]);
    assert!(Arc::ptr_eq(&before[0], &after[0]));
    after[0].children().await;
    assert_eq!(ec2.children_calls(), 1);
}

#[tokio::test]
async fn test_refresh_reaches_cached_descendants() {
    let domain = Arc::new(
        FakeDomain::new("emr-containers")
            .kinds(&[STEPS])
            .items(numbered("vc", 1, "RUNNING"))
            .children(|_, _, _| Ok(Page::last(numbered("run", 1, "RUNNING")))),
    );
    let explorer = explorer(vec![Arc::clone(&domain)]);
    let root = explorer.root("emr-containers").unwrap();

    let vc = Arc::clone(&root.children().await[0]);
    vc.children().await;
    explorer.refresh(&root);

    assert_eq!(vc.state(), NodeState::Stale);
    vc.children().await;
    assert_eq!(domain.children_calls(), 2);
}

#[tokio::test]
async fn test_repeated_refresh_all_refetches_each_root_once() {
    let ec2 = Arc::new(FakeDomain::new("emr-ec2").items(numbered("j", 2, "RUNNING")));
    let glue = Arc::new(FakeDomain::new("glue-catalog").items(numbered("db", 3, "ACTIVE")));
    let explorer = explorer(vec![Arc::clone(&ec2), Arc::clone(&glue)]);

    let mut before = Vec::new();
    for root in explorer.roots() {
        before.push(root.children().await);
    }

    explorer.refresh_all();
    explorer.refresh_all();
    for root in explorer.roots() {
        assert_eq!(root.state(), NodeState::Stale);
    }

    for (root, old) in explorer.roots().iter().zip(&before) {
        let fresh = root.children().await;
        assert_eq!(ids(&fresh), ids(old));
        assert!(fresh.iter().zip(old).all(|(a, b)| Arc::ptr_eq(a, b)));
        assert_eq!(root.state(), NodeState::Populated);
        root.children().await;
    }
    assert_eq!(ec2.list_calls(), 2);
    assert_eq!(glue.list_calls(), 2);
}

#[tokio::test]
async fn test_selecting_the_same_region_twice_refetches_once() {
    let domain = Arc::new(FakeDomain::new("emr-serverless").items(numbered("app", 2, "STARTED")));
    let context = Arc::new(ContextState::default());
    let explorer = explorer_with(Arc::clone(&context), vec![Arc::clone(&domain)], 100);
    let root = explorer.root("emr-serverless").unwrap();
    root.children().await;

    context.set_region("eu-west-1");
    context.set_region("eu-west-1");

    assert_eq!(explorer.coordinator().generation(), 2);
    assert_eq!(root.state(), NodeState::Stale);
    assert_eq!(ids(&root.children().await), vec!["app-0", "app-1"]);
    root.children().await;
    assert_eq!(domain.list_calls(), 2);
}
