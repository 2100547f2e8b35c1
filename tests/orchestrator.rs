mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{quiet_config, user_schema, user_service, MockTransport, URL};
use gqlfuzz::bucket::ObjectsBucket;
use gqlfuzz::config::RunConfig;
use gqlfuzz::errors::FuzzError;
use gqlfuzz::fuzzer::{Fuzzer, RunStatus, OBJECTS_BUCKET_FILE, PASS_FILTERS, STATS_FILE};
use gqlfuzz::graph::NodeId;
use gqlfuzz::schema::MutationType;

fn fuzzer(transport: Arc<MockTransport>, config: RunConfig) -> Fuzzer {
    Fuzzer::new(user_schema(), transport, URL, config)
}

fn executed_names(fuzzer: &Fuzzer, ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(|&id| fuzzer.graph().node(id).name.clone()).collect()
}

#[tokio::test]
async fn test_first_pass_only_creates_and_queries() {
    let transport = Arc::new(MockTransport::new(user_service));
    let mut fuzzer = fuzzer(transport.clone(), quiet_config());
    let starters = fuzzer.graph().starter_nodes(&mut StdRng::seed_from_u64(1));

    let report = fuzzer.perform_dfs(&starters, PASS_FILTERS[0]).await;

    for &id in &report.executed {
        let node = fuzzer.graph().node(id);
        assert!(
            !matches!(
                node.mutation_type,
                Some(MutationType::Update | MutationType::Delete | MutationType::Unknown)
            ),
            "pass 1 ran {}",
            node.name
        );
    }
    let names = executed_names(&fuzzer, &report.executed);
    assert!(names.contains(&"createUser".to_string()));
    assert!(names.contains(&"getUser".to_string()));
    for payload in transport.sent() {
        assert!(!payload.contains("updateUser"));
        assert!(!payload.contains("deleteUser"));
        assert!(!payload.contains("resetEverything"));
    }
    assert_eq!(fuzzer.bucket().instances("User").len(), 1);
}

#[tokio::test]
async fn test_later_passes_unlock_updates_then_deletes() {
    let transport = Arc::new(MockTransport::new(user_service));
    let mut fuzzer = fuzzer(transport, quiet_config());
    let starters = fuzzer.graph().starter_nodes(&mut StdRng::seed_from_u64(1));

    fuzzer.perform_dfs(&starters, PASS_FILTERS[0]).await;
    let second = fuzzer.perform_dfs(&starters, PASS_FILTERS[1]).await;
    let names = executed_names(&fuzzer, &second.executed);
    assert!(names.contains(&"updateUser".to_string()));
    assert!(!names.contains(&"deleteUser".to_string()));

    let third = fuzzer.perform_dfs(&starters, PASS_FILTERS[2]).await;
    let names = executed_names(&fuzzer, &third.executed);
    assert!(names.contains(&"deleteUser".to_string()));
    assert!(names.contains(&"resetEverything".to_string()));
}

#[tokio::test]
async fn test_failing_nodes_requeue_at_most_three_times() {
    let transport = Arc::new(MockTransport::new(|_, _| json!({"errors": [{"message": "down for maintenance"}]})));
    let mut fuzzer = fuzzer(transport, quiet_config());
    let starters = fuzzer.graph().starter_nodes(&mut StdRng::seed_from_u64(1));

    let report = fuzzer.perform_dfs(&starters, PASS_FILTERS[2]).await;

    assert!(!report.budget_exhausted);
    assert!(report.succeeded.is_empty());
    assert!(report.requeues.values().all(|&count| count <= 3));

    let mut runs: HashMap<String, usize> = HashMap::new();
    for name in executed_names(&fuzzer, &report.executed) {
        *runs.entry(name).or_default() += 1;
    }
    assert_eq!(runs["createUser"], 4);
    assert_eq!(runs["searchUsers"], 4);
    assert!(!runs.contains_key("getUser"));
}

#[tokio::test]
async fn test_full_run_saves_results() {
    let transport = Arc::new(MockTransport::new(user_service));
    let mut fuzzer = fuzzer(transport, quiet_config());

    let status = fuzzer.run().await;
    assert_eq!(status, RunStatus::Completed);
    assert!(fuzzer.bucket().is_object_in_bucket("User"));
    assert!(fuzzer.stats().successful_nodes.contains_key("Mutation|createUser"));
    assert!(fuzzer.stats().end_time.is_some());

    let dir = tempfile::tempdir().unwrap();
    fuzzer.save(dir.path()).await.unwrap();
    let bucket = ObjectsBucket::load(&dir.path().join(OBJECTS_BUCKET_FILE)).await.unwrap();
    assert_eq!(bucket.instances("User").len(), 1);
    assert!(dir.path().join(STATS_FILE).exists());
}

#[tokio::test]
async fn test_islands_run_after_passes() {
    let transport = Arc::new(MockTransport::new(|_, _| json!({"errors": [{"message": "nope"}]})));
    let config = RunConfig {
        skip_nodes: vec!["createUser".into()],
        ..quiet_config()
    };
    let mut fuzzer = fuzzer(transport.clone(), config);
    fuzzer.run().await;

    let sent = transport.sent();
    assert!(sent.iter().any(|p| p.contains("getUser")));
    assert!(!sent.iter().any(|p| p.contains("createUser")));
}

#[tokio::test]
async fn test_timeout_keeps_partial_state() {
    let transport = Arc::new(MockTransport::new(user_service).with_delay(Duration::from_millis(200)));
    let config = RunConfig {
        max_time: Duration::from_millis(50),
        ..quiet_config()
    };
    let mut fuzzer = fuzzer(transport, config);

    assert_eq!(fuzzer.run().await, RunStatus::TimedOut);
    assert!(fuzzer.stats().end_time.is_some());
}

#[tokio::test]
async fn test_cancel_token_stops_run() {
    let transport = Arc::new(MockTransport::new(user_service).with_delay(Duration::from_millis(200)));
    let mut fuzzer = fuzzer(transport, quiet_config());
    fuzzer.cancel_token().cancel();

    assert_eq!(fuzzer.run().await, RunStatus::Cancelled);
}

#[tokio::test]
async fn test_run_single() {
    let transport = Arc::new(MockTransport::new(user_service));
    let mut fuzzer = fuzzer(transport, quiet_config());

    let result = fuzzer.run_single("createUser").await.unwrap();
    assert!(result.is_success());
    assert!(matches!(
        fuzzer.run_single("doesNotExist").await,
        Err(FuzzError::UnknownNode(_))
    ));
}

#[tokio::test]
async fn test_idor_flags_operations_returning_data() {
    let transport = Arc::new(MockTransport::new(|payload, index| {
        if payload.contains("getUser") {
            user_service(payload, index)
        } else {
            json!({"errors": [{"message": "forbidden"}]})
        }
    }));
    let mut bucket = ObjectsBucket::new();
    bucket.add_instance("User", json!({"id": "u-7"}).as_object().unwrap().clone());
    let mut fuzzer = fuzzer(transport.clone(), quiet_config()).with_bucket(bucket);

    let report = fuzzer.run_idor().await;
    assert_eq!(report.checked, 6);
    assert_eq!(report.possible_idor_nodes, vec!["getUser".to_string()]);
    assert!(transport.sent().iter().any(|p| p.contains("\"u-7\"")));
}

#[tokio::test]
async fn test_detectors_record_vulnerabilities() {
    let transport = Arc::new(MockTransport::new(|payload, index| {
        if payload.contains("__schema") {
            json!({"data": {"__schema": {"queryType": {"name": "Query"}}}})
        } else {
            user_service(payload, index)
        }
    }));
    let config = RunConfig {
        skip_injection_attacks: false,
        skip_misc_attacks: false,
        ..quiet_config()
    };
    let mut fuzzer = fuzzer(transport.clone(), config);
    fuzzer.run().await;

    let vulns = &fuzzer.stats().vulnerabilities;
    let introspection = &vulns["Introspection Enabled"];
    assert_eq!(introspection.len(), 1);
    assert!(introspection.values().all(|s| s.is_vulnerable));
    assert!(vulns["SQL Injection"]["searchUsers"].potentially_vulnerable);

    let introspections = transport.sent().iter().filter(|p| p.contains("__schema")).count();
    assert_eq!(introspections, 1);
}
