mod common;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::sync::Arc;

use common::{quiet_config, user_schema, user_service, MockTransport, URL};
use gqlfuzz::bucket::ObjectsBucket;
use gqlfuzz::config::{MaterializerLimits, RunConfig};
use gqlfuzz::detectors::{SqlInjectionGetter, SQL_INJECTION_STRING};
use gqlfuzz::engine::{FEngine, ResultKind};
use gqlfuzz::materializer::{MaterializeOptions, Materializer};

fn engine(transport: Arc<MockTransport>, config: &RunConfig) -> FEngine {
    FEngine::new(Arc::new(user_schema()), transport, URL, config)
}

#[tokio::test]
async fn test_created_user_feeds_later_query() {
    let transport = Arc::new(MockTransport::new(user_service));
    let fengine = engine(transport.clone(), &quiet_config());
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(1);

    let created = fengine
        .run_minimal_payload(&schema.mutations["createUser"], &mut bucket, &mut rng, true)
        .await;
    assert_eq!(created.kind, ResultKind::GeneralSuccess);
    assert_eq!(bucket.instances("User").len(), 1);

    let fetched = fengine
        .run_minimal_payload(&schema.queries["getUser"], &mut bucket, &mut rng, true)
        .await;
    assert!(fetched.is_success());
    let sent = transport.sent();
    assert!(sent[1].contains("getUser(id: \"u-42\")"), "payload was {}", sent[1]);
}

#[tokio::test]
async fn test_strict_run_without_producer_fails_internally() {
    let transport = Arc::new(MockTransport::new(user_service));
    let fengine = engine(transport.clone(), &quiet_config());
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(1);

    let result = fengine
        .run_minimal_payload(&schema.queries["getUser"], &mut bucket, &mut rng, true)
        .await;
    assert_eq!(result.kind, ResultKind::InternalFailure);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_delete_keeps_bucket_when_deletion_disabled() {
    let transport = Arc::new(MockTransport::new(user_service));
    let fengine = engine(transport, &quiet_config());
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(2);

    fengine
        .run_minimal_payload(&schema.mutations["createUser"], &mut bucket, &mut rng, true)
        .await;
    let deleted = fengine
        .run_minimal_payload(&schema.mutations["deleteUser"], &mut bucket, &mut rng, true)
        .await;
    assert!(deleted.is_success());
    assert_eq!(bucket.instances("User").len(), 1);
}

#[tokio::test]
async fn test_delete_removes_used_instance_when_enabled() {
    let transport = Arc::new(MockTransport::new(user_service));
    let config = RunConfig {
        allow_deletion_of_objects: true,
        ..quiet_config()
    };
    let fengine = engine(transport, &config);
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(2);

    fengine
        .run_minimal_payload(&schema.mutations["createUser"], &mut bucket, &mut rng, true)
        .await;
    fengine
        .run_minimal_payload(&schema.mutations["deleteUser"], &mut bucket, &mut rng, true)
        .await;
    assert!(!bucket.is_object_in_bucket("User"));
}

#[tokio::test]
async fn test_delete_spares_instances_referencing_deleted_id() {
    let transport = Arc::new(MockTransport::new(user_service));
    let config = RunConfig {
        allow_deletion_of_objects: true,
        ..quiet_config()
    };
    let fengine = engine(transport.clone(), &config);
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    for user in [json!({"id": "u-1", "managerId": "u-2"}), json!({"id": "u-2", "managerId": "u-1"})] {
        bucket.add_instance("User", user.as_object().unwrap().clone());
    }
    let mut rng = StdRng::seed_from_u64(5);

    let deleted = fengine
        .run_minimal_payload(&schema.mutations["deleteUser"], &mut bucket, &mut rng, true)
        .await;
    assert!(deleted.is_success());

    let sent = transport.sent();
    let (gone, kept) = if sent[0].contains("deleteUser(id: \"u-1\")") {
        ("u-1", "u-2")
    } else {
        assert!(sent[0].contains("deleteUser(id: \"u-2\")"), "payload was {}", sent[0]);
        ("u-2", "u-1")
    };
    let remaining = bucket.instances("User");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["id"], json!(kept));
    assert_eq!(remaining[0]["managerId"], json!(gone));
}

#[tokio::test]
async fn test_retrier_drops_null_field_and_resends() {
    let transport = Arc::new(MockTransport::new(|payload, index| {
        if index == 0 {
            json!({"errors": [{
                "message": "Cannot return null for non-nullable field User.email.",
                "locations": [{"line": 5, "column": 5}]
            }]})
        } else {
            user_service(payload, index)
        }
    }));
    let fengine = engine(transport.clone(), &quiet_config());
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(3);

    let result = fengine
        .run_minimal_payload(&schema.mutations["createUser"], &mut bucket, &mut rng, true)
        .await;

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].lines().nth(4).map(str::trim), Some("email"));
    assert!(!sent[1].contains("email"));
    assert!(sent[1].contains("    name"));
    assert_eq!(result.payload, sent[1]);
    assert_eq!(result.kind, ResultKind::GeneralSuccess);
}

#[tokio::test]
async fn test_unrecoverable_error_is_external_failure() {
    let transport = Arc::new(MockTransport::new(|_, _| json!({"errors": [{"message": "Not authorized"}]})));
    let fengine = engine(transport.clone(), &quiet_config());
    let schema = user_schema();
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(3);

    let result = fengine
        .run_minimal_payload(&schema.mutations["createUser"], &mut bucket, &mut rng, true)
        .await;
    assert_eq!(result.kind, ResultKind::ExternalFailure);
    assert_eq!(transport.sent().len(), 1);
    assert!(bucket.is_empty());
}

#[tokio::test]
async fn test_no_data_policy_switch() {
    let empty = |_: &str, _: usize| json!({"data": {"searchUsers": null}});
    let schema = user_schema();
    let op = &schema.queries["searchUsers"];
    let mut bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(4);

    let strict = engine(Arc::new(MockTransport::new(empty)), &quiet_config());
    let result = strict.run_minimal_payload(op, &mut bucket, &mut rng, true).await;
    assert_eq!(result.kind, ResultKind::ExternalFailure);

    let lenient_config = RunConfig {
        no_data_count_as_success: true,
        ..quiet_config()
    };
    let lenient = engine(Arc::new(MockTransport::new(empty)), &lenient_config);
    let result = lenient.run_minimal_payload(op, &mut bucket, &mut rng, true).await;
    assert_eq!(result.kind, ResultKind::NoDataSuccess);
}

#[test]
fn test_injection_string_reaches_search_input() {
    let schema = user_schema();
    let bucket = ObjectsBucket::new();
    let limits = MaterializerLimits::default();

    for options in [
        MaterializeOptions::minimal(&limits, false),
        MaterializeOptions::maximal(&limits),
        MaterializeOptions::detection(&limits),
    ] {
        let payload = Materializer::new(&schema, &SqlInjectionGetter, options)
            .materialize(&schema.queries["searchUsers"], &bucket, &mut StdRng::seed_from_u64(5))
            .unwrap();
        assert!(
            payload.text.contains(&format!("search: \"{SQL_INJECTION_STRING}\"")),
            "payload was {}",
            payload.text
        );
    }
}

#[tokio::test]
async fn test_dos_payloads_leave_bucket_alone() {
    let transport = Arc::new(MockTransport::new(user_service));
    let config = RunConfig {
        max_fuzzing_iterations: 2,
        ..quiet_config()
    };
    let fengine = engine(transport.clone(), &config);
    let schema = user_schema();
    let bucket = ObjectsBucket::new();
    let mut rng = StdRng::seed_from_u64(6);

    let results = fengine
        .run_dos_payloads(&schema.mutations["createUser"], &bucket, &mut rng)
        .await;
    assert_eq!(results.len(), 3);
    assert!(bucket.is_empty());
    let batch = transport.sent().pop().unwrap();
    assert!(batch.contains("a0: createUser("));
    assert!(batch.contains("a9: createUser("));
}
