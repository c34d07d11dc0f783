//! End-to-end persistence tests.
//!
//! Profile → bytes → profile through the codec, the store and both
//! repositories, plus property tests for round-trips and singleton merges.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use traveler_graph::{
    Budget, Error, Interests, MemoryRepository, PreviousTrip, ProfileRepository, ProfileStore,
    RepositoryConfig, TravelPreferences, Value, codec, props,
};

fn sample_store() -> (ProfileStore, String) {
    let store = ProfileStore::default();
    let user = store.create_profile(Some("test_user_123")).unwrap();
    store.update_budget(&user, "$2000", "USD").unwrap();
    store.update_interests(&user, ["Culture", "Food"]).unwrap();
    store.update_visa(&user, "German", props([("Japan", "visa-free")])).unwrap();
    store
        .add_previous_trip(&user, "Paris", props([("trip_date", "2023-06-15"), ("duration", "5 days")]))
        .unwrap();
    store
        .add_travel_preferences(&user, props([("pace", Value::from("slow")), ("max_flights", Value::from(2))]))
        .unwrap();
    (store, user.into())
}

// ============================================================================
// 1. Store save / load
// ============================================================================

#[test]
fn test_save_load_into_fresh_store() {
    let (store, user) = sample_store();
    let original = store.profile(&user).unwrap();
    let bytes = store.save(&user).unwrap();

    let other = ProfileStore::default();
    let loaded = other.load(&bytes).unwrap();
    assert_eq!(loaded.as_str(), user);
    assert_eq!(other.profile(&user).unwrap(), original);
    assert_eq!(other.summarize(&user), store.summarize(&user));
    assert_eq!(other.recommend(&user, "Tokyo"), store.recommend(&user, "Tokyo"));
}

#[test]
fn test_load_replaces_existing_profile() {
    let (store, user) = sample_store();
    let bytes = store.save(&user).unwrap();

    store.update_budget(&user, "$9999", "USD").unwrap();
    store.append_node(&user, PreviousTrip::new("Lima")).unwrap();

    store.load(&bytes).unwrap();
    let summary = store.summarize(&user);
    assert_eq!(summary.profile_data.budget.as_deref(), Some("$2000"));
    assert_eq!(summary.node_count, 5);
}

#[test]
fn test_persisted_json_shape() {
    let (store, user) = sample_store();
    let json: serde_json::Value = serde_json::from_slice(&store.save(&user).unwrap()).unwrap();

    assert_eq!(json["user_id"], "test_user_123");
    let nodes = json["nodes"].as_object().unwrap();
    assert_eq!(nodes.len(), 5);
    for (id, node) in nodes {
        assert_eq!(node["id"], id.as_str());
        assert!(node["type"].is_string());
        assert!(node["data"].is_object());
        assert!(node["created_at"].is_string());
    }
    let edge = &json["edges"][0];
    assert_eq!(edge["relationship"], "influenced_by");
}

#[test]
fn test_malformed_input_rejected() {
    let store = ProfileStore::default();
    let cases: [&[u8]; 5] = [
        b"",
        b"not json",
        b"{\"nodes\": {}, \"edges\": []}",
        b"{\"user_id\": \"  \", \"nodes\": {}, \"edges\": []}",
        b"{\"user_id\": \"u\", \"created_at\": \"yesterday\"}",
    ];
    for bytes in cases {
        let err = store.load(bytes).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)), "{err}");
    }
    assert!(store.is_empty());
}

#[test]
fn test_unknown_node_fields_survive() {
    let (store, user) = sample_store();
    let mut json: serde_json::Value = serde_json::from_slice(&store.save(&user).unwrap()).unwrap();
    let budget_id = store
        .find_node_by_type(&user, traveler_graph::NodeType::Budget)
        .unwrap();
    json["nodes"][budget_id.as_str()]["data"]["flexible"] = serde_json::json!(true);

    let other = ProfileStore::default();
    other.load(&serde_json::to_vec(&json).unwrap()).unwrap();
    let node = other.node(&user, &budget_id).unwrap();
    assert_eq!(node.payload.as_budget().unwrap().extra["flexible"], Value::Bool(true));
}

#[test]
fn test_save_unknown_user() {
    let store = ProfileStore::default();
    assert!(matches!(store.save("ghost"), Err(Error::NotFound(_))));
}

// ============================================================================
// 2. Repositories
// ============================================================================

#[tokio::test]
async fn test_persist_restore_memory_repository() {
    let (store, user) = sample_store();
    let repo = MemoryRepository::new();
    store.persist(&repo, &user).await.unwrap();

    let other = ProfileStore::default();
    other.restore(&repo, &user).await.unwrap();
    assert_eq!(other.profile(&user).unwrap(), store.profile(&user).unwrap());

    assert!(matches!(other.restore(&repo, "ghost").await, Err(Error::NotFound(_))));
    assert!(matches!(store.persist(&repo, "ghost").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_persist_restore_file_repository() {
    let dir = tempfile::tempdir().unwrap();
    let config = RepositoryConfig::File { data_dir: dir.path().to_path_buf() };
    let repo = config.open().unwrap();

    let (store, user) = sample_store();
    store.persist(repo.as_ref(), &user).await.unwrap();
    assert!(dir.path().join("traveler_profile_test_user_123.json").is_file());
    assert!(repo.exists(&user).await.unwrap());

    let other = ProfileStore::default();
    other.restore(repo.as_ref(), &user).await.unwrap();
    assert_eq!(other.profile(&user).unwrap(), store.profile(&user).unwrap());

    assert!(repo.remove(&user).await.unwrap());
    assert!(repo.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_repository_rejects_unsafe_ids() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RepositoryConfig::File { data_dir: dir.path().to_path_buf() }.open().unwrap();

    let store = ProfileStore::default();
    store.create_profile(Some("../escape")).unwrap();
    let err = store.persist(repo.as_ref(), "../escape").await.unwrap_err();
    assert!(matches!(err, Error::InvalidUserId(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_persist_same_user() {
    let dir = tempfile::tempdir().unwrap();
    let repo = RepositoryConfig::File { data_dir: dir.path().to_path_buf() }.open().unwrap();
    let store = std::sync::Arc::new(ProfileStore::default());
    store.update_interests("racer", ["Food"]).unwrap();

    for round in 0..20 {
        store.append_node("racer", PreviousTrip::new(format!("stop-{round}"))).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                let repo = std::sync::Arc::clone(&repo);
                tokio::spawn(async move { store.persist(repo.as_ref(), "racer").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    let restored = ProfileStore::default();
    restored.restore(repo.as_ref(), "racer").await.unwrap();
    assert_eq!(restored.profile("racer").unwrap(), store.profile("racer").unwrap());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_repository_config_deserialize() {
    let config: RepositoryConfig = serde_json::from_str(r#"{"kind": "memory"}"#).unwrap();
    assert_eq!(config, RepositoryConfig::Memory);
    let config: RepositoryConfig =
        serde_json::from_str(r#"{"kind": "file", "data_dir": "/tmp/profiles"}"#).unwrap();
    assert_eq!(config, RepositoryConfig::File { data_dir: "/tmp/profiles".into() });
}

// ============================================================================
// 3. Properties
// ============================================================================

fn text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 $-]{1,12}"
}

#[derive(Debug, Clone)]
enum Op {
    Budget(Option<String>, Option<String>),
    Interests(Vec<String>),
    Visa(String),
    Trip(String, Option<String>),
    Prefs(String, i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (proptest::option::of(text()), proptest::option::of(text())).prop_map(|(r, c)| Op::Budget(r, c)),
        proptest::collection::vec(text(), 0..6).prop_map(Op::Interests),
        text().prop_map(Op::Visa),
        (text(), proptest::option::of(text())).prop_map(|(d, t)| Op::Trip(d, t)),
        (text(), any::<i64>()).prop_map(|(k, v)| Op::Prefs(k, v)),
    ]
}

fn apply(store: &ProfileStore, user: &str, op: Op) {
    match op {
        Op::Budget(budget_range, currency) => {
            let budget = Budget { budget_range, currency, ..Default::default() };
            store.upsert_singleton(user, budget).unwrap();
        }
        Op::Interests(list) => {
            store.update_interests(user, list).unwrap();
        }
        Op::Visa(nationality) => {
            store.update_visa(user, &nationality, props([("notes", "check embassy")])).unwrap();
        }
        Op::Trip(destination, date) => {
            let mut trip = PreviousTrip::new(destination);
            trip.trip_date = date;
            store.append_node(user, trip).unwrap();
        }
        Op::Prefs(key, value) => {
            store.append_node(user, TravelPreferences::new(props([(key, value)]))).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn prop_round_trip(ops in proptest::collection::vec(op(), 0..20)) {
        let store = ProfileStore::default();
        let user = store.create_profile(Some("prop_user")).unwrap();
        for op in ops {
            apply(&store, &user, op);
        }
        let profile = store.profile(&user).unwrap();
        let back = codec::from_bytes(&codec::to_bytes(&profile).unwrap()).unwrap();
        prop_assert_eq!(back, profile);
    }

    #[test]
    fn prop_singleton_merge_is_field_wise(
        first in (proptest::option::of(text()), proptest::option::of(text())),
        second in (proptest::option::of(text()), proptest::option::of(text())),
    ) {
        let store = ProfileStore::default();
        let user = store.create_profile(None).unwrap();
        let a = store
            .upsert_singleton(&user, Budget { budget_range: first.0.clone(), currency: first.1.clone(), ..Default::default() })
            .unwrap();
        let b = store
            .upsert_singleton(&user, Budget { budget_range: second.0.clone(), currency: second.1.clone(), ..Default::default() })
            .unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(store.summarize(&user).node_count, 1);

        let node = store.node(&user, &a).unwrap();
        let budget = node.payload.as_budget().unwrap();
        prop_assert_eq!(budget.budget_range.clone(), second.0.or(first.0));
        prop_assert_eq!(budget.currency.clone(), second.1.or(first.1));
    }

    #[test]
    fn prop_interests_kept_whole(list in proptest::collection::vec(text(), 0..8)) {
        let store = ProfileStore::default();
        let user = store.create_profile(None).unwrap();
        store.update_interests(&user, list.clone()).unwrap();

        let summary = store.summarize(&user);
        prop_assert_eq!(summary.profile_data.interests, Some(list.clone()));
        let recs = store.recommend(&user, "Anywhere");
        prop_assert_eq!(recs.interest_based_suggestions.len(), list.len().min(3));
    }
}

#[test]
fn test_interests_default_payload_keeps_existing() {
    let store = ProfileStore::default();
    let user = store.create_profile(None).unwrap();
    store.update_interests(&user, ["Food"]).unwrap();
    store.upsert_singleton(&user, Interests::default()).unwrap();
    assert_eq!(store.summarize(&user).profile_data.interests, Some(vec!["Food".to_owned()]));
}
