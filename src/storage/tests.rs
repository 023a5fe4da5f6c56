//! Storage Module Tests
//!
//! Validates the versioned entry model and the local store.
//!
//! ## Test Scopes
//! - **Vector clocks**: merge, increment and causal comparison.
//! - **Entries**: versioning, tombstones and the merge rule.
//! - **Kvs**: validation limits, reads of missing keys, digests and bundles.
//! - **Handlers**: the client routes called directly.

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::storage::entry::{Entry, KeyEntry, VectorClock};
    use crate::storage::handlers::*;
    use crate::storage::kvs::{KeyValueStore, Kvs};
    use crate::storage::protocol::*;
    use crate::storage::types::*;
    use axum::extract::{Extension, Path};
    use axum::http::StatusCode;
    use axum::{Form, Json};
    use std::cmp::Ordering;
    use std::sync::Arc;

    const REPLICA: &str = "10.0.0.2:8080";

    fn clock(pairs: &[(&str, u64)]) -> VectorClock {
        pairs.iter().map(|(r, c)| (r.to_string(), *c)).collect()
    }

    fn entry(value: &str, timestamp: u64, clock: VectorClock) -> Entry {
        Entry {
            value: value.to_string(),
            version: 1,
            timestamp,
            clock,
            tombstone: false,
        }
    }

    // ============================================================
    // VECTOR CLOCK TESTS
    // ============================================================

    #[test]
    fn test_vector_clock_increment_and_get() {
        let mut vc = VectorClock::new();
        assert_eq!(vc.get("a"), 0);
        assert_eq!(vc.increment("a"), 1);
        assert_eq!(vc.increment("a"), 2);
        assert_eq!(vc.get("a"), 2);
        assert_eq!(vc.len(), 1);
        assert_eq!(clock(&[("a", 3), ("b", 1)]).sum(), 4);
    }

    #[test]
    fn test_vector_clock_merge_takes_maximum() {
        let mut vc = clock(&[("a", 3), ("b", 1)]);
        vc.merge(&clock(&[("a", 1), ("b", 4), ("c", 2)]));

        assert_eq!(vc, clock(&[("a", 3), ("b", 4), ("c", 2)]));
    }

    #[test]
    fn test_vector_clock_ordering() {
        let base = clock(&[("a", 1)]);
        let later = clock(&[("a", 2)]);
        let other = clock(&[("b", 1)]);

        assert_eq!(base.partial_cmp(&later), Some(Ordering::Less));
        assert_eq!(later.partial_cmp(&base), Some(Ordering::Greater));
        assert_eq!(base.partial_cmp(&other), None, "Disjoint writers are concurrent");
        assert_eq!(
            base.partial_cmp(&clock(&[("a", 1), ("b", 0)])),
            Some(Ordering::Equal),
            "Missing replicas count as zero"
        );
        assert_eq!(
            VectorClock::new().partial_cmp(&base),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_vector_clock_serializes_as_map() {
        let vc = clock(&[("a", 1)]);
        assert_eq!(serde_json::to_string(&vc).unwrap(), r#"{"a":1}"#);
        assert_eq!(parse_payload(Some(r#"{"a":1}"#)), vc);
        assert!(parse_payload(Some("not json")).is_empty());
        assert!(parse_payload(None).is_empty());
    }

    // ============================================================
    // ENTRY TESTS
    // ============================================================

    #[test]
    fn test_absent_entry_defaults() {
        let absent = KeyEntry::Absent;

        assert_eq!(absent.version(), 0);
        assert_eq!(absent.timestamp(), 0);
        assert!(absent.clock().is_empty());
        assert_eq!(absent.value(), "");
        assert!(!absent.alive());
    }

    #[test]
    fn test_entry_update_and_delete_advance_version() {
        let mut e = Entry::new("r1", 10, &VectorClock::new(), "v1".into());
        assert_eq!(e.version, 1);
        assert_eq!(e.clock, clock(&[("r1", 1)]));

        e.update("r2", 20, &clock(&[("r3", 5)]), "v2".into());
        assert_eq!(e.version, 2);
        assert_eq!(e.timestamp, 20);
        assert_eq!(e.clock, clock(&[("r1", 1), ("r2", 1), ("r3", 5)]));

        e.delete("r1", 30, &VectorClock::new());
        assert_eq!(e.version, 3);
        assert!(e.tombstone);
        assert!(e.value.is_empty());
        assert_eq!(e.clock.get("r1"), 2);

        let present = KeyEntry::Present(&e);
        assert!(!present.alive());
        assert_eq!(present.value(), "", "Tombstones read as empty");
        assert_eq!(present.version(), 3);
    }

    #[test]
    fn test_yields_to_tiebreak_order() {
        let shared = clock(&[("a", 1)]);
        let local = entry("m", 100, shared.clone());
        let local = KeyEntry::Present(&local);

        assert!(local.yields_to(&entry("m", 101, shared.clone())), "Later timestamp");
        assert!(
            local.yields_to(&Entry {
                version: 2,
                ..entry("m", 100, shared.clone())
            }),
            "Higher version"
        );
        assert!(
            local.yields_to(&Entry {
                tombstone: true,
                value: String::new(),
                ..entry("m", 100, shared.clone())
            }),
            "Tombstone beats live on a tie"
        );
        assert!(local.yields_to(&entry("n", 100, shared.clone())), "Larger value");
        assert!(!local.yields_to(&entry("l", 100, shared.clone())));
        assert!(!local.yields_to(&entry("m", 100, shared)), "Full tie keeps local");
    }

    #[test]
    fn test_yields_to_is_antisymmetric_for_concurrent_writes() {
        let a = entry("from-a", 100, clock(&[("a", 1)]));
        let b = entry("from-b", 100, clock(&[("b", 1)]));

        let a_takes_b = KeyEntry::Present(&a).yields_to(&b);
        let b_takes_a = KeyEntry::Present(&b).yields_to(&a);

        assert_ne!(a_takes_b, b_takes_a, "Exactly one side must win");
    }

    // ============================================================
    // KVS TESTS
    // ============================================================

    #[tokio::test]
    async fn test_put_creates_then_updates() {
        let kvs = Kvs::new(REPLICA);

        let first = kvs.put("k", "v1".into(), 10, &VectorClock::new()).await;
        let second = kvs.put("k", "v2".into(), 20, &VectorClock::new()).await;

        assert_eq!(first, Ok(PutOutcome::Created));
        assert_eq!(second, Ok(PutOutcome::Updated));
        assert_eq!(kvs.get("k").await, "v2");
        assert_eq!(kvs.contains("k").await, (true, 2));
        assert_eq!(kvs.get_timestamp("k").await, 20);
        assert_eq!(kvs.get_clock("k").await, clock(&[(REPLICA, 2)]));
        assert_eq!(kvs.replica_id(), REPLICA);
    }

    #[tokio::test]
    async fn test_put_rejects_long_key() {
        let kvs = Kvs::new(REPLICA);
        let key = "k".repeat(MAX_KEY_LEN + 1);

        let result = kvs.put(&key, "v".into(), 1, &VectorClock::new()).await;

        assert_eq!(
            result,
            Err(StoreError::KeyTooLong {
                len: 201,
                max: MAX_KEY_LEN
            })
        );
        assert!(kvs.is_empty().await, "Rejected writes never touch the store");

        let key = "k".repeat(MAX_KEY_LEN);
        assert!(kvs.put(&key, "v".into(), 1, &VectorClock::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_put_rejects_large_value() {
        let kvs = Kvs::new(REPLICA);
        let value = "x".repeat(MAX_VALUE_LEN + 1);

        let result = kvs.put("k", value, 1, &VectorClock::new()).await;

        assert!(matches!(result, Err(StoreError::ValueTooLarge { len: 1048577, .. })));
        assert_eq!(kvs.contains("k").await, (false, 0));

        let value = "x".repeat(MAX_VALUE_LEN);
        assert!(kvs.put("k", value, 1, &VectorClock::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_reads() {
        let kvs = Kvs::new(REPLICA);

        assert_eq!(kvs.contains("nope").await, (false, 0));
        assert_eq!(kvs.get("nope").await, "");
        assert_eq!(kvs.get_timestamp("nope").await, 0);
        assert!(kvs.get_clock("nope").await.is_empty());
        assert!(!kvs.delete("nope", 1, &VectorClock::new()).await);
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let kvs = Kvs::new(REPLICA);
        kvs.put("k", "v".into(), 10, &VectorClock::new()).await.unwrap();

        assert!(kvs.delete("k", 20, &VectorClock::new()).await);
        assert!(
            !kvs.delete("k", 30, &VectorClock::new()).await,
            "Deleting a tombstone is a miss"
        );

        assert_eq!(kvs.contains("k").await, (false, 2));
        assert_eq!(kvs.get("k").await, "");
        assert_eq!(kvs.len().await, 1, "The tombstone stays stored");
        assert_eq!(kvs.get_time_glob().await.list.get("k"), Some(&20));
    }

    #[tokio::test]
    async fn test_put_after_delete_recreates_key() {
        let kvs = Kvs::new(REPLICA);
        kvs.put("k", "v1".into(), 10, &VectorClock::new()).await.unwrap();
        kvs.delete("k", 20, &VectorClock::new()).await;

        let outcome = kvs.put("k", "v2".into(), 30, &VectorClock::new()).await;

        assert_eq!(outcome, Ok(PutOutcome::Created));
        assert_eq!(kvs.contains("k").await, (true, 3));
        assert_eq!(kvs.get("k").await, "v2");
    }

    #[tokio::test]
    async fn test_put_absorbs_client_context() {
        let kvs = Kvs::new(REPLICA);
        let seen = clock(&[("10.0.0.3:8080", 4)]);

        kvs.put("k", "v".into(), 10, &seen).await.unwrap();

        let vc = kvs.get_clock("k").await;
        assert_eq!(vc.get("10.0.0.3:8080"), 4);
        assert_eq!(vc.get(REPLICA), 1);
        assert_eq!(vc.partial_cmp(&seen), Some(Ordering::Greater));
    }

    #[tokio::test]
    async fn test_put_put_delete_then_stale_merge() {
        let kvs = Kvs::new(REPLICA);
        let none = VectorClock::new();

        assert_eq!(kvs.put("a", "1".into(), 1, &none).await, Ok(PutOutcome::Created));
        assert_eq!(kvs.contains("a").await, (true, 1));
        kvs.put("a", "2".into(), 2, &none).await.unwrap();
        assert_eq!(kvs.contains("a").await, (true, 2));
        let version_two = kvs.entry("a").await.unwrap();

        assert!(kvs.delete("a", 3, &none).await);
        assert_eq!(kvs.contains("a").await, (false, 3));
        assert_eq!(kvs.get("a").await, "");

        assert!(!kvs.merge_entry("a", version_two).await);
        assert_eq!(kvs.contains("a").await, (false, 3), "Version 3 tombstone must hold");
    }

    #[tokio::test]
    async fn test_merge_keeps_tombstone_over_stale_value() {
        let kvs = Kvs::new(REPLICA);
        kvs.put("k", "v".into(), 10, &VectorClock::new()).await.unwrap();
        let stale = kvs.entry("k").await.unwrap();
        kvs.delete("k", 20, &VectorClock::new()).await;

        assert!(!kvs.merge_entry("k", stale.clone()).await);
        assert!(!kvs.would_yield("k", &stale).await);
        assert_eq!(kvs.contains("k").await, (false, 2));
    }

    #[tokio::test]
    async fn test_merge_installs_incoming_as_shipped() {
        let kvs = Kvs::new(REPLICA);
        kvs.put("k", "local".into(), 10, &VectorClock::new()).await.unwrap();

        let remote = entry("remote", 50, clock(&[("10.0.0.3:8080", 1)]));
        assert!(kvs.merge_entry("k", remote.clone()).await);

        assert_eq!(kvs.entry("k").await, Some(remote));

        // The next local write builds on the winner and outranks everything
        // this replica has seen, including the entry it replaced.
        kvs.put("k", "again".into(), 60, &VectorClock::new()).await.unwrap();
        let vc = kvs.get_clock("k").await;
        assert_eq!(vc, clock(&[(REPLICA, 1), ("10.0.0.3:8080", 1)]));
        assert!(!kvs.would_yield("k", &entry("local", 10, clock(&[(REPLICA, 1)]))).await);
    }

    async fn merge_all(entries: &[Entry]) -> Option<Entry> {
        let kvs = Kvs::new("merger");
        for e in entries {
            kvs.merge_entry("k", e.clone()).await;
        }
        kvs.entry("k").await
    }

    #[tokio::test]
    async fn test_merge_is_order_independent() {
        let a = entry("a", 100, clock(&[("r1", 1)]));
        let b = entry("b", 200, clock(&[("r2", 1)]));
        let c = entry("c", 150, clock(&[("r1", 1), ("r2", 1), ("r3", 1)]));

        let forward = merge_all(&[a.clone(), b.clone(), c.clone()]).await;
        let backward = merge_all(&[c, b, a]).await;

        assert_eq!(forward, backward);
        assert_eq!(forward.unwrap().value, "c");
    }

    #[tokio::test]
    async fn test_merge_order_independent_when_causal_and_tuple_disagree() {
        // Y is causally after X but older by the clock; Z is concurrent with
        // both and sits between them by timestamp.
        let x = entry("x", 300, clock(&[("r1", 1)]));
        let y = entry("y", 100, clock(&[("r1", 1), ("r2", 1)]));
        let z = entry("z", 200, clock(&[("r3", 1)]));

        let orders = [
            [x.clone(), y.clone(), z.clone()],
            [x.clone(), z.clone(), y.clone()],
            [y.clone(), x.clone(), z.clone()],
            [y.clone(), z.clone(), x.clone()],
            [z.clone(), x.clone(), y.clone()],
            [z.clone(), y.clone(), x.clone()],
        ];
        for order in orders.iter() {
            let merged = merge_all(order).await.unwrap();
            assert_eq!(merged, y, "Every arrival order must keep the same winner");
        }
    }

    #[test]
    fn test_rank_extends_causal_order() {
        let older = entry("v", 900, clock(&[("r1", 2), ("r2", 1)]));
        let newer = entry("v", 1, clock(&[("r1", 2), ("r2", 2)]));

        assert_eq!(newer.clock.partial_cmp(&older.clock), Some(Ordering::Greater));
        assert!(newer.rank() > older.rank());
        assert!(KeyEntry::Present(&older).yields_to(&newer));
        assert!(!KeyEntry::Present(&newer).yields_to(&older));
    }

    #[tokio::test]
    async fn test_overwrite_entry_is_unconditional() {
        let kvs = Kvs::new(REPLICA);
        kvs.put("k", "newer".into(), 100, &VectorClock::new()).await.unwrap();

        kvs.overwrite_entry("k", entry("older", 1, VectorClock::new())).await;

        assert_eq!(kvs.get("k").await, "older");
    }

    #[tokio::test]
    async fn test_time_and_entry_globs() {
        let kvs = Kvs::new(REPLICA);
        kvs.put("a", "1".into(), 10, &VectorClock::new()).await.unwrap();
        kvs.put("b", "2".into(), 20, &VectorClock::new()).await.unwrap();
        kvs.delete("b", 30, &VectorClock::new()).await;

        let digest = kvs.get_time_glob().await;
        assert_eq!(digest.len(), 2, "Tombstones appear in the digest");
        assert_eq!(digest.list["b"], 30);

        let wanted: TimeGlob = [("a".to_string(), 0), ("zzz".to_string(), 0)]
            .into_iter()
            .collect();
        let bundle = kvs.get_entry_glob(&wanted).await;
        assert_eq!(bundle.len(), 1);
        assert!(bundle.keys.contains_key("a"));
    }

    // ============================================================
    // HANDLER TESTS
    // ============================================================

    fn store() -> SharedStore {
        Arc::new(Kvs::new(REPLICA))
    }

    fn put_form(val: &str) -> Form<PutForm> {
        Form(PutForm {
            val: val.to_string(),
            payload: None,
        })
    }

    #[tokio::test]
    async fn test_handle_put_status_codes() {
        let store = store();

        let (status, Json(body)) =
            handle_put(Extension(store.clone()), Path("k".into()), put_form("v1")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.replaced.as_deref(), Some("False"));
        assert_eq!(body.msg.as_deref(), Some(MSG_ADDED));
        assert_eq!(body.payload.as_deref(), Some(r#"{"10.0.0.2:8080":1}"#));

        let (status, Json(body)) =
            handle_put(Extension(store.clone()), Path("k".into()), put_form("v2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.replaced.as_deref(), Some("True"));

        let (status, Json(body)) = handle_put(
            Extension(store),
            Path("k".repeat(201)),
            put_form("v"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.msg.as_deref(), Some(MSG_KEY_INVALID));
    }

    #[tokio::test]
    async fn test_handle_get_and_delete() {
        let store = store();
        store.put("k", "v".into(), now_ms(), &VectorClock::new()).await.unwrap();

        let (status, Json(body)) = handle_get(Extension(store.clone()), Path("k".into())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.value.as_deref(), Some("v"));
        assert_eq!(body.result.as_deref(), Some("Success"));

        let (status, _) = handle_delete(Extension(store.clone()), Path("k".into()), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, Json(body)) = handle_get(Extension(store.clone()), Path("k".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.msg.as_deref(), Some(MSG_KEY_MISSING));

        let (status, _) = handle_delete(Extension(store), Path("k".into()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handle_search() {
        let store = store();
        store.put("k", "v".into(), now_ms(), &VectorClock::new()).await.unwrap();

        let (_, Json(body)) = handle_search(Extension(store.clone()), Path("k".into())).await;
        assert_eq!(body.is_exists.as_deref(), Some("true"));

        let (_, Json(body)) = handle_search(Extension(store), Path("other".into())).await;
        assert_eq!(body.is_exists.as_deref(), Some("false"));
        assert_eq!(body.version, Some(0));
    }

    #[test]
    fn test_kv_response_omits_empty_fields() {
        let json = serde_json::to_string(&KvResponse::error(MSG_KEY_MISSING)).unwrap();
        assert_eq!(json, r#"{"result":"Error","msg":"Key does not exist"}"#);
    }
}
