//! Integration tests for the sync bridge and the reference remote store.

use async_trait::async_trait;
use kvbridge_protocol::{
    ChangeTimestamp, ManualClock, PutOutcome, ResourceKind, ResourceValue, Snapshot,
};
use kvbridge_server::{ResourceStore, ServerConfig, SyncServer};
use kvbridge_storage::{InMemoryStore, KeyValueStore};
use kvbridge_sync::{
    BridgeConfig, HttpRemote, PullOutcome, PushOutcome, PushState, RemoteStore, SyncBridge,
    SyncError, SyncResult,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A remote that calls an in-process server directly.
struct InMemoryRemote {
    server: Arc<SyncServer>,
    puts: AtomicUsize,
}

impl InMemoryRemote {
    fn new(server: Arc<SyncServer>) -> Self {
        Self {
            server,
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemote {
    async fn get(&self, kind: ResourceKind) -> SyncResult<Snapshot> {
        Ok(self.server.handle_get(kind))
    }

    async fn put(
        &self,
        kind: ResourceKind,
        value: &ResourceValue,
        token: ChangeTimestamp,
    ) -> SyncResult<PutOutcome> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.server
            .handle_put(kind, &value.to_wire(), Some(token))
            .map_err(|e| SyncError::Rejected {
                status: e.status_code(),
                message: e.to_string(),
            })
    }
}

fn ts(millis: u64) -> ChangeTimestamp {
    ChangeTimestamp::from_millis(millis)
}

fn server_with_clock(enforce: bool, clock: Arc<ManualClock>) -> Arc<SyncServer> {
    Arc::new(SyncServer::with_clock(
        ServerConfig::default().with_enforce_tokens(enforce),
        Arc::new(ResourceStore::new()),
        clock,
    ))
}

struct Client {
    bridge: SyncBridge,
    raw: Arc<InMemoryStore>,
    remote: Arc<InMemoryRemote>,
    clock: Arc<ManualClock>,
}

fn client(server: &Arc<SyncServer>, clock_millis: u64) -> Client {
    let raw = Arc::new(InMemoryStore::new());
    let remote = Arc::new(InMemoryRemote::new(Arc::clone(server)));
    let clock = Arc::new(ManualClock::new(clock_millis));
    let bridge = SyncBridge::with_clock(
        BridgeConfig::default().with_label_field("label"),
        raw.clone(),
        remote.clone(),
        clock.clone(),
    )
    .unwrap();
    Client {
        bridge,
        raw,
        remote,
        clock,
    }
}

fn raw_json(store: &InMemoryStore, key: &str) -> Option<Value> {
    store
        .get(key)
        .unwrap()
        .map(|s| serde_json::from_str(&s).unwrap())
}

#[tokio::test(start_paused = true)]
async fn orders_write_sends_one_put_after_debounce() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    let c = client(&server, 1_000);

    c.bridge.store().set("shop_orders", r#"[{"id":1}]"#).unwrap();
    tokio::time::sleep(Duration::from_millis(299)).await;
    assert_eq!(c.remote.puts.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(c.remote.puts.load(Ordering::SeqCst), 1);
    assert_eq!(
        server.handle_get(ResourceKind::Orders).value.to_wire(),
        json!({"orders": [{"id": 1}]})
    );
    assert_eq!(server.store().write_count(ResourceKind::Orders), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_coalesce_into_last_value() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    let c = client(&server, 1_000);
    let store = c.bridge.store();

    for i in 0..10 {
        store.set("mock_bank", &format!(r#"[{{"n":{i}}}]"#)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(c.remote.puts.load(Ordering::SeqCst), 1);
    assert_eq!(
        server.handle_get(ResourceKind::Bank).value.to_wire(),
        json!({"log": [{"n": 9}]})
    );
}

#[tokio::test(start_paused = true)]
async fn stale_catalog_push_adopts_server_payload() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    let payload = ResourceValue::Catalog {
        products: vec![json!({"id": 9, "label": "hats"})],
        cats: vec![json!("hats")],
    };
    server.store().seed(payload.clone(), ts(100));

    let c = client(&server, 50);
    c.bridge
        .store()
        .set("shop_catalog", r#"[{"id":1,"label":"socks"}]"#)
        .unwrap();
    let outcome = c.bridge.flush(ResourceKind::Catalog).await.unwrap();

    assert_eq!(outcome, PushOutcome::Adopted { token: ts(100) });
    assert_eq!(c.bridge.read(ResourceKind::Catalog).unwrap(), payload);
    assert_eq!(c.bridge.local_token(ResourceKind::Catalog), ts(100));
    assert_eq!(raw_json(&c.raw, "products"), Some(json!([{"id": 9, "label": "hats"}])));
    assert_eq!(server.handle_get(ResourceKind::Catalog).value, payload);
}

/// Token enforcement is assumed uniform: orders, bank, and users reject stale
/// writes exactly like the catalog.
#[tokio::test(start_paused = true)]
async fn uniform_enforcement_stale_writer_adopts_on_every_resource() {
    let cases = [
        (ResourceKind::Orders, "shop_orders", json!([{"id": "a"}]), json!([{"id": "b"}])),
        (ResourceKind::Bank, "mock_bank", json!([{"amount": 1}]), json!([{"amount": 2}])),
        (
            ResourceKind::Users,
            "shop_users",
            json!([{"id": "1", "displayName": "Ann"}]),
            json!([{"id": "2", "displayName": "Bob"}]),
        ),
    ];

    for (kind, key, winner, loser) in cases {
        let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
        let a = client(&server, 200);
        let b = client(&server, 100);

        a.bridge.store().set(key, &winner.to_string()).unwrap();
        assert!(matches!(
            a.bridge.flush(kind).await,
            Some(PushOutcome::Accepted { .. })
        ));

        b.bridge.store().set(key, &loser.to_string()).unwrap();
        let outcome = b.bridge.flush(kind).await.unwrap();
        assert_eq!(outcome, PushOutcome::Adopted { token: ts(200) }, "{kind}");
        assert_eq!(raw_json(&b.raw, key), Some(winner.clone()), "{kind}");
        assert_eq!(b.bridge.local_token(kind), ts(200), "{kind}");
    }
}

#[tokio::test(start_paused = true)]
async fn advisory_server_accepts_stale_writes() {
    let server = server_with_clock(false, Arc::new(ManualClock::new(0)));
    let a = client(&server, 200);
    let b = client(&server, 100);

    a.bridge.store().set("shop_orders", r#"[{"id":"a"}]"#).unwrap();
    a.bridge.flush(ResourceKind::Orders).await.unwrap();
    b.bridge.store().set("shop_orders", r#"[{"id":"b"}]"#).unwrap();
    let outcome = b.bridge.flush(ResourceKind::Orders).await.unwrap();

    assert_eq!(outcome, PushOutcome::Accepted { token: ts(200) });
    assert_eq!(
        server.handle_get(ResourceKind::Orders).value.to_wire(),
        json!({"orders": [{"id": "b"}]})
    );
}

#[tokio::test(start_paused = true)]
async fn second_client_picks_up_changes_by_pull() {
    let server_clock = Arc::new(ManualClock::new(0));
    let server = server_with_clock(true, server_clock.clone());
    let a = client(&server, 1_000);
    let b = client(&server, 900);
    b.raw.set("shop_orders_bob", "[]").unwrap();

    a.bridge.store().set("shop_orders", r#"[{"id":1}]"#).unwrap();
    a.bridge.flush_all().await;

    assert_eq!(b.bridge.pull(ResourceKind::Orders).await, PullOutcome::Applied);
    for key in ["shop_orders", "my_orders", "shop_orders_bob"] {
        assert_eq!(raw_json(&b.raw, key), Some(json!([{"id": 1}])), "{key}");
    }
    assert_eq!(b.bridge.local_token(ResourceKind::Orders), ts(1_000));

    // b edits next; its token is at least the server's, so it wins
    b.clock.set(950);
    server_clock.set(2_000);
    b.bridge.store().set("shop_orders", r#"[{"id":2}]"#).unwrap();
    assert!(matches!(
        b.bridge.flush(ResourceKind::Orders).await,
        Some(PushOutcome::Accepted { .. })
    ));
    assert_eq!(a.bridge.pull(ResourceKind::Orders).await, PullOutcome::SkippedLocked);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(a.bridge.pull(ResourceKind::Orders).await, PullOutcome::Applied);
    assert_eq!(raw_json(&a.raw, "shop_orders"), Some(json!([{"id": 2}])));
    assert_eq!(a.bridge.local_token(ResourceKind::Orders), ts(2_000));
}

#[tokio::test(start_paused = true)]
async fn edit_lock_wins_over_pull() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    server
        .store()
        .seed(ResourceValue::Orders(vec![json!({"id": "remote"})]), ts(10));
    let c = client(&server, 1_000);

    c.bridge.store().set("shop_orders", r#"[{"id":"local"}]"#).unwrap();
    for _ in 0..3 {
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(c.bridge.pull(ResourceKind::Orders).await.is_skipped());
        assert_eq!(raw_json(&c.raw, "shop_orders"), Some(json!([{"id": "local"}])));
    }
}

#[tokio::test(start_paused = true)]
async fn catalog_labels_are_derived_on_push() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    let c = client(&server, 1);

    c.bridge
        .store()
        .set(
            "shop_catalog",
            r#"[{"id":1,"label":"a"},{"id":2,"label":"a"},{"id":3,"label":"b"}]"#,
        )
        .unwrap();
    c.bridge.flush(ResourceKind::Catalog).await.unwrap();

    let remote = server.handle_get(ResourceKind::Catalog).value.to_wire();
    assert_eq!(remote["cats"], json!(["a", "b"]));
    assert_eq!(raw_json(&c.raw, "shop_cats"), Some(json!(["a", "b"])));
}

#[tokio::test(start_paused = true)]
async fn alias_round_trip() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    let c = client(&server, 1);
    c.raw.set("shop_catalog_ann", "[]").unwrap();

    c.bridge.store().set("goods", r#"[{"id":"g"}]"#).unwrap();

    for key in ["shop_catalog", "products", "goods", "catalog", "shop_catalog_ann"] {
        assert_eq!(raw_json(&c.raw, key), Some(json!([{"id": "g"}])), "{key}");
    }
    // Aliases never originate a push
    assert_eq!(c.bridge.push_state(ResourceKind::Catalog), PushState::Idle);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(c.remote.puts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn pull_loop_keeps_clients_converged() {
    let server = server_with_clock(true, Arc::new(ManualClock::new(0)));
    let a = client(&server, 1_000);
    let b = client(&server, 1_000);
    let _a_loop = a.bridge.start();
    let _b_loop = b.bridge.start();

    a.bridge
        .store()
        .set("shop_users", r#"[{"id":"7","username":"Kim"}]"#)
        .unwrap();

    // Debounce, then at most one pull interval for b to catch up
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(
        raw_json(&b.raw, "shop_user_Kim"),
        Some(json!({"id": "7", "displayName": "Kim", "username": "Kim"}))
    );
    assert_eq!(raw_json(&b.raw, "shop_users_by_lower").unwrap()["kim"]["id"], "7");
    assert_eq!(a.bridge.stats().pushes_accepted, 1);
    assert!(b.bridge.stats().pulls_applied >= 1);
}

#[tokio::test]
async fn end_to_end_over_http() {
    let server = Arc::new(SyncServer::new(ServerConfig::default()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(kvbridge_server::serve(
        Arc::clone(&server),
        listener,
        std::future::pending(),
    ));

    let config = BridgeConfig::default()
        .with_debounce(Duration::from_millis(20))
        .with_label_field("label");
    let remote_a = HttpRemote::new(&base, config.request_timeout).unwrap();
    let remote_b = HttpRemote::new(&base, config.request_timeout).unwrap();
    let a = SyncBridge::new(config.clone(), Arc::new(InMemoryStore::new()), Arc::new(remote_a))
        .unwrap();
    let b_raw = Arc::new(InMemoryStore::new());
    let b = SyncBridge::new(config, b_raw.clone(), Arc::new(remote_b)).unwrap();

    a.store()
        .set("shop_catalog", r#"[{"id":1,"label":"x"}]"#)
        .unwrap();
    a.store().set("mock_bank", r#"[{"amount":3}]"#).unwrap();
    let outcomes = a.flush_all().await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes
        .iter()
        .all(|(_, o)| matches!(o, PushOutcome::Accepted { .. })));

    let pulled = b.pull_all().await;
    assert!(pulled.contains(&(ResourceKind::Catalog, PullOutcome::Applied)));
    assert!(pulled.contains(&(ResourceKind::Bank, PullOutcome::Applied)));
    assert_eq!(raw_json(&b_raw, "goods"), Some(json!([{"id": 1, "label": "x"}])));
    assert_eq!(raw_json(&b_raw, "shop_cats"), Some(json!(["x"])));
    assert_eq!(
        b.local_token(ResourceKind::Bank),
        server.token(ResourceKind::Bank)
    );
}
