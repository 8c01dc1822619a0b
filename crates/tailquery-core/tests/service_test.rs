#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

use tailquery_core::{
    CacheSettings, CoreError, Device, QueryContext, TableKind, TailnetService, Upstream, User,
    generate, table_plugins,
};

// ── Fake upstream ───────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Calls {
    devices: Arc<AtomicUsize>,
    users: Arc<AtomicUsize>,
}

impl Calls {
    fn devices(&self) -> usize {
        self.devices.load(Ordering::SeqCst)
    }

    fn users(&self) -> usize {
        self.users.load(Ordering::SeqCst)
    }
}

struct FakeTailnet {
    calls: Calls,
    devices: Vec<Device>,
    users: Vec<User>,
    failure: Option<CoreError>,
    latency: Duration,
    rotating: bool,
}

impl FakeTailnet {
    fn new(calls: &Calls) -> Self {
        Self {
            calls: calls.clone(),
            devices: vec![
                device("nA", "alpha", &["tag:prod", "tag:web"]),
                device("nB", "bravo", &["tag:prod"]),
                device("nC", "charlie", &[]),
            ],
            users: vec![user("u1", "ada@example.com")],
            failure: None,
            latency: Duration::from_millis(50),
            rotating: false,
        }
    }

    /// Every device fetch returns a different inventory.
    fn rotating(calls: &Calls) -> Self {
        Self {
            rotating: true,
            ..Self::new(calls)
        }
    }

    fn failing(calls: &Calls, error: CoreError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(calls)
        }
    }
}

impl Upstream for FakeTailnet {
    async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let generation = self.calls.devices.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        if self.rotating {
            let tag = format!("tag:gen{generation}");
            return Ok(vec![
                device(&format!("g{generation}a"), "alpha", &[tag.as_str(), "tag:shared"]),
                device(&format!("g{generation}b"), "bravo", &[tag.as_str()]),
            ]);
        }
        Ok(self.devices.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, CoreError> {
        self.calls.users.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(self.users.clone()),
        }
    }
}

fn device(id: &str, hostname: &str, tags: &[&str]) -> Device {
    Device {
        id: id.into(),
        name: format!("{hostname}.example.ts.net"),
        hostname: hostname.into(),
        authorized: true,
        ephemeral: false,
        external: false,
        user: "ada@example.com".into(),
        client_version: "1.76.1".into(),
        os: "linux".into(),
        distro: None,
        last_seen: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
    }
}

fn user(id: &str, login: &str) -> User {
    User {
        id: id.into(),
        display_name: "Ada".into(),
        login_name: login.into(),
        tailnet_id: "example.com".into(),
        user_type: "member".into(),
        role: "owner".into(),
        status: "active".into(),
        device_count: 3,
        connected: true,
        created: None,
        last_seen: None,
    }
}

fn sorted(mut rows: Vec<tailquery_core::Row>) -> Vec<tailquery_core::Row> {
    rows.sort();
    rows
}

fn column(rows: &[tailquery_core::Row], name: &str) -> BTreeSet<String> {
    rows.iter().map(|row| row[name].clone()).collect()
}

fn service(upstream: FakeTailnet) -> TailnetService<FakeTailnet> {
    TailnetService::with_upstream(upstream, CacheSettings::default())
}

async fn scan(
    svc: &TailnetService<FakeTailnet>,
    kind: TableKind,
) -> Result<Vec<tailquery_core::Row>, CoreError> {
    generate(svc, kind, &QueryContext::default()).await
}

// ── Coalescing ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn concurrent_scans_share_one_device_fetch() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    let (devices, tags, pairs, again) = tokio::join!(
        scan(&svc, TableKind::Devices),
        scan(&svc, TableKind::Tags),
        scan(&svc, TableKind::DeviceTags),
        scan(&svc, TableKind::Devices),
    );

    assert_eq!(devices.unwrap().len(), 3);
    assert_eq!(again.unwrap().len(), 3);
    assert_eq!(tags.unwrap().len(), 2);
    assert_eq!(pairs.unwrap().len(), 3);
    assert_eq!(calls.devices(), 1);
    assert_eq!(calls.users(), 0);
}

#[tokio::test(start_paused = true)]
async fn resources_are_cached_independently() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    assert_ok!(scan(&svc, TableKind::Users).await);
    assert_ok!(scan(&svc, TableKind::Devices).await);
    assert_ok!(scan(&svc, TableKind::Users).await);

    assert_eq!(calls.users(), 1);
    assert_eq!(calls.devices(), 1);
    assert_eq!(svc.cached_resources(), 2);
}

// ── Freshness ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn snapshot_is_reused_within_the_window_and_refetched_after() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    scan(&svc, TableKind::Devices).await.unwrap();
    tokio::time::advance(Duration::from_secs(89)).await;
    scan(&svc, TableKind::Tags).await.unwrap();
    assert_eq!(calls.devices(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    scan(&svc, TableKind::Devices).await.unwrap();
    assert_eq!(calls.devices(), 2);
}

#[tokio::test(start_paused = true)]
async fn oversized_window_caches_without_failing() {
    let calls = Calls::default();
    let settings = CacheSettings {
        ttl: Duration::MAX,
        ..CacheSettings::default()
    };
    let svc = TailnetService::with_upstream(FakeTailnet::new(&calls), settings);

    assert_ok!(scan(&svc, TableKind::Devices).await);
    tokio::time::advance(Duration::from_secs(86_400)).await;
    assert_ok!(scan(&svc, TableKind::Tags).await);
    assert_eq!(calls.devices(), 1);
}

// ── Errors ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn upstream_failure_fails_the_scan_and_is_replayed() {
    let calls = Calls::default();
    let boom = CoreError::Api {
        message: "service unavailable".into(),
        status: Some(503),
    };
    let svc = service(FakeTailnet::failing(&calls, boom.clone()));

    assert_eq!(scan(&svc, TableKind::Devices).await, Err(boom.clone()));
    assert_eq!(scan(&svc, TableKind::DeviceTags).await, Err(boom.clone()));
    assert_eq!(calls.devices(), 1);

    tokio::time::advance(Duration::from_secs(91)).await;
    assert_eq!(scan(&svc, TableKind::Tags).await, Err(boom));
    assert_eq!(calls.devices(), 2);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_surfaces_unchanged() {
    let calls = Calls::default();
    let denied = CoreError::AuthenticationFailed {
        message: "invalid key".into(),
    };
    let svc = service(FakeTailnet::failing(&calls, denied.clone()));

    assert_eq!(scan(&svc, TableKind::Users).await, Err(denied));
}

// ── Rows ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn tag_tables_derive_from_device_tags() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    let tags: BTreeSet<String> = scan(&svc, TableKind::Tags)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row["tag"].clone())
        .collect();
    assert_eq!(
        tags,
        BTreeSet::from(["tag:prod".to_owned(), "tag:web".to_owned()])
    );

    let pairs: BTreeSet<(String, String)> = scan(&svc, TableKind::DeviceTags)
        .await
        .unwrap()
        .into_iter()
        .map(|row| (row["id"].clone(), row["tag"].clone()))
        .collect();
    assert_eq!(
        pairs,
        BTreeSet::from([
            ("nA".to_owned(), "tag:prod".to_owned()),
            ("nA".to_owned(), "tag:web".to_owned()),
            ("nB".to_owned(), "tag:prod".to_owned()),
        ])
    );
}

#[tokio::test(start_paused = true)]
async fn rows_carry_every_declared_column() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    for plugin in table_plugins(&svc) {
        let declared: BTreeSet<&str> = plugin.columns().iter().map(|c| c.name).collect();
        for row in plugin.generate(&QueryContext::default()).await.unwrap() {
            let keys: BTreeSet<&str> = row.keys().map(String::as_str).collect();
            assert_eq!(keys, declared, "columns of {}", plugin.name());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn device_rows_render_scalars_as_text() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    let rows = scan(&svc, TableKind::Devices).await.unwrap();
    let alpha = rows.iter().find(|r| r["hostname"] == "alpha").unwrap();
    assert_eq!(alpha["authorized"], "true");
    assert_eq!(alpha["ephemeral"], "false");
    assert_eq!(alpha["last_seen"], "2024-05-01T12:00:00Z");
    assert_eq!(alpha["distro_name"], "");

    let users = scan(&svc, TableKind::Users).await.unwrap();
    assert_eq!(users[0]["device_count"], "3");
    assert_eq!(users[0]["created"], "0001-01-01T00:00:00Z");
}

#[tokio::test(start_paused = true)]
async fn constraints_are_ignored() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    let ctx: QueryContext = serde_json::from_str(
        r#"{"constraints": {"hostname": [{"op": 2, "expr": "alpha"}]}}"#,
    )
    .unwrap();
    let rows = generate(&svc, TableKind::Devices, &ctx).await.unwrap();
    assert_eq!(rows.len(), 3);
}

// ── Consistency ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn repeated_scans_return_identical_rows() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    for kind in [TableKind::Devices, TableKind::Users, TableKind::Tags] {
        let first = sorted(scan(&svc, kind).await.unwrap());
        let second = sorted(scan(&svc, kind).await.unwrap());
        assert_eq!(first, second, "{kind}");
    }

    // Pair order follows the snapshot, so it is compared as returned.
    let pairs = scan(&svc, TableKind::DeviceTags).await.unwrap();
    assert_eq!(scan(&svc, TableKind::DeviceTags).await.unwrap(), pairs);

    tokio::time::advance(Duration::from_secs(91)).await;
    assert_eq!(scan(&svc, TableKind::DeviceTags).await.unwrap(), pairs);
    assert_eq!(calls.devices(), 2);
}

#[tokio::test(start_paused = true)]
async fn tables_agree_within_one_window_of_a_changing_inventory() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::rotating(&calls));

    let mut generations = Vec::new();
    for _ in 0..2 {
        let devices = scan(&svc, TableKind::Devices).await.unwrap();
        let tags = scan(&svc, TableKind::Tags).await.unwrap();
        let pairs = scan(&svc, TableKind::DeviceTags).await.unwrap();

        let device_ids = column(&devices, "id");
        assert!(column(&pairs, "id").is_subset(&device_ids));
        assert_eq!(column(&tags, "tag"), column(&pairs, "tag"));
        generations.push(device_ids);

        tokio::time::advance(Duration::from_secs(91)).await;
    }

    assert_eq!(calls.devices(), 2);
    assert_eq!(
        generations[0],
        BTreeSet::from(["g0a".to_owned(), "g0b".to_owned()])
    );
    assert_eq!(
        generations[1],
        BTreeSet::from(["g1a".to_owned(), "g1b".to_owned()])
    );
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn plugins_cover_every_table() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    let names: BTreeSet<&str> = table_plugins(&svc).iter().map(|p| p.name()).collect();
    assert_eq!(
        names,
        BTreeSet::from([
            "tailscale_devices",
            "tailscale_users",
            "tailscale_tags",
            "tailscale_device_tags",
        ])
    );
    assert_eq!(calls.devices(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_and_shutdown_are_repeatable() {
    let calls = Calls::default();
    let svc = service(FakeTailnet::new(&calls));

    svc.start().await;
    svc.start().await;
    assert_ok!(scan(&svc, TableKind::Devices).await);
    svc.shutdown().await;
    svc.shutdown().await;

    // Reads keep working after housekeeping stops.
    assert_ok!(scan(&svc, TableKind::Devices).await);
    assert_eq!(calls.devices(), 1);
}
