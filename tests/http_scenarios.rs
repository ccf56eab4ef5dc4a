//! End-to-end HTTP scenarios against a fully wired process, no mocked
//! stores or queue: real `LsmStore`s in a temp directory, the real ingest
//! queue and worker pool, served over a bound TCP listener.

use std::time::Duration;

use progressdb_config::Config;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

struct TestApp {
    base_url: String,
    client: reqwest::Client,
    assembled: Option<progressdb::wiring::Assembled>,
    server: JoinHandle<()>,
    _data_dir: TempDir,
}

impl TestApp {
    async fn spawn() -> Self {
        let data_dir = TempDir::new().expect("tempdir");
        let mut config = Config::defaults();
        config.store_dir = data_dir.path().join("storedb");
        config.index_dir = data_dir.path().join("indexdb");
        config.worker_count = 2;
        config.resolve_timeout_ms = 5_000;

        let assembled = progressdb::wiring::assemble(&config).await.expect("assemble");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let router = assembled.router.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        TestApp {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            assembled: Some(assembled),
            server,
            _data_dir: data_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn shutdown(mut self) {
        self.server.abort();
        if let Some(assembled) = self.assembled.take() {
            progressdb::wiring::shutdown(assembled, Duration::from_secs(5)).await.ok();
        }
    }
}

fn headers(user: &str, role: &str) -> reqwest::header::HeaderMap {
    let mut h = reqwest::header::HeaderMap::new();
    h.insert("x-user-id", user.parse().unwrap());
    h.insert("x-role", role.parse().unwrap());
    h
}

/// Create a thread, then read it back through the provisional key the
/// `202` handed back. `resolve_or_wait` blocks the `GET` until the worker
/// pool has applied the create, so no manual retry loop is needed.
#[tokio::test]
async fn create_and_read_thread_resolves_provisional_key() {
    let app = TestApp::spawn().await;

    let create: Value = app
        .client
        .post(app.url("/v1/threads"))
        .headers(headers("alice", "user"))
        .json(&json!({"title": "Trip planning"}))
        .send()
        .await
        .expect("create request")
        .json()
        .await
        .expect("create body");
    let provisional_key = create["key"].as_str().expect("key field").to_string();
    assert!(provisional_key.contains("prov"), "expected a provisional key, got {provisional_key}");

    let get = app.client.get(app.url(&format!("/v1/threads/{provisional_key}"))).headers(headers("alice", "user")).send().await.expect("get request");
    assert_eq!(get.status(), reqwest::StatusCode::OK);
    let body: Value = get.json().await.expect("get body");
    assert_eq!(body["thread"]["title"], "Trip planning");

    app.shutdown().await;
}

/// A message appended to a thread round-trips through create, list, and
/// get, and a soft-deleted message disappears from both the list and the
/// direct get unless the caller is privileged and asks for it.
#[tokio::test]
async fn message_create_list_and_soft_delete() {
    let app = TestApp::spawn().await;
    let auth = headers("bob", "user");

    let thread_key: Value = app
        .client
        .post(app.url("/v1/threads"))
        .headers(auth.clone())
        .json(&json!({"title": "Support case"}))
        .send()
        .await
        .expect("create thread")
        .json()
        .await
        .expect("thread body");
    let thread_key = thread_key["key"].as_str().unwrap().to_string();

    let mut message_keys = Vec::new();
    for i in 0..5 {
        let resp: Value = app
            .client
            .post(app.url(&format!("/v1/threads/{thread_key}/messages")))
            .headers(auth.clone())
            .json(&json!({"body": {"text": format!("message {i}")}}))
            .send()
            .await
            .expect("create message")
            .json()
            .await
            .expect("message body");
        message_keys.push(resp["key"].as_str().unwrap().to_string());
    }

    let list: Value = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages")))
        .headers(auth.clone())
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert_eq!(list["messages"].as_array().unwrap().len(), 5);

    let deleted_key = &message_keys[2];
    let del_status = app
        .client
        .delete(app.url(&format!("/v1/threads/{thread_key}/messages/{deleted_key}")))
        .headers(auth.clone())
        .send()
        .await
        .expect("delete request")
        .status();
    assert_eq!(del_status, reqwest::StatusCode::ACCEPTED);

    // Give the worker pool a moment to apply the delete op.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let get_deleted = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages/{deleted_key}")))
        .headers(auth.clone())
        .send()
        .await
        .expect("get deleted request");
    assert_eq!(get_deleted.status(), reqwest::StatusCode::NOT_FOUND);

    let list_after: Value = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages")))
        .headers(auth.clone())
        .send()
        .await
        .expect("list after delete")
        .json()
        .await
        .expect("list after delete body");
    assert_eq!(list_after["messages"].as_array().unwrap().len(), 4);

    let list_admin: Value = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages?include_deleted=true")))
        .headers(headers("bob", "admin"))
        .send()
        .await
        .expect("privileged list")
        .json()
        .await
        .expect("privileged list body");
    assert_eq!(list_admin["messages"].as_array().unwrap().len(), 5);

    app.shutdown().await;
}

/// A message's version history is ordered, carries the delete as its own
/// version, and is only visible to a privileged caller.
#[tokio::test]
async fn message_version_history_is_sequence_ordered_and_privileged() {
    let app = TestApp::spawn().await;
    let auth = headers("erin", "user");

    let thread_key: Value = app
        .client
        .post(app.url("/v1/threads"))
        .headers(auth.clone())
        .json(&json!({"title": "Revisions"}))
        .send()
        .await
        .expect("create thread")
        .json()
        .await
        .expect("thread body");
    let thread_key = thread_key["key"].as_str().unwrap().to_string();

    let create: Value = app
        .client
        .post(app.url(&format!("/v1/threads/{thread_key}/messages")))
        .headers(auth.clone())
        .json(&json!({"body": {"text": "v1"}}))
        .send()
        .await
        .expect("create message")
        .json()
        .await
        .expect("message body");
    let message_key = create["key"].as_str().unwrap().to_string();

    app.client
        .put(app.url(&format!("/v1/threads/{thread_key}/messages/{message_key}")))
        .headers(auth.clone())
        .json(&json!({"body": {"text": "v2"}}))
        .send()
        .await
        .expect("update message");

    app.client
        .delete(app.url(&format!("/v1/threads/{thread_key}/messages/{message_key}")))
        .headers(auth.clone())
        .send()
        .await
        .expect("delete message");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let forbidden = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages/{message_key}/versions")))
        .headers(auth.clone())
        .send()
        .await
        .expect("unprivileged versions request");
    assert_eq!(forbidden.status(), reqwest::StatusCode::FORBIDDEN);

    let versions: Value = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages/{message_key}/versions")))
        .headers(headers("erin", "admin"))
        .send()
        .await
        .expect("privileged versions request")
        .json()
        .await
        .expect("versions body");
    let versions = versions["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 3, "create + update + delete");
    assert_eq!(versions[0]["seq"], 1);
    assert_eq!(versions[1]["seq"], 2);
    assert_eq!(versions[2]["seq"], 3);
    assert_eq!(versions[0]["message"]["body"]["text"], "v1");
    assert_eq!(versions[1]["message"]["body"]["text"], "v2");
    assert_eq!(versions[2]["message"]["deleted"], true, "last version is the delete");

    app.shutdown().await;
}

/// Cursor pagination walks every message exactly once across a thread
/// with more messages than fit on a single page.
#[tokio::test]
async fn cursor_pagination_covers_every_message_once() {
    let app = TestApp::spawn().await;
    let auth = headers("carol", "user");

    let thread_key: Value = app
        .client
        .post(app.url("/v1/threads"))
        .headers(auth.clone())
        .json(&json!({"title": "Long conversation"}))
        .send()
        .await
        .expect("create thread")
        .json()
        .await
        .expect("thread body");
    let thread_key = thread_key["key"].as_str().unwrap().to_string();

    const TOTAL: usize = 47;
    for i in 0..TOTAL {
        app.client
            .post(app.url(&format!("/v1/threads/{thread_key}/messages")))
            .headers(auth.clone())
            .json(&json!({"body": {"text": format!("msg {i}")}}))
            .send()
            .await
            .expect("create message");
    }

    let mut seen = std::collections::HashSet::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut url = format!("/v1/threads/{thread_key}/messages?limit=10&order_by=asc");
        if let Some(c) = &cursor {
            url.push_str(&format!("&after={c}"));
        }
        let page: Value = app.client.get(app.url(&url)).headers(auth.clone()).send().await.expect("page request").json().await.expect("page body");
        let messages = page["messages"].as_array().unwrap();
        if messages.is_empty() {
            break;
        }
        for m in messages {
            let key = m["key"].as_str().unwrap_or_default().to_string();
            let id = if key.is_empty() { m["id"].as_str().unwrap_or_default().to_string() } else { key };
            assert!(seen.insert(id), "message returned twice across pages");
        }
        match page["pagination"]["next"].as_str() {
            Some(next) if page["pagination"]["has_after"].as_bool().unwrap_or(false) => cursor = Some(next.to_string()),
            _ => break,
        }
    }
    assert_eq!(seen.len(), TOTAL, "expected every message visited exactly once");

    app.shutdown().await;
}

/// Concurrent writers appending to the same thread never clobber each
/// other: every version makes it to storage.
#[tokio::test]
async fn concurrent_message_writes_all_land() {
    let app = TestApp::spawn().await;
    let auth = headers("dave", "user");

    let thread_key: Value = app
        .client
        .post(app.url("/v1/threads"))
        .headers(auth.clone())
        .json(&json!({"title": "Race"}))
        .send()
        .await
        .expect("create thread")
        .json()
        .await
        .expect("thread body");
    let thread_key = thread_key["key"].as_str().unwrap().to_string();

    let mut handles = Vec::new();
    for i in 0..20 {
        let client = app.client.clone();
        let url = app.url(&format!("/v1/threads/{thread_key}/messages"));
        let auth = auth.clone();
        handles.push(tokio::spawn(async move {
            client.post(url).headers(auth).json(&json!({"body": {"text": format!("concurrent {i}")}})).send().await.expect("concurrent create")
        }));
    }
    for h in handles {
        let resp = h.await.expect("join");
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    let list: Value = app
        .client
        .get(app.url(&format!("/v1/threads/{thread_key}/messages?limit=100")))
        .headers(auth)
        .send()
        .await
        .expect("list request")
        .json()
        .await
        .expect("list body");
    assert_eq!(list["messages"].as_array().unwrap().len(), 20);

    app.shutdown().await;
}

/// Healthz and readyz both report ready with encryption disabled (the
/// default), since there is no KMS dependency to wait on in that mode.
#[tokio::test]
async fn health_and_ready_endpoints() {
    let app = TestApp::spawn().await;

    let healthz = app.client.get(app.url("/healthz")).send().await.expect("healthz");
    assert_eq!(healthz.status(), reqwest::StatusCode::OK);

    let readyz = app.client.get(app.url("/readyz")).send().await.expect("readyz");
    assert_eq!(readyz.status(), reqwest::StatusCode::OK);

    app.shutdown().await;
}
