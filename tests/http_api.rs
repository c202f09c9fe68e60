//! HTTP contract tests.
//!
//! Each test binds a real server to an ephemeral port and talks to it with `reqwest`.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use story_ingest::importer::{parse_csv, submit};
use story_ingest::server::serve;
use story_ingest::storage::memory::MemoryStore;
use story_ingest::storage::sqlite::SqliteStore;
use story_ingest::storage::StoryStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    async fn start(store: Arc<dyn StoryStore>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            serve(listener, store, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            _shutdown: tx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }
}

async fn memory_server() -> TestServer {
    TestServer::start(Arc::new(MemoryStore::new())).await
}

#[tokio::test]
async fn test_post_twice_stores_one_record() {
    let server = memory_server().await;
    let batch = json!([{ "title": "A", "index": "0001" }]);

    let first = server.post_json("/api/story", &batch).await;
    assert_eq!(first.status(), 200);
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["message"], "ok");
    assert_eq!(first["inserted"][0]["index"], "0001");

    let second = server.post_json("/api/story", &batch).await;
    assert_eq!(second.status(), 200);
    let second: Value = second.json().await.unwrap();
    assert_eq!(second["message"], "all submitted records already exist");
    assert_eq!(second["already_exists"], json!(["0001"]));

    let all: Value = server.get("/api/all_story").await.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_partial_overlap_over_http() {
    let server = memory_server().await;
    server
        .post_json("/ingest", &json!([{ "title": "A", "index": "0001" }]))
        .await;

    let resp = server
        .post_json(
            "/ingest",
            &json!([{ "title": "A", "index": "0001" }, { "title": "B", "index": "0002" }]),
        )
        .await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["inserted"], json!([{ "title": "B", "index": "0002" }]));
    assert_eq!(body["already_exists"], json!(["0001"]));
}

#[tokio::test]
async fn test_repeats_within_a_batch_are_reported_separately() {
    let server = memory_server().await;

    let resp = server
        .post_json(
            "/api/story",
            &json!([
                { "title": "first", "index": "0007" },
                { "title": "second", "index": "0007" }
            ]),
        )
        .await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["inserted"], json!([{ "title": "first", "index": "0007" }]));
    assert_eq!(body["already_exists"], json!([]));
    assert_eq!(body["repeated_in_batch"], json!(["0007"]));
}

#[tokio::test]
async fn test_empty_array_is_success() {
    let server = memory_server().await;

    let resp = server.post_json("/api/story", &json!([])).await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "empty input, no action taken");
    assert_eq!(body["inserted"], json!([]));
}

#[tokio::test]
async fn test_bad_bodies_are_400() {
    let server = memory_server().await;

    let object = server
        .post_json("/api/story", &json!({ "title": "A", "index": "0001" }))
        .await;
    assert_eq!(object.status(), 400);

    let no_keys = server
        .post_json("/api/story", &json!([{ "title": "X", "index": "" }]))
        .await;
    assert_eq!(no_keys.status(), 400);

    let garbage = server
        .client
        .post(server.url("/api/story"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), 400);

    let all: Value = server.get("/stories").await.json().await.unwrap();
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_lookup_statuses() {
    let server = memory_server().await;
    server
        .post_json("/api/story", &json!([{ "title": "Owl", "index": "0042" }]))
        .await;

    assert_eq!(server.get("/api/story").await.status(), 400);
    assert_eq!(server.get("/api/story?index=").await.status(), 400);
    assert_eq!(server.get("/api/story?index=9999").await.status(), 404);

    let found = server.get("/api/story?index=0042").await;
    assert_eq!(found.status(), 200);
    let story: Value = found.json().await.unwrap();
    assert_eq!(story["title"], "Owl");
    assert_eq!(story["index"], "0042");

    let by_key = server.get("/ingest?key=0042").await;
    assert_eq!(by_key.status(), 200);
}

#[tokio::test]
async fn test_unsupported_method_is_405_with_allow() {
    let server = memory_server().await;

    let resp = server
        .client
        .delete(server.url("/api/story"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers()["allow"], "GET, POST");
    assert_eq!(resp.text().await.unwrap(), "DELETE is not allowed.");

    let list = server
        .client
        .put(server.url("/api/all_story"))
        .send()
        .await
        .unwrap();
    assert_eq!(list.status(), 405);
    assert_eq!(list.headers()["allow"], "GET");
}

#[tokio::test]
async fn test_failed_batch_is_500_and_invisible() {
    // ARRANGE: SQLite store whose trigger rejects key "0003"
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stories.db");
    let store = SqliteStore::open(&path).unwrap();
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_0003 BEFORE INSERT ON stories
             WHEN NEW.natural_key = '0003'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    let server = TestServer::start(Arc::new(store)).await;

    // ACT
    let resp = server
        .post_json(
            "/api/story",
            &json!([
                { "title": "A", "index": "0001" },
                { "title": "B", "index": "0002" },
                { "title": "C", "index": "0003" }
            ]),
        )
        .await;

    // ASSERT: Internal detail is not leaked and no subset became visible
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.text().await.unwrap(), "An internal error occurred");
    for key in ["0001", "0002", "0003"] {
        let lookup = server.get(&format!("/api/story?index={}", key)).await;
        assert_eq!(lookup.status(), 404, "{key} should not be visible");
    }
}

#[tokio::test]
async fn test_importer_submits_csv_batch() {
    let server = memory_server().await;
    let stories = parse_csv("id,text\n1,Fox\n2,\"Owl, the wise\"\n").unwrap();

    let outcome = submit(&server.client, &server.url("/api/story"), &stories)
        .await
        .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.body["message"], "ok");

    let story: Value = server
        .get("/api/story?index=0002")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(story["title"], "Owl, the wise");

    let again = submit(&server.client, &server.url("/api/story"), &stories)
        .await
        .unwrap();
    assert_eq!(again.body["message"], "all submitted records already exist");
}

#[tokio::test]
async fn test_health() {
    let server = memory_server().await;
    let resp = server.get("/health").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}
