//! End-to-end HTTP tests.
//!
//! Spins up a real server on a free port with a tempdir database and drives
//! it with a cookie-carrying reqwest client — the same surface the web UI
//! uses.

use serde_json::{json, Value};
use std::sync::Arc;
use trackd::{config::ServerConfig, rest, storage::Storage, AppContext};

async fn start_test_server() -> (String, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let port = get_free_port();

    let config = Arc::new(ServerConfig::new(
        Some(port),
        Some(dir.path().to_path_buf()),
        Some("warn".to_string()),
        None,
    ));
    let storage = Arc::new(Storage::new(dir.path()).await.unwrap());
    let ctx = Arc::new(AppContext {
        config,
        storage,
        started_at: std::time::Instant::now(),
    });

    tokio::spawn(async move {
        rest::start_rest_server(ctx).await.ok();
    });

    // Give the server a moment to bind
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), dir)
}

fn get_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().cookie_store(true).build().unwrap()
}

/// Register + login a user, leaving the session cookie in the client's jar.
async fn sign_in(base: &str, client: &reqwest::Client, username: &str, password: &str) {
    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(format!("{base}/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_health_is_public() {
    let (base, _dir) = start_test_server().await;
    let resp = client().get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let (base, _dir) = start_test_server().await;
    let client = client();

    for path in ["/projects", "/time-entries", "/summary", "/me"] {
        let resp = client.get(format!("{base}{path}")).send().await.unwrap();
        assert_eq!(resp.status(), 401, "GET {path} without a session");
    }
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let (base, _dir) = start_test_server().await;
    let client = client();

    // Too-short username / password.
    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": "ab", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": "alice", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // First registration succeeds, duplicate is rejected.
    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": "alice", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert!(body["userId"].is_string());

    let resp = client
        .post(format!("{base}/register"))
        .json(&json!({ "username": "alice", "password": "secret2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (base, _dir) = start_test_server().await;
    let client = client();
    sign_in(&base, &client, "alice", "secret1").await;

    let fresh = reqwest::Client::new();
    let resp = fresh
        .post(format!("{base}/login"))
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Unknown user answers the same as a wrong password.
    let resp = fresh
        .post(format!("{base}/login"))
        .json(&json!({ "username": "nobody", "password": "whatever" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_end_to_end_track_and_cascade() {
    let (base, _dir) = start_test_server().await;
    let client = client();
    sign_in(&base, &client, "alice", "secret1").await;

    // Create a project; it appears exactly once, trimmed, with createdAt set.
    let resp = client
        .post(format!("{base}/projects"))
        .json(&json!({ "name": "  Acme  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let project: Value = resp.json().await.unwrap();
    assert_eq!(project["name"], "Acme");
    let project_id = project["id"].as_str().unwrap().to_string();

    let projects: Value = client
        .get(format!("{base}/projects"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let projects = projects.as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], "Acme");
    assert!(projects[0]["createdAt"].is_string());

    // Log 2.5 hours.
    let resp = client
        .post(format!("{base}/time-entries"))
        .json(&json!({
            "projectId": project_id,
            "date": "2024-01-01",
            "hours": 2.5,
            "description": "kickoff"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let entry: Value = resp.json().await.unwrap();
    assert_eq!(entry["hours"], 2.5);
    assert_eq!(entry["projectId"], project_id.as_str());

    let entries: Value = client
        .get(format!("{base}/time-entries?projectId={project_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entries = entries.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["hours"], 2.5);
    assert_eq!(entries[0]["date"], "2024-01-01");

    // Delete the project: it and its entries vanish together.
    let resp = client
        .delete(format!("{base}/projects?id={project_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    let projects: Value = client
        .get(format!("{base}/projects"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(projects.as_array().unwrap().is_empty());

    let entries: Value = client
        .get(format!("{base}/time-entries"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(entries.as_array().unwrap().is_empty());

    // The scoped listing now 404s — the project no longer exists.
    let resp = client
        .get(format!("{base}/time-entries?projectId={project_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_project_validation() {
    let (base, _dir) = start_test_server().await;
    let client = client();
    sign_in(&base, &client, "alice", "secret1").await;

    // Whitespace-only name.
    let resp = client
        .post(format!("{base}/projects"))
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing delete id.
    let resp = client.delete(format!("{base}/projects")).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown project id.
    let resp = client
        .delete(format!("{base}/projects?id=no-such-project"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_entry_hours_validation_persists_nothing() {
    let (base, _dir) = start_test_server().await;
    let client = client();
    sign_in(&base, &client, "alice", "secret1").await;

    let project: Value = client
        .post(format!("{base}/projects"))
        .json(&json!({ "name": "Acme" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = project["id"].as_str().unwrap();

    for hours in [json!(0), json!(-1.5), json!("abc"), Value::Null] {
        let resp = client
            .post(format!("{base}/time-entries"))
            .json(&json!({ "projectId": project_id, "date": "2024-01-01", "hours": hours }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "hours = {hours}");
    }

    // Numeric strings are accepted — the web client sends them.
    let resp = client
        .post(format!("{base}/time-entries"))
        .json(&json!({ "projectId": project_id, "date": "2024-01-01", "hours": "3.25" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let entries: Value = client
        .get(format!("{base}/time-entries"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // Only the one valid entry made it to the store.
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries.as_array().unwrap()[0]["hours"], 3.25);
}

#[tokio::test]
async fn test_users_cannot_touch_each_others_resources() {
    let (base, _dir) = start_test_server().await;
    let alice = client();
    let mallory = client();
    sign_in(&base, &alice, "alice", "secret1").await;
    sign_in(&base, &mallory, "mallory", "secret2").await;

    let project: Value = alice
        .post(format!("{base}/projects"))
        .json(&json!({ "name": "Private" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let project_id = project["id"].as_str().unwrap();

    let entry: Value = alice
        .post(format!("{base}/time-entries"))
        .json(&json!({ "projectId": project_id, "date": "2024-01-01", "hours": 1.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let entry_id = entry["id"].as_str().unwrap();

    // Every cross-user operation answers 404, never 403.
    let resp = mallory
        .get(format!("{base}/time-entries?projectId={project_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = mallory
        .post(format!("{base}/time-entries"))
        .json(&json!({ "projectId": project_id, "date": "2024-01-02", "hours": 2.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = mallory
        .delete(format!("{base}/projects?id={project_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = mallory
        .delete(format!("{base}/time-entries?id={entry_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Mallory's listings stay empty; Alice's data is intact.
    let theirs: Value = mallory
        .get(format!("{base}/projects"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(theirs.as_array().unwrap().is_empty());

    let mine: Value = alice
        .get(format!("{base}/time-entries"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_summary_totals_and_percentages() {
    let (base, _dir) = start_test_server().await;
    let client = client();
    sign_in(&base, &client, "alice", "secret1").await;

    let a: Value = client
        .post(format!("{base}/projects"))
        .json(&json!({ "name": "A" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let b: Value = client
        .post(format!("{base}/projects"))
        .json(&json!({ "name": "B" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // No hours yet: the chart falls back to an equal split.
    let summary: Value = client
        .get(format!("{base}/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["totalHours"], 0.0);
    for slice in summary["projects"].as_array().unwrap() {
        assert_eq!(slice["percentage"], 50.0);
    }

    for (pid, hours) in [(&a, 6.0), (&a, 2.0), (&b, 2.0)] {
        client
            .post(format!("{base}/time-entries"))
            .json(&json!({
                "projectId": pid["id"].as_str().unwrap(),
                "date": "2024-01-01",
                "hours": hours
            }))
            .send()
            .await
            .unwrap();
    }

    let summary: Value = client
        .get(format!("{base}/summary"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["totalHours"], 10.0);

    let slices = summary["projects"].as_array().unwrap();
    let slice_a = slices
        .iter()
        .find(|s| s["projectId"] == a["id"])
        .unwrap();
    assert_eq!(slice_a["totalHours"], 8.0);
    assert_eq!(slice_a["percentage"], 80.0);
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let (base, _dir) = start_test_server().await;
    let client = client();
    sign_in(&base, &client, "alice", "secret1").await;

    let resp = client.get(format!("{base}/me")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["username"], "alice");

    let resp = client.post(format!("{base}/logout")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{base}/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    // Logging out again is harmless.
    let resp = client.post(format!("{base}/logout")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}
