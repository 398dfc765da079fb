use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::path::PathBuf;

use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use inventory_api::{create_app, db::SqliteRepository};

/// Router backed by a fresh in-memory database.
pub async fn create_test_app() -> Router {
    let db = SqliteRepository::new("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    db.create_tables().await.expect("Failed to create tables");
    create_app(db)
}

/// A database file under the system temp directory, removed on drop.
pub struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "inventory-api-{name}-{}.db",
            std::process::id()
        ));
        let database = Self { path };
        database.remove_files();
        database
    }

    pub fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }

    fn remove_files(&self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        self.remove_files();
    }
}

/// Router backed by a database file with a pool of several connections, so
/// requests really run side by side. Keep the returned guard alive for the
/// duration of the test.
pub async fn create_file_backed_app(name: &str, max_connections: u32) -> (Router, TempDatabase) {
    let database = TempDatabase::new(name);
    let db = SqliteRepository::new(&database.url(), max_connections)
        .await
        .expect("Failed to open database file");
    db.create_tables().await.expect("Failed to create tables");
    (create_app(db), database)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
