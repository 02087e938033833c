//! Throwaway backends for tests, served over real loopback HTTP.

use std::sync::Arc;

use axum::{extract::RawQuery, routing::get, Json, Router};
use parking_lot::Mutex;
use serde_json::json;

pub async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A loopback address nothing listens on.
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Well-behaved backend: fixed `/simulate` result, unsorted `/charts` rows.
#[derive(Clone, Default)]
pub struct MockBackend {
    last_query: Arc<Mutex<Option<String>>>,
}

impl MockBackend {
    pub fn last_query(&self) -> Option<String> {
        self.last_query.lock().clone()
    }

    pub fn router(&self) -> Router {
        let seen = self.last_query.clone();
        Router::new()
            .route(
                "/simulate",
                get(move |RawQuery(q): RawQuery| {
                    *seen.lock() = q;
                    async {
                        Json(json!({"panel_output_kw": 5.2, "storage_kw": 3.1, "charge_percent": 15}))
                    }
                }),
            )
            .route(
                "/charts",
                get(|| async {
                    Json(json!([
                        {"timestamp": "2024-06-01T12:00:00", "panel_output_kw": 4.5, "charge_percent": 70.0},
                        {"timestamp": "2024-06-01T08:00:00", "panel_output_kw": 0.5, "charge_percent": 30.0},
                        {"timestamp": "2024-06-01T10:00:00", "panel_output_kw": 3.0, "charge_percent": 55.0}
                    ]))
                }),
            )
    }
}
