//! Test helpers: loopback servers and a scripted stand-in for the explorer

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Body,
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral loopback port
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    address
}

/// A loopback address nothing listens on
pub async fn unused_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Explorer stand-in answering `/search?q=...`
///
/// - `boom`: 500 with a JSON error body
/// - `html`: an HTML result list with a relative link
/// - `bare`: a body without content type
/// - `nothing`: HTML without results or links
/// - `slow`: JSON after a long delay
/// - anything else: `{"results": [{"title": "Tx <q>", ...}]}`
pub fn fake_upstream() -> Router {
    Router::new().route("/search", get(fake_search))
}

async fn fake_search(Query(params): Query<HashMap<String, String>>) -> Response {
    let query = params.get("q").cloned().unwrap_or_default();

    match query.as_str() {
        "boom" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "boom" })),
        )
            .into_response(),
        "html" => Html(
            r#"<html><body><ul><li><a href="/tx/html">tx html</a></li></ul></body></html>"#,
        )
        .into_response(),
        "bare" => Response::new(Body::from("bare body")),
        "nothing" => Html("<html><body><div>No matches</div></body></html>").into_response(),
        "slow" => {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Json(json!({ "results": ["late"] })).into_response()
        }
        _ => Json(json!({
            "results": [{ "title": format!("Tx {query}"), "url": format!("https://x/{query}") }]
        }))
        .into_response(),
    }
}
