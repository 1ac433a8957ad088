use axum::extract::OriginalUri;
use axum::http::Method;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::AppError;
use crate::observations::Kind;

/// Service index listing the mounted collections.
pub async fn index() -> Json<Value> {
    let mut endpoints = Map::new();
    for kind in Kind::ALL {
        let route = kind.descriptor().route;
        endpoints.insert(route.to_string(), json!(format!("/api/{}", route)));
    }
    endpoints.insert("photoInformation".into(), json!("/api/photo-information"));

    Json(json!({
        "message": "API is running...",
        "endpoints": endpoints,
    }))
}

/// Fallback for unmatched paths and methods, echoing the request line.
pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path(), |pq| pq.as_str());
    tracing::warn!("No route for {} {}", method, target);
    AppError::NotFound(format!("Cannot {} {}", method, target))
}
