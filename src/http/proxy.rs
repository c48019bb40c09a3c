use crate::core::fetch::{ResilientClient, UpstreamRequest};
use crate::domain::ports::ProxyConfigProvider;
use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub const PROXY_FAILURE_MESSAGE: &str = "Failed to fetch data from backend";

#[derive(Clone)]
pub struct AppState {
    pub client: ResilientClient,
    pub config: Arc<dyn ProxyConfigProvider>,
}

impl AppState {
    pub fn new(client: ResilientClient, config: Arc<dyn ProxyConfigProvider>) -> Self {
        Self { client, config }
    }
}

/// 代理失敗時回傳給瀏覽器的錯誤格式
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub details: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: &str, details: String, backend_url: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
            backend_url,
        }
    }

    fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/{route}", get(forward).post(forward))
        .route("/api/{route}/", get(forward).post(forward))
        .route("/api/{route}/{*rest}", get(forward).post(forward))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found(method: Method, uri: axum::http::Uri) -> Response {
    ErrorEnvelope::new(
        "Not found",
        format!("No handler for {} {}", method, uri.path()),
        None,
    )
    .into_response_with(StatusCode::NOT_FOUND)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "routes": state.config.route_names(),
    }))
}

async fn forward(
    State(state): State<AppState>,
    method: Method,
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // 擷取失敗也回傳 JSON 錯誤格式，而非 axum 預設的純文字
    let (params, query) = match (params, query) {
        (Ok(Path(params)), Ok(Query(query))) => (params, query),
        (Err(rejection), _) => {
            return ErrorEnvelope::new("Invalid request path", rejection.body_text(), None)
                .into_response_with(rejection.status());
        }
        (_, Err(rejection)) => {
            return ErrorEnvelope::new("Invalid query string", rejection.body_text(), None)
                .into_response_with(StatusCode::BAD_REQUEST);
        }
    };
    let route = params.get("route").map(String::as_str).unwrap_or_default();
    let Some(base) = state.config.upstream_for(route) else {
        tracing::warn!("⚠️ No upstream configured for route '{}'", route);
        return ErrorEnvelope::new(
            "Unknown API route",
            format!("No backend service is configured for '{}'", route),
            None,
        )
        .into_response_with(StatusCode::NOT_FOUND);
    };

    let url = match params.get("rest").map(|r| r.trim_start_matches('/')) {
        Some(rest) if !rest.is_empty() => format!("{}/{}", base.trim_end_matches('/'), rest),
        _ => base.to_string(),
    };

    let mut request = UpstreamRequest::new(method.clone(), url).with_query(query);
    if let Some(auth) = headers.get(header::AUTHORIZATION) {
        request = request.with_header(header::AUTHORIZATION, auth.clone());
    }
    if method == Method::POST && !body.is_empty() {
        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(json_body) => request = request.with_body(json_body),
            Err(e) => {
                return ErrorEnvelope::new("Invalid JSON body", e.to_string(), None)
                    .into_response_with(StatusCode::BAD_REQUEST);
            }
        }
    }

    tracing::debug!("Proxying {} {} -> {}", method, route, request.url);

    match state.client.fetch_with_retry(&request).await {
        Ok(response) => {
            let payload = if response.body.is_empty() {
                serde_json::Value::Null
            } else {
                response
                    .json()
                    .unwrap_or_else(|_| json!({ "data": response.text() }))
            };
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => {
            tracing::error!("❌ Proxy {} {} failed: {}", method, request.url, err);

            let status = match err.upstream_status() {
                Some(code) if state.config.propagate_client_errors() && (400..500).contains(&code) => {
                    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let backend_url = state
                .config
                .expose_backend_url()
                .then(|| base.to_string());

            ErrorEnvelope::new(PROXY_FAILURE_MESSAGE, err.to_string(), backend_url)
                .into_response_with(status)
        }
    }
}
