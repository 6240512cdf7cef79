//! HTTP surface
//!
//! JSON endpoints over the store and search engine, plus static files from
//! the configured web directory for every other path.

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::search::{QueryClause, ScoredResult, SearchEngine, DEFAULT_MINIMUM_WEIGHT};
use crate::store::{create_identifier, Record, Store, ID_FIELD};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub engine: Arc<SearchEngine>,
    pub web_directory: PathBuf,
    pub default_document: String,
}

impl AppState {
    pub fn new(store: Arc<Store>, engine: Arc<SearchEngine>, server: &ServerConfig) -> Self {
        Self {
            store,
            engine,
            web_directory: server.web_directory.clone(),
            default_document: server.default_document.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PropertyParams {
    pub property: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct IdentifierParams {
    pub raw: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub clauses: Vec<QueryClause>,
    /// Any JSON number; fractional and negative thresholds are allowed
    #[serde(default)]
    pub minimum_weight: Option<f64>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/records", get(handle_get_by_property))
        .route(
            "/api/records/:key",
            get(handle_get_record)
                .put(handle_put_record)
                .delete(handle_delete_record),
        )
        .route("/api/search", post(handle_search))
        .route("/api/identifier", get(handle_identifier))
        .fallback(handle_static)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, server: &ServerConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("kvsearch listening to http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn handle_get_record(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Arc<Record>>, AppError> {
    state
        .store
        .get(&key)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No record for key {}", key)))
}

async fn handle_put_record(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let mut record = Record::from_value(body)
        .ok_or_else(|| AppError::InvalidInput("Record body must be a JSON object".to_string()))?;

    // the key is the record's identity
    match record.get(ID_FIELD) {
        None => {
            record.insert(ID_FIELD, key.clone());
        }
        Some(Value::String(id)) if *id == key => {}
        Some(other) => {
            return Err(AppError::InvalidInput(format!(
                "Record id {} does not match key {}",
                other, key
            )));
        }
    }

    if !state.store.set(&key, record) {
        return Err(AppError::InvalidInput("Record key is empty".to_string()));
    }

    Ok(Json(json!({ "stored": true, "key": key })))
}

async fn handle_delete_record(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<Value> {
    let deleted = state.store.delete(&key);
    Json(json!({ "deleted": deleted }))
}

async fn handle_get_by_property(
    State(state): State<AppState>,
    Query(params): Query<PropertyParams>,
) -> Json<Vec<Arc<Record>>> {
    // the raw text always matches string fields; when it also parses as
    // JSON (numbers, booleans, null) that value matches too
    let parsed = serde_json::from_str::<Value>(&params.value).ok();
    let raw = Value::String(params.value);

    Json(
        state
            .store
            .get_where(&params.property, |field| *field == raw || parsed.as_ref() == Some(field)),
    )
}

async fn handle_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<ScoredResult>>, AppError> {
    let minimum_weight = request
        .minimum_weight
        .unwrap_or(DEFAULT_MINIMUM_WEIGHT as f64);
    let store = Arc::clone(&state.store);
    let engine = Arc::clone(&state.engine);

    // full scans are CPU bound; keep them off the async workers
    let results = tokio::task::spawn_blocking(move || {
        engine.search_above(&*store, &request.clauses, minimum_weight)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Search task failed: {}", e)))??;

    Ok(Json(results))
}

async fn handle_identifier(Query(params): Query<IdentifierParams>) -> Json<Value> {
    Json(json!({ "identifier": create_identifier(&params.raw) }))
}

async fn handle_static(State(state): State<AppState>, uri: Uri) -> Result<Response, AppError> {
    let path = resolve_static_path(&state, uri.path())
        .ok_or_else(|| AppError::NotFound(uri.path().to_string()))?;

    debug!("Serving static file {}", path.display());

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(uri.path().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&path))],
        bytes,
    )
        .into_response())
}

/// Map a request path to a file below the web directory. Paths that would
/// leave the directory resolve to nothing.
fn resolve_static_path(state: &AppState, request_path: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(request_path.trim_start_matches('/'));

    let mut path = state.web_directory.clone();
    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if request_path.ends_with('/') || path.is_dir() {
        path.push(&state.default_document);
    }

    Some(path)
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Vocabulary;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn test_state(web_directory: PathBuf) -> AppState {
        let store = Arc::new(Store::new());
        for (id, text) in [("a", "red car"), ("b", "blue car"), ("c", "red bicycle")] {
            let record = Record::from_value(json!({"id": id, "text": text, "type": "vehicle"})).unwrap();
            store.set(id, record);
        }
        let engine = Arc::new(SearchEngine::new(Vocabulary::default()));
        let server = ServerConfig {
            web_directory,
            ..ServerConfig::default()
        };
        AppState::new(store, engine, &server)
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn as_json(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_get_record() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(app, Method::GET, "/api/records/a", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["text"], "red car");
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(app, Method::GET, "/api/records/zzz", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(as_json(&body)["error"], "not_found");
    }

    #[tokio::test]
    async fn test_put_and_delete_record() {
        let state = test_state(PathBuf::from("web"));
        let store = Arc::clone(&state.store);
        let app = router(state);

        let (status, _) = send(
            app.clone(),
            Method::PUT,
            "/api/records/d",
            Some(json!({"id": "d", "text": "green van"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.exists("d"));

        let (status, body) = send(app, Method::DELETE, "/api/records/d", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["deleted"], true);
        assert!(!store.exists("d"));
    }

    #[tokio::test]
    async fn test_put_rejects_non_object() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(app, Method::PUT, "/api/records/x", Some(json!([1, 2]))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body)["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_get_by_property() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(
            app,
            Method::GET,
            "/api/records?property=type&value=vehicle",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body).as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(
            app,
            Method::POST,
            "/api/search",
            Some(json!({
                "clauses": [{"property": "text", "terms": ["red", "car"], "mandatory": true}],
                "minimumWeight": 0
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let results = as_json(&body);
        let ranked: Vec<(&str, u64)> = results
            .as_array()
            .unwrap()
            .iter()
            .map(|r| (r["id"].as_str().unwrap(), r["score"].as_u64().unwrap()))
            .collect();
        assert_eq!(ranked, vec![("a", 116), ("b", 103), ("c", 103)]);
    }

    #[tokio::test]
    async fn test_put_without_id_is_searchable() {
        let app = router(test_state(PathBuf::from("web")));

        let (status, _) = send(
            app.clone(),
            Method::PUT,
            "/api/records/van",
            Some(json!({"text": "green van"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(app.clone(), Method::GET, "/api/records/van", None).await;
        assert_eq!(as_json(&body)["id"], "van");

        let (status, body) = send(
            app,
            Method::POST,
            "/api/search",
            Some(json!({"clauses": [{"property": "text", "terms": ["green"]}]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body), json!([{"id": "van", "text": "green van", "score": 113}]));
    }

    #[tokio::test]
    async fn test_put_rejects_mismatched_id() {
        let state = test_state(PathBuf::from("web"));
        let store = Arc::clone(&state.store);
        let app = router(state);

        let (status, body) = send(
            app.clone(),
            Method::PUT,
            "/api/records/van",
            Some(json!({"id": "truck", "text": "green van"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body)["error"], "invalid_input");
        assert!(!store.exists("van"));

        let (status, _) = send(
            app,
            Method::PUT,
            "/api/records/van",
            Some(json!({"id": 7, "text": "green van"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_by_property_matches_digit_strings() {
        let state = test_state(PathBuf::from("web"));
        state.store.set(
            "1",
            Record::from_value(json!({"id": "1", "zip": "12345", "count": 3})).unwrap(),
        );
        let app = router(state);

        let (_, body) = send(app.clone(), Method::GET, "/api/records?property=zip&value=12345", None).await;
        assert_eq!(as_json(&body).as_array().unwrap().len(), 1);

        let (_, body) = send(app.clone(), Method::GET, "/api/records?property=id&value=1", None).await;
        assert_eq!(as_json(&body)[0]["zip"], "12345");

        // numeric fields still match the parsed value
        let (_, body) = send(app, Method::GET, "/api/records?property=count&value=3", None).await;
        assert_eq!(as_json(&body).as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_accepts_any_number_threshold() {
        let app = router(test_state(PathBuf::from("web")));

        let (status, body) = send(
            app.clone(),
            Method::POST,
            "/api/search",
            Some(json!({
                "clauses": [{"property": "text", "terms": ["red", "car"]}],
                "minimumWeight": 103.5
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body).as_array().unwrap().len(), 1);

        let (status, body) = send(
            app,
            Method::POST,
            "/api/search",
            Some(json!({
                "clauses": [{"property": "text", "terms": ["red", "car"]}],
                "minimumWeight": -1
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body).as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_search_rejects_empty_property() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(
            app,
            Method::POST,
            "/api/search",
            Some(json!({"clauses": [{"property": "", "terms": ["red"]}]})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(as_json(&body)["error"], "invalid_query");
    }

    #[tokio::test]
    async fn test_identifier_endpoint() {
        let app = router(test_state(PathBuf::from("web")));
        let (status, body) = send(app, Method::GET, "/api/identifier?raw=Fish%20%26%20Chips", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(as_json(&body)["identifier"], "fish_chips");
    }

    #[tokio::test]
    async fn test_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

        let app = router(test_state(dir.path().to_path_buf()));

        let (status, body) = send(app.clone(), Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<h1>hello</h1>");

        let (status, _) = send(app.clone(), Method::GET, "/app.js", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(app, Method::GET, "/missing.css", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_static_path_cannot_escape() {
        let state = test_state(PathBuf::from("web"));
        assert!(resolve_static_path(&state, "/../secret.txt").is_none());
        assert!(resolve_static_path(&state, "/a/../../secret.txt").is_none());
        assert_eq!(
            resolve_static_path(&state, "/css/site.css"),
            Some(PathBuf::from("web/css/site.css"))
        );
        assert_eq!(
            resolve_static_path(&state, "/docs/"),
            Some(PathBuf::from("web/docs/index.html"))
        );
    }
}
