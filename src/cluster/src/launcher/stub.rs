//! In-process stand-in node.
//!
//! Serves the slice of the engine's REST API the harness touches (cluster
//! health, document index/get, refresh) so the harness's own tests run
//! without an engine install. Documents are written through to the node's
//! data directory, so state survives a relaunch from the same directory the
//! way a real node's on-disk store would.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use super::{NodeConfig, NodeHandle, NodeLauncher};
use crate::error::ClusterError;

/// Launches in-process stand-in nodes.
pub struct StubLauncher;

#[derive(Clone)]
struct StubState {
    cluster_name: String,
    docs: Arc<RwLock<HashMap<String, Value>>>,
    docs_dir: PathBuf,
}

impl StubState {
    fn doc_path(&self, index: &str, id: &str) -> PathBuf {
        // hex-encoded key keeps arbitrary index/id values path-safe
        self.docs_dir
            .join(format!("{}.json", hex::encode(format!("{index}/{id}"))))
    }

    async fn persist(&self, index: &str, id: &str, source: &Value) -> std::io::Result<()> {
        let bytes = serde_json::to_vec(source).map_err(std::io::Error::other)?;
        tokio::fs::write(self.doc_path(index, id), bytes).await
    }
}

async fn load_persisted(docs_dir: &Path) -> std::io::Result<HashMap<String, Value>> {
    let mut docs = HashMap::new();

    let mut entries = match tokio::fs::read_dir(docs_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(docs),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Ok(key) = hex::decode(stem).map(String::from_utf8) else {
            continue;
        };
        let Ok(key) = key else {
            continue;
        };

        let bytes = tokio::fs::read(&path).await?;
        match serde_json::from_slice(&bytes) {
            Ok(source) => {
                docs.insert(key, source);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable document file");
            }
        }
    }

    Ok(docs)
}

#[async_trait]
impl NodeLauncher for StubLauncher {
    async fn launch(&self, node: &NodeConfig) -> Result<Box<dyn NodeHandle>, ClusterError> {
        let docs_dir = node.data_dir.join("docs");
        tokio::fs::create_dir_all(&docs_dir).await?;
        let docs = load_persisted(&docs_dir).await?;

        let state = StubState {
            cluster_name: node.cluster_name.clone(),
            docs: Arc::new(RwLock::new(docs)),
            docs_dir,
        };

        let mut app = Router::new()
            .route("/_cluster/health", get(cluster_health))
            .route("/:index/_doc/:id", put(put_document).get(get_document))
            .route("/:index/_refresh", post(refresh_index))
            .with_state(state);

        if node.setting("http.cors.enabled") == Some("true") {
            let cors = match node.setting("http.cors.allow-origin") {
                None | Some("*") => CorsLayer::new().allow_origin(Any),
                Some(origin) => {
                    let origin =
                        origin
                            .parse::<HeaderValue>()
                            .map_err(|e| ClusterError::Launch {
                                node: node.node_number,
                                message: format!("invalid CORS origin: {e}"),
                            })?;
                    CorsLayer::new().allow_origin(origin)
                }
            };
            app = app.layer(cors);
        }

        let http_listener = TcpListener::bind(("127.0.0.1", node.http_port))
            .await
            .map_err(|e| ClusterError::Launch {
                node: node.node_number,
                message: format!("bind 127.0.0.1:{}: {e}", node.http_port),
            })?;

        // The stand-in never speaks the transport protocol, but holding the
        // port keeps the cluster's network footprint identical to a real node.
        let transport_listener = TcpListener::bind(("127.0.0.1", node.transport_port))
            .await
            .map_err(|e| ClusterError::Launch {
                node: node.node_number,
                message: format!("bind 127.0.0.1:{}: {e}", node.transport_port),
            })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(http_listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(
            cluster = %node.cluster_name,
            node = node.node_number,
            http_port = node.http_port,
            "stub node started"
        );

        Ok(Box::new(StubNodeHandle {
            shutdown: Some(shutdown_tx),
            server: Some(server),
            transport_listener: Some(transport_listener),
        }))
    }
}

async fn cluster_health(State(state): State<StubState>) -> Json<Value> {
    Json(json!({
        "cluster_name": state.cluster_name,
        "status": "green",
        "number_of_nodes": 1,
    }))
}

async fn put_document(
    State(state): State<StubState>,
    UrlPath((index, id)): UrlPath<(String, String)>,
    Json(source): Json<Value>,
) -> impl IntoResponse {
    let created = {
        let mut docs = state.docs.write().unwrap();
        docs.insert(format!("{index}/{id}"), source.clone()).is_none()
    };

    if let Err(e) = state.persist(&index, &id, &source).await {
        error!(%index, %id, error = %e, "failed to persist document");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        );
    }

    let result = if created { "created" } else { "updated" };
    (
        StatusCode::CREATED,
        Json(json!({"_index": index, "_id": id, "result": result})),
    )
}

async fn get_document(
    State(state): State<StubState>,
    UrlPath((index, id)): UrlPath<(String, String)>,
) -> impl IntoResponse {
    let source = {
        let docs = state.docs.read().unwrap();
        docs.get(&format!("{index}/{id}")).cloned()
    };

    match source {
        Some(source) => (
            StatusCode::OK,
            Json(json!({"_index": index, "_id": id, "found": true, "_source": source})),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"_index": index, "_id": id, "found": false})),
        ),
    }
}

async fn refresh_index(UrlPath(_index): UrlPath<String>) -> Json<Value> {
    // documents are visible immediately; refresh is accepted for API parity
    Json(json!({"_shards": {"total": 1, "successful": 1, "failed": 0}}))
}

struct StubNodeHandle {
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
    transport_listener: Option<TcpListener>,
}

#[async_trait]
impl NodeHandle for StubNodeHandle {
    async fn close(&mut self) -> Result<(), ClusterError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        drop(self.transport_listener.take());

        if let Some(server) = self.server.take() {
            server
                .await
                .map_err(|e| ClusterError::Shutdown(e.to_string()))??;
        }

        Ok(())
    }
}
