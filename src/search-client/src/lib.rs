//! Minimal async client for the search engine REST API.
//!
//! Covers the slice of the API the test harness touches: cluster health,
//! document index/get, and index refresh.

mod error;

pub use error::ClientError;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cluster health state as reported by `GET /_cluster/health`.
///
/// `Green` means all expected shards and replicas are allocated and the
/// cluster is fully operational.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Green => write!(f, "green"),
            Self::Yellow => write!(f, "yellow"),
            Self::Red => write!(f, "red"),
        }
    }
}

/// Response body of `GET /_cluster/health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: HealthStatus,
    pub number_of_nodes: u32,
}

/// Response body of `GET /{index}/_doc/{id}`.
#[derive(Clone, Debug, Deserialize)]
pub struct GetDocumentResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    pub found: bool,
    #[serde(rename = "_source")]
    pub source: Option<serde_json::Value>,
}

/// HTTP client bound to one node's REST endpoint.
pub struct SearchClient {
    base_url: String,
    http: reqwest::Client,
}

impl SearchClient {
    /// Create a new client pointing at the given base URL.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Create a new client for `http://{host}:{port}`.
    pub fn for_host_port(host: &str, port: u16) -> Self {
        Self::new(&format!("http://{host}:{port}"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the cluster health.
    pub async fn cluster_health(&self) -> Result<ClusterHealth, ClientError> {
        let url = format!("{}/_cluster/health", self.base_url);
        let resp = self.http.get(&url).send().await?;
        handle_response(resp).await
    }

    /// Index a document under `{index}/{id}`, creating or replacing it.
    pub async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &serde_json::Value,
    ) -> Result<(), ClientError> {
        let url = format!("{}/{index}/_doc/{id}", self.base_url);
        let resp = self.http.put(&url).json(document).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(api_error(resp).await)
        }
    }

    /// Fetch a document's source, or `None` if it does not exist.
    pub async fn get_document(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<serde_json::Value>, ClientError> {
        let url = format!("{}/{index}/_doc/{id}", self.base_url);
        let resp = self.http.get(&url).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: GetDocumentResponse = handle_response(resp).await?;
        if body.found { Ok(body.source) } else { Ok(None) }
    }

    /// Make previously indexed documents visible to search.
    pub async fn refresh(&self, index: &str) -> Result<(), ClientError> {
        let url = format!("{}/{index}/_refresh", self.base_url);
        let resp = self.http.post(&url).send().await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(api_error(resp).await)
        }
    }

    /// Close the client, releasing its connection pool.
    pub async fn close(self) -> Result<(), ClientError> {
        // The pool winds down when the inner client is dropped; close exists
        // so teardown order stays observable to callers.
        drop(self);
        Ok(())
    }
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    if resp.status().is_success() {
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    } else {
        Err(api_error(resp).await)
    }
}

async fn api_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    ClientError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = SearchClient::new("http://localhost:9200/");
        assert_eq!(client.base_url(), "http://localhost:9200");
    }

    #[test]
    fn test_for_host_port() {
        let client = SearchClient::for_host_port("localhost", 19200);
        assert_eq!(client.base_url(), "http://localhost:19200");
    }

    #[test]
    fn test_cluster_health_deserializes() {
        let body = r#"{"cluster_name":"es-cl-run-1","status":"green","number_of_nodes":1}"#;
        let health: ClusterHealth = serde_json::from_str(body).unwrap();
        assert_eq!(health.cluster_name, "es-cl-run-1");
        assert_eq!(health.status, HealthStatus::Green);
        assert_eq!(health.number_of_nodes, 1);
    }

    #[test]
    fn test_health_status_roundtrip() {
        for (status, text) in [
            (HealthStatus::Green, "\"green\""),
            (HealthStatus::Yellow, "\"yellow\""),
            (HealthStatus::Red, "\"red\""),
        ] {
            assert_eq!(serde_json::to_string(&status).unwrap(), text);
            assert_eq!(
                serde_json::from_str::<HealthStatus>(text).unwrap(),
                status
            );
        }
    }

    #[test]
    fn test_get_document_response_found() {
        let body = r#"{"_index":"a","_id":"1","found":true,"_source":{"k":"v"}}"#;
        let resp: GetDocumentResponse = serde_json::from_str(body).unwrap();
        assert!(resp.found);
        assert_eq!(resp.source.unwrap()["k"], "v");
    }
}
