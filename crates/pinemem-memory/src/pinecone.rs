//! Pinecone vector store over the REST API.
//!
//! The control plane (`api.pinecone.io`) lists, creates and describes
//! indexes. The data plane (the index's own host) stores and queries
//! vectors inside one namespace.

use crate::error::MemoryError;
use crate::search::SearchQuery;
use crate::store::{StoreStats, VectorMatch, VectorRecord, VectorStore};
use crate::{Metadata, Result};
use async_trait::async_trait;
use pinemem_core::config::PineconeConfig;
use pinemem_core::SecretString;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// REST API version sent with every request.
const API_VERSION: &str = "2024-07";

const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);
const READY_MAX_POLLS: u32 = 60;

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MemoryError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success response into a [`MemoryError::Store`].
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(MemoryError::store(status, body))
}

/// Prefix a bare host name with `https://`.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Index description returned by the control plane.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub status: IndexStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub state: String,
}

/// Control-plane client.
pub struct PineconeControl {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl PineconeControl {
    pub fn new(api_key: SecretString, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// Names of all indexes in the project.
    pub async fn list_indexes(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            indexes: Vec<IndexDescription>,
        }

        let response = check(self.request(Method::GET, "/indexes").send().await?).await?;
        let response: Response = response.json().await?;
        Ok(response.indexes.into_iter().map(|i| i.name).collect())
    }

    /// Describe one index, or `None` when it does not exist.
    pub async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let response = self
            .request(Method::GET, &format!("/indexes/{}", name))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    /// Create a serverless index.
    pub async fn create_index(&self, config: &PineconeConfig) -> Result<IndexDescription> {
        let body = json!({
            "name": config.index_name,
            "dimension": config.dimension,
            "metric": config.metric.as_str(),
            "spec": {
                "serverless": { "cloud": config.cloud, "region": config.region }
            },
        });
        let response = self
            .request(Method::POST, "/indexes")
            .json(&body)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Make sure the configured index exists and is ready; return its host.
    pub async fn ensure_index(&self, config: &PineconeConfig) -> Result<String> {
        let name = &config.index_name;
        let existing = self.list_indexes().await?;

        if !existing.iter().any(|n| n == name) {
            if !config.create_if_missing {
                return Err(MemoryError::NotFound(format!(
                    "Pinecone index '{}' does not exist",
                    name
                )));
            }
            info!(
                "Creating Pinecone index '{}' ({} dims, {}, {}/{})",
                name,
                config.dimension,
                config.metric.as_str(),
                config.cloud,
                config.region
            );
            self.create_index(config).await?;
        }

        self.wait_until_ready(name).await
    }

    async fn wait_until_ready(&self, name: &str) -> Result<String> {
        for attempt in 0..READY_MAX_POLLS {
            match self.describe_index(name).await? {
                Some(desc) if desc.status.ready && !desc.host.is_empty() => {
                    debug!("Pinecone index '{}' ready at {}", name, desc.host);
                    return Ok(desc.host);
                }
                Some(desc) => {
                    debug!(
                        "Waiting for index '{}' (state: {}, attempt {})",
                        name, desc.status.state, attempt
                    );
                }
                None => debug!("Index '{}' not visible yet (attempt {})", name, attempt),
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(MemoryError::Store {
            status: 0,
            message: format!("index '{}' did not become ready in time", name),
        })
    }
}

/// Pinecone data-plane store bound to one index and namespace.
pub struct PineconeStore {
    client: Client,
    api_key: SecretString,
    host: String,
    namespace: String,
    index_name: String,
}

impl PineconeStore {
    /// Create a store for a known index host.
    pub fn new(
        api_key: SecretString,
        host: &str,
        index_name: impl Into<String>,
        namespace: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(MemoryError::Config("Pinecone API key is required".to_string()));
        }
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            host: normalize_host(host),
            namespace: namespace.into(),
            index_name: index_name.into(),
        })
    }

    /// Connect using the pinecone config section.
    ///
    /// Uses `host` when configured; otherwise resolves it through the
    /// control plane, creating the index when allowed.
    pub async fn connect(config: &PineconeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MemoryError::Config("PINECONE_API_KEY is not set".to_string()))?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let host = match &config.host {
            Some(host) => host.clone(),
            None => {
                PineconeControl::new(api_key.clone(), &config.control_plane_url, timeout)?
                    .ensure_index(config)
                    .await?
            }
        };

        let store = Self::new(
            api_key,
            &host,
            config.index_name.clone(),
            config.namespace.clone(),
            timeout,
        )?;
        info!("Connected to {}", store.describe());
        Ok(store)
    }

    /// Data-plane base URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.host, path))
            .header("Api-Key", self.api_key.expose_secret())
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, record: VectorRecord) -> Result<()> {
        let body = json!({
            "vectors": [record],
            "namespace": self.namespace,
        });
        let response = self
            .request(Method::POST, "/vectors/upsert")
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        debug!("Upserted vector into namespace '{}'", self.namespace);
        Ok(())
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<VectorMatch>> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            vectors: HashMap<String, WireMatch>,
        }

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        params.push(("namespace", self.namespace.as_str()));

        let response = self
            .request(Method::GET, "/vectors/fetch")
            .query(&params)
            .send()
            .await?;
        let mut response: Response = check(response).await?.json().await?;

        Ok(ids
            .iter()
            .filter_map(|id| response.vectors.remove(id))
            .map(|v| VectorMatch {
                id: v.id,
                score: 1.0,
                metadata: v.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn query(&self, query: &SearchQuery) -> Result<Vec<VectorMatch>> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            matches: Vec<WireMatch>,
        }

        let request = QueryRequest {
            vector: &query.vector,
            top_k: query.top_k,
            namespace: &self.namespace,
            include_metadata: true,
            include_values: false,
            filter: query.filter.as_ref().map(|f| f.to_pinecone()),
        };
        let response = self
            .request(Method::POST, "/query")
            .json(&request)
            .send()
            .await?;
        let response: Response = check(response).await?.json().await?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| VectorMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let body = json!({ "ids": [id], "namespace": self.namespace });
        let response = self
            .request(Method::POST, "/vectors/delete")
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            #[serde(default)]
            namespaces: HashMap<String, NamespaceSummary>,
            #[serde(default)]
            dimension: Option<usize>,
            #[serde(default)]
            index_fullness: Option<f64>,
            #[serde(default)]
            total_vector_count: u64,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct NamespaceSummary {
            #[serde(default)]
            vector_count: u64,
        }

        let response = self
            .request(Method::POST, "/describe_index_stats")
            .json(&json!({}))
            .send()
            .await?;
        let response: Response = check(response).await?.json().await?;

        Ok(StoreStats {
            total_memories: response
                .namespaces
                .get(&self.namespace)
                .map_or(0, |ns| ns.vector_count),
            total_vectors: response.total_vector_count,
            dimension: response.dimension,
            index_fullness: response.index_fullness,
        })
    }

    fn describe(&self) -> String {
        format!("pinecone:{}/{}", self.index_name, self.namespace)
    }
}
