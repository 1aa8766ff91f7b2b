mod elasticsearch;

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::deferred::{ActionListener, notify};

pub(crate) use elasticsearch::ElasticsearchStore;

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum StoreError {
    #[error("document store unreachable: {0}")]
    Transport(String),
    #[error("document store request timed out")]
    Timeout,
    #[error("document store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode document store response: {0}")]
    Decode(String),
    #[error("document store call completed without a result")]
    Abandoned,
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// A match query restricted to a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldMatch {
    pub field: String,
    pub text: String,
}

impl FieldMatch {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn to_query_body(&self) -> Value {
        let mut clause = serde_json::Map::new();
        clause.insert(self.field.clone(), Value::String(self.text.clone()));
        json!({ "query": { "match": clause } })
    }
}

/// Keyed document storage reached over the network. Document bodies are
/// returned as the store's raw source text.
#[async_trait]
pub(crate) trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the key is absent.
    async fn get(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Sources of every hit, in the order the store ranked them.
    async fn search(&self, query: &FieldMatch) -> Result<Vec<String>, StoreError>;

    /// Writes `document` under `id` and returns the id the store recorded.
    async fn index(&self, id: &str, document: &Value) -> Result<String, StoreError>;
}

/// Shared handle to the document store, built once at start-up and handed to
/// the HTTP layer and the feeder.
#[derive(Clone)]
pub(crate) struct StoreClient {
    backend: Arc<dyn DocumentStore>,
}

impl StoreClient {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    pub async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        self.backend.get(id).await
    }

    pub fn get_async<L>(&self, id: impl Into<String>, listener: L)
    where
        L: ActionListener<Option<String>>,
    {
        let backend = Arc::clone(&self.backend);
        let id = id.into();
        dispatch(async move { backend.get(&id).await }, listener);
    }

    pub fn search_async<L>(&self, query: FieldMatch, listener: L)
    where
        L: ActionListener<Vec<String>>,
    {
        let backend = Arc::clone(&self.backend);
        dispatch(async move { backend.search(&query).await }, listener);
    }

    pub fn index_async<L>(&self, id: impl Into<String>, document: Value, listener: L)
    where
        L: ActionListener<String>,
    {
        let backend = Arc::clone(&self.backend);
        let id = id.into();
        dispatch(async move { backend.index(&id, &document).await }, listener);
    }
}

/// Runs `call` on its own task and reports the outcome to `listener` there.
fn dispatch<T, F, L>(call: F, listener: L)
where
    T: Send + 'static,
    F: Future<Output = Result<T, StoreError>> + Send + 'static,
    L: ActionListener<T>,
{
    tokio::spawn(async move {
        let result = call.await;
        notify(listener, result);
    });
}

/// Renders document bodies as `[a, b, c]`.
pub(crate) fn render_sources(sources: &[String]) -> String {
    format!("[{}]", sources.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::deferred;
    use crate::test_utils::MemoryStore;

    #[test]
    fn field_match_renders_match_query() {
        let query = FieldMatch::new("first_name", "Ada");
        assert_eq!(
            query.to_query_body(),
            json!({ "query": { "match": { "first_name": "Ada" } } })
        );
    }

    #[test]
    fn render_sources_formats_list() {
        assert_eq!(render_sources(&[]), "[]");
        assert_eq!(
            render_sources(&[r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()]),
            r#"[{"a":1}, {"b":2}]"#
        );
    }

    #[tokio::test]
    async fn get_async_resolves_success_path() {
        let store = MemoryStore::new().with_document("k1", r#"{"first_name":"Ada"}"#);
        let client = StoreClient::new(Arc::new(store));
        let (completer, handle) = deferred();
        client.get_async("k1", completer);
        assert_eq!(
            handle.await.unwrap().as_deref(),
            Some(r#"{"first_name":"Ada"}"#)
        );
    }

    #[tokio::test]
    async fn get_async_resolves_failure_path() {
        let store = MemoryStore::new().with_document("k1", "{}");
        store.fail_reads(true);
        let client = StoreClient::new(Arc::new(store));
        let (completer, handle) = deferred();
        client.get_async("k1", completer);
        assert!(matches!(handle.await, Err(StoreError::Transport(_))));
    }

    #[tokio::test]
    async fn index_async_reports_written_id() {
        let store = Arc::new(MemoryStore::new());
        let client = StoreClient::new(store.clone());
        let (completer, handle) = deferred();
        client.index_async("fresh", json!({ "first_name": "Grace" }), completer);
        assert_eq!(handle.await.unwrap(), "fresh");
        assert!(store.contains("fresh"));
    }
}
