use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::value::RawValue;
use url::Url;

use super::{DocumentStore, FieldMatch, StoreError};
use crate::config::StoreConfig;

#[derive(Debug, Clone)]
pub(crate) struct ElasticsearchStore {
    base_url: Url,
    index: String,
    credentials: Option<(String, Option<String>)>,
    search_wait: Duration,
    search_poll_limit: u32,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: Option<bool>,
    #[serde(rename = "_source", default)]
    source: Option<Box<RawValue>>,
}

#[derive(Deserialize)]
struct IndexResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Deserialize)]
struct AsyncSearchResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    is_running: bool,
    #[serde(default)]
    response: Option<SearchResponse>,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    #[serde(rename = "_source", default)]
    source: Option<Box<RawValue>>,
}

impl ElasticsearchStore {
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).context("invalid store base URL")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("store base URL {} cannot carry a path", config.base_url);
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .context("failed to build document store client")?;
        let credentials = config
            .username
            .clone()
            .map(|username| (username, config.password.clone()));
        Ok(Self {
            base_url,
            index: config.index.clone(),
            credentials,
            search_wait: config.search_wait(),
            search_poll_limit: config.search_poll_limit,
            client,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("invalid store base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, password.as_ref()),
            None => builder,
        }
    }

    fn wait_param(&self) -> String {
        format!("{}s", self.search_wait.as_secs())
    }

    async fn submit_search(&self, query: &FieldMatch) -> Result<AsyncSearchResponse, StoreError> {
        let mut url = self.endpoint(&[self.index.as_str(), "_async_search"])?;
        url.query_pairs_mut()
            .append_pair("wait_for_completion_timeout", &self.wait_param())
            .append_pair("keep_on_completion", "false");
        let response = self
            .request(Method::POST, url)
            .json(&query.to_query_body())
            .send()
            .await?;
        decode_json(response).await
    }

    async fn poll_search(&self, search_id: &str) -> Result<AsyncSearchResponse, StoreError> {
        for attempt in 1..=self.search_poll_limit {
            let mut url = self.endpoint(&["_async_search", search_id])?;
            url.query_pairs_mut()
                .append_pair("wait_for_completion_timeout", &self.wait_param());
            let response = self.request(Method::GET, url).send().await?;
            let outcome: AsyncSearchResponse = decode_json(response).await?;
            if !outcome.is_running {
                return Ok(outcome);
            }
            tracing::debug!(search_id = %search_id, attempt, "async search still running");
        }
        Err(StoreError::Timeout)
    }

    async fn discard_search(&self, search_id: &str) {
        let url = match self.endpoint(&["_async_search", search_id]) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(search_id = %search_id, error = %err, "failed to build async search URL");
                return;
            }
        };
        match self.request(Method::DELETE, url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    search_id = %search_id,
                    status = %response.status(),
                    "failed to delete async search"
                );
            }
            Err(err) => {
                tracing::warn!(search_id = %search_id, error = %err, "failed to delete async search");
            }
        }
    }
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        let url = self.endpoint(&[self.index.as_str(), "_doc", id])?;
        tracing::debug!(index = %self.index, id = %id, "fetching document");
        let response = self.request(Method::GET, url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        // A missing document is a 404 carrying `found: false`; a missing index
        // is a 404 carrying an error object instead.
        if status == StatusCode::NOT_FOUND {
            if let Ok(parsed) = serde_json::from_slice::<GetResponse>(&body) {
                if parsed.found == Some(false) {
                    return Ok(None);
                }
            }
        }
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let parsed: GetResponse = serde_json::from_slice(&body)?;
        if parsed.found != Some(true) {
            return Ok(None);
        }
        Ok(parsed.source.map(|raw| raw.get().to_string()))
    }

    async fn search(&self, query: &FieldMatch) -> Result<Vec<String>, StoreError> {
        tracing::debug!(
            index = %self.index,
            field = %query.field,
            text = %query.text,
            "submitting async search"
        );
        let mut outcome = self.submit_search(query).await?;
        if outcome.is_running {
            // Without an id the search can be neither polled nor deleted, and
            // its hits are only partial.
            let Some(search_id) = outcome.id.clone() else {
                return Err(StoreError::Decode(
                    "async search still running without an id".to_string(),
                ));
            };
            let polled = self.poll_search(&search_id).await;
            self.discard_search(&search_id).await;
            outcome = polled?;
        }

        let hits = outcome
            .response
            .map(|response| response.hits.hits)
            .unwrap_or_default();
        Ok(hits
            .into_iter()
            .filter_map(|hit| hit.source)
            .map(|raw| raw.get().to_string())
            .collect())
    }

    async fn index(&self, id: &str, document: &Value) -> Result<String, StoreError> {
        let url = self.endpoint(&[self.index.as_str(), "_doc", id])?;
        tracing::debug!(index = %self.index, id = %id, "indexing document");
        let response = self.request(Method::PUT, url).json(document).send().await?;
        let written: IndexResponse = decode_json(response).await?;
        Ok(written.id)
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

fn status_error(status: StatusCode, body: &[u8]) -> StoreError {
    StoreError::Status {
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
