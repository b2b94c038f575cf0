//! RecordStore over a JSON REST surface. Connectivity is established once at
//! construction; every later operation trusts that single check instead of
//! re-probing the endpoint.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::{debug, warn};

use super::util::with_retry;
use crate::record::{Record, Value};
use crate::store::{BlobDownload, Query, RecordStore, StoreError, StoreResult};

const RETRIES: usize = 3;
const RETRY_DELAY_MS: u64 = 500;

pub struct HttpRecordStore {
    base_url: String,
    client: Client,
    connected: bool,
}

impl HttpRecordStore {
    /// Pings the store's health endpoint once and remembers the outcome.
    /// A failed check does not error; the store simply reports itself as
    /// disconnected and callers short-circuit to defaults.
    pub async fn connect(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::new();

        let health_url = format!("{base_url}/api/health");
        let connected = match client.get(&health_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "record store health check failed");
                false
            }
        };
        if connected {
            debug!(base_url, "record store connection established");
        }

        Self {
            base_url,
            client,
            connected,
        }
    }

    /// Builds an endpoint URL with each segment percent-encoded, so record
    /// ids or tokens containing `/`, `?` or spaces cannot reroute a request.
    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::Transport(format!("invalid store base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport("store base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport(e: reqwest::Error) -> StoreError {
        StoreError::Transport(e.to_string())
    }

    fn unexpected_status(response: &Response) -> StoreError {
        StoreError::Transport(format!(
            "unexpected status {} from {}",
            response.status(),
            response.url()
        ))
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> StoreResult<T> {
        let text = response.text().await.map_err(Self::transport)?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, response = %text, "failed to parse store response");
            StoreError::Malformed(e.to_string())
        })
    }

    /// Extracts the store's validation message from a rejected write.
    async fn validation_error(response: Response) -> StoreError {
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        StoreError::Validation(message)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlobInitRequest<'a> {
    entity: &'a str,
    id: &'a str,
    attribute: &'a str,
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Record>> {
        let url = self.endpoint(&["api", "query"])?;
        // Read-only despite the POST; safe to retry
        let response = with_retry(
            || async { self.client.post(url.clone()).json(query).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::unexpected_status(&response));
        }
        let body: QueryResponse = Self::decode(response).await?;
        Ok(body.records)
    }

    async fn retrieve(
        &self,
        entity: &str,
        id: &str,
        columns: &[&str],
    ) -> StoreResult<Option<Record>> {
        let mut url = self.endpoint(&["api", "record", entity, id])?;
        url.query_pairs_mut()
            .append_pair("columns", &columns.join(","));
        let response = with_retry(
            || async { self.client.get(url.clone()).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(Self::transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::decode(response).await?)),
            _ => Err(Self::unexpected_status(&response)),
        }
    }

    async fn create(&self, entity: &str, fields: Vec<(String, Value)>) -> StoreResult<String> {
        let url = self.endpoint(&["api", "record", entity])?;
        let mut body = Map::new();
        for (attribute, value) in fields {
            body.insert(attribute, serde_json::to_value(value).map_err(|e| {
                StoreError::Malformed(e.to_string())
            })?);
        }
        let payload = serde_json::json!({ "fields": body });

        // Writes are never retried
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(Self::transport)?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(Self::validation_error(response).await)
            }
            status if status.is_success() => {
                let body: CreateResponse = Self::decode(response).await?;
                Ok(body.id)
            }
            _ => Err(Self::unexpected_status(&response)),
        }
    }

    async fn init_blob_download(
        &self,
        entity: &str,
        id: &str,
        attribute: &str,
    ) -> StoreResult<BlobDownload> {
        let url = self.endpoint(&["api", "blob", "init"])?;
        let request = BlobInitRequest {
            entity,
            id,
            attribute,
        };
        let response = with_retry(
            || async { self.client.post(url.clone()).json(&request).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(Self::transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                entity: entity.to_string(),
                id: id.to_string(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY => {
                Err(StoreError::MissingAttribute(attribute.to_string()))
            }
            status if status.is_success() => Self::decode(response).await,
            _ => Err(Self::unexpected_status(&response)),
        }
    }

    async fn download_block(
        &self,
        continuation_token: &str,
        offset: u64,
        max_len: u64,
    ) -> StoreResult<Vec<u8>> {
        let mut url = self.endpoint(&["api", "blob", "block"])?;
        url.query_pairs_mut()
            .append_pair("token", continuation_token)
            .append_pair("offset", &offset.to_string())
            .append_pair("maxLength", &max_len.to_string());
        let response = with_retry(
            || async { self.client.get(url.clone()).send().await },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(Self::transport)?;

        if !response.status().is_success() {
            return Err(Self::unexpected_status(&response));
        }
        let bytes = response.bytes().await.map_err(Self::transport)?;
        Ok(bytes.to_vec())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
