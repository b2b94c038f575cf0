//! The record store surface: query model, error taxonomy and the async trait
//! every backend implements. The store itself is an external system; this
//! crate only ever talks to it through [`RecordStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::record::{Record, Value};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store is not connected")]
    NotConnected,
    #[error("{entity} record {id} not found")]
    NotFound { entity: String, id: String },
    #[error("attribute {0} is missing or not downloadable")]
    MissingAttribute(String),
    #[error("blob stream ended after {received} of {expected} bytes")]
    TruncatedBlob { expected: u64, received: u64 },
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A single predicate on one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operator {
    Eq { value: Value },
    Null,
    NotNull,
    In { values: Vec<Value> },
    Between { low: Value, high: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    #[serde(flatten)]
    pub operator: Operator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    And,
    Or,
}

/// Conditions joined by a single logical operator. Nested filters are not
/// part of this surface; the portal never needed them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub combine: Combine,
    pub conditions: Vec<Condition>,
}

impl Criteria {
    pub fn all() -> Self {
        Self {
            combine: Combine::And,
            conditions: Vec::new(),
        }
    }

    pub fn any() -> Self {
        Self {
            combine: Combine::Or,
            conditions: Vec::new(),
        }
    }

    pub fn condition(mut self, attribute: &str, operator: Operator) -> Self {
        self.conditions.push(Condition {
            attribute: attribute.to_string(),
            operator,
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub attribute: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub entity: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(entity: &str) -> Self {
        Self {
            entity: entity.to_string(),
            columns: Vec::new(),
            criteria: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn criteria(mut self, criteria: Criteria) -> Self {
        self.criteria = Some(criteria);
        self
    }

    pub fn order_by(mut self, attribute: &str, order: SortOrder) -> Self {
        self.order_by.push(OrderBy {
            attribute: attribute.to_string(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Handle for an in-progress large-object download. Lives only for the
/// duration of one fetch; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobDownload {
    pub total_size_bytes: u64,
    pub continuation_token: String,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, query: &Query) -> StoreResult<Vec<Record>>;

    /// Not-found is not an error; it reads as `Ok(None)`.
    async fn retrieve(
        &self,
        entity: &str,
        id: &str,
        columns: &[&str],
    ) -> StoreResult<Option<Record>>;

    /// Returns the new record id. Rejected writes surface as
    /// [`StoreError::Validation`] with the store's message.
    async fn create(&self, entity: &str, fields: Vec<(String, Value)>) -> StoreResult<String>;

    async fn init_blob_download(
        &self,
        entity: &str,
        id: &str,
        attribute: &str,
    ) -> StoreResult<BlobDownload>;

    async fn download_block(
        &self,
        continuation_token: &str,
        offset: u64,
        max_len: u64,
    ) -> StoreResult<Vec<u8>>;

    fn is_connected(&self) -> bool;
}
