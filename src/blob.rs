//! Chunked retrieval of large binary attributes. The store never promises to
//! hand back a whole payload in one call; we pull bounded blocks against a
//! continuation token and reassemble them.

use std::time::Duration;
use tracing::debug;

use crate::store::{RecordStore, StoreError, StoreResult};

/// Block cap the store documents for block downloads.
pub const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Downloads a binary attribute of arbitrary size.
///
/// The byte cursor advances by the number of bytes actually received, not by
/// the nominal block size, so a short block before the end of the stream does
/// not desync us from the server's cursor. A zero-byte block while bytes
/// remain is a terminal error, never a reason to spin.
#[derive(Debug, Clone)]
pub struct BlobFetcher {
    block_size: u64,
    timeout: Option<Duration>,
}

impl BlobFetcher {
    pub fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            timeout: None,
        }
    }

    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Overall deadline for one fetch, covering every block request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn fetch(
        &self,
        store: &dyn RecordStore,
        entity: &str,
        id: &str,
        attribute: &str,
    ) -> StoreResult<Vec<u8>> {
        self.fetch_with_progress(store, entity, id, attribute, |_, _| {})
            .await
    }

    /// Same as [`fetch`](Self::fetch), reporting `(bytes_so_far, total_bytes)`
    /// after every block.
    pub async fn fetch_with_progress<F>(
        &self,
        store: &dyn RecordStore,
        entity: &str,
        id: &str,
        attribute: &str,
        on_progress: F,
    ) -> StoreResult<Vec<u8>>
    where
        F: Fn(u64, u64) + Send,
    {
        if entity.is_empty() || id.is_empty() || attribute.is_empty() {
            return Err(StoreError::Validation(
                "entity, record id and attribute name are all required".to_string(),
            ));
        }

        match self.timeout {
            Some(limit) => {
                tokio::time::timeout(limit, self.fetch_blocks(store, entity, id, attribute, on_progress))
                    .await
                    .map_err(|_| StoreError::Timeout(limit))?
            }
            None => self.fetch_blocks(store, entity, id, attribute, on_progress).await,
        }
    }

    async fn fetch_blocks<F>(
        &self,
        store: &dyn RecordStore,
        entity: &str,
        id: &str,
        attribute: &str,
        on_progress: F,
    ) -> StoreResult<Vec<u8>>
    where
        F: Fn(u64, u64) + Send,
    {
        let session = store.init_blob_download(entity, id, attribute).await?;
        let total = session.total_size_bytes;
        debug!(entity, id, attribute, total, "starting blob download");

        // The advertised total is remote input; reserve at most one block up
        // front and let the buffer grow with what actually arrives.
        let mut bytes = Vec::with_capacity(total.min(self.block_size) as usize);
        let mut offset = 0u64;
        while offset < total {
            let block = store
                .download_block(&session.continuation_token, offset, self.block_size)
                .await?;
            if block.is_empty() {
                return Err(StoreError::TruncatedBlob {
                    expected: total,
                    received: offset,
                });
            }
            if block.len() as u64 > self.block_size {
                return Err(StoreError::Malformed(format!(
                    "block of {} bytes exceeds the requested {} byte cap",
                    block.len(),
                    self.block_size
                )));
            }
            offset += block.len() as u64;
            bytes.extend_from_slice(&block);
            on_progress(offset, total);
            debug!(offset, total, "downloaded block");
        }

        Ok(bytes)
    }
}

impl Default for BlobFetcher {
    fn default() -> Self {
        Self::new()
    }
}
