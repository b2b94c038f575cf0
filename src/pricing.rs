//! Best-effort EUR/CHF price resolution. Price-list entries do not reliably
//! carry a clean ISO code, so the currency of an entry is worked out from the
//! currency record itself, then from free-text display names.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::catalog::Product;
use crate::record::Record;
use crate::store::{Query, RecordStore, StoreResult};

/// The two currencies the portal displays. Everything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Currency {
    Eur,
    Chf,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Chf => "CHF",
        }
    }

    /// Maps a raw currency label to a canonical currency, accepting both ISO
    /// codes and free-text names ("Euro", "Swiss Franc", "Tarif CHF").
    /// Exact code matches win; otherwise EUR spellings are probed before CHF.
    pub fn normalize(raw: &str) -> Option<Self> {
        let label = raw.trim();
        if label.is_empty() {
            return None;
        }
        if label.eq_ignore_ascii_case("EUR") {
            return Some(Currency::Eur);
        }
        if label.eq_ignore_ascii_case("CHF") {
            return Some(Currency::Chf);
        }
        let label = label.to_lowercase();
        if label.contains("eur") {
            // also covers "euro"
            return Some(Currency::Eur);
        }
        if label.contains("chf") || label.contains("franc") {
            return Some(Currency::Chf);
        }
        None
    }
}

/// Resolves unit prices for a batch of products from the store's flat
/// price-list table. Currency-id lookups go through a shared process-lifetime
/// cache; a currency that resolves to "neither EUR nor CHF" is cached as
/// unresolvable and never retried.
pub struct PriceResolver {
    store: Arc<dyn RecordStore>,
    codes: Cache<String, Option<Currency>>,
}

impl PriceResolver {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_cache(store, Cache::new())
    }

    /// Use an externally owned cache, e.g. one shared between resolvers.
    pub fn with_cache(store: Arc<dyn RecordStore>, codes: Cache<String, Option<Currency>>) -> Self {
        Self { store, codes }
    }

    /// Canonical currency for a currency record id. A cached `None` is a
    /// final answer; transient store failures are logged and *not* cached so
    /// a later pass may still succeed.
    pub async fn resolve_currency_code(&self, currency_id: &str) -> Option<Currency> {
        if let Some(cached) = self.codes.get(&currency_id.to_string()).await {
            return cached;
        }

        let record = match self
            .store
            .retrieve("transactioncurrency", currency_id, &["isocurrencycode"])
            .await
        {
            Ok(record) => record,
            Err(e) => {
                debug!(currency_id, error = %e, "currency lookup failed; code left unresolved");
                return None;
            }
        };

        let code = record
            .as_ref()
            .and_then(|r| r.text("isocurrencycode"))
            .and_then(Currency::normalize);
        self.codes.put(currency_id.to_string(), code).await;
        code
    }

    /// Attaches EUR and CHF unit prices to `products` by scanning the whole
    /// price-list table and cross-referencing in memory.
    ///
    /// First match wins per (product, currency); a price once set is never
    /// overwritten, which also makes the pass idempotent. A disconnected
    /// store is a no-op; a failed table scan aborts with an error and leaves
    /// whatever was already resolved in place.
    pub async fn populate_prices(&self, products: &mut [Product]) -> StoreResult<()> {
        if !self.store.is_connected() {
            warn!("record store is not connected; prices left unresolved");
            return Ok(());
        }

        // First occurrence wins for duplicate ids; blank ids are skipped.
        let mut index: HashMap<String, usize> = HashMap::new();
        for (slot, product) in products.iter().enumerate() {
            if product.id.is_empty() {
                continue;
            }
            index.entry(product.id.clone()).or_insert(slot);
        }

        let query = Query::new("productpricelevel").columns(&[
            "productid",
            "amount",
            "transactioncurrencyid",
            "pricelevelid",
        ]);
        let entries = self.store.query(&query).await?;
        debug!(count = entries.len(), "scanning price-list entries");

        for entry in &entries {
            let Some(product_ref) = entry.reference("productid") else {
                continue;
            };
            let Some(&slot) = index.get(product_ref.id.as_str()) else {
                continue;
            };
            let Some(amount) = entry.money("amount") else {
                continue;
            };

            let product = &mut products[slot];
            match self.entry_currency(entry).await {
                Some(Currency::Eur) if product.price_eur.is_none() => {
                    product.price_eur = Some(amount);
                }
                Some(Currency::Chf) if product.price_chf.is_none() => {
                    product.price_chf = Some(amount);
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Currency of one price-list entry, in order of trust: the currency
    /// record's ISO code, the currency reference's display name, and finally
    /// the price-level display name.
    async fn entry_currency(&self, entry: &Record) -> Option<Currency> {
        if let Some(currency_ref) = entry.reference("transactioncurrencyid") {
            if let Some(code) = self.resolve_currency_code(&currency_ref.id).await {
                return Some(code);
            }
            if let Some(code) = currency_ref.name.as_deref().and_then(Currency::normalize) {
                return Some(code);
            }
        }
        entry
            .reference("pricelevelid")
            .and_then(|level| level.name.as_deref())
            .and_then(Currency::normalize)
    }
}
