//! Catalog views over the record store: product listings with resolved
//! prices, currency options, product images and quote inquiries.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use crate::blob::BlobFetcher;
use crate::pricing::PriceResolver;
use crate::record::{EntityRef, Record, Value};
use crate::store::{Criteria, Operator, Query, RecordStore, SortOrder, StoreError, StoreResult};

/// Binary attribute holding the product image on `product` records.
pub const PRODUCT_IMAGE_ATTRIBUTE: &str = "entityimage";

const PRODUCT_COLUMNS: [&str; 4] = ["name", "productnumber", "parentproductid", "isnewproduct"];

/// Catalog view model for one product. Prices stay `None` until the resolver
/// finds a matching price-list entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub number: String,
    pub category: String,
    pub is_new: bool,
    pub price_eur: Option<Decimal>,
    pub price_chf: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyOption {
    pub id: String,
    pub name: String,
}

pub struct Catalog {
    store: Arc<dyn RecordStore>,
    resolver: PriceResolver,
    fetcher: BlobFetcher,
}

impl Catalog {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            resolver: PriceResolver::new(Arc::clone(&store)),
            fetcher: BlobFetcher::new(),
            store,
        }
    }

    pub fn with_fetcher(mut self, fetcher: BlobFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Active products that belong to a parent category.
    pub async fn child_products(&self) -> StoreResult<Vec<Product>> {
        let criteria = Criteria::all()
            .condition("statecode", Operator::Eq { value: Value::Int(0) })
            .condition("parentproductid", Operator::NotNull);
        self.products_matching(criteria).await
    }

    /// Active top-level products, shown as categories of their own.
    pub async fn parent_products(&self) -> StoreResult<Vec<Product>> {
        let criteria = Criteria::all()
            .condition("statecode", Operator::Eq { value: Value::Int(0) })
            .condition("parentproductid", Operator::Null);
        self.products_matching(criteria).await
    }

    /// Active products flagged as new arrivals.
    pub async fn new_products(&self) -> StoreResult<Vec<Product>> {
        let criteria = Criteria::all()
            .condition("statecode", Operator::Eq { value: Value::Int(0) })
            .condition("isnewproduct", Operator::Eq { value: Value::Bool(true) });
        self.products_matching(criteria).await
    }

    async fn products_matching(&self, criteria: Criteria) -> StoreResult<Vec<Product>> {
        if !self.store.is_connected() {
            return Err(StoreError::NotConnected);
        }
        let query = Query::new("product")
            .columns(&PRODUCT_COLUMNS)
            .criteria(criteria);
        let records = self.store.query(&query).await?;
        let mut products: Vec<Product> = records.iter().map(map_product).collect();

        // Missing prices render as N/A; they never fail a listing.
        if let Err(e) = self.resolver.populate_prices(&mut products).await {
            warn!(error = %e, "price resolution failed; listing returned without full pricing");
        }
        Ok(products)
    }

    /// Case-insensitive lookup by product number, child products first.
    pub async fn find_product(&self, number: &str) -> StoreResult<Option<Product>> {
        let key = number.trim();
        if key.is_empty() {
            return Ok(None);
        }
        for batch in [self.child_products().await?, self.parent_products().await?] {
            let found = batch
                .into_iter()
                .find(|p| p.number.trim().eq_ignore_ascii_case(key));
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Currency options offered on the inquiry form.
    pub async fn currencies(&self) -> StoreResult<Vec<CurrencyOption>> {
        if !self.store.is_connected() {
            return Err(StoreError::NotConnected);
        }
        let query = Query::new("transactioncurrency")
            .columns(&["currencyname", "isocurrencycode"])
            .order_by("currencyname", SortOrder::Ascending);
        let records = self.store.query(&query).await?;
        Ok(records
            .iter()
            .map(|record| CurrencyOption {
                id: record.id.clone(),
                name: record
                    .text("currencyname")
                    .or_else(|| record.text("isocurrencycode"))
                    .unwrap_or(&record.id)
                    .to_string(),
            })
            .collect())
    }

    /// Full-resolution product image, or `None` when the product has none.
    /// Only genuine store failures surface as errors.
    pub async fn product_image(&self, product_id: &str) -> StoreResult<Option<Vec<u8>>> {
        self.product_image_with_progress(product_id, |_, _| {}).await
    }

    pub async fn product_image_with_progress<F>(
        &self,
        product_id: &str,
        on_progress: F,
    ) -> StoreResult<Option<Vec<u8>>>
    where
        F: Fn(u64, u64) + Send,
    {
        if !self.store.is_connected() {
            return Err(StoreError::NotConnected);
        }
        let fetched = self
            .fetcher
            .fetch_with_progress(
                self.store.as_ref(),
                "product",
                product_id,
                PRODUCT_IMAGE_ATTRIBUTE,
                on_progress,
            )
            .await;
        match fetched {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(StoreError::NotFound { .. }) | Err(StoreError::MissingAttribute(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Files a quote inquiry as an opportunity linked to the contact, the
    /// product and the requested currency. Returns the new opportunity id.
    pub async fn create_inquiry(
        &self,
        contact_id: &str,
        product_id: &str,
        currency_id: &str,
        topic: &str,
        description: &str,
    ) -> StoreResult<String> {
        if !self.store.is_connected() {
            return Err(StoreError::NotConnected);
        }
        if topic.trim().is_empty() {
            return Err(StoreError::Validation("a topic is required".to_string()));
        }
        if contact_id.is_empty() || product_id.is_empty() {
            return Err(StoreError::Validation(
                "contact and product are required".to_string(),
            ));
        }

        let mut fields = vec![
            ("name".to_string(), Value::Text(topic.trim().to_string())),
            (
                "parentcontactid".to_string(),
                Value::Ref(EntityRef::new(contact_id)),
            ),
            ("productid".to_string(), Value::Ref(EntityRef::new(product_id))),
        ];
        if !currency_id.is_empty() {
            fields.push((
                "transactioncurrencyid".to_string(),
                Value::Ref(EntityRef::new(currency_id)),
            ));
        }
        let description = description.trim();
        if !description.is_empty() {
            fields.push(("description".to_string(), Value::Text(description.to_string())));
        }

        self.store.create("opportunity", fields).await
    }
}

fn map_product(record: &Record) -> Product {
    Product {
        id: record.id.clone(),
        name: record.text("name").unwrap_or("Unnamed").to_string(),
        number: record.text("productnumber").unwrap_or("N/A").to_string(),
        category: record
            .reference("parentproductid")
            .and_then(|parent| parent.name.clone())
            .unwrap_or_else(|| "Uncategorized".to_string()),
        is_new: record.boolean("isnewproduct").unwrap_or(false),
        price_eur: None,
        price_chf: None,
    }
}
