pub mod blob;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod log;
pub mod pricing;
pub mod providers;
pub mod record;
pub mod store;
pub mod ui;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::blob::BlobFetcher;
use crate::catalog::Catalog;
use crate::providers::http::HttpRecordStore;
use crate::store::{Query, RecordStore};

pub enum AppCommand {
    Products { parents: bool, new_only: bool },
    Image { product_id: String, output: Option<String> },
    Currencies,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("crmlink starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store: Arc<dyn RecordStore> =
        Arc::new(HttpRecordStore::connect(&config.store.base_url).await);
    spawn_health_probe(Arc::clone(&store));

    let mut fetcher = BlobFetcher::new().with_block_size(config.download.block_size);
    if let Some(secs) = config.download.timeout_secs {
        fetcher = fetcher.with_timeout(Duration::from_secs(secs));
    }
    let catalog = Catalog::new(Arc::clone(&store)).with_fetcher(fetcher);

    match command {
        AppCommand::Products { parents, new_only } => {
            let listing = if parents {
                catalog.parent_products().await
            } else if new_only {
                catalog.new_products().await
            } else {
                catalog.child_products().await
            };
            // Store failures render as an empty catalog, never as a crash.
            let products = match listing {
                Ok(products) => products,
                Err(e) => {
                    warn!(error = %e, "product listing failed");
                    Vec::new()
                }
            };
            if products.is_empty() {
                println!("{}", ui::subtle_text("No products available."));
            } else {
                println!("{}", ui::products_table(&products));
            }
            Ok(())
        }
        AppCommand::Currencies => {
            let currencies = match catalog.currencies().await {
                Ok(currencies) => currencies,
                Err(e) => {
                    warn!(error = %e, "currency listing failed");
                    Vec::new()
                }
            };
            if currencies.is_empty() {
                println!("{}", ui::subtle_text("No currencies available."));
            } else {
                println!("{}", ui::currencies_table(&currencies));
            }
            Ok(())
        }
        AppCommand::Image { product_id, output } => {
            let bar = ui::new_download_bar();
            let fetched = catalog
                .product_image_with_progress(&product_id, |done, total| {
                    bar.set_length(total);
                    bar.set_position(done);
                })
                .await;
            bar.finish_and_clear();

            match fetched {
                Ok(Some(bytes)) => {
                    let path = output.unwrap_or_else(|| format!("{product_id}.jpg"));
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write image to {path}"))?;
                    println!("Saved {} bytes to {path}", bytes.len());
                }
                Ok(None) => {
                    println!("{}", ui::subtle_text("No image for this product."));
                }
                Err(e) => {
                    warn!(error = %e, product_id, "image download failed");
                    println!("{}", ui::error_text("Image download failed."));
                }
            }
            Ok(())
        }
    }
}

/// Fire-and-forget startup probe. Command handling never waits on it; it only
/// leaves a log line about the store's responsiveness.
fn spawn_health_probe(store: Arc<dyn RecordStore>) {
    tokio::spawn(async move {
        if !store.is_connected() {
            warn!("record store is unreachable; commands will render empty results");
            return;
        }
        let probe = Query::new("transactioncurrency")
            .columns(&["isocurrencycode"])
            .limit(1);
        match store.query(&probe).await {
            Ok(records) => {
                info!(count = records.len(), "record store responded to startup probe");
            }
            Err(e) => warn!(error = %e, "record store startup probe failed"),
        }
    });
}
