use std::fs;
use std::sync::Arc;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A store endpoint with a healthy health route and one child product
    /// priced at 99.90 EUR through currency c1.
    pub async fn create_store_server() -> MockServer {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/query"))
            .and(body_partial_json(serde_json::json!({ "entity": "product" })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "records": [
                        {
                            "entity": "product",
                            "id": "p1",
                            "attributes": {
                                "name": { "kind": "text", "value": "Widget" },
                                "productnumber": { "kind": "text", "value": "W-100" },
                                "parentproductid": {
                                    "kind": "ref",
                                    "value": { "id": "p0", "name": "Widgets" }
                                }
                            }
                        }
                    ]
                }"#,
            ))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/query"))
            .and(body_partial_json(
                serde_json::json!({ "entity": "productpricelevel" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "records": [
                        {
                            "entity": "productpricelevel",
                            "id": "e1",
                            "attributes": {
                                "productid": {
                                    "kind": "ref",
                                    "value": { "id": "p1" }
                                },
                                "amount": { "kind": "money", "value": "99.90" },
                                "transactioncurrencyid": {
                                    "kind": "ref",
                                    "value": { "id": "c1" }
                                }
                            }
                        }
                    ]
                }"#,
            ))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/query"))
            .and(body_partial_json(
                serde_json::json!({ "entity": "transactioncurrency" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{ "records": [] }"#))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/record/transactioncurrency/c1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{
                    "entity": "transactioncurrency",
                    "id": "c1",
                    "attributes": {
                        "isocurrencycode": { "kind": "text", "value": "eur" }
                    }
                }"#,
            ))
            .mount(&server)
            .await;

        server
    }

    pub fn write_config(server_uri: &str) -> tempfile::NamedTempFile {
        let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        let config_content = format!("store:\n  base_url: \"{server_uri}\"\n");
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
        config_file
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock_store() {
    let server = test_utils::create_store_server().await;
    let config_file = test_utils::write_config(&server.uri());

    let result = crmlink::run_command(
        crmlink::AppCommand::Products {
            parents: false,
            new_only: false,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    assert!(
        result.is_ok(),
        "Products command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_catalog_resolves_prices_end_to_end() {
    use crmlink::catalog::Catalog;
    use crmlink::providers::http::HttpRecordStore;
    use crmlink::store::RecordStore;

    let server = test_utils::create_store_server().await;
    let store = HttpRecordStore::connect(&server.uri()).await;
    assert!(store.is_connected());

    let catalog = Catalog::new(Arc::new(store));
    let products = catalog.child_products().await.unwrap();

    info!(?products, "catalog listing");
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].number, "W-100");
    assert_eq!(products[0].category, "Widgets");
    assert_eq!(products[0].price_eur, Some("99.90".parse().unwrap()));
    assert_eq!(products[0].price_chf, None);
}

#[test_log::test(tokio::test)]
async fn test_image_download_end_to_end() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let server = test_utils::create_store_server().await;
    let image: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();

    Mock::given(method("POST"))
        .and(path("/api/blob/init"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{ "totalSizeBytes": {}, "continuationToken": "tok-1" }}"#,
            image.len()
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/blob/block"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image.clone()))
        .mount(&server)
        .await;

    let config_file = test_utils::write_config(&server.uri());
    let output_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let output_path = output_dir.path().join("p1.jpg");

    let result = crmlink::run_command(
        crmlink::AppCommand::Image {
            product_id: "p1".to_string(),
            output: Some(output_path.to_str().unwrap().to_string()),
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    assert!(result.is_ok(), "Image command failed: {:?}", result.err());
    let written = fs::read(&output_path).expect("image file was not written");
    assert_eq!(written, image);
}

#[test_log::test(tokio::test)]
async fn test_unreachable_store_renders_empty_catalog() {
    // No health route at all: the store reads as disconnected and the
    // command still completes with an empty listing.
    let server = wiremock::MockServer::start().await;
    let config_file = test_utils::write_config(&server.uri());

    let result = crmlink::run_command(
        crmlink::AppCommand::Products {
            parents: false,
            new_only: false,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;

    assert!(result.is_ok(), "disconnected store must not fail the command");
}
