use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatkeep::catalog::{CatalogModel, ModelCatalogClient};
use chatkeep::config::CatalogConfig;
use chatkeep::ChatkeepError;

fn client_for(server: &MockServer) -> ModelCatalogClient {
    let config = CatalogConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    ModelCatalogClient::new(config).unwrap()
}

fn models_body() -> serde_json::Value {
    json!({
        "object": "list",
        "data": [
            { "id": "qwen2.5-7b-instruct", "object": "model", "owned_by": "organization_owner" },
            { "id": "text-embedding-nomic-embed-text-v1.5", "object": "model" }
        ]
    })
}

#[tokio::test]
async fn test_fetch_models_maps_ids_to_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_body()))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = client_for(&server);
    catalog.fetch_models().await;

    assert_eq!(
        catalog.models(),
        vec![
            CatalogModel {
                id: "qwen2.5-7b-instruct".to_string(),
                name: "qwen2.5-7b-instruct".to_string(),
            },
            CatalogModel {
                id: "text-embedding-nomic-embed-text-v1.5".to_string(),
                name: "text-embedding-nomic-embed-text-v1.5".to_string(),
            },
        ]
    );
    assert!(!catalog.is_loading());
    assert!(catalog.last_error().is_none());
}

#[tokio::test]
async fn test_fetch_models_server_error_keeps_previous_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model server busy"))
        .mount(&server)
        .await;

    let catalog = client_for(&server);
    catalog.fetch_models().await;
    assert_eq!(catalog.models().len(), 2);

    catalog.fetch_models().await;

    assert_eq!(catalog.models().len(), 2);
    let error = catalog.last_error().expect("error recorded");
    assert!(error.contains("503"));
    assert!(!catalog.is_loading());
}

#[tokio::test]
async fn test_fetch_models_success_clears_previous_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_body()))
        .mount(&server)
        .await;

    let catalog = client_for(&server);
    catalog.fetch_models().await;
    assert!(catalog.last_error().is_some());

    catalog.fetch_models().await;
    assert!(catalog.last_error().is_none());
    assert_eq!(catalog.models().len(), 2);
}

#[tokio::test]
async fn test_list_models_malformed_body_is_catalog_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;

    let catalog = client_for(&server);
    let err = catalog.list_models().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ChatkeepError>(),
        Some(ChatkeepError::Catalog(_))
    ));
    // The propagating form leaves observable state alone
    assert!(catalog.last_error().is_none());
}

#[tokio::test]
async fn test_fetch_models_empty_list_replaces_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(models_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let catalog = client_for(&server);
    catalog.fetch_models().await;
    catalog.fetch_models().await;

    assert!(catalog.models().is_empty());
    assert!(catalog.last_error().is_none());
}
