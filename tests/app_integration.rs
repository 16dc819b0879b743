use axum::body::Body;
use axum::http::Request;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use ratehub::api::{AppState, app_router};
use ratehub::build_aggregator;
use ratehub::core::config::AppConfig;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const CURRENCYLAYER_JSON: &str = r#"{
        "success": true,
        "source": "USD",
        "timestamp": 1704067200,
        "quotes": {"USDRUB": 91.25, "USDEUR": 0.9063}
    }"#;

    pub const CURRENCYAPI_JSON: &str = r#"{
        "meta": {"last_updated_at": "2024-01-01T00:00:00Z"},
        "data": {
            "EUR": {"code": "EUR", "value": 0.9123},
            "RUB": {"code": "RUB", "value": 90.04}
        }
    }"#;

    pub async fn mock_currencylayer(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/live"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn mock_currencyapi(template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/latest"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }
}

fn write_config(
    dir: &Path,
    currencylayer_url: &str,
    currencyapi_url: &str,
    db_path: &Path,
) -> AppConfig {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
server:
  address: "127.0.0.1:0"
database:
  path: "{}"
sources:
  currencylayer:
    api_key: "test-key"
    base_url: "{}"
  currencyapi:
    api_key: "test-key"
    base_url: "{}"
fetch_timeout_secs: 5
"#,
        db_path.display(),
        currencylayer_url,
        currencyapi_url,
    );
    fs::write(&config_path, &config_content).expect("Failed to write config file");
    AppConfig::load_from_path(&config_path).expect("Failed to load config")
}

async fn request_rates(app: axum::Router) -> (axum::http::StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).expect("Response body should be JSON");
    (status, json)
}

fn row_count(db_path: &Path) -> i64 {
    let conn = rusqlite::Connection::open(db_path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM rates", [], |row| row.get(0))
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_full_flow_merges_and_persists() {
    use wiremock::ResponseTemplate;

    let currencylayer = test_utils::mock_currencylayer(
        ResponseTemplate::new(200).set_body_string(test_utils::CURRENCYLAYER_JSON),
    )
    .await;
    let currencyapi = test_utils::mock_currencyapi(
        ResponseTemplate::new(200).set_body_string(test_utils::CURRENCYAPI_JSON),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rates.db");
    let config = write_config(dir.path(), &currencylayer.uri(), &currencyapi.uri(), &db_path);

    let state = AppState {
        aggregator: Arc::new(build_aggregator(&config).unwrap()),
    };

    let (status, json) = request_rates(app_router(state.clone())).await;
    assert_eq!(status, 200);

    let rates = json["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 4);
    for rate in rates {
        assert_eq!(rate["from"], "USD");
        assert!(rate["rate"].as_f64().unwrap() > 0.0);
        assert_eq!(rate["updatedAt"], "2024-01-01T00:00:00Z");
    }
    let by_source = |source: &str| {
        rates
            .iter()
            .filter(|r| r["source"] == source)
            .count()
    };
    assert_eq!(by_source("currencylayer"), 2);
    assert_eq!(by_source("currencyapi"), 2);

    // Each successful batch lands in the observation log.
    assert_eq!(row_count(&db_path), 4);

    // A second round re-fetches and appends; the log only ever grows.
    let (status, json) = request_rates(app_router(state)).await;
    assert_eq!(status, 200);
    assert_eq!(json["rates"].as_array().unwrap().len(), 4);
    assert_eq!(row_count(&db_path), 8);
}

#[test_log::test(tokio::test)]
async fn test_failing_source_is_excluded_from_response() {
    use wiremock::ResponseTemplate;

    let currencylayer = test_utils::mock_currencylayer(ResponseTemplate::new(500)).await;
    let currencyapi = test_utils::mock_currencyapi(
        ResponseTemplate::new(200).set_body_string(test_utils::CURRENCYAPI_JSON),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rates.db");
    let config = write_config(dir.path(), &currencylayer.uri(), &currencyapi.uri(), &db_path);

    let state = AppState {
        aggregator: Arc::new(build_aggregator(&config).unwrap()),
    };

    let (status, json) = request_rates(app_router(state)).await;
    assert_eq!(status, 200);

    let rates = json["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert!(rates.iter().all(|r| r["source"] == "currencyapi"));

    // Only the surviving batch is persisted.
    assert_eq!(row_count(&db_path), 2);
}

#[test_log::test(tokio::test)]
async fn test_all_sources_failing_yields_empty_snapshot() {
    use wiremock::ResponseTemplate;

    let currencylayer = test_utils::mock_currencylayer(ResponseTemplate::new(502)).await;
    let currencyapi =
        test_utils::mock_currencyapi(ResponseTemplate::new(200).set_body_string("not json")).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rates.db");
    let config = write_config(dir.path(), &currencylayer.uri(), &currencyapi.uri(), &db_path);

    let state = AppState {
        aggregator: Arc::new(build_aggregator(&config).unwrap()),
    };

    let (status, json) = request_rates(app_router(state)).await;
    assert_eq!(status, 200);
    assert_eq!(json, serde_json::json!({"rates": []}));
    assert_eq!(row_count(&db_path), 0);
}

#[test_log::test(tokio::test)]
async fn test_provider_reported_failure_is_excluded() {
    use wiremock::ResponseTemplate;

    let failure_json = r#"{"success": false, "error": {"code": 104}}"#;
    let currencylayer = test_utils::mock_currencylayer(
        ResponseTemplate::new(200).set_body_string(failure_json),
    )
    .await;
    let currencyapi = test_utils::mock_currencyapi(
        ResponseTemplate::new(200).set_body_string(test_utils::CURRENCYAPI_JSON),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("rates.db");
    let config = write_config(dir.path(), &currencylayer.uri(), &currencyapi.uri(), &db_path);

    let state = AppState {
        aggregator: Arc::new(build_aggregator(&config).unwrap()),
    };

    let (status, json) = request_rates(app_router(state)).await;
    assert_eq!(status, 200);

    let rates = json["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 2);
    assert!(rates.iter().all(|r| r["source"] == "currencyapi"));
}
