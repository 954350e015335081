//! Integration tests for the archive client against a stubbed provider.

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use meteo_core::{ArchiveClient, ArchiveError, ArchiveQuery, DailyMetric, ShapeError, TemperatureUnit};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Three February days over Manhattan, the scenario from the original
/// data pull.
fn nyc_query(metrics: Vec<DailyMetric>) -> ArchiveQuery {
    ArchiveQuery::new(
        40.7128,
        -74.0060,
        date(2016, 2, 15),
        date(2016, 2, 17),
        metrics,
        TemperatureUnit::Fahrenheit,
        "America/New_York",
    )
    .expect("query should be valid")
}

fn three_day_body() -> serde_json::Value {
    json!({
        "daily": {
            "time": ["2016-02-15", "2016-02-16", "2016-02-17"],
            "temperature_2m_max": [30.1, 41.0, 52.3],
            "temperature_2m_min": [2.5, 25.2, 38.1]
        }
    })
}

fn client_for(server: &MockServer) -> ArchiveClient {
    ArchiveClient::new().with_base_url(server.uri())
}

#[tokio::test]
async fn fetch_returns_one_record_per_day_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("latitude", "40.7128"))
        .and(query_param("start_date", "2016-02-15"))
        .and(query_param("end_date", "2016-02-17"))
        .and(query_param("daily", "temperature_2m_max,temperature_2m_min"))
        .and(query_param("temperature_unit", "fahrenheit"))
        .and(query_param("timezone", "America/New_York"))
        .respond_with(ResponseTemplate::new(200).set_body_json(three_day_body()))
        .expect(1)
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax, DailyMetric::TemperatureMin]);
    let archive = client_for(&server).fetch(&query).await.expect("fetch should succeed");

    assert_eq!(archive.query, query);
    assert_eq!(archive.records.len(), 3);
    assert_eq!(
        archive.records.iter().map(|r| r.date).collect::<Vec<_>>(),
        vec![date(2016, 2, 15), date(2016, 2, 16), date(2016, 2, 17)]
    );
    assert_eq!(archive.records[0].temperature_2m_max, Some(30.1));
    assert_eq!(archive.records[2].temperature_2m_min, Some(38.1));
}

#[tokio::test]
async fn identical_queries_yield_equal_archives() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(three_day_body()))
        .expect(2)
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax, DailyMetric::TemperatureMin]);
    let client = client_for(&server);

    let first = client.fetch(&query).await.expect("first fetch should succeed");
    let second = client.fetch(&query).await.expect("second fetch should succeed");

    assert_eq!(first, second);
}

#[tokio::test]
async fn provider_outage_is_a_retryable_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = client_for(&server).fetch(&query).await.unwrap_err();

    match err {
        ArchiveError::Provider { status, retryable, .. } => {
            assert_eq!(status.as_u16(), 503);
            assert!(retryable);
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn bad_request_passes_reason_through_and_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": true,
            "reason": "Latitude must be in range of -90 to 90"
        })))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = client_for(&server).fetch(&query).await.unwrap_err();

    assert!(!err.is_retryable());
    match err {
        ArchiveError::Provider { message, .. } => {
            assert_eq!(message, "Latitude must be in range of -90 to 90");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn truncated_payload_is_malformed_not_a_short_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": {
                "time": ["2016-02-15", "2016-02-16"],
                "temperature_2m_max": [30.1, 41.0]
            }
        })))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = client_for(&server).fetch(&query).await.unwrap_err();

    match err {
        ArchiveError::MalformedResponse(ShapeError::LengthMismatch {
            name: "time",
            expected: 3,
            actual: 2,
        }) => {}
        other => panic!("expected length mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn date_gap_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": {
                "time": ["2016-02-15", "2016-02-17", "2016-02-18"],
                "temperature_2m_max": [30.1, 41.0, 52.3]
            }
        })))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = client_for(&server).fetch(&query).await.unwrap_err();

    assert!(matches!(
        err,
        ArchiveError::MalformedResponse(ShapeError::DateOutOfSequence { index: 1, .. })
    ));
}

#[tokio::test]
async fn zero_day_payload_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": { "time": [], "temperature_2m_max": [] }
        })))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = client_for(&server).fetch(&query).await.unwrap_err();

    assert!(matches!(
        err,
        ArchiveError::MalformedResponse(ShapeError::Empty)
    ));
}

#[tokio::test]
async fn null_sunrise_is_explicit_absence() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "daily": {
                "time": ["2016-02-15", "2016-02-16", "2016-02-17"],
                "sunrise": [null, "2016-02-16T06:44", "2016-02-17T06:42"]
            }
        })))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::Sunrise]);
    let archive = client_for(&server).fetch(&query).await.expect("fetch should succeed");

    assert_eq!(archive.records[0].sunrise, None);
    assert_eq!(
        archive.records[1].sunrise,
        Some(date(2016, 2, 16).and_hms_opt(6, 44, 0).unwrap())
    );
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = client_for(&server).fetch(&query).await.unwrap_err();

    assert!(matches!(
        err,
        ArchiveError::MalformedResponse(ShapeError::Json(_))
    ));
}

#[tokio::test]
async fn invalid_query_fails_before_any_network_call() {
    let server = MockServer::start().await;

    // expect(0) makes the server verify on drop that nothing arrived
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(three_day_body()))
        .expect(0)
        .mount(&server)
        .await;

    let mut query = nyc_query(vec![DailyMetric::TemperatureMax]);
    query.end_date = date(2016, 2, 14); // now before start_date

    let err = client_for(&server).fetch(&query).await.unwrap_err();
    assert!(matches!(err, ArchiveError::InvalidQuery(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    // Bind then drop a listener to get a port nothing listens on.
    // (A dropped `MockServer` won't do: wiremock returns pooled servers
    // to its pool on drop, so the port keeps answering 404.)
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };

    let query = nyc_query(vec![DailyMetric::TemperatureMax]);
    let err = ArchiveClient::new()
        .with_base_url(uri)
        .fetch(&query)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Transport(_)));
    assert!(err.is_retryable());
}
