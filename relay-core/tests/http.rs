//! HTTP behaviour of the weather client, location lookup and full pipeline,
//! against a wiremock server.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use weather_relay_core::{
    Coordinates, Delivery, DeliveryError, FixedLocationProvider, HostHandler, IpLocationProvider,
    LocationError, LocationOptions, LocationProvider, MessagingChannel, OpenWeatherClient,
    PipelineOutcome, PipelineState, RelayError, RelayMessage, WeatherRelay, WeatherSource,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Default)]
struct RecordingChannel {
    sent: Mutex<Vec<RelayMessage>>,
}

#[async_trait]
impl MessagingChannel for RecordingChannel {
    async fn send_message(&self, message: &RelayMessage) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn current_weather() -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": -122.4194, "lat": 37.7749 },
        "weather": [
            { "id": 803, "main": "Clouds", "description": "broken clouds" },
            { "id": 701, "main": "Mist", "description": "mist" }
        ],
        "main": { "temp": 15.2, "humidity": 82 },
        "name": "San Francisco"
    })
}

#[tokio::test]
async fn test_fetch_weather_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("lat", "37.7749"))
        .and(query_param("lon", "-122.4194"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OpenWeatherClient::new(format!("{}/data/2.5/weather", mock_server.uri()));
    let reading = client
        .fetch_weather(Coordinates::new(37.7749, -122.4194))
        .await
        .unwrap();

    assert_eq!(reading.temperature, 15.2);
    assert_eq!(reading.conditions, "Clouds");
}

#[tokio::test]
async fn test_fetch_weather_error_status_short_circuits() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "cod": 401, "message": "Invalid API key" })),
        )
        .mount(&mock_server)
        .await;

    let client = OpenWeatherClient::new(format!("{}/weather", mock_server.uri()));
    let err = client
        .fetch_weather(Coordinates::new(0.0, 0.0))
        .await
        .unwrap_err();

    match err {
        RelayError::Status { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Invalid API key"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_weather_missing_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": {},
            "weather": []
        })))
        .mount(&mock_server)
        .await;

    let client = OpenWeatherClient::new(format!("{}/weather", mock_server.uri()));
    let err = client
        .fetch_weather(Coordinates::new(0.0, 0.0))
        .await
        .unwrap_err();

    assert!(err.is_parse());
}

#[tokio::test]
async fn test_fetch_weather_unreachable_host() {
    let client = OpenWeatherClient::new("http://127.0.0.1:1/weather");
    let err = client
        .fetch_weather(Coordinates::new(0.0, 0.0))
        .await
        .unwrap_err();

    assert!(err.is_network());
}

#[tokio::test]
async fn test_ip_location_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "lat": 48.8566,
            "lon": 2.3522,
            "city": "Paris"
        })))
        .mount(&mock_server)
        .await;

    let provider = IpLocationProvider::new(format!("{}/json", mock_server.uri()));
    let coords = provider
        .current_position(&LocationOptions::default())
        .await
        .unwrap();

    assert_eq!(coords, Coordinates::new(48.8566, 2.3522));
}

#[tokio::test]
async fn test_ip_location_failure_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "fail",
            "message": "private range"
        })))
        .mount(&mock_server)
        .await;

    let provider = IpLocationProvider::new(format!("{}/json", mock_server.uri()));
    let err = provider
        .current_position(&LocationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err, LocationError::Unavailable("private range".to_string()));
}

#[tokio::test]
async fn test_ip_location_forbidden_is_permission_denied() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("SSL unavailable"))
        .mount(&mock_server)
        .await;

    let provider = IpLocationProvider::new(format!("{}/json", mock_server.uri()));
    let err = provider
        .current_position(&LocationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err, LocationError::PermissionDenied);
}

#[tokio::test]
async fn test_pipeline_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_weather()))
        .expect(2)
        .mount(&mock_server)
        .await;

    let channel = Arc::new(RecordingChannel::default());
    let relay = WeatherRelay::new(
        Arc::new(FixedLocationProvider::new(Coordinates::new(37.7749, -122.4194))),
        Arc::new(OpenWeatherClient::new(format!("{}/weather", mock_server.uri()))),
        channel.clone(),
    );

    relay.on_ready();
    let first = relay.on_trigger_requested();
    let second = relay.on_trigger_requested();

    for handle in [first, second] {
        match handle.await.unwrap() {
            PipelineOutcome::Done { reading, delivery } => {
                assert_eq!(reading.conditions, "Clouds");
                assert_eq!(delivery, Delivery::Acknowledged);
            }
            other => panic!("expected Done, got {other:?}"),
        }
    }

    let sent = channel.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.temperature == 15.2 && m.conditions == "Clouds"));
}

#[tokio::test]
async fn test_pipeline_fails_on_garbage_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let channel = Arc::new(RecordingChannel::default());
    let relay = WeatherRelay::new(
        Arc::new(FixedLocationProvider::new(Coordinates::new(1.0, 2.0))),
        Arc::new(OpenWeatherClient::new(format!("{}/weather", mock_server.uri()))),
        channel.clone(),
    );

    let outcome = relay.run_pipeline().await;

    assert_eq!(outcome.state(), PipelineState::Failed);
    assert!(channel.sent.lock().unwrap().is_empty());
}
