//! Geocode caching behavior against a mock API.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skycast_weather::{Geocoder, WeatherApi};

fn place_payload() -> serde_json::Value {
    serde_json::json!({
        "results": [{
            "name": "Coimbatore",
            "admin1": "Tamil Nadu",
            "country_code": "IN"
        }]
    })
}

#[tokio::test]
async fn nearby_coordinates_trigger_exactly_one_lookup() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/reverse-geocode/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(place_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let api = WeatherApi::new(&server.uri()).unwrap();
    let geocoder = Geocoder::new(api);

    // Both coordinates round to the same 3-decimal cache key
    let first = geocoder.display_name(11.01681, 76.95579).await;
    let second = geocoder.display_name(11.01679, 76.95581).await;

    assert_eq!(first, "Coimbatore, Tamil Nadu");
    assert_eq!(second, first);
}

#[tokio::test]
async fn distinct_keys_each_hit_the_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/reverse-geocode/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(place_payload()))
        .expect(2)
        .mount(&server)
        .await;

    let api = WeatherApi::new(&server.uri()).unwrap();
    let geocoder = Geocoder::new(api);

    geocoder.display_name(11.0168, 76.9558).await;
    geocoder.display_name(12.9716, 77.5946).await;
}

#[tokio::test]
async fn empty_results_degrade_to_coordinate_label() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/reverse-geocode/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
        )
        .mount(&server)
        .await;

    let api = WeatherApi::new(&server.uri()).unwrap();
    let geocoder = Geocoder::new(api);

    let label = geocoder.display_name(47.6062, -122.3321).await;
    assert_eq!(label, "47.6062, -122.3321");
}

#[tokio::test]
async fn server_failure_degrades_and_is_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/reverse-geocode/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/reverse-geocode/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(place_payload()))
        .mount(&server)
        .await;

    let api = WeatherApi::new(&server.uri()).unwrap();
    let geocoder = Geocoder::new(api);

    // First lookup fails and falls back to coordinates
    let first = geocoder.display_name(11.0168, 76.9558).await;
    assert_eq!(first, "11.0168, 76.9558");

    // Failure was not cached - the retry succeeds
    let second = geocoder.display_name(11.0168, 76.9558).await;
    assert_eq!(second, "Coimbatore, Tamil Nadu");
}
