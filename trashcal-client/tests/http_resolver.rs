//! `HttpResolver` against a local mock of the calendar service.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use trashcal_client::HttpResolver;
use trashcal_core::{
    ApiError, CollectionType, Endpoints, MISSING_ROUTE_MESSAGE, RecyclingColor, ResolutionInput,
    ResolverPort, Selection, TownApiConfig, TownCapabilities, TownConfig, TownSession, Weekday,
};

type Params = HashMap<String, String>;

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<(String, Params, Option<String>)>>>,
}

impl MockState {
    fn record(&self, path: &str, params: Params, headers: &HeaderMap) {
        let accept = headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        self.requests
            .lock()
            .expect("requests lock")
            .push((path.to_owned(), params, accept));
    }

    fn last(&self) -> (String, Params, Option<String>) {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("a request was recorded")
    }
}

async fn version(State(state): State<MockState>, headers: HeaderMap) -> Json<serde_json::Value> {
    state.record("/version", Params::new(), &headers);
    Json(json!({
        "service_version": "0.1.0",
        "schema_version": 1,
        "meta": {"generated_at": "2026-02-01T00:00:00Z", "town_id": "westford_ma"}
    }))
}

async fn resolve(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    state.record("/resolve", params.clone(), &headers);

    if params.get("address").map(String::as_str) == Some("65 Boston Road") {
        return Json(json!({
            "mode": "address",
            "route": {"weekday": "Thursday", "recycling_color": "BLUE", "street": "Boston Road"}
        }))
        .into_response();
    }

    match params.get("street").map(String::as_str) {
        Some("Boston Rd") => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Street has multiple routes",
                "suggestions": [
                    {"street": "Boston Road", "score": 99},
                    "Main Street",
                    {"label": "Ignore"}
                ],
                "requires_number": true
            })),
        )
            .into_response(),
        Some("Unrouted Way") => {
            Json(json!({"route": {"weekday": "", "recycling_color": ""}})).into_response()
        }
        Some("Crash Lane") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/html")],
            "<h1>Internal Server Error</h1>",
        )
            .into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "No municipal collection for this address"})),
        )
            .into_response(),
    }
}

async fn debug(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Json<serde_json::Value> {
    state.record("/debug", params, &headers);
    Json(json!({
        "mode": "bypass",
        "days": 120,
        "types": ["trash"],
        "events": [
            {"date": "2026-02-12", "types": ["trash"]},
            {"date": "2026-02-19", "types": ["trash"]}
        ]
    }))
}

async fn streets(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Json<serde_json::Value> {
    state.record("/streets", params, &headers);
    Json(json!(["Boston Road", "Main Street"]))
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"schema_version": 1}))
}

async fn html() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "text/html")], "<html>maintenance</html>")
}

async fn spawn_mock_server() -> (String, MockState, oneshot::Sender<()>) {
    let state = MockState::default();
    let app = Router::new()
        .route("/version", get(version))
        .route("/resolve", get(resolve))
        .route("/debug", get(debug))
        .route("/streets", get(streets))
        .route("/slow", get(slow))
        .route("/html", get(html))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run mock server");
    });
    (format!("http://{address}"), state, shutdown_tx)
}

fn town(base_url: &str) -> TownConfig {
    TownConfig {
        id: "westford_ma".to_owned(),
        name: "Westford, MA".to_owned(),
        slug: "westford-ma".to_owned(),
        api: TownApiConfig {
            base_url: base_url.to_owned(),
            ics_path: "/town.ics".to_owned(),
            resolve_path: "/resolve".to_owned(),
            debug_path: "/debug".to_owned(),
            version_path: "/version".to_owned(),
            streets_path: "/streets".to_owned(),
        },
        capabilities: TownCapabilities::default(),
    }
}

fn resolver_for(town: TownConfig) -> HttpResolver {
    let endpoints = Endpoints::resolve(&town.api, None).expect("valid base");
    HttpResolver::new(Client::new(), town, endpoints)
}

fn street_input(street: &str, number: &str) -> ResolutionInput {
    ResolutionInput {
        address: None,
        street: Some(street.to_owned()),
        number: Some(number.to_owned()),
    }
}

#[tokio::test]
async fn version_is_fetched_as_json() {
    let (base, state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));

    let version = resolver.fetch_version().await.expect("version loads");
    assert_eq!(version.service_version.as_deref(), Some("0.1.0"));
    assert_eq!(version.schema_version, 1);

    let (path, _, accept) = state.last();
    assert_eq!(path, "/version");
    assert_eq!(accept.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn address_resolves_to_route() {
    let (base, state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));
    let input = ResolutionInput {
        address: Some(" 65 Boston Road ".to_owned()),
        street: Some("Main Street".to_owned()),
        number: Some("1".to_owned()),
    };

    let route = resolver.resolve_route(&input).await.expect("route resolves");
    assert_eq!(route.weekday, Some(Weekday::Thursday));
    assert_eq!(route.recycling_color, Some(RecyclingColor::Blue));

    let (_, params, _) = state.last();
    assert_eq!(params.get("address").map(String::as_str), Some("65 Boston Road"));
    assert!(!params.contains_key("street"));
    assert!(!params.contains_key("number"));
}

#[tokio::test]
async fn structured_rejection_carries_suggestions_and_flag() {
    let (base, state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));

    let err = resolver
        .resolve_route(&street_input("Boston Rd", " "))
        .await
        .expect_err("street needs a number");
    assert_eq!(err.message(), "Street has multiple routes");
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.suggestions(), ["Boston Road", "Main Street"]);
    assert!(err.requires_number());

    let (_, params, _) = state.last();
    assert_eq!(params.get("street").map(String::as_str), Some("Boston Rd"));
    assert!(!params.contains_key("number"));
}

#[tokio::test]
async fn plain_json_rejection_uses_body_message() {
    let (base, _state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));

    let err = resolver
        .resolve_route(&street_input("No pickup road", "1"))
        .await
        .expect_err("no collection");
    assert_eq!(err.message(), "No municipal collection for this address");
    assert!(err.suggestions().is_empty());
    assert!(!err.requires_number());
}

#[tokio::test]
async fn blank_route_is_decoded_as_missing() {
    let (base, _state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));

    let route = resolver
        .resolve_route(&street_input("Unrouted Way", "1"))
        .await
        .expect("blank route is still a success");
    assert_eq!(route.weekday, None);
    assert_eq!(route.recycling_color, None);
}

#[tokio::test]
async fn session_reports_blank_route_as_missing_route() {
    let (base, _state, _shutdown) = spawn_mock_server().await;
    let town = town(&base);
    let endpoints = Endpoints::resolve(&town.api, None).expect("valid base");
    let port: Arc<dyn ResolverPort> = Arc::new(resolver_for(town));
    let mut session = TownSession::new(port, endpoints);
    session.set_street("Unrouted Way");
    session.set_number("1");

    session.submit_resolve().await;

    assert_eq!(
        session.failure().map(|failure| failure.message.as_str()),
        Some(MISSING_ROUTE_MESSAGE)
    );
}

#[tokio::test]
async fn non_json_rejection_is_generic() {
    let (base, _state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));

    let err = resolver
        .resolve_route(&street_input("Crash Lane", "1"))
        .await
        .expect_err("server error");
    assert_eq!(err, ApiError::Status { status: 500 });
    assert_eq!(err.message(), "HTTP 500");
}

#[tokio::test]
async fn preview_always_sends_types() {
    let (base, state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));
    let selection = Selection {
        weekday: Weekday::Thursday,
        color: RecyclingColor::Blue,
        types: vec![CollectionType::Recycling, CollectionType::Trash],
        days: Some(120),
    };

    let preview = resolver
        .fetch_debug_preview(&selection)
        .await
        .expect("preview loads");
    assert_eq!(preview.events.len(), 2);

    let (path, params, _) = state.last();
    assert_eq!(path, "/debug");
    assert_eq!(params.get("weekday").map(String::as_str), Some("Thursday"));
    assert_eq!(params.get("color").map(String::as_str), Some("BLUE"));
    assert_eq!(params.get("types").map(String::as_str), Some("trash,recycling"));
    assert_eq!(params.get("days").map(String::as_str), Some("120"));
}

#[tokio::test]
async fn preview_omits_missing_days() {
    let (base, state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));
    let selection = Selection::new(Weekday::Monday, RecyclingColor::Green);

    resolver
        .fetch_debug_preview(&selection)
        .await
        .expect("preview loads");

    let (_, params, _) = state.last();
    assert!(!params.contains_key("days"));
}

#[tokio::test]
async fn streets_are_listed_in_full() {
    let (base, state, _shutdown) = spawn_mock_server().await;
    let resolver = resolver_for(town(&base));

    let streets = resolver.fetch_streets().await.expect("streets load");
    assert_eq!(streets, vec!["Boston Road", "Main Street"]);

    let (_, params, _) = state.last();
    assert_eq!(params.get("full").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn slow_service_times_out() {
    let (base, _state, _shutdown) = spawn_mock_server().await;
    let mut slow_town = town(&base);
    slow_town.api.version_path = "/slow".to_owned();
    let resolver = resolver_for(slow_town).with_timeout(Duration::from_millis(200));

    let err = resolver.fetch_version().await.expect_err("request times out");
    assert_eq!(err, ApiError::Timeout);
    assert_eq!(err.message(), "Request timed out. Please try again.");
}

#[tokio::test]
async fn non_json_success_is_invalid_response() {
    let (base, _state, _shutdown) = spawn_mock_server().await;
    let mut broken_town = town(&base);
    broken_town.api.version_path = "/html".to_owned();
    let resolver = resolver_for(broken_town);

    let err = resolver.fetch_version().await.expect_err("body is not JSON");
    assert_eq!(err, ApiError::InvalidResponse);
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind throwaway listener");
    let address = listener.local_addr().expect("throwaway local addr");
    drop(listener);

    let resolver = resolver_for(town(&format!("http://{address}")));
    let err = resolver.fetch_version().await.expect_err("nothing listens");
    assert_eq!(err, ApiError::Unavailable);
    assert!(err.suggestions().is_empty());
}
