//! MetroInfo backend HTTP client.
//!
//! Provides async methods for querying the route, station, arrival and
//! crowding services. Each call decodes the JSON once and maps failures to
//! [`MetroError`]; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::debug;

use super::error::MetroError;
use super::types::{
    ArrivalInfoRecord, CrowdingBatch, LineRecord, NearbyRecord, NearbyPayload, NextTrainsResponse,
    RouteData, RouteEnvelope, StationRecord,
};
use crate::domain::LineId;

/// Default base URL for the route and station API.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 8;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// How much of an undecodable body to keep in the error.
const BODY_SNIPPET_CHARS: usize = 500;

/// Message used when the route service fails without saying why.
const DEFAULT_ROUTE_FAILURE: &str = "查询路线失败";

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct MetroConfig {
    /// Base URL of the route/station API
    pub base_url: String,
    /// Base URL of the crowding service (defaults to `base_url`)
    pub crowding_base_url: Option<String>,
    /// Base URL of the next-train service (defaults to `base_url`)
    pub arrivals_base_url: Option<String>,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MetroConfig {
    /// Create a new config pointing at the given backend.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            crowding_base_url: None,
            arrivals_base_url: None,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Use a separate host for crowding data.
    pub fn with_crowding_base_url(mut self, url: impl Into<String>) -> Self {
        self.crowding_base_url = Some(url.into());
        self
    }

    /// Use a separate host for next-train data.
    pub fn with_arrivals_base_url(mut self, url: impl Into<String>) -> Self {
        self.arrivals_base_url = Some(url.into());
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for MetroConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// MetroInfo backend client.
///
/// Uses a semaphore to limit concurrent requests so a burst of page loads
/// cannot overwhelm the small backend services.
#[derive(Debug, Clone)]
pub struct MetroClient {
    http: reqwest::Client,
    base_url: String,
    crowding_base_url: String,
    arrivals_base_url: String,
    semaphore: Arc<Semaphore>,
}

impl MetroClient {
    /// Create a new client with the given configuration.
    pub fn new(config: MetroConfig) -> Result<Self, MetroError> {
        if config.max_concurrent == 0 {
            return Err(MetroError::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = trim_base(&config.base_url);
        let crowding_base_url = config
            .crowding_base_url
            .as_deref()
            .map(trim_base)
            .unwrap_or_else(|| base_url.clone());
        let arrivals_base_url = config
            .arrivals_base_url
            .as_deref()
            .map(trim_base)
            .unwrap_or_else(|| base_url.clone());

        Ok(Self {
            http,
            base_url,
            crowding_base_url,
            arrivals_base_url,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
        })
    }

    /// Best route between two stations given by name (Chinese or English).
    pub async fn best_route_by_name(&self, from: &str, to: &str) -> Result<RouteData, MetroError> {
        let url = format!("{}/Dijkstra", self.base_url);
        self.fetch_route(&url, &[("from", from.to_string()), ("to", to.to_string())])
            .await
    }

    /// Best route between two stations given by backend id.
    pub async fn best_route_by_id(
        &self,
        start_station_id: &str,
        end_station_id: &str,
    ) -> Result<RouteData, MetroError> {
        let url = format!("{}/api/metro/best-route", self.base_url);
        self.fetch_route(
            &url,
            &[
                ("start_station_id", start_station_id.to_string()),
                ("end_station_id", end_station_id.to_string()),
            ],
        )
        .await
    }

    /// Raw nearby-station records around a position, closest first.
    ///
    /// The backend picks how many to return (five on the stock service).
    pub async fn nearby_stations(&self, lat: f64, lng: f64) -> Result<Vec<NearbyRecord>, MetroError> {
        let url = format!("{}/api/metro/nearest-stations", self.base_url);
        let payload: NearbyPayload = self
            .get_json(
                &url,
                &[("latitude", lat.to_string()), ("longitude", lng.to_string())],
            )
            .await?;
        Ok(payload.into_records())
    }

    /// Every station known to the backend.
    pub async fn stations(&self) -> Result<Vec<StationRecord>, MetroError> {
        let url = format!("{}/api/stations", self.base_url);
        self.get_json(&url, &[]).await
    }

    /// All lines, with their ordered stations when the backend includes them.
    pub async fn lines(&self) -> Result<Vec<LineRecord>, MetroError> {
        let url = format!("{}/api/lines", self.base_url);
        self.get_json(&url, &[]).await
    }

    /// A single line.
    pub async fn line(&self, line: LineId) -> Result<LineRecord, MetroError> {
        let url = format!("{}/api/lines/{}", self.base_url, line);
        self.get_json(&url, &[]).await.map_err(|e| match e {
            MetroError::NotFound(_) => MetroError::NotFound(format!("line {line}")),
            other => other,
        })
    }

    /// Arrival predictions for every line at a station.
    pub async fn station_arrivals(
        &self,
        station_id: &str,
    ) -> Result<Vec<ArrivalInfoRecord>, MetroError> {
        let url = format!("{}/api/arrival-time/station/{}", self.base_url, station_id);
        self.get_json(&url, &[]).await
    }

    /// Upcoming trains per line and direction at a station, by name.
    pub async fn next_trains(&self, station_name: &str) -> Result<NextTrainsResponse, MetroError> {
        let url = format!("{}/smartmetro/next_trains", self.arrivals_base_url);
        self.get_json(&url, &[("station_name", station_name.to_string())])
            .await
    }

    /// Latest crowding reading for every carriage of every train on a line.
    pub async fn crowding_batch(&self, line: LineId) -> Result<CrowdingBatch, MetroError> {
        let url = format!("{}/smartmetro/crowding/batch", self.crowding_base_url);
        self.get_json(&url, &[("line_number", line.to_string())])
            .await
    }

    /// Route endpoints report "unknown station" and "no path" as 400/404
    /// with a `success: false` envelope; those become `RouteUnavailable`.
    /// Any other 400/404 body goes through the usual status mapping.
    async fn fetch_route(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<RouteData, MetroError> {
        let (status, body) = self.send(url, query).await?;

        if (status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND)
            && let Ok(RouteRejection {
                success: false,
                message,
            }) = serde_json::from_str::<RouteRejection>(&body)
        {
            return Err(route_failure(message));
        }

        check_status(status, &body)?;
        let envelope: RouteEnvelope = decode(&body)?;
        unwrap_route(envelope)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, MetroError> {
        let (status, body) = self.send(url, query).await?;
        check_status(status, &body)?;
        decode(&body)
    }

    async fn send(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(StatusCode, String), MetroError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| MetroError::Config("request semaphore closed".to_string()))?;

        debug!(url, ?query, "backend request");
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(url, status = status.as_u16(), bytes = body.len(), "backend response");
        Ok((status, body))
    }
}

/// Failure envelope on an error status. Unlike [`RouteEnvelope`],
/// `success` must be present.
#[derive(Debug, Deserialize)]
struct RouteRejection {
    success: bool,
    message: Option<String>,
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn check_status(status: StatusCode, body: &str) -> Result<(), MetroError> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(MetroError::Unauthorized);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MetroError::RateLimited);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(MetroError::NotFound(snippet(body)));
    }

    if !status.is_success() {
        return Err(MetroError::Api {
            status: status.as_u16(),
            message: snippet(body),
        });
    }

    Ok(())
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, MetroError> {
    serde_json::from_str(body).map_err(|e| MetroError::Json {
        message: e.to_string(),
        body: Some(snippet(body)),
    })
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

fn route_failure(message: Option<String>) -> MetroError {
    let message = message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ROUTE_FAILURE.to_string());
    MetroError::RouteUnavailable(message)
}

/// Extract the route from a decoded envelope.
pub(crate) fn unwrap_route(envelope: RouteEnvelope) -> Result<RouteData, MetroError> {
    match envelope {
        RouteEnvelope {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        RouteEnvelope { message, .. } => Err(route_failure(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Query,
        http::StatusCode as HttpStatus,
        response::{IntoResponse, Response},
        routing::get,
    };
    use serde_json::json;
    use std::collections::HashMap;

    /// Serve `router` on a loopback port and return a client pointed at it.
    async fn stub_backend(router: Router) -> MetroClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        MetroClient::new(MetroConfig::new(format!("http://{addr}"))).unwrap()
    }

    async fn route_answer(status: HttpStatus, body: &'static str) -> Result<RouteData, MetroError> {
        let router = Router::new().route(
            "/Dijkstra",
            get(move || async move { (status, body).into_response() }),
        );
        stub_backend(router)
            .await
            .best_route_by_name("人民广场", "陆家嘴")
            .await
    }

    #[tokio::test]
    async fn unknown_station_envelope_is_route_unavailable() {
        let result = route_answer(
            HttpStatus::BAD_REQUEST,
            r#"{"success": false, "message": "无效的车站名称"}"#,
        )
        .await;
        assert!(matches!(
            result,
            Err(MetroError::RouteUnavailable(m)) if m == "无效的车站名称"
        ));
    }

    #[tokio::test]
    async fn no_path_envelope_without_message_uses_default() {
        let result = route_answer(HttpStatus::NOT_FOUND, r#"{"success": false}"#).await;
        assert!(matches!(
            result,
            Err(MetroError::RouteUnavailable(m)) if m == DEFAULT_ROUTE_FAILURE
        ));
    }

    #[tokio::test]
    async fn plain_not_found_is_not_found() {
        let result = route_answer(HttpStatus::NOT_FOUND, "<html>Not Found</html>").await;
        assert!(matches!(result, Err(MetroError::NotFound(m)) if m.contains("Not Found")));
    }

    #[tokio::test]
    async fn bad_request_without_envelope_is_api_error() {
        let result = route_answer(HttpStatus::BAD_REQUEST, r#"{"error": "Invalid parameters"}"#).await;
        assert!(matches!(result, Err(MetroError::Api { status: 400, .. })));

        let result = route_answer(HttpStatus::NOT_FOUND, r#"{"success": true}"#).await;
        assert!(matches!(result, Err(MetroError::NotFound(_))));
    }

    #[tokio::test]
    async fn successful_route_decodes() {
        let result = route_answer(
            HttpStatus::OK,
            r#"{"success": true, "data": {"path": [], "total_time": 4, "transfer_count": 0}}"#,
        )
        .await;
        assert_eq!(result.unwrap().total_time, Some(4));
    }

    #[tokio::test]
    async fn nearby_sends_latitude_and_longitude() {
        async fn nearest(Query(q): Query<HashMap<String, String>>) -> Response {
            match (q.get("latitude"), q.get("longitude")) {
                (Some(lat), Some(lng)) if lat == "31.23" && lng == "121.47" => Json(json!([
                    {"station_id": 112, "name_cn": "人民广场", "name_en": "People's Square",
                     "associated_lines": "1,2,8", "distance": 0.25}
                ]))
                .into_response(),
                _ => (
                    HttpStatus::BAD_REQUEST,
                    Json(json!({"error": "Invalid parameters"})),
                )
                    .into_response(),
            }
        }

        let client = stub_backend(Router::new().route("/api/metro/nearest-stations", get(nearest))).await;
        let records = client.nearby_stations(31.23, 121.47).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].stat_id, "112");
        assert_eq!(records[0].distance_m, 250.0);
    }

    #[test]
    fn config_builder() {
        let config = MetroConfig::new("http://localhost:8080/")
            .with_crowding_base_url("http://localhost:5004")
            .with_arrivals_base_url("http://localhost:5005")
            .with_max_concurrent(2)
            .with_timeout(60);

        assert_eq!(config.base_url, "http://localhost:8080/");
        assert_eq!(config.crowding_base_url.as_deref(), Some("http://localhost:5004"));
        assert_eq!(config.arrivals_base_url.as_deref(), Some("http://localhost:5005"));
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn config_defaults() {
        let config = MetroConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.crowding_base_url.is_none());
        assert!(config.arrivals_base_url.is_none());
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn client_creation_trims_and_defaults_hosts() {
        let client = MetroClient::new(MetroConfig::new("http://metro.local/")).unwrap();
        assert_eq!(client.base_url, "http://metro.local");
        assert_eq!(client.crowding_base_url, "http://metro.local");
        assert_eq!(client.arrivals_base_url, "http://metro.local");

        let client = MetroClient::new(
            MetroConfig::new("http://metro.local").with_crowding_base_url("http://crowd.local/"),
        )
        .unwrap();
        assert_eq!(client.crowding_base_url, "http://crowd.local");
    }

    #[test]
    fn zero_concurrency_rejected() {
        let result = MetroClient::new(MetroConfig::default().with_max_concurrent(0));
        assert!(matches!(result, Err(MetroError::Config(_))));
    }

    #[test]
    fn status_mapping() {
        assert!(check_status(StatusCode::OK, "").is_ok());
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, ""),
            Err(MetroError::Unauthorized)
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN, ""),
            Err(MetroError::Unauthorized)
        ));
        assert!(matches!(
            check_status(StatusCode::TOO_MANY_REQUESTS, ""),
            Err(MetroError::RateLimited)
        ));
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "gone"),
            Err(MetroError::NotFound(m)) if m == "gone"
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "upstream"),
            Err(MetroError::Api { status: 502, message }) if message == "upstream"
        ));
    }

    #[test]
    fn decode_failure_keeps_truncated_body() {
        let body = "x".repeat(2000);
        let err = decode::<Vec<u32>>(&body).unwrap_err();
        match err {
            MetroError::Json { body: Some(b), .. } => assert_eq!(b.len(), BODY_SNIPPET_CHARS),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unwrap_failed_envelope_uses_message() {
        let env: RouteEnvelope =
            serde_json::from_str(r#"{"success": false, "message": "无效的车站名称"}"#).unwrap();
        assert!(matches!(
            unwrap_route(env),
            Err(MetroError::RouteUnavailable(m)) if m == "无效的车站名称"
        ));
    }

    #[test]
    fn unwrap_envelope_without_data_uses_default() {
        let env: RouteEnvelope = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(
            unwrap_route(env),
            Err(MetroError::RouteUnavailable(m)) if m == DEFAULT_ROUTE_FAILURE
        ));
    }
}
