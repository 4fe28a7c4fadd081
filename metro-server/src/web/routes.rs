//! HTTP route handlers.

use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Local;
use futures::future::join_all;
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

use crate::arrivals::ArrivalBoard;
use crate::backend::MetroError;
use crate::crowding::CrowdingReport;
use crate::domain::LineId;
use crate::nearby::merge_nearby;
use crate::route::{RouteError, normalize};
use crate::stations::DEFAULT_SEARCH_LIMIT;

use super::dto::*;
use super::state::AppState;
use super::templates::*;

const DEFAULT_NEARBY_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: &str) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
        .route("/route", get(route_page))
        .route("/nearby", get(nearby_page))
        .route("/arrivals", get(arrivals_page))
        .route("/crowding", get(crowding_page))
        .route("/lines", get(lines_page))
        .route("/lines/:id", get(line_page))
        .route("/api/stations/search", get(search_stations))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Index page with the query forms.
async fn index_page(State(state): State<AppState>) -> IndexTemplate {
    IndexTemplate {
        demo_data: state.metro.is_mock(),
    }
}

/// Search stations by Chinese or English name.
async fn search_stations(
    State(state): State<AppState>,
    Query(req): Query<StationSearchRequest>,
) -> Json<StationSearchResponse> {
    let limit = req.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_LIMIT);
    let matches = state.stations.search(&req.q, limit).await;

    let stations = matches
        .iter()
        .map(StationSearchResult::from_station)
        .collect();

    Json(StationSearchResponse { stations })
}

/// Check if request accepts HTML.
fn accepts_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

/// Render `data` as a page when HTML was asked for, otherwise as JSON.
fn respond<T, P>(html: bool, data: T, page: impl FnOnce(T) -> P) -> Result<Response, AppError>
where
    T: Serialize,
    P: Template,
{
    if html {
        let body = page(data).render().map_err(|e| AppError::Internal {
            message: format!("Template error: {}", e),
        })?;
        Ok(Html(body).into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Plan a route between two stations.
async fn route_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<RouteRequest>,
) -> Response {
    let html = accepts_html(&headers);
    plan_route(&state, &req)
        .await
        .and_then(|route| respond(html, route, |route| RouteTemplate { route }))
        .unwrap_or_else(|e| e.respond(html))
}

async fn plan_route(state: &AppState, req: &RouteRequest) -> Result<RouteResponse, AppError> {
    let route = match (
        non_blank(&req.from),
        non_blank(&req.to),
        non_blank(&req.from_id),
        non_blank(&req.to_id),
    ) {
        (Some(from), Some(to), _, _) => {
            let from = resolve_station_name(state, from).await;
            let to = resolve_station_name(state, to).await;
            if from.to_lowercase() == to.to_lowercase() {
                return Err(same_station());
            }
            state.metro.best_route_by_name(&from, &to).await?
        }
        (_, _, Some(from_id), Some(to_id)) => {
            if from_id == to_id {
                return Err(same_station());
            }
            state.metro.best_route_by_id(from_id, to_id).await?
        }
        _ => {
            return Err(AppError::BadRequest {
                message: "请输入起点和终点".to_string(),
            });
        }
    };

    let itinerary = normalize(&route)?;
    debug!(
        origin = itinerary.origin.display_cn(),
        destination = itinerary.destination.display_cn(),
        steps = itinerary.steps.len(),
        "route normalized"
    );
    Ok(RouteResponse::from_itinerary(&itinerary))
}

fn same_station() -> AppError {
    AppError::BadRequest {
        message: "起点和终点不能相同".to_string(),
    }
}

/// The Chinese name the backend knows a station by, or the input as typed
/// when the directory does not know it.
async fn resolve_station_name(state: &AppState, name: &str) -> String {
    match state.stations.lookup(name).await {
        Some(station) if !station.name.cn().is_empty() => station.name.cn().to_string(),
        _ => name.to_string(),
    }
}

/// Stations near a position, merged per name.
async fn nearby_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<NearbyRequest>,
) -> Response {
    let html = accepts_html(&headers);
    find_nearby(&state, &req)
        .await
        .and_then(|nearby| respond(html, nearby, |nearby| NearbyTemplate { nearby }))
        .unwrap_or_else(|e| e.respond(html))
}

async fn find_nearby(state: &AppState, req: &NearbyRequest) -> Result<NearbyResponse, AppError> {
    if !(req.lat.is_finite() && (-90.0..=90.0).contains(&req.lat)) {
        return Err(AppError::BadRequest {
            message: format!("Invalid latitude: {}", req.lat),
        });
    }
    if !(req.lng.is_finite() && (-180.0..=180.0).contains(&req.lng)) {
        return Err(AppError::BadRequest {
            message: format!("Invalid longitude: {}", req.lng),
        });
    }

    let limit = req.limit.unwrap_or(DEFAULT_NEARBY_LIMIT).clamp(1, MAX_LIMIT);
    // The backend sizes its own answer; the limit applies after merging
    let records = state.metro.nearby_stations(req.lat, req.lng).await?;
    let stations = merge_nearby(records.as_ref().clone(), Some(limit));

    Ok(NearbyResponse {
        lat: req.lat,
        lng: req.lng,
        stations: stations.iter().map(NearbyResult::from_station).collect(),
    })
}

/// Upcoming trains at a station.
async fn arrivals_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<ArrivalsRequest>,
) -> Response {
    let html = accepts_html(&headers);
    arrival_board(&state, &req)
        .await
        .and_then(|board| respond(html, board, |board| ArrivalsTemplate { board }))
        .unwrap_or_else(|e| e.respond(html))
}

async fn arrival_board(
    state: &AppState,
    req: &ArrivalsRequest,
) -> Result<ArrivalsResponse, AppError> {
    let typed = req.station.trim();
    if typed.is_empty() {
        return Err(AppError::BadRequest {
            message: "请输入车站名称".to_string(),
        });
    }

    let station = state.stations.lookup(typed).await;
    let name = match &station {
        Some(s) if !s.name.cn().is_empty() => s.name.cn().to_string(),
        _ => typed.to_string(),
    };
    let station_id = station.map(|s| s.id);

    // Live next-train data and the scheduled arrival infos are fetched
    // together; the latter only fill in lines the former is missing.
    let (next_trains, infos) = tokio::join!(state.metro.next_trains(&name), async {
        match &station_id {
            Some(id) => state.metro.station_arrivals(id).await.map(Some),
            None => Ok(None),
        }
    });

    let now = Local::now().naive_local();
    let board = match (next_trains, infos) {
        (Ok(resp), Ok(Some(infos))) => ArrivalBoard::from_next_trains(&resp, now)
            .fill_from(ArrivalBoard::from_arrival_infos(&name, &infos)),
        (Ok(resp), Ok(None)) => ArrivalBoard::from_next_trains(&resp, now),
        (Ok(resp), Err(e)) => {
            debug!(station = %name, error = %e, "arrival infos unavailable");
            ArrivalBoard::from_next_trains(&resp, now)
        }
        (Err(e), Ok(Some(infos))) => {
            debug!(station = %name, error = %e, "next trains unavailable, using arrival infos");
            ArrivalBoard::from_arrival_infos(&name, &infos)
        }
        (Err(e), _) => return Err(e.into()),
    };

    Ok(ArrivalsResponse::from_board(&board))
}

/// Carriage crowding for one or more lines.
async fn crowding_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(req): Query<CrowdingRequest>,
) -> Response {
    let html = accepts_html(&headers);
    line_crowding(&state, &req)
        .await
        .and_then(|crowding| respond(html, crowding, |crowding| CrowdingTemplate { crowding }))
        .unwrap_or_else(|e| e.respond(html))
}

async fn line_crowding(
    state: &AppState,
    req: &CrowdingRequest,
) -> Result<CrowdingResponse, AppError> {
    let lines = LineId::parse_list(&req.line);
    if lines.is_empty() {
        return Err(AppError::BadRequest {
            message: format!("Invalid line: {}", req.line),
        });
    }

    let metro = &state.metro;
    let results = join_all(
        lines
            .iter()
            .map(|&line| async move { (line, metro.crowding_batch(line).await) }),
    )
    .await;

    let mut out = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (line, result) in results {
        match result {
            Ok(batch) => {
                let report = CrowdingReport::from_batch(&batch);
                out.push(LineCrowdingResult::from_report(line, &report));
            }
            Err(e) => {
                warn!(%line, error = %e, "crowding unavailable");
                out.push(LineCrowdingResult::unavailable(line, e.to_string()));
                first_error.get_or_insert(e);
            }
        }
    }

    // Partial failures are shown per line; only a total failure is an error.
    if out.iter().all(|l| l.error.is_some())
        && let Some(e) = first_error
    {
        return Err(e.into());
    }

    Ok(CrowdingResponse { lines: out })
}

/// Every line, ascending by number.
async fn lines_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let html = accepts_html(&headers);
    list_lines(&state)
        .await
        .and_then(|lines| respond(html, lines, |lines| LinesTemplate { lines }))
        .unwrap_or_else(|e| e.respond(html))
}

async fn list_lines(state: &AppState) -> Result<LinesResponse, AppError> {
    let records = state.metro.lines().await?;
    let mut lines: Vec<LineResult> = records.iter().map(LineResult::from_record).collect();
    lines.sort_by_key(|l| l.line);
    Ok(LinesResponse { lines })
}

/// One line with its ordered stations.
async fn line_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let html = accepts_html(&headers);
    line_detail(&state, &id)
        .await
        .and_then(|line| respond(html, line, |line| LineTemplate { line }))
        .unwrap_or_else(|e| e.respond(html))
}

async fn line_detail(state: &AppState, id: &str) -> Result<LineResult, AppError> {
    let line = id
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| LineId::from_i64(n).ok())
        .ok_or_else(|| AppError::BadRequest {
            message: format!("Invalid line: {id}"),
        })?;

    let record = state.metro.line(line).await?;
    Ok(LineResult::from_record(&record))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { message: String },
    BadGateway { message: String },
    Internal { message: String },
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::BadRequest { message }
            | AppError::NotFound { message }
            | AppError::BadGateway { message }
            | AppError::Internal { message } => message,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            AppError::BadRequest { .. } => "请求无效",
            AppError::NotFound { .. } => "未找到",
            AppError::BadGateway { .. } => "服务暂不可用",
            AppError::Internal { .. } => "服务器错误",
        }
    }

    fn log(&self) {
        let status = self.status();
        if status.is_server_error() {
            warn!(%status, message = self.message(), "request failed");
        } else {
            debug!(%status, message = self.message(), "request rejected");
        }
    }

    /// The error page when HTML was asked for, otherwise the JSON body.
    pub fn respond(self, html: bool) -> Response {
        if !html {
            return self.into_response();
        }

        self.log();
        let status = self.status();
        let page = ErrorTemplate {
            title: self.title().to_string(),
            message: self.message().to_string(),
        };
        (status, page).into_response()
    }
}

impl From<MetroError> for AppError {
    fn from(e: MetroError) -> Self {
        match e {
            MetroError::NotFound(message) | MetroError::RouteUnavailable(message) => {
                AppError::NotFound { message }
            }
            other @ (MetroError::Config(_) | MetroError::Mock(_)) => AppError::Internal {
                message: other.to_string(),
            },
            other => {
                warn!(error = %other, "metro backend request failed");
                AppError::BadGateway {
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        warn!(error = %e, "backend route could not be normalized");
        AppError::BadGateway {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.message().to_string(),
        });
        (status, body).into_response()
    }
}
