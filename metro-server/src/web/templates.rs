//! Askama templates for the web frontend.
//!
//! Page templates take the same DTOs the JSON endpoints serialize, so both
//! representations always show the same data.

use askama::Template;

use super::dto::{
    ArrivalsResponse, CrowdingResponse, LineResult, LinesResponse, NearbyResponse, RouteResponse,
};

// ============================================================================
// Page Templates (extend base.html)
// ============================================================================

/// Home page with route, nearby, arrivals and crowding forms.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    /// Set when answers come from fixture files.
    pub demo_data: bool,
}

/// Error page.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub title: String,
    pub message: String,
}

/// Route result page.
#[derive(Template)]
#[template(path = "route.html")]
pub struct RouteTemplate {
    pub route: RouteResponse,
}

/// Nearby stations page.
#[derive(Template)]
#[template(path = "nearby.html")]
pub struct NearbyTemplate {
    pub nearby: NearbyResponse,
}

/// Arrival board page.
#[derive(Template)]
#[template(path = "arrivals.html")]
pub struct ArrivalsTemplate {
    pub board: ArrivalsResponse,
}

/// Carriage crowding page.
#[derive(Template)]
#[template(path = "crowding.html")]
pub struct CrowdingTemplate {
    pub crowding: CrowdingResponse,
}

/// Line list page.
#[derive(Template)]
#[template(path = "lines.html")]
pub struct LinesTemplate {
    pub lines: LinesResponse,
}

/// Single line page.
#[derive(Template)]
#[template(path = "line.html")]
pub struct LineTemplate {
    pub line: LineResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CrowdingBatch;
    use crate::crowding::CrowdingReport;
    use crate::domain::{LineId, StationName};
    use crate::route::{Itinerary, RideStep, RouteStep, TransferStep};
    use crate::web::dto::{LineCrowdingResult, StationNameResult};

    fn line(n: u16) -> LineId {
        LineId::new(n).unwrap()
    }

    #[test]
    fn index_renders_forms() {
        let html = IndexTemplate { demo_data: false }.render().unwrap();
        assert!(!html.contains("演示数据"));
        assert!(html.contains("action=\"/route\""));
        assert!(html.contains("action=\"/nearby\""));
        assert!(html.contains("action=\"/arrivals\""));
        assert!(html.contains("action=\"/crowding\""));
    }

    #[test]
    fn route_renders_transfer_card() {
        let itinerary = Itinerary {
            origin: StationName::new("人民广场", "People's Square"),
            destination: StationName::new("豫园", "Yuyuan Garden"),
            steps: vec![
                RouteStep::Ride(RideStep {
                    from: StationName::new("人民广场", "People's Square"),
                    to: StationName::new("南京东路", "East Nanjing Road"),
                    line: line(2),
                    minutes: 2,
                    cumulative_minutes: 2,
                }),
                RouteStep::Transfer(TransferStep {
                    from_line: line(2),
                    to_line: line(10),
                    minutes: 5,
                    message: "换乘到10号线".to_string(),
                    cumulative_minutes: 7,
                }),
                RouteStep::Ride(RideStep {
                    from: StationName::new("南京东路", "East Nanjing Road"),
                    to: StationName::new("豫园", "Yuyuan Garden"),
                    line: line(10),
                    minutes: 3,
                    cumulative_minutes: 10,
                }),
            ],
            total_minutes: 10,
            transfer_count: 1,
        };

        let html = RouteTemplate {
            route: RouteResponse::from_itinerary(&itinerary),
        }
        .render()
        .unwrap();

        assert!(html.contains("换乘到10号线"));
        assert!(html.contains("2号线 → 10号线"));
        assert!(html.contains("#00AD56"));
        assert!(html.contains("People&#x27;s Square") || html.contains("People&#39;s Square"));
    }

    #[test]
    fn crowding_renders_unavailable_lines() {
        let html = CrowdingTemplate {
            crowding: CrowdingResponse {
                lines: vec![LineCrowdingResult::unavailable(
                    line(3),
                    "rate limited by metro backend".to_string(),
                )],
            },
        }
        .render()
        .unwrap();
        assert!(html.contains("3号线"));
        assert!(html.contains("rate limited by metro backend"));
    }

    #[test]
    fn lines_render_colours() {
        let html = LinesTemplate {
            lines: LinesResponse {
                lines: vec![LineResult {
                    line: line(8),
                    name_cn: "8号线".to_string(),
                    name_en: "Line 8".to_string(),
                    color: "#009FDB".to_string(),
                    stations: vec![StationNameResult {
                        cn: "市光路".to_string(),
                        en: "Shiguang Road".to_string(),
                    }],
                }],
            },
        }
        .render()
        .unwrap();
        assert!(html.contains("#009FDB"));
        assert!(html.contains("市光路"));
        assert!(html.contains("href=\"/lines/8\""));
    }

    #[test]
    fn route_shows_ride_count() {
        let itinerary = Itinerary {
            origin: StationName::new("人民广场", "People's Square"),
            destination: StationName::new("南京东路", "East Nanjing Road"),
            steps: vec![RouteStep::Ride(RideStep {
                from: StationName::new("人民广场", "People's Square"),
                to: StationName::new("南京东路", "East Nanjing Road"),
                line: line(2),
                minutes: 2,
                cumulative_minutes: 2,
            })],
            total_minutes: 2,
            transfer_count: 0,
        };
        let route = RouteResponse::from_itinerary(&itinerary);
        assert_eq!(route.ride_count, 1);

        let html = RouteTemplate { route }.render().unwrap();
        assert!(html.contains("乘坐 <strong>1</strong> 站"));
    }

    #[test]
    fn crowding_shows_line_busiest_level() {
        let batch: CrowdingBatch = serde_json::from_str(
            r#"{"line_number": 2, "data": {
                "T1": [{"line_carriage": 1, "person_num": 5, "crowd_level": 0}],
                "T2": [{"line_carriage": 1, "person_num": 40, "crowd_level": 2}]
            }}"#,
        )
        .unwrap();
        let report = CrowdingReport::from_batch(&batch);
        let result = LineCrowdingResult::from_report(line(2), &report);
        assert_eq!(result.busiest_level, Some(2));

        let html = CrowdingTemplate {
            crowding: CrowdingResponse { lines: vec![result] },
        }
        .render()
        .unwrap();
        assert!(html.contains("最拥挤: <span class=\"crowd-level-2\">拥挤</span>"));
    }

    #[test]
    fn error_page_shows_message() {
        let html = ErrorTemplate {
            title: "未找到路径".to_string(),
            message: "<script>".to_string(),
        }
        .render()
        .unwrap();
        assert!(html.contains("未找到路径"));
        assert!(!html.contains("<script>"));
    }
}
