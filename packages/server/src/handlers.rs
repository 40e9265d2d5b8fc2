//! HTTP handler functions for the region map API.

use std::sync::MutexGuard;

use actix_web::{HttpResponse, web};
use region_map_render::PageContext;
use region_map_region_models::Region;
use region_map_server_models::{ApiError, ApiHealth, ApiState};
use region_map_viewer::{PointerEvent, ViewMode, Viewer, ViewerError};

use crate::AppState;

fn lock(state: &AppState) -> Result<MutexGuard<'_, Viewer>, HttpResponse> {
    state.viewer.lock().map_err(|_| {
        log::error!("Viewer lock poisoned");
        HttpResponse::InternalServerError().json(ApiError::new("Viewer unavailable"))
    })
}

/// Applies a viewer transition and responds with the resulting state.
fn transition(
    state: &AppState,
    what: &str,
    apply: impl FnOnce(&mut Viewer) -> Result<(), ViewerError>,
) -> HttpResponse {
    let mut viewer = match lock(state) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    match apply(&mut viewer) {
        Ok(()) => HttpResponse::Ok().json(ApiState::from_viewer(&viewer)),
        Err(e) => {
            log::error!("Failed to {what}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(format!("Failed to {what}")))
        }
    }
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /`
pub async fn page(state: web::Data<AppState>) -> HttpResponse {
    match lock(&state) {
        Ok(viewer) => html(region_map_render::page(&PageContext::from_viewer(&viewer))),
        Err(response) => response,
    }
}

/// `GET /map.svg`
///
/// The map asset with a stylesheet reflecting every shape's current style.
pub async fn map_svg(state: web::Data<AppState>) -> HttpResponse {
    let viewer = match lock(&state) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };
    match viewer.document().render() {
        Ok(svg) => HttpResponse::Ok().content_type("image/svg+xml").body(svg),
        Err(e) => {
            log::error!("Failed to render map asset: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Failed to render map"))
        }
    }
}

/// `GET /api/state`
pub async fn state(state: web::Data<AppState>) -> HttpResponse {
    match lock(&state) {
        Ok(viewer) => HttpResponse::Ok().json(ApiState::from_viewer(&viewer)),
        Err(response) => response,
    }
}

/// `GET /api/regions`
pub async fn regions(state: web::Data<AppState>) -> HttpResponse {
    match lock(&state) {
        Ok(viewer) => {
            let regions: Vec<&Region> = viewer.catalog().iter().collect();
            HttpResponse::Ok().json(regions)
        }
        Err(response) => response,
    }
}

/// `GET /api/statistics`
pub async fn statistics(state: web::Data<AppState>) -> HttpResponse {
    match lock(&state) {
        Ok(viewer) => HttpResponse::Ok().json(viewer.catalog().statistics()),
        Err(response) => response,
    }
}

/// `GET /api/shapes`
///
/// Every selectable shape with its visual state, style, and tooltip.
pub async fn shapes(state: web::Data<AppState>) -> HttpResponse {
    match lock(&state) {
        Ok(viewer) => HttpResponse::Ok().json(viewer.shapes()),
        Err(response) => response,
    }
}

/// `GET /api/panel`
///
/// The side panel fragment for the current view.
pub async fn panel(state: web::Data<AppState>) -> HttpResponse {
    match lock(&state) {
        Ok(viewer) => html(region_map_render::side_panel(&PageContext::from_viewer(
            &viewer,
        ))),
        Err(response) => response,
    }
}

/// `POST /api/overlay/{mode}`
///
/// `heatmap` and `crime` toggle that overlay; `off` turns every overlay
/// off.
pub async fn overlay(state: web::Data<AppState>, mode: web::Path<String>) -> HttpResponse {
    match mode.as_str() {
        "heatmap" => transition(&state, "toggle heatmap", Viewer::toggle_heatmap),
        "crime" => transition(&state, "toggle crime overlay", Viewer::toggle_crime_mode),
        "off" | "none" => transition(&state, "disable overlay", Viewer::disable_overlay),
        other => HttpResponse::BadRequest().json(ApiError::new(format!("Unknown overlay '{other}'"))),
    }
}

/// `POST /api/view/{mode}`
pub async fn view(state: web::Data<AppState>, mode: web::Path<String>) -> HttpResponse {
    match mode.parse::<ViewMode>() {
        Ok(mode) => transition(&state, "switch view", |viewer| viewer.set_view_mode(mode)),
        Err(_) => HttpResponse::BadRequest().json(ApiError::new(format!(
            "Unknown view '{}'",
            mode.as_str()
        ))),
    }
}

/// `POST /api/selection/{id}`
pub async fn select(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    transition(&state, "select region", |viewer| viewer.select_region(&id))
}

/// `POST /api/selection/reset`
pub async fn reset_selection(state: web::Data<AppState>) -> HttpResponse {
    transition(&state, "reset selection", Viewer::reset_selection)
}

/// `POST /api/reset`
///
/// Turns every overlay off and clears the selection.
pub async fn reset_all(state: web::Data<AppState>) -> HttpResponse {
    transition(&state, "reset view", Viewer::reset_modes_and_selection)
}

/// `POST /api/map/events`
///
/// Pointer events on map shapes, as `{ "kind": "enter" | "leave" |
/// "click", "shapeId": "..." }`.
pub async fn map_event(state: web::Data<AppState>, event: web::Json<PointerEvent>) -> HttpResponse {
    transition(&state, "handle pointer event", |viewer| {
        viewer.handle_pointer(&event)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use actix_web::{App, http::StatusCode, test};
    use region_map_crime_models::{CrimeRecord, index_by_region};
    use region_map_overlay::{OverlayConfig, RandomHeatmapProvider};
    use region_map_region_models::RegionCatalog;
    use region_map_viewer::{DEFAULT_SHAPE_CLASS, MemoryStore, SvgMapDocument};
    use serde_json::Value;

    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path class="state" id="region1" d="M0 0h10v10z"/><path class="state" id="region2" d="M10 0h10v10z"/><path class="state" id="region9" d="M20 0h10v10z"/></svg>"#;

    fn app_state(loaded: bool) -> web::Data<AppState> {
        let mut viewer = Viewer::new(
            RegionCatalog::embedded(),
            OverlayConfig::embedded(),
            SvgMapDocument::parse(SVG, DEFAULT_SHAPE_CLASS).unwrap(),
            Box::new(MemoryStore::new()),
            Box::new(RandomHeatmapProvider::seeded(42)),
        );
        viewer.mount().unwrap();
        if loaded {
            let ticket = viewer.begin_crime_fetch();
            viewer.complete_crime_fetch(
                ticket,
                index_by_region(vec![CrimeRecord::new("region1", 1_750_000)]),
            );
        }
        web::Data::new(AppState {
            viewer: Arc::new(Mutex::new(viewer)),
        })
    }

    macro_rules! service {
        ($data:expr) => {
            test::init_service(App::new().app_data($data.clone()).configure(crate::configure))
                .await
        };
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let data = app_state(true);
        let app = service!(data);
        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/health").to_request())
                .await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn overlay_toggles_and_rejects_unknown() {
        let data = app_state(true);
        let app = service!(data);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/overlay/heatmap").to_request(),
        )
        .await;
        assert_eq!(body["mode"], "heatmap");
        assert_eq!(body["heatmapGroups"].as_object().unwrap().len(), 3);

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/overlay/crime").to_request(),
        )
        .await;
        assert_eq!(body["mode"], "crime");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/overlay/off").to_request(),
        )
        .await;
        assert_eq!(body["mode"], "none");

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/overlay/sepia").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn click_selects_and_reset_clears() {
        let data = app_state(true);
        let app = service!(data);

        test::call_service(
            &app,
            test::TestRequest::post().uri("/api/overlay/crime").to_request(),
        )
        .await;
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/api/map/events")
                .set_json(serde_json::json!({ "kind": "click", "shapeId": "region1" }))
                .to_request(),
        )
        .await;
        assert_eq!(body["selectedRegionId"], "region1");
        assert_eq!(body["selectedCrime"]["record"]["total"], 1_750_000);

        let shapes: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/shapes").to_request(),
        )
        .await;
        let region1 = shapes
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["id"] == "region1")
            .unwrap();
        assert_eq!(region1["visual"], "selected");

        let panel = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/api/panel").to_request(),
        )
        .await;
        assert!(String::from_utf8_lossy(&panel).contains("Сбросить выбор"));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/selection/reset").to_request(),
        )
        .await;
        assert!(body["selectedRegionId"].is_null());
        assert!(body["selectedCrime"].is_null());
        assert_eq!(body["mode"], "crime");
    }

    #[actix_web::test]
    async fn reset_all_clears_modes() {
        let data = app_state(true);
        let app = service!(data);

        test::call_service(
            &app,
            test::TestRequest::post().uri("/api/overlay/heatmap").to_request(),
        )
        .await;
        test::call_service(
            &app,
            test::TestRequest::post().uri("/api/selection/region2").to_request(),
        )
        .await;
        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/reset").to_request(),
        )
        .await;
        assert_eq!(body["mode"], "none");
        assert!(body["selectedRegionId"].is_null());
    }

    #[actix_web::test]
    async fn malformed_event_is_rejected() {
        let data = app_state(true);
        let app = service!(data);
        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/map/events")
                .set_json(serde_json::json!({ "kind": "scroll", "shapeId": "region1" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn view_switch_changes_page() {
        let data = app_state(true);
        let app = service!(data);

        let page = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(String::from_utf8_lossy(&page).contains(r#"id="map""#));

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post().uri("/api/view/stats").to_request(),
        )
        .await;
        assert_eq!(body["viewMode"], "stats");

        let page = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        let page = String::from_utf8_lossy(&page);
        assert!(!page.contains(r#"id="map""#));
        assert!(page.contains("Статистика по регионам"));

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri("/api/view/globe").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn map_svg_carries_styles() {
        let data = app_state(true);
        let app = service!(data);
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/map.svg").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "image/svg+xml"
        );
        let body = String::from_utf8_lossy(&test::read_body(resp).await).into_owned();
        assert!(body.contains("<style>"));
        assert!(body.contains(r#"[id="region1"]"#));
    }

    #[actix_web::test]
    async fn state_reports_loading_until_fetch_completes() {
        let data = app_state(false);
        let app = service!(data);
        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/state").to_request())
                .await;
        assert_eq!(body["loading"], true);

        {
            let mut viewer = data.viewer.lock().unwrap();
            let ticket = viewer.begin_crime_fetch();
            viewer.complete_crime_fetch(ticket, region_map_crime_models::CrimeDataMap::new());
        }
        let body: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/state").to_request())
                .await;
        assert_eq!(body["loading"], false);
    }

    #[actix_web::test]
    async fn regions_and_statistics() {
        let data = app_state(true);
        let app = service!(data);
        let regions: Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/regions").to_request())
                .await;
        assert_eq!(
            regions.as_array().unwrap().len(),
            RegionCatalog::embedded().len()
        );
        assert!(regions[0]["federalDistrict"].is_string());

        let stats: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/statistics").to_request(),
        )
        .await;
        assert!(stats["totalPopulation"].as_u64().unwrap() > 0);
        assert_eq!(stats["ranking"][0]["shareOfMax"], 1.0);
    }
}
