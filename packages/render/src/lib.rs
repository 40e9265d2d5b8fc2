#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTML presentation of the region map viewer.
//!
//! Every function here is a pure function of a [`PageContext`]. The page
//! shell embeds a small script that inlines `/map.svg`, forwards pointer
//! events on selectable shapes to `/api/map/events`, and swaps in the
//! fragments returned by the API.

pub mod controls;
pub mod format;
pub mod panel;
pub mod stats;

use region_map_viewer::{MapDocument, MapView, ViewMode, Viewer};

/// Page stylesheet.
const PAGE_CSS: &str = include_str!("../static/page.css");
/// Page behaviour.
const PAGE_JS: &str = include_str!("../static/page.js");

/// Everything presentation reads.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub view: MapView<'a>,
    /// Crime data still loading.
    pub loading: bool,
}

impl<'a> PageContext<'a> {
    #[must_use]
    pub fn from_viewer<D: MapDocument>(viewer: &'a Viewer<D>) -> Self {
        Self {
            view: viewer.view(),
            loading: viewer.is_loading(),
        }
    }
}

/// Toggles, legend, and loading indicator.
#[must_use]
pub fn control_bar(ctx: &PageContext<'_>) -> String {
    let state = ctx.view.state;
    format!(
        r#"<div class="controls">{view_toggle}{overlay_toggles}</div>{loading}"#,
        view_toggle = controls::view_toggle(state.view_mode()),
        overlay_toggles = controls::overlay_toggles(state.mode(), ctx.view.config),
        loading = controls::loading_indicator(ctx.loading),
    )
}

/// The side panel in map view, or the statistics view.
#[must_use]
pub fn side_panel(ctx: &PageContext<'_>) -> String {
    match ctx.view.state.view_mode() {
        ViewMode::Map => panel::selection_panel(&ctx.view, ctx.loading),
        ViewMode::Stats => stats::statistics(&ctx.view.catalog.statistics(), ctx.view.catalog),
    }
}

/// The full page.
#[must_use]
pub fn page(ctx: &PageContext<'_>) -> String {
    let state = ctx.view.state;
    let map = match state.view_mode() {
        ViewMode::Map => format!(
            r#"<div class="map-column"><div id="map" class="map"></div>{legend}<div id="tooltip" class="tooltip" hidden></div></div>"#,
            legend = controls::legend(state.mode(), ctx.view.config),
        ),
        ViewMode::Stats => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Интерактивная карта регионов</title>
    <style>{css}</style>
</head>
<body data-loading="{loading}">
    <header>
        <h1>Интерактивная карта регионов</h1>
        <p>Изучите статистику и особенности регионов</p>
    </header>
    {controls}
    <main class="layout {view}">
        {map}
        <aside id="panel">{panel}</aside>
    </main>
    <script>{js}</script>
</body>
</html>"#,
        css = PAGE_CSS,
        js = PAGE_JS,
        loading = ctx.loading,
        controls = control_bar(ctx),
        view = state.view_mode(),
        panel = side_panel(ctx),
    )
}

#[cfg(test)]
mod tests {
    use region_map_overlay::{OverlayConfig, RandomHeatmapProvider};
    use region_map_region_models::RegionCatalog;
    use region_map_viewer::{DEFAULT_SHAPE_CLASS, MemoryStore, SvgMapDocument};

    use super::*;

    fn viewer() -> Viewer {
        let mut viewer = Viewer::new(
            RegionCatalog::embedded(),
            OverlayConfig::embedded(),
            SvgMapDocument::parse(
                r#"<svg><path class="state" id="region1"/></svg>"#,
                DEFAULT_SHAPE_CLASS,
            )
            .unwrap(),
            Box::new(MemoryStore::new()),
            Box::new(RandomHeatmapProvider::seeded(1)),
        );
        viewer.mount().unwrap();
        viewer
    }

    #[test]
    fn map_view_page_has_map_and_prompt() {
        let viewer = viewer();
        let html = page(&PageContext::from_viewer(&viewer));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<div id="map" class="map"></div>"#));
        assert!(html.contains("Выберите регион на карте"));
        assert!(html.contains(r#"<body data-loading="true">"#));
        assert!(html.contains("Загрузка данных о преступности"));
    }

    #[test]
    fn stats_view_page_has_no_map() {
        let mut viewer = viewer();
        viewer.set_view_mode(ViewMode::Stats).unwrap();
        let ticket = viewer.begin_crime_fetch();
        viewer.complete_crime_fetch(ticket, region_map_crime_models::CrimeDataMap::new());

        let html = page(&PageContext::from_viewer(&viewer));
        assert!(!html.contains(r#"id="map""#));
        assert!(html.contains("Статистика по регионам"));
        assert!(html.contains(r#"<main class="layout stats">"#));
        assert!(!html.contains("Загрузка данных о преступности"));
    }

    #[test]
    fn page_script_posts_pointer_events_in_order() {
        assert!(PAGE_JS.contains("queue = queue"));
        assert!(PAGE_JS.contains(r#".then(() => post("/api/map/events", { kind, shapeId }))"#));
        assert!(!PAGE_JS.contains("await post(\"/api/map/events\""));
        for kind in ["enter", "leave", "click"] {
            assert!(PAGE_JS.contains(&format!(r#"send("{kind}", shape.id)"#)));
        }
    }

    #[test]
    fn side_panel_follows_selection() {
        let mut viewer = viewer();
        viewer.select_region("region1").unwrap();
        let html = side_panel(&PageContext::from_viewer(&viewer));
        assert!(html.contains("Сбросить выбор"));

        viewer.reset_selection().unwrap();
        let html = side_panel(&PageContext::from_viewer(&viewer));
        assert_eq!(html, panel::prompt());
    }
}
