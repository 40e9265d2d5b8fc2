//! View toggle, overlay toggles, legend, and loading indicator.

use std::fmt::Write as _;

use region_map_overlay::{OverlayConfig, OverlayScale};
use region_map_viewer::{OverlayMode, ViewMode};
use v_htmlescape::escape;

/// Map / statistics switch.
#[must_use]
pub fn view_toggle(current: ViewMode) -> String {
    let button = |mode: ViewMode, label: &str| {
        let class = if mode == current { "tab active" } else { "tab" };
        format!(r#"<button class="{class}" data-post="/api/view/{mode}">{label}</button>"#)
    };
    format!(
        r#"<div class="view-toggle">{}{}</div>"#,
        button(ViewMode::Map, "Карта"),
        button(ViewMode::Stats, "Статистика"),
    )
}

/// Heatmap and crime buttons. While one overlay is on, the other is
/// disabled.
#[must_use]
pub fn overlay_toggles(mode: OverlayMode, config: &OverlayConfig) -> String {
    let button = |target: OverlayMode, label: &str, active_class: &str| {
        let active = mode == target;
        let disabled = mode != OverlayMode::None && !active;
        let mut class = String::from("overlay-toggle");
        if active {
            class.push(' ');
            class.push_str(active_class);
        }
        format!(
            r#"<button class="{class}" data-post="/api/overlay/{target}"{disabled} aria-pressed="{active}">{label}</button>"#,
            disabled = if disabled { " disabled" } else { "" },
            label = escape(label),
        )
    };
    format!(
        r#"<div class="overlay-toggles">{}{}</div>"#,
        button(OverlayMode::Heatmap, config.heatmap.title(), "heatmap-on"),
        button(OverlayMode::Crime, "Криминогенная обстановка", "crime-on"),
    )
}

fn legend_for(scale: &OverlayScale) -> String {
    let mut items = String::new();
    for (color, label) in scale.legend() {
        let _ = write!(
            items,
            r#"<div class="legend-item"><span class="swatch" style="background-color: {color}"></span><span>{}</span></div>"#,
            escape(label)
        );
    }
    format!(
        r#"<div class="legend"><h3>{}:</h3><div class="legend-items">{items}</div></div>"#,
        escape(scale.title())
    )
}

/// Legend of the active overlay; empty with no overlay.
#[must_use]
pub fn legend(mode: OverlayMode, config: &OverlayConfig) -> String {
    match mode {
        OverlayMode::Heatmap => legend_for(&config.heatmap),
        OverlayMode::Crime => legend_for(&config.crime),
        OverlayMode::None => String::new(),
    }
}

/// Shown while crime data is outstanding.
#[must_use]
pub fn loading_indicator(loading: bool) -> String {
    if loading {
        r#"<div class="loading" role="status"><span class="spinner"></span>Загрузка данных о преступности…</div>"#
            .to_owned()
    } else {
        String::new()
    }
}
