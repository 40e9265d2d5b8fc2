//! Selected-region detail panel and the "no selection" prompt.

use std::fmt::Write as _;

use region_map_crime_models::CrimeCategory;
use region_map_region_models::Region;
use region_map_viewer::{CrimeSnapshot, MapView, OverlayMode};
use v_htmlescape::escape;

use crate::format;

/// Placeholder shown when nothing (or an unknown shape) is selected.
#[must_use]
pub fn prompt() -> String {
    r#"<div class="panel prompt"><p>Выберите регион на карте для отображения информации</p></div>"#
        .to_owned()
}

fn field(html: &mut String, label: &str, value: &str) {
    let _ = write!(
        html,
        r#"<p><span class="field">{label}:</span> {}</p>"#,
        escape(value)
    );
}

fn crime_block(html: &mut String, view: &MapView<'_>, snapshot: &CrimeSnapshot) {
    let record = &snapshot.record;
    html.push_str(r#"<section class="crime"><h3>Криминогенная обстановка</h3>"#);
    field(html, "Всего преступлений", &format::group_digits(record.total));

    html.push_str("<ul>");
    for category in CrimeCategory::all() {
        let _ = write!(
            html,
            "<li>{}: {}</li>",
            category.label(),
            format::group_digits(record.count(*category))
        );
    }
    html.push_str("</ul>");

    match snapshot.assessment.level {
        Some(level) => {
            let _ = write!(
                html,
                r#"<p><span class="field">Уровень:</span> <span class="level" style="color: {}">{}</span> ({})</p>"#,
                view.config.crime.color(level),
                escape(view.config.crime.label(level)),
                snapshot.assessment.rate
            );
        }
        None => field(html, "Уровень", "неизвестно (нет данных о населении)"),
    }
    if let Some(most_common) = &record.most_common_crime {
        field(html, "Самый распространённый тип", most_common);
    }
    if let Some(trend) = record.trend {
        field(html, "Тенденция", trend.as_ref());
    }
    if let Some(updated) = record.last_updated {
        field(html, "Обновлено", &format::date(updated));
    }
    html.push_str("</section>");
}

/// Detail panel for a catalog region.
#[must_use]
pub fn region_panel(view: &MapView<'_>, region: &Region, loading: bool) -> String {
    let state = view.state;
    let mut html = format!(
        r#"<div class="panel region"><h2>{}</h2><div class="fields">"#,
        escape(&region.name)
    );
    field(&mut html, "Столица", &region.capital);
    field(&mut html, "Федеральный округ", &region.federal_district);
    field(
        &mut html,
        "Население",
        &region
            .known_population()
            .map_or_else(|| "неизвестно".to_owned(), format::people),
    );
    if let Some(area) = region.area {
        field(&mut html, "Площадь", &format!("{} км²", format::group_digits(area)));
    }
    if let Some(industry) = &region.main_industry {
        field(&mut html, "Основная отрасль", industry);
    }
    if let Some(description) = &region.description {
        field(&mut html, "Описание", description);
    }

    match state.mode() {
        OverlayMode::Heatmap => {
            if let Some(status) = state.selected_status() {
                let level = status.level();
                let _ = write!(
                    html,
                    r#"<p class="status"><span class="swatch" style="background-color: {}"></span>Статус: {}</p>"#,
                    view.config.heatmap.color(level),
                    escape(view.config.heatmap.label(level))
                );
            }
        }
        OverlayMode::Crime => match state.selected_crime() {
            Some(snapshot) => crime_block(&mut html, view, snapshot),
            None if loading => html.push_str(r#"<p class="crime">Загрузка данных…</p>"#),
            None => html.push_str(r#"<p class="crime">Нет данных о преступности</p>"#),
        },
        OverlayMode::None => {}
    }

    html.push_str(
        r#"</div><button class="reset" data-post="/api/selection/reset">Сбросить выбор</button></div>"#,
    );
    html
}

/// Detail panel for the current selection, or the prompt.
#[must_use]
pub fn selection_panel(view: &MapView<'_>, loading: bool) -> String {
    view.state
        .selected_region_id()
        .and_then(|id| view.catalog.get(id))
        .map_or_else(prompt, |region| region_panel(view, region, loading))
}
