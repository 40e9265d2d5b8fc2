//! Aggregate statistics view.

use std::fmt::Write as _;

use region_map_region_models::{RegionCatalog, RegionStatistics};
use v_htmlescape::escape;

use crate::format;

/// Population ranking with relative bars and the total.
#[must_use]
pub fn statistics(stats: &RegionStatistics, catalog: &RegionCatalog) -> String {
    let mut html =
        String::from(r#"<div class="panel stats"><h2>Статистика по регионам</h2><div class="ranking">"#);
    for row in &stats.ranking {
        let _ = write!(
            html,
            r#"<div class="row"><div class="row-head"><span class="name">{}</span><span>{}</span></div><div class="bar"><div class="fill" style="width: {:.1}%"></div></div></div>"#,
            escape(&row.name),
            format::people(row.population),
            row.share_of_max * 100.0
        );
    }
    html.push_str("</div>");

    if !stats.unknown_population.is_empty() {
        let names: Vec<String> = stats
            .unknown_population
            .iter()
            .map(|id| escape(catalog.get(id).map_or(id.as_str(), |r| r.name.as_str())).to_string())
            .collect();
        let _ = write!(
            html,
            r#"<p class="unknown">Население неизвестно: {}</p>"#,
            names.join(", ")
        );
    }

    let _ = write!(
        html,
        r#"<div class="total"><span>Общее население:</span> <strong>{}</strong></div></div>"#,
        format::people(stats.total_population)
    );
    html
}
