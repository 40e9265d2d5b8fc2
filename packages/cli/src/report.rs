//! Plain-text reports printed by the CLI.

use std::fmt::Write as _;

use region_map_crime_models::CrimeDataMap;
use region_map_overlay::{OverlayScale, assess_crime, rate_for};
use region_map_region_models::RegionCatalog;
use region_map_render::format;

/// Truncates `s` to `width` characters for table display.
fn cell(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let truncated: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// One line per catalog region.
#[must_use]
pub fn regions(catalog: &RegionCatalog) -> String {
    let mut out = format!(
        "{:<12} {:<32} {:<20} {:>16}\n{}\n",
        "ID",
        "NAME",
        "CAPITAL",
        "POPULATION",
        "-".repeat(83)
    );
    for region in catalog.iter() {
        let population = region
            .known_population()
            .map_or_else(|| "?".to_string(), format::group_digits);
        let _ = writeln!(
            out,
            "{:<12} {:<32} {:<20} {:>16}",
            region.id,
            cell(&region.name, 32),
            cell(&region.capital, 20),
            population
        );
    }
    let _ = write!(out, "\n{} region(s)", catalog.len());
    out
}

/// Population ranking and total.
#[must_use]
pub fn statistics(catalog: &RegionCatalog) -> String {
    let stats = catalog.statistics();
    let mut out = String::new();
    for (i, row) in stats.ranking.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {:<32} {:>20}",
            i + 1,
            cell(&row.name, 32),
            format::people(row.population)
        );
    }
    for id in &stats.unknown_population {
        let name = catalog.get(id).map_or(id.as_str(), |r| r.name.as_str());
        let _ = writeln!(out, "   - {name}: население неизвестно");
    }
    let _ = write!(
        out,
        "Общее население: {}",
        format::people(stats.total_population)
    );
    out
}

/// Rate and level for a total and population.
#[must_use]
pub fn classify(total: u64, population: Option<u64>, scale: &OverlayScale) -> String {
    let rate = rate_for(total, population);
    rate.value().map_or_else(
        || format!("{rate}: уровень неизвестен"),
        |value| {
            let level = scale.classify(value);
            format!("{rate}: {} (level {})", scale.label(level), level.value())
        },
    )
}

/// Crime records with their assessed level.
#[must_use]
pub fn crimes(data: &CrimeDataMap, catalog: &RegionCatalog, scale: &OverlayScale) -> String {
    if data.is_empty() {
        return "No crime data.".to_string();
    }

    let mut out = format!(
        "{:<12} {:<32} {:>12} {:>14} LEVEL\n{}\n",
        "REGION",
        "NAME",
        "TOTAL",
        "RATE",
        "-".repeat(90)
    );
    for (id, record) in data {
        let region = catalog.get(id);
        let assessment = assess_crime(record, region, scale);
        let _ = writeln!(
            out,
            "{:<12} {:<32} {:>12} {:>14} {}",
            id,
            cell(region.map_or("(не в каталоге)", |r| r.name.as_str()), 32),
            format::group_digits(record.total),
            assessment.rate.to_string(),
            assessment.level.map_or("-", |level| scale.label(level))
        );
    }
    let _ = write!(out, "\n{} record(s)", data.len());
    out
}

#[cfg(test)]
mod tests {
    use region_map_crime_models::{CrimeRecord, index_by_region};
    use region_map_overlay::OverlayConfig;

    use super::*;

    #[test]
    fn classify_known_and_unknown_population() {
        let config = OverlayConfig::embedded();
        assert_eq!(
            classify(700, Some(100_000), &config.crime),
            "700 на 100к: Низкая (level 0)"
        );
        assert_eq!(
            classify(8_000, Some(100_000), &config.crime),
            "8000 на 100к: Высокая (level 2)"
        );
        assert_eq!(
            classify(700, Some(0), &config.crime),
            "неизвестно: уровень неизвестен"
        );
        assert_eq!(
            classify(700, None, &config.crime),
            "неизвестно: уровень неизвестен"
        );
    }

    #[test]
    fn regions_lists_every_region() {
        let catalog = RegionCatalog::embedded();
        let out = regions(&catalog);
        assert!(out.ends_with(&format!("{} region(s)", catalog.len())));
        assert!(out.contains("region9"));
    }

    #[test]
    fn statistics_ends_with_total() {
        let catalog = RegionCatalog::embedded();
        let out = statistics(&catalog);
        assert!(out.starts_with("  1. "));
        assert!(out.contains("население неизвестно"));
        assert!(out.contains("Общее население: "));
    }

    #[test]
    fn crimes_table() {
        let config = OverlayConfig::embedded();
        let catalog = RegionCatalog::embedded();
        assert_eq!(crimes(&CrimeDataMap::new(), &catalog, &config.crime), "No crime data.");

        let data = index_by_region(vec![
            CrimeRecord::new("region1", 1_750_000),
            CrimeRecord::new("elsewhere", 5),
        ]);
        let out = crimes(&data, &catalog, &config.crime);
        assert!(out.contains("7000 на 100к"));
        assert!(out.contains("Высокая"));
        assert!(out.contains("(не в каталоге)"));
        assert!(out.ends_with("2 record(s)"));
    }
}
