#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overlay classifier for the region map.
//!
//! Maps raw metrics (crime totals, population) to a discrete
//! [`SeverityLevel`] and to presentation colors. Every threshold, palette,
//! and label table lives in TOML under `overlays/` and is baked into the
//! binary, so the classifier itself is pure and branch-free over data:
//!
//! - [`scale`]: `{thresholds, colors, hover_colors, labels}` per overlay
//! - [`rate`]: per-100k rate computation with an explicit unknown state
//! - [`heatmap`]: readiness status taxonomy and group assignment
//! - [`theme`]: neutral, hover, and selected shape styling

pub mod heatmap;
pub mod rate;
pub mod scale;
pub mod theme;

pub use heatmap::{HeatmapAssignment, HeatmapProvider, RandomHeatmapProvider, RegionStatus};
pub use rate::{CrimeAssessment, CrimeRate, assess_crime, rate_for};
pub use region_map_crime_models::SeverityLevel;
pub use scale::OverlayScale;
pub use theme::MapTheme;

/// Crime overlay table embedded at compile time.
const CRIME_TOML: &str = include_str!("../overlays/crime.toml");
/// Heatmap overlay table embedded at compile time.
const HEATMAP_TOML: &str = include_str!("../overlays/heatmap.toml");
/// Shape theme embedded at compile time.
const THEME_TOML: &str = include_str!("../overlays/theme.toml");

/// Errors that can occur while loading overlay configuration.
#[derive(Debug, thiserror::Error)]
pub enum OverlayConfigError {
    /// The TOML could not be parsed.
    #[error("Failed to parse overlay config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A table has the wrong number of entries.
    #[error("Expected {expected} {field}, found {found}")]
    WrongLength {
        /// Name of the offending table.
        field: &'static str,
        /// Required number of entries.
        expected: usize,
        /// Number of entries present.
        found: usize,
    },

    /// Thresholds are not strictly ascending.
    #[error("Thresholds must be strictly ascending: {thresholds:?}")]
    UnorderedThresholds {
        /// The thresholds as configured.
        thresholds: Vec<u64>,
    },

    /// The crime overlay has no thresholds.
    #[error("Overlay '{title}' requires thresholds")]
    MissingThresholds {
        /// Title of the overlay table.
        title: String,
    },
}

/// Every overlay table the viewer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Crime overlay scale (rate per 100k).
    pub crime: OverlayScale,
    /// Readiness heatmap scale.
    pub heatmap: OverlayScale,
    /// Shape styling.
    pub theme: MapTheme,
}

impl OverlayConfig {
    /// Parses the three overlay tables.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayConfigError`] if any table is malformed or the crime
    /// table has no thresholds.
    pub fn from_toml(
        crime: &str,
        heatmap: &str,
        theme: &str,
    ) -> Result<Self, OverlayConfigError> {
        let crime = OverlayScale::from_toml(crime)?;
        if crime.thresholds().is_none() {
            return Err(OverlayConfigError::MissingThresholds {
                title: crime.title().to_owned(),
            });
        }
        Ok(Self {
            crime,
            heatmap: OverlayScale::from_toml(heatmap)?,
            theme: toml::from_str(theme)?,
        })
    }

    /// Returns the configuration embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if an embedded table is malformed (this is a compile-time
    /// guarantee since the tables are embedded).
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(CRIME_TOML, HEATMAP_TOML, THEME_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded overlay tables: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_loads() {
        let config = OverlayConfig::embedded();
        assert_eq!(config.crime.thresholds(), Some([5000, 7000, 10000]));
        assert_eq!(config.crime.label(SeverityLevel::Low), "Низкая");
        assert_eq!(config.heatmap.colors()[0], "#ef4444");
        assert_eq!(config.theme.neutral, "#cbd5e1");
    }

    #[test]
    fn crime_table_without_thresholds_is_rejected() {
        let err = OverlayConfig::from_toml(HEATMAP_TOML, HEATMAP_TOML, THEME_TOML).unwrap_err();
        assert!(matches!(err, OverlayConfigError::MissingThresholds { .. }));
    }
}
