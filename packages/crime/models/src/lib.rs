#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-region crime record types and severity levels.
//!
//! A [`CrimeRecord`] is associated with exactly one region identifier and
//! carries the total incident count plus category subtotals. Records are
//! fetched wholesale from the crime data source at session start and only
//! ever replaced wholesale, never mutated.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Crime records keyed by region identifier.
pub type CrimeDataMap = BTreeMap<String, CrimeRecord>;

/// Severity bucket produced by the overlay classifier, from 0 (lowest) to
/// 3 (highest).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    /// Level 0: below the first threshold
    Low = 0,
    /// Level 1: below the second threshold
    Medium = 1,
    /// Level 2: below the third threshold
    High = 2,
    /// Level 3: at or above the third threshold
    VeryHigh = 3,
}

impl SeverityLevel {
    /// Returns the numeric value of this level, usable as a palette index.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Returns the level as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Creates a level from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range 0-3.
    pub const fn from_value(value: u8) -> Result<Self, InvalidLevelError> {
        match value {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            3 => Ok(Self::VeryHigh),
            _ => Err(InvalidLevelError { value }),
        }
    }

    /// Returns all levels, lowest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Low, Self::Medium, Self::High, Self::VeryHigh]
    }
}

/// Error returned when attempting to create a [`SeverityLevel`] from an
/// invalid numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLevelError {
    /// The invalid level value that was provided.
    pub value: u8,
}

impl std::fmt::Display for InvalidLevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid severity level {}: expected 0-3", self.value)
    }
}

impl std::error::Error for InvalidLevelError {}

/// Crime categories broken out in each record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CrimeCategory {
    /// Grave and especially grave offenses
    Severe,
    /// Extremist offenses
    Extremism,
    /// Terrorist offenses
    Terrorism,
    /// Illegal weapons trafficking and possession
    Weapons,
}

impl CrimeCategory {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Severe, Self::Extremism, Self::Terrorism, Self::Weapons]
    }

    /// Human-readable label shown in the detail panel.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Severe => "Тяжкие и особо тяжкие",
            Self::Extremism => "Экстремизм",
            Self::Terrorism => "Терроризм",
            Self::Weapons => "Незаконный оборот оружия",
        }
    }
}

/// Direction in which a region's crime figures are moving.
///
/// The crime service sends Russian values; English names are accepted too.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum CrimeTrend {
    /// Figures are growing
    #[serde(rename = "рост", alias = "rising")]
    #[strum(to_string = "рост", serialize = "rising")]
    Rising,
    /// Figures are shrinking
    #[serde(rename = "снижение", alias = "falling")]
    #[strum(to_string = "снижение", serialize = "falling")]
    Falling,
    /// No significant change
    #[serde(rename = "стабильность", alias = "stable")]
    #[strum(to_string = "стабильность", serialize = "stable")]
    Stable,
}

/// Crime figures for one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeRecord {
    /// Region identifier this record belongs to.
    pub region: String,
    /// Total registered incidents.
    pub total: u64,
    /// Grave and especially grave offenses.
    #[serde(default)]
    pub severe: u64,
    /// Extremist offenses.
    #[serde(default)]
    pub extremism: u64,
    /// Terrorist offenses.
    #[serde(default)]
    pub terrorism: u64,
    /// Weapons offenses.
    #[serde(default)]
    pub weapons: u64,
    /// Most common offense type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_common_crime: Option<String>,
    /// Direction of change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<CrimeTrend>,
    /// When the figures were last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDate>,
}

impl CrimeRecord {
    /// Creates a record with only the total set.
    #[must_use]
    pub fn new(region: &str, total: u64) -> Self {
        Self {
            region: region.to_owned(),
            total,
            severe: 0,
            extremism: 0,
            terrorism: 0,
            weapons: 0,
            most_common_crime: None,
            trend: None,
            last_updated: None,
        }
    }

    /// Returns the subtotal for a category.
    #[must_use]
    pub const fn count(&self, category: CrimeCategory) -> u64 {
        match category {
            CrimeCategory::Severe => self.severe,
            CrimeCategory::Extremism => self.extremism,
            CrimeCategory::Terrorism => self.terrorism,
            CrimeCategory::Weapons => self.weapons,
        }
    }
}

/// Indexes a list of records by region identifier.
///
/// When the list contains several records for the same region, the last
/// one wins.
#[must_use]
pub fn index_by_region(records: Vec<CrimeRecord>) -> CrimeDataMap {
    records
        .into_iter()
        .map(|record| (record.region.clone(), record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_from_value_roundtrip() {
        for v in 0..=3u8 {
            let level = SeverityLevel::from_value(v).unwrap();
            assert_eq!(level.value(), v);
            assert_eq!(level.index(), usize::from(v));
        }
        assert!(SeverityLevel::from_value(4).is_err());
    }

    #[test]
    fn levels_are_ordered_lowest_first() {
        let all = SeverityLevel::all();
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn parses_wire_record_with_russian_trend() {
        let json = r#"{
            "region": "region1",
            "total": 700,
            "severe": 120,
            "weapons": 4,
            "mostCommonCrime": "Кражи",
            "trend": "рост",
            "lastUpdated": "2023-11-01"
        }"#;
        let record: CrimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.region, "region1");
        assert_eq!(record.total, 700);
        assert_eq!(record.count(CrimeCategory::Severe), 120);
        assert_eq!(record.count(CrimeCategory::Extremism), 0);
        assert_eq!(record.trend, Some(CrimeTrend::Rising));
        assert_eq!(
            record.last_updated,
            NaiveDate::from_ymd_opt(2023, 11, 1)
        );
    }

    #[test]
    fn accepts_english_trend_alias() {
        let json = r#"{"region": "r", "total": 1, "trend": "stable"}"#;
        let record: CrimeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.trend, Some(CrimeTrend::Stable));
        assert_eq!("falling".parse::<CrimeTrend>().unwrap(), CrimeTrend::Falling);
        assert_eq!(CrimeTrend::Falling.to_string(), "снижение");
    }

    #[test]
    fn rejects_record_without_region() {
        let json = r#"{"total": 5}"#;
        assert!(serde_json::from_str::<CrimeRecord>(json).is_err());
    }

    #[test]
    fn index_keeps_last_duplicate() {
        let map = index_by_region(vec![
            CrimeRecord::new("a", 1),
            CrimeRecord::new("b", 2),
            CrimeRecord::new("a", 3),
        ]);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"].total, 3);
    }
}
