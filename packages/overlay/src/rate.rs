//! Crime rate per 100,000 residents.
//!
//! A rate is only computable when the population is known and non-zero.
//! Everything else is [`CrimeRate::Unknown`], so a division by zero can
//! never surface as `inf` or `NaN` in the UI.

use region_map_crime_models::CrimeRecord;
use region_map_region_models::Region;
use serde::Serialize;

use crate::{OverlayScale, SeverityLevel};

/// Residents per rate unit.
pub const PER_RESIDENTS: u64 = 100_000;

/// Result of a rate computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CrimeRate {
    /// Incidents per 100,000 residents, rounded to the nearest integer.
    PerHundredThousand(u64),
    /// Population missing or zero.
    Unknown,
}

impl CrimeRate {
    /// Returns the numeric rate, if known.
    #[must_use]
    pub const fn value(self) -> Option<u64> {
        match self {
            Self::PerHundredThousand(v) => Some(v),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for CrimeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PerHundredThousand(v) => write!(f, "{v} на 100к"),
            Self::Unknown => f.write_str("неизвестно"),
        }
    }
}

/// Computes `round(total / population * 100000)`.
///
/// Integer arithmetic rounds half up, matching `Math.round` for the
/// non-negative values involved.
#[must_use]
pub fn rate_for(total: u64, population: Option<u64>) -> CrimeRate {
    match population {
        Some(population) if population > 0 => {
            let scaled = u128::from(total) * u128::from(PER_RESIDENTS);
            let population = u128::from(population);
            let rounded = (scaled * 2 + population) / (population * 2);
            CrimeRate::PerHundredThousand(u64::try_from(rounded).unwrap_or(u64::MAX))
        }
        _ => CrimeRate::Unknown,
    }
}

/// A crime record classified against a scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeAssessment {
    /// Computed rate.
    pub rate: CrimeRate,
    /// Severity bucket; `None` when the rate is unknown.
    pub level: Option<SeverityLevel>,
}

/// Classifies a record using the population of its region.
///
/// A record for a region missing from the catalog has an unknown rate.
#[must_use]
pub fn assess_crime(
    record: &CrimeRecord,
    region: Option<&Region>,
    scale: &OverlayScale,
) -> CrimeAssessment {
    let rate = rate_for(record.total, region.and_then(Region::known_population));
    CrimeAssessment {
        rate,
        level: rate.value().map(|r| scale.classify(r)),
    }
}
