//! Readiness heatmap: status taxonomy and group assignment.
//!
//! Group indices are not derived from any real readiness signal yet.
//! [`RandomHeatmapProvider`] is the placeholder until a readiness feed
//! exists; callers only depend on [`HeatmapProvider`].

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::SeverityLevel;
use crate::scale::BUCKETS;

/// Region identifier → heatmap group index (0-3).
pub type HeatmapAssignment = BTreeMap<String, u8>;

/// Readiness status of a region, in heatmap table order.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegionStatus {
    /// Regime already introduced
    Entered = 0,
    /// Meets the requirements for introduction
    Ready = 1,
    /// No state institutions able to support the regime
    Possible = 2,
    /// Nothing known
    NoInfo = 3,
}

impl RegionStatus {
    /// Maps a heatmap group index to its status.
    #[must_use]
    pub const fn from_group(group: u8) -> Option<Self> {
        match group {
            0 => Some(Self::Entered),
            1 => Some(Self::Ready),
            2 => Some(Self::Possible),
            3 => Some(Self::NoInfo),
            _ => None,
        }
    }

    /// Bucket in the heatmap scale for this status.
    #[must_use]
    pub const fn level(self) -> SeverityLevel {
        match self {
            Self::Entered => SeverityLevel::Low,
            Self::Ready => SeverityLevel::Medium,
            Self::Possible => SeverityLevel::High,
            Self::NoInfo => SeverityLevel::VeryHigh,
        }
    }
}

/// Source of heatmap group assignments.
pub trait HeatmapProvider: Send {
    /// Assigns a group to every identifier.
    fn assign(&mut self, ids: &[String]) -> HeatmapAssignment;
}

/// Assigns each region a uniformly random group.
pub struct RandomHeatmapProvider {
    rng: StdRng,
}

impl RandomHeatmapProvider {
    /// Creates a provider seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a provider with a fixed seed, for reproducible assignments.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomHeatmapProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HeatmapProvider for RandomHeatmapProvider {
    #[allow(clippy::cast_possible_truncation)]
    fn assign(&mut self, ids: &[String]) -> HeatmapAssignment {
        let assignment: HeatmapAssignment = ids
            .iter()
            .filter(|id| !id.is_empty())
            .map(|id| (id.clone(), self.rng.gen_range(0..BUCKETS) as u8))
            .collect();
        log::debug!("Assigned heatmap groups to {} regions", assignment.len());
        assignment
    }
}
