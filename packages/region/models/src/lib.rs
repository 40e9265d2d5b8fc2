#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region catalog types and the embedded reference data.
//!
//! The catalog maps a stable region identifier (shared with the `id`
//! attribute of the selectable shapes in the map asset) to descriptive
//! attributes. It is immutable once loaded: regions are baked into the
//! binary from `regions.toml` and never mutated at runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Region reference data embedded at compile time.
const REGIONS_TOML: &str = include_str!("../regions.toml");

/// Errors that can occur while loading a region catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The catalog TOML could not be parsed.
    #[error("Failed to parse region catalog: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two regions share the same identifier.
    #[error("Duplicate region id: {id}")]
    DuplicateId {
        /// The repeated identifier.
        id: String,
    },

    /// A region has an empty identifier.
    #[error("Region '{name}' has an empty id")]
    EmptyId {
        /// Display name of the offending region.
        name: String,
    },
}

/// One administrative unit in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    /// Stable identifier, matched against shape ids in the map asset.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Administrative capital.
    pub capital: String,
    /// Resident population, if known.
    #[serde(default)]
    pub population: Option<u64>,
    /// Area in square kilometres, if known.
    #[serde(default)]
    pub area: Option<u64>,
    /// Federal district the region belongs to.
    #[serde(alias = "federal_district")]
    pub federal_district: String,
    /// Primary industry.
    #[serde(default, alias = "main_industry")]
    pub main_industry: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Region {
    /// Returns the population only when it is known and non-zero.
    ///
    /// Rate computations must go through this so that a zero population is
    /// never used as a divisor.
    #[must_use]
    pub fn known_population(&self) -> Option<u64> {
        self.population.filter(|p| *p > 0)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    regions: Vec<Region>,
}

/// Read-only lookup table of [`Region`]s keyed by identifier.
///
/// Iteration order is the order regions were declared in.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    index: BTreeMap<String, usize>,
}

impl RegionCatalog {
    /// Builds a catalog from a list of regions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if an id is empty or repeated.
    pub fn from_regions(regions: Vec<Region>) -> Result<Self, CatalogError> {
        let mut index = BTreeMap::new();
        for (i, region) in regions.iter().enumerate() {
            if region.id.trim().is_empty() {
                return Err(CatalogError::EmptyId {
                    name: region.name.clone(),
                });
            }
            if index.insert(region.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateId {
                    id: region.id.clone(),
                });
            }
        }
        Ok(Self { regions, index })
    }

    /// Parses a catalog from TOML with a top-level `[[regions]]` array.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the TOML is malformed or ids are invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(toml_str)?;
        Self::from_regions(file.regions)
    }

    /// Returns the catalog embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `regions.toml` is malformed (this is a
    /// compile-time guarantee since the file is embedded).
    #[must_use]
    pub fn embedded() -> Self {
        let catalog = Self::from_toml(REGIONS_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse regions.toml: {e}"));
        log::debug!("Loaded {} regions from embedded catalog", catalog.len());
        catalog
    }

    /// Looks up a region by identifier.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Region> {
        self.index.get(id).map(|&i| &self.regions[i])
    }

    /// Returns `true` if the catalog has a region with this identifier.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Iterates regions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Number of regions in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if the catalog has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Sum of all known populations.
    #[must_use]
    pub fn total_population(&self) -> u64 {
        self.regions.iter().filter_map(|r| r.population).sum()
    }

    /// Builds the aggregate statistics view data.
    #[must_use]
    pub fn statistics(&self) -> RegionStatistics {
        RegionStatistics::from_catalog(self)
    }
}

/// One row of the population ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRegion {
    /// Region identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Population.
    pub population: u64,
    /// Population relative to the most populous region, in `0.0..=1.0`.
    pub share_of_max: f64,
}

/// Aggregate statistics shown in the statistics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionStatistics {
    /// Regions with a known population, most populous first.
    pub ranking: Vec<RankedRegion>,
    /// Sum of all known populations.
    pub total_population: u64,
    /// Regions whose population is unknown.
    pub unknown_population: Vec<String>,
}

impl RegionStatistics {
    /// Computes the ranking for a catalog.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_catalog(catalog: &RegionCatalog) -> Self {
        let mut known: Vec<(&Region, u64)> = catalog
            .iter()
            .filter_map(|r| r.known_population().map(|p| (r, p)))
            .collect();
        // Stable sort keeps declaration order among equal populations.
        known.sort_by(|a, b| b.1.cmp(&a.1));

        let max = known.first().map_or(0, |(_, p)| *p);

        let ranking = known
            .into_iter()
            .map(|(region, population)| RankedRegion {
                id: region.id.clone(),
                name: region.name.clone(),
                population,
                share_of_max: if max == 0 {
                    0.0
                } else {
                    population as f64 / max as f64
                },
            })
            .collect();

        let unknown_population = catalog
            .iter()
            .filter(|r| r.known_population().is_none())
            .map(|r| r.id.clone())
            .collect();

        Self {
            ranking,
            total_population: catalog.total_population(),
            unknown_population,
        }
    }
}
