//! Application selection state.
//!
//! [`SelectionState`] is a plain value. Every transition takes `&self` and
//! returns the replacement state, so the owner swaps the whole value and
//! nothing observes a half-applied change.

use region_map_crime_models::{CrimeDataMap, CrimeRecord};
use region_map_overlay::{
    CrimeAssessment, HeatmapAssignment, OverlayScale, RegionStatus, assess_crime,
};
use region_map_region_models::RegionCatalog;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which overlay colors the map. Heatmap and crime are mutually exclusive.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverlayMode {
    /// Neutral map.
    #[default]
    None,
    /// Readiness heatmap.
    Heatmap,
    /// Crime rate overlay.
    Crime,
}

impl OverlayMode {
    /// Builds a mode from the two persisted flags.
    ///
    /// Both flags set is contradictory and yields [`OverlayMode::None`].
    #[must_use]
    pub fn from_flags(heatmap: bool, crime: bool) -> Self {
        match (heatmap, crime) {
            (true, false) => Self::Heatmap,
            (false, true) => Self::Crime,
            (true, true) => {
                log::warn!("Both overlay flags set in stored state, disabling overlays");
                Self::None
            }
            (false, false) => Self::None,
        }
    }

    /// Returns `(is_heatmap_enabled, is_crime_mode_enabled)`.
    #[must_use]
    pub const fn flags(self) -> (bool, bool) {
        (self.is_heatmap(), self.is_crime())
    }

    #[must_use]
    pub const fn is_heatmap(self) -> bool {
        matches!(self, Self::Heatmap)
    }

    #[must_use]
    pub const fn is_crime(self) -> bool {
        matches!(self, Self::Crime)
    }
}

/// Which main view is shown.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ViewMode {
    /// Interactive map with detail panel.
    #[default]
    Map,
    /// Aggregate statistics.
    Stats,
}

/// Crime data captured for the selected region at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeSnapshot {
    pub record: CrimeRecord,
    pub assessment: CrimeAssessment,
}

/// What [`SelectionState::select_region`] needs to derive snapshots.
#[derive(Debug, Clone, Copy)]
pub struct SelectionContext<'a> {
    pub catalog: &'a RegionCatalog,
    /// `None` while crime data is still loading.
    pub crime_data: Option<&'a CrimeDataMap>,
    pub crime_scale: &'a OverlayScale,
}

/// Overlay mode, heatmap groups, current selection and view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    mode: OverlayMode,
    heatmap_groups: HeatmapAssignment,
    selected_region_id: Option<String>,
    selected_status: Option<RegionStatus>,
    selected_crime: Option<CrimeSnapshot>,
    view_mode: ViewMode,
}

impl SelectionState {
    /// Restores the persisted subset; nothing is selected.
    #[must_use]
    pub const fn restored(
        mode: OverlayMode,
        heatmap_groups: HeatmapAssignment,
        view_mode: ViewMode,
    ) -> Self {
        Self {
            mode,
            heatmap_groups,
            selected_region_id: None,
            selected_status: None,
            selected_crime: None,
            view_mode,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> OverlayMode {
        self.mode
    }

    #[must_use]
    pub const fn heatmap_groups(&self) -> &HeatmapAssignment {
        &self.heatmap_groups
    }

    /// Heatmap group of a region, if one was assigned.
    #[must_use]
    pub fn heatmap_group(&self, id: &str) -> Option<u8> {
        self.heatmap_groups.get(id).copied()
    }

    #[must_use]
    pub fn selected_region_id(&self) -> Option<&str> {
        self.selected_region_id.as_deref()
    }

    #[must_use]
    pub const fn selected_status(&self) -> Option<RegionStatus> {
        self.selected_status
    }

    #[must_use]
    pub const fn selected_crime(&self) -> Option<&CrimeSnapshot> {
        self.selected_crime.as_ref()
    }

    #[must_use]
    pub const fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Returns `true` if `id` is the selected region.
    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_region_id.as_deref() == Some(id)
    }

    /// Switches to the heatmap, replacing the group assignment.
    #[must_use]
    pub fn enable_heatmap(&self, groups: HeatmapAssignment) -> Self {
        Self {
            mode: OverlayMode::Heatmap,
            heatmap_groups: groups,
            ..self.clone()
        }
    }

    /// Switches to the crime overlay.
    #[must_use]
    pub fn enable_crime_mode(&self) -> Self {
        Self {
            mode: OverlayMode::Crime,
            ..self.clone()
        }
    }

    /// Turns every overlay off. The heatmap assignment is kept so the
    /// persisted record still carries it.
    #[must_use]
    pub fn disable_overlay(&self) -> Self {
        Self {
            mode: OverlayMode::None,
            ..self.clone()
        }
    }

    /// Turns the heatmap off, or on with groups from `generate`.
    ///
    /// `generate` is only called when the heatmap is being enabled.
    #[must_use]
    pub fn toggle_heatmap(&self, generate: impl FnOnce() -> HeatmapAssignment) -> Self {
        if self.mode.is_heatmap() {
            self.disable_overlay()
        } else {
            self.enable_heatmap(generate())
        }
    }

    #[must_use]
    pub fn toggle_crime_mode(&self) -> Self {
        if self.mode.is_crime() {
            self.disable_overlay()
        } else {
            self.enable_crime_mode()
        }
    }

    /// Selects `id` and snapshots its overlay data for the active mode.
    ///
    /// An id missing from the catalog is still recorded, with no snapshot.
    #[must_use]
    pub fn select_region(&self, id: &str, ctx: &SelectionContext<'_>) -> Self {
        let region = ctx.catalog.get(id);
        let (selected_status, selected_crime) = match (self.mode, region) {
            (_, None) | (OverlayMode::None, _) => (None, None),
            (OverlayMode::Heatmap, Some(_)) => (
                self.heatmap_group(id).and_then(RegionStatus::from_group),
                None,
            ),
            (OverlayMode::Crime, Some(region)) => (
                None,
                ctx.crime_data
                    .and_then(|data| data.get(id))
                    .map(|record| CrimeSnapshot {
                        record: record.clone(),
                        assessment: assess_crime(record, Some(region), ctx.crime_scale),
                    }),
            ),
        };
        if region.is_none() {
            log::debug!("Selected region '{id}' is not in the catalog");
        }

        Self {
            selected_region_id: Some(id.to_owned()),
            selected_status,
            selected_crime,
            ..self.clone()
        }
    }

    /// Re-derives the snapshots of the current selection, if any.
    #[must_use]
    pub fn refresh_selection(&self, ctx: &SelectionContext<'_>) -> Self {
        match self.selected_region_id.as_deref() {
            Some(id) => self.select_region(id, ctx),
            None => self.clone(),
        }
    }

    /// Clears the selection and both snapshots; the mode is unchanged.
    #[must_use]
    pub fn reset_selection(&self) -> Self {
        Self {
            selected_region_id: None,
            selected_status: None,
            selected_crime: None,
            ..self.clone()
        }
    }

    /// Overlay off and selection cleared in one step.
    #[must_use]
    pub fn reset_modes_and_selection(&self) -> Self {
        self.disable_overlay().reset_selection()
    }

    #[must_use]
    pub fn with_view_mode(&self, view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            ..self.clone()
        }
    }
}
