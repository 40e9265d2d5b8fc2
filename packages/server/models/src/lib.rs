#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the region map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the viewer's internal state so the wire contract can evolve
//! independently.

use region_map_overlay::{HeatmapAssignment, RegionStatus};
use region_map_viewer::{CrimeSnapshot, MapDocument, OverlayMode, ViewMode, Viewer};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Current viewer state as returned by `GET /api/state`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiState {
    /// Active overlay.
    pub mode: OverlayMode,
    /// Map or statistics view.
    pub view_mode: ViewMode,
    /// Selected shape id, if any.
    pub selected_region_id: Option<String>,
    /// Heatmap status of the selection, in heatmap mode.
    pub selected_status: Option<RegionStatus>,
    /// Crime data of the selection, in crime mode.
    pub selected_crime: Option<CrimeSnapshot>,
    /// Current heatmap assignment.
    pub heatmap_groups: HeatmapAssignment,
    /// Whether crime data is still loading.
    pub loading: bool,
    /// Whether event handlers are bound to the map.
    pub interactive: bool,
}

impl ApiState {
    #[must_use]
    pub fn from_viewer<D: MapDocument>(viewer: &Viewer<D>) -> Self {
        let state = viewer.state();
        Self {
            mode: state.mode(),
            view_mode: state.view_mode(),
            selected_region_id: state.selected_region_id().map(str::to_owned),
            selected_status: state.selected_status(),
            selected_crime: state.selected_crime().cloned(),
            heatmap_groups: state.heatmap_groups().clone(),
            loading: viewer.is_loading(),
            interactive: viewer.controller().is_active(),
        }
    }
}

/// Error body returned on 4xx/5xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human readable message.
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
