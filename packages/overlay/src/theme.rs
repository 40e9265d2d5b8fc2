//! Shape styling shared by every overlay mode.

use serde::Deserialize;

/// Colors and effects applied to map shapes regardless of overlay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapTheme {
    /// Resting fill with no overlay data.
    pub neutral: String,
    /// Resting fill in crime mode when the rate is not computable.
    pub unknown: String,
    /// Hover fill outside the heatmap.
    pub hover: String,
    /// Fill of the selected shape.
    pub selected: String,
    /// Filter applied while hovered.
    pub hover_filter: String,
    /// Transform applied while hovered.
    pub hover_transform: String,
    /// Elevation shadow of the selected shape.
    pub selected_filter: String,
    /// Lift transform of the selected shape.
    pub selected_transform: String,
    /// Stacking order of the selected shape.
    pub selected_z_index: i32,
    /// Transform of a resting shape.
    pub resting_transform: String,
    /// Stacking order of a resting shape.
    pub resting_z_index: i32,
    /// CSS transition applied to every shape.
    pub transition: String,
}
