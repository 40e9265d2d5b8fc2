//! Map interaction controller.
//!
//! Keeps every shape's fill, effects, and tooltip consistent with the
//! [`SelectionState`] and turns pointer events into state transitions.
//!
//! Each shape is in one of three visual states:
//!
//! ```text
//!   idle ──enter──▶ hovered ──leave──▶ idle
//!     │                │
//!     └────click───────┴──▶ selected ──reset_selection──▶ idle
//! ```
//!
//! Styling is never patched incrementally across modes. Any change of mode,
//! assignment, crime data, or selection goes through [`MapInteractionController::reconcile`],
//! which recomputes every shape from scratch.

use std::fmt::Write as _;

use region_map_crime_models::CrimeDataMap;
use region_map_overlay::{CrimeAssessment, OverlayConfig, RegionStatus, assess_crime};
use region_map_region_models::RegionCatalog;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use v_htmlescape::escape;

use crate::document::{
    HandlerRegistration, MapDocument, MapDocumentError, PointerEvent, PointerEventKind, ShapeStyle,
};
use crate::state::{OverlayMode, SelectionContext, SelectionState};

/// Cursor shown over selectable shapes.
const SHAPE_CURSOR: &str = "pointer";

/// Visual state of one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShapeVisual {
    Idle,
    Hovered,
    Selected,
}

/// Everything the controller reads to style shapes.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a> {
    pub state: &'a SelectionState,
    pub catalog: &'a RegionCatalog,
    pub config: &'a OverlayConfig,
    /// `None` while crime data is loading.
    pub crime_data: Option<&'a CrimeDataMap>,
}

impl<'a> MapView<'a> {
    /// The same view with a different state.
    #[must_use]
    pub const fn with_state(self, state: &'a SelectionState) -> Self {
        Self { state, ..self }
    }

    #[must_use]
    pub const fn selection_context(&self) -> SelectionContext<'a> {
        SelectionContext {
            catalog: self.catalog,
            crime_data: self.crime_data,
            crime_scale: &self.config.crime,
        }
    }

    fn heatmap_status(&self, id: &str) -> Option<RegionStatus> {
        self.state
            .heatmap_group(id)
            .and_then(RegionStatus::from_group)
    }

    /// Classified crime data for `id`; `None` while loading or without a
    /// record.
    #[must_use]
    pub fn crime_assessment(&self, id: &str) -> Option<CrimeAssessment> {
        let record = self.crime_data?.get(id)?;
        Some(assess_crime(
            record,
            self.catalog.get(id),
            &self.config.crime,
        ))
    }

    /// Fill of a shape that is neither hovered nor selected.
    #[must_use]
    pub fn resting_fill(&self, id: &str) -> &'a str {
        let config: &'a OverlayConfig = self.config;
        let theme = &config.theme;
        match self.state.mode() {
            OverlayMode::Heatmap => self
                .heatmap_status(id)
                .map_or(theme.neutral.as_str(), |status| {
                    config.heatmap.color(status.level())
                }),
            OverlayMode::Crime => self
                .crime_assessment(id)
                .map_or(theme.neutral.as_str(), |assessment| {
                    assessment
                        .level
                        .map_or(theme.unknown.as_str(), |level| config.crime.color(level))
                }),
            OverlayMode::None => &theme.neutral,
        }
    }

    /// Fill of a hovered shape. Only the heatmap has its own hover palette.
    #[must_use]
    pub fn hover_fill(&self, id: &str) -> &'a str {
        let config: &'a OverlayConfig = self.config;
        match (self.state.mode(), self.heatmap_status(id)) {
            (OverlayMode::Heatmap, Some(status)) => config.heatmap.hover_color(status.level()),
            _ => &config.theme.hover,
        }
    }

    /// Full style of a shape in the given visual state.
    #[must_use]
    pub fn style_for(&self, id: &str, visual: ShapeVisual) -> ShapeStyle {
        let theme = &self.config.theme;
        let (fill, filter, transform, z_index) = match visual {
            ShapeVisual::Idle => (
                self.resting_fill(id),
                None,
                &theme.resting_transform,
                theme.resting_z_index,
            ),
            ShapeVisual::Hovered => (
                self.hover_fill(id),
                Some(&theme.hover_filter),
                &theme.hover_transform,
                theme.resting_z_index,
            ),
            ShapeVisual::Selected => (
                theme.selected.as_str(),
                Some(&theme.selected_filter),
                &theme.selected_transform,
                theme.selected_z_index,
            ),
        };
        ShapeStyle {
            fill: fill.to_owned(),
            filter: filter.cloned(),
            transform: Some(transform.clone()),
            z_index: Some(z_index),
            cursor: Some(SHAPE_CURSOR.to_owned()),
            transition: Some(theme.transition.clone()),
        }
    }

    /// Tooltip HTML: name, capital, and a line for the active overlay.
    /// Shapes without a catalog entry get no tooltip.
    #[must_use]
    pub fn tooltip(&self, id: &str) -> Option<String> {
        let region = self.catalog.get(id)?;
        let mut html = format!(
            "<strong>{}</strong><br/>Столица: {}",
            escape(&region.name),
            escape(&region.capital)
        );

        match self.state.mode() {
            OverlayMode::Heatmap => {
                if let Some(status) = self.heatmap_status(id) {
                    let label = self.config.heatmap.label(status.level());
                    let _ = write!(html, "<br/>Статус: {}", escape(label));
                }
            }
            OverlayMode::Crime => match (self.crime_data, self.crime_assessment(id)) {
                (None, _) => html.push_str("<br/>Загрузка данных…"),
                (Some(_), None) => html.push_str("<br/>Нет данных"),
                (Some(_), Some(assessment)) => match assessment.level {
                    Some(level) => {
                        let _ = write!(
                            html,
                            "<br/>Уровень: {} ({})",
                            escape(self.config.crime.label(level)),
                            assessment.rate
                        );
                    }
                    None => html.push_str("<br/>Уровень: неизвестно"),
                },
            },
            OverlayMode::None => {}
        }
        Some(html)
    }
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Unmounted,
    AwaitingDocument,
    Active(HandlerRegistration),
    TornDown,
}

/// Synchronizes shapes with the selection state.
#[derive(Debug, Default)]
pub struct MapInteractionController {
    phase: Phase,
    hovered: Option<String>,
}

impl MapInteractionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while handlers are attached.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    /// Returns `true` after [`Self::teardown`].
    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        matches!(self.phase, Phase::TornDown)
    }

    #[must_use]
    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Mounts the controller on `doc`.
    ///
    /// Initializes immediately if the document is already parsed;
    /// otherwise waits for [`Self::document_ready`].
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if handlers cannot be attached.
    pub fn mount<D: MapDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        view: &MapView<'_>,
    ) -> Result<(), MapDocumentError> {
        if self.is_torn_down() {
            log::debug!("Ignoring mount of a torn down controller");
            return Ok(());
        }
        if doc.is_ready() {
            self.initialize(doc, view)
        } else {
            log::debug!("Map document not ready, deferring handler registration");
            self.phase = Phase::AwaitingDocument;
            Ok(())
        }
    }

    /// Notifies the controller that `doc` was (re)parsed.
    ///
    /// A waiting controller initializes; an active one re-registers.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if handlers cannot be attached.
    pub fn document_ready<D: MapDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        view: &MapView<'_>,
    ) -> Result<(), MapDocumentError> {
        match self.phase {
            Phase::AwaitingDocument | Phase::Active(_) => self.initialize(doc, view),
            Phase::Unmounted | Phase::TornDown => Ok(()),
        }
    }

    fn initialize<D: MapDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        view: &MapView<'_>,
    ) -> Result<(), MapDocumentError> {
        if let Phase::Active(previous) = std::mem::take(&mut self.phase) {
            previous.release(doc);
        }
        self.hovered = None;
        match HandlerRegistration::register(doc) {
            Ok(registration) => self.phase = Phase::Active(registration),
            Err(e) => {
                self.phase = Phase::AwaitingDocument;
                return Err(e);
            }
        }
        self.reconcile(doc, view)
    }

    /// Detaches every handler. Later events and mounts are ignored.
    pub fn teardown<D: MapDocument + ?Sized>(&mut self, doc: &mut D) {
        if let Phase::Active(registration) = std::mem::replace(&mut self.phase, Phase::TornDown) {
            registration.release(doc);
        }
        self.hovered = None;
    }

    /// Visual state of `id` under `state`.
    #[must_use]
    pub fn visual(&self, id: &str, state: &SelectionState) -> ShapeVisual {
        if state.is_selected(id) {
            ShapeVisual::Selected
        } else if self.hovered.as_deref() == Some(id) {
            ShapeVisual::Hovered
        } else {
            ShapeVisual::Idle
        }
    }

    /// Handles one pointer event.
    ///
    /// Returns the replacement state on click. Events for shapes without
    /// attached handlers are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if a shape style cannot be written.
    pub fn handle_event<D: MapDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        view: &MapView<'_>,
        event: &PointerEvent,
    ) -> Result<Option<SelectionState>, MapDocumentError> {
        let id = event.shape_id.as_str();
        let covered = match &self.phase {
            Phase::Active(registration) => registration.covers(id),
            _ => false,
        };
        if !covered {
            log::debug!("Ignoring {} on '{id}': no handler attached", event.kind);
            return Ok(None);
        }

        match event.kind {
            PointerEventKind::Enter => {
                if view.state.is_selected(id) {
                    return Ok(None);
                }
                if let Some(previous) = self.hovered.replace(id.to_owned())
                    && previous != id
                    && !view.state.is_selected(&previous)
                {
                    doc.set_style(&previous, view.style_for(&previous, ShapeVisual::Idle))?;
                }
                doc.set_style(id, view.style_for(id, ShapeVisual::Hovered))?;
                Ok(None)
            }
            PointerEventKind::Leave => {
                if self.hovered.as_deref() == Some(id) {
                    self.hovered = None;
                }
                if !view.state.is_selected(id) {
                    doc.set_style(id, view.style_for(id, ShapeVisual::Idle))?;
                }
                Ok(None)
            }
            PointerEventKind::Click => {
                let next = view.state.select_region(id, &view.selection_context());
                self.hovered = None;
                self.reconcile(doc, &view.with_state(&next))?;
                Ok(Some(next))
            }
        }
    }

    /// Recomputes style and tooltip of every shape.
    ///
    /// Does nothing until handlers are attached.
    ///
    /// # Errors
    ///
    /// Returns [`MapDocumentError`] if a shape cannot be written.
    pub fn reconcile<D: MapDocument + ?Sized>(
        &self,
        doc: &mut D,
        view: &MapView<'_>,
    ) -> Result<(), MapDocumentError> {
        if !self.is_active() {
            return Ok(());
        }
        for id in doc.shape_ids() {
            let visual = self.visual(&id, view.state);
            doc.set_style(&id, view.style_for(&id, visual))?;
            doc.set_tooltip(&id, view.tooltip(&id))?;
        }
        Ok(())
    }
}
