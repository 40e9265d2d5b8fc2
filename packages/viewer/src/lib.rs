#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive region map viewer.
//!
//! [`Viewer`] is the application root. It owns the region catalog, overlay
//! configuration, [`SelectionState`], the map document, and the
//! [`MapInteractionController`], and is the only place state is replaced.
//! Every transition runs the same pipeline: compute the next state,
//! persist the toggles if they changed, then reconcile every shape.
//!
//! Crime data arrives asynchronously. [`Viewer::spawn_crime_fetch`] holds
//! only a [`Weak`] handle and a [`FetchTicket`]; a result for a dropped,
//! torn down, or superseded viewer is discarded.

pub mod controller;
pub mod document;
pub mod state;
pub mod store;
pub mod svg;

use std::sync::{Arc, Mutex, Weak};

use region_map_crime_models::CrimeDataMap;
use region_map_overlay::{HeatmapProvider, OverlayConfig};
use region_map_region_models::RegionCatalog;
use region_map_source::{CrimeDataSource, load_crime_data};
use serde::Serialize;

pub use controller::{MapInteractionController, MapView, ShapeVisual};
pub use document::{
    HandlerRegistration, MapDocument, MapDocumentError, PointerEvent, PointerEventKind, ShapeStyle,
};
pub use state::{CrimeSnapshot, OverlayMode, SelectionContext, SelectionState, ViewMode};
pub use store::{JsonFileStore, MemoryStore, PersistedViewState, StoreError, ViewStateStore};
pub use svg::{DEFAULT_SHAPE_CLASS, SvgMapDocument};

/// Errors surfaced by [`Viewer`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// The map document rejected an operation.
    #[error(transparent)]
    Document(#[from] MapDocumentError),

    /// The shared viewer lock was poisoned.
    #[error("Viewer lock poisoned")]
    Poisoned,
}

/// Crime data lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrimeData {
    /// A fetch is outstanding.
    Loading,
    /// The fetch completed; empty after a failure.
    Loaded(CrimeDataMap),
}

impl CrimeData {
    /// The records, once loaded.
    #[must_use]
    pub const fn records(&self) -> Option<&CrimeDataMap> {
        match self {
            Self::Loading => None,
            Self::Loaded(map) => Some(map),
        }
    }
}

/// Identifies one crime fetch. Only the latest ticket is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// One shape as currently rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeSnapshot {
    pub id: String,
    pub visual: ShapeVisual,
    pub style: Option<ShapeStyle>,
    pub tooltip: Option<String>,
}

/// The application root.
pub struct Viewer<D: MapDocument = SvgMapDocument> {
    catalog: RegionCatalog,
    config: OverlayConfig,
    state: SelectionState,
    document: D,
    controller: MapInteractionController,
    store: Box<dyn ViewStateStore>,
    heatmap: Box<dyn HeatmapProvider>,
    crime: CrimeData,
    fetch_generation: u64,
}

impl<D: MapDocument> std::fmt::Debug for Viewer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("state", &self.state)
            .field("crime", &self.crime)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl<D: MapDocument> Viewer<D> {
    /// Creates a viewer, restoring persisted toggles from `store`.
    ///
    /// Crime data starts out [`CrimeData::Loading`]; call
    /// [`Self::spawn_crime_fetch`] or [`Self::begin_crime_fetch`] next.
    #[must_use]
    pub fn new(
        catalog: RegionCatalog,
        config: OverlayConfig,
        document: D,
        store: Box<dyn ViewStateStore>,
        heatmap: Box<dyn HeatmapProvider>,
    ) -> Self {
        let state = store::load_or_default(store.as_ref());
        log::debug!(
            "Restored view state: mode={} view={}",
            state.mode(),
            state.view_mode()
        );
        Self {
            catalog,
            config,
            state,
            document,
            controller: MapInteractionController::new(),
            store,
            heatmap,
            crime: CrimeData::Loading,
            fetch_generation: 0,
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &OverlayConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &SelectionState {
        &self.state
    }

    #[must_use]
    pub const fn document(&self) -> &D {
        &self.document
    }

    #[must_use]
    pub const fn controller(&self) -> &MapInteractionController {
        &self.controller
    }

    #[must_use]
    pub const fn crime(&self) -> &CrimeData {
        &self.crime
    }

    /// Returns `true` while a crime fetch is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.crime, CrimeData::Loading)
    }

    /// A read-only view for styling and presentation.
    #[must_use]
    pub fn view(&self) -> MapView<'_> {
        MapView {
            state: &self.state,
            catalog: &self.catalog,
            config: &self.config,
            crime_data: self.crime.records(),
        }
    }

    fn parts(&mut self) -> (&mut MapInteractionController, &mut D, MapView<'_>) {
        let view = MapView {
            state: &self.state,
            catalog: &self.catalog,
            config: &self.config,
            crime_data: self.crime.records(),
        };
        (&mut self.controller, &mut self.document, view)
    }

    /// Mounts the controller on the document.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if handlers cannot be attached.
    pub fn mount(&mut self) -> Result<(), ViewerError> {
        let (controller, document, view) = self.parts();
        controller.mount(document, &view)?;
        Ok(())
    }

    /// Call after the document finished (re)parsing.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if handlers cannot be attached.
    pub fn document_ready(&mut self) -> Result<(), ViewerError> {
        let (controller, document, view) = self.parts();
        controller.document_ready(document, &view)?;
        Ok(())
    }

    /// Detaches every handler. Pending crime data is discarded from now on.
    pub fn teardown(&mut self) {
        self.controller.teardown(&mut self.document);
        log::debug!("Viewer torn down");
    }

    /// Recomputes every shape from the current state.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn reconcile(&mut self) -> Result<(), ViewerError> {
        let (controller, document, view) = self.parts();
        controller.reconcile(document, &view)?;
        Ok(())
    }

    /// Installs `next`, persisting the toggles when they changed, and
    /// reconciles every shape.
    fn apply(&mut self, next: SelectionState) -> Result<(), ViewerError> {
        let next = if next.mode() == self.state.mode()
            && next.heatmap_groups() == self.state.heatmap_groups()
        {
            next
        } else {
            next.refresh_selection(&self.view().selection_context())
        };

        let persisted = PersistedViewState::capture(&next);
        if persisted != PersistedViewState::capture(&self.state)
            && let Err(e) = self.store.save(&persisted)
        {
            log::warn!("Failed to persist view state: {e}");
        }

        self.state = next;
        self.reconcile()
    }

    /// Ids that receive a heatmap group: the document's shapes, or the
    /// catalog before the document is parsed.
    fn heatmap_ids(&self) -> Vec<String> {
        if self.document.is_ready() {
            self.document.shape_ids()
        } else {
            self.catalog.iter().map(|r| r.id.clone()).collect()
        }
    }

    /// Enables the heatmap with a freshly generated assignment.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn enable_heatmap(&mut self) -> Result<(), ViewerError> {
        let groups = self.heatmap.assign(&self.heatmap_ids());
        let next = self.state.enable_heatmap(groups);
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn enable_crime_mode(&mut self) -> Result<(), ViewerError> {
        let next = self.state.enable_crime_mode();
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn disable_overlay(&mut self) -> Result<(), ViewerError> {
        let next = self.state.disable_overlay();
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn toggle_heatmap(&mut self) -> Result<(), ViewerError> {
        let ids = self.heatmap_ids();
        let heatmap = &mut self.heatmap;
        let next = self.state.toggle_heatmap(|| heatmap.assign(&ids));
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn toggle_crime_mode(&mut self) -> Result<(), ViewerError> {
        let next = self.state.toggle_crime_mode();
        self.apply(next)
    }

    /// Selects a region programmatically, as a click would.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn select_region(&mut self, id: &str) -> Result<(), ViewerError> {
        let next = self
            .state
            .select_region(id, &self.view().selection_context());
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn reset_selection(&mut self) -> Result<(), ViewerError> {
        let next = self.state.reset_selection();
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn reset_modes_and_selection(&mut self) -> Result<(), ViewerError> {
        let next = self.state.reset_modes_and_selection();
        self.apply(next)
    }

    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> Result<(), ViewerError> {
        let next = self.state.with_view_mode(mode);
        self.apply(next)
    }

    /// Routes a pointer event through the controller.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if a shape cannot be written.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Result<(), ViewerError> {
        let (controller, document, view) = self.parts();
        let next = controller.handle_event(document, &view, event)?;
        if let Some(next) = next {
            self.state = next;
        }
        Ok(())
    }

    /// Every shape with its visual state, style, and tooltip.
    #[must_use]
    pub fn shapes(&self) -> Vec<ShapeSnapshot> {
        self.document
            .shape_ids()
            .into_iter()
            .map(|id| ShapeSnapshot {
                visual: self.controller.visual(&id, &self.state),
                style: self.document.style(&id).cloned(),
                tooltip: self.document.tooltip(&id).map(str::to_owned),
                id,
            })
            .collect()
    }

    /// Marks crime data as loading and returns the ticket for the result.
    ///
    /// Any earlier ticket becomes stale.
    pub fn begin_crime_fetch(&mut self) -> FetchTicket {
        self.fetch_generation += 1;
        self.crime = CrimeData::Loading;
        if let Err(e) = self.reconcile() {
            log::warn!("Failed to restyle map while crime data loads: {e}");
        }
        FetchTicket {
            generation: self.fetch_generation,
        }
    }

    /// Installs fetched data if `ticket` is current and the viewer is live.
    ///
    /// Returns `false` when the data was discarded.
    pub fn complete_crime_fetch(&mut self, ticket: FetchTicket, data: CrimeDataMap) -> bool {
        if self.controller.is_torn_down() {
            log::debug!("Discarding crime data: viewer torn down");
            return false;
        }
        if ticket.generation != self.fetch_generation {
            log::debug!(
                "Discarding crime data from fetch {} (current is {})",
                ticket.generation,
                self.fetch_generation
            );
            return false;
        }

        self.crime = CrimeData::Loaded(data);
        self.state = self.state.refresh_selection(&self.view().selection_context());
        if let Err(e) = self.reconcile() {
            log::warn!("Failed to restyle map with crime data: {e}");
        }
        true
    }
}

impl<D: MapDocument + 'static> Viewer<D> {
    /// Starts fetching crime data on the Tokio runtime.
    ///
    /// The task holds a [`Weak`] reference; if every strong reference is
    /// gone when the fetch resolves, the data is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Poisoned`] if the viewer lock is poisoned.
    pub fn spawn_crime_fetch(
        viewer: &Arc<Mutex<Self>>,
        source: Arc<dyn CrimeDataSource>,
    ) -> Result<tokio::task::JoinHandle<()>, ViewerError> {
        let ticket = viewer
            .lock()
            .map_err(|_| ViewerError::Poisoned)?
            .begin_crime_fetch();
        let weak: Weak<Mutex<Self>> = Arc::downgrade(viewer);

        Ok(tokio::spawn(async move {
            let data = load_crime_data(source.as_ref()).await;
            let Some(viewer) = weak.upgrade() else {
                log::debug!("Viewer dropped before crime data arrived");
                return;
            };
            match viewer.lock() {
                Ok(mut viewer) => {
                    viewer.complete_crime_fetch(ticket, data);
                }
                Err(_) => log::error!("Viewer lock poisoned, dropping crime data"),
            }
        }))
    }
}

impl Viewer<SvgMapDocument> {
    /// Replaces the map asset and re-registers handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError`] if the asset cannot be parsed or bound.
    pub fn load_map(&mut self, svg: &str) -> Result<(), ViewerError> {
        self.document.load(svg)?;
        self.document_ready()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use region_map_crime_models::CrimeRecord;
    use region_map_overlay::{HeatmapAssignment, RandomHeatmapProvider, RegionStatus};
    use region_map_source::SourceError;

    use super::*;

    const SVG: &str = r#"<svg>
        <path class="state" id="region1"/>
        <path class="state" id="region2"/>
        <path class="state" id="region9"/>
        <path class="state" id="island"/>
    </svg>"#;

    /// Assigns every id to the same group.
    struct FixedHeatmap(u8);

    impl HeatmapProvider for FixedHeatmap {
        fn assign(&mut self, ids: &[String]) -> HeatmapAssignment {
            ids.iter().map(|id| (id.clone(), self.0)).collect()
        }
    }

    fn viewer_with(store: Box<dyn ViewStateStore>) -> Viewer {
        let mut viewer = Viewer::new(
            RegionCatalog::embedded(),
            OverlayConfig::embedded(),
            SvgMapDocument::parse(SVG, DEFAULT_SHAPE_CLASS).unwrap(),
            store,
            Box::new(FixedHeatmap(1)),
        );
        viewer.mount().unwrap();
        viewer
    }

    fn viewer() -> Viewer {
        viewer_with(Box::new(MemoryStore::new()))
    }

    fn fill(viewer: &Viewer, id: &str) -> String {
        viewer.document().style(id).unwrap().fill.clone()
    }

    fn click(id: &str) -> PointerEvent {
        PointerEvent::new(PointerEventKind::Click, id)
    }

    fn crime_data() -> CrimeDataMap {
        let population = RegionCatalog::embedded()
            .get("region1")
            .and_then(|r| r.known_population())
            .unwrap();
        // Exactly the 7000-per-100k boundary.
        let total = population * 7 / 100;
        region_map_crime_models::index_by_region(vec![CrimeRecord::new("region1", total)])
    }

    #[test]
    fn heatmap_then_crime_leaves_only_crime() {
        let mut viewer = viewer();
        viewer.enable_heatmap().unwrap();
        assert!(viewer.state().mode().is_heatmap());
        viewer.enable_crime_mode().unwrap();
        assert_eq!(viewer.state().mode().flags(), (false, true));
    }

    #[test]
    fn heatmap_covers_every_shape() {
        let mut viewer = viewer();
        viewer.toggle_heatmap().unwrap();
        let groups = viewer.state().heatmap_groups();
        assert_eq!(groups.len(), 4);
        assert!(groups.contains_key("island"));
        assert_eq!(fill(&viewer, "island"), "#10b981");

        viewer.toggle_heatmap().unwrap();
        assert_eq!(viewer.state().mode(), OverlayMode::None);
        assert_eq!(fill(&viewer, "island"), viewer.config().theme.neutral);
    }

    #[test]
    fn click_selects_and_reset_clears() {
        let mut viewer = viewer();
        viewer.enable_heatmap().unwrap();
        viewer.handle_pointer(&click("region2")).unwrap();
        assert_eq!(viewer.state().selected_region_id(), Some("region2"));
        assert_eq!(viewer.state().selected_status(), Some(RegionStatus::Ready));
        assert_eq!(fill(&viewer, "region2"), viewer.config().theme.selected);

        viewer.reset_selection().unwrap();
        assert_eq!(viewer.state().selected_region_id(), None);
        assert_eq!(viewer.state().selected_status(), None);
        assert!(viewer.state().mode().is_heatmap());
        assert_eq!(fill(&viewer, "region2"), "#10b981");
    }

    #[test]
    fn switching_modes_refreshes_the_selected_snapshot() {
        let mut viewer = viewer();
        let ticket = viewer.begin_crime_fetch();
        assert!(viewer.complete_crime_fetch(ticket, crime_data()));

        viewer.enable_heatmap().unwrap();
        viewer.select_region("region1").unwrap();
        assert!(viewer.state().selected_status().is_some());

        viewer.enable_crime_mode().unwrap();
        assert_eq!(viewer.state().selected_status(), None);
        let snapshot = viewer.state().selected_crime().unwrap();
        assert_eq!(
            snapshot.assessment.level,
            Some(region_map_overlay::SeverityLevel::High)
        );
    }

    #[test]
    fn toggles_are_persisted_but_selection_is_not() {
        let store = Arc::new(MemoryStore::new());
        struct Shared(Arc<MemoryStore>);
        impl ViewStateStore for Shared {
            fn load(&self) -> Result<Option<PersistedViewState>, StoreError> {
                self.0.load()
            }
            fn save(&self, state: &PersistedViewState) -> Result<(), StoreError> {
                self.0.save(state)
            }
        }

        let mut viewer = viewer_with(Box::new(Shared(store.clone())));
        viewer.enable_heatmap().unwrap();
        viewer.set_view_mode(ViewMode::Stats).unwrap();
        viewer.select_region("region1").unwrap();
        let groups = viewer.state().heatmap_groups().clone();

        let restored = viewer_with(Box::new(Shared(store)));
        assert!(restored.state().mode().is_heatmap());
        assert_eq!(restored.state().view_mode(), ViewMode::Stats);
        assert_eq!(restored.state().heatmap_groups(), &groups);
        assert_eq!(restored.state().selected_region_id(), None);
        assert_eq!(fill(&restored, "region1"), "#10b981");
    }

    #[test]
    fn crime_mode_is_neutral_until_data_arrives() {
        let mut viewer = viewer();
        viewer.enable_crime_mode().unwrap();
        let ticket = viewer.begin_crime_fetch();
        assert!(viewer.is_loading());
        assert_eq!(fill(&viewer, "region1"), viewer.config().theme.neutral);

        assert!(viewer.complete_crime_fetch(ticket, crime_data()));
        assert!(!viewer.is_loading());
        assert_eq!(fill(&viewer, "region1"), "#f97316");
        assert_eq!(fill(&viewer, "region2"), viewer.config().theme.neutral);
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut viewer = viewer();
        let first = viewer.begin_crime_fetch();
        let second = viewer.begin_crime_fetch();
        assert!(!viewer.complete_crime_fetch(first, crime_data()));
        assert!(viewer.is_loading());
        assert!(viewer.complete_crime_fetch(second, CrimeDataMap::new()));
    }

    #[test]
    fn data_after_teardown_is_discarded() {
        let mut viewer = viewer();
        let ticket = viewer.begin_crime_fetch();
        viewer.teardown();
        assert!(!viewer.complete_crime_fetch(ticket, crime_data()));
        assert!(viewer.is_loading());
        assert!(!viewer.document().has_handlers("region1"));
    }

    #[test]
    fn shapes_report_visual_state() {
        let mut viewer = viewer();
        viewer
            .handle_pointer(&PointerEvent::new(PointerEventKind::Enter, "region9"))
            .unwrap();
        viewer.handle_pointer(&click("island")).unwrap();

        let shapes = viewer.shapes();
        let visual = |id: &str| shapes.iter().find(|s| s.id == id).unwrap().visual;
        assert_eq!(visual("island"), ShapeVisual::Selected);
        assert_eq!(visual("region1"), ShapeVisual::Idle);
        assert!(shapes.iter().find(|s| s.id == "island").unwrap().tooltip.is_none());
    }

    #[test]
    fn load_map_rebinds_new_shapes() {
        let mut viewer = viewer();
        viewer
            .load_map(r#"<svg><path class="state" id="region3"/></svg>"#)
            .unwrap();
        assert!(viewer.document().has_handlers("region3"));
        viewer.handle_pointer(&click("region3")).unwrap();
        assert_eq!(viewer.state().selected_region_id(), Some("region3"));
    }

    #[test]
    fn random_provider_plugs_in() {
        let mut viewer = Viewer::new(
            RegionCatalog::embedded(),
            OverlayConfig::embedded(),
            SvgMapDocument::new(DEFAULT_SHAPE_CLASS),
            Box::new(MemoryStore::new()),
            Box::new(RandomHeatmapProvider::seeded(7)),
        );
        viewer.mount().unwrap();
        viewer.enable_heatmap().unwrap();
        assert_eq!(
            viewer.state().heatmap_groups().len(),
            RegionCatalog::embedded().len()
        );
    }

    struct FailingSource;

    #[async_trait]
    impl CrimeDataSource for FailingSource {
        fn name(&self) -> String {
            "failing".to_owned()
        }

        async fn fetch_all(&self) -> Result<Vec<CrimeRecord>, SourceError> {
            Err(SourceError::Status { status: 500 })
        }
    }

    struct SlowSource(Vec<CrimeRecord>);

    #[async_trait]
    impl CrimeDataSource for SlowSource {
        fn name(&self) -> String {
            "slow".to_owned()
        }

        async fn fetch_all(&self) -> Result<Vec<CrimeRecord>, SourceError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn failed_fetch_yields_empty_data() {
        let viewer = Arc::new(Mutex::new(viewer()));
        Viewer::spawn_crime_fetch(&viewer, Arc::new(FailingSource))
            .unwrap()
            .await
            .unwrap();

        let viewer = viewer.lock().unwrap();
        assert!(!viewer.is_loading());
        assert_eq!(viewer.crime().records(), Some(&CrimeDataMap::new()));
    }

    #[tokio::test]
    async fn dropped_viewer_ignores_late_data() {
        let viewer = Arc::new(Mutex::new(viewer()));
        let handle = Viewer::spawn_crime_fetch(
            &viewer,
            Arc::new(SlowSource(vec![CrimeRecord::new("region1", 1)])),
        )
        .unwrap();
        drop(viewer);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn fetched_data_reaches_the_map() {
        let viewer = Arc::new(Mutex::new(viewer()));
        viewer.lock().unwrap().enable_crime_mode().unwrap();
        Viewer::spawn_crime_fetch(&viewer, Arc::new(SlowSource(crime_data().into_values().collect())))
            .unwrap()
            .await
            .unwrap();

        let viewer = viewer.lock().unwrap();
        assert_eq!(fill(&viewer, "region1"), "#f97316");
    }
}
