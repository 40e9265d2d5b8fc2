#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the region map viewer.
//!
//! One [`Viewer`] session is shared by every request. The page shell, the
//! styled map asset, HTML fragments, and a JSON API are served from it;
//! pointer events posted by the page script drive the interaction
//! controller. Crime data is fetched once in the background at startup.

mod handlers;
pub mod interactive;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use region_map_overlay::{OverlayConfig, RandomHeatmapProvider};
use region_map_region_models::RegionCatalog;
use region_map_source::{CrimeDataSource, SourceConfig, SourceError};
use region_map_viewer::{
    DEFAULT_SHAPE_CLASS, JsonFileStore, MapDocumentError, SvgMapDocument, Viewer, ViewerError,
};

/// Map asset used when `MAP_SVG_PATH` is unset.
pub const DEFAULT_MAP_SVG_PATH: &str = "assets/map.svg";

/// Static directory used when `ASSETS_DIR` is unset.
pub const DEFAULT_ASSETS_DIR: &str = "assets";

/// Errors that prevent the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The map asset could not be loaded.
    #[error("Failed to load map asset: {0}")]
    Document(#[from] MapDocumentError),

    /// The viewer rejected a startup step.
    #[error(transparent)]
    Viewer(#[from] ViewerError),

    /// The crime data source could not be built.
    #[error("Failed to configure crime data source: {0}")]
    Source(#[from] SourceError),
}

/// Shared application state.
pub struct AppState {
    /// The single viewer session.
    pub viewer: Arc<Mutex<Viewer>>,
}

/// Builds a viewer from the environment.
///
/// Reads `MAP_SVG_PATH` for the map asset and `VIEW_STATE_PATH` for the
/// persisted view state.
///
/// # Errors
///
/// Returns [`ServerError::Document`] if the map asset cannot be read or
/// parsed.
pub fn build_viewer() -> Result<Viewer, ServerError> {
    let svg_path = std::env::var("MAP_SVG_PATH")
        .map_or_else(|_| PathBuf::from(DEFAULT_MAP_SVG_PATH), PathBuf::from);
    log::info!("Loading map asset from {}...", svg_path.display());
    let document = SvgMapDocument::from_path(&svg_path, DEFAULT_SHAPE_CLASS)?;

    let store = JsonFileStore::from_env();
    log::info!("View state is persisted to {}", store.path().display());

    Ok(Viewer::new(
        RegionCatalog::embedded(),
        OverlayConfig::embedded(),
        document,
        Box::new(store),
        Box::new(RandomHeatmapProvider::new()),
    ))
}

/// Registers the page, the map asset, and the `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::page))
        .route("/map.svg", web::get().to(handlers::map_svg))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/state", web::get().to(handlers::state))
                .route("/regions", web::get().to(handlers::regions))
                .route("/statistics", web::get().to(handlers::statistics))
                .route("/shapes", web::get().to(handlers::shapes))
                .route("/panel", web::get().to(handlers::panel))
                .route("/overlay/{mode}", web::post().to(handlers::overlay))
                .route("/view/{mode}", web::post().to(handlers::view))
                .route("/selection/reset", web::post().to(handlers::reset_selection))
                .route("/selection/{id}", web::post().to(handlers::select))
                .route("/reset", web::post().to(handlers::reset_all))
                .route("/map/events", web::post().to(handlers::map_event)),
        );
}

/// Starts the region map server.
///
/// Loads the map asset, restores the persisted view state, starts the
/// background crime fetch, and runs the Actix-Web HTTP server until it is
/// stopped. The viewer is torn down afterwards so its handlers are
/// released. This is a regular async function; the caller provides the
/// runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if startup fails, or if the HTTP
/// server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    if pretty_env_logger::try_init_custom_env("RUST_LOG").is_err() {
        log::debug!("Logger already initialised");
    }

    let mut viewer = build_viewer().map_err(std::io::Error::other)?;
    viewer.mount().map_err(std::io::Error::other)?;
    let viewer = Arc::new(Mutex::new(viewer));

    let source_config = SourceConfig::from_env();
    let source: Arc<dyn CrimeDataSource> = Arc::from(
        source_config
            .build()
            .map_err(|e| std::io::Error::other(ServerError::from(e)))?,
    );
    log::info!("Fetching crime data from {}...", source.name());
    Viewer::spawn_crime_fetch(&viewer, source).map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState {
        viewer: Arc::clone(&viewer),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let assets_dir = std::env::var("ASSETS_DIR").unwrap_or_else(|_| DEFAULT_ASSETS_DIR.to_string());
    let serve_assets = Path::new(&assets_dir).is_dir();
    if !serve_assets {
        log::warn!("Assets directory {assets_dir} not found, /assets will not be served");
    }

    log::info!("Starting server on {bind_addr}:{port}");

    let result = HttpServer::new(move || {
        let cors = Cors::permissive();

        let app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure);

        if serve_assets {
            app.service(Files::new("/assets", &assets_dir))
        } else {
            app
        }
    })
    .bind((bind_addr, port))?
    .run()
    .await;

    match viewer.lock() {
        Ok(mut viewer) => viewer.teardown(),
        Err(_) => log::error!("Viewer lock poisoned during shutdown"),
    }

    result
}
