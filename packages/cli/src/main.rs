#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the region map viewer.
//!
//! ```text
//! region_map serve
//! region_map regions
//! region_map stats
//! region_map classify <total> [--population N | --region ID]
//! region_map crimes
//! ```
//!
//! Running with no subcommand shows an interactive menu.

mod report;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use region_map_crime_models::CrimeDataMap;
use region_map_overlay::OverlayConfig;
use region_map_region_models::RegionCatalog;
use region_map_source::{SourceConfig, load_crime_data};

#[derive(Parser)]
#[command(name = "region_map", about = "Interactive region map viewer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// List catalog regions
    Regions,
    /// Show the population ranking
    Stats,
    /// Classify a crime total into a severity level
    Classify {
        /// Total registered incidents
        total: u64,
        /// Resident population
        #[arg(long, conflicts_with = "region")]
        population: Option<u64>,
        /// Take the population from this catalog region
        #[arg(long)]
        region: Option<String>,
    },
    /// Fetch crime data from the configured source and assess it
    Crimes,
}

/// Entries of the interactive menu.
enum Tool {
    Server,
    Regions,
    Stats,
    Classify,
    Crimes,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Server,
        Self::Regions,
        Self::Stats,
        Self::Classify,
        Self::Crimes,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Server => "Start server",
            Self::Regions => "List regions",
            Self::Stats => "Population statistics",
            Self::Classify => "Classify a crime total",
            Self::Crimes => "Fetch crime data",
        }
    }
}

async fn fetch_crimes() -> Result<CrimeDataMap, Box<dyn std::error::Error>> {
    let source = SourceConfig::from_env().build()?;
    Ok(load_crime_data(source.as_ref()).await)
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    // The server uses actix-web's runtime, so we need to run it
    // in a blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(|| {
        actix_web::rt::System::new().block_on(region_map_server::interactive::run())
    })
    .await??;
    Ok(())
}

fn classify(
    catalog: &RegionCatalog,
    config: &OverlayConfig,
    total: u64,
    population: Option<u64>,
    region: Option<&str>,
) -> Result<String, Box<dyn std::error::Error>> {
    let population = match region {
        Some(id) => catalog
            .get(id)
            .ok_or_else(|| format!("Unknown region: {id}"))?
            .known_population(),
        None => population,
    };
    Ok(report::classify(total, population, &config.crime))
}

async fn interactive(
    catalog: &RegionCatalog,
    config: &OverlayConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Region Map");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Server => serve().await?,
        Tool::Regions => println!("{}", report::regions(catalog)),
        Tool::Stats => println!("{}", report::statistics(catalog)),
        Tool::Classify => {
            let total: u64 = Input::new().with_prompt("Total incidents").interact_text()?;
            let population: u64 = Input::new()
                .with_prompt("Population (0 if unknown)")
                .default(0)
                .interact_text()?;
            println!(
                "{}",
                classify(catalog, config, total, Some(population), None)?
            );
        }
        Tool::Crimes => println!(
            "{}",
            report::crimes(&fetch_crimes().await?, catalog, &config.crime)
        ),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let catalog = RegionCatalog::embedded();
    let config = OverlayConfig::embedded();

    let Some(command) = cli.command else {
        return interactive(&catalog, &config).await;
    };

    match command {
        Commands::Serve => {
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(region_map_server::run_server())
            })
            .await??;
        }
        Commands::Regions => println!("{}", report::regions(&catalog)),
        Commands::Stats => println!("{}", report::statistics(&catalog)),
        Commands::Classify {
            total,
            population,
            region,
        } => println!(
            "{}",
            classify(&catalog, &config, total, population, region.as_deref())?
        ),
        Commands::Crimes => {
            let data = fetch_crimes().await?;
            log::debug!("Fetched {} crime records", data.len());
            println!("{}", report::crimes(&data, &catalog, &config.crime));
        }
    }

    Ok(())
}
