#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the popzone toolchain.
//!
//! Uses `indicatif-log-bridge` (via [`popzone_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod buffer;
mod config;
mod pipeline;
mod request;
#[cfg(test)]
mod test_support;
mod zonal;

use std::path::PathBuf;
use std::time::Instant;

use clap::{ArgGroup, Parser, Subcommand};
use popzone_models::DEFAULT_ID_COLUMN;

use crate::buffer::BufferOptions;
use crate::config::RunConfig;
use crate::zonal::ZonalOptions;

#[derive(Parser)]
#[command(name = "popzone", about = "Catchment buffers and population estimates")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or update one buffer partition
    #[command(group(ArgGroup::new("update").args(["add", "delete", "edit"])))]
    Buffer {
        /// Location file, or the stored partition when updating
        #[arg(short, long)]
        input: PathBuf,
        /// File of locations to add to the partition
        #[arg(short, long)]
        add: Option<PathBuf>,
        /// File listing the ids to remove
        #[arg(short, long)]
        delete: Option<PathBuf>,
        /// File of existing ids with new coordinates
        #[arg(short, long)]
        edit: Option<PathBuf>,
        /// Buffer radius in kilometres
        #[arg(short, long, default_value = "5")]
        rad: f64,
        /// Output prefix; `_{radius}km[_clipped].geojson` is appended
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
        /// Clip overlapping buffers against each other
        #[arg(short, long)]
        clip: bool,
        /// Identifier column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id: String,
    },
    /// Update partitions and population tables as described by a TOML file
    Population {
        /// Run configuration
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Raster statistics in circular buffers around point locations
    Zonal {
        /// Single-band GeoTIFF
        #[arg(short = 'f', long)]
        raster: PathBuf,
        /// Point locations (CSV or GeoJSON)
        #[arg(short = 'z', long)]
        input: PathBuf,
        /// Comma-separated buffer radii in kilometres
        #[arg(short, long)]
        radii: String,
        /// Comma-separated statistics: min, max, mean, std, sum, count
        #[arg(short, long, default_value = "min,max,mean,std")]
        stats: String,
        /// Output CSV file
        #[arg(short, long, default_value = "output.csv")]
        output: PathBuf,
        /// Identifier column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = popzone_cli_utils::init_logger();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Buffer {
            input,
            add,
            delete,
            edit,
            rad,
            output,
            clip,
            id,
        } => {
            let update =
                buffer::update_mode(add.as_deref(), delete.as_deref(), edit.as_deref());
            let options = BufferOptions {
                input,
                update,
                radius_km: rad,
                output,
                clip,
                id_column: id,
            };
            let path = buffer::run(&options, &multi)?;
            log::info!("Partition: {}", path.display());
        }
        Commands::Population { config } => {
            let config = RunConfig::load(&config)?;
            pipeline::run(&config, &multi)?;
        }
        Commands::Zonal {
            raster,
            input,
            radii,
            stats,
            output,
            id,
        } => {
            zonal::run(&ZonalOptions {
                raster,
                input,
                radii,
                stats,
                output,
                id_column: id,
            })?;
        }
    }

    log::info!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}
