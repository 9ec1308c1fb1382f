//! The `population` subcommand: partition updates plus population tables
//! for every configured radius.
//!
//! Every partition and table is computed, then staged next to its
//! destination, and only renamed into place once all of them were written.
//! An input, geometry, or write error leaves every output as it was.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::NaiveDate;
use popzone_cli_utils::{IndicatifProgress, MultiProgress, steps_bar};
use popzone_models::{Buffer, BufferStatus, ProcessingMode, UpdateRequest};
use popzone_partition::{PartitionMaintainer, PartitionUpdate};
use popzone_population::PopulationError;
use popzone_population::raster::Raster;
use popzone_population::table::PopulationTable;
use popzone_population::zonal::estimate_rows;
use popzone_store::atomic::{Staging, stage_copy};
use popzone_store::partition_file::{read_partition, stage_partition};
use popzone_store::paths::{
    PARTITION_PREFIX, POPULATION_PREFIX, ensure_dir, partition_path, population_path,
    snapshot_path,
};
use popzone_store::population_file::{read_population, stage_population};

use crate::config::RunConfig;
use crate::request::load_request;

/// Results for one radius and clip setting, ready to be written.
struct Outcome {
    partition_path: PathBuf,
    update: PartitionUpdate,
    population_path: PathBuf,
    table: PopulationTable,
    table_changed: bool,
}

/// Runs every configured radius and clip variant.
///
/// # Errors
///
/// Returns an error if a raster for a configured year is missing, an input
/// cannot be read, a partition update fails, or an output cannot be
/// written.
pub fn run(config: &RunConfig, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    for year in config.years() {
        let path = config.raster_path(year);
        if !path.is_file() {
            return Err(PopulationError::MissingRaster { path }.into());
        }
    }

    for dir in [&config.geom_dir, &config.out_dir] {
        ensure_dir(dir)?;
    }

    let request = load_request(config.mode, &config.location, &config.id_column)?;
    let deleted: Option<HashSet<String>> = match &request {
        UpdateRequest::Delete { ids } => Some(ids.iter().cloned().collect()),
        _ => None,
    };

    let variants: Vec<(f64, bool)> = config
        .clip_variants()
        .into_iter()
        .flat_map(|clip| config.radii.iter().map(move |&radius| (radius, clip)))
        .collect();

    let steps = steps_bar(multi, "Partitions", variants.len() as u64);
    let mut outcomes = Vec::with_capacity(variants.len());
    for (radius_km, clip) in variants {
        outcomes.push(compute(
            config,
            request.clone(),
            deleted.as_ref(),
            radius_km,
            clip,
            multi,
        )?);
        steps.inc(1);
    }
    steps.finish_and_clear();

    let today = chrono::Local::now().date_naive();
    let mut staging = Staging::default();
    for outcome in &outcomes {
        stage_outputs(config, outcome, today, &mut staging)?;
    }
    log::info!("Committing {} output files", staging.len());
    staging.commit()?;

    Ok(())
}

fn compute(
    config: &RunConfig,
    request: UpdateRequest,
    deleted: Option<&HashSet<String>>,
    radius_km: f64,
    clip: bool,
    multi: &MultiProgress,
) -> Result<Outcome, Box<dyn std::error::Error>> {
    let partition_path = partition_path(&config.geom_dir.join(PARTITION_PREFIX), radius_km, clip);
    let population_path =
        population_path(&config.out_dir.join(POPULATION_PREFIX), radius_km, clip);
    let incremental = config.mode != ProcessingMode::New;

    let prior = if incremental && partition_path.is_file() {
        Some(read_partition(&partition_path, radius_km, clip, &config.id_column)?)
    } else {
        None
    };

    let progress = IndicatifProgress::clip_bar(multi);
    let maintainer = PartitionMaintainer::new(radius_km, clip)?.with_progress(progress.clone());
    let update = maintainer.apply(prior, request);
    progress.finish();
    let update = update?;

    log::info!("Processing: {}", population_path.display());
    let mut table = PopulationTable::default();
    let mut had_table = false;
    if incremental {
        if population_path.is_file() {
            table = read_population(&population_path, &config.id_column)?;
            table.mark_all(BufferStatus::Old);
            had_table = true;
        } else {
            log::warn!(
                "No population table at {}; estimating every buffer",
                population_path.display()
            );
        }
    }

    let mut removed = 0;
    if let Some(ids) = deleted {
        removed = table.remove_ids(ids);
        log::info!("Deleting {removed} items");
    }
    let current = update.partition.ids();
    let stale: HashSet<String> = table
        .rows()
        .iter()
        .filter(|row| !current.contains(row.location_id.as_str()))
        .map(|row| row.location_id.clone())
        .collect();
    if !stale.is_empty() {
        log::warn!("Dropping {} population rows without a buffer", stale.len());
        removed += table.remove_ids(&stale);
    }

    let known: HashSet<&str> = table.rows().iter().map(|r| r.location_id.as_str()).collect();
    let targets: Vec<&Buffer> = update
        .partition
        .buffers
        .iter()
        .filter(|b| b.is_new() || !known.contains(b.location_id.as_str()))
        .collect();

    if !targets.is_empty() {
        log::info!("Number of zones: {}", targets.len());
        let rows = estimate_rows(&targets, config.years(), config.min_area, |year| {
            Raster::from_geotiff(&config.raster_path(year))
        })?;
        table.merge(rows);
    }

    let table_changed = !targets.is_empty() || removed > 0 || !had_table;
    Ok(Outcome {
        partition_path,
        update,
        population_path,
        table,
        table_changed,
    })
}

fn stage_outputs(
    config: &RunConfig,
    outcome: &Outcome,
    today: NaiveDate,
    staging: &mut Staging,
) -> Result<(), Box<dyn std::error::Error>> {
    if outcome.update.changed {
        staging.push(stage_partition(
            &outcome.partition_path,
            &outcome.update.partition,
            &config.id_column,
        )?);
    } else {
        log::info!(
            "{} unchanged; not saving",
            outcome.partition_path.display()
        );
    }

    if outcome.table_changed {
        staging.push(stage_population(
            &outcome.population_path,
            &outcome.table,
            &config.id_column,
        )?);
    }

    if config.versioning {
        let dated = snapshot_path(&outcome.population_path, today);
        log::info!("Saving snapshot {}", dated.display());
        // An unchanged table is already on disk as written by an earlier run.
        let snapshot = if outcome.table_changed {
            stage_population(&dated, &outcome.table, &config.id_column)?
        } else {
            stage_copy(&outcome.population_path, &dated)?
        };
        staging.push(snapshot);
    }

    Ok(())
}
