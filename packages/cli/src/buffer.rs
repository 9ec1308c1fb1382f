//! The `buffer` subcommand: build or update one partition file.

use std::path::{Path, PathBuf};

use popzone_cli_utils::{IndicatifProgress, MultiProgress};
use popzone_models::ProcessingMode;
use popzone_partition::PartitionMaintainer;
use popzone_store::partition_file::{read_partition, write_partition};
use popzone_store::paths::partition_path;

use crate::request::load_request;

/// Options of one `buffer` invocation.
#[derive(Debug, Clone)]
pub struct BufferOptions {
    /// Locations for a rebuild, or the stored partition when updating.
    pub input: PathBuf,
    /// Update mode and its location or id file; `None` rebuilds.
    pub update: Option<(ProcessingMode, PathBuf)>,
    pub radius_km: f64,
    /// Output prefix; the radius and clip suffix are appended.
    pub output: PathBuf,
    pub clip: bool,
    pub id_column: String,
}

/// Builds or updates the partition and saves it if anything changed.
///
/// Returns the path of the partition file.
///
/// # Errors
///
/// Returns an error if an input cannot be read, the update fails, or the
/// partition cannot be written.
pub fn run(
    options: &BufferOptions,
    multi: &MultiProgress,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let maintainer = PartitionMaintainer::new(options.radius_km, options.clip)?;

    let (prior, request) = match &options.update {
        None => (
            None,
            load_request(ProcessingMode::New, &options.input, &options.id_column)?,
        ),
        Some((mode, path)) => {
            let prior = read_partition(
                &options.input,
                options.radius_km,
                options.clip,
                &options.id_column,
            )?;
            (Some(prior), load_request(*mode, path, &options.id_column)?)
        }
    };

    let progress = IndicatifProgress::clip_bar(multi);
    let maintainer = maintainer.with_progress(progress.clone());
    let update = maintainer.apply(prior, request);
    progress.finish();
    let update = update?;

    let path = partition_path(&options.output, options.radius_km, options.clip);
    if update.changed {
        write_partition(&path, &update.partition, &options.id_column)?;
    } else {
        log::info!("Nothing changed; leaving {} as it is", path.display());
    }
    Ok(path)
}

/// Resolves the mutually exclusive update flags into a mode.
#[must_use]
pub fn update_mode(
    add: Option<&Path>,
    delete: Option<&Path>,
    edit: Option<&Path>,
) -> Option<(ProcessingMode, PathBuf)> {
    add.map(|p| (ProcessingMode::Add, p.to_path_buf()))
        .or_else(|| delete.map(|p| (ProcessingMode::Delete, p.to_path_buf())))
        .or_else(|| edit.map(|p| (ProcessingMode::Edit, p.to_path_buf())))
}
