//! Turning a location file into a partition update.

use std::path::Path;

use popzone_models::{ProcessingMode, UpdateRequest};
use popzone_source::{LoadOptions, SourceError, load_ids, load_locations};

/// Reads `path` as the input `mode` needs: the full location set, the
/// additions, the ids to delete, or the edited locations.
///
/// Ids are assigned from row numbers only for a full rebuild.
///
/// # Errors
///
/// Returns an error if `path` cannot be loaded.
pub fn load_request(
    mode: ProcessingMode,
    path: &Path,
    id_column: &str,
) -> Result<UpdateRequest, SourceError> {
    let options = LoadOptions::new(id_column);
    Ok(match mode {
        ProcessingMode::New => UpdateRequest::FullRebuild {
            locations: load_locations(path, &options.assign_missing_ids(true))?,
        },
        ProcessingMode::Add => UpdateRequest::Add {
            locations: load_locations(path, &options)?,
        },
        ProcessingMode::Delete => UpdateRequest::Delete {
            ids: load_ids(path, id_column)?,
        },
        ProcessingMode::Edit => UpdateRequest::Edit {
            locations: load_locations(path, &options)?,
        },
    })
}
