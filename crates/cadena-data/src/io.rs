//! CSV input and output.

use cadena_traits::{FeatureTable, Result, TableSchema};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

/// Reads a CSV file with a header row.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file {} does not exist", path.display()),
        )
        .into());
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "read csv");
    Ok(df)
}

/// Writes a frame as CSV with a header, creating parent directories.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;

    info!(path = %path.display(), rows = df.height(), "wrote csv");
    Ok(())
}

/// Loads a feature CSV into a validated [`FeatureTable`].
pub fn load_feature_table(path: impl AsRef<Path>, schema: &TableSchema) -> Result<FeatureTable> {
    let path = path.as_ref();
    let df = read_csv(path)?;
    let table = FeatureTable::from_frame(&df, schema)?;

    info!(
        path = %path.display(),
        rows = table.len(),
        features = table.n_features(),
        target = %schema.target_column,
        "loaded feature table"
    );
    Ok(table)
}
