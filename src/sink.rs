//! ## Parquet sink
//!
//! Each summary table is collected and written as a single Parquet file,
//! `<output_dir>/<name>.parquet`. The file is first written next to its destination and then
//! renamed over it, so a rerun replaces the previous output instead of accumulating, and a
//! failed write never leaves a truncated table behind.
//!
//! Writing the same batches twice yields byte-identical files.

use crate::exceptions::TaxiSummaryResult;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::DataFrame;
use parquet::arrow::ArrowWriter;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Path of the Parquet file for table `name` in `dir`.
pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.parquet", name))
}

fn staged_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(".staged");
    PathBuf::from(staged)
}

fn write_staged(staged: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> TaxiSummaryResult<()> {
    let file = File::create(staged)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

/// Writes `batches` to `path` as one Parquet file, replacing any existing file.
pub fn write_batches(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> TaxiSummaryResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staged = staged_path(path);
    let result = write_staged(&staged, schema, batches)
        .and_then(|_| fs::rename(&staged, path).map_err(Into::into));
    if result.is_err() {
        let _ = fs::remove_file(&staged);
    }
    result
}

/// Collects `df` and writes it to `<dir>/<name>.parquet`. Returns the written path.
pub async fn write_table(df: DataFrame, dir: &Path, name: &str) -> TaxiSummaryResult<PathBuf> {
    let logical_schema: SchemaRef = Arc::new(df.schema().as_arrow().clone());
    let batches = df.collect().await?;
    let schema = batches
        .first()
        .map(|b| b.schema())
        .unwrap_or(logical_schema);
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();

    let path = table_path(dir, name);
    debug!("Writing {} rows to {}", rows, path.display());
    write_batches(&path, schema, &batches)?;
    info!("Wrote table '{}' ({} rows) to {}", name, rows, path.display());
    Ok(path)
}
