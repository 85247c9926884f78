//! ## Loading trip files
//!
//! The loader turns a list of file paths or glob patterns into one DataFrame in the raw
//! canonical layout (see [`crate::schema`]): every canonical column present, every value
//! still text. Casting is left to the cleaning stage so that unparseable values become nulls
//! instead of failing the scan.
//!
//! Each file is read through DataFusion's CSV reader with an explicit schema derived from its
//! header, so files from different years (with different headers) can be unioned. A file that
//! cannot be opened, or whose header lacks a required column, aborts the whole load.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use crate::schema::{resolve_layout, FileLayout, TRIP_COLUMNS};
use datafusion::datasource::file_format::file_compression_type::FileCompressionType;
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use flate2::read::GzDecoder;
use futures::future::try_join_all;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Compression of a source file, decided from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    GzipCsv,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> TaxiSummaryResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".csv") {
            Ok(SourceFormat::Csv)
        } else if name.ends_with(".gz") {
            Ok(SourceFormat::GzipCsv)
        } else {
            Err(TaxiSummaryError::UnsupportedFormat(format!(
                "{} (expected .csv, .csv.gz or .gz)",
                path.display()
            )))
        }
    }

    fn compression(&self) -> FileCompressionType {
        match self {
            SourceFormat::Csv => FileCompressionType::UNCOMPRESSED,
            SourceFormat::GzipCsv => FileCompressionType::GZIP,
        }
    }
}

/// Suffix handed to DataFusion's file listing; it must match the actual file name.
fn file_extension(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find('.') {
        Some(idx) => name[idx..].to_string(),
        None => String::new(),
    }
}

/// Expands every pattern and returns the matching files, sorted and without duplicates.
///
/// A pattern that matches nothing is skipped with a warning. If no pattern matches anything
/// the result is [`TaxiSummaryError::NoInputFiles`].
pub fn expand_inputs(patterns: &[String]) -> TaxiSummaryResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let before = files.len();
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => return Err(TaxiSummaryError::IoError(e.into())),
            }
        }
        if files.len() == before {
            warn!("Input pattern '{}' matched no files", pattern);
        }
    }
    files.sort();
    files.dedup();
    if files.is_empty() {
        return Err(TaxiSummaryError::NoInputFiles(patterns.join(", ")));
    }
    Ok(files)
}

/// Reads the header row of a (possibly gzip compressed) CSV file.
pub fn read_header(path: &Path) -> TaxiSummaryResult<Vec<String>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => Box::new(file),
        SourceFormat::GzipCsv => Box::new(GzDecoder::new(file)),
    };
    let mut line = String::new();
    BufReader::new(reader).read_line(&mut line)?;
    let line = line.trim_start_matches('\u{feff}').trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(TaxiSummaryError::SchemaMismatch {
            path: path.to_path_buf(),
            missing: TRIP_COLUMNS
                .iter()
                .filter(|c| c.required)
                .map(|c| c.name.to_string())
                .collect(),
        });
    }
    Ok(line
        .split(',')
        .map(|h| h.trim().trim_matches('"').trim().to_string())
        .collect())
}

/// Projects a file's columns onto the canonical layout, filling absent columns with nulls.
fn canonical_projection(layout: &FileLayout) -> Vec<Expr> {
    TRIP_COLUMNS
        .iter()
        .map(|c| {
            if layout.has(c.name) {
                col(c.name)
            } else {
                lit(ScalarValue::Utf8(None)).alias(c.name)
            }
        })
        .collect()
}

async fn read_trip_file(
    ctx: &SessionContext,
    path: &Path,
    layout: &FileLayout,
) -> TaxiSummaryResult<DataFrame> {
    let format = SourceFormat::from_path(path)?;
    let schema = layout.read_schema();
    let extension = file_extension(path);
    let options = CsvReadOptions::new()
        .has_header(true)
        .schema(&schema)
        .file_extension(&extension)
        .file_compression_type(format.compression());
    let path_str = path.to_string_lossy().into_owned();
    let df = ctx.read_csv(path_str, options).await?;
    let df = df.select(canonical_projection(layout))?;
    debug!("Registered {} ({:?})", path.display(), format);
    Ok(df)
}

/// Loads every file matched by `patterns` into one raw trip DataFrame.
pub async fn load_trips(ctx: &SessionContext, patterns: &[String]) -> TaxiSummaryResult<DataFrame> {
    let files = expand_inputs(patterns)?;
    info!("Loading {} trip files", files.len());

    // Header sniffing is blocking file I/O; keep it off the runtime's worker threads.
    let layouts: Vec<(PathBuf, FileLayout)> = tokio::task::spawn_blocking(move || {
        files
            .par_iter()
            .map(|path| {
                let header = read_header(path)?;
                let layout = resolve_layout(path, &header)?;
                Ok((path.clone(), layout))
            })
            .collect::<TaxiSummaryResult<Vec<_>>>()
    })
    .await
    .map_err(std::io::Error::from)??;

    let frames = try_join_all(
        layouts
            .iter()
            .map(|(path, layout)| read_trip_file(ctx, path, layout)),
    )
    .await?;

    let mut frames = frames.into_iter();
    let mut combined = frames
        .next()
        .ok_or_else(|| TaxiSummaryError::NoInputFiles(patterns.join(", ")))?;
    for frame in frames {
        combined = combined.union(frame)?;
    }
    Ok(combined)
}
