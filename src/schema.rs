//! ## Canonical Trip Layout
//!
//! The yearly Yellow Taxi files do not share a header: 2009 files use names like
//! `Trip_Pickup_DateTime` and `Fare_Amt`, 2010 files use `pickup_datetime` and `fare_amount`,
//! and later files prefix the timestamps with `tpep_`. This module defines the canonical
//! column set the rest of the job works with and maps a file header onto it.
//!
//! Matching is case-insensitive and ignores surrounding whitespace. A header that lacks a
//! required column rejects the file; optional columns that are absent become nulls.

use crate::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use datafusion::arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use std::path::Path;

pub const VENDOR_ID: &str = "vendor_id";
pub const PICKUP_DATETIME: &str = "pickup_datetime";
pub const DROPOFF_DATETIME: &str = "dropoff_datetime";
pub const PASSENGER_COUNT: &str = "passenger_count";
pub const TRIP_DISTANCE: &str = "trip_distance";
pub const PICKUP_LONGITUDE: &str = "pickup_longitude";
pub const PICKUP_LATITUDE: &str = "pickup_latitude";
pub const DROPOFF_LONGITUDE: &str = "dropoff_longitude";
pub const DROPOFF_LATITUDE: &str = "dropoff_latitude";
pub const PAYMENT_TYPE: &str = "payment_type";
pub const FARE_AMOUNT: &str = "fare_amount";
pub const MTA_TAX: &str = "mta_tax";
pub const TIP_AMOUNT: &str = "tip_amount";
pub const TOLLS_AMOUNT: &str = "tolls_amount";
pub const TOTAL_AMOUNT: &str = "total_amount";

/// Type a canonical column is cast to by the cleaning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Timestamp,
    Integer,
    Float,
}

impl ColumnKind {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnKind::Text => DataType::Utf8,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Nanosecond, None),
            ColumnKind::Integer => DataType::Int32,
            ColumnKind::Float => DataType::Float64,
        }
    }
}

/// One column of the canonical trip layout.
#[derive(Debug, Clone, Copy)]
pub struct TripColumn {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
    /// Header spellings accepted for this column, lower case.
    pub aliases: &'static [&'static str],
}

/// The canonical trip columns, in output order.
pub const TRIP_COLUMNS: &[TripColumn] = &[
    TripColumn {
        name: VENDOR_ID,
        kind: ColumnKind::Text,
        required: false,
        aliases: &["vendor_id", "vendor_name", "vendorid"],
    },
    TripColumn {
        name: PICKUP_DATETIME,
        kind: ColumnKind::Timestamp,
        required: true,
        aliases: &["pickup_datetime", "trip_pickup_datetime", "tpep_pickup_datetime"],
    },
    TripColumn {
        name: DROPOFF_DATETIME,
        kind: ColumnKind::Timestamp,
        required: true,
        aliases: &["dropoff_datetime", "trip_dropoff_datetime", "tpep_dropoff_datetime"],
    },
    TripColumn {
        name: PASSENGER_COUNT,
        kind: ColumnKind::Integer,
        required: false,
        aliases: &["passenger_count"],
    },
    TripColumn {
        name: TRIP_DISTANCE,
        kind: ColumnKind::Float,
        required: true,
        aliases: &["trip_distance"],
    },
    TripColumn {
        name: PICKUP_LONGITUDE,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["pickup_longitude", "start_lon"],
    },
    TripColumn {
        name: PICKUP_LATITUDE,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["pickup_latitude", "start_lat"],
    },
    TripColumn {
        name: DROPOFF_LONGITUDE,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["dropoff_longitude", "end_lon"],
    },
    TripColumn {
        name: DROPOFF_LATITUDE,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["dropoff_latitude", "end_lat"],
    },
    TripColumn {
        name: PAYMENT_TYPE,
        kind: ColumnKind::Text,
        required: true,
        aliases: &["payment_type"],
    },
    TripColumn {
        name: FARE_AMOUNT,
        kind: ColumnKind::Float,
        required: true,
        aliases: &["fare_amount", "fare_amt"],
    },
    TripColumn {
        name: MTA_TAX,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["mta_tax"],
    },
    TripColumn {
        name: TIP_AMOUNT,
        kind: ColumnKind::Float,
        required: true,
        aliases: &["tip_amount", "tip_amt"],
    },
    TripColumn {
        name: TOLLS_AMOUNT,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["tolls_amount", "tolls_amt"],
    },
    TripColumn {
        name: TOTAL_AMOUNT,
        kind: ColumnKind::Float,
        required: false,
        aliases: &["total_amount", "total_amt"],
    },
];

/// Looks up a canonical column by name.
pub fn trip_column(name: &str) -> Option<&'static TripColumn> {
    TRIP_COLUMNS.iter().find(|c| c.name == name)
}

/// The loader's output schema: every canonical column as nullable text.
pub fn raw_trip_schema() -> Schema {
    Schema::new(
        TRIP_COLUMNS
            .iter()
            .map(|c| Field::new(c.name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    )
}

/// How one source file's columns line up with the canonical layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLayout {
    /// One entry per header position: the canonical column stored there, if any.
    pub positions: Vec<Option<&'static str>>,
}

impl FileLayout {
    /// Schema used to read the file: canonical names where the header matched, placeholders
    /// elsewhere, all typed as text so no row fails to parse at scan time.
    pub fn read_schema(&self) -> Schema {
        let fields: Vec<Field> = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, slot)| match slot {
                Some(name) => Field::new(*name, DataType::Utf8, true),
                None => Field::new(format!("_unmapped_{}", i), DataType::Utf8, true),
            })
            .collect();
        Schema::new(fields)
    }

    /// True if the file carries the given canonical column.
    pub fn has(&self, name: &str) -> bool {
        self.positions.iter().any(|slot| *slot == Some(name))
    }
}

fn normalize_header(name: &str) -> String {
    name.trim().trim_matches('"').trim().to_ascii_lowercase()
}

/// Maps a header row onto the canonical trip columns.
///
/// A canonical column takes the first header position whose normalized name is one of its
/// aliases. Returns [`TaxiSummaryError::SchemaMismatch`] naming every required column the
/// header is missing.
pub fn resolve_layout(path: &Path, header: &[String]) -> TaxiSummaryResult<FileLayout> {
    let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
    let mut positions: Vec<Option<&'static str>> = vec![None; header.len()];
    let mut missing = Vec::new();

    for column in TRIP_COLUMNS {
        let found = normalized
            .iter()
            .enumerate()
            .find(|(i, h)| positions[*i].is_none() && column.aliases.contains(&h.as_str()));
        match found {
            Some((i, _)) => positions[i] = Some(column.name),
            None if column.required => missing.push(column.name.to_string()),
            None => {}
        }
    }

    if !missing.is_empty() {
        return Err(TaxiSummaryError::SchemaMismatch {
            path: path.to_path_buf(),
            missing,
        });
    }
    Ok(FileLayout { positions })
}
