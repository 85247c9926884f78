#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use taxi_summary::schema::{raw_trip_schema, TRIP_COLUMNS};

/// One synthetic trip, in raw text form as the loader produces it.
#[derive(Clone)]
pub struct RawTrip {
    pub pickup: &'static str,
    pub dropoff: &'static str,
    pub distance: &'static str,
    pub payment: &'static str,
    pub fare: &'static str,
    pub tip: &'static str,
}

impl RawTrip {
    pub fn new(
        pickup: &'static str,
        dropoff: &'static str,
        distance: &'static str,
        payment: &'static str,
        fare: &'static str,
        tip: &'static str,
    ) -> Self {
        Self {
            pickup,
            dropoff,
            distance,
            payment,
            fare,
            tip,
        }
    }

    fn value(&self, column: &str) -> Option<&'static str> {
        match column {
            "vendor_id" => Some("VTS"),
            "pickup_datetime" => Some(self.pickup),
            "dropoff_datetime" => Some(self.dropoff),
            "passenger_count" => Some("1"),
            "trip_distance" => Some(self.distance),
            "payment_type" => Some(self.payment),
            "fare_amount" => Some(self.fare),
            "tip_amount" => Some(self.tip),
            "mta_tax" => Some("0.5"),
            _ => None,
        }
    }
}

/// The three trips of the documented end-to-end scenario (all in January 2010).
pub fn scenario_trips() -> Vec<RawTrip> {
    vec![
        RawTrip::new("2010-01-05 08:00:00", "2010-01-05 08:12:00", "3", "CRD", "10", "2"),
        RawTrip::new("2010-01-06 09:00:00", "2010-01-06 09:06:00", "2", "CAS", "8", "0"),
        RawTrip::new("2010-01-07 10:00:00", "2010-01-07 10:03:00", "1", "CRD", "-5", "1"),
    ]
}

/// Builds a DataFrame in the raw canonical layout from the given trips.
pub async fn raw_trips_df(ctx: &SessionContext, trips: &[RawTrip]) -> DataFrame {
    let schema = Arc::new(raw_trip_schema());
    let columns: Vec<ArrayRef> = TRIP_COLUMNS
        .iter()
        .map(|c| {
            let values: Vec<Option<&str>> = trips.iter().map(|t| t.value(c.name)).collect();
            Arc::new(StringArray::from(values)) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    ctx.register_table("raw_trips", Arc::new(mem_table)).unwrap();
    ctx.table("raw_trips").await.unwrap()
}

/// Concatenates all rows of one column as f64 (nulls become NaN).
pub fn f64_column(batches: &[RecordBatch], name: &str) -> Vec<f64> {
    let mut out = Vec::new();
    for batch in batches {
        let array = batch.column(batch.schema().index_of(name).unwrap());
        if let Some(arr) = array.as_any().downcast_ref::<Float64Array>() {
            out.extend((0..arr.len()).map(|i| if arr.is_null(i) { f64::NAN } else { arr.value(i) }));
        } else if let Some(arr) = array.as_any().downcast_ref::<Int64Array>() {
            out.extend((0..arr.len()).map(|i| arr.value(i) as f64));
        } else if let Some(arr) = array.as_any().downcast_ref::<Int32Array>() {
            out.extend((0..arr.len()).map(|i| arr.value(i) as f64));
        } else {
            panic!("Column '{}' is not numeric: {:?}", name, array.data_type());
        }
    }
    out
}

/// Concatenates all rows of a text column.
pub fn str_column(batches: &[RecordBatch], name: &str) -> Vec<String> {
    let mut out = Vec::new();
    for batch in batches {
        let array = batch.column(batch.schema().index_of(name).unwrap());
        let arr = array
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("Failed to downcast to StringArray");
        out.extend((0..arr.len()).map(|i| arr.value(i).to_string()));
    }
    out
}

pub fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(|b| b.num_rows()).sum()
}
