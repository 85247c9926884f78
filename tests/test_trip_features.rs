mod common;

use approx::assert_abs_diff_eq;
use arrow::array::{ArrayRef, Date32Array, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit as ArrowTimeUnit};
use arrow::record_batch::RecordBatch;
use common::{f64_column, raw_trips_df, total_rows, RawTrip};
use datafusion::datasource::MemTable;
use datafusion::functions::datetime::expr_fn::to_unixtime;
use datafusion::prelude::*;
use std::sync::Arc;
use taxi_summary::exceptions::{TaxiSummaryError, TaxiSummaryResult};
use taxi_summary::make_pipeline;
use taxi_summary::settings::NegativeDurationPolicy;
use taxi_summary::transformers::cleaning::{TripCaster, TripFilter};
use taxi_summary::transformers::trip_features::TripFeatures;

const SECOND: i64 = 1_000_000_000;

/// Create a DataFrame with typed pickup/dropoff timestamps.
async fn create_timestamp_df(pairs: &[(i64, i64)]) -> DataFrame {
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "pickup_datetime",
            DataType::Timestamp(ArrowTimeUnit::Nanosecond, None),
            false,
        ),
        Field::new(
            "dropoff_datetime",
            DataType::Timestamp(ArrowTimeUnit::Nanosecond, None),
            false,
        ),
    ]));
    let pickups = TimestampNanosecondArray::from(pairs.iter().map(|p| p.0).collect::<Vec<_>>());
    let dropoffs = TimestampNanosecondArray::from(pairs.iter().map(|p| p.1).collect::<Vec<_>>());
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(pickups) as ArrayRef, Arc::new(dropoffs) as ArrayRef],
    )
    .unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("ts", Arc::new(mem_table)).unwrap();
    ctx.table("ts").await.unwrap()
}

#[tokio::test]
async fn test_calendar_features() -> TaxiSummaryResult<()> {
    // Row0: 2010-03-01T12:34:56Z (Monday) -> 2010-03-01T12:50:26Z
    // Row1: 2010-12-31T23:59:00Z (Friday) -> 2011-01-01T00:29:30Z
    let row0 = 1267446896 * SECOND;
    let row1 = 1293839940 * SECOND;
    let df = create_timestamp_df(&[(row0, row0 + 930 * SECOND), (row1, row1 + 1830 * SECOND)]).await;

    let features = TripFeatures::default();
    features.validate(&df)?;
    let batches = features.transform(df)?.collect().await?;
    let batch = &batches[0];

    assert_eq!(f64_column(&batches, "year"), vec![2010.0, 2010.0]);
    assert_eq!(f64_column(&batches, "month"), vec![3.0, 12.0]);
    assert_eq!(f64_column(&batches, "hour"), vec![12.0, 23.0]);
    assert_eq!(f64_column(&batches, "weekday"), vec![1.0, 5.0]);

    let minutes = f64_column(&batches, "trip_minutes");
    assert_abs_diff_eq!(minutes[0], 15.5, epsilon = 1e-9);
    assert_abs_diff_eq!(minutes[1], 30.5, epsilon = 1e-9);

    let dates = batch
        .column(batch.schema().index_of("pickup_date")?)
        .as_any()
        .downcast_ref::<Date32Array>()
        .expect("Failed to downcast pickup_date");
    // Days since the Unix epoch.
    assert_eq!(dates.value(0), 14669);
    assert_eq!(dates.value(1), 14974);
    Ok(())
}

#[tokio::test]
async fn test_trip_minutes_matches_timestamp_difference() -> TaxiSummaryResult<()> {
    let ctx = SessionContext::new();
    let trips = vec![
        RawTrip::new("2010-06-01 07:00:00", "2010-06-01 07:42:30", "5", "CRD", "20", "4"),
        RawTrip::new("2010-06-02 23:55:10", "2010-06-03 00:10:00", "3", "CAS", "11", "0"),
        RawTrip::new("2010-06-03 12:00:00", "2010-06-03 12:00:45", "0.2", "CRD", "2.5", "0"),
    ];
    let df = raw_trips_df(&ctx, &trips).await;
    let pipeline = make_pipeline!(
        false,
        ("cast", TripCaster::new()),
        ("filter", TripFilter::new(2010)),
        ("features", TripFeatures::default()),
    );
    let batches = pipeline
        .apply(df)?
        .select(vec![
            col("trip_minutes"),
            (to_unixtime(vec![col("dropoff_datetime")]) - to_unixtime(vec![col("pickup_datetime")]))
                .alias("seconds"),
        ])?
        .collect()
        .await?;

    let minutes = f64_column(&batches, "trip_minutes");
    let seconds = f64_column(&batches, "seconds");
    assert_eq!(minutes.len(), 3);
    for (m, s) in minutes.iter().zip(seconds.iter()) {
        assert_abs_diff_eq!(*m, s / 60.0, epsilon = 1e-9);
    }
    assert_abs_diff_eq!(minutes[0], 42.5, epsilon = 1e-9);
    assert_abs_diff_eq!(minutes[2], 0.75, epsilon = 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_negative_duration_policies() -> TaxiSummaryResult<()> {
    let start = 1267446896 * SECOND;
    let pairs = [(start, start + 600 * SECOND), (start, start - 120 * SECOND)];

    let kept = TripFeatures::new(NegativeDurationPolicy::Keep)
        .transform(create_timestamp_df(&pairs).await)?
        .collect()
        .await?;
    assert_eq!(f64_column(&kept, "trip_minutes"), vec![10.0, -2.0]);

    let clamped = TripFeatures::new(NegativeDurationPolicy::Clamp)
        .transform(create_timestamp_df(&pairs).await)?
        .collect()
        .await?;
    assert_eq!(f64_column(&clamped, "trip_minutes"), vec![10.0, 0.0]);

    let dropped = TripFeatures::new(NegativeDurationPolicy::Drop)
        .transform(create_timestamp_df(&pairs).await)?
        .collect()
        .await?;
    assert_eq!(total_rows(&dropped), 1);
    assert_eq!(f64_column(&dropped, "trip_minutes"), vec![10.0]);
    Ok(())
}

#[tokio::test]
async fn test_features_reject_text_timestamps() {
    let ctx = SessionContext::new();
    let df = raw_trips_df(&ctx, &common::scenario_trips()).await;
    let err = TripFeatures::default().validate(&df).unwrap_err();
    assert!(matches!(err, TaxiSummaryError::InvalidParameter(_)));
}
