//! Runs against a real Postgres/TimescaleDB when `GENERATION_TEST_DATABASE_URL`
//! is set; otherwise every check is skipped.

use std::{str::FromStr, time::Duration};

use generation_client::{
    db::generation_queries::zone_generation,
    domain::{GenerationPoint, SOURCE_NAME},
};
use generation_ingest::{
    pipeline::{GenerationSink, PipelineError},
    sinks::TimescaleGenerationSink,
};
use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    Connection,
};
use time::{macros::datetime, OffsetDateTime};

const SCHEMA: &str = include_str!("../../sql/schema/01_generation_ts.sql");

fn point(zone: &str, time_utc: OffsetDateTime, fuel_type: &str, fuel_detail: &str, value_mw: f64) -> GenerationPoint {
    GenerationPoint {
        time_utc,
        bidding_zone: zone.to_string(),
        fuel_type: fuel_type.to_string(),
        fuel_detail: fuel_detail.to_string(),
        value_mw,
        source: SOURCE_NAME.to_string(),
    }
}

fn sink(options: &PgConnectOptions, batch_size: usize) -> TimescaleGenerationSink {
    TimescaleGenerationSink::new(options.clone(), batch_size, Duration::from_secs(10))
}

async fn clear(conn: &mut PgConnection, zone: &str) {
    sqlx::query("DELETE FROM generation_ts WHERE bidding_zone = $1")
        .bind(zone)
        .execute(conn)
        .await
        .unwrap();
}

#[tokio::test]
async fn upserts_against_timescale() {
    let Ok(url) = std::env::var("GENERATION_TEST_DATABASE_URL") else {
        eprintln!("GENERATION_TEST_DATABASE_URL not set, skipping");
        return;
    };
    let options = PgConnectOptions::from_str(&url).unwrap();
    let mut conn = PgConnection::connect_with(&options).await.unwrap();
    sqlx::raw_sql(SCHEMA).execute(&mut conn).await.unwrap();

    rerun_keeps_one_row_per_key(&options, &mut conn).await;
    rerun_overwrites_changed_values(&options, &mut conn).await;
    failed_page_rolls_back_the_whole_zone(&options, &mut conn).await;

    conn.close().await.unwrap();
}

async fn rerun_keeps_one_row_per_key(options: &PgConnectOptions, conn: &mut PgConnection) {
    let zone = "TEST-IDEMPOTENT";
    clear(conn, zone).await;

    let t0 = datetime!(2024-01-01 00:00 UTC);
    let t1 = datetime!(2024-01-01 01:00 UTC);
    let points = vec![
        point(zone, t0, "Solar", "Unknown", 0.0),
        point(zone, t0, "Fossil Gas", "Actual Aggregated", 1200.5),
        point(zone, t1, "Fossil Gas", "Actual Aggregated", 1180.0),
    ];

    let sink = sink(options, 2);
    sink.upsert(&points).await.unwrap();
    let first = zone_generation(&mut *conn, zone, t0, t1 + time::Duration::hours(1))
        .await
        .unwrap();

    sink.upsert(&points).await.unwrap();
    let second = zone_generation(&mut *conn, zone, t0, t1 + time::Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 3);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(
            (a.time_utc, &a.fuel_type, &a.fuel_detail, a.value_mw),
            (b.time_utc, &b.fuel_type, &b.fuel_detail, b.value_mw)
        );
        assert!(b.created_at >= a.created_at);
    }

    clear(conn, zone).await;
}

async fn rerun_overwrites_changed_values(options: &PgConnectOptions, conn: &mut PgConnection) {
    let zone = "TEST-OVERWRITE";
    clear(conn, zone).await;

    let t0 = datetime!(2024-01-01 00:00 UTC);
    let sink = sink(options, 100);

    sink.upsert(&[point(zone, t0, "Nuclear", "Unknown", 100.0)]).await.unwrap();
    sink.upsert(&[point(zone, t0, "Nuclear", "Unknown", 250.0)]).await.unwrap();

    let rows = zone_generation(&mut *conn, zone, t0, t0 + time::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value_mw, 250.0);
    assert_eq!(rows[0].source, SOURCE_NAME);

    clear(conn, zone).await;
}

async fn failed_page_rolls_back_the_whole_zone(options: &PgConnectOptions, conn: &mut PgConnection) {
    let zone = "TEST-ATOMIC";
    clear(conn, zone).await;

    let t0 = datetime!(2024-01-01 00:00 UTC);
    // Postgres refuses NUL in text, so the second page fails after the first was written.
    let points = vec![
        point(zone, t0, "Solar", "Unknown", 1.0),
        point(zone, t0, "Wind Onshore", "Unknown", 2.0),
        point(zone, t0, "Wind Offshore", "bad\0detail", 3.0),
    ];

    let res = sink(options, 2).upsert(&points).await;
    assert!(matches!(res, Err(PipelineError::Sink(_))));

    let rows = zone_generation(&mut *conn, zone, t0, t0 + time::Duration::hours(1))
        .await
        .unwrap();
    assert!(rows.is_empty());
}
