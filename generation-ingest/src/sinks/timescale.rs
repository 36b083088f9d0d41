use std::{collections::HashMap, time::Duration};

use generation_client::domain::GenerationPoint;
use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    Connection, Postgres, QueryBuilder,
};

use crate::pipeline::{GenerationSink, PipelineError};

/// Rows per `INSERT` statement. Six binds per row keeps a page well under
/// the 65535 bind-parameter limit.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Upserts into `generation_ts` over a dedicated connection per call.
///
/// Every call opens one connection, writes all pages in one transaction and
/// closes the connection again. Nothing is pooled across zones.
pub struct TimescaleGenerationSink {
    connect_options: PgConnectOptions,
    batch_size: usize,
    connect_timeout: Duration,
}

impl TimescaleGenerationSink {
    pub fn new(connect_options: PgConnectOptions, batch_size: usize, connect_timeout: Duration) -> Self {
        Self {
            connect_options,
            batch_size: batch_size.max(1),
            connect_timeout,
        }
    }

    async fn connect(&self) -> Result<PgConnection, PipelineError> {
        tracing::debug!(
            host = self.connect_options.get_host(),
            port = self.connect_options.get_port(),
            database = ?self.connect_options.get_database(),
            "connecting to timescale"
        );

        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.connect_options)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(PipelineError::Sink(format!("connect failed: {e}"))),
            Err(_) => Err(PipelineError::Sink(format!(
                "connect timed out after {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }

    async fn write_all(&self, conn: &mut PgConnection, rows: &[&GenerationPoint]) -> Result<u64, sqlx::Error> {
        // Dropping `tx` without commit rolls back every page written so far.
        let mut tx = conn.begin().await?;

        let mut affected = 0;
        for page in rows.chunks(self.batch_size) {
            let mut builder = upsert_query(page);
            affected += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(affected)
    }
}

/// Build one multi-row upsert for a page of points.
pub(crate) fn upsert_query<'a>(page: &[&'a GenerationPoint]) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO generation_ts (time_utc, bidding_zone, fuel_type, fuel_detail, value_mw, source) ",
    );

    builder.push_values(page.iter().copied(), |mut b, p| {
        b.push_bind(p.time_utc)
            .push_bind(p.bidding_zone.as_str())
            .push_bind(p.fuel_type.as_str())
            .push_bind(p.fuel_detail.as_str())
            .push_bind(p.value_mw)
            .push_bind(p.source.as_str());
    });

    builder.push(
        " ON CONFLICT (time_utc, bidding_zone, fuel_type, fuel_detail, source) DO UPDATE SET \
         value_mw = EXCLUDED.value_mw, \
         created_at = now()",
    );

    builder
}

/// Keep one point per natural key, the last one seen winning.
///
/// Postgres rejects an upsert statement that touches the same key twice.
pub(crate) fn last_per_key(points: &[GenerationPoint]) -> Vec<&GenerationPoint> {
    let mut slot_by_key = HashMap::with_capacity(points.len());
    let mut rows: Vec<&GenerationPoint> = Vec::with_capacity(points.len());

    for p in points {
        match slot_by_key.get(&p.natural_key()) {
            Some(&slot) => rows[slot] = p,
            None => {
                slot_by_key.insert(p.natural_key(), rows.len());
                rows.push(p);
            }
        }
    }

    rows
}

#[async_trait::async_trait]
impl GenerationSink for TimescaleGenerationSink {
    async fn upsert(&self, points: &[GenerationPoint]) -> Result<u64, PipelineError> {
        if points.is_empty() {
            tracing::warn!("nothing to upsert");
            return Ok(0);
        }

        let rows = last_per_key(points);
        if rows.len() < points.len() {
            tracing::warn!(
                duplicates = points.len() - rows.len(),
                "collapsed points sharing a natural key"
            );
        }

        let mut conn = self.connect().await?;
        let res = self.write_all(&mut conn, &rows).await;

        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close timescale connection cleanly");
        }

        match res {
            Ok(affected) => {
                tracing::info!(rows = rows.len(), affected, "upserted generation rows");
                Ok(affected)
            }
            Err(e) => {
                tracing::error!(error = %e, rows = rows.len(), "generation upsert failed, rolled back");
                Err(PipelineError::Sink(e.to_string()))
            }
        }
    }
}
