use anyhow::Result;
use sqlx::PgExecutor;
use time::OffsetDateTime;

use crate::domain::StoredGeneration;

/// Fetch the stored generation mix for one bidding zone in `[start, end)`,
/// ordered by time, then fuel type and detail.
pub async fn zone_generation<'e, E>(
    executor: E,
    bidding_zone: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<StoredGeneration>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, StoredGeneration>(
        r#"
        SELECT
            time_utc,
            bidding_zone,
            fuel_type,
            fuel_detail,
            value_mw,
            source,
            created_at
        FROM generation_ts
        WHERE bidding_zone = $1
          AND time_utc >= $2
          AND time_utc <  $3
        ORDER BY time_utc, fuel_type, fuel_detail
        "#,
    )
    .bind(bidding_zone)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
