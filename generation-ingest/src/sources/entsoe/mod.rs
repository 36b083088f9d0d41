//! Minimal client for the ENTSO-E Transparency Platform REST API.

mod document;
pub mod psr_type;

use std::time::Duration;

use time::{macros::format_description, OffsetDateTime, UtcOffset};

use crate::{civil_time::CivilTz, sources::RawSeries};

pub const DEFAULT_BASE_URL: &str = "https://web-api.tp.entsoe.eu/api";

/// Actual generation per production type.
const DOCUMENT_TYPE_GENERATION: &str = "A75";
/// Realised.
const PROCESS_TYPE_REALISED: &str = "A16";

#[derive(thiserror::Error, Debug)]
pub enum EntsoeError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API token rejected (HTTP 401)")]
    Unauthorized,
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no matching data: {0}")]
    NoMatchingData(String),
    #[error("request rejected ({code}): {text}")]
    Api { code: String, text: String },
    #[error("XML parsing failed: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("invalid request period: {0}")]
    Period(#[from] time::error::Format),
}

/// Authenticated API client. Build one per run and share it across zones.
pub struct EntsoeClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl EntsoeClient {
    pub fn new(
        api_token: impl Into<String>,
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, EntsoeError> {
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_token: api_token.into(),
        })
    }

    /// Actual generation per production type for one area.
    ///
    /// `start`/`end` may carry any offset; the API receives them in UTC. Naive
    /// timestamps in the result would be read in `request_tz`.
    pub async fn query_generation(
        &self,
        eic_code: &str,
        start: OffsetDateTime,
        end: OffsetDateTime,
        request_tz: CivilTz,
    ) -> Result<RawSeries, EntsoeError> {
        let period_start = period_param(start)?;
        let period_end = period_param(end)?;

        let params = [
            ("securityToken", self.api_token.as_str()),
            ("documentType", DOCUMENT_TYPE_GENERATION),
            ("processType", PROCESS_TYPE_REALISED),
            ("in_Domain", eic_code),
            ("periodStart", period_start.as_str()),
            ("periodEnd", period_end.as_str()),
        ];

        let response = self.http.get(&self.base_url).query(&params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(eic_code, %status, bytes = body.len(), "entsoe response");

        let doc = document::parse_response(status, &body)?;
        document::generation_series(&doc, start, end, request_tz)
    }
}

/// `yyyyMMddHHmm` in UTC.
fn period_param(ts: OffsetDateTime) -> Result<String, EntsoeError> {
    Ok(ts
        .to_offset(UtcOffset::UTC)
        .format(format_description!("[year][month][day][hour][minute]"))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn period_params_are_utc_minutes() {
        assert_eq!(period_param(datetime!(2024-03-13 11:00 +01:00)).unwrap(), "202403131000");
        assert_eq!(period_param(datetime!(2024-03-15 10:00 UTC)).unwrap(), "202403151000");
    }
}
