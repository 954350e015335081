use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{ArchiveError, ShapeError};
use crate::model::{Archive, ArchiveQuery, DailyMetric, DailyRecord};

/// Production endpoint of the Open-Meteo historical archive.
pub const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Open-Meteo archive API. Holds a pooled
/// `reqwest::Client` so repeated fetches reuse connections; the pool
/// is a performance detail only, every fetch is independent.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl Default for ArchiveClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            base_url: ARCHIVE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound the whole round trip; on expiry `fetch` fails with a
    /// transport error instead of hanging.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Point the client at a different endpoint, e.g. a test stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run one query against the archive: a single GET, then shape
    /// validation of the body into a dense, date-ordered [`Archive`].
    ///
    /// Every failure is typed ([`ArchiveError`]); a short or gappy
    /// payload is an error, never a truncated success.
    pub async fn fetch(&self, query: &ArchiveQuery) -> Result<Archive, ArchiveError> {
        query.validate()?;

        debug!(
            "fetching {} day(s) of daily archive for ({}, {})",
            query.day_count(),
            query.latitude,
            query.longitude
        );

        let res = self
            .http
            .get(&self.base_url)
            .query(&query.to_params())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        let parsed: ArchiveResponse = serde_json::from_str(&body).map_err(ShapeError::from)?;
        let records = normalize(query, &parsed)?;

        debug!("validated {} daily record(s)", records.len());

        Ok(Archive {
            query: query.clone(),
            records,
        })
    }
}

/// Open-Meteo error bodies look like `{"error": true, "reason": "..."}`.
/// Pass the reason through unchanged when present, otherwise fall back
/// to the status line.
fn provider_error(status: StatusCode, body: &str) -> ArchiveError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.reason)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("no error message")
                .to_string()
        });

    let retryable = status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error();

    ArchiveError::Provider {
        status,
        message,
        retryable,
    }
}

/// Check the response shape against the query and zip the parallel
/// per-metric arrays into one record per calendar day.
fn normalize(query: &ArchiveQuery, response: &ArchiveResponse) -> Result<Vec<DailyRecord>, ShapeError> {
    let daily = response.daily.as_ref().ok_or(ShapeError::MissingDailyBlock)?;
    let time = daily.time.as_ref().ok_or(ShapeError::MissingArray("time"))?;

    if time.is_empty() {
        return Err(ShapeError::Empty);
    }

    let expected = query.day_count();
    if time.len() != expected {
        return Err(ShapeError::LengthMismatch {
            name: "time",
            expected,
            actual: time.len(),
        });
    }

    for metric in &query.metrics {
        let actual = daily
            .metric_len(*metric)
            .ok_or(ShapeError::MissingArray(metric.as_str()))?;
        if actual != expected {
            return Err(ShapeError::LengthMismatch {
                name: metric.as_str(),
                expected,
                actual,
            });
        }
    }

    let mut records = Vec::with_capacity(expected);
    for (index, raw) in time.iter().enumerate() {
        // date_at only returns None past the calendar's end, which the
        // range validation already rules out
        let expected_date = query.date_at(index).ok_or(ShapeError::DateOutOfSequence {
            index,
            expected: query.end_date,
            actual: raw.clone(),
        })?;

        let date = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .filter(|d| *d == expected_date)
            .ok_or(ShapeError::DateOutOfSequence {
                index,
                expected: expected_date,
                actual: raw.clone(),
            })?;

        let mut record = DailyRecord::empty(date);
        record.temperature_2m_max = float_at(&daily.temperature_2m_max, index);
        record.temperature_2m_min = float_at(&daily.temperature_2m_min, index);
        record.apparent_temperature_max = float_at(&daily.apparent_temperature_max, index);
        record.apparent_temperature_min = float_at(&daily.apparent_temperature_min, index);
        record.sunrise = time_at(&daily.sunrise, index, "sunrise")?;
        record.sunset = time_at(&daily.sunset, index, "sunset")?;
        records.push(record);
    }

    Ok(records)
}

/// A provider null stays `None`; missing data is never coerced to zero.
fn float_at(array: &Option<Vec<Option<f64>>>, index: usize) -> Option<f64> {
    array.as_ref().and_then(|v| v.get(index).copied().flatten())
}

/// Sunrise/sunset come back as ISO-8601 local wall-clock strings
/// without an offset, e.g. "2016-02-15T06:45".
fn time_at(
    array: &Option<Vec<Option<String>>>,
    index: usize,
    name: &'static str,
) -> Result<Option<chrono::NaiveDateTime>, ShapeError> {
    let Some(value) = array.as_ref().and_then(|v| v.get(index)).and_then(Option::as_ref) else {
        return Ok(None);
    };

    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map(Some)
        .map_err(|_| ShapeError::BadTimeValue {
            name,
            index,
            value: value.clone(),
        })
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Option<Vec<String>>,
    temperature_2m_max: Option<Vec<Option<f64>>>,
    temperature_2m_min: Option<Vec<Option<f64>>>,
    apparent_temperature_max: Option<Vec<Option<f64>>>,
    apparent_temperature_min: Option<Vec<Option<f64>>>,
    sunrise: Option<Vec<Option<String>>>,
    sunset: Option<Vec<Option<String>>>,
}

impl DailyBlock {
    fn metric_len(&self, metric: DailyMetric) -> Option<usize> {
        match metric {
            DailyMetric::TemperatureMax => self.temperature_2m_max.as_ref().map(Vec::len),
            DailyMetric::TemperatureMin => self.temperature_2m_min.as_ref().map(Vec::len),
            DailyMetric::ApparentTemperatureMax => {
                self.apparent_temperature_max.as_ref().map(Vec::len)
            }
            DailyMetric::ApparentTemperatureMin => {
                self.apparent_temperature_min.as_ref().map(Vec::len)
            }
            DailyMetric::Sunrise => self.sunrise.as_ref().map(Vec::len),
            DailyMetric::Sunset => self.sunset.as_ref().map(Vec::len),
        }
    }
}
