use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// The daily metrics the archive API can report. Closed set: anything
/// else is rejected when a query is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DailyMetric {
    #[serde(rename = "temperature_2m_max")]
    TemperatureMax,
    #[serde(rename = "temperature_2m_min")]
    TemperatureMin,
    #[serde(rename = "apparent_temperature_max")]
    ApparentTemperatureMax,
    #[serde(rename = "apparent_temperature_min")]
    ApparentTemperatureMin,
    #[serde(rename = "sunrise")]
    Sunrise,
    #[serde(rename = "sunset")]
    Sunset,
}

impl DailyMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DailyMetric::TemperatureMax => "temperature_2m_max",
            DailyMetric::TemperatureMin => "temperature_2m_min",
            DailyMetric::ApparentTemperatureMax => "apparent_temperature_max",
            DailyMetric::ApparentTemperatureMin => "apparent_temperature_min",
            DailyMetric::Sunrise => "sunrise",
            DailyMetric::Sunset => "sunset",
        }
    }

    pub const fn all() -> &'static [DailyMetric] {
        &[
            DailyMetric::TemperatureMax,
            DailyMetric::TemperatureMin,
            DailyMetric::ApparentTemperatureMax,
            DailyMetric::ApparentTemperatureMin,
            DailyMetric::Sunrise,
            DailyMetric::Sunset,
        ]
    }
}

impl std::fmt::Display for DailyMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DailyMetric {
    type Error = QueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "temperature_2m_max" => Ok(DailyMetric::TemperatureMax),
            "temperature_2m_min" => Ok(DailyMetric::TemperatureMin),
            "apparent_temperature_max" => Ok(DailyMetric::ApparentTemperatureMax),
            "apparent_temperature_min" => Ok(DailyMetric::ApparentTemperatureMin),
            "sunrise" => Ok(DailyMetric::Sunrise),
            "sunset" => Ok(DailyMetric::Sunset),
            _ => Err(QueryError::UnknownMetric(value.to_string())),
        }
    }
}

/// Unit for all temperature metrics in a query. The provider defaults
/// to celsius when the parameter is omitted; we always send it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "celsius",
            TemperatureUnit::Fahrenheit => "fahrenheit",
        }
    }

    pub const fn all() -> &'static [TemperatureUnit] {
        &[TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit]
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = QueryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "celsius" => Ok(TemperatureUnit::Celsius),
            "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(QueryError::UnknownUnit(value.to_string())),
        }
    }
}

/// One historical-range daily-weather query: a fixed point, an
/// inclusive date range, and the metrics to fetch. Validated on
/// construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: Vec<DailyMetric>,
    pub temperature_unit: TemperatureUnit,
    pub timezone: String,
}

impl ArchiveQuery {
    /// Build a query, rejecting inconsistent input up front. Duplicate
    /// metrics are dropped, keeping first-occurrence order.
    pub fn new(
        latitude: f64,
        longitude: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        metrics: Vec<DailyMetric>,
        temperature_unit: TemperatureUnit,
        timezone: impl Into<String>,
    ) -> Result<Self, QueryError> {
        let mut deduped: Vec<DailyMetric> = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if !deduped.contains(&metric) {
                deduped.push(metric);
            }
        }

        let query = Self {
            latitude,
            longitude,
            start_date,
            end_date,
            metrics: deduped,
            temperature_unit,
            timezone: timezone.into(),
        };
        query.validate()?;
        Ok(query)
    }

    /// Check the internal-consistency invariants. `new` always calls
    /// this; `fetch` calls it again so a hand-assembled query can
    /// never reach the network.
    pub fn validate(&self) -> Result<(), QueryError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(QueryError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(QueryError::LongitudeOutOfRange(self.longitude));
        }
        if self.start_date > self.end_date {
            return Err(QueryError::StartAfterEnd {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.metrics.is_empty() {
            return Err(QueryError::NoMetrics);
        }
        if self.timezone.is_empty() || self.timezone.chars().any(char::is_whitespace) {
            return Err(QueryError::InvalidTimezone(self.timezone.clone()));
        }
        Ok(())
    }

    /// Number of calendar days in the inclusive range. At least 1 for
    /// any query that passed validation.
    pub fn day_count(&self) -> usize {
        (self.end_date - self.start_date).num_days() as usize + 1
    }

    /// The query-string form sent to the provider, one parameter per
    /// field, metrics joined with commas. Values never contain
    /// whitespace.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let daily = self
            .metrics
            .iter()
            .map(DailyMetric::as_str)
            .collect::<Vec<_>>()
            .join(",");

        vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("start_date", self.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", self.end_date.format("%Y-%m-%d").to_string()),
            ("daily", daily),
            ("temperature_unit", self.temperature_unit.as_str().to_string()),
            ("timezone", self.timezone.clone()),
        ]
    }

    /// Rebuild a query from its query-string form. Inverse of
    /// [`to_params`](Self::to_params).
    pub fn from_params<'a, I>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut latitude = None;
        let mut longitude = None;
        let mut start_date = None;
        let mut end_date = None;
        let mut metrics = None;
        let mut temperature_unit = None;
        let mut timezone = None;

        for (key, value) in params {
            match key {
                "latitude" => latitude = Some(parse_float("latitude", value)?),
                "longitude" => longitude = Some(parse_float("longitude", value)?),
                "start_date" => start_date = Some(parse_date("start_date", value)?),
                "end_date" => end_date = Some(parse_date("end_date", value)?),
                "daily" => {
                    metrics = Some(
                        value
                            .split(',')
                            .map(DailyMetric::try_from)
                            .collect::<Result<Vec<_>, _>>()?,
                    );
                }
                "temperature_unit" => temperature_unit = Some(TemperatureUnit::try_from(value)?),
                "timezone" => timezone = Some(value.to_string()),
                _ => {}
            }
        }

        Self::new(
            latitude.ok_or(QueryError::MissingParam("latitude"))?,
            longitude.ok_or(QueryError::MissingParam("longitude"))?,
            start_date.ok_or(QueryError::MissingParam("start_date"))?,
            end_date.ok_or(QueryError::MissingParam("end_date"))?,
            metrics.ok_or(QueryError::MissingParam("daily"))?,
            temperature_unit.ok_or(QueryError::MissingParam("temperature_unit"))?,
            timezone.ok_or(QueryError::MissingParam("timezone"))?,
        )
    }

    /// The calendar date at position `index` of the expected dense
    /// response, i.e. `start_date + index` days.
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.start_date.checked_add_days(Days::new(index as u64))
    }
}

fn parse_float(param: &'static str, value: &str) -> Result<f64, QueryError> {
    value.parse().map_err(|_| QueryError::InvalidParam {
        param,
        value: value.to_string(),
    })
}

fn parse_date(param: &'static str, value: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| QueryError::InvalidParam {
        param,
        value: value.to_string(),
    })
}

/// Observations for a single calendar date. A `None` means the
/// provider reported no value for that date/metric pair (or the
/// metric was not requested); missing data is never coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_2m_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_2m_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparent_temperature_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apparent_temperature_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset: Option<NaiveDateTime>,
}

impl DailyRecord {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            temperature_2m_max: None,
            temperature_2m_min: None,
            apparent_temperature_max: None,
            apparent_temperature_min: None,
            sunrise: None,
            sunset: None,
        }
    }
}

/// A validated fetch result: the query that produced it and one
/// record per day of the inclusive range, in ascending date order
/// with no gaps or duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub query: ArchiveQuery,
    pub records: Vec<DailyRecord>,
}
