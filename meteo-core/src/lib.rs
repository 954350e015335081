//! Core library for the `meteo` CLI.
//!
//! This crate defines:
//! - The [`ArchiveClient`] talking to the Open-Meteo historical archive
//! - Shared domain models (queries, daily records, fetched archives)
//! - The typed error taxonomy for a fetch
//! - Configuration handling for stored query defaults
//!
//! It is used by `meteo-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use client::{ARCHIVE_URL, ArchiveClient};
pub use config::Config;
pub use error::{ArchiveError, QueryError, ShapeError};
pub use model::{Archive, ArchiveQuery, DailyMetric, DailyRecord, TemperatureUnit};
