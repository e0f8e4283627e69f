use std::collections::BTreeSet;
use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{ContextType, EdgeType, EndReason};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn format_optional_datetime(value: Option<&DateTime<Utc>>) -> Option<String> {
    value.map(format_datetime)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_end_reason(value: Option<String>) -> Result<Option<EndReason>> {
    match value {
        Some(raw) => EndReason::parse(&raw)
            .map(Some)
            .ok_or_else(|| anyhow!("unknown end reason {raw}")),
        None => Ok(None),
    }
}

pub fn parse_context_type(value: &str) -> Result<ContextType> {
    ContextType::parse(value).ok_or_else(|| anyhow!("unknown context type {value}"))
}

pub fn parse_edge_type(value: &str) -> Result<EdgeType> {
    EdgeType::parse(value).ok_or_else(|| anyhow!("unknown edge type {value}"))
}

pub fn encode_set(values: &BTreeSet<String>) -> Result<String> {
    serde_json::to_string(values).context("failed to serialize string set")
}

pub fn decode_set(raw: &str, field: &str) -> Result<BTreeSet<String>> {
    serde_json::from_str(raw).with_context(|| format!("failed to parse {field}"))
}

/// Wrap a decoding failure so it can be returned from a rusqlite row mapper.
pub fn invalid_data(err: anyhow::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{err:#}"),
        )),
    )
}
