use std::time::{SystemTime, UNIX_EPOCH};

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::error::DomainError;

pub fn uuid_v7_without_dashes() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub fn format_ms_rfc3339(epoch_ms: i64) -> String {
    let fallback = OffsetDateTime::from_unix_timestamp(0).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let value =
        OffsetDateTime::from_unix_timestamp_nanos(epoch_ms as i128 * 1_000_000).unwrap_or(fallback);
    value
        .format(&Rfc3339)
        .unwrap_or("1970-01-01T00:00:00Z".to_string())
}

pub fn parse_rfc3339_ms(value: &str) -> crate::DomainResult<i64> {
    let datetime = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|err| DomainError::Storage(format!("invalid datetime '{value}': {err}")))?;
    Ok((datetime.unix_timestamp_nanos() / 1_000_000) as i64)
}

/// Trims, drops empty values and keeps the first occurrence of each value.
pub fn dedupe_trimmed(values: &[String]) -> Vec<String> {
    let mut deduped = Vec::with_capacity(values.len());
    let mut seen = std::collections::HashSet::new();
    for raw in values {
        let value = raw.trim().to_string();
        if value.is_empty() {
            continue;
        }
        if seen.insert(value.clone()) {
            deduped.push(value);
        }
    }
    deduped
}

pub fn validate_http_url(field: &str, value: &str) -> crate::DomainResult<String> {
    let trimmed = value.trim();
    let parsed = url::Url::parse(trimmed)
        .map_err(|_| DomainError::Validation(format!("{field} must be a valid url")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        _ => Err(DomainError::Validation(format!(
            "{field} must use http or https"
        ))),
    }
}

pub fn require_text(field: &str, value: &str, max_chars: usize) -> crate::DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(DomainError::Validation(format!(
            "{field} exceeds max length of {max_chars}"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max_chars: usize,
) -> crate::DomainResult<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if value.chars().count() > max_chars {
        return Err(DomainError::Validation(format!(
            "{field} exceeds max length of {max_chars}"
        )));
    }
    Ok(Some(value.to_string()))
}
