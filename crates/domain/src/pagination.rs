use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;

pub const DEFAULT_LIMIT: usize = 20;
pub const MAX_LIMIT: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: usize, limit: usize, total: usize) -> Self {
        Self {
            items,
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

pub fn normalize_limit(limit: Option<usize>) -> DomainResult<usize> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        Err(DomainError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )))
    } else {
        Ok(limit)
    }
}

pub fn normalize_page(page: Option<usize>) -> DomainResult<usize> {
    match page.unwrap_or(1) {
        0 => Err(DomainError::Validation("page must be at least 1".into())),
        page => Ok(page),
    }
}

/// Cursor format: `<timestamp_ms>:<id>`.
pub fn parse_cursor(value: Option<&str>) -> DomainResult<(Option<i64>, Option<String>)> {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return Ok((None, None));
    };
    let invalid =
        || DomainError::Validation("invalid cursor format; expected <timestamp_ms>:<id>".into());
    let (timestamp_raw, id) = value.split_once(':').ok_or_else(invalid)?;
    let timestamp_ms = timestamp_raw.parse().map_err(|_| invalid())?;
    if id.trim().is_empty() {
        return Err(invalid());
    }
    Ok((Some(timestamp_ms), Some(id.to_string())))
}

pub fn make_cursor(timestamp_ms: i64, id: &str) -> String {
    format!("{timestamp_ms}:{id}")
}
