//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod catalog;
pub mod health;
pub mod journeys;
pub mod orders;

use crate::error::AppError;
use serde::Deserialize;
use std::str::FromStr;

pub use health::{health_check, readiness_check};

/// `page` / `page_size` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Page number, starting at 1
    pub page: Option<u32>,
    /// Items per page
    pub page_size: Option<u32>,
}

/// Parse a comma separated id list such as `?source=<uuid>,<uuid>`.
///
/// An absent or blank parameter yields an empty list.
///
/// # Errors
///
/// Returns a 422 naming `field` if any element does not parse.
pub fn parse_ids<T: FromStr>(field: &str, raw: Option<&str>) -> Result<Vec<T>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse().map_err(|_| {
                AppError::validation("VALIDATION_ERROR", format!("invalid id in {field}: {part}"))
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use train_station_core::StationId;

    #[test]
    fn test_parse_ids() {
        let a = StationId::new();
        let b = StationId::new();
        let raw = format!("{a}, {b},");
        assert_eq!(parse_ids::<StationId>("source", Some(&raw)).unwrap(), vec![a, b]);
        assert!(parse_ids::<StationId>("source", None).unwrap().is_empty());
        assert!(parse_ids::<StationId>("source", Some("nope")).is_err());
    }
}
