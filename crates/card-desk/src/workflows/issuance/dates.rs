//! Serde helpers for date-valued payload fields. An empty string at the
//! boundary means "no date" and normalizes to `None` before validation.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
