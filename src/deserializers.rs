//! Forgiving deserializers for registry and scorer payloads.
//!
//! The registry stores answers as loosely typed JSON and the scorer has been
//! seen returning scores both as numbers and as numeric strings. These helpers
//! accept those shapes while keeping the in-memory model strongly typed.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Deserializes an attribute map whose values may be any JSON scalar.
///
/// # Accepted Formats
///
/// * **String**: kept verbatim
/// * **Number / bool**: rendered with `to_string`
/// * **Null**: the entry is dropped
/// * **Array / object**: rendered as compact JSON
/// * A missing or `null` map yields an empty map
pub fn de_attributes_forgiving<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    let Some(raw) = opt else {
        return Ok(BTreeMap::new());
    };

    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect())
}

/// Deserializes an optional score given as a number or a numeric string.
///
/// Empty strings and `null` map to `None`. Non-finite values are rejected.
pub fn de_option_score_forgiving<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    let score = match v {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom("invalid numeric score"))?,
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map_err(|_| D::Error::custom(format!("score '{}' is not a number", s)))?
        }
        other => {
            return Err(D::Error::custom(format!(
                "expected number or numeric string for score, got {}",
                other
            )));
        }
    };
    if !score.is_finite() {
        return Err(D::Error::custom("non-finite score"));
    }
    Ok(Some(score))
}
