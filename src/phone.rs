use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

const COUNTRY_CODE: &str = "91";

/// Reduce a raw phone string to the canonical digit-only form used as identity.
///
/// Strips punctuation, a leading `+91` country code and a trunk `0` prefix.
/// Returns an empty string when no digits remain.
pub fn normalize_phone(raw: &str) -> String {
    let mut digits: String = raw.trim().chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 12 && digits.starts_with(COUNTRY_CODE) {
        digits.replace_range(..COUNTRY_CODE.len(), "");
    }
    if digits.len() == 11 && digits.starts_with('0') {
        digits.remove(0);
    }
    digits
}

/// A normalized phone number. Only constructible through normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_phone(raw);
        if normalized.is_empty() { None } else { Some(Self(normalized)) }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, as some user documents store the phone field as an integer.
    pub fn as_number(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = lenient_phone(d)?;
        Identity::parse(&raw).ok_or_else(|| serde::de::Error::custom("empty phone number"))
    }
}

/// Accept a phone field stored either as a string or as a number.
///
/// Whole-number doubles render without a fractional part so `9990001111.0` stays
/// `9990001111`.
pub fn lenient_phone<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e18).map(|f| f as i64))
            .map(|whole| whole.to_string())
            .unwrap_or_else(|| n.to_string()),
        _ => String::new(),
    })
}

/// Optional variant of [`lenient_phone`]; missing, null or blank yields `None`.
pub fn lenient_phone_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let raw = lenient_phone(d)?;
    Ok(if raw.trim().is_empty() { None } else { Some(raw) })
}
