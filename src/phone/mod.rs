pub mod formatter;
pub mod validator;

use crate::utils::digits_only;
use std::sync::LazyLock;

/// Minimum digits a local number must keep after a country code is stripped.
/// Shorter remainders mean the "matched" code was a coincidence.
const MIN_LOCAL_DIGITS: usize = 8;

/// At this length an unknown-prefix number is assumed to carry a country
/// code in front of a 10-digit local number.
const UNKNOWN_CC_MIN_DIGITS: usize = 12;

/// Country calling codes the CRM actively serves. Kept sorted by hand,
/// longest codes first; [`ordered_codes`] re-sorts at first use so the
/// longest-prefix-wins invariant holds regardless.
const COUNTRY_CODES: &[(&str, &str)] = &[
    ("598", "Uruguay"),
    ("595", "Paraguay"),
    ("593", "Ecuador"),
    ("591", "Bolivia"),
    ("351", "Portugal"),
    ("353", "Ireland"),
    ("55", "Brazil"),
    ("54", "Argentina"),
    ("56", "Chile"),
    ("57", "Colombia"),
    ("58", "Venezuela"),
    ("51", "Peru"),
    ("52", "Mexico"),
    ("34", "Spain"),
    ("33", "France"),
    ("39", "Italy"),
    ("44", "United Kingdom"),
    ("49", "Germany"),
    ("81", "Japan"),
    ("61", "Australia"),
    ("86", "China"),
    ("1", "United States/Canada"),
    ("7", "Russia"),
];

static ORDERED_CODES: LazyLock<Vec<(&'static str, &'static str)>> = LazyLock::new(|| {
    let mut codes = COUNTRY_CODES.to_vec();
    // Stable sort: entries of equal length keep their hand-written order.
    codes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    codes
});

fn ordered_codes() -> &'static [(&'static str, &'static str)] {
    &ORDERED_CODES
}

/// A phone number split into country code and local number.
///
/// Invariant: `full_number == country_code + local_number`. Computed per
/// call and never persisted directly — leads store `phone` and
/// `country_code` separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPhone {
    pub country_code: String,
    pub local_number: String,
    pub full_number: String,
    pub country: Option<String>,
}

/// Split a raw phone string into `{country code, local number}`.
///
/// Walks the country-code table longest-prefix-first so `598...` resolves
/// as Uruguay rather than matching `1` or a nonexistent `59`. A candidate
/// code only wins if the remaining local number keeps at least 8 digits.
///
/// Unknown prefixes fall through a heuristic chain instead of failing:
/// 12+ digits → everything except the trailing 10 digits is the country
/// code; anything shorter is treated as a Brazilian local number.
pub fn parse(raw_phone: &str) -> ParsedPhone {
    let digits = digits_only(raw_phone);

    for &(code, country) in ordered_codes() {
        if digits.starts_with(code) && digits.len() >= code.len() + MIN_LOCAL_DIGITS {
            return ParsedPhone {
                country_code: code.to_string(),
                local_number: digits[code.len()..].to_string(),
                full_number: digits.clone(),
                country: Some(country.to_string()),
            };
        }
    }

    if digits.len() >= UNKNOWN_CC_MIN_DIGITS {
        let split = digits.len() - 10;
        return ParsedPhone {
            country_code: digits[..split].to_string(),
            local_number: digits[split..].to_string(),
            full_number: digits,
            country: None,
        };
    }

    ParsedPhone {
        country_code: "55".to_string(),
        local_number: digits.clone(),
        full_number: format!("55{}", digits),
        country: Some("Brazil".to_string()),
    }
}
