use crate::utils::digits_only;

/// Brazilian DDD area codes currently in service. Two digits, no leading
/// zero; gaps (20, 23, 25-26, ...) are codes ANATEL never assigned.
const BR_AREA_CODES: &[&str] = &[
    "11", "12", "13", "14", "15", "16", "17", "18", "19", // São Paulo
    "21", "22", "24", // Rio de Janeiro
    "27", "28", // Espírito Santo
    "31", "32", "33", "34", "35", "37", "38", // Minas Gerais
    "41", "42", "43", "44", "45", "46", // Paraná
    "47", "48", "49", // Santa Catarina
    "51", "53", "54", "55", // Rio Grande do Sul
    "61", // Distrito Federal
    "62", "64", // Goiás
    "63", // Tocantins
    "65", "66", // Mato Grosso
    "67", // Mato Grosso do Sul
    "68", // Acre
    "69", // Rondônia
    "71", "73", "74", "75", "77", // Bahia
    "79", // Sergipe
    "81", "87", // Pernambuco
    "82", // Alagoas
    "83", // Paraíba
    "84", // Rio Grande do Norte
    "85", "88", // Ceará
    "86", "89", // Piauí
    "91", "93", "94", // Pará
    "92", "97", // Amazonas
    "95", // Roraima
    "96", // Amapá
    "98", "99", // Maranhão
];

/// Result of a phone validation. `normalized` is always the digit-only
/// form, valid or not, so callers can decide whether to reject or coerce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneValidation {
    pub valid: bool,
    pub normalized: String,
    pub error: Option<String>,
}

impl PhoneValidation {
    fn ok(normalized: String) -> Self {
        Self {
            valid: true,
            normalized,
            error: None,
        }
    }

    fn fail(normalized: String, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            normalized,
            error: Some(error.into()),
        }
    }
}

/// Validate a local phone number against the rules for its country.
///
/// Brazil gets the strict treatment: 10-11 digit local number, DDD in the
/// service whitelist, and 11-digit (mobile) numbers must have `9` as the
/// third digit. Every other country only gets the generic length check.
pub fn validate(phone: &str, country_code: &str) -> PhoneValidation {
    let normalized = digits_only(phone);

    if normalized.len() < 8 || normalized.len() > 15 {
        return PhoneValidation::fail(
            normalized.clone(),
            format!("phone must have 8-15 digits, got {}", normalized.len()),
        );
    }

    if country_code != "55" {
        return PhoneValidation::ok(normalized);
    }

    if normalized.len() < 10 || normalized.len() > 11 {
        return PhoneValidation::fail(
            normalized.clone(),
            format!(
                "Brazilian number must have 10-11 digits, got {}",
                normalized.len()
            ),
        );
    }

    let ddd = &normalized[..2];
    if !BR_AREA_CODES.contains(&ddd) {
        return PhoneValidation::fail(normalized.clone(), format!("invalid DDD: {}", ddd));
    }

    if normalized.len() == 11 && normalized.as_bytes()[2] != b'9' {
        return PhoneValidation::fail(
            normalized.clone(),
            "11-digit mobile number must start with 9 after the DDD",
        );
    }

    PhoneValidation::ok(normalized)
}
