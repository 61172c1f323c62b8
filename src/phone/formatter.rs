use crate::utils::digits_only;

/// Render a local number for display, using the conventions of its country.
///
/// Purely cosmetic — no validation happens here; numbers that don't fit
/// the expected shape come back as raw digits.
pub fn format(local_number: &str, country_code: &str) -> String {
    let digits = digits_only(local_number);

    match country_code {
        "55" => format_brazil(&digits),
        "1" => format_nanp(&digits),
        "52" => format_mexico(&digits),
        "353" => format_ireland(&digits),
        "81" => format_japan(&digits),
        "61" => format_australia(&digits),
        _ => digits,
    }
}

/// Machine dialing format: digits only, country code prepended unless the
/// number already carries it.
pub fn to_whatsapp_format(local_number: &str, country_code: &str) -> String {
    let digits = digits_only(local_number);
    let cc = digits_only(country_code);

    if digits.starts_with(&cc) && digits.len() >= cc.len() + 8 {
        return digits;
    }
    format!("{}{}", cc, digits)
}

fn format_brazil(digits: &str) -> String {
    match digits.len() {
        11 => format!("({}) {}-{}", &digits[..2], &digits[2..7], &digits[7..]),
        10 => format!("({}) {}-{}", &digits[..2], &digits[2..6], &digits[6..]),
        _ => digits.to_string(),
    }
}

fn format_nanp(digits: &str) -> String {
    if digits.len() == 10 {
        format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits.to_string()
    }
}

fn format_mexico(digits: &str) -> String {
    if digits.len() == 10 {
        format!("{} {} {}", &digits[..2], &digits[2..6], &digits[6..])
    } else {
        digits.to_string()
    }
}

fn format_ireland(digits: &str) -> String {
    // Local mobile without trunk zero, e.g. 851234567 → 085 123 4567
    if digits.len() == 9 {
        format!("0{} {} {}", &digits[..2], &digits[2..5], &digits[5..])
    } else {
        digits.to_string()
    }
}

fn format_japan(digits: &str) -> String {
    if digits.len() == 10 {
        format!("0{}-{}-{}", &digits[..2], &digits[2..6], &digits[6..])
    } else {
        digits.to_string()
    }
}

fn format_australia(digits: &str) -> String {
    if digits.len() == 9 {
        format!("0{} {} {}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits.to_string()
    }
}
