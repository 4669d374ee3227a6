//! Phone number normalisation to `+<country code><subscriber>`.

use sis_core::error::AppError;

const MIN_DIGITS: usize = 8;
const MAX_DIGITS: usize = 15;

/// Normalise a user-entered phone number.
///
/// Separators (spaces, dashes, dots, parentheses) are dropped. `+` and `00`
/// prefixes mark an international number; a single leading `0` marks a
/// national one and is replaced by `country_code`. The result must hold
/// 8 to 15 digits.
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, AppError> {
    let compact: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let digits = if let Some(rest) = compact.strip_prefix('+') {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix("00") {
        rest.to_string()
    } else if let Some(rest) = compact.strip_prefix('0') {
        format!("{country_code}{rest}")
    } else {
        compact
    };

    if digits.len() < MIN_DIGITS
        || digits.len() > MAX_DIGITS
        || !digits.chars().all(|c| c.is_ascii_digit())
        || digits.starts_with('0')
    {
        return Err(invalid_phone());
    }

    Ok(format!("+{digits}"))
}

fn invalid_phone() -> AppError {
    AppError::validation(super::INVALID_PAYLOAD).with_field("phone", "invalid phone number")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_international_forms() {
        assert_eq!(normalize_phone("+15550001111", "62").unwrap(), "+15550001111");
        assert_eq!(normalize_phone("+1 (555) 000-1111", "62").unwrap(), "+15550001111");
        assert_eq!(normalize_phone("0015550001111", "62").unwrap(), "+15550001111");
    }

    #[test]
    fn test_national_form_gets_country_code() {
        assert_eq!(normalize_phone("081234567890", "62").unwrap(), "+6281234567890");
    }

    #[test]
    fn test_rejects_garbage() {
        for raw in ["", "+12", "+1555abc1111", "+1234567890123456", "+0123456789"] {
            let err = normalize_phone(raw, "62").unwrap_err();
            assert_eq!(err.fields.get("phone").map(String::as_str), Some("invalid phone number"));
        }
    }
}
