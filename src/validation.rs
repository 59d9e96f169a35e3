//! Validation module for common validation patterns
//!
//! This module consolidates the input checks used by the registration and
//! checkout dialogues:
//!
//! - First names and order recipient names
//! - Delivery addresses
//! - Phone numbers (normalized to international form)
//!
//! Error values are localization keys, so handlers can reply in the user's
//! language without re-classifying the failure.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PHONE_CLEANUP: Regex =
        Regex::new(r"[\s\-().]").expect("Invalid phone cleanup pattern");
    static ref PHONE_DIGITS: Regex =
        Regex::new(r"^\+?\d{10,15}$").expect("Invalid phone digits pattern");
}

/// Validates the first name collected during registration
///
/// # Examples
/// ```
/// use chilli_pizza_bot::validation::validate_first_name;
///
/// assert_eq!(validate_first_name("  Anna "), Ok("Anna"));
/// assert_eq!(validate_first_name(""), Err("name-empty"));
/// assert_eq!(validate_first_name(&"a".repeat(31)), Err("name-too-long"));
/// ```
pub fn validate_first_name(name: &str) -> Result<&str, &'static str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err("name-empty");
    }
    if trimmed.chars().count() > 30 {
        return Err("name-too-long");
    }

    Ok(trimmed)
}

/// Validates the recipient name collected at checkout
///
/// # Examples
/// ```
/// use chilli_pizza_bot::validation::validate_recipient_name;
///
/// assert!(validate_recipient_name("John Smith").is_ok());
/// assert_eq!(validate_recipient_name("J"), Err("name-length-error"));
/// assert_eq!(validate_recipient_name(&"a".repeat(51)), Err("name-length-error"));
/// ```
pub fn validate_recipient_name(name: &str) -> Result<&str, &'static str> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();

    if !(2..=50).contains(&length) {
        return Err("name-length-error");
    }

    Ok(trimmed)
}

/// Validates the delivery address collected at checkout
///
/// # Examples
/// ```
/// use chilli_pizza_bot::validation::validate_address;
///
/// assert!(validate_address("12 Deribasivska St, apt 4").is_ok());
/// assert_eq!(validate_address("apt"), Err("address-length-error"));
/// ```
pub fn validate_address(address: &str) -> Result<&str, &'static str> {
    let trimmed = address.trim();
    let length = trimmed.chars().count();

    if !(5..=100).contains(&length) {
        return Err("address-length-error");
    }

    Ok(trimmed)
}

/// Normalize a phone number to international `+...` form.
///
/// Separators and parentheses are stripped first. Numbers without a country
/// prefix follow the Ukrainian convention the store ships with: a 10-digit
/// local number starting with `0` gets the `+380` prefix.
///
/// Returns `None` when the input cannot be a valid phone number.
///
/// # Examples
/// ```
/// use chilli_pizza_bot::validation::format_phone_number;
///
/// assert_eq!(
///     format_phone_number("+380 (63) 123-45-67"),
///     Some("+380631234567".to_string())
/// );
/// assert_eq!(
///     format_phone_number("0631234567"),
///     Some("+380631234567".to_string())
/// );
/// assert_eq!(format_phone_number("not a phone"), None);
/// ```
pub fn format_phone_number(phone: &str) -> Option<String> {
    let cleaned = PHONE_CLEANUP.replace_all(phone.trim(), "");

    if !PHONE_DIGITS.is_match(&cleaned) {
        return None;
    }

    if let Some(rest) = cleaned.strip_prefix('+') {
        return Some(format!("+{}", rest));
    }

    // Local form: 0XXXXXXXXX becomes +380XXXXXXXXX
    if cleaned.len() == 10 && cleaned.starts_with('0') {
        return Some(format!("+380{}", &cleaned[1..]));
    }

    // Already carries a country code, just missing the plus
    if cleaned.len() >= 11 {
        return Some(format!("+{}", cleaned));
    }

    None
}

/// Parse a product price entered by an administrator
///
/// # Examples
/// ```
/// use chilli_pizza_bot::validation::parse_price;
///
/// assert_eq!(parse_price("12.50"), Ok(12.5));
/// assert_eq!(parse_price("free"), Err("price-invalid"));
/// assert_eq!(parse_price("-3"), Err("price-invalid"));
/// ```
pub fn parse_price(input: &str) -> Result<f64, &'static str> {
    let price = input.trim().parse::<f64>().map_err(|_| "price-invalid")?;
    if !price.is_finite() || price <= 0.0 {
        return Err("price-invalid");
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_first_name() {
        assert_eq!(validate_first_name("Anna"), Ok("Anna"));
        assert_eq!(validate_first_name("   "), Err("name-empty"));
        assert_eq!(validate_first_name(&"x".repeat(31)), Err("name-too-long"));
        // 30 characters is still fine
        assert!(validate_first_name(&"x".repeat(30)).is_ok());
    }

    #[test]
    fn test_validate_recipient_name_bounds() {
        assert!(validate_recipient_name("Jo").is_ok());
        assert!(validate_recipient_name(&"x".repeat(50)).is_ok());
        assert_eq!(validate_recipient_name("J"), Err("name-length-error"));
        assert_eq!(
            validate_recipient_name(&"x".repeat(51)),
            Err("name-length-error")
        );
    }

    #[test]
    fn test_validate_address_bounds() {
        assert!(validate_address("Short st 1").is_ok());
        assert_eq!(validate_address("tiny"), Err("address-length-error"));
        assert_eq!(
            validate_address(&"x".repeat(101)),
            Err("address-length-error")
        );
    }

    #[test]
    fn test_phone_international_form_kept() {
        assert_eq!(
            format_phone_number("+380631234567"),
            Some("+380631234567".to_string())
        );
        assert_eq!(
            format_phone_number("+1 (212) 555-0100"),
            Some("+12125550100".to_string())
        );
    }

    #[test]
    fn test_phone_local_form_gets_country_code() {
        assert_eq!(
            format_phone_number("063 123 45 67"),
            Some("+380631234567".to_string())
        );
    }

    #[test]
    fn test_phone_missing_plus_is_added() {
        assert_eq!(
            format_phone_number("380631234567"),
            Some("+380631234567".to_string())
        );
    }

    #[test]
    fn test_phone_rejects_garbage() {
        assert_eq!(format_phone_number("call me"), None);
        assert_eq!(format_phone_number("12345"), None);
        assert_eq!(format_phone_number("+12 34"), None);
        assert_eq!(format_phone_number(""), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(" 9.99 "), Ok(9.99));
        assert_eq!(parse_price("0"), Err("price-invalid"));
        assert_eq!(parse_price("NaN"), Err("price-invalid"));
        assert_eq!(parse_price("ten"), Err("price-invalid"));
    }
}
