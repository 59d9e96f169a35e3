//! # Localization Tests
//!
//! Verifies the fluent catalogs load, resolve in both languages, interpolate
//! arguments and fall back to English.

use chilli_pizza_bot::localization::{
    create_localization_manager, detect_language, t_args_lang, t_lang,
};

#[test]
fn test_manager_loads_supported_locales() {
    let localization = create_localization_manager().expect("locales should load");
    assert!(localization.is_language_supported("en"));
    assert!(localization.is_language_supported("ru"));
    assert!(!localization.is_language_supported("fr"));
}

#[test]
fn test_simple_message_in_both_languages() {
    let localization = create_localization_manager().unwrap();

    assert_eq!(t_lang(&localization, "goods-button", Some("en")), "Goods");
    assert_eq!(t_lang(&localization, "goods-button", Some("ru")), "Товары");
}

#[test]
fn test_arguments_are_interpolated() {
    let localization = create_localization_manager().unwrap();

    let message = t_args_lang(
        &localization,
        "order-detail-total",
        &[("total_sum", "5.00 $".to_string())],
        Some("en"),
    );
    assert_eq!(message, "<strong>Total: 5.00 $</strong>");

    let message = t_args_lang(
        &localization,
        "pay-with-crypto-button",
        &[("crypto", "TON".to_string())],
        Some("ru"),
    );
    assert_eq!(message, "Оплатить в TON");
}

#[test]
fn test_unknown_language_falls_back_to_english() {
    let localization = create_localization_manager().unwrap();
    assert_eq!(t_lang(&localization, "goods-button", Some("fr")), "Goods");
    assert_eq!(t_lang(&localization, "goods-button", None), "Goods");
}

#[test]
fn test_missing_key_is_reported() {
    let localization = create_localization_manager().unwrap();
    assert_eq!(
        t_lang(&localization, "no-such-key-anywhere", Some("en")),
        "Missing translation: no-such-key-anywhere"
    );
}

#[test]
fn test_detect_language_strips_region() {
    let localization = create_localization_manager().unwrap();
    assert_eq!(detect_language(&localization, Some("ru-RU")), "ru");
    assert_eq!(detect_language(&localization, Some("en-US")), "en");
    assert_eq!(detect_language(&localization, Some("de")), "en");
    assert_eq!(detect_language(&localization, None), "en");
}

#[test]
fn test_multiline_message_keeps_linebreaks() {
    let localization = create_localization_manager().unwrap();
    let message = t_args_lang(
        &localization,
        "captcha-prompt",
        &[("word", "apple".to_string())],
        Some("en"),
    );
    assert!(message.contains("apple"));
    assert!(message.lines().count() > 1);
}
