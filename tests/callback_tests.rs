//! Callback payload round trips across the menu flows the bot actually emits

use chilli_pizza_bot::callbacks::{MenuCallback, OrderDetailCallback};
use uuid::Uuid;

/// Every button the menu emits must parse back to the same payload
#[test]
fn test_menu_buttons_round_trip() {
    let payloads = vec![
        MenuCallback::new(0, "main"),
        MenuCallback::new(1, "catalog"),
        MenuCallback::new(3, "cart"),
        MenuCallback::new(0, "orders"),
        MenuCallback::new(0, "profile"),
        MenuCallback::new(0, "language"),
        MenuCallback::new(2, "products").with_category(4),
        MenuCallback::new(2, "next").with_category(4).with_page(2),
        MenuCallback::new(2, "previous").with_category(4).with_page(1),
        MenuCallback::new(2, "add_to_cart").with_category(4).with_product(17),
        MenuCallback::new(3, "increment").with_page(2).with_product(17),
        MenuCallback::new(3, "decrement").with_page(2).with_product(17),
        MenuCallback::new(3, "delete").with_page(2).with_product(17),
        MenuCallback::new(0, "order"),
    ];

    for payload in payloads {
        let packed = payload.pack();
        assert_eq!(
            MenuCallback::parse(&packed),
            Some(payload),
            "payload {} should round trip",
            packed
        );
        // Telegram limits callback data to 64 bytes
        assert!(packed.len() <= 64, "payload {} is too long", packed);
    }
}

#[test]
fn test_pagination_payload_carries_target_page() {
    let next = MenuCallback::new(2, "next").with_category(7).with_page(3);
    let parsed = MenuCallback::parse(&next.pack()).unwrap();
    assert_eq!(parsed.page, 3);
    assert_eq!(parsed.category, Some(7));
    assert_eq!(parsed.menu_name, "next");
}

#[test]
fn test_order_detail_payload_fits_telegram_limit() {
    let payload = OrderDetailCallback::new(Uuid::new_v4());
    let packed = payload.pack();
    assert!(packed.len() <= 64);
    assert_eq!(OrderDetailCallback::parse(&packed), Some(payload));
}

#[test]
fn test_foreign_payloads_are_rejected() {
    for data in [
        "",
        "menu",
        "menu:",
        "captcha_🍎",
        "crypto_TON",
        "lang_en",
        "order_detail:",
        "menu:9:products:abc:1:-",
    ] {
        assert_eq!(MenuCallback::parse(data), None, "{:?} must not parse", data);
    }

    assert_eq!(OrderDetailCallback::parse("order_detail:xyz"), None);
    assert_eq!(OrderDetailCallback::parse("menu:0:main:-:1:-"), None);
}
