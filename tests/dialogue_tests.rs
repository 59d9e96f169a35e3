use anyhow::Result;

use chilli_pizza_bot::dialogue::StoreDialogueState;

/// Dialogue states serialize cleanly for the dialogue storage
#[test]
fn test_dialogue_state_serialization() -> Result<()> {
    let state = StoreDialogueState::OrderPayment {
        name: "John".to_string(),
        phone: "+380631234567".to_string(),
        address: "Deribasivska 1".to_string(),
        amount_usd: 21.5,
    };

    let json = serde_json::to_string(&state)?;
    let restored: StoreDialogueState = serde_json::from_str(&json)?;

    match restored {
        StoreDialogueState::OrderPayment {
            name,
            phone,
            address,
            amount_usd,
        } => {
            assert_eq!(name, "John");
            assert_eq!(phone, "+380631234567");
            assert_eq!(address, "Deribasivska 1");
            assert!((amount_usd - 21.5).abs() < f64::EPSILON);
        }
        _ => panic!("Unexpected dialogue state after round trip"),
    }

    Ok(())
}

#[test]
fn test_default_state_is_start() {
    assert!(matches!(
        StoreDialogueState::default(),
        StoreDialogueState::Start
    ));
}

/// The admin-step classifier covers exactly the admin console states
#[test]
fn test_admin_step_classification() {
    assert!(StoreDialogueState::AdminProductNameEn { editing: None }.is_admin_step());
    assert!(StoreDialogueState::AdminBannerImage.is_admin_step());
    assert!(StoreDialogueState::AdminBroadcast.is_admin_step());

    assert!(!StoreDialogueState::Start.is_admin_step());
    assert!(!StoreDialogueState::RegistrationName.is_admin_step());
    assert!(!StoreDialogueState::OrderName.is_admin_step());
    assert!(!StoreDialogueState::OrderPayment {
        name: String::new(),
        phone: String::new(),
        address: String::new(),
        amount_usd: 0.0,
    }
    .is_admin_step());
}

/// The checkout chain carries forward everything collected so far
#[test]
fn test_checkout_states_carry_collected_data() {
    let state = StoreDialogueState::OrderAddress {
        name: "Anna".to_string(),
        phone: "+380630000000".to_string(),
    };

    if let StoreDialogueState::OrderAddress { name, phone } = state {
        assert_eq!(name, "Anna");
        assert_eq!(phone, "+380630000000");
    } else {
        panic!("Expected OrderAddress state");
    }
}

/// Product edit steps keep the product id so "." can fetch stored values
#[test]
fn test_admin_edit_state_keeps_product_id() -> Result<()> {
    let state = StoreDialogueState::AdminProductPrice {
        editing: Some(7),
        name_en: "Pepperoni".to_string(),
        name_ru: "Пепперони".to_string(),
        description_en: "Classic".to_string(),
        description_ru: "Классика".to_string(),
        category_id: 1,
    };

    let restored: StoreDialogueState = serde_json::from_str(&serde_json::to_string(&state)?)?;
    match restored {
        StoreDialogueState::AdminProductPrice { editing, category_id, .. } => {
            assert_eq!(editing, Some(7));
            assert_eq!(category_id, 1);
        }
        _ => panic!("Expected AdminProductPrice state"),
    }

    Ok(())
}
