//! Dialogue state for multi-step conversations with users.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// Conversation state across registration, checkout and the admin console.
///
/// Checkout steps carry the data collected so far, so an interrupted dialogue
/// holds everything needed to resume or re-prompt. Admin product steps carry
/// `editing`: `Some(product_id)` means "." keeps the stored value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum StoreDialogueState {
    #[default]
    Start,
    /// Registration: waiting for the user's first name
    RegistrationName,
    /// Registration: waiting for the user's phone
    RegistrationPhone { first_name: String },
    /// Checkout: waiting for the recipient name
    OrderName,
    /// Checkout: waiting for the contact phone
    OrderPhone { name: String },
    /// Checkout: waiting for the delivery address
    OrderAddress { name: String, phone: String },
    /// Checkout: confirmation shown, choosing a payment method
    OrderPayment {
        name: String,
        phone: String,
        address: String,
        /// Cart total in USD at confirmation time
        amount_usd: f64,
    },
    /// Admin: waiting for the English product name
    AdminProductNameEn { editing: Option<i64> },
    /// Admin: waiting for the Russian product name
    AdminProductNameRu {
        editing: Option<i64>,
        name_en: String,
    },
    /// Admin: waiting for the English description
    AdminProductDescriptionEn {
        editing: Option<i64>,
        name_en: String,
        name_ru: String,
    },
    /// Admin: waiting for the Russian description
    AdminProductDescriptionRu {
        editing: Option<i64>,
        name_en: String,
        name_ru: String,
        description_en: String,
    },
    /// Admin: waiting for a category pick
    AdminProductCategory {
        editing: Option<i64>,
        name_en: String,
        name_ru: String,
        description_en: String,
        description_ru: String,
    },
    /// Admin: waiting for the price
    AdminProductPrice {
        editing: Option<i64>,
        name_en: String,
        name_ru: String,
        description_en: String,
        description_ru: String,
        category_id: i64,
    },
    /// Admin: waiting for the product photo
    AdminProductImage {
        editing: Option<i64>,
        name_en: String,
        name_ru: String,
        description_en: String,
        description_ru: String,
        category_id: i64,
        price: f64,
    },
    /// Admin: waiting for a banner photo with the page name as caption
    AdminBannerImage,
    /// Admin: waiting for the broadcast text
    AdminBroadcast,
}

impl StoreDialogueState {
    /// Whether this state belongs to the admin console dialogue
    pub fn is_admin_step(&self) -> bool {
        matches!(
            self,
            StoreDialogueState::AdminProductNameEn { .. }
                | StoreDialogueState::AdminProductNameRu { .. }
                | StoreDialogueState::AdminProductDescriptionEn { .. }
                | StoreDialogueState::AdminProductDescriptionRu { .. }
                | StoreDialogueState::AdminProductCategory { .. }
                | StoreDialogueState::AdminProductPrice { .. }
                | StoreDialogueState::AdminProductImage { .. }
                | StoreDialogueState::AdminBannerImage
                | StoreDialogueState::AdminBroadcast
        )
    }
}

/// Type alias for our store dialogue
pub type StoreDialogue = Dialogue<StoreDialogueState, InMemStorage<StoreDialogueState>>;
