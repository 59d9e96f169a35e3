//! Typed callback payloads for the inline menu
//!
//! Menu navigation state travels inside callback buttons as a compact
//! `menu:`-prefixed string. Parsing is strict: anything malformed is treated
//! as an unknown callback by the handler rather than a crash.

use uuid::Uuid;

/// Menu navigation payload: where the user is and what record is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCallback {
    /// Menu depth: 0 main, 1 catalog, 2 products, 3 cart
    pub level: u8,
    /// Target menu or action name (e.g. "main", "catalog", "add_to_cart")
    pub menu_name: String,
    /// Category filter for product pages
    pub category: Option<i64>,
    /// 1-based page number for paginated views
    pub page: usize,
    /// Product acted on, when relevant
    pub product_id: Option<i64>,
}

const MENU_PREFIX: &str = "menu";

impl MenuCallback {
    /// Payload for a plain menu jump
    pub fn new(level: u8, menu_name: impl Into<String>) -> Self {
        Self {
            level,
            menu_name: menu_name.into(),
            category: None,
            page: 1,
            product_id: None,
        }
    }

    /// Set the category filter
    pub fn with_category(mut self, category: i64) -> Self {
        self.category = Some(category);
        self
    }

    /// Set the page number
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Set the product id
    pub fn with_product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Serialize into callback data
    pub fn pack(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}:{}",
            MENU_PREFIX,
            self.level,
            self.menu_name,
            self.category.map_or_else(|| "-".to_string(), |c| c.to_string()),
            self.page,
            self.product_id.map_or_else(|| "-".to_string(), |p| p.to_string()),
        )
    }

    /// Parse callback data produced by [`MenuCallback::pack`]
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        if parts.next()? != MENU_PREFIX {
            return None;
        }

        let level = parts.next()?.parse::<u8>().ok()?;
        let menu_name = parts.next()?.to_string();
        if menu_name.is_empty() {
            return None;
        }
        let category = parse_optional_i64(parts.next()?)?;
        let page = parts.next()?.parse::<usize>().ok()?;
        let product_id = parse_optional_i64(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            level,
            menu_name,
            category,
            page,
            product_id,
        })
    }
}

/// Order detail payload carrying the order uuid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetailCallback {
    pub order_id: Uuid,
}

const ORDER_DETAIL_PREFIX: &str = "order_detail";

impl OrderDetailCallback {
    pub fn new(order_id: Uuid) -> Self {
        Self { order_id }
    }

    /// Serialize into callback data
    pub fn pack(&self) -> String {
        format!("{}:{}", ORDER_DETAIL_PREFIX, self.order_id)
    }

    /// Parse callback data produced by [`OrderDetailCallback::pack`]
    pub fn parse(data: &str) -> Option<Self> {
        let rest = data.strip_prefix(ORDER_DETAIL_PREFIX)?.strip_prefix(':')?;
        let order_id = Uuid::parse_str(rest).ok()?;
        Some(Self { order_id })
    }
}

/// "-" encodes an absent value
fn parse_optional_i64(part: &str) -> Option<Option<i64>> {
    if part == "-" {
        Some(None)
    } else {
        part.parse::<i64>().ok().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_callback_round_trip() {
        let callback = MenuCallback::new(2, "products")
            .with_category(7)
            .with_page(3)
            .with_product(15);

        let packed = callback.pack();
        assert_eq!(packed, "menu:2:products:7:3:15");
        assert_eq!(MenuCallback::parse(&packed), Some(callback));
    }

    #[test]
    fn test_menu_callback_defaults() {
        let callback = MenuCallback::new(0, "main");
        assert_eq!(callback.pack(), "menu:0:main:-:1:-");
        assert_eq!(MenuCallback::parse("menu:0:main:-:1:-"), Some(callback));
    }

    #[test]
    fn test_menu_callback_rejects_garbage() {
        assert_eq!(MenuCallback::parse("other:0:main:-:1:-"), None);
        assert_eq!(MenuCallback::parse("menu:x:main:-:1:-"), None);
        assert_eq!(MenuCallback::parse("menu:0:main:-:1"), None);
        assert_eq!(MenuCallback::parse("menu:0:main:-:1:-:extra"), None);
        assert_eq!(MenuCallback::parse("menu:0::-:1:-"), None);
        assert_eq!(MenuCallback::parse(""), None);
    }

    #[test]
    fn test_order_detail_round_trip() {
        let callback = OrderDetailCallback::new(Uuid::new_v4());
        assert_eq!(OrderDetailCallback::parse(&callback.pack()), Some(callback.clone()));
        assert_eq!(OrderDetailCallback::parse("order_detail:not-a-uuid"), None);
        assert_eq!(OrderDetailCallback::parse("menu:0:main:-:1:-"), None);
    }
}
