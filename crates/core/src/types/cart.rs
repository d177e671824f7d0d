//! Cart snapshot types.
//!
//! A [`CartSnapshot`] is the complete cart as computed by the backend. Clients
//! replace it wholesale after every mutation and never patch or re-price it.

use std::collections::BTreeMap;
use std::num::NonZeroU32;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CartLineId, ProductId};
use super::money::Money;

/// Product reference carried by a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Variant selection for a cart line.
///
/// Size and color are the common cases; anything else the product page offers
/// (engraving text, gift wrap, ...) goes into `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl VariantOptions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size.is_none() && self.color.is_none() && self.extra.is_empty()
    }

    /// Human-readable summary such as `M / Black / engraving: AB`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(size) = &self.size {
            parts.push(size.clone());
        }
        if let Some(color) = &self.color {
            parts.push(color.clone());
        }
        parts.extend(self.extra.iter().map(|(k, v)| format!("{k}: {v}")));
        parts.join(" / ")
    }
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product: CartProduct,
    /// Units on the line. The backend merges repeated adds into one line, so
    /// this is not bounded by the per-request limit.
    pub quantity: NonZeroU32,
    #[serde(default)]
    pub options: VariantOptions,
    /// Unit price captured when the line was priced by the backend.
    pub unit_price: Money,
    #[serde(default)]
    pub line_total: Money,
}

/// Discount effect of a coupon, interpreted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponDiscount {
    /// A flat amount off the subtotal.
    Fixed { amount: Money },
    /// A percentage off the subtotal, e.g. `10` for 10%.
    Percentage { rate: Decimal },
}

/// Coupon attached to the current cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: CouponDiscount,
}

/// The authoritative cart state as last returned by the backend.
///
/// Wire field names follow the backend (`count`, `shipping`); missing fields
/// default to an empty cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSnapshot {
    pub items: Vec<CartLine>,
    #[serde(rename = "count")]
    pub item_count: u32,
    pub subtotal: Money,
    #[serde(rename = "shipping")]
    pub shipping_fee: Money,
    pub discount: Money,
    pub total: Money,
    pub coupon: Option<AppliedCoupon>,
}

impl CartSnapshot {
    /// An empty cart with all amounts at zero.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty() && self.item_count == 0
    }

    /// Find a line by its ID.
    #[must_use]
    pub fn line(&self, id: CartLineId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.id == id)
    }

    /// Whether any line references the given product.
    #[must_use]
    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|line| line.product.id == product_id)
    }

    /// Check `total = subtotal - discount + shipping`.
    ///
    /// The backend owns this arithmetic. This is a diagnostic for logging
    /// mismatches, never a basis for correcting the displayed total.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.subtotal.amount() - self.discount.amount() + self.shipping_fee.amount()
            == self.total.amount()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_backend_totals() {
        let snapshot: CartSnapshot = serde_json::from_value(json!({
            "count": 2,
            "subtotal": 5000,
            "shipping": 1000,
            "discount": 0,
            "total": 6000
        }))
        .unwrap();

        assert_eq!(snapshot.item_count, 2);
        assert_eq!(snapshot.total, Money::from_whole(6000));
        assert!(snapshot.items.is_empty());
        assert!(snapshot.coupon.is_none());
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_deserialize_lines_and_coupon() {
        let snapshot: CartSnapshot = serde_json::from_value(json!({
            "items": [{
                "id": 9,
                "product": {"id": 42, "name": "Linen Shirt", "slug": "linen-shirt"},
                "quantity": 2,
                "options": {"size": "M", "color": "Black"},
                "unit_price": 2500,
                "line_total": 5000
            }],
            "count": 2,
            "subtotal": 5000,
            "shipping": 1000,
            "discount": 500,
            "total": 5500,
            "coupon": {"code": "SAVE10", "discount": {"type": "percentage", "rate": "10"}}
        }))
        .unwrap();

        let line = snapshot.line(CartLineId::new(9)).unwrap();
        assert_eq!(line.quantity.get(), 2);
        assert_eq!(line.options.summary(), "M / Black");
        assert!(snapshot.contains_product(ProductId::new(42)));
        assert_eq!(snapshot.coupon.as_ref().unwrap().code, "SAVE10");
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_zero_quantity_line_is_rejected() {
        let result = serde_json::from_value::<CartLine>(json!({
            "id": 1,
            "product": {"id": 1, "name": "Tote"},
            "quantity": 0,
            "unit_price": 100
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_merged_line_above_request_limit_deserializes() {
        let snapshot: CartSnapshot = serde_json::from_value(json!({
            "items": [{
                "id": 3,
                "product": {"id": 42, "name": "Kebaya Encim"},
                "quantity": 120,
                "unit_price": "2500",
                "line_total": "300000"
            }],
            "count": 120,
            "subtotal": "300000",
            "shipping": "1000",
            "discount": "0",
            "total": "301000"
        }))
        .unwrap();

        let line = snapshot.line(CartLineId::new(3)).unwrap();
        assert_eq!(line.quantity.get(), 120);
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_inconsistent_totals_detected() {
        let snapshot = CartSnapshot {
            subtotal: Money::from_whole(5000),
            shipping_fee: Money::from_whole(1000),
            total: Money::from_whole(5000),
            ..CartSnapshot::empty()
        };
        assert!(!snapshot.is_consistent());
    }

    #[test]
    fn test_empty() {
        let snapshot = CartSnapshot::empty();
        assert!(snapshot.is_empty());
        assert!(snapshot.total.is_zero());
    }
}
