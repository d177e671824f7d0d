//! Plain-text rendering of store state and catalog data.

use vivias_core::{
    CartSnapshot, CatalogStatistics, CouponDiscount, Product, ProductPage, User, WishlistSnapshot,
};

pub fn cart(snapshot: &CartSnapshot) -> String {
    if snapshot.is_empty() {
        return "Cart is empty".to_string();
    }

    let mut lines = vec![format!("Cart ({} items)", snapshot.item_count)];
    for line in &snapshot.items {
        let options = line.options.summary();
        let options = if options.is_empty() {
            String::new()
        } else {
            format!(" [{options}]")
        };
        lines.push(format!(
            "  #{:<5} {} x{}{}  {}",
            line.id.as_i32(),
            line.product.name,
            line.quantity.get(),
            options,
            line.line_total
        ));
    }

    lines.push(format!("  Subtotal  {}", snapshot.subtotal));
    if let Some(coupon) = &snapshot.coupon {
        let kind = match &coupon.discount {
            CouponDiscount::Fixed { amount } => format!("{amount} off"),
            CouponDiscount::Percentage { rate } => format!("{rate}% off"),
        };
        lines.push(format!("  Coupon    {} ({kind})", coupon.code));
    }
    if !snapshot.discount.is_zero() {
        lines.push(format!("  Discount  -{}", snapshot.discount));
    }
    lines.push(format!("  Shipping  {}", snapshot.shipping_fee));
    lines.push(format!("  Total     {}", snapshot.total));
    lines.join("\n")
}

pub fn wishlist(snapshot: &WishlistSnapshot) -> String {
    if snapshot.is_empty() {
        return "Wishlist is empty".to_string();
    }

    let mut lines = vec![format!("Wishlist ({} items)", snapshot.count)];
    lines.extend(snapshot.items.iter().map(|item| {
        item.price.map_or_else(
            || format!("  #{:<5} {}", item.product_id.as_i32(), item.name),
            |price| format!("  #{:<5} {}  {price}", item.product_id.as_i32(), item.name),
        )
    }));
    lines.join("\n")
}

pub fn user(user: &User) -> String {
    format!("{} <{}>", user.name, user.email)
}

fn product_line(product: &Product) -> String {
    let stock = if product.in_stock() { "" } else { "  (sold out)" };
    format!(
        "  #{:<5} {}  {}{stock}",
        product.id.as_i32(),
        product.name,
        product.effective_price()
    )
}

pub fn products(products: &[Product]) -> String {
    if products.is_empty() {
        return "No products".to_string();
    }
    products
        .iter()
        .map(product_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn page(page: &ProductPage) -> String {
    format!(
        "{}\nPage {} of {} ({} products)",
        products(&page.items),
        page.page,
        page.page_count().max(1),
        page.total
    )
}

pub fn product_detail(product: &Product) -> String {
    let mut lines = vec![format!("{} (#{})", product.name, product.id)];
    match product.sale_price {
        Some(sale) if sale < product.price => {
            lines.push(format!("Price: {sale} (was {})", product.price));
        }
        _ => lines.push(format!("Price: {}", product.price)),
    }
    lines.push(format!("Stock: {}", product.stock.max(0)));
    if let Some(rating) = product.average_rating {
        lines.push(format!("Rating: {}/5", rating.round_dp(1)));
    }
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(String::new());
        lines.push(description.to_string());
    }
    lines.join("\n")
}

pub fn statistics(stats: &CatalogStatistics) -> String {
    [
        format!("Products:    {}", stats.total_products),
        format!("In stock:    {}", stats.in_stock_products),
        format!("Categories:  {}", stats.total_categories),
        format!("Reviews:     {}", stats.total_reviews),
        format!("Avg. price:  {}", stats.average_price),
    ]
    .join("\n")
}

/// Prefix `body` with the backend's message, if any.
pub fn with_message(message: Option<&str>, body: &str) -> String {
    match message.filter(|m| !m.trim().is_empty()) {
        Some(message) => format!("{message}\n\n{body}"),
        None => body.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_cart_shows_server_amounts() {
        let snapshot: CartSnapshot = serde_json::from_value(json!({
            "items": [{
                "id": 3,
                "product": {"id": 42, "name": "Kebaya Encim"},
                "quantity": 2,
                "options": {"size": "M"},
                "unit_price": "2500",
                "line_total": "5000"
            }],
            "count": 2,
            "subtotal": "5000",
            "shipping": "1000",
            "discount": "500",
            "total": "5500",
            "coupon": {"code": "SAVE10", "discount": {"type": "percentage", "rate": "10"}}
        }))
        .unwrap();

        let text = cart(&snapshot);

        assert!(text.starts_with("Cart (2 items)"));
        assert!(text.contains("Kebaya Encim x2 [M]  Rp 5.000"));
        assert!(text.contains("Coupon    SAVE10 (10% off)"));
        assert!(text.contains("Discount  -Rp 500"));
        assert!(text.ends_with("Total     Rp 5.500"));
    }

    #[test]
    fn test_empty_states() {
        assert_eq!(cart(&CartSnapshot::empty()), "Cart is empty");
        assert_eq!(wishlist(&WishlistSnapshot::empty()), "Wishlist is empty");
        assert_eq!(products(&[]), "No products");
    }

    #[test]
    fn test_with_message() {
        assert_eq!(with_message(Some("Added"), "body"), "Added\n\nbody");
        assert_eq!(with_message(Some(" "), "body"), "body");
        assert_eq!(with_message(None, "body"), "body");
    }
}
