//! `vivias wishlist ...`

use vivias_client::{StorefrontContext, WishlistStore, accepted};
use vivias_core::{ApiResponse, ProductId};

use super::CommandError;
use crate::output;

pub async fn show(wishlist: &WishlistStore) -> Result<String, CommandError> {
    let snapshot = wishlist.sync().await?;
    Ok(output::wishlist(&snapshot))
}

pub async fn add(wishlist: &WishlistStore, product_id: i32) -> Result<String, CommandError> {
    let response = wishlist.add_item(ProductId::new(product_id)).await?;
    report(wishlist, response)
}

pub async fn remove(wishlist: &WishlistStore, product_id: i32) -> Result<String, CommandError> {
    let response = wishlist.remove_item(ProductId::new(product_id)).await?;
    report(wishlist, response)
}

pub async fn clear(wishlist: &WishlistStore) -> Result<String, CommandError> {
    let response = wishlist.clear().await?;
    report(wishlist, response)
}

/// Move a saved product and show both stores afterwards.
///
/// The cart resyncs from its event listener in the background, so it is
/// synced here explicitly before printing.
pub async fn move_to_cart(
    context: &StorefrontContext,
    product_id: i32,
) -> Result<String, CommandError> {
    let response = context
        .wishlist()
        .move_to_cart(ProductId::new(product_id))
        .await?;
    let response = accepted(response)?;
    let cart = context.cart().sync().await?;

    let body = format!(
        "{}\n\n{}",
        output::wishlist(&context.wishlist().snapshot()),
        output::cart(&cart)
    );
    Ok(output::with_message(response.message.as_deref(), &body))
}

fn report<T>(wishlist: &WishlistStore, response: ApiResponse<T>) -> Result<String, CommandError> {
    let response = accepted(response)?;
    Ok(output::with_message(
        response.message.as_deref(),
        &output::wishlist(&wishlist.snapshot()),
    ))
}
