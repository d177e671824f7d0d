//! `vivias cart ...`

use vivias_client::{CartStore, accepted};
use vivias_core::{ApiResponse, CartLineId, ProductId, VariantOptions};

use super::CommandError;
use crate::output;

pub async fn show(cart: &CartStore) -> Result<String, CommandError> {
    let snapshot = cart.sync().await?;
    Ok(output::cart(&snapshot))
}

pub async fn add(
    cart: &CartStore,
    product_id: i32,
    quantity: u32,
    size: Option<String>,
    color: Option<String>,
) -> Result<String, CommandError> {
    let options = VariantOptions {
        size,
        color,
        ..VariantOptions::default()
    };
    let response = cart
        .add_item(ProductId::new(product_id), quantity, Some(options))
        .await?;
    report(cart, response)
}

pub async fn update(cart: &CartStore, line_id: i32, quantity: u32) -> Result<String, CommandError> {
    let response = cart.update_item(CartLineId::new(line_id), quantity).await?;
    report(cart, response)
}

pub async fn remove(cart: &CartStore, line_id: i32) -> Result<String, CommandError> {
    let response = cart.remove_item(CartLineId::new(line_id)).await?;
    report(cart, response)
}

pub async fn clear(cart: &CartStore) -> Result<String, CommandError> {
    let response = cart.clear().await?;
    report(cart, response)
}

pub async fn apply_coupon(cart: &CartStore, code: &str) -> Result<String, CommandError> {
    let response = cart.apply_coupon(code).await?;
    report(cart, response)
}

pub async fn remove_coupon(cart: &CartStore) -> Result<String, CommandError> {
    let response = cart.remove_coupon().await?;
    report(cart, response)
}

/// Render the cart after a mutation, or fail with the backend's message.
fn report<T>(cart: &CartStore, response: ApiResponse<T>) -> Result<String, CommandError> {
    let response = accepted(response)?;
    Ok(output::with_message(
        response.message.as_deref(),
        &output::cart(&cart.snapshot()),
    ))
}
