//! Store errors.
//!
//! Validation errors are raised before any network call. Business failures
//! reported by the backend are not errors at the store level: mutations hand
//! back the raw [`ApiResponse`] so the UI can show its message. Use
//! [`accepted`] where a rejected response should be treated as an error.

use thiserror::Error;

use vivias_core::{ApiResponse, CartLineId, FieldErrors, ProductId, QuantityError};

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error("invalid product id {0}")]
    InvalidProduct(ProductId),

    #[error("invalid cart line id {0}")]
    InvalidLine(CartLineId),

    #[error("coupon code is empty")]
    InvalidCoupon,

    /// Local field validation failed.
    #[error("validation failed: {}", first_error(.0))]
    Validation(FieldErrors),

    /// The backend refused the request.
    #[error("{message}")]
    Rejected {
        message: String,
        errors: FieldErrors,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(what) => Self::NotFound(what),
            other => Self::Api(other),
        }
    }
}

impl StoreError {
    /// Build a `Rejected` error from a business-failure response.
    pub fn rejected<T>(response: &ApiResponse<T>) -> Self {
        Self::Rejected {
            message: response.error_message(),
            errors: response.errors.clone(),
        }
    }

    /// Whether retrying the same request could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Api(
                ApiError::Transport(_) | ApiError::RateLimited(_) | ApiError::Status { .. }
            )
        )
    }
}

fn first_error(errors: &FieldErrors) -> String {
    errors
        .iter()
        .find_map(|(field, messages)| messages.first().map(|m| format!("{field}: {m}")))
        .unwrap_or_default()
}

/// Turn a business failure into [`StoreError::Rejected`].
///
/// # Errors
///
/// Returns `StoreError::Rejected` when `response.success` is false.
pub fn accepted<T>(response: ApiResponse<T>) -> Result<ApiResponse<T>, StoreError> {
    if response.success {
        Ok(response)
    } else {
        Err(StoreError::rejected(&response))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_not_found_is_typed() {
        let err = StoreError::from(ApiError::NotFound("cart line 9".to_string()));
        assert!(matches!(err, StoreError::NotFound(what) if what == "cart line 9"));
    }

    #[test]
    fn test_accepted() {
        let ok = accepted(ApiResponse::ok(3)).unwrap();
        assert_eq!(ok.data, Some(3));

        let mut errors = BTreeMap::new();
        errors.insert("code".to_string(), vec!["Kupon tidak berlaku".to_string()]);
        let err = accepted(ApiResponse::<()>::failure("").with_errors(errors)).unwrap_err();
        assert_eq!(err.to_string(), "Kupon tidak berlaku");
        assert!(matches!(err, StoreError::Rejected { errors, .. } if errors.contains_key("code")));
    }

    #[test]
    fn test_validation_display() {
        let mut errors = BTreeMap::new();
        errors.insert(
            "password_confirmation".to_string(),
            vec!["does not match".to_string()],
        );
        assert_eq!(
            StoreError::Validation(errors).to_string(),
            "validation failed: password_confirmation: does not match"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(StoreError::Api(ApiError::RateLimited(2)).is_transient());
        assert!(!StoreError::InvalidCoupon.is_transient());
    }
}
