//! The `{success, data, message}` response envelope.
//!
//! Every backend endpoint answers with this shape, including business
//! failures (`success: false`) which still carry HTTP 200 or 422. Field-level
//! validation errors arrive in `errors`, keyed by field name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to validation messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Uniform response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: FieldErrors,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: BTreeMap::new(),
        }
    }

    /// A successful response with a user-facing message.
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    /// A business failure with a user-facing message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: BTreeMap::new(),
        }
    }

    /// Attach field-level validation errors.
    #[must_use]
    pub fn with_errors(mut self, errors: FieldErrors) -> Self {
        self.errors = errors;
        self
    }

    /// The message to show a user when the request did not succeed.
    ///
    /// Prefers the top-level message, then the first field error.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }
        self.errors
            .values()
            .flat_map(|messages| messages.iter())
            .next()
            .cloned()
            .unwrap_or_else(|| "Request failed".to_string())
    }
}
