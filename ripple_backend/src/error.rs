use serde::Serialize;
use std::collections::BTreeMap;

/// Field-level validation messages, keyed by request field name.
/// Serializes to the `errors` object of the JSON envelope.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Fails with a `Validation` error when any message has accumulated.
    /// Validation is all-or-nothing: callers run every check before this.
    pub fn into_result(self) -> Result<(), RippleError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RippleError::Validation(self))
        }
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> RippleError {
        let mut errors = Self::new();
        errors.push(field, message);
        RippleError::Validation(errors)
    }
}

/// The error taxonomy every service call resolves to. The API layer maps
/// each variant onto an HTTP status and the JSON envelope.
#[derive(Debug, thiserror::Error)]
pub enum RippleError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
