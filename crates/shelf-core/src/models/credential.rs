//! Opaque bearer credential

use std::fmt;

use crate::error::{Error, Result};

/// Bearer token supplied by whoever authenticated the user.
///
/// Never printed: `Debug` redacts the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token, trimming whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let token = raw.trim();
        if token.is_empty() {
            return Err(Error::InvalidInput(
                "credential token must not be empty".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    /// Raw token for transmission.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_tuple("Credential")
            .field(&"[REDACTED]")
            .finish()
    }
}
