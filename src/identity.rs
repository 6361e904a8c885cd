//! Who is acting.
//!
//! Participants are identified by their display label; there is no stronger
//! identity behind it. Two users sharing a label share seats.

use axum::http::HeaderMap;

use crate::error::{Result, SlotError};

/// Header carrying the acting user's label
pub const USER_LABEL_HEADER: &str = "x-user-label";

/// Source of the acting user's label
pub trait IdentityProvider: Send + Sync {
    fn current_user_label(&self) -> String;
}

/// A fixed identity, for tools and tests
#[derive(Debug, Clone)]
pub struct StaticIdentity(pub String);

impl IdentityProvider for StaticIdentity {
    fn current_user_label(&self) -> String {
        self.0.clone()
    }
}

/// Identity taken from an HTTP request
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    label: String,
}

impl HeaderIdentity {
    /// Read the label header, `Unidentified` if missing, blank or not UTF-8.
    ///
    /// Display labels are free text, so the raw header bytes are decoded as
    /// UTF-8 rather than restricted to visible ASCII.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let label = headers
            .get(USER_LABEL_HEADER)
            .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SlotError::Unidentified)?;

        Ok(Self {
            label: label.to_string(),
        })
    }
}

impl IdentityProvider for HeaderIdentity {
    fn current_user_label(&self) -> String {
        self.label.clone()
    }
}
