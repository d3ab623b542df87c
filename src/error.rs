// SPDX-License-Identifier: GPL-3.0-or-later

//! Error types of the listing row controller.

use thiserror::Error;

/// Failure of a single button action.
///
/// A failed action never changes the page; the controller records it as a
/// notice instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// The response body did not match the schema for the action.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        ActionError::Decode(err.to_string())
    }
}

/// Markup that cannot be bound to a listing action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("listing form has no data-listing-id attribute")]
    MissingListingId,

    #[error("button of listing {listing_id} has no {attribute} attribute")]
    MissingAttribute {
        listing_id: String,
        attribute: &'static str,
    },

    #[error("button of listing {listing_id} has unknown data-target {target:?}")]
    UnknownTarget { listing_id: String, target: String },

    #[error("score button of listing {listing_id} has no sibling span.score")]
    MissingScoreDisplay { listing_id: String },
}
