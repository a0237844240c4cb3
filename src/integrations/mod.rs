//! Third-party HTTP integrations used by the expense modules.
//!
//! - [`SplitwiseClient`]: groups, members, and expense creation
//! - [`OpenRouterClient`]: vision model that reads receipt images
//!
//! Every client carries its own request timeout, so a slow upstream turns
//! into an [`IntegrationError`] instead of a hung request.

pub mod openrouter;
pub mod splitwise;

use thiserror::Error;

pub use openrouter::{parse_receipt_items, OpenRouterClient};
pub use splitwise::{CreatedExpense, ExpenseShare, NewExpense, SplitwiseClient, SplitwiseGroup, SplitwiseUser};

/// Errors from third-party API calls.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("{service} API error: {status} - {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Upstream accepted the request but reported errors in the body.
    #[error("{0}")]
    Api(String),

    /// Upstream response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Parse(String),
}
