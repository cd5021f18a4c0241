//! Ledger error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Every variant is a deterministic, caller-recoverable condition; none
/// indicates corruption of ledger state. A mutating operation either commits
/// all of its effects (state changes plus the fund transfer) or none of them,
/// so there is no partial-success case to report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Product name is empty.
    #[error("product name must not be empty")]
    InvalidName,

    /// Product price is zero.
    #[error("product price must be greater than zero")]
    InvalidPrice,

    /// Category label is not one of the fixed set.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// No product with the given id.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The product has already been purchased.
    #[error("product {0} has already been purchased")]
    AlreadyPurchased(ProductId),

    /// The product has not been purchased; there is no sale to refund.
    #[error("product {0} has not been purchased")]
    NotPurchased(ProductId),

    /// Payment does not exactly match the price (no change, no partials).
    #[error("paid {paid} but the price is {price}")]
    PriceMismatch { price: u64, paid: u64 },

    /// Buyer already owns the product.
    #[error("buyer already owns product {0}")]
    SelfTrade(ProductId),

    /// Donation amount is zero.
    #[error("donation amount must be greater than zero")]
    ZeroAmount,

    /// Service type is not registered in the catalog.
    #[error("unknown service type: {0}")]
    UnknownServiceType(String),

    /// The fund-transfer leg failed; no ledger state was changed.
    #[error("funds transfer failed: {0}")]
    TransferFailed(String),
}

impl LedgerError {
    pub fn invalid_category(label: impl Into<String>) -> Self {
        Self::InvalidCategory(label.into())
    }

    pub fn unknown_service_type(service_type: impl Into<String>) -> Self {
        Self::UnknownServiceType(service_type.into())
    }

    pub fn transfer_failed(detail: impl Into<String>) -> Self {
        Self::TransferFailed(detail.into())
    }
}
