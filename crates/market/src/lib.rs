//! Marketplace domain module.
//!
//! Business rules for the product catalog, trades, and the donation
//! treasury, implemented purely as deterministic domain logic (no IO, no
//! storage, no fund movement; the hosting ledger binds emitted events to
//! fund transfers).

pub mod market;
pub mod product;

pub use market::{
    CreateProduct, Donate, DonationReceived, DonationRecord, Market, MarketCommand,
    MarketEvent, ProductCreated, ProductPurchased, ProductRefunded, PurchaseProduct,
    RefundProduct, donation_shares,
};
pub use product::{Category, Product};
