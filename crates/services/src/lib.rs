//! Service catalog domain module.
//!
//! Named service offerings with per-type prices. Purchasing a service is a
//! direct payment to the catalog owner; no ownership record is created or
//! mutated, which is what distinguishes it from a product purchase.

pub mod catalog;

pub use catalog::{
    PurchaseService, ServiceCatalog, ServiceCommand, ServiceEvent, ServiceOffering,
    ServicePurchased, default_offerings,
};
