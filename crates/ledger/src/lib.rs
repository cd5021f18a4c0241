//! Infrastructure layer: funds transfer, event log, transactional facades.
//!
//! The facades bind fund transfers to aggregate state transitions: each
//! mutating call validates first (pure `handle`), then moves funds, then
//! applies events and appends them to the observable log, all under one
//! write guard, so a failed transfer leaves zero state changes behind.

pub mod bank;
pub mod event_log;
pub mod market_ledger;
pub mod service_ledger;


pub use bank::{FundsTransfer, InMemoryBank, TransferError};
pub use event_log::EventLog;
pub use market_ledger::{DonationReceipt, MarketLedger, Receipt};
pub use service_ledger::{ServiceLedger, ServiceReceipt};
