//! `tradepost-events` - event contract and record envelope.
//!
//! Every mutating ledger operation emits exactly one event; the hosting
//! ledger appends it to an observable, append-only log that boundary
//! consumers poll to re-synchronize their view.

pub mod event;
pub mod record;

pub use event::Event;
pub use record::EventRecord;
