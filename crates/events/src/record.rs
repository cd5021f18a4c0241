use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// A recorded event in a ledger's observable log.
///
/// This is the unit boundary consumers poll. Notes:
/// - **Append-only**: `sequence` is assigned by the log on append, starts at
///   1 and increases by exactly one per record; it never changes afterwards.
/// - `payload` is the typed ledger event; each ledger owns exactly one event
///   enum, so records stay typed end to end and hosts serialize them through
///   the serde derives when they need a wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord<E> {
    event_id: Uuid,

    /// Monotonically increasing position in the ledger's log.
    sequence: u64,

    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E: Event> EventRecord<E> {
    /// Wrap an event for the log, capturing its metadata from the
    /// [`Event`] contract.
    pub fn new(event_id: Uuid, sequence: u64, payload: E) -> Self {
        Self {
            event_id,
            sequence,
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            occurred_at: payload.occurred_at(),
            payload,
        }
    }
}

impl<E> EventRecord<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
