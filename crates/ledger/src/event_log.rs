use uuid::Uuid;

use tradepost_events::{Event, EventRecord};

/// Append-only, in-memory event log for a single ledger.
///
/// Sequence numbers start at 1 and increase by exactly one per record;
/// records are never mutated or removed. The log is not internally locked;
/// the owning facade keeps it behind the same guard as the aggregate, so a
/// record lands in the same critical section as the state change it
/// describes.
#[derive(Debug)]
pub struct EventLog<E> {
    records: Vec<EventRecord<E>>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<E: Event> EventLog<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `payload`, assigning the next sequence number.
    pub fn append(&mut self, payload: E) -> EventRecord<E> {
        let sequence = self.records.len() as u64 + 1;
        let record = EventRecord::new(Uuid::now_v7(), sequence, payload);
        self.records.push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, oldest first.
    pub fn all(&self) -> Vec<EventRecord<E>> {
        self.records.clone()
    }

    /// Records with a sequence strictly greater than `after`.
    pub fn since(&self, after: u64) -> Vec<EventRecord<E>> {
        self.records
            .iter()
            .filter(|r| r.sequence() > after)
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<&EventRecord<E>> {
        self.records.last()
    }
}
