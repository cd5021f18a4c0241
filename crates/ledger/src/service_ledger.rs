use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AccountId, CatalogId, LedgerError, LedgerResult};
use tradepost_events::EventRecord;
use tradepost_services::{
    PurchaseService, ServiceCatalog, ServiceCommand, ServiceEvent, ServiceOffering,
};

use crate::bank::FundsTransfer;
use crate::event_log::EventLog;

/// Outcome of a completed service purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReceipt {
    pub service_type: String,
    pub buyer: AccountId,
    pub price: u64,
    pub occurred_at: DateTime<Utc>,
    /// Sequence of the record appended to the event log.
    pub sequence: u64,
}

#[derive(Debug)]
struct ServiceState {
    catalog: ServiceCatalog,
    log: EventLog<ServiceEvent>,
}

/// Transactional facade over the service catalog.
///
/// A service purchase is a direct payment buyer → catalog owner bound to an
/// appended log record; no ownership record exists or changes. The Product
/// and Service ledgers are independent; no transaction spans both.
pub struct ServiceLedger {
    state: RwLock<ServiceState>,
    bank: Arc<dyn FundsTransfer>,
}

impl ServiceLedger {
    /// New catalog owned by `owner` with its fixed offering roster.
    pub fn new(
        owner: AccountId,
        offerings: Vec<ServiceOffering>,
        bank: Arc<dyn FundsTransfer>,
    ) -> Self {
        Self {
            state: RwLock::new(ServiceState {
                catalog: ServiceCatalog::new(CatalogId::new(), owner, offerings),
                log: EventLog::new(),
            }),
            bank,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ServiceState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ServiceState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account receiving every service payment.
    pub fn owner(&self) -> AccountId {
        self.read_state().catalog.owner()
    }

    /// Registered service types, in roster order.
    pub fn service_types(&self) -> Vec<String> {
        self.read_state().catalog.service_types()
    }

    pub fn service_price(&self, service_type: &str) -> Option<u64> {
        self.read_state().catalog.price_of(service_type)
    }

    /// Buy a service at its exact price; pays the catalog owner directly.
    pub fn purchase_service(
        &self,
        service_type: &str,
        buyer: AccountId,
        paid: u64,
    ) -> LedgerResult<ServiceReceipt> {
        let mut state = self.write_state();
        let occurred_at = Utc::now();
        let cmd = ServiceCommand::PurchaseService(PurchaseService {
            service_type: service_type.to_string(),
            buyer,
            paid,
            occurred_at,
        });

        let events = state.catalog.handle(&cmd)?;
        let owner = state.catalog.owner();

        self.bank
            .transfer(buyer, owner, paid)
            .map_err(|e| LedgerError::transfer_failed(e.to_string()))?;

        let mut sequence = state.log.len() as u64;
        for event in events {
            state.catalog.apply(&event);
            sequence = state.log.append(event).sequence();
        }

        tracing::info!("service '{}' purchased by {} for {}", service_type, buyer, paid);
        Ok(ServiceReceipt {
            service_type: service_type.to_string(),
            buyer,
            price: paid,
            occurred_at,
            sequence,
        })
    }

    /// The full observable event log, oldest first.
    pub fn events(&self) -> Vec<EventRecord<ServiceEvent>> {
        self.read_state().log.all()
    }

    /// Records with a sequence strictly greater than `after`.
    pub fn events_since(&self, after: u64) -> Vec<EventRecord<ServiceEvent>> {
        self.read_state().log.since(after)
    }
}
