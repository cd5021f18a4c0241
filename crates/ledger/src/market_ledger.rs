use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AccountId, LedgerError, LedgerResult, MarketId, ProductId};
use tradepost_events::EventRecord;
use tradepost_market::{
    CreateProduct, Donate, DonationRecord, Market, MarketCommand, MarketEvent, Product,
    PurchaseProduct, RefundProduct, donation_shares,
};

use crate::bank::FundsTransfer;
use crate::event_log::EventLog;

/// Outcome of a completed trade (purchase or refund).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Product state after the transition.
    pub product: Product,
    /// Sequence of the record appended to the event log.
    pub sequence: u64,
}

/// Outcome of a completed donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationReceipt {
    pub donor: AccountId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
    /// Per-beneficiary amounts actually credited.
    pub shares: Vec<(AccountId, u64)>,
    pub sequence: u64,
}

#[derive(Debug)]
struct MarketState {
    market: Market,
    log: EventLog<MarketEvent>,
}

/// Transactional facade over the marketplace.
///
/// Every mutating call runs as one unit under the state write guard:
/// validate (pure `handle`), execute the fund transfer, then `apply` the
/// event and append it to the observable log. The transfer runs before any
/// mutation, so a failed transfer leaves the ledger untouched. Reads take
/// the read guard and observe a consistent snapshot. Lock order is always
/// facade state, then bank.
pub struct MarketLedger {
    state: RwLock<MarketState>,
    bank: Arc<dyn FundsTransfer>,
}

impl MarketLedger {
    /// New marketplace with its fixed beneficiary set and fund-transfer
    /// backend. Product and donation tables start empty.
    pub fn new(beneficiaries: Vec<AccountId>, bank: Arc<dyn FundsTransfer>) -> Self {
        Self {
            state: RwLock::new(MarketState {
                market: Market::new(MarketId::new(), beneficiaries),
                log: EventLog::new(),
            }),
            bank,
        }
    }

    // Mutating sections never panic between `apply` steps, so a poisoned
    // guard still holds fully-applied state.
    fn read_state(&self) -> RwLockReadGuard<'_, MarketState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MarketState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(state: &mut MarketState, events: Vec<MarketEvent>) -> u64 {
        let mut sequence = state.log.len() as u64;
        for event in events {
            state.market.apply(&event);
            sequence = state.log.append(event).sequence();
        }
        sequence
    }

    /// List a new product. No monetary side effect.
    pub fn create_product(
        &self,
        name: impl Into<String>,
        price: u64,
        category: impl Into<String>,
        creator: AccountId,
    ) -> LedgerResult<ProductId> {
        let mut state = self.write_state();
        let cmd = MarketCommand::CreateProduct(CreateProduct {
            name: name.into(),
            price,
            category: category.into(),
            creator,
            occurred_at: Utc::now(),
        });

        let events = state.market.handle(&cmd)?;
        Self::commit(&mut state, events);

        // Ids are dense and sequential: the newest id equals the count.
        let id = ProductId(state.market.product_count());
        tracing::info!("product {} listed by {}", id, creator);
        Ok(id)
    }

    /// Buy a listed product at its exact price.
    ///
    /// The payment moves buyer → current owner; ownership and both index
    /// entries move in the same unit.
    pub fn purchase_product(
        &self,
        id: ProductId,
        buyer: AccountId,
        paid: u64,
    ) -> LedgerResult<Receipt> {
        let mut state = self.write_state();
        let cmd = MarketCommand::PurchaseProduct(PurchaseProduct {
            id,
            buyer,
            paid,
            occurred_at: Utc::now(),
        });

        let events = state.market.handle(&cmd)?;
        let seller = state
            .market
            .product(id)
            .map(|p| p.owner)
            .ok_or(LedgerError::NotFound(id))?;

        self.bank
            .transfer(buyer, seller, paid)
            .map_err(|e| LedgerError::transfer_failed(e.to_string()))?;

        let sequence = Self::commit(&mut state, events);
        let product = state
            .market
            .product(id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))?;

        tracing::info!("product {} sold to {} for {}", id, buyer, paid);
        Ok(Receipt { product, sequence })
    }

    /// Reverse a completed sale.
    ///
    /// The seller of record repays the price to the current holder, takes
    /// the product back, and the product returns to the for-sale state.
    /// `requester` is the caller identity; call sites pass the current
    /// holder, and the repayment always goes to the holder of record.
    pub fn refund_product(&self, id: ProductId, requester: AccountId) -> LedgerResult<Receipt> {
        let mut state = self.write_state();
        let cmd = MarketCommand::RefundProduct(RefundProduct {
            id,
            requester,
            occurred_at: Utc::now(),
        });

        let events = state.market.handle(&cmd)?;
        let (holder, seller, price) = state
            .market
            .product(id)
            .and_then(|p| p.seller.map(|s| (p.owner, s, p.price)))
            .ok_or(LedgerError::NotPurchased(id))?;

        self.bank
            .transfer(seller, holder, price)
            .map_err(|e| LedgerError::transfer_failed(e.to_string()))?;

        let sequence = Self::commit(&mut state, events);
        let product = state
            .market
            .product(id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))?;

        tracing::info!("product {} refunded; returned to {}", id, seller);
        Ok(Receipt { product, sequence })
    }

    /// Donate to the marketplace beneficiaries.
    ///
    /// Equal integer split; the division remainder goes to the first
    /// beneficiary, so the full amount is always distributed. All legs
    /// commit together or not at all.
    pub fn donate(&self, donor: AccountId, amount: u64) -> LedgerResult<DonationReceipt> {
        let mut state = self.write_state();
        let occurred_at = Utc::now();
        let cmd = MarketCommand::Donate(Donate {
            donor,
            amount,
            occurred_at,
        });

        let events = state.market.handle(&cmd)?;
        let shares = donation_shares(amount, state.market.beneficiaries());

        self.bank
            .transfer_split(donor, &shares)
            .map_err(|e| LedgerError::transfer_failed(e.to_string()))?;

        let sequence = Self::commit(&mut state, events);

        tracing::info!(
            "donation of {} from {} split across {} beneficiaries",
            amount,
            donor,
            shares.len()
        );
        Ok(DonationReceipt {
            donor,
            amount,
            occurred_at,
            shares,
            sequence,
        })
    }

    /// Number of products ever created.
    pub fn product_count(&self) -> u64 {
        self.read_state().market.product_count()
    }

    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.read_state().market.product(id).cloned()
    }

    /// All products in ascending id order.
    pub fn products(&self) -> Vec<Product> {
        self.read_state().market.products().cloned().collect()
    }

    /// Ids of the products currently owned by `account`, ascending.
    pub fn owned_items(&self, account: AccountId) -> Vec<ProductId> {
        self.read_state().market.owned_items(account)
    }

    /// The fixed beneficiary set receiving donation splits.
    pub fn marketplace_owners(&self) -> Vec<AccountId> {
        self.read_state().market.beneficiaries().to_vec()
    }

    /// The append-only donation audit log.
    pub fn donations(&self) -> Vec<DonationRecord> {
        self.read_state().market.donations().to_vec()
    }

    /// The full observable event log, oldest first.
    pub fn events(&self) -> Vec<EventRecord<MarketEvent>> {
        self.read_state().log.all()
    }

    /// Records with a sequence strictly greater than `after`.
    pub fn events_since(&self, after: u64) -> Vec<EventRecord<MarketEvent>> {
        self.read_state().log.since(after)
    }
}
