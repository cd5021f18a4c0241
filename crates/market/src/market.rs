use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AggregateRoot, AccountId, LedgerError, MarketId, ProductId};
use tradepost_events::Event;

use crate::product::{Category, Product};

/// Audit record of a completed donation. Append-only; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub donor: AccountId,
    /// Amount in the smallest currency unit.
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Market.
///
/// Owns the product table, the per-account ownership index, the donation
/// audit log, and the fixed beneficiary set. The ownership index is evolved
/// in `apply` together with the primary record, so the two cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    id: MarketId,
    beneficiaries: Vec<AccountId>,
    products: BTreeMap<ProductId, Product>,
    owned: HashMap<AccountId, BTreeSet<ProductId>>,
    donations: Vec<DonationRecord>,
    version: u64,
}

impl Market {
    /// New, empty market with its fixed beneficiary set.
    ///
    /// The beneficiary set is immutable for the life of the market; no
    /// add/remove operation exists.
    pub fn new(id: MarketId, beneficiaries: Vec<AccountId>) -> Self {
        Self {
            id,
            beneficiaries,
            products: BTreeMap::new(),
            owned: HashMap::new(),
            donations: Vec::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> MarketId {
        self.id
    }

    /// The fixed, ordered set of donation beneficiaries.
    pub fn beneficiaries(&self) -> &[AccountId] {
        &self.beneficiaries
    }

    /// Number of products ever created. Ids are dense, so this is also the
    /// highest assigned id.
    pub fn product_count(&self) -> u64 {
        self.products.len() as u64
    }

    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    /// All products in ascending id order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Ids of the products currently owned by `account`, ascending.
    pub fn owned_items(&self, account: AccountId) -> Vec<ProductId> {
        self.owned
            .get(&account)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn donations(&self) -> &[DonationRecord] {
        &self.donations
    }
}

impl AggregateRoot for Market {
    type Id = MarketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    /// Price in the smallest currency unit.
    pub price: u64,
    /// Category label as received at the boundary; validated on handling.
    pub category: String,
    pub creator: AccountId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: PurchaseProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseProduct {
    pub id: ProductId,
    pub buyer: AccountId,
    /// Amount tendered; must equal the product price exactly.
    pub paid: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RefundProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundProduct {
    pub id: ProductId,
    /// Caller identity; call sites pass the current holder.
    pub requester: AccountId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Donate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donate {
    pub donor: AccountId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketCommand {
    CreateProduct(CreateProduct),
    PurchaseProduct(PurchaseProduct),
    RefundProduct(RefundProduct),
    Donate(Donate),
}

/// Event: ProductCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub owner: AccountId,
    pub purchased: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductPurchased. `owner` is the new owner (the buyer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPurchased {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub owner: AccountId,
    pub purchased: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductRefunded. `owner` is the restored owner (the seller of
/// record), and `purchased` is back to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRefunded {
    pub id: ProductId,
    pub name: String,
    pub price: u64,
    pub category: Category,
    pub owner: AccountId,
    pub purchased: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DonationReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationReceived {
    pub donor: AccountId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    ProductCreated(ProductCreated),
    ProductPurchased(ProductPurchased),
    ProductRefunded(ProductRefunded),
    DonationReceived(DonationReceived),
}

impl Event for MarketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::ProductCreated(_) => "market.product.created",
            MarketEvent::ProductPurchased(_) => "market.product.purchased",
            MarketEvent::ProductRefunded(_) => "market.product.refunded",
            MarketEvent::DonationReceived(_) => "market.treasury.donation_received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MarketEvent::ProductCreated(e) => e.occurred_at,
            MarketEvent::ProductPurchased(e) => e.occurred_at,
            MarketEvent::ProductRefunded(e) => e.occurred_at,
            MarketEvent::DonationReceived(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Market {
    type Command = MarketCommand;
    type Event = MarketEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            MarketEvent::ProductCreated(e) => {
                self.products.insert(
                    e.id,
                    Product {
                        id: e.id,
                        name: e.name.clone(),
                        price: e.price,
                        category: e.category,
                        owner: e.owner,
                        purchased: e.purchased,
                        seller: None,
                    },
                );
                self.owned.entry(e.owner).or_default().insert(e.id);
            }
            MarketEvent::ProductPurchased(e) => {
                if let Some(product) = self.products.get_mut(&e.id) {
                    let previous = product.owner;
                    product.seller = Some(previous);
                    product.owner = e.owner;
                    product.purchased = true;
                    Self::move_owned(&mut self.owned, e.id, previous, e.owner);
                }
            }
            MarketEvent::ProductRefunded(e) => {
                if let Some(product) = self.products.get_mut(&e.id) {
                    let previous = product.owner;
                    product.owner = e.owner;
                    product.purchased = false;
                    product.seller = None;
                    Self::move_owned(&mut self.owned, e.id, previous, e.owner);
                }
            }
            MarketEvent::DonationReceived(e) => {
                self.donations.push(DonationRecord {
                    donor: e.donor,
                    amount: e.amount,
                    occurred_at: e.occurred_at,
                });
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            MarketCommand::CreateProduct(cmd) => self.handle_create(cmd),
            MarketCommand::PurchaseProduct(cmd) => self.handle_purchase(cmd),
            MarketCommand::RefundProduct(cmd) => self.handle_refund(cmd),
            MarketCommand::Donate(cmd) => self.handle_donate(cmd),
        }
    }
}

impl Market {
    fn move_owned(
        owned: &mut HashMap<AccountId, BTreeSet<ProductId>>,
        id: ProductId,
        from: AccountId,
        to: AccountId,
    ) {
        if let Some(ids) = owned.get_mut(&from) {
            ids.remove(&id);
            if ids.is_empty() {
                owned.remove(&from);
            }
        }
        owned.entry(to).or_default().insert(id);
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<MarketEvent>, LedgerError> {
        if cmd.name.trim().is_empty() {
            return Err(LedgerError::InvalidName);
        }
        if cmd.price == 0 {
            return Err(LedgerError::InvalidPrice);
        }
        let category = cmd.category.parse::<Category>()?;

        Ok(vec![MarketEvent::ProductCreated(ProductCreated {
            id: ProductId(self.products.len() as u64 + 1),
            name: cmd.name.clone(),
            price: cmd.price,
            category,
            owner: cmd.creator,
            purchased: false,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_purchase(&self, cmd: &PurchaseProduct) -> Result<Vec<MarketEvent>, LedgerError> {
        let product = self
            .products
            .get(&cmd.id)
            .ok_or(LedgerError::NotFound(cmd.id))?;

        if product.purchased {
            return Err(LedgerError::AlreadyPurchased(cmd.id));
        }
        if cmd.paid != product.price {
            return Err(LedgerError::PriceMismatch {
                price: product.price,
                paid: cmd.paid,
            });
        }
        if cmd.buyer == product.owner {
            return Err(LedgerError::SelfTrade(cmd.id));
        }

        Ok(vec![MarketEvent::ProductPurchased(ProductPurchased {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            category: product.category,
            owner: cmd.buyer,
            purchased: true,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_refund(&self, cmd: &RefundProduct) -> Result<Vec<MarketEvent>, LedgerError> {
        let product = self
            .products
            .get(&cmd.id)
            .ok_or(LedgerError::NotFound(cmd.id))?;

        if !product.purchased {
            return Err(LedgerError::NotPurchased(cmd.id));
        }
        // The seller of record is set together with `purchased` on purchase.
        let seller = product.seller.ok_or(LedgerError::NotPurchased(cmd.id))?;

        Ok(vec![MarketEvent::ProductRefunded(ProductRefunded {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            category: product.category,
            owner: seller,
            purchased: false,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_donate(&self, cmd: &Donate) -> Result<Vec<MarketEvent>, LedgerError> {
        if cmd.amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if self.beneficiaries.is_empty() {
            return Err(LedgerError::transfer_failed(
                "donation has no beneficiaries to receive funds",
            ));
        }

        Ok(vec![MarketEvent::DonationReceived(DonationReceived {
            donor: cmd.donor,
            amount: cmd.amount,
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Equal split of a donation across the beneficiary set.
///
/// Integer division; the remainder goes to the first beneficiary, so the
/// full amount is always distributed (sum of shares == amount).
pub fn donation_shares(amount: u64, beneficiaries: &[AccountId]) -> Vec<(AccountId, u64)> {
    let n = beneficiaries.len() as u64;
    if n == 0 {
        return Vec::new();
    }
    let share = amount / n;
    let remainder = amount % n;

    beneficiaries
        .iter()
        .enumerate()
        .map(|(i, b)| (*b, if i == 0 { share + remainder } else { share }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountId {
        AccountId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn market() -> Market {
        Market::new(MarketId::new(), vec![account(), account(), account()])
    }

    fn create(market: &mut Market, name: &str, price: u64, category: &str, creator: AccountId) -> ProductId {
        let cmd = MarketCommand::CreateProduct(CreateProduct {
            name: name.to_string(),
            price,
            category: category.to_string(),
            creator,
            occurred_at: test_time(),
        });
        let events = market.handle(&cmd).unwrap();
        for e in &events {
            market.apply(e);
        }
        ProductId(market.product_count())
    }

    fn purchase(market: &mut Market, id: ProductId, buyer: AccountId, paid: u64) -> Result<(), LedgerError> {
        let cmd = MarketCommand::PurchaseProduct(PurchaseProduct {
            id,
            buyer,
            paid,
            occurred_at: test_time(),
        });
        let events = market.handle(&cmd)?;
        for e in &events {
            market.apply(e);
        }
        Ok(())
    }

    fn refund(market: &mut Market, id: ProductId, requester: AccountId) -> Result<(), LedgerError> {
        let cmd = MarketCommand::RefundProduct(RefundProduct {
            id,
            requester,
            occurred_at: test_time(),
        });
        let events = market.handle(&cmd)?;
        for e in &events {
            market.apply(e);
        }
        Ok(())
    }

    #[test]
    fn create_product_emits_created_event() {
        let market = market();
        let seller = account();
        let cmd = MarketCommand::CreateProduct(CreateProduct {
            name: "iPhone X".to_string(),
            price: 100,
            category: "Electronics".to_string(),
            creator: seller,
            occurred_at: test_time(),
        });

        let events = market.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            MarketEvent::ProductCreated(e) => {
                assert_eq!(e.id, ProductId(1));
                assert_eq!(e.name, "iPhone X");
                assert_eq!(e.price, 100);
                assert_eq!(e.category, Category::Electronics);
                assert_eq!(e.owner, seller);
                assert!(!e.purchased);
            }
            _ => panic!("Expected ProductCreated event"),
        }
    }

    #[test]
    fn create_product_assigns_sequential_ids_and_indexes_creator() {
        let mut market = market();
        let seller = account();

        let first = create(&mut market, "Laptop", 200, "Electronics", seller);
        let second = create(&mut market, "Headphones", 50, "Electronics", seller);

        assert_eq!(first, ProductId(1));
        assert_eq!(second, ProductId(2));
        assert_eq!(market.product_count(), 2);
        assert_eq!(market.owned_items(seller), vec![ProductId(1), ProductId(2)]);
    }

    #[test]
    fn create_product_rejects_empty_name() {
        let market = market();
        let cmd = MarketCommand::CreateProduct(CreateProduct {
            name: "   ".to_string(),
            price: 100,
            category: "Electronics".to_string(),
            creator: account(),
            occurred_at: test_time(),
        });

        assert_eq!(market.handle(&cmd).unwrap_err(), LedgerError::InvalidName);
        assert_eq!(market.product_count(), 0);
    }

    #[test]
    fn create_product_rejects_zero_price() {
        let market = market();
        let cmd = MarketCommand::CreateProduct(CreateProduct {
            name: "iPhone X".to_string(),
            price: 0,
            category: "Electronics".to_string(),
            creator: account(),
            occurred_at: test_time(),
        });

        assert_eq!(market.handle(&cmd).unwrap_err(), LedgerError::InvalidPrice);
        assert_eq!(market.product_count(), 0);
    }

    #[test]
    fn create_product_rejects_unlisted_category() {
        let market = market();
        let cmd = MarketCommand::CreateProduct(CreateProduct {
            name: "iPhone X".to_string(),
            price: 100,
            category: "InvalidCategory".to_string(),
            creator: account(),
            occurred_at: test_time(),
        });

        match market.handle(&cmd).unwrap_err() {
            LedgerError::InvalidCategory(label) => assert_eq!(label, "InvalidCategory"),
            other => panic!("Expected InvalidCategory, got {other:?}"),
        }
        assert_eq!(market.product_count(), 0);
    }

    #[test]
    fn category_parses_every_canonical_label() {
        for category in Category::ALL {
            assert_eq!(category.label().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn category_parse_is_case_sensitive() {
        assert!(matches!(
            "electronics".parse::<Category>(),
            Err(LedgerError::InvalidCategory(_))
        ));
    }

    #[test]
    fn purchase_transfers_ownership_and_updates_index() {
        let mut market = market();
        let seller = account();
        let buyer = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        purchase(&mut market, id, buyer, 100).unwrap();

        let product = market.product(id).unwrap();
        assert_eq!(product.owner, buyer);
        assert!(product.purchased);
        assert_eq!(product.seller, Some(seller));
        assert!(market.owned_items(seller).is_empty());
        assert_eq!(market.owned_items(buyer), vec![id]);
    }

    #[test]
    fn purchase_rejects_unknown_product() {
        let mut market = market();
        let buyer = account();

        assert_eq!(
            purchase(&mut market, ProductId(99), buyer, 100).unwrap_err(),
            LedgerError::NotFound(ProductId(99))
        );
    }

    #[test]
    fn purchase_rejects_inexact_payment() {
        let mut market = market();
        let seller = account();
        let buyer = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        for paid in [0, 50, 101] {
            assert_eq!(
                purchase(&mut market, id, buyer, paid).unwrap_err(),
                LedgerError::PriceMismatch { price: 100, paid }
            );
        }

        let product = market.product(id).unwrap();
        assert_eq!(product.owner, seller);
        assert!(!product.purchased);
    }

    #[test]
    fn purchase_rejects_owner_buying_own_product() {
        let mut market = market();
        let seller = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        assert_eq!(
            purchase(&mut market, id, seller, 100).unwrap_err(),
            LedgerError::SelfTrade(id)
        );
    }

    #[test]
    fn purchase_rejects_already_purchased_product() {
        let mut market = market();
        let seller = account();
        let buyer = account();
        let other = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        purchase(&mut market, id, buyer, 100).unwrap();

        assert_eq!(
            purchase(&mut market, id, other, 100).unwrap_err(),
            LedgerError::AlreadyPurchased(id)
        );
    }

    #[test]
    fn refund_restores_seller_and_availability() {
        let mut market = market();
        let seller = account();
        let buyer = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        purchase(&mut market, id, buyer, 100).unwrap();
        refund(&mut market, id, buyer).unwrap();

        let product = market.product(id).unwrap();
        assert_eq!(product.owner, seller);
        assert!(!product.purchased);
        assert_eq!(product.seller, None);
        assert_eq!(market.owned_items(seller), vec![id]);
        assert!(market.owned_items(buyer).is_empty());
    }

    #[test]
    fn refund_rejects_unpurchased_product() {
        let mut market = market();
        let seller = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        assert_eq!(
            refund(&mut market, id, seller).unwrap_err(),
            LedgerError::NotPurchased(id)
        );
    }

    #[test]
    fn refund_rejects_unknown_product() {
        let mut market = market();

        assert_eq!(
            refund(&mut market, ProductId(7), account()).unwrap_err(),
            LedgerError::NotFound(ProductId(7))
        );
    }

    #[test]
    fn refunded_product_can_be_purchased_again() {
        let mut market = market();
        let seller = account();
        let buyer = account();
        let second_buyer = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        purchase(&mut market, id, buyer, 100).unwrap();
        refund(&mut market, id, buyer).unwrap();
        purchase(&mut market, id, second_buyer, 100).unwrap();

        let product = market.product(id).unwrap();
        assert_eq!(product.owner, second_buyer);
        assert!(product.purchased);
        assert_eq!(product.seller, Some(seller));
    }

    #[test]
    fn donate_appends_audit_record() {
        let mut market = market();
        let donor = account();
        let cmd = MarketCommand::Donate(Donate {
            donor,
            amount: 300,
            occurred_at: test_time(),
        });

        let events = market.handle(&cmd).unwrap();
        for e in &events {
            market.apply(e);
        }

        assert_eq!(market.donations().len(), 1);
        assert_eq!(market.donations()[0].donor, donor);
        assert_eq!(market.donations()[0].amount, 300);
    }

    #[test]
    fn donate_rejects_zero_amount() {
        let market = market();
        let cmd = MarketCommand::Donate(Donate {
            donor: account(),
            amount: 0,
            occurred_at: test_time(),
        });

        assert_eq!(market.handle(&cmd).unwrap_err(), LedgerError::ZeroAmount);
        assert!(market.donations().is_empty());
    }

    #[test]
    fn donate_without_beneficiaries_fails() {
        let market = Market::new(MarketId::new(), Vec::new());
        let cmd = MarketCommand::Donate(Donate {
            donor: account(),
            amount: 100,
            occurred_at: test_time(),
        });

        assert!(matches!(
            market.handle(&cmd).unwrap_err(),
            LedgerError::TransferFailed(_)
        ));
    }

    #[test]
    fn donation_shares_split_evenly_when_divisible() {
        let beneficiaries = vec![account(), account(), account()];
        let shares = donation_shares(300, &beneficiaries);

        assert_eq!(shares.len(), 3);
        for (i, (b, amount)) in shares.iter().enumerate() {
            assert_eq!(*b, beneficiaries[i]);
            assert_eq!(*amount, 100);
        }
    }

    #[test]
    fn donation_shares_remainder_goes_to_first_beneficiary() {
        let beneficiaries = vec![account(), account(), account()];

        let shares = donation_shares(10, &beneficiaries);
        assert_eq!(shares[0].1, 4);
        assert_eq!(shares[1].1, 3);
        assert_eq!(shares[2].1, 3);

        let shares = donation_shares(1, &beneficiaries);
        assert_eq!(shares[0].1, 1);
        assert_eq!(shares[1].1, 0);
        assert_eq!(shares[2].1, 0);
    }

    #[test]
    fn donation_shares_single_beneficiary_takes_all() {
        let beneficiaries = vec![account()];
        let shares = donation_shares(7, &beneficiaries);

        assert_eq!(shares, vec![(beneficiaries[0], 7)]);
    }

    #[test]
    fn version_increments_on_apply() {
        let mut market = market();
        assert_eq!(market.version(), 0);

        let seller = account();
        let buyer = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);
        assert_eq!(market.version(), 1);

        purchase(&mut market, id, buyer, 100).unwrap();
        assert_eq!(market.version(), 2);

        refund(&mut market, id, buyer).unwrap();
        assert_eq!(market.version(), 3);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut market = market();
        let seller = account();
        let buyer = account();
        let id = create(&mut market, "iPhone X", 100, "Electronics", seller);

        let before = market.clone();
        let cmd = MarketCommand::PurchaseProduct(PurchaseProduct {
            id,
            buyer,
            paid: 100,
            occurred_at: test_time(),
        });

        let events1 = market.handle(&cmd).unwrap();
        let events2 = market.handle(&cmd).unwrap();

        assert_eq!(market, before);
        assert_eq!(events1, events2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the union of all ownership indices is exactly the
            /// set of all product ids, each appearing once, after any
            /// sequence of creates, purchases, and refunds.
            #[test]
            fn ownership_indices_partition_the_product_set(
                ops in prop::collection::vec((0u8..3, 0usize..4, 0usize..8), 1..60)
            ) {
                let accounts: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
                let mut market = Market::new(MarketId::new(), vec![AccountId::new()]);

                for (op, actor, target) in ops {
                    let actor = accounts[actor];
                    let id = ProductId(target as u64 + 1);
                    let cmd = match op {
                        0 => MarketCommand::CreateProduct(CreateProduct {
                            name: "Widget".to_string(),
                            price: 10,
                            category: "Other".to_string(),
                            creator: actor,
                            occurred_at: Utc::now(),
                        }),
                        1 => MarketCommand::PurchaseProduct(PurchaseProduct {
                            id,
                            buyer: actor,
                            paid: 10,
                            occurred_at: Utc::now(),
                        }),
                        _ => MarketCommand::RefundProduct(RefundProduct {
                            id,
                            requester: actor,
                            occurred_at: Utc::now(),
                        }),
                    };

                    // Invalid commands are rejected without touching state.
                    if let Ok(events) = market.handle(&cmd) {
                        for e in &events {
                            market.apply(e);
                        }
                    }

                    let mut seen: Vec<ProductId> = Vec::new();
                    for account in &accounts {
                        seen.extend(market.owned_items(*account));
                    }
                    seen.sort();
                    let expected: Vec<ProductId> =
                        (1..=market.product_count()).map(ProductId).collect();
                    prop_assert_eq!(seen, expected);
                }
            }

            /// Property: donation shares always conserve the donated amount.
            #[test]
            fn donation_shares_conserve_amount(
                amount in 1u64..1_000_000,
                n in 1usize..8
            ) {
                let beneficiaries: Vec<AccountId> =
                    (0..n).map(|_| AccountId::new()).collect();
                let shares = donation_shares(amount, &beneficiaries);

                prop_assert_eq!(shares.len(), n);
                let total: u64 = shares.iter().map(|(_, s)| s).sum();
                prop_assert_eq!(total, amount);

                let base = amount / n as u64;
                for (i, (_, share)) in shares.iter().enumerate() {
                    if i == 0 {
                        prop_assert_eq!(*share, base + amount % n as u64);
                    } else {
                        prop_assert_eq!(*share, base);
                    }
                }
            }
        }
    }
}
