use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Aggregate, AggregateRoot, AccountId, CatalogId, LedgerError};
use tradepost_events::Event;

/// A purchasable service offering: a named type with a fixed price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    /// Unique text key, e.g. "Repair".
    pub service_type: String,
    /// Price in the smallest currency unit.
    pub price: u64,
}

/// The service roster shipped with the original storefront, priced flat.
pub fn default_offerings(price: u64) -> Vec<ServiceOffering> {
    [
        "Repair",
        "Install",
        "Shipping",
        "Consultation",
        "Training",
        "Data Recovery",
        "Web Development",
        "Security Audit",
        "Cloud Setup",
    ]
    .into_iter()
    .map(|service_type| ServiceOffering {
        service_type: service_type.to_string(),
        price,
    })
    .collect()
}

/// Aggregate root: ServiceCatalog.
///
/// The offering roster and the owning account are fixed at construction.
/// Purchases validate against the roster and pay the owner directly; the
/// catalog itself holds no per-purchase state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCatalog {
    id: CatalogId,
    owner: AccountId,
    offerings: Vec<ServiceOffering>,
    version: u64,
}

impl ServiceCatalog {
    /// New catalog owned by `owner`.
    ///
    /// Offerings keep their given order; a duplicate `service_type` later in
    /// the roster replaces the earlier entry.
    pub fn new(id: CatalogId, owner: AccountId, offerings: Vec<ServiceOffering>) -> Self {
        let mut roster: Vec<ServiceOffering> = Vec::with_capacity(offerings.len());
        for offering in offerings {
            match roster
                .iter_mut()
                .find(|o| o.service_type == offering.service_type)
            {
                Some(existing) => existing.price = offering.price,
                None => roster.push(offering),
            }
        }

        Self {
            id,
            owner,
            offerings: roster,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> CatalogId {
        self.id
    }

    /// Account receiving every service payment.
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn offerings(&self) -> &[ServiceOffering] {
        &self.offerings
    }

    /// Registered service types, in roster order.
    pub fn service_types(&self) -> Vec<String> {
        self.offerings
            .iter()
            .map(|o| o.service_type.clone())
            .collect()
    }

    pub fn price_of(&self, service_type: &str) -> Option<u64> {
        self.offerings
            .iter()
            .find(|o| o.service_type == service_type)
            .map(|o| o.price)
    }
}

impl AggregateRoot for ServiceCatalog {
    type Id = CatalogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PurchaseService.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseService {
    pub service_type: String,
    pub buyer: AccountId,
    /// Amount tendered; must equal the offering price exactly.
    pub paid: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceCommand {
    PurchaseService(PurchaseService),
}

/// Event: ServicePurchased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePurchased {
    pub service_type: String,
    pub buyer: AccountId,
    pub price: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceEvent {
    ServicePurchased(ServicePurchased),
}

impl Event for ServiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ServiceEvent::ServicePurchased(_) => "services.service.purchased",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ServiceEvent::ServicePurchased(e) => e.occurred_at,
        }
    }
}

impl Aggregate for ServiceCatalog {
    type Command = ServiceCommand;
    type Event = ServiceEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            // A service purchase is a payment event, not a state transfer;
            // the roster does not change.
            ServiceEvent::ServicePurchased(_) => {}
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ServiceCommand::PurchaseService(cmd) => self.handle_purchase(cmd),
        }
    }
}

impl ServiceCatalog {
    fn handle_purchase(&self, cmd: &PurchaseService) -> Result<Vec<ServiceEvent>, LedgerError> {
        let price = self
            .price_of(&cmd.service_type)
            .ok_or_else(|| LedgerError::unknown_service_type(&cmd.service_type))?;

        if cmd.paid != price {
            return Err(LedgerError::PriceMismatch {
                price,
                paid: cmd.paid,
            });
        }

        Ok(vec![ServiceEvent::ServicePurchased(ServicePurchased {
            service_type: cmd.service_type.clone(),
            buyer: cmd.buyer,
            price,
            occurred_at: cmd.occurred_at,
        })])
    }
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

    fn offering(service_type: &str, price: u64) -> ServiceOffering {
        ServiceOffering {
            service_type: service_type.to_string(),
            price,
        }
    }

    fn catalog() -> ServiceCatalog {
        ServiceCatalog::new(
            CatalogId::new(),
            account(),
            vec![offering("Repair", 50), offering("Shipping", 20)],
        )
    }

    #[test]
    fn service_types_keep_roster_order() {
        let catalog = catalog();
        assert_eq!(catalog.service_types(), vec!["Repair", "Shipping"]);
    }

    #[test]
    fn duplicate_roster_entry_replaces_earlier_price() {
        let catalog = ServiceCatalog::new(
            CatalogId::new(),
            account(),
            vec![offering("Repair", 50), offering("Repair", 75)],
        );

        assert_eq!(catalog.service_types(), vec!["Repair"]);
        assert_eq!(catalog.price_of("Repair"), Some(75));
    }

    #[test]
    fn price_of_unknown_type_is_none() {
        assert_eq!(catalog().price_of("Divination"), None);
    }

    #[test]
    fn purchase_emits_service_purchased_event() {
        let catalog = catalog();
        let buyer = account();
        let cmd = ServiceCommand::PurchaseService(PurchaseService {
            service_type: "Repair".to_string(),
            buyer,
            paid: 50,
            occurred_at: test_time(),
        });

        let events = catalog.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            ServiceEvent::ServicePurchased(e) => {
                assert_eq!(e.service_type, "Repair");
                assert_eq!(e.buyer, buyer);
                assert_eq!(e.price, 50);
            }
        }
    }

    #[test]
    fn purchase_rejects_unknown_service_type() {
        let catalog = catalog();
        let cmd = ServiceCommand::PurchaseService(PurchaseService {
            service_type: "Divination".to_string(),
            buyer: account(),
            paid: 50,
            occurred_at: test_time(),
        });

        match catalog.handle(&cmd).unwrap_err() {
            LedgerError::UnknownServiceType(t) => assert_eq!(t, "Divination"),
            other => panic!("Expected UnknownServiceType, got {other:?}"),
        }
    }

    #[test]
    fn purchase_rejects_inexact_payment() {
        let catalog = catalog();
        let cmd = ServiceCommand::PurchaseService(PurchaseService {
            service_type: "Shipping".to_string(),
            buyer: account(),
            paid: 19,
            occurred_at: test_time(),
        });

        assert_eq!(
            catalog.handle(&cmd).unwrap_err(),
            LedgerError::PriceMismatch { price: 20, paid: 19 }
        );
    }

    #[test]
    fn purchase_leaves_roster_unchanged() {
        let mut catalog = catalog();
        let before = catalog.offerings().to_vec();
        let cmd = ServiceCommand::PurchaseService(PurchaseService {
            service_type: "Repair".to_string(),
            buyer: account(),
            paid: 50,
            occurred_at: test_time(),
        });

        let events = catalog.handle(&cmd).unwrap();
        for e in &events {
            catalog.apply(e);
        }

        assert_eq!(catalog.offerings(), before.as_slice());
        assert_eq!(catalog.version(), 1);
    }

    #[test]
    fn default_offerings_cover_the_storefront_roster() {
        let roster = default_offerings(10);

        assert_eq!(roster.len(), 9);
        assert_eq!(roster[0].service_type, "Repair");
        assert!(roster.iter().all(|o| o.price == 10));
    }
}
