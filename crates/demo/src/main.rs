//! End-to-end walkthrough of the ledger boundary surface, standing in for
//! the storefront UI.

use std::sync::Arc;

use tradepost_core::AccountId;
use tradepost_ledger::{InMemoryBank, MarketLedger, ServiceLedger};
use tradepost_services::default_offerings;

fn main() -> anyhow::Result<()> {
    tradepost_observability::init();

    let funding: u64 = std::env::var("TRADEPOST_FUNDING")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1_000);

    let bank = Arc::new(InMemoryBank::new());
    let open = |label: &str| {
        let account = AccountId::new();
        bank.open_account(account, funding);
        tracing::info!("account {} ({}) opened with {}", account, label, funding);
        account
    };

    let seller = open("seller");
    let buyer = open("buyer");
    let beneficiaries = vec![
        open("beneficiary-1"),
        open("beneficiary-2"),
        open("beneficiary-3"),
    ];

    let market = MarketLedger::new(beneficiaries, bank.clone());
    let services = ServiceLedger::new(seller, default_offerings(25), bank.clone());

    // Listing and sale.
    let id = market.create_product("iPhone X", 100, "Electronics", seller)?;
    let receipt = market.purchase_product(id, buyer, 100)?;
    tracing::info!("sale committed at log sequence {}", receipt.sequence);
    tracing::info!("buyer now owns {:?}", market.owned_items(buyer));

    // A second sale of the same product is rejected.
    if let Err(err) = market.purchase_product(id, buyer, 100) {
        tracing::warn!("repeat purchase rejected: {}", err);
    }

    // Refund reverses the sale.
    market.refund_product(id, buyer)?;
    tracing::info!("seller balance after refund: {}", bank.balance_of(seller));

    // Donation split across the beneficiaries.
    let donation = market.donate(buyer, 100)?;
    for (beneficiary, share) in &donation.shares {
        tracing::info!("beneficiary {} received {}", beneficiary, share);
    }

    // Service purchases pay the catalog owner directly.
    for service_type in services.service_types().iter().take(3) {
        let price = services.service_price(service_type).unwrap_or(0);
        services.purchase_service(service_type, buyer, price)?;
    }

    tracing::info!(
        "market log has {} records, service log has {}",
        market.events().len(),
        services.events().len()
    );

    Ok(())
}
