//! Market Registrar.
//!
//! Lists every deployed market that the comptroller does not list yet. The
//! registrations target disjoint market slots, so they are dispatched
//! together and the stage completes once all of them have settled.

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

use eon_ledger::contracts::Comptroller;
use eon_ledger::Address;

use crate::comptroller::comptroller_address;
use crate::deployer::Deployer;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationReport {
    pub already_listed: Vec<String>,
    /// `(symbol, market)` for each market listed by this run.
    pub registered: Vec<(String, Address)>,
}

/// `markets` is `(symbol, address)` in catalog order.
pub async fn support_markets(deployer: &Deployer<'_>, markets: &[(String, Address)]) -> Result<RegistrationReport> {
    let ledger = deployer.ledger();
    let comptroller = Comptroller::at(ledger, comptroller_address(deployer).await?);
    let listed: BTreeSet<Address> = comptroller.all_markets().await?.into_iter().collect();

    let (present, missing): (Vec<_>, Vec<_>) = markets
        .iter()
        .cloned()
        .partition(|(_, address)| listed.contains(address));

    let already_listed: Vec<String> = present.into_iter().map(|(s, _)| s).collect();
    if missing.is_empty() {
        info!("all markets are already added to the comptroller");
        return Ok(RegistrationReport {
            already_listed,
            registered: Vec::new(),
        });
    }

    let from = ledger.deployer().await?;
    let pending = missing.iter().map(|(symbol, address)| {
        info!(symbol = %symbol, market = %address, "adding market to the comptroller");
        comptroller.support_market(from, *address)
    });
    for result in join_all(pending).await {
        result?;
    }

    Ok(RegistrationReport {
        already_listed,
        registered: missing,
    })
}
