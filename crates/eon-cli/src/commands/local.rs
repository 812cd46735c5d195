//! `eon local`: paper-chain fixtures for manual runs.

use anyhow::Result;

use eon_testkit::{seed_catalog, supply_underlying};

use super::{GlobalArgs, Session, Target};

/// Install the catalog's underlying tokens and feeds on the paper chain.
pub async fn seed(g: &GlobalArgs) -> Result<()> {
    let session = Session::open(g, &Target::default()).await?;
    let catalog = session.pipeline.catalog()?;
    let seeded = seed_catalog(&session.ledger, catalog).await?;
    session.save().await?;

    for s in &seeded {
        println!(
            "token={} address={} decimals={} feed={} price={}",
            s.symbol, s.token, s.decimals, s.feed, s.price
        );
    }
    Ok(())
}

pub async fn supply(g: &GlobalArgs, symbol: &str, amount: &str) -> Result<()> {
    let session = Session::open(g, &Target::default()).await?;
    let outcome = supply_underlying(&session.ledger, &session.pipeline, symbol, amount).await;
    session.save().await?;

    let shares = outcome?;
    println!("market={} amount={} shares={}", symbol, amount, shares);
    Ok(())
}
