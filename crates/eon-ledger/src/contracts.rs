//! Typed views over the generic [`Ledger`] call surface.
//!
//! One handle per contract role. Handles borrow the ledger and carry only the
//! target address; they hold no state of their own.

use crate::{AbiValue, Address, Call, Ledger, LedgerError, TxReceipt};

async fn read(ledger: &dyn Ledger, to: Address, call: Call) -> Result<AbiValue, LedgerError> {
    ledger.call(to, &call).await
}

async fn uint(ledger: &dyn Ledger, to: Address, method: &str) -> Result<u128, LedgerError> {
    read(ledger, to, Call::new(method)).await?.as_uint()
}

async fn u8_of(ledger: &dyn Ledger, to: Address, method: &str) -> Result<u8, LedgerError> {
    read(ledger, to, Call::new(method)).await?.as_u8()
}

async fn text(ledger: &dyn Ledger, to: Address, method: &str) -> Result<String, LedgerError> {
    Ok(read(ledger, to, Call::new(method)).await?.as_str()?.to_string())
}

async fn address(ledger: &dyn Ledger, to: Address, method: &str) -> Result<Address, LedgerError> {
    read(ledger, to, Call::new(method)).await?.as_address()
}

// ---------------------------------------------------------------------------
// Tokens and feeds
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub struct Erc20<'a> {
    ledger: &'a dyn Ledger,
    pub address: Address,
}

impl<'a> Erc20<'a> {
    pub fn at(ledger: &'a dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    pub async fn symbol(&self) -> Result<String, LedgerError> {
        text(self.ledger, self.address, "symbol").await
    }

    pub async fn name(&self) -> Result<String, LedgerError> {
        text(self.ledger, self.address, "name").await
    }

    pub async fn decimals(&self) -> Result<u8, LedgerError> {
        u8_of(self.ledger, self.address, "decimals").await
    }

    pub async fn total_supply(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "totalSupply").await
    }

    pub async fn balance_of(&self, account: Address) -> Result<u128, LedgerError> {
        read(self.ledger, self.address, Call::new("balanceOf").arg(account))
            .await?
            .as_uint()
    }
}

/// Aggregator-style price feed.
#[derive(Clone, Copy)]
pub struct PriceFeed<'a> {
    ledger: &'a dyn Ledger,
    pub address: Address,
}

impl<'a> PriceFeed<'a> {
    pub fn at(ledger: &'a dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    pub async fn decimals(&self) -> Result<u8, LedgerError> {
        u8_of(self.ledger, self.address, "decimals").await
    }
}

// ---------------------------------------------------------------------------
// Comptroller
// ---------------------------------------------------------------------------

/// The comptroller as seen through its `Unitroller` storage proxy.
#[derive(Clone, Copy)]
pub struct Comptroller<'a> {
    ledger: &'a dyn Ledger,
    pub address: Address,
}

impl<'a> Comptroller<'a> {
    pub fn at(ledger: &'a dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    async fn send(&self, from: Address, call: Call) -> Result<TxReceipt, LedgerError> {
        self.ledger.send(from, self.address, &call).await
    }

    pub async fn all_markets(&self) -> Result<Vec<Address>, LedgerError> {
        read(self.ledger, self.address, Call::new("getAllMarkets"))
            .await?
            .as_array()?
            .iter()
            .map(AbiValue::as_address)
            .collect()
    }

    /// `markets(address).collateralFactorMantissa`.
    pub async fn collateral_factor(&self, market: Address) -> Result<u128, LedgerError> {
        let v = read(self.ledger, self.address, Call::new("markets").arg(market)).await?;
        let fields = v.as_tuple()?;
        fields
            .get(1)
            .ok_or(LedgerError::Decode {
                expected: "(bool,uint)",
                actual: "tuple",
            })?
            .as_uint()
    }

    pub async fn support_market(&self, from: Address, market: Address) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_supportMarket").arg(market)).await
    }

    pub async fn set_collateral_factor(
        &self,
        from: Address,
        market: Address,
        mantissa: u128,
    ) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_setCollateralFactor").arg(market).arg(mantissa))
            .await
    }

    pub async fn oracle(&self) -> Result<Address, LedgerError> {
        address(self.ledger, self.address, "oracle").await
    }

    pub async fn set_price_oracle(&self, from: Address, oracle: Address) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_setPriceOracle").arg(oracle)).await
    }

    pub async fn reward_distributor(&self) -> Result<Address, LedgerError> {
        address(self.ledger, self.address, "rewardDistributor").await
    }

    pub async fn set_reward_distributor(&self, from: Address, distributor: Address) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_setRewardDistributor").arg(distributor)).await
    }

    pub async fn comptroller_implementation(&self) -> Result<Address, LedgerError> {
        address(self.ledger, self.address, "comptrollerImplementation").await
    }

    pub async fn set_pending_implementation(
        &self,
        from: Address,
        implementation: Address,
    ) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_setPendingImplementation").arg(implementation))
            .await
    }

    pub async fn close_factor(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "closeFactorMantissa").await
    }

    pub async fn set_close_factor(&self, from: Address, mantissa: u128) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_setCloseFactor").arg(mantissa)).await
    }

    pub async fn liquidation_incentive(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "liquidationIncentiveMantissa").await
    }

    pub async fn set_liquidation_incentive(
        &self,
        from: Address,
        mantissa: u128,
    ) -> Result<TxReceipt, LedgerError> {
        self.send(from, Call::new("_setLiquidationIncentive").arg(mantissa))
            .await
    }
}

/// A deployed comptroller implementation (logic contract).
#[derive(Clone, Copy)]
pub struct ComptrollerImplementation<'a> {
    ledger: &'a dyn Ledger,
    pub address: Address,
}

impl<'a> ComptrollerImplementation<'a> {
    pub fn at(ledger: &'a dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    /// Accept the pending implementation slot of `unitroller`.
    pub async fn become_implementation(
        &self,
        from: Address,
        unitroller: Address,
    ) -> Result<TxReceipt, LedgerError> {
        self.ledger
            .send(from, self.address, &Call::new("_become").arg(unitroller))
            .await
    }
}

// ---------------------------------------------------------------------------
// Markets and oracle
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
pub struct Market<'a> {
    ledger: &'a dyn Ledger,
    pub address: Address,
}

impl<'a> Market<'a> {
    pub fn at(ledger: &'a dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    pub fn as_token(&self) -> Erc20<'a> {
        Erc20::at(self.ledger, self.address)
    }

    pub async fn underlying(&self) -> Result<Address, LedgerError> {
        address(self.ledger, self.address, "underlying").await
    }

    pub async fn total_supply(&self) -> Result<u128, LedgerError> {
        self.as_token().total_supply().await
    }

    pub async fn decimals(&self) -> Result<u8, LedgerError> {
        self.as_token().decimals().await
    }

    pub async fn reserve_factor(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "reserveFactorMantissa").await
    }

    pub async fn set_reserve_factor(&self, from: Address, mantissa: u128) -> Result<TxReceipt, LedgerError> {
        self.ledger
            .send(from, self.address, &Call::new("_setReserveFactor").arg(mantissa))
            .await
    }

    pub async fn supply_rate_per_block(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "supplyRatePerBlock").await
    }

    pub async fn borrow_rate_per_block(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "borrowRatePerBlock").await
    }

    pub async fn cash(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "getCash").await
    }

    pub async fn total_borrows(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "totalBorrows").await
    }

    pub async fn exchange_rate_stored(&self) -> Result<u128, LedgerError> {
        uint(self.ledger, self.address, "exchangeRateStored").await
    }
}

#[derive(Clone, Copy)]
pub struct PriceOracle<'a> {
    ledger: &'a dyn Ledger,
    pub address: Address,
}

impl<'a> PriceOracle<'a> {
    pub fn at(ledger: &'a dyn Ledger, address: Address) -> Self {
        Self { ledger, address }
    }

    /// Price of the market's underlying, as an 18-decimal mantissa.
    pub async fn underlying_price(&self, market: Address) -> Result<u128, LedgerError> {
        read(self.ledger, self.address, Call::new("getUnderlyingPrice").arg(market))
            .await?
            .as_uint()
    }
}
