//! Paper chain: contract storage plus the method semantics of every
//! contract the pipeline touches.
//!
//! Determinism:
//! - contract addresses are `sha256("create" ‖ from ‖ nonce)[..20]`
//! - transaction hashes are `sha256("tx" ‖ block ‖ from ‖ to ‖ call)`
//! - one block per transaction, no timestamps, no randomness
//!
//! Every transaction is atomic: it runs against a copy of the chain and
//! is committed only when it succeeds.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use eon_ledger::{AbiValue, Address, Artifact, Call, LedgerError, TxReceipt};

use crate::state::*;

type Res<T> = Result<T, LedgerError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperChain {
    block: u64,
    nonces: BTreeMap<Address, u64>,
    /// Code version per contract name; bumping it simulates a recompile.
    artifact_versions: BTreeMap<String, u32>,
    contracts: BTreeMap<Address, Deployed>,
    txs: Vec<TxEntry>,
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut h = Sha256::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

/// Well-known paper account `index` (0 is the deployer).
pub fn account(index: u32) -> Address {
    Address::from_digest(&sha256(&[b"paper:account:", &index.to_be_bytes()]))
}

fn arg<'a>(to: Address, call: &'a Call, i: usize) -> Res<&'a AbiValue> {
    call.args
        .get(i)
        .ok_or_else(|| LedgerError::revert(to, &call.method, format!("missing argument {i}")))
}

fn require(cond: bool, to: Address, call: &Call, reason: &str) -> Res<()> {
    if cond {
        Ok(())
    } else {
        Err(LedgerError::revert(to, &call.method, reason))
    }
}

fn scale_to_18(value: u128, decimals: u8) -> Option<u128> {
    if decimals <= 18 {
        value.checked_mul(10u128.checked_pow(u32::from(18 - decimals))?)
    } else {
        Some(value / 10u128.checked_pow(u32::from(decimals - 18))?)
    }
}

impl PaperChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn txs(&self) -> &[TxEntry] {
        &self.txs
    }

    pub fn contract(&self, address: Address) -> Option<&Deployed> {
        self.contracts.get(&address)
    }

    // -----------------------------------------------------------------------
    // Artifacts
    // -----------------------------------------------------------------------

    pub fn artifact(&self, contract: &str) -> Res<Artifact> {
        if ArtifactKind::for_contract(contract).is_none() {
            return Err(LedgerError::UnknownArtifact(contract.to_string()));
        }
        let version = self.artifact_versions.get(contract).copied().unwrap_or(1);
        let digest = sha256(&[b"paper:artifact:", contract.as_bytes(), &version.to_be_bytes()]);
        Ok(Artifact {
            contract: contract.to_string(),
            bytecode_digest: hex::encode(digest),
        })
    }

    pub fn set_artifact_version(&mut self, contract: &str, version: u32) {
        self.artifact_versions.insert(contract.to_string(), version);
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    fn receipt(&mut self, from: Address, to: Option<Address>, call: &Call) -> TxReceipt {
        self.block += 1;
        let mut encoded = Vec::new();
        for a in &call.args {
            a.encode_into(&mut encoded);
        }
        let to_bytes = to.map(|a| *a.as_bytes()).unwrap_or([0u8; 20]);
        let hash = hex::encode(sha256(&[
            b"tx",
            &self.block.to_be_bytes(),
            from.as_bytes(),
            &to_bytes,
            call.method.as_bytes(),
            &encoded,
        ]));
        self.txs.push(TxEntry {
            block: self.block,
            hash: hash.clone(),
            from,
            to,
            method: call.method.clone(),
        });
        TxReceipt {
            hash: format!("0x{hash}"),
            block: self.block,
        }
    }

    fn next_address(&mut self, from: Address) -> Address {
        let nonce = self.nonces.entry(from).or_insert(0);
        let addr = Address::from_digest(&sha256(&[b"create", from.as_bytes(), &nonce.to_be_bytes()]));
        *nonce += 1;
        addr
    }

    /// Run `f` against a copy; commit only on success.
    fn atomically<T>(&mut self, f: impl FnOnce(&mut PaperChain) -> Res<T>) -> Res<T> {
        let mut draft = self.clone();
        let out = f(&mut draft)?;
        *self = draft;
        Ok(out)
    }

    pub fn create(&mut self, from: Address, contract: &str, args: &[AbiValue]) -> Res<(Address, TxReceipt)> {
        let kind = ArtifactKind::for_contract(contract)
            .ok_or_else(|| LedgerError::UnknownArtifact(contract.to_string()))?;
        let digest = self.artifact(contract)?.bytecode_digest;
        let ctor = Call::new(format!("constructor:{contract}")).args(args.iter().cloned());

        self.atomically(|chain| {
            let address = chain.next_address(from);
            let state = construct(address, kind, digest, from, &ctor)?;
            chain.contracts.insert(
                address,
                Deployed {
                    contract: contract.to_string(),
                    state,
                },
            );
            let receipt = chain.receipt(from, None, &ctor);
            Ok((address, receipt))
        })
    }

    pub fn create_proxy(
        &mut self,
        from: Address,
        implementation: Address,
        admin: Address,
        init: &Call,
    ) -> Res<(Address, TxReceipt)> {
        self.atomically(|chain| {
            chain.require_logic(implementation, ArtifactKind::MarketLogic)?;
            let address = chain.next_address(from);
            chain.contracts.insert(
                address,
                Deployed {
                    contract: "TransparentUpgradeableProxy".to_string(),
                    state: ContractState::Proxy(ProxyState {
                        admin,
                        implementation,
                        market: None,
                    }),
                },
            );
            let receipt = chain.receipt(from, None, &Call::new("constructor:TransparentUpgradeableProxy"));
            chain.transact_inner(from, address, init)?;
            Ok((address, receipt))
        })
    }

    pub fn upgrade_proxy(&mut self, from: Address, proxy: Address, implementation: Address) -> Res<TxReceipt> {
        let call = Call::new("upgradeTo").arg(implementation);
        self.atomically(|chain| {
            chain.require_logic(implementation, ArtifactKind::MarketLogic)?;
            let p = chain.proxy_mut(proxy, &call)?;
            require(p.admin == from, proxy, &call, "caller is not the proxy admin")?;
            p.implementation = implementation;
            Ok(chain.receipt(from, Some(proxy), &call))
        })
    }

    pub fn proxy_implementation(&self, proxy: Address) -> Res<Address> {
        match self.contracts.get(&proxy).map(|d| &d.state) {
            Some(ContractState::Proxy(p)) => Ok(p.implementation),
            Some(_) => Err(LedgerError::revert(proxy, "implementation", "not a proxy")),
            None => Err(LedgerError::NoContract(proxy)),
        }
    }

    pub fn send(&mut self, from: Address, to: Address, call: &Call) -> Res<TxReceipt> {
        self.atomically(|chain| {
            chain.transact_inner(from, to, call)?;
            Ok(chain.receipt(from, Some(to), call))
        })
    }

    fn require_logic(&self, address: Address, want: ArtifactKind) -> Res<()> {
        match self.contracts.get(&address).map(|d| &d.state) {
            Some(ContractState::Logic { kind, .. }) if *kind == want => Ok(()),
            Some(_) => Err(LedgerError::revert(address, "implementation", format!("not a {want:?} contract"))),
            None => Err(LedgerError::NoContract(address)),
        }
    }

    fn state(&self, address: Address) -> Res<&ContractState> {
        self.contracts
            .get(&address)
            .map(|d| &d.state)
            .ok_or(LedgerError::NoContract(address))
    }

    fn state_mut(&mut self, address: Address) -> Res<&mut ContractState> {
        self.contracts
            .get_mut(&address)
            .map(|d| &mut d.state)
            .ok_or(LedgerError::NoContract(address))
    }

    fn proxy_mut(&mut self, proxy: Address, call: &Call) -> Res<&mut ProxyState> {
        match self.state_mut(proxy)? {
            ContractState::Proxy(p) => Ok(p),
            _ => Err(LedgerError::revert(proxy, &call.method, "not a proxy")),
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn view(&self, to: Address, call: &Call) -> Res<AbiValue> {
        let unknown = || LedgerError::revert(to, &call.method, "unknown method");
        match self.state(to)? {
            ContractState::Token(t) => match call.method.as_str() {
                "name" => Ok(t.name.clone().into()),
                "symbol" => Ok(t.symbol.clone().into()),
                "decimals" => Ok(t.decimals.into()),
                "totalSupply" => Ok(t.total_supply.into()),
                "balanceOf" => {
                    let who = arg(to, call, 0)?.as_address()?;
                    Ok(t.balances.get(&who).copied().unwrap_or(0).into())
                }
                _ => Err(unknown()),
            },
            ContractState::Aggregator(a) => match call.method.as_str() {
                "decimals" => Ok(a.decimals.into()),
                "latestAnswer" => Ok(a.answer.into()),
                _ => Err(unknown()),
            },
            ContractState::SimpleFeed(f) => match call.method.as_str() {
                "decimals" => Ok(18u8.into()),
                "getPrice" => {
                    let asset = arg(to, call, 0)?.as_address()?;
                    Ok(f.prices.get(&asset).copied().unwrap_or(0).into())
                }
                _ => Err(unknown()),
            },
            ContractState::RateModel(m) => match call.method.as_str() {
                "blocksPerYear" => Ok(m.blocks_per_year.into()),
                "baseRatePerBlock" => Ok(m.base_per_block.into()),
                "multiplierPerBlock" => Ok(m.multiplier_per_block.into()),
                "jumpMultiplierPerBlock" => Ok(m.jump_multiplier_per_block.into()),
                "kink" => Ok(m.kink.into()),
                "owner" => Ok(m.owner.into()),
                "name" => Ok(m.name.clone().into()),
                _ => Err(unknown()),
            },
            ContractState::Unitroller(u) => self.view_comptroller(to, u, call),
            ContractState::Logic { .. } => Err(unknown()),
            ContractState::Proxy(p) => {
                self.require_logic(p.implementation, ArtifactKind::MarketLogic)?;
                match call.method.as_str() {
                    "admin" => return Ok(p.admin.into()),
                    "implementation" => return Ok(p.implementation.into()),
                    _ => {}
                }
                let m = p
                    .market
                    .as_ref()
                    .ok_or_else(|| LedgerError::revert(to, &call.method, "market not initialized"))?;
                self.view_market(to, m, call)
            }
            ContractState::Oracle(o) => match call.method.as_str() {
                "getUnderlyingPrice" => {
                    let market = arg(to, call, 0)?.as_address()?;
                    self.underlying_price(to, o, market, call).map(AbiValue::Uint)
                }
                _ => Err(unknown()),
            },
        }
    }

    fn view_comptroller(&self, to: Address, u: &UnitrollerState, call: &Call) -> Res<AbiValue> {
        match call.method.as_str() {
            "admin" => return Ok(u.admin.into()),
            "comptrollerImplementation" => return Ok(u.implementation.into()),
            "pendingComptrollerImplementation" => return Ok(u.pending_implementation.into()),
            _ => {}
        }
        self.require_comptroller_logic(to, u, call)?;
        match call.method.as_str() {
            "getAllMarkets" => Ok(AbiValue::Array(
                u.all_markets.iter().map(|a| AbiValue::Address(*a)).collect(),
            )),
            "markets" => {
                let m = arg(to, call, 0)?.as_address()?;
                let listing = u.listings.get(&m);
                Ok(AbiValue::Tuple(vec![
                    AbiValue::Bool(listing.is_some()),
                    AbiValue::Uint(listing.map(|l| l.collateral_factor).unwrap_or(0)),
                ]))
            }
            "oracle" => Ok(u.oracle.into()),
            "rewardDistributor" => Ok(u.reward_distributor.into()),
            "closeFactorMantissa" => Ok(u.close_factor.into()),
            "liquidationIncentiveMantissa" => Ok(u.liquidation_incentive.into()),
            _ => Err(LedgerError::revert(to, &call.method, "unknown method")),
        }
    }

    fn require_comptroller_logic(&self, to: Address, u: &UnitrollerState, call: &Call) -> Res<()> {
        require(
            !u.implementation.is_zero(),
            to,
            call,
            "comptroller implementation not set",
        )?;
        self.require_logic(u.implementation, ArtifactKind::ComptrollerLogic)
    }

    fn rate_model_of(&self, to: Address, m: &MarketState, call: &Call) -> Res<&RateModelState> {
        match self.state(m.rate_model)? {
            ContractState::RateModel(r) => Ok(r),
            _ => Err(LedgerError::revert(to, &call.method, "rate model missing")),
        }
    }

    fn view_market(&self, to: Address, m: &MarketState, call: &Call) -> Res<AbiValue> {
        match call.method.as_str() {
            "name" => Ok(m.name.clone().into()),
            "symbol" => Ok(m.symbol.clone().into()),
            "decimals" => Ok(m.decimals.into()),
            "underlying" => Ok(m.underlying.into()),
            "comptroller" => Ok(m.comptroller.into()),
            "interestRateModel" => Ok(m.rate_model.into()),
            "totalSupply" => Ok(m.total_supply.into()),
            "balanceOf" => {
                let who = arg(to, call, 0)?.as_address()?;
                Ok(m.balances.get(&who).copied().unwrap_or(0).into())
            }
            "reserveFactorMantissa" => Ok(m.reserve_factor.into()),
            "getCash" => Ok(m.cash.into()),
            "totalBorrows" => Ok(m.total_borrows.into()),
            "totalReserves" => Ok(m.total_reserves.into()),
            "exchangeRateStored" => Ok(m.exchange_rate().into()),
            "borrowRatePerBlock" => Ok(self
                .rate_model_of(to, m, call)?
                .borrow_rate(m.utilization())
                .into()),
            "supplyRatePerBlock" => Ok(self
                .rate_model_of(to, m, call)?
                .supply_rate(m.utilization(), m.reserve_factor)
                .into()),
            _ => Err(LedgerError::revert(to, &call.method, "unknown method")),
        }
    }

    /// Price of a market's underlying at 18 decimals.
    fn underlying_price(&self, to: Address, o: &OracleState, market: Address, call: &Call) -> Res<u128> {
        let no_price = |why: &str| LedgerError::revert(to, &call.method, why);
        let m = match self.state(market)? {
            ContractState::Proxy(ProxyState { market: Some(m), .. }) => m,
            _ => return Err(no_price("not a market")),
        };
        let cfg = o
            .configs
            .get(&m.symbol)
            .ok_or_else(|| no_price("no price config for market"))?;
        let price = match self.state(cfg.feed)? {
            ContractState::Aggregator(a) => {
                scale_to_18(a.answer, a.decimals).ok_or_else(|| no_price("price overflow"))?
            }
            ContractState::SimpleFeed(f) => f.prices.get(&m.underlying).copied().unwrap_or(0),
            _ => return Err(no_price("feed is not a price source")),
        };
        require(price > 0, to, call, "price not available")?;
        Ok(price)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    fn transact_inner(&mut self, from: Address, to: Address, call: &Call) -> Res<()> {
        match self.state(to)? {
            ContractState::Unitroller(_) => self.transact_comptroller(from, to, call),
            ContractState::Logic {
                kind: ArtifactKind::ComptrollerLogic,
                ..
            } => self.transact_become(from, to, call),
            ContractState::Proxy(_) => self.transact_market(from, to, call),
            _ => Err(LedgerError::revert(to, &call.method, "unknown method")),
        }
    }

    fn unitroller_mut(&mut self, to: Address, call: &Call) -> Res<&mut UnitrollerState> {
        match self.state_mut(to)? {
            ContractState::Unitroller(u) => Ok(u),
            _ => Err(LedgerError::revert(to, &call.method, "not a comptroller")),
        }
    }

    fn transact_comptroller(&mut self, from: Address, to: Address, call: &Call) -> Res<()> {
        let u = match self.state(to)? {
            ContractState::Unitroller(u) => u.clone(),
            _ => return Err(LedgerError::revert(to, &call.method, "not a comptroller")),
        };
        require(from == u.admin, to, call, "unauthorized")?;

        if call.method == "_setPendingImplementation" {
            let implementation = arg(to, call, 0)?.as_address()?;
            self.unitroller_mut(to, call)?.pending_implementation = implementation;
            return Ok(());
        }

        self.require_comptroller_logic(to, &u, call)?;
        match call.method.as_str() {
            "_supportMarket" => {
                let market = arg(to, call, 0)?.as_address()?;
                match self.state(market)? {
                    ContractState::Proxy(ProxyState { market: Some(m), .. }) => {
                        require(m.comptroller == to, to, call, "market belongs to another comptroller")?
                    }
                    _ => return Err(LedgerError::revert(to, &call.method, "not a market")),
                }
                require(!u.listings.contains_key(&market), to, call, "market already listed")?;
                let u = self.unitroller_mut(to, call)?;
                u.all_markets.push(market);
                u.listings.insert(market, Listing::default());
            }
            "_setCollateralFactor" => {
                let market = arg(to, call, 0)?.as_address()?;
                let value = arg(to, call, 1)?.as_uint()?;
                require(u.listings.contains_key(&market), to, call, "market not listed")?;
                require(value <= COLLATERAL_FACTOR_MAX, to, call, "collateral factor too high")?;
                if value != 0 {
                    let oracle = match self.state(u.oracle) {
                        Ok(ContractState::Oracle(o)) => o,
                        _ => return Err(LedgerError::revert(to, &call.method, "price error")),
                    };
                    self.underlying_price(u.oracle, oracle, market, call)
                        .map_err(|_| LedgerError::revert(to, &call.method, "price error"))?;
                }
                let u = self.unitroller_mut(to, call)?;
                if let Some(l) = u.listings.get_mut(&market) {
                    l.collateral_factor = value;
                }
            }
            "_setPriceOracle" => {
                let oracle = arg(to, call, 0)?.as_address()?;
                self.unitroller_mut(to, call)?.oracle = oracle;
            }
            "_setRewardDistributor" => {
                let distributor = arg(to, call, 0)?.as_address()?;
                self.unitroller_mut(to, call)?.reward_distributor = distributor;
            }
            "_setCloseFactor" => {
                let value = arg(to, call, 0)?.as_uint()?;
                self.unitroller_mut(to, call)?.close_factor = value;
            }
            "_setLiquidationIncentive" => {
                let value = arg(to, call, 0)?.as_uint()?;
                self.unitroller_mut(to, call)?.liquidation_incentive = value;
            }
            _ => return Err(LedgerError::revert(to, &call.method, "unknown method")),
        }
        Ok(())
    }

    fn transact_become(&mut self, from: Address, to: Address, call: &Call) -> Res<()> {
        require(call.method == "_become", to, call, "unknown method")?;
        let unitroller = arg(to, call, 0)?.as_address()?;
        let u = self.unitroller_mut(unitroller, call)?;
        require(from == u.admin, to, call, "only unitroller admin can change brains")?;
        require(
            u.pending_implementation == to,
            to,
            call,
            "not the pending implementation",
        )?;
        u.implementation = to;
        u.pending_implementation = Address::ZERO;
        Ok(())
    }

    fn transact_market(&mut self, from: Address, to: Address, call: &Call) -> Res<()> {
        let implementation = self.proxy_mut(to, call)?.implementation;
        self.require_logic(implementation, ArtifactKind::MarketLogic)?;

        if call.method == "proxyInitialize" {
            let market = self.initialize_market(to, call)?;
            let p = self.proxy_mut(to, call)?;
            require(p.market.is_none(), to, call, "already initialized")?;
            p.market = Some(market);
            return Ok(());
        }

        let p = self.proxy_mut(to, call)?;
        let m = p
            .market
            .as_mut()
            .ok_or_else(|| LedgerError::revert(to, &call.method, "market not initialized"))?;
        match call.method.as_str() {
            "_setReserveFactor" => {
                let value = arg(to, call, 0)?.as_uint()?;
                require(from == m.admin, to, call, "unauthorized")?;
                require(value <= RESERVE_FACTOR_MAX, to, call, "reserve factor too high")?;
                m.reserve_factor = value;
                Ok(())
            }
            _ => Err(LedgerError::revert(to, &call.method, "unknown method")),
        }
    }

    /// `proxyInitialize(underlying, comptroller, rateModel, exchangeRate,
    /// name, symbol, decimals, admin)`.
    fn initialize_market(&self, to: Address, call: &Call) -> Res<MarketState> {
        let underlying = arg(to, call, 0)?.as_address()?;
        let comptroller = arg(to, call, 1)?.as_address()?;
        let rate_model = arg(to, call, 2)?.as_address()?;
        let initial_exchange_rate = arg(to, call, 3)?.as_uint()?;
        let name = arg(to, call, 4)?.as_str()?.to_string();
        let symbol = arg(to, call, 5)?.as_str()?.to_string();
        let decimals = arg(to, call, 6)?.as_u8()?;
        let admin = arg(to, call, 7)?.as_address()?;

        require(
            matches!(self.state(underlying)?, ContractState::Token(_)),
            to,
            call,
            "underlying is not a token",
        )?;
        require(
            matches!(self.state(comptroller)?, ContractState::Unitroller(_)),
            to,
            call,
            "not a comptroller",
        )?;
        require(
            matches!(self.state(rate_model)?, ContractState::RateModel(_)),
            to,
            call,
            "not a rate model",
        )?;
        require(initial_exchange_rate > 0, to, call, "initial exchange rate must be greater than zero")?;

        Ok(MarketState {
            underlying,
            comptroller,
            rate_model,
            initial_exchange_rate,
            name,
            symbol,
            decimals,
            admin,
            reserve_factor: 0,
            total_supply: 0,
            balances: BTreeMap::new(),
            cash: 0,
            total_borrows: 0,
            total_reserves: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Fixtures and user actions (outside the Ledger capability set)
    // -----------------------------------------------------------------------

    fn install(&mut self, address: Address, contract: &str, state: ContractState) {
        self.contracts.insert(
            address,
            Deployed {
                contract: contract.to_string(),
                state,
            },
        );
    }

    pub fn install_token(&mut self, address: Address, name: &str, symbol: &str, decimals: u8) {
        self.install(
            address,
            "ERC20PresetMinterPauser",
            ContractState::Token(TokenState {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals,
                total_supply: 0,
                balances: BTreeMap::new(),
            }),
        );
    }

    pub fn install_aggregator(&mut self, address: Address, decimals: u8, answer: u128) {
        self.install(
            address,
            "AggregatorV3",
            ContractState::Aggregator(AggregatorState { decimals, answer }),
        );
    }

    /// Install an empty simple feed unless one is already there.
    pub fn install_simple_feed(&mut self, address: Address) {
        if !matches!(self.state(address), Ok(ContractState::SimpleFeed(_))) {
            self.install(address, "SimplePriceFeed", ContractState::SimpleFeed(SimpleFeedState::default()));
        }
    }

    pub fn set_simple_price(&mut self, feed: Address, asset: Address, price: u128) -> Res<()> {
        match self.state_mut(feed)? {
            ContractState::SimpleFeed(f) => {
                f.prices.insert(asset, price);
                Ok(())
            }
            _ => Err(LedgerError::revert(feed, "setPrice", "not a simple feed")),
        }
    }

    pub fn set_aggregator_answer(&mut self, feed: Address, answer: u128) -> Res<()> {
        match self.state_mut(feed)? {
            ContractState::Aggregator(a) => {
                a.answer = answer;
                Ok(())
            }
            _ => Err(LedgerError::revert(feed, "setAnswer", "not an aggregator")),
        }
    }

    pub fn mint_token(&mut self, token: Address, to: Address, amount: u128) -> Res<()> {
        let call = Call::new("mint").arg(to).arg(amount);
        match self.state_mut(token)? {
            ContractState::Token(t) => {
                let supply = t
                    .total_supply
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::revert(token, "mint", "overflow"))?;
                t.total_supply = supply;
                *t.balances.entry(to).or_insert(0) += amount;
            }
            _ => return Err(LedgerError::revert(token, "mint", "not a token")),
        }
        self.receipt(account(0), Some(token), &call);
        Ok(())
    }

    /// Deposit `amount` underlying from `supplier`; returns minted shares.
    ///
    /// The first mint of a market locks [`LOCKED_FIRST_MINT`] share units to
    /// the zero address.
    pub fn supply(&mut self, supplier: Address, market: Address, amount: u128) -> Res<u128> {
        let call = Call::new("mint").arg(amount);
        self.atomically(|chain| {
            let m = match chain.state(market)? {
                ContractState::Proxy(ProxyState { market: Some(m), .. }) => m.clone(),
                _ => return Err(LedgerError::revert(market, "mint", "not a market")),
            };
            require(amount > 0, market, &call, "zero amount")?;

            match chain.state_mut(m.underlying)? {
                ContractState::Token(t) => {
                    let bal = t.balances.entry(supplier).or_insert(0);
                    require(*bal >= amount, market, &call, "insufficient underlying balance")?;
                    *bal -= amount;
                    *t.balances.entry(market).or_insert(0) += amount;
                }
                _ => return Err(LedgerError::revert(market, "mint", "underlying is not a token")),
            }

            let overflow = || LedgerError::revert(market, "mint", "overflow");
            let rate = m.exchange_rate();
            require(rate > 0, market, &call, "zero exchange rate")?;
            let shares = mul_div(amount, MANTISSA_ONE, rate).ok_or_else(overflow)?;

            let first_mint = m.total_supply == 0;
            let to_supplier = if first_mint {
                require(shares > LOCKED_FIRST_MINT, market, &call, "first mint too small")?;
                shares - LOCKED_FIRST_MINT
            } else {
                shares
            };

            let p = chain.proxy_mut(market, &call)?;
            let ms = p.market.as_mut().ok_or_else(overflow)?;
            ms.cash = ms.cash.checked_add(amount).ok_or_else(overflow)?;
            ms.total_supply = ms.total_supply.checked_add(shares).ok_or_else(overflow)?;
            if first_mint {
                *ms.balances.entry(Address::ZERO).or_insert(0) += LOCKED_FIRST_MINT;
            }
            *ms.balances.entry(supplier).or_insert(0) += to_supplier;

            chain.receipt(supplier, Some(market), &call);
            Ok(to_supplier)
        })
    }

    /// Borrow `amount` underlying out of the market's cash. No collateral
    /// accounting: paper borrows only move utilization.
    pub fn borrow(&mut self, borrower: Address, market: Address, amount: u128) -> Res<()> {
        let call = Call::new("borrow").arg(amount);
        self.atomically(|chain| {
            let p = chain.proxy_mut(market, &call)?;
            let m = p
                .market
                .as_mut()
                .ok_or_else(|| LedgerError::revert(market, "borrow", "not a market"))?;
            require(m.cash >= amount, market, &call, "insufficient cash")?;
            m.cash -= amount;
            m.total_borrows += amount;
            let underlying = m.underlying;

            match chain.state_mut(underlying)? {
                ContractState::Token(t) => {
                    let pool = t.balances.entry(market).or_insert(0);
                    *pool = pool.saturating_sub(amount);
                    *t.balances.entry(borrower).or_insert(0) += amount;
                }
                _ => return Err(LedgerError::revert(market, "borrow", "underlying is not a token")),
            }
            chain.receipt(borrower, Some(market), &call);
            Ok(())
        })
    }
}

fn construct(
    address: Address,
    kind: ArtifactKind,
    digest: String,
    from: Address,
    ctor: &Call,
) -> Res<ContractState> {
    let bad = |why: &str| LedgerError::revert(address, &ctor.method, why);
    Ok(match kind {
        ArtifactKind::Token => ContractState::Token(TokenState {
            name: arg(address, ctor, 0)?.as_str()?.to_string(),
            symbol: arg(address, ctor, 1)?.as_str()?.to_string(),
            decimals: 18,
            total_supply: 0,
            balances: BTreeMap::new(),
        }),
        ArtifactKind::AggregatorFeed => ContractState::Aggregator(AggregatorState {
            decimals: arg(address, ctor, 0)?.as_u8()?,
            answer: arg(address, ctor, 1)?.as_uint()?,
        }),
        ArtifactKind::SimpleFeed => ContractState::SimpleFeed(SimpleFeedState::default()),
        ArtifactKind::RateModel => ContractState::RateModel(RateModelState {
            blocks_per_year: arg(address, ctor, 0)?.as_uint()?,
            base_per_block: arg(address, ctor, 1)?.as_uint()?,
            multiplier_per_block: arg(address, ctor, 2)?.as_uint()?,
            jump_multiplier_per_block: arg(address, ctor, 3)?.as_uint()?,
            kink: arg(address, ctor, 4)?.as_uint()?,
            owner: arg(address, ctor, 5)?.as_address()?,
            name: arg(address, ctor, 6)?.as_str()?.to_string(),
        }),
        ArtifactKind::Unitroller => ContractState::Unitroller(UnitrollerState::new(from)),
        ArtifactKind::ComptrollerLogic | ArtifactKind::MarketLogic => ContractState::Logic { kind, digest },
        ArtifactKind::Oracle => {
            let symbols = arg(address, ctor, 0)?.as_array()?;
            let configs = arg(address, ctor, 1)?.as_array()?;
            if symbols.len() != configs.len() {
                return Err(bad("symbols and configs differ in length"));
            }
            let mut out = BTreeMap::new();
            for (s, c) in symbols.iter().zip(configs) {
                let fields = c.as_tuple()?;
                if fields.len() != 3 {
                    return Err(bad("price config must be (feed, decimals, toSymbol)"));
                }
                out.insert(
                    s.as_str()?.to_string(),
                    PriceConfig {
                        feed: fields[0].as_address()?,
                        underlying_decimals: fields[1].as_u8()?,
                        to_symbol: fields[2].as_str()?.to_string(),
                    },
                );
            }
            ContractState::Oracle(OracleState { configs: out })
        }
    })
}
