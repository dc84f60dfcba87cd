use std::{
    collections::{BTreeSet, HashMap},
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use alloy::{
    primitives::{Address, U256},
    transports::TransportErrorKind,
};
use async_trait::async_trait;
use tokio::time::Duration;

use crate::{
    assets::Balance,
    balances::BalanceSource,
    disk_storage::ProjectDir,
    price_manager::{PriceOracle, PriceTable},
    rate_limiter::RateLimit,
};

/// Native amount in wei for a whole-ish number of ether.
pub fn eth(amount: f64) -> U256 {
    U256::from((amount * 1e18) as u128)
}

/// Project directory inside a temp dir that is removed on drop.
pub struct TempProjectDir {
    _temp: tempfile::TempDir,
    dir: ProjectDir,
}

impl TempProjectDir {
    pub fn new(prefix: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("create temp dir");
        let dir = ProjectDir::with_root(temp.path());
        Self { _temp: temp, dir }
    }

    pub fn write(&self, file_name: &str, content: &str) {
        std::fs::write(self.dir.file(file_name), content).expect("write test file");
    }
}

impl Deref for TempProjectDir {
    type Target = ProjectDir;

    fn deref(&self) -> &ProjectDir {
        &self.dir
    }
}

/// Grants every request immediately and counts them.
#[derive(Default)]
pub struct CountingLimiter {
    calls: AtomicUsize,
}

impl CountingLimiter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimit for CountingLimiter {
    async fn acquire(&self, _permits: u32) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst);
        u32::MAX
    }
}

type Key = (String, String, Option<Address>);

fn key(rpc_url: &str, wallet: &str, token: Option<Address>) -> Key {
    (rpc_url.to_string(), wallet.to_string(), token)
}

enum Canned {
    Native(U256),
    Token(Balance),
    Fail,
}

/// In-memory balances keyed by (rpc url, wallet, token). Unknown keys fail.
#[derive(Default)]
pub struct FakeBalanceSource {
    canned: HashMap<Key, Canned>,
    delays: HashMap<Key, Duration>,
    calls: AtomicUsize,
    events: Mutex<Vec<(String, bool)>>,
}

impl FakeBalanceSource {
    pub fn with_native(mut self, rpc_url: &str, wallet: &str, value: U256) -> Self {
        self.canned
            .insert(key(rpc_url, wallet, None), Canned::Native(value));
        self
    }

    pub fn with_token(
        mut self,
        rpc_url: &str,
        token: Address,
        wallet: &str,
        value: U256,
        decimals: u8,
    ) -> Self {
        self.canned.insert(
            key(rpc_url, wallet, Some(token)),
            Canned::Token(Balance::new(value, decimals)),
        );
        self
    }

    pub fn failing_token(mut self, rpc_url: &str, token: Address, wallet: &str) -> Self {
        self.canned
            .insert(key(rpc_url, wallet, Some(token)), Canned::Fail);
        self
    }

    pub fn with_delay(
        mut self,
        rpc_url: &str,
        wallet: &str,
        token: Option<Address>,
        delay: Duration,
    ) -> Self {
        self.delays.insert(key(rpc_url, wallet, token), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(wallet, true)` when a call starts, `(wallet, false)` when it returns.
    pub fn events(&self) -> Vec<(String, bool)> {
        self.events.lock().expect("events lock").clone()
    }

    async fn call(&self, key: Key) -> crate::Result<&Canned> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.events
            .lock()
            .expect("events lock")
            .push((key.1.clone(), true));

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }

        self.events
            .lock()
            .expect("events lock")
            .push((key.1.clone(), false));

        self.canned
            .get(&key)
            .ok_or_else(|| crate::Error::ProviderNotRegistered(key.0.clone()))
    }
}

#[async_trait]
impl BalanceSource for FakeBalanceSource {
    async fn native_balance(&self, rpc_url: &str, wallet: &str) -> crate::Result<U256> {
        match self.call(key(rpc_url, wallet, None)).await? {
            Canned::Native(value) => Ok(*value),
            _ => Err(crate::Error::NativeBalanceFailed {
                rpc_url: rpc_url.to_string(),
                error: Box::new(TransportErrorKind::custom_str("injected failure")),
            }),
        }
    }

    async fn token_balance(
        &self,
        rpc_url: &str,
        token: Address,
        wallet: &str,
    ) -> crate::Result<Balance> {
        match self.call(key(rpc_url, wallet, Some(token))).await? {
            Canned::Token(balance) => Ok(*balance),
            _ => Err(crate::Error::TokenCallFailed {
                contract: token.to_string(),
                method: "balanceOf",
                error: Box::new(alloy::contract::Error::TransportError(
                    TransportErrorKind::custom_str("injected failure"),
                )),
            }),
        }
    }
}

/// Serves a fixed table, or fails every lookup when built with [`StaticPriceOracle::failing`].
pub struct StaticPriceOracle {
    prices: Option<PriceTable>,
    calls: AtomicUsize,
}

impl StaticPriceOracle {
    pub fn new<'a>(prices: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            prices: Some(prices.into_iter().map(|(id, p)| (id.to_string(), p)).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            prices: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for StaticPriceOracle {
    async fn fetch_prices(&self, coin_ids: &BTreeSet<String>) -> crate::Result<PriceTable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prices = self
            .prices
            .as_ref()
            .ok_or_else(|| crate::Error::InvalidUrl("price oracle offline".to_string()))?;
        Ok(coin_ids
            .iter()
            .filter_map(|id| prices.get(id).ok().map(|p| (id.clone(), p)))
            .collect())
    }
}
