//! Balance collection for a batch of wallets.
//!
//! Wallets are processed one after another. Within a wallet every native and token
//! balance is fetched concurrently, each call gated by the rate limiter of its RPC
//! provider, and the batch is only finished once every call has settled. A failed
//! call is logged and dropped without affecting its siblings.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    assets::{Balance, BalanceRecord, TokenAddress},
    balances::BalanceSource,
    coin_names::CoinNames,
    network::{Chain, Token},
    price_manager::PriceTable,
    rate_limiter::RateLimiters,
    wallets::Wallet,
};

const MAX_LOGGED_ERROR_CHARS: usize = 500;

/// Error text for a log field: one line, capped at [`MAX_LOGGED_ERROR_CHARS`].
/// RPC errors can carry whole response bodies.
fn error_field(error: &crate::Error) -> String {
    let text = error.to_string().split_whitespace().collect::<Vec<_>>().join(" ");
    match text.char_indices().nth(MAX_LOGGED_ERROR_CHARS) {
        Some((cut, _)) => {
            let omitted = text[cut..].chars().count();
            format!("{}...({omitted} more chars)", &text[..cut])
        }
        None => text,
    }
}

#[derive(Clone, Copy, Debug)]
enum Holding<'a> {
    Native,
    Token(&'a Token),
}

impl Holding<'_> {
    fn coin_id<'c>(&'c self, chain: &'c Chain) -> &'c str {
        match self {
            Holding::Native => &chain.price_coin_id,
            Holding::Token(token) => &token.coin_gecko_coin_id,
        }
    }
}

/// Result of collecting balances for all wallets.
#[derive(Debug, Default)]
pub struct Collection {
    pub records: Vec<BalanceRecord>,
    pub failed: usize,
}

pub struct BalanceCollector {
    limiters: RateLimiters,
    source: Arc<dyn BalanceSource>,
    prices: PriceTable,
    coin_names: CoinNames,
}

impl BalanceCollector {
    pub fn new(
        limiters: RateLimiters,
        source: Arc<dyn BalanceSource>,
        prices: PriceTable,
        coin_names: CoinNames,
    ) -> Self {
        Self {
            limiters,
            source,
            prices,
            coin_names,
        }
    }

    pub async fn collect(&self, wallets: &[Wallet], chains: &[Chain]) -> Collection {
        let mut collection = Collection::default();

        for wallet in wallets {
            info!("Processing wallet {} of {}", wallet.id, wallets.len());

            for result in self.collect_wallet(wallet, chains).await {
                match result {
                    Ok(record) => collection.records.push(record),
                    Err(_) => collection.failed += 1,
                }
            }
        }

        if collection.failed > 0 {
            warn!("Failed to process {} balances", collection.failed);
        } else {
            info!("All balances processed");
        }

        collection
    }

    /// Fetches the native balance and every token balance of one wallet on all chains,
    /// waiting for each of them to either succeed or fail.
    pub async fn collect_wallet(
        &self,
        wallet: &Wallet,
        chains: &[Chain],
    ) -> Vec<crate::Result<BalanceRecord>> {
        let tasks = chains.iter().flat_map(move |chain| {
            std::iter::once(Holding::Native)
                .chain(chain.tokens.iter().map(Holding::Token))
                .map(move |holding| self.fetch_logged(wallet, chain, holding))
        });

        join_all(tasks).await
    }

    async fn fetch_logged(
        &self,
        wallet: &Wallet,
        chain: &Chain,
        holding: Holding<'_>,
    ) -> crate::Result<BalanceRecord> {
        let result = self.fetch(wallet, chain, holding).await;
        match &result {
            Ok(record) => debug!(%record, "Balance fetched"),
            Err(error) => warn!(
                wallet = %wallet.address,
                chain = %chain.name,
                coin = holding.coin_id(chain),
                error = %error_field(error),
                "Failed to fetch balance"
            ),
        }
        result
    }

    async fn fetch(
        &self,
        wallet: &Wallet,
        chain: &Chain,
        holding: Holding<'_>,
    ) -> crate::Result<BalanceRecord> {
        self.limiters.for_rpc(&chain.rpc_url).acquire(1).await;

        let (balance, contract) = match holding {
            Holding::Native => {
                let value = self
                    .source
                    .native_balance(&chain.rpc_url, &wallet.address)
                    .await?;
                (Balance::new(value, chain.native_decimals), TokenAddress::Native)
            }
            Holding::Token(token) => {
                let balance = self
                    .source
                    .token_balance(&chain.rpc_url, token.contract, &wallet.address)
                    .await?;
                (balance, TokenAddress::Contract(token.contract))
            }
        };

        let coin_id = holding.coin_id(chain);
        let amount = balance.formatted_value()?;
        let fiat_value = if chain.is_test_network {
            0.0
        } else {
            amount * self.prices.get(coin_id)?
        };

        Ok(BalanceRecord {
            wallet_id: wallet.id,
            wallet_address: wallet.address.clone(),
            chain_name: chain.name.clone(),
            coin_name: self.coin_names.name_of(coin_id),
            amount,
            fiat_value,
            contract,
        })
    }
}
