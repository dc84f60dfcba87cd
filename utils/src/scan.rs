use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    balances::{BalanceSource, RpcBalanceSource},
    coin_names::{save_catalog, CoinNames},
    collector::BalanceCollector,
    config::ScanConfig,
    disk_storage::ProjectDir,
    network::{distinct_price_ids, load_chains, Chain},
    price_manager::{fetch_price_snapshot, CoinGecko, PriceOracle},
    rate_limiter::RateLimiters,
    report::Report,
    wallets::{load_wallets, Wallet},
};

/// Everything read from the project directory. Loading fails before any remote call.
#[derive(Debug)]
pub struct ScanInputs {
    pub config: ScanConfig,
    pub chains: Vec<Chain>,
    pub wallets: Vec<Wallet>,
    pub coin_names: CoinNames,
}

impl ScanInputs {
    pub fn load(dir: &ProjectDir) -> crate::Result<Self> {
        let config = ScanConfig::load(dir)?;
        let chains = load_chains(dir, &config)?;
        let wallets = load_wallets(dir)?;
        let coin_names = CoinNames::load(dir)?;

        info!("Config: {config}");
        info!(
            chains = chains.len(),
            wallets = wallets.len(),
            coin_names = coin_names.len(),
            "Inputs loaded"
        );
        for chain in &chains {
            debug!("Chain: {chain}");
        }

        Ok(Self {
            config,
            chains,
            wallets,
            coin_names,
        })
    }
}

#[derive(Debug)]
pub struct ScanSummary {
    pub rows: usize,
    pub failed: usize,
    pub output: PathBuf,
}

/// Prices every referenced coin once, then collects all wallets.
pub async fn scan(
    inputs: ScanInputs,
    oracle: &dyn PriceOracle,
    source: Arc<dyn BalanceSource>,
    limiters: RateLimiters,
) -> (Report, usize) {
    let prices = fetch_price_snapshot(oracle, &distinct_price_ids(&inputs.chains)).await;
    info!(prices = prices.len(), "Prices fetched");

    let collector = BalanceCollector::new(limiters, source, prices, inputs.coin_names);
    let collection = collector.collect(&inputs.wallets, &inputs.chains).await;

    (Report::assemble(collection.records), collection.failed)
}

/// Full scan against live RPC endpoints and CoinGecko, written to `output`.
pub async fn run_scan(dir: &ProjectDir, output: &Path) -> crate::Result<ScanSummary> {
    let inputs = ScanInputs::load(dir)?;
    let source = RpcBalanceSource::new(&inputs.chains)?;
    let limiters = RateLimiters::from_config(&inputs.config);

    let (report, failed) = scan(inputs, &CoinGecko::default(), Arc::new(source), limiters).await;
    report.save(output)?;

    Ok(ScanSummary {
        rows: report.len(),
        failed,
        output: output.to_path_buf(),
    })
}

/// Downloads the CoinGecko coin catalog into the project directory.
pub async fn fetch_supported_coins(dir: &ProjectDir, gecko: &CoinGecko) -> crate::Result<usize> {
    let coins = gecko.coins_list().await?;
    let count = coins.len();
    save_catalog(dir, coins)?;
    Ok(count)
}
