use std::collections::HashMap;

use alloy::{
    primitives::{Address, U256},
    providers::{DynProvider, Provider},
};
use async_trait::async_trait;
use walletscan_common::erc20::IERC20;

use crate::{alloy::StringExt, assets::Balance, network::Chain};

/// Remote balance queries. Each method is one unit of remote work for the
/// rate limiter.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn native_balance(&self, rpc_url: &str, wallet: &str) -> crate::Result<U256>;

    /// Balance of an ERC-20 token in the precision reported by the contract.
    async fn token_balance(
        &self,
        rpc_url: &str,
        token: Address,
        wallet: &str,
    ) -> crate::Result<Balance>;
}

/// JSON-RPC balance source with one provider per distinct endpoint.
pub struct RpcBalanceSource {
    providers: HashMap<String, DynProvider>,
}

impl RpcBalanceSource {
    pub fn new(chains: &[Chain]) -> crate::Result<Self> {
        let mut providers = HashMap::new();
        for chain in chains {
            if !providers.contains_key(&chain.rpc_url) {
                providers.insert(chain.rpc_url.clone(), chain.rpc_url.to_alloy_provider()?);
            }
        }
        Ok(Self { providers })
    }

    fn provider(&self, rpc_url: &str) -> crate::Result<&DynProvider> {
        self.providers
            .get(rpc_url)
            .ok_or_else(|| crate::Error::ProviderNotRegistered(rpc_url.to_string()))
    }
}

#[async_trait]
impl BalanceSource for RpcBalanceSource {
    async fn native_balance(&self, rpc_url: &str, wallet: &str) -> crate::Result<U256> {
        let owner = wallet.parse_as_address()?;
        self.provider(rpc_url)?
            .get_balance(owner)
            .await
            .map_err(|error| crate::Error::NativeBalanceFailed {
                rpc_url: rpc_url.to_string(),
                error: Box::new(error),
            })
    }

    async fn token_balance(
        &self,
        rpc_url: &str,
        token: Address,
        wallet: &str,
    ) -> crate::Result<Balance> {
        let owner = wallet.parse_as_address()?;
        let contract = IERC20::new(token, self.provider(rpc_url)?.clone());

        let decimals = contract.decimals().call().await.map_err(|error| {
            crate::Error::TokenCallFailed {
                contract: token.to_string(),
                method: "decimals",
                error: Box::new(error),
            }
        })?;

        let value = contract.balanceOf(owner).call().await.map_err(|error| {
            crate::Error::TokenCallFailed {
                contract: token.to_string(),
                method: "balanceOf",
                error: Box::new(error),
            }
        })?;

        Ok(Balance::new(value, decimals))
    }
}
