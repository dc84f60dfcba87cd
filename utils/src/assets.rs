use std::fmt::{Display, Formatter};

use alloy::primitives::{utils::format_units, Address, U256};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenAddress {
    Native,
    Contract(Address),
}

impl Display for TokenAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenAddress::Native => write!(f, "native"),
            TokenAddress::Contract(address) => write!(f, "{address}"),
        }
    }
}

/// Raw on-chain balance together with the precision it is expressed in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Balance {
    pub value: U256,
    pub decimals: u8,
}

impl Balance {
    pub fn new(value: U256, decimals: u8) -> Self {
        Self { value, decimals }
    }

    pub fn formatted_value(&self) -> crate::Result<f64> {
        Ok(format_units(self.value, self.decimals)?.parse::<f64>()?)
    }
}

/// One row of the balance report.
#[derive(Clone, Debug, PartialEq)]
pub struct BalanceRecord {
    pub wallet_id: usize,
    pub wallet_address: String,
    pub chain_name: String,
    pub coin_name: String,
    pub amount: f64,
    pub fiat_value: f64,
    pub contract: TokenAddress,
}

impl Display for BalanceRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} {} {} (${:.2}) on {}",
            self.wallet_id,
            self.wallet_address,
            self.amount,
            self.coin_name,
            self.fiat_value,
            self.chain_name
        )
    }
}
