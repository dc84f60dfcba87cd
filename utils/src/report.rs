use std::{cmp::Ordering, fs::File, io, path::Path};

use serde::Serialize;
use tracing::info;

use crate::assets::BalanceRecord;

pub const DEFAULT_REPORT_FILE: &str = "balances.csv";

#[derive(Serialize)]
struct ReportRow<'a> {
    #[serde(rename = "Wallet Id")]
    wallet_id: usize,
    #[serde(rename = "Address")]
    address: &'a str,
    #[serde(rename = "Chain")]
    chain: &'a str,
    #[serde(rename = "Coin name")]
    coin_name: &'a str,
    #[serde(rename = "Coin amount")]
    coin_amount: f64,
    #[serde(rename = "Coin $ value")]
    coin_usd_value: f64,
    #[serde(rename = "Coin contract")]
    coin_contract: String,
}

impl<'a> From<&'a BalanceRecord> for ReportRow<'a> {
    fn from(record: &'a BalanceRecord) -> Self {
        Self {
            wallet_id: record.wallet_id,
            address: &record.wallet_address,
            chain: &record.chain_name,
            coin_name: &record.coin_name,
            coin_amount: record.amount,
            coin_usd_value: record.fiat_value,
            coin_contract: record.contract.to_string(),
        }
    }
}

/// Report ordering: wallet id, chain name and coin name ascending, then the
/// largest fiat value first.
pub fn compare_records(a: &BalanceRecord, b: &BalanceRecord) -> Ordering {
    a.wallet_id
        .cmp(&b.wallet_id)
        .then_with(|| a.chain_name.cmp(&b.chain_name))
        .then_with(|| a.coin_name.cmp(&b.coin_name))
        .then_with(|| b.fiat_value.total_cmp(&a.fiat_value))
}

/// Sorted, ready to write balance report.
#[derive(Debug, Default, PartialEq)]
pub struct Report {
    records: Vec<BalanceRecord>,
}

impl Report {
    pub fn assemble(mut records: Vec<BalanceRecord>) -> Self {
        records.sort_by(compare_records);
        Self { records }
    }

    pub fn records(&self) -> &[BalanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        if self.records.is_empty() {
            // serde only emits the header together with the first row
            writer.write_record([
                "Wallet Id",
                "Address",
                "Chain",
                "Coin name",
                "Coin amount",
                "Coin $ value",
                "Coin contract",
            ])?;
        }
        for record in &self.records {
            writer.serialize(ReportRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let file =
            File::create(path).map_err(|e| crate::Error::FileWriteFailed(path.to_path_buf(), e))?;
        self.write_csv(file)
            .map_err(|e| crate::Error::CsvFailed(path.to_path_buf(), e))?;
        info!(rows = self.len(), path = %path.display(), "CSV file was written successfully");
        Ok(())
    }
}
