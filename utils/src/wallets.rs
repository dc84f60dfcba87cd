use std::fs;

use crate::disk_storage::ProjectDir;

pub const WALLETS_FILE_NAME: &str = "wallets.txt";

/// A wallet to scan; `id` is its 1-based position in the wallet list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    pub id: usize,
    pub address: String,
}

pub fn parse_wallets(content: &str) -> Vec<Wallet> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, address)| Wallet {
            id: i + 1,
            address: address.to_string(),
        })
        .collect()
}

pub fn load_wallets(dir: &ProjectDir) -> crate::Result<Vec<Wallet>> {
    let path = dir.file(WALLETS_FILE_NAME);
    let content = fs::read_to_string(&path).map_err(|e| crate::Error::FileReadFailed(path, e))?;
    Ok(parse_wallets(&content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::TempProjectDir;

    #[test]
    fn test_ids_follow_line_order() {
        let wallets = parse_wallets("0xA\r\n  0xB \n\n0xC\n");
        assert_eq!(
            wallets,
            vec![
                Wallet { id: 1, address: "0xA".to_string() },
                Wallet { id: 2, address: "0xB".to_string() },
                Wallet { id: 3, address: "0xC".to_string() },
            ]
        );
    }

    #[test]
    fn test_missing_wallet_list_is_fatal() {
        let dir = TempProjectDir::new("no-wallets");
        assert!(matches!(
            load_wallets(&dir),
            Err(crate::Error::FileReadFailed(..))
        ));
    }
}
