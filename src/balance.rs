//! Token balance reads and raw-unit formatting
//!
//! Balances come back from the chain in smallest units; rendering divides
//! by `10^decimals` in integer arithmetic so large balances never lose
//! precision. Read errors propagate to the caller — a failed refresh must
//! not be displayed as a zero balance.

use alloy::primitives::U256;

use crate::bridge::BalanceReader;
use crate::config::UnwrapConfig;
use crate::error::TransportError;

/// One token balance in its three useful forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    /// Smallest-unit balance
    pub raw: U256,
    /// Exact decimal rendering, e.g. "1.5"
    pub balance: String,
    /// Four-decimal display form, e.g. "1.5000"
    pub formatted: String,
}

impl TokenBalance {
    pub fn from_raw(raw: U256, decimals: u32) -> Self {
        let balance = format_units(raw, decimals);
        let formatted = format!("{:.4}", balance.parse::<f64>().unwrap_or(0.0));
        Self {
            raw,
            balance,
            formatted,
        }
    }

    pub fn zero() -> Self {
        Self::from_raw(U256::ZERO, 0)
    }
}

/// Both sides of the unwrap pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllBalances {
    pub wtac: TokenBalance,
    pub tac: TokenBalance,
}

/// Render a smallest-unit amount as an exact decimal string, trimming
/// trailing fractional zeros.
pub fn format_units(raw: U256, decimals: u32) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let scale = U256::from(10u8).pow(U256::from(decimals));
    let int_part = raw / scale;
    let frac_part = raw % scale;

    if frac_part.is_zero() {
        return int_part.to_string();
    }

    let mut frac = format!("{:0>width$}", frac_part.to_string(), width = decimals as usize);
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{int_part}.{frac}")
}

/// Read the WTAC balance for `owner`.
pub async fn wtac_balance<R: BalanceReader>(
    reader: &R,
    config: &UnwrapConfig,
    owner: &str,
) -> Result<TokenBalance, TransportError> {
    let raw = reader.token_balance(owner, &config.wtac_jetton).await?;
    Ok(TokenBalance::from_raw(raw, config.decimals))
}

/// Read the TAC balance for `owner`.
pub async fn tac_balance<R: BalanceReader>(
    reader: &R,
    config: &UnwrapConfig,
    owner: &str,
) -> Result<TokenBalance, TransportError> {
    let raw = reader.token_balance(owner, &config.tac_jetton).await?;
    Ok(TokenBalance::from_raw(raw, config.decimals))
}

/// Read both balances concurrently.
pub async fn all_balances<R: BalanceReader>(
    reader: &R,
    config: &UnwrapConfig,
    owner: &str,
) -> Result<AllBalances, TransportError> {
    let (wtac, tac) = tokio::try_join!(
        wtac_balance(reader, config, owner),
        tac_balance(reader, config, owner)
    )?;
    Ok(AllBalances { wtac, tac })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[test]
    fn test_format_units_exact() {
        assert_eq!(
            format_units(U256::from(1_500_000_000_000_000_000u64), 18),
            "1.5"
        );
        assert_eq!(format_units(U256::ZERO, 18), "0");
        assert_eq!(format_units(U256::from(1u8), 18), "0.000000000000000001");
        assert_eq!(format_units(U256::from(42u8), 0), "42");
        assert_eq!(
            format_units(U256::from(123_456_789u64), 6),
            "123.456789"
        );
    }

    #[test]
    fn test_token_balance_forms() {
        let balance = TokenBalance::from_raw(U256::from(1_500_000_000_000_000_000u64), 18);
        assert_eq!(balance.balance, "1.5");
        assert_eq!(balance.formatted, "1.5000");

        let zero = TokenBalance::from_raw(U256::ZERO, 18);
        assert_eq!(zero.balance, "0");
        assert_eq!(zero.formatted, "0.0000");
    }

    struct MapReader;

    #[async_trait]
    impl BalanceReader for MapReader {
        async fn token_balance(
            &self,
            _owner: &str,
            token_address: &str,
        ) -> Result<U256, TransportError> {
            if token_address == crate::config::TVM_WTAC_ADDRESS {
                Ok(U256::from(2_000_000_000_000_000_000u64))
            } else {
                Ok(U256::from(500_000_000_000_000_000u64))
            }
        }
    }

    struct FailingReader;

    #[async_trait]
    impl BalanceReader for FailingReader {
        async fn token_balance(
            &self,
            _owner: &str,
            _token_address: &str,
        ) -> Result<U256, TransportError> {
            Err(TransportError("rpc down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_all_balances_reads_both_tokens() {
        let config = UnwrapConfig::default();
        let balances = all_balances(&MapReader, &config, "0:owner").await.unwrap();
        assert_eq!(balances.wtac.balance, "2");
        assert_eq!(balances.tac.balance, "0.5");
    }

    #[tokio::test]
    async fn test_read_errors_propagate() {
        let config = UnwrapConfig::default();
        let result = all_balances(&FailingReader, &config, "0:owner").await;
        assert!(result.is_err());
    }
}
