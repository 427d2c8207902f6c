//! Unwrap engine configuration
//!
//! Hardcoded mainnet defaults with environment overrides. Contract
//! addresses are format-checked at load time so a bad deployment fails
//! fast instead of producing an unspendable transaction.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use eyre::{eyre, Result};

/// WTAC jetton master on TON (wrapped token, the input side).
pub const TVM_WTAC_ADDRESS: &str =
    "0:976525D85B589495D4A3A3B3889E8AF7F960F5717CCB41D84AA1CABF7C8E5F87";
/// Native TAC jetton master on TON (the output side).
pub const TVM_TAC_ADDRESS: &str =
    "0:44FE006B53798F23D8478E526847F918CAB8508320850FA11459F6B8D96F13EC";
/// EVM proxy that performs the wrapped-to-native conversion.
pub const WTAC_CONVERT_PROXY_ADDRESS: &str = "0x6F8B46897E9ad550339784131853a8a9482767d2";

/// Proxy method invoked with the ABI-encoded amount.
pub const CONVERT_METHOD: &str = "convertWrappedToNativeTac(bytes,bytes)";

/// Both tokens use 18 decimals.
pub const TOKEN_DECIMALS: u32 = 18;

/// Price-feed configuration.
#[derive(Debug, Clone)]
pub struct PriceConfig {
    /// Upstream simple-price endpoint
    pub endpoint: String,
    /// Asset id in the upstream response
    pub asset_id: String,
    /// Bound on a single upstream fetch
    pub fetch_timeout: Duration,
    /// How long a cached price stays fresh
    pub cache_duration: Duration,
    /// Maximum age of the persisted fallback before the hardcoded default
    /// takes over
    pub fallback_max_age: Duration,
    /// Last-resort price when no live or persisted value is available
    pub default_price: f64,
    /// Where the fallback snapshot is persisted
    pub fallback_path: PathBuf,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.coingecko.com/api/v3/simple/price?ids=tac&vs_currencies=USD"
                .to_string(),
            asset_id: "tac".to_string(),
            fetch_timeout: Duration::from_secs(10),
            cache_duration: Duration::from_secs(5 * 60),
            fallback_max_age: Duration::from_secs(60 * 60),
            default_price: 0.0012,
            fallback_path: PathBuf::from("tac-price-fallback.json"),
        }
    }
}

/// Top-level configuration for the unwrap engine.
#[derive(Debug, Clone)]
pub struct UnwrapConfig {
    /// WTAC jetton master address
    pub wtac_jetton: String,
    /// TAC jetton master address
    pub tac_jetton: String,
    /// EVM conversion proxy address
    pub convert_proxy: String,
    /// Token decimals (both sides)
    pub decimals: u32,
    /// Default confirmation target for withdrawals
    pub required_confirmations: u32,
    pub price: PriceConfig,
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self {
            wtac_jetton: TVM_WTAC_ADDRESS.to_string(),
            tac_jetton: TVM_TAC_ADDRESS.to_string(),
            convert_proxy: WTAC_CONVERT_PROXY_ADDRESS.to_string(),
            decimals: TOKEN_DECIMALS,
            required_confirmations: 3,
            price: PriceConfig::default(),
        }
    }
}

impl UnwrapConfig {
    /// Load configuration from environment, falling back to the shipped
    /// mainnet defaults. Address formats are validated before returning.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let defaults = Self::default();
        let price_defaults = defaults.price;

        let config = Self {
            wtac_jetton: env::var("WTAC_JETTON_ADDRESS").unwrap_or(defaults.wtac_jetton),
            tac_jetton: env::var("TAC_JETTON_ADDRESS").unwrap_or(defaults.tac_jetton),
            convert_proxy: env::var("CONVERT_PROXY_ADDRESS").unwrap_or(defaults.convert_proxy),
            decimals: TOKEN_DECIMALS,
            required_confirmations: env::var("REQUIRED_CONFIRMATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.required_confirmations),
            price: PriceConfig {
                endpoint: env::var("PRICE_API_URL").unwrap_or(price_defaults.endpoint),
                asset_id: env::var("PRICE_ASSET_ID").unwrap_or(price_defaults.asset_id),
                fetch_timeout: env::var("PRICE_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(price_defaults.fetch_timeout),
                cache_duration: env::var("PRICE_CACHE_DURATION_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(price_defaults.cache_duration),
                fallback_max_age: price_defaults.fallback_max_age,
                default_price: price_defaults.default_price,
                fallback_path: env::var("PRICE_FALLBACK_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(price_defaults.fallback_path),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check all contract address formats.
    pub fn validate(&self) -> Result<()> {
        if !is_ton_address(&self.wtac_jetton) {
            return Err(eyre!("Invalid WTAC contract address: {}", self.wtac_jetton));
        }
        if !is_ton_address(&self.tac_jetton) {
            return Err(eyre!("Invalid TAC contract address: {}", self.tac_jetton));
        }
        if !is_evm_address(&self.convert_proxy) {
            return Err(eyre!(
                "Invalid proxy contract address: {}",
                self.convert_proxy
            ));
        }
        Ok(())
    }
}

/// TON raw address format: workchain (`0` or `-1`), a colon, 64 hex chars.
pub fn is_ton_address(address: &str) -> bool {
    let Some((workchain, account)) = address.split_once(':') else {
        return false;
    };
    if workchain != "0" && workchain != "-1" {
        return false;
    }
    account.len() == 64 && account.chars().all(|c| c.is_ascii_hexdigit())
}

/// EVM address format: `0x` followed by 40 hex chars.
pub fn is_evm_address(address: &str) -> bool {
    let Some(hex) = address.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_addresses_are_valid() {
        assert!(is_ton_address(TVM_WTAC_ADDRESS));
        assert!(is_ton_address(TVM_TAC_ADDRESS));
        assert!(is_evm_address(WTAC_CONVERT_PROXY_ADDRESS));
        UnwrapConfig::default().validate().unwrap();
    }

    #[test]
    fn test_ton_address_rejects_malformed() {
        assert!(!is_ton_address(""));
        assert!(!is_ton_address("0:short"));
        assert!(!is_ton_address(
            "2:976525D85B589495D4A3A3B3889E8AF7F960F5717CCB41D84AA1CABF7C8E5F87"
        ));
        assert!(!is_ton_address(
            "0:976525D85B589495D4A3A3B3889E8AF7F960F5717CCB41D84AA1CABF7C8E5FZZ"
        ));
        assert!(is_ton_address(
            "-1:976525D85B589495D4A3A3B3889E8AF7F960F5717CCB41D84AA1CABF7C8E5F87"
        ));
    }

    #[test]
    fn test_evm_address_rejects_malformed() {
        assert!(!is_evm_address(""));
        assert!(!is_evm_address("6F8B46897E9ad550339784131853a8a9482767d2"));
        assert!(!is_evm_address("0x6F8B46897E9ad550339784131853a8a9482767"));
        assert!(!is_evm_address("0x6F8B46897E9ad550339784131853a8a9482767dZ"));
    }

    #[test]
    fn test_validate_catches_bad_proxy() {
        let config = UnwrapConfig {
            convert_proxy: "not-an-address".to_string(),
            ..UnwrapConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
