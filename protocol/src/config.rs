//! # Protocol Configuration & Constants
//!
//! Every magic number in KOIN lives here. The token's economic parameters
//! (metadata and the mana regeneration window) can be overridden through a
//! [`TokenConfig`] file; everything else is fixed at compile time.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Token Metadata
// ---------------------------------------------------------------------------

/// Default human-readable token name.
pub const TOKEN_NAME: &str = "Test Koinos";

/// Default ticker symbol.
pub const TOKEN_SYMBOL: &str = "tKOIN";

/// Default decimal precision. Display only; the ledger never divides by it.
pub const TOKEN_DECIMALS: u32 = 8;

/// Maximum token name length in bytes.
pub const MAX_NAME_SIZE: usize = 32;

/// Maximum token symbol length in bytes.
pub const MAX_SYMBOL_SIZE: usize = 8;

// ---------------------------------------------------------------------------
// Mana
// ---------------------------------------------------------------------------

/// Time for mana to regenerate from zero to the full balance: 5 days.
pub const MANA_REGEN_WINDOW: Duration = Duration::from_secs(5 * 24 * 60 * 60);

/// [`MANA_REGEN_WINDOW`] in milliseconds, the unit of every ledger timestamp.
pub const MANA_REGEN_WINDOW_MS: u64 = MANA_REGEN_WINDOW.as_millis() as u64;

// ---------------------------------------------------------------------------
// Argument Bounds
// ---------------------------------------------------------------------------

/// Maximum account key length in bytes. Addresses are 25 bytes on the wire.
pub const MAX_ADDRESS_SIZE: usize = 25;

/// Maximum encoded size of a single dispatcher result.
pub const MAX_BUFFER_SIZE: usize = 2048;

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// Key of the supply record inside the token's space. Account keys are
/// never empty, so this cannot collide with an account.
pub const SUPPLY_KEY: &[u8] = b"";

/// Default name of the token contract's storage space.
pub const DEFAULT_CONTRACT_SPACE: &str = "koin";

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_RPC_PORT: u16 = 9741;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9742;

// ---------------------------------------------------------------------------
// Token Configuration
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a [`TokenConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("token name is {len} bytes, maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("token symbol is {len} bytes, maximum is {max}")]
    SymbolTooLong { len: usize, max: usize },

    #[error("mana regeneration window must be non-zero")]
    ZeroRegenWindow,

    #[error("contract space must not be empty")]
    EmptySpace,
}

/// Runtime parameters of a token deployment.
///
/// Every field has a default, so a config file only needs to name what it
/// overrides:
///
/// ```json
/// { "symbol": "dKOIN", "regen_window_ms": 60000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Human-readable token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display precision.
    pub decimals: u32,
    /// Mana regeneration window in milliseconds.
    pub regen_window_ms: u64,
    /// Storage space owned by the token contract.
    pub space: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            regen_window_ms: MANA_REGEN_WINDOW_MS,
            space: DEFAULT_CONTRACT_SPACE.to_string(),
        }
    }
}

impl TokenConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path)?;
        let config: TokenConfig = serde_json::from_slice(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the bounds the dispatcher relies on when encoding metadata.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.len() > MAX_NAME_SIZE {
            return Err(ConfigError::NameTooLong {
                len: self.name.len(),
                max: MAX_NAME_SIZE,
            });
        }
        if self.symbol.len() > MAX_SYMBOL_SIZE {
            return Err(ConfigError::SymbolTooLong {
                len: self.symbol.len(),
                max: MAX_SYMBOL_SIZE,
            });
        }
        if self.regen_window_ms == 0 {
            return Err(ConfigError::ZeroRegenWindow);
        }
        if self.space.is_empty() {
            return Err(ConfigError::EmptySpace);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regen_window_is_five_days_in_millis() {
        assert_eq!(MANA_REGEN_WINDOW_MS, 432_000_000);
    }

    #[test]
    fn default_metadata_fits_bounds() {
        assert!(TOKEN_NAME.len() <= MAX_NAME_SIZE);
        assert!(TOKEN_SYMBOL.len() <= MAX_SYMBOL_SIZE);
        TokenConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, br#"{ "symbol": "dKOIN", "regen_window_ms": 60000 }"#).unwrap();

        let config = TokenConfig::from_json_file(&path).unwrap();
        assert_eq!(config.symbol, "dKOIN");
        assert_eq!(config.regen_window_ms, 60_000);
        assert_eq!(config.name, TOKEN_NAME);
        assert_eq!(config.decimals, TOKEN_DECIMALS);
    }

    #[test]
    fn oversized_symbol_rejected() {
        let config = TokenConfig {
            symbol: "WAYTOOLONG".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SymbolTooLong { len: 10, max: 8 })
        ));
    }

    #[test]
    fn zero_regen_window_rejected() {
        let config = TokenConfig {
            regen_window_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroRegenWindow)));
    }

    #[test]
    fn malformed_config_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            TokenConfig::from_json_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
