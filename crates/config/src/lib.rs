//! Configuration schema for the exchange
//!
//! Trimmed from a multi-service exchange config to what a single matching
//! engine instance needs: the two asset addresses, the fixed-point scale,
//! where the order book lives, and the ambient logging/bind-address wiring
//! `bins/exchanged` uses to stand the service up.

use common::Address;
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    pub exchange: ExchangeConfig,
    pub assets: AssetsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// Identifies the two asset ledgers this engine's book trades against.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetsConfig {
    pub book_asset: Address,
    pub price_asset: Address,
    #[serde(default = "default_unit_scale")]
    pub unit_scale: u128,
}

/// Where the order book and order store live. Only `memory` is implemented:
/// the engine's single-writer execution model has no multi-node
/// persistence story to support a networked store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(rename = "type")]
    #[serde(default = "default_store_type")]
    pub store_type: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: default_store_type(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(rename = "log_format")]
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(rename = "bind_address")]
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            bind_address: default_bind_address(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_yaml() {
        let yaml = r#"
exchange:
  name: "Demo Exchange"
  description: "A two-asset demo book"
  version: "0.1.0"
assets:
  book_asset: "0x0000000000000000000000000000000000000000000000000000000000000001"
  price_asset: "0x0000000000000000000000000000000000000000000000000000000000000002"
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).expect("parses");
        assert_eq!(config.exchange.name, "Demo Exchange");
        assert_eq!(config.assets.unit_scale, default_unit_scale());
        assert_eq!(config.store.store_type, "memory");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn generate_default_round_trips() {
        let config = parser::generate_default_config();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let reparsed: EngineConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed.exchange.name, config.exchange.name);
        assert_eq!(reparsed.assets.unit_scale, config.assets.unit_scale);
    }
}
