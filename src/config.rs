use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::env;
use std::path::Path;

use crate::authority::AuthorityRegistry;

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BridgeConfig {
    /// Ordered authority set
    pub authorities: Vec<Address>,
    /// Distinct authorities needed to release a transfer
    pub required_signatures: usize,
    /// Gas charged to a withdrawal to reimburse its relayer (0 disables)
    #[serde(default = "default_estimated_gas_cost_of_withdraw")]
    pub estimated_gas_cost_of_withdraw: u64,
}

fn default_estimated_gas_cost_of_withdraw() -> u64 {
    0
}

impl BridgeConfig {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let authorities = parse_authorities(
            &env::var("BRIDGE_AUTHORITIES")
                .map_err(|_| eyre!("BRIDGE_AUTHORITIES environment variable is required"))?,
        )?;

        let required_signatures = env::var("BRIDGE_REQUIRED_SIGNATURES")
            .map_err(|_| eyre!("BRIDGE_REQUIRED_SIGNATURES environment variable is required"))?
            .trim()
            .parse()
            .wrap_err("BRIDGE_REQUIRED_SIGNATURES must be a valid usize")?;

        let estimated_gas_cost_of_withdraw = match env::var("ESTIMATED_GAS_COST_OF_WITHDRAW") {
            Ok(v) => v
                .trim()
                .parse()
                .wrap_err("ESTIMATED_GAS_COST_OF_WITHDRAW must be a valid u64")?,
            Err(_) => default_estimated_gas_cost_of_withdraw(),
        };

        let config = BridgeConfig {
            authorities,
            required_signatures,
            estimated_gas_cost_of_withdraw,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.authorities.is_empty() {
            return Err(eyre!("authorities cannot be empty"));
        }

        if self.required_signatures == 0 {
            return Err(eyre!("required_signatures must be at least 1"));
        }

        if self.required_signatures > self.authorities.len() {
            return Err(eyre!(
                "required_signatures ({}) cannot exceed the number of authorities ({})",
                self.required_signatures,
                self.authorities.len()
            ));
        }

        for (i, authority) in self.authorities.iter().enumerate() {
            if *authority == Address::ZERO {
                return Err(eyre!("authority {} is the zero address", i));
            }
            if self.authorities[..i].contains(authority) {
                return Err(eyre!("authority {} is listed more than once", authority));
            }
        }

        Ok(())
    }

    /// Build the authority registry described by this configuration.
    pub fn registry(&self) -> Result<AuthorityRegistry> {
        self.validate()?;
        AuthorityRegistry::new(self.authorities.clone(), self.required_signatures)
            .wrap_err("Failed to build authority registry")
    }
}

/// Parse a comma-separated list of 0x-prefixed addresses.
///
/// Whitespace around entries is ignored, as are empty entries.
pub fn parse_authorities(raw: &str) -> Result<Vec<Address>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.len() != 42 || !s.starts_with("0x") {
                return Err(eyre!(
                    "authority {} must be a valid hex address (42 chars with 0x prefix)",
                    s
                ));
            }
            s.parse::<Address>()
                .wrap_err_with(|| format!("Invalid authority address: {}", s))
        })
        .collect()
}
