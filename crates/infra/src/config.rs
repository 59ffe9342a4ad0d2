//! Server configuration loaded from the environment.

use std::net::SocketAddr;

use curvebook_core::AggregateId;
use curvebook_ledger::LedgerId;

pub const BIND_ADDR_VAR: &str = "CURVEBOOK_BIND_ADDR";
pub const LEDGER_ID_VAR: &str = "CURVEBOOK_LEDGER_ID";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not a socket address: {value}")]
    InvalidBindAddr { var: &'static str, value: String },
    #[error("{var} is not a UUID: {value}")]
    InvalidLedgerId { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub ledger_id: LedgerId,
}

impl ServerConfig {
    /// Read `CURVEBOOK_BIND_ADDR` and `CURVEBOOK_LEDGER_ID`.
    ///
    /// Unset variables fall back to defaults; set but malformed values are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`ServerConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBindAddr {
                var: BIND_ADDR_VAR,
                value: raw_addr.clone(),
            })?;

        let ledger_id = match lookup(LEDGER_ID_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<AggregateId>()
                .map(LedgerId::new)
                .map_err(|_| ConfigError::InvalidLedgerId {
                    var: LEDGER_ID_VAR,
                    value: raw.clone(),
                })?,
            None => LedgerId::new(AggregateId::new()),
        };

        Ok(Self {
            bind_addr,
            ledger_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
    }

    #[test]
    fn reads_explicit_values() {
        let id = "01890a5d-ac96-774b-bcce-b302099a8057";
        let config = ServerConfig::from_lookup(lookup(&[
            (BIND_ADDR_VAR, "127.0.0.1:9000"),
            (LEDGER_ID_VAR, id),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.ledger_id.to_string(), id);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[(BIND_ADDR_VAR, "localhost")])),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[(LEDGER_ID_VAR, "ledger-1")])),
            Err(ConfigError::InvalidLedgerId { .. })
        ));
    }
}
