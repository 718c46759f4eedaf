use rust_decimal::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use crate::gains::DEFAULT_TAX_RATE;
use crate::method::Method;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub method: Method,
    pub tax_rate: Decimal,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            method: Method::Acb,
            tax_rate: DEFAULT_TAX_RATE,
            currency: "EUR".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let method = match env_map.get("CAPGAINS_METHOD") {
            Some(s) => parse_method("CAPGAINS_METHOD", s)?,
            None => Method::Acb,
        };

        let tax_rate = match env_map.get("CAPGAINS_TAX_RATE") {
            Some(s) => parse_tax_rate("CAPGAINS_TAX_RATE", s)?,
            None => DEFAULT_TAX_RATE,
        };

        let currency = env_map
            .get("CAPGAINS_CURRENCY")
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "EUR".to_string());

        Ok(Config {
            method,
            tax_rate,
            currency,
        })
    }
}

pub fn parse_method(key: &str, value: &str) -> Result<Method, ConfigError> {
    value
        .parse::<Method>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

/// A fraction in `[0, 1]`, e.g. `0.275`.
pub fn parse_tax_rate(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    let rate = Decimal::from_str(value.trim()).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a decimal number".to_string())
    })?;
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be between 0 and 1, got {}", rate),
        ));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.tax_rate, dec!(0.275));
    }

    #[test]
    fn test_overrides() {
        let mut env_map = HashMap::new();
        env_map.insert("CAPGAINS_METHOD".to_string(), "hifo".to_string());
        env_map.insert("CAPGAINS_TAX_RATE".to_string(), "0.26".to_string());
        env_map.insert("CAPGAINS_CURRENCY".to_string(), "usd".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.method, Method::Hifo);
        assert_eq!(config.tax_rate, dec!(0.26));
        assert_eq!(config.currency, "USD");
    }

    #[test]
    fn test_invalid_method() {
        let mut env_map = HashMap::new();
        env_map.insert("CAPGAINS_METHOD".to_string(), "average".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, msg)) => {
                assert_eq!(k, "CAPGAINS_METHOD");
                assert!(msg.contains("average"));
            }
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_tax_rate_out_of_range() {
        let mut env_map = HashMap::new();
        env_map.insert("CAPGAINS_TAX_RATE".to_string(), "27.5".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CAPGAINS_TAX_RATE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_tax_rate_not_a_number() {
        assert!(parse_tax_rate("CAPGAINS_TAX_RATE", "abc").is_err());
    }
}
