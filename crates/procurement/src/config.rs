//! Engine configuration.

use serde::{Deserialize, Serialize};

use procura_core::{DomainError, DomainResult};
use procura_tax::RoundingPolicy;

pub const ENV_TAX_ROUNDING: &str = "PROCURA_TAX_ROUNDING";
pub const ENV_PRICE_DIGITS: &str = "PROCURA_PRICE_DIGITS";
pub const ENV_SALE_PRICELIST: &str = "PROCURA_SALE_PRICELIST";

/// Settings shared by every document the engine touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tax rounding policy applied to document totals.
    pub rounding: RoundingPolicy,
    /// Minimum decimal digits of unit prices ("Product Price" precision).
    pub product_price_digits: u32,
    /// Pricelist stamped on sale orders derived from a request.
    pub sale_pricelist: Option<String>,
    /// Note given to documents created without one.
    pub placeholder_note: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rounding: RoundingPolicy::RoundPerLine,
            product_price_digits: 2,
            sale_pricelist: None,
            placeholder_note: "New Form".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_rounding(mut self, rounding: RoundingPolicy) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_price_digits(mut self, digits: u32) -> Self {
        self.product_price_digits = digits;
        self
    }

    pub fn with_sale_pricelist(mut self, pricelist: impl Into<String>) -> Self {
        self.sale_pricelist = Some(pricelist.into());
        self
    }

    /// Defaults overridden by `PROCURA_*` environment variables.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_TAX_ROUNDING) {
            config.rounding = raw
                .parse::<RoundingPolicy>()
                .map_err(|e| DomainError::validation(format!("{ENV_TAX_ROUNDING}: {e}")))?;
        }

        if let Some(raw) = lookup(ENV_PRICE_DIGITS) {
            config.product_price_digits = raw.trim().parse::<u32>().map_err(|_| {
                DomainError::validation(format!(
                    "{ENV_PRICE_DIGITS} must be a non-negative integer, got {raw:?}"
                ))
            })?;
            if config.product_price_digits > 28 {
                return Err(DomainError::validation(format!(
                    "{ENV_PRICE_DIGITS} must be at most 28"
                )));
            }
        }

        if let Some(raw) = lookup(ENV_SALE_PRICELIST) {
            let name = raw.trim();
            config.sale_pricelist = (!name.is_empty()).then(|| name.to_string());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.placeholder_note, "New Form");
    }

    #[test]
    fn reads_every_variable() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_TAX_ROUNDING, "round_globally"),
            (ENV_PRICE_DIGITS, "4"),
            (ENV_SALE_PRICELIST, "Default AED pricelist"),
        ]))
        .unwrap();

        assert_eq!(config.rounding, RoundingPolicy::RoundGlobally);
        assert_eq!(config.product_price_digits, 4);
        assert_eq!(config.sale_pricelist.as_deref(), Some("Default AED pricelist"));
    }

    #[test]
    fn invalid_values_are_validation_errors() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_TAX_ROUNDING, "sometimes")])).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains(ENV_TAX_ROUNDING) => {}
            _ => panic!("Expected Validation error naming the variable"),
        }

        let err = EngineConfig::from_lookup(lookup(&[(ENV_PRICE_DIGITS, "-1")])).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"rounding":"round_globally"}"#).unwrap();
        assert_eq!(config.rounding, RoundingPolicy::RoundGlobally);
        assert_eq!(config.product_price_digits, 2);
    }
}
