//! Resolved model configuration.
//!
//! [`ModelConfig`] replaces any notion of a global module list: the builder
//! receives it explicitly and activates components from its [`ModuleConfig`].
//! It is read from TOML and every field has a default, so partial files are
//! accepted:
//!
//! ```toml
//! interest_rate = 0.05
//!
//! [modules]
//! unserved_load = false
//! ```

use serde::{Deserialize, Serialize};

use crate::{CxpError, CxpResult};

/// Top-level model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Real discount rate used for capital recovery factors.
    pub interest_rate: f64,

    /// Magnitudes strictly below this are floored to zero.
    pub epsilon: f64,

    /// Which optional model components are active.
    pub modules: ModuleConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            interest_rate: 0.07,
            epsilon: 1e-6,
            modules: ModuleConfig::default(),
        }
    }
}

/// Optional model components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Distributed sub-nodes coupled through local T&D capacity.
    pub local_td: bool,

    /// Unserved-load slack with a per-MWh penalty.
    pub unserved_load: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            local_td: true,
            unserved_load: true,
        }
    }
}

impl ModelConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> CxpResult<Self> {
        let config: ModelConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> CxpResult<String> {
        toml::to_string_pretty(self).map_err(|e| CxpError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> CxpResult<()> {
        if !self.interest_rate.is_finite() || self.interest_rate < 0.0 {
            return Err(CxpError::Config(format!(
                "interest_rate must be a non-negative number, got {}",
                self.interest_rate
            )));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(CxpError::Config(format!(
                "epsilon must be a non-negative number, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }

    /// Floor `value` to zero when its magnitude is below epsilon.
    ///
    /// Returns the value to use and whether flooring happened.
    pub fn floor(&self, value: f64) -> (f64, bool) {
        if value != 0.0 && value.abs() < self.epsilon {
            (0.0, true)
        } else {
            (value, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.interest_rate, 0.07);
        assert_eq!(config.epsilon, 1e-6);
        assert!(config.modules.local_td);
        assert!(config.modules.unserved_load);
    }

    #[test]
    fn test_partial_toml() {
        let config = ModelConfig::from_toml_str(
            r#"
            interest_rate = 0.05

            [modules]
            unserved_load = false
            "#,
        )
        .unwrap();
        assert_eq!(config.interest_rate, 0.05);
        assert_eq!(config.epsilon, 1e-6);
        assert!(config.modules.local_td);
        assert!(!config.modules.unserved_load);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ModelConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ModelConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_negative_rate_rejected() {
        let err = ModelConfig::from_toml_str("interest_rate = -0.01").unwrap_err();
        assert!(matches!(err, CxpError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ModelConfig::from_toml_str("interest_rate = [").unwrap_err();
        assert!(matches!(err, CxpError::Parse(_)));
    }

    #[test]
    fn test_floor() {
        let config = ModelConfig::default();
        assert_eq!(config.floor(1e-9), (0.0, true));
        assert_eq!(config.floor(0.0), (0.0, false));
        assert_eq!(config.floor(5.0), (5.0, false));
    }
}
