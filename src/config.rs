//! Controller-wide configuration.

use pg1000_input::{AnalogConfig, DigitalConfig};
use pg1000_midi::ProtocolConfig;
use pg1000_params::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Front-panel timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long MENU must be held to open the menu.
    pub long_press_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            long_press_ms: 1000,
        }
    }
}

impl UiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.long_press_ms == 0 {
            return Err(Error::InvalidConfig(
                "long_press_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Every subsystem's settings. Missing sections fall back to their defaults.
///
/// ```ignore
/// let config = ControllerConfig::from_json_str(r#"{ "protocol": { "channel": 3 } }"#)?;
/// assert_eq!(config.protocol.channel, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub analog: AnalogConfig,
    pub digital: DigitalConfig,
    pub registry: RegistryConfig,
    pub protocol: ProtocolConfig,
    pub ui: UiConfig,
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.analog.validate()?;
        self.digital.validate()?;
        self.registry.validate()?;
        self.protocol.validate()?;
        self.ui.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pg1000_midi::ReceiveMode;

    #[test]
    fn test_defaults_validate() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.analog.channel_count(), 56);
        assert_eq!(config.protocol.manufacturer_id, 0x41);
        assert_eq!(config.ui.long_press_ms, 1000);
    }

    #[test]
    fn test_partial_json() {
        let config = ControllerConfig::from_json_str(
            r#"{ "protocol": { "channel": 3, "receive": "Interrupt" }, "digital": { "debounce_ms": 8 } }"#,
        )
        .unwrap();
        assert_eq!(config.protocol.channel, 3);
        assert_eq!(config.protocol.receive, ReceiveMode::Interrupt);
        assert_eq!(config.protocol.rate_limit_ms, 10);
        assert_eq!(config.digital.debounce_ms, 8);
        assert_eq!(config.digital.slow_blink_ms, 500);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ControllerConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(ControllerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_sections_rejected() {
        assert!(matches!(
            ControllerConfig::from_json_str(r#"{ "protocol": { "channel": 17 } }"#),
            Err(Error::Midi(_))
        ));
        assert!(matches!(
            ControllerConfig::from_json_str(r#"{ "ui": { "long_press_ms": 0 } }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            ControllerConfig::from_json_str("{ not json"),
            Err(Error::Json(_))
        ));
    }
}
