use crate::application::retry::RetryPolicy;
use crate::error::{LedgerError, Result};
use crate::infrastructure::codec::{MasterKey, TokenCodec};
use rust_decimal::Decimal;

/// Runtime settings for a `CustodyEngine` and the batch surface in front of it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    /// How many withdrawal requests an account statement shows.
    pub recent_limit: usize,
    /// Smallest withdrawal the batch surface accepts. The core itself only
    /// requires a positive amount.
    pub min_withdrawal: Decimal,
    /// Enables envelope mode in the token codec.
    pub master_key: Option<MasterKey>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            recent_limit: 5,
            min_withdrawal: Decimal::TEN,
            master_key: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(LedgerError::ValidationError(
                "At least one commit attempt is required".to_string(),
            ));
        }
        if self.recent_limit == 0 {
            return Err(LedgerError::ValidationError(
                "Recent withdrawal limit must be positive".to_string(),
            ));
        }
        if self.min_withdrawal.is_sign_negative() {
            return Err(LedgerError::ValidationError(
                "Minimum withdrawal cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn codec(&self) -> TokenCodec {
        match &self.master_key {
            Some(key) => TokenCodec::enveloped(key.clone()),
            None => TokenCodec::embedded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_withdrawal, dec!(10));
        assert!(!config.codec().is_enveloped());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut config = EngineConfig::default();
        config.recent_limit = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.min_withdrawal = dec!(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_master_key_enables_envelope_mode() {
        let config = EngineConfig {
            master_key: Some(MasterKey::generate()),
            ..EngineConfig::default()
        };
        assert!(config.codec().is_enveloped());
    }
}
