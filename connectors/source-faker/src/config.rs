use serde::Deserialize;
use shift_sdk::prelude::ConnectorError;

/// Upper bound on generated purchases per user.
pub const MAX_PURCHASES_PER_USER: u64 = 100;

/// Faker connection config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Number of users to generate.
    #[serde(default = "default_count")]
    pub count: u64,
    /// RNG seed; the same seed always produces the same rows.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_purchases_per_user")]
    pub purchases_per_user: u64,
    /// Emit a state update after this many records of an incremental stream.
    #[serde(default = "default_records_per_state")]
    pub records_per_state: u64,
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
}

fn default_count() -> u64 {
    1000
}

fn default_purchases_per_user() -> u64 {
    2
}

fn default_records_per_state() -> u64 {
    500
}

fn default_check_timeout_ms() -> u64 {
    5_000
}

impl Config {
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.purchases_per_user > MAX_PURCHASES_PER_USER {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                format!(
                    "Invalid purchases_per_user: {}. Must be at most {}",
                    self.purchases_per_user, MAX_PURCHASES_PER_USER
                ),
            ));
        }
        if self.records_per_state == 0 {
            return Err(ConnectorError::config(
                "INVALID_CONFIG",
                "records_per_state must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn purchase_count(&self) -> u64 {
        self.count * self.purchases_per_user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.count, 1000);
        assert_eq!(config.purchase_count(), 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn too_many_purchases_rejected() {
        let config: Config = serde_json::from_str(r#"{"purchases_per_user": 101}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code, "INVALID_CONFIG");
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"rows": 5}"#).is_err());
    }
}
