use super::{Config, ConfigError};

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A flag file is the credential; without it the logger cannot start
        match &self.flags_file {
            None => {
                return Err(ConfigError::InvalidConfig(
                    "Flags file is required (--flags-file or FLAGS_FILE)".to_string(),
                ));
            }
            Some(path) if path.as_os_str().is_empty() => {
                return Err(ConfigError::InvalidConfig("Flags file path is empty".to_string()));
            }
            Some(_) => {}
        }

        if self.init_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "Flag client init timeout must be greater than 0".to_string(),
            ));
        }

        if self.bootstrap_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "SDK log level bootstrap timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(key) = &self.sdk_log_level_flag_key
            && key.trim().is_empty()
        {
            return Err(ConfigError::InvalidConfig(
                "SDK log level flag key must not be blank".to_string(),
            ));
        }

        // Fails early on a malformed --context rather than at first log call
        self.evaluation_context()?;

        Ok(())
    }
}
