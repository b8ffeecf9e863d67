// Manager configuration

use crate::error::{DispatchError, DispatchResult};
use crate::manager::CoordinatorType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings fixed for the lifetime of one `CommandManager`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Execution strategy, chosen once at construction
    pub coordinator: CoordinatorType,
    /// Prefix of long flags, `--silent`
    pub flag_prefix: String,
    /// Prefix of short flag aliases, `-s`
    pub short_flag_prefix: String,
    /// Log every completed dispatch at info level
    pub log_executions: bool,
    /// Argument id of the page number in generated help syntaxes
    pub help_page_argument: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            coordinator: CoordinatorType::Sync,
            flag_prefix: "--".to_string(),
            short_flag_prefix: "-".to_string(),
            log_executions: true,
            help_page_argument: "page".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> DispatchResult<Self> {
        let config: ManagerConfig = toml::from_str(content)
            .map_err(|e| DispatchError::config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml_string(&self) -> DispatchResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DispatchError::config(format!("Failed to serialize to TOML: {}", e)))
    }

    /// Load configuration from a file
    pub async fn load(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DispatchError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a file, creating parent directories
    pub async fn save(&self, path: impl AsRef<Path>) -> DispatchResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, self.to_toml_string()?).await?;
        Ok(())
    }

    pub fn validate(&self) -> DispatchResult<()> {
        if self.flag_prefix.is_empty() || self.short_flag_prefix.is_empty() {
            return Err(DispatchError::config("flag prefixes must not be empty"));
        }

        if self.flag_prefix == self.short_flag_prefix {
            return Err(DispatchError::config(format!(
                "flag_prefix and short_flag_prefix are both '{}'",
                self.flag_prefix
            )));
        }

        if self.help_page_argument.trim().is_empty() {
            return Err(DispatchError::config("help_page_argument must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ManagerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.coordinator, CoordinatorType::Sync);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ManagerConfig::from_toml_str("coordinator = \"async\"\n").unwrap();
        assert_eq!(config.coordinator, CoordinatorType::Async);
        assert_eq!(config.flag_prefix, "--");
        assert!(config.log_executions);
    }

    #[test]
    fn test_equal_prefixes_rejected() {
        let result = ManagerConfig::from_toml_str("flag_prefix = \"-\"\nshort_flag_prefix = \"-\"\n");
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }
}
