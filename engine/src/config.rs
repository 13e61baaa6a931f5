//! Engine configuration.

use std::time::Duration;

/// Main engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bounded wait for one account row lock.
    pub lock_wait: Duration,
    /// Journal capacity across both logs.
    pub max_journal_rows: usize,
    /// Page size used when the caller does not pick one.
    pub default_page_size: usize,
    /// Largest page size any caller can request.
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(250),
            max_journal_rows: 1_000_000,
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ms) = std::env::var("CUSTODIA_LOCK_WAIT_MS") {
            if let Ok(ms) = ms.parse() {
                config.lock_wait = Duration::from_millis(ms);
            }
        }

        if let Ok(rows) = std::env::var("CUSTODIA_MAX_JOURNAL_ROWS") {
            if let Ok(rows) = rows.parse() {
                config.max_journal_rows = rows;
            }
        }

        if let Ok(size) = std::env::var("CUSTODIA_DEFAULT_PAGE_SIZE") {
            if let Ok(size) = size.parse() {
                config.default_page_size = size;
            }
        }

        if let Ok(size) = std::env::var("CUSTODIA_MAX_PAGE_SIZE") {
            if let Ok(size) = size.parse() {
                config.max_page_size = size;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_wait.is_zero() {
            return Err("Lock wait cannot be zero".to_string());
        }

        if self.max_journal_rows == 0 {
            return Err("Journal capacity cannot be zero".to_string());
        }

        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err("Page sizes cannot be zero".to_string());
        }

        if self.default_page_size > self.max_page_size {
            return Err("Default page size cannot exceed max page size".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = EngineConfig::default();
        config.default_page_size = 1000;
        config.max_page_size = 100;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.lock_wait = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
