use std::time::Duration;

use super::error::{DbError, Result};

/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool may hold
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;

/// Default number of failed lock attempts before a transaction is aborted
pub const DEFAULT_LOCK_RETRY_LIMIT: u32 = 20;

/// Default time a blocked lock request waits between attempts
pub const DEFAULT_LOCK_WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Lock manager tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Failed attempts allowed before the request aborts.
    pub retry_limit: u32,
    /// How long one attempt waits for a release before retrying.
    pub wait_interval: Duration,
}

impl LockConfig {
    /// Upper bound on how long a single blocked request can wait.
    pub fn max_wait(&self) -> Duration {
        self.wait_interval * self.retry_limit
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_LOCK_RETRY_LIMIT,
            wait_interval: DEFAULT_LOCK_WAIT_INTERVAL,
        }
    }
}

/// Configuration for a database context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Maximum number of resident pages in the buffer pool.
    pub buffer_pool_pages: usize,
    /// Lock acquisition settings.
    pub lock: LockConfig,
}

impl DatabaseConfig {
    /// Creates a configuration with the given buffer pool capacity.
    pub fn new(buffer_pool_pages: usize) -> Self {
        Self {
            buffer_pool_pages,
            lock: LockConfig::default(),
        }
    }

    /// Sets the lock retry limit.
    pub fn with_lock_retry_limit(mut self, retry_limit: u32) -> Self {
        self.lock.retry_limit = retry_limit;
        self
    }

    /// Sets the interval between lock attempts.
    pub fn with_lock_wait_interval(mut self, wait_interval: Duration) -> Self {
        self.lock.wait_interval = wait_interval;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.buffer_pool_pages == 0 {
            return Err(DbError::InvalidConfig("buffer_pool_pages must be > 0"));
        }
        if self.lock.wait_interval.is_zero() {
            return Err(DbError::InvalidConfig("lock wait_interval must be > 0"));
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_POOL_PAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.buffer_pool_pages, 50);
        assert_eq!(config.lock.retry_limit, 20);
        assert_eq!(config.lock.wait_interval, Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DatabaseConfig::new(4)
            .with_lock_retry_limit(3)
            .with_lock_wait_interval(Duration::from_millis(5));

        assert_eq!(config.buffer_pool_pages, 4);
        assert_eq!(config.lock.retry_limit, 3);
        assert_eq!(config.lock.max_wait(), Duration::from_millis(15));
    }

    #[test]
    fn test_validation() {
        assert!(DatabaseConfig::new(0).validate().is_err());
        assert!(DatabaseConfig::new(1)
            .with_lock_wait_interval(Duration::ZERO)
            .validate()
            .is_err());
    }
}
