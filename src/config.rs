use crate::error::ValidationError;
use std::time::Duration;

/// Smallest accepted size limit, in GB
pub const MIN_LIMIT_GB: u64 = 1;
/// Largest accepted size limit, in GB
pub const MAX_LIMIT_GB: u64 = 10;
/// Delay between the end of one poll cycle and the start of the next
pub const POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Settings for one monitoring session.
///
/// Built from the raw text of the input field when monitoring starts and
/// never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub size_limit_gb: u64,
}

impl Configuration {
    /// Parse and validate the raw input field text
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let value: i64 = trimmed.parse().map_err(|_| ValidationError::NotANumber {
            input: trimmed.to_string(),
        })?;

        if value < MIN_LIMIT_GB as i64 || value > MAX_LIMIT_GB as i64 {
            return Err(ValidationError::OutOfRange { value });
        }

        Ok(Self {
            size_limit_gb: value as u64,
        })
    }

    /// A bin at exactly the limit is over it
    pub fn exceeded_by(&self, size_gb: u64) -> bool {
        size_gb >= self.size_limit_gb
    }
}
