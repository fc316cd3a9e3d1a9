//! Fixed-window counters for attempt throttling.
//!
//! A window counts attempts for one subject until its reset time passes, then
//! starts over. This module holds the pure state machine; the concurrent map
//! and the clock live in the application layer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Message returned on denial when the config carries none.
pub const DEFAULT_DENIAL_MESSAGE: &str = "Too many requests. Please try again later.";

/// Error returned when a rate limit config is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_attempts` must be greater than zero
    #[error("max_attempts must be greater than 0")]
    ZeroMaxAttempts,
    /// `window_seconds` must be greater than zero
    #[error("window_seconds must be greater than 0")]
    ZeroWindow,
}

/// Limits for one class of action (login, checkout, PDF export, ...).
///
/// Immutable once built. Use one of the presets or [`RateLimitConfig::new`].
///
/// # Example
/// ```
/// use tavern_core::RateLimitConfig;
///
/// let config = RateLimitConfig::new(5, 900)
///     .unwrap()
///     .with_error_message("Too many login attempts.");
/// assert_eq!(config.max_attempts(), 5);
/// assert_eq!(config.window_millis(), 900_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRateLimitConfig", rename_all = "camelCase")]
pub struct RateLimitConfig {
    max_attempts: u32,
    window_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRateLimitConfig {
    max_attempts: u32,
    window_seconds: u64,
    #[serde(default)]
    error_message: Option<String>,
}

impl TryFrom<RawRateLimitConfig> for RateLimitConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRateLimitConfig) -> Result<Self, Self::Error> {
        let config = Self::new(raw.max_attempts, raw.window_seconds)?;
        Ok(match raw.error_message {
            Some(message) => config.with_error_message(message),
            None => config,
        })
    }
}

impl RateLimitConfig {
    /// Create a config allowing `max_attempts` per `window_seconds`.
    ///
    /// # Errors
    /// Returns `ConfigError` if either value is zero.
    pub fn new(max_attempts: u32, window_seconds: u64) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::ZeroMaxAttempts);
        }
        if window_seconds == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self {
            max_attempts,
            window_seconds,
            error_message: None,
        })
    }

    /// Set the message reported when an attempt is denied.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// 5 attempts per 15 minutes.
    pub fn login() -> Self {
        Self::preset(
            5,
            15 * 60,
            "Too many login attempts. Please try again in 15 minutes.",
        )
    }

    /// 3 accounts per hour.
    pub fn register() -> Self {
        Self::preset(
            3,
            60 * 60,
            "Too many registration attempts. Please try again later.",
        )
    }

    /// 3 reset emails per hour.
    pub fn password_reset() -> Self {
        Self::preset(
            3,
            60 * 60,
            "Too many password reset requests. Please try again in an hour.",
        )
    }

    /// 10 checkout attempts per minute.
    pub fn checkout() -> Self {
        Self::preset(
            10,
            60,
            "Too many checkout attempts. Please wait a moment and try again.",
        )
    }

    /// 10 character sheet exports per minute.
    pub fn pdf_export() -> Self {
        Self::preset(
            10,
            60,
            "Too many PDF exports. Please wait a minute before generating another.",
        )
    }

    /// 5 contact form submissions per hour.
    pub fn contact() -> Self {
        Self::preset(
            5,
            60 * 60,
            "Too many messages sent. Please try again later.",
        )
    }

    /// 100 API calls per minute.
    pub fn api() -> Self {
        Self::preset(100, 60, "API rate limit exceeded. Please slow down.")
    }

    fn preset(max_attempts: u32, window_seconds: u64, message: &str) -> Self {
        Self {
            max_attempts,
            window_seconds,
            error_message: Some(message.to_string()),
        }
    }

    /// Maximum attempts per window.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Window length in seconds.
    pub fn window_seconds(&self) -> u64 {
        self.window_seconds
    }

    /// Window length in milliseconds.
    pub fn window_millis(&self) -> u64 {
        self.window_seconds.saturating_mul(1000)
    }

    /// The configured denial message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The denial message, falling back to [`DEFAULT_DENIAL_MESSAGE`].
    pub fn denial_message(&self) -> &str {
        self.error_message
            .as_deref()
            .unwrap_or(DEFAULT_DENIAL_MESSAGE)
    }
}

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    count: u32,
    reset_time: u64,
}

impl WindowEntry {
    /// An entry with no recorded attempts. Already expired at `now`, so the
    /// first `register_attempt` opens a fresh window.
    pub fn vacant(now: u64) -> Self {
        Self {
            count: 0,
            reset_time: now,
        }
    }

    /// Attempts recorded in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Epoch milliseconds at which the window expires.
    pub fn reset_time(&self) -> u64 {
        self.reset_time
    }

    /// True once `now` has reached the reset time.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.reset_time
    }

    /// Record an attempt at `now` and decide whether it may proceed.
    ///
    /// An expired window is replaced, never merged.
    pub fn register_attempt(&mut self, now: u64, config: &RateLimitConfig) -> RateLimitResult {
        if self.is_expired(now) {
            self.count = 1;
            self.reset_time = now.saturating_add(config.window_millis());
            return RateLimitResult::allowed(config.max_attempts - 1, self.reset_time);
        }

        if self.count >= config.max_attempts {
            return RateLimitResult::denied(self.reset_time, config.denial_message());
        }

        self.count += 1;
        RateLimitResult::allowed(config.max_attempts - self.count, self.reset_time)
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    /// Whether the action may proceed
    pub success: bool,
    /// Attempts left in the current window
    pub remaining: u32,
    /// Epoch milliseconds at which the window resets
    pub reset_time: u64,
    /// Denial message, present only when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RateLimitResult {
    fn allowed(remaining: u32, reset_time: u64) -> Self {
        Self {
            success: true,
            remaining,
            reset_time,
            error_message: None,
        }
    }

    fn denied(reset_time: u64, message: &str) -> Self {
        Self {
            success: false,
            remaining: 0,
            reset_time,
            error_message: Some(message.to_string()),
        }
    }

    /// Check if the action was allowed.
    pub fn is_allowed(&self) -> bool {
        self.success
    }

    /// Check if the action was denied.
    pub fn is_denied(&self) -> bool {
        !self.success
    }

    /// Time left until the window resets, zero if it already has.
    pub fn retry_after(&self, now: u64) -> Duration {
        Duration::from_millis(self.reset_time.saturating_sub(now))
    }
}
