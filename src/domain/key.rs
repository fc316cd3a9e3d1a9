//! Rate limit key composition.
//!
//! A key identifies one subject performing one action, e.g.
//! `ratelimit:login:203.0.113.4`. Keys for different actions or different
//! subjects never collide.

use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Prefix shared by every key produced here.
pub const KEY_PREFIX: &str = "ratelimit";

const SEPARATOR: char = ':';

/// Error returned when a key cannot be composed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The action name is empty
    #[error("action name must not be empty")]
    EmptyAction,
    /// The subject identifier is empty
    #[error("subject identifier must not be empty")]
    EmptySubject,
    /// The action name contains the `:` separator
    #[error("action name {0:?} must not contain ':'")]
    SeparatorInAction(String),
}

/// An opaque, deterministic rate limit key.
///
/// The action segment may not contain `:`; the subject may (IPv6 addresses
/// do), and since it is always the last segment the composition stays
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    /// Compose a key from an action name and a subject identifier.
    ///
    /// # Errors
    /// Returns `KeyError` if either part is empty or the action contains `:`.
    ///
    /// # Example
    /// ```
    /// use tavern_core::RateLimitKey;
    ///
    /// let key = RateLimitKey::new("login", "1.2.3.4").unwrap();
    /// assert_eq!(key.as_str(), "ratelimit:login:1.2.3.4");
    /// ```
    pub fn new(action: &str, subject: &str) -> Result<Self, KeyError> {
        if action.is_empty() {
            return Err(KeyError::EmptyAction);
        }
        if subject.is_empty() {
            return Err(KeyError::EmptySubject);
        }
        if action.contains(SEPARATOR) {
            return Err(KeyError::SeparatorInAction(action.to_string()));
        }

        Ok(Self(format!(
            "{KEY_PREFIX}{SEPARATOR}{action}{SEPARATOR}{subject}"
        )))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RateLimitKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RateLimitKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<RateLimitKey> for String {
    fn from(key: RateLimitKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition() {
        let key = RateLimitKey::new("login", "203.0.113.4").unwrap();
        assert_eq!(key.as_str(), "ratelimit:login:203.0.113.4");
        assert_eq!(key.to_string(), "ratelimit:login:203.0.113.4");
    }

    #[test]
    fn test_deterministic() {
        let a = RateLimitKey::new("checkout", "user-42").unwrap();
        let b = RateLimitKey::new("checkout", "user-42").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_actions_do_not_collide() {
        let a = RateLimitKey::new("login", "1.2.3.4").unwrap();
        let b = RateLimitKey::new("checkout", "1.2.3.4").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_different_subjects_do_not_collide() {
        let a = RateLimitKey::new("login", "1.2.3.4").unwrap();
        let b = RateLimitKey::new("login", "1.2.3.5").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_separator_in_action_rejected() {
        // "a:b" + "c" would otherwise equal "a" + "b:c"
        assert_eq!(
            RateLimitKey::new("a:b", "c"),
            Err(KeyError::SeparatorInAction("a:b".to_string()))
        );
        assert!(RateLimitKey::new("a", "b:c").is_ok());
    }

    #[test]
    fn test_ipv6_subject() {
        let key = RateLimitKey::new("login", "2001:db8::1").unwrap();
        assert_eq!(key.as_str(), "ratelimit:login:2001:db8::1");
    }

    #[test]
    fn test_empty_parts_rejected() {
        assert_eq!(RateLimitKey::new("", "x"), Err(KeyError::EmptyAction));
        assert_eq!(RateLimitKey::new("login", ""), Err(KeyError::EmptySubject));
    }
}
