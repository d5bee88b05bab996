//! Set scan cursor
//!
//! A scan walks a set in steps. Each step returns a batch of members and a
//! [`ScanCursor`] to resume from. The cursor is an opaque token: callers
//! store it, hand it back, and compare it against [`ScanCursor::START`] to
//! learn whether the walk is finished. It is not an offset and carries no
//! arithmetic meaning.
//!
//! On the wire the start sentinel is `"0"`; any other token is produced by
//! the store and must be passed back unchanged.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::glob::Glob;

const START_TOKEN: &str = "0";
const RESUME_PREFIX: char = '1';

/// Default number of members examined per scan step
pub const DEFAULT_SCAN_COUNT: usize = 10;

/// Opaque continuation token for set scans
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ScanCursor(Option<String>);

impl ScanCursor {
    /// Start of a scan; also returned once a scan is exhausted
    pub const START: ScanCursor = ScanCursor(None);

    pub fn is_start(&self) -> bool {
        self.0.is_none()
    }

    /// Resume strictly after `member`
    pub(crate) fn after(member: impl Into<String>) -> Self {
        Self(Some(member.into()))
    }

    pub(crate) fn position(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for ScanCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str(START_TOKEN),
            Some(member) => write!(f, "{}{}", RESUME_PREFIX, URL_SAFE_NO_PAD.encode(member)),
        }
    }
}

impl FromStr for ScanCursor {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == START_TOKEN {
            return Ok(Self::START);
        }

        let encoded = s
            .strip_prefix(RESUME_PREFIX)
            .ok_or_else(|| StoreError::InvalidCursor(s.to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| StoreError::InvalidCursor(s.to_string()))?;
        let member =
            String::from_utf8(bytes).map_err(|_| StoreError::InvalidCursor(s.to_string()))?;

        Ok(Self::after(member))
    }
}

impl From<ScanCursor> for String {
    fn from(cursor: ScanCursor) -> Self {
        cursor.to_string()
    }
}

impl TryFrom<String> for ScanCursor {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Scan step parameters
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Only members matching this pattern are returned
    pub pattern: Glob,
    /// Hint for how many members to examine in this step
    pub count: usize,
}

impl ScanOptions {
    pub fn new(count: usize) -> Self {
        Self {
            pattern: Glob::any(),
            count,
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Glob::new(pattern);
        self
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new(DEFAULT_SCAN_COUNT)
    }
}

/// One scan step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub members: Vec<String>,
    pub cursor: ScanCursor,
}

impl ScanPage {
    /// No further steps are needed
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_token() {
        assert_eq!(ScanCursor::START.to_string(), "0");
        assert_eq!("0".parse::<ScanCursor>().unwrap(), ScanCursor::START);
        assert!(ScanCursor::default().is_start());
    }

    #[test]
    fn test_resume_token_is_not_start() {
        let cursor = ScanCursor::after("order:17");
        let token = cursor.to_string();

        assert_ne!(token, "0");
        assert!(!cursor.is_start());
        assert_eq!(token.parse::<ScanCursor>().unwrap(), cursor);
    }

    #[test]
    fn test_empty_member_is_distinct_from_start() {
        let cursor = ScanCursor::after("");
        assert_ne!(cursor, ScanCursor::START);
        assert_eq!(cursor.to_string().parse::<ScanCursor>().unwrap(), cursor);
    }

    #[test]
    fn test_rejects_foreign_tokens() {
        for token in ["", "42", "1!!!", "abc"] {
            assert!(
                matches!(token.parse::<ScanCursor>(), Err(StoreError::InvalidCursor(_))),
                "token {:?} should be rejected",
                token
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ScanCursor::START).unwrap();
        assert_eq!(json, "\"0\"");

        let cursor = ScanCursor::after("order:3");
        let json = serde_json::to_string(&cursor).unwrap();
        let back: ScanCursor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cursor);

        assert!(serde_json::from_str::<ScanCursor>("\"nope\"").is_err());
    }

    #[test]
    fn test_default_options_match_everything() {
        let options = ScanOptions::default();
        assert_eq!(options.count, DEFAULT_SCAN_COUNT);
        assert!(options.pattern.matches("anything"));
    }
}
