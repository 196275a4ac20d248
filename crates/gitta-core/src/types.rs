use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// SprintStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a sprint. Each variant has exactly one folder prefix
/// character and one sidecar token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    Active,
    Ready,
    Planning,
    Archived,
}

impl SprintStatus {
    pub fn all() -> &'static [SprintStatus] {
        &[
            SprintStatus::Active,
            SprintStatus::Ready,
            SprintStatus::Planning,
            SprintStatus::Archived,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SprintStatus::Active => "active",
            SprintStatus::Ready => "ready",
            SprintStatus::Planning => "planning",
            SprintStatus::Archived => "archived",
        }
    }

    pub fn prefix(self) -> char {
        match self {
            SprintStatus::Active => '!',
            SprintStatus::Ready => '+',
            SprintStatus::Planning => '@',
            SprintStatus::Archived => '~',
        }
    }

    pub fn from_prefix(c: char) -> Option<SprintStatus> {
        match c {
            '!' => Some(SprintStatus::Active),
            '+' => Some(SprintStatus::Ready),
            '@' => Some(SprintStatus::Planning),
            '~' => Some(SprintStatus::Archived),
            _ => None,
        }
    }

    pub fn is_reserved_char(c: char) -> bool {
        Self::from_prefix(c).is_some()
    }

    /// Parse a sidecar token: case-insensitive, surrounding whitespace ignored.
    pub fn parse_token(token: &str) -> Option<SprintStatus> {
        let t = token.trim();
        SprintStatus::all()
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(t))
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SprintStatus {
    type Err = crate::error::GittaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SprintStatus::parse_token(s)
            .ok_or_else(|| crate::error::GittaError::InvalidStatus(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_mapping_is_bijective() {
        for &status in SprintStatus::all() {
            assert_eq!(SprintStatus::from_prefix(status.prefix()), Some(status));
        }
        assert_eq!(SprintStatus::from_prefix('#'), None);
    }

    #[test]
    fn token_parsing_is_lenient_about_case_and_whitespace() {
        assert_eq!(
            SprintStatus::parse_token("  ACTIVE\n"),
            Some(SprintStatus::Active)
        );
        assert_eq!(
            SprintStatus::parse_token("Planning"),
            Some(SprintStatus::Planning)
        );
        assert_eq!(SprintStatus::parse_token("done"), None);
        assert_eq!(SprintStatus::parse_token(""), None);
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert!("archived".parse::<SprintStatus>().is_ok());
        assert!("closed".parse::<SprintStatus>().is_err());
    }
}
