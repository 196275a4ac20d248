//! Sprint folder name codec.
//!
//! A sprint directory is named `<prefix><identifier>` or
//! `<prefix><identifier>_<description>`. The split happens on the last
//! underscore, except that an all-digit suffix stays part of the identifier
//! so `Sprint_24` decodes as one identifier. A genuinely numeric description
//! (`Sprint_42` meaning identifier `Sprint`, description `42`) is therefore
//! read back as identifier `Sprint_42` with no description.

use crate::error::{GittaError, Result};
use crate::types::SprintStatus;

/// Decoded form of a sprint folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderName {
    pub status: SprintStatus,
    pub identifier: String,
    pub description: Option<String>,
}

impl FolderName {
    pub fn new(
        status: SprintStatus,
        identifier: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            status,
            identifier: identifier.into(),
            description: description.filter(|d| !d.is_empty()),
        }
    }

    /// Strict decode: the first character must be a status prefix.
    pub fn decode(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let first = chars.next().ok_or_else(|| GittaError::InvalidFolderName {
            name: name.to_string(),
            reason: "name is empty".to_string(),
        })?;
        let status = SprintStatus::from_prefix(first).ok_or_else(|| {
            GittaError::InvalidFolderName {
                name: name.to_string(),
                reason: format!("'{first}' is not a status prefix (expected !, +, @ or ~)"),
            }
        })?;
        let (identifier, description) = split_rest(chars.as_str());
        if identifier.is_empty() {
            return Err(GittaError::InvalidFolderName {
                name: name.to_string(),
                reason: "identifier is empty".to_string(),
            });
        }
        Ok(Self::new(status, identifier, description))
    }

    /// Decode that accepts legacy unprefixed names as Active.
    pub fn decode_lenient(name: &str) -> Self {
        match Self::decode(name) {
            Ok(decoded) => decoded,
            Err(_) => {
                let rest = match name.chars().next() {
                    Some(c) if SprintStatus::is_reserved_char(c) => &name[c.len_utf8()..],
                    _ => name,
                };
                let (identifier, description) = split_rest(rest);
                Self::new(SprintStatus::Active, identifier, description)
            }
        }
    }

    pub fn encode(&self) -> String {
        encode(self.status, &self.identifier, self.description.as_deref())
    }

    /// The same sprint under a different status.
    pub fn with_status(&self, status: SprintStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

fn split_rest(rest: &str) -> (String, Option<String>) {
    match rest.rfind('_') {
        Some(idx) => {
            let suffix = &rest[idx + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                (rest.to_string(), None)
            } else if suffix.is_empty() {
                (rest[..idx].to_string(), None)
            } else {
                (rest[..idx].to_string(), Some(suffix.to_string()))
            }
        }
        None => (rest.to_string(), None),
    }
}

pub fn encode(status: SprintStatus, identifier: &str, description: Option<&str>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!("{}{identifier}_{d}", status.prefix()),
        _ => format!("{}{identifier}", status.prefix()),
    }
}

/// Status encoded in a folder name, if it carries an explicit prefix.
pub fn explicit_status(name: &str) -> Option<SprintStatus> {
    name.chars().next().and_then(SprintStatus::from_prefix)
}

/// Lenient status extraction for quick scans: anything without a recognised
/// prefix reads as Active.
pub fn extract_status(name: &str) -> SprintStatus {
    explicit_status(name).unwrap_or(SprintStatus::Active)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_identifier_with_numeric_segment() {
        let d = FolderName::decode("!Sprint_24").unwrap();
        assert_eq!(d.status, SprintStatus::Active);
        assert_eq!(d.identifier, "Sprint_24");
        assert_eq!(d.description, None);
    }

    #[test]
    fn decode_identifier_and_description() {
        let d = FolderName::decode("+Sprint_24_Checkout").unwrap();
        assert_eq!(d.status, SprintStatus::Ready);
        assert_eq!(d.identifier, "Sprint_24");
        assert_eq!(d.description.as_deref(), Some("Checkout"));
    }

    #[test]
    fn decode_numeric_description_reads_as_identifier() {
        let d = FolderName::decode("@Sprint_42").unwrap();
        assert_eq!(d.identifier, "Sprint_42");
        assert_eq!(d.description, None);
    }

    #[test]
    fn decode_rejects_empty_and_unprefixed() {
        assert!(FolderName::decode("").is_err());
        assert!(FolderName::decode("Sprint_1").is_err());
        assert!(FolderName::decode("~").is_err());
    }

    #[test]
    fn encode_decode_round_trip_all_statuses() {
        let cases = [
            ("Sprint_7", None),
            ("Sprint_7", Some("Payments")),
            ("Q3", Some("hardening")),
            ("alpha", None),
        ];
        for &status in SprintStatus::all() {
            for (id, desc) in cases {
                let name = encode(status, id, desc);
                let decoded = FolderName::decode(&name).unwrap();
                assert_eq!(
                    decoded,
                    FolderName::new(status, id, desc.map(str::to_string)),
                    "round trip of {name}"
                );
                assert_eq!(decoded.encode(), name);
            }
        }
    }

    #[test]
    fn encode_omits_separator_for_empty_description() {
        assert_eq!(encode(SprintStatus::Archived, "S1", Some("")), "~S1");
        assert_eq!(encode(SprintStatus::Archived, "S1", None), "~S1");
    }

    #[test]
    fn lenient_decode_treats_legacy_names_as_active() {
        let d = FolderName::decode_lenient("Sprint_3_Legacy");
        assert_eq!(d.status, SprintStatus::Active);
        assert_eq!(d.identifier, "Sprint_3");
        assert_eq!(d.description.as_deref(), Some("Legacy"));
    }

    #[test]
    fn extract_status_is_lenient() {
        assert_eq!(extract_status("~Old"), SprintStatus::Archived);
        assert_eq!(extract_status("@Next"), SprintStatus::Planning);
        assert_eq!(extract_status("NoPrefix"), SprintStatus::Active);
        assert_eq!(extract_status(""), SprintStatus::Active);
        assert_eq!(explicit_status("NoPrefix"), None);
    }

    #[test]
    fn with_status_keeps_identity() {
        let d = FolderName::decode("!Sprint_5_Search").unwrap();
        assert_eq!(
            d.with_status(SprintStatus::Archived).encode(),
            "~Sprint_5_Search"
        );
    }
}
