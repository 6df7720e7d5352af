//! Argument parsing shared by the identity commands.

use serde::de::DeserializeOwned;

use crate::models::{IdentityFilter, IdentityStatus, ResourceRole};
use crate::{Error, Result};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// One line per record: id, status, sequence.
    Table,
}

impl OutputFormat {
    /// Parses a format name, defaulting to JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "table" | "text" => Self::Table,
            _ => Self::Json,
        }
    }
}

/// Parses a JSON argument into `T`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] naming `what` if the text does not decode.
pub fn parse_json<T: DeserializeOwned>(what: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::InvalidInput(format!("invalid {what}: {e}")))
}

/// Parses a resource-role argument: a single entry or an array of entries.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the text does not decode.
pub fn parse_roles(text: &str) -> Result<Vec<ResourceRole>> {
    let value: serde_json::Value = parse_json("resource roles", text)?;
    if value.is_array() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(|role| vec![role])
    }
    .map_err(|e| Error::InvalidInput(format!("invalid resource roles: {e}")))
}

/// Parses a status name.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for anything but `active` or `deleted`.
pub fn parse_status(text: &str) -> Result<IdentityStatus> {
    IdentityStatus::parse(text)
        .ok_or_else(|| Error::InvalidInput(format!("unknown status '{text}'")))
}

/// Builds a list filter from optional command-line values.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if `status` is not a known status.
pub fn build_filter(
    status: Option<&str>,
    kind: Option<String>,
    email: Option<String>,
    member_of: Option<String>,
    limit: Option<usize>,
) -> Result<IdentityFilter> {
    let mut filter = IdentityFilter::new();
    if let Some(status) = status {
        filter = filter.with_status(parse_status(status)?);
    }
    if let Some(kind) = kind {
        filter = filter.with_kind(kind);
    }
    if let Some(email) = email {
        filter = filter.with_email(email);
    }
    if let Some(group) = member_of {
        filter = filter.with_member_of(group);
    }
    if let Some(limit) = limit {
        filter = filter.with_limit(limit);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use test_case::test_case;

    #[test_case("json", OutputFormat::Json)]
    #[test_case("TABLE", OutputFormat::Table)]
    #[test_case("text", OutputFormat::Table)]
    #[test_case("bogus", OutputFormat::Json)]
    fn test_output_format_parse(input: &str, expected: OutputFormat) {
        assert_eq!(OutputFormat::parse(input), expected);
    }

    #[test]
    fn test_parse_roles_single_and_array() {
        let single = parse_roles(r#"{"sysRole": "identity.regular", "resource": "urn:a"}"#).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].resources(), Some(&["urn:a".to_string()][..]));

        let many = parse_roles(r#"[{"sysRole": "a"}, {"sysRole": "b"}]"#).unwrap();
        assert_eq!(many.len(), 2);
        assert!(many[0].resources().is_none());
    }

    #[test]
    fn test_parse_roles_rejects_garbage() {
        let err = parse_roles("not json").unwrap_err();
        assert_eq!(err.name(), "InvalidInput");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("deleted").unwrap(), IdentityStatus::Deleted);
        assert!(parse_status("archived").is_err());
    }

    #[test]
    fn test_build_filter() {
        let filter = build_filter(
            Some("active"),
            Some("Group".to_string()),
            None,
            None,
            Some(5),
        )
        .unwrap();
        assert_eq!(filter.status, Some(IdentityStatus::Active));
        assert_eq!(filter.kind.as_deref(), Some("Group"));
        assert_eq!(filter.limit, Some(5));
        assert!(build_filter(Some("nope"), None, None, None, None).is_err());
    }
}
