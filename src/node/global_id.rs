//! Opaque global identifiers
//!
//! The wire form is standard base64 over `"{tag}:{key}"`. Registry tags are
//! restricted to `[a-z0-9_]`, so the first `:` always ends the tag and keys
//! may contain `:` themselves.

use std::fmt;
use std::str::FromStr;

use async_graphql::{InputValueError, InputValueResult, Scalar, ScalarType, Value};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::{ExplorerError, Result};

const SEPARATOR: char = ':';

/// Global object identifier: entity type tag plus natural key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalId {
    entity_type: String,
    id: String,
}

impl GlobalId {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Entity type tag (e.g. `proposal`)
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Natural key, opaque to everything except the tag's fetcher
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Encode to the opaque wire form
    pub fn to_wire(&self) -> String {
        BASE64.encode(format!("{}{}{}", self.entity_type, SEPARATOR, self.id))
    }

    /// Parse the opaque wire form. Does not consult the registry.
    pub fn decode(wire: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(wire.trim())
            .map_err(|_| ExplorerError::malformed("not valid base64"))?;
        let raw =
            String::from_utf8(bytes).map_err(|_| ExplorerError::malformed("not valid UTF-8"))?;

        let (tag, key) = raw
            .split_once(SEPARATOR)
            .ok_or_else(|| ExplorerError::malformed("missing type separator"))?;

        if !is_valid_tag(tag) {
            return Err(ExplorerError::malformed(format!("invalid type tag \"{}\"", tag)));
        }
        if key.is_empty() {
            return Err(ExplorerError::malformed("empty key"));
        }

        Ok(Self::new(tag, key))
    }
}

/// Tags are non-empty lowercase ASCII alphanumerics and underscores
pub(crate) fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for GlobalId {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

/// Exposed as the `NodeID` scalar; malformed input fails argument parsing
#[Scalar(name = "NodeID")]
impl ScalarType for GlobalId {
    fn parse(value: Value) -> InputValueResult<Self> {
        match &value {
            Value::String(s) => GlobalId::decode(s).map_err(InputValueError::custom),
            _ => Err(InputValueError::expected_type(value)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn wire(raw: &str) -> String {
        BASE64.encode(raw)
    }

    #[test]
    fn test_roundtrip_with_separator_in_key() {
        let id = GlobalId::new("reaction", "proposal:42:like");
        let decoded = GlobalId::decode(&id.to_wire()).unwrap();
        assert_eq!(decoded, id);
        assert_eq!(decoded.entity_type(), "reaction");
        assert_eq!(decoded.id(), "proposal:42:like");
    }

    #[test]
    fn test_display_matches_wire_form() {
        let id = GlobalId::new("block", "ABCDEF");
        assert_eq!(id.to_string(), id.to_wire());
        assert_eq!(id.to_string().parse::<GlobalId>().unwrap(), id);
    }

    #[test]
    fn test_rejects_non_base64() {
        assert_matches!(
            GlobalId::decode("%%%"),
            Err(ExplorerError::MalformedIdentifier { .. })
        );
    }

    #[test]
    fn test_rejects_missing_separator() {
        assert_matches!(
            GlobalId::decode(&wire("proposal42")),
            Err(ExplorerError::MalformedIdentifier { reason }) if reason.contains("separator")
        );
    }

    #[test]
    fn test_rejects_bad_tag_and_empty_key() {
        for raw in [":42", "Proposal:42", "pro posal:42", "proposal:"] {
            assert_matches!(
                GlobalId::decode(&wire(raw)),
                Err(ExplorerError::MalformedIdentifier { .. }),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_invalid_utf8() {
        let encoded = BASE64.encode([0xff, 0xfe, b':', b'1']);
        assert_matches!(
            GlobalId::decode(&encoded),
            Err(ExplorerError::MalformedIdentifier { .. })
        );
    }

    #[test]
    fn test_equality_is_field_wise() {
        assert_eq!(GlobalId::new("block", "1"), GlobalId::new("block", "1"));
        assert_ne!(GlobalId::new("block", "1"), GlobalId::new("proposal", "1"));
        assert_ne!(GlobalId::new("block", "1"), GlobalId::new("block", "2"));
    }
}
