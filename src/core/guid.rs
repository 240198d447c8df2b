use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unity asset GUID: 32 hex digits, no hyphens, exactly as they appear in
/// `.meta` files and serialized `m_Script` references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScriptGuid(#[serde(with = "uuid::serde::simple")] Uuid);

impl ScriptGuid {
    /// Parse the 32-hex-digit form. Hyphenated UUIDs are rejected; Unity
    /// never writes them.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != 32 || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::validation_invalid_argument(
                "guid",
                format!("'{}' is not a 32-digit hex GUID", trimmed),
                Some(trimmed.to_string()),
                None,
            ));
        }

        Uuid::try_parse(trimmed).map(Self).map_err(|e| {
            Error::validation_invalid_argument("guid", e.to_string(), Some(trimmed.to_string()), None)
        })
    }

    /// The canonical serialized form: lowercase, no hyphens.
    pub fn simple(&self) -> String {
        self.0.as_simple().to_string()
    }

    /// Fresh random GUID, for test fixtures.
    #[cfg(test)]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ScriptGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}
