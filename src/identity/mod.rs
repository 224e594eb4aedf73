/// Player identity handling
///
/// Normalizes raw path segments into canonical player identifiers and
/// resolves them to skin textures across providers.

pub mod resolver;

pub use resolver::FallbackResolver;

use crate::error::{AppError, AppResult};
use std::fmt;
use uuid::Uuid;

/// Kind of identifier a request carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Uuid,
    Username,
}

/// A validated player identifier
///
/// For `Uuid` the canonical form is 32 lowercase hex characters without
/// separators. For `Username` it is the trimmed input.
#[derive(Debug, Clone)]
pub struct PlayerIdentifier {
    raw: String,
    kind: IdentifierKind,
    canonical: String,
}

impl PlayerIdentifier {
    /// Normalize a UUID, accepting dashed or undashed input in any case.
    pub fn uuid(raw: &str) -> AppResult<Self> {
        let stripped: String = raw.trim().chars().filter(|c| *c != '-').collect();

        if stripped.len() != 32 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::InvalidIdentifier(format!(
                "'{}' is not a valid UUID",
                raw
            )));
        }

        let uuid = Uuid::try_parse(&stripped)
            .map_err(|e| AppError::InvalidIdentifier(format!("'{}': {}", raw, e)))?;

        Ok(Self {
            raw: raw.to_string(),
            kind: IdentifierKind::Uuid,
            canonical: uuid.simple().to_string(),
        })
    }

    /// Normalize a username. Usernames are opaque; only whitespace is trimmed.
    pub fn username(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidIdentifier("username is empty".to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            kind: IdentifierKind::Username,
            canonical: trimmed.to_string(),
        })
    }

    /// Normalize either form. Input whose hyphen-stripped form is 32 hex
    /// characters is a UUID; anything else is an opaque username.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let stripped: String = raw.trim().chars().filter(|c| *c != '-').collect();

        if stripped.len() == 32 && stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            Self::uuid(raw)
        } else {
            Self::username(raw)
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn is_uuid(&self) -> bool {
        self.kind == IdentifierKind::Uuid
    }

    /// Dashed `8-4-4-4-12` form, derived from the canonical hex on demand.
    ///
    /// Returns `None` for usernames.
    pub fn dashed(&self) -> Option<String> {
        if !self.is_uuid() {
            return None;
        }
        Uuid::try_parse(&self.canonical)
            .ok()
            .map(|uuid| uuid.hyphenated().to_string())
    }
}

impl PartialEq for PlayerIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.canonical == other.canonical
    }
}

impl Eq for PlayerIdentifier {}

impl fmt::Display for PlayerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}
