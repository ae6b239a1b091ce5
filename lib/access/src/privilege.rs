//! The privilege level enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Access level for a grant, ordered from no access to full control.
///
/// The four levels are closed: there are no intermediate or composite
/// privileges. `Ord` follows the declaration order, so effective-privilege
/// computation can combine sources with `max`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// No access.
    #[default]
    None,
    /// Read access; the floor for anything in the public namespace.
    Read,
    /// Write access; the minimum level that survives publication.
    Write,
    /// Owner/admin access; implied by a logged-in user's own namespace.
    Owner,
}

impl Privilege {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_i16(self) -> i16 {
        match self {
            Self::None => 0,
            Self::Read => 1,
            Self::Write => 2,
            Self::Owner => 3,
        }
    }

    /// Parses a storage representation. Unknown values are rejected.
    #[must_use]
    pub const fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            3 => Some(Self::Owner),
            _ => None,
        }
    }

    /// Returns the level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Read => "read",
            Self::Write => "write",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(Privilege::None < Privilege::Read);
        assert!(Privilege::Read < Privilege::Write);
        assert!(Privilege::Write < Privilege::Owner);
    }

    #[test]
    fn max_combines_sources() {
        let resolved = Privilege::Read.max(Privilege::Write);
        assert_eq!(resolved, Privilege::Write);
    }

    #[test]
    fn storage_representation_roundtrip() {
        for level in [
            Privilege::None,
            Privilege::Read,
            Privilege::Write,
            Privilege::Owner,
        ] {
            assert_eq!(Privilege::from_i16(level.as_i16()), Some(level));
        }
    }

    #[test]
    fn unknown_storage_value_rejected() {
        assert_eq!(Privilege::from_i16(4), None);
        assert_eq!(Privilege::from_i16(-1), None);
    }

    #[test]
    fn default_is_none() {
        assert_eq!(Privilege::default(), Privilege::None);
    }
}
