//! Semantic version triples for document histories
//!
//! Every accepted mutation advances the document's `major.minor.patch`
//! triple. Bumping a component zeroes the lower components, so the
//! sequence of versions in a history is strictly increasing under the
//! derived lexicographic ordering regardless of which bumps were
//! requested.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which component of the version triple to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VersionBump {
    /// `x.y.z` → `x+1.0.0`
    Major,
    /// `x.y.z` → `x.y+1.0`
    Minor,
    /// `x.y.z` → `x.y.z+1` (the default)
    #[default]
    Patch,
}

impl VersionBump {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionBump::Major => "major",
            VersionBump::Minor => "minor",
            VersionBump::Patch => "patch",
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing a version string fails
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version string '{input}': expected major.minor.patch")]
pub struct SemVerParseError {
    /// The rejected input
    pub input: String,
}

/// A `major.minor.patch` version triple
///
/// Ordering is lexicographic over (major, minor, patch), which the derived
/// `Ord` provides because the fields are declared in that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SemVer {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl SemVer {
    /// The version every history is seeded with
    pub const INITIAL: SemVer = SemVer {
        major: 1,
        minor: 0,
        patch: 0,
    };

    /// Create a version triple
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        SemVer {
            major,
            minor,
            patch,
        }
    }

    /// Compute the next version for the requested bump
    ///
    /// Lower components are zeroed: a minor bump of `1.2.3` yields `1.3.0`.
    pub const fn bump(&self, bump: VersionBump) -> SemVer {
        match bump {
            VersionBump::Major => SemVer::new(self.major + 1, 0, 0),
            VersionBump::Minor => SemVer::new(self.major, self.minor + 1, 0),
            VersionBump::Patch => SemVer::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl Default for SemVer {
    fn default() -> Self {
        SemVer::INITIAL
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVer {
    type Err = SemVerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SemVerParseError {
            input: s.to_string(),
        };
        let mut parts = s.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let minor = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        let patch = parts.next().and_then(|p| p.parse().ok()).ok_or_else(err)?;
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(SemVer::new(major, minor, patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_version() {
        assert_eq!(SemVer::INITIAL.to_string(), "1.0.0");
        assert_eq!(SemVer::default(), SemVer::INITIAL);
    }

    #[test]
    fn test_bump_zeroes_lower_components() {
        let v = SemVer::new(1, 2, 3);
        assert_eq!(v.bump(VersionBump::Major), SemVer::new(2, 0, 0));
        assert_eq!(v.bump(VersionBump::Minor), SemVer::new(1, 3, 0));
        assert_eq!(v.bump(VersionBump::Patch), SemVer::new(1, 2, 4));
    }

    #[test]
    fn test_ordering() {
        assert!(SemVer::new(1, 0, 0) < SemVer::new(1, 0, 1));
        assert!(SemVer::new(1, 0, 9) < SemVer::new(1, 1, 0));
        assert!(SemVer::new(1, 9, 9) < SemVer::new(2, 0, 0));
    }

    #[test]
    fn test_parse_roundtrip() {
        let v: SemVer = "3.14.159".parse().unwrap();
        assert_eq!(v, SemVer::new(3, 14, 159));
        assert_eq!(v.to_string().parse::<SemVer>().unwrap(), v);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1..3", "-1.0.0"] {
            assert!(input.parse::<SemVer>().is_err(), "{:?} should fail", input);
        }
    }

    #[test]
    fn test_display_default_bump() {
        assert_eq!(VersionBump::default(), VersionBump::Patch);
        assert_eq!(VersionBump::Minor.to_string(), "minor");
    }

    proptest! {
        /// Any bump strictly increases the version.
        #[test]
        fn prop_bump_strictly_increases(
            major in 0u32..1000,
            minor in 0u32..1000,
            patch in 0u32..1000,
            kind in prop_oneof![
                Just(VersionBump::Major),
                Just(VersionBump::Minor),
                Just(VersionBump::Patch)
            ],
        ) {
            let v = SemVer::new(major, minor, patch);
            prop_assert!(v.bump(kind) > v);
        }

        /// A sequence of arbitrary bumps is strictly increasing.
        #[test]
        fn prop_bump_sequence_monotonic(bumps in proptest::collection::vec(0u8..3, 1..32)) {
            let mut current = SemVer::INITIAL;
            for b in bumps {
                let kind = match b {
                    0 => VersionBump::Major,
                    1 => VersionBump::Minor,
                    _ => VersionBump::Patch,
                };
                let next = current.bump(kind);
                prop_assert!(next > current);
                current = next;
            }
        }
    }
}
