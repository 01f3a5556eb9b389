//! Semantic versions as published by the update server.
//!
//! Ordering is semver ordering, never string ordering: `1.10.0 > 1.9.0`.
//! Parsing accepts what release tooling tends to emit in practice:
//! a leading `v`, surrounding whitespace, and short numeric forms
//! such as `2` or `1.4` (padded with zeros).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version string that could not be understood
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version string: {0:?}")]
pub struct ParseVersionError(pub String);

/// A parsed application version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(semver::Version);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn parse(raw: &str) -> Result<Self, ParseVersionError> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        if let Ok(v) = semver::Version::parse(trimmed) {
            return Ok(Self(v));
        }

        // Short forms: "2", "1.4", "1.4-beta"
        let split_at = trimmed
            .find(|c: char| c == '-' || c == '+')
            .unwrap_or(trimmed.len());
        let (core, suffix) = trimmed.split_at(split_at);
        let parts: Vec<&str> = core.split('.').collect();
        let numeric = parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));

        if !(1..=2).contains(&parts.len()) || !numeric {
            return Err(ParseVersionError(raw.to_string()));
        }

        let mut padded = parts.join(".");
        for _ in parts.len()..3 {
            padded.push_str(".0");
        }
        padded.push_str(suffix);

        semver::Version::parse(&padded)
            .map(Self)
            .map_err(|_| ParseVersionError(raw.to_string()))
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// True when `latest` is strictly newer than `current`
pub fn is_update_available(current: &Version, latest: &Version) -> bool {
    latest > current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_update_available_both_directions() {
        let ordered = [
            ("0.9.9", "1.0.0"),
            ("1.0.0", "1.0.1"),
            ("1.0.9", "1.1.0"),
            ("1.9.0", "1.10.0"),
            ("1.99.99", "2.0.0"),
            ("9.0.0", "10.0.0"),
            ("2.0.0-beta", "2.0.0"),
            ("2.0.0-alpha", "2.0.0-beta"),
        ];

        for (older, newer) in ordered {
            assert!(
                is_update_available(&v(older), &v(newer)),
                "{} should be an update over {}",
                newer,
                older
            );
            assert!(
                !is_update_available(&v(newer), &v(older)),
                "{} should not be an update over {}",
                older,
                newer
            );
        }
    }

    #[test]
    fn test_same_version_is_not_an_update() {
        assert!(!is_update_available(&v("1.0.0"), &v("1.0.0")));
        assert!(!is_update_available(&v("v1.0.0"), &v("1.0.0")));
        assert!(!is_update_available(&v("1.0"), &v("1.0.0")));
    }

    #[test]
    fn test_not_lexical_ordering() {
        // "1.10.0" < "1.9.0" as strings
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("10.0.0") > v("9.0.0"));
    }

    #[test]
    fn test_lenient_forms() {
        assert_eq!(v("v2.1.0"), Version::new(2, 1, 0));
        assert_eq!(v("V2.1.0"), Version::new(2, 1, 0));
        assert_eq!(v("  1.2.3\n"), Version::new(1, 2, 3));
        assert_eq!(v("2"), Version::new(2, 0, 0));
        assert_eq!(v("1.4"), Version::new(1, 4, 0));
        assert_eq!(v("1.4-rc1").to_string(), "1.4.0-rc1");
    }

    #[test]
    fn test_invalid_versions() {
        for raw in ["", "   ", "latest", "1.2.3.4", "1..2", "a.b.c", "1.x"] {
            assert!(Version::parse(raw).is_err(), "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_display_roundtrips_through_parse() {
        let parsed: Version = "3.4.5".parse().unwrap();
        assert_eq!(parsed.to_string(), "3.4.5");
        assert_eq!(parsed, Version::new(3, 4, 5));
    }
}
