//! Version labels and ranges.
//!
//! Labels are parsed leniently: `"3"`, `"1.2"`, `"v2.0.0"` and
//! `"1.0.0-rc.1+build.5"` are all accepted. Missing minor and patch
//! components are filled with zero before the label is handed to [`semver`],
//! so `"3"` and `"3.0.0"` compare equal.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Bound;
use core::str::FromStr;

use crate::error::VersionError;

/// A parsed version label.
///
/// Ordering and equality follow semver precedence (major, minor, patch,
/// pre-release). Build metadata is kept but ignored when comparing, so
/// `"1.0.0+a"` and `"1.0.0+b"` are equal.
///
/// The original label text is preserved and is what [`fmt::Display`] prints.
///
/// ```
/// use migset::Version;
///
/// let short: Version = "2".parse().unwrap();
/// let full: Version = "2.0.0".parse().unwrap();
/// assert_eq!(short, full);
/// assert_eq!(short.as_str(), "2");
/// assert!(Version::parse("1.9.9").unwrap() < full);
/// ```
#[derive(Debug, Clone)]
pub struct Version {
    label: String,
    parsed: semver::Version,
}

impl Version {
    /// Parse a version label.
    pub fn parse(label: &str) -> Result<Self, VersionError> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        // Split the numeric core from `-pre` and `+build` suffixes.
        let core_end = body.find(['-', '+']).unwrap_or(body.len());
        let (core, suffix) = body.split_at(core_end);

        let components: Vec<&str> = core.split('.').collect();
        if components.len() > 3 {
            return Err(VersionError::invalid(
                label,
                "expected at most three numeric components",
            ));
        }
        if let Some(bad) = components
            .iter()
            .find(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(VersionError::invalid(
                label,
                format!("component {bad:?} is not a non-negative integer"),
            ));
        }

        let mut normalized = components.join(".");
        for _ in components.len()..3 {
            normalized.push_str(".0");
        }
        normalized.push_str(suffix);

        let parsed = semver::Version::parse(&normalized)
            .map_err(|e| VersionError::invalid(label, e.to_string()))?;

        Ok(Self {
            label: label.to_string(),
            parsed,
        })
    }

    /// The label exactly as it was given to [`Version::parse`].
    pub fn as_str(&self) -> &str {
        &self.label
    }

    /// The normalized semver value.
    pub fn parsed(&self) -> &semver::Version {
        &self.parsed
    }

    fn precedence(&self) -> (u64, u64, u64, &semver::Prerelease) {
        (
            self.parsed.major,
            self.parsed.minor,
            self.parsed.patch,
            &self.parsed.pre,
        )
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.precedence() == other.precedence()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence().cmp(&other.precedence())
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.precedence().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Version {
    type Error = VersionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label).map_err(serde::de::Error::custom)
    }
}

/// A range of versions with an inclusive, exclusive or open bound on each end.
///
/// ```
/// use core::ops::Bound;
/// use migset::{Version, VersionRange};
///
/// let v = |s: &str| Version::parse(s).unwrap();
/// let range = VersionRange::new(Bound::Excluded(v("1")), Bound::Included(v("3")));
/// assert!(!range.contains(&v("1.0.0")));
/// assert!(range.contains(&v("2.5")));
/// assert!(range.contains(&v("3.0.0")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    lower: Bound<Version>,
    upper: Bound<Version>,
}

impl VersionRange {
    /// Create a range from explicit bounds.
    pub fn new(lower: Bound<Version>, upper: Bound<Version>) -> Self {
        Self { lower, upper }
    }

    /// A range containing every version.
    pub fn full() -> Self {
        Self::new(Bound::Unbounded, Bound::Unbounded)
    }

    /// Lower bound.
    pub fn lower(&self) -> Bound<&Version> {
        self.lower.as_ref()
    }

    /// Upper bound.
    pub fn upper(&self) -> Bound<&Version> {
        self.upper.as_ref()
    }

    /// Whether `version` lies inside the range.
    pub fn contains(&self, version: &Version) -> bool {
        let above_lower = match &self.lower {
            Bound::Included(lo) => version >= lo,
            Bound::Excluded(lo) => version > lo,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Included(hi) => version <= hi,
            Bound::Excluded(hi) => version < hi,
            Bound::Unbounded => true,
        };
        above_lower && below_upper
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::full()
    }
}
