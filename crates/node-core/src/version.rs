//! Version parsing and release version resolution
//!
//! Versions are `major.minor.patch` triples of non-negative integers. Input
//! with one or two components is accepted and padded with zeros; anything
//! after a `-` or `+` (pre-release or build metadata) is ignored.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::{Error, Result};

/// Number of candidates tried before a release version is given up on.
pub const MAX_ATTEMPTS: usize = 10;

/// Baseline used when a repository has never been released.
pub const INITIAL_VERSION: &str = "0.0.0";

/// A `major.minor.patch` version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version, returning how many components the input had.
    pub fn parse_with_components(input: &str) -> Result<(Self, usize)> {
        let invalid = || Error::InvalidVersion {
            version: input.to_string(),
        };

        let core = input
            .trim()
            .split(['-', '+'])
            .next()
            .unwrap_or_default();
        let core = core.strip_prefix('v').unwrap_or(core);

        let fields: Vec<&str> = core.split('.').collect();
        if fields.is_empty() || fields.len() > 3 {
            return Err(invalid());
        }

        let mut numbers = [0u64; 3];
        for (slot, field) in numbers.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|_| invalid())?;
        }

        Ok((Self::new(numbers[0], numbers[1], numbers[2]), fields.len()))
    }

    /// The next version for the given bump.
    pub fn bump(self, bump: Bump) -> Self {
        match bump {
            Bump::Patch => Self::new(self.major, self.minor, self.patch + 1),
            Bump::Minor => Self::new(self.major, self.minor + 1, 0),
            Bump::Major => Self::new(self.major + 1, 0, 0),
        }
    }

    /// Format using `components` fields (1 to 3).
    pub fn to_string_with_components(self, components: usize) -> String {
        match components {
            0 | 1 => format!("{}", self.major),
            2 => format!("{}.{}", self.major, self.minor),
            _ => self.to_string(),
        }
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_components(s).map(|(version, _)| version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Class of version increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl Bump {
    /// Exactly one flag must be set.
    pub fn from_flags(major: bool, minor: bool, patch: bool) -> Result<Self> {
        match (major, minor, patch) {
            (true, false, false) => Ok(Self::Major),
            (false, true, false) => Ok(Self::Minor),
            (false, false, true) => Ok(Self::Patch),
            _ => Err(Error::InvalidBump {
                message: format!(
                    "exactly one of major/minor/patch must be set (major={}, minor={}, patch={})",
                    major, minor, patch
                ),
            }),
        }
    }

    /// Edits bump major or minor, or keep the version when neither is set.
    pub fn from_edit_flags(major: bool, minor: bool) -> Result<Option<Self>> {
        match (major, minor) {
            (true, true) => Err(Error::InvalidBump {
                message: "major and minor cannot both be requested".to_string(),
            }),
            (true, false) => Ok(Some(Self::Major)),
            (false, true) => Ok(Some(Self::Minor)),
            (false, false) => Ok(None),
        }
    }

    /// Classify a release by what already exists in the repository.
    ///
    /// An artifact already at the target location means a patch; another
    /// version with the same major means a minor; otherwise a major.
    pub fn classify(target_exists: bool, same_major_exists: bool) -> Self {
        if target_exists {
            Self::Patch
        } else if same_major_exists {
            Self::Minor
        } else {
            Self::Major
        }
    }
}

impl fmt::Display for Bump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

/// The next release version after `baseline` that is not in `taken`.
///
/// Collisions are resolved by bumping again from the colliding candidate, up
/// to [`MAX_ATTEMPTS`] candidates in total.
pub fn release_version<S: AsRef<str>>(baseline: &str, bump: Bump, taken: &[S]) -> Result<Version> {
    let taken: Vec<Version> = taken
        .iter()
        .filter_map(|t| t.as_ref().parse().ok())
        .collect();

    let mut candidate = baseline.parse::<Version>()?.bump(bump);
    let mut attempts = 1;
    while taken.contains(&candidate) {
        if attempts >= MAX_ATTEMPTS {
            return Err(Error::VersionExhausted {
                attempts,
                last: candidate.to_string(),
            });
        }
        candidate = candidate.bump(bump);
        attempts += 1;
    }

    if attempts > 1 {
        tracing::warn!(
            version = %candidate,
            attempts,
            "Release version needed several attempts to avoid existing tags"
        );
    }
    Ok(candidate)
}

/// Version an editable copy is given, keeping the input's component count.
///
/// `1.2` + minor -> `1.3`, `1.2.3` + major -> `2.0.0`, `1` + minor -> `1.1`.
pub fn edit_version(current: &str, bump: Bump) -> Result<String> {
    let (version, components) = Version::parse_with_components(current)?;
    let needed = match bump {
        Bump::Major => 1,
        Bump::Minor => 2,
        Bump::Patch => 3,
    };
    Ok(version.bump(bump).to_string_with_components(components.max(needed)))
}

/// Matches expanded directory names of `namespace::name` with the given major.
///
/// `Sop_studio.box.2.1.hda` and `Sop_studio.box.2.1.4.hda` both match major 2.
pub fn same_major_pattern(namespace: Option<&str>, name: &str, major: u64) -> Result<Regex> {
    let stem = match namespace.filter(|ns| !ns.is_empty()) {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    };
    let pattern = format!(
        r"^.*_{}\.{}\.\d+(\.\d+)?\.hda$",
        regex::escape(&stem),
        major
    );
    Regex::new(&pattern).map_err(|e| Error::configuration(format!("invalid pattern: {}", e)))
}
