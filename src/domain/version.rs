// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: GPL-3.0-only

// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

//! Semantic version parsing and bumping.
//!
//! Parsing and arithmetic are separate steps: [`SemanticVersion::from_str`]
//! validates the full `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]` grammar, and
//! [`SemanticVersion::bump`] only ever touches the numeric triple.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

static SEMVER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^v?(?P<major>0|[1-9][0-9]*)",
        r"\.(?P<minor>0|[1-9][0-9]*)",
        r"\.(?P<patch>0|[1-9][0-9]*)",
        r"(?:-(?P<prerelease>",
        r"(?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*)",
        r"(?:\.(?:0|[1-9][0-9]*|[0-9]*[a-zA-Z-][0-9a-zA-Z-]*))*",
        r"))?",
        r"(?:\+(?P<build>[0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    ))
    .unwrap()
});

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{input}' is not a valid semantic version")]
    #[diagnostic(
        code(lazym::version::invalid),
        help("Expected MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD], e.g. 1.4.2 or v2.0.0-rc.1")
    )]
    InvalidVersion { input: String },

    #[error("Unknown bump class '{input}'")]
    #[diagnostic(
        code(lazym::version::bump_class),
        help("Use one of: major, minor, patch")
    )]
    UnknownBumpClass { input: String },

    #[error("Version component '{component}' is out of range")]
    #[diagnostic(code(lazym::version::overflow))]
    Overflow { component: &'static str },
}

/// Which part of the version to increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BumpClass {
    Major,
    Minor,
    Patch,
}

impl BumpClass {
    pub const ALL: &'static [&'static str] = &["major", "minor", "patch"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl fmt::Display for BumpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpClass {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(ValidationError::UnknownBumpClass {
                input: s.to_string(),
            }),
        }
    }
}

/// A parsed `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]` version.
///
/// Rendering never includes the optional `v` prefix accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<String>,
    build: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// `MAJOR.MINOR.PATCH` without prerelease or build metadata.
    pub fn core(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// Successor version for `class`. Prerelease and build metadata are dropped.
    pub fn bump(&self, class: BumpClass) -> Result<Self, ValidationError> {
        let next = match class {
            BumpClass::Major => Self::new(increment(self.major, "major")?, 0, 0),
            BumpClass::Minor => Self::new(self.major, increment(self.minor, "minor")?, 0),
            BumpClass::Patch => {
                Self::new(self.major, self.minor, increment(self.patch, "patch")?)
            }
        };
        Ok(next)
    }
}

fn increment(value: u64, component: &'static str) -> Result<u64, ValidationError> {
    value
        .checked_add(1)
        .ok_or(ValidationError::Overflow { component })
}

fn parse_component(digits: &str, component: &'static str) -> Result<u64, ValidationError> {
    // Grammar already rules out leading zeros; only range can fail here.
    digits
        .parse()
        .map_err(|_| ValidationError::Overflow { component })
}

impl FromStr for SemanticVersion {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SEMVER_REGEX
            .captures(s)
            .ok_or_else(|| ValidationError::InvalidVersion {
                input: s.to_string(),
            })?;

        Ok(Self {
            major: parse_component(&caps["major"], "major")?,
            minor: parse_component(&caps["minor"], "minor")?,
            patch: parse_component(&caps["patch"], "patch")?,
            prerelease: caps.name("prerelease").map(|m| m.as_str().to_string()),
            build: caps.name("build").map(|m| m.as_str().to_string()),
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(ref build) = self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// Validate `current_version` and return its successor for `bump_class`.
///
/// The result is always a bare `MAJOR.MINOR.PATCH`; callers that want a
/// `v`-prefixed tag name add it themselves.
pub fn bump_version(
    current_version: &str,
    bump_class: BumpClass,
) -> Result<String, ValidationError> {
    let version: SemanticVersion = current_version.parse()?;
    Ok(version.bump(bump_class)?.core())
}
