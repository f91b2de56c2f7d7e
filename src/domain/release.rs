// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// A published GitHub release, as returned by the REST API.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

/// Request body for creating a release.
#[derive(Debug, Clone, Serialize)]
pub struct NewRelease {
    pub tag_name: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    pub generate_release_notes: bool,
}

impl NewRelease {
    pub fn for_tag(tag_name: impl Into<String>) -> Self {
        let tag_name = tag_name.into();
        Self {
            name: tag_name.clone(),
            tag_name,
            body: None,
            draft: false,
            prerelease: false,
            generate_release_notes: true,
        }
    }
}

/// Tag name for a bare version string: `1.2.3` -> `v1.2.3`.
pub fn tag_name(version: &str) -> String {
    format!("v{}", version.trim_start_matches('v'))
}
