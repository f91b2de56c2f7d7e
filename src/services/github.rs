// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

//! GitHub REST calls for release lookup and creation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::{NewRelease, Release};
use crate::error::{Error, Result};

static REMOTE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // git@github.com:owner/repo.git
        Regex::new(r"^git@github\.com:([^/]+)/([^/]+?)(?:\.git)?/?$").unwrap(),
        // ssh://git@github.com/owner/repo.git
        Regex::new(r"^ssh://git@github\.com(?::\d+)?/([^/]+)/([^/]+?)(?:\.git)?/?$").unwrap(),
        // https://github.com/owner/repo.git (optionally with credentials)
        Regex::new(r"^https?://(?:[^@/]+@)?github\.com/([^/]+)/([^/]+?)(?:\.git)?/?$").unwrap(),
    ]
});

/// Owner and repository name from a GitHub remote URL.
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    REMOTE_PATTERNS.iter().find_map(|re| {
        let caps = re.captures(url)?;
        Some((caps[1].to_string(), caps[2].to_string()))
    })
}

/// Find a GitHub token.
///
/// Checks in order: config `github_token`, `GITHUB_TOKEN`, `GH_TOKEN`, the OS
/// keychain (when built with `secure-storage`), then `gh auth token`.
pub async fn resolve_token(config: &Config) -> Result<String> {
    let candidates = [
        config.github_token.clone(),
        std::env::var("GITHUB_TOKEN").ok(),
        std::env::var("GH_TOKEN").ok(),
    ];
    if let Some(token) = candidates.into_iter().flatten().find(|t| !t.is_empty()) {
        return Ok(token);
    }

    #[cfg(feature = "secure-storage")]
    if let Some(token) = crate::config::keychain_secret("github") {
        return Ok(token);
    }

    token_from_gh_cli().await.ok_or(Error::MissingGitHubToken)
}

async fn token_from_gh_cli() -> Option<String> {
    let output = tokio::process::Command::new("gh")
        .args(["auth", "token"])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("lazym/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn from_config(config: &Config, token: impl Into<String>) -> Self {
        Self::new(&config.github_api_url, token)
    }

    /// The latest published release, or `None` if the repository has none.
    pub async fn latest_release(&self, owner: &str, repo: &str) -> Result<Option<Release>> {
        let url = format!("{}/repos/{owner}/{repo}/releases/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let release: Release = response.json().await?;
                debug!(tag = %release.tag_name, "latest release fetched");
                Ok(Some(release))
            }
            StatusCode::NOT_FOUND => {
                debug!(owner, repo, "repository has no releases");
                Ok(None)
            }
            status => Err(api_error(status, response).await),
        }
    }

    pub async fn create_release(
        &self,
        owner: &str,
        repo: &str,
        release: &NewRelease,
    ) -> Result<Release> {
        let url = format!("{}/repos/{owner}/{repo}/releases", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(release)
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(api_error(response.status(), response).await);
        }

        let created: Release = response.json().await?;
        info!(tag = %created.tag_name, url = %created.html_url, "release created");
        Ok(created)
    }
}

async fn api_error(status: StatusCode, response: reqwest::Response) -> Error {
    #[derive(serde::Deserialize)]
    struct ApiMessage {
        message: String,
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or(body);

    Error::GitHub {
        status: status.as_u16(),
        message,
    }
}
