// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: GPL-3.0-only

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::debug;

use crate::domain::SemanticVersion;
use crate::error::{Error, Result};

pub struct GitService {
    repo: gix::Repository,
    work_dir: PathBuf,
}

impl GitService {
    pub fn discover() -> Result<Self> {
        Self::discover_at(".")
    }

    pub fn discover_at(path: impl AsRef<Path>) -> Result<Self> {
        let repo = gix::discover(path.as_ref()).map_err(|_| Error::NotAGitRepo)?;

        let work_dir = repo
            .workdir()
            .ok_or_else(|| Error::Git("Bare repository not supported".into()))?
            .to_path_buf();

        Ok(Self { repo, work_dir })
    }

    pub fn check_state(&self) -> Result<()> {
        if matches!(self.repo.state(), Some(gix::state::InProgress::Merge)) {
            return Err(Error::MergeInProgress);
        }
        Ok(())
    }

    /// Whether `HEAD` points at a commit (false on a fresh `git init`).
    pub fn has_commit_history(&self) -> bool {
        self.repo.head_id().is_ok()
    }

    /// Staged diff with `index <sha>..<sha>` lines removed.
    pub async fn staged_diff(&self) -> Result<String> {
        self.check_state()?;

        let raw = self
            .run(&["diff", "--staged", "--minimal", "--no-color", "--no-ext-diff"])
            .await?;
        let diff = clean_diff(&raw);

        if diff.trim().is_empty() {
            return Err(Error::NoStagedChanges);
        }

        debug!(chars = diff.len(), "staged diff collected");
        Ok(diff)
    }

    pub async fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).await?;
        Ok(())
    }

    pub async fn remote_url(&self, remote: &str) -> Result<String> {
        let key = format!("remote.{remote}.url");
        let url = self.run(&["config", "--get", &key]).await?;
        Ok(url.trim().to_string())
    }

    /// Newest-first tag names, at most `limit`.
    pub async fn local_tags(&self, limit: usize) -> Result<Vec<String>> {
        let output = self.run(&["tag", "--sort=-creatordate"]).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(limit)
            .map(String::from)
            .collect())
    }

    /// The newest local tag that parses as a semantic version.
    pub async fn latest_version_tag(&self) -> Result<Option<(String, SemanticVersion)>> {
        let tags = self.local_tags(usize::MAX).await?;
        let found = tags.into_iter().find_map(|tag| {
            let version = tag.parse::<SemanticVersion>().ok()?;
            Some((tag, version))
        });
        debug!(tag = ?found.as_ref().map(|(t, _)| t), "latest version tag");
        Ok(found)
    }

    pub async fn create_tag(&self, tag: &str) -> Result<()> {
        self.run(&["tag", "-a", tag, "-m", tag]).await?;
        Ok(())
    }

    pub async fn push_tag(&self, remote: &str, tag: &str) -> Result<()> {
        self.run(&["push", remote, tag]).await?;
        Ok(())
    }

    /// Directory git runs hooks from. Honors `core.hooksPath` and resolves to
    /// the common hooks directory inside linked worktrees.
    pub async fn hooks_dir(&self) -> Result<PathBuf> {
        let output = self.run(&["rev-parse", "--git-path", "hooks"]).await?;
        let hooks = PathBuf::from(output.trim());
        let hooks = if hooks.is_absolute() {
            hooks
        } else {
            self.work_dir.join(hooks)
        };
        debug!(path = %hooks.display(), "hooks directory resolved");
        Ok(hooks)
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Git(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Drop `index ...` header lines; the blob hashes only waste prompt space.
pub fn clean_diff(diff: &str) -> String {
    diff.lines()
        .filter(|line| !line.starts_with("index "))
        .collect::<Vec<_>>()
        .join("\n")
}
