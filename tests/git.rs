// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

//! `GitService` against throwaway repositories created with the git CLI.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use lazym::domain::SemanticVersion;
use lazym::error::Error;
use lazym::services::git::GitService;

// ─── Test helpers ────────────────────────────────────────────────────────────

fn git(dir: &Path, args: &[&str]) -> String {
    git_with_env(dir, args, &[])
}

fn git_with_env(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .envs(env.iter().copied())
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("HOME", dir)
        .output()
        .expect("git must be installed to run these tests");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Fresh repository with an identity configured and nothing committed.
fn init_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["config", "user.name", "lazym tests"]);
    git(dir.path(), &["config", "user.email", "tests@lazym.invalid"]);
    git(dir.path(), &["config", "commit.gpgsign", "false"]);
    git(dir.path(), &["config", "tag.gpgsign", "false"]);
    dir
}

/// Repository with a single commit of `README.md`.
fn repo_with_commit() -> TempDir {
    let dir = init_repo();
    fs::write(dir.path().join("README.md"), "lazym\n").unwrap();
    git(dir.path(), &["add", "README.md"]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

fn annotated_tag_at(dir: &Path, tag: &str, date: &str) {
    git_with_env(
        dir,
        &["tag", "-a", tag, "-m", tag],
        &[("GIT_COMMITTER_DATE", date)],
    );
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.canonicalize().unwrap() == b.canonicalize().unwrap()
}

// ─── Discovery and history ───────────────────────────────────────────────────

#[test]
fn discover_outside_repository_fails() {
    let dir = TempDir::new().unwrap();
    let result = GitService::discover_at(dir.path());
    assert!(matches!(result, Err(Error::NotAGitRepo)));
}

#[test]
fn commit_history_tracks_head() {
    let fresh = init_repo();
    assert!(!GitService::discover_at(fresh.path()).unwrap().has_commit_history());

    let committed = repo_with_commit();
    assert!(GitService::discover_at(committed.path()).unwrap().has_commit_history());
}

// ─── Staged diff ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_index_has_no_staged_changes() {
    let dir = repo_with_commit();
    fs::write(dir.path().join("README.md"), "unstaged edit\n").unwrap();

    let service = GitService::discover_at(dir.path()).unwrap();
    let result = service.staged_diff().await;
    assert!(matches!(result, Err(Error::NoStagedChanges)), "got: {result:?}");
}

#[tokio::test]
async fn staged_diff_drops_index_lines() {
    let dir = repo_with_commit();
    fs::write(dir.path().join("README.md"), "lazym\nindex = 1\n").unwrap();
    git(dir.path(), &["add", "README.md"]);

    let service = GitService::discover_at(dir.path()).unwrap();
    let diff = service.staged_diff().await.unwrap();

    assert!(diff.starts_with("diff --git a/README.md b/README.md"));
    assert!(diff.contains("+index = 1"));
    assert!(!diff.lines().any(|line| line.starts_with("index ")), "{diff}");
}

#[tokio::test]
async fn commit_records_message() {
    let dir = repo_with_commit();
    fs::write(dir.path().join("CHANGELOG.md"), "0.1.0\n").unwrap();
    git(dir.path(), &["add", "CHANGELOG.md"]);

    let service = GitService::discover_at(dir.path()).unwrap();
    service.commit("add changelog").await.unwrap();

    assert_eq!(git(dir.path(), &["log", "-1", "--format=%s"]).trim(), "add changelog");
}

// ─── Tags ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn latest_version_tag_skips_non_semver_tags() {
    let dir = repo_with_commit();
    annotated_tag_at(dir.path(), "v1.0.0", "2024-01-01T10:00:00+00:00");
    annotated_tag_at(dir.path(), "v1.2.0", "2024-02-01T10:00:00+00:00");
    annotated_tag_at(dir.path(), "nightly", "2024-03-01T10:00:00+00:00");
    annotated_tag_at(dir.path(), "1.02.0", "2024-04-01T10:00:00+00:00");

    let service = GitService::discover_at(dir.path()).unwrap();
    assert_eq!(
        service.local_tags(2).await.unwrap(),
        vec!["1.02.0", "nightly"]
    );

    let (tag, version) = service.latest_version_tag().await.unwrap().unwrap();
    assert_eq!(tag, "v1.2.0");
    assert_eq!(version, SemanticVersion::new(1, 2, 0));
}

#[tokio::test]
async fn no_tags_means_no_version() {
    let dir = repo_with_commit();
    let service = GitService::discover_at(dir.path()).unwrap();
    assert!(service.latest_version_tag().await.unwrap().is_none());
}

#[tokio::test]
async fn create_tag_is_annotated() {
    let dir = repo_with_commit();
    let service = GitService::discover_at(dir.path()).unwrap();

    service.create_tag("v0.0.1").await.unwrap();

    assert_eq!(git(dir.path(), &["cat-file", "-t", "v0.0.1"]).trim(), "tag");
    let (tag, version) = service.latest_version_tag().await.unwrap().unwrap();
    assert_eq!(tag, "v0.0.1");
    assert_eq!(version.core(), "0.0.1");
}

#[tokio::test]
async fn remote_url_reads_config() {
    let dir = repo_with_commit();
    git(
        dir.path(),
        &["remote", "add", "origin", "git@github.com:owner/repo.git"],
    );

    let service = GitService::discover_at(dir.path()).unwrap();
    assert_eq!(
        service.remote_url("origin").await.unwrap(),
        "git@github.com:owner/repo.git"
    );
    assert!(matches!(
        service.remote_url("upstream").await,
        Err(Error::Git(_))
    ));
}

// ─── Hooks directory ─────────────────────────────────────────────────────────

#[tokio::test]
async fn hooks_dir_defaults_to_git_dir() {
    let dir = init_repo();
    let service = GitService::discover_at(dir.path()).unwrap();

    let hooks = service.hooks_dir().await.unwrap();
    fs::create_dir_all(&hooks).unwrap();
    assert!(same_path(&hooks, &dir.path().join(".git").join("hooks")));
}

#[tokio::test]
async fn hooks_dir_honors_relative_hooks_path() {
    let dir = init_repo();
    git(dir.path(), &["config", "core.hooksPath", ".githooks"]);
    fs::create_dir_all(dir.path().join(".githooks")).unwrap();

    let service = GitService::discover_at(dir.path()).unwrap();
    let hooks = service.hooks_dir().await.unwrap();
    assert!(same_path(&hooks, &dir.path().join(".githooks")), "{hooks:?}");
}

#[tokio::test]
async fn hooks_dir_honors_absolute_hooks_path() {
    let dir = init_repo();
    let shared = TempDir::new().unwrap();
    let shared_path = shared.path().to_str().unwrap();
    git(dir.path(), &["config", "core.hooksPath", shared_path]);

    let service = GitService::discover_at(dir.path()).unwrap();
    let hooks = service.hooks_dir().await.unwrap();
    assert!(same_path(&hooks, shared.path()), "{hooks:?}");
}

#[tokio::test]
async fn hooks_dir_in_linked_worktree_uses_common_hooks() {
    let dir = repo_with_commit();
    let worktree_parent = TempDir::new().unwrap();
    let worktree = worktree_parent.path().join("wt");
    git(
        dir.path(),
        &["worktree", "add", "-q", "-b", "feature", worktree.to_str().unwrap()],
    );

    let service = GitService::discover_at(&worktree).unwrap();
    let hooks = service.hooks_dir().await.unwrap();
    fs::create_dir_all(&hooks).unwrap();
    assert!(
        same_path(&hooks, &dir.path().join(".git").join("hooks")),
        "{hooks:?}"
    );
}
