// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

// miette's Diagnostic derive generates code that triggers this false positive
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("No staged changes found")]
    #[diagnostic(
        code(lazym::git::no_staged),
        help("Stage files with: git add <files>")
    )]
    NoStagedChanges,

    #[error("Not a git repository")]
    #[diagnostic(
        code(lazym::git::not_repo),
        help("Run this command inside a git repository")
    )]
    NotAGitRepo,

    #[error("Merge in progress")]
    #[diagnostic(
        code(lazym::git::merge),
        help("Complete or abort the merge: git merge --abort")
    )]
    MergeInProgress,

    #[error("Operation cancelled by user")]
    Cancelled,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot connect to Ollama at {host}")]
    #[diagnostic(
        code(lazym::ollama::not_running),
        help("Start Ollama with: ollama serve")
    )]
    OllamaNotRunning { host: String },

    #[error("Model '{model}' not found. Available: {}", available.join(", "))]
    #[diagnostic(
        code(lazym::ollama::model_not_found),
        help("Pull the model with: ollama pull {model}")
    )]
    ModelNotFound {
        model: String,
        available: Vec<String>,
    },

    #[error("Provider '{provider}' error: {message}")]
    #[diagnostic(code(lazym::provider::error))]
    Provider { provider: String, message: String },

    #[error("Invalid commit message: {0}")]
    #[diagnostic(code(lazym::commit::invalid))]
    InvalidCommitMessage(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(lazym::config::error))]
    Config(String),

    #[error("Git error: {0}")]
    #[diagnostic(code(lazym::git::error))]
    Git(String),

    #[error("Cannot determine GitHub repository from remote '{remote}': {url}")]
    #[diagnostic(
        code(lazym::github::remote),
        help("Point the remote at github.com, e.g. git@github.com:owner/repo.git")
    )]
    NotGitHubRemote { remote: String, url: String },

    #[error("GitHub API token is required")]
    #[diagnostic(
        code(lazym::github::token),
        help("Set GITHUB_TOKEN, run `gh auth login`, or set github_token in the config file")
    )]
    MissingGitHubToken,

    #[error("GitHub API returned {status}: {message}")]
    #[diagnostic(code(lazym::github::api))]
    GitHub { status: u16, message: String },

    #[error("Hook error: {0}")]
    #[diagnostic(code(lazym::hook::error))]
    Hook(String),

    #[error("Clipboard error: {0}")]
    #[diagnostic(code(lazym::clipboard::error))]
    Clipboard(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Dialog error: {0}")]
    Dialog(String),

    #[cfg(feature = "secure-storage")]
    #[error("Keyring error: {0}")]
    #[diagnostic(
        code(lazym::keyring::error),
        help("Check your system keychain configuration")
    )]
    Keyring(String),
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Dialog(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
