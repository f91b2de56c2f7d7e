// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;

use crate::config::Provider;
use crate::domain::{BumpClass, ValidationError};

#[derive(Parser, Debug)]
#[command(name = "lazym")]
#[command(version)]
#[command(about = "LLM-powered commit message generator", long_about = None)]
pub struct Cli {
    /// LLM provider
    #[arg(
        short,
        long,
        env = "LAZYM_PROVIDER",
        global = true,
        value_enum,
        ignore_case = true
    )]
    pub provider: Option<Provider>,

    /// Model name (prefix with `groq:` to use Groq)
    #[arg(short, long, env = "LAZYM_MODEL", global = true)]
    pub model: Option<String>,

    /// Auto-confirm without prompting
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Print message only, don't commit
    #[arg(long)]
    pub dry_run: bool,

    /// Show the prompt sent to LLM
    #[arg(long, global = true)]
    pub show_prompt: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate a commit message with additional context and print it
    Ci {
        /// Extra context passed to the model (intent, ticket summary, ...)
        context: String,
    },
    /// Print the next version for a given bump class
    Bump {
        /// Current version, e.g. 1.4.2 or v1.4.2
        version: String,
        /// major (alias: main), minor, or patch
        #[arg(value_parser = parse_bump_class)]
        class: BumpClass,
    },
    /// Create the next annotated version tag from the newest local tag
    Tag {
        /// major (alias: main), minor, or patch
        #[arg(value_parser = parse_bump_class, default_value = "patch")]
        class: BumpClass,
        /// Push the new tag to the remote
        #[arg(long)]
        push: bool,
        /// Remote to push to (defaults to the configured remote)
        #[arg(long)]
        remote: Option<String>,
    },
    /// Create a GitHub release for the next version
    Release {
        /// major (alias: main), minor, or patch
        #[arg(value_parser = parse_bump_class, default_value = "patch")]
        class: BumpClass,
        /// Release title (defaults to the tag name)
        #[arg(long)]
        name: Option<String>,
        /// Release body; GitHub-generated notes are appended
        #[arg(long)]
        notes: Option<String>,
        /// Create as draft
        #[arg(long)]
        draft: bool,
        /// Mark as prerelease
        #[arg(long)]
        prerelease: bool,
        /// Remote whose URL identifies the GitHub repository
        #[arg(long)]
        remote: Option<String>,
    },
    /// Manage the prepare-commit-msg git hook
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },
    /// Initialize config file
    Init,
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Store an API token in the system keychain (groq, openai, github)
    #[cfg(feature = "secure-storage")]
    SetKey { service: String },
    /// Check whether an API token is stored in the system keychain
    #[cfg(feature = "secure-storage")]
    GetKey { service: String },
}

#[derive(clap::Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    /// Install the prepare-commit-msg hook
    Install,
    /// Remove the hook (restores any backed-up hook)
    Uninstall,
    /// Show whether the hook is installed
    Status,
}

/// `main` is accepted here as an alias for `major`; the engine only knows `major`.
pub fn parse_bump_class(s: &str) -> std::result::Result<BumpClass, ValidationError> {
    if s.trim().eq_ignore_ascii_case("main") {
        return Ok(BumpClass::Major);
    }
    s.parse()
}
