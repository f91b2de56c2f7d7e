// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

use std::io::IsTerminal;
use std::time::Duration;

use console::style;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cli::{Cli, Commands, HookAction};
use crate::config::Config;
use crate::domain::{BumpClass, NewRelease, SemanticVersion, bump_version, tag_name};
use crate::error::{Error, Result};
use crate::services::{
    clipboard,
    formatter::{FormatOptions, format_commit_message},
    git::GitService,
    github::{self, GitHubClient},
    hook::{self, HookStatus, InstallOutcome, UninstallOutcome},
    llm::{self, LlmProvider},
    prompt::PromptTemplate,
};

const INITIAL_COMMIT_CONTEXT: &str = "This is the initial commit of the repository.";

/// Entries of the post-generation menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Commit,
    Edit,
    Regenerate,
    Cancel,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 4] = [Self::Commit, Self::Edit, Self::Regenerate, Self::Cancel];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Commit => "Commit",
            Self::Edit => "Edit",
            Self::Regenerate => "Regenerate",
            Self::Cancel => "Cancel",
        }
    }
}

pub struct App {
    cli: Cli,
    config: Config,
    cancel_token: CancellationToken,
}

impl App {
    pub fn new(cli: Cli) -> Result<Self> {
        let config = Config::load(&cli)?;
        debug!(
            provider = %config.provider,
            model = %config.model,
            message_format = %config.message_format,
            "config loaded"
        );
        let cancel_token = CancellationToken::new();
        Ok(Self {
            cli,
            config,
            cancel_token,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let cancel = self.cancel_token.clone();
        tokio::spawn(async move {
            signal::ctrl_c().await.ok();
            cancel.cancel();
        });

        if let Some(ref cmd) = self.cli.command {
            return self.handle_command(cmd).await;
        }

        self.generate_commit().await
    }

    async fn generate_commit(&self) -> Result<()> {
        self.print_status("Reading staged changes...");

        let git = GitService::discover()?;
        let diff = git.staged_diff().await?;
        let prompt = self.build_prompt(&diff, Self::history_context(&git))?;

        let provider = self.connect_provider().await?;
        let mut message = self.generate_message(provider.as_ref(), &prompt).await?;

        if self.cli.dry_run {
            println!("{message}");
            return Ok(());
        }

        if self.cli.yes {
            return self.commit(&git, &message).await;
        }

        if !Self::is_interactive() {
            self.print_warning("Not a terminal. Use --yes to auto-confirm in scripts/hooks.");
            println!("{message}");
            return Ok(());
        }

        loop {
            eprintln!("\n{}", style("Generated commit message:").bold());
            eprintln!("{}\n", style(&message).green());

            match self.select_action()? {
                MenuChoice::Commit => return self.commit(&git, &message).await,
                MenuChoice::Edit => {
                    message = Self::edit_message(&message)?;
                }
                MenuChoice::Regenerate => {
                    message = self.generate_message(provider.as_ref(), &prompt).await?;
                }
                MenuChoice::Cancel => return Err(Error::Cancelled),
            }
        }
    }

    async fn generate_with_context(&self, context: &str) -> Result<()> {
        let git = GitService::discover()?;
        let diff = git.staged_diff().await?;
        let context = match Self::history_context(&git) {
            Some(initial) => format!("{initial} {}", context.trim()),
            None => context.to_string(),
        };
        let prompt = self.build_prompt(&diff, Some(context.as_str()))?;

        let provider = self.connect_provider().await?;
        let message = self.generate_message(provider.as_ref(), &prompt).await?;

        eprintln!("{}\n", style("Generated commit message:").bold());
        println!("{message}");
        Ok(())
    }

    /// Prompt hint for the very first commit, where the diff is the whole tree.
    fn history_context(git: &GitService) -> Option<&'static str> {
        if git.has_commit_history() {
            return None;
        }
        debug!("repository has no commits yet");
        Some(INITIAL_COMMIT_CONTEXT)
    }

    fn build_prompt(&self, diff: &str, context: Option<&str>) -> Result<String> {
        let template = PromptTemplate::from_config(&self.config)?;
        let prompt = template.render(diff, context);
        debug!(prompt_chars = prompt.len(), "prompt built");

        if self.cli.show_prompt {
            eprintln!("{}", style("--- PROMPT ---").dim());
            eprintln!("{prompt}");
            eprintln!("{}", style("--- END PROMPT ---").dim());
        }

        Ok(prompt)
    }

    async fn connect_provider(&self) -> Result<Box<dyn LlmProvider>> {
        self.print_status(&format!(
            "Contacting {} ({})...",
            self.config.provider, self.config.model
        ));

        let provider = llm::create_provider(&self.config)?;
        debug!(provider = provider.name(), "verifying provider");
        provider.verify().await?;
        Ok(provider)
    }

    async fn generate_message(&self, provider: &dyn LlmProvider, prompt: &str) -> Result<String> {
        if self.cancel_token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Generating commit message");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let (tx, mut rx) = mpsc::channel::<String>(64);
        let ticker = spinner.clone();
        let cancel_for_printer = self.cancel_token.clone();
        let print_handle = tokio::spawn(async move {
            let mut tokens = 0usize;
            loop {
                tokio::select! {
                    _ = cancel_for_printer.cancelled() => break,
                    token = rx.recv() => {
                        let Some(_) = token else { break };
                        tokens += 1;
                        ticker.set_message(format!("Generating commit message ({tokens} tokens)"));
                    }
                }
            }
        });

        let result = provider
            .generate(prompt, tx, self.cancel_token.clone())
            .await;
        let _ = print_handle.await;

        let raw_message = match result {
            Ok(raw) => raw,
            Err(e) => {
                spinner.abandon_with_message("Generation failed");
                return Err(e);
            }
        };
        spinner.finish_with_message("Generated commit message");

        debug!(raw_len = raw_message.len(), "formatting LLM response");
        format_commit_message(&raw_message, &FormatOptions::from(&self.config))
    }

    fn select_action(&self) -> Result<MenuChoice> {
        let labels: Vec<&str> = MenuChoice::ALL.iter().map(MenuChoice::label).collect();
        let selection = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;
        Ok(MenuChoice::ALL[selection])
    }

    fn edit_message(current: &str) -> Result<String> {
        let edited: String = Input::new()
            .with_prompt("Commit message")
            .with_initial_text(current)
            .validate_with(|input: &String| -> std::result::Result<(), &str> {
                if input.trim().is_empty() {
                    Err("commit message cannot be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;
        Ok(edited.trim().to_string())
    }

    /// Commit, falling back to the clipboard so the message isn't lost.
    async fn commit(&self, git: &GitService, message: &str) -> Result<()> {
        match git.commit(message).await {
            Ok(()) => {
                eprintln!("{} Committed!", style("✓").green().bold());
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "commit failed");
                self.print_info("Copying commit message to clipboard...");
                if cfg!(target_os = "linux") {
                    self.print_info(&format!(
                        "Paste it within {}s, or keep it with a clipboard manager",
                        clipboard::LINUX_HOLD.as_secs()
                    ));
                }

                let text = message.to_owned();
                let copied =
                    tokio::task::spawn_blocking(move || clipboard::copy_to_clipboard(&text))
                        .await
                        .map_err(|join_err| Error::Clipboard(join_err.to_string()))
                        .and_then(|result| result);
                match copied {
                    Ok(()) => self.print_info("Commit message copied to clipboard"),
                    Err(clip_err) => warn!(error = %clip_err, "clipboard fallback failed"),
                }
                Err(e)
            }
        }
    }

    async fn handle_command(&self, cmd: &Commands) -> Result<()> {
        match cmd {
            Commands::Ci { context } => self.generate_with_context(context).await,
            Commands::Bump { version, class } => {
                println!("{}", bump_version(version, *class)?);
                Ok(())
            }
            Commands::Tag {
                class,
                push,
                remote,
            } => self.create_tag(*class, *push, remote.as_deref()).await,
            Commands::Release {
                class,
                name,
                notes,
                draft,
                prerelease,
                remote,
            } => {
                let options = ReleaseOptions {
                    class: *class,
                    name: name.clone(),
                    notes: notes.clone(),
                    draft: *draft,
                    prerelease: *prerelease,
                };
                self.create_release(options, remote.as_deref()).await
            }
            Commands::Hook { action } => self.handle_hook(*action).await,
            Commands::Init => {
                let path = Config::create_default()?;
                println!("Created config: {}", path.display());
                Ok(())
            }
            Commands::Config => {
                self.print_config();
                Ok(())
            }
            Commands::Completions { shell } => {
                let mut cmd = <Cli as clap::CommandFactory>::command();
                clap_complete::generate(*shell, &mut cmd, "lazym", &mut std::io::stdout());
                Ok(())
            }
            #[cfg(feature = "secure-storage")]
            Commands::SetKey { service } => self.set_api_key(service),
            #[cfg(feature = "secure-storage")]
            Commands::GetKey { service } => self.get_api_key(service),
        }
    }

    fn print_config(&self) {
        println!("Provider: {}", self.config.provider);
        println!("Model: {}", self.config.model);
        println!("Ollama host: {}", self.config.ollama_host);
        if let Some(ref base) = self.config.openai_base_url {
            println!("OpenAI base URL: {base}");
        }
        println!(
            "API key: {}",
            if self.config.api_key.is_some() {
                "set"
            } else {
                "not set"
            }
        );
        println!("Temperature: {}", self.config.temperature);
        println!("Max tokens: {}", self.config.num_predict);
        println!("Timeout: {}s", self.config.timeout_secs);
        println!("Max retries: {}", self.config.max_retries);
        println!("Max diff chars: {}", self.config.max_diff_chars);
        println!("Message format: {}", self.config.message_format);
        println!("Strip trailing period: {}", self.config.rstrip_period);
        if let Some(ref path) = self.config.prompt_file {
            println!("Prompt file: {}", path.display());
        }
        println!("GitHub API: {}", self.config.github_api_url);
        println!("Remote: {}", self.config.remote);
        if let Some(ref path) = Config::config_path() {
            let status = if path.exists() { "found" } else { "not found" };
            println!("Config file: {} ({status})", path.display());
        }
    }

    // ─── Versioning ───

    async fn create_tag(&self, class: BumpClass, push: bool, remote: Option<&str>) -> Result<()> {
        let git = GitService::discover()?;
        let remote = remote.unwrap_or(self.config.remote.as_str());

        let (current_label, current) = match git.latest_version_tag().await? {
            Some((tag, version)) => (tag, version),
            None => {
                self.print_info("No version tags found, starting from 0.0.0");
                ("(none)".to_string(), SemanticVersion::new(0, 0, 0))
            }
        };

        let next = current.bump(class)?.core();
        let tag = tag_name(&next);

        eprintln!(
            "{} {} → {} ({class})",
            style("→").cyan(),
            current_label,
            style(&tag).green().bold()
        );

        if !self.confirm(&format!("Create tag {tag}?"), true)? {
            return Err(Error::Cancelled);
        }

        git.create_tag(&tag).await?;
        eprintln!("{} Tag {tag} created", style("✓").green().bold());

        let push = push
            || (!self.cli.yes && self.confirm(&format!("Push {tag} to {remote}?"), false)?);
        if push {
            git.push_tag(remote, &tag).await?;
            eprintln!("{} Tag {tag} pushed to {remote}", style("✓").green().bold());
        }

        Ok(())
    }

    async fn create_release(&self, options: ReleaseOptions, remote: Option<&str>) -> Result<()> {
        let git = GitService::discover()?;
        let remote = remote.unwrap_or(self.config.remote.as_str());

        let url = git.remote_url(remote).await?;
        let (owner, repo) =
            github::parse_remote_url(&url).ok_or_else(|| Error::NotGitHubRemote {
                remote: remote.to_string(),
                url: url.clone(),
            })?;
        debug!(%owner, %repo, "github repository resolved");

        let token = github::resolve_token(&self.config).await?;
        let client = GitHubClient::from_config(&self.config, token);

        let current = match client.latest_release(&owner, &repo).await? {
            Some(release) => {
                self.print_info(&format!("Latest release: {}", release.tag_name));
                release.tag_name.parse::<SemanticVersion>()?
            }
            None => match git.latest_version_tag().await? {
                Some((tag, version)) => {
                    self.print_info(&format!("No releases yet, using local tag {tag}"));
                    version
                }
                None => {
                    self.print_info("No releases or version tags found, starting from 0.0.0");
                    SemanticVersion::new(0, 0, 0)
                }
            },
        };

        let next = current.bump(options.class)?.core();
        let tag = tag_name(&next);

        let mut release = NewRelease::for_tag(&tag);
        release.name = options.name.unwrap_or_else(|| tag.clone());
        release.body = options.notes;
        release.draft = options.draft;
        release.prerelease = options.prerelease;

        eprintln!(
            "{} {owner}/{repo}: {current} → {} ({})",
            style("→").cyan(),
            style(&tag).green().bold(),
            options.class
        );

        if !self.confirm(&format!("Create GitHub release {tag}?"), true)? {
            return Err(Error::Cancelled);
        }

        let created = client.create_release(&owner, &repo, &release).await?;
        eprintln!(
            "{} Release {} created: {}",
            style("✓").green().bold(),
            created.tag_name,
            created.html_url
        );
        Ok(())
    }

    // ─── Hook Commands ───

    async fn handle_hook(&self, action: HookAction) -> Result<()> {
        let git = GitService::discover()?;
        let hooks_dir = git.hooks_dir().await?;
        let path = hook::hook_path(&hooks_dir);

        match action {
            HookAction::Install => match hook::install(&hooks_dir)? {
                InstallOutcome::AlreadyInstalled => {
                    eprintln!(
                        "{} Hook already installed at {}",
                        style("✓").green().bold(),
                        path.display()
                    );
                }
                InstallOutcome::Installed { backup } => {
                    if let Some(backup) = backup {
                        self.print_info(&format!(
                            "Backed up existing hook to {}",
                            backup.display()
                        ));
                    }
                    eprintln!(
                        "{} Hook installed at {}",
                        style("✓").green().bold(),
                        path.display()
                    );
                }
            },
            HookAction::Uninstall => match hook::uninstall(&hooks_dir)? {
                UninstallOutcome::NotFound => {
                    self.print_info(&format!("No hook found at {}", path.display()));
                }
                UninstallOutcome::Removed { restored_backup } => {
                    if restored_backup {
                        self.print_info("Restored previous hook from backup");
                    }
                    eprintln!(
                        "{} Hook removed from {}",
                        style("✓").green().bold(),
                        path.display()
                    );
                }
            },
            HookAction::Status => match hook::status(&hooks_dir) {
                HookStatus::NotInstalled => {
                    eprintln!(
                        "{} No prepare-commit-msg hook installed",
                        style("✗").red().bold()
                    );
                    eprintln!("  Install with: {}", style("lazym hook install").yellow());
                }
                HookStatus::Installed => {
                    eprintln!(
                        "{} lazym hook is installed at {}",
                        style("✓").green().bold(),
                        path.display()
                    );
                }
                HookStatus::Foreign => {
                    self.print_info(
                        "A prepare-commit-msg hook exists but was not installed by lazym",
                    );
                }
            },
        }

        Ok(())
    }

    // ─── Keyring Commands ───

    #[cfg(feature = "secure-storage")]
    fn keyring_service(service: &str) -> Result<String> {
        let service = service.to_lowercase();
        if !matches!(service.as_str(), "groq" | "openai" | "github") {
            return Err(Error::Config(format!(
                "Keyring storage supports groq, openai, and github, got '{service}'"
            )));
        }
        Ok(service)
    }

    #[cfg(feature = "secure-storage")]
    fn set_api_key(&self, service: &str) -> Result<()> {
        let service = Self::keyring_service(service)?;

        eprintln!(
            "Enter token for {} (input will be hidden):",
            style(&service).bold()
        );

        let key = dialoguer::Password::new().with_prompt("Token").interact()?;

        if key.trim().is_empty() {
            return Err(Error::Config("Token cannot be empty".into()));
        }

        let entry =
            keyring::Entry::new("lazym", &service).map_err(|e| Error::Keyring(e.to_string()))?;
        entry
            .set_password(key.trim())
            .map_err(|e| Error::Keyring(e.to_string()))?;

        eprintln!("{} Token stored for {service}", style("✓").green().bold());
        Ok(())
    }

    #[cfg(feature = "secure-storage")]
    fn get_api_key(&self, service: &str) -> Result<()> {
        let service = Self::keyring_service(service)?;

        let entry =
            keyring::Entry::new("lazym", &service).map_err(|e| Error::Keyring(e.to_string()))?;

        match entry.get_password() {
            Ok(_) => {
                eprintln!(
                    "{} Token for {service} is stored in keychain",
                    style("✓").green().bold()
                );
            }
            Err(keyring::Error::NoEntry) => {
                eprintln!(
                    "{} No token found for {service} in keychain",
                    style("✗").red().bold()
                );
                eprintln!(
                    "  Store one with: {}",
                    style(format!("lazym set-key {service}")).yellow()
                );
            }
            Err(e) => return Err(Error::Keyring(e.to_string())),
        }

        Ok(())
    }

    // ─── Output Helpers ───

    fn is_interactive() -> bool {
        std::io::stdout().is_terminal() && std::io::stdin().is_terminal()
    }

    /// `--yes` answers every prompt; non-terminals can't be asked, so they decline.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.cli.yes {
            return Ok(true);
        }
        if !Self::is_interactive() {
            self.print_warning("Not a terminal. Use --yes to auto-confirm in scripts.");
            return Ok(false);
        }
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    fn print_status(&self, msg: &str) {
        eprintln!("{} {}", style("→").cyan(), msg);
    }

    fn print_info(&self, msg: &str) {
        eprintln!("{} {}", style("info:").cyan(), msg);
    }

    fn print_warning(&self, msg: &str) {
        eprintln!("{} {}", style("warning:").yellow().bold(), msg);
    }
}

struct ReleaseOptions {
    class: BumpClass,
    name: Option<String>,
    notes: Option<String>,
    draft: bool,
    prerelease: bool,
}
