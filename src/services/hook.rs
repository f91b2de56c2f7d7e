// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

pub const HOOK_NAME: &str = "prepare-commit-msg";
pub const HOOK_MARKER: &str = "# lazym hook";
const BACKUP_SUFFIX: &str = ".lazym-backup";

const HOOK_SCRIPT: &str = r#"#!/bin/sh
# lazym hook: auto-generated, do not edit
# Fills in the commit message with lazym when committing interactively.
# Skips merge, squash, amend, and message-provided commits.

COMMIT_MSG_FILE="$1"
COMMIT_SOURCE="$2"

case "$COMMIT_SOURCE" in
    merge|squash|message|commit)
        exit 0
        ;;
esac

if ! command -v lazym >/dev/null 2>&1; then
    exit 0
fi

MSG=$(lazym --yes --dry-run 2>/dev/null)
if [ $? -eq 0 ] && [ -n "$MSG" ]; then
    echo "$MSG" > "$COMMIT_MSG_FILE"
fi
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    NotInstalled,
    Installed,
    /// A prepare-commit-msg hook exists that lazym did not write
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { backup: Option<PathBuf> },
    AlreadyInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed { restored_backup: bool },
    NotFound,
}

pub fn hook_path(hooks_dir: &Path) -> PathBuf {
    hooks_dir.join(HOOK_NAME)
}

fn backup_path(hooks_dir: &Path) -> PathBuf {
    hooks_dir.join(format!("{HOOK_NAME}{BACKUP_SUFFIX}"))
}

fn is_ours(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| content.contains(HOOK_MARKER))
        .unwrap_or(false)
}

pub fn status(hooks_dir: &Path) -> HookStatus {
    let path = hook_path(hooks_dir);
    if !path.exists() {
        HookStatus::NotInstalled
    } else if is_ours(&path) {
        HookStatus::Installed
    } else {
        HookStatus::Foreign
    }
}

pub fn install(hooks_dir: &Path) -> Result<InstallOutcome> {
    let hook_path = hook_path(hooks_dir);

    fs::create_dir_all(hooks_dir)?;

    let mut backup = None;
    match status(hooks_dir) {
        HookStatus::Installed => return Ok(InstallOutcome::AlreadyInstalled),
        HookStatus::Foreign => {
            let path = backup_path(hooks_dir);
            if path.exists() {
                return Err(Error::Hook(format!(
                    "A backup already exists at {}. Restore or remove it before installing.",
                    path.display()
                )));
            }
            fs::copy(&hook_path, &path)?;
            debug!(backup = %path.display(), "existing hook backed up");
            backup = Some(path);
        }
        HookStatus::NotInstalled => {}
    }

    // Write to temp file first, then rename (atomic)
    let temp_path = hooks_dir.join(format!(".{HOOK_NAME}.tmp"));
    fs::write(&temp_path, HOOK_SCRIPT)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&temp_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&temp_path, perms)?;
    }

    fs::rename(&temp_path, &hook_path)?;
    Ok(InstallOutcome::Installed { backup })
}

pub fn uninstall(hooks_dir: &Path) -> Result<UninstallOutcome> {
    let hook_path = hook_path(hooks_dir);

    match status(hooks_dir) {
        HookStatus::NotInstalled => return Ok(UninstallOutcome::NotFound),
        HookStatus::Foreign => {
            return Err(Error::Hook(format!(
                "Hook at {} was not installed by lazym. Remove manually if intended.",
                hook_path.display()
            )));
        }
        HookStatus::Installed => {}
    }

    fs::remove_file(&hook_path)?;

    let backup = backup_path(hooks_dir);
    let restored_backup = backup.exists();
    if restored_backup {
        fs::rename(&backup, &hook_path)?;
    }

    Ok(UninstallOutcome::Removed { restored_backup })
}
