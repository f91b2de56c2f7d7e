// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{Config, MessageFormat};
use crate::error::{Error, Result};

static CODE_FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[a-zA-Z]*\n?([\s\S]*?)```").unwrap());

static PREAMBLE_PATTERNS: &[&str] = &[
    "commit_msg:",
    "here's the commit message:",
    "here is the commit message:",
    "here's a commit message:",
    "here is a commit message:",
    "commit message:",
    "suggested commit:",
];

/// Post-processing applied to raw model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub format: MessageFormat,
    pub rstrip_period: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            format: MessageFormat::Lowercase,
            rstrip_period: true,
        }
    }
}

impl From<&Config> for FormatOptions {
    fn from(config: &Config) -> Self {
        Self {
            format: config.message_format,
            rstrip_period: config.rstrip_period,
        }
    }
}

/// Reduce raw LLM output to a single commit message line.
pub fn format_commit_message(raw: &str, options: &FormatOptions) -> Result<String> {
    let unfenced = CODE_FENCE_REGEX.replace_all(raw, "$1");

    let line = unfenced
        .lines()
        .map(strip_preamble)
        .map(strip_quotes)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let line = if options.rstrip_period {
        line.trim_end_matches('.').trim_end()
    } else {
        line
    };

    if line.is_empty() {
        return Err(Error::InvalidCommitMessage(
            "model returned an empty message".into(),
        ));
    }

    Ok(apply_case(line, options.format))
}

fn strip_preamble(line: &str) -> &str {
    let trimmed = line.trim();
    let lower = trimmed.to_lowercase();
    for pattern in PREAMBLE_PATTERNS {
        // Lowercasing can change byte lengths outside ASCII; only slice when it didn't.
        if lower.starts_with(pattern) && lower.len() == trimmed.len() {
            return trimmed[pattern.len()..].trim();
        }
    }
    trimmed
}

fn strip_quotes(line: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if line.len() >= 2 && line.starts_with(quote) && line.ends_with(quote) {
            return line[1..line.len() - 1].trim();
        }
    }
    line
}

fn apply_case(line: &str, format: MessageFormat) -> String {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    match format {
        MessageFormat::Lowercase => first.to_lowercase().chain(chars).collect(),
        MessageFormat::SentenceCase => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        MessageFormat::Original => line.to_string(),
    }
}
