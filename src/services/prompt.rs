// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0

use std::fs;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};

const DIFF_PLACEHOLDER: &str = "{diff}";

pub const DEFAULT_TEMPLATE: &str = r#"You are a git commit message generator.
Your task is to help the user write a good commit message.
Take the whole conversation in consideration and suggest a good commit message.
Never say anything that is not your proposed commit message, never apologize.

Rules:
- One line only.
- The diff must not be included in the commit message.
- Do not put message in quotes.
- Put the most important changes first.
- Be clear and concise.
- Follow standard commit message conventions.
- Avoid using "refactor" or "update" as they are too vague.
- Focus on the intent of the change, not just the code change. WHY, not how.
- The commit message must not contain fake issue numbers.
- The commit message must not contain statistics (e.g., lines added or deleted).
- No explanation or additional text is allowed.

Give me a one-line commit message based on the following git diff (enclosed in triple backticks):
```
{diff}
```

COMMIT_MSG:
"#;

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    max_diff_chars: usize,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>, max_diff_chars: usize) -> Result<Self> {
        let template = template.into();
        if !template.contains(DIFF_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "prompt template must contain {DIFF_PLACEHOLDER}"
            )));
        }
        Ok(Self {
            template,
            max_diff_chars,
        })
    }

    /// Built-in template, or `prompt_file` when configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.prompt_file {
            Some(ref path) => {
                debug!(path = %path.display(), "loading prompt template");
                let template = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read prompt_file {}: {e}", path.display()))
                })?;
                Self::new(template, config.max_diff_chars)
            }
            None => Self::new(DEFAULT_TEMPLATE, config.max_diff_chars),
        }
    }

    pub fn render(&self, diff: &str, context: Option<&str>) -> String {
        let diff = truncate_chars(diff, self.max_diff_chars);
        let mut prompt = self.template.replace(DIFF_PLACEHOLDER, diff);

        if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
            prompt.push_str("\n\nAdditional context: ");
            prompt.push_str(context);
        }

        prompt
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => {
            warn!(max_chars, "diff truncated to fit prompt budget");
            &s[..idx]
        }
        None => s,
    }
}
