// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
//
// SPDX-License-Identifier: GPL-3.0-only

pub mod clipboard;
pub mod formatter;
pub mod git;
pub mod github;
pub mod hook;
pub mod llm;
pub mod prompt;
