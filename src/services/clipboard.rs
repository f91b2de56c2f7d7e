// SPDX-FileCopyrightText: 2026 Sephyi <me@sephy.io>
// SPDX-License-Identifier: GPL-3.0-only

use std::time::Duration;

use crate::error::{Error, Result};

/// How long the selection is served on Linux before lazym exits.
///
/// X11 and Wayland clipboards are owned by the process that set them; once it
/// exits the contents are gone unless a clipboard manager picked them up.
pub const LINUX_HOLD: Duration = Duration::from_secs(15);

/// Put `text` on the system clipboard.
///
/// Blocks for up to [`LINUX_HOLD`] on Linux, or until another application
/// takes over the clipboard. Call it from a blocking task.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
    set_text(&mut clipboard, text).map_err(|e| Error::Clipboard(e.to_string()))
}

#[cfg(target_os = "linux")]
fn set_text(
    clipboard: &mut arboard::Clipboard,
    text: &str,
) -> std::result::Result<(), arboard::Error> {
    use arboard::SetExtLinux;

    let deadline = std::time::Instant::now() + LINUX_HOLD;
    clipboard.set().wait_until(deadline).text(text.to_owned())
}

#[cfg(not(target_os = "linux"))]
fn set_text(
    clipboard: &mut arboard::Clipboard,
    text: &str,
) -> std::result::Result<(), arboard::Error> {
    clipboard.set_text(text)
}

