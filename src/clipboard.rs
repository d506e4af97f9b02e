//! Clipboard sinks for `copy`.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

/// Anything that can receive copied text. Failures are reported, not raised;
/// a copy that did not land simply does not count as a use.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> bool;
}

/// The desktop clipboard, reached through whichever helper program is
/// installed (`wl-copy`, `xclip`, `xsel`, `pbcopy` or `clip`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

#[cfg(target_os = "macos")]
const HELPERS: &[(&str, &[&str])] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const HELPERS: &[(&str, &[&str])] = &[("clip", &[])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const HELPERS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> bool {
        HELPERS.iter().any(|(program, args)| pipe_to(program, args, text))
    }
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> bool {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            debug!(program, error = %err, "clipboard helper unavailable");
            return false;
        }
    };

    let written = child
        .stdin
        .take()
        .is_some_and(|mut stdin| stdin.write_all(text.as_bytes()).is_ok());

    match child.wait() {
        Ok(status) => written && status.success(),
        Err(err) => {
            debug!(program, error = %err, "clipboard helper did not finish");
            false
        }
    }
}

/// Keeps the last copied text in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: Option<String>,
    fail: bool,
}

impl MemoryClipboard {
    /// A clipboard that refuses every write.
    pub fn failing() -> Self {
        Self {
            contents: None,
            fail: true,
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> bool {
        if self.fail {
            return false;
        }
        self.contents = Some(text.to_string());
        true
    }
}
