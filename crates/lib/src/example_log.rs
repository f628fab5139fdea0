//! # Few-Shot Example Log
//!
//! An append-only text file recording every few-shot example block the user
//! submits. Each line is one entry, `"<timestamp>, <text>"`. The most recent
//! entry is the default few-shot context when the user submits nothing new.
//!
//! Single-line text is stored verbatim. Text spanning several lines is stored
//! as `"<timestamp>,~ <escaped text>"`, with `\\`, `\n` and `\r` escapes; only
//! lines carrying that marker are unescaped on read.
//!
//! The log assumes a single writer per file.

use serde::Serialize;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Follows the comma of an entry whose text is escaped.
const ESCAPED_MARKER: &str = "~ ";

/// One submitted example block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleEntry {
    pub timestamp: String,
    pub text: String,
}

/// The append-only store of few-shot examples.
#[derive(Debug, Clone)]
pub struct ExampleLog {
    path: PathBuf,
}

impl ExampleLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every valid entry in insertion order.
    ///
    /// A missing or unreadable file yields an empty history.
    pub fn entries(&self) -> Vec<ExampleEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Example log does not exist yet.");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Example log unreadable, treating as empty: {e}");
                return Vec::new();
            }
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match parse_line(line) {
                Some(entry) => Some(entry),
                None => {
                    warn!("Skipping malformed example log line: {line:?}");
                    None
                }
            })
            .collect()
    }

    /// Returns the text of the most recent entry, or an empty string.
    pub fn read_last(&self) -> String {
        self.entries()
            .pop()
            .map(|entry| entry.text)
            .unwrap_or_default()
    }

    /// Appends `candidate` with the current timestamp unless it is empty or equal
    /// to `last_known`. Returns `true` when an entry was written.
    pub fn append_if_changed(&self, candidate: &str, last_known: &str) -> std::io::Result<bool> {
        let text = candidate.trim();
        if text.is_empty() || text == last_known {
            debug!("Few-shot examples unchanged, nothing to append.");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_line(&timestamp, text))?;

        info!(path = %self.path.display(), "Appended new few-shot examples.");
        Ok(true)
    }

    /// Picks the few-shot context for an interaction.
    ///
    /// Newly submitted text wins and is logged if it differs from the last entry;
    /// an empty submission falls back to the last logged entry.
    pub fn resolve(&self, submitted: &str) -> std::io::Result<String> {
        let last = self.read_last();
        let submitted = submitted.trim();
        if submitted.is_empty() {
            return Ok(last);
        }
        self.append_if_changed(submitted, &last)?;
        Ok(submitted.to_string())
    }
}

fn format_line(timestamp: &str, text: &str) -> String {
    if text.contains(['\n', '\r']) {
        format!("{timestamp},{ESCAPED_MARKER}{}", escape(text))
    } else {
        format!("{timestamp}, {text}")
    }
}

fn parse_line(line: &str) -> Option<ExampleEntry> {
    let (timestamp, rest) = line.split_once(',')?;
    let text = match rest.strip_prefix(ESCAPED_MARKER) {
        Some(escaped) => unescape(escaped.trim()),
        None => rest.trim().to_string(),
    };
    if text.is_empty() {
        return None;
    }
    Some(ExampleEntry {
        timestamp: timestamp.trim().to_string(),
        text,
    })
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
