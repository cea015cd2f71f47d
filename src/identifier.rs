use std::fmt;

use anyhow::{Result, Context};
use regex::Regex;

/// Keywords the downloader appends to a filename before the extension.
pub const DEFAULT_SUFFIXES: [&str; 4] = ["original", "editorial", "podcast", "iplayer"];

/// A programme identifier recovered from a filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgrammeId(String);

impl ProgrammeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgrammeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pulls the programme identifier out of `<pid> <suffix>.<ext>` filenames.
#[derive(Debug, Clone)]
pub struct IdentifierExtractor {
    pattern: Regex,
}

impl IdentifierExtractor {
    pub fn new<S: AsRef<str>>(suffixes: &[S]) -> Result<Self> {
        let alternatives: Vec<String> = suffixes
            .iter()
            .map(|s| regex::escape(s.as_ref()))
            .collect();

        let pattern = Regex::new(&format!(
            r"(?P<pid>\w+) (?:{})\.[^.]*$",
            alternatives.join("|")
        ))
        .context("Failed to build identifier pattern")?;

        Ok(Self { pattern })
    }

    /// Returns `None` when the filename carries no suffix keyword, i.e. it is
    /// already converted.
    pub fn extract(&self, filename: &str) -> Option<ProgrammeId> {
        self.pattern
            .captures(filename)
            .and_then(|captures| captures.name("pid"))
            .map(|pid| ProgrammeId::new(pid.as_str()))
    }
}
