//! `.simplerrc` configuration file parser.
//!
//! | Directive | Action |
//! |-----------|--------|
//! | `set <key>=<value>` or `set <key> <value>` | set a console option |
//! | Lines starting with `;` or `#` | comment, ignored |
//! | Anything else | silently skipped |
//!
//! Recognised keys:
//!
//! | Key | Type | Default |
//! |-----|------|---------|
//! | `debug` | `on`/`off` | `off` |
//! | `echo` | `on`/`off` | `on` |
//! | `jump_limit` | positive integer | `10000` |
//! | `log_file` | path | none |
//! | `log_level` | `tracing` filter directive | none |

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

use crate::label::JUMP_LIMIT;

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Console options read from an rc file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Start with the per-line trace enabled.
    pub debug: bool,
    /// Show the `Simpler++Console> ` prompt.
    pub echo: bool,
    /// Traversal cap per label.
    pub jump_limit: u32,
    /// Append log records to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Filter directive, e.g. `info` or `simpler=debug`.
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug: false,
            echo: true,
            jump_limit: JUMP_LIMIT,
            log_file: None,
            log_level: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an rc file.
    ///
    /// Lines that are not `set` directives are skipped.  Returns the config
    /// and a list of errors on `set` lines that could not be applied; such
    /// lines leave the option at its previous value.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            let (cmd, args) = line
                .split_once(|c: char| c.is_ascii_whitespace())
                .unwrap_or((line, ""));
            if cmd != "set" {
                continue;
            }

            if let Err(message) = config.apply_set(args.trim()) {
                errors.push(ConfigError { line: i + 1, message });
            }
        }

        (config, errors)
    }

    /// Read and parse an rc file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    fn apply_set(&mut self, args: &str) -> Result<(), String> {
        let (key, value) = match args.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => args
                .split_once(|c: char| c.is_ascii_whitespace())
                .map(|(k, v)| (k, v.trim()))
                .ok_or_else(|| format!("set: missing value for '{args}'"))?,
        };
        if key.is_empty() {
            return Err("set: option name cannot be empty".into());
        }

        match key {
            "debug" => self.debug = parse_flag(key, value)?,
            "echo" => self.echo = parse_flag(key, value)?,
            "jump_limit" => {
                self.jump_limit = value
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| format!("set: jump_limit must be a positive integer, got '{value}'"))?;
            }
            "log_file" => self.log_file = Some(PathBuf::from(value)),
            "log_level" => self.log_level = Some(value.to_owned()),
            _ => return Err(format!("set: unknown option '{key}'")),
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" => Ok(true),
        "off" | "0" | "false" | "no" => Ok(false),
        _ => Err(format!("set: {key} expects on or off, got '{value}'")),
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the user rc file: `~/.simplerrc`, then `simplerrc` in the
/// platform config directory, then `./.simplerrc`.  Returns the first path
/// that exists.
pub fn find_user_config() -> Option<PathBuf> {
    let home = BaseDirs::new().map(|b| b.home_dir().join(".simplerrc"));
    let platform = ProjectDirs::from("", "", "simpler").map(|p| p.config_dir().join("simplerrc"));
    [home, platform, Some(PathBuf::from(".simplerrc"))]
        .into_iter()
        .flatten()
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
