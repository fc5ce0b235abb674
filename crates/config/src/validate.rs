//! Configuration validation engine.
//!
//! Checks a config file against the known schema, flags unknown or misspelled
//! fields, and reports settings that would keep the bot from connecting.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use sockbot_provider::domain::is_channel_name;

use crate::{env_subst::substitute_env, loader::ConfigFormat, schema::SockbotConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "unknown-plugin", "type-error",
    /// "missing-field", "channel", "commands", "security", "flood"
    pub category: &'static str,
    /// Dotted path, e.g. "core.sever"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with dynamic keys whose values have a known shape.
    Map(Box<KnownKeys>),
    /// A scalar, list or free-form table; not inspected further.
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::*;

    let core = Struct(HashMap::from([
        ("server", Leaf),
        ("username", Leaf),
        ("owner", Leaf),
        ("password", Leaf),
        ("nick_serv", Leaf),
        ("channels", Leaf),
        ("real_name", Leaf),
        ("flood_protection", Leaf),
        ("flood_protection_delay_ms", Leaf),
    ]));
    let commands = Struct(HashMap::from([("prefix", Leaf)]));

    Struct(HashMap::from([
        ("core", core),
        ("commands", commands),
        // Plugin tables are free-form; only their names are checked.
        ("plugins", Map(Box::new(Leaf))),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Find the best match for `needle` among `candidates` using Levenshtein
/// distance. Returns `Some(best)` if the distance is <= `max_distance`.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate the config file at `path`, or the discovered one if `path` is
/// `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "missing-field",
                "",
                "no config file found; core.server and core.username are required",
            )],
            config_path: None,
        };
    };

    let format = match ConfigFormat::from_path(&actual_path) {
        Ok(format) => format,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic::new(Severity::Error, "syntax", "", e.to_string())],
                config_path: Some(actual_path),
            };
        },
    };

    match crate::loader::read_raw(&actual_path) {
        Ok(raw) => {
            let mut result = validate_str(&raw, format);
            result.config_path = Some(actual_path);
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(Severity::Error, "syntax", "", e.to_string())],
            config_path: Some(actual_path),
        },
    }
}

/// Validate raw config text without touching the file system.
#[must_use]
pub fn validate_str(raw: &str, format: ConfigFormat) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax, on the text exactly as written.
    let literal: serde_json::Value = match format.parse(raw) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("{} syntax error: {e}", format.name()),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields
    check_unknown_fields(&literal, &build_schema_map(), "", &mut diagnostics);

    // 3. Secrets written inline rather than pulled from the environment
    if let Some(password) = literal.pointer("/core/password").and_then(|v| v.as_str())
        && !password.contains("${")
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "security",
            "core.password",
            "password is stored in plain text; consider \"${SOCKBOT_PASSWORD}\"",
        ));
    }

    // 4. Type check and semantic checks on the substituted config
    match format.parse::<SockbotConfig>(&substitute_env(raw)) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// Walk the parsed value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let serde_json::Value::Object(table) = value else {
        // Type mismatches are reported by the type check.
        return;
    };
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match schema {
        KnownKeys::Struct(fields) => {
            let mut known_keys: Vec<&str> = fields.keys().copied().collect();
            known_keys.sort_unstable();
            for (key, child_value) in table {
                let path = join(key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                } else {
                    let level = if prefix.is_empty() {
                        "at top level "
                    } else {
                        ""
                    };
                    let msg = match suggest(key, &known_keys, 3) {
                        Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
                        None => format!("unknown field {level}"),
                    };
                    diagnostics.push(Diagnostic::new(
                        Severity::Error,
                        "unknown-field",
                        path,
                        msg.trim(),
                    ));
                }
            }
        },
        KnownKeys::Map(value_schema) => {
            for (key, child_value) in table {
                check_unknown_fields(child_value, value_schema, &join(key), diagnostics);
            }
        },
        KnownKeys::Leaf => {},
    }
}

fn check_semantics(config: &SockbotConfig, diagnostics: &mut Vec<Diagnostic>) {
    let core = &config.core;

    if core.server.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing-field",
            "core.server",
            "server address is required",
        ));
    }
    if core.username.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing-field",
            "core.username",
            "username is required; it is the nickname and the mention keyword",
        ));
    } else if core.username.contains(char::is_whitespace) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing-field",
            "core.username",
            "username must not contain whitespace",
        ));
    }

    if core.channels.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "channel",
            "core.channels",
            "no channels configured; the bot will only see private messages",
        ));
    }
    for (i, channel) in core.channels.iter().enumerate() {
        if !is_channel_name(channel) {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "channel",
                format!("core.channels[{i}]"),
                format!("\"{channel}\" is not a valid channel name"),
            ));
        }
    }

    if core.nick_serv.is_some() && core.password.is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "security",
            "core.nick_serv",
            "nick_serv is set but no password is configured; IDENTIFY will not be sent",
        ));
    }

    if core.flood_protection && core.flood_protection_delay_ms == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "flood",
            "core.flood_protection_delay_ms",
            "flood protection is on with a zero delay, which disables it",
        ));
    } else if !core.flood_protection {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "flood",
            "core.flood_protection",
            "flood protection is off; busy servers may disconnect the bot",
        ));
    }

    let prefix = &config.commands.prefix;
    if prefix.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "commands",
            "commands.prefix",
            "command prefix must not be empty",
        ));
    } else if prefix.contains(char::is_whitespace) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "commands",
            "commands.prefix",
            "command prefix must not contain whitespace",
        ));
    }
}

/// Warn about `[plugins.<name>]` tables that no registered plugin answers to.
#[must_use]
pub fn check_plugin_names(config: &SockbotConfig, known: &[&str]) -> Vec<Diagnostic> {
    config
        .plugins
        .keys()
        .filter(|name| !known.contains(&name.as_str()))
        .map(|name| {
            let msg = match suggest(name, known, 3) {
                Some(s) => format!("unknown plugin (did you mean \"{s}\"?)"),
                None => format!("unknown plugin; available: {}", known.join(", ")),
            };
            Diagnostic::new(Severity::Warning, "unknown-plugin", format!("plugins.{name}"), msg)
        })
        .collect()
}
