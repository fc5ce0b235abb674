use std::path::Path;

use anyhow::Result;

use {
    sockbot_config::validate::{self, Severity, ValidationResult},
    sockbot_plugins::BUNDLED,
};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Full validation: schema and semantics, plus plugin names against the
/// bundled set.
pub fn diagnose(path: Option<&Path>) -> ValidationResult {
    let mut result = validate::validate(path);
    if let Some(ref path) = result.config_path
        && let Ok(config) = sockbot_config::loader::load_config(path)
    {
        result
            .diagnostics
            .extend(validate::check_plugin_names(&config, BUNDLED));
    }
    result
}

pub fn check(path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = diagnose(path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn diagnose_adds_unknown_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sockbot.toml");
        std::fs::write(
            &path,
            "[core]\nserver = \"irc.test\"\nusername = \"bot\"\nchannels = [\"#room\"]\n\n[plugins.pnig]\n",
        )
        .unwrap();

        let result = diagnose(Some(&path));
        assert!(!result.has_errors());
        let unknown: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == "unknown-plugin")
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].path, "plugins.pnig");
    }
}
