//! # Output Configuration
//!
//! Controls how the CLI reports results: colors and emoji when the terminal
//! supports them, plain text markers otherwise.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

use crate::phases::{GenerationResult, PublishOutcome};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from the environment and the value of
    /// the `--color` flag (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // The presence of NO_COLOR (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// Prefix for a successful step.
    pub fn ok_marker(&self) -> String {
        if self.use_color {
            style("✅").green().to_string()
        } else {
            "[OK]".to_string()
        }
    }

    /// Prefix for a failed step.
    pub fn error_marker(&self) -> String {
        if self.use_color {
            style("❌").red().to_string()
        } else {
            "[ERROR]".to_string()
        }
    }

    /// Emphasize a name such as a branch or path.
    pub fn highlight(&self, text: &str) -> String {
        if self.use_color {
            style(text).cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled and the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Human-readable lines describing a generation result.
pub fn describe_result(config: &OutputConfig, result: &GenerationResult) -> Vec<String> {
    let mut lines = Vec::new();
    for error in &result.errors {
        lines.push(format!("{} {}", config.error_marker(), error));
    }
    if !result.config_exists {
        return lines;
    }
    let summary = match &result.outcome {
        PublishOutcome::NotAttempted => format!("{} manifests generated, not published", result.paths.len()),
        PublishOutcome::NoChanges => "Manifests are up to date, nothing published".to_string(),
        PublishOutcome::PullRequestCreated { branch, commit } => format!(
            "Pull request opened from {} ({})",
            config.highlight(branch),
            short_sha(commit)
        ),
        PublishOutcome::BranchUpdated { branch, commit } => format!(
            "Branch {} updated ({})",
            config.highlight(branch),
            short_sha(commit)
        ),
    };
    let marker = if result.errors.is_empty() {
        config.ok_marker()
    } else {
        config.error_marker()
    };
    lines.push(format!("{} {}", marker, summary));
    lines
}

fn short_sha(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
