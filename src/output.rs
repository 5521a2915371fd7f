//! # Output Configuration
//!
//! Status lines printed by the commands (`✓ installed tool`, `✗ verify
//! failed`, …) go through [`OutputConfig`], which decides whether to use
//! color and symbols and whether to print at all in quiet mode.
//!
//! Color is decided from the `--color` flag and the environment:
//! - `--color=always|never` wins
//! - `NO_COLOR` (any value) disables, per https://no-color.org/
//! - `CLICOLOR=0` disables, `CLICOLOR_FORCE=1` forces
//! - `TERM=dumb` disables
//! - otherwise the `console` crate's terminal detection decides

use console::style;
use std::env;

/// Output configuration for status lines.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
    pub quiet: bool,
}

impl OutputConfig {
    /// Build from the `--color` flag value and the environment.
    pub fn from_env_and_flag(color_flag: &str, quiet: bool) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        console::set_colors_enabled(use_color);
        Self { use_color, quiet }
    }

    fn detect_color_support() -> bool {
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

    /// `✓ message` in green, or `[ok] message`.
    pub fn success(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", style("✓").green().bold(), message)
        } else {
            format!("[ok] {}", message)
        }
    }

    /// `✗ message` in red, or `[failed] message`.
    pub fn failure(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", style("✗").red().bold(), message)
        } else {
            format!("[failed] {}", message)
        }
    }

    /// `==> message` heading for the repository being processed.
    pub fn heading(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", style("==>").cyan().bold(), style(message).bold())
        } else {
            format!("==> {}", message)
        }
    }

    /// Print a non-error line unless quiet.
    pub fn print(&self, line: String) {
        if !self.quiet {
            println!("{}", line);
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto", false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> OutputConfig {
        OutputConfig {
            use_color: false,
            quiet: false,
        }
    }

    #[test]
    fn test_color_never() {
        let config = OutputConfig::from_env_and_flag("never", false);
        assert!(!config.use_color);
    }

    #[test]
    fn test_color_always() {
        let config = OutputConfig::from_env_and_flag("always", true);
        assert!(config.use_color);
        assert!(config.quiet);
    }

    #[test]
    fn test_plain_markers() {
        let config = plain();
        assert_eq!(config.success("installed tool"), "[ok] installed tool");
        assert_eq!(config.failure("tool"), "[failed] tool");
        assert_eq!(config.heading("tool"), "==> tool");
    }

    #[test]
    fn test_colored_markers_contain_message() {
        let config = OutputConfig {
            use_color: true,
            quiet: false,
        };
        assert!(config.success("installed tool").contains("installed tool"));
        assert!(config.failure("tool").contains("tool"));
    }
}
