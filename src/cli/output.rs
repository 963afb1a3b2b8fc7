//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the agentplane CLI.
//! Human-oriented messages go to stderr so that JSON printed by [`Output::json`]
//! can be piped.

use owo_colors::OwoColorize;
use serde::Serialize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the agentplane banner
    pub fn banner(&self) {
        if self.colored {
            eprintln!(
                "\n   {} {}\n",
                "agentplane".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            eprintln!("\n   agentplane v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            eprintln!("\n  {}", title.bright_white().bold().underline());
        } else {
            eprintln!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            eprintln!("\n  {}", title.cyan().bold());
        } else {
            eprintln!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            eprintln!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            eprintln!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            eprintln!("    {} {}", "•".blue(), item);
        } else {
            eprintln!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            eprintln!("\n  {} {}", "›".dimmed(), message.dimmed().italic());
        } else {
            eprintln!("\n  [TIP] {}", message);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header = Self::row(columns);
        if self.colored {
            eprintln!("    {}", header.bright_white().bold());
            eprintln!("    {}", "─".repeat(columns.len() * 21).dimmed());
        } else {
            eprintln!("    {}", header);
            eprintln!("    {}", "-".repeat(columns.len() * 21));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        eprintln!("    {}", Self::row(values));
    }

    fn row(values: &[&str]) -> String {
        values
            .iter()
            .map(|v| format!("{:<20}", v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Print a value as pretty JSON on stdout
    pub fn json<T: Serialize>(&self, value: &T) -> serde_json::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
