use console::style;

/// Status lines for the terminal.
///
/// Reports go to stdout so they can be piped; everything here goes to stderr.
pub struct Output {
    quiet: bool,
}

impl Output {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("✓").green(), message);
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("{} {}", style("ℹ").blue(), message);
        }
    }

    /// Aligned `key: value` line
    pub fn field(&self, key: &str, value: &str) {
        if !self.quiet {
            eprintln!("  {:<12} {}", style(format!("{}:", key)).dim(), value);
        }
    }

    pub fn section(&self, message: &str) {
        if !self.quiet {
            eprintln!("\n{}", style(message).bold());
            eprintln!("{}", "─".repeat(40));
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new(false)
    }
}
