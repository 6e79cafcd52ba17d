use colored::Colorize;

/// Surfaces backend-reported errors to the user
pub trait Alerter: Send + Sync {
    /// Blocks until the user has seen the message, where the medium allows it
    fn alert(&self, message: &str);
}

/// Prints a highlighted block on stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalAlerter;

impl Alerter for TerminalAlerter {
    fn alert(&self, message: &str) {
        eprintln!("{}", format!("Error: {}", message).white().on_red().bold());
    }
}
