//! Progress display for long-running commands.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use is_terminal::IsTerminal;
use std::time::Duration;

/// Where discovery progress messages go.
#[derive(Clone)]
pub enum Progress {
    /// Spinner on an interactive stderr
    Spinner(ProgressBar),
    /// One line per message on a non-interactive stderr
    Lines,
    /// Nothing
    Silent,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::Silent;
        }
        if std::io::stderr().is_terminal() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            Self::Spinner(pb)
        } else {
            Self::Lines
        }
    }

    pub fn report(&self, message: &str) {
        match self {
            Self::Spinner(pb) => pb.set_message(message.to_string()),
            Self::Lines => eprintln!("{} {message}", "›".dimmed()),
            Self::Silent => {}
        }
    }

    pub const fn is_enabled(&self) -> bool {
        !matches!(self, Self::Silent)
    }

    pub fn finish(&self) {
        if let Self::Spinner(pb) = self {
            pb.finish_and_clear();
        }
    }
}
