//! Terminal implementations of the workflow ports.

use inkwell_core::{Confirm, ConfirmPrompt, Notify};
use std::io::{self, BufRead, Write};

/// Reads a `y`/`yes` answer from stdin; `assume_yes` skips the prompt.
pub struct StdinConfirm {
    assume_yes: bool,
}

impl StdinConfirm {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &ConfirmPrompt) -> bool {
        if self.assume_yes {
            return true;
        }
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "{}: {} [y/N] ", prompt.title, prompt.message);
        let _ = stderr.flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Prints notifications to stderr, one line each.
#[derive(Default)]
pub struct StderrNotifier;

impl Notify for StderrNotifier {
    fn success(&mut self, message: &str) {
        eprintln!("[ok] {message}");
    }

    fn warning(&mut self, message: &str) {
        eprintln!("[warn] {message}");
    }

    fn error(&mut self, message: &str) {
        eprintln!("[error] {message}");
    }
}
