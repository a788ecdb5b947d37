use std::io::{self, Write};

/// Redraws one console line in place per update. One implementation of the
/// fetcher's progress callback; the engine itself never prints.
pub struct ConsoleProgress {
    label: String,
}

impl ConsoleProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn update(&mut self, percent: f64) {
        print!("\r{} {:.2}%", self.label, percent);
        let _ = io::stdout().flush();
    }

    /// Terminates the redrawn line once the transfer is over.
    pub fn finish(&mut self) {
        println!();
    }
}
