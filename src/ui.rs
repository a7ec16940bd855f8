//! Operator-facing console output.
//!
//! Kept apart from the `tracing` stream: these lines are the agent talking
//! to whoever started it (banner, caught signals, reload failures), and
//! they are printed whatever the current log level is.

use std::io::Write;

/// Sink for operator messages.
pub trait Ui: Send + Sync {
    fn output(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes to stdout/stderr with `==> ` style prefixes.
#[derive(Debug, Clone)]
pub struct ConsoleUi {
    output_prefix: &'static str,
    info_prefix: &'static str,
    error_prefix: &'static str,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self {
            output_prefix: "==> ",
            info_prefix: "    ",
            error_prefix: "==> ",
        }
    }

    fn write_lines(&self, prefix: &str, message: &str, stderr: bool) {
        let mut text = String::new();
        for line in message.split('\n') {
            text.push_str(prefix);
            text.push_str(line);
            text.push('\n');
        }
        // Write errors are dropped.
        if stderr {
            let _ = std::io::stderr().lock().write_all(text.as_bytes());
        } else {
            let _ = std::io::stdout().lock().write_all(text.as_bytes());
        }
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new()
    }
}

impl Ui for ConsoleUi {
    fn output(&self, message: &str) {
        self.write_lines(self.output_prefix, message, false);
    }

    fn info(&self, message: &str) {
        self.write_lines(self.info_prefix, message, false);
    }

    fn warn(&self, message: &str) {
        self.write_lines(self.error_prefix, message, true);
    }

    fn error(&self, message: &str) {
        self.write_lines(self.error_prefix, message, true);
    }
}
