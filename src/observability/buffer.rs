//! In-memory ring of recent log lines.
//!
//! Keeps the last [`LOG_BUFFER_LINES`] formatted lines so the HTTP API can
//! show what the agent logged without access to its stdout.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;

/// Lines kept by the agent's log buffer.
pub const LOG_BUFFER_LINES: usize = 512;

/// Bounded line buffer. Clones share the same lines.
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<Ring>>,
}

struct Ring {
    capacity: usize,
    lines: VecDeque<String>,
    /// Bytes of a line not yet terminated by `\n`.
    partial: Vec<u8>,
}

impl LogBuffer {
    /// Buffer keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Ring {
                capacity,
                lines: VecDeque::with_capacity(capacity),
                partial: Vec::new(),
            })),
        }
    }

    /// Lines currently held, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lock().lines.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_BUFFER_LINES)
    }
}

impl Ring {
    fn push_line(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn append(&mut self, buf: &[u8]) {
        self.partial.extend_from_slice(buf);
        while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
            let rest = self.partial.split_off(end + 1);
            let line = std::mem::replace(&mut self.partial, rest);
            let text = String::from_utf8_lossy(&line[..end]).into_owned();
            self.push_line(text);
        }
    }
}

/// Writer handed out per event by [`LogBuffer`].
pub struct LogBufferWriter<'a> {
    buffer: &'a LogBuffer,
}

impl Write for LogBufferWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter { buffer: self }
    }
}
