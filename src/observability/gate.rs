//! Gated log output.
//!
//! Log events produced while the agent is still starting are held back so
//! they do not interleave with the startup banner. [`LogGate::flush`]
//! writes everything held so far and lets later events straight through.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;

struct GateState<W> {
    open: bool,
    held: Vec<u8>,
    sink: W,
}

/// `MakeWriter` that buffers until opened. Clones share one buffer.
pub struct LogGate<W> {
    state: Arc<Mutex<GateState<W>>>,
}

impl<W> Clone for LogGate<W> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<W: Write> LogGate<W> {
    /// Closed gate in front of `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState {
                open: false,
                held: Vec::new(),
                sink,
            })),
        }
    }

    /// Write out everything held and open the gate. Later calls only flush
    /// the sink.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.lock();
        state.open = true;
        let held = std::mem::take(&mut state.held);
        state.sink.write_all(&held)?;
        state.sink.flush()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    fn lock(&self) -> MutexGuard<'_, GateState<W>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Writer handed out per event by [`LogGate`].
pub struct GateWriter<'a, W> {
    gate: &'a LogGate<W>,
}

impl<W: Write> Write for GateWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.gate.lock();
        if state.open {
            state.sink.write(buf)
        } else {
            state.held.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.gate.lock();
        if state.open {
            state.sink.flush()
        } else {
            Ok(())
        }
    }
}

impl<'a, W: Write + 'a> MakeWriter<'a> for LogGate<W> {
    type Writer = GateWriter<'a, W>;

    fn make_writer(&'a self) -> Self::Writer {
        GateWriter { gate: self }
    }
}
