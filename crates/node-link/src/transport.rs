//! Transport Traits
//!
//! The node writes to two independent channels: the lossy wireless notify
//! channel (via [`LinkTransport`], paced by the streamer) and an always-on
//! wired channel that takes every record at the full sampling rate with no
//! reliability state.

use std::collections::VecDeque;

/// Raw wireless notify channel.
///
/// Deliveries are small (tens of bytes) and writes may accept any prefix of
/// the offered bytes, including none at all under congestion.
pub trait LinkTransport {
    /// Attempt to write, returning how many bytes were accepted (0 is a
    /// normal congestion outcome, not an error)
    fn try_write(&mut self, data: &[u8]) -> usize;

    /// Whether the remote peer is currently connected
    fn is_connected(&self) -> bool;
}

/// Fire-and-forget wired channel emitting every record at full rate
pub trait WiredSink {
    /// Emit one formatted record line; failures are the sink's problem
    fn send_line(&mut self, line: &str);
}

/// In-memory transport for tests and hardware-free runs.
///
/// Write acceptance is controlled by a quota queue: each `try_write` pops
/// the next quota (bytes it will accept). An empty queue means unlimited.
pub struct MemoryTransport {
    written: Vec<u8>,
    quotas: VecDeque<usize>,
    connected: bool,
}

impl MemoryTransport {
    /// Create a connected transport that accepts everything
    pub fn new() -> Self {
        Self {
            written: Vec::new(),
            quotas: VecDeque::new(),
            connected: true,
        }
    }

    /// Queue per-call acceptance quotas (0 simulates congestion)
    pub fn push_quotas(&mut self, quotas: &[usize]) {
        self.quotas.extend(quotas.iter().copied());
    }

    /// Simulate connect/disconnect events
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Everything accepted so far, in order
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Drop captured bytes
    pub fn clear_written(&mut self) {
        self.written.clear();
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTransport for MemoryTransport {
    fn try_write(&mut self, data: &[u8]) -> usize {
        if !self.connected {
            return 0;
        }
        let quota = self.quotas.pop_front().unwrap_or(usize::MAX);
        let n = data.len().min(quota);
        self.written.extend_from_slice(&data[..n]);
        n
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Wired sink that collects lines in memory
#[derive(Default)]
pub struct MemoryWiredSink {
    lines: Vec<String>,
}

impl MemoryWiredSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines emitted so far
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl WiredSink for MemoryWiredSink {
    fn send_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
