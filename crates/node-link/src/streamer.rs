//! Reliable Single-In-Flight Link Streamer
//!
//! At most one frame is in flight at any time. Partial writes resume
//! byte-exactly across ticks, a stall watchdog drops frames the link will
//! not take, and a disconnect clears all in-flight state so no partial
//! frame can straddle two connections.

use crate::clock::Clock;
use crate::transport::LinkTransport;
use telemetry_wire::RECORD_TERMINATOR;
use tracing::{debug, warn};

/// Link streamer tuning.
///
/// Pacing, stall threshold, and cooldown are independent knobs; no numeric
/// relationship between them is assumed.
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Minimum interval between transmission attempts (ms)
    pub pacing_interval_ms: u32,
    /// Per-tick time budget for body writes (ms)
    pub body_slice_ms: u32,
    /// Time budget for one terminator attempt (ms)
    pub terminator_timeout_ms: u32,
    /// Continuous zero-progress time before the pending frame is dropped (ms)
    pub stall_timeout_ms: u32,
    /// Pause after a watchdog drop before transmitting again (ms)
    pub cooldown_ms: u32,
    /// Initial retry backoff inside a slice (ms)
    pub backoff_initial_ms: u32,
    /// Backoff cap (ms)
    pub backoff_max_ms: u32,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            pacing_interval_ms: 100,
            body_slice_ms: 120,
            terminator_timeout_ms: 100,
            stall_timeout_ms: 3000,
            cooldown_ms: 200,
            backoff_initial_ms: 1,
            backoff_max_ms: 32,
        }
    }
}

/// Transmission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No frame in flight
    Idle,
    /// Body bytes being written
    Sending,
    /// Body complete, terminator byte outstanding
    AwaitingTerminator,
}

/// The one in-flight frame. Offset is monotonically non-decreasing and
/// never exceeds the body length.
struct PendingFrame {
    body: Vec<u8>,
    sent: usize,
}

/// Counters for link health monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamerStats {
    /// Frames fully delivered (body + terminator)
    pub frames_completed: u64,
    /// Frames dropped by the stall watchdog
    pub frames_dropped: u64,
    /// Body and terminator bytes accepted by the transport
    pub bytes_sent: u64,
    /// Disconnect events observed
    pub disconnects: u64,
}

/// Single-in-flight framed-record transmitter.
pub struct LinkStreamer {
    config: StreamerConfig,
    state: LinkState,
    pending: Option<PendingFrame>,
    /// Most recent record offered by the sampler, taken when a new frame
    /// starts
    latest: Option<Vec<u8>>,
    last_attempt_ms: Option<u32>,
    cooldown_until_ms: Option<u32>,
    zero_since_ms: Option<u32>,
    was_connected: bool,
    stats: StreamerStats,
}

impl LinkStreamer {
    /// Create a streamer with the given tuning
    pub fn new(config: StreamerConfig) -> Self {
        Self {
            config,
            state: LinkState::Idle,
            pending: None,
            latest: None,
            last_attempt_ms: None,
            cooldown_until_ms: None,
            zero_since_ms: None,
            was_connected: false,
            stats: StreamerStats::default(),
        }
    }

    /// Offer the latest record line (without terminator). Only the newest
    /// offer is kept; a frame starts from it at the next paced tick with
    /// nothing in flight.
    pub fn submit_line(&mut self, line: &str) {
        self.latest = Some(line.as_bytes().to_vec());
    }

    /// Advance the state machine by one tick.
    pub fn tick(&mut self, clock: &dyn Clock, transport: &mut dyn LinkTransport) {
        if !transport.is_connected() {
            if self.was_connected {
                self.stats.disconnects += 1;
                if self.pending.is_some() {
                    warn!("link disconnected with frame in flight, discarding");
                }
                // No partial frame may survive into a new connection
                self.reset_in_flight();
                self.cooldown_until_ms = None;
            }
            self.was_connected = false;
            return;
        }
        self.was_connected = true;

        let now = clock.now_ms();

        if let Some(until) = self.cooldown_until_ms {
            if (now.wrapping_sub(until) as i32) < 0 {
                return;
            }
            self.cooldown_until_ms = None;
        }

        if let Some(last) = self.last_attempt_ms {
            if now.wrapping_sub(last) < self.config.pacing_interval_ms {
                return;
            }
        }
        self.last_attempt_ms = Some(now);

        if self.state == LinkState::Idle {
            match self.latest.take() {
                Some(body) => {
                    debug!(len = body.len(), "starting new frame");
                    self.pending = Some(PendingFrame { body, sent: 0 });
                    self.state = LinkState::Sending;
                }
                None => return,
            }
        }

        if self.state == LinkState::Sending {
            self.send_body_slice(clock, transport);
        }
        if self.state == LinkState::AwaitingTerminator {
            self.send_terminator(clock, transport);
        }
    }

    fn send_body_slice(&mut self, clock: &dyn Clock, transport: &mut dyn LinkTransport) {
        let start = clock.now_ms();
        let mut backoff = self.config.backoff_initial_ms;
        let mut progressed = false;

        let Some(pending) = self.pending.as_mut() else {
            self.state = LinkState::Idle;
            return;
        };

        while pending.sent < pending.body.len()
            && clock.now_ms().wrapping_sub(start) < self.config.body_slice_ms
        {
            let wrote = transport.try_write(&pending.body[pending.sent..]);
            if wrote > 0 {
                pending.sent += wrote;
                self.stats.bytes_sent += wrote as u64;
                backoff = self.config.backoff_initial_ms;
                progressed = true;
            } else {
                clock.sleep_ms(backoff);
                backoff = (backoff * 2).min(self.config.backoff_max_ms);
            }
        }

        let body_done = pending.sent == pending.body.len();
        if body_done {
            self.state = LinkState::AwaitingTerminator;
        }
        self.note_progress(clock, progressed);
    }

    fn send_terminator(&mut self, clock: &dyn Clock, transport: &mut dyn LinkTransport) {
        let start = clock.now_ms();
        let mut backoff = self.config.backoff_initial_ms;

        loop {
            if transport.try_write(&[RECORD_TERMINATOR]) == 1 {
                self.stats.bytes_sent += 1;
                self.stats.frames_completed += 1;
                debug!(total = self.stats.frames_completed, "frame complete");
                self.reset_in_flight();
                return;
            }
            if clock.now_ms().wrapping_sub(start) >= self.config.terminator_timeout_ms {
                break;
            }
            clock.sleep_ms(backoff);
            backoff = (backoff * 2).min(self.config.backoff_max_ms);
        }

        // Body-done state survives; only the terminator is retried next tick
        self.note_progress(clock, false);
    }

    /// Stall watchdog: drop the frame after continuous zero progress.
    fn note_progress(&mut self, clock: &dyn Clock, progressed: bool) {
        if progressed {
            self.zero_since_ms = None;
            return;
        }
        if self.pending.is_none() {
            return;
        }
        let now = clock.now_ms();
        let since = *self.zero_since_ms.get_or_insert(now);
        if now.wrapping_sub(since) >= self.config.stall_timeout_ms {
            warn!(
                stalled_ms = now.wrapping_sub(since),
                "link stalled, dropping pending frame"
            );
            self.stats.frames_dropped += 1;
            self.reset_in_flight();
            self.cooldown_until_ms = Some(now.wrapping_add(self.config.cooldown_ms));
        }
    }

    fn reset_in_flight(&mut self) {
        self.pending = None;
        self.state = LinkState::Idle;
        self.zero_since_ms = None;
    }

    /// Current transmission state
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether a frame is in flight
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Link health counters
    pub fn stats(&self) -> StreamerStats {
        self.stats
    }
}

impl Default for LinkStreamer {
    fn default() -> Self {
        Self::new(StreamerConfig::default())
    }
}
