//! Dispatcher implementation

use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::domain::MessagePriority;
use crate::timer::{Clock, Timer};
use crate::world::Transport;

use super::config::DispatcherConfig;
use super::error::DispatchError;
use super::queue::{DispatcherStats, OutboundMessage, QueuedMessage, SentMessage};

/// Priority queue of outbound messages behind a fast/medium/slow throttle
///
/// A message leaves the queue only when all three gates are open. Every
/// `fast_limit` sends re-arm the medium gate, and every `slow_limit` of
/// those pauses re-arms the slow gate.
pub struct Dispatcher {
    config: DispatcherConfig,
    queue: BinaryHeap<QueuedMessage>,
    next_seq: u64,
    fast_timer: Timer,
    medium_timer: Timer,
    slow_timer: Timer,
    fast_count: u32,
    slow_count: u32,
    transport: Box<dyn Transport>,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, transport: Box<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        debug!(?config, "Dispatcher::new: called");
        Self {
            fast_timer: Timer::new(config.fast_interval(), clock.clone()),
            medium_timer: Timer::new(config.medium_interval(), clock.clone()),
            slow_timer: Timer::new(config.slow_interval(), clock),
            config,
            queue: BinaryHeap::new(),
            next_seq: 0,
            fast_count: 0,
            slow_count: 0,
            transport,
            stats: DispatcherStats::default(),
        }
    }

    /// Queue a message; returns its submission sequence number
    pub fn enqueue(&mut self, message: OutboundMessage, priority: MessagePriority) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        debug!(seq, %priority, "Dispatcher::enqueue: called");

        self.queue.push(QueuedMessage { seq, priority, message });
        self.stats.total_enqueued += 1;

        if self.queue.len() > self.config.max_queue {
            self.drop_lowest();
        }
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queue.len());
        seq
    }

    pub fn enqueue_chat(&mut self, text: impl Into<String>, priority: MessagePriority) -> u64 {
        self.enqueue(OutboundMessage::Chat { text: text.into() }, priority)
    }

    pub fn enqueue_whisper(
        &mut self,
        to: impl Into<String>,
        text: impl Into<String>,
        priority: MessagePriority,
    ) -> u64 {
        self.enqueue(
            OutboundMessage::Whisper {
                to: to.into(),
                text: text.into(),
            },
            priority,
        )
    }

    /// Send the head of the queue if every gate is open.
    ///
    /// Returns `Ok(None)` when gated or empty. A transport failure drops the
    /// message and is returned as an error; it still consumes the slot.
    pub fn tick(&mut self) -> Result<Option<SentMessage>, DispatchError> {
        if !self.slow_timer.elapsed() || !self.medium_timer.elapsed() || !self.fast_timer.elapsed() {
            return Ok(None);
        }
        let Some(next) = self.queue.pop() else {
            return Ok(None);
        };

        self.fast_timer.reset();
        let text = next.message.wire_text();
        let result = self.transport.send_now(&text);
        self.advance_tiers();

        match result {
            Ok(()) => {
                self.stats.total_sent += 1;
                debug!(seq = next.seq, priority = %next.priority, "Dispatcher::tick: sent");
                Ok(Some(SentMessage {
                    seq: next.seq,
                    priority: next.priority,
                    text,
                }))
            }
            Err(e) => {
                self.stats.total_failed += 1;
                error!(seq = next.seq, error = %e, "Failed to send message");
                Err(e)
            }
        }
    }

    fn advance_tiers(&mut self) {
        self.fast_count += 1;
        if self.fast_count >= self.config.fast_limit {
            debug!(slow_count = self.slow_count + 1, "Dispatcher::advance_tiers: burst limit hit, pausing");
            self.medium_timer.reset();
            self.fast_count = 0;
            self.slow_count += 1;
            if self.slow_count >= self.config.slow_limit {
                debug!("Dispatcher::advance_tiers: burst count limit hit, long pause");
                self.slow_timer.reset();
                self.slow_count = 0;
            }
        }
    }

    fn drop_lowest(&mut self) {
        let mut entries = std::mem::take(&mut self.queue).into_vec();
        if let Some(idx) = entries
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(idx, _)| idx)
        {
            let dropped = entries.swap_remove(idx);
            self.stats.total_dropped += 1;
            warn!(
                seq = dropped.seq,
                priority = %dropped.priority,
                max_queue = self.config.max_queue,
                "Message queue full, dropping lowest-ranked message"
            );
        }
        self.queue = entries.into();
    }

    /// Time until the next send could happen
    pub fn next_send_in(&self) -> Duration {
        self.slow_timer
            .remaining()
            .max(self.medium_timer.remaining())
            .max(self.fast_timer.remaining())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discard everything still queued
    pub fn clear(&mut self) {
        debug!(count = self.queue.len(), "Dispatcher::clear: called");
        self.queue.clear();
    }

    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("queued", &self.queue.len())
            .field("fast_count", &self.fast_count)
            .field("slow_count", &self.slow_count)
            .field("stats", &self.stats)
            .finish()
    }
}
