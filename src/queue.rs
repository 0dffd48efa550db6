//! Single-slot queue for a command issued before the page could act on it.

use std::time::Duration;

/// Wall clock in milliseconds. `Instant` is unavailable inside the browser.
pub fn now_ms() -> u64 {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as u64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct PendingCommand {
    command: String,
    queued_at_ms: u64,
}

/// What a call to [`CommandQueue::flush`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued
    Empty,
    /// Page still not ready, command kept
    NotReady,
    /// Dispatched and cleared
    Dispatched,
    /// Dispatch reported failure, command kept for the next trigger
    Retained,
    /// Older than the configured TTL, dropped without dispatch
    Expired,
}

/// Holds at most one command. A newer command replaces an older one.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Option<PendingCommand>,
    ttl: Option<Duration>,
}

impl CommandQueue {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self { pending: None, ttl }
    }

    /// Start with a command carried over from before this bridge existed
    pub fn with_seed(seed: Option<String>, ttl: Option<Duration>, now_ms: u64) -> Self {
        let mut queue = Self::new(ttl);
        if let Some(command) = seed.filter(|c| !c.is_empty()) {
            tracing::info!("[Queue] Seeded with pending command '{}'", command);
            queue.enqueue(command, now_ms);
        }
        queue
    }

    /// Last write wins
    pub fn enqueue(&mut self, command: impl Into<String>, now_ms: u64) {
        let command = command.into();
        if let Some(previous) = &self.pending {
            tracing::debug!("[Queue] '{}' supersedes '{}'", command, previous.command);
        }
        self.pending = Some(PendingCommand { command, queued_at_ms: now_ms });
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.command.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    fn is_expired(&self, pending: &PendingCommand, now_ms: u64) -> bool {
        match self.ttl {
            Some(ttl) => now_ms.saturating_sub(pending.queued_at_ms) >= ttl.as_millis() as u64,
            None => false,
        }
    }

    /// Dispatch the pending command if the page is ready.
    ///
    /// The command is only cleared when `dispatch` reports success, so calling
    /// this repeatedly against an unready page neither loses nor repeats it.
    pub fn flush<R, D>(&mut self, now_ms: u64, is_ready: R, dispatch: D) -> FlushOutcome
    where
        R: FnOnce() -> bool,
        D: FnOnce(&str) -> bool,
    {
        let Some(pending) = self.pending.as_ref() else {
            return FlushOutcome::Empty;
        };

        if self.is_expired(pending, now_ms) {
            tracing::warn!(
                "[Queue] Dropping '{}' after {} ms without a ready page",
                pending.command,
                now_ms.saturating_sub(pending.queued_at_ms)
            );
            self.pending = None;
            return FlushOutcome::Expired;
        }

        if !is_ready() {
            return FlushOutcome::NotReady;
        }

        if dispatch(&pending.command) {
            tracing::info!("[Queue] Flushed '{}'", pending.command);
            self.pending = None;
            FlushOutcome::Dispatched
        } else {
            FlushOutcome::Retained
        }
    }
}
