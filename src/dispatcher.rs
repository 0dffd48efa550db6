//! Turns a host command string into a page action, or queues it when the
//! page can't act yet.

use crate::media::dom::DomAccessor;
use crate::media::{Command, MediaHandle, Page};
use crate::queue::CommandQueue;

/// Trim and lowercase
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub struct CommandDispatcher<'a, P: Page> {
    dom: &'a DomAccessor<P>,
}

impl<'a, P: Page> CommandDispatcher<'a, P> {
    pub fn new(dom: &'a DomAccessor<P>) -> Self {
        Self { dom }
    }

    /// Returns `true` when the command was handled (including unknown and
    /// empty commands), `false` when it was accepted but deferred.
    pub fn run_command(&self, queue: &mut CommandQueue, raw: &str, now_ms: u64) -> bool {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return true;
        }

        if !self.dom.is_ready() {
            tracing::info!("[Dispatch] Page not ready, queueing '{}'", normalized);
            queue.enqueue(normalized, now_ms);
            return false;
        }

        self.dispatch_ready(&normalized);
        true
    }

    /// Act on an already-normalized token, assuming the page is ready.
    ///
    /// A ready page consumes the command even when it has nothing to act on
    /// (unknown token, no media element yet, no matching button).
    pub fn dispatch_ready(&self, token: &str) {
        match Command::from_token(token) {
            Some(command) => self.execute(command),
            None => tracing::warn!("[Dispatch] Unknown remote command: {}", token),
        }
    }

    pub fn execute(&self, command: Command) {
        tracing::debug!("[Dispatch] {}", command.token());
        match command {
            Command::Toggle => self.with_media(|media| {
                if media.is_paused() {
                    media.play();
                } else {
                    media.pause();
                }
            }),
            Command::Play => self.with_media(|media| {
                if media.is_paused() {
                    media.play();
                }
            }),
            Command::Pause => self.with_media(|media| {
                if !media.is_paused() {
                    media.pause();
                }
            }),
            Command::Next => self.clicked(self.dom.click_next(), command),
            Command::Previous => self.clicked(self.dom.click_previous(), command),
        }
    }

    fn with_media(&self, f: impl FnOnce(&P::Media)) {
        match self.dom.locate_media() {
            Some(media) => f(&media),
            // Ready through the player API alone; transport needs the element
            None => tracing::debug!("[Dispatch] No media element to act on"),
        }
    }

    fn clicked(&self, matched: bool, command: Command) {
        if !matched {
            tracing::debug!("[Dispatch] No control found for {}", command.token());
        }
    }
}
