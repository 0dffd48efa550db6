//! Forwards state changes to the host, or drops them when no host is attached.

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::host::HostEvent;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Host channel disconnected")]
    Disconnected,
    #[error("Host rejected {command}: {reason}")]
    Rejected { command: &'static str, reason: String },
}

/// Transport to the host process
pub trait HostChannel {
    fn send(&self, event: &HostEvent) -> Result<(), NotifyError>;
}

/// In-process host (the console harness, tests, or a host thread)
impl HostChannel for Sender<HostEvent> {
    fn send(&self, event: &HostEvent) -> Result<(), NotifyError> {
        Sender::send(self, event.clone()).map_err(|_| NotifyError::Disconnected)
    }
}

/// Placeholder channel type for a bridge running without a host
#[derive(Clone, Copy, Debug, Default)]
pub struct NoChannel;

impl HostChannel for NoChannel {
    fn send(&self, _event: &HostEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Fire-and-forget. A lost event is not retried: the next sample re-derives
/// the current truth and the detector re-sends whatever differs.
pub struct HostNotifier<C: HostChannel> {
    channel: Option<C>,
}

impl HostNotifier<NoChannel> {
    /// Running outside the host shell (e.g. a plain browser tab)
    pub fn detached() -> Self {
        Self { channel: None }
    }
}

impl<C: HostChannel> HostNotifier<C> {
    pub fn new(channel: Option<C>) -> Self {
        if channel.is_none() {
            tracing::info!("[Notifier] No host channel, notifications will be dropped");
        }
        Self { channel }
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    pub fn notify(&self, event: &HostEvent) {
        let Some(channel) = &self.channel else {
            return;
        };
        match channel.send(event) {
            Ok(()) => tracing::debug!("[Notifier] Sent {}", event.command_name()),
            Err(e) => tracing::debug!("[Notifier] Dropped {}: {}", event.command_name(), e),
        }
    }
}
