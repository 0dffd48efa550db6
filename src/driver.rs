//! Native event loop for a bridge.
//!
//! Page events and host requests arrive as messages, the poll period as a
//! ticker; everything is handled on one thread, one message at a time, which
//! is the same run-to-completion model the browser gives the wasm build.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, unbounded, Receiver, Sender};

use crate::bridge::Bridge;
use crate::detector::Trigger;
use crate::media::{Page, PlaybackState};
use crate::notifier::HostChannel;

pub enum DriverMessage {
    Command { raw: String, reply: Sender<bool> },
    GetState { reply: Sender<PlaybackState> },
    Trigger(Trigger),
    Shutdown,
}

pub struct Driver<P: Page, C: HostChannel> {
    bridge: Bridge<P, C>,
    poll_interval: Duration,
}

impl<P: Page, C: HostChannel> Driver<P, C> {
    pub fn new(bridge: Bridge<P, C>, poll_interval: Duration) -> Self {
        Self { bridge, poll_interval }
    }

    /// Block until `Shutdown` or until every sender is gone. Hands the bridge
    /// back so the caller can inspect the final session state.
    pub fn run(mut self, rx: Receiver<DriverMessage>) -> Bridge<P, C> {
        let ticker = tick(self.poll_interval);
        tracing::info!("[Driver] Started, polling every {:?}", self.poll_interval);

        // Phase one: nothing to observe until the player region shows up
        self.bridge.try_attach();

        loop {
            select! {
                recv(rx) -> msg => match msg {
                    Ok(DriverMessage::Command { raw, reply }) => {
                        let handled = self.bridge.run_command(&raw);
                        let _ = reply.send(handled);
                    }
                    Ok(DriverMessage::GetState { reply }) => {
                        let _ = reply.send(self.bridge.get_state());
                    }
                    Ok(DriverMessage::Trigger(trigger)) => self.handle_trigger(trigger),
                    Ok(DriverMessage::Shutdown) | Err(_) => break,
                },
                recv(ticker) -> _ => self.handle_trigger(Trigger::Poll),
            }
        }

        tracing::info!("[Driver] Shutting down");
        self.bridge
    }

    fn handle_trigger(&mut self, trigger: Trigger) {
        if self.bridge.is_attached() {
            self.bridge.on_trigger(trigger);
            return;
        }
        // Before attachment only document mutations matter, and only to find the player
        if trigger == Trigger::Mutation && self.bridge.try_attach() {
            self.bridge.on_trigger(trigger);
        }
    }
}

impl<P, C> Driver<P, C>
where
    P: Page + Send + 'static,
    C: HostChannel + Send + 'static,
{
    /// Run on a background thread
    pub fn spawn(self) -> (DriverHandle, JoinHandle<Bridge<P, C>>) {
        let (tx, rx) = unbounded();
        let join = std::thread::spawn(move || self.run(rx));
        (DriverHandle { tx }, join)
    }
}

/// Cloneable sender side of a running driver
#[derive(Clone)]
pub struct DriverHandle {
    tx: Sender<DriverMessage>,
}

impl DriverHandle {
    /// `None` if the driver has stopped
    pub fn run_command(&self, raw: &str) -> Option<bool> {
        let (reply, rx) = bounded(1);
        self.tx
            .send(DriverMessage::Command { raw: raw.to_string(), reply })
            .ok()?;
        rx.recv().ok()
    }

    pub fn get_state(&self) -> Option<PlaybackState> {
        let (reply, rx) = bounded(1);
        self.tx.send(DriverMessage::GetState { reply }).ok()?;
        rx.recv().ok()
    }

    pub fn trigger(&self, trigger: Trigger) {
        let _ = self.tx.send(DriverMessage::Trigger(trigger));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(DriverMessage::Shutdown);
    }
}
