//! TuneBar media bridge.
//!
//! Keeps the native host and the hosted YouTube Music page in sync: host
//! commands are dispatched into the page (or held until its player is ready),
//! and track/playback changes on the page are forwarded to the host once each.

pub mod bridge;
pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod host;
pub mod logging;
pub mod media;
pub mod notifier;
pub mod queue;

#[cfg(not(target_arch = "wasm32"))]
pub mod driver;

pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use detector::{MediaEvent, Trigger};
pub use host::{HostEvent, MediaKey, NowPlaying};
pub use media::{Command, Page, PlaybackState};
pub use notifier::{HostChannel, HostNotifier};
