//! Types shared with the native host: the events the bridge emits and the
//! host-side view assembled from them.

use serde::{Deserialize, Serialize};

use crate::media::Command;

/// A state change forwarded to the host.
///
/// Serialized as `{ "command": <ipc command>, "payload": {...} }`; the command
/// names are the host's IPC handlers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum HostEvent {
    #[serde(rename = "update_track_info")]
    TrackChanged { title: String, artist: String },
    #[serde(rename = "update_playback_state")]
    PlaybackChanged { playing: bool },
}

impl HostEvent {
    pub fn command_name(&self) -> &'static str {
        match self {
            HostEvent::TrackChanged { .. } => "update_track_info",
            HostEvent::PlaybackChanged { .. } => "update_playback_state",
        }
    }

    /// Arguments object for the IPC call
    pub fn payload(&self) -> serde_json::Value {
        match self {
            HostEvent::TrackChanged { title, artist } => {
                serde_json::json!({ "title": title, "artist": artist })
            }
            HostEvent::PlaybackChanged { playing } => serde_json::json!({ "playing": playing }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackIdentity {
    pub title: String,
    pub artist: String,
}

/// What the host currently believes is playing.
///
/// Track identity and transport state are cached separately, mirroring the two
/// event kinds.
#[derive(Clone, Debug, Default)]
pub struct NowPlaying {
    pub track: Option<TrackIdentity>,
    pub playing: bool,
}

impl NowPlaying {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in. Returns whether anything changed.
    pub fn apply(&mut self, event: &HostEvent) -> bool {
        match event {
            HostEvent::TrackChanged { title, artist } => {
                let next = TrackIdentity { title: title.clone(), artist: artist.clone() };
                if self.track.as_ref() == Some(&next) {
                    return false;
                }
                tracing::info!("[Host] Now playing: {} - {}", next.artist, next.title);
                self.track = Some(next);
                true
            }
            HostEvent::PlaybackChanged { playing } => {
                if self.playing == *playing {
                    return false;
                }
                self.playing = *playing;
                true
            }
        }
    }
}

/// Buttons reported by the OS media controls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKey {
    Play,
    Pause,
    Toggle,
    Next,
    Previous,
    Stop,
    Raise,
}

impl MediaKey {
    /// Bridge command for this key, if the bridge handles it
    pub fn command(self) -> Option<Command> {
        match self {
            MediaKey::Play => Some(Command::Play),
            MediaKey::Pause => Some(Command::Pause),
            MediaKey::Toggle => Some(Command::Toggle),
            MediaKey::Next => Some(Command::Next),
            MediaKey::Previous => Some(Command::Previous),
            // The page has no stop, pausing is the closest
            MediaKey::Stop => Some(Command::Pause),
            MediaKey::Raise => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = HostEvent::TrackChanged { title: "Song".into(), artist: "Band".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["command"], "update_track_info");
        assert_eq!(json["payload"]["title"], "Song");
        assert_eq!(event.payload(), json["payload"]);

        let event = HostEvent::PlaybackChanged { playing: true };
        assert_eq!(event.command_name(), "update_playback_state");
        assert_eq!(event.payload(), serde_json::json!({ "playing": true }));

        let back: HostEvent = serde_json::from_value(serde_json::to_value(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_now_playing_axes_are_independent() {
        let mut now = NowPlaying::new();
        assert!(now.apply(&HostEvent::TrackChanged { title: "A".into(), artist: "X".into() }));
        assert!(!now.apply(&HostEvent::TrackChanged { title: "A".into(), artist: "X".into() }));
        assert!(now.apply(&HostEvent::PlaybackChanged { playing: true }));
        assert!(!now.apply(&HostEvent::PlaybackChanged { playing: true }));

        assert_eq!(now.track.as_ref().map(|t| t.title.as_str()), Some("A"));
        assert!(now.playing);
    }

    #[test]
    fn test_media_key_mapping() {
        assert_eq!(MediaKey::Toggle.command(), Some(Command::Toggle));
        assert_eq!(MediaKey::Stop.command(), Some(Command::Pause));
        assert_eq!(MediaKey::Previous.command().map(Command::token), Some("previous"));
        assert_eq!(MediaKey::Raise.command(), None);
    }
}
