//! Decides whether a fresh sample differs from what the host was last told.
//!
//! Two axes are compared independently: track identity (title, artist) and
//! transport (playing). The host caches each separately, so a pause must not
//! re-announce the track and a track change must not re-announce the pause.

use crate::host::HostEvent;
use crate::media::PlaybackState;

/// What woke the detector up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// Attribute/subtree/text change under the player region
    Mutation,
    /// `play`, `pause` or `loadedmetadata` on the media element
    Media(MediaEvent),
    /// Fixed-interval backstop
    Poll,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Pause,
    LoadedMetadata,
}

impl MediaEvent {
    pub const ALL: [MediaEvent; 3] = [MediaEvent::Play, MediaEvent::Pause, MediaEvent::LoadedMetadata];

    /// DOM event name
    pub fn event_name(self) -> &'static str {
        match self {
            MediaEvent::Play => "play",
            MediaEvent::Pause => "pause",
            MediaEvent::LoadedMetadata => "loadedmetadata",
        }
    }
}

/// Two-phase attachment: wait for the player region, then observe it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachPhase {
    WaitingForPlayer,
    Attached,
}

/// The most recently notified values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LastKnownState {
    pub title: String,
    pub artist: String,
    /// `None` until the first transport notification
    pub playing: Option<bool>,
}

pub struct StateChangeDetector {
    last: LastKnownState,
    phase: AttachPhase,
}

impl Default for StateChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl StateChangeDetector {
    pub fn new() -> Self {
        Self {
            last: LastKnownState::default(),
            phase: AttachPhase::WaitingForPlayer,
        }
    }

    pub fn phase(&self) -> AttachPhase {
        self.phase
    }

    pub fn is_attached(&self) -> bool {
        self.phase == AttachPhase::Attached
    }

    pub fn mark_attached(&mut self) {
        if self.phase != AttachPhase::Attached {
            tracing::info!("[Detector] Player region found, observing");
            self.phase = AttachPhase::Attached;
        }
    }

    pub fn last_known(&self) -> &LastKnownState {
        &self.last
    }

    /// Diff `sample` against the last notified state, record what changed,
    /// and return the events to send (track first, then transport).
    pub fn reconcile(&mut self, sample: &PlaybackState) -> Vec<HostEvent> {
        let mut events = Vec::with_capacity(2);

        // An empty title means the player bar hasn't rendered the track yet
        let track_changed = !sample.title.is_empty()
            && (sample.title != self.last.title || sample.artist != self.last.artist);
        if track_changed {
            tracing::info!("[Detector] Track: {} - {}", sample.artist, sample.title);
            self.last.title = sample.title.clone();
            self.last.artist = sample.artist.clone();
            events.push(HostEvent::TrackChanged {
                title: sample.title.clone(),
                artist: sample.artist.clone(),
            });
        }

        if self.last.playing != Some(sample.playing) {
            tracing::info!(
                "[Detector] Playback: {}",
                if sample.playing { "playing" } else { "paused" }
            );
            self.last.playing = Some(sample.playing);
            events.push(HostEvent::PlaybackChanged { playing: sample.playing });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(title: &str, artist: &str, playing: bool) -> PlaybackState {
        PlaybackState {
            playing,
            title: title.to_string(),
            artist: artist.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_sample_announces_both_axes() {
        let mut detector = StateChangeDetector::new();
        let events = detector.reconcile(&state("Song", "Band", false));
        assert_eq!(
            events,
            vec![
                HostEvent::TrackChanged { title: "Song".into(), artist: "Band".into() },
                HostEvent::PlaybackChanged { playing: false },
            ]
        );
    }

    #[test]
    fn test_same_sample_twice_is_silent() {
        let mut detector = StateChangeDetector::new();
        let sample = state("Song", "Band", true);
        detector.reconcile(&sample);
        assert!(detector.reconcile(&sample).is_empty());
    }

    #[test]
    fn test_title_change_only_emits_track() {
        let mut detector = StateChangeDetector::new();
        detector.reconcile(&state("One", "Band", true));

        let events = detector.reconcile(&state("Two", "Band", true));
        assert_eq!(events, vec![HostEvent::TrackChanged { title: "Two".into(), artist: "Band".into() }]);
    }

    #[test]
    fn test_artist_change_alone_is_a_new_track() {
        let mut detector = StateChangeDetector::new();
        detector.reconcile(&state("Song", "A", true));
        let events = detector.reconcile(&state("Song", "B", true));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], HostEvent::TrackChanged { .. }));
    }

    #[test]
    fn test_pause_only_emits_playback() {
        let mut detector = StateChangeDetector::new();
        detector.reconcile(&state("Song", "Band", true));
        let events = detector.reconcile(&state("Song", "Band", false));
        assert_eq!(events, vec![HostEvent::PlaybackChanged { playing: false }]);
        assert_eq!(detector.last_known().playing, Some(false));
    }

    #[test]
    fn test_empty_title_holds_track_axis() {
        let mut detector = StateChangeDetector::new();
        detector.reconcile(&state("Song", "Band", true));

        // Player bar re-rendering: text briefly gone
        let events = detector.reconcile(&state("", "", true));
        assert!(events.is_empty());
        assert_eq!(detector.last_known().title, "Song");

        // Same track back, still nothing to say
        assert!(detector.reconcile(&state("Song", "Band", true)).is_empty());
    }

    #[test]
    fn test_attach_phase() {
        let mut detector = StateChangeDetector::new();
        assert_eq!(detector.phase(), AttachPhase::WaitingForPlayer);
        detector.mark_attached();
        detector.mark_attached();
        assert!(detector.is_attached());
    }
}
