//! One bridge per page session.
//!
//! Owns the pending command and the last-notified state. Every callback the
//! page produces (mutation, media event, poll tick) funnels into
//! [`Bridge::on_trigger`], which runs to completion before the next one.

use crate::config::BridgeConfig;
use crate::detector::{AttachPhase, StateChangeDetector, Trigger};
use crate::dispatcher::{normalize, CommandDispatcher};
use crate::media::dom::DomAccessor;
use crate::media::{Page, PlaybackState};
use crate::notifier::{HostChannel, HostNotifier};
use crate::queue::{now_ms, CommandQueue, FlushOutcome};

pub struct Bridge<P: Page, C: HostChannel> {
    dom: DomAccessor<P>,
    queue: CommandQueue,
    detector: StateChangeDetector,
    notifier: HostNotifier<C>,
}

impl<P: Page, C: HostChannel> Bridge<P, C> {
    /// `pending_seed` is a command the host stashed before this session's bridge existed
    pub fn new(
        page: P,
        notifier: HostNotifier<C>,
        config: &BridgeConfig,
        pending_seed: Option<&str>,
    ) -> Self {
        let seed = pending_seed.map(normalize);
        Self {
            dom: DomAccessor::new(page, config),
            queue: CommandQueue::with_seed(seed, config.pending_command_ttl(), now_ms()),
            detector: StateChangeDetector::new(),
            notifier,
        }
    }

    // === Host Surface ===

    /// `true` = handled, `false` = accepted but deferred until the page is ready
    pub fn run_command(&mut self, raw: &str) -> bool {
        self.run_command_at(raw, now_ms())
    }

    pub fn run_command_at(&mut self, raw: &str, now_ms: u64) -> bool {
        CommandDispatcher::new(&self.dom).run_command(&mut self.queue, raw, now_ms)
    }

    pub fn get_state(&self) -> PlaybackState {
        self.dom.read_state()
    }

    pub fn request_pip(&self) -> bool {
        let requested = self.dom.request_pip();
        if !requested {
            tracing::warn!("[Bridge] Picture-in-picture request not possible");
        }
        requested
    }

    pub fn exit_pip(&self) {
        self.dom.exit_pip();
    }

    // === Page Events ===

    /// Phase one of attachment. Returns `true` once the player region exists
    /// and the caller should start observing it.
    pub fn try_attach(&mut self) -> bool {
        if self.detector.is_attached() {
            return true;
        }
        if !self.dom.player_region_present() {
            return false;
        }
        self.flush_pending(now_ms());
        self.detector.mark_attached();
        true
    }

    /// The single reconciliation entry point for every event source
    pub fn on_trigger(&mut self, trigger: Trigger) {
        self.on_trigger_at(trigger, now_ms());
    }

    pub fn on_trigger_at(&mut self, trigger: Trigger, now_ms: u64) {
        tracing::trace!("[Bridge] Trigger {:?}", trigger);

        // Readiness may have just arrived; the queued command goes before any notification
        self.flush_pending(now_ms);

        let sample = self.dom.read_state();
        for event in self.detector.reconcile(&sample) {
            self.notifier.notify(&event);
        }
    }

    fn flush_pending(&mut self, now_ms: u64) -> FlushOutcome {
        let dom = &self.dom;
        self.queue.flush(
            now_ms,
            || dom.is_ready(),
            |command| {
                // A ready page consumes the command whether or not it found something to act on
                CommandDispatcher::new(dom).dispatch_ready(command);
                true
            },
        )
    }

    // === Inspection ===

    pub fn pending_command(&self) -> Option<&str> {
        self.queue.pending()
    }

    pub fn phase(&self) -> AttachPhase {
        self.detector.phase()
    }

    pub fn is_attached(&self) -> bool {
        self.detector.is_attached()
    }

    pub fn page(&self) -> &P {
        self.dom.page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::MediaEvent;
    use crate::host::HostEvent;
    use crate::media::sim::{SimAction, SimPage};
    use crossbeam_channel::{unbounded, Receiver, Sender};

    fn bridge_with(
        config: &BridgeConfig,
        seed: Option<&str>,
    ) -> (SimPage, Bridge<SimPage, Sender<HostEvent>>, Receiver<HostEvent>) {
        let page = SimPage::new();
        let (tx, rx) = unbounded();
        let bridge = Bridge::new(page.clone(), HostNotifier::new(Some(tx)), config, seed);
        (page, bridge, rx)
    }

    fn bridge() -> (SimPage, Bridge<SimPage, Sender<HostEvent>>, Receiver<HostEvent>) {
        bridge_with(&BridgeConfig::default(), None)
    }

    fn drain(rx: &Receiver<HostEvent>) -> Vec<HostEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_queued_play_flushes_when_media_appears() {
        let (page, mut bridge, rx) = bridge();

        assert!(!bridge.run_command("play"));
        assert_eq!(bridge.pending_command(), Some("play"));

        page.insert_media("video");
        bridge.on_trigger(Trigger::Poll);

        assert_eq!(bridge.pending_command(), None);
        assert_eq!(page.is_paused(), Some(false));
        assert_eq!(drain(&rx), vec![HostEvent::PlaybackChanged { playing: true }]);
    }

    #[test]
    fn test_unready_triggers_keep_command() {
        let (page, mut bridge, _rx) = bridge();
        bridge.run_command("next");

        for _ in 0..5 {
            bridge.on_trigger(Trigger::Mutation);
        }
        assert_eq!(bridge.pending_command(), Some("next"));
        assert!(page.actions().is_empty());
    }

    #[test]
    fn test_later_command_supersedes_queued_one() {
        let (page, mut bridge, _rx) = bridge();
        bridge.run_command("play");
        bridge.run_command("pause");

        page.insert_media("video");
        page.set_paused(false);
        bridge.on_trigger(Trigger::Poll);

        assert_eq!(page.actions(), vec![SimAction::Pause]);
        assert_eq!(bridge.pending_command(), None);
    }

    #[test]
    fn test_get_state_without_media() {
        let (_page, bridge, _rx) = bridge();
        assert_eq!(
            bridge.get_state(),
            PlaybackState {
                playing: false,
                title: String::new(),
                artist: String::new(),
                duration: 0.0,
                current_time: 0.0,
            }
        );
    }

    #[test]
    fn test_unknown_command_on_ready_page_is_quiet() {
        let (page, mut bridge, rx) = bridge();
        page.insert_media("video");
        bridge.on_trigger(Trigger::Poll);
        drain(&rx);

        assert!(bridge.run_command("frobnicate"));
        bridge.on_trigger(Trigger::Poll);

        assert!(drain(&rx).is_empty());
        assert!(page.actions().is_empty());
        assert_eq!(bridge.pending_command(), None);
    }

    #[test]
    fn test_normalization_is_equivalent() {
        let (page_a, mut a, _rx_a) = bridge();
        let (page_b, mut b, _rx_b) = bridge();
        page_a.insert_media("video");
        page_b.insert_media("video");

        assert_eq!(a.run_command(" Toggle "), b.run_command("toggle"));
        assert_eq!(page_a.actions(), page_b.actions());
        assert_eq!(page_a.is_paused(), page_b.is_paused());
    }

    #[test]
    fn test_track_change_notifies_once() {
        let (page, mut bridge, rx) = bridge();
        page.show_player_region();
        page.insert_media("video");
        page.set_paused(false);
        page.set_track("One", "Band");

        bridge.on_trigger(Trigger::Mutation);
        assert_eq!(drain(&rx).len(), 2);

        // Same state again from a different source
        bridge.on_trigger(Trigger::Media(MediaEvent::LoadedMetadata));
        assert!(drain(&rx).is_empty());

        page.set_track("Two", "Band");
        bridge.on_trigger(Trigger::Poll);
        assert_eq!(
            drain(&rx),
            vec![HostEvent::TrackChanged { title: "Two".into(), artist: "Band".into() }]
        );
    }

    #[test]
    fn test_two_phase_attach() {
        let (page, mut bridge, _rx) = bridge();
        bridge.run_command("play");
        assert!(!bridge.try_attach());
        assert_eq!(bridge.phase(), AttachPhase::WaitingForPlayer);

        page.insert_media("video");
        page.show_player_region();
        assert!(bridge.try_attach());
        assert!(bridge.is_attached());
        // Attaching drains the queue like any trigger
        assert_eq!(bridge.pending_command(), None);
        assert_eq!(page.is_paused(), Some(false));
    }

    #[test]
    fn test_seed_is_normalized_and_flushed() {
        let (page, mut bridge, _rx) = bridge_with(&BridgeConfig::default(), Some(" PAUSE "));
        assert_eq!(bridge.pending_command(), Some("pause"));

        page.insert_media("video");
        page.set_paused(false);
        bridge.on_trigger(Trigger::Poll);
        assert_eq!(page.is_paused(), Some(true));
    }

    #[test]
    fn test_ttl_drops_stale_command() {
        let config = BridgeConfig { pending_command_ttl_ms: Some(1_000), ..Default::default() };
        let (page, mut bridge, _rx) = bridge_with(&config, None);

        assert!(!bridge.run_command_at("play", 10_000));
        page.insert_media("video");
        bridge.on_trigger_at(Trigger::Poll, 20_000);

        assert_eq!(bridge.pending_command(), None);
        assert_eq!(page.is_paused(), Some(true));
        assert!(page.actions().is_empty());
    }

    #[test]
    fn test_player_api_readiness_consumes_transport_command() {
        let (page, mut bridge, _rx) = bridge();
        bridge.run_command("play");

        // The player object boots before the video element exists
        page.set_player_api("#movie_player", -1);
        bridge.on_trigger(Trigger::Poll);
        assert_eq!(bridge.pending_command(), None);
        assert!(page.actions().is_empty());

        // Not replayed once the element shows up
        page.insert_media("video");
        bridge.on_trigger(Trigger::Poll);
        assert_eq!(page.is_paused(), Some(true));
        assert!(page.actions().is_empty());
    }

    #[test]
    fn test_detached_bridge_runs() {
        let page = SimPage::new();
        page.insert_media("video");
        let mut bridge = Bridge::new(page.clone(), HostNotifier::detached(), &BridgeConfig::default(), None);
        assert!(bridge.run_command("play"));
        bridge.on_trigger(Trigger::Poll);
        assert!(bridge.get_state().playing);
    }
}
