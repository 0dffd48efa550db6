//! Read/act helpers over the hosted page.
//!
//! Everything here degrades to an empty value: a missing element is the
//! normal state of a page that is still loading, not an error.

use super::{MediaHandle, Page, PlaybackState, PlayerApi};
use crate::config::BridgeConfig;

/// Selectors the accessor works with, lifted out of [`BridgeConfig`]
#[derive(Clone, Debug)]
struct Selectors {
    player_region: String,
    media: String,
    player_api: String,
    title: Vec<String>,
    artist: Vec<String>,
    next: Vec<String>,
    previous: Vec<String>,
}

pub struct DomAccessor<P: Page> {
    page: P,
    selectors: Selectors,
}

impl<P: Page> DomAccessor<P> {
    pub fn new(page: P, config: &BridgeConfig) -> Self {
        Self {
            page,
            selectors: Selectors {
                player_region: config.player_region_selector.clone(),
                media: config.media_selector.clone(),
                player_api: config.player_api_selector.clone(),
                title: config.title_selectors.clone(),
                artist: config.artist_selectors.clone(),
                next: config.next_selectors.clone(),
                previous: config.previous_selectors.clone(),
            },
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn locate_media(&self) -> Option<P::Media> {
        self.page.media(&self.selectors.media)
    }

    /// The page's player object, only once its state query is callable.
    /// A bare element without the API means the page framework hasn't booted yet.
    pub fn locate_player_api(&self) -> Option<P::Player> {
        self.page.player_api(&self.selectors.player_api)
    }

    /// Commands are actionable once either the media element or the player API exists
    pub fn is_ready(&self) -> bool {
        if self.locate_media().is_some() {
            return true;
        }
        match self.locate_player_api() {
            Some(player) => {
                tracing::trace!("[Dom] Player API ready, state {:?}", player.player_state());
                true
            }
            None => false,
        }
    }

    pub fn player_region_present(&self) -> bool {
        self.page.exists(&self.selectors.player_region)
    }

    /// Click the first candidate that matches. Returns whether any did.
    pub fn invoke_control<S: AsRef<str>>(&self, candidates: &[S]) -> bool {
        for selector in candidates {
            if self.page.click(selector.as_ref()) {
                tracing::debug!("[Dom] Clicked {}", selector.as_ref());
                return true;
            }
        }
        false
    }

    pub fn click_next(&self) -> bool {
        self.invoke_control(&self.selectors.next)
    }

    pub fn click_previous(&self) -> bool {
        self.invoke_control(&self.selectors.previous)
    }

    /// First non-empty trimmed text among the candidates
    fn first_text(&self, candidates: &[String]) -> String {
        candidates
            .iter()
            .filter_map(|selector| self.page.text(selector))
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty())
            .unwrap_or_default()
    }

    /// Best-effort snapshot. Unavailable fields read as zero/empty/false.
    pub fn read_state(&self) -> PlaybackState {
        let media = self.locate_media();

        PlaybackState {
            playing: media.as_ref().map(|m| !m.is_paused()).unwrap_or(false),
            title: self.first_text(&self.selectors.title),
            artist: self.first_text(&self.selectors.artist),
            duration: media
                .as_ref()
                .map(|m| PlaybackState::sanitize_seconds(m.duration()))
                .unwrap_or(0.0),
            current_time: media
                .as_ref()
                .map(|m| PlaybackState::sanitize_seconds(m.current_time()))
                .unwrap_or(0.0),
        }
    }

    pub fn request_pip(&self) -> bool {
        let Some(media) = self.locate_media() else {
            return false;
        };
        if !self.page.pip_enabled() {
            tracing::debug!("[Dom] Picture-in-picture not enabled on this document");
            return false;
        }
        media.request_pip()
    }

    pub fn exit_pip(&self) {
        if self.page.pip_active() {
            self.page.exit_pip();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::sim::{SimAction, SimPage};

    fn accessor() -> (SimPage, DomAccessor<SimPage>) {
        let page = SimPage::new();
        let dom = DomAccessor::new(page.clone(), &BridgeConfig::default());
        (page, dom)
    }

    #[test]
    fn test_empty_page_reads_defaults() {
        let (_page, dom) = accessor();
        assert!(dom.locate_media().is_none());
        assert!(!dom.is_ready());
        assert_eq!(dom.read_state(), PlaybackState::default());
    }

    #[test]
    fn test_ready_via_player_api_alone() {
        let (page, dom) = accessor();
        page.set_player_api("#movie_player", -1);
        assert!(dom.locate_media().is_none());
        assert!(dom.is_ready());
    }

    #[test]
    fn test_read_state_trims_and_sanitizes() {
        let (page, dom) = accessor();
        page.insert_media("video");
        page.set_paused(false);
        page.set_times(-1.0, f64::NAN);
        page.set_track("  Song  ", "\nBand ");

        let state = dom.read_state();
        assert!(state.playing);
        assert_eq!(state.title, "Song");
        assert_eq!(state.artist, "Band");
        assert_eq!(state.duration, 0.0);
        assert_eq!(state.current_time, 0.0);
    }

    #[test]
    fn test_title_falls_back_to_content_info() {
        let (page, dom) = accessor();
        page.add_element(&[".content-info-wrapper .title"], "Fallback");
        assert_eq!(dom.read_state().title, "Fallback");
    }

    #[test]
    fn test_invoke_control_prefers_first_candidate() {
        let (page, dom) = accessor();
        page.add_element(&[".ytp-next-button"], "");
        page.add_element(&[r#"[aria-label="Next"]"#], "");

        assert!(dom.click_next());
        assert_eq!(
            page.actions(),
            vec![SimAction::Click(r#"[aria-label="Next"]"#.to_string())]
        );
    }

    #[test]
    fn test_invoke_control_no_match() {
        let (page, dom) = accessor();
        assert!(!dom.click_previous());
        assert!(page.actions().is_empty());
    }

    #[test]
    fn test_pip_requires_media_and_document_support() {
        let (page, dom) = accessor();
        assert!(!dom.request_pip());

        page.insert_media("video");
        assert!(!dom.request_pip());

        page.set_pip_enabled(true);
        assert!(dom.request_pip());
        dom.exit_pip();
        assert_eq!(page.actions(), vec![SimAction::RequestPip, SimAction::ExitPip]);

        // Not active any more, nothing to exit
        dom.exit_pip();
        assert_eq!(page.actions().len(), 2);
    }
}
