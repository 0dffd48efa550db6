//! In-memory stand-in for the hosted page.
//!
//! Used by the unit tests and by the `bridge_test` console, where no live
//! document exists. The page is shared (`Clone` hands out another view of the
//! same document) so a test can keep mutating it after the bridge owns a copy.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{MediaHandle, Page, PlayerApi};

/// Something the bridge did to the page
#[derive(Clone, Debug, PartialEq)]
pub enum SimAction {
    Click(String),
    Play,
    Pause,
    RequestPip,
    ExitPip,
}

#[derive(Clone, Debug)]
struct SimElement {
    /// Simple selectors this element answers to
    matches: Vec<String>,
    text: String,
}

#[derive(Clone, Debug)]
struct SimMediaState {
    selector: String,
    paused: bool,
    duration: f64,
    current_time: f64,
}

#[derive(Debug, Default)]
struct SimDom {
    elements: Vec<SimElement>,
    media: Option<SimMediaState>,
    player_api: Option<(String, i32)>,
    pip_enabled: bool,
    pip_active: bool,
    actions: Vec<SimAction>,
}

impl SimDom {
    fn find(&self, selector: &str) -> Option<&SimElement> {
        self.elements.iter().find(|el| matches_group(&el.matches, selector))
    }
}

/// A selector group like `.a, .b` matches when any member matches
fn matches_group(matches: &[String], selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .any(|part| matches.iter().any(|m| m == part))
}

#[derive(Clone, Debug, Default)]
pub struct SimPage {
    dom: Arc<Mutex<SimDom>>,
}

impl SimPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn dom(&self) -> MutexGuard<'_, SimDom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // === Page Mutations ===

    /// Append an element answering to each of `matches`
    pub fn add_element(&self, matches: &[&str], text: &str) {
        self.dom().elements.push(SimElement {
            matches: matches.iter().map(|m| m.to_string()).collect(),
            text: text.to_string(),
        });
    }

    /// Render the player bar region
    pub fn show_player_region(&self) {
        if !self.exists("ytmusic-player-bar") {
            self.add_element(&["ytmusic-player-bar"], "");
        }
    }

    /// Rewrite the player bar's title and byline text, creating the nodes if needed
    pub fn set_track(&self, title: &str, artist: &str) {
        let mut dom = self.dom();
        for (selector, text) in [
            (".title.ytmusic-player-bar", title),
            (".byline.ytmusic-player-bar a", artist),
        ] {
            match dom.elements.iter().position(|el| matches_group(&el.matches, selector)) {
                Some(i) => dom.elements[i].text = text.to_string(),
                None => dom.elements.push(SimElement {
                    matches: vec![selector.to_string()],
                    text: text.to_string(),
                }),
            }
        }
    }

    /// Insert a paused media element answering to `selector`
    pub fn insert_media(&self, selector: &str) {
        self.dom().media = Some(SimMediaState {
            selector: selector.to_string(),
            paused: true,
            duration: f64::NAN,
            current_time: 0.0,
        });
    }

    pub fn remove_media(&self) {
        self.dom().media = None;
    }

    /// Change the paused flag without recording it as a bridge action
    pub fn set_paused(&self, paused: bool) {
        if let Some(media) = self.dom().media.as_mut() {
            media.paused = paused;
        }
    }

    pub fn set_times(&self, current_time: f64, duration: f64) {
        if let Some(media) = self.dom().media.as_mut() {
            media.current_time = current_time;
            media.duration = duration;
        }
    }

    /// Expose a player API whose state query returns `state`
    pub fn set_player_api(&self, selector: &str, state: i32) {
        self.dom().player_api = Some((selector.to_string(), state));
    }

    pub fn set_pip_enabled(&self, enabled: bool) {
        self.dom().pip_enabled = enabled;
    }

    // === Inspection ===

    pub fn is_paused(&self) -> Option<bool> {
        self.dom().media.as_ref().map(|m| m.paused)
    }

    pub fn actions(&self) -> Vec<SimAction> {
        self.dom().actions.clone()
    }
}

/// Handle onto the simulated media element
#[derive(Clone, Debug)]
pub struct SimMedia {
    dom: Arc<Mutex<SimDom>>,
}

impl SimMedia {
    fn with_media<T>(&self, f: impl FnOnce(&mut SimMediaState) -> T) -> Option<T> {
        let mut dom = self.dom.lock().unwrap_or_else(PoisonError::into_inner);
        dom.media.as_mut().map(f)
    }

    fn record(&self, action: SimAction) {
        let mut dom = self.dom.lock().unwrap_or_else(PoisonError::into_inner);
        dom.actions.push(action);
    }
}

impl MediaHandle for SimMedia {
    fn is_paused(&self) -> bool {
        // A detached element reports paused, same as the browser
        self.with_media(|m| m.paused).unwrap_or(true)
    }

    fn play(&self) {
        self.record(SimAction::Play);
        self.with_media(|m| m.paused = false);
    }

    fn pause(&self) {
        self.record(SimAction::Pause);
        self.with_media(|m| m.paused = true);
    }

    fn duration(&self) -> f64 {
        self.with_media(|m| m.duration).unwrap_or(f64::NAN)
    }

    fn current_time(&self) -> f64 {
        self.with_media(|m| m.current_time).unwrap_or(0.0)
    }

    fn request_pip(&self) -> bool {
        let mut dom = self.dom.lock().unwrap_or_else(PoisonError::into_inner);
        dom.actions.push(SimAction::RequestPip);
        dom.pip_active = true;
        true
    }
}

#[derive(Clone, Debug)]
pub struct SimPlayer {
    state: i32,
}

impl PlayerApi for SimPlayer {
    fn player_state(&self) -> Option<i32> {
        Some(self.state)
    }
}

impl Page for SimPage {
    type Media = SimMedia;
    type Player = SimPlayer;

    fn media(&self, selector: &str) -> Option<SimMedia> {
        let dom = self.dom();
        let media = dom.media.as_ref()?;
        if !matches_group(std::slice::from_ref(&media.selector), selector) {
            return None;
        }
        Some(SimMedia { dom: Arc::clone(&self.dom) })
    }

    fn player_api(&self, selector: &str) -> Option<SimPlayer> {
        let dom = self.dom();
        let (api_selector, state) = dom.player_api.as_ref()?;
        if matches_group(std::slice::from_ref(api_selector), selector) {
            Some(SimPlayer { state: *state })
        } else {
            None
        }
    }

    fn exists(&self, selector: &str) -> bool {
        self.dom().find(selector).is_some()
    }

    fn click(&self, selector: &str) -> bool {
        let mut dom = self.dom();
        if dom.find(selector).is_none() {
            return false;
        }
        dom.actions.push(SimAction::Click(selector.to_string()));
        true
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.dom().find(selector).map(|el| el.text.clone())
    }

    fn pip_enabled(&self) -> bool {
        self.dom().pip_enabled
    }

    fn pip_active(&self) -> bool {
        self.dom().pip_active
    }

    fn exit_pip(&self) {
        let mut dom = self.dom();
        dom.actions.push(SimAction::ExitPip);
        dom.pip_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_groups_match_any_member() {
        let page = SimPage::new();
        page.add_element(&[".ytp-next-button"], "");

        assert!(page.exists(".next-button, .ytp-next-button"));
        assert!(!page.exists(".next-button"));
        assert!(page.click(" .ytp-next-button "));
        assert_eq!(page.actions(), vec![SimAction::Click(" .ytp-next-button ".to_string())]);
    }

    #[test]
    fn test_media_lifecycle() {
        let page = SimPage::new();
        assert!(page.media("video").is_none());

        page.insert_media("video");
        let media = page.media("video").unwrap();
        assert!(media.is_paused());
        assert!(media.duration().is_nan());

        media.play();
        assert_eq!(page.is_paused(), Some(false));

        // Handle outlives the element
        page.remove_media();
        assert!(media.is_paused());
        assert_eq!(page.is_paused(), None);
    }

    #[test]
    fn test_set_track_overwrites_text() {
        let page = SimPage::new();
        page.set_track("One", "A");
        page.set_track("Two", "B");
        assert_eq!(page.text(".title.ytmusic-player-bar").as_deref(), Some("Two"));
        assert_eq!(page.text(".byline.ytmusic-player-bar a").as_deref(), Some("B"));
    }
}
