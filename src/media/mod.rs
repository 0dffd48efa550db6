use serde::{Deserialize, Serialize};

pub mod dom;
pub mod sim;

/// Snapshot of what the hosted player is doing right now.
///
/// Built fresh on every sample and compared by value, never patched in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub playing: bool,
    pub title: String,
    pub artist: String,
    /// Seconds, always finite and >= 0
    pub duration: f64,
    /// Seconds, always finite and >= 0
    pub current_time: f64,
}

impl PlaybackState {
    /// Clamp a raw media timestamp: NaN, infinities and negatives become 0.
    pub fn sanitize_seconds(raw: f64) -> f64 {
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            0.0
        }
    }
}

/// The closed set of transport commands the bridge knows how to act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Play,
    Pause,
    Next,
    Previous,
}

impl Command {
    /// Parse an already-normalized token. `prev` is accepted as an alias.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "toggle" => Some(Command::Toggle),
            "play" => Some(Command::Play),
            "pause" => Some(Command::Pause),
            "next" => Some(Command::Next),
            "previous" | "prev" => Some(Command::Previous),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Command::Toggle => "toggle",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Next => "next",
            Command::Previous => "previous",
        }
    }
}

/// The page's media element (a `<video>` on YouTube Music).
pub trait MediaHandle {
    fn is_paused(&self) -> bool;
    fn play(&self);
    fn pause(&self);
    /// Raw duration as reported by the element, may be NaN while loading
    fn duration(&self) -> f64;
    fn current_time(&self) -> f64;
    /// Ask the element to enter picture-in-picture. Returns whether the request was issued.
    fn request_pip(&self) -> bool;
}

/// The page's own player object, only handed out once its state query is callable.
pub trait PlayerApi {
    fn player_state(&self) -> Option<i32>;
}

/// Read/act primitives over the hosted document.
///
/// Implementations never fail: anything missing from the page is `None`/`false`.
/// Selectors may be comma-separated groups, matched in document order.
pub trait Page {
    type Media: MediaHandle;
    type Player: PlayerApi;

    fn media(&self, selector: &str) -> Option<Self::Media>;
    fn player_api(&self, selector: &str) -> Option<Self::Player>;
    fn exists(&self, selector: &str) -> bool;
    /// Activate the first element matching `selector`. Returns whether one matched.
    fn click(&self, selector: &str) -> bool;
    fn text(&self, selector: &str) -> Option<String>;

    fn pip_enabled(&self) -> bool;
    fn pip_active(&self) -> bool;
    fn exit_pip(&self);
}

// ==============================================================
// PLATFORM SELECTION FACTORY
// ==============================================================

#[cfg(target_arch = "wasm32")]
pub mod web;
#[cfg(target_arch = "wasm32")]
pub type PlatformPage = web::WebPage;

// Outside the webview there is no live document, so the simulated page stands in
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformPage = sim::SimPage;
