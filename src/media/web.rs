//! The bridge running inside the hosted page (wasm32).
//!
//! `installBridge()` is called by the webview's initialization script and
//! returns the handle the host talks to. Browser callbacks (mutation
//! observers, media listeners, the poll interval) each borrow the bridge for
//! the length of one callback; they never overlap because the page's event
//! loop runs them one at a time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Interval;
use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlElement, HtmlMediaElement, MutationObserver,
    MutationObserverInit, Node, Window,
};

use super::{MediaHandle, Page, PlaybackState, PlayerApi};
use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::detector::{MediaEvent, Trigger};
use crate::dispatcher::normalize;
use crate::host::HostEvent;
use crate::notifier::{HostChannel, HostNotifier, NotifyError};

/// Window property the host uses to hand a command across a page reload
const PENDING_KEY: &str = "__TUNEBAR_PENDING_REMOTE_COMMAND__";
const TAURI_KEY: &str = "__TAURI_INTERNALS__";

// ==============================================================
// PAGE ACCESS
// ==============================================================

#[derive(Clone)]
pub struct WebPage {
    document: Document,
}

impl WebPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }
}

fn get_function(target: &JsValue, name: &str) -> Option<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<Function>()
        .ok()
}

pub struct WebMedia {
    element: HtmlMediaElement,
}

impl MediaHandle for WebMedia {
    fn is_paused(&self) -> bool {
        self.element.paused()
    }

    fn play(&self) {
        // The returned promise rejects under autoplay policy; the next sample shows the truth
        if let Err(e) = self.element.play() {
            tracing::warn!("[Web] play() threw: {:?}", e);
        }
    }

    fn pause(&self) {
        if let Err(e) = self.element.pause() {
            tracing::warn!("[Web] pause() threw: {:?}", e);
        }
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn request_pip(&self) -> bool {
        let Some(request) = get_function(&self.element, "requestPictureInPicture") else {
            return false;
        };
        match request.call0(&self.element) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("[Web] PiP request failed: {:?}", e);
                false
            }
        }
    }
}

pub struct WebPlayer {
    element: Element,
    get_state: Function,
}

impl PlayerApi for WebPlayer {
    fn player_state(&self) -> Option<i32> {
        self.get_state
            .call0(&self.element)
            .ok()?
            .as_f64()
            .map(|state| state as i32)
    }
}

impl Page for WebPage {
    type Media = WebMedia;
    type Player = WebPlayer;

    fn media(&self, selector: &str) -> Option<WebMedia> {
        let element = self.query(selector)?.dyn_into::<HtmlMediaElement>().ok()?;
        Some(WebMedia { element })
    }

    fn player_api(&self, selector: &str) -> Option<WebPlayer> {
        let element = self.query(selector)?;
        // The custom element exists long before the framework attaches its methods
        let get_state = get_function(&element, "getPlayerState")?;
        Some(WebPlayer { element, get_state })
    }

    fn exists(&self, selector: &str) -> bool {
        self.query(selector).is_some()
    }

    fn click(&self, selector: &str) -> bool {
        match self.query(selector).and_then(|el| el.dyn_into::<HtmlElement>().ok()) {
            Some(button) => {
                button.click();
                true
            }
            None => false,
        }
    }

    fn text(&self, selector: &str) -> Option<String> {
        self.query(selector)?.text_content()
    }

    fn pip_enabled(&self) -> bool {
        Reflect::get(&self.document, &JsValue::from_str("pictureInPictureEnabled"))
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn pip_active(&self) -> bool {
        Reflect::get(&self.document, &JsValue::from_str("pictureInPictureElement"))
            .map(|el| !el.is_null() && !el.is_undefined())
            .unwrap_or(false)
    }

    fn exit_pip(&self) {
        if let Some(exit) = get_function(&self.document, "exitPictureInPicture") {
            let _ = exit.call0(&self.document);
        }
    }
}

// ==============================================================
// HOST CHANNEL
// ==============================================================

/// `window.__TAURI_INTERNALS__.invoke(command, args)`
pub struct TauriChannel {
    internals: JsValue,
    invoke: Function,
}

impl TauriChannel {
    /// `None` when the page runs outside the host shell
    pub fn detect(window: &Window) -> Option<Self> {
        let internals = Reflect::get(window, &JsValue::from_str(TAURI_KEY)).ok()?;
        if internals.is_undefined() || internals.is_null() {
            return None;
        }
        let invoke = get_function(&internals, "invoke")?;
        Some(Self { internals, invoke })
    }
}

impl HostChannel for TauriChannel {
    fn send(&self, event: &HostEvent) -> Result<(), NotifyError> {
        let command = event.command_name();
        let rejected = |e: JsValue| NotifyError::Rejected {
            command,
            reason: format!("{:?}", e),
        };

        let args = js_sys::JSON::parse(&event.payload().to_string()).map_err(rejected)?;
        // The returned promise is not awaited
        self.invoke
            .call2(&self.internals, &JsValue::from_str(command), &args)
            .map(|_| ())
            .map_err(rejected)
    }
}

// ==============================================================
// SESSION WIRING
// ==============================================================

type WebBridge = Bridge<WebPage, TauriChannel>;

#[derive(Clone)]
struct Session {
    window: Window,
    document: Document,
    bridge: Rc<RefCell<WebBridge>>,
    /// Command that arrived while the bridge was borrowed, run by the next callback
    deferred: Rc<Cell<Option<String>>>,
    region_selector: String,
    media_selector: String,
    poll_ms: u32,
}

/// Mirror the pending command onto the window so a re-injected bridge can pick it up
fn sync_pending_global(window: &Window, pending: Option<&str>) {
    let value = pending.map(JsValue::from_str).unwrap_or(JsValue::NULL);
    let _ = Reflect::set(window, &JsValue::from_str(PENDING_KEY), &value);
}

fn fire(session: &Session, trigger: Trigger) {
    let Ok(mut bridge) = session.bridge.try_borrow_mut() else {
        tracing::debug!("[Web] Bridge busy, skipping {:?}", trigger);
        return;
    };
    if let Some(raw) = session.deferred.take() {
        bridge.run_command(&raw);
    }
    bridge.on_trigger(trigger);
    sync_pending_global(&session.window, bridge.pending_command());
}

fn try_attach(session: &Session) -> bool {
    session
        .bridge
        .try_borrow_mut()
        .map(|mut bridge| bridge.try_attach())
        .unwrap_or(false)
}

fn observe(target: &Node, init: &MutationObserverInit, callback: Closure<dyn FnMut()>) -> Option<MutationObserver> {
    let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
        Ok(observer) => observer,
        Err(e) => {
            tracing::warn!("[Web] MutationObserver unavailable: {:?}", e);
            return None;
        }
    };
    if let Err(e) = observer.observe_with_options(target, init) {
        tracing::warn!("[Web] observe() failed: {:?}", e);
    }
    // Lives as long as the page
    callback.forget();
    Some(observer)
}

/// Phase one: watch the whole document until the player region appears
fn wait_for_player(session: &Session) {
    if try_attach(session) {
        start_observing(session);
        return;
    }

    let Some(body) = session.document.body() else {
        tracing::warn!("[Web] No document body to watch");
        return;
    };

    let slot: Rc<RefCell<Option<MutationObserver>>> = Rc::new(RefCell::new(None));
    let callback = {
        let session = session.clone();
        let slot = Rc::clone(&slot);
        Closure::<dyn FnMut()>::new(move || {
            if !try_attach(&session) {
                return;
            }
            if let Some(observer) = slot.borrow_mut().take() {
                observer.disconnect();
                start_observing(&session);
            }
        })
    };

    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    *slot.borrow_mut() = observe(&Node::from(body), &init, callback);
}

/// Phase two: observe the player region, the media element, and poll
fn start_observing(session: &Session) {
    let target = session
        .document
        .query_selector(&session.region_selector)
        .ok()
        .flatten()
        .map(Node::from)
        .or_else(|| session.document.body().map(Node::from));

    if let Some(target) = target {
        let callback = {
            let session = session.clone();
            Closure::<dyn FnMut()>::new(move || fire(&session, Trigger::Mutation))
        };
        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_character_data(true);
        observe(&target, &init, callback);
    }

    if let Some(media) = session.document.query_selector(&session.media_selector).ok().flatten() {
        for event in MediaEvent::ALL {
            let callback = {
                let session = session.clone();
                Closure::<dyn FnMut()>::new(move || fire(&session, Trigger::Media(event)))
            };
            if let Err(e) =
                media.add_event_listener_with_callback(event.event_name(), callback.as_ref().unchecked_ref())
            {
                tracing::warn!("[Web] Failed to listen for {}: {:?}", event.event_name(), e);
            }
            callback.forget();
        }
    }

    // Backstop for text updates the observer misses or sees late
    let interval = {
        let session = session.clone();
        Interval::new(session.poll_ms, move || fire(&session, Trigger::Poll))
    };
    let _ = interval.forget();
}

// ==============================================================
// EXPORTS
// ==============================================================

fn to_js(state: &PlaybackState) -> JsValue {
    serde_json::to_string(state)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or(JsValue::NULL)
}

/// Handle returned to the page's init script, stored by it as the bridge object
#[wasm_bindgen]
pub struct BridgeHandle {
    session: Session,
}

#[wasm_bindgen]
impl BridgeHandle {
    /// `true` = handled, `false` = deferred until the player is ready
    #[wasm_bindgen(js_name = runCommand)]
    pub fn run_command(&self, command: JsValue) -> bool {
        // Non-string input normalizes to empty, a handled no-op
        let raw = command.as_string().unwrap_or_default();
        let Ok(mut bridge) = self.session.bridge.try_borrow_mut() else {
            let normalized = normalize(&raw);
            if normalized.is_empty() {
                return true;
            }
            tracing::info!("[Web] Bridge busy, holding '{}' for the next callback", normalized);
            sync_pending_global(&self.session.window, Some(&normalized));
            self.session.deferred.set(Some(normalized));
            return false;
        };
        // Newer intent supersedes anything held while the bridge was busy
        self.session.deferred.take();
        let handled = bridge.run_command(&raw);
        sync_pending_global(&self.session.window, bridge.pending_command());
        handled
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> JsValue {
        let state = self
            .session
            .bridge
            .try_borrow()
            .map(|bridge| bridge.get_state())
            .unwrap_or_default();
        to_js(&state)
    }

    // Named shortcuts used by the OS media controls
    pub fn play(&self) -> bool {
        self.run_command(JsValue::from_str("play"))
    }

    pub fn pause(&self) -> bool {
        self.run_command(JsValue::from_str("pause"))
    }

    #[wasm_bindgen(js_name = togglePlay)]
    pub fn toggle_play(&self) -> bool {
        self.run_command(JsValue::from_str("toggle"))
    }

    pub fn next(&self) -> bool {
        self.run_command(JsValue::from_str("next"))
    }

    pub fn previous(&self) -> bool {
        self.run_command(JsValue::from_str("previous"))
    }

    #[wasm_bindgen(js_name = requestPiP)]
    pub fn request_pip(&self) -> bool {
        self.session
            .bridge
            .try_borrow()
            .map(|bridge| bridge.request_pip())
            .unwrap_or(false)
    }

    #[wasm_bindgen(js_name = exitPiP)]
    pub fn exit_pip(&self) {
        if let Ok(bridge) = self.session.bridge.try_borrow() {
            bridge.exit_pip();
        }
    }
}

/// Build this page session's bridge and start waiting for the player.
///
/// `config_json` overrides selectors/timing; omitted fields keep their defaults.
#[wasm_bindgen(js_name = installBridge)]
pub fn install_bridge(config_json: Option<String>) -> Result<BridgeHandle, JsValue> {
    crate::logging::init_console();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let config = match config_json {
        Some(json) => BridgeConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => BridgeConfig::default(),
    };

    let seed = Reflect::get(&window, &JsValue::from_str(PENDING_KEY))
        .ok()
        .and_then(|v| v.as_string());
    let notifier = HostNotifier::new(TauriChannel::detect(&window));
    let bridge = Bridge::new(WebPage::new(document.clone()), notifier, &config, seed.as_deref());

    let session = Session {
        window,
        document,
        bridge: Rc::new(RefCell::new(bridge)),
        deferred: Rc::new(Cell::new(None)),
        region_selector: config.player_region_selector.clone(),
        media_selector: config.media_selector.clone(),
        poll_ms: u32::try_from(config.poll_interval().as_millis()).unwrap_or(u32::MAX),
    };

    if session.document.ready_state() == "loading" {
        let ready_session = session.clone();
        let on_ready = Closure::once_into_js(move || wait_for_player(&ready_session));
        session
            .document
            .add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())?;
    } else {
        wait_for_player(&session);
    }

    tracing::info!("[Web] Media bridge initialized");
    Ok(BridgeHandle { session })
}
