//! chat-dashboard - WebAssembly dashboard for a remote chat API
//!
//! Loads layered configuration into a form, sends one chat request at a
//! time to `{apiUrl}/v1/chat`, and keeps a short history of past requests
//! in localStorage. The page script only wires DOM events to the
//! [`Dashboard`] command handlers below.

use js_sys::Promise;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub mod binder;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod history;
pub mod storage;
pub mod transport;

use binder::{apply_config, capture_config};
use client::{ChatBody, ChatClient as TypedChatClient};
use config::Config;
use dom::Page;
use error::DashboardError;
use history::HistoryLog;
use storage::{BrowserStorage, ConfigStore};
use transport::FetchTransport;

/// Initialize panic reporting and console logging
#[wasm_bindgen]
pub fn init() {
    console_error_panic_hook::set_once();
    // A second init finds the logger installed; only the level is reset.
    let _ = console_log::init_with_level(log::Level::Info);
    log::set_max_level(log::LevelFilter::Info);
}

fn window() -> Result<web_sys::Window, DashboardError> {
    web_sys::window().ok_or_else(|| DashboardError::Dom("No window".to_string()))
}

/// The dashboard page
#[wasm_bindgen]
pub struct Dashboard {
    page: Rc<Page>,
    config: ConfigStore<BrowserStorage>,
    history: HistoryLog<BrowserStorage>,
    transport: FetchTransport,
}

#[wasm_bindgen]
impl Dashboard {
    /// Bind to the current page and its localStorage
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Dashboard, JsValue> {
        init();
        let window = window()?;
        let storage = BrowserStorage::from_window(&window)?;
        let page = Rc::new(Page::from_window(window.clone())?);
        Ok(Dashboard {
            page,
            config: ConfigStore::new(storage.clone()),
            history: HistoryLog::new(storage),
            transport: FetchTransport::new(window),
        })
    }

    /// Resolve the effective configuration, show it, render the history (returns Promise)
    #[wasm_bindgen]
    pub fn start(&self) -> Promise {
        let page = self.page.clone();
        let store = self.config.clone();
        let history = self.history.clone();
        let transport = self.transport.clone();

        future_to_promise(async move {
            let effective = config::load_effective(&store, &transport, &page.query()).await;
            page.apply(&apply_config(&effective))?;
            if effective.debug == Some(true) {
                log::set_max_level(log::LevelFilter::Debug);
            }
            page.render_history(&history.entries())?;
            log::info!("dashboard ready for {}", effective.brand());
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Merge the visible form over the stored config and persist it
    #[wasm_bindgen(js_name = "saveConfig")]
    pub fn save_config(&self) -> Result<(), JsValue> {
        let captured = capture_config(&self.page.read_form());
        self.config.merge(&captured)?;
        self.page.toast("Configuration enregistrée.")?;
        Ok(())
    }

    /// Download the stored config as `config.json`
    #[wasm_bindgen(js_name = "exportConfig")]
    pub fn export_config(&self) -> Result<(), JsValue> {
        let json = self.config.export()?;
        self.page.download(config::CONFIG_FILE, &json, "application/json")?;
        Ok(())
    }

    /// Merge an imported config file over the stored config and show it
    #[wasm_bindgen(js_name = "importConfig")]
    pub fn import_config(&self, text: &str) -> Result<(), JsValue> {
        match self.config.import(text) {
            Ok(merged) => {
                self.page.apply(&apply_config(&merged))?;
                self.page.toast("Configuration importée.")?;
            }
            Err(e) => {
                log::warn!("{}", e);
                self.page.toast("Fichier invalide.")?;
            }
        }
        Ok(())
    }

    /// Send the chat request described by the form (returns Promise)
    #[wasm_bindgen]
    pub fn send(&self) -> Promise {
        let page = self.page.clone();
        let history = self.history.clone();
        let transport = self.transport.clone();

        future_to_promise(async move {
            let form = page.read_form();
            match dispatch::send_chat(&form, &transport, &history).await {
                Ok(view) => {
                    page.show_result(&view)?;
                    page.render_history(&history.entries())?;
                }
                Err(DashboardError::Validation(message)) => page.toast(&message)?,
                Err(e) => return Err(e.into()),
            }
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = "renderHistory")]
    pub fn render_history(&self) -> Result<(), JsValue> {
        self.page.render_history(&self.history.entries())?;
        Ok(())
    }

    #[wasm_bindgen(js_name = "clearHistory")]
    pub fn clear_history(&self) -> Result<(), JsValue> {
        self.history.clear()?;
        self.page.render_history(&[])?;
        Ok(())
    }

    /// Download the stored history as `history.json`
    #[wasm_bindgen(js_name = "exportHistory")]
    pub fn export_history(&self) -> Result<(), JsValue> {
        let json = self.history.export()?;
        self.page.download("history.json", &json, "application/json")?;
        Ok(())
    }

    /// Copy the `curl` equivalent of history entry `index` and show it
    #[wasm_bindgen(js_name = "copyCurl")]
    pub fn copy_curl(&self, index: usize) -> Result<String, JsValue> {
        let entry = self
            .history
            .get(index)
            .ok_or_else(|| DashboardError::Dom(format!("no history entry #{}", index)))?;
        let curl = entry.to_curl();
        self.page.show_text(&curl);
        match self.page.copy_to_clipboard(&curl) {
            Ok(()) => self.page.toast("Commande copiée.")?,
            Err(e) => log::warn!("{}", e),
        }
        Ok(curl)
    }

    /// Current stored configuration as JSON
    #[wasm_bindgen(js_name = "getConfig")]
    pub fn get_config(&self) -> Result<String, JsValue> {
        let config: Config = self.config.get();
        serde_json::to_string(&config)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

/// Typed chat client for other page scripts
#[wasm_bindgen(js_name = "ChatClient")]
pub struct WasmChatClient {
    inner: Rc<TypedChatClient<FetchTransport>>,
}

#[wasm_bindgen(js_class = "ChatClient")]
impl WasmChatClient {
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<WasmChatClient, JsValue> {
        let transport = FetchTransport::new(window()?);
        Ok(WasmChatClient {
            inner: Rc::new(TypedChatClient::new(base_url, api_key, transport)),
        })
    }

    /// POST a chat body; resolves to `{ok, status, data}` even on non-2xx (returns Promise)
    #[wasm_bindgen]
    pub fn chat(&self, body: JsValue) -> Promise {
        let client = self.inner.clone();
        future_to_promise(async move {
            let body: ChatBody = serde_wasm_bindgen::from_value(body)
                .map_err(|e| JsValue::from_str(&format!("Invalid chat body: {}", e)))?;
            let reply = client.chat(&body).await?;
            reply
                .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
                .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
        })
    }
}
