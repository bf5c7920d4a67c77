//! Page glue: element lookup, form reads and writes, toasts, downloads

use gloo_timers::callback::Timeout;
use js_sys::{Array, Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Blob, BlobPropertyBag, CssStyleDeclaration, Document, HtmlElement, HtmlInputElement,
    HtmlSelectElement, HtmlTextAreaElement, Url, Window,
};

use crate::binder::{BoundView, FormState};
use crate::dispatch::ResultView;
use crate::error::{DashboardError, Result};
use crate::history::HistoryEntry;

/// How long a toast stays on screen
const TOAST_MS: u32 = 1800;

/// Handles to every element the dashboard touches
#[derive(Debug, Clone)]
pub struct Page {
    window: Window,
    document: Document,
    root_style: CssStyleDeclaration,
    api_url: HtmlInputElement,
    api_key: HtmlInputElement,
    client_id: HtmlInputElement,
    mode: HtmlSelectElement,
    request_id: HtmlInputElement,
    question: HtmlTextAreaElement,
    refresh: HtmlInputElement,
    debug: HtmlInputElement,
    result: HtmlElement,
    meta: HtmlElement,
    brand_title: HtmlElement,
    history_list: HtmlElement,
}

fn element<T: JsCast>(document: &Document, id: &str) -> Result<T> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| DashboardError::Dom(format!("missing element #{}", id)))?
        .dyn_into::<T>()
        .map_err(|_| DashboardError::Dom(format!("element #{} has an unexpected type", id)))
}

impl Page {
    pub fn from_window(window: Window) -> Result<Self> {
        let document = window
            .document()
            .ok_or_else(|| DashboardError::Dom("No document".to_string()))?;
        let root: HtmlElement = document
            .document_element()
            .ok_or_else(|| DashboardError::Dom("No document element".to_string()))?
            .dyn_into()
            .map_err(|_| DashboardError::Dom("document element is not HTML".to_string()))?;

        Ok(Page {
            root_style: root.style(),
            api_url: element(&document, "apiUrl")?,
            api_key: element(&document, "apiKey")?,
            client_id: element(&document, "clientId")?,
            mode: element(&document, "mode")?,
            request_id: element(&document, "requestId")?,
            question: element(&document, "question")?,
            refresh: element(&document, "refresh")?,
            debug: element(&document, "debug")?,
            result: element(&document, "result")?,
            meta: element(&document, "meta")?,
            brand_title: element(&document, "brandTitle")?,
            history_list: element(&document, "historyList")?,
            window,
            document,
        })
    }

    /// Current query string, including the leading `?`
    pub fn query(&self) -> String {
        self.window.location().search().unwrap_or_default()
    }

    pub fn read_form(&self) -> FormState {
        FormState {
            api_url: self.api_url.value(),
            api_key: self.api_key.value(),
            client_id: self.client_id.value(),
            mode: self.mode.value(),
            request_id: self.request_id.value(),
            question: self.question.value(),
            refresh: self.refresh.checked(),
            debug: self.debug.checked(),
        }
    }

    pub fn apply(&self, view: &BoundView) -> Result<()> {
        if let Some(v) = &view.api_url {
            self.api_url.set_value(v);
        }
        if let Some(v) = &view.api_key {
            self.api_key.set_value(v);
        }
        if let Some(v) = &view.client_id {
            self.client_id.set_value(v);
        }
        if let Some(mode) = view.mode {
            self.mode.set_value(mode.as_str());
        }
        if let Some(v) = &view.request_id {
            self.request_id.set_value(v);
        }
        if let Some(debug) = view.debug {
            self.debug.set_checked(debug);
        }
        for (name, value) in &view.css_vars {
            self.root_style
                .set_property(name, value)
                .map_err(DashboardError::dom)?;
        }
        self.brand_title.set_text_content(Some(&view.brand));
        Ok(())
    }

    pub fn show_result(&self, view: &ResultView) -> Result<()> {
        self.meta.set_text_content(Some(&view.meta));
        self.result.set_text_content(Some(&view.body));
        self.result
            .set_attribute("data-state", if view.is_error { "error" } else { "ok" })
            .map_err(DashboardError::dom)
    }

    /// Plain text in the result area, e.g. a generated command line
    pub fn show_text(&self, text: &str) {
        self.result.set_text_content(Some(text));
    }

    /// One `<li>` per entry, each with a copy-as-curl button carrying its index.
    /// The page script routes clicks on those buttons back to `Dashboard::copy_curl`.
    pub fn render_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        self.history_list.set_inner_html("");
        for (index, entry) in entries.iter().enumerate() {
            let item = self.document.create_element("li").map_err(DashboardError::dom)?;
            item.set_attribute("data-state", if entry.ok { "ok" } else { "error" })
                .map_err(DashboardError::dom)?;

            let summary = self.document.create_element("span").map_err(DashboardError::dom)?;
            summary.set_text_content(Some(&entry.summary()));

            let button = self.document.create_element("button").map_err(DashboardError::dom)?;
            button.set_attribute("class", "copy-curl").map_err(DashboardError::dom)?;
            button.set_attribute("data-index", &index.to_string()).map_err(DashboardError::dom)?;
            button.set_text_content(Some("curl"));

            item.append_child(&summary).map_err(DashboardError::dom)?;
            item.append_child(&button).map_err(DashboardError::dom)?;
            self.history_list.append_child(&item).map_err(DashboardError::dom)?;
        }
        Ok(())
    }

    /// Short-lived notification in the bottom-right corner
    pub fn toast(&self, message: &str) -> Result<()> {
        let el = self.document.create_element("div").map_err(DashboardError::dom)?;
        el.set_text_content(Some(message));
        el.set_attribute(
            "style",
            "position: fixed; bottom: 16px; right: 16px; background: #111827; \
             border: 1px solid #374151; color: #e5e7eb; padding: 8px 12px; \
             border-radius: 8px; box-shadow: 0 4px 16px rgba(0,0,0,0.25)",
        )
        .map_err(DashboardError::dom)?;

        let body = self
            .document
            .body()
            .ok_or_else(|| DashboardError::Dom("No body".to_string()))?;
        body.append_child(&el).map_err(DashboardError::dom)?;

        Timeout::new(TOAST_MS, move || el.remove()).forget();
        Ok(())
    }

    /// Offer `content` as a file download
    pub fn download(&self, filename: &str, content: &str, mime: &str) -> Result<()> {
        let parts = Array::new();
        parts.push(&JsValue::from_str(content));
        let options = BlobPropertyBag::new();
        options.set_type(mime);
        let blob = Blob::new_with_str_sequence_and_options(&parts, &options)
            .map_err(DashboardError::dom)?;
        let url = Url::create_object_url_with_blob(&blob).map_err(DashboardError::dom)?;

        let link: HtmlElement = self
            .document
            .create_element("a")
            .map_err(DashboardError::dom)?
            .dyn_into()
            .map_err(|_| DashboardError::Dom("Failed to create link".to_string()))?;
        link.set_attribute("href", &url).map_err(DashboardError::dom)?;
        link.set_attribute("download", filename).map_err(DashboardError::dom)?;
        link.set_attribute("style", "display: none").map_err(DashboardError::dom)?;

        let body = self
            .document
            .body()
            .ok_or_else(|| DashboardError::Dom("No body".to_string()))?;
        body.append_child(&link).map_err(DashboardError::dom)?;
        link.click();
        body.remove_child(&link).map_err(DashboardError::dom)?;

        let _ = Url::revoke_object_url(&url);
        Ok(())
    }

    /// `navigator.clipboard.writeText(text)`, when the browser exposes it
    pub fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        let navigator = Reflect::get(&self.window, &JsValue::from_str("navigator"))
            .map_err(DashboardError::dom)?;
        let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard"))
            .map_err(DashboardError::dom)?;
        if clipboard.is_undefined() {
            return Err(DashboardError::Dom("Clipboard API unavailable".to_string()));
        }
        let write_text: Function = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
            .map_err(DashboardError::dom)?
            .dyn_into()
            .map_err(|_| DashboardError::Dom("clipboard.writeText is not a function".to_string()))?;
        write_text
            .call1(&clipboard, &JsValue::from_str(text))
            .map_err(DashboardError::dom)?;
        Ok(())
    }
}
