//! Configuration module for the dashboard
//!
//! The effective configuration is layered: built-in defaults, an optional
//! `config.json` next to the page, the copy kept in localStorage, and finally
//! the query string. Later layers win field by field; the theme merges
//! recursively.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::storage::{ConfigStore, KeyValueStore};
use crate::transport::Transport;

/// Brand shown when no layer provides one
pub const DEFAULT_BRAND: &str = "Dashboard Client";

/// Relative path of the optional per-deployment config file
pub const CONFIG_FILE: &str = "config.json";

/// Pipeline served by the chat endpoint
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Main,
    Alt,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Main => "main",
            Mode::Alt => "alt",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "main" => Ok(Mode::Main),
            "alt" => Ok(Mode::Alt),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Theme colours, applied as CSS custom properties (`--accent`, `--bg`, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muted: Option<String>,
}

impl Theme {
    /// Field-wise merge; `over` wins wherever it has a value.
    pub fn merged(&self, over: &Theme) -> Theme {
        Theme {
            accent: pick(&self.accent, &over.accent),
            bg: pick(&self.bg, &over.bg),
            card: pick(&self.card, &over.card),
            text: pick(&self.text, &over.text),
            muted: pick(&self.muted, &over.muted),
        }
    }

    /// `(css variable name, value)` pairs in a stable order
    pub fn entries(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("accent", self.accent.as_deref()),
            ("bg", self.bg.as_deref()),
            ("card", self.card.as_deref()),
            ("text", self.text.as_deref()),
            ("muted", self.muted.as_deref()),
        ]
    }

    fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, v)| v.is_none())
    }
}

/// Dashboard configuration. Every field is optional: `None` means
/// "take it from a lower-precedence layer".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_mode"
    )]
    pub mode: Option<Mode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl Config {
    /// Built-in defaults, the lowest layer
    pub fn defaults() -> Self {
        Config {
            brand_name: Some(DEFAULT_BRAND.to_string()),
            theme: Some(Theme {
                accent: Some("#3b82f6".to_string()),
                bg: Some("#0b0f1a".to_string()),
                card: Some("#111827".to_string()),
                text: Some("#e5e7eb".to_string()),
                muted: Some("#9ca3af".to_string()),
            }),
            api_url: Some(String::new()),
            api_key: Some(String::new()),
            client_id: Some(String::new()),
            mode: Some(Mode::Main),
            request_id: None,
            debug: None,
        }
    }

    /// Returns a new config with `over` layered on top of `self`.
    ///
    /// Scalars are replaced outright, the theme merges per colour. Neither
    /// input is modified.
    pub fn merged(&self, over: &Config) -> Config {
        let theme = match (&self.theme, &over.theme) {
            (Some(base), Some(top)) => Some(base.merged(top)),
            (base, top) => top.clone().or_else(|| base.clone()),
        };
        Config {
            brand_name: pick(&self.brand_name, &over.brand_name),
            theme,
            api_url: pick(&self.api_url, &over.api_url),
            api_key: pick(&self.api_key, &over.api_key),
            client_id: pick(&self.client_id, &over.client_id),
            mode: over.mode.or(self.mode),
            request_id: pick(&self.request_id, &over.request_id),
            debug: over.debug.or(self.debug),
        }
    }

    /// Read overrides from a URL query string (with or without leading `?`).
    ///
    /// Empty parameters count as absent so they never clobber a lower layer.
    pub fn from_query(query: &str) -> Config {
        let mut cfg = Config::default();
        let mut theme = Theme::default();

        let query = query.trim_start_matches('?');
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let owned = Some(value.to_string());
            match key.as_ref() {
                "brandName" => cfg.brand_name = owned,
                "apiUrl" => cfg.api_url = owned,
                "apiKey" => cfg.api_key = owned,
                "clientId" => cfg.client_id = owned,
                "requestId" => cfg.request_id = owned,
                "mode" => match value.parse::<Mode>() {
                    Ok(mode) => cfg.mode = Some(mode),
                    Err(e) => log::warn!("ignoring query parameter: {}", e),
                },
                "debug" => cfg.debug = Some(matches!(value, "1" | "true" | "yes" | "on")),
                "accent" => theme.accent = owned,
                "bg" => theme.bg = owned,
                "card" => theme.card = owned,
                "text" => theme.text = owned,
                "muted" => theme.muted = owned,
                _ => {}
            }
        }

        if !theme.is_empty() {
            cfg.theme = Some(theme);
        }
        cfg
    }

    /// Brand to display, falling back to [`DEFAULT_BRAND`]
    pub fn brand(&self) -> &str {
        match self.brand_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DEFAULT_BRAND,
        }
    }
}

fn pick(base: &Option<String>, over: &Option<String>) -> Option<String> {
    over.clone().or_else(|| base.clone())
}

/// An unrecognised mode in a stored or shipped config only drops that key.
fn lenient_mode<'de, D>(deserializer: D) -> Result<Option<Mode>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match s.parse::<Mode>() {
        Ok(mode) => Some(mode),
        Err(e) => {
            log::warn!("ignoring config value: {}", e);
            None
        }
    }))
}

/// Merge the four layers in increasing precedence.
pub fn resolve(defaults: &Config, file: &Config, stored: &Config, url: &Config) -> Config {
    defaults.merged(file).merged(stored).merged(url)
}

/// Fetch the optional `config.json`. Any failure yields an empty config.
pub async fn fetch_file_config<T: Transport + ?Sized>(transport: &T) -> Config {
    let response = match transport.get(CONFIG_FILE).await {
        Ok(response) => response,
        Err(e) => {
            log::debug!("{} not loaded: {}", CONFIG_FILE, e);
            return Config::default();
        }
    };
    if !response.is_success() {
        log::debug!("{} not loaded: HTTP {}", CONFIG_FILE, response.status);
        return Config::default();
    }
    serde_json::from_str(&response.text).unwrap_or_else(|e| {
        log::warn!("{} is not valid JSON: {}", CONFIG_FILE, e);
        Config::default()
    })
}

/// Compute the effective configuration at page load and persist it.
pub async fn load_effective<S, T>(store: &ConfigStore<S>, transport: &T, query: &str) -> Config
where
    S: KeyValueStore,
    T: Transport + ?Sized,
{
    let file = fetch_file_config(transport).await;
    let stored = store.get();
    let url = Config::from_query(query);
    let effective = resolve(&Config::defaults(), &file, &stored, &url);
    if let Err(e) = store.set(&effective) {
        log::warn!("could not persist resolved config: {}", e);
    }
    effective
}
