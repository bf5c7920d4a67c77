//! Form binding: configuration <-> form controls and theme

use crate::config::{Config, Mode};

/// Snapshot of the dashboard form as the operator sees it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub api_url: String,
    pub api_key: String,
    pub client_id: String,
    /// Raw value of the mode select
    pub mode: String,
    pub request_id: String,
    pub question: String,
    pub refresh: bool,
    pub debug: bool,
}

/// What [`apply_config`] wants written to the page.
///
/// `None` means "leave the control as it is".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundView {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub client_id: Option<String>,
    pub mode: Option<Mode>,
    pub request_id: Option<String>,
    pub debug: Option<bool>,
    /// `(--name, value)` CSS custom properties
    pub css_vars: Vec<(String, String)>,
    pub brand: String,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Project `cfg` onto the form. Blank values never clobber what is already shown.
pub fn apply_config(cfg: &Config) -> BoundView {
    let css_vars: Vec<(String, String)> = cfg
        .theme
        .as_ref()
        .map(|theme| {
            theme
                .entries()
                .iter()
                .filter_map(|(name, value)| match value {
                    Some(v) if !v.is_empty() => Some((format!("--{}", name), v.to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    BoundView {
        api_url: non_blank(&cfg.api_url),
        api_key: non_blank(&cfg.api_key),
        client_id: non_blank(&cfg.client_id),
        mode: cfg.mode,
        request_id: non_blank(&cfg.request_id),
        debug: cfg.debug.filter(|d| *d),
        css_vars,
        brand: cfg.brand().to_string(),
    }
}

/// Exactly what the form shows, trimmed. No merging happens here.
pub fn capture_config(form: &FormState) -> Config {
    let mode = form.mode.parse::<Mode>().ok();
    if mode.is_none() {
        log::warn!("mode select holds unexpected value '{}'", form.mode);
    }
    Config {
        api_url: Some(form.api_url.trim().to_string()),
        api_key: Some(form.api_key.trim().to_string()),
        client_id: Some(form.client_id.trim().to_string()),
        mode,
        request_id: Some(form.request_id.trim().to_string()),
        debug: Some(form.debug),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Theme, DEFAULT_BRAND};

    #[test]
    fn test_blank_values_leave_controls_alone() {
        let cfg = Config {
            api_url: Some(String::new()),
            api_key: Some("k".into()),
            debug: Some(false),
            ..Default::default()
        };
        let view = apply_config(&cfg);
        assert_eq!(view.api_url, None);
        assert_eq!(view.api_key.as_deref(), Some("k"));
        assert_eq!(view.client_id, None);
        assert_eq!(view.debug, None);
        assert_eq!(view.brand, DEFAULT_BRAND);
    }

    #[test]
    fn test_theme_becomes_css_vars() {
        let cfg = Config {
            brand_name: Some("Acme".into()),
            theme: Some(Theme {
                accent: Some("#ff0000".into()),
                bg: Some(String::new()),
                muted: Some("#999".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let view = apply_config(&cfg);
        assert_eq!(view.brand, "Acme");
        assert_eq!(
            view.css_vars,
            vec![
                ("--accent".to_string(), "#ff0000".to_string()),
                ("--muted".to_string(), "#999".to_string()),
            ]
        );
    }

    #[test]
    fn test_capture_trims_and_reflects_form() {
        let form = FormState {
            api_url: "  https://api.example.com/ ".into(),
            api_key: "".into(),
            client_id: " c1".into(),
            mode: "alt".into(),
            debug: true,
            ..Default::default()
        };
        let cfg = capture_config(&form);
        assert_eq!(cfg.api_url.as_deref(), Some("https://api.example.com/"));
        assert_eq!(cfg.api_key.as_deref(), Some(""));
        assert_eq!(cfg.client_id.as_deref(), Some("c1"));
        assert_eq!(cfg.mode, Some(Mode::Alt));
        assert_eq!(cfg.debug, Some(true));
        assert_eq!(cfg.brand_name, None);
        assert_eq!(cfg.theme, None);
    }
}
