//! Error types for the dashboard

use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Everything that can go wrong between a click and the rendered result.
///
/// Each variant has its own recovery path: validation errors become a toast,
/// network errors are rendered in the result area, import errors leave the
/// stored configuration untouched.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A required form field is missing. Carries the message shown to the operator.
    #[error("{0}")]
    Validation(String),

    /// The request never completed (DNS, refused connection, CORS...).
    #[error("network error: {0}")]
    Network(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// An imported configuration file could not be parsed.
    #[error("invalid config file: {0}")]
    InvalidImport(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required page element or browser API is missing.
    #[error("DOM error: {0}")]
    Dom(String),
}

impl DashboardError {
    /// Wrap a JS exception raised by a browser API.
    pub fn dom(err: JsValue) -> Self {
        DashboardError::Dom(js_error_message(&err))
    }

    pub fn storage(err: JsValue) -> Self {
        DashboardError::Storage(js_error_message(&err))
    }

    pub fn network(err: JsValue) -> Self {
        DashboardError::Network(js_error_message(&err))
    }
}

impl From<DashboardError> for JsValue {
    fn from(err: DashboardError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Best-effort human readable text for a thrown JS value.
pub fn js_error_message(err: &JsValue) -> String {
    if let Some(e) = err.dyn_ref::<js_sys::Error>() {
        return String::from(e.message());
    }
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = DashboardError::Validation("Veuillez saisir une question.".to_string());
        assert_eq!(err.to_string(), "Veuillez saisir une question.");
    }

    #[test]
    fn test_serde_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: DashboardError = parse.unwrap_err().into();
        assert!(matches!(err, DashboardError::Serialization(_)));
    }
}
