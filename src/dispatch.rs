//! Request dispatcher: validate the form, send one chat request, render the result

use chrono::Utc;
use serde_json::{json, Value};

use crate::binder::FormState;
use crate::client::{chat_url, ChatBody};
use crate::config::Mode;
use crate::error::{DashboardError, Result};
use crate::history::{HistoryEntry, HistoryLog};
use crate::storage::KeyValueStore;
use crate::transport::{HttpRequest, HttpResponse, Transport, REQUEST_ID_HEADER};

/// Validated input for one chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatInput {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_id: Option<String>,
    pub body: ChatBody,
    pub debug: bool,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Check the required fields. The error text is what the operator sees.
pub fn validate(form: &FormState) -> Result<ChatInput> {
    let base_url = form.api_url.trim();
    let client_id = form.client_id.trim();
    let question = form.question.trim();

    if base_url.is_empty() {
        return Err(DashboardError::Validation("Veuillez renseigner l'API Base URL.".to_string()));
    }
    if client_id.is_empty() {
        return Err(DashboardError::Validation("Veuillez renseigner le Client ID.".to_string()));
    }
    if question.is_empty() {
        return Err(DashboardError::Validation("Veuillez saisir une question.".to_string()));
    }

    let mode = form.mode.parse::<Mode>().unwrap_or_else(|e| {
        log::warn!("{}, falling back to {}", e, Mode::default());
        Mode::default()
    });

    Ok(ChatInput {
        base_url: base_url.to_string(),
        api_key: optional(&form.api_key),
        request_id: optional(&form.request_id),
        body: ChatBody {
            question: question.to_string(),
            client_id: client_id.to_string(),
            mode,
            refresh: form.refresh,
        },
        debug: form.debug,
    })
}

/// Build the POST for `input`: JSON content type, bearer token and request id when set.
pub fn build_request(input: &ChatInput) -> Result<HttpRequest> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    if let Some(key) = &input.api_key {
        headers.push(("Authorization".to_string(), format!("Bearer {}", key)));
    }
    if let Some(id) = &input.request_id {
        headers.push((REQUEST_ID_HEADER.to_string(), id.clone()));
    }
    Ok(HttpRequest {
        url: chat_url(&input.base_url),
        headers,
        body: serde_json::to_string(&input.body)?,
    })
}

/// Parse a response body, wrapping non-JSON text as `{"raw": text}`.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

/// A received HTTP response with its timing
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub response: HttpResponse,
    pub elapsed_ms: u64,
    pub parsed: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Response(ResponseRecord),
    /// The request never completed
    NetworkError(String),
}

/// Send `request` once and time it. Never fails: transport errors become [`Outcome::NetworkError`].
pub async fn execute<T: Transport + ?Sized>(transport: &T, request: &HttpRequest) -> Outcome {
    let started = Utc::now();
    let result = transport.post(request).await;
    let elapsed_ms = (Utc::now() - started).num_milliseconds().max(0) as u64;

    match result {
        Ok(response) => {
            let parsed = parse_body(&response.text);
            Outcome::Response(ResponseRecord { response, elapsed_ms, parsed })
        }
        Err(DashboardError::Network(reason)) => Outcome::NetworkError(reason),
        Err(other) => Outcome::NetworkError(other.to_string()),
    }
}

/// What the result panel shows
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub meta: String,
    pub body: String,
    pub is_error: bool,
}

/// Turn an outcome into the result panel contents.
///
/// On 2xx the `response` field is shown, or the raw text when there is none;
/// with `debug` set, or on any other status, the whole JSON is pretty-printed.
pub fn render(outcome: &Outcome, debug: bool) -> ResultView {
    match outcome {
        Outcome::NetworkError(reason) => ResultView {
            meta: String::new(),
            body: format!("Erreur réseau: {}", reason),
            is_error: true,
        },
        Outcome::Response(record) => {
            let response = &record.response;
            let meta = format!(
                "Status: {} · {}ms · {}: {}",
                response.status,
                record.elapsed_ms,
                REQUEST_ID_HEADER,
                response.request_id.as_deref().unwrap_or("n/a")
            );

            let body = if response.is_success() && !debug {
                match record.parsed.get("response") {
                    Some(Value::String(text)) if !text.is_empty() => text.clone(),
                    // Falsy answers (null, false, 0, "") fall back to the raw body
                    None
                    | Some(Value::Null)
                    | Some(Value::Bool(false))
                    | Some(Value::String(_)) => response.text.clone(),
                    Some(Value::Number(n)) if n.as_f64() == Some(0.0) => response.text.clone(),
                    Some(other) => other.to_string(),
                }
            } else {
                serde_json::to_string_pretty(&record.parsed)
                    .unwrap_or_else(|_| response.text.clone())
            };

            ResultView { meta, body, is_error: !response.is_success() }
        }
    }
}

fn history_entry(
    input: &ChatInput,
    request: &HttpRequest,
    record: &ResponseRecord,
) -> HistoryEntry {
    HistoryEntry {
        timestamp: Utc::now().to_rfc3339(),
        elapsed_ms: record.elapsed_ms,
        http_status: record.response.status,
        request_id: record.response.request_id.clone().or_else(|| input.request_id.clone()),
        question: input.body.question.clone(),
        url: request.url.clone(),
        request_headers: request.headers.iter().cloned().collect(),
        // Parsed from the bytes that were sent so the curl line reproduces them
        request_body: serde_json::from_str(&request.body)
            .unwrap_or_else(|_| Value::String(request.body.clone())),
        ok: record.response.is_success(),
    }
}

/// The send command: validate, dispatch, record and render.
///
/// Only validation failures are returned as `Err`; nothing is sent in that
/// case. A network failure renders an error view and is not recorded.
/// Overlapping calls are not serialized: the last one to finish owns the view.
pub async fn send_chat<T, S>(
    form: &FormState,
    transport: &T,
    history: &HistoryLog<S>,
) -> Result<ResultView>
where
    T: Transport + ?Sized,
    S: KeyValueStore,
{
    let input = validate(form)?;
    let request = build_request(&input)?;
    log::debug!("POST {}", request.url);

    let outcome = execute(transport, &request).await;
    match &outcome {
        Outcome::Response(record) => {
            log::info!(
                "{} answered {} in {}ms",
                request.url,
                record.response.status,
                record.elapsed_ms
            );
            if let Err(e) = history.add(history_entry(&input, &request, record)) {
                log::warn!("could not record history: {}", e);
            }
        }
        Outcome::NetworkError(reason) => log::warn!("{} unreachable: {}", request.url, reason),
    }

    Ok(render(&outcome, input.debug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::transport::mock::MockTransport;
    use futures::executor::block_on;

    fn form() -> FormState {
        FormState {
            api_url: "https://api.example.com/".into(),
            client_id: "c1".into(),
            mode: "main".into(),
            question: "ping".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_end_to_end_request_shape() {
        let transport = MockTransport::with_post(200, r#"{"response":"pong"}"#, Some("srv-1"));
        let history = HistoryLog::new(MemoryStore::default());

        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();

        let posts = transport.posts.borrow();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].url, "https://api.example.com/v1/chat");
        assert_eq!(
            posts[0].body,
            r#"{"question":"ping","client_id":"c1","mode":"main","refresh":false}"#
        );
        assert_eq!(
            posts[0].headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );

        assert_eq!(view.body, "pong");
        assert!(view.meta.starts_with("Status: 200 · "));
        assert!(view.meta.ends_with("X-Request-ID: srv-1"));

        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].question, "ping");
        assert_eq!(entries[0].request_id.as_deref(), Some("srv-1"));
        assert!(entries[0].ok);
    }

    #[test]
    fn test_validation_short_circuits() {
        let cases = [
            FormState { api_url: "  ".into(), ..form() },
            FormState { client_id: String::new(), ..form() },
            FormState { question: " \n".into(), ..form() },
        ];
        for case in cases {
            let transport = MockTransport::with_post(200, "{}", None);
            let history = HistoryLog::new(MemoryStore::default());

            let err = block_on(send_chat(&case, &transport, &history)).unwrap_err();
            assert!(matches!(err, DashboardError::Validation(_)));
            assert_eq!(transport.post_count(), 0);
            assert!(history.entries().is_empty());
        }
    }

    #[test]
    fn test_optional_headers() {
        let input = validate(&FormState {
            api_key: "X".into(),
            request_id: "abc".into(),
            refresh: true,
            ..form()
        })
        .unwrap();
        let request = build_request(&input).unwrap();
        assert_eq!(
            request.headers,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), "Bearer X".to_string()),
                ("X-Request-ID".to_string(), "abc".to_string()),
            ]
        );
        assert!(request.body.ends_with(r#""refresh":true}"#));
    }

    #[test]
    fn test_missing_response_field_shows_raw_text() {
        let transport = MockTransport::with_post(200, r#"{"answer": 42}"#, None);
        let history = HistoryLog::new(MemoryStore::default());
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();
        assert_eq!(view.body, r#"{"answer": 42}"#);
        assert!(view.meta.ends_with("X-Request-ID: n/a"));
    }

    #[test]
    fn test_non_json_body_is_wrapped() {
        assert_eq!(parse_body("oops"), json!({ "raw": "oops" }));
        let transport = MockTransport::with_post(200, "plain text", None);
        let history = HistoryLog::new(MemoryStore::default());
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();
        assert_eq!(view.body, "plain text");
    }

    #[test]
    fn test_debug_forces_full_json() {
        let transport = MockTransport::with_post(200, r#"{"response":"pong"}"#, None);
        let history = HistoryLog::new(MemoryStore::default());
        let debug_form = FormState { debug: true, ..form() };
        let view = block_on(send_chat(&debug_form, &transport, &history)).unwrap();
        assert_eq!(view.body, "{\n  \"response\": \"pong\"\n}");
    }

    #[test]
    fn test_non_string_response_is_stringified() {
        let history = HistoryLog::new(MemoryStore::default());
        let transport = MockTransport::with_post(200, r#"{"response":42}"#, None);
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();
        assert_eq!(view.body, "42");

        let transport = MockTransport::with_post(200, r#"{"response":{"text":"hi"}}"#, None);
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();
        assert_eq!(view.body, r#"{"text":"hi"}"#);

        let transport = MockTransport::with_post(200, r#"{"response":false}"#, None);
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();
        assert_eq!(view.body, r#"{"response":false}"#);
    }

    #[test]
    fn test_recorded_curl_keeps_sent_body() {
        let transport = MockTransport::with_post(200, r#"{"response":"pong"}"#, None);
        let history = HistoryLog::new(MemoryStore::default());
        block_on(send_chat(&form(), &transport, &history)).unwrap();

        let entries = history.entries();
        assert_eq!(entries[0].request_body.to_string(), transport.posts.borrow()[0].body);
        let body = r#"{"question":"ping","client_id":"c1","mode":"main","refresh":false}"#;
        assert!(entries[0].to_curl().ends_with(&format!("-d '{}'", body)));
    }

    #[test]
    fn test_error_status_is_rendered_and_recorded() {
        let transport = MockTransport::with_post(401, r#"{"detail":"unauthorized"}"#, None);
        let history = HistoryLog::new(MemoryStore::default());
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();

        assert!(view.is_error);
        assert_eq!(view.body, "{\n  \"detail\": \"unauthorized\"\n}");
        let entries = history.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].http_status, 401);
        assert!(!entries[0].ok);
    }

    #[test]
    fn test_network_error_is_not_recorded() {
        let transport = MockTransport::offline();
        let history = HistoryLog::new(MemoryStore::default());
        let view = block_on(send_chat(&form(), &transport, &history)).unwrap();

        assert!(view.is_error);
        assert_eq!(view.body, "Erreur réseau: Failed to fetch");
        assert_eq!(transport.post_count(), 1);
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_unknown_mode_falls_back_to_main() {
        let input = validate(&FormState { mode: "weird".into(), ..form() }).unwrap();
        assert_eq!(input.body.mode, Mode::Main);
    }
}
