//! Request history kept in localStorage, newest first

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{load_json, save_json, KeyValueStore, HISTORY_KEY};

/// Maximum number of entries retained
pub const MAX_HISTORY: usize = 20;

/// One dispatched request and its outcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// RFC 3339
    pub timestamp: String,
    pub elapsed_ms: u64,
    pub http_status: u16,
    /// Written as `null` when neither side supplied one
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(rename = "questionText")]
    pub question: String,
    pub url: String,
    pub request_headers: BTreeMap<String, String>,
    pub request_body: serde_json::Value,
    pub ok: bool,
}

impl HistoryEntry {
    /// One-line summary shown in the history list
    pub fn summary(&self) -> String {
        let mut parts = vec![
            self.timestamp.clone(),
            format!("{}ms", self.elapsed_ms),
            self.http_status.to_string(),
        ];
        if let Some(id) = self.request_id.as_deref().filter(|id| !id.is_empty()) {
            parts.push(format!("[{}]", id));
        }
        parts.push(self.question.clone());
        parts.join(" · ")
    }

    /// Equivalent `curl` invocation with every argument single-quoted
    pub fn to_curl(&self) -> String {
        let mut args = vec![
            "curl".to_string(),
            "-X".to_string(),
            "POST".to_string(),
            shell_quote(&self.url),
        ];
        for (name, value) in &self.request_headers {
            args.push("-H".to_string());
            args.push(shell_quote(&format!("{}: {}", name, value)));
        }
        args.push("-d".to_string());
        args.push(shell_quote(&self.request_body.to_string()));
        args.join(" ")
    }
}

/// Quote for a POSIX shell: `it's` becomes `'it'\''s'`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Bounded history persisted under [`HISTORY_KEY`]
#[derive(Debug, Clone)]
pub struct HistoryLog<S> {
    store: S,
}

impl<S: KeyValueStore> HistoryLog<S> {
    pub fn new(store: S) -> Self {
        HistoryLog { store }
    }

    /// Stored entries, newest first
    pub fn entries(&self) -> Vec<HistoryEntry> {
        load_json(&self.store, HISTORY_KEY)
    }

    pub fn get(&self, index: usize) -> Option<HistoryEntry> {
        self.entries().into_iter().nth(index)
    }

    /// Prepend `entry`, dropping whatever falls beyond [`MAX_HISTORY`].
    pub fn add(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.entries();
        entries.insert(0, entry);
        entries.truncate(MAX_HISTORY);
        save_json(&self.store, HISTORY_KEY, &entries)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(HISTORY_KEY)
    }

    /// Pretty-printed history, as offered for download
    pub fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            timestamp: format!("2024-01-01T00:00:{:02}Z", n),
            elapsed_ms: n as u64,
            http_status: 200,
            request_id: None,
            question: format!("q{}", n),
            url: "https://api.example.com/v1/chat".to_string(),
            request_headers: BTreeMap::new(),
            request_body: json!({ "question": format!("q{}", n) }),
            ok: true,
        }
    }

    #[test]
    fn test_history_is_capped_newest_first() {
        let log = HistoryLog::new(MemoryStore::default());
        for n in 0..25 {
            log.add(entry(n)).unwrap();
        }

        let entries = log.entries();
        assert_eq!(entries.len(), MAX_HISTORY);
        let questions: Vec<_> = entries.iter().map(|e| e.question.as_str()).collect();
        let expected: Vec<_> = (5..25).rev().map(|n| format!("q{}", n)).collect();
        assert_eq!(questions, expected);
    }

    #[test]
    fn test_clear_and_export() {
        let log = HistoryLog::new(MemoryStore::default());
        log.add(entry(1)).unwrap();
        assert!(log.export().unwrap().contains("\"elapsedMs\": 1"));

        log.clear().unwrap();
        assert!(log.entries().is_empty());
        assert_eq!(log.export().unwrap(), "[]");
    }

    #[test]
    fn test_serialized_keys() {
        let value = serde_json::to_value(entry(0)).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            [
                "elapsedMs",
                "httpStatus",
                "ok",
                "questionText",
                "requestBody",
                "requestHeaders",
                "requestId",
                "timestamp",
                "url",
            ]
        );
        assert!(value["requestId"].is_null());
        assert_eq!(value["questionText"], "q0");
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("plain"), "'plain'");
    }

    #[test]
    fn test_curl_contains_headers_and_escaped_body() {
        let mut e = entry(0);
        e.request_headers.insert("Authorization".into(), "Bearer X".into());
        e.request_headers.insert("X-Request-ID".into(), "abc".into());
        e.request_body = json!({ "question": "it's" });

        let curl = e.to_curl();
        assert!(curl.starts_with("curl -X POST 'https://api.example.com/v1/chat'"));
        assert!(curl.contains("-H 'Authorization: Bearer X'"));
        assert!(curl.contains("-H 'X-Request-ID: abc'"));
        assert!(curl.ends_with(r#"-d '{"question":"it'\''s"}'"#));
    }

    #[test]
    fn test_summary_includes_request_id_when_present() {
        let mut e = entry(3);
        assert_eq!(e.summary(), "2024-01-01T00:00:03Z · 3ms · 200 · q3");
        e.request_id = Some("abc".into());
        assert_eq!(e.summary(), "2024-01-01T00:00:03Z · 3ms · 200 · [abc] · q3");
    }
}
