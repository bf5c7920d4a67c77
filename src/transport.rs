//! HTTP transport
//!
//! One request in, status + body text out. The browser build goes through
//! `window.fetch`; native callers can enable the `native` feature for a
//! reqwest-backed transport.

use async_trait::async_trait;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCache, RequestInit, RequestMode, Response};

use crate::error::{DashboardError, Result};

/// Header carrying the request id, sent and echoed by the chat API
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// An outgoing POST
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    /// Header name/value pairs in the order they are sent
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Whatever came back, 2xx or not
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Value of the `X-Request-ID` response header, if the server echoed one
    pub request_id: Option<String>,
    pub text: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests. An `Err` means no HTTP response was received at all.
#[async_trait(?Send)]
pub trait Transport {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// `window.fetch`
#[derive(Debug, Clone)]
pub struct FetchTransport {
    window: web_sys::Window,
}

impl FetchTransport {
    pub fn new(window: web_sys::Window) -> Self {
        FetchTransport { window }
    }

    async fn send(&self, request: &Request) -> Result<HttpResponse> {
        let response = JsFuture::from(self.window.fetch_with_request(request))
            .await
            .map_err(DashboardError::network)?;
        let response: Response = response.dyn_into().map_err(DashboardError::network)?;

        let request_id = response.headers().get(REQUEST_ID_HEADER).ok().flatten();
        let text = JsFuture::from(response.text().map_err(DashboardError::network)?)
            .await
            .map_err(DashboardError::network)?;

        Ok(HttpResponse {
            status: response.status(),
            request_id,
            text: text.as_string().unwrap_or_default(),
        })
    }
}

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let request_init = RequestInit::new();
        request_init.set_method("GET");
        request_init.set_cache(RequestCache::NoStore);

        let request = Request::new_with_str_and_init(url, &request_init)
            .map_err(DashboardError::network)?;
        self.send(&request).await
    }

    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let headers = Headers::new().map_err(DashboardError::dom)?;
        for (name, value) in &request.headers {
            headers.set(name, value).map_err(DashboardError::network)?;
        }

        let request_init = RequestInit::new();
        request_init.set_method("POST");
        request_init.set_headers(headers.as_ref());
        request_init.set_body(&JsValue::from_str(&request.body));
        request_init.set_mode(RequestMode::Cors);

        let fetch_request = Request::new_with_str_and_init(&request.url, &request_init)
            .map_err(DashboardError::network)?;
        self.send(&fetch_request).await
    }
}

/// reqwest-backed transport for native consumers of the typed client
#[cfg(feature = "native")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "native")]
impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response
            .text()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;
        Ok(HttpResponse { status, request_id, text })
    }
}

#[cfg(feature = "native")]
#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;
        Self::read(response).await
    }

    async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;
        Self::read(response).await
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::cell::RefCell;

    /// Scripted transport that records every POST it receives
    #[derive(Debug, Default)]
    pub struct MockTransport {
        get_response: Option<HttpResponse>,
        post_response: Option<HttpResponse>,
        pub posts: RefCell<Vec<HttpRequest>>,
    }

    impl MockTransport {
        /// Every request fails as if the network were down.
        pub fn offline() -> Self {
            MockTransport::default()
        }

        pub fn with_get(status: u16, text: &str) -> Self {
            MockTransport {
                get_response: Some(HttpResponse {
                    status,
                    request_id: None,
                    text: text.to_string(),
                }),
                ..Default::default()
            }
        }

        pub fn with_post(status: u16, text: &str, request_id: Option<&str>) -> Self {
            MockTransport {
                post_response: Some(HttpResponse {
                    status,
                    request_id: request_id.map(str::to_string),
                    text: text.to_string(),
                }),
                ..Default::default()
            }
        }

        pub fn post_count(&self) -> usize {
            self.posts.borrow().len()
        }
    }

    #[async_trait(?Send)]
    impl Transport for MockTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            self.get_response
                .clone()
                .ok_or_else(|| DashboardError::Network("Failed to fetch".to_string()))
        }

        async fn post(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.posts.borrow_mut().push(request.clone());
            self.post_response
                .clone()
                .ok_or_else(|| DashboardError::Network("Failed to fetch".to_string()))
        }
    }
}
