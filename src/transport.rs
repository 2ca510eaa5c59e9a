//! Session-scoped HTTP transport.
//!
//! Thin wrapper over `reqwest` carrying the authenticated session headers
//! (user agent + cookie header) as client defaults. Fragment-style
//! endpoints additionally send the AJAX marker header, and their bodies
//! may arrive wrapped in a JSON envelope exposing an `html` field.

use crate::error::{ClientError, Result};
use serde_json::Value;

/// Default forum origin when none is configured.
pub const DEFAULT_ORIGIN: &str = "https://forum.arizona-rp.com";

/// Response to a single page or fragment fetch.
#[derive(Debug, Clone)]
pub struct FragmentResponse {
    /// Requested URL, kept for diagnostics.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl FragmentResponse {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Map a non-success status (other than the 404 the caller already
    /// handled) to an operation failure carrying the URL and status.
    pub fn error_for_status(&self) -> Result<()> {
        if self.status >= 400 {
            return Err(ClientError::operation(
                Some(self.url.clone()),
                Some(self.status),
                anyhow::anyhow!("unexpected status {}", self.status),
            ));
        }
        Ok(())
    }

    /// The HTML document in the body.
    ///
    /// Fragment endpoints sometimes wrap markup in a JSON envelope with an
    /// `html` field; anything else is treated as raw HTML.
    pub fn html(&self) -> String {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&self.body) {
            if let Some(Value::String(html)) = map.get("html") {
                return html.clone();
            }
        }
        self.body.clone()
    }
}

/// Authenticated transport context for one session.
///
/// Built once per successful `connect()`; the user agent and cookie header
/// it carries never change for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base: url::Url,
}

impl Transport {
    /// Build a transport with the given default headers.
    pub fn new(origin: &str, user_agent: &str, cookie_header: &str) -> Result<Self> {
        let base = url::Url::parse(origin)
            .map_err(|e| ClientError::operation(Some(origin.to_string()), None, e))?;

        let mut headers = reqwest::header::HeaderMap::new();
        let cookie = reqwest::header::HeaderValue::from_str(cookie_header)
            .map_err(|e| ClientError::operation(None, None, e))?;
        headers.insert(reqwest::header::COOKIE, cookie);

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::operation(None, None, e))?;

        Ok(Transport { client, base })
    }

    /// GET a full page (no AJAX marker).
    pub async fn get_page(&self, path: &str) -> Result<FragmentResponse> {
        self.get(path, false).await
    }

    /// GET a fragment endpoint, sending the AJAX marker header.
    pub async fn get_fragment(&self, path: &str) -> Result<FragmentResponse> {
        self.get(path, true).await
    }

    async fn get(&self, path: &str, ajax: bool) -> Result<FragmentResponse> {
        let url = self
            .base
            .join(path)
            .map_err(|e| ClientError::operation(Some(path.to_string()), None, e))?
            .to_string();
        tracing::debug!(%url, ajax, "GET");

        let mut builder = self.client.get(&url);
        if ajax {
            builder = builder.header("X-Requested-With", "XMLHttpRequest");
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ClientError::operation(Some(url.clone()), e.status().map(|s| s.as_u16()), e))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ClientError::operation(Some(url.clone()), Some(status), e))?;

        Ok(FragmentResponse { url, status, body })
    }
}
