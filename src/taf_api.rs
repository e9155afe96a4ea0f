// HTTP client for the TAF list and detail endpoints

use crate::config::{QuerySettings, SourceSettings};
use crate::error::{BODY_SNIPPET_CHARS, ScrapeError, TransportError};
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use serde_json::Value;

/// Talks to one TAF site. Every request looks like the site's own XHR calls.
#[derive(Debug, Clone)]
pub struct TafClient {
    http: Client,
    list_url: String,
    detail_url: String,
}

impl TafClient {
    pub fn new(source: &SourceSettings) -> Result<Self, ScrapeError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(cookie) = source.session_cookie.as_deref().filter(|c| !c.is_empty()) {
            match HeaderValue::from_str(cookie) {
                Ok(value) => {
                    headers.insert(COOKIE, value);
                }
                Err(e) => tracing::warn!("Ignoring session cookie that is not a valid header value: {}", e),
            }
        }

        let mut builder = Client::builder()
            .user_agent(source.user_agent.as_str())
            .cookie_store(true)
            .default_headers(headers);
        if let Some(proxy_url) = source.proxy_url.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy(Proxy::all(proxy_url).map_err(ScrapeError::Client)?);
            tracing::info!("Routing requests through configured proxy.");
        }

        let base = source.base_url.trim_end_matches('/');
        Ok(Self {
            http: builder.build().map_err(ScrapeError::Client)?,
            list_url: format!("{}{}", base, source.list_path),
            detail_url: format!("{}{}", base, source.detail_path),
        })
    }

    pub fn list_url(&self) -> &str {
        &self.list_url
    }

    pub fn detail_url(&self) -> &str {
        &self.detail_url
    }

    /// Fetches one page (1-based) of the list endpoint.
    pub async fn fetch_list_page(&self, query: &QuerySettings, page_index: u32) -> Result<Value, TransportError> {
        let params = [
            ("accId", query.acc_id.clone()),
            ("code1", query.code1.clone()),
            ("code2", query.code2.clone()),
            ("custCname", query.cust_name.clone()),
            ("lang", query.lang.clone()),
            ("pageSize", query.page_size.to_string()),
            ("pageIndex", page_index.to_string()),
        ];
        tracing::debug!(page = page_index, url = %self.list_url, "Fetching list page");
        self.get_json(&self.list_url, &params).await
    }

    pub async fn fetch_detail(&self, uuid: &str, lang: &str) -> Result<Value, TransportError> {
        tracing::debug!(uuid, url = %self.detail_url, "Fetching detail");
        self.get_json(&self.detail_url, &[("uuid", uuid.to_string()), ("lang", lang.to_string())])
            .await
    }

    async fn get_json(&self, url: &str, params: &[(&str, String)]) -> Result<Value, TransportError> {
        let network = |source| TransportError::Network { url: url.to_string(), source };

        let response = self.http.get(url).query(params).send().await.map_err(network)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = %status, url, response_body = %body, "HTTP error details");
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: body.chars().take(BODY_SNIPPET_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        serde_json::from_slice(&bytes).map_err(|source| TransportError::Decode { url: url.to_string(), source })
    }
}
