// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed HTTP client for the subscription backend.
//!
//! Handles:
//! - JSON request bodies and bearer authentication
//! - Classification of transport, status, and decoding failures
//!
//! There are no retries; callers wrap calls with their own policy if needed.

use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Transport-level failure of a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Failed to encode request")]
    EncodingFailed,

    #[error("HTTP Error: {0}")]
    HttpError(u16),

    #[error("Failed to decode response")]
    DecodingFailed,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,
}

impl ApiError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }
}

/// A single request to the backend, built up before sending.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    endpoint: String,
    method: Method,
    body: Option<serde_json::Value>,
    headers: Vec<(String, String)>,
    token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            headers: Vec::new(),
            token: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(Method::PUT, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    /// Attach a JSON body. Dates inside `body` encode as ISO-8601 strings.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body).map_err(|_| ApiError::EncodingFailed)?);
        Ok(self)
    }

    /// Add an extra header. Later values replace earlier ones.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Backend API client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` with connect and total timeouts.
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        total_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.api_base_url.clone(),
            config.request_timeout,
            config.resource_timeout,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON response into `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, "Response body did not match expected shape");
            ApiError::DecodingFailed
        })
    }

    /// Send a request whose response body is ignored.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await?;
        Ok(())
    }

    /// Build, send, and status-check a request.
    async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.build_url(&request.endpoint)?;
        let headers = Self::build_headers(&request)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(headers);
        if let Some(body) = &request.body {
            let encoded = serde_json::to_vec(body).map_err(|_| ApiError::EncodingFailed)?;
            builder = builder.body(encoded);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(
                method = %request.method,
                endpoint = %request.endpoint,
                error = %e,
                "Request failed"
            );
            ApiError::from_reqwest(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                method = %request.method,
                endpoint = %request.endpoint,
                status = status.as_u16(),
                "Backend returned error status"
            );
            return Err(ApiError::HttpError(status.as_u16()));
        }

        tracing::debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            status = status.as_u16(),
            "Request succeeded"
        );
        Ok(response)
    }

    fn build_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        if !endpoint.starts_with('/') {
            return Err(ApiError::InvalidUrl);
        }
        let url = Url::parse(&format!("{}{}", self.base_url, endpoint))
            .map_err(|_| ApiError::InvalidUrl)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl);
        }
        Ok(url)
    }

    fn build_headers(request: &ApiRequest) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &request.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidHeader(AUTHORIZATION.to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &request.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ApiError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

/// Path of a single subscription resource, with the ID percent-encoded.
pub fn subscription_path(id: &str) -> String {
    format!("/subscriptions/{}", urlencoding::encode(id))
}
