//! reqwest-backed transport.
//!
//! One pooled async client is built up front; the blocking client is built
//! on first synchronous use so async-only callers never spin up its
//! background runtime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Method, Url};

use crate::digest;
use crate::transport::{AsyncTransport, HttpRequest, HttpResponse, Transport, TransportError};

/// Configuration for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Verify server TLS certificates.
    pub ssl_verify: bool,
    /// Allow `http://` URLs.
    pub allow_plaintext: bool,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            ssl_verify: true,
            allow_plaintext: true,
            user_agent: format!("apidrive/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_ssl_verify(mut self, verify: bool) -> Self {
        self.ssl_verify = verify;
        self
    }

    pub fn with_allow_plaintext(mut self, allow: bool) -> Self {
        self.allow_plaintext = allow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP transport over reqwest, with digest challenge handling.
pub struct ReqwestTransport {
    client: Client,
    blocking: RwLock<Option<reqwest::blocking::Client>>,
    config: TransportConfig,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.ssl_verify)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(TransportError::BuildError)?;

        Ok(Self {
            client,
            blocking: RwLock::new(None),
            config,
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn blocking_client(&self) -> Result<reqwest::blocking::Client, TransportError> {
        if let Some(client) = self.blocking.read().as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.blocking.write();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.timeout)
            .danger_accept_invalid_certs(!self.config.ssl_verify)
            .user_agent(self.config.user_agent.clone())
            .build()
            .map_err(TransportError::BuildError)?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Parse the URL, append the query and apply the plaintext policy.
    fn target(&self, request: &HttpRequest) -> Result<(Method, Url), TransportError> {
        let mut url = request
            .url
            .parse::<Url>()
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        if url.scheme() == "http" && !self.config.allow_plaintext {
            return Err(TransportError::PlaintextNotAllowed(request.url.clone()));
        }

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        let method = request
            .method
            .parse::<Method>()
            .map_err(|e| TransportError::InvalidMethod(e.to_string()))?;

        Ok((method, url))
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        request: &HttpRequest,
        authorization: Option<&str>,
    ) -> Result<(u16, HeaderMap, Vec<u8>), TransportError> {
        let mut builder = self.client.request(method.clone(), url.clone());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(TransportError::ResponseReadError)?;
        Ok((status, headers, body.to_vec()))
    }

    fn send_once_blocking(
        &self,
        client: &reqwest::blocking::Client,
        method: &Method,
        url: &Url,
        request: &HttpRequest,
        authorization: Option<&str>,
    ) -> Result<(u16, HeaderMap, Vec<u8>), TransportError> {
        let mut builder = client.request(method.clone(), url.clone());
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(authorization) = authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(map_send_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(TransportError::ResponseReadError)?;
        Ok((status, headers, body.to_vec()))
    }
}

#[async_trait]
impl AsyncTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let (method, url) = self.target(request)?;
        let (status, headers, body) = self.send_once(&method, &url, request, None).await?;

        if let (401, Some(credentials)) = (status, &request.digest) {
            let authorization = digest_authorization(&headers, credentials, &method, &url)?;
            let (status, headers, body) = self
                .send_once(&method, &url, request, Some(&authorization))
                .await?;
            return Ok(into_response(status, &headers, body));
        }
        Ok(into_response(status, &headers, body))
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.blocking_client()?;
        let (method, url) = self.target(request)?;
        let (status, headers, body) =
            self.send_once_blocking(&client, &method, &url, request, None)?;

        if let (401, Some(credentials)) = (status, &request.digest) {
            let authorization = digest_authorization(&headers, credentials, &method, &url)?;
            let (status, headers, body) =
                self.send_once_blocking(&client, &method, &url, request, Some(&authorization))?;
            return Ok(into_response(status, &headers, body));
        }
        Ok(into_response(status, &headers, body))
    }
}

fn digest_authorization(
    headers: &HeaderMap,
    credentials: &crate::transport::DigestCredentials,
    method: &Method,
    url: &Url,
) -> Result<String, TransportError> {
    let challenge = digest::select_challenge(
        headers
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|v| v.to_str().ok()),
    )?;
    let uri = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    Ok(challenge.authorize(
        credentials,
        method.as_str(),
        &uri,
        &digest::client_nonce(),
    ))
}

fn into_response(status: u16, headers: &HeaderMap, body: Vec<u8>) -> HttpResponse {
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_lowercase(), v.to_string()))
        })
        .collect();
    HttpResponse {
        status,
        headers,
        body,
    }
}

fn map_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionFailed(e.to_string())
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}
