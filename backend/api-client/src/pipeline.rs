//! Request pipeline: attaches the bearer token, sends, classifies the response.
//!
//! The pipeline sends each call exactly once and does no retrying. Refresh
//! and retry decisions belong to [`crate::client`] and [`crate::refresh`].

use crate::credentials::CredentialStore;
use crate::envelope::Envelope;
use crate::error::{ApiError, ClientBuildError};
use crate::normalizer::{self, Failure, classify_response, normalize};

use common::{HttpStatusCode, RedactedToken};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Method};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Never treat a 401 from this call as an expired session.
    ///
    /// Set on login and registration, where 401 means wrong credentials.
    pub skip_auth_refresh: bool,

    /// Query string pairs, appended in order.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn skip_auth_refresh() -> Self {
        Self {
            skip_auth_refresh: true,
            ..Self::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

/// One logical call. Cheap to clone so it can be re-issued after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<Value>,
    options: RequestOptions,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }
}

/// A call that came back with a success envelope.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub envelope: Envelope<Value>,
    pub status: HttpStatusCode,
}

/// A failed call, together with the access token it was sent with.
#[derive(Debug, Clone)]
pub struct FailedDispatch {
    pub error: ApiError,
    pub sent_with: Option<RedactedToken>,
}

pub struct RequestPipeline {
    http: Client,
    base_url: Url,
    store: Arc<dyn CredentialStore>,
}

impl RequestPipeline {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientBuildError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url,
            store,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Resolve `path` against the base URL. A leading `/` is ignored.
    pub fn endpoint_url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| normalizer::invalid_request(format!("Invalid path '{path}': {e}")))?;

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }

    /// Send with the stored access token attached, if there is one.
    pub async fn dispatch(&self, request: &ApiRequest) -> Result<Dispatched, FailedDispatch> {
        let access = self.store.get_access().map_err(|e| FailedDispatch {
            error: normalizer::credential_store(&e),
            sent_with: None,
        })?;

        if access.is_none() {
            debug!("No access token stored, sending {} unauthenticated", request.path());
        }

        self.send(request, access.as_ref())
            .await
            .map_err(|error| FailedDispatch {
                error,
                sent_with: access,
            })
    }

    /// Send without any `Authorization` header.
    pub async fn dispatch_anonymous(&self, request: &ApiRequest) -> Result<Dispatched, ApiError> {
        self.send(request, None).await
    }

    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&RedactedToken>,
    ) -> Result<Dispatched, ApiError> {
        let request_id = Uuid::new_v4();
        let url = self.endpoint_url(request.path(), &request.options().query)?;

        debug!("[{request_id}] {} {}", request.method(), url.path());

        let mut builder = self.http.request(request.method().clone(), url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("[{request_id}] No response for {}: {}", request.path(), e);
                return Err(normalize(Failure::Transport {
                    message: e.to_string(),
                }));
            }
        };

        let status = HttpStatusCode(response.status().as_u16());

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("[{request_id}] Response body for {} lost: {}", request.path(), e);
                return Err(normalize(Failure::Transport {
                    message: e.to_string(),
                }));
            }
        };

        match classify_response(status, &body) {
            Ok(envelope) => {
                debug!("[{request_id}] HTTP {status}");
                Ok(Dispatched { envelope, status })
            }
            Err(failure) => {
                let error = normalize(failure);
                debug!(
                    "[{request_id}] HTTP {status} -> {} ({})",
                    error.title(),
                    error.code().unwrap_or("no code")
                );
                Err(error)
            }
        }
    }
}

/// Whether two request paths name the same endpoint, ignoring edge slashes.
pub fn same_endpoint(a: &str, b: &str) -> bool {
    a.trim_matches('/') == b.trim_matches('/')
}
