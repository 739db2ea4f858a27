use crate::config::ClientConfig;
use crate::credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, refresh_lifetime_from_days,
};
use crate::envelope::{ApiResponse, Paginated, TokenPayload};
use crate::error::{ApiError, ClientBuildError};
use crate::normalizer;
use crate::pipeline::{ApiRequest, Dispatched, RequestOptions, RequestPipeline};
use crate::refresh::session::SessionEvent;
use crate::refresh::{RefreshCoordinator, should_refresh};

use common::HttpStatusCode;

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;

/// Typed entry point for every backend call.
///
/// Cheap to clone; clones share the HTTP connection pool, the credential
/// store and the refresh coordinator.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<RequestPipeline>,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        refresh_path: &str,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientBuildError> {
        let pipeline = Arc::new(RequestPipeline::new(base_url, timeout, store)?);
        let coordinator = RefreshCoordinator::new(Arc::clone(&pipeline), refresh_path);

        Ok(Self {
            pipeline,
            coordinator,
        })
    }

    /// Build a client whose credentials persist in the configured file.
    ///
    /// Falls back to an in-memory store when no data directory can be found.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientBuildError> {
        config.validate()?;

        let refresh_lifetime = refresh_lifetime_from_days(config.refresh_lifetime_days);
        let store: Arc<dyn CredentialStore> = match config.credentials_path() {
            Some(path) => {
                info!("Credentials stored at {}", path.display());
                Arc::new(FileCredentialStore::new(path, refresh_lifetime))
            }
            None => {
                warn!("No data directory available, credentials will not persist");
                Arc::new(MemoryCredentialStore::with_refresh_lifetime(refresh_lifetime))
            }
        };

        Self::with_store(config, store)
    }

    pub fn with_store(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientBuildError> {
        Self::new(
            &config.base_url,
            config.timeout(),
            &config.refresh_path,
            store,
        )
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        self.pipeline.store()
    }

    /// Receive [`SessionEvent::Ended`] when a session cannot be recovered.
    pub fn subscribe_session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator.subscribe()
    }

    // ============================================
    // VERBS
    // ============================================

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with(path, RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path).with_options(options)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_with(path, body, RequestOptions::default()).await
    }

    pub async fn post_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path)
            .with_body(to_body(body)?)
            .with_options(options);
        self.send(request).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.put_with(path, body, RequestOptions::default()).await
    }

    pub async fn put_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::put(path)
            .with_body(to_body(body)?)
            .with_options(options);
        self.send(request).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.patch_with(path, body, RequestOptions::default()).await
    }

    pub async fn patch_with<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::patch(path)
            .with_body(to_body(body)?)
            .with_options(options);
        self.send(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.delete_with(path, RequestOptions::default()).await
    }

    pub async fn delete_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(ApiRequest::delete(path).with_options(options))
            .await
    }

    /// GET a list endpoint and unwrap its pagination block.
    ///
    /// Missing pagination metadata yields page 1 with zero totals; a missing
    /// `value` yields an empty item list.
    pub async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Paginated<T>, ApiError> {
        let request = ApiRequest::get(path).with_options(options);
        let dispatched = self.execute(&request).await?;

        let items = match dispatched.envelope.value {
            Some(value) => decode(dispatched.status, value)?,
            None => Vec::new(),
        };

        Ok(Paginated {
            items,
            pagination: dispatched.envelope.pagination.unwrap_or_default(),
        })
    }

    /// Send any request and unwrap the envelope's `value`.
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let dispatched = self.execute(&request).await?;
        decode(
            dispatched.status,
            dispatched.envelope.value.unwrap_or(Value::Null),
        )
    }

    /// Like [`send`](Self::send) but keeps the backend's human message.
    pub async fn send_enveloped<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResponse<T>, ApiError> {
        let dispatched = self.execute(&request).await?;
        let value = decode(
            dispatched.status,
            dispatched.envelope.value.unwrap_or(Value::Null),
        )?;

        Ok(ApiResponse {
            value,
            message: dispatched.envelope.message,
        })
    }

    // ============================================
    // SESSION
    // ============================================

    /// POST login credentials and store the issued token pair.
    ///
    /// A 401 here means wrong credentials, so this call never triggers a
    /// refresh. Returns the full `value` decoded as `T`.
    pub async fn authenticate<B, T>(&self, path: &str, credentials: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = ApiRequest::post(path)
            .with_body(to_body(credentials)?)
            .with_options(RequestOptions::skip_auth_refresh());

        let dispatched = self.execute(&request).await?;
        let value = dispatched.envelope.value.unwrap_or(Value::Null);

        let payload: TokenPayload = decode(dispatched.status, value.clone())?;
        self.store()
            .store_tokens(&payload.tokens)
            .map_err(|e| normalizer::credential_store(&e))?;

        info!("Signed in, credentials stored");
        decode(dispatched.status, value)
    }

    /// Forget the stored credentials. No network call.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.store()
            .clear()
            .map_err(|e| normalizer::credential_store(&e))?;

        info!("Signed out, credentials cleared");
        Ok(())
    }

    /// True while either an unexpired access token or refresh token is stored.
    pub fn is_authenticated(&self) -> Result<bool, ApiError> {
        let store = self.store();
        let access = store
            .get_access()
            .map_err(|e| normalizer::credential_store(&e))?;
        if access.is_some() {
            return Ok(true);
        }

        let refresh = store
            .get_refresh()
            .map_err(|e| normalizer::credential_store(&e))?;
        Ok(refresh.is_some())
    }

    /// Dispatch, and on an expired-session 401 wait for the refresh and
    /// re-issue the call. Retries at most once.
    async fn execute(&self, request: &ApiRequest) -> Result<Dispatched, ApiError> {
        let mut retried = false;

        loop {
            let failed = match self.pipeline.dispatch(request).await {
                Ok(dispatched) => return Ok(dispatched),
                Err(failed) => failed,
            };

            if !should_refresh(
                request,
                &failed.error,
                retried,
                self.coordinator.refresh_path(),
            ) {
                if retried && failed.error.is_unauthorized() {
                    warn!(
                        "{} {} rejected again after refresh, not retrying",
                        request.method(),
                        request.path()
                    );
                }
                return Err(failed.error);
            }

            retried = true;
            self.coordinator
                .await_refresh(failed.error, failed.sent_with)
                .await?;
        }
    }
}

fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| normalizer::invalid_request(e.to_string()))
}

fn decode<T: DeserializeOwned>(status: HttpStatusCode, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| normalizer::invalid_response(status, e.to_string()))
}
