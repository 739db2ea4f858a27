//! Single-flight credential refresh using an actor.
//!
//! Requests that fail with an expired access token ask the coordinator to
//! refresh and then wait for its answer. The actor task owns the refresh phase
//! and the queue of waiting callers, so at most one refresh call is ever in
//! flight:
//!
//! - `Idle` + request: dispatch one refresh, enter `Refreshing`
//! - `Refreshing` + request: queue the caller
//! - refresh settles: drain the whole queue with the outcome and return to
//!   `Idle` in the same actor turn
//!
//! The refresh HTTP call runs in its own task and reports back with
//! [`CoordinatorCommand::RefreshSettled`], so the actor keeps queueing callers
//! while it is in flight.
//!
//! Every 401 that is not opted out is treated as an expired session. A
//! backend that uses 401 for other denials will cause spurious refresh
//! attempts.

pub mod session;

use crate::envelope::{RefreshRequest, TokenPayload};
use crate::error::ApiError;
use crate::normalizer;
use crate::pipeline::{ApiRequest, RequestPipeline, same_endpoint};

use session::{SessionEndReason, SessionEvent, SessionSignal};

use common::RedactedToken;

use std::mem::take;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};

const COMMAND_CHANNEL_CAPACITY: usize = 100;

type RefreshOutcome = Result<(), ApiError>;

/// Messages processed by the coordinator actor.
#[derive(Debug)]
pub(crate) enum CoordinatorCommand {
    /// A call failed with an expired access token and wants to retry.
    AwaitRefresh {
        trigger: ApiError,
        sent_with: Option<RedactedToken>,
        reply: oneshot::Sender<RefreshOutcome>,
    },

    /// The in-flight refresh call finished.
    RefreshSettled(RefreshOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshPhase {
    Idle,
    Refreshing,
}

struct RefreshContext {
    pipeline: Arc<RequestPipeline>,
    refresh_path: String,
    session: SessionSignal,
}

/// Whether a failed call should go through the refresh-and-retry path.
///
/// Only 401s qualify, and only for calls that are not the refresh endpoint,
/// were not already retried and did not opt out.
pub fn should_refresh(
    request: &ApiRequest,
    error: &ApiError,
    already_retried: bool,
    refresh_path: &str,
) -> bool {
    error.is_unauthorized()
        && !already_retried
        && !request.options().skip_auth_refresh
        && !same_endpoint(request.path(), refresh_path)
}

/// Handle to the refresh actor. Clones share the same actor.
#[derive(Clone)]
pub struct RefreshCoordinator {
    command_tx: Arc<Mutex<Option<mpsc::Sender<CoordinatorCommand>>>>,
    context: Arc<RefreshContext>,
}

impl RefreshCoordinator {
    /// The actor is spawned lazily on first use within an async context.
    pub fn new(pipeline: Arc<RequestPipeline>, refresh_path: impl Into<String>) -> Self {
        Self {
            command_tx: Arc::new(Mutex::new(None)),
            context: Arc::new(RefreshContext {
                pipeline,
                refresh_path: refresh_path.into(),
                session: SessionSignal::new(),
            }),
        }
    }

    pub fn refresh_path(&self) -> &str {
        &self.context.refresh_path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.context.session.subscribe()
    }

    /// Wait until fresh credentials are stored, or fail with the reason they
    /// could not be obtained.
    ///
    /// `trigger` is the 401 that started this; it is returned unchanged when no
    /// refresh token is stored. `sent_with` is the access token the failed
    /// call carried.
    pub async fn await_refresh(
        &self,
        trigger: ApiError,
        sent_with: Option<RedactedToken>,
    ) -> Result<(), ApiError> {
        let command_tx = self.ensure_actor().await;
        let (reply, outcome) = oneshot::channel();

        command_tx
            .send(CoordinatorCommand::AwaitRefresh {
                trigger,
                sent_with,
                reply,
            })
            .await
            .map_err(|e| normalizer::refresh_unavailable(format!("Refresh actor stopped: {e}")))?;

        outcome.await.map_err(|e| {
            normalizer::refresh_unavailable(format!("Refresh actor dropped the request: {e}"))
        })?
    }

    async fn ensure_actor(&self) -> mpsc::Sender<CoordinatorCommand> {
        let mut tx_guard = self.command_tx.lock().await;

        if let Some(tx) = tx_guard.as_ref() {
            return tx.clone();
        }

        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        tokio::spawn(refresh_actor(rx, tx.downgrade(), Arc::clone(&self.context)));
        *tx_guard = Some(tx.clone());
        info!("Refresh coordinator actor spawned");

        tx
    }
}

/// The coordinator actor task.
///
/// Owns the refresh phase and the waiter queue. Runs until every
/// [`RefreshCoordinator`] handle is dropped.
async fn refresh_actor(
    mut command_rx: mpsc::Receiver<CoordinatorCommand>,
    self_tx: mpsc::WeakSender<CoordinatorCommand>,
    context: Arc<RefreshContext>,
) {
    let mut phase = RefreshPhase::Idle;
    let mut waiters: Vec<oneshot::Sender<RefreshOutcome>> = Vec::new();

    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            CoordinatorCommand::AwaitRefresh {
                trigger,
                sent_with,
                reply,
            } => {
                if phase == RefreshPhase::Refreshing {
                    waiters.push(reply);
                    debug!("Refresh in flight, {} caller(s) waiting", waiters.len());
                    continue;
                }

                match begin_refresh(&context, trigger, sent_with) {
                    Ok(Some(refresh_token)) => {
                        phase = RefreshPhase::Refreshing;
                        waiters.push(reply);
                        tokio::spawn(run_refresh(
                            Arc::clone(&context),
                            refresh_token,
                            self_tx.clone(),
                        ));
                    }
                    Ok(None) => {
                        let _ = reply.send(Ok(()));
                    }
                    Err(error) => {
                        let _ = reply.send(Err(error));
                    }
                }
            }
            CoordinatorCommand::RefreshSettled(outcome) => {
                let released = take(&mut waiters);
                phase = RefreshPhase::Idle;

                match &outcome {
                    Ok(()) => {
                        info!("Token refresh succeeded, retrying {} call(s)", released.len());
                    }
                    Err(e) => {
                        warn!(
                            "Token refresh failed, rejecting {} call(s): {}",
                            released.len(),
                            e
                        );
                        end_session(
                            &context,
                            SessionEndReason::RefreshFailed {
                                message: e.display_message().to_string(),
                            },
                        );
                    }
                }

                for waiter in released {
                    let _ = waiter.send(outcome.clone());
                }
            }
        }
    }

    debug!("Refresh coordinator actor stopped");
}

/// Decide what an `Idle` coordinator does with a new request.
///
/// `Ok(Some(token))` means dispatch a refresh with that refresh token;
/// `Ok(None)` means the credentials were already rotated after the failed
/// call left and the caller can retry right away.
fn begin_refresh(
    context: &RefreshContext,
    trigger: ApiError,
    sent_with: Option<RedactedToken>,
) -> Result<Option<RedactedToken>, ApiError> {
    let store = context.pipeline.store();

    let current = store
        .get_access()
        .map_err(|e| normalizer::credential_store(&e))?;
    if let Some(current) = current {
        if sent_with.as_ref() != Some(&current) {
            debug!("Access token rotated since the call was sent, retrying without refresh");
            return Ok(None);
        }
    }

    let refresh_token = store
        .get_refresh()
        .map_err(|e| normalizer::credential_store(&e))?;

    match refresh_token {
        Some(token) => {
            info!("Access token rejected, refreshing credentials");
            Ok(Some(token))
        }
        None => {
            warn!("Access token rejected and no refresh token stored");
            end_session(context, SessionEndReason::NoRefreshToken);
            Err(trigger)
        }
    }
}

/// Clear credentials, then tell the host the session is over.
fn end_session(context: &RefreshContext, reason: SessionEndReason) {
    if let Err(e) = context.pipeline.store().clear() {
        error!("Failed to clear credentials after session end: {}", e);
    }

    warn!("Session ended: {}", reason);
    context.session.end(reason);
}

async fn run_refresh(
    context: Arc<RefreshContext>,
    refresh_token: RedactedToken,
    self_tx: mpsc::WeakSender<CoordinatorCommand>,
) {
    let outcome = refresh_credentials(&context, &refresh_token).await;

    match self_tx.upgrade() {
        Some(tx) => {
            if tx
                .send(CoordinatorCommand::RefreshSettled(outcome))
                .await
                .is_err()
            {
                warn!("Refresh actor stopped before the refresh settled");
            }
        }
        None => warn!("Refresh settled after every client handle was dropped"),
    }
}

/// POST the refresh token and store the new pair.
async fn refresh_credentials(
    context: &RefreshContext,
    refresh_token: &RedactedToken,
) -> RefreshOutcome {
    let body = serde_json::to_value(RefreshRequest {
        refresh_token: refresh_token.expose(),
    })
    .map_err(|e| normalizer::invalid_request(e.to_string()))?;

    let request = ApiRequest::post(context.refresh_path.as_str()).with_body(body);
    let dispatched = context.pipeline.dispatch_anonymous(&request).await?;

    let value = dispatched.envelope.value.unwrap_or(Value::Null);
    let payload: TokenPayload = serde_json::from_value(value).map_err(|e| {
        normalizer::invalid_response(
            dispatched.status,
            format!("Refresh response did not contain tokens: {e}"),
        )
    })?;

    context
        .pipeline
        .store()
        .store_tokens(&payload.tokens)
        .map_err(|e| normalizer::credential_store(&e))
}
