//! Reacts to the client's session-end signal.
//!
//! The API client only announces that a session is over. Sending the user back
//! to sign in is this shell's call.

use api_client::{SessionEndReason, SessionEvent};

use std::time::Duration;

use log::{debug, warn};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub const LOGIN_HINT: &str = "Your session has ended. Sign in again with `dashboard login <email>`.";

/// Background task watching for [`SessionEvent::Ended`].
pub struct SessionWatcher {
    handle: JoinHandle<Option<SessionEndReason>>,
}

impl SessionWatcher {
    pub fn spawn(events: broadcast::Receiver<SessionEvent>) -> Self {
        Self {
            handle: tokio::spawn(watch(events)),
        }
    }

    /// Wait up to `grace` for the watcher to stop, returning why the session
    /// ended if it did.
    ///
    /// The watcher stops on its own once the client is dropped.
    pub async fn finish(self, grace: Duration) -> Option<SessionEndReason> {
        let abort = self.handle.abort_handle();

        match tokio::time::timeout(grace, self.handle).await {
            Ok(Ok(reason)) => reason,
            Ok(Err(e)) => {
                warn!("Session watcher failed: {e}");
                None
            }
            Err(_) => {
                abort.abort();
                None
            }
        }
    }
}

async fn watch(mut events: broadcast::Receiver<SessionEvent>) -> Option<SessionEndReason> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Ended { reason }) => {
                warn!("Session ended ({reason}), redirecting to login");
                return Some(reason);
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Session watcher missed {skipped} event(s)");
            }
            Err(RecvError::Closed) => {
                debug!("Session event channel closed");
                return None;
            }
        }
    }
}
