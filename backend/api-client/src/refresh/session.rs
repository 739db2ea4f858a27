//! Session-end notifications for the hosting application.
//!
//! The client never navigates anywhere itself. When a session cannot be
//! recovered it publishes [`SessionEvent::Ended`] and the host decides what to
//! show (normally a login screen).

use std::fmt;

use log::debug;
use tokio::sync::broadcast;

const SESSION_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEndReason {
    /// An expired access token was rejected and no refresh token was stored.
    NoRefreshToken,

    /// The refresh call itself failed.
    RefreshFailed { message: String },
}

impl fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRefreshToken => write!(f, "no refresh token available"),
            Self::RefreshFailed { message } => write!(f, "token refresh failed: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Ended { reason: SessionEndReason },
}

#[derive(Clone)]
pub(crate) struct SessionSignal {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionSignal {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn end(&self, reason: SessionEndReason) {
        if self.sender.send(SessionEvent::Ended { reason }).is_err() {
            debug!("Session ended with no subscribers listening");
        }
    }
}
