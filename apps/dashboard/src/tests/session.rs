use crate::session::SessionWatcher;

use api_client::{SessionEndReason, SessionEvent};

use std::time::Duration;

use tokio::sync::broadcast;

#[tokio::test]
async fn given_session_ended_event_when_watching_then_reason_is_returned() {
    let (sender, receiver) = broadcast::channel(4);
    let watcher = SessionWatcher::spawn(receiver);

    sender
        .send(SessionEvent::Ended {
            reason: SessionEndReason::NoRefreshToken,
        })
        .unwrap();

    let reason = watcher.finish(Duration::from_secs(2)).await;

    assert_eq!(reason, Some(SessionEndReason::NoRefreshToken));
}

#[tokio::test]
async fn given_channel_closed_without_event_when_watching_then_returns_none() {
    let (sender, receiver) = broadcast::channel::<SessionEvent>(4);
    let watcher = SessionWatcher::spawn(receiver);

    drop(sender);

    assert_eq!(watcher.finish(Duration::from_secs(2)).await, None);
}

/// **BUG THIS CATCHES**: Would catch the shell hanging on exit when the client is
/// still alive and the channel never closes.
#[tokio::test]
async fn given_open_channel_without_event_when_finishing_then_gives_up_after_grace() {
    let (_sender, receiver) = broadcast::channel::<SessionEvent>(4);
    let watcher = SessionWatcher::spawn(receiver);

    let reason = watcher.finish(Duration::from_millis(50)).await;

    assert_eq!(reason, None);
}
