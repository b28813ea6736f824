//! Forwarding of job progress to an external chat channel.
//!
//! Delivery itself belongs to the caller's notifier; this module only picks
//! the events that carry a chat id and hands them over.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: i64, event: &JobProgressEvent);
}

/// Writes notifications to the log. Used when no chat client is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, chat_id: i64, event: &JobProgressEvent) {
        log::info!(
            "Notify chat {}: job {} is {} ({}%)",
            chat_id,
            event.job_id,
            event.status,
            event.progress
        );
    }
}

/// Subscribes to `broadcaster` and forwards every event that has a chat id.
///
/// The task ends when the broadcaster and all its clones are dropped.
pub fn spawn_notification_bridge(
    broadcaster: &JobProgressBroadcaster,
    notifier: Arc<dyn Notifier>,
) -> JoinHandle<()> {
    let mut rx = broadcaster.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(chat_id) = event.telegram_chat_id {
                        notifier.notify(chat_id, &event).await;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Notification bridge lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        log::debug!("Notification bridge stopped");
    })
}
