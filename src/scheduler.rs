//! One-shot delayed reminders.
//!
//! Each reminder is a spawned task that sleeps for the requested delay and
//! then sends its text to the chat it was set in. Nothing is persisted: a
//! restart drops pending reminders.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channels::{Channel, ChatId};
use crate::error::ReminderError;

/// Handle to a scheduled reminder.
///
/// Dropping the handle does not cancel the reminder.
#[derive(Debug)]
pub struct ReminderHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ReminderHandle {
    /// Cancel the reminder if it has not fired yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait until the reminder has fired or been cancelled.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Schedules reminders onto a channel.
///
/// Every reminder's cancellation token is a child of the scheduler's, so
/// [`shutdown`](Self::shutdown) cancels everything still pending.
#[derive(Clone)]
pub struct ReminderScheduler {
    channel: Arc<dyn Channel>,
    pending: Arc<AtomicUsize>,
    root: CancellationToken,
}

impl ReminderScheduler {
    pub fn new(channel: Arc<dyn Channel>) -> Self {
        Self {
            channel,
            pending: Arc::new(AtomicUsize::new(0)),
            root: CancellationToken::new(),
        }
    }

    /// Deliver `message` to `chat` once, `delay_secs` seconds from now.
    pub fn schedule(
        &self,
        chat: ChatId,
        delay_secs: u64,
        message: impl Into<String>,
    ) -> Result<ReminderHandle, ReminderError> {
        if delay_secs == 0 {
            return Err(ReminderError::InvalidDelay {
                input: delay_secs.to_string(),
            });
        }
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ReminderError::EmptyMessage);
        }

        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        let token = self.root.child_token();
        let task = tokio::spawn(fire_after(
            Arc::clone(&self.channel),
            Arc::clone(&self.pending),
            token.clone(),
            chat,
            Duration::from_secs(delay_secs),
            message,
        ));
        tracing::info!(chat_id = chat, delay_secs, pending, "Reminder scheduled");

        Ok(ReminderHandle { token, task })
    }

    /// Reminders scheduled but not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Cancel every pending reminder. Reminders scheduled afterwards are
    /// cancelled immediately.
    pub fn shutdown(&self) {
        let pending = self.pending();
        self.root.cancel();
        tracing::info!(pending, "Reminder scheduler shut down");
    }
}

async fn fire_after(
    channel: Arc<dyn Channel>,
    pending: Arc<AtomicUsize>,
    token: CancellationToken,
    chat: ChatId,
    delay: Duration,
    message: String,
) {
    tokio::select! {
        _ = token.cancelled() => {
            tracing::debug!(chat_id = chat, "Reminder cancelled");
        }
        _ = tokio::time::sleep(delay) => {
            if let Err(e) = channel.send_text(chat, &message).await {
                tracing::warn!(chat_id = chat, error = %e, "Failed to deliver reminder");
            } else {
                tracing::debug!(chat_id = chat, "Reminder delivered");
            }
        }
    }
    pending.fetch_sub(1, Ordering::SeqCst);
}

/// Parse the minutes argument of the reminder command into seconds.
pub fn parse_delay_minutes(raw: &str) -> Result<u64, ReminderError> {
    let invalid = || ReminderError::InvalidDelay {
        input: raw.to_string(),
    };
    let minutes: u64 = raw.trim().parse().map_err(|_| invalid())?;
    if minutes == 0 {
        return Err(invalid());
    }
    minutes.checked_mul(60).ok_or_else(invalid)
}
